use std::sync::Arc;

use parking_lot::Mutex;
use substrate_error::{ErrorKind, RecoveryStrategy, ScriptError};
use substrate_value::UniversalValue;

use crate::accounter::{AllocStats, MemoryAccounter};
use crate::protected::{ProtectedExecutor, ProtectedOutcome};
use crate::snapshot::{Snapshot, SnapshotManager};

/// The minimal surface a concrete engine exposes to an [`ExecutionContext`].
///
/// Kept deliberately narrow so this crate stays engine-agnostic; the
/// concrete Lua engine implements this directly against `mlua::Lua`.
pub trait GuestHandle {
    fn eval(&mut self, source: &str) -> Result<Vec<UniversalValue>, ScriptError>;
    fn call(&mut self, function: &str, args: &[UniversalValue]) -> Result<Vec<UniversalValue>, ScriptError>;
    fn set_global(&mut self, name: &str, value: UniversalValue) -> Result<(), ScriptError>;
    fn get_global(&self, name: &str) -> Result<UniversalValue, ScriptError>;
    fn collect_garbage(&mut self);
    fn used_memory(&self) -> u64;
    fn globals_snapshot(&self) -> Vec<(String, UniversalValue)>;
    fn restore_globals(&mut self, globals: Vec<(String, UniversalValue)>) -> Result<(), ScriptError>;
}

/// The operational boundary around one guest runtime instance: every
/// call into the guest passes through the [`ProtectedExecutor`], every
/// byte the guest allocates is tracked by the [`MemoryAccounter`], and
/// snapshot/restore goes through the [`SnapshotManager`].
pub struct ExecutionContext<G: GuestHandle> {
    guest: G,
    accounter: Arc<MemoryAccounter>,
    snapshots: SnapshotManager,
    executor: ProtectedExecutor,
    errors: Mutex<Vec<ScriptError>>,
}

impl<G: GuestHandle> ExecutionContext<G> {
    pub fn new(
        guest: G,
        accounter: Arc<MemoryAccounter>,
        max_snapshots: usize,
        recovery: RecoveryStrategy,
        max_trace_depth: usize,
    ) -> Self {
        Self {
            guest,
            accounter,
            snapshots: SnapshotManager::new(max_snapshots),
            executor: ProtectedExecutor::new(recovery, max_trace_depth),
            errors: Mutex::new(Vec::new()),
        }
    }

    fn record_failure(&mut self, outcome: ProtectedOutcome<Vec<UniversalValue>>) -> Result<Vec<UniversalValue>, ScriptError> {
        // Sample the guest's own memory counter around every call and fold it
        // into the accounter: mlua exposes no allocator hook a third party can
        // attach to, so a post-call sample is the closest faithful stand-in for
        // "every allocate/resize/free routes through the shim".
        self.accounter.reconcile(self.guest.used_memory());
        match outcome {
            ProtectedOutcome::Completed(value) => Ok(value),
            ProtectedOutcome::Failed { error, .. } => {
                if error.kind() == ErrorKind::MemoryLimit {
                    self.accounter.record_failed_allocation();
                }
                self.errors.lock().push(error.clone());
                Err(error)
            }
        }
    }

    /// Evaluate a source chunk inside the protected boundary.
    pub fn execute(&mut self, source: &str) -> Result<Vec<UniversalValue>, ScriptError> {
        let guest = &mut self.guest;
        let outcome = self.executor.run(|| guest.eval(source), || {});
        self.record_failure(outcome)
    }

    /// Invoke an already-defined guest function by name.
    pub fn call(&mut self, function: &str, args: &[UniversalValue]) -> Result<Vec<UniversalValue>, ScriptError> {
        let guest = &mut self.guest;
        let outcome = self.executor.run(|| guest.call(function, args), || {});
        self.record_failure(outcome)
    }

    pub fn set_global(&mut self, name: &str, value: UniversalValue) -> Result<(), ScriptError> {
        self.guest.set_global(name, value)
    }

    pub fn get_global(&self, name: &str) -> Result<UniversalValue, ScriptError> {
        self.guest.get_global(name)
    }

    /// Run the guest's collector, then reconcile the accounter against
    /// the post-collection measured usage (the guest may free memory the
    /// accounter could not have attributed to any single charge).
    pub fn collect_garbage(&mut self) {
        self.guest.collect_garbage();
        self.accounter.reconcile(self.guest.used_memory());
    }

    pub fn last_error(&self) -> Option<ScriptError> {
        self.errors.lock().last().cloned()
    }

    pub fn clear_errors(&self) {
        self.errors.lock().clear();
    }

    pub fn create_snapshot(&self) -> Result<(), ScriptError> {
        let snapshot = SnapshotManager::capture(&self.guest.globals_snapshot());
        self.snapshots.push(snapshot)
    }

    pub fn restore_snapshot(&mut self) -> Result<(), ScriptError> {
        let snapshot: Snapshot = self.snapshots.pop().ok_or_else(|| {
            ScriptError::new(ErrorKind::Runtime, "no snapshot to restore")
        })?;
        let globals = snapshot
            .globals
            .into_iter()
            .map(|(name, value)| (name, value.into_universal_value()))
            .collect();
        self.guest.restore_globals(globals)?;
        self.accounter.reconcile(self.guest.used_memory());
        Ok(())
    }

    pub fn allocation_stats(&self) -> AllocStats {
        self.accounter.stats()
    }

    pub fn memory_usage(&self) -> u64 {
        self.accounter.current_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FakeGuest {
        globals: HashMap<String, UniversalValue>,
        used: u64,
        fail_next: bool,
    }

    impl GuestHandle for FakeGuest {
        fn eval(&mut self, source: &str) -> Result<Vec<UniversalValue>, ScriptError> {
            if self.fail_next {
                self.fail_next = false;
                return Err(ScriptError::new(ErrorKind::Syntax, "bad source"));
            }
            Ok(vec![UniversalValue::from(source.len() as i64)])
        }

        fn call(&mut self, _function: &str, args: &[UniversalValue]) -> Result<Vec<UniversalValue>, ScriptError> {
            Ok(args.to_vec())
        }

        fn set_global(&mut self, name: &str, value: UniversalValue) -> Result<(), ScriptError> {
            self.globals.insert(name.to_string(), value);
            Ok(())
        }

        fn get_global(&self, name: &str) -> Result<UniversalValue, ScriptError> {
            Ok(self.globals.get(name).cloned().unwrap_or(UniversalValue::Nil))
        }

        fn collect_garbage(&mut self) {}

        fn used_memory(&self) -> u64 {
            self.used
        }

        fn globals_snapshot(&self) -> Vec<(String, UniversalValue)> {
            self.globals.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
        }

        fn restore_globals(&mut self, globals: Vec<(String, UniversalValue)>) -> Result<(), ScriptError> {
            self.globals = globals.into_iter().collect();
            Ok(())
        }
    }

    fn fresh_context() -> ExecutionContext<FakeGuest> {
        ExecutionContext::new(
            FakeGuest {
                globals: HashMap::new(),
                used: 0,
                fail_next: false,
            },
            Arc::new(MemoryAccounter::new(1_000_000)),
            8,
            RecoveryStrategy::Propagate,
            32,
        )
    }

    #[test]
    fn execute_success_round_trips_value() {
        let mut ctx = fresh_context();
        let result = ctx.execute("return 1").unwrap();
        assert_eq!(result, vec![UniversalValue::Int(8)]);
    }

    #[test]
    fn execute_failure_is_recorded_as_last_error() {
        let mut ctx = fresh_context();
        ctx.guest.fail_next = true;
        let err = ctx.execute("???").unwrap_err();
        assert_eq!(ctx.last_error().unwrap().kind(), err.kind());
        ctx.clear_errors();
        assert!(ctx.last_error().is_none());
    }

    #[test]
    fn set_and_get_global_round_trip() {
        let mut ctx = fresh_context();
        ctx.set_global("x", UniversalValue::Int(5)).unwrap();
        assert_eq!(ctx.get_global("x").unwrap(), UniversalValue::Int(5));
    }

    #[test]
    fn snapshot_restore_round_trips_globals() {
        let mut ctx = fresh_context();
        ctx.set_global("x", UniversalValue::Int(5)).unwrap();
        ctx.create_snapshot().unwrap();
        ctx.set_global("x", UniversalValue::Int(9)).unwrap();
        ctx.restore_snapshot().unwrap();
        assert_eq!(ctx.get_global("x").unwrap(), UniversalValue::Int(5));
    }

    #[test]
    fn restore_without_snapshot_errors() {
        let mut ctx = fresh_context();
        let err = ctx.restore_snapshot().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Runtime);
    }
}
