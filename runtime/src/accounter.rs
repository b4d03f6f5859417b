use std::sync::atomic::{AtomicU64, Ordering};

use substrate_error::{ErrorKind, ScriptError};

/// Running totals tracked alongside the current byte count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocStats {
    pub allocations: u64,
    pub frees: u64,
    pub current_bytes: u64,
    pub peak_bytes: u64,
    pub failed_allocations: u64,
}

/// Per-context memory budget enforcement.
///
/// Mirrors a gas meter's charge-then-commit discipline: a charge that
/// would exceed the limit leaves the accounter's state untouched, so
/// callers can retry a smaller allocation or propagate the failure
/// without double-counting. The concrete engine is responsible for
/// calling [`MemoryAccounter::charge`] before performing a guest-side
/// allocation it controls (e.g. via an engine-native memory-limit hook)
/// and [`MemoryAccounter::release`] when guest memory is freed or a
/// snapshot restore replaces the live heap.
#[derive(Debug)]
pub struct MemoryAccounter {
    limit_bytes: u64,
    current_bytes: AtomicU64,
    peak_bytes: AtomicU64,
    allocations: AtomicU64,
    frees: AtomicU64,
    failed_allocations: AtomicU64,
}

impl MemoryAccounter {
    pub fn new(limit_bytes: u64) -> Self {
        Self {
            limit_bytes,
            current_bytes: AtomicU64::new(0),
            peak_bytes: AtomicU64::new(0),
            allocations: AtomicU64::new(0),
            frees: AtomicU64::new(0),
            failed_allocations: AtomicU64::new(0),
        }
    }

    pub fn limit_bytes(&self) -> u64 {
        self.limit_bytes
    }

    /// Record an allocation of `amount` bytes. Returns
    /// [`ErrorKind::MemoryLimit`] without mutating state if the charge
    /// would exceed the budget.
    pub fn charge(&self, amount: u64) -> Result<(), ScriptError> {
        loop {
            let current = self.current_bytes.load(Ordering::Acquire);
            let next = match current.checked_add(amount) {
                Some(v) if v <= self.limit_bytes => v,
                _ => {
                    self.failed_allocations.fetch_add(1, Ordering::Relaxed);
                    return Err(ScriptError::new(
                        ErrorKind::MemoryLimit,
                        format!(
                            "allocation of {amount} bytes would exceed the {}-byte limit (currently at {current})",
                            self.limit_bytes
                        ),
                    ))
                }
            };
            if self
                .current_bytes
                .compare_exchange(current, next, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                self.allocations.fetch_add(1, Ordering::Relaxed);
                self.peak_bytes.fetch_max(next, Ordering::Relaxed);
                return Ok(());
            }
        }
    }

    /// Release `amount` previously-charged bytes back to the budget.
    pub fn release(&self, amount: u64) {
        self.current_bytes.fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
            Some(current.saturating_sub(amount))
        }).ok();
        self.frees.fetch_add(1, Ordering::Relaxed);
    }

    /// Reconcile the tracked usage against an authoritative sample taken
    /// directly from the guest engine (e.g. `mlua::Lua::used_memory()`).
    /// Used after operations the accounter cannot observe charge-by-charge,
    /// such as guest-triggered garbage collection.
    pub fn reconcile(&self, measured_bytes: u64) {
        self.current_bytes.store(measured_bytes, Ordering::Release);
        self.peak_bytes.fetch_max(measured_bytes, Ordering::Relaxed);
    }

    pub fn current_bytes(&self) -> u64 {
        self.current_bytes.load(Ordering::Acquire)
    }

    pub fn is_exhausted(&self) -> bool {
        self.current_bytes() >= self.limit_bytes
    }

    /// Records an allocation failure observed outside of [`charge`](Self::charge)
    /// — e.g. the concrete engine's own native memory-limit hook (`mlua::Lua::set_memory_limit`)
    /// rejected a guest allocation the accounter never got a chance to charge for.
    pub fn record_failed_allocation(&self) {
        self.failed_allocations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> AllocStats {
        AllocStats {
            allocations: self.allocations.load(Ordering::Relaxed),
            frees: self.frees.load(Ordering::Relaxed),
            current_bytes: self.current_bytes(),
            peak_bytes: self.peak_bytes.load(Ordering::Relaxed),
            failed_allocations: self.failed_allocations.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charge_within_limit_succeeds() {
        let accounter = MemoryAccounter::new(1_000);
        accounter.charge(400).unwrap();
        assert_eq!(accounter.current_bytes(), 400);
        assert_eq!(accounter.stats().allocations, 1);
    }

    #[test]
    fn charge_exceeding_limit_leaves_state_unchanged() {
        let accounter = MemoryAccounter::new(100);
        accounter.charge(60).unwrap();
        let err = accounter.charge(41).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MemoryLimit);
        assert_eq!(accounter.current_bytes(), 60);
    }

    #[test]
    fn release_reduces_current_without_underflow() {
        let accounter = MemoryAccounter::new(1_000);
        accounter.charge(100).unwrap();
        accounter.release(1_000);
        assert_eq!(accounter.current_bytes(), 0);
    }

    #[test]
    fn peak_bytes_tracks_high_water_mark() {
        let accounter = MemoryAccounter::new(1_000);
        accounter.charge(900).unwrap();
        accounter.release(800);
        assert_eq!(accounter.current_bytes(), 100);
        assert_eq!(accounter.stats().peak_bytes, 900);
    }

    #[test]
    fn charge_at_exact_limit_is_exhausted() {
        let accounter = MemoryAccounter::new(500);
        accounter.charge(500).unwrap();
        assert!(accounter.is_exhausted());
    }

    #[test]
    fn rejected_charge_counts_as_failed_allocation() {
        let accounter = MemoryAccounter::new(100);
        accounter.charge(60).unwrap();
        accounter.charge(41).unwrap_err();
        accounter.record_failed_allocation();
        assert_eq!(accounter.stats().failed_allocations, 2);
    }
}
