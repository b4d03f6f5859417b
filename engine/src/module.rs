use std::sync::Arc;

use dashmap::DashMap;
use substrate_error::{ErrorKind, ScriptError};
use substrate_value::UniversalValue;

use crate::engine_trait::Engine;

pub type HostFunction = Arc<dyn Fn(&[UniversalValue]) -> Result<Vec<UniversalValue>, ScriptError> + Send + Sync>;

/// One function exposed to guest scripts as `root.<module>.<name>`.
#[derive(Clone)]
pub struct FunctionDef {
    pub name: String,
    pub description: String,
    /// `None` means variadic.
    pub arity: Option<usize>,
    /// Declares the function has no observable side effects, letting the
    /// engine memoize repeated calls with identical arguments within one
    /// guest call. Opt-in; defaults to `false`.
    pub side_effect_free: bool,
    /// A hint for how many guest stack slots the engine should
    /// pre-reserve for this call's arguments/results. Opt-in; `None`
    /// means use the engine's default.
    pub stack_hint: Option<u32>,
    pub callback: HostFunction,
}

impl std::fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionDef")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("side_effect_free", &self.side_effect_free)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct ConstantDef {
    pub name: String,
    pub value: UniversalValue,
}

/// A named, versioned collection of functions and constants installed as
/// `root.<name>.*` in a guest runtime.
#[derive(Debug, Clone)]
pub struct Module {
    pub name: String,
    pub version: String,
    pub description: String,
    pub functions: Vec<FunctionDef>,
    pub constants: Vec<ConstantDef>,
}

impl Module {
    pub fn new(name: impl Into<String>, version: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: description.into(),
            functions: Vec::new(),
            constants: Vec::new(),
        }
    }

    pub fn with_function(mut self, function: FunctionDef) -> Self {
        self.functions.push(function);
        self
    }

    pub fn with_constant(mut self, constant: ConstantDef) -> Self {
        self.constants.push(constant);
        self
    }

    pub fn find_function(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.iter().find(|f| f.name == name)
    }
}

/// Registered modules awaiting installation into a concrete engine.
///
/// Registration (`register`) is cheap and does not touch the engine;
/// `install` actually wires a module's functions into guest globals, and
/// is only called the first time a module is touched (by name) within a
/// given execution context, avoiding the cost of installing modules a
/// script never uses.
#[derive(Default)]
pub struct ModuleTable {
    registered: DashMap<String, Module>,
    installed: DashMap<String, ()>,
}

impl ModuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, module: Module) {
        self.registered.insert(module.name.clone(), module);
    }

    pub fn names(&self) -> Vec<String> {
        self.registered.iter().map(|e| e.key().clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<Module> {
        self.registered.get(name).map(|e| e.clone())
    }

    pub fn is_installed(&self, name: &str) -> bool {
        self.installed.contains_key(name)
    }

    /// Install `name` into `engine` if it has not been installed yet.
    /// Returns `Ok(false)` if the module was already installed (no-op).
    pub fn install(&self, engine: &mut dyn Engine, name: &str) -> Result<bool, ScriptError> {
        if self.installed.contains_key(name) {
            return Ok(false);
        }
        let module = self
            .registered
            .get(name)
            .ok_or_else(|| ScriptError::new(ErrorKind::Runtime, format!("module '{name}' is not registered")))?
            .clone();
        engine.install_module(&module)?;
        self.installed.insert(name.to_string(), ());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_module() -> Module {
        Module::new("agent", "1.0.0", "agent lifecycle operations").with_function(FunctionDef {
            name: "spawn".to_string(),
            description: "spawn a sub-agent".to_string(),
            arity: Some(1),
            side_effect_free: false,
            stack_hint: None,
            callback: Arc::new(|_args| Ok(vec![])),
        })
    }

    #[test]
    fn register_then_get_round_trips() {
        let table = ModuleTable::new();
        table.register(sample_module());
        let module = table.get("agent").unwrap();
        assert_eq!(module.functions.len(), 1);
        assert!(module.find_function("spawn").is_some());
    }

    #[test]
    fn unregistered_module_install_errors() {
        struct NoopEngine;
        impl substrate_runtime::GuestHandle for NoopEngine {
            fn eval(&mut self, _s: &str) -> Result<Vec<UniversalValue>, ScriptError> { Ok(vec![]) }
            fn call(&mut self, _f: &str, _a: &[UniversalValue]) -> Result<Vec<UniversalValue>, ScriptError> { Ok(vec![]) }
            fn set_global(&mut self, _n: &str, _v: UniversalValue) -> Result<(), ScriptError> { Ok(()) }
            fn get_global(&self, _n: &str) -> Result<UniversalValue, ScriptError> { Ok(UniversalValue::Nil) }
            fn collect_garbage(&mut self) {}
            fn used_memory(&self) -> u64 { 0 }
            fn globals_snapshot(&self) -> Vec<(String, UniversalValue)> { vec![] }
            fn restore_globals(&mut self, _g: Vec<(String, UniversalValue)>) -> Result<(), ScriptError> { Ok(()) }
        }
        impl Engine for NoopEngine {
            fn name(&self) -> &'static str { "noop" }
            fn install_module(&mut self, _m: &Module) -> Result<(), ScriptError> { Ok(()) }
            fn set_memory_limit(&mut self, _bytes: u64) -> Result<(), ScriptError> { Ok(()) }
        }

        let table = ModuleTable::new();
        let mut engine = NoopEngine;
        let err = table.install(&mut engine, "ghost").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Runtime);
    }

    #[test]
    fn install_is_idempotent() {
        struct CountingEngine(u32);
        impl substrate_runtime::GuestHandle for CountingEngine {
            fn eval(&mut self, _s: &str) -> Result<Vec<UniversalValue>, ScriptError> { Ok(vec![]) }
            fn call(&mut self, _f: &str, _a: &[UniversalValue]) -> Result<Vec<UniversalValue>, ScriptError> { Ok(vec![]) }
            fn set_global(&mut self, _n: &str, _v: UniversalValue) -> Result<(), ScriptError> { Ok(()) }
            fn get_global(&self, _n: &str) -> Result<UniversalValue, ScriptError> { Ok(UniversalValue::Nil) }
            fn collect_garbage(&mut self) {}
            fn used_memory(&self) -> u64 { 0 }
            fn globals_snapshot(&self) -> Vec<(String, UniversalValue)> { vec![] }
            fn restore_globals(&mut self, _g: Vec<(String, UniversalValue)>) -> Result<(), ScriptError> { Ok(()) }
        }
        impl Engine for CountingEngine {
            fn name(&self) -> &'static str { "counting" }
            fn install_module(&mut self, _m: &Module) -> Result<(), ScriptError> {
                self.0 += 1;
                Ok(())
            }
            fn set_memory_limit(&mut self, _bytes: u64) -> Result<(), ScriptError> { Ok(()) }
        }

        let table = ModuleTable::new();
        table.register(sample_module());
        let mut engine = CountingEngine(0);
        assert!(table.install(&mut engine, "agent").unwrap());
        assert!(!table.install(&mut engine, "agent").unwrap());
        assert_eq!(engine.0, 1);
    }
}
