use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use substrate_error::{ErrorKind, ScriptError};

use crate::engine_trait::{Engine, EngineConfig};

pub type EngineFactory = Arc<dyn Fn(EngineConfig) -> Result<Box<dyn Engine>, ScriptError> + Send + Sync>;

/// Process-wide map from engine name (e.g. `"lua"`) to the factory that
/// builds a fresh instance of it. Registration happens once at process
/// startup; construction happens per tenant, so the registry's lock is
/// only ever held for the map lookup, never across engine construction
/// or use.
#[derive(Default)]
pub struct EngineRegistry {
    factories: RwLock<HashMap<String, EngineFactory>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: impl Into<String>, factory: EngineFactory) {
        self.factories.write().insert(name.into(), factory);
    }

    pub fn names(&self) -> Vec<String> {
        self.factories.read().keys().cloned().collect()
    }

    pub fn build(&self, name: &str, config: EngineConfig) -> Result<Box<dyn Engine>, ScriptError> {
        let factory = self
            .factories
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| ScriptError::new(ErrorKind::Runtime, format!("no engine registered under '{name}'")))?;
        factory(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use substrate_value::UniversalValue;

    struct StubEngine;
    impl substrate_runtime::GuestHandle for StubEngine {
        fn eval(&mut self, _s: &str) -> Result<Vec<UniversalValue>, ScriptError> { Ok(vec![]) }
        fn call(&mut self, _f: &str, _a: &[UniversalValue]) -> Result<Vec<UniversalValue>, ScriptError> { Ok(vec![]) }
        fn set_global(&mut self, _n: &str, _v: UniversalValue) -> Result<(), ScriptError> { Ok(()) }
        fn get_global(&self, _n: &str) -> Result<UniversalValue, ScriptError> { Ok(UniversalValue::Nil) }
        fn collect_garbage(&mut self) {}
        fn used_memory(&self) -> u64 { 0 }
        fn globals_snapshot(&self) -> Vec<(String, UniversalValue)> { vec![] }
        fn restore_globals(&mut self, _g: Vec<(String, UniversalValue)>) -> Result<(), ScriptError> { Ok(()) }
    }
    impl Engine for StubEngine {
        fn name(&self) -> &'static str { "stub" }
        fn install_module(&mut self, _m: &crate::module::Module) -> Result<(), ScriptError> { Ok(()) }
        fn set_memory_limit(&mut self, _bytes: u64) -> Result<(), ScriptError> { Ok(()) }
    }

    #[test]
    fn build_unregistered_engine_errors() {
        let registry = EngineRegistry::new();
        let err = registry.build("lua", EngineConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Runtime);
    }

    #[test]
    fn register_then_build_round_trips() {
        let registry = EngineRegistry::new();
        registry.register("stub", Arc::new(|_config| Ok(Box::new(StubEngine) as Box<dyn Engine>)));
        let engine = registry.build("stub", EngineConfig::default()).unwrap();
        assert_eq!(engine.name(), "stub");
        assert_eq!(registry.names(), vec!["stub".to_string()]);
    }
}
