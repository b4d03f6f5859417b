use substrate_error::ScriptError;
use substrate_runtime::GuestHandle;
use substrate_value::UniversalValue;

use crate::module::Module;

/// Configuration passed to an engine factory at construction time.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub memory_limit_bytes: u64,
    pub instruction_budget: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            memory_limit_bytes: 16 * 1024 * 1024,
            instruction_budget: None,
        }
    }
}

/// The polymorphic dispatch table every concrete guest runtime
/// implements, so the rest of the substrate never names a concrete
/// engine type. Extends [`GuestHandle`] (the narrower surface the
/// execution context needs) with module installation and the memory
/// limit hook the accounter drives.
pub trait Engine: GuestHandle + Send {
    fn name(&self) -> &'static str;

    /// Install a module's functions and constants as guest globals
    /// under `root.<module name>.*`.
    fn install_module(&mut self, module: &Module) -> Result<(), ScriptError>;

    /// Adjust the engine-native memory limit, called by the memory
    /// accounter when a tenant's budget changes.
    fn set_memory_limit(&mut self, bytes: u64) -> Result<(), ScriptError>;
}
