//! `substrate-engine` — the `Engine` dispatch trait, the process-wide
//! engine registry, and the module/function installation system.

mod engine_trait;
mod module;
mod registry;

pub use engine_trait::{Engine, EngineConfig};
pub use module::{ConstantDef, FunctionDef, HostFunction, Module, ModuleTable};
pub use registry::{EngineFactory, EngineRegistry};
