//! `substrate-modules` — the API bridge fabric exposed to guest scripts
//! as `root.<module>.<function>`.
//!
//! Every module here fixes only the narrow contract a real host
//! subsystem (agent runner, tool dispatcher, workflow engine, LLM
//! provider, event bus, schema store, memory store) would need to
//! satisfy; none of them contain that subsystem's actual business
//! logic. `root`'s own introspection functions and `output`'s parsing/
//! formatting functions are the exceptions — those are fully
//! implemented here because they only touch state this crate already
//! owns.

mod collaborator;
pub mod modules;

pub use collaborator::{expect_object, expect_str, not_wired_up};
pub use modules::agent::{AgentCollaborator, StubAgentCollaborator};
pub use modules::event::{EventCollaborator, StubEventCollaborator};
pub use modules::hook::{HookCollaborator, StubHookCollaborator};
pub use modules::memory::{MemoryCollaborator, StubMemoryCollaborator};
pub use modules::output::{parse_csv, parse_json, parse_xml, parse_yaml};
pub use modules::provider::{ProviderCollaborator, StubProviderCollaborator};
pub use modules::root::{build_module as build_root_module, MetricsProvider};
pub use modules::schema::{SchemaCollaborator, StubSchemaCollaborator};
pub use modules::test::{StubTestCollaborator, TestCollaborator};
pub use modules::tool::{StubToolCollaborator, ToolCollaborator};
pub use modules::workflow::{StubWorkflowCollaborator, WorkflowCollaborator};

use std::sync::Arc;

use substrate_engine::ModuleTable;

/// Collaborators for every stubbed module, bundled so a host can wire
/// its real subsystems in one call (or pass `Default::default()` to run
/// entirely against stubs).
pub struct Collaborators {
    pub agent: Arc<dyn AgentCollaborator>,
    pub tool: Arc<dyn ToolCollaborator>,
    pub workflow: Arc<dyn WorkflowCollaborator>,
    pub provider: Arc<dyn ProviderCollaborator>,
    pub event: Arc<dyn EventCollaborator>,
    pub schema: Arc<dyn SchemaCollaborator>,
    pub memory: Arc<dyn MemoryCollaborator>,
    pub hook: Arc<dyn HookCollaborator>,
    pub test: Arc<dyn TestCollaborator>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            agent: Arc::new(StubAgentCollaborator),
            tool: Arc::new(StubToolCollaborator),
            workflow: Arc::new(StubWorkflowCollaborator),
            provider: Arc::new(StubProviderCollaborator),
            event: Arc::new(StubEventCollaborator),
            schema: Arc::new(StubSchemaCollaborator),
            memory: Arc::new(StubMemoryCollaborator),
            hook: Arc::new(StubHookCollaborator),
            test: Arc::new(StubTestCollaborator),
        }
    }
}

/// Registers every module (agent/tool/workflow/provider/event/schema/
/// memory/hook/output/test, plus `root`) with `table`. Registration
/// alone does not touch a guest engine — actual installation happens
/// lazily through [`substrate_engine::ModuleTable::install`] the first
/// time a script touches a given module.
pub fn register_all(table: &ModuleTable, collaborators: Collaborators, engine_name: String, metrics: MetricsProvider) {
    table.register(modules::agent::build_module(collaborators.agent));
    table.register(modules::tool::build_module(collaborators.tool));
    table.register(modules::workflow::build_module(collaborators.workflow));
    table.register(modules::provider::build_module(collaborators.provider));
    table.register(modules::event::build_module(collaborators.event));
    table.register(modules::schema::build_module(collaborators.schema));
    table.register(modules::memory::build_module(collaborators.memory));
    table.register(modules::hook::build_module(collaborators.hook));
    table.register(modules::test::build_module(collaborators.test));
    table.register(modules::output::build_module());
}
