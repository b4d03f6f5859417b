use std::sync::Arc;

use substrate_engine::{ConstantDef, Module};
use substrate_value::UniversalValue;

use crate::collaborator::collaborator_module;

collaborator_module! {
    trait AgentCollaborator;
    stub StubAgentCollaborator;
    module_name = "agent";
    functions {
        create("create a sub-agent of the given type with a config object", Some(2), false),
        destroy("destroy a running agent and release its resources", Some(1), false),
        run("run an agent synchronously against an input, returning its result", Some(2), false),
        run_async("start an agent run without blocking, returning a handle to await later", Some(2), false),
        info("fetch a running agent's descriptive info (type, config, status)", Some(1), true),
        clone("clone an agent's configuration into a new, independent agent", Some(1), false),
        add_hook("attach a lifecycle hook callback to a specific agent", Some(3), false),
        remove_hook("detach a previously attached agent-scoped hook", Some(2), false),
        memory("fetch the memory store handle backing an agent", Some(1), true),
        clear_memory("clear an agent's memory store", Some(1), false),
        list("list every agent the host currently knows about", Some(0), true),
        get("fetch a single agent's full record by id", Some(1), true),
    }
}

/// Default sampling temperature a host should use when a script creates
/// an agent without specifying one.
const DEFAULT_TEMPERATURE: f64 = 0.7;
/// Default response token budget for an agent created without an
/// explicit limit.
const DEFAULT_MAX_TOKENS: i64 = 2048;

pub fn build_module(collaborator: Arc<dyn AgentCollaborator>) -> Module {
    let module = Module::new("agent", "1.0.0", "creating, running, and supervising sub-agents");
    wire_collaborator_functions(module, collaborator)
        .with_constant(ConstantDef {
            name: "DEFAULT_TEMPERATURE".to_string(),
            value: UniversalValue::Float(DEFAULT_TEMPERATURE),
        })
        .with_constant(ConstantDef {
            name: "DEFAULT_MAX_TOKENS".to_string(),
            value: UniversalValue::Int(DEFAULT_MAX_TOKENS),
        })
}
