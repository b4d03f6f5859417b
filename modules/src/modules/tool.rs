use std::sync::Arc;

use substrate_engine::{ConstantDef, Module};
use substrate_value::UniversalValue;

use crate::collaborator::collaborator_module;

collaborator_module! {
    trait ToolCollaborator;
    stub StubToolCollaborator;
    module_name = "tool";
    functions {
        register("register a tool under a name with a parameter schema", Some(2), false),
        unregister("remove a previously registered tool", Some(1), false),
        execute("execute a tool by name with an argument object", Some(2), false),
        execute_async("execute a tool without blocking, returning a handle to await later", Some(2), false),
        list("list every tool registered with the host", Some(0), true),
        get("fetch a single tool's registration by name", Some(1), true),
        exists("check whether a tool by that name is registered", Some(1), true),
        validate("validate an argument object against a tool's schema without running it", Some(2), true),
        list_builtins("list the host's built-in tool names", Some(0), true),
        enable("re-enable a previously disabled tool", Some(1), false),
        disable("disable a tool without unregistering it", Some(1), false),
    }
}

const BUILTIN_HTTP: &str = "http";
const BUILTIN_FILE_READ: &str = "file_read";
const BUILTIN_FILE_WRITE: &str = "file_write";
const BUILTIN_SHELL: &str = "shell";

pub fn build_module(collaborator: Arc<dyn ToolCollaborator>) -> Module {
    let module = Module::new("tool", "1.0.0", "registering and invoking host tools");
    wire_collaborator_functions(module, collaborator)
        .with_constant(ConstantDef { name: "BUILTIN_HTTP".to_string(), value: UniversalValue::from(BUILTIN_HTTP) })
        .with_constant(ConstantDef {
            name: "BUILTIN_FILE_READ".to_string(),
            value: UniversalValue::from(BUILTIN_FILE_READ),
        })
        .with_constant(ConstantDef {
            name: "BUILTIN_FILE_WRITE".to_string(),
            value: UniversalValue::from(BUILTIN_FILE_WRITE),
        })
        .with_constant(ConstantDef { name: "BUILTIN_SHELL".to_string(), value: UniversalValue::from(BUILTIN_SHELL) })
}
