use std::sync::Arc;

use substrate_engine::{ConstantDef, Module};
use substrate_error::ScriptError;
use substrate_value::UniversalValue;

use crate::collaborator::collaborator_module;

/// Hook type names the host ships built-in support for. Kept as the
/// source for the `TYPE_*` constants and as a convenience a
/// `HookCollaborator` implementation can reuse for its own validation;
/// not enforced at this crate's dispatch boundary.
const KNOWN_HOOK_TYPES: &[&str] = &[
    "before_tool_call",
    "after_tool_call",
    "before_completion",
    "after_completion",
    "on_error",
];

pub fn validate_hook_type(hook_type: &str) -> Result<(), ScriptError> {
    if KNOWN_HOOK_TYPES.contains(&hook_type) {
        Ok(())
    } else {
        Err(ScriptError::new(
            substrate_error::ErrorKind::InvalidHookType,
            format!("'{hook_type}' is not a known hook type"),
        ))
    }
}

collaborator_module! {
    trait HookCollaborator;
    stub StubHookCollaborator;
    module_name = "hook";
    functions {
        register("register a callback for a known hook type", Some(2), false),
        unregister("unregister a previously registered hook", Some(1), false),
        enable("re-enable a previously disabled hook", Some(1), false),
        disable("disable a hook without unregistering it", Some(1), false),
        list("list every registered hook", Some(0), true),
        list_by_type("list every registered hook of a given type", Some(1), true),
        info("fetch a single hook's registration details", Some(1), true),
        set_priority("set a hook's execution priority relative to others of the same type", Some(2), false),
        set_metadata("attach host-opaque metadata to a hook", Some(2), false),
        get_metadata("fetch a hook's attached metadata", Some(1), true),
        trigger("manually trigger every hook registered for a type with a payload", Some(2), false),
        chain("run a list of hooks in sequence, passing each one's output to the next", Some(1), false),
        compose("combine a list of hooks into a single named hook", Some(1), false),
        intercept("register a callback that can short-circuit a hook type's normal handling", Some(2), false),
        stats("fetch hook invocation counts and timing", Some(0), true),
        clear_by_type("unregister every hook registered for a type", Some(1), false),
        clear_all("unregister every hook", Some(0), false),
        types("list every known hook type", Some(0), true),
    }
}

const TYPE_BEFORE_TOOL_CALL: &str = "before_tool_call";
const TYPE_AFTER_TOOL_CALL: &str = "after_tool_call";
const TYPE_BEFORE_COMPLETION: &str = "before_completion";
const TYPE_AFTER_COMPLETION: &str = "after_completion";
const TYPE_ON_ERROR: &str = "on_error";
const PRIORITY_LOW: i64 = 0;
const PRIORITY_NORMAL: i64 = 1;
const PRIORITY_HIGH: i64 = 2;

pub fn build_module(collaborator: Arc<dyn HookCollaborator>) -> Module {
    let module = Module::new("hook", "1.0.0", "registering and supervising guest callbacks for host lifecycle events");
    wire_collaborator_functions(module, collaborator)
        .with_constant(ConstantDef {
            name: "TYPE_BEFORE_TOOL_CALL".to_string(),
            value: UniversalValue::from(TYPE_BEFORE_TOOL_CALL),
        })
        .with_constant(ConstantDef {
            name: "TYPE_AFTER_TOOL_CALL".to_string(),
            value: UniversalValue::from(TYPE_AFTER_TOOL_CALL),
        })
        .with_constant(ConstantDef {
            name: "TYPE_BEFORE_COMPLETION".to_string(),
            value: UniversalValue::from(TYPE_BEFORE_COMPLETION),
        })
        .with_constant(ConstantDef {
            name: "TYPE_AFTER_COMPLETION".to_string(),
            value: UniversalValue::from(TYPE_AFTER_COMPLETION),
        })
        .with_constant(ConstantDef { name: "TYPE_ON_ERROR".to_string(), value: UniversalValue::from(TYPE_ON_ERROR) })
        .with_constant(ConstantDef { name: "PRIORITY_LOW".to_string(), value: UniversalValue::Int(PRIORITY_LOW) })
        .with_constant(ConstantDef {
            name: "PRIORITY_NORMAL".to_string(),
            value: UniversalValue::Int(PRIORITY_NORMAL),
        })
        .with_constant(ConstantDef { name: "PRIORITY_HIGH".to_string(), value: UniversalValue::Int(PRIORITY_HIGH) })
}
