use std::sync::Arc;

use substrate_engine::{ConstantDef, Module};
use substrate_error::ScriptError;
use substrate_value::UniversalValue;

use crate::collaborator::collaborator_module;

/// Event type names the host ships built-in support for. Not enforced
/// at this crate's dispatch boundary (a real collaborator is free to
/// accept additional, host-specific event types) — kept here as the
/// source for the `TYPE_*` constants and as a convenience a
/// `EventCollaborator` implementation can reuse for its own validation.
const KNOWN_EVENT_TYPES: &[&str] = &[
    "agent.spawned",
    "agent.terminated",
    "tool.invoked",
    "workflow.started",
    "workflow.finished",
    "provider.completion",
    "custom",
];

pub fn validate_event_type(event_type: &str) -> Result<(), ScriptError> {
    if KNOWN_EVENT_TYPES.contains(&event_type) {
        Ok(())
    } else {
        Err(ScriptError::new(
            substrate_error::ErrorKind::InvalidEventType,
            format!("'{event_type}' is not a known event type"),
        ))
    }
}

collaborator_module! {
    trait EventCollaborator;
    stub StubEventCollaborator;
    module_name = "event";
    functions {
        subscribe("subscribe a callback to every event of a given type", Some(2), false),
        subscribe_with_filter("subscribe a callback to events of a given type matching a filter", Some(3), false),
        unsubscribe("remove a previously registered subscription", Some(1), false),
        emit("emit an event of a known type with a payload object", Some(2), false),
        emit_async("emit an event without blocking subscriber delivery", Some(2), false),
        list_subscriptions("list every active subscription", Some(0), true),
        history("fetch recently emitted events, optionally filtered by type", None, true),
        clear_history("clear the host's recorded event history", Some(0), false),
        pause("pause event delivery to subscribers", Some(0), false),
        resume("resume event delivery to subscribers", Some(0), false),
        stats("fetch event throughput and subscriber counts", Some(0), true),
        set_priority("set the delivery priority for a given event type", Some(2), false),
        enable_logging("enable verbose logging of every emitted event", Some(0), false),
        disable_logging("disable verbose logging of emitted events", Some(0), false),
        types("list every known event type", Some(0), true),
    }
}

const TYPE_AGENT_SPAWNED: &str = "agent.spawned";
const TYPE_AGENT_TERMINATED: &str = "agent.terminated";
const TYPE_TOOL_INVOKED: &str = "tool.invoked";
const TYPE_WORKFLOW_STARTED: &str = "workflow.started";
const TYPE_WORKFLOW_FINISHED: &str = "workflow.finished";
const TYPE_PROVIDER_COMPLETION: &str = "provider.completion";
const TYPE_CUSTOM: &str = "custom";
const PRIORITY_LOW: i64 = 0;
const PRIORITY_NORMAL: i64 = 1;
const PRIORITY_HIGH: i64 = 2;

pub fn build_module(collaborator: Arc<dyn EventCollaborator>) -> Module {
    let module = Module::new("event", "1.0.0", "subscribing to and emitting structured events");
    wire_collaborator_functions(module, collaborator)
        .with_constant(ConstantDef {
            name: "TYPE_AGENT_SPAWNED".to_string(),
            value: UniversalValue::from(TYPE_AGENT_SPAWNED),
        })
        .with_constant(ConstantDef {
            name: "TYPE_AGENT_TERMINATED".to_string(),
            value: UniversalValue::from(TYPE_AGENT_TERMINATED),
        })
        .with_constant(ConstantDef {
            name: "TYPE_TOOL_INVOKED".to_string(),
            value: UniversalValue::from(TYPE_TOOL_INVOKED),
        })
        .with_constant(ConstantDef {
            name: "TYPE_WORKFLOW_STARTED".to_string(),
            value: UniversalValue::from(TYPE_WORKFLOW_STARTED),
        })
        .with_constant(ConstantDef {
            name: "TYPE_WORKFLOW_FINISHED".to_string(),
            value: UniversalValue::from(TYPE_WORKFLOW_FINISHED),
        })
        .with_constant(ConstantDef {
            name: "TYPE_PROVIDER_COMPLETION".to_string(),
            value: UniversalValue::from(TYPE_PROVIDER_COMPLETION),
        })
        .with_constant(ConstantDef { name: "TYPE_CUSTOM".to_string(), value: UniversalValue::from(TYPE_CUSTOM) })
        .with_constant(ConstantDef { name: "PRIORITY_LOW".to_string(), value: UniversalValue::Int(PRIORITY_LOW) })
        .with_constant(ConstantDef {
            name: "PRIORITY_NORMAL".to_string(),
            value: UniversalValue::Int(PRIORITY_NORMAL),
        })
        .with_constant(ConstantDef { name: "PRIORITY_HIGH".to_string(), value: UniversalValue::Int(PRIORITY_HIGH) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use substrate_error::ErrorKind;

    #[test]
    fn unknown_event_type_is_rejected() {
        let err = validate_event_type("not.a.real.event").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidEventType);
    }

    #[test]
    fn known_event_type_passes_validation() {
        validate_event_type("agent.spawned").unwrap();
    }

    #[test]
    fn module_exposes_every_expected_function() {
        let module = build_module(Arc::new(StubEventCollaborator));
        for name in [
            "subscribe",
            "subscribe_with_filter",
            "unsubscribe",
            "emit",
            "emit_async",
            "list_subscriptions",
            "history",
            "clear_history",
            "pause",
            "resume",
            "stats",
            "set_priority",
            "enable_logging",
            "disable_logging",
            "types",
        ] {
            assert!(module.find_function(name).is_some(), "missing {name}");
        }
    }

    #[test]
    fn module_exposes_type_and_priority_constants() {
        let module = build_module(Arc::new(StubEventCollaborator));
        assert_eq!(module.constants.len(), 10);
    }
}
