use std::sync::Arc;

use substrate_engine::{ConstantDef, Module};
use substrate_value::UniversalValue;

use crate::collaborator::collaborator_module;

collaborator_module! {
    trait WorkflowCollaborator;
    stub StubWorkflowCollaborator;
    module_name = "workflow";
    functions {
        create("create a workflow from a step definition", Some(2), false),
        destroy("destroy a workflow definition", Some(1), false),
        add_step("append a step to an existing workflow", Some(2), false),
        remove_step("remove a step from an existing workflow", Some(2), false),
        execute("run a workflow synchronously against an input object", Some(2), false),
        execute_async("start a workflow run without blocking, returning a handle to await later", Some(2), false),
        pause("pause a running workflow", Some(1), false),
        resume("resume a paused workflow", Some(1), false),
        cancel("cancel a running workflow", Some(1), false),
        status("fetch a workflow run's current state", Some(1), true),
        steps("list a workflow's steps in execution order", Some(1), true),
        results("fetch the results a finished workflow run produced", Some(1), true),
        list("list every workflow the host currently knows about", Some(0), true),
        validate("validate a workflow definition without creating it", Some(1), true),
        visualize("render a workflow's step graph for display", Some(1), true),
    }
}

const STATE_PENDING: &str = "pending";
const STATE_RUNNING: &str = "running";
const STATE_PAUSED: &str = "paused";
const STATE_COMPLETED: &str = "completed";
const STATE_FAILED: &str = "failed";
const STATE_CANCELLED: &str = "cancelled";

pub fn build_module(collaborator: Arc<dyn WorkflowCollaborator>) -> Module {
    let module = Module::new("workflow", "1.0.0", "defining, running, and supervising host-defined workflows");
    wire_collaborator_functions(module, collaborator)
        .with_constant(ConstantDef { name: "STATE_PENDING".to_string(), value: UniversalValue::from(STATE_PENDING) })
        .with_constant(ConstantDef { name: "STATE_RUNNING".to_string(), value: UniversalValue::from(STATE_RUNNING) })
        .with_constant(ConstantDef { name: "STATE_PAUSED".to_string(), value: UniversalValue::from(STATE_PAUSED) })
        .with_constant(ConstantDef {
            name: "STATE_COMPLETED".to_string(),
            value: UniversalValue::from(STATE_COMPLETED),
        })
        .with_constant(ConstantDef { name: "STATE_FAILED".to_string(), value: UniversalValue::from(STATE_FAILED) })
        .with_constant(ConstantDef {
            name: "STATE_CANCELLED".to_string(),
            value: UniversalValue::from(STATE_CANCELLED),
        })
}
