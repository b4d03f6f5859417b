use std::sync::Arc;

use substrate_engine::{ConstantDef, Module};
use substrate_value::UniversalValue;

use crate::collaborator::collaborator_module;

collaborator_module! {
    trait MemoryCollaborator;
    stub StubMemoryCollaborator;
    module_name = "memory";
    functions {
        create("create a named memory store with a config object", Some(2), false),
        destroy("destroy a memory store and release its resources", Some(1), false),
        add("append a single entry to a memory store", Some(2), false),
        add_batch("append an array of entries to a memory store in one call", Some(2), false),
        get("read a single entry from a memory store by key", Some(2), true),
        get_last("fetch the last n entries added to a memory store", Some(2), true),
        get_by_role("fetch every entry in a memory store matching a role", Some(2), true),
        search("search a memory store's entries for a query", Some(2), true),
        clear("remove every entry from a memory store", Some(1), false),
        truncate("drop a memory store's oldest entries down to a maximum count", Some(2), false),
        size("fetch the number of entries a memory store holds", Some(1), true),
        token_count("fetch a memory store's total token count", Some(1), true),
        summarize("summarize a memory store's entries into a condensed form", Some(1), false),
        export("export a memory store's entries in a given format", Some(2), true),
        import("import entries into a memory store from data in a given format", Some(3), false),
        merge("merge one memory store's entries into another", Some(2), false),
        fork("create an independent copy of a memory store", Some(1), false),
        snapshot("capture a memory store's current state for later restore", Some(1), true),
        restore("restore a memory store from a previously captured snapshot", Some(2), false),
        list("list every memory store the host currently knows about", Some(0), true),
        set_limit("set a memory store's maximum size or token budget", Some(2), false),
        optimize("compact or reorganize a memory store's internal storage", Some(1), false),
    }
}

const TYPE_CONVERSATION: &str = "conversation";
const TYPE_VECTOR: &str = "vector";
const TYPE_KEY_VALUE: &str = "key_value";
const ROLE_SYSTEM: &str = "system";
const ROLE_USER: &str = "user";
const ROLE_ASSISTANT: &str = "assistant";
const ROLE_TOOL: &str = "tool";
const FORMAT_JSON: &str = "json";
const FORMAT_MARKDOWN: &str = "markdown";

pub fn build_module(collaborator: Arc<dyn MemoryCollaborator>) -> Module {
    let module = Module::new("memory", "1.0.0", "creating, reading, and maintaining host-backed memory stores");
    wire_collaborator_functions(module, collaborator)
        .with_constant(ConstantDef {
            name: "TYPE_CONVERSATION".to_string(),
            value: UniversalValue::from(TYPE_CONVERSATION),
        })
        .with_constant(ConstantDef { name: "TYPE_VECTOR".to_string(), value: UniversalValue::from(TYPE_VECTOR) })
        .with_constant(ConstantDef {
            name: "TYPE_KEY_VALUE".to_string(),
            value: UniversalValue::from(TYPE_KEY_VALUE),
        })
        .with_constant(ConstantDef { name: "ROLE_SYSTEM".to_string(), value: UniversalValue::from(ROLE_SYSTEM) })
        .with_constant(ConstantDef { name: "ROLE_USER".to_string(), value: UniversalValue::from(ROLE_USER) })
        .with_constant(ConstantDef {
            name: "ROLE_ASSISTANT".to_string(),
            value: UniversalValue::from(ROLE_ASSISTANT),
        })
        .with_constant(ConstantDef { name: "ROLE_TOOL".to_string(), value: UniversalValue::from(ROLE_TOOL) })
        .with_constant(ConstantDef { name: "FORMAT_JSON".to_string(), value: UniversalValue::from(FORMAT_JSON) })
        .with_constant(ConstantDef {
            name: "FORMAT_MARKDOWN".to_string(),
            value: UniversalValue::from(FORMAT_MARKDOWN),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use substrate_error::ErrorKind;

    #[test]
    fn stub_reports_not_wired_up() {
        let err = StubMemoryCollaborator.get(&[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Runtime);
    }

    #[test]
    fn module_exposes_every_expected_function() {
        let module = build_module(Arc::new(StubMemoryCollaborator));
        for name in [
            "create",
            "destroy",
            "add",
            "add_batch",
            "get",
            "get_last",
            "get_by_role",
            "search",
            "clear",
            "truncate",
            "size",
            "token_count",
            "summarize",
            "export",
            "import",
            "merge",
            "fork",
            "snapshot",
            "restore",
            "list",
            "set_limit",
            "optimize",
        ] {
            assert!(module.find_function(name).is_some(), "missing {name}");
        }
    }

    #[test]
    fn module_exposes_type_role_and_format_constants() {
        let module = build_module(Arc::new(StubMemoryCollaborator));
        assert_eq!(module.constants.len(), 9);
    }
}
