use std::sync::Arc;

use substrate_engine::{ConstantDef, Module};
use substrate_value::UniversalValue;

use crate::collaborator::collaborator_module;

collaborator_module! {
    trait ProviderCollaborator;
    stub StubProviderCollaborator;
    module_name = "provider";
    functions {
        list("list every LLM provider registered with the host", Some(0), true),
        register("register a provider under a name with its connection config", Some(2), false),
        unregister("remove a previously registered provider", Some(1), false),
        capabilities("fetch the capabilities a provider advertises (streaming, tools, vision, ...)", Some(1), true),
        models("list the models a provider exposes", Some(1), true),
        complete("request a completion from a named provider", Some(2), false),
        complete_async("request a completion without blocking, returning a handle to await later", Some(2), false),
        stream("request a streaming completion, invoking a callback per chunk", Some(3), false),
        validate_api_key("check whether an API key is accepted by a provider", Some(2), true),
        usage("fetch a provider's accumulated token/cost usage", Some(1), true),
        rate_limits("fetch a provider's current rate-limit state", Some(1), true),
        set_default("set the provider used when a script names none explicitly", Some(1), false),
        get_default("fetch the name of the current default provider", Some(0), true),
        test_connection("perform a lightweight connectivity check against a provider", Some(1), true),
        metadata("fetch a provider's descriptive metadata", Some(1), true),
    }
}

const TYPE_CHAT: &str = "chat";
const TYPE_EMBEDDING: &str = "embedding";
const TYPE_IMAGE: &str = "image";
const MODEL_DEFAULT_CHAT: &str = "gpt-4o-mini";
const MODEL_DEFAULT_EMBEDDING: &str = "text-embedding-3-small";

pub fn build_module(collaborator: Arc<dyn ProviderCollaborator>) -> Module {
    let module = Module::new("provider", "1.0.0", "registering, configuring, and invoking host LLM providers");
    wire_collaborator_functions(module, collaborator)
        .with_constant(ConstantDef { name: "TYPE_CHAT".to_string(), value: UniversalValue::from(TYPE_CHAT) })
        .with_constant(ConstantDef { name: "TYPE_EMBEDDING".to_string(), value: UniversalValue::from(TYPE_EMBEDDING) })
        .with_constant(ConstantDef { name: "TYPE_IMAGE".to_string(), value: UniversalValue::from(TYPE_IMAGE) })
        .with_constant(ConstantDef {
            name: "MODEL_DEFAULT_CHAT".to_string(),
            value: UniversalValue::from(MODEL_DEFAULT_CHAT),
        })
        .with_constant(ConstantDef {
            name: "MODEL_DEFAULT_EMBEDDING".to_string(),
            value: UniversalValue::from(MODEL_DEFAULT_EMBEDDING),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use substrate_error::ErrorKind;

    #[test]
    fn stub_reports_not_wired_up() {
        let err = StubProviderCollaborator.models(&[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Runtime);
    }

    #[test]
    fn module_exposes_every_expected_function() {
        let module = build_module(Arc::new(StubProviderCollaborator));
        for name in [
            "list",
            "register",
            "unregister",
            "capabilities",
            "models",
            "complete",
            "complete_async",
            "stream",
            "validate_api_key",
            "usage",
            "rate_limits",
            "set_default",
            "get_default",
            "test_connection",
            "metadata",
        ] {
            assert!(module.find_function(name).is_some(), "missing {name}");
        }
    }

    #[test]
    fn module_exposes_type_and_model_constants() {
        let module = build_module(Arc::new(StubProviderCollaborator));
        assert_eq!(module.constants.len(), 5);
    }
}
