use std::sync::Arc;

use substrate_engine::{ConstantDef, Module};
use substrate_value::UniversalValue;

use crate::collaborator::collaborator_module;

collaborator_module! {
    trait SchemaCollaborator;
    stub StubSchemaCollaborator;
    module_name = "schema";
    functions {
        create("create a schema from a structured definition object", Some(2), false),
        create_from_string("create a schema by parsing a definition string", Some(2), false),
        validate("check a value against a named schema", Some(2), true),
        validate_with_details("check a value against a named schema, returning per-field errors", Some(2), true),
        compile("pre-compile a schema's validators for repeated use", Some(1), false),
        destroy("remove a previously created schema", Some(1), false),
        merge("merge two schemas into a new combined schema", Some(2), false),
        extend("extend an existing schema with additional fields", Some(2), false),
        list("list every schema the host currently knows about", Some(0), true),
        get("fetch a single schema's definition by name", Some(1), true),
        generate_from_data("infer a schema from a sample value", Some(1), true),
        generate_from_type("generate a schema from a host-known type name", Some(1), true),
        coerce("coerce a value's fields to match a schema's declared types", Some(2), true),
        defaults("fetch the default value a schema declares for each field", Some(1), true),
        strip("drop fields from a value that are not present in a schema", Some(2), true),
        diff("diff two schemas, reporting added/removed/changed fields", Some(2), true),
        parse_structured("parse text into a value validated against a named schema", Some(2), true),
        extract_json("extract and parse the first JSON value embedded in text", Some(1), true),
        validate_partial("check a value against a named schema, ignoring missing fields", Some(2), true),
        builtins("list the host's built-in schema names", Some(0), true),
    }
}

const TYPE_STRING: &str = "string";
const TYPE_INTEGER: &str = "integer";
const TYPE_FLOAT: &str = "float";
const TYPE_BOOLEAN: &str = "boolean";
const TYPE_OBJECT: &str = "object";
const TYPE_ARRAY: &str = "array";
const FORMAT_JSON_SCHEMA: &str = "json_schema";
const FORMAT_STRUCT: &str = "struct";

pub fn build_module(collaborator: Arc<dyn SchemaCollaborator>) -> Module {
    let module = Module::new("schema", "1.0.0", "defining and validating values against host-registered schemas");
    wire_collaborator_functions(module, collaborator)
        .with_constant(ConstantDef { name: "TYPE_STRING".to_string(), value: UniversalValue::from(TYPE_STRING) })
        .with_constant(ConstantDef { name: "TYPE_INTEGER".to_string(), value: UniversalValue::from(TYPE_INTEGER) })
        .with_constant(ConstantDef { name: "TYPE_FLOAT".to_string(), value: UniversalValue::from(TYPE_FLOAT) })
        .with_constant(ConstantDef { name: "TYPE_BOOLEAN".to_string(), value: UniversalValue::from(TYPE_BOOLEAN) })
        .with_constant(ConstantDef { name: "TYPE_OBJECT".to_string(), value: UniversalValue::from(TYPE_OBJECT) })
        .with_constant(ConstantDef { name: "TYPE_ARRAY".to_string(), value: UniversalValue::from(TYPE_ARRAY) })
        .with_constant(ConstantDef {
            name: "FORMAT_JSON_SCHEMA".to_string(),
            value: UniversalValue::from(FORMAT_JSON_SCHEMA),
        })
        .with_constant(ConstantDef { name: "FORMAT_STRUCT".to_string(), value: UniversalValue::from(FORMAT_STRUCT) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use substrate_error::ErrorKind;

    #[test]
    fn stub_reports_not_wired_up() {
        let err = StubSchemaCollaborator.validate(&[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Runtime);
    }

    #[test]
    fn module_exposes_every_expected_function() {
        let module = build_module(Arc::new(StubSchemaCollaborator));
        for name in [
            "create",
            "create_from_string",
            "validate",
            "validate_with_details",
            "compile",
            "destroy",
            "merge",
            "extend",
            "list",
            "get",
            "generate_from_data",
            "generate_from_type",
            "coerce",
            "defaults",
            "strip",
            "diff",
            "parse_structured",
            "extract_json",
            "validate_partial",
            "builtins",
        ] {
            assert!(module.find_function(name).is_some(), "missing {name}");
        }
    }

    #[test]
    fn module_exposes_type_and_format_constants() {
        let module = build_module(Arc::new(StubSchemaCollaborator));
        assert_eq!(module.constants.len(), 8);
    }
}
