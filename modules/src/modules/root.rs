use std::sync::Arc;

use indexmap::IndexMap;
use substrate_engine::{FunctionDef, Module, ModuleTable};
use substrate_error::ScriptError;
use substrate_value::UniversalValue;

use crate::collaborator::expect_str;

pub type MetricsProvider = Arc<dyn Fn() -> IndexMap<String, UniversalValue> + Send + Sync>;

/// Root-level introspection utilities. Unlike every other module here,
/// these are fully implemented against data this crate already owns
/// (the module table, the engine's name, whatever metrics the host
/// chooses to surface) rather than stubbed out behind a collaborator.
pub fn build_module(module_table: Arc<ModuleTable>, engine_name: String, metrics: MetricsProvider) -> Module {
    let help_table = module_table.clone();
    let modules_table = module_table.clone();
    let info_table = module_table;
    let info_engine_name = engine_name;

    Module::new("root", "1.0.0", "introspection utilities available without any module installed")
        .with_function(FunctionDef {
            name: "help".to_string(),
            description: "describe a module, or list every registered module if called with no argument".to_string(),
            arity: None,
            side_effect_free: true,
            stack_hint: None,
            callback: Arc::new(move |args| {
                if args.is_empty() {
                    let names = help_table.names();
                    return Ok(vec![UniversalValue::Array(names.into_iter().map(UniversalValue::from).collect())]);
                }
                let name = expect_str(args, 0, "module_name")?;
                let module = help_table.get(&name).ok_or_else(|| {
                    ScriptError::new(substrate_error::ErrorKind::Runtime, format!("module '{name}' is not registered"))
                })?;
                let mut fields = IndexMap::new();
                fields.insert("name".to_string(), UniversalValue::from(module.name.clone()));
                fields.insert("version".to_string(), UniversalValue::from(module.version.clone()));
                fields.insert("description".to_string(), UniversalValue::from(module.description.clone()));
                fields.insert(
                    "functions".to_string(),
                    UniversalValue::Array(
                        module
                            .functions
                            .iter()
                            .map(|f| {
                                let mut entry = IndexMap::new();
                                entry.insert("name".to_string(), UniversalValue::from(f.name.clone()));
                                entry.insert("description".to_string(), UniversalValue::from(f.description.clone()));
                                UniversalValue::Object(entry)
                            })
                            .collect(),
                    ),
                );
                Ok(vec![UniversalValue::Object(fields)])
            }),
        })
        .with_function(FunctionDef {
            name: "modules".to_string(),
            description: "list every registered module name, and whether it is installed".to_string(),
            arity: Some(0),
            side_effect_free: true,
            stack_hint: None,
            callback: Arc::new(move |_args| {
                let rows = modules_table
                    .names()
                    .into_iter()
                    .map(|name| {
                        let installed = modules_table.is_installed(&name);
                        let mut fields = IndexMap::new();
                        fields.insert("name".to_string(), UniversalValue::from(name));
                        fields.insert("installed".to_string(), UniversalValue::Bool(installed));
                        UniversalValue::Object(fields)
                    })
                    .collect();
                Ok(vec![UniversalValue::Array(rows)])
            }),
        })
        .with_function(FunctionDef {
            name: "info".to_string(),
            description: "report the active engine name and module count".to_string(),
            arity: Some(0),
            side_effect_free: true,
            stack_hint: None,
            callback: Arc::new(move |_args| {
                let mut fields = IndexMap::new();
                fields.insert("engine".to_string(), UniversalValue::from(info_engine_name.clone()));
                fields.insert(
                    "module_count".to_string(),
                    UniversalValue::Int(info_table.names().len() as i64),
                );
                Ok(vec![UniversalValue::Object(fields)])
            }),
        })
        .with_function(FunctionDef {
            name: "metrics".to_string(),
            description: "report host-supplied runtime metrics (memory, calls, etc.)".to_string(),
            arity: Some(0),
            side_effect_free: true,
            stack_hint: None,
            callback: Arc::new(move |_args| Ok(vec![UniversalValue::Object(metrics())])),
        })
}
