use std::sync::Arc;

use substrate_engine::FunctionDef;
use substrate_error::{ErrorKind, ScriptError};
use substrate_value::UniversalValue;

/// Shorthand for the error every `Stub*Collaborator` returns: the module
/// is installed and callable, but the host application has not wired a
/// real collaborator behind it yet. Distinct from a missing module
/// (which is [`ErrorKind::Runtime`] at the `ModuleTable` level) — here
/// the module exists and the function exists, only the backing
/// subsystem is absent.
pub fn not_wired_up(module: &str, operation: &str) -> ScriptError {
    ScriptError::new(
        ErrorKind::Runtime,
        format!("'{module}.{operation}' has no collaborator wired up in this host"),
    )
}

/// Pulls a required string argument out of a function call's argument
/// slice, with a uniform error shape across every module.
pub fn expect_str(args: &[substrate_value::UniversalValue], index: usize, name: &str) -> Result<String, ScriptError> {
    match args.get(index) {
        Some(substrate_value::UniversalValue::Str(bytes)) => Ok(String::from_utf8_lossy(bytes).into_owned()),
        Some(_) => Err(ScriptError::new(ErrorKind::Type, format!("argument '{name}' must be a string"))),
        None => Err(ScriptError::new(ErrorKind::MissingField, format!("missing argument '{name}'"))),
    }
}

pub fn expect_object(
    args: &[substrate_value::UniversalValue],
    index: usize,
    name: &str,
) -> Result<indexmap::IndexMap<String, substrate_value::UniversalValue>, ScriptError> {
    match args.get(index) {
        Some(substrate_value::UniversalValue::Object(fields)) => Ok(fields.clone()),
        Some(_) => Err(ScriptError::new(ErrorKind::Type, format!("argument '{name}' must be an object"))),
        None => Err(ScriptError::new(ErrorKind::MissingField, format!("missing argument '{name}'"))),
    }
}

/// Builds one [`FunctionDef`] from a name/description/arity and a
/// closure with the uniform `(args) -> Result<Vec<UniversalValue>,
/// ScriptError>` shape every collaborator-backed module function uses
/// here. Most of these modules expose several dozen call-throughs to a
/// single trait method apiece; this keeps that wiring to one line per
/// function instead of a full struct literal.
pub fn forward(
    name: &'static str,
    description: &'static str,
    arity: Option<usize>,
    side_effect_free: bool,
    f: impl Fn(&[UniversalValue]) -> Result<Vec<UniversalValue>, ScriptError> + Send + Sync + 'static,
) -> FunctionDef {
    FunctionDef {
        name: name.to_string(),
        description: description.to_string(),
        arity,
        side_effect_free,
        stack_hint: None,
        callback: Arc::new(f),
    }
}

/// Declares a collaborator trait, its stub, and the plumbing that wires
/// each trait method straight through to a guest-visible function of the
/// same name. Every function here takes and returns the raw argument
/// slice — the real decoding lives on the host's collaborator
/// implementation, not in this crate — which is what lets a whole
/// module's worth of pass-through functions be declared as one list
/// instead of a hand-written `FunctionDef` per entry.
///
/// Expands to a `trait $collab`, a unit-struct `$stub` implementing it
/// (every method returns [`not_wired_up`]), and a private
/// `wire_collaborator_functions(module, collaborator)` helper a module's
/// own `build_module` calls to attach the generated functions before
/// chaining on anything bespoke (validation-before-dispatch, constants,
/// pure-logic functions).
macro_rules! collaborator_module {
    (
        trait $collab:ident;
        stub $stub:ident;
        module_name = $module_name:literal;
        functions { $( $name:ident($desc:literal, $arity:expr, $sef:expr) ),* $(,)? }
    ) => {
        pub trait $collab: Send + Sync {
            $(
                fn $name(
                    &self,
                    args: &[substrate_value::UniversalValue],
                ) -> Result<Vec<substrate_value::UniversalValue>, substrate_error::ScriptError>;
            )*
        }

        pub struct $stub;

        impl $collab for $stub {
            $(
                fn $name(
                    &self,
                    _args: &[substrate_value::UniversalValue],
                ) -> Result<Vec<substrate_value::UniversalValue>, substrate_error::ScriptError> {
                    Err($crate::collaborator::not_wired_up($module_name, stringify!($name)))
                }
            )*
        }

        fn wire_collaborator_functions(
            mut module: substrate_engine::Module,
            collaborator: std::sync::Arc<dyn $collab>,
        ) -> substrate_engine::Module {
            $(
                {
                    let c = collaborator.clone();
                    module = module.with_function($crate::collaborator::forward(
                        stringify!($name),
                        $desc,
                        $arity,
                        $sef,
                        move |args| c.$name(args),
                    ));
                }
            )*
            module
        }
    };
}

pub(crate) use collaborator_module;
