use mlua::Lua;
use substrate_error::{ErrorKind, ScriptError};
use substrate_sandbox::Limits;

use crate::value_convert::map_lua_error;

/// Builds the capability-gated base environment for a tenant: every
/// denied global is replaced with a trap function that raises
/// [`ErrorKind::SecurityViolation`] the moment a script touches it,
/// rather than leaving it reachable as plain `nil` (which a script could
/// mistake for "not installed yet" and retry around).
pub fn apply_limits(lua: &Lua, limits: &Limits) -> Result<(), ScriptError> {
    let globals = lua.globals();
    for name in limits.effective_denied_globals() {
        let trap_name = name.clone();
        let trap = lua
            .create_function(move |_, ()| -> mlua::Result<()> {
                Err(mlua::Error::RuntimeError(format!(
                    "capability denied: '{trap_name}' is not available to this tenant"
                )))
            })
            .map_err(map_lua_error)?;
        globals.set(name.as_str(), trap).map_err(map_lua_error)?;
    }

    if !limits.allow_metatables {
        let trap = lua
            .create_function(|_, ()| -> mlua::Result<()> {
                Err(mlua::Error::RuntimeError(
                    "capability denied: 'setmetatable' is not available to this tenant".to_string(),
                ))
            })
            .map_err(map_lua_error)?;
        globals.set("setmetatable", trap).map_err(map_lua_error)?;
    }

    Ok(())
}

/// Returns [`ErrorKind::SecurityViolation`] if `module_name` is not on
/// the tenant's module allowlist, ahead of actually installing it.
pub fn check_module_allowed(limits: &Limits, module_name: &str) -> Result<(), ScriptError> {
    if limits.is_module_allowed(module_name) {
        Ok(())
    } else {
        Err(ScriptError::new(
            ErrorKind::SecurityViolation,
            format!("module '{module_name}' is not on this tenant's allowlist"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denied_global_traps_on_call() {
        let lua = Lua::new();
        apply_limits(&lua, &Limits::default()).unwrap();
        let err = lua.load("return io.open('/etc/passwd')").exec().unwrap_err();
        assert!(err.to_string().contains("capability denied"));
    }

    #[test]
    fn denied_global_classifies_as_capability_error() {
        let lua = Lua::new();
        apply_limits(&lua, &Limits::default()).unwrap();
        let err = lua.load("return io.open('/etc/passwd')").exec().unwrap_err();
        assert_eq!(crate::map_lua_error(err).kind(), ErrorKind::Capability);
    }

    #[test]
    fn allowed_globals_remain_untouched() {
        let lua = Lua::new();
        apply_limits(&lua, &Limits::default()).unwrap();
        lua.load("return 1 + 1").exec().unwrap();
    }

    #[test]
    fn module_allowlist_rejects_unlisted_module() {
        let mut limits = Limits::default();
        limits.allowed_modules.insert("agent".to_string());
        let err = check_module_allowed(&limits, "tool").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SecurityViolation);
    }
}
