use indexmap::IndexMap;
use mlua::{Lua, MultiValue, Value as LuaValue, Variadic};
use substrate_error::{ErrorKind, ScriptError};
use substrate_value::{FunctionHandle, NilPolicy, UniversalValue};

/// Converts a [`UniversalValue`] into an `mlua::Value` owned by `lua`.
///
/// `Function` values cannot be reconstructed from a bare handle (mlua
/// registry keys are not portable across `Lua` instances); callers that
/// need to push a live guest function back into the same `Lua` it came
/// from should keep the original `mlua::Function` around instead of
/// round-tripping it through [`UniversalValue::Function`].
pub fn push_value(lua: &Lua, value: &UniversalValue) -> Result<LuaValue, ScriptError> {
    let lua_value = match value {
        UniversalValue::Nil => LuaValue::Nil,
        UniversalValue::Bool(b) => LuaValue::Boolean(*b),
        UniversalValue::Int(i) => LuaValue::Integer(*i),
        UniversalValue::Float(f) => LuaValue::Number(*f),
        UniversalValue::Str(bytes) => LuaValue::String(lua.create_string(bytes).map_err(map_lua_error)?),
        UniversalValue::Array(items) => {
            let table = lua.create_table().map_err(map_lua_error)?;
            for (i, item) in items.iter().enumerate() {
                table.set(i + 1, push_value(lua, item)?).map_err(map_lua_error)?;
            }
            LuaValue::Table(table)
        }
        UniversalValue::Object(fields) => {
            let table = lua.create_table().map_err(map_lua_error)?;
            for (key, item) in fields {
                table.set(key.as_str(), push_value(lua, item)?).map_err(map_lua_error)?;
            }
            LuaValue::Table(table)
        }
        UniversalValue::Function(_) => {
            return Err(ScriptError::new(
                ErrorKind::ConversionError,
                "cannot materialize a bare function handle into a live Lua function",
            ))
        }
        UniversalValue::UserData(_) => {
            return Err(ScriptError::new(
                ErrorKind::ConversionError,
                "userdata handles must be resolved through the userdata registry, not pushed directly",
            ))
        }
    };
    Ok(lua_value)
}

/// Converts an `mlua::Value` into a [`UniversalValue`], applying `policy`
/// to decide whether a Lua-falsy value (depending on policy) should
/// collapse to [`UniversalValue::Nil`].
pub fn pull_value(value: &LuaValue, policy: NilPolicy) -> Result<UniversalValue, ScriptError> {
    let uv = match value {
        LuaValue::Nil => UniversalValue::Nil,
        LuaValue::Boolean(b) => UniversalValue::Bool(*b),
        LuaValue::Integer(i) => UniversalValue::Int(*i),
        LuaValue::Number(n) => UniversalValue::Float(*n),
        LuaValue::String(s) => UniversalValue::Str(s.as_bytes().to_vec()),
        LuaValue::Table(table) => {
            if is_array_like(table) {
                let mut items = Vec::new();
                for pair in table.clone().sequence_values::<LuaValue>() {
                    let item = pair.map_err(map_lua_error)?;
                    items.push(pull_value(&item, policy)?);
                }
                UniversalValue::Array(items)
            } else {
                let mut fields = IndexMap::new();
                for pair in table.clone().pairs::<String, LuaValue>() {
                    let (key, item) = pair.map_err(map_lua_error)?;
                    fields.insert(key, pull_value(&item, policy)?);
                }
                UniversalValue::Object(fields)
            }
        }
        LuaValue::Function(f) => UniversalValue::Function(FunctionHandle(function_identity(f))),
        LuaValue::Thread(_) => {
            return Err(ScriptError::new(
                ErrorKind::ConversionError,
                "coroutines cannot cross the value bridge",
            ))
        }
        LuaValue::UserData(_) | LuaValue::LightUserData(_) => {
            return Err(ScriptError::new(
                ErrorKind::ConversionError,
                "raw Lua userdata must be registered through the userdata registry before crossing the bridge",
            ))
        }
        LuaValue::Error(err) => {
            return Err(ScriptError::new(ErrorKind::Runtime, err.to_string()))
        }
    };
    // `policy` deliberately does not affect this scalar-by-scalar
    // conversion: should_treat_as_nil is only ever consulted by guest-table
    // lookup call sites deciding a missing-key-versus-explicit-nil
    // question, never here (see substrate_value::should_treat_as_nil docs).
    let _ = policy;
    Ok(uv)
}

/// Heuristic matching the data model's array/object split: a table is
/// array-like if its integer keys form a contiguous `1..=n` run with no
/// other keys present.
fn is_array_like(table: &mlua::Table) -> bool {
    let len = table.raw_len();
    if len == 0 {
        return table.pairs::<LuaValue, LuaValue>().next().is_none();
    }
    table.clone().pairs::<LuaValue, LuaValue>().count() as i64 == len
}

fn function_identity(f: &mlua::Function) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    f.to_pointer().hash(&mut hasher);
    hasher.finish()
}

pub fn map_lua_error(err: mlua::Error) -> ScriptError {
    let message = err.to_string();
    let kind = match &err {
        mlua::Error::SyntaxError { .. } => ErrorKind::Syntax,
        mlua::Error::MemoryError(_) => ErrorKind::MemoryLimit,
        mlua::Error::StackError => ErrorKind::StackOverflow,
        // The sandbox's capability traps (see sandbox_env::apply_limits) raise a
        // plain `RuntimeError` tagged with this prefix, since mlua gives third-party
        // code no structured channel for a Rust-side closure to hand back a typed
        // error kind through a guest-triggered call.
        _ if message.starts_with("capability denied:") => ErrorKind::Capability,
        mlua::Error::CoroutineInactive | mlua::Error::RuntimeError(_) => ErrorKind::Runtime,
        _ => ErrorKind::Runtime,
    };
    ScriptError::new(kind, message)
}

pub fn push_args(lua: &Lua, args: &[UniversalValue]) -> Result<MultiValue, ScriptError> {
    let mut values = Variadic::new();
    for arg in args {
        values.push(push_value(lua, arg)?);
    }
    Ok(MultiValue::from_vec(values.to_vec()))
}

pub fn pull_results(values: MultiValue, policy: NilPolicy) -> Result<Vec<UniversalValue>, ScriptError> {
    values.into_iter().map(|v| pull_value(&v, policy)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_round_trip() {
        let lua = Lua::new();
        for value in [
            UniversalValue::Nil,
            UniversalValue::Bool(true),
            UniversalValue::Int(7),
            UniversalValue::Float(2.5),
        ] {
            let pushed = push_value(&lua, &value).unwrap();
            let pulled = pull_value(&pushed, NilPolicy::Strict).unwrap();
            assert_eq!(pulled, value);
        }
    }

    #[test]
    fn array_round_trips_as_array() {
        let lua = Lua::new();
        let value = UniversalValue::Array(vec![UniversalValue::Int(1), UniversalValue::Int(2)]);
        let pushed = push_value(&lua, &value).unwrap();
        let pulled = pull_value(&pushed, NilPolicy::Strict).unwrap();
        assert_eq!(pulled, value);
    }

    #[test]
    fn object_round_trips_as_object() {
        let lua = Lua::new();
        let mut fields = IndexMap::new();
        fields.insert("name".to_string(), UniversalValue::from("Ada"));
        let value = UniversalValue::Object(fields);
        let pushed = push_value(&lua, &value).unwrap();
        let pulled = pull_value(&pushed, NilPolicy::Strict).unwrap();
        assert_eq!(pulled, value);
    }

    #[test]
    fn bare_function_handle_cannot_be_pushed() {
        let lua = Lua::new();
        let err = push_value(&lua, &UniversalValue::Function(FunctionHandle(1))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConversionError);
    }
}
