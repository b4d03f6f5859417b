use std::collections::HashMap;

use mlua::Lua;
use parking_lot::Mutex;
use substrate_value::{BridgeError, NilPolicy, StackIndex, UniversalValue, ValueBridge};

use crate::value_convert::{pull_value, push_value};

/// [`ValueBridge`] implementation over `mlua::Lua`.
///
/// mlua's safe API has no literal indexed stack the way the raw Lua C
/// API does — values are pushed and read back through typed handles
/// instead. This bridge keeps a small staging table keyed by
/// [`StackIndex`] so callers written against the generic `ValueBridge`
/// contract (indexed push/pull) still work; the concrete engine's own
/// `GuestHandle`/`Engine` methods bypass this staging table entirely and
/// convert values directly, since they already know their call shape.
pub struct LuaValueBridge<'a> {
    lua: &'a Lua,
    staging: Mutex<HashMap<i32, mlua::Value>>,
    next_index: Mutex<i32>,
}

impl<'a> LuaValueBridge<'a> {
    pub fn new(lua: &'a Lua) -> Self {
        Self {
            lua,
            staging: Mutex::new(HashMap::new()),
            next_index: Mutex::new(1),
        }
    }
}

impl ValueBridge for LuaValueBridge<'_> {
    fn push(&self, value: &UniversalValue) -> Result<(), BridgeError> {
        let lua_value = push_value(self.lua, value).map_err(|err| {
            BridgeError::ConversionError(StackIndex(0), err.to_string())
        })?;
        let mut next_index = self.next_index.lock();
        let index = *next_index;
        *next_index += 1;
        self.staging.lock().insert(index, lua_value);
        Ok(())
    }

    fn pull(&self, index: StackIndex, policy: NilPolicy) -> Result<UniversalValue, BridgeError> {
        let staging = self.staging.lock();
        let lua_value = if index == StackIndex::TOP {
            let max_index = staging.keys().copied().max();
            max_index.and_then(|k| staging.get(&k))
        } else {
            staging.get(&index.0)
        };
        let lua_value = lua_value.ok_or(BridgeError::ConversionError(index, "no staged value at index".to_string()))?;
        pull_value(lua_value, policy).map_err(|err| BridgeError::ConversionError(index, err.to_string()))
    }
}
