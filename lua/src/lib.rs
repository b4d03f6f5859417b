//! `substrate-lua` — the concrete engine implementation backed by
//! `mlua`'s vendored Lua 5.4, plus the value bridge and sandbox
//! environment wiring specific to it.

mod bridge;
mod lua_engine;
mod sandbox_env;
mod value_convert;

pub use bridge::LuaValueBridge;
pub use lua_engine::LuaEngine;
pub use sandbox_env::{apply_limits, check_module_allowed};
pub use value_convert::{map_lua_error, pull_results, pull_value, push_args, push_value};
