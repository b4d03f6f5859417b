//! `substrate-value` — the Universal Value tagged sum and the bridge
//! contract that pushes/pulls it across a guest runtime's evaluation stack.
//!
//! This crate is engine-agnostic: it knows nothing about Lua, wasmtime, or
//! any other concrete guest. `substrate-lua` provides the [`ValueBridge`]
//! implementation over `mlua`.

mod bridge;
mod marshal;
mod nil;
mod uv;

pub use bridge::{BridgeError, StackIndex, ValueBridge};
pub use marshal::{FromUniversalValue, MarshalError, MarshalOptions, FieldNameTransform, ToUniversalValue};
pub use nil::{should_treat_as_nil, NilPolicy};
pub use uv::{FunctionHandle, UniversalValue, UserDataHandle};
