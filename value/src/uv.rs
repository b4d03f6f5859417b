use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// An opaque handle to a guest-side callable.
///
/// Holding a `FunctionHandle` pins the guest function in place (the
/// concrete bridge implementation is responsible for the strong
/// reference); dropping the last handle releases the guest-side pin.
/// The inner id is assigned by the bridge and has no meaning outside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionHandle(pub u64);

/// A type-tagged, generation-checked reference into the userdata registry.
///
/// `generation` is the arena-slot generation at the time the handle was
/// issued; a stale handle (its slot has since been freed and reused)
/// fails the registry's generation compare instead of touching freed
/// memory — this realizes the "32-bit magic prefix" check from the data
/// model without a raw pointer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserDataHandle {
    pub index: u32,
    pub generation: u32,
    pub type_name: Arc<str>,
}

/// The substrate's tagged sum carrying values across the host/guest
/// boundary. See the data model section of the specification for the
/// case-by-case semantics.
#[derive(Debug, Clone, PartialEq)]
pub enum UniversalValue {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Vec<u8>),
    Array(Vec<UniversalValue>),
    Object(IndexMap<String, UniversalValue>),
    Function(FunctionHandle),
    UserData(UserDataHandle),
}

impl UniversalValue {
    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    /// Recursive depth used to bound struct-marshalling and snapshot
    /// serialization (`max_depth`). A scalar has depth 1.
    pub fn depth(&self) -> usize {
        match self {
            Self::Array(items) => 1 + items.iter().map(UniversalValue::depth).max().unwrap_or(0),
            Self::Object(fields) => {
                1 + fields.values().map(UniversalValue::depth).max().unwrap_or(0)
            }
            _ => 1,
        }
    }

    /// True for the subset the snapshot manager can serialize: nil, bool,
    /// int, float, string, and arrays/objects composed entirely of those.
    pub fn is_serializable(&self) -> bool {
        match self {
            Self::Nil | Self::Bool(_) | Self::Int(_) | Self::Float(_) | Self::Str(_) => true,
            Self::Array(items) => items.iter().all(UniversalValue::is_serializable),
            Self::Object(fields) => fields.values().all(UniversalValue::is_serializable),
            Self::Function(_) | Self::UserData(_) => false,
        }
    }
}

impl From<bool> for UniversalValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for UniversalValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for UniversalValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<String> for UniversalValue {
    fn from(value: String) -> Self {
        Self::Str(value.into_bytes())
    }
}

impl From<&str> for UniversalValue {
    fn from(value: &str) -> Self {
        Self::Str(value.as_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_of_scalar_is_one() {
        assert_eq!(UniversalValue::Int(1).depth(), 1);
        assert_eq!(UniversalValue::Nil.depth(), 1);
    }

    #[test]
    fn depth_of_nested_array() {
        let v = UniversalValue::Array(vec![UniversalValue::Array(vec![UniversalValue::Int(1)])]);
        assert_eq!(v.depth(), 3);
    }

    #[test]
    fn function_and_userdata_are_not_serializable() {
        assert!(!UniversalValue::Function(FunctionHandle(1)).is_serializable());
        let ud = UserDataHandle {
            index: 0,
            generation: 0,
            type_name: Arc::from("Person"),
        };
        assert!(!UniversalValue::UserData(ud).is_serializable());
    }

    #[test]
    fn arrays_of_scalars_are_serializable() {
        let v = UniversalValue::Array(vec![UniversalValue::Int(1), UniversalValue::Bool(true)]);
        assert!(v.is_serializable());
    }

    #[test]
    fn from_conversions() {
        assert_eq!(UniversalValue::from(true), UniversalValue::Bool(true));
        assert_eq!(UniversalValue::from(42i64), UniversalValue::Int(42));
        assert_eq!(UniversalValue::from("hi"), UniversalValue::Str(b"hi".to_vec()));
    }
}
