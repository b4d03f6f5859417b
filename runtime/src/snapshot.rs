use std::collections::VecDeque;

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use substrate_error::{ErrorKind, ScriptError};
use substrate_value::UniversalValue;

/// The serializable projection of a [`UniversalValue`].
///
/// `Function` and `UserData` have no stable cross-process representation,
/// so they round-trip through this type as `Placeholder` — a restored
/// snapshot surfaces these as a distinct, inert value rather than
/// silently dropping the field or erroring the whole restore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SnapshotValue {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Vec<u8>),
    Array(Vec<SnapshotValue>),
    Object(Vec<(String, SnapshotValue)>),
    Placeholder { type_name: String },
}

impl SnapshotValue {
    pub fn from_universal_value(value: &UniversalValue) -> Self {
        match value {
            UniversalValue::Nil => SnapshotValue::Nil,
            UniversalValue::Bool(b) => SnapshotValue::Bool(*b),
            UniversalValue::Int(i) => SnapshotValue::Int(*i),
            UniversalValue::Float(f) => SnapshotValue::Float(*f),
            UniversalValue::Str(bytes) => SnapshotValue::Str(bytes.clone()),
            UniversalValue::Array(items) => {
                SnapshotValue::Array(items.iter().map(Self::from_universal_value).collect())
            }
            UniversalValue::Object(fields) => SnapshotValue::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Self::from_universal_value(v)))
                    .collect(),
            ),
            UniversalValue::Function(_) => SnapshotValue::Placeholder {
                type_name: "function".to_string(),
            },
            UniversalValue::UserData(handle) => SnapshotValue::Placeholder {
                type_name: handle.type_name.to_string(),
            },
        }
    }

    pub fn into_universal_value(self) -> UniversalValue {
        match self {
            SnapshotValue::Nil => UniversalValue::Nil,
            SnapshotValue::Bool(b) => UniversalValue::Bool(b),
            SnapshotValue::Int(i) => UniversalValue::Int(i),
            SnapshotValue::Float(f) => UniversalValue::Float(f),
            SnapshotValue::Str(bytes) => UniversalValue::Str(bytes),
            SnapshotValue::Array(items) => {
                UniversalValue::Array(items.into_iter().map(Self::into_universal_value).collect())
            }
            SnapshotValue::Object(fields) => UniversalValue::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, v.into_universal_value()))
                    .collect::<IndexMap<_, _>>(),
            ),
            SnapshotValue::Placeholder { .. } => UniversalValue::Nil,
        }
    }
}

/// A point-in-time capture of a set of named globals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub globals: Vec<(String, SnapshotValue)>,
}

/// Serializes/restores the snapshot-safe subset of an execution context's
/// globals, using `bincode` as the wire format (denser than JSON, which
/// matters once a tenant's snapshot stack is bounded by byte budget
/// rather than entry count).
pub struct SnapshotManager {
    max_snapshots: usize,
    stack: Mutex<VecDeque<Snapshot>>,
}

impl SnapshotManager {
    pub fn new(max_snapshots: usize) -> Self {
        Self {
            max_snapshots,
            stack: Mutex::new(VecDeque::new()),
        }
    }

    /// Build a snapshot from `globals`, dropping (and reporting, via the
    /// returned value's placeholders) anything that isn't serializable.
    pub fn capture(globals: &[(String, UniversalValue)]) -> Snapshot {
        Snapshot {
            globals: globals
                .iter()
                .map(|(name, value)| (name.clone(), SnapshotValue::from_universal_value(value)))
                .collect(),
        }
    }

    pub fn push(&self, snapshot: Snapshot) -> Result<(), ScriptError> {
        let mut stack = self.stack.lock();
        if stack.len() >= self.max_snapshots {
            return Err(ScriptError::new(
                ErrorKind::CapacityExceeded,
                format!("snapshot stack is already at its {}-entry limit", self.max_snapshots),
            ));
        }
        stack.push_back(snapshot);
        Ok(())
    }

    pub fn pop(&self) -> Option<Snapshot> {
        self.stack.lock().pop_back()
    }

    pub fn depth(&self) -> usize {
        self.stack.lock().len()
    }

    pub fn to_bytes(snapshot: &Snapshot) -> Result<Vec<u8>, ScriptError> {
        bincode::serialize(snapshot)
            .map_err(|err| ScriptError::new(ErrorKind::Runtime, format!("snapshot encode failed: {err}")))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Snapshot, ScriptError> {
        bincode::deserialize(bytes)
            .map_err(|err| ScriptError::new(ErrorKind::Runtime, format!("snapshot decode failed: {err}")))
    }
}
