//! `substrate-registry` — the versioned userdata type catalog and the
//! bidirectional weak-reference table.
//!
//! Both registries are process-wide, concurrently-readable structures
//! (per the specification's concurrency model, §5): readers never block
//! each other and no lock from here is ever held across a guest call.

mod userdata;
mod weak_ref;

pub use userdata::{
    RegistryError, UserDataArena, UserDataRegistry, UserDataSlotHandle, UserDataTypeInfo, Version,
};
pub use weak_ref::{
    ReferenceDirection, ReferenceState, WeakRefError, WeakRefId, WeakRefMeta, WeakRefRegistry,
    WeakRefStats,
};
