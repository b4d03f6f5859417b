use std::any::Any;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};

/// Semantic version used to gate userdata type compatibility.
///
/// Compatibility rule (data model, §3): `a` is compatible with `b` iff
/// `a.major == b.major && a >= b` — patch and minor bumps are additive,
/// a major bump requires a registered migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }

    pub fn is_compatible(&self, other: &Version) -> bool {
        self.major == other.major && *self >= *other
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// A registered host type's schema, as described by the data model.
///
/// `validator` checks structural invariants beyond the generation
/// compare (which the arena already guarantees); `migration` upgrades a
/// value of an older version's shape to the current one. `metatable_setup`
/// is an engine-specific hook (e.g. installing Lua metamethods) run once
/// when the type is registered with a concrete engine — it is opaque to
/// this crate by design.
#[derive(Clone)]
pub struct UserDataTypeInfo {
    pub name: String,
    pub size: usize,
    pub alignment: usize,
    pub version: Version,
    pub min_compatible_version: Version,
    pub validator: Option<Arc<dyn Fn(&dyn Any) -> bool + Send + Sync>>,
    pub migration: Option<Arc<dyn Fn(&dyn Any) -> Box<dyn Any + Send> + Send + Sync>>,
    pub metatable_setup: Option<Arc<dyn Fn() + Send + Sync>>,
}

impl std::fmt::Debug for UserDataTypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserDataTypeInfo")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("alignment", &self.alignment)
            .field("version", &self.version)
            .field("min_compatible_version", &self.min_compatible_version)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
    #[error("userdata type '{0}' version {1} is already registered")]
    DuplicateVersion(String, Version),
    #[error("userdata type '{0}' registered with inconsistent size/alignment and no migration")]
    InconsistentLayout(String),
    #[error("userdata type '{0}' is not registered")]
    UnknownType(String),
    #[error("no migration path from {0} to {1} for type '{2}'")]
    NoMigrationPath(Version, Version, String),
    #[error("handle generation mismatch for type '{0}' (stale or invalidated handle)")]
    StaleHandle(String),
    #[error("handle does not match the requested type")]
    TypeMismatch,
}

struct Slot {
    generation: u32,
    value: Option<Box<dyn Any + Send>>,
}

/// Arena backing one userdata type's live instances.
///
/// Each slot carries a generation counter; a [`UserDataSlotHandle`]
/// issued for a slot is only valid while its generation matches. This
/// gives use-after-free safety without chasing a raw pointer.
#[derive(Default)]
pub struct UserDataArena {
    slots: Mutex<Vec<Slot>>,
    free_list: Mutex<Vec<u32>>,
}

/// A generation-checked reference into one [`UserDataArena`] slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserDataSlotHandle {
    pub index: u32,
    pub generation: u32,
}

impl UserDataArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, value: Box<dyn Any + Send>) -> UserDataSlotHandle {
        let mut free = self.free_list.lock();
        let mut slots = self.slots.lock();
        if let Some(index) = free.pop() {
            let slot = &mut slots[index as usize];
            slot.value = Some(value);
            UserDataSlotHandle {
                index,
                generation: slot.generation,
            }
        } else {
            let index = slots.len() as u32;
            slots.push(Slot {
                generation: 0,
                value: Some(value),
            });
            UserDataSlotHandle { index, generation: 0 }
        }
    }

    /// Remove the value at `handle`, bumping the slot's generation so any
    /// outstanding handle to it becomes stale.
    pub fn remove(&self, handle: UserDataSlotHandle) -> Option<Box<dyn Any + Send>> {
        let mut slots = self.slots.lock();
        let slot = slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let value = slot.value.take();
        slot.generation = slot.generation.wrapping_add(1);
        drop(slots);
        self.free_list.lock().push(handle.index);
        value
    }

    pub fn with<T: 'static, R>(&self, handle: UserDataSlotHandle, f: impl FnOnce(&T) -> R) -> Option<R> {
        let slots = self.slots.lock();
        let slot = slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let value = slot.value.as_ref()?.downcast_ref::<T>()?;
        Some(f(value))
    }

    pub fn with_mut<T: 'static, R>(
        &self,
        handle: UserDataSlotHandle,
        f: impl FnOnce(&mut T) -> R,
    ) -> Option<R> {
        let mut slots = self.slots.lock();
        let slot = slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let value = slot.value.as_mut()?.downcast_mut::<T>()?;
        Some(f(value))
    }

    pub fn is_live(&self, handle: UserDataSlotHandle) -> bool {
        self.slots
            .lock()
            .get(handle.index as usize)
            .is_some_and(|slot| slot.generation == handle.generation && slot.value.is_some())
    }
}

struct TypeEntry {
    versions: RwLock<Vec<UserDataTypeInfo>>,
    arena: UserDataArena,
}

/// Process-wide catalog of host types exposed to the guest.
///
/// `register`/`version_history`/`supports`/`migrate`/`validate` match
/// the component contract in the specification exactly.
#[derive(Default)]
pub struct UserDataRegistry {
    types: DashMap<String, TypeEntry>,
}

impl UserDataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, info: UserDataTypeInfo) -> Result<(), RegistryError> {
        let entry = self.types.entry(info.name.clone()).or_insert_with(|| TypeEntry {
            versions: RwLock::new(Vec::new()),
            arena: UserDataArena::new(),
        });
        let mut versions = entry.versions.write();
        if versions.iter().any(|existing| existing.version == info.version) {
            return Err(RegistryError::DuplicateVersion(info.name, info.version));
        }
        if let Some(prev) = versions.last() {
            let layout_changed = prev.size != info.size || prev.alignment != info.alignment;
            if layout_changed && info.migration.is_none() {
                return Err(RegistryError::InconsistentLayout(info.name));
            }
        }
        versions.push(info);
        versions.sort_by_key(|v| v.version);
        Ok(())
    }

    pub fn version_history(&self, name: &str) -> Result<Vec<Version>, RegistryError> {
        let entry = self
            .types
            .get(name)
            .ok_or_else(|| RegistryError::UnknownType(name.to_string()))?;
        Ok(entry.versions.read().iter().map(|v| v.version).collect())
    }

    pub fn supports(&self, name: &str, version: Version) -> bool {
        let Some(entry) = self.types.get(name) else {
            return false;
        };
        let versions = entry.versions.read();
        let Some(current) = versions.last() else {
            return false;
        };
        current.version.is_compatible(&version)
            || versions.iter().any(|v| {
                v.version.major != current.version.major
                    && v.migration.is_some()
                    && v.version == version
            })
    }

    pub fn validate(&self, name: &str, handle: UserDataSlotHandle) -> Result<bool, RegistryError> {
        let entry = self
            .types
            .get(name)
            .ok_or_else(|| RegistryError::UnknownType(name.to_string()))?;
        if !entry.arena.is_live(handle) {
            return Ok(false);
        }
        let versions = entry.versions.read();
        let Some(current) = versions.last() else {
            return Ok(false);
        };
        let Some(validator) = current.validator.clone() else {
            return Ok(true);
        };
        drop(versions);
        Ok(entry
            .arena
            .with(handle, |value: &Box<dyn Any + Send>| validator(value.as_ref()))
            .unwrap_or(false))
    }

    pub fn insert<T: Send + 'static>(&self, name: &str, value: T) -> Result<UserDataSlotHandle, RegistryError> {
        let entry = self
            .types
            .get(name)
            .ok_or_else(|| RegistryError::UnknownType(name.to_string()))?;
        Ok(entry.arena.insert(Box::new(value)))
    }

    pub fn with<T: 'static, R>(
        &self,
        name: &str,
        handle: UserDataSlotHandle,
        f: impl FnOnce(&T) -> R,
    ) -> Result<Option<R>, RegistryError> {
        let entry = self
            .types
            .get(name)
            .ok_or_else(|| RegistryError::UnknownType(name.to_string()))?;
        Ok(entry.arena.with(handle, f))
    }

    /// Migrate a stored instance to `target_version`. Allocates the new
    /// value via `migration`; the caller (which owns the context's
    /// memory accounter) is responsible for charging the allocation —
    /// old storage is left in place, matching "caller-managed" in §4.2.
    pub fn migrate(
        &self,
        name: &str,
        handle: UserDataSlotHandle,
        target_version: Version,
    ) -> Result<UserDataSlotHandle, RegistryError> {
        let entry = self
            .types
            .get(name)
            .ok_or_else(|| RegistryError::UnknownType(name.to_string()))?;
        let versions = entry.versions.read();
        let target = versions
            .iter()
            .find(|v| v.version == target_version)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownType(name.to_string()))?;
        drop(versions);

        if !entry.arena.is_live(handle) {
            return Err(RegistryError::StaleHandle(name.to_string()));
        }
        let migration = target
            .migration
            .clone()
            .ok_or_else(|| RegistryError::NoMigrationPath(Version::new(0, 0, 0), target_version, name.to_string()))?;
        let migrated = entry
            .arena
            .with(handle, |value: &Box<dyn Any + Send>| migration(value.as_ref()))
            .ok_or_else(|| RegistryError::StaleHandle(name.to_string()))?;
        Ok(entry.arena.insert(migrated))
    }
}
