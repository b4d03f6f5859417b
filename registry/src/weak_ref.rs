use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;

/// Monotonically increasing identifier for an entry in a [`WeakRefRegistry`] table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WeakRefId(pub u64);

/// Which side of the host/guest boundary a weak reference was registered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceDirection {
    HostToGuest,
    GuestToHost,
    Bidirectional,
}

/// Lifecycle state of a weak reference entry.
///
/// `Live` while both sides are reachable, `Invalidated` once one side has
/// explicitly dropped the link (but the cleanup callback has not run
/// yet), `Collected` once cleanup has fired — permanent, terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceState {
    Live,
    Invalidated,
    Collected,
}

#[derive(Debug, Clone)]
pub struct WeakRefMeta {
    pub type_name: String,
    pub created_at: Instant,
    pub last_access_at: Instant,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WeakRefStats {
    pub live: usize,
    pub invalidated: usize,
    pub collected: usize,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum WeakRefError {
    #[error("no weak reference registered for id {0:?}")]
    UnknownId(WeakRefId),
    #[error("weak reference {0:?} has already been collected")]
    AlreadyCollected(WeakRefId),
}

struct Entry {
    meta: WeakRefMeta,
    direction: ReferenceDirection,
    state: ReferenceState,
    cleanup: Option<Arc<dyn Fn() + Send + Sync>>,
    cleanup_fired: AtomicBool,
}

/// The bidirectional weak-reference table linking host-owned objects to
/// guest-visible handles and back.
///
/// Backed by three independent [`DashMap`]s (host→guest, guest→host, and
/// a bidirectional link table) so concurrent readers never block each
/// other and no lock here is ever held across a guest call — readers
/// that only need `get`/`stats` never contend with a registration or a
/// collection happening on an unrelated id.
#[derive(Default)]
pub struct WeakRefRegistry {
    host_to_guest: DashMap<WeakRefId, Entry>,
    guest_to_host: DashMap<WeakRefId, Entry>,
    bidirectional: DashMap<WeakRefId, (WeakRefId, WeakRefId)>,
    next_id: AtomicU64,
}

impl WeakRefRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&self) -> WeakRefId {
        WeakRefId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn table(&self, direction: ReferenceDirection) -> &DashMap<WeakRefId, Entry> {
        match direction {
            ReferenceDirection::HostToGuest => &self.host_to_guest,
            ReferenceDirection::GuestToHost => &self.guest_to_host,
            ReferenceDirection::Bidirectional => &self.host_to_guest,
        }
    }

    /// Register a new weak reference in `direction`'s table, optionally
    /// with a cleanup callback fired exactly once when the entry is
    /// collected.
    pub fn register(
        &self,
        direction: ReferenceDirection,
        type_name: impl Into<String>,
        cleanup: Option<Arc<dyn Fn() + Send + Sync>>,
    ) -> WeakRefId {
        let id = self.allocate_id();
        let now = Instant::now();
        let entry = Entry {
            meta: WeakRefMeta {
                type_name: type_name.into(),
                created_at: now,
                last_access_at: now,
            },
            direction,
            state: ReferenceState::Live,
            cleanup,
            cleanup_fired: AtomicBool::new(false),
        };
        self.table(direction).insert(id, entry);
        if matches!(direction, ReferenceDirection::Bidirectional) {
            self.bidirectional.insert(id, (id, id));
        }
        id
    }

    /// Link an existing host-side id to an existing guest-side id,
    /// recording the pair in the bidirectional table so either side can
    /// be looked up from the other.
    pub fn link(&self, host_id: WeakRefId, guest_id: WeakRefId) {
        self.bidirectional.insert(host_id, (host_id, guest_id));
        self.bidirectional.insert(guest_id, (host_id, guest_id));
    }

    pub fn resolve_link(&self, id: WeakRefId) -> Option<(WeakRefId, WeakRefId)> {
        self.bidirectional.get(&id).map(|pair| *pair)
    }

    pub fn get(&self, direction: ReferenceDirection, id: WeakRefId) -> Result<ReferenceState, WeakRefError> {
        self.table(direction)
            .get(&id)
            .map(|entry| entry.state)
            .ok_or(WeakRefError::UnknownId(id))
    }

    /// Update `last_access_at` for the entry, marking it recently touched.
    pub fn touch(&self, direction: ReferenceDirection, id: WeakRefId) -> Result<(), WeakRefError> {
        let mut entry = self
            .table(direction)
            .get_mut(&id)
            .ok_or(WeakRefError::UnknownId(id))?;
        entry.meta.last_access_at = Instant::now();
        Ok(())
    }

    /// Mark an entry invalidated: still present for inspection, but no
    /// longer considered reachable from either side.
    pub fn invalidate(&self, direction: ReferenceDirection, id: WeakRefId) -> Result<(), WeakRefError> {
        let mut entry = self
            .table(direction)
            .get_mut(&id)
            .ok_or(WeakRefError::UnknownId(id))?;
        if entry.state == ReferenceState::Collected {
            return Err(WeakRefError::AlreadyCollected(id));
        }
        entry.state = ReferenceState::Invalidated;
        Ok(())
    }

    /// Collect an entry, firing its cleanup callback exactly once and
    /// transitioning it to the terminal [`ReferenceState::Collected`]
    /// state. Calling this again on an already-collected id is a no-op
    /// that reports the error rather than firing cleanup twice.
    pub fn collect(&self, direction: ReferenceDirection, id: WeakRefId) -> Result<(), WeakRefError> {
        let mut entry = self
            .table(direction)
            .get_mut(&id)
            .ok_or(WeakRefError::UnknownId(id))?;
        if entry.state == ReferenceState::Collected {
            return Err(WeakRefError::AlreadyCollected(id));
        }
        if !entry.cleanup_fired.swap(true, Ordering::AcqRel) {
            if let Some(cleanup) = entry.cleanup.clone() {
                cleanup();
            }
        }
        entry.state = ReferenceState::Collected;
        Ok(())
    }

    pub fn meta(&self, direction: ReferenceDirection, id: WeakRefId) -> Result<WeakRefMeta, WeakRefError> {
        self.table(direction)
            .get(&id)
            .map(|entry| entry.meta.clone())
            .ok_or(WeakRefError::UnknownId(id))
    }

    pub fn stats(&self, direction: ReferenceDirection) -> WeakRefStats {
        let mut stats = WeakRefStats::default();
        for entry in self.table(direction).iter() {
            match entry.state {
                ReferenceState::Live => stats.live += 1,
                ReferenceState::Invalidated => stats.invalidated += 1,
                ReferenceState::Collected => stats.collected += 1,
            }
        }
        stats
    }
}
