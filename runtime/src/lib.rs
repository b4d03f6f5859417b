//! `substrate-runtime` — the operational machinery wrapped around one
//! guest runtime instance: memory accounting, state pooling, snapshot
//! capture/restore, and the protected execution boundary.

mod accounter;
mod context;
mod pool;
mod protected;
mod snapshot;

pub use accounter::{AllocStats, MemoryAccounter};
pub use context::{ExecutionContext, GuestHandle};
pub use pool::{PoolConfig, ScopedHandle, StatePool};
pub use protected::{ProtectedExecutor, ProtectedOutcome, StackFrame};
pub use snapshot::{Snapshot, SnapshotManager, SnapshotValue};
