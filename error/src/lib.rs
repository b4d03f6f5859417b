//! `substrate-error` — shared error catalog for the scripting engine substrate.
//!
//! Every crate in the workspace converts its local failures into
//! [`ErrorKind`] / [`ScriptError`] at the point where they would otherwise
//! cross the host/guest boundary. Crates that never cross that boundary
//! (e.g. the state pool's internal bookkeeping) may keep narrower local
//! error types and convert via `From`.

mod kind;
mod script_error;
mod recovery;

pub use kind::ErrorKind;
pub use recovery::RecoveryStrategy;
pub use script_error::ScriptError;

/// Convenience alias used throughout the workspace for fallible substrate operations.
pub type Result<T> = std::result::Result<T, ScriptError>;
