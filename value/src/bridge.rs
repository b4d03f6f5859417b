use crate::nil::NilPolicy;
use crate::uv::UniversalValue;

/// A position on a guest runtime's evaluation stack, or an index into
/// whatever positional addressing the concrete bridge uses. Opaque to
/// this crate; the concrete bridge (e.g. `substrate-lua`) defines how it
/// is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StackIndex(pub i32);

impl StackIndex {
    pub const TOP: StackIndex = StackIndex(-1);
}

/// Failures specific to pushing/pulling a value across the boundary.
///
/// Distinct from [`substrate_error::ErrorKind`] because a bridge failure
/// is always converted at the call site that already knows which guest
/// call it belongs to (and can attach source location there); this type
/// exists so the bridge itself stays engine-agnostic and dependency-light.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BridgeError {
    #[error("out of memory while marshalling value")]
    OutOfMemory,
    #[error("guest stack overflow while pushing value")]
    StackOverflow,
    #[error("could not convert guest value at {0:?}: {1}")]
    ConversionError(StackIndex, String),
}

impl From<BridgeError> for substrate_error::ScriptError {
    fn from(err: BridgeError) -> Self {
        use substrate_error::ErrorKind;
        let kind = match &err {
            BridgeError::OutOfMemory => ErrorKind::OutOfMemory,
            BridgeError::StackOverflow => ErrorKind::StackOverflow,
            BridgeError::ConversionError(_, _) => ErrorKind::ConversionError,
        };
        substrate_error::ScriptError::new(kind, err.to_string())
    }
}

/// Pushes [`UniversalValue`]s onto, and pulls them from, a guest runtime's
/// evaluation stack.
///
/// Implementations must honor the failure model in the specification:
/// on a pull failure no `UniversalValue` is produced and the guest stack
/// is left unchanged; on a push failure any partially-created guest
/// sub-object is unwound before returning.
pub trait ValueBridge {
    /// Push `value` onto the guest stack. Never partially pushes on failure.
    fn push(&self, value: &UniversalValue) -> Result<(), BridgeError>;

    /// Pull the value at `index` off the guest stack using `policy` for
    /// nil classification performed by the bridge itself (e.g. deciding
    /// whether a missing table key counts as present-but-nil).
    fn pull(&self, index: StackIndex, policy: NilPolicy) -> Result<UniversalValue, BridgeError>;
}
