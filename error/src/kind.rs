use std::fmt;

/// Classification of every failure the substrate can surface to a host.
///
/// Mirrors the error-kind catalog fixed by the substrate specification
/// (see EXECUTION_SPEC analog, §7): one flat enum, no nested variants,
/// so a host can match on `kind()` without downcasting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Syntax,
    Runtime,
    Type,
    MemoryLimit,
    Timeout,
    StackOverflow,
    Capability,
    ConversionError,
    TenantNotFound,
    TenantAlreadyExists,
    CapacityExceeded,
    SecurityViolation,
    SchemaNotFound,
    ToolNotFound,
    ToolAlreadyExists,
    AgentNotFound,
    WorkflowNotFound,
    MemoryStoreNotFound,
    InvalidArguments,
    MissingField,
    InvalidEventType,
    InvalidHookType,
    InvalidRole,
    InvalidMemoryType,
    AssertionFailed,
    TestFailed,
    TestSkipped,
    OutOfMemory,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Syntax => "Syntax",
            Self::Runtime => "Runtime",
            Self::Type => "Type",
            Self::MemoryLimit => "MemoryLimit",
            Self::Timeout => "Timeout",
            Self::StackOverflow => "StackOverflow",
            Self::Capability => "Capability",
            Self::ConversionError => "ConversionError",
            Self::TenantNotFound => "TenantNotFound",
            Self::TenantAlreadyExists => "TenantAlreadyExists",
            Self::CapacityExceeded => "CapacityExceeded",
            Self::SecurityViolation => "SecurityViolation",
            Self::SchemaNotFound => "SchemaNotFound",
            Self::ToolNotFound => "ToolNotFound",
            Self::ToolAlreadyExists => "ToolAlreadyExists",
            Self::AgentNotFound => "AgentNotFound",
            Self::WorkflowNotFound => "WorkflowNotFound",
            Self::MemoryStoreNotFound => "MemoryStoreNotFound",
            Self::InvalidArguments => "InvalidArguments",
            Self::MissingField => "MissingField",
            Self::InvalidEventType => "InvalidEventType",
            Self::InvalidHookType => "InvalidHookType",
            Self::InvalidRole => "InvalidRole",
            Self::InvalidMemoryType => "InvalidMemoryType",
            Self::AssertionFailed => "AssertionFailed",
            Self::TestFailed => "TestFailed",
            Self::TestSkipped => "TestSkipped",
            Self::OutOfMemory => "OutOfMemory",
        };
        f.write_str(name)
    }
}
