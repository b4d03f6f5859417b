use crate::kind::ErrorKind;

/// A structured, typed failure returned to the host and mirrored into a
/// context's last-error slot.
///
/// `source_name`/`line`/`column` are populated when the failure originates
/// from guest code the protected executor can attribute to a location;
/// `stack_trace` is bounded by the executor's `max_trace_depth` and is
/// `None` for failures that never reached a guest call (e.g. a registry
/// lookup before any script ran).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ScriptError {
    pub message: String,
    pub kind: ErrorKind,
    pub source_name: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub stack_trace: Option<Vec<String>>,
}

impl ScriptError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
            source_name: None,
            line: None,
            column: None,
            stack_trace: None,
        }
    }

    pub fn with_location(mut self, source_name: impl Into<String>, line: u32, column: u32) -> Self {
        self.source_name = Some(source_name.into());
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    pub fn with_stack_trace(mut self, trace: Vec<String>) -> Self {
        self.stack_trace = Some(trace);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_methods_set_optional_fields() {
        let err = ScriptError::new(ErrorKind::Syntax, "unexpected token")
            .with_location("chunk1", 3, 7)
            .with_stack_trace(vec!["chunk1:3".into()]);
        assert_eq!(err.kind(), ErrorKind::Syntax);
        assert_eq!(err.source_name.as_deref(), Some("chunk1"));
        assert_eq!(err.line, Some(3));
        assert_eq!(err.column, Some(7));
        assert_eq!(err.stack_trace.unwrap().len(), 1);
    }

    #[test]
    fn display_includes_kind_and_message() {
        let err = ScriptError::new(ErrorKind::Timeout, "cpu budget exceeded");
        assert_eq!(err.to_string(), "Timeout: cpu budget exceeded");
    }
}
