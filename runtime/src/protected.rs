use substrate_error::{ErrorKind, RecoveryStrategy, ScriptError};

/// A single frame in a captured guest stack trace.
#[derive(Debug, Clone)]
pub struct StackFrame {
    pub source_name: String,
    pub line: u32,
    pub function_name: Option<String>,
}

/// The outcome of one protected guest call.
#[derive(Debug)]
pub enum ProtectedOutcome<T> {
    /// The call completed normally.
    Completed(T),
    /// The call failed; `recovered` is true if the configured
    /// [`RecoveryStrategy`] already acted on the state (e.g. the state
    /// was reset) so the caller does not need to do so itself.
    Failed { error: ScriptError, recovered: bool },
}

/// Wraps every guest call in a trap/recovery boundary.
///
/// A host-triggered Rust panic inside a callback registered with the
/// guest would otherwise unwind straight through the guest engine's FFI
/// boundary, which is undefined behavior for most embeddings — this is
/// caught here via `catch_unwind` and turned into an
/// [`ErrorKind::Runtime`] error, exactly like the sandbox crate turns a
/// guest trap into a typed error instead of propagating a raw unwind.
pub struct ProtectedExecutor {
    recovery: RecoveryStrategy,
    max_trace_depth: usize,
}

impl ProtectedExecutor {
    pub fn new(recovery: RecoveryStrategy, max_trace_depth: usize) -> Self {
        Self {
            recovery,
            max_trace_depth,
        }
    }

    pub fn recovery(&self) -> RecoveryStrategy {
        self.recovery
    }

    /// Run `call`, classifying any panic as [`ErrorKind::Runtime`] and
    /// applying `reset` if the configured strategy is
    /// [`RecoveryStrategy::ResetState`].
    pub fn run<T>(&self, call: impl FnOnce() -> Result<T, ScriptError>, reset: impl FnOnce()) -> ProtectedOutcome<T> {
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(call));
        match result {
            Ok(Ok(value)) => ProtectedOutcome::Completed(value),
            Ok(Err(error)) => self.handle_error(error, reset),
            Err(panic) => {
                let message = panic_message(&panic);
                let error = ScriptError::new(ErrorKind::Runtime, format!("guest call panicked: {message}"));
                self.handle_error(error, reset)
            }
        }
    }

    fn handle_error<T>(&self, error: ScriptError, reset: impl FnOnce()) -> ProtectedOutcome<T> {
        match self.recovery {
            RecoveryStrategy::Propagate => ProtectedOutcome::Failed {
                error,
                recovered: false,
            },
            RecoveryStrategy::ResetState => {
                reset();
                ProtectedOutcome::Failed {
                    error,
                    recovered: true,
                }
            }
            RecoveryStrategy::CustomCallback => ProtectedOutcome::Failed {
                error,
                recovered: false,
            },
        }
    }

    /// Truncate `frames` to `max_trace_depth`, innermost frames first.
    pub fn bound_trace(&self, frames: Vec<StackFrame>) -> Vec<StackFrame> {
        let mut frames = frames;
        frames.truncate(self.max_trace_depth);
        frames
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
