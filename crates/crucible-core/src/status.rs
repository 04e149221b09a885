//! Phase status reporting.
//!
//! A compile-and-run invocation walks through a fixed sequence of phases and
//! announces each one to a [`StatusSink`]. The texts produced by [`Phase`]'s
//! `Display` impl are part of the external contract and must not change.

use std::fmt;

use crate::diagnostics::CompilationResult;

/// Observable phases of a compile-and-run invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// A fresh isolated runtime instance is being created.
    Provisioning,
    /// The harness is being compiled.
    Compiling,
    /// Compilation produced errors; nothing will run.
    CompileFailed {
        /// Number of error-severity diagnostics.
        errors: usize,
    },
    /// Compilation succeeded.
    CompileSucceeded,
    /// The compiled program is loaded and its entry point invoked.
    Executing,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Provisioning => f.write_str("Creating Sandbox Environment.."),
            Self::Compiling => f.write_str("Compiling Code.."),
            Self::CompileFailed { errors } => {
                write!(f, "Compilation Failed with {errors} errors.")
            },
            Self::CompileSucceeded => f.write_str("Compilation Succeeded"),
            Self::Executing => f.write_str("Executing Code.."),
        }
    }
}

/// Receiver for progress updates of a compile-and-run invocation.
///
/// Calls arrive synchronously on the invoking thread, in phase order.
pub trait StatusSink: Send + Sync {
    /// A human-readable status line.
    fn on_status(&self, status: &str);

    /// The compilation result, delivered once compilation finished.
    fn on_result(&self, result: &CompilationResult) {
        let _ = result;
    }

    /// Convenience for announcing a [`Phase`].
    fn on_phase(&self, phase: Phase) {
        self.on_status(&phase.to_string());
    }
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl StatusSink for NullSink {
    fn on_status(&self, _status: &str) {}
}

/// Sink that forwards status lines to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl StatusSink for TracingSink {
    fn on_status(&self, status: &str) {
        tracing::info!(status, "compile-and-run status");
    }

    fn on_result(&self, result: &CompilationResult) {
        if result.success {
            tracing::info!("compilation succeeded");
        } else {
            for error in &result.errors {
                tracing::info!(
                    id = %error.id,
                    line = error.line,
                    column = ?error.column,
                    message = %error.message,
                    "compilation error"
                );
            }
        }
    }
}

/// Sink built from a pair of closures.
pub struct FnSink<S, R> {
    status: S,
    result: R,
}

impl<S, R> FnSink<S, R>
where
    S: Fn(&str) + Send + Sync,
    R: Fn(&CompilationResult) + Send + Sync,
{
    /// Create a sink from a status callback and a result callback.
    pub fn new(status: S, result: R) -> Self {
        Self { status, result }
    }
}

impl<S, R> StatusSink for FnSink<S, R>
where
    S: Fn(&str) + Send + Sync,
    R: Fn(&CompilationResult) + Send + Sync,
{
    fn on_status(&self, status: &str) {
        (self.status)(status);
    }

    fn on_result(&self, result: &CompilationResult) {
        (self.result)(result);
    }
}

impl<S, R> fmt::Debug for FnSink<S, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSink").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_phase_texts() {
        assert_eq!(Phase::Provisioning.to_string(), "Creating Sandbox Environment..");
        assert_eq!(Phase::Compiling.to_string(), "Compiling Code..");
        assert_eq!(
            Phase::CompileFailed { errors: 1 }.to_string(),
            "Compilation Failed with 1 errors."
        );
        assert_eq!(Phase::CompileSucceeded.to_string(), "Compilation Succeeded");
        assert_eq!(Phase::Executing.to_string(), "Executing Code..");
    }

    #[test]
    fn test_fn_sink_forwards() {
        let seen = Mutex::new(Vec::new());
        let results = Mutex::new(0_usize);
        let sink = FnSink::new(
            |s: &str| seen.lock().unwrap().push(s.to_string()),
            |_: &CompilationResult| *results.lock().unwrap() += 1,
        );

        sink.on_phase(Phase::Compiling);
        sink.on_result(&CompilationResult::ok());

        assert_eq!(*seen.lock().unwrap(), vec!["Compiling Code.."]);
        assert_eq!(*results.lock().unwrap(), 1);
    }
}
