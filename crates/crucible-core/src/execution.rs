//! Execution outcomes for sandboxed runs.

use serde::{Deserialize, Serialize};

use crate::diagnostics::CompilationResult;

/// How a guest invocation ended.
///
/// Guest faults are data, not errors: a trap, a failed host call or an
/// exceeded budget all end up here. Host-side provisioning failures are
/// reported through the caller's error type instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    /// The entry point returned normally.
    Completed,
    /// The guest trapped or a host function rejected a call.
    Faulted {
        /// Description of the fault.
        reason: String,
    },
    /// The execution budget elapsed before the entry point returned.
    TimedOut {
        /// The budget that was exceeded, in milliseconds.
        budget_ms: u64,
    },
}

impl ExecutionOutcome {
    /// Whether the guest ran to completion.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Everything observed while running a guest entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// How the invocation ended.
    pub outcome: ExecutionOutcome,
    /// Console output written by the guest.
    pub stdout: String,
    /// Whether console output was cut at the configured cap.
    #[serde(default)]
    pub stdout_truncated: bool,
    /// Wall-clock duration of the invocation.
    pub elapsed_ms: u64,
}

/// Result of a compile-and-run request.
///
/// `execution` is `None` exactly when compilation failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// The compilation result that was also delivered to the status sink.
    pub compilation: CompilationResult,
    /// Execution details, present only when the program ran.
    pub execution: Option<ExecutionReport>,
}

impl RunReport {
    /// Report for a unit that did not compile.
    #[must_use]
    pub fn not_run(compilation: CompilationResult) -> Self {
        Self {
            compilation,
            execution: None,
        }
    }
}
