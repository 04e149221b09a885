use crucible_compiler::{CompilerError, ReferenceError};
use crucible_sandbox::SandboxError;
use thiserror::Error;

/// Host-side failures of the compile services.
///
/// Malformed guest code is never an error here: it is reported as a failed
/// [`crucible_core::CompilationResult`]. Guest runtime faults are reported
/// as [`crucible_core::ExecutionOutcome`].
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The toolchain failed internally.
    #[error("toolchain failure: {0}")]
    Compiler(#[from] CompilerError),

    /// The isolated runtime could not be provisioned or loaded.
    #[error(transparent)]
    Sandbox(#[from] SandboxError),

    /// Reference libraries could not be resolved.
    #[error(transparent)]
    References(#[from] ReferenceError),

    /// The blocking task running a request panicked or was aborted.
    #[error("compile-and-run task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for ServiceError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }
}

/// A specialized Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;
