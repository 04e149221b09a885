//! Toolchain error types.
//!
//! Malformed guest code is never an error here: it is reported as
//! [`crate::Diagnostic`]s. These types cover misconfigured references and
//! internal failures.

use std::path::PathBuf;

use thiserror::Error;

/// Failures resolving a [`crate::ReferenceManifest`].
#[derive(Debug, Error)]
pub enum ReferenceError {
    /// The descriptor file does not exist.
    #[error("reference for namespace '{namespace}' not found at {path}")]
    NotFound {
        /// Namespace being resolved.
        namespace: String,
        /// Expected descriptor path.
        path: PathBuf,
    },

    /// The descriptor could not be read.
    #[error("failed to read reference {path}: {source}")]
    Read {
        /// Descriptor path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The descriptor is not valid TOML or violates the descriptor schema.
    #[error("malformed reference {path}: {message}")]
    Malformed {
        /// Descriptor path.
        path: PathBuf,
        /// What is wrong.
        message: String,
    },

    /// A method is bound to a host function the ABI does not define.
    #[error("{method}: unknown host function '{name}'")]
    UnknownHostFunction {
        /// Fully qualified method name.
        method: String,
        /// Host function name.
        name: String,
    },

    /// Declared method types do not match the binding.
    #[error("{method}: signature mismatch: {message}")]
    SignatureMismatch {
        /// Fully qualified method name.
        method: String,
        /// What does not match.
        message: String,
    },

    /// The descriptor declares a different namespace than the manifest key.
    #[error("reference {path} declares namespace '{found}', expected '{expected}'")]
    NamespaceMismatch {
        /// Descriptor path.
        path: PathBuf,
        /// Namespace from the manifest.
        expected: String,
        /// Namespace inside the descriptor.
        found: String,
    },
}

/// Result type for reference resolution.
pub type ReferenceResult<T> = Result<T, ReferenceError>;

/// Internal toolchain failures.
#[derive(Debug, Error)]
pub enum CompilerError {
    /// The source exceeds what spans can address.
    #[error("source is too large: {0} bytes")]
    SourceTooLarge(usize),

    /// Code generation hit an inconsistency in the checked program.
    #[error("code generation failed: {0}")]
    Codegen(String),
}

/// Result type for toolchain operations.
pub type CompilerResult<T> = Result<T, CompilerError>;
