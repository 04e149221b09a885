use std::path::PathBuf;

use thiserror::Error;

/// Host-side failures of the isolated runtime.
///
/// Nothing the guest does ends up here: traps, failed host calls and
/// exceeded budgets are reported as [`crucible_core::ExecutionOutcome`].
#[derive(Debug, Error)]
pub enum SandboxError {
    /// A configured directory grant or the bin directory is unusable.
    #[error("sandbox provisioning failed for {path}: {message}")]
    HostProvisioning {
        /// Offending host path.
        path: PathBuf,
        /// What is wrong with it.
        message: String,
    },

    /// The compiled module imports a module missing from the bin directory.
    #[error("module '{module}' not found in bin directory (expected {path})")]
    ModuleNotFound {
        /// Imported module name.
        module: String,
        /// Where it was looked for.
        path: PathBuf,
    },

    /// Extism refused to instantiate the plugin.
    #[error("failed to build sandbox plugin: {0}")]
    PluginBuild(String),

    /// `invoke` was called before `load`.
    #[error("no module loaded into the runtime")]
    NotLoaded,

    /// The loaded image does not export the requested entry point.
    #[error("entry point '{0}' is not exported by the loaded module")]
    EntryPointNotFound(String),

    /// Host state shared with host functions became unusable.
    #[error("sandbox host state unavailable: {0}")]
    State(String),
}

/// A specialized Result type for sandbox operations.
pub type SandboxResult<T> = Result<T, SandboxError>;
