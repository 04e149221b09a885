//! Prelude module - commonly used types for convenient import.
//!
//! Use `use crucible_sandbox::prelude::*;` to import all essential types.

// Errors
pub use crate::{SandboxError, SandboxResult};

// Provisioning
pub use crate::{DirectoryGrant, Limits, SandboxHost, SandboxHostBuilder};

// Runtime
pub use crate::IsolatedRuntime;
