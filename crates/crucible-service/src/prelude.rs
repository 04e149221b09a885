//! Prelude module - commonly used types for convenient import.
//!
//! Use `use crucible_service::prelude::*;` to import all essential types.

// Errors
pub use crate::{ServiceError, ServiceResult};

// Compile-only
pub use crate::{CompileOnlyService, DEFAULT_IMPORTS};

// Compile-and-run
pub use crate::{Harness, HarnessSynthesizer, Orchestrator, RunOptions};

// Diagnostics
pub use crate::{LineOffset, map_errors};
