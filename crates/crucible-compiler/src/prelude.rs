//! Prelude module - commonly used types for convenient import.
//!
//! Use `use crucible_compiler::prelude::*;` to import all essential types.

// Entry
pub use crate::{CompileOutput, compile};

// Diagnostics
pub use crate::{Code, Diagnostic, Location};

// Errors
pub use crate::{CompilerError, CompilerResult, ReferenceError, ReferenceResult};

// Images
pub use crate::{EmitTarget, EntryPoint, ModuleImage};

// References
pub use crate::{Library, ReferenceManifest, ReferenceSet};
