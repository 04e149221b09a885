//! Prelude module - commonly used types for convenient import.
//!
//! Use `use crucible_core::prelude::*;` to import all essential types.

// Diagnostics
pub use crate::{CompilationError, CompilationResult, Severity};

// Execution
pub use crate::{ExecutionOutcome, ExecutionReport, RunReport};

// Status reporting
pub use crate::{FnSink, NullSink, Phase, StatusSink, TracingSink};

// Host ABI
pub use crate::{FaultCode, HostFunction, WasmType};
