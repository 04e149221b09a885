//! Crucible Core - Shared vocabulary for the Crucible compile-and-run sandbox.
//!
//! This crate provides:
//! - Compilation diagnostics as reported to callers ([`CompilationError`], [`CompilationResult`])
//! - Execution outcomes for sandboxed runs ([`ExecutionOutcome`], [`ExecutionReport`])
//! - The [`StatusSink`] trait used to report phase progress
//! - The host-function ABI table shared by the compiler and the sandbox

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod abi;
pub mod diagnostics;
pub mod execution;
pub mod status;

pub use abi::{FaultCode, HostFunction, WasmType};
pub use diagnostics::{CompilationError, CompilationResult, Severity};
pub use execution::{ExecutionOutcome, ExecutionReport, RunReport};
pub use status::{FnSink, NullSink, Phase, StatusSink, TracingSink};
