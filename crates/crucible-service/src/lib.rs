//! Crucible Service - Compile-only and compile-and-run operations.
//!
//! This crate provides:
//! - Diagnostic mapping into caller-facing errors ([`map_errors`])
//! - Compilation of complete units without running them ([`CompileOnlyService`])
//! - Harness synthesis for statement snippets ([`HarnessSynthesizer`])
//! - Compile-and-run with phase status reporting ([`Orchestrator`])
//!
//! Services are `Send + Sync`; share them behind an `Arc` and call them
//! from any number of threads. Every compile-and-run request gets its own
//! isolated runtime.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod compile_only;
/// Service error types.
pub mod error;
pub mod harness;
pub mod mapper;
pub mod orchestrator;

pub use compile_only::{CompileOnlyService, DEFAULT_IMPORTS};
pub use error::{ServiceError, ServiceResult};
pub use harness::{Harness, HarnessSynthesizer};
pub use mapper::{LineOffset, map_errors};
pub use orchestrator::{IMAGE_NAME, Orchestrator, RunOptions};
