//! Crucible Sandbox - Isolated runtime for compiled guest modules.
//!
//! This crate provides:
//! - Host provisioning: directory grants, the bin directory and resource limits ([`SandboxHost`])
//! - An isolated runtime per run that loads one [`ModuleImage`](crucible_compiler::ModuleImage)
//!   and invokes its entry points ([`IsolatedRuntime`])
//! - The host-function table guest modules import (console, strings, a
//!   key/value table, JSON, clock and sleep, and file access limited to the
//!   granted directories)
//!
//! Guests run on Extism with no network access. A watchdog enforces the
//! wall-clock budget and honours caller cancellation.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

/// Sandbox error types.
pub mod error;
mod host;
mod modules;
pub mod provision;
mod runtime;
mod state;
mod watchdog;

pub use error::{SandboxError, SandboxResult};
pub use provision::{
    DEFAULT_MAX_FILE_BYTES, DEFAULT_MAX_OUTPUT_BYTES, DEFAULT_MEMORY_MAX_PAGES, DEFAULT_TIMEOUT,
    DirectoryGrant, Limits, SandboxHost, SandboxHostBuilder,
};
pub use runtime::IsolatedRuntime;
