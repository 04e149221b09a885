//! Crucible Telemetry - Logging and invocation tracing.
//!
//! This crate provides:
//! - Configurable `tracing` subscriber setup with multiple formats and targets
//! - [`InvocationContext`] for correlating the phases of one compile or run request
//!
//! # Example
//!
//! ```rust,no_run
//! use crucible_telemetry::{InvocationContext, InvocationKind, LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), crucible_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("crucible_sandbox=debug");
//! setup_logging(&config)?;
//!
//! let ctx = InvocationContext::new(InvocationKind::CompileAndRun, "cli");
//! let _guard = ctx.enter();
//! tracing::info!("running snippet");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod context;
mod error;
mod logging;

pub use context::{InvocationContext, InvocationGuard, InvocationKind};
pub use error::{TelemetryError, TelemetryResult};
pub use logging::{
    FileLogConfig, FileRotation, LogConfig, LogFormat, LogTarget, setup_default_logging,
    setup_logging,
};
