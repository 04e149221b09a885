//! Crucible Test - Shared test utilities for the Crucible sandbox.
//!
//! This crate provides fixtures and helpers used across the Crucible
//! crates as a dev-dependency: the shipped reference libraries, a
//! prebuilt bin-directory module, a throwaway sandbox host and a status
//! sink that records what it is told.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! crucible-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use crucible_test::{TestSandbox, compile_image};
//!
//! #[test]
//! fn test_prints() {
//!     let sandbox = TestSandbox::new();
//!     let report = sandbox.run_main("using Core; class P { static void Main() { Console.WriteLine(1); } }");
//!     assert_eq!(report.stdout, "1\n");
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![allow(clippy::missing_panics_doc)]

pub mod prelude;

pub mod fixtures;
pub mod harness;
pub mod mocks;

pub use fixtures::*;
pub use harness::*;
pub use mocks::*;
