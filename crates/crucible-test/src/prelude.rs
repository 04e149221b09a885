//! Prelude module - commonly used test helpers.
//!
//! Use `use crucible_test::prelude::*;` to import all essential helpers.

// Fixtures
pub use crate::{
    CALC_MODULE, calc_library, calc_module_bytes, compile_image, core_references, init_test_logging,
    references, runtime_dir,
};

// Harness
pub use crate::TestSandbox;

// Mocks
pub use crate::RecordingSink;
