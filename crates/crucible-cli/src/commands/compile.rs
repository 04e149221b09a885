//! `crucible compile`: compile-only diagnostics for a source file.

use std::path::Path;

use anyhow::{Context, Result};
use crucible_config::Config;
use crucible_core::CompilationResult;
use tracing::info;

use crate::config_bridge;

/// Compile `file` with the configured default imports plus `usings`, and
/// print the result as JSON.
///
/// Returns whether compilation succeeded.
pub(crate) fn run_compile(config: &Config, file: &Path, usings: &[String]) -> Result<bool> {
    let code = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let service = config_bridge::compile_only_service(config)?;

    let extras = (!usings.is_empty()).then_some(usings);
    let result = service.compile_only(&code, extras)?;
    info!(file = %file.display(), success = result.success, "Compiled");

    print_result(&result)?;
    Ok(result.success)
}

fn print_result(result: &CompilationResult) -> Result<()> {
    let json = serde_json::to_string_pretty(result).context("serialising compilation result")?;
    println!("{json}");
    Ok(())
}
