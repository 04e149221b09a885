//! `crucible run`: compile a statement snippet and execute it.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use crucible_config::Config;
use crucible_core::{CompilationResult, RunReport, StatusSink};
use crucible_service::RunOptions;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::config_bridge;

/// Prints phase status lines to stderr so stdout stays pure JSON.
struct ConsoleSink;

impl StatusSink for ConsoleSink {
    fn on_status(&self, status: &str) {
        eprintln!("{}", status.cyan());
    }

    fn on_result(&self, result: &CompilationResult) {
        for error in &result.errors {
            eprintln!("  {} {error}", "error".red().bold());
        }
    }
}

/// Compile and run the snippet in `file`, printing the run report as JSON.
///
/// Ctrl+C cancels a running guest. Returns whether the snippet compiled and
/// completed.
pub(crate) async fn run_snippet(
    config: &Config,
    file: &Path,
    timeout_ms: Option<u64>,
) -> Result<bool> {
    let code = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let orchestrator = Arc::new(config_bridge::orchestrator(config)?);
    let options = timeout_ms.map_or_else(RunOptions::default, RunOptions::with_timeout_ms);

    let cancel = CancellationToken::new();
    let mut handle = Arc::clone(&orchestrator).spawn_compile_and_run(
        code,
        options,
        Arc::new(ConsoleSink),
        cancel.clone(),
    );

    let joined = tokio::select! {
        joined = &mut handle => joined,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted; cancelling guest");
            cancel.cancel();
            (&mut handle).await
        },
    };
    let report = joined.context("compile-and-run task failed")??;

    let json = serde_json::to_string_pretty(&report).context("serialising run report")?;
    println!("{json}");
    Ok(succeeded(&report))
}

fn succeeded(report: &RunReport) -> bool {
    report.compilation.success
        && report
            .execution
            .as_ref()
            .is_some_and(|e| e.outcome.is_completed())
}

#[cfg(test)]
mod tests {
    use crucible_core::{ExecutionOutcome, ExecutionReport};

    use super::*;

    fn report(outcome: Option<ExecutionOutcome>) -> RunReport {
        RunReport {
            compilation: CompilationResult::ok(),
            execution: outcome.map(|outcome| ExecutionReport {
                outcome,
                stdout: String::new(),
                stdout_truncated: false,
                elapsed_ms: 1,
            }),
        }
    }

    #[test]
    fn test_only_completed_runs_succeed() {
        assert!(succeeded(&report(Some(ExecutionOutcome::Completed))));
        assert!(!succeeded(&report(Some(ExecutionOutcome::TimedOut {
            budget_ms: 10
        }))));
        assert!(!succeeded(&report(None)));
    }
}
