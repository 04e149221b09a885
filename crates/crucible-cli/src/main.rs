//! Crucible CLI - compile and run statement snippets in an isolated runtime.
//!
//! Results are printed as JSON on stdout; logs and phase status lines go to
//! stderr.

#![deny(unsafe_code)]
#![deny(clippy::all)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crucible_config::{Config, ResolvedConfig};

mod commands;
mod config_bridge;

use commands::{compile, config, run};

/// Crucible - sandboxed compile and run
#[derive(Parser)]
#[command(name = "crucible")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file merged over the user config
    #[arg(long, global = true, env = "CRUCIBLE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a source file and print its diagnostics
    Compile {
        /// Source file to compile
        file: PathBuf,

        /// Extra namespace to import (repeatable)
        #[arg(short, long = "using", value_name = "NAMESPACE")]
        usings: Vec<String>,
    },

    /// Compile a statement snippet and run it in the sandbox
    Run {
        /// File holding the statements to run
        file: PathBuf,

        /// Execution budget in milliseconds (default from config)
        #[arg(short, long)]
        timeout_ms: Option<u64>,
    },

    /// Show the effective configuration
    Config {
        /// Output format: toml or json
        #[arg(short, long, default_value = "toml")]
        format: String,
    },
}

fn load_config(explicit: Option<&std::path::Path>) -> Result<ResolvedConfig> {
    let mut resolved = Config::load(explicit).context("loading configuration")?;
    // Paths in an explicit config file are relative to that file.
    if let Some(base) = explicit.and_then(std::path::Path::parent)
        && !base.as_os_str().is_empty()
    {
        resolved.config.resolve_paths(base);
    }
    Ok(resolved)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let resolved = match load_config(cli.config.as_deref()) {
        Ok(resolved) => resolved,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::from(2);
        },
    };

    let log_config = config_bridge::to_log_config(&resolved.config, cli.verbose);
    if let Err(e) = crucible_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    match dispatch(cli.command, &resolved).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "Command failed");
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        },
    }
}

/// Run the subcommand; `Ok(false)` means the guest code failed, not the host.
async fn dispatch(command: Commands, resolved: &ResolvedConfig) -> Result<bool> {
    match command {
        Commands::Compile { file, usings } => {
            compile::run_compile(&resolved.config, &file, &usings)
        },
        Commands::Run { file, timeout_ms } => {
            run::run_snippet(&resolved.config, &file, timeout_ms).await
        },
        Commands::Config { format } => {
            config::show_config(resolved, &format)?;
            Ok(true)
        },
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_compile_with_usings() {
        let cli = Cli::try_parse_from([
            "crucible", "compile", "a.cs", "--using", "Sandbox.IO", "-u", "Ext",
        ])
        .unwrap();
        match cli.command {
            Commands::Compile { file, usings } => {
                assert_eq!(file, PathBuf::from("a.cs"));
                assert_eq!(usings, ["Sandbox.IO", "Ext"]);
            },
            _ => panic!("expected compile"),
        }
    }

    #[test]
    fn test_parse_run_with_global_config() {
        let cli = Cli::try_parse_from([
            "crucible",
            "run",
            "snippet.txt",
            "--timeout-ms",
            "250",
            "--config",
            "/tmp/c.toml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        match cli.command {
            Commands::Run { timeout_ms, .. } => assert_eq!(timeout_ms, Some(250)),
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_explicit_config_paths_are_rebased() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crucible.toml");
        std::fs::write(&path, "[compiler]\nlibrary_dir = \"lib\"\n").unwrap();

        let resolved = load_config(Some(&path)).unwrap();
        assert_eq!(
            resolved.config.compiler.library_dir,
            dir.path().join("lib").display().to_string()
        );
    }
}
