//! Configuration types for the Crucible sandbox.
//!
//! Every struct implements [`Default`] with the same values as the embedded
//! `defaults.toml`, so a bare `[section]` header produces a working
//! configuration. Relative paths are resolved against a base directory with
//! [`Config::resolve_paths`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Toolchain settings: default imports and reference libraries.
    pub compiler: CompilerSection,
    /// Isolated runtime settings: grants, module loading and limits.
    pub sandbox: SandboxSection,
    /// Logging level, format, and per-crate directives.
    pub logging: LoggingSection,
}

impl Config {
    /// Rewrite every relative path in the configuration to be relative to
    /// `base` instead of the process working directory.
    pub fn resolve_paths(&mut self, base: &Path) {
        let rebase = |p: &mut String| {
            let path = Path::new(p.as_str());
            if path.is_relative() {
                *p = base.join(path).display().to_string();
            }
        };

        rebase(&mut self.compiler.library_dir);
        for path in self.compiler.references.values_mut() {
            rebase(path);
        }
        rebase(&mut self.sandbox.work_dir);
        rebase(&mut self.sandbox.bin_dir);
        rebase(&mut self.sandbox.support_dir);
    }
}

// ---------------------------------------------------------------------------
// CompilerSection
// ---------------------------------------------------------------------------

/// Toolchain configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerSection {
    /// Namespaces imported by every compile-only request, in order.
    pub default_imports: Vec<String>,
    /// Directory containing `<namespace>.toml` library descriptors.
    pub library_dir: String,
    /// Additional namespace → descriptor path entries.
    pub references: BTreeMap<String, String>,
}

impl Default for CompilerSection {
    fn default() -> Self {
        Self {
            default_imports: [
                "Core",
                "Core.Collections",
                "Core.Sequences",
                "Core.Text",
                "Core.Concurrency",
                "Core.Serialization",
            ]
            .into_iter()
            .map(str::to_owned)
            .collect(),
            library_dir: "runtime/lib".to_owned(),
            references: BTreeMap::new(),
        }
    }
}

impl CompilerSection {
    /// Directory containing the host core library descriptors.
    #[must_use]
    pub fn library_path(&self) -> PathBuf {
        PathBuf::from(&self.library_dir)
    }
}

// ---------------------------------------------------------------------------
// SandboxSection
// ---------------------------------------------------------------------------

/// Isolated runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxSection {
    /// Host directory preopened for guests.
    pub work_dir: String,
    /// Name under which guests see `work_dir`.
    pub guest_dir: String,
    /// Directory searched for Wasm modules imported by compiled programs.
    pub bin_dir: String,
    /// Directory holding the sandbox-runtime support library descriptors.
    pub support_dir: String,
    /// Execution budget applied when a request does not carry one.
    pub default_timeout_ms: u64,
    /// Linear memory ceiling in 64 KiB pages.
    pub memory_max_pages: u32,
    /// Optional instruction fuel limit.
    pub fuel_limit: Option<u64>,
    /// Console output cap in bytes.
    pub max_output_bytes: usize,
}

impl Default for SandboxSection {
    fn default() -> Self {
        Self {
            work_dir: ".".to_owned(),
            guest_dir: ".".to_owned(),
            bin_dir: "runtime/bin".to_owned(),
            support_dir: "runtime/sandbox".to_owned(),
            default_timeout_ms: 10_000,
            memory_max_pages: 1024,
            fuel_limit: None,
            max_output_bytes: 1_048_576,
        }
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging and tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"`, `"json"` or `"full"`.
    pub format: String,
    /// Output target: `"stderr"`, `"stdout"` or `"file"`.
    pub target: String,
    /// Log directory used when `target = "file"`.
    pub directory: String,
    /// Per-crate tracing directives (e.g. `["crucible_sandbox=debug"]`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            target: "stderr".to_owned(),
            directory: "logs".to_owned(),
            directives: Vec::new(),
        }
    }
}
