//! Bridge from `crucible_config::Config` to the service types.
//!
//! Everything the binary builds from configuration lives here so the
//! subcommands only deal with ready services.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crucible_compiler::ReferenceManifest;
use crucible_config::{CompilerSection, Config, SandboxSection};
use crucible_sandbox::SandboxHost;
use crucible_service::{CompileOnlyService, Orchestrator};
use crucible_telemetry::{LogConfig, LogFormat};
use tracing::debug;

/// Logging setup from the `[logging]` section, with `--verbose` forcing
/// `debug`.
pub(crate) fn to_log_config(config: &Config, verbose: bool) -> LogConfig {
    let mut log_config = LogConfig::from_section(&config.logging).unwrap_or_else(|e| {
        eprintln!("Invalid logging configuration ({e}); using defaults");
        LogConfig::new(&config.logging.level).with_format(LogFormat::Compact)
    });
    if verbose {
        "debug".clone_into(&mut log_config.level);
    }
    log_config
}

/// Manifest of the host core library: every descriptor in `library_dir`
/// plus the explicit `[compiler.references]` entries, which win.
pub(crate) fn core_manifest(compiler: &CompilerSection) -> Result<ReferenceManifest> {
    let dir = compiler.library_path();
    let mut manifest = ReferenceManifest::from_directory(&dir)
        .with_context(|| format!("listing core library descriptors in {}", dir.display()))?;
    for (namespace, path) in &compiler.references {
        manifest.insert(namespace.clone(), path);
    }
    debug!(entries = manifest.len(), "Core reference manifest");
    Ok(manifest)
}

/// Manifest of the sandbox support library in `support_dir`.
pub(crate) fn sandbox_manifest(sandbox: &SandboxSection) -> Result<ReferenceManifest> {
    let dir = Path::new(&sandbox.support_dir);
    let manifest = ReferenceManifest::from_directory(dir)
        .with_context(|| format!("listing sandbox library descriptors in {}", dir.display()))?;
    debug!(entries = manifest.len(), "Sandbox reference manifest");
    Ok(manifest)
}

/// The sandbox host described by `[sandbox]`.
pub(crate) fn sandbox_host(sandbox: &SandboxSection) -> Result<SandboxHost> {
    let host = SandboxHost::builder()
        .grant_dir(&sandbox.work_dir, sandbox.guest_dir.clone(), true)
        .bin_dir(&sandbox.bin_dir)
        .default_timeout(Duration::from_millis(sandbox.default_timeout_ms))
        .memory_max_pages(sandbox.memory_max_pages)
        .fuel_limit(sandbox.fuel_limit)
        .max_output_bytes(sandbox.max_output_bytes)
        .build()
        .with_context(|| format!("provisioning sandbox host for {}", sandbox.work_dir))?;
    Ok(host)
}

/// Compile-only service over the core library and the configured imports.
pub(crate) fn compile_only_service(config: &Config) -> Result<CompileOnlyService> {
    let manifest = core_manifest(&config.compiler)?;
    let service = CompileOnlyService::from_manifest(
        config.compiler.default_imports.clone(),
        &manifest,
    )
    .context("loading core library descriptors")?;
    Ok(service)
}

/// Compile-and-run orchestrator over the core and sandbox libraries.
pub(crate) fn orchestrator(config: &Config) -> Result<Orchestrator> {
    let host = Arc::new(sandbox_host(&config.sandbox)?);
    let core = core_manifest(&config.compiler)?;
    let sandbox = sandbox_manifest(&config.sandbox)?;
    Orchestrator::from_manifests(host, &core, &sandbox).context("loading library descriptors")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_overrides_level() {
        let config = Config::default();
        assert_eq!(to_log_config(&config, false).level, "info");
        assert_eq!(to_log_config(&config, true).level, "debug");
    }

    #[test]
    fn test_sandbox_host_from_section() {
        let dir = tempfile::tempdir().unwrap();
        let section = SandboxSection {
            work_dir: dir.path().display().to_string(),
            default_timeout_ms: 250,
            max_output_bytes: 64,
            ..SandboxSection::default()
        };
        let host = sandbox_host(&section).unwrap();
        assert_eq!(host.grants().len(), 1);
        assert!(host.grants()[0].writable);
        assert_eq!(host.grants()[0].guest_path, ".");
        assert_eq!(host.limits().default_timeout, Duration::from_millis(250));
        assert_eq!(host.limits().max_output_bytes, 64);
    }

    #[test]
    fn test_missing_work_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let section = SandboxSection {
            work_dir: dir.path().join("missing").display().to_string(),
            ..SandboxSection::default()
        };
        assert!(sandbox_host(&section).is_err());
    }

    #[test]
    fn test_explicit_references_are_added() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Core.toml"), "namespace = \"Core\"\n").unwrap();
        let mut compiler = CompilerSection {
            library_dir: dir.path().display().to_string(),
            ..CompilerSection::default()
        };
        compiler
            .references
            .insert("Extra".to_owned(), "/opt/extra/Extra.toml".to_owned());

        let manifest = core_manifest(&compiler).unwrap();
        let namespaces: Vec<&str> = manifest.entries().map(|(ns, _)| ns).collect();
        assert_eq!(namespaces, ["Core", "Extra"]);
    }
}
