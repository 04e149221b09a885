//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Upper bound on the execution budget (10 minutes).
const MAX_TIMEOUT_MS: u64 = 600_000;

/// Wasm32 address space in 64 KiB pages.
const MAX_MEMORY_PAGES: u32 = 65_536;

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_compiler(config)?;
    validate_sandbox(config)?;
    validate_logging(config)?;
    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_owned(),
        message: message.into(),
    }
}

fn is_namespace(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|part| {
            let mut chars = part.chars();
            chars
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

fn validate_compiler(config: &Config) -> ConfigResult<()> {
    let c = &config.compiler;

    if let Some(bad) = c.default_imports.iter().find(|ns| !is_namespace(ns)) {
        return Err(invalid(
            "compiler.default_imports",
            format!("'{bad}' is not a valid namespace name"),
        ));
    }

    if c.library_dir.trim().is_empty() {
        return Err(invalid("compiler.library_dir", "must not be empty"));
    }

    if let Some(bad) = c.references.keys().find(|ns| !is_namespace(ns)) {
        return Err(invalid(
            "compiler.references",
            format!("'{bad}' is not a valid namespace name"),
        ));
    }

    Ok(())
}

fn validate_sandbox(config: &Config) -> ConfigResult<()> {
    let s = &config.sandbox;

    if s.default_timeout_ms == 0 || s.default_timeout_ms > MAX_TIMEOUT_MS {
        return Err(invalid(
            "sandbox.default_timeout_ms",
            format!("must be between 1 and {MAX_TIMEOUT_MS}"),
        ));
    }

    if s.memory_max_pages == 0 || s.memory_max_pages > MAX_MEMORY_PAGES {
        return Err(invalid(
            "sandbox.memory_max_pages",
            format!("must be between 1 and {MAX_MEMORY_PAGES}"),
        ));
    }

    if s.fuel_limit == Some(0) {
        return Err(invalid("sandbox.fuel_limit", "must be positive when set"));
    }

    if s.max_output_bytes == 0 {
        return Err(invalid("sandbox.max_output_bytes", "must be positive"));
    }

    for (field, value) in [
        ("sandbox.work_dir", &s.work_dir),
        ("sandbox.guest_dir", &s.guest_dir),
        ("sandbox.bin_dir", &s.bin_dir),
        ("sandbox.support_dir", &s.support_dir),
    ] {
        if value.trim().is_empty() {
            return Err(invalid(field, "must not be empty"));
        }
    }

    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let l = &config.logging;

    if !matches!(
        l.level.as_str(),
        "trace" | "debug" | "info" | "warn" | "error" | "off"
    ) {
        return Err(invalid(
            "logging.level",
            format!(
                "unsupported level '{}'; expected one of: trace, debug, info, warn, error, off",
                l.level
            ),
        ));
    }

    if !matches!(l.format.as_str(), "pretty" | "compact" | "json" | "full") {
        return Err(invalid(
            "logging.format",
            format!(
                "unsupported format '{}'; expected one of: pretty, compact, json, full",
                l.format
            ),
        ));
    }

    if !matches!(l.target.as_str(), "stderr" | "stdout" | "file") {
        return Err(invalid(
            "logging.target",
            format!("unsupported target '{}'; expected stderr, stdout or file", l.target),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_rejects_bad_import_name() {
        let mut config = Config::default();
        config.compiler.default_imports.push("Core..Text".to_owned());
        let err = validate(&config).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "compiler.default_imports"));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let mut config = Config::default();
        config.sandbox.default_timeout_ms = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_zero_memory() {
        let mut config = Config::default();
        config.sandbox.memory_max_pages = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_unknown_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_owned();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_namespace_names() {
        assert!(is_namespace("Core"));
        assert!(is_namespace("Core.Collections"));
        assert!(is_namespace("Sandbox_IO.V2"));
        assert!(!is_namespace(""));
        assert!(!is_namespace("Core."));
        assert!(!is_namespace("1Core"));
    }
}
