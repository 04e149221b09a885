//! Config file discovery and layered loading.
//!
//! Implements the [`load`] algorithm:
//! 1. Parse `defaults.toml` → base
//! 2. Merge the user config (`~/.crucible/config.toml`, or `$CRUCIBLE_HOME/config.toml`)
//! 3. Merge an explicit config file, if one was given
//! 4. Apply `CRUCIBLE_*` env var fallbacks for unset fields
//! 5. Deserialize the merged tree → [`Config`]
//! 6. Validate

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::env::{apply_env_fallbacks, collect_env_vars};
use crate::error::{ConfigError, ConfigLayer, ConfigResult};
use crate::merge::{SetFields, deep_merge};
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// A loaded configuration together with the files that contributed to it.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    /// The final, validated configuration.
    pub config: Config,
    /// Config files merged on top of the defaults, in merge order.
    pub loaded_files: Vec<String>,
}

/// Load the configuration with layered precedence.
///
/// `home_override` replaces the user-level config directory (the directory
/// that would otherwise be `~/.crucible`). `explicit` is a config file given
/// on the command line; it must exist.
///
/// # Errors
///
/// Returns a [`ConfigError`] if any config file is malformed, or if the
/// final merged configuration fails validation.
pub fn load(home_override: Option<&Path>, explicit: Option<&Path>) -> ConfigResult<ResolvedConfig> {
    let env_vars = collect_env_vars();

    let mut merged = defaults()?;
    let mut set_fields = SetFields::new();
    let mut loaded_files = Vec::new();

    let user_dir = match home_override {
        Some(dir) => Some(dir.to_path_buf()),
        None => match env_vars.get("CRUCIBLE_HOME") {
            Some(dir) => Some(PathBuf::from(dir)),
            None => home_directory().ok().map(|h| h.join(".crucible")),
        },
    };

    if let Some(dir) = user_dir {
        let path = dir.join("config.toml");
        if let Some(overlay) = try_load_file(&path, ConfigLayer::User)? {
            deep_merge(&mut merged, &overlay, "", &mut set_fields);
            info!(path = %path.display(), "loaded user config");
            loaded_files.push(path.display().to_string());
        }
    }

    if let Some(path) = explicit {
        let overlay = load_explicit(path)?;
        deep_merge(&mut merged, &overlay, "", &mut set_fields);
        info!(path = %path.display(), "loaded explicit config");
        loaded_files.push(path.display().to_string());
    }

    let env_count = apply_env_fallbacks(&mut merged, &set_fields, &env_vars);
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable fallbacks");
    }

    let config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Malformed {
                layer: ConfigLayer::Merged,
                origin: "defaults, files and CRUCIBLE_* variables".to_owned(),
                source: e,
            })?;

    validate::validate(&config)?;

    Ok(ResolvedConfig {
        config,
        loaded_files,
    })
}

/// Load a config from a specific file path on top of the defaults (no user
/// layer, no environment).
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
/// validation.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let overlay = load_explicit(path)?;

    let mut merged = defaults()?;
    deep_merge(&mut merged, &overlay, "", &mut SetFields::new());

    let config: Config = merged
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::Malformed {
            layer: ConfigLayer::Explicit,
            origin: path.display().to_string(),
            source: e,
        })?;

    validate::validate(&config)?;
    Ok(config)
}

fn defaults() -> ConfigResult<toml::Value> {
    toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::Malformed {
        layer: ConfigLayer::Defaults,
        origin: "defaults.toml".to_owned(),
        source: e,
    })
}

/// The `--config` layer, which unlike the user layer must exist.
fn load_explicit(path: &Path) -> ConfigResult<toml::Value> {
    try_load_file(path, ConfigLayer::Explicit)?.ok_or_else(|| ConfigError::MissingFile {
        path: path.to_path_buf(),
    })
}

/// Try to load a file, returning `None` if the file doesn't exist.
///
/// Uses a single read operation to avoid TOCTOU races.
fn try_load_file(path: &Path, layer: ConfigLayer) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::Unreadable {
                layer,
                path: path.to_path_buf(),
                source: e,
            });
        },
    };

    let size = content.len() as u64;
    if size > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::TooLarge {
            layer,
            path: path.to_path_buf(),
            size,
            limit: MAX_CONFIG_FILE_SIZE,
        });
    }

    let value: toml::Value = toml::from_str(&content).map_err(|e| ConfigError::Malformed {
        layer,
        origin: path.display().to_string(),
        source: e,
    })?;

    Ok(Some(value))
}

fn home_directory() -> ConfigResult<PathBuf> {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .ok_or(ConfigError::NoHomeDir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_deserialize_to_default_config() {
        let config: Config = toml::from_str(DEFAULTS_TOML).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_with_empty_home() {
        let home = tempfile::tempdir().unwrap();
        let resolved = load(Some(home.path()), None).unwrap();
        assert!(resolved.loaded_files.is_empty());
        assert_eq!(resolved.config.compiler.default_imports.len(), 6);
    }

    #[test]
    fn test_user_layer_merges() {
        let home = tempfile::tempdir().unwrap();
        std::fs::write(
            home.path().join("config.toml"),
            "[sandbox]\ndefault_timeout_ms = 2500\n",
        )
        .unwrap();

        let resolved = load(Some(home.path()), None).unwrap();

        assert_eq!(resolved.config.sandbox.default_timeout_ms, 2500);
        assert_eq!(resolved.config.sandbox.bin_dir, "runtime/bin");
        assert_eq!(resolved.loaded_files.len(), 1);
    }

    #[test]
    fn test_explicit_layer_wins_over_user() {
        let home = tempfile::tempdir().unwrap();
        std::fs::write(home.path().join("config.toml"), "[logging]\nlevel = \"warn\"\n").unwrap();
        let explicit = home.path().join("explicit.toml");
        std::fs::write(&explicit, "[logging]\nlevel = \"debug\"\n").unwrap();

        let resolved = load(Some(home.path()), Some(&explicit)).unwrap();

        assert_eq!(resolved.config.logging.level, "debug");
        assert_eq!(resolved.loaded_files.len(), 2);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let home = tempfile::tempdir().unwrap();
        let result = load(Some(home.path()), Some(Path::new("/nonexistent/crucible.toml")));
        assert!(matches!(result, Err(ConfigError::MissingFile { .. })));
    }

    #[test]
    fn test_load_file_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[sandbox]\ndefault_timeout_ms = 0\n").unwrap();

        let result = load_file(&path);
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[sandbox\n").unwrap();

        assert!(matches!(
            load_file(&path),
            Err(ConfigError::Malformed {
                layer: ConfigLayer::Explicit,
                ..
            })
        ));
    }

    #[test]
    fn test_oversized_config_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("huge.toml");
        let data = "x = \"".to_owned() + &"a".repeat(1_100_000) + "\"";
        std::fs::write(&file_path, data).unwrap();

        let result = try_load_file(&file_path, ConfigLayer::User);
        assert!(matches!(
            result,
            Err(ConfigError::TooLarge {
                layer: ConfigLayer::User,
                ..
            })
        ));
    }
}
