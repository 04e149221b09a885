//! `crucible config`: show the effective configuration.

use anyhow::{Context, Result};
use crucible_config::ResolvedConfig;

/// Print the merged configuration as TOML (default) or JSON.
///
/// The TOML form lists the contributing files as leading comments.
pub(crate) fn show_config(resolved: &ResolvedConfig, format: &str) -> Result<()> {
    let rendered = render(resolved, format)?;
    print!("{rendered}");
    Ok(())
}

fn render(resolved: &ResolvedConfig, format: &str) -> Result<String> {
    match format {
        "json" => {
            let mut json =
                serde_json::to_string_pretty(resolved).context("serialising configuration")?;
            json.push('\n');
            Ok(json)
        },
        "toml" => {
            let mut out = String::new();
            if resolved.loaded_files.is_empty() {
                out.push_str("# No config files found; showing built-in defaults\n\n");
            } else {
                for file in &resolved.loaded_files {
                    out.push_str("# Loaded: ");
                    out.push_str(file);
                    out.push('\n');
                }
                out.push('\n');
            }
            out.push_str(
                &toml::to_string_pretty(&resolved.config).context("serialising configuration")?,
            );
            Ok(out)
        },
        other => anyhow::bail!("Unknown format '{other}'; expected 'toml' or 'json'"),
    }
}

#[cfg(test)]
mod tests {
    use crucible_config::Config;

    use super::*;

    fn resolved() -> ResolvedConfig {
        ResolvedConfig {
            config: Config::default(),
            loaded_files: vec!["/etc/crucible.toml".to_owned()],
        }
    }

    #[test]
    fn test_toml_lists_loaded_files() {
        let out = render(&resolved(), "toml").unwrap();
        assert!(out.starts_with("# Loaded: /etc/crucible.toml\n"));
        assert!(out.contains("[sandbox]"));
        assert!(out.contains("default_timeout_ms = 10000"));
    }

    #[test]
    fn test_json_round_trips_config() {
        let out = render(&resolved(), "json").unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["config"]["logging"]["level"], "info");
        assert_eq!(value["loaded_files"][0], "/etc/crucible.toml");
    }

    #[test]
    fn test_unknown_format() {
        assert!(render(&resolved(), "yaml").is_err());
    }
}
