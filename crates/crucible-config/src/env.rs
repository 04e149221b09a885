//! Environment variable fallbacks.
//!
//! Environment variables are **fallback**, not override: they only apply to
//! fields no config file set.

use std::collections::HashMap;

use tracing::debug;

use crate::merge::SetFields;

/// Mapping from environment variable name to config field path.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
    kind: FieldKind,
}

#[derive(Clone, Copy)]
enum FieldKind {
    Str,
    Int,
}

const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "CRUCIBLE_LIBRARY_DIR",
        field_path: "compiler.library_dir",
        kind: FieldKind::Str,
    },
    EnvMapping {
        var_name: "CRUCIBLE_WORK_DIR",
        field_path: "sandbox.work_dir",
        kind: FieldKind::Str,
    },
    EnvMapping {
        var_name: "CRUCIBLE_BIN_DIR",
        field_path: "sandbox.bin_dir",
        kind: FieldKind::Str,
    },
    EnvMapping {
        var_name: "CRUCIBLE_SUPPORT_DIR",
        field_path: "sandbox.support_dir",
        kind: FieldKind::Str,
    },
    EnvMapping {
        var_name: "CRUCIBLE_TIMEOUT_MS",
        field_path: "sandbox.default_timeout_ms",
        kind: FieldKind::Int,
    },
    EnvMapping {
        var_name: "CRUCIBLE_MEMORY_MAX_PAGES",
        field_path: "sandbox.memory_max_pages",
        kind: FieldKind::Int,
    },
    EnvMapping {
        var_name: "CRUCIBLE_FUEL_LIMIT",
        field_path: "sandbox.fuel_limit",
        kind: FieldKind::Int,
    },
    EnvMapping {
        var_name: "CRUCIBLE_LOG_LEVEL",
        field_path: "logging.level",
        kind: FieldKind::Str,
    },
    EnvMapping {
        var_name: "CRUCIBLE_LOG_FORMAT",
        field_path: "logging.format",
        kind: FieldKind::Str,
    },
];

/// Apply environment variable fallbacks to fields that were **not** set by
/// any config file layer.
///
/// Returns the number of env vars applied.
pub fn apply_env_fallbacks<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    set_fields: &SetFields,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        if set_fields.contains(mapping.field_path) {
            continue;
        }
        let Some(raw) = env_vars.get(mapping.var_name) else {
            continue;
        };

        let value = match mapping.kind {
            FieldKind::Int => match raw.trim().parse::<i64>() {
                Ok(i) => toml::Value::Integer(i),
                Err(_) => {
                    debug!(var = mapping.var_name, "ignoring non-integer env var");
                    continue;
                },
            },
            FieldKind::Str => toml::Value::String(raw.clone()),
        };

        debug!(
            var = mapping.var_name,
            field = mapping.field_path,
            "applying env var fallback"
        );
        set_field(merged, mapping.field_path, value);
        count = count.saturating_add(1);
    }

    count
}

/// Set a dotted field in the TOML tree, creating intermediate tables.
fn set_field(root: &mut toml::Value, path: &str, value: toml::Value) {
    let mut segments: Vec<&str> = path.split('.').collect();
    let Some(leaf) = segments.pop() else {
        return;
    };

    let mut current = root;
    for segment in segments {
        let Some(table) = current.as_table_mut() else {
            return;
        };
        current = table
            .entry(segment.to_owned())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }

    if let Some(table) = current.as_table_mut() {
        table.insert(leaf.to_owned(), value);
    }
}

/// Collect all current environment variables into a map.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_fallback_applies_to_unset_fields() {
        let mut merged: toml::Value = toml::from_str("[sandbox]\nbin_dir = \"bin\"\n").unwrap();
        let env = make_env(&[("CRUCIBLE_BIN_DIR", "/opt/bin"), ("CRUCIBLE_TIMEOUT_MS", "500")]);

        let count = apply_env_fallbacks(&mut merged, &SetFields::new(), &env);

        assert_eq!(count, 2);
        assert_eq!(merged["sandbox"]["bin_dir"].as_str(), Some("/opt/bin"));
        assert_eq!(merged["sandbox"]["default_timeout_ms"].as_integer(), Some(500));
    }

    #[test]
    fn test_fallback_skips_file_set_fields() {
        let mut merged: toml::Value = toml::from_str("[logging]\nlevel = \"warn\"\n").unwrap();
        let env = make_env(&[("CRUCIBLE_LOG_LEVEL", "trace")]);
        let set: SetFields = ["logging.level".to_owned()].into_iter().collect();

        let count = apply_env_fallbacks(&mut merged, &set, &env);

        assert_eq!(count, 0);
        assert_eq!(merged["logging"]["level"].as_str(), Some("warn"));
    }

    #[test]
    fn test_non_integer_is_ignored() {
        let mut merged: toml::Value = toml::from_str("").unwrap();
        let env = make_env(&[("CRUCIBLE_FUEL_LIMIT", "lots")]);

        assert_eq!(apply_env_fallbacks(&mut merged, &SetFields::new(), &env), 0);
    }

    #[test]
    fn test_creates_missing_tables() {
        let mut merged: toml::Value = toml::from_str("").unwrap();
        let env = make_env(&[("CRUCIBLE_LOG_FORMAT", "json")]);

        apply_env_fallbacks(&mut merged, &SetFields::new(), &env);

        assert_eq!(merged["logging"]["format"].as_str(), Some("json"));
    }
}
