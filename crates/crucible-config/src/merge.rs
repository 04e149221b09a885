//! Layered configuration merging.

use std::collections::BTreeSet;

/// Dotted paths of every leaf set by a config file layer.
pub type SetFields = BTreeSet<String>;

/// Recursively deep-merge `overlay` into `base`, recording each leaf the
/// overlay sets in `set_fields`.
///
/// - Tables merge recursively per-field.
/// - Scalars and arrays from the overlay **replace** the base value.
pub fn deep_merge(
    base: &mut toml::Value,
    overlay: &toml::Value,
    prefix: &str,
    set_fields: &mut SetFields,
) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let path = join(prefix, key);
                if let Some(base_val) = base_table.get_mut(key) {
                    deep_merge(base_val, overlay_val, &path, set_fields);
                } else {
                    base_table.insert(key.clone(), overlay_val.clone());
                    record_leaves(overlay_val, &path, set_fields);
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
            set_fields.insert(prefix.to_owned());
        },
    }
}

fn record_leaves(val: &toml::Value, prefix: &str, set_fields: &mut SetFields) {
    if let toml::Value::Table(table) = val {
        for (key, child) in table {
            record_leaves(child, &join(prefix, key), set_fields);
        }
    } else {
        set_fields.insert(prefix.to_owned());
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_owned()
    } else {
        format!("{prefix}.{key}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> toml::Value {
        toml::from_str(s).unwrap()
    }

    #[test]
    fn test_scalars_replace_and_tables_merge() {
        let mut base = parse("[sandbox]\nbin_dir = \"a\"\ndefault_timeout_ms = 10\n");
        let overlay = parse("[sandbox]\nbin_dir = \"b\"\n");
        let mut set = SetFields::new();

        deep_merge(&mut base, &overlay, "", &mut set);

        assert_eq!(base["sandbox"]["bin_dir"].as_str(), Some("b"));
        assert_eq!(base["sandbox"]["default_timeout_ms"].as_integer(), Some(10));
        assert!(set.contains("sandbox.bin_dir"));
        assert!(!set.contains("sandbox.default_timeout_ms"));
    }

    #[test]
    fn test_arrays_replace() {
        let mut base = parse("[compiler]\ndefault_imports = [\"A\", \"B\"]\n");
        let overlay = parse("[compiler]\ndefault_imports = [\"C\"]\n");
        let mut set = SetFields::new();

        deep_merge(&mut base, &overlay, "", &mut set);

        let imports = base["compiler"]["default_imports"].as_array().unwrap();
        assert_eq!(imports.len(), 1);
        assert!(set.contains("compiler.default_imports"));
    }

    #[test]
    fn test_new_tables_record_all_leaves() {
        let mut base = parse("[compiler]\n");
        let overlay = parse("[compiler.references]\nExtra = \"x.toml\"\n");
        let mut set = SetFields::new();

        deep_merge(&mut base, &overlay, "", &mut set);

        assert!(set.contains("compiler.references.Extra"));
    }
}
