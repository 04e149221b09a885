use crucible_core::HostFunction;
use extism::{CurrentPlugin, Error, Val};
use serde_json::Value;

use crate::host::util::{self, MAX_GUEST_STRING_LEN};

/// `Core.Serialization.Json`.
pub(crate) fn call(
    host: HostFunction,
    plugin: &mut CurrentPlugin,
    inputs: &[Val],
    outputs: &mut [Val],
) -> Result<(), Error> {
    use HostFunction as H;

    let input = util::arg_str(plugin, inputs, 0, MAX_GUEST_STRING_LEN)?;
    match host {
        H::JsonQuote => {
            let quoted = serde_json::to_string(&input)?;
            util::ret_str(plugin, outputs, &quoted)
        },
        H::JsonIsValid => {
            let valid = serde_json::from_str::<Value>(&input).is_ok();
            util::ret_bool(outputs, valid)
        },
        H::JsonGetString => {
            let key = util::arg_str(plugin, inputs, 1, MAX_GUEST_STRING_LEN)?;
            let text = match member(&input, &key)? {
                Some(Value::String(s)) => s,
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            };
            util::ret_str(plugin, outputs, &text)
        },
        H::JsonGetNumber => {
            let key = util::arg_str(plugin, inputs, 1, MAX_GUEST_STRING_LEN)?;
            let number = match member(&input, &key)? {
                Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
                Some(_) => {
                    return Err(Error::msg(format!("JSON property '{key}' is not a number")));
                },
                None => {
                    return Err(Error::msg(format!(
                        "The given key '{key}' was not present in the dictionary."
                    )));
                },
            };
            util::ret_f64(outputs, number)
        },
        other => Err(Error::msg(format!("{other} is not a JSON function"))),
    }
}

/// Top-level member `key` of the JSON object in `document`.
fn member(document: &str, key: &str) -> Result<Option<Value>, Error> {
    let value: Value = serde_json::from_str(document)
        .map_err(|e| Error::msg(format!("invalid JSON document: {e}")))?;
    match value {
        Value::Object(mut map) => Ok(map.remove(key)),
        _ => Err(Error::msg("JSON document is not an object")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_lookup() {
        let doc = r#"{"name":"crucible","size":3}"#;
        assert_eq!(member(doc, "name").unwrap(), Some(Value::from("crucible")));
        assert_eq!(member(doc, "missing").unwrap(), None);
        assert!(member("[1]", "x").is_err());
        assert!(member("{", "x").is_err());
    }
}
