//! String host functions.
//!
//! Lengths and indices count UTF-16 code units, matching what guest
//! programs observe through `Length` and `IndexOf`.

use crucible_core::HostFunction;
use extism::{CurrentPlugin, Error, Val};

use crate::host::util::{self, MAX_GUEST_STRING_LEN};

/// Strings longer than this are never produced by `Repeat`.
const MAX_RESULT_LEN: usize = 10 * 1024 * 1024;

pub(crate) fn call(
    host: HostFunction,
    plugin: &mut CurrentPlugin,
    inputs: &[Val],
    outputs: &mut [Val],
) -> Result<(), Error> {
    use HostFunction as H;

    let text = |plugin: &mut CurrentPlugin, index: usize| {
        util::arg_str(plugin, inputs, index, MAX_GUEST_STRING_LEN)
    };

    match host {
        H::StrConcat => {
            let mut left = text(plugin, 0)?;
            left.push_str(&text(plugin, 1)?);
            util::ret_str(plugin, outputs, &left)
        },
        H::StrEquals => {
            let equal = text(plugin, 0)? == text(plugin, 1)?;
            util::ret_bool(outputs, equal)
        },
        H::StrLength => {
            let len = utf16_len(&text(plugin, 0)?)?;
            util::ret_i32(outputs, len)
        },
        H::StrFromI32 => {
            let value = util::arg_i32(inputs, 0)?;
            util::ret_str(plugin, outputs, &value.to_string())
        },
        H::StrFromI64 => {
            let value = util::arg_i64(inputs, 0)?;
            util::ret_str(plugin, outputs, &value.to_string())
        },
        H::StrFromF64 => {
            let value = util::arg_f64(inputs, 0)?;
            util::ret_str(plugin, outputs, &util::format_double(value))
        },
        H::StrFromBool => {
            let value = util::arg_bool(inputs, 0)?;
            util::ret_str(plugin, outputs, util::format_bool(value))
        },
        H::StrToUpper => {
            let s = text(plugin, 0)?.to_uppercase();
            util::ret_str(plugin, outputs, &s)
        },
        H::StrToLower => {
            let s = text(plugin, 0)?.to_lowercase();
            util::ret_str(plugin, outputs, &s)
        },
        H::StrTrim => {
            let s = text(plugin, 0)?;
            util::ret_str(plugin, outputs, s.trim())
        },
        H::StrContains => {
            let (s, needle) = (text(plugin, 0)?, text(plugin, 1)?);
            util::ret_bool(outputs, s.contains(&needle))
        },
        H::StrStartsWith => {
            let (s, prefix) = (text(plugin, 0)?, text(plugin, 1)?);
            util::ret_bool(outputs, s.starts_with(&prefix))
        },
        H::StrEndsWith => {
            let (s, suffix) = (text(plugin, 0)?, text(plugin, 1)?);
            util::ret_bool(outputs, s.ends_with(&suffix))
        },
        H::StrIndexOf => {
            let (s, needle) = (text(plugin, 0)?, text(plugin, 1)?);
            util::ret_i32(outputs, index_of(&s, &needle)?)
        },
        H::StrSubstring => {
            let s = text(plugin, 0)?;
            let start = util::arg_i32(inputs, 1)?;
            let len = util::arg_i32(inputs, 2)?;
            let sub = substring(&s, start, len)?;
            util::ret_str(plugin, outputs, &sub)
        },
        H::StrReplace => {
            let (s, from, to) = (text(plugin, 0)?, text(plugin, 1)?, text(plugin, 2)?);
            if from.is_empty() {
                return Err(Error::msg("String cannot be of zero length. (Parameter 'oldValue')"));
            }
            util::ret_str(plugin, outputs, &s.replace(&from, &to))
        },
        H::StrRepeat => {
            let s = text(plugin, 0)?;
            let count = util::arg_i32(inputs, 1)?;
            let repeated = repeat(&s, count)?;
            util::ret_str(plugin, outputs, &repeated)
        },
        H::StrReverse => {
            let s: String = text(plugin, 0)?.chars().rev().collect();
            util::ret_str(plugin, outputs, &s)
        },
        H::StrCharAt => {
            let s = text(plugin, 0)?;
            let index = util::arg_i32(inputs, 1)?;
            let sub = substring(&s, index, 1)?;
            util::ret_str(plugin, outputs, &sub)
        },
        H::StrParseI32 => {
            let s = text(plugin, 0)?;
            let value = s.trim().parse::<i32>().map_err(|_| format_error(&s))?;
            util::ret_i32(outputs, value)
        },
        H::StrParseF64 => {
            let s = text(plugin, 0)?;
            let value = s.trim().parse::<f64>().map_err(|_| format_error(&s))?;
            util::ret_f64(outputs, value)
        },
        other => Err(Error::msg(format!("{other} is not a string function"))),
    }
}

fn format_error(input: &str) -> Error {
    Error::msg(format!("The input string '{input}' was not in a correct format."))
}

fn utf16_len(s: &str) -> Result<i32, Error> {
    i32::try_from(s.encode_utf16().count()).map_err(|_| Error::msg("string too long"))
}

/// UTF-16 index of the first occurrence of `needle`, `-1` when absent.
fn index_of(s: &str, needle: &str) -> Result<i32, Error> {
    match s.find(needle) {
        Some(byte) => utf16_len(&s[..byte]),
        None => Ok(-1),
    }
}

/// `len` UTF-16 units of `s` from `start`; a negative `len` takes the rest.
fn substring(s: &str, start: i32, len: i32) -> Result<String, Error> {
    let units: Vec<u16> = s.encode_utf16().collect();
    let out_of_range = || {
        Error::msg("Index and length must refer to a location within the string.")
    };
    let start = usize::try_from(start).map_err(|_| out_of_range())?;
    let end = if len < 0 {
        units.len()
    } else {
        start
            .checked_add(usize::try_from(len).map_err(|_| out_of_range())?)
            .ok_or_else(out_of_range)?
    };
    let slice = units.get(start..end).ok_or_else(out_of_range)?;
    Ok(String::from_utf16_lossy(slice))
}

fn repeat(s: &str, count: i32) -> Result<String, Error> {
    let count = usize::try_from(count)
        .map_err(|_| Error::msg("Count cannot be less than zero. (Parameter 'count')"))?;
    match s.len().checked_mul(count) {
        Some(total) if total <= MAX_RESULT_LEN => Ok(s.repeat(count)),
        _ => Err(Error::msg("repeated string exceeds the maximum length")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substring_counts_utf16_units() {
        assert_eq!(substring("hello", 1, 3).unwrap(), "ell");
        assert_eq!(substring("hello", 2, -1).unwrap(), "llo");
        assert_eq!(substring("hello", 5, 0).unwrap(), "");
        assert!(substring("hello", 4, 2).is_err());
        assert!(substring("hello", -1, 1).is_err());
        assert_eq!(substring("añb", 1, 1).unwrap(), "ñ");
    }

    #[test]
    fn test_index_of() {
        assert_eq!(index_of("añb", "b").unwrap(), 2);
        assert_eq!(index_of("abc", "x").unwrap(), -1);
        assert_eq!(index_of("abc", "").unwrap(), 0);
    }

    #[test]
    fn test_repeat_rejects_negative_count() {
        assert_eq!(repeat("ab", 3).unwrap(), "ababab");
        assert_eq!(repeat("ab", 0).unwrap(), "");
        assert!(repeat("ab", -1).is_err());
    }
}
