//! Value marshalling between generated code and host functions.
//!
//! Strings cross the boundary as Extism memory handles; handle `0` is the
//! empty string (and `null`). Booleans are `i32`.

use std::sync::{Arc, Mutex, MutexGuard};

use extism::{CurrentPlugin, Error, UserData, Val};

use crate::state::HostState;

/// Maximum accepted length of a guest string (10 MB).
pub(crate) const MAX_GUEST_STRING_LEN: u64 = 10 * 1024 * 1024;

/// Maximum accepted length of a file path (4 KB).
pub(crate) const MAX_PATH_LEN: u64 = 4 * 1024;

/// Argument `index` as `i32`.
pub(crate) fn arg_i32(inputs: &[Val], index: usize) -> Result<i32, Error> {
    match inputs.get(index) {
        Some(Val::I32(v)) => Ok(*v),
        other => Err(Error::msg(format!("argument {index}: expected i32, got {other:?}"))),
    }
}

/// Argument `index` as `i64`.
pub(crate) fn arg_i64(inputs: &[Val], index: usize) -> Result<i64, Error> {
    match inputs.get(index) {
        Some(Val::I64(v)) => Ok(*v),
        other => Err(Error::msg(format!("argument {index}: expected i64, got {other:?}"))),
    }
}

/// Argument `index` as `f64`.
pub(crate) fn arg_f64(inputs: &[Val], index: usize) -> Result<f64, Error> {
    match inputs.get(index) {
        Some(Val::F64(bits)) => Ok(f64::from_bits(*bits)),
        other => Err(Error::msg(format!("argument {index}: expected f64, got {other:?}"))),
    }
}

/// Argument `index` as `bool`.
pub(crate) fn arg_bool(inputs: &[Val], index: usize) -> Result<bool, Error> {
    arg_i32(inputs, index).map(|v| v != 0)
}

/// Read the string behind argument `index`, enforcing `limit` before
/// copying it out of plugin memory.
#[allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]
pub(crate) fn arg_str(
    plugin: &mut CurrentPlugin,
    inputs: &[Val],
    index: usize,
    limit: u64,
) -> Result<String, Error> {
    let handle = arg_i64(inputs, index)?;
    if handle == 0 {
        return Ok(String::new());
    }
    let len = plugin.memory_length(handle as u64)?;
    if len > limit {
        return Err(Error::msg(format!(
            "string of {len} bytes exceeds maximum allowed length of {limit} bytes"
        )));
    }
    plugin.memory_get_val(&Val::I64(handle))
}

/// Store `text` in plugin memory and place its handle in `outputs[0]`.
pub(crate) fn ret_str(
    plugin: &mut CurrentPlugin,
    outputs: &mut [Val],
    text: &str,
) -> Result<(), Error> {
    let val = if text.is_empty() {
        Val::I64(0)
    } else {
        let mem = plugin.memory_new(text)?;
        plugin.memory_to_val(mem)
    };
    set(outputs, val)
}

pub(crate) fn ret_i32(outputs: &mut [Val], value: i32) -> Result<(), Error> {
    set(outputs, Val::I32(value))
}

pub(crate) fn ret_i64(outputs: &mut [Val], value: i64) -> Result<(), Error> {
    set(outputs, Val::I64(value))
}

pub(crate) fn ret_f64(outputs: &mut [Val], value: f64) -> Result<(), Error> {
    set(outputs, Val::F64(value.to_bits()))
}

pub(crate) fn ret_bool(outputs: &mut [Val], value: bool) -> Result<(), Error> {
    ret_i32(outputs, i32::from(value))
}

fn set(outputs: &mut [Val], val: Val) -> Result<(), Error> {
    let slot = outputs
        .first_mut()
        .ok_or_else(|| Error::msg("host function has no result slot"))?;
    *slot = val;
    Ok(())
}

/// Shared host state behind `user_data`.
pub(crate) fn shared(user_data: &UserData<HostState>) -> Result<Arc<Mutex<HostState>>, Error> {
    user_data.get()
}

/// Lock host state, mapping poisoning to a guest-visible error.
pub(crate) fn lock(state: &Mutex<HostState>) -> Result<MutexGuard<'_, HostState>, Error> {
    state
        .lock()
        .map_err(|e| Error::msg(format!("host state lock poisoned: {e}")))
}

/// Format a `double` the way guest programs expect (`3`, `0.5`, `1E+21`).
#[must_use]
pub(crate) fn format_double(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_owned();
    }
    if value.is_infinite() {
        return if value > 0.0 { "∞" } else { "-∞" }.to_owned();
    }
    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-5..1e15).contains(&magnitude) {
        // Rust prints `1e21` / `1.5e-7`; guests expect `1E+21` / `1.5E-07`.
        let formatted = format!("{value:E}");
        if let Some((mantissa, exponent)) = formatted.split_once('E') {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            return format!("{mantissa}E{sign}{digits:0>2}");
        }
        return formatted;
    }
    if value == 0.0 {
        // Includes negative zero.
        return "0".to_owned();
    }
    format!("{value}")
}

/// Format a `bool` the way guest programs expect.
#[must_use]
pub(crate) fn format_bool(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_double() {
        assert_eq!(format_double(2.0), "2");
        assert_eq!(format_double(0.5), "0.5");
        assert_eq!(format_double(-1.25), "-1.25");
        assert_eq!(format_double(1e21), "1E+21");
        assert_eq!(format_double(1.5e-7), "1.5E-07");
        assert_eq!(format_double(-0.0), "0");
        assert_eq!(format_double(f64::NAN), "NaN");
        assert_eq!(format_double(f64::NEG_INFINITY), "-∞");
    }

    #[test]
    fn test_argument_type_mismatch_is_an_error() {
        let inputs = [Val::I64(7)];
        assert_eq!(arg_i64(&inputs, 0).unwrap(), 7);
        assert!(arg_i32(&inputs, 0).is_err());
        assert!(arg_i64(&inputs, 1).is_err());
        assert!(arg_bool(&[Val::I32(2)], 0).unwrap());
    }
}
