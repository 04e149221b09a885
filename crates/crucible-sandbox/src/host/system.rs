use std::time::{Duration, Instant};

use crucible_core::FaultCode;
use extism::{Error, UserData, Val};
use tracing::debug;

use crate::host::util;
use crate::state::HostState;

/// Granularity at which sleeping guests notice an interrupt.
const SLEEP_SLICE: Duration = Duration::from_millis(10);

/// `Thread.Sleep(ms)`; returns early once the invocation is interrupted.
pub(crate) fn sleep(inputs: &[Val], user_data: &UserData<HostState>) -> Result<(), Error> {
    let ms = util::arg_i32(inputs, 0)?;
    let ms = u64::try_from(ms).map_err(|_| {
        Error::msg("Number must be either non-negative and less than or equal to Int32.MaxValue or -1. (Parameter 'millisecondsTimeout')")
    })?;

    let interrupted = {
        let shared = util::shared(user_data)?;
        let state = util::lock(&shared)?;
        std::sync::Arc::clone(&state.interrupted)
    };
    let deadline = Instant::now()
        .checked_add(Duration::from_millis(ms))
        .ok_or_else(|| Error::msg("sleep duration out of range"))?;
    loop {
        if interrupted.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(Error::msg("interrupted"));
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(());
        }
        std::thread::sleep(remaining.min(SLEEP_SLICE));
    }
}

/// `Clock.Millis()`: milliseconds since the Unix epoch.
pub(crate) fn clock_millis(outputs: &mut [Val]) -> Result<(), Error> {
    util::ret_i64(outputs, chrono::Utc::now().timestamp_millis())
}

/// `Math.Pow(x, y)`.
pub(crate) fn pow(inputs: &[Val], outputs: &mut [Val]) -> Result<(), Error> {
    let base = util::arg_f64(inputs, 0)?;
    let exponent = util::arg_f64(inputs, 1)?;
    util::ret_f64(outputs, base.powf(exponent))
}

/// Record a fault raised by generated code. The guest traps right after.
pub(crate) fn runtime_fault(inputs: &[Val], user_data: &UserData<HostState>) -> Result<(), Error> {
    let raw = util::arg_i32(inputs, 0)?;
    let code = FaultCode::from_raw(raw);
    {
        let shared = util::shared(user_data)?;
        let mut state = util::lock(&shared)?;
        state.fault = code;
    }
    debug!(code = raw, "Guest raised a runtime fault");
    Err(Error::msg(
        code.map_or("unknown runtime fault", FaultCode::message),
    ))
}
