use crucible_core::HostFunction;
use extism::{CurrentPlugin, Error, UserData, Val};

use crate::host::util;
use crate::state::HostState;

/// `Console.Write` / `Console.WriteLine` for every argument type.
pub(crate) fn write(
    host: HostFunction,
    plugin: &mut CurrentPlugin,
    inputs: &[Val],
    user_data: &UserData<HostState>,
) -> Result<(), Error> {
    use HostFunction as H;

    let text = match host {
        H::ConsoleWriteStr | H::ConsoleWriteLineStr => {
            util::arg_str(plugin, inputs, 0, util::MAX_GUEST_STRING_LEN)?
        },
        H::ConsoleWriteI32 | H::ConsoleWriteLineI32 => util::arg_i32(inputs, 0)?.to_string(),
        H::ConsoleWriteI64 | H::ConsoleWriteLineI64 => util::arg_i64(inputs, 0)?.to_string(),
        H::ConsoleWriteF64 | H::ConsoleWriteLineF64 => {
            util::format_double(util::arg_f64(inputs, 0)?)
        },
        H::ConsoleWriteBool | H::ConsoleWriteLineBool => {
            util::format_bool(util::arg_bool(inputs, 0)?).to_owned()
        },
        H::ConsoleNewLine => String::new(),
        other => return Err(Error::msg(format!("{other} is not a console function"))),
    };
    let newline = matches!(
        host,
        H::ConsoleWriteLineStr
            | H::ConsoleWriteLineI32
            | H::ConsoleWriteLineI64
            | H::ConsoleWriteLineF64
            | H::ConsoleWriteLineBool
            | H::ConsoleNewLine
    );

    let shared = util::shared(user_data)?;
    let mut state = util::lock(&shared)?;
    state.write_stdout(&text);
    if newline {
        state.write_stdout("\n");
    }
    Ok(())
}
