//! Host functions exposed to guest modules.
//!
//! Every [`HostFunction`] is registered on every plugin; the compiler
//! imports the whole table regardless of what a program uses.

/// `Core.Collections.Table`.
mod collections;
/// `Console`.
mod console;
/// `Sandbox.IO.File`.
mod fs;
/// `Core.Serialization.Json`.
mod json;
/// `Math.Pow`, `Thread.Sleep`, `Clock` and runtime faults.
mod system;
/// String operations.
mod text;
/// Argument and return marshalling.
pub(crate) mod util;

use crucible_core::{HostFunction, WasmType};
use extism::{CurrentPlugin, Error, PluginBuilder, UserData, Val, ValType};

use crate::state::HostState;

fn val_type(ty: WasmType) -> ValType {
    match ty {
        WasmType::I32 => ValType::I32,
        WasmType::I64 => ValType::I64,
        WasmType::F64 => ValType::F64,
    }
}

/// Register the full host-function table on `builder`.
pub(crate) fn register_host_functions<'a>(
    mut builder: PluginBuilder<'a>,
    user_data: &UserData<HostState>,
) -> PluginBuilder<'a> {
    for &func in HostFunction::ALL {
        let params: Vec<ValType> = func.params().iter().copied().map(val_type).collect();
        let results: Vec<ValType> = func.results().iter().copied().map(val_type).collect();
        builder = builder.with_function(
            func.name(),
            params,
            results,
            user_data.clone(),
            move |plugin: &mut CurrentPlugin,
                  inputs: &[Val],
                  outputs: &mut [Val],
                  user_data: UserData<HostState>| {
                dispatch(func, plugin, inputs, outputs, &user_data)
            },
        );
    }
    builder
}

fn dispatch(
    host: HostFunction,
    plugin: &mut CurrentPlugin,
    inputs: &[Val],
    outputs: &mut [Val],
    user_data: &UserData<HostState>,
) -> Result<(), Error> {
    use HostFunction as H;

    match host {
        H::ConsoleWriteStr
        | H::ConsoleWriteI32
        | H::ConsoleWriteI64
        | H::ConsoleWriteF64
        | H::ConsoleWriteBool
        | H::ConsoleWriteLineStr
        | H::ConsoleWriteLineI32
        | H::ConsoleWriteLineI64
        | H::ConsoleWriteLineF64
        | H::ConsoleWriteLineBool
        | H::ConsoleNewLine => console::write(host, plugin, inputs, user_data),
        H::StrConcat
        | H::StrEquals
        | H::StrLength
        | H::StrFromI32
        | H::StrFromI64
        | H::StrFromF64
        | H::StrFromBool
        | H::StrToUpper
        | H::StrToLower
        | H::StrTrim
        | H::StrContains
        | H::StrStartsWith
        | H::StrEndsWith
        | H::StrIndexOf
        | H::StrSubstring
        | H::StrReplace
        | H::StrRepeat
        | H::StrReverse
        | H::StrCharAt
        | H::StrParseI32
        | H::StrParseF64 => text::call(host, plugin, inputs, outputs),
        H::MathPow => system::pow(inputs, outputs),
        H::TableSet
        | H::TableGet
        | H::TableHas
        | H::TableRemove
        | H::TableCount
        | H::TableClear => collections::call(host, plugin, inputs, outputs, user_data),
        H::ThreadSleep => system::sleep(inputs, user_data),
        H::ClockMillis => system::clock_millis(outputs),
        H::JsonQuote | H::JsonIsValid | H::JsonGetString | H::JsonGetNumber => {
            json::call(host, plugin, inputs, outputs)
        },
        H::FileReadText
        | H::FileWriteText
        | H::FileAppendText
        | H::FileExists
        | H::FileDelete => fs::call(host, plugin, inputs, outputs, user_data),
        H::RuntimeFault => system::runtime_fault(inputs, user_data),
    }
}
