//! Host-function ABI shared by the compiler and the sandbox.
//!
//! Guest modules import host functions from the `extism:host/user` namespace.
//! The compiler emits imports from this table; the sandbox registers an
//! implementation for every entry. Strings cross the boundary as Extism
//! memory handles (`i64`, `0` meaning the empty/null string), booleans as
//! `i32`.

use std::fmt;

/// Import namespace for host functions.
pub const HOST_NAMESPACE: &str = "extism:host/user";

/// Import namespace for the Extism kernel (allocation, byte stores).
pub const KERNEL_NAMESPACE: &str = "extism:host/env";

/// Import namespace for WASI preview 1.
pub const WASI_NAMESPACE: &str = "wasi_snapshot_preview1";

/// Core WebAssembly value types used by the host ABI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WasmType {
    /// 32-bit integer (`int`, `bool`, array pointers).
    I32,
    /// 64-bit integer (`long`, string handles).
    I64,
    /// 64-bit float (`double`).
    F64,
}

impl fmt::Display for WasmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::F64 => "f64",
        })
    }
}

macro_rules! host_functions {
    ($($(#[$doc:meta])* $variant:ident => $name:literal ($($param:ident),*) -> [$($result:ident),*];)*) => {
        /// Registry of every host function a guest module may import.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum HostFunction {
            $($(#[$doc])* $variant,)*
        }

        impl HostFunction {
            /// Every host function, in import order.
            pub const ALL: &'static [Self] = &[$(Self::$variant,)*];

            /// Import name inside [`HOST_NAMESPACE`].
            #[must_use]
            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)*
                }
            }

            /// Parameter types.
            #[must_use]
            pub fn params(self) -> &'static [WasmType] {
                match self {
                    $(Self::$variant => &[$(WasmType::$param),*],)*
                }
            }

            /// Result types (empty or a single value).
            #[must_use]
            pub fn results(self) -> &'static [WasmType] {
                match self {
                    $(Self::$variant => &[$(WasmType::$result),*],)*
                }
            }
        }
    };
}

host_functions! {
    /// Write a string without a newline.
    ConsoleWriteStr => "cr_console_write_str" (I64) -> [];
    /// Write an `int` without a newline.
    ConsoleWriteI32 => "cr_console_write_i32" (I32) -> [];
    /// Write a `long` without a newline.
    ConsoleWriteI64 => "cr_console_write_i64" (I64) -> [];
    /// Write a `double` without a newline.
    ConsoleWriteF64 => "cr_console_write_f64" (F64) -> [];
    /// Write a `bool` without a newline.
    ConsoleWriteBool => "cr_console_write_bool" (I32) -> [];
    /// Write a string followed by a newline.
    ConsoleWriteLineStr => "cr_console_write_line_str" (I64) -> [];
    /// Write an `int` followed by a newline.
    ConsoleWriteLineI32 => "cr_console_write_line_i32" (I32) -> [];
    /// Write a `long` followed by a newline.
    ConsoleWriteLineI64 => "cr_console_write_line_i64" (I64) -> [];
    /// Write a `double` followed by a newline.
    ConsoleWriteLineF64 => "cr_console_write_line_f64" (F64) -> [];
    /// Write a `bool` followed by a newline.
    ConsoleWriteLineBool => "cr_console_write_line_bool" (I32) -> [];
    /// Write a bare newline.
    ConsoleNewLine => "cr_console_new_line" () -> [];

    /// Concatenate two strings.
    StrConcat => "cr_str_concat" (I64, I64) -> [I64];
    /// Ordinal string equality.
    StrEquals => "cr_str_equals" (I64, I64) -> [I32];
    /// Length in characters.
    StrLength => "cr_str_length" (I64) -> [I32];
    /// Format an `int`.
    StrFromI32 => "cr_str_from_i32" (I32) -> [I64];
    /// Format a `long`.
    StrFromI64 => "cr_str_from_i64" (I64) -> [I64];
    /// Format a `double`.
    StrFromF64 => "cr_str_from_f64" (F64) -> [I64];
    /// Format a `bool` as `True`/`False`.
    StrFromBool => "cr_str_from_bool" (I32) -> [I64];
    /// Upper-case copy.
    StrToUpper => "cr_str_to_upper" (I64) -> [I64];
    /// Lower-case copy.
    StrToLower => "cr_str_to_lower" (I64) -> [I64];
    /// Copy without leading and trailing whitespace.
    StrTrim => "cr_str_trim" (I64) -> [I64];
    /// Substring containment.
    StrContains => "cr_str_contains" (I64, I64) -> [I32];
    /// Prefix test.
    StrStartsWith => "cr_str_starts_with" (I64, I64) -> [I32];
    /// Suffix test.
    StrEndsWith => "cr_str_ends_with" (I64, I64) -> [I32];
    /// Character index of the first occurrence, or `-1`.
    StrIndexOf => "cr_str_index_of" (I64, I64) -> [I32];
    /// Substring by character start and length.
    StrSubstring => "cr_str_substring" (I64, I32, I32) -> [I64];
    /// Replace every occurrence.
    StrReplace => "cr_str_replace" (I64, I64, I64) -> [I64];
    /// Repeat a string `n` times.
    StrRepeat => "cr_str_repeat" (I64, I32) -> [I64];
    /// Reverse the characters of a string.
    StrReverse => "cr_str_reverse" (I64) -> [I64];
    /// One-character string at a character index.
    StrCharAt => "cr_str_char_at" (I64, I32) -> [I64];
    /// Parse an `int`; faults on malformed input.
    StrParseI32 => "cr_str_parse_i32" (I64) -> [I32];
    /// Parse a `double`; faults on malformed input.
    StrParseF64 => "cr_str_parse_f64" (I64) -> [F64];

    /// `x` raised to the power `y`.
    MathPow => "cr_math_pow" (F64, F64) -> [F64];

    /// Store a key/value pair in the instance table.
    TableSet => "cr_table_set" (I64, I64) -> [];
    /// Look a key up; the empty string when absent.
    TableGet => "cr_table_get" (I64) -> [I64];
    /// Key presence test.
    TableHas => "cr_table_has" (I64) -> [I32];
    /// Remove a key, reporting whether it was present.
    TableRemove => "cr_table_remove" (I64) -> [I32];
    /// Number of entries.
    TableCount => "cr_table_count" () -> [I32];
    /// Remove every entry.
    TableClear => "cr_table_clear" () -> [];

    /// Block the guest for a number of milliseconds.
    ThreadSleep => "cr_thread_sleep" (I32) -> [];
    /// Milliseconds since the Unix epoch.
    ClockMillis => "cr_clock_millis" () -> [I64];

    /// Encode a string as a JSON string literal.
    JsonQuote => "cr_json_quote" (I64) -> [I64];
    /// Whether a string is well-formed JSON.
    JsonIsValid => "cr_json_is_valid" (I64) -> [I32];
    /// Read a top-level string property; the empty string when absent.
    JsonGetString => "cr_json_get_string" (I64, I64) -> [I64];
    /// Read a top-level numeric property; faults when absent.
    JsonGetNumber => "cr_json_get_number" (I64, I64) -> [F64];

    /// Read a whole file inside a granted directory.
    FileReadText => "cr_file_read_text" (I64) -> [I64];
    /// Create or truncate a file inside a granted directory.
    FileWriteText => "cr_file_write_text" (I64, I64) -> [];
    /// Append to a file inside a granted directory.
    FileAppendText => "cr_file_append_text" (I64, I64) -> [];
    /// File presence test inside a granted directory.
    FileExists => "cr_file_exists" (I64) -> [I32];
    /// Delete a file inside a granted directory.
    FileDelete => "cr_file_delete" (I64) -> [];

    /// Raise a runtime fault with one of the [`FaultCode`] values.
    RuntimeFault => "cr_runtime_fault" (I32) -> [];
}

impl HostFunction {
    /// Look a host function up by import name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.name() == name)
    }

    /// Position inside [`HostFunction::ALL`].
    #[must_use]
    pub fn index(self) -> usize {
        Self::ALL.iter().position(|f| *f == self).unwrap_or_default()
    }
}

impl fmt::Display for HostFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Runtime fault codes raised by generated code through
/// [`HostFunction::RuntimeFault`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum FaultCode {
    /// Array index outside `0..length`.
    IndexOutOfRange = 1,
    /// Dereference of a null array.
    NullReference = 2,
    /// Negative array length in `new T[n]`.
    NegativeArraySize = 3,
    /// Aggregate over an empty sequence.
    EmptySequence = 4,
}

impl FaultCode {
    /// Decode a raw code.
    #[must_use]
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            1 => Some(Self::IndexOutOfRange),
            2 => Some(Self::NullReference),
            3 => Some(Self::NegativeArraySize),
            4 => Some(Self::EmptySequence),
            _ => None,
        }
    }

    /// Fault message surfaced to the caller.
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::IndexOutOfRange => "Index was outside the bounds of the array.",
            Self::NullReference => "Object reference not set to an instance of an object.",
            Self::NegativeArraySize => "Arithmetic operation resulted in an overflow.",
            Self::EmptySequence => "Sequence contains no elements",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_are_unique() {
        let names: HashSet<_> = HostFunction::ALL.iter().map(|f| f.name()).collect();
        assert_eq!(names.len(), HostFunction::ALL.len());
    }

    #[test]
    fn test_from_name_round_trips() {
        for func in HostFunction::ALL {
            assert_eq!(HostFunction::from_name(func.name()), Some(*func));
        }
        assert_eq!(HostFunction::from_name("cr_missing"), None);
    }

    #[test]
    fn test_results_are_single_valued() {
        assert!(HostFunction::ALL.iter().all(|f| f.results().len() <= 1));
    }

    #[test]
    fn test_console_signature() {
        assert_eq!(HostFunction::ConsoleWriteLineI32.params(), &[WasmType::I32]);
        assert!(HostFunction::ConsoleWriteLineI32.results().is_empty());
        assert_eq!(HostFunction::StrConcat.results(), &[WasmType::I64]);
    }

    #[test]
    fn test_fault_codes() {
        assert_eq!(FaultCode::from_raw(1), Some(FaultCode::IndexOutOfRange));
        assert_eq!(FaultCode::from_raw(9), None);
    }
}
