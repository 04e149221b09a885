//! Caller-facing compilation diagnostics.
//!
//! These records are what leaves the service boundary: the compiler's own
//! diagnostics are mapped into [`CompilationError`] values (1-based positions,
//! error severity only) and collected into a [`CompilationResult`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Diagnostic severity, ordered from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    /// The program is invalid and cannot be emitted.
    Error,
    /// Suspicious but valid code.
    Warning,
    /// Informational message.
    Info,
    /// Not shown to users (e.g. redundant imports).
    Hidden,
}

impl Severity {
    /// Stable display name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "Error",
            Self::Warning => "Warning",
            Self::Info => "Info",
            Self::Hidden => "Hidden",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single compilation error as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilationError {
    /// Stable diagnostic identifier (e.g. `CRU1002`).
    pub id: String,
    /// 1-based line number. Zero when the diagnostic has no source location.
    pub line: u32,
    /// 1-based column, absent when the diagnostic has no source location.
    pub column: Option<u32>,
    /// Human-readable message.
    pub message: String,
    /// Severity of the underlying diagnostic.
    pub severity: Severity,
}

impl fmt::Display for CompilationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.column {
            Some(col) => write!(
                f,
                "({},{}): {} {}: {}",
                self.line, col, self.severity, self.id, self.message
            ),
            None => write!(f, "{} {}: {}", self.severity, self.id, self.message),
        }
    }
}

/// Outcome of a compilation request.
///
/// `errors` is empty if and only if `success` is true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilationResult {
    /// Whether the unit compiled without error-severity diagnostics.
    pub success: bool,
    /// Error-severity diagnostics, in source order.
    pub errors: Vec<CompilationError>,
}

impl CompilationResult {
    /// A successful compilation.
    #[must_use]
    pub fn ok() -> Self {
        Self {
            success: true,
            errors: Vec::new(),
        }
    }

    /// A failed compilation.
    ///
    /// An empty error list is not a failure; it yields [`CompilationResult::ok`]
    /// so the `success`/`errors` invariant always holds.
    #[must_use]
    pub fn failed(errors: Vec<CompilationError>) -> Self {
        if errors.is_empty() {
            return Self::ok();
        }
        Self {
            success: false,
            errors,
        }
    }

    /// Number of errors carried by this result.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_error() -> CompilationError {
        CompilationError {
            id: "CRU1002".to_string(),
            line: 3,
            column: Some(14),
            message: "; expected".to_string(),
            severity: Severity::Error,
        }
    }

    #[test]
    fn test_failed_with_empty_list_is_ok() {
        let result = CompilationResult::failed(Vec::new());
        assert!(result.success);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_failed_keeps_errors() {
        let result = CompilationResult::failed(vec![sample_error()]);
        assert!(!result.success);
        assert_eq!(result.error_count(), 1);
    }

    #[test]
    fn test_json_shape() {
        let result = CompilationResult::failed(vec![sample_error()]);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["errors"][0]["id"], "CRU1002");
        assert_eq!(json["errors"][0]["line"], 3);
        assert_eq!(json["errors"][0]["column"], 14);
        assert_eq!(json["errors"][0]["severity"], "Error");
    }

    #[test]
    fn test_ok_json_shape() {
        let json = serde_json::to_string(&CompilationResult::ok()).unwrap();
        assert_eq!(json, r#"{"success":true,"errors":[]}"#);
    }

    #[test]
    fn test_display_with_location() {
        assert_eq!(
            sample_error().to_string(),
            "(3,14): Error CRU1002: ; expected"
        );
    }
}
