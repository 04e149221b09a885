//! Diagnostic mapping.
//!
//! Converts toolchain diagnostics into the caller-facing
//! [`CompilationError`] records: errors only, 1-based positions, relative
//! to the code the caller submitted.

use crucible_compiler::Diagnostic;
use crucible_core::{CompilationError, CompilationResult};

/// Where the caller's code sits inside the compiled source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineOffset {
    /// Synthesized lines preceding the caller's code.
    pub prologue: u32,
    /// Lines of caller code, when synthesized lines follow it.
    pub body_lines: Option<u32>,
}

impl LineOffset {
    /// The caller's code is the whole source.
    pub const NONE: Self = Self {
        prologue: 0,
        body_lines: None,
    };

    /// Caller code of `body_lines` lines between a prologue and an epilogue.
    #[must_use]
    pub const fn around(prologue: u32, body_lines: u32) -> Self {
        Self {
            prologue,
            body_lines: Some(body_lines),
        }
    }
}

/// Map every error-severity diagnostic, in order.
///
/// Diagnostics without a location, or located inside the synthesized
/// prologue, get line 0 and no column. Diagnostics in the epilogue, such as
/// a `}` expected at end of input, land on the caller's last line with no
/// column.
#[must_use]
pub fn map_errors(diagnostics: &[Diagnostic], offset: LineOffset) -> Vec<CompilationError> {
    diagnostics
        .iter()
        .filter(|d| d.is_error())
        .map(|d| map_one(d, offset))
        .collect()
}

/// Build the [`CompilationResult`] for a set of diagnostics.
#[must_use]
pub fn to_result(diagnostics: &[Diagnostic], offset: LineOffset) -> CompilationResult {
    CompilationResult::failed(map_errors(diagnostics, offset))
}

fn map_one(diagnostic: &Diagnostic, offset: LineOffset) -> CompilationError {
    let position = diagnostic.location.and_then(|loc| {
        let line = loc.line.checked_sub(offset.prologue)?;
        match offset.body_lines {
            Some(lines) if line >= lines => Some((lines.max(1), None)),
            _ => Some((line.checked_add(1)?, Some(loc.column.saturating_add(1)))),
        }
    });
    CompilationError {
        id: diagnostic.id().to_owned(),
        line: position.map_or(0, |(line, _)| line),
        column: position.and_then(|(_, column)| column),
        message: diagnostic.message.clone(),
        severity: diagnostic.severity,
    }
}
