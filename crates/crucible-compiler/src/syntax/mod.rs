//! Lexing and parsing of guest source.

pub mod ast;
mod lexer;
mod parser;
mod token;

pub(crate) use lexer::lex;
pub(crate) use parser::parse;
pub use token::{Token, TokenKind, TokenValue};

use crate::diagnostics::Location;

/// Half-open byte range into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// First byte.
    pub start: u32,
    /// One past the last byte.
    pub end: u32,
}

impl Span {
    /// Create a span from byte offsets.
    #[must_use]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Smallest span covering both.
    #[must_use]
    pub fn to(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

/// Maps byte offsets to 0-based line/column positions.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<u32>,
    text: String,
}

impl LineIndex {
    /// Index the line starts of `text`.
    #[must_use]
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(u32::try_from(i).unwrap_or(u32::MAX).saturating_add(1));
            }
        }
        Self {
            line_starts,
            text: text.to_owned(),
        }
    }

    /// Position of byte `offset`. Columns count characters, not bytes.
    #[must_use]
    pub fn location(&self, offset: u32) -> Location {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next.saturating_sub(1),
        };
        let start = self.line_starts.get(line).copied().unwrap_or_default();
        let column = self
            .text
            .get(start as usize..offset as usize)
            .map_or(0, |s| s.chars().count());
        Location {
            line: u32::try_from(line).unwrap_or(u32::MAX),
            column: u32::try_from(column).unwrap_or(u32::MAX),
        }
    }

    /// Number of lines (a trailing newline starts a new, empty line).
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_first_line() {
        let index = LineIndex::new("int x;\nint y;");
        assert_eq!(index.location(4), Location { line: 0, column: 4 });
    }

    #[test]
    fn test_location_after_newline() {
        let index = LineIndex::new("int x;\nint y;");
        assert_eq!(index.location(7), Location { line: 1, column: 0 });
        assert_eq!(index.location(11), Location { line: 1, column: 4 });
    }

    #[test]
    fn test_columns_count_chars() {
        let index = LineIndex::new("\"é\" + x");
        // 'x' is at byte 7 but character 6.
        assert_eq!(index.location(7), Location { line: 0, column: 6 });
    }

    #[test]
    fn test_line_count() {
        assert_eq!(LineIndex::new("a\nb\n").line_count(), 3);
        assert_eq!(LineIndex::new("").line_count(), 1);
    }
}
