// Offsets are bounded by the source length, which the service caps well below u32::MAX.
#![allow(clippy::arithmetic_side_effects)]

use super::Span;
use super::token::{Token, TokenKind, TokenValue};
use crate::diagnostics::{Code, DiagnosticBag};

/// Tokenize `source`. Always ends with an [`TokenKind::Eof`] token.
pub(crate) fn lex(source: &str, diags: &mut DiagnosticBag) -> Vec<Token> {
    Lexer::new(source, diags).run()
}

struct Lexer<'a> {
    src: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
    diags: &'a mut DiagnosticBag,
    tokens: Vec<Token>,
}

#[allow(clippy::cast_possible_truncation)]
fn offset(o: usize) -> u32 {
    o as u32
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str, diags: &'a mut DiagnosticBag) -> Self {
        Self {
            src,
            chars: src.char_indices().collect(),
            pos: 0,
            diags,
            tokens: Vec::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|(_, c)| *c)
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).map(|(_, c)| *c)
    }

    /// Byte offset of the current character (or end of input).
    fn byte_pos(&self) -> usize {
        self.chars.get(self.pos).map_or(self.src.len(), |(o, _)| *o)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn push(&mut self, kind: TokenKind, start: usize, value: TokenValue) {
        let span = Span::new(offset(start), offset(self.byte_pos()));
        self.tokens.push(Token { kind, span, value });
    }

    fn run(mut self) -> Vec<Token> {
        loop {
            self.skip_trivia();
            let start = self.byte_pos();
            let Some(c) = self.bump() else {
                self.push(TokenKind::Eof, start, TokenValue::None);
                return self.tokens;
            };

            match c {
                c if c.is_alphabetic() || c == '_' => self.word(start),
                c if c.is_ascii_digit() => self.number(start),
                '.' if self.peek().is_some_and(|d| d.is_ascii_digit()) => {
                    self.pos -= 1;
                    self.number(start);
                },
                '"' => self.string(start),
                _ => self.punct(c, start),
            }
        }
    }

    fn skip_trivia(&mut self) {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(c), _) if c.is_whitespace() => {
                    self.pos += 1;
                },
                (Some('/'), Some('/')) => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                },
                (Some('/'), Some('*')) => {
                    let start = self.byte_pos();
                    self.pos += 2;
                    loop {
                        match (self.peek(), self.peek_at(1)) {
                            (Some('*'), Some('/')) => {
                                self.pos += 2;
                                break;
                            },
                            (Some(_), _) => self.pos += 1,
                            (None, _) => {
                                self.diags.report(
                                    Code::UnterminatedComment,
                                    Span::new(offset(start), offset(start + 2)),
                                    "End-of-file found, '*/' expected",
                                );
                                break;
                            },
                        }
                    }
                },
                _ => return,
            }
        }
    }

    fn word(&mut self, start: usize) {
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            self.pos += 1;
        }
        let text = &self.src[start..self.byte_pos()];
        match TokenKind::keyword(text) {
            Some(kind) => self.push(kind, start, TokenValue::None),
            None => self.push(TokenKind::Ident, start, TokenValue::Ident(text.to_owned())),
        }
    }

    fn number(&mut self, start: usize) {
        let mut is_real = false;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            is_real = true;
            self.pos += 1;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let sign = usize::from(matches!(self.peek_at(1), Some('+' | '-')));
            if self.peek_at(1 + sign).is_some_and(|c| c.is_ascii_digit()) {
                is_real = true;
                self.pos += 1 + sign;
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.pos += 1;
                }
            }
        }

        let digits_end = self.byte_pos();
        let digits = &self.src[start..digits_end];

        if matches!(self.peek(), Some('d' | 'D')) || is_real {
            self.eat('d');
            self.eat('D');
            let value = digits.parse::<f64>().unwrap_or(0.0);
            self.push(TokenKind::DoubleLiteral, start, TokenValue::Double(value));
            return;
        }

        let long_suffix = self.eat('L') || self.eat('l');
        let parsed = digits.parse::<u64>().ok();
        let token = match (parsed, long_suffix) {
            (Some(v), false) if i32::try_from(v).is_ok() => {
                Some((TokenKind::IntLiteral, TokenValue::Int(i32::try_from(v).unwrap_or(0))))
            },
            (Some(v), _) => {
                i64::try_from(v).ok().map(|v| (TokenKind::LongLiteral, TokenValue::Long(v)))
            },
            (None, _) => None,
        };
        if let Some((kind, value)) = token {
            self.push(kind, start, value);
        } else {
            self.diags.report(
                Code::IntegralTooLarge,
                Span::new(offset(start), offset(self.byte_pos())),
                "Integral constant is too large",
            );
            self.push(TokenKind::IntLiteral, start, TokenValue::Int(0));
        }
    }

    fn string(&mut self, start: usize) {
        let mut value = String::new();
        loop {
            match self.peek() {
                None | Some('\n' | '\r') => {
                    self.diags.report(
                        Code::NewlineInConstant,
                        Span::new(offset(start), offset(start + 1)),
                        "Newline in constant",
                    );
                    break;
                },
                Some('"') => {
                    self.pos += 1;
                    break;
                },
                Some('\\') => {
                    let escape_start = self.byte_pos();
                    self.pos += 1;
                    let decoded = match self.peek() {
                        Some('n') => Some('\n'),
                        Some('t') => Some('\t'),
                        Some('r') => Some('\r'),
                        Some('0') => Some('\0'),
                        Some('\\') => Some('\\'),
                        Some('"') => Some('"'),
                        Some('\'') => Some('\''),
                        _ => None,
                    };
                    match decoded {
                        Some(c) => {
                            self.pos += 1;
                            value.push(c);
                        },
                        None => {
                            self.diags.report(
                                Code::UnrecognizedEscape,
                                Span::new(offset(escape_start), offset(escape_start + 1)),
                                "Unrecognized escape sequence",
                            );
                        },
                    }
                },
                Some(c) => {
                    self.pos += 1;
                    value.push(c);
                },
            }
        }
        self.push(TokenKind::StringLiteral, start, TokenValue::Str(value));
    }

    fn punct(&mut self, c: char, start: usize) {
        use TokenKind as K;

        let kind = match c {
            '{' => K::LBrace,
            '}' => K::RBrace,
            '(' => K::LParen,
            ')' => K::RParen,
            '[' => K::LBracket,
            ']' => K::RBracket,
            ';' => K::Semicolon,
            ',' => K::Comma,
            '.' => K::Dot,
            '?' => K::Question,
            ':' => K::Colon,
            '+' if self.eat('+') => K::PlusPlus,
            '+' if self.eat('=') => K::PlusAssign,
            '+' => K::Plus,
            '-' if self.eat('-') => K::MinusMinus,
            '-' if self.eat('=') => K::MinusAssign,
            '-' => K::Minus,
            '*' if self.eat('=') => K::StarAssign,
            '*' => K::Star,
            '/' if self.eat('=') => K::SlashAssign,
            '/' => K::Slash,
            '%' if self.eat('=') => K::PercentAssign,
            '%' => K::Percent,
            '!' if self.eat('=') => K::NotEq,
            '!' => K::Bang,
            '=' if self.eat('=') => K::EqEq,
            '=' => K::Assign,
            '<' if self.eat('=') => K::LtEq,
            '<' => K::Lt,
            '>' if self.eat('=') => K::GtEq,
            '>' => K::Gt,
            '&' if self.eat('&') => K::AndAnd,
            '|' if self.eat('|') => K::OrOr,
            other => {
                self.diags.report(
                    Code::UnexpectedCharacter,
                    Span::new(offset(start), offset(self.byte_pos())),
                    format!("Unexpected character '{other}'"),
                );
                return;
            },
        };
        self.push(kind, start, TokenValue::None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut diags = DiagnosticBag::new();
        lex(src, &mut diags).into_iter().map(|t| t.kind).collect()
    }

    fn values(src: &str) -> Vec<TokenValue> {
        let mut diags = DiagnosticBag::new();
        lex(src, &mut diags).into_iter().map(|t| t.value).collect()
    }

    #[test]
    fn test_statement_tokens() {
        use TokenKind as K;
        assert_eq!(
            kinds("Console.WriteLine(1+1);"),
            vec![
                K::Ident,
                K::Dot,
                K::Ident,
                K::LParen,
                K::IntLiteral,
                K::Plus,
                K::IntLiteral,
                K::RParen,
                K::Semicolon,
                K::Eof
            ]
        );
    }

    #[test]
    fn test_compound_operators() {
        use TokenKind as K;
        assert_eq!(
            kinds("a += b++ <= c && !d"),
            vec![K::Ident, K::PlusAssign, K::Ident, K::PlusPlus, K::LtEq, K::Ident, K::AndAnd, K::Bang, K::Ident, K::Eof]
        );
    }

    #[test]
    fn test_numeric_literals() {
        assert_eq!(
            values("42 42L 2.5 1e3 3000000000"),
            vec![
                TokenValue::Int(42),
                TokenValue::Long(42),
                TokenValue::Double(2.5),
                TokenValue::Double(1000.0),
                TokenValue::Long(3_000_000_000),
                TokenValue::None,
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            values(r#""a\tb\n\"q\"""#)[0],
            TokenValue::Str("a\tb\n\"q\"".to_owned())
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        use TokenKind as K;
        assert_eq!(kinds("// line\nx /* block */ y"), vec![K::Ident, K::Ident, K::Eof]);
    }

    #[test]
    fn test_unterminated_string_reports() {
        let mut diags = DiagnosticBag::new();
        lex("\"abc\nx", &mut diags);
        assert!(diags.has_errors());
    }

    #[test]
    fn test_unexpected_character_reports() {
        let mut diags = DiagnosticBag::new();
        let tokens = lex("a # b", &mut diags);
        assert!(diags.has_errors());
        assert_eq!(tokens.len(), 3);
    }

    #[test]
    fn test_spans() {
        let mut diags = DiagnosticBag::new();
        let tokens = lex("int x", &mut diags);
        assert_eq!(tokens[1].span, Span::new(4, 5));
    }
}
