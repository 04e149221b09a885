use std::fmt;

use super::Span;

/// Token kinds of the guest language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum TokenKind {
    Ident,
    IntLiteral,
    LongLiteral,
    DoubleLiteral,
    StringLiteral,

    // Keywords
    Using,
    Namespace,
    Class,
    Public,
    Private,
    Internal,
    Static,
    Void,
    Int,
    Long,
    Double,
    Bool,
    String,
    Var,
    If,
    Else,
    While,
    For,
    Return,
    Break,
    Continue,
    True,
    False,
    Null,
    New,

    // Punctuation
    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Semicolon,
    Comma,
    Dot,
    Question,
    Colon,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    PlusPlus,
    MinusMinus,
    EqEq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    AndAnd,
    OrOr,

    Eof,
}

impl TokenKind {
    /// Keyword for an identifier-shaped word, if it is one.
    pub(crate) fn keyword(word: &str) -> Option<Self> {
        Some(match word {
            "using" => Self::Using,
            "namespace" => Self::Namespace,
            "class" => Self::Class,
            "public" => Self::Public,
            "private" => Self::Private,
            "internal" => Self::Internal,
            "static" => Self::Static,
            "void" => Self::Void,
            "int" => Self::Int,
            "long" => Self::Long,
            "double" => Self::Double,
            "bool" => Self::Bool,
            "string" => Self::String,
            "var" => Self::Var,
            "if" => Self::If,
            "else" => Self::Else,
            "while" => Self::While,
            "for" => Self::For,
            "return" => Self::Return,
            "break" => Self::Break,
            "continue" => Self::Continue,
            "true" => Self::True,
            "false" => Self::False,
            "null" => Self::Null,
            "new" => Self::New,
            _ => return None,
        })
    }

    /// Whether this is a built-in type keyword (`var` excluded).
    pub(crate) fn is_primitive_type(self) -> bool {
        matches!(
            self,
            Self::Void | Self::Int | Self::Long | Self::Double | Self::Bool | Self::String
        )
    }

    /// Whether this is a member modifier.
    pub(crate) fn is_modifier(self) -> bool {
        matches!(
            self,
            Self::Public | Self::Private | Self::Internal | Self::Static
        )
    }

    /// Source text of fixed tokens, used in messages.
    pub(crate) fn text(self) -> &'static str {
        match self {
            Self::Ident => "identifier",
            Self::IntLiteral | Self::LongLiteral | Self::DoubleLiteral => "number",
            Self::StringLiteral => "string",
            Self::Using => "using",
            Self::Namespace => "namespace",
            Self::Class => "class",
            Self::Public => "public",
            Self::Private => "private",
            Self::Internal => "internal",
            Self::Static => "static",
            Self::Void => "void",
            Self::Int => "int",
            Self::Long => "long",
            Self::Double => "double",
            Self::Bool => "bool",
            Self::String => "string",
            Self::Var => "var",
            Self::If => "if",
            Self::Else => "else",
            Self::While => "while",
            Self::For => "for",
            Self::Return => "return",
            Self::Break => "break",
            Self::Continue => "continue",
            Self::True => "true",
            Self::False => "false",
            Self::Null => "null",
            Self::New => "new",
            Self::LBrace => "{",
            Self::RBrace => "}",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::LBracket => "[",
            Self::RBracket => "]",
            Self::Semicolon => ";",
            Self::Comma => ",",
            Self::Dot => ".",
            Self::Question => "?",
            Self::Colon => ":",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Percent => "%",
            Self::Bang => "!",
            Self::Assign => "=",
            Self::PlusAssign => "+=",
            Self::MinusAssign => "-=",
            Self::StarAssign => "*=",
            Self::SlashAssign => "/=",
            Self::PercentAssign => "%=",
            Self::PlusPlus => "++",
            Self::MinusMinus => "--",
            Self::EqEq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::LtEq => "<=",
            Self::GtEq => ">=",
            Self::AndAnd => "&&",
            Self::OrOr => "||",
            Self::Eof => "end of file",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// Decoded literal payload.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenValue {
    /// No payload.
    None,
    /// Identifier text.
    Ident(String),
    /// `int` literal.
    Int(i32),
    /// `long` literal.
    Long(i64),
    /// `double` literal.
    Double(f64),
    /// Unescaped string literal.
    Str(String),
}

/// A lexed token.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Kind.
    pub kind: TokenKind,
    /// Source range.
    pub span: Span,
    /// Literal or identifier payload.
    pub value: TokenValue,
}

impl Token {
    /// Identifier text, or the empty string for other tokens.
    #[must_use]
    pub fn ident(&self) -> &str {
        match &self.value {
            TokenValue::Ident(s) => s,
            _ => "",
        }
    }
}
