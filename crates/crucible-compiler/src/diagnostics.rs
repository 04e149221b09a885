//! Compiler diagnostics.
//!
//! Diagnostics are collected with byte spans while compiling and resolved to
//! 0-based line/column locations once the unit is done. Callers never see
//! spans: the service layer maps [`Diagnostic`] into
//! [`crucible_core::CompilationError`].

use std::fmt;

use crucible_core::Severity;

use crate::syntax::{LineIndex, Span};

/// Diagnostic kinds produced by the toolchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Code {
    /// Integral constant too large.
    IntegralTooLarge,
    /// Identifier expected.
    IdentifierExpected,
    /// `;` expected.
    SemicolonExpected,
    /// A specific token expected.
    TokenExpected,
    /// Unrecognized escape sequence.
    UnrecognizedEscape,
    /// Newline in constant.
    NewlineInConstant,
    /// End-of-file found in a comment.
    UnterminatedComment,
    /// Unexpected character.
    UnexpectedCharacter,
    /// `}` expected.
    CloseBraceExpected,
    /// `{` expected.
    OpenBraceExpected,
    /// Invalid token in a member declaration.
    InvalidMemberToken,
    /// Invalid expression term.
    InvalidExpressionTerm,
    /// Operator not applicable to operand types.
    BinaryOperatorNotApplicable,
    /// Division by constant zero.
    DivisionByConstantZero,
    /// Indexing applied to a non-array.
    NotIndexable,
    /// Unary operator not applicable to operand type.
    UnaryOperatorNotApplicable,
    /// Implicit conversion impossible.
    CannotConvert,
    /// Explicit cast impossible.
    CannotCast,
    /// Duplicate type declaration.
    DuplicateType,
    /// Duplicate member declaration.
    DuplicateMember,
    /// Name does not exist in the current context.
    NameNotFound,
    /// Member with the same signature declared twice.
    DuplicateMethod,
    /// Statement outside of a type.
    MemberOutsideType,
    /// Type member not found.
    MemberNotFound,
    /// Namespace used as a value.
    NamespaceAsValue,
    /// Type used as a value.
    TypeAsValue,
    /// Object reference required for an instance member.
    ObjectReferenceRequired,
    /// Value returned from a void method.
    ReturnValueInVoid,
    /// Return value expected.
    ReturnValueExpected,
    /// Local already declared in this scope.
    DuplicateLocal,
    /// Type left side of assignment is not assignable.
    InvalidAssignmentTarget,
    /// Local conflicts with a local in an enclosing scope.
    LocalConflictsWithEnclosing,
    /// `break`/`continue` outside a loop.
    NoEnclosingLoop,
    /// Not all code paths return a value.
    NotAllPathsReturn,
    /// Unreachable code detected.
    UnreachableCode,
    /// Variable declared but never used.
    UnusedLocal,
    /// Conditional expression type cannot be determined.
    ConditionalTypeMismatch,
    /// Read-only member assigned.
    ReadOnlyAssignment,
    /// Expression is not a valid statement.
    InvalidStatement,
    /// Name not found inside a namespace.
    NotInNamespace,
    /// Type or namespace not found.
    TypeNotFound,
    /// Explicit conversion exists but was not written.
    ExplicitConversionRequired,
    /// Method group used as a value.
    MethodGroupAsValue,
    /// Invalid initializer for an implicitly typed local.
    BadImplicitInitializer,
    /// Implicitly typed local without initializer.
    ImplicitWithoutInitializer,
    /// Wrong number of arguments.
    WrongArgumentCount,
    /// Argument type mismatch.
    BadArgument,
    /// Instance member not found.
    InstanceMemberNotFound,
    /// Redundant using directive.
    RedundantUsing,
    /// Statements or expressions nested deeper than the compiler accepts.
    NestingTooDeep,
}

impl Code {
    /// Stable diagnostic identifier.
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::IntegralTooLarge => "CRU1021",
            Self::IdentifierExpected => "CRU1001",
            Self::SemicolonExpected => "CRU1002",
            Self::TokenExpected => "CRU1003",
            Self::UnrecognizedEscape => "CRU1009",
            Self::NewlineInConstant => "CRU1010",
            Self::UnterminatedComment => "CRU1035",
            Self::UnexpectedCharacter => "CRU1056",
            Self::CloseBraceExpected => "CRU1513",
            Self::OpenBraceExpected => "CRU1514",
            Self::InvalidMemberToken => "CRU1519",
            Self::InvalidExpressionTerm => "CRU1525",
            Self::BinaryOperatorNotApplicable => "CRU0019",
            Self::DivisionByConstantZero => "CRU0020",
            Self::NotIndexable => "CRU0021",
            Self::UnaryOperatorNotApplicable => "CRU0023",
            Self::CannotConvert => "CRU0029",
            Self::CannotCast => "CRU0030",
            Self::DuplicateType => "CRU0101",
            Self::DuplicateMember => "CRU0102",
            Self::NameNotFound => "CRU0103",
            Self::DuplicateMethod => "CRU0111",
            Self::MemberOutsideType => "CRU0116",
            Self::MemberNotFound => "CRU0117",
            Self::NamespaceAsValue => "CRU0118",
            Self::TypeAsValue => "CRU0119",
            Self::ObjectReferenceRequired => "CRU0120",
            Self::ReturnValueExpected => "CRU0126",
            Self::ReturnValueInVoid => "CRU0127",
            Self::DuplicateLocal => "CRU0128",
            Self::InvalidAssignmentTarget => "CRU0131",
            Self::LocalConflictsWithEnclosing => "CRU0136",
            Self::NoEnclosingLoop => "CRU0139",
            Self::NotAllPathsReturn => "CRU0161",
            Self::UnreachableCode => "CRU0162",
            Self::UnusedLocal => "CRU0168",
            Self::ConditionalTypeMismatch => "CRU0173",
            Self::ReadOnlyAssignment => "CRU0200",
            Self::InvalidStatement => "CRU0201",
            Self::NotInNamespace => "CRU0234",
            Self::TypeNotFound => "CRU0246",
            Self::ExplicitConversionRequired => "CRU0266",
            Self::MethodGroupAsValue => "CRU0428",
            Self::BadImplicitInitializer => "CRU0815",
            Self::ImplicitWithoutInitializer => "CRU0818",
            Self::WrongArgumentCount => "CRU1501",
            Self::BadArgument => "CRU1503",
            Self::InstanceMemberNotFound => "CRU1061",
            Self::RedundantUsing => "CRU8019",
            Self::NestingTooDeep => "CRU8078",
        }
    }

    /// Severity the diagnostic is reported with.
    #[must_use]
    pub fn severity(self) -> Severity {
        match self {
            Self::UnreachableCode | Self::UnusedLocal => Severity::Warning,
            Self::RedundantUsing => Severity::Hidden,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// 0-based source position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Location {
    /// 0-based line.
    pub line: u32,
    /// 0-based column, in characters.
    pub column: u32,
}

/// A resolved compiler diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Diagnostic kind.
    pub code: Code,
    /// Reported severity.
    pub severity: Severity,
    /// Human-readable message.
    pub message: String,
    /// Where the diagnostic starts, if it has a source location.
    pub location: Option<Location>,
}

impl Diagnostic {
    /// Stable identifier, e.g. `CRU1002`.
    #[must_use]
    pub fn id(&self) -> &'static str {
        self.code.id()
    }

    /// Whether this diagnostic prevents emission.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(loc) = self.location {
            write!(f, "({},{}): ", loc.line, loc.column)?;
        }
        write!(f, "{} {}: {}", self.severity, self.code, self.message)
    }
}

/// Accumulates diagnostics with spans during one compilation.
#[derive(Debug, Default)]
pub(crate) struct DiagnosticBag {
    items: Vec<(Code, Option<Span>, String)>,
}

impl DiagnosticBag {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn report(&mut self, code: Code, span: Span, message: impl Into<String>) {
        self.items.push((code, Some(span), message.into()));
    }

    pub(crate) fn has_errors(&self) -> bool {
        self.items
            .iter()
            .any(|(code, _, _)| code.severity() == Severity::Error)
    }

    /// Resolve spans against `index`, ordered by position.
    pub(crate) fn into_diagnostics(self, index: &LineIndex) -> Vec<Diagnostic> {
        let mut out: Vec<Diagnostic> = self
            .items
            .into_iter()
            .map(|(code, span, message)| Diagnostic {
                code,
                severity: code.severity(),
                message,
                location: span.map(|s| index.location(s.start)),
            })
            .collect();
        // Stable sort keeps report order for diagnostics at the same spot.
        out.sort_by_key(|d| d.location);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let codes = [
            Code::SemicolonExpected,
            Code::InvalidExpressionTerm,
            Code::ReturnValueInVoid,
            Code::TypeNotFound,
            Code::RedundantUsing,
            Code::NestingTooDeep,
        ];
        let ids: std::collections::HashSet<_> = codes.iter().map(|c| c.id()).collect();
        assert_eq!(ids.len(), codes.len());
    }

    #[test]
    fn test_severity_mapping() {
        assert_eq!(Code::SemicolonExpected.severity(), Severity::Error);
        assert_eq!(Code::UnusedLocal.severity(), Severity::Warning);
        assert_eq!(Code::RedundantUsing.severity(), Severity::Hidden);
    }

    #[test]
    fn test_bag_sorts_by_location() {
        let index = LineIndex::new("ab\ncd\n");
        let mut bag = DiagnosticBag::new();
        bag.report(Code::NameNotFound, Span::new(4, 5), "second");
        bag.report(Code::SemicolonExpected, Span::new(1, 2), "first");

        let diags = bag.into_diagnostics(&index);

        assert_eq!(diags[0].message, "first");
        assert_eq!(diags[0].location, Some(Location { line: 0, column: 1 }));
        assert_eq!(diags[1].location, Some(Location { line: 1, column: 1 }));
    }
}
