//! Syntax tree produced by the parser.
//!
//! The tree is untyped; names are resolved and types assigned by the
//! semantic pass, which lowers it into [`crate::semantic::ir`].

use super::Span;

/// A parsed translation unit.
#[derive(Debug, Clone, Default)]
pub struct CompilationUnit {
    /// `using` directives in source order.
    pub usings: Vec<Using>,
    /// Type declarations in source order.
    pub classes: Vec<ClassDecl>,
}

/// `using Some.Namespace;`
#[derive(Debug, Clone)]
pub struct Using {
    /// Dotted namespace name.
    pub name: String,
    /// Span of the name.
    pub span: Span,
}

/// Member modifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// `public` was present.
    pub is_public: bool,
    /// `static` was present.
    pub is_static: bool,
}

/// A class declaration.
#[derive(Debug, Clone)]
pub struct ClassDecl {
    /// Enclosing namespace, empty for the global namespace.
    pub namespace: String,
    /// Simple name.
    pub name: String,
    /// Span of the name.
    pub name_span: Span,
    /// Class modifiers.
    pub modifiers: Modifiers,
    /// Declared members.
    pub members: Vec<Member>,
}

impl ClassDecl {
    /// Namespace-qualified name.
    #[must_use]
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }
}

/// A class member.
#[derive(Debug, Clone)]
pub enum Member {
    /// Method declaration.
    Method(MethodDecl),
    /// Field declaration.
    Field(FieldDecl),
}

/// A method declaration.
#[derive(Debug, Clone)]
pub struct MethodDecl {
    /// Modifiers.
    pub modifiers: Modifiers,
    /// Declared return type.
    pub return_type: TypeRef,
    /// Method name.
    pub name: String,
    /// Span of the name.
    pub name_span: Span,
    /// Parameters in order.
    pub params: Vec<Param>,
    /// Body.
    pub body: Block,
}

/// A method parameter.
#[derive(Debug, Clone)]
pub struct Param {
    /// Declared type.
    pub ty: TypeRef,
    /// Parameter name.
    pub name: String,
    /// Span of the name.
    pub span: Span,
}

/// A field declaration.
#[derive(Debug, Clone)]
pub struct FieldDecl {
    /// Modifiers.
    pub modifiers: Modifiers,
    /// Declared type.
    pub ty: TypeRef,
    /// Field name.
    pub name: String,
    /// Span of the name.
    pub name_span: Span,
    /// Optional initializer.
    pub init: Option<Expr>,
}

/// A written type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeRef {
    /// What was written.
    pub kind: TypeRefKind,
    /// Where it was written.
    pub span: Span,
}

/// Shapes of a written type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeRefKind {
    /// `void`
    Void,
    /// `int`
    Int,
    /// `long`
    Long,
    /// `double`
    Double,
    /// `bool`
    Bool,
    /// `string`
    String,
    /// `var`
    Var,
    /// A user or library type name.
    Named(String),
    /// `T[]`
    Array(Box<TypeRef>),
}

/// `{ ... }`
#[derive(Debug, Clone, Default)]
pub struct Block {
    /// Statements in order.
    pub stmts: Vec<Stmt>,
    /// Span from `{` to `}`.
    pub span: Span,
}

/// A statement.
#[derive(Debug, Clone)]
pub struct Stmt {
    /// Statement shape.
    pub kind: StmtKind,
    /// Source range.
    pub span: Span,
}

/// One name in a local declaration.
#[derive(Debug, Clone)]
pub struct Declarator {
    /// Local name.
    pub name: String,
    /// Span of the name.
    pub span: Span,
    /// Optional initializer.
    pub init: Option<Expr>,
}

/// Statement shapes.
#[derive(Debug, Clone)]
pub enum StmtKind {
    /// Nested block.
    Block(Block),
    /// `T a = x, b;`
    Local {
        /// Declared type.
        ty: TypeRef,
        /// Declared names.
        declarators: Vec<Declarator>,
    },
    /// `if (c) s else s`
    If {
        /// Condition.
        cond: Expr,
        /// Taken branch.
        then: Box<Stmt>,
        /// Optional `else` branch.
        otherwise: Option<Box<Stmt>>,
    },
    /// `while (c) s`
    While {
        /// Condition.
        cond: Expr,
        /// Loop body.
        body: Box<Stmt>,
    },
    /// `for (init; cond; step) s`
    For {
        /// Initializer statements (one local declaration or expressions).
        init: Vec<Stmt>,
        /// Optional condition; absent means `true`.
        cond: Option<Expr>,
        /// Step expressions.
        step: Vec<Expr>,
        /// Loop body.
        body: Box<Stmt>,
    },
    /// `return x;`
    Return(Option<Expr>),
    /// `break;`
    Break,
    /// `continue;`
    Continue,
    /// `x;`
    Expr(Expr),
    /// `;`
    Empty,
}

/// An expression.
#[derive(Debug, Clone)]
pub struct Expr {
    /// Expression shape.
    pub kind: ExprKind,
    /// Source range.
    pub span: Span,
}

impl Expr {
    /// Placeholder produced after a syntax error.
    #[must_use]
    pub fn error(span: Span) -> Self {
        Self {
            kind: ExprKind::Error,
            span,
        }
    }
}

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `-x`
    Neg,
    /// `+x`
    Plus,
    /// `!x`
    Not,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    /// Operator as written.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::And => "&&",
            Self::Or => "||",
        }
    }
}

/// `++`/`--` placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncDec {
    /// `++x`
    PreInc,
    /// `--x`
    PreDec,
    /// `x++`
    PostInc,
    /// `x--`
    PostDec,
}

impl IncDec {
    /// Whether the operation adds one.
    #[must_use]
    pub fn is_increment(self) -> bool {
        matches!(self, Self::PreInc | Self::PostInc)
    }

    /// Whether the expression yields the value before the update.
    #[must_use]
    pub fn is_postfix(self) -> bool {
        matches!(self, Self::PostInc | Self::PostDec)
    }
}

/// Expression shapes.
#[derive(Debug, Clone)]
pub enum ExprKind {
    /// `int` literal.
    Int(i32),
    /// `long` literal.
    Long(i64),
    /// `double` literal.
    Double(f64),
    /// String literal.
    Str(String),
    /// `true`/`false`.
    Bool(bool),
    /// `null`.
    Null,
    /// Simple name.
    Name(String),
    /// Built-in type keyword used as an expression target (`int.MaxValue`).
    Primitive(TypeRefKind),
    /// `target.name`
    Member {
        /// Receiver expression, type or namespace.
        target: Box<Expr>,
        /// Member name.
        name: String,
        /// Span of the member name.
        name_span: Span,
    },
    /// `callee(args)`
    Call {
        /// Invoked expression (name or member access).
        callee: Box<Expr>,
        /// Arguments in order.
        args: Vec<Expr>,
    },
    /// `target[index]`
    Index {
        /// Array expression.
        target: Box<Expr>,
        /// Element index.
        index: Box<Expr>,
    },
    /// Prefix operator.
    Unary {
        /// Operator.
        op: UnaryOp,
        /// Operand.
        operand: Box<Expr>,
    },
    /// Infix operator.
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
    },
    /// `target = value` or a compound assignment when `op` is set.
    Assign {
        /// Compound operator, if any.
        op: Option<BinaryOp>,
        /// Assigned place.
        target: Box<Expr>,
        /// Assigned value.
        value: Box<Expr>,
    },
    /// `++`/`--`.
    IncDec {
        /// Placement and direction.
        op: IncDec,
        /// Updated place.
        target: Box<Expr>,
    },
    /// `c ? a : b`
    Conditional {
        /// Condition.
        cond: Box<Expr>,
        /// Value when true.
        then: Box<Expr>,
        /// Value when false.
        otherwise: Box<Expr>,
    },
    /// `(T)x`
    Cast {
        /// Target type.
        ty: TypeRef,
        /// Converted operand.
        operand: Box<Expr>,
    },
    /// `new T[n]`
    NewArray {
        /// Element type.
        elem: TypeRef,
        /// Length expression.
        len: Box<Expr>,
    },
    /// `new T[] { a, b }`
    ArrayInit {
        /// Element type.
        elem: TypeRef,
        /// Element values.
        items: Vec<Expr>,
    },
    /// Placeholder after a syntax error.
    Error,
}
