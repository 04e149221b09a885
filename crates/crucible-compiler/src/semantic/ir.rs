//! Typed intermediate representation handed from the checker to codegen.
//!
//! Every expression carries its final type and every implicit conversion is
//! explicit. Compound assignments and increments are already lowered to
//! plain assignments over temporaries.

use crucible_core::HostFunction;

use crate::library::Intrinsic;
use crate::types::Ty;

/// Index of a function in [`Program::functions`].
pub type FuncId = u32;
/// Index of a local in [`Function::locals`].
pub type LocalId = u32;
/// Index of a global in [`Program::globals`].
pub type GlobalId = u32;

/// A checked program.
#[derive(Debug, Clone, Default)]
pub struct Program {
    /// Static storage, one slot per field.
    pub globals: Vec<Global>,
    /// User functions.
    pub functions: Vec<Function>,
    /// Field initializers, run once before the first entry point.
    pub init: Function,
    /// Exported entry points.
    pub entry_points: Vec<EntryDef>,
    /// Functions imported from bin-directory modules.
    pub module_imports: Vec<ModuleImport>,
}

/// A static storage slot.
#[derive(Debug, Clone)]
pub struct Global {
    /// `Class.field`, for names in the emitted module.
    pub name: String,
    /// Slot type.
    pub ty: Ty,
}

/// A function body.
#[derive(Debug, Clone, Default)]
pub struct Function {
    /// Qualified name, `Namespace.Class.Method`.
    pub name: String,
    /// Number of leading locals that are parameters.
    pub param_count: u32,
    /// Return type.
    pub returns: Ty,
    /// Parameters followed by declared locals and temporaries.
    pub locals: Vec<Ty>,
    /// Statements.
    pub body: Vec<Stmt>,
}

/// An exported entry point.
#[derive(Debug, Clone)]
pub struct EntryDef {
    /// Export name, `Namespace.Class.Method`.
    pub export: String,
    /// Target function.
    pub function: FuncId,
    /// Whether the target takes a `string[]` (passed as null).
    pub takes_args: bool,
}

/// A function imported from a bin-directory module.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleImport {
    /// Module name.
    pub module: String,
    /// Export name inside the module.
    pub export: String,
    /// Parameter types.
    pub params: Vec<Ty>,
    /// Return type.
    pub returns: Ty,
}

/// Statements.
#[derive(Debug, Clone)]
pub enum Stmt {
    /// Evaluate and discard.
    Expr(Expr),
    /// Conditional.
    If {
        /// Condition (`bool`).
        cond: Expr,
        /// Taken branch.
        then: Vec<Stmt>,
        /// Other branch.
        otherwise: Vec<Stmt>,
    },
    /// `while` and `for` loops. `continue` jumps to `step`.
    Loop {
        /// Condition, `None` for an unconditional loop.
        cond: Option<Expr>,
        /// Body.
        body: Vec<Stmt>,
        /// Step expressions, discarded.
        step: Vec<Expr>,
    },
    /// Return from the function.
    Return(Option<Expr>),
    /// Leave the innermost loop.
    Break,
    /// Next iteration of the innermost loop.
    Continue,
    /// Nested block.
    Block(Vec<Stmt>),
}

/// A typed expression.
#[derive(Debug, Clone)]
pub struct Expr {
    /// Shape.
    pub kind: ExprKind,
    /// Result type.
    pub ty: Ty,
}

impl Expr {
    /// Build an expression.
    #[must_use]
    pub fn new(kind: ExprKind, ty: Ty) -> Self {
        Self { kind, ty }
    }

    /// Placeholder for an expression that produced a diagnostic.
    #[must_use]
    pub fn error() -> Self {
        Self::new(ExprKind::Error, Ty::Error)
    }

    /// Whether this is an `int` or `long` literal equal to zero.
    #[must_use]
    pub fn is_integral_zero(&self) -> bool {
        matches!(self.kind, ExprKind::Int(0) | ExprKind::Long(0))
    }
}

/// Arithmetic and comparison operators over numeric or `bool` operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum BinOp {
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
}

impl BinOp {
    /// Whether the result is `bool`.
    #[must_use]
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Ne | Self::Lt | Self::Gt | Self::Le | Self::Ge
        )
    }
}

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    /// Arithmetic negation.
    Neg,
    /// Logical not.
    Not,
}

/// Call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callee {
    /// User function.
    Function(FuncId),
    /// Host function import.
    Host(HostFunction),
    /// Inline expansion.
    Intrinsic(Intrinsic),
    /// Entry in [`Program::module_imports`].
    Module(u32),
}

/// Assignable places.
#[derive(Debug, Clone)]
pub enum Place {
    /// Local or parameter.
    Local(LocalId),
    /// Static field.
    Global(GlobalId),
    /// Array element.
    Index {
        /// Array (evaluated first).
        array: Box<Expr>,
        /// Element index.
        index: Box<Expr>,
    },
}

/// Expression shapes.
#[derive(Debug, Clone)]
pub enum ExprKind {
    /// `int` constant.
    Int(i32),
    /// `long` constant.
    Long(i64),
    /// `double` constant.
    Double(f64),
    /// `bool` constant.
    Bool(bool),
    /// String constant, materialised once per instance.
    Str(String),
    /// Null reference of the expression's type.
    Null,
    /// Read a local.
    Local(LocalId),
    /// Read a global.
    Global(GlobalId),
    /// Numeric conversion from the operand's type to the expression's type.
    Convert(Box<Expr>),
    /// Format any value as a string.
    ToString(Box<Expr>),
    /// Prefix operator.
    Unary(UnOp, Box<Expr>),
    /// Numeric or `bool` operator; operands share one type.
    Binary(BinOp, Box<Expr>, Box<Expr>),
    /// String concatenation.
    Concat(Box<Expr>, Box<Expr>),
    /// String equality, negated when the flag is set.
    StrEq(bool, Box<Expr>, Box<Expr>),
    /// Array reference equality, negated when the flag is set.
    RefEq(bool, Box<Expr>, Box<Expr>),
    /// Short-circuit `&&` (flag set) or `||`.
    Logical(bool, Box<Expr>, Box<Expr>),
    /// `c ? a : b`
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
    /// Call.
    Call(Callee, Vec<Expr>),
    /// `new T[n]`
    NewArray(Box<Expr>),
    /// `new T[] { ... }`
    ArrayLit(Vec<Expr>),
    /// Array length.
    ArrayLen(Box<Expr>),
    /// Array element read.
    Index(Box<Expr>, Box<Expr>),
    /// Store and yield the stored value.
    Assign(Place, Box<Expr>),
    /// Bind a temporary, then evaluate the body.
    Let(LocalId, Box<Expr>, Box<Expr>),
    /// Evaluate and discard the first, then yield the second.
    Seq(Box<Expr>, Box<Expr>),
    /// Placeholder after a diagnostic; never reaches codegen.
    Error,
}
