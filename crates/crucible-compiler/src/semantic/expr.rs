//! Expression lowering: operators, conversions, assignments and arrays.

use super::Checker;
use super::ir::{BinOp, Expr, ExprKind, Place, UnOp};
use crate::diagnostics::Code;
use crate::syntax::Span;
use crate::syntax::ast::{self, BinaryOp, IncDec, TypeRefKind, UnaryOp};
use crate::types::Ty;

/// An assignable place plus the temporaries that make it safe to read and
/// write it more than once.
struct StablePlace {
    place: Place,
    read: Expr,
    ty: Ty,
    bindings: Vec<(u32, Expr)>,
}

impl Checker<'_> {
    /// Lower and type an expression.
    pub(super) fn lower_expr(&mut self, expr: &ast::Expr) -> Expr {
        use ast::ExprKind as A;

        match &expr.kind {
            A::Int(v) => Expr::new(ExprKind::Int(*v), Ty::Int),
            A::Long(v) => Expr::new(ExprKind::Long(*v), Ty::Long),
            A::Double(v) => Expr::new(ExprKind::Double(*v), Ty::Double),
            A::Str(v) => Expr::new(ExprKind::Str(v.clone()), Ty::String),
            A::Bool(v) => Expr::new(ExprKind::Bool(*v), Ty::Bool),
            A::Null => Expr::new(ExprKind::Null, Ty::Null),
            A::Name(name) => self.lower_name(name, expr.span),
            A::Primitive(kind) => {
                let name = primitive_ty(kind).map_or_else(String::new, |t| t.to_string());
                self.report(
                    Code::TypeAsValue,
                    expr.span,
                    format!("'{name}' is a type, which is not valid in the given context"),
                );
                Expr::error()
            },
            A::Member {
                target,
                name,
                name_span,
            } => self.lower_member(target, name, *name_span),
            A::Call { callee, args } => self.lower_call(callee, args, expr.span),
            A::Index { target, index } => {
                let array = self.lower_expr(target);
                let index = self.lower_index(index);
                self.index_expr(array, index, target.span)
            },
            A::Unary { op, operand } => self.lower_unary(*op, operand, expr.span),
            A::Binary { op, lhs, rhs } => {
                let l = self.lower_expr(lhs);
                let r = self.lower_expr(rhs);
                self.binary(*op, l, r, expr.span)
            },
            A::Assign { op, target, value } => self.lower_assign(*op, target, value, expr.span),
            A::IncDec { op, target } => self.lower_inc_dec(*op, target, expr.span),
            A::Conditional {
                cond,
                then,
                otherwise,
            } => {
                let cond = self.lower_condition(cond);
                let then = self.lower_expr(then);
                let otherwise = self.lower_expr(otherwise);
                if then.ty == Ty::Error || otherwise.ty == Ty::Error {
                    return Expr::error();
                }
                let Some(ty) = Ty::common(&then.ty, &otherwise.ty).filter(|t| *t != Ty::Void)
                else {
                    self.report(
                        Code::ConditionalTypeMismatch,
                        expr.span,
                        format!(
                            "Type of conditional expression cannot be determined because there is no implicit conversion between '{}' and '{}'",
                            then.ty, otherwise.ty
                        ),
                    );
                    return Expr::error();
                };
                let then = self.convert(then, &ty);
                let otherwise = self.convert(otherwise, &ty);
                Expr::new(
                    ExprKind::Conditional(Box::new(cond), Box::new(then), Box::new(otherwise)),
                    ty,
                )
            },
            A::Cast { ty, operand } => {
                let ns = self.current_namespace();
                let target = self.resolve_value_type(ty, &ns);
                let value = self.lower_expr(operand);
                if target == Ty::Error || value.ty == Ty::Error {
                    return Expr::error();
                }
                if value.ty.casts_to(&target) {
                    self.convert(value, &target)
                } else {
                    self.report(
                        Code::CannotCast,
                        expr.span,
                        format!("Cannot convert type '{}' to '{target}'", value.ty),
                    );
                    Expr::error()
                }
            },
            A::NewArray { elem, len } => {
                let ns = self.current_namespace();
                let elem = self.resolve_value_type(elem, &ns);
                let len = self.lower_index(len);
                if elem == Ty::Error {
                    return Expr::error();
                }
                Expr::new(ExprKind::NewArray(Box::new(len)), Ty::Array(Box::new(elem)))
            },
            A::ArrayInit { elem, items } => {
                let ns = self.current_namespace();
                let elem = self.resolve_value_type(elem, &ns);
                let items: Vec<Expr> = items
                    .iter()
                    .map(|item| {
                        let value = self.lower_expr(item);
                        self.coerce(value, &elem, item.span)
                    })
                    .collect();
                if elem == Ty::Error {
                    return Expr::error();
                }
                Expr::new(ExprKind::ArrayLit(items), Ty::Array(Box::new(elem)))
            },
            A::Error => Expr::error(),
        }
    }

    /// Implicitly convert `expr` to `target`, reporting when impossible.
    pub(super) fn coerce(&mut self, expr: Expr, target: &Ty, span: Span) -> Expr {
        if expr.ty == *target || expr.ty == Ty::Error || *target == Ty::Error {
            return expr;
        }
        if expr.ty.implicit_cost(target).is_some() {
            return self.convert(expr, target);
        }
        if expr.ty.is_numeric() && target.is_numeric() {
            self.report(
                Code::ExplicitConversionRequired,
                span,
                format!(
                    "Cannot implicitly convert type '{}' to '{target}'. An explicit conversion exists (are you missing a cast?)",
                    expr.ty
                ),
            );
        } else {
            self.report(
                Code::CannotConvert,
                span,
                format!("Cannot implicitly convert type '{}' to '{target}'", expr.ty),
            );
        }
        Expr::error()
    }

    /// Apply an allowed implicit or explicit conversion.
    fn convert(&self, expr: Expr, target: &Ty) -> Expr {
        if expr.ty == *target || expr.ty == Ty::Error {
            return expr;
        }
        if expr.ty == Ty::Null {
            return match expr.kind {
                ExprKind::Null => Expr::new(ExprKind::Null, target.clone()),
                // Keep side effects of a null-typed expression, yield a typed null.
                _ => Expr::new(
                    ExprKind::Seq(
                        Box::new(expr),
                        Box::new(Expr::new(ExprKind::Null, target.clone())),
                    ),
                    target.clone(),
                ),
            };
        }
        match (&expr.kind, target) {
            (ExprKind::Int(v), Ty::Long) => Expr::new(ExprKind::Long(i64::from(*v)), Ty::Long),
            (ExprKind::Int(v), Ty::Double) => {
                Expr::new(ExprKind::Double(f64::from(*v)), Ty::Double)
            },
            _ => Expr::new(ExprKind::Convert(Box::new(expr)), target.clone()),
        }
    }

    /// Format any value as a string for concatenation.
    pub(super) fn stringify(&self, expr: Expr) -> Expr {
        match &expr.ty {
            Ty::String | Ty::Error => expr,
            Ty::Null => self.convert(expr, &Ty::String),
            Ty::Array(_) => {
                let name = expr.ty.to_string();
                Expr::new(
                    ExprKind::Seq(
                        Box::new(expr),
                        Box::new(Expr::new(ExprKind::Str(name), Ty::String)),
                    ),
                    Ty::String,
                )
            },
            _ => Expr::new(ExprKind::ToString(Box::new(expr)), Ty::String),
        }
    }

    fn lower_index(&mut self, index: &ast::Expr) -> Expr {
        let value = self.lower_expr(index);
        self.coerce(value, &Ty::Int, index.span)
    }

    fn index_expr(&mut self, array: Expr, index: Expr, span: Span) -> Expr {
        match &array.ty {
            Ty::Error => Expr::error(),
            Ty::Array(elem) => {
                let elem = (**elem).clone();
                Expr::new(ExprKind::Index(Box::new(array), Box::new(index)), elem)
            },
            other => {
                self.report(
                    Code::NotIndexable,
                    span,
                    format!("Cannot apply indexing with [] to an expression of type '{other}'"),
                );
                Expr::error()
            },
        }
    }

    fn lower_unary(&mut self, op: UnaryOp, operand: &ast::Expr, span: Span) -> Expr {
        let value = self.lower_expr(operand);
        if value.ty == Ty::Error {
            return value;
        }
        match op {
            UnaryOp::Neg if value.ty.is_numeric() => match value.kind {
                ExprKind::Int(v) => Expr::new(ExprKind::Int(v.wrapping_neg()), Ty::Int),
                // -2147483648 lexes as a long literal.
                ExprKind::Long(2_147_483_648) => Expr::new(ExprKind::Int(i32::MIN), Ty::Int),
                ExprKind::Long(v) => Expr::new(ExprKind::Long(v.wrapping_neg()), Ty::Long),
                ExprKind::Double(v) => Expr::new(ExprKind::Double(-v), Ty::Double),
                _ => {
                    let ty = value.ty.clone();
                    Expr::new(ExprKind::Unary(UnOp::Neg, Box::new(value)), ty)
                },
            },
            UnaryOp::Plus if value.ty.is_numeric() => value,
            UnaryOp::Not if value.ty == Ty::Bool => match value.kind {
                ExprKind::Bool(v) => Expr::new(ExprKind::Bool(!v), Ty::Bool),
                _ => Expr::new(ExprKind::Unary(UnOp::Not, Box::new(value)), Ty::Bool),
            },
            _ => {
                let symbol = match op {
                    UnaryOp::Neg => "-",
                    UnaryOp::Plus => "+",
                    UnaryOp::Not => "!",
                };
                self.report(
                    Code::UnaryOperatorNotApplicable,
                    span,
                    format!(
                        "Operator '{symbol}' cannot be applied to operand of type '{}'",
                        value.ty
                    ),
                );
                Expr::error()
            },
        }
    }

    /// Type a binary operator over already lowered operands.
    pub(super) fn binary(&mut self, op: BinaryOp, l: Expr, r: Expr, span: Span) -> Expr {
        if l.ty == Ty::Error || r.ty == Ty::Error {
            return Expr::error();
        }

        let arith = |op: BinaryOp| match op {
            BinaryOp::Add => Some(BinOp::Add),
            BinaryOp::Sub => Some(BinOp::Sub),
            BinaryOp::Mul => Some(BinOp::Mul),
            BinaryOp::Div => Some(BinOp::Div),
            BinaryOp::Rem => Some(BinOp::Rem),
            BinaryOp::Lt => Some(BinOp::Lt),
            BinaryOp::Gt => Some(BinOp::Gt),
            BinaryOp::Le => Some(BinOp::Le),
            BinaryOp::Ge => Some(BinOp::Ge),
            BinaryOp::Eq => Some(BinOp::Eq),
            BinaryOp::Ne => Some(BinOp::Ne),
            BinaryOp::And | BinaryOp::Or => None,
        };

        match op {
            BinaryOp::And | BinaryOp::Or if l.ty == Ty::Bool && r.ty == Ty::Bool => {
                return Expr::new(
                    ExprKind::Logical(op == BinaryOp::And, Box::new(l), Box::new(r)),
                    Ty::Bool,
                );
            },
            BinaryOp::Add
                if (l.ty == Ty::String || r.ty == Ty::String)
                    && l.ty != Ty::Void
                    && r.ty != Ty::Void =>
            {
                let l = self.stringify(l);
                let r = self.stringify(r);
                return Expr::new(ExprKind::Concat(Box::new(l), Box::new(r)), Ty::String);
            },
            BinaryOp::Eq | BinaryOp::Ne => {
                let negate = op == BinaryOp::Ne;
                let (lt, rt) = (l.ty.clone(), r.ty.clone());
                match (&lt, &rt) {
                    (Ty::Null, Ty::Null) => {
                        return Expr::new(ExprKind::Bool(!negate), Ty::Bool);
                    },
                    (Ty::Bool, Ty::Bool) => {
                        let op = if negate { BinOp::Ne } else { BinOp::Eq };
                        return Expr::new(ExprKind::Binary(op, Box::new(l), Box::new(r)), Ty::Bool);
                    },
                    (Ty::String | Ty::Null, Ty::String | Ty::Null) => {
                        let l = self.convert(l, &Ty::String);
                        let r = self.convert(r, &Ty::String);
                        return Expr::new(ExprKind::StrEq(negate, Box::new(l), Box::new(r)), Ty::Bool);
                    },
                    (Ty::Array(_) | Ty::Null, Ty::Array(_) | Ty::Null)
                        if Ty::common(&lt, &rt).is_some() =>
                    {
                        return Expr::new(ExprKind::RefEq(negate, Box::new(l), Box::new(r)), Ty::Bool);
                    },
                    _ => {},
                }
            },
            _ => {},
        }

        if let Some(bin) = arith(op)
            && l.ty.is_numeric()
            && r.ty.is_numeric()
            && let Some(ty) = Ty::common(&l.ty, &r.ty)
        {
            if matches!(bin, BinOp::Div | BinOp::Rem) && ty.is_integral() && r.is_integral_zero() {
                self.report(Code::DivisionByConstantZero, span, "Division by constant zero");
                return Expr::error();
            }
            let l = self.convert(l, &ty);
            let r = self.convert(r, &ty);
            let result = if bin.is_comparison() { Ty::Bool } else { ty };
            return Expr::new(ExprKind::Binary(bin, Box::new(l), Box::new(r)), result);
        }

        self.report(
            Code::BinaryOperatorNotApplicable,
            span,
            format!(
                "Operator '{}' cannot be applied to operands of type '{}' and '{}'",
                op.symbol(),
                l.ty,
                r.ty
            ),
        );
        Expr::error()
    }

    // -----------------------------------------------------------------------
    // Assignment
    // -----------------------------------------------------------------------

    fn lower_assign(
        &mut self,
        op: Option<BinaryOp>,
        target: &ast::Expr,
        value: &ast::Expr,
        span: Span,
    ) -> Expr {
        let place = self.lower_place(target, op.is_none());
        let rhs = self.lower_expr(value);
        let Some(place) = place else {
            return Expr::error();
        };

        match op {
            None => {
                let ty = place.ty.clone();
                let rhs = self.coerce(rhs, &ty, value.span);
                if ty == Ty::Error || rhs.ty == Ty::Error {
                    return Expr::error();
                }
                Expr::new(ExprKind::Assign(place.place, Box::new(rhs)), ty)
            },
            Some(op) => {
                let stable = self.stabilize(place);
                let combined = self.binary(op, stable.read.clone(), rhs, span);
                let combined = self.coerce(combined, &stable.ty, span);
                if stable.ty == Ty::Error || combined.ty == Ty::Error {
                    return Expr::error();
                }
                let assign = Expr::new(
                    ExprKind::Assign(stable.place, Box::new(combined)),
                    stable.ty.clone(),
                );
                wrap_bindings(stable.bindings, assign)
            },
        }
    }

    fn lower_inc_dec(&mut self, op: IncDec, target: &ast::Expr, span: Span) -> Expr {
        let Some(place) = self.lower_place(target, false) else {
            return Expr::error();
        };
        let stable = self.stabilize(place);
        let ty = stable.ty.clone();
        if ty == Ty::Error {
            return Expr::error();
        }
        if !ty.is_numeric() {
            let symbol = if op.is_increment() { "++" } else { "--" };
            self.report(
                Code::UnaryOperatorNotApplicable,
                span,
                format!("Operator '{symbol}' cannot be applied to operand of type '{ty}'"),
            );
            return Expr::error();
        }

        let bin = if op.is_increment() { BinOp::Add } else { BinOp::Sub };
        let one = match ty {
            Ty::Long => ExprKind::Long(1),
            Ty::Double => ExprKind::Double(1.0),
            _ => ExprKind::Int(1),
        };
        let step = |from: Expr| {
            Expr::new(
                ExprKind::Binary(bin, Box::new(from), Box::new(Expr::new(one.clone(), ty.clone()))),
                ty.clone(),
            )
        };

        let result = if op.is_postfix() {
            let old = self.temp(ty.clone());
            let old_value = Expr::new(ExprKind::Local(old), ty.clone());
            let store = Expr::new(
                ExprKind::Assign(stable.place, Box::new(step(old_value.clone()))),
                ty.clone(),
            );
            Expr::new(
                ExprKind::Let(
                    old,
                    Box::new(stable.read),
                    Box::new(Expr::new(
                        ExprKind::Seq(Box::new(store), Box::new(old_value)),
                        ty.clone(),
                    )),
                ),
                ty,
            )
        } else {
            Expr::new(
                ExprKind::Assign(stable.place, Box::new(step(stable.read))),
                ty,
            )
        };
        wrap_bindings(stable.bindings, result)
    }

    /// Resolve an assignment target. `plain` is set for `=`, where a local
    /// counts as initialized rather than used.
    fn lower_place(&mut self, target: &ast::Expr, plain: bool) -> Option<TypedPlace> {
        match &target.kind {
            ast::ExprKind::Name(name) => {
                if let Some(id) = self.lookup_local(name) {
                    if plain {
                        self.mark_initialized(id);
                    } else {
                        self.mark_used(id);
                    }
                    return Some(TypedPlace {
                        place: Place::Local(id),
                        ty: self.local_ty(id),
                    });
                }
                if let Some(field) = self.field_in_scope(name, target.span) {
                    return field;
                }
                let value = self.lower_name(name, target.span);
                self.not_assignable(&value, target.span);
                None
            },
            ast::ExprKind::Member {
                target: inner,
                name,
                name_span,
            } => {
                if let Some(place) = self.static_field_place(inner, name) {
                    return Some(place);
                }
                let value = self.lower_member(inner, name, *name_span);
                if name == "Length" && matches!(value.kind, ExprKind::ArrayLen(_) | ExprKind::Call(..)) {
                    let owner = match &value.kind {
                        ExprKind::ArrayLen(_) => "Array",
                        _ => "string",
                    };
                    self.report(
                        Code::ReadOnlyAssignment,
                        target.span,
                        format!(
                            "Property or indexer '{owner}.Length' cannot be assigned to -- it is read only"
                        ),
                    );
                    return None;
                }
                self.not_assignable(&value, target.span);
                None
            },
            ast::ExprKind::Index {
                target: array,
                index,
            } => {
                let array = self.lower_expr(array);
                let index_value = self.lower_index(index);
                match self.index_expr(array, index_value, target.span) {
                    Expr {
                        kind: ExprKind::Index(array, index),
                        ty,
                    } => Some(TypedPlace {
                        place: Place::Index { array, index },
                        ty,
                    }),
                    _ => None,
                }
            },
            _ => {
                let value = self.lower_expr(target);
                self.not_assignable(&value, target.span);
                None
            },
        }
    }

    fn not_assignable(&mut self, value: &Expr, span: Span) {
        if value.ty != Ty::Error {
            self.report(
                Code::InvalidAssignmentTarget,
                span,
                "The left-hand side of an assignment must be a variable, property or indexer",
            );
        }
    }

    /// Make a place safe to read and then write.
    fn stabilize(&mut self, target: TypedPlace) -> StablePlace {
        let TypedPlace { place, ty } = target;
        match place {
            Place::Local(id) => StablePlace {
                read: Expr::new(ExprKind::Local(id), ty.clone()),
                place: Place::Local(id),
                ty,
                bindings: Vec::new(),
            },
            Place::Global(id) => StablePlace {
                read: Expr::new(ExprKind::Global(id), ty.clone()),
                place: Place::Global(id),
                ty,
                bindings: Vec::new(),
            },
            Place::Index { array, index } => {
                let array_ty = array.ty.clone();
                let array_tmp = self.temp(array_ty.clone());
                let index_tmp = self.temp(Ty::Int);
                let array_ref = || Box::new(Expr::new(ExprKind::Local(array_tmp), array_ty.clone()));
                let index_ref = || Box::new(Expr::new(ExprKind::Local(index_tmp), Ty::Int));
                StablePlace {
                    read: Expr::new(ExprKind::Index(array_ref(), index_ref()), ty.clone()),
                    place: Place::Index {
                        array: array_ref(),
                        index: index_ref(),
                    },
                    ty,
                    bindings: vec![(array_tmp, *array), (index_tmp, *index)],
                }
            },
        }
    }
}

/// A resolved assignment target.
pub(super) struct TypedPlace {
    pub(super) place: Place,
    pub(super) ty: Ty,
}

/// Bind temporaries around `body`, first binding outermost.
fn wrap_bindings(bindings: Vec<(u32, Expr)>, body: Expr) -> Expr {
    bindings.into_iter().rev().fold(body, |body, (id, value)| {
        let ty = body.ty.clone();
        Expr::new(ExprKind::Let(id, Box::new(value), Box::new(body)), ty)
    })
}

/// Type named by a primitive keyword.
pub(super) fn primitive_ty(kind: &TypeRefKind) -> Option<Ty> {
    Some(match kind {
        TypeRefKind::Int => Ty::Int,
        TypeRefKind::Long => Ty::Long,
        TypeRefKind::Double => Ty::Double,
        TypeRefKind::Bool => Ty::Bool,
        TypeRefKind::String => Ty::String,
        TypeRefKind::Void => Ty::Void,
        TypeRefKind::Var | TypeRefKind::Named(_) | TypeRefKind::Array(_) => return None,
    })
}
