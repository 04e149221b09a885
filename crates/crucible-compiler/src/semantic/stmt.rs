//! Statement lowering and reachability.
//!
//! Every lowering function also reports whether control can fall off the
//! end of the statement; that single flag drives unreachable-code warnings,
//! the "not all code paths return a value" error and the treatment of
//! infinite loops.

use super::Checker;
use super::ir::{Expr, ExprKind, Place, Stmt};
use crate::diagnostics::Code;
use crate::syntax::ast::{self, Block, StmtKind, TypeRefKind};
use crate::types::Ty;

impl Checker<'_> {
    /// Lower a `{ ... }` block in its own scope.
    pub(super) fn lower_block(&mut self, block: &Block) -> (Vec<Stmt>, bool) {
        self.push_scope();
        let lowered = self.lower_stmts(&block.stmts);
        self.pop_scope();
        lowered
    }

    fn lower_stmts(&mut self, stmts: &[ast::Stmt]) -> (Vec<Stmt>, bool) {
        let mut out = Vec::with_capacity(stmts.len());
        let mut reachable = true;
        let mut warned = false;
        for stmt in stmts {
            if !reachable && !warned && !matches!(stmt.kind, StmtKind::Empty) {
                self.report(Code::UnreachableCode, stmt.span, "Unreachable code detected");
                warned = true;
            }
            let completes = self.lower_stmt(stmt, &mut out);
            reachable &= completes;
        }
        (out, reachable)
    }

    /// Lower an embedded statement (loop or branch body) in its own scope.
    fn lower_embedded(&mut self, stmt: &ast::Stmt) -> (Vec<Stmt>, bool) {
        self.push_scope();
        let mut out = Vec::new();
        let completes = self.lower_stmt(stmt, &mut out);
        self.pop_scope();
        (out, completes)
    }

    fn lower_stmt(&mut self, stmt: &ast::Stmt, out: &mut Vec<Stmt>) -> bool {
        match &stmt.kind {
            StmtKind::Empty => true,
            StmtKind::Block(block) => {
                let (body, completes) = self.lower_block(block);
                out.push(Stmt::Block(body));
                completes
            },
            StmtKind::Local { ty, declarators } => {
                self.lower_local(ty, declarators, out);
                true
            },
            StmtKind::Expr(expr) => {
                if !matches!(
                    expr.kind,
                    ast::ExprKind::Assign { .. }
                        | ast::ExprKind::IncDec { .. }
                        | ast::ExprKind::Call { .. }
                        | ast::ExprKind::Error
                ) {
                    self.report(
                        Code::InvalidStatement,
                        expr.span,
                        "Only assignment, call, increment, decrement, and new object expressions can be used as a statement",
                    );
                }
                let lowered = self.lower_expr(expr);
                out.push(Stmt::Expr(lowered));
                true
            },
            StmtKind::If {
                cond,
                then,
                otherwise,
            } => {
                let cond = self.lower_condition(cond);
                let constant = constant_bool(&cond);
                let (then, then_completes) = self.lower_embedded(then);
                let (otherwise, else_completes) = match otherwise {
                    Some(stmt) => self.lower_embedded(stmt),
                    None => (Vec::new(), true),
                };
                out.push(Stmt::If {
                    cond,
                    then,
                    otherwise,
                });
                match constant {
                    Some(true) => then_completes,
                    Some(false) => else_completes,
                    None => then_completes || else_completes,
                }
            },
            StmtKind::While { cond, body } => {
                let cond = self.lower_condition(cond);
                let infinite = constant_bool(&cond) == Some(true);
                let (body, broke) = self.lower_loop_body(body);
                out.push(Stmt::Loop {
                    cond: (!infinite).then_some(cond),
                    body,
                    step: Vec::new(),
                });
                !infinite || broke
            },
            StmtKind::For {
                init,
                cond,
                step,
                body,
            } => {
                self.push_scope();
                let mut block = Vec::new();
                for stmt in init {
                    self.lower_stmt(stmt, &mut block);
                }
                let cond = cond.as_ref().map(|c| self.lower_condition(c));
                let infinite = cond.as_ref().is_none_or(|c| constant_bool(c) == Some(true));
                let step = step.iter().map(|s| self.lower_expr(s)).collect();
                let (body, broke) = self.lower_loop_body(body);
                self.pop_scope();

                block.push(Stmt::Loop {
                    cond: if infinite { None } else { cond },
                    body,
                    step,
                });
                out.push(Stmt::Block(block));
                !infinite || broke
            },
            StmtKind::Return(value) => {
                self.lower_return(value.as_ref(), stmt, out);
                false
            },
            StmtKind::Break => {
                match self.func.loops.last_mut() {
                    Some(broke) => {
                        *broke = true;
                        out.push(Stmt::Break);
                    },
                    None => self.report_no_loop(stmt),
                }
                false
            },
            StmtKind::Continue => {
                if self.func.loops.is_empty() {
                    self.report_no_loop(stmt);
                } else {
                    out.push(Stmt::Continue);
                }
                false
            },
        }
    }

    /// Lower a loop body; also returns whether a `break` targets the loop.
    fn lower_loop_body(&mut self, body: &ast::Stmt) -> (Vec<Stmt>, bool) {
        self.func.loops.push(false);
        let (body, _) = self.lower_embedded(body);
        let broke = self.func.loops.pop().unwrap_or(false);
        (body, broke)
    }

    fn report_no_loop(&mut self, stmt: &ast::Stmt) {
        self.report(
            Code::NoEnclosingLoop,
            stmt.span,
            "No enclosing loop out of which to break or continue",
        );
    }

    fn lower_return(&mut self, value: Option<&ast::Expr>, stmt: &ast::Stmt, out: &mut Vec<Stmt>) {
        let returns = self.func.returns.clone();
        match (value, returns) {
            (None, Ty::Void) => out.push(Stmt::Return(None)),
            (Some(value), Ty::Void) => {
                let message = format!(
                    "Since '{}' returns void, a return keyword must not be followed by an object expression",
                    self.func.display_name
                );
                self.report(Code::ReturnValueInVoid, stmt.span, message);
                let _ = self.lower_expr(value);
            },
            (None, ty) => {
                if ty != Ty::Error {
                    self.report(
                        Code::ReturnValueExpected,
                        stmt.span,
                        format!("An object of a type convertible to '{ty}' is required"),
                    );
                }
            },
            (Some(value), ty) => {
                let lowered = self.lower_expr(value);
                let lowered = self.coerce(lowered, &ty, value.span);
                out.push(Stmt::Return(Some(lowered)));
            },
        }
    }

    fn lower_local(&mut self, ty: &ast::TypeRef, declarators: &[ast::Declarator], out: &mut Vec<Stmt>) {
        let declared = match ty.kind {
            TypeRefKind::Var => None,
            _ => {
                let ns = self.current_namespace();
                Some(self.resolve_value_type(ty, &ns))
            },
        };

        for decl in declarators {
            let init = decl.init.as_ref().map(|e| (self.lower_expr(e), e.span));
            let (local_ty, value) = match (&declared, init) {
                (Some(ty), Some((value, span))) => {
                    let value = self.coerce(value, ty, span);
                    (ty.clone(), Some(value))
                },
                (Some(ty), None) => (ty.clone(), None),
                (None, None) => {
                    self.report(
                        Code::ImplicitWithoutInitializer,
                        decl.span,
                        "Implicitly-typed variables must be initialized",
                    );
                    (Ty::Error, None)
                },
                (None, Some((value, span))) => match value.ty {
                    Ty::Null | Ty::Void => {
                        self.report(
                            Code::BadImplicitInitializer,
                            span,
                            format!("Cannot assign {} to an implicitly-typed variable", value.ty),
                        );
                        (Ty::Error, None)
                    },
                    _ => (value.ty.clone(), Some(value)),
                },
            };

            let id = self.declare_local(&decl.name, decl.span, local_ty.clone());
            if declared.is_none() || decl.init.is_some() {
                self.mark_initialized(id);
            }
            let value = match value {
                Some(value) => value,
                None => match zero_value(&local_ty) {
                    Some(zero) => zero,
                    None => continue,
                },
            };
            out.push(Stmt::Expr(Expr::new(
                ExprKind::Assign(Place::Local(id), Box::new(value)),
                local_ty,
            )));
        }
    }

    /// Lower an expression that must be `bool`.
    pub(super) fn lower_condition(&mut self, cond: &ast::Expr) -> Expr {
        let lowered = self.lower_expr(cond);
        self.coerce(lowered, &Ty::Bool, cond.span)
    }
}

/// Value of a constant `bool` condition.
fn constant_bool(expr: &Expr) -> Option<bool> {
    match expr.kind {
        ExprKind::Bool(value) => Some(value),
        _ => None,
    }
}

/// Default value a declared local starts with.
pub(super) fn zero_value(ty: &Ty) -> Option<Expr> {
    let kind = match ty {
        Ty::Int => ExprKind::Int(0),
        Ty::Long => ExprKind::Long(0),
        Ty::Double => ExprKind::Double(0.0),
        Ty::Bool => ExprKind::Bool(false),
        Ty::String | Ty::Array(_) => ExprKind::Null,
        Ty::Void | Ty::Null | Ty::Error => return None,
    };
    Some(Expr::new(kind, ty.clone()))
}
