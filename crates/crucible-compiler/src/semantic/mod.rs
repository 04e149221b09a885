//! Binding and type checking.
//!
//! The checker runs in two passes over a parsed unit. The first declares
//! every class, field and method so bodies can refer to members declared
//! later. The second lowers field initializers and method bodies into the
//! typed [`ir`], reporting semantic diagnostics along the way.

mod call;
mod expr;
pub mod ir;
mod stmt;
mod symbols;

use std::collections::HashMap;

use crate::diagnostics::{Code, DiagnosticBag};
use crate::library::ReferenceSet;
use crate::syntax::Span;
use crate::syntax::ast::CompilationUnit;
use crate::types::Ty;
use ir::{Function, LocalId, Program};
use symbols::{ClassSym, FieldSym, MethodSym};

/// Check `unit` against `refs` and lower it.
///
/// The returned program is only meaningful when no error was reported.
pub(crate) fn check(
    unit: &CompilationUnit,
    refs: &ReferenceSet,
    diags: &mut DiagnosticBag,
) -> Program {
    let mut checker = Checker::new(refs, diags);
    checker.declare(unit);
    checker.define(unit);
    checker.program
}

/// A declared local or parameter.
#[derive(Debug)]
struct LocalInfo {
    name: String,
    span: Span,
    used: bool,
    initialized: bool,
    /// Compiler temporaries are never reported as unused.
    synthetic: bool,
}

/// Per-body state.
#[derive(Debug, Default)]
struct FunctionState {
    /// Enclosing class symbol.
    class: usize,
    /// Whether `this`-less access to instance members is an error.
    is_static: bool,
    /// Declared return type.
    returns: Ty,
    /// `Class.Method(params)` for messages.
    display_name: String,
    /// Types of parameters, locals and temporaries.
    locals: Vec<Ty>,
    info: Vec<LocalInfo>,
    scopes: Vec<HashMap<String, LocalId>>,
    /// One flag per enclosing loop: whether a `break` targets it.
    loops: Vec<bool>,
}

pub(crate) struct Checker<'a> {
    refs: &'a ReferenceSet,
    diags: &'a mut DiagnosticBag,
    usings: Vec<String>,
    classes: Vec<ClassSym>,
    methods: Vec<MethodSym>,
    fields: Vec<FieldSym>,
    program: Program,
    func: FunctionState,
}

impl<'a> Checker<'a> {
    fn new(refs: &'a ReferenceSet, diags: &'a mut DiagnosticBag) -> Self {
        Self {
            refs,
            diags,
            usings: Vec::new(),
            classes: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
            program: Program::default(),
            func: FunctionState::default(),
        }
    }

    fn report(&mut self, code: Code, span: Span, message: impl Into<String>) {
        self.diags.report(code, span, message);
    }

    // -----------------------------------------------------------------------
    // Function bodies and scopes
    // -----------------------------------------------------------------------

    fn begin_function(&mut self, class: usize, is_static: bool, returns: Ty, display_name: String) {
        self.func = FunctionState {
            class,
            is_static,
            returns,
            display_name,
            scopes: vec![HashMap::new()],
            ..FunctionState::default()
        };
    }

    fn finish_function(&mut self, name: String, param_count: u32, body: Vec<ir::Stmt>) -> Function {
        self.pop_scope();
        let state = std::mem::take(&mut self.func);
        Function {
            name,
            param_count,
            returns: state.returns,
            locals: state.locals,
            body,
        }
    }

    fn push_scope(&mut self) {
        self.func.scopes.push(HashMap::new());
    }

    /// Close the innermost scope, warning about locals that were declared
    /// without an initializer and never touched.
    fn pop_scope(&mut self) {
        let Some(scope) = self.func.scopes.pop() else {
            return;
        };
        let mut ids: Vec<_> = scope.into_values().collect();
        ids.sort_unstable();
        for id in ids {
            let Some(info) = self.func.info.get(id as usize) else {
                continue;
            };
            if !info.used && !info.initialized && !info.synthetic {
                let (span, message) = (
                    info.span,
                    format!("The variable '{}' is declared but never used", info.name),
                );
                self.report(Code::UnusedLocal, span, message);
            }
        }
    }

    fn new_local(&mut self, name: &str, span: Span, ty: Ty, synthetic: bool) -> LocalId {
        let id = u32::try_from(self.func.locals.len()).unwrap_or(u32::MAX);
        self.func.locals.push(ty);
        self.func.info.push(LocalInfo {
            name: name.to_owned(),
            span,
            used: false,
            initialized: false,
            synthetic,
        });
        id
    }

    /// Declare a named local in the innermost scope.
    fn declare_local(&mut self, name: &str, span: Span, ty: Ty) -> LocalId {
        let (innermost, enclosing) = match self.func.scopes.split_last() {
            Some((last, rest)) => (last.contains_key(name), rest.iter().any(|s| s.contains_key(name))),
            None => (false, false),
        };
        if innermost {
            self.report(
                Code::DuplicateLocal,
                span,
                format!("A local variable named '{name}' is already defined in this scope"),
            );
        } else if enclosing {
            self.report(
                Code::LocalConflictsWithEnclosing,
                span,
                format!(
                    "A local or parameter named '{name}' cannot be declared in this scope because that name is used in an enclosing local scope"
                ),
            );
        }
        let id = self.new_local(name, span, ty, false);
        if let Some(scope) = self.func.scopes.last_mut() {
            scope.insert(name.to_owned(), id);
        }
        id
    }

    /// Fresh temporary for lowered compound operations.
    fn temp(&mut self, ty: Ty) -> LocalId {
        self.new_local("", Span::default(), ty, true)
    }

    fn lookup_local(&self, name: &str) -> Option<LocalId> {
        self.func
            .scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
    }

    fn mark_used(&mut self, id: LocalId) {
        if let Some(info) = self.func.info.get_mut(id as usize) {
            info.used = true;
        }
    }

    fn mark_initialized(&mut self, id: LocalId) {
        if let Some(info) = self.func.info.get_mut(id as usize) {
            info.initialized = true;
        }
    }

    fn local_ty(&self, id: LocalId) -> Ty {
        self.func
            .locals
            .get(id as usize)
            .cloned()
            .unwrap_or(Ty::Error)
    }
}

#[cfg(test)]
mod tests;
