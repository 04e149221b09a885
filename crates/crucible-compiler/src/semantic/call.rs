//! Names, member access and calls.
//!
//! Overload resolution filters candidates by arity, then picks the one with
//! the lowest total implicit-conversion cost. Ties go to the first candidate
//! in declaration order.

use crucible_core::HostFunction;

use super::Checker;
use super::expr::{TypedPlace, primitive_ty};
use super::ir::{BinOp, Callee, Expr, ExprKind, FuncId, ModuleImport, Place};
use super::symbols::TypeSym;
use crate::diagnostics::Code;
use crate::library::{Binding, ConstValue, LibraryMethod};
use crate::syntax::Span;
use crate::syntax::ast;
use crate::types::Ty;

/// What a member-access target resolved to.
enum Target<'a> {
    Value(Expr),
    Type(TypeSym<'a>),
    Primitive(Ty),
    Namespace(String),
    Error,
}

/// Built-in members implemented without a library binding.
#[derive(Debug, Clone, Copy)]
enum Builtin {
    Host(HostFunction),
    /// `s.Substring(start)`
    SubstringToEnd,
    ToString,
    IsNullOrEmpty,
}

#[derive(Debug, Clone)]
enum CallTarget {
    Function {
        func: FuncId,
        is_static: bool,
        display: String,
    },
    Library(Binding),
    Builtin(Builtin),
}

#[derive(Debug, Clone)]
struct Candidate {
    params: Vec<Ty>,
    returns: Ty,
    target: CallTarget,
}

impl Candidate {
    fn builtin(params: &[Ty], returns: Ty, builtin: Builtin) -> Self {
        Self {
            params: params.to_vec(),
            returns,
            target: CallTarget::Builtin(builtin),
        }
    }

    fn library(method: &LibraryMethod) -> Self {
        Self {
            params: method.params.clone(),
            returns: method.returns.clone(),
            target: CallTarget::Library(method.binding.clone()),
        }
    }
}

/// How the call was written, for messages and static checks.
struct CallSite<'s> {
    name: &'s str,
    span: Span,
    /// Leading arguments the user did not write (extension receivers).
    implicit_args: usize,
    /// `Type.Method()` form, where instance methods are never reachable.
    via_type: bool,
}

impl<'a> Checker<'a> {
    // -----------------------------------------------------------------------
    // Names
    // -----------------------------------------------------------------------

    /// Resolve a simple name used as a value.
    pub(super) fn lower_name(&mut self, name: &str, span: Span) -> Expr {
        if let Some(id) = self.lookup_local(name) {
            self.mark_used(id);
            return Expr::new(ExprKind::Local(id), self.local_ty(id));
        }
        if let Some(place) = self.field_in_scope(name, span) {
            return match place {
                Some(TypedPlace {
                    place: Place::Global(global),
                    ty,
                }) => Expr::new(ExprKind::Global(global), ty),
                _ => Expr::error(),
            };
        }
        if self.method_in_class(self.func.class, name) {
            self.report_method_group(name, span);
            return Expr::error();
        }
        let ns = self.current_namespace();
        if self.lookup_type(name, &ns).is_some() {
            self.report(
                Code::TypeAsValue,
                span,
                format!("'{name}' is a type, which is not valid in the given context"),
            );
        } else if self.lookup_namespace(name, &ns).is_some() {
            self.report(
                Code::NamespaceAsValue,
                span,
                format!("'{name}' is a namespace but is used like a variable"),
            );
        } else {
            self.report_missing_name(name, span);
        }
        Expr::error()
    }

    /// A field of the current class named `name`: `None` when there is no
    /// such field, `Some(None)` when it exists but is not reachable here.
    pub(super) fn field_in_scope(&mut self, name: &str, span: Span) -> Option<Option<TypedPlace>> {
        let class = self.func.class;
        let field = self.fields.iter().find(|f| f.class == class && f.name == name)?;
        let (is_static, global, ty) = (field.is_static, field.global, field.ty.clone());
        if !is_static && self.func.is_static {
            let owner = self.classes[class].name.clone();
            self.report_object_required(&format!("{owner}.{name}"), span);
            return Some(None);
        }
        Some(Some(TypedPlace {
            place: Place::Global(global),
            ty,
        }))
    }

    /// `Type.field` as an assignment target, without reporting anything
    /// when `target` is not a user type or the field does not exist.
    pub(super) fn static_field_place(&mut self, target: &ast::Expr, name: &str) -> Option<TypedPlace> {
        let TypeSym::User(class) = self.silent_type(target)? else {
            return None;
        };
        let field = self
            .fields
            .iter()
            .find(|f| f.class == class && f.name == name && f.is_static)?;
        Some(TypedPlace {
            place: Place::Global(field.global),
            ty: field.ty.clone(),
        })
    }

    /// Resolve `target` as a type name without reporting.
    fn silent_type(&self, target: &ast::Expr) -> Option<TypeSym<'a>> {
        let ns = self.current_namespace();
        match &target.kind {
            ast::ExprKind::Name(name) => {
                if self.lookup_local(name).is_some()
                    || self
                        .fields
                        .iter()
                        .any(|f| f.class == self.func.class && f.name == *name)
                {
                    return None;
                }
                self.lookup_type(name, &ns)
            },
            ast::ExprKind::Member { target, name, .. } => {
                let prefix = dotted_name(target)?;
                let first = prefix.split('.').next()?;
                if self.lookup_local(first).is_some() {
                    return None;
                }
                let full = match self.lookup_namespace(first, &ns) {
                    Some(found) => format!("{found}{}", &prefix[first.len()..]),
                    None => prefix,
                };
                self.type_in_namespace(&full, name)
            },
            _ => None,
        }
    }

    fn method_in_class(&self, class: usize, name: &str) -> bool {
        self.methods.iter().any(|m| m.class == class && m.name == name)
    }

    fn report_missing_name(&mut self, name: &str, span: Span) {
        self.report(
            Code::NameNotFound,
            span,
            format!("The name '{name}' does not exist in the current context"),
        );
    }

    fn report_method_group(&mut self, name: &str, span: Span) {
        self.report(
            Code::MethodGroupAsValue,
            span,
            format!("Cannot convert method group '{name}' to non-delegate type"),
        );
    }

    fn report_object_required(&mut self, member: &str, span: Span) {
        self.report(
            Code::ObjectReferenceRequired,
            span,
            format!(
                "An object reference is required for the non-static field, method, or property '{member}'"
            ),
        );
    }

    fn report_missing_member(&mut self, owner: &str, name: &str, span: Span) {
        self.report(
            Code::MemberNotFound,
            span,
            format!("'{owner}' does not contain a definition for '{name}'"),
        );
    }

    // -----------------------------------------------------------------------
    // Member access
    // -----------------------------------------------------------------------

    /// Resolve the left side of a `.`.
    fn resolve_target(&mut self, target: &ast::Expr) -> Target<'a> {
        match &target.kind {
            ast::ExprKind::Name(name) => {
                let ns = self.current_namespace();
                let is_value = self.lookup_local(name).is_some()
                    || self
                        .fields
                        .iter()
                        .any(|f| f.class == self.func.class && f.name == *name)
                    || self.method_in_class(self.func.class, name);
                if is_value {
                    return Target::Value(self.lower_name(name, target.span));
                }
                if let Some(sym) = self.lookup_type(name, &ns) {
                    return Target::Type(sym);
                }
                if let Some(found) = self.lookup_namespace(name, &ns) {
                    return Target::Namespace(found);
                }
                self.report_missing_name(name, target.span);
                Target::Error
            },
            ast::ExprKind::Primitive(kind) => match primitive_ty(kind) {
                Some(ty) if ty != Ty::Void => Target::Primitive(ty),
                _ => Target::Error,
            },
            ast::ExprKind::Member {
                target: inner,
                name,
                name_span,
            } => match self.resolve_target(inner) {
                Target::Namespace(ns) => {
                    let nested = format!("{ns}.{name}");
                    if let Some(sym) = self.type_in_namespace(&ns, name) {
                        Target::Type(sym)
                    } else if self.namespace_exists(&nested) {
                        Target::Namespace(nested)
                    } else {
                        self.report_not_in_namespace(name, &ns, *name_span);
                        Target::Error
                    }
                },
                resolved => Target::Value(self.member_value(resolved, name, *name_span)),
            },
            _ => Target::Value(self.lower_expr(target)),
        }
    }

    fn report_not_in_namespace(&mut self, name: &str, ns: &str, span: Span) {
        self.report(
            Code::NotInNamespace,
            span,
            format!(
                "The type or namespace name '{name}' does not exist in the namespace '{ns}' (are you missing an assembly reference?)"
            ),
        );
    }

    /// `target.name` used as a value.
    pub(super) fn lower_member(&mut self, target: &ast::Expr, name: &str, name_span: Span) -> Expr {
        match self.resolve_target(target) {
            Target::Namespace(ns) => {
                if self.type_in_namespace(&ns, name).is_some() {
                    self.report(
                        Code::TypeAsValue,
                        name_span,
                        format!("'{ns}.{name}' is a type, which is not valid in the given context"),
                    );
                } else if self.namespace_exists(&format!("{ns}.{name}")) {
                    self.report(
                        Code::NamespaceAsValue,
                        name_span,
                        format!("'{ns}.{name}' is a namespace but is used like a variable"),
                    );
                } else {
                    self.report_not_in_namespace(name, &ns, name_span);
                }
                Expr::error()
            },
            resolved => self.member_value(resolved, name, name_span),
        }
    }

    fn member_value(&mut self, target: Target<'a>, name: &str, span: Span) -> Expr {
        match target {
            Target::Error => Expr::error(),
            Target::Namespace(ns) => {
                self.report_not_in_namespace(name, &ns, span);
                Expr::error()
            },
            Target::Type(TypeSym::User(class)) => {
                if let Some(field) = self.fields.iter().find(|f| f.class == class && f.name == name) {
                    if !field.is_static {
                        let member = format!("{}.{name}", self.classes[class].name);
                        self.report_object_required(&member, span);
                        return Expr::error();
                    }
                    return Expr::new(ExprKind::Global(field.global), field.ty.clone());
                }
                if self.method_in_class(class, name) {
                    self.report_method_group(name, span);
                } else {
                    let owner = self.classes[class].name.clone();
                    self.report_missing_member(&owner, name, span);
                }
                Expr::error()
            },
            Target::Type(TypeSym::Library(ty)) => {
                if let Some(constant) = ty.constant(name) {
                    return const_expr(&constant.value);
                }
                if ty.methods_named(name).next().is_some() {
                    self.report_method_group(name, span);
                } else {
                    self.report_missing_member(&ty.name, name, span);
                }
                Expr::error()
            },
            Target::Primitive(ty) => match primitive_member(&ty, name) {
                Some(expr) => expr,
                None => {
                    self.report_missing_member(&ty.to_string(), name, span);
                    Expr::error()
                },
            },
            Target::Value(value) => match (&value.ty, name) {
                (Ty::Error, _) => Expr::error(),
                (Ty::String, "Length") => Expr::new(
                    ExprKind::Call(Callee::Host(HostFunction::StrLength), vec![value]),
                    Ty::Int,
                ),
                (Ty::Array(_), "Length") => Expr::new(ExprKind::ArrayLen(Box::new(value)), Ty::Int),
                (ty, _) => {
                    let ty = ty.clone();
                    self.report_no_instance_member(&ty, name, span);
                    Expr::error()
                },
            },
        }
    }

    fn report_no_instance_member(&mut self, ty: &Ty, name: &str, span: Span) {
        self.report(
            Code::InstanceMemberNotFound,
            span,
            format!(
                "'{ty}' does not contain a definition for '{name}' and no accessible extension method '{name}' accepting a first argument of type '{ty}' could be found"
            ),
        );
    }

    // -----------------------------------------------------------------------
    // Calls
    // -----------------------------------------------------------------------

    pub(super) fn lower_call(&mut self, callee: &ast::Expr, args: &[ast::Expr], span: Span) -> Expr {
        match &callee.kind {
            ast::ExprKind::Name(name) => {
                let args = self.lower_args(args);
                let class = self.func.class;
                let candidates = self.user_candidates(class, name);
                if candidates.is_empty() {
                    self.report_not_callable(name, callee.span);
                    return Expr::error();
                }
                let site = CallSite {
                    name,
                    span: callee.span,
                    implicit_args: 0,
                    via_type: false,
                };
                self.resolve_call(&site, candidates, args)
            },
            ast::ExprKind::Member {
                target,
                name,
                name_span,
            } => {
                let resolved = self.resolve_target(target);
                let args = self.lower_args(args);
                self.lower_member_call(resolved, name, *name_span, args)
            },
            _ => {
                let _ = self.lower_expr(callee);
                let _ = self.lower_args(args);
                self.report(Code::NameNotFound, span, "Method name expected");
                Expr::error()
            },
        }
    }

    fn lower_args(&mut self, args: &[ast::Expr]) -> Vec<(Expr, Span)> {
        args.iter().map(|a| (self.lower_expr(a), a.span)).collect()
    }

    fn report_not_callable(&mut self, name: &str, span: Span) {
        let ns = self.current_namespace();
        if self.lookup_local(name).is_some()
            || self
                .fields
                .iter()
                .any(|f| f.class == self.func.class && f.name == name)
        {
            self.report(
                Code::NameNotFound,
                span,
                format!("'{name}' is a variable but is used like a method"),
            );
        } else if self.lookup_type(name, &ns).is_some() {
            self.report(
                Code::TypeAsValue,
                span,
                format!("'{name}' is a type but is used like a method"),
            );
        } else {
            self.report_missing_name(name, span);
        }
    }

    fn user_candidates(&self, class: usize, name: &str) -> Vec<Candidate> {
        self.methods
            .iter()
            .filter(|m| m.class == class && m.name == name)
            .map(|m| Candidate {
                params: m.params.clone(),
                returns: m.returns.clone(),
                target: CallTarget::Function {
                    func: m.func,
                    is_static: m.is_static,
                    display: format!(
                        "{}.{}({})",
                        self.classes[class].name,
                        m.name,
                        m.params
                            .iter()
                            .map(ToString::to_string)
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                },
            })
            .collect()
    }

    fn lower_member_call(
        &mut self,
        target: Target<'a>,
        name: &str,
        span: Span,
        args: Vec<(Expr, Span)>,
    ) -> Expr {
        let mut site = CallSite {
            name,
            span,
            implicit_args: 0,
            via_type: true,
        };
        match target {
            Target::Error => Expr::error(),
            Target::Namespace(ns) => {
                self.report_not_in_namespace(name, &ns, span);
                Expr::error()
            },
            Target::Type(TypeSym::User(class)) => {
                let candidates = self.user_candidates(class, name);
                if candidates.is_empty() {
                    let owner = self.classes[class].name.clone();
                    self.report_missing_member(&owner, name, span);
                    return Expr::error();
                }
                self.resolve_call(&site, candidates, args)
            },
            Target::Type(TypeSym::Library(ty)) => {
                let candidates: Vec<_> = ty.methods_named(name).map(Candidate::library).collect();
                if candidates.is_empty() {
                    self.report_missing_member(&ty.name, name, span);
                    return Expr::error();
                }
                self.resolve_call(&site, candidates, args)
            },
            Target::Primitive(ty) => {
                let candidates = primitive_statics(&ty, name);
                if candidates.is_empty() {
                    self.report_missing_member(&ty.to_string(), name, span);
                    return Expr::error();
                }
                self.resolve_call(&site, candidates, args)
            },
            Target::Value(receiver) => {
                if receiver.ty == Ty::Error {
                    return Expr::error();
                }
                let mut candidates = instance_builtins(&receiver.ty, name);
                if candidates.is_empty() {
                    candidates = self.extension_candidates(&receiver.ty, name);
                }
                if candidates.is_empty() {
                    let ty = receiver.ty.clone();
                    self.report_no_instance_member(&ty, name, span);
                    return Expr::error();
                }
                site.implicit_args = 1;
                site.via_type = false;
                let receiver_span = span;
                let mut all = Vec::with_capacity(args.len().saturating_add(1));
                all.push((receiver, receiver_span));
                all.extend(args);
                self.resolve_call(&site, candidates, all)
            },
        }
    }

    /// Extension methods from namespaces in scope whose first parameter
    /// accepts `receiver`.
    fn extension_candidates(&self, receiver: &Ty, name: &str) -> Vec<Candidate> {
        let refs = self.refs;
        let mut namespaces = Self::enclosing_namespaces(&self.current_namespace());
        namespaces.extend(self.usings.iter().cloned());

        let mut out = Vec::new();
        for ns in &namespaces {
            for ty in refs.types_in(ns) {
                for method in ty.methods_named(name) {
                    let accepts = method.extension
                        && method
                            .params
                            .first()
                            .is_some_and(|first| receiver.implicit_cost(first).is_some());
                    if accepts {
                        out.push(Candidate::library(method));
                    }
                }
            }
        }
        out
    }

    fn resolve_call(
        &mut self,
        site: &CallSite<'_>,
        candidates: Vec<Candidate>,
        args: Vec<(Expr, Span)>,
    ) -> Expr {
        let written = args.len().saturating_sub(site.implicit_args);
        let matching: Vec<Candidate> = candidates
            .into_iter()
            .filter(|c| c.params.len() == args.len())
            .collect();
        if matching.is_empty() {
            self.report(
                Code::WrongArgumentCount,
                site.span,
                format!(
                    "No overload for method '{}' takes {written} arguments",
                    site.name
                ),
            );
            return Expr::error();
        }

        let mut best: Option<(u32, &Candidate)> = None;
        for candidate in &matching {
            let cost = candidate
                .params
                .iter()
                .zip(&args)
                .try_fold(0_u32, |acc, (param, (arg, _))| {
                    arg.ty
                        .implicit_cost(param)
                        .map(|c| acc.saturating_add(u32::from(c)))
                });
            if let Some(cost) = cost
                && best.is_none_or(|(b, _)| cost < b)
            {
                best = Some((cost, candidate));
            }
        }

        let Some((_, chosen)) = best else {
            let first = &matching[0];
            if let Some((index, (arg, span), param)) = first
                .params
                .iter()
                .zip(&args)
                .enumerate()
                .find(|(_, (param, (arg, _)))| arg.ty.implicit_cost(param).is_none())
                .map(|(i, (param, arg))| (i, arg, param))
            {
                let position = index.saturating_sub(site.implicit_args).saturating_add(1);
                let message = format!(
                    "Argument {position}: cannot convert from '{}' to '{param}'",
                    arg.ty
                );
                self.report(Code::BadArgument, *span, message);
            }
            return Expr::error();
        };
        let chosen = chosen.clone();

        if args.iter().any(|(arg, _)| arg.ty == Ty::Error) {
            return Expr::error();
        }
        let args: Vec<Expr> = chosen
            .params
            .iter()
            .zip(args)
            .map(|(param, (arg, span))| self.coerce(arg, param, span))
            .collect();

        self.build_call(site, chosen, args)
    }

    fn build_call(&mut self, site: &CallSite<'_>, chosen: Candidate, mut args: Vec<Expr>) -> Expr {
        let returns = chosen.returns;
        match chosen.target {
            CallTarget::Function {
                func,
                is_static,
                display,
            } => {
                if !is_static && (site.via_type || self.func.is_static) {
                    self.report_object_required(&display, site.span);
                    return Expr::error();
                }
                Expr::new(ExprKind::Call(Callee::Function(func), args), returns)
            },
            CallTarget::Library(Binding::Host(host)) => {
                Expr::new(ExprKind::Call(Callee::Host(host), args), returns)
            },
            CallTarget::Library(Binding::Intrinsic(intrinsic)) => {
                Expr::new(ExprKind::Call(Callee::Intrinsic(intrinsic), args), returns)
            },
            CallTarget::Library(Binding::Module { module, export }) => {
                let params = args.iter().map(|a| a.ty.clone()).collect();
                let index = self.module_import(ModuleImport {
                    module,
                    export,
                    params,
                    returns: returns.clone(),
                });
                Expr::new(ExprKind::Call(Callee::Module(index), args), returns)
            },
            CallTarget::Builtin(Builtin::Host(host)) => {
                Expr::new(ExprKind::Call(Callee::Host(host), args), returns)
            },
            CallTarget::Builtin(Builtin::SubstringToEnd) => {
                args.push(Expr::new(ExprKind::Int(-1), Ty::Int));
                Expr::new(
                    ExprKind::Call(Callee::Host(HostFunction::StrSubstring), args),
                    Ty::String,
                )
            },
            CallTarget::Builtin(Builtin::ToString) => match args.pop() {
                Some(value) => self.stringify(value),
                None => Expr::error(),
            },
            CallTarget::Builtin(Builtin::IsNullOrEmpty) => {
                let length = Expr::new(
                    ExprKind::Call(Callee::Host(HostFunction::StrLength), args),
                    Ty::Int,
                );
                Expr::new(
                    ExprKind::Binary(
                        BinOp::Eq,
                        Box::new(length),
                        Box::new(Expr::new(ExprKind::Int(0), Ty::Int)),
                    ),
                    Ty::Bool,
                )
            },
        }
    }

    /// Index of a module import, interning it on first use.
    fn module_import(&mut self, import: ModuleImport) -> u32 {
        let imports = &mut self.program.module_imports;
        let index = imports.iter().position(|i| *i == import).unwrap_or_else(|| {
            imports.push(import);
            imports.len().saturating_sub(1)
        });
        u32::try_from(index).unwrap_or(u32::MAX)
    }
}

/// `A.B.C` as a dotted string, if `expr` is only names and member accesses.
fn dotted_name(expr: &ast::Expr) -> Option<String> {
    match &expr.kind {
        ast::ExprKind::Name(name) => Some(name.clone()),
        ast::ExprKind::Member { target, name, .. } => {
            Some(format!("{}.{name}", dotted_name(target)?))
        },
        _ => None,
    }
}

fn const_expr(value: &ConstValue) -> Expr {
    let kind = match value {
        ConstValue::Int(v) => ExprKind::Int(*v),
        ConstValue::Long(v) => ExprKind::Long(*v),
        ConstValue::Double(v) => ExprKind::Double(*v),
        ConstValue::Bool(v) => ExprKind::Bool(*v),
        ConstValue::Str(v) => ExprKind::Str(v.clone()),
    };
    Expr::new(kind, value.ty())
}

/// Constants on primitive types (`int.MaxValue`, `string.Empty`, ...).
fn primitive_member(ty: &Ty, name: &str) -> Option<Expr> {
    let value = match (ty, name) {
        (Ty::Int, "MaxValue") => ConstValue::Int(i32::MAX),
        (Ty::Int, "MinValue") => ConstValue::Int(i32::MIN),
        (Ty::Long, "MaxValue") => ConstValue::Long(i64::MAX),
        (Ty::Long, "MinValue") => ConstValue::Long(i64::MIN),
        (Ty::Double, "MaxValue") => ConstValue::Double(f64::MAX),
        (Ty::Double, "MinValue") => ConstValue::Double(f64::MIN),
        (Ty::Double, "Epsilon") => ConstValue::Double(f64::from_bits(1)),
        (Ty::Double, "PositiveInfinity") => ConstValue::Double(f64::INFINITY),
        (Ty::Double, "NegativeInfinity") => ConstValue::Double(f64::NEG_INFINITY),
        (Ty::Double, "NaN") => ConstValue::Double(f64::NAN),
        (Ty::String, "Empty") => ConstValue::Str(String::new()),
        _ => return None,
    };
    Some(const_expr(&value))
}

/// Static methods on primitive types.
fn primitive_statics(ty: &Ty, name: &str) -> Vec<Candidate> {
    use Ty::String as S;

    match (ty, name) {
        (Ty::Int, "Parse") => vec![Candidate::builtin(
            &[S],
            Ty::Int,
            Builtin::Host(HostFunction::StrParseI32),
        )],
        (Ty::Double, "Parse") => vec![Candidate::builtin(
            &[S],
            Ty::Double,
            Builtin::Host(HostFunction::StrParseF64),
        )],
        (Ty::String, "IsNullOrEmpty") => {
            vec![Candidate::builtin(&[S], Ty::Bool, Builtin::IsNullOrEmpty)]
        },
        (Ty::String, "Concat") => vec![Candidate::builtin(
            &[S, S],
            Ty::String,
            Builtin::Host(HostFunction::StrConcat),
        )],
        _ => Vec::new(),
    }
}

/// Built-in instance methods; the receiver is the first parameter.
fn instance_builtins(receiver: &Ty, name: &str) -> Vec<Candidate> {
    use Ty::{Bool as B, Int as I, String as S};

    let host = |params: &[Ty], returns: Ty, f: HostFunction| {
        Candidate::builtin(params, returns, Builtin::Host(f))
    };

    if name == "ToString" && !matches!(receiver, Ty::Void | Ty::Null) {
        return vec![Candidate::builtin(
            std::slice::from_ref(receiver),
            S,
            Builtin::ToString,
        )];
    }
    if *receiver != Ty::String {
        return Vec::new();
    }
    match name {
        "ToUpper" => vec![host(&[S], S, HostFunction::StrToUpper)],
        "ToLower" => vec![host(&[S], S, HostFunction::StrToLower)],
        "Trim" => vec![host(&[S], S, HostFunction::StrTrim)],
        "Contains" => vec![host(&[S, S], B, HostFunction::StrContains)],
        "StartsWith" => vec![host(&[S, S], B, HostFunction::StrStartsWith)],
        "EndsWith" => vec![host(&[S, S], B, HostFunction::StrEndsWith)],
        "IndexOf" => vec![host(&[S, S], I, HostFunction::StrIndexOf)],
        "Substring" => vec![
            Candidate::builtin(&[S, I], S, Builtin::SubstringToEnd),
            host(&[S, I, I], S, HostFunction::StrSubstring),
        ],
        "Replace" => vec![host(&[S, S, S], S, HostFunction::StrReplace)],
        "Equals" => vec![host(&[S, S], B, HostFunction::StrEquals)],
        _ => Vec::new(),
    }
}
