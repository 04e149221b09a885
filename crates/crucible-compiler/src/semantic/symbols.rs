//! Declarations, type names and namespace lookup.

use super::Checker;
use super::ir::{EntryDef, Expr, ExprKind, FuncId, Function, Global, GlobalId, Place, Stmt};
use crate::diagnostics::Code;
use crate::library::{LibraryType, ReferenceSet};
use crate::syntax::Span;
use crate::syntax::ast::{CompilationUnit, Member, TypeRef, TypeRefKind};
use crate::types::Ty;

#[derive(Debug)]
pub(super) struct ClassSym {
    pub(super) namespace: String,
    pub(super) name: String,
    pub(super) full_name: String,
    /// Index into `CompilationUnit::classes`.
    pub(super) ast_index: usize,
}

#[derive(Debug)]
pub(super) struct MethodSym {
    pub(super) class: usize,
    pub(super) name: String,
    pub(super) params: Vec<Ty>,
    pub(super) returns: Ty,
    pub(super) is_static: bool,
    pub(super) func: FuncId,
    /// Index into the class's member list.
    pub(super) member_index: usize,
}

#[derive(Debug)]
pub(super) struct FieldSym {
    pub(super) class: usize,
    pub(super) name: String,
    pub(super) ty: Ty,
    pub(super) is_static: bool,
    pub(super) global: GlobalId,
    pub(super) member_index: usize,
}

/// A type name resolved in some scope.
#[derive(Debug, Clone, Copy)]
pub(super) enum TypeSym<'a> {
    /// User class.
    User(usize),
    /// Library type.
    Library(&'a LibraryType),
}

impl<'a> Checker<'a> {
    // -----------------------------------------------------------------------
    // Pass one: declarations
    // -----------------------------------------------------------------------

    pub(super) fn declare(&mut self, unit: &CompilationUnit) {
        for (index, class) in unit.classes.iter().enumerate() {
            let full_name = class.full_name();
            if self.classes.iter().any(|c| c.full_name == full_name) {
                let ns = if class.namespace.is_empty() {
                    "<global namespace>".to_owned()
                } else {
                    class.namespace.clone()
                };
                self.report(
                    Code::DuplicateType,
                    class.name_span,
                    format!(
                        "The namespace '{ns}' already contains a definition for '{}'",
                        class.name
                    ),
                );
                continue;
            }
            self.classes.push(ClassSym {
                namespace: class.namespace.clone(),
                name: class.name.clone(),
                full_name,
                ast_index: index,
            });
        }

        // Usings are checked once user namespaces are known.
        for using in &unit.usings {
            if self.usings.contains(&using.name) {
                self.report(Code::RedundantUsing, using.span, "Unnecessary using directive");
                continue;
            }
            if !self.namespace_exists(&using.name) {
                self.report(
                    Code::TypeNotFound,
                    using.span,
                    format!(
                        "The type or namespace name '{}' could not be found (are you missing a using directive or an assembly reference?)",
                        using.name
                    ),
                );
            }
            self.usings.push(using.name.clone());
        }

        for class_index in 0..self.classes.len() {
            self.declare_members(unit, class_index);
        }

        self.collect_entry_points();
    }

    fn declare_members(&mut self, unit: &CompilationUnit, class_index: usize) {
        let ast = &unit.classes[self.classes[class_index].ast_index];
        let namespace = self.classes[class_index].namespace.clone();
        let class_name = self.classes[class_index].name.clone();

        for (member_index, member) in ast.members.iter().enumerate() {
            match member {
                Member::Field(field) => {
                    if self.member_name_taken(class_index, &field.name) {
                        self.report_duplicate_member(&class_name, &field.name, field.name_span);
                        continue;
                    }
                    let ty = self.resolve_value_type(&field.ty, &namespace);
                    let global = u32::try_from(self.program.globals.len()).unwrap_or(u32::MAX);
                    self.program.globals.push(Global {
                        name: format!("{class_name}.{}", field.name),
                        ty: ty.clone(),
                    });
                    self.fields.push(FieldSym {
                        class: class_index,
                        name: field.name.clone(),
                        ty,
                        is_static: field.modifiers.is_static,
                        global,
                        member_index,
                    });
                },
                Member::Method(method) => {
                    let returns = match method.return_type.kind {
                        TypeRefKind::Void => Ty::Void,
                        _ => self.resolve_value_type(&method.return_type, &namespace),
                    };
                    let params: Vec<Ty> = method
                        .params
                        .iter()
                        .map(|p| self.resolve_value_type(&p.ty, &namespace))
                        .collect();

                    if self
                        .fields
                        .iter()
                        .any(|f| f.class == class_index && f.name == method.name)
                    {
                        self.report_duplicate_member(&class_name, &method.name, method.name_span);
                        continue;
                    }
                    if self.methods.iter().any(|m| {
                        m.class == class_index && m.name == method.name && m.params == params
                    }) {
                        self.report(
                            Code::DuplicateMethod,
                            method.name_span,
                            format!(
                                "Type '{class_name}' already defines a member called '{}' with the same parameter types",
                                method.name
                            ),
                        );
                        continue;
                    }

                    let func = u32::try_from(self.program.functions.len()).unwrap_or(u32::MAX);
                    self.program.functions.push(Function {
                        name: format!("{}.{}", self.classes[class_index].full_name, method.name),
                        param_count: u32::try_from(params.len()).unwrap_or(u32::MAX),
                        returns: returns.clone(),
                        locals: params.clone(),
                        body: Vec::new(),
                    });
                    self.methods.push(MethodSym {
                        class: class_index,
                        name: method.name.clone(),
                        params,
                        returns,
                        is_static: method.modifiers.is_static,
                        func,
                        member_index,
                    });
                },
            }
        }
    }

    fn member_name_taken(&self, class: usize, name: &str) -> bool {
        self.fields.iter().any(|f| f.class == class && f.name == name)
            || self.methods.iter().any(|m| m.class == class && m.name == name)
    }

    fn report_duplicate_member(&mut self, class: &str, name: &str, span: Span) {
        self.report(
            Code::DuplicateMember,
            span,
            format!("The type '{class}' already contains a definition for '{name}'"),
        );
    }

    /// Static void methods taking nothing or a `string[]`.
    fn collect_entry_points(&mut self) {
        let args = Ty::Array(Box::new(Ty::String));
        let mut entries = Vec::new();
        for method in &self.methods {
            if !method.is_static || method.returns != Ty::Void {
                continue;
            }
            let takes_args = match method.params.as_slice() {
                [] => false,
                [only] if *only == args => true,
                _ => continue,
            };
            let export = format!("{}.{}", self.classes[method.class].full_name, method.name);
            // Overloads share an export name; the first declared wins.
            if entries.iter().any(|e: &EntryDef| e.export == export) {
                continue;
            }
            entries.push(EntryDef {
                export,
                function: method.func,
                takes_args,
            });
        }
        self.program.entry_points = entries;
    }

    // -----------------------------------------------------------------------
    // Pass two: bodies
    // -----------------------------------------------------------------------

    pub(super) fn define(&mut self, unit: &CompilationUnit) {
        self.define_initializers(unit);

        for index in 0..self.methods.len() {
            let (class, member_index, is_static, returns, func) = {
                let m = &self.methods[index];
                (m.class, m.member_index, m.is_static, m.returns.clone(), m.func)
            };
            let ast_class = &unit.classes[self.classes[class].ast_index];
            let Member::Method(decl) = &ast_class.members[member_index] else {
                continue;
            };

            let params = self.methods[index].params.clone();
            let display = format!(
                "{}.{}({})",
                self.classes[class].name,
                decl.name,
                params.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
            );
            self.begin_function(class, is_static, returns.clone(), display.clone());
            for (param, ty) in decl.params.iter().zip(params) {
                let id = self.declare_local(&param.name, param.span, ty);
                self.mark_initialized(id);
            }

            let (body, completes) = self.lower_block(&decl.body);
            if completes && returns != Ty::Void {
                self.report(
                    Code::NotAllPathsReturn,
                    decl.name_span,
                    format!("'{display}': not all code paths return a value"),
                );
            }

            let name = self.program.functions[func as usize].name.clone();
            let param_count = self.program.functions[func as usize].param_count;
            let function = self.finish_function(name, param_count, body);
            self.program.functions[func as usize] = function;
        }
    }

    fn define_initializers(&mut self, unit: &CompilationUnit) {
        self.begin_function(0, true, Ty::Void, "<static initializer>".to_owned());
        let mut body = Vec::new();
        for index in 0..self.fields.len() {
            let (class, member_index, global, ty) = {
                let f = &self.fields[index];
                (f.class, f.member_index, f.global, f.ty.clone())
            };
            let ast_class = &unit.classes[self.classes[class].ast_index];
            let Member::Field(decl) = &ast_class.members[member_index] else {
                continue;
            };
            let Some(init) = &decl.init else {
                continue;
            };
            self.func.class = class;
            let value = self.lower_expr(init);
            let value = self.coerce(value, &ty, init.span);
            body.push(Stmt::Expr(Expr::new(
                ExprKind::Assign(Place::Global(global), Box::new(value)),
                ty,
            )));
        }
        self.program.init = self.finish_function("<init>".to_owned(), 0, body);
    }

    // -----------------------------------------------------------------------
    // Types
    // -----------------------------------------------------------------------

    /// Resolve a written type that must hold values (`void` and `var` are
    /// rejected here; callers handle them where they are legal).
    pub(super) fn resolve_value_type(&mut self, ty: &TypeRef, namespace: &str) -> Ty {
        match &ty.kind {
            TypeRefKind::Int => Ty::Int,
            TypeRefKind::Long => Ty::Long,
            TypeRefKind::Double => Ty::Double,
            TypeRefKind::Bool => Ty::Bool,
            TypeRefKind::String => Ty::String,
            TypeRefKind::Array(elem) => match self.resolve_value_type(elem, namespace) {
                Ty::Error => Ty::Error,
                elem => Ty::Array(Box::new(elem)),
            },
            TypeRefKind::Void => {
                self.report(
                    Code::TypeNotFound,
                    ty.span,
                    "Keyword 'void' cannot be used in this context",
                );
                Ty::Error
            },
            TypeRefKind::Var => {
                self.report(
                    Code::ImplicitWithoutInitializer,
                    ty.span,
                    "The contextual keyword 'var' may only appear within a local variable declaration",
                );
                Ty::Error
            },
            TypeRefKind::Named(name) => {
                let message = if self.lookup_type(name, namespace).is_some() {
                    format!(
                        "The type '{name}' is a static type and cannot be used for values; only primitive and array types can be stored"
                    )
                } else {
                    format!(
                        "The type or namespace name '{name}' could not be found (are you missing a using directive or an assembly reference?)"
                    )
                };
                self.report(Code::TypeNotFound, ty.span, message);
                Ty::Error
            },
        }
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    /// Namespace of the class whose body is being checked.
    pub(super) fn current_namespace(&self) -> String {
        self.classes
            .get(self.func.class)
            .map(|c| c.namespace.clone())
            .unwrap_or_default()
    }

    /// Whether `namespace` names a referenced or user namespace (or a prefix
    /// of one).
    pub(super) fn namespace_exists(&self, namespace: &str) -> bool {
        if namespace.is_empty() {
            return false;
        }
        self.refs.has_namespace(namespace)
            || self.classes.iter().any(|c| {
                c.namespace == namespace
                    || c
                        .namespace
                        .strip_prefix(namespace)
                        .is_some_and(|rest| rest.starts_with('.'))
            })
    }

    /// `namespace` and its enclosing namespaces, innermost first, ending
    /// with the global namespace.
    pub(super) fn enclosing_namespaces(namespace: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut current = namespace.to_owned();
        while !current.is_empty() {
            out.push(current.clone());
            match current.rfind('.') {
                Some(dot) => current.truncate(dot),
                None => current.clear(),
            }
        }
        out.push(String::new());
        out
    }

    /// Type `name` declared exactly in `namespace`.
    pub(super) fn type_in_namespace(&self, namespace: &str, name: &str) -> Option<TypeSym<'a>> {
        let refs: &'a ReferenceSet = self.refs;
        if let Some(index) = self
            .classes
            .iter()
            .position(|c| c.namespace == namespace && c.name == name)
        {
            return Some(TypeSym::User(index));
        }
        refs.find_type(namespace, name).map(TypeSym::Library)
    }

    /// Resolve a simple type name from inside `namespace`: enclosing
    /// namespaces first, then `using` imports in order.
    pub(super) fn lookup_type(&self, name: &str, namespace: &str) -> Option<TypeSym<'a>> {
        for ns in Self::enclosing_namespaces(namespace) {
            if let Some(sym) = self.type_in_namespace(&ns, name) {
                return Some(sym);
            }
        }
        self.usings
            .iter()
            .find_map(|ns| self.type_in_namespace(ns, name))
    }

    /// Resolve a simple name as a namespace from inside `namespace`.
    pub(super) fn lookup_namespace(&self, name: &str, namespace: &str) -> Option<String> {
        Self::enclosing_namespaces(namespace)
            .into_iter()
            .map(|ns| {
                if ns.is_empty() {
                    name.to_owned()
                } else {
                    format!("{ns}.{name}")
                }
            })
            .find(|candidate| self.namespace_exists(candidate))
    }
}
