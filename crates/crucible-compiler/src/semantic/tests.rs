use std::path::Path;

use crucible_core::HostFunction;

use super::check;
use super::ir::{Callee, ExprKind, Program, Stmt};
use crate::diagnostics::{Code, Diagnostic, DiagnosticBag};
use crate::library::{Intrinsic, Library, ReferenceSet, parse_descriptor};
use crate::syntax::{LineIndex, lex, parse};

const CORE: &str = include_str!("../../../../runtime/lib/Core.toml");
const SEQUENCES: &str = include_str!("../../../../runtime/lib/Core.Sequences.toml");
const TEXT: &str = include_str!("../../../../runtime/lib/Core.Text.toml");
const CALC: &str = r#"
namespace = "Ext"
[[types]]
name = "Calc"
[[types.methods]]
name = "Add"
params = ["int", "int"]
returns = "int"
module = "calc"
export = "add"
"#;

fn refs() -> ReferenceSet {
    let libs = [CORE, SEQUENCES, TEXT, CALC]
        .iter()
        .map(|text| {
            let path = Path::new("test.toml");
            Library::from_descriptor(parse_descriptor(path, text).unwrap(), path).unwrap()
        })
        .collect();
    ReferenceSet::new(libs)
}

fn check_source(source: &str) -> (Program, Vec<Diagnostic>) {
    let refs = refs();
    let mut diags = DiagnosticBag::new();
    let tokens = lex(source, &mut diags);
    let unit = parse(tokens, &mut diags);
    let program = check(&unit, &refs, &mut diags);
    (program, diags.into_diagnostics(&LineIndex::new(source)))
}

/// Wrap statements in a static entry method.
fn body(stmts: &str) -> String {
    format!(
        "using Core;\nusing Core.Sequences;\nusing Core.Text;\nusing Ext;\nnamespace Demo {{\npublic class Program {{\npublic static void Run() {{\n{stmts}\n}}\n}}\n}}\n"
    )
}

/// Ids of visible (non-hidden) diagnostics.
fn ids(source: &str) -> Vec<&'static str> {
    let (_, diags) = check_source(source);
    diags
        .iter()
        .filter(|d| d.code != Code::RedundantUsing)
        .map(Diagnostic::id)
        .collect()
}

fn first_call(program: &Program) -> Option<Callee> {
    program.functions[0].body.iter().find_map(|stmt| match stmt {
        Stmt::Expr(expr) => match &expr.kind {
            ExprKind::Call(callee, _) => Some(*callee),
            _ => None,
        },
        _ => None,
    })
}

#[test]
fn test_valid_program_has_no_diagnostics() {
    let (program, diags) = check_source(&body(r#"Console.WriteLine("hi");"#));
    assert!(diags.is_empty(), "{diags:?}");
    assert_eq!(program.entry_points.len(), 1);
    assert_eq!(program.entry_points[0].export, "Demo.Program.Run");
    assert!(!program.entry_points[0].takes_args);
}

#[test]
fn test_overload_prefers_exact_match() {
    let (program, _) = check_source(&body("Console.WriteLine(1);"));
    assert_eq!(
        first_call(&program),
        Some(Callee::Host(HostFunction::ConsoleWriteLineI32))
    );

    let (program, _) = check_source(&body("Console.WriteLine(1.5);"));
    assert_eq!(
        first_call(&program),
        Some(Callee::Host(HostFunction::ConsoleWriteLineF64))
    );
}

#[test]
fn test_undefined_name() {
    let (_, diags) = check_source(&body("int y = x;"));
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].id(), "CRU0103");
    assert_eq!(
        diags[0].message,
        "The name 'x' does not exist in the current context"
    );
    // Line of the statement inside the wrapper (0-based).
    assert_eq!(diags[0].location.map(|l| l.line), Some(7));
}

#[test]
fn test_return_value_from_void() {
    let (_, diags) = check_source(&body("return 1;"));
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].id(), "CRU0127");
    assert!(diags[0].message.starts_with("Since 'Program.Run()' returns void"));
}

#[test]
fn test_not_all_paths_return() {
    let source = "class C { static int F(bool b) { if (b) return 1; } }";
    assert_eq!(ids(source), vec!["CRU0161"]);

    let source = "class C { static int F(bool b) { if (b) return 1; else return 2; } }";
    assert!(ids(source).is_empty());
}

#[test]
fn test_infinite_loop_needs_no_return() {
    assert!(ids("class C { static int F() { while (true) { } } }").is_empty());
    assert_eq!(
        ids("class C { static int F() { while (true) { break; } } }"),
        vec!["CRU0161"]
    );
}

#[test]
fn test_unreachable_code_warning() {
    let (_, diags) = check_source(&body(r#"return; Console.WriteLine("x"); Console.WriteLine("y");"#));
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].id(), "CRU0162");
    assert!(!diags[0].is_error());
}

#[test]
fn test_narrowing_requires_cast() {
    assert_eq!(ids(&body("long a = 1; int b = a;")), vec!["CRU0266"]);
    assert!(ids(&body("long a = 1; int b = (int)a;")).is_empty());
    assert_eq!(ids(&body(r#"int b = "x";"#)), vec!["CRU0029"]);
}

#[test]
fn test_string_concatenation() {
    assert!(ids(&body(r#"string s = "n=" + 1 + true; Console.WriteLine(s);"#)).is_empty());
}

#[test]
fn test_operator_not_applicable() {
    assert_eq!(ids(&body("bool b = true - 1;")), vec!["CRU0019"]);
    assert_eq!(ids(&body("int x = -true;")), vec!["CRU0023"]);
}

#[test]
fn test_division_by_constant_zero() {
    assert_eq!(ids(&body("int x = 1 / 0;")), vec!["CRU0020"]);
    assert!(ids(&body("double x = 1.0 / 0;")).is_empty());
}

#[test]
fn test_argument_count_and_types() {
    assert_eq!(ids(&body("Console.WriteLine(1, 2);")), vec!["CRU1501"]);

    let (_, diags) = check_source(&body(r#"double r = Math.Sqrt("x");"#));
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].id(), "CRU1503");
    assert_eq!(
        diags[0].message,
        "Argument 1: cannot convert from 'string' to 'double'"
    );
}

#[test]
fn test_break_outside_loop() {
    assert_eq!(ids(&body("break;")), vec!["CRU0139"]);
    assert!(ids(&body("while (true) { break; }")).is_empty());
}

#[test]
fn test_unused_and_duplicate_locals() {
    let (_, diags) = check_source(&body("int x;"));
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].id(), "CRU0168");
    assert!(!diags[0].is_error());

    assert_eq!(ids(&body("int x = 1; int x = 2;")), vec!["CRU0128"]);
    assert_eq!(
        ids(&body("int x = 1; { int x = 2; }")),
        vec!["CRU0136"]
    );
}

#[test]
fn test_invalid_statement_expression() {
    assert_eq!(ids(&body("1 + 2;")), vec!["CRU0201"]);
}

#[test]
fn test_implicitly_typed_locals() {
    assert!(ids(&body("var n = 3; n++;")).is_empty());
    assert_eq!(ids(&body("var n = null;")), vec!["CRU0815"]);
}

#[test]
fn test_static_fields_and_initializers() {
    let source = "class C { static int count = 5; static void Run() { count++; count += 2; } }";
    let (program, diags) = check_source(source);
    assert!(diags.is_empty(), "{diags:?}");
    assert_eq!(program.globals.len(), 1);
    assert_eq!(program.init.body.len(), 1);
}

#[test]
fn test_instance_member_from_static_context() {
    assert_eq!(
        ids("class C { int count; static void Run() { count = 1; } }"),
        vec!["CRU0120"]
    );
    assert_eq!(
        ids("class C { void Helper() { } static void Run() { Helper(); } }"),
        vec!["CRU0120"]
    );
}

#[test]
fn test_read_only_length() {
    assert_eq!(ids(&body(r#"string s = "abc"; s.Length = 1;"#)), vec!["CRU0200"]);
    assert_eq!(ids(&body("3 = 4;")), vec!["CRU0131"]);
}

#[test]
fn test_extension_methods() {
    let (program, diags) =
        check_source(&body("int[] xs = new int[] { 1, 2, 3 }; int s = xs.Sum(); Console.WriteLine(s);"));
    assert!(diags.is_empty(), "{diags:?}");
    let has_sum = program.functions[0].body.iter().any(|stmt| {
        matches!(stmt, Stmt::Expr(e) if matches!(&e.kind, ExprKind::Assign(_, value)
            if matches!(value.kind, ExprKind::Call(Callee::Intrinsic(Intrinsic::SeqSum), _))))
    });
    assert!(has_sum);

    assert!(ids(&body(r#"string s = "ab".Repeat(2).ToUpper(); Console.WriteLine(s);"#)).is_empty());
    assert_eq!(ids(&body(r#"int n = "ab".Sum();"#)), vec!["CRU1061"]);
}

#[test]
fn test_module_imports_are_interned() {
    let (program, diags) =
        check_source(&body("int a = Calc.Add(1, 2); int b = Calc.Add(a, 3); Console.WriteLine(b);"));
    assert!(diags.is_empty(), "{diags:?}");
    assert_eq!(program.module_imports.len(), 1);
    assert_eq!(program.module_imports[0].module, "calc");
    assert_eq!(program.module_imports[0].export, "add");
}

#[test]
fn test_using_diagnostics() {
    let (_, diags) = check_source("using Core;\nusing Core;\nclass C { }");
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].id(), "CRU8019");
    assert!(!diags[0].is_error());

    assert_eq!(ids("using Nope;\nclass C { }"), vec!["CRU0246"]);
}

#[test]
fn test_type_and_namespace_as_values() {
    assert_eq!(ids(&body("int x = Console;")), vec!["CRU0119"]);
    assert_eq!(ids(&body("int x = Core;")), vec!["CRU0118"]);
    assert_eq!(ids(&body("Core.Nope.Write(1);")), vec!["CRU0234"]);
    assert_eq!(ids(&body("Console.Beep();")), vec!["CRU0117"]);
}

#[test]
fn test_duplicate_declarations() {
    assert_eq!(ids("class C { } class C { }"), vec!["CRU0101"]);
    assert_eq!(
        ids("class C { static void F() { } static void F() { } }"),
        vec!["CRU0111"]
    );
    assert_eq!(
        ids("class C { static int F; static void F() { } }"),
        vec!["CRU0102"]
    );
}

#[test]
fn test_conditional_and_constants() {
    assert!(ids(&body("double d = true ? 1 : Math.PI; Console.WriteLine(d);")).is_empty());
    assert_eq!(ids(&body(r#"var v = true ? 1 : "a";"#)), vec!["CRU0173"]);
    assert!(ids(&body("int m = int.MaxValue; Console.WriteLine(m);")).is_empty());
}

#[test]
fn test_string_builtins() {
    let source = body(
        r#"string s = " Hi ".Trim(); int i = s.IndexOf("i"); string t = s.Substring(1); bool e = string.IsNullOrEmpty(t); int n = int.Parse("4"); Console.WriteLine(i + n); Console.WriteLine(e);"#,
    );
    assert!(ids(&source).is_empty());
}

#[test]
fn test_array_indexing() {
    assert!(ids(&body("int[] a = new int[3]; a[0] = 1; a[1] += a[0]; a[2]++; Console.WriteLine(a.Length);")).is_empty());
    assert_eq!(ids(&body("int a = 1; int b = a[0];")), vec!["CRU0021"]);
}
