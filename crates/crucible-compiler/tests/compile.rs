//! End-to-end compilation against the shipped reference libraries.

use std::path::{Path, PathBuf};

use crucible_compiler::library::parse_descriptor;
use crucible_compiler::prelude::*;

fn runtime_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../runtime")
}

fn references() -> ReferenceSet {
    let core = ReferenceManifest::from_directory(&runtime_dir().join("lib"))
        .unwrap()
        .resolve()
        .unwrap();
    let sandbox = ReferenceManifest::from_directory(&runtime_dir().join("sandbox"))
        .unwrap()
        .resolve()
        .unwrap();
    core.union(&sandbox)
}

fn image(source: &str) -> ModuleImage {
    let output = compile(source, &references(), &EmitTarget::Image("Test".to_owned())).unwrap();
    let errors: Vec<_> = output.errors().map(ToString::to_string).collect();
    assert!(errors.is_empty(), "{errors:#?}");
    let image = output.image.expect("image must be emitted");
    wasmparser::Validator::new()
        .validate_all(&image.bytes)
        .expect("emitted module must validate");
    image
}

#[test]
fn test_hello_world_emits_entry_point() {
    let image = image(
        "using Core;\nnamespace Sandbox;\npublic class Runner {\n    public static void Run(string[] args) {\n        Console.WriteLine(1 + 1);\n    }\n}\n",
    );
    assert_eq!(image.name, "Test");
    assert!(image.exports_entry(&EntryPoint::new("Sandbox", "Runner", "Run")));
    assert!(image.required_modules.is_empty());
    assert_eq!(image.digest, blake3::hash(&image.bytes).to_hex().to_string());
}

#[test]
fn test_language_tour_validates() {
    let source = r#"
using Core;
using Core.Collections;
using Core.Sequences;
using Core.Text;

namespace Tour {
    public class Program {
        static int calls = 0;
        static string greeting = "hello";
        static double[] weights = new double[] { 0.5, 1.5 };

        static int Fib(int n) {
            calls++;
            if (n < 2) return n;
            return Fib(n - 1) + Fib(n - 2);
        }

        static long Widen(int x) { return x * 2L; }

        static bool Check(int a, int b) {
            return a > 0 && b > 0 || a == b;
        }

        public static void Main() {
            int total = 0;
            for (int i = 0; i < 10; i++) {
                if (i % 2 == 0) continue;
                if (i > 7) break;
                total += i;
            }
            int j = 3;
            while (j > 0) { j--; }

            int[] xs = new int[] { 3, 1, 2 };
            xs[0] += 4;
            xs[1]++;
            int[] ys = new int[5];
            ys[4] = xs.Sum() + xs.Max() - xs.Min();
            double avg = xs.Average();
            bool has = xs.Contains(2);

            string[] words = new string[] { "a", "b" };
            words[1] = words[0] + "!";
            string s = greeting + " " + total + " " + avg + " " + has + " " + Widen(5);
            s = s.ToUpper().Trim();
            bool same = s == "X" || s != words[1];

            double d = Math.Sqrt(16.0) % 3.0;
            int r = (int)Math.Round(2.5) + Math.Abs(-3) + Math.Max(1, 2);
            long big = long.MaxValue;
            double ratio = big / 2.0;
            double w = weights[1];
            int pick = same ? 1 : 2;
            var text = "abc".Repeat(2);

            Table.Set("k", s);
            Console.WriteLine(Table.Get("k"));
            Console.WriteLine(Fib(10) + calls + pick + r);
            Console.WriteLine(d + ratio + w);
            Console.WriteLine(text.Length + ys.Length);
            Console.WriteLine(Check(1, 2));
            Console.WriteLine(-big);
            Console.WriteLine(!same);
        }
    }
}
"#;
    let image = image(source);
    assert!(image.exports_entry(&EntryPoint::new("Tour", "Program", "Main")));
}

#[test]
fn test_discard_target_emits_nothing() {
    let output = compile(
        "class C { static void Main() { } }",
        &references(),
        &EmitTarget::Discard,
    )
    .unwrap();
    assert!(output.diagnostics.is_empty());
    assert!(output.image.is_none());
}

#[test]
fn test_syntax_errors_skip_semantic_analysis() {
    let output = compile(
        "class C { static void Main() { int x = ; y = 1; } }",
        &references(),
        &EmitTarget::Image("X".to_owned()),
    )
    .unwrap();
    let ids: Vec<_> = output.errors().map(Diagnostic::id).collect();
    assert_eq!(ids, vec!["CRU1525"]);
    assert!(output.image.is_none());
}

#[test]
fn test_semantic_errors_block_emission() {
    let output = compile(
        "class C { static void Main() { Missing(); } }",
        &references(),
        &EmitTarget::Image("X".to_owned()),
    )
    .unwrap();
    assert!(output.has_errors());
    assert!(output.image.is_none());
}

#[test]
fn test_diagnostic_locations_are_zero_based() {
    let output = compile(
        "using Core;\nclass C {\n  static void M() { return 1; }\n}",
        &references(),
        &EmitTarget::Discard,
    )
    .unwrap();
    let errors: Vec<_> = output.errors().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].id(), "CRU0127");
    assert_eq!(errors[0].location.map(|l| l.line), Some(2));
}

#[test]
fn test_module_bound_methods_become_imports() {
    let descriptor = r#"
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
    let path = Path::new("Ext.toml");
    let ext = Library::from_descriptor(parse_descriptor(path, descriptor).unwrap(), path).unwrap();
    let refs = references().union(&ReferenceSet::new(vec![ext]));

    let output = compile(
        "using Core;\nusing Ext;\nclass C { static void Main() { Console.WriteLine(Calc.Add(2, 3)); } }",
        &refs,
        &EmitTarget::Image("M".to_owned()),
    )
    .unwrap();
    let image = output.image.expect("image");
    assert!(image.required_modules.contains("calc"));

    let mut imported = false;
    for payload in wasmparser::Parser::new(0).parse_all(&image.bytes) {
        if let wasmparser::Payload::ImportSection(reader) = payload.unwrap() {
            for import in reader {
                let import = import.unwrap();
                imported |= import.module == "calc" && import.name == "add";
            }
        }
    }
    assert!(imported);
}

#[test]
fn test_compilation_is_deterministic() {
    let source = "using Core;\nclass C { static void Main() { Console.WriteLine(\"x\" + 1); } }";
    let refs = references();
    let target = EmitTarget::Image("D".to_owned());
    let a = compile(source, &refs, &target).unwrap().image.unwrap();
    let b = compile(source, &refs, &target).unwrap().image.unwrap();
    assert_eq!(a.digest, b.digest);
}

fn method_body(body: &str) -> String {
    format!("using Core;\nclass C {{\n    static void Main() {{\n{body}\n    }}\n}}\n")
}

fn error_ids(source: &str) -> Vec<&'static str> {
    let output = compile(source, &references(), &EmitTarget::Image("X".to_owned())).unwrap();
    assert!(output.image.is_none());
    output.errors().map(Diagnostic::id).collect()
}

#[test]
fn test_deeply_nested_blocks_are_rejected() {
    let body = format!("{}{}", "{".repeat(1000), "}".repeat(1000));
    assert_eq!(error_ids(&method_body(&body)), vec!["CRU8078"]);
}

#[test]
fn test_deeply_nested_parentheses_are_rejected() {
    let source = format!(
        "class C {{ static int Main() {{ return {}1{}; }} }}",
        "(".repeat(2000),
        ")".repeat(2000)
    );
    assert_eq!(error_ids(&source), vec!["CRU8078"]);
}

#[test]
fn test_long_operator_chain_is_rejected() {
    let body = format!("Console.WriteLine(0{});", " + 1".repeat(500));
    assert_eq!(error_ids(&method_body(&body)), vec!["CRU8078"]);
}

#[test]
fn test_long_member_chain_is_rejected() {
    let body = format!("int n = \"x\"{};", ".Length".repeat(500));
    assert_eq!(error_ids(&method_body(&body)), vec!["CRU8078"]);
}

#[test]
fn test_nesting_limit_reported_once_and_parsing_resumes() {
    let body = format!(
        "{}{}\nint y = ;",
        "{".repeat(300),
        "}".repeat(300)
    );
    assert_eq!(error_ids(&method_body(&body)), vec!["CRU8078", "CRU1525"]);
}

#[test]
fn test_moderate_nesting_still_compiles() {
    let body = format!(
        "{}Console.WriteLine(({}1{}){});{}",
        "{".repeat(20),
        "(".repeat(20),
        ")".repeat(20),
        " + 1".repeat(30),
        "}".repeat(20)
    );
    image(&method_body(&body));
}
