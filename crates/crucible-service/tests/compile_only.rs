//! Compile-only requests against the shipped core library.

use std::sync::Arc;

use crucible_core::Severity;
use crucible_service::prelude::*;
use crucible_test::prelude::*;

fn service() -> CompileOnlyService {
    init_test_logging();
    CompileOnlyService::with_default_imports(Arc::new(core_references()))
}

#[test]
fn test_valid_unit_succeeds() {
    let result = service()
        .compile_only(
            "public class C { public static void Main() { Console.WriteLine(\"hi\"); } }",
            None,
        )
        .unwrap();
    assert!(result.success);
    assert!(result.errors.is_empty());
}

#[test]
fn test_return_value_in_void_method_is_reported_on_line_eight() {
    let result = service()
        .compile_only("public class C { void M() { return 1; } }", None)
        .unwrap();
    assert!(!result.success);
    assert_eq!(result.errors.len(), 1);
    let error = &result.errors[0];
    assert_eq!(error.id, "CRU0127");
    assert_eq!(error.line, 8);
    assert!(error.column.is_some());
    assert_eq!(error.severity, Severity::Error);
}

#[test]
fn test_unknown_extra_namespace_is_a_diagnostic() {
    let extras = vec!["Does.Not.Exist".to_owned()];
    let result = service()
        .compile_only("class C { }", Some(&extras))
        .unwrap();
    assert!(!result.success);
    assert_eq!(result.errors[0].id, "CRU0246");
    assert_eq!(result.errors[0].line, 7);
}

#[test]
fn test_duplicate_imports_are_not_errors() {
    let extras = vec!["Core".to_owned()];
    let result = service()
        .compile_only("class C { }", Some(&extras))
        .unwrap();
    assert!(result.success);
}

#[test]
fn test_top_level_statements_are_rejected() {
    let result = service()
        .compile_only("Console.WriteLine(1);", None)
        .unwrap();
    assert!(!result.success);
    assert!(result.errors.iter().any(|e| e.id == "CRU0116"));
}

#[test]
fn test_sandbox_namespace_is_not_referenced() {
    let extras = vec!["Sandbox.IO".to_owned()];
    let result = service()
        .compile_only("class C { }", Some(&extras))
        .unwrap();
    assert!(!result.success);
}

#[test]
fn test_compile_only_is_idempotent() {
    let service = service();
    let code = "class C { static int F() { int x = \"s\"; return x; } }";
    let first = service.compile_only(code, None).unwrap();
    let second = service.compile_only(code, None).unwrap();
    assert_eq!(first, second);
    assert!(!first.success);
}

#[test]
fn test_result_json_shape() {
    let result = service()
        .compile_only("public class C { void M() { return 1; } }", None)
        .unwrap();
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(json["errors"][0]["id"], "CRU0127");
    assert_eq!(json["errors"][0]["line"], 8);
    assert_eq!(json["errors"][0]["severity"], "Error");
}
