//! Guest programs compiled and run inside the isolated runtime.

use std::time::Duration;

use crucible_compiler::{EntryPoint, ReferenceSet};
use crucible_core::ExecutionOutcome;
use crucible_sandbox::prelude::*;
use crucible_test::prelude::*;
use tokio_util::sync::CancellationToken;

fn main_entry() -> EntryPoint {
    EntryPoint::new("", "P", "Main")
}

fn program(body: &str) -> String {
    format!(
        "using Core;\nusing Core.Collections;\nusing Core.Concurrency;\nusing Sandbox.IO;\n\
         class P {{\n    static void Main() {{\n{body}\n    }}\n}}\n"
    )
}

fn faulted(outcome: &ExecutionOutcome) -> &str {
    match outcome {
        ExecutionOutcome::Faulted { reason } => reason,
        other => panic!("expected a fault, got {other:?}"),
    }
}

#[test]
fn test_console_output_is_captured() {
    let sandbox = TestSandbox::new();
    let report = sandbox.run_main(&program(
        "Console.WriteLine(1 + 1); Console.Write(\"a\"); Console.WriteLine(true); Console.WriteLine(0.5);",
    ));
    assert_eq!(report.outcome, ExecutionOutcome::Completed);
    assert_eq!(report.stdout, "2\naTrue\n0.5\n");
    assert!(!report.stdout_truncated);
}

#[test]
fn test_index_out_of_range_faults() {
    let sandbox = TestSandbox::new();
    let report = sandbox.run_main(&program(
        "int[] xs = new int[2]; Console.WriteLine(\"before\"); Console.WriteLine(xs[5]);",
    ));
    assert_eq!(
        faulted(&report.outcome),
        "Index was outside the bounds of the array."
    );
    assert_eq!(report.stdout, "before\n");
}

#[test]
fn test_division_by_zero_faults() {
    let sandbox = TestSandbox::new();
    let report = sandbox.run_main(&program("int z = 0; Console.WriteLine(10 / z);"));
    assert!(!faulted(&report.outcome).is_empty());
}

#[test]
fn test_infinite_loop_times_out() {
    let sandbox = TestSandbox::new();
    let report = sandbox.run_with(
        &program("int i = 0; while (true) { i++; }"),
        &references(),
        &main_entry(),
        Some(Duration::from_millis(200)),
    );
    assert_eq!(report.outcome, ExecutionOutcome::TimedOut { budget_ms: 200 });
    assert!(report.elapsed_ms >= 200);
}

#[test]
fn test_sleeping_guest_times_out_promptly() {
    let sandbox = TestSandbox::new();
    let report = sandbox.run_with(
        &program("Thread.Sleep(60000);"),
        &references(),
        &main_entry(),
        Some(Duration::from_millis(200)),
    );
    assert_eq!(report.outcome, ExecutionOutcome::TimedOut { budget_ms: 200 });
    assert!(report.elapsed_ms < 10_000);
}

#[test]
fn test_default_budget_comes_from_host() {
    let sandbox = TestSandbox::with_setup(|b| b.default_timeout(Duration::from_millis(150)));
    let report = sandbox.run_main(&program("int i = 0; while (true) { i++; }"));
    assert_eq!(report.outcome, ExecutionOutcome::TimedOut { budget_ms: 150 });
}

#[test]
fn test_cancellation_faults_with_cancelled() {
    let sandbox = TestSandbox::new();
    let image = compile_image(&program("int i = 0; while (true) { i++; }"), &references());
    let mut runtime = sandbox.runtime(&image);

    let token = CancellationToken::new();
    token.cancel();
    let report = runtime
        .invoke(&main_entry(), Some(Duration::from_secs(30)), Some(&token))
        .unwrap();
    assert_eq!(
        report.outcome,
        ExecutionOutcome::Faulted {
            reason: "cancelled".to_owned()
        }
    );
}

#[test]
fn test_file_write_inside_grant() {
    let sandbox = TestSandbox::new();
    let report = sandbox.run_main(&program(
        "File.WriteAllText(\"out.txt\", \"hello\");\n\
         File.AppendAllText(\"out.txt\", \" world\");\n\
         Console.WriteLine(File.ReadAllText(\"out.txt\"));\n\
         Console.WriteLine(File.Exists(\"out.txt\"));",
    ));
    assert_eq!(report.outcome, ExecutionOutcome::Completed);
    assert_eq!(report.stdout, "hello world\nTrue\n");
    assert_eq!(sandbox.read_work_file("out.txt").as_deref(), Some("hello world"));
}

#[test]
fn test_parent_traversal_faults() {
    let sandbox = TestSandbox::new();
    let report = sandbox.run_main(&program("File.WriteAllText(\"../escape.txt\", \"x\");"));
    assert!(faulted(&report.outcome).contains("denied"));
    assert!(!sandbox.work_dir().join("../escape.txt").exists());
}

#[test]
fn test_read_only_grant() {
    let sandbox = TestSandbox::new();
    std::fs::write(sandbox.data_dir().join("in.txt"), "data").unwrap();

    let report = sandbox.run_main(&program(
        "Console.WriteLine(File.ReadAllText(\"/data/in.txt\"));",
    ));
    assert_eq!(report.stdout, "data\n");

    let report = sandbox.run_main(&program("File.WriteAllText(\"/data/in.txt\", \"x\");"));
    assert!(faulted(&report.outcome).contains("denied"));
    assert_eq!(
        std::fs::read_to_string(sandbox.data_dir().join("in.txt")).unwrap(),
        "data"
    );
}

#[test]
fn test_paths_outside_grants_fault() {
    let sandbox = TestSandbox::new();
    let report = sandbox.run_main(&program("Console.WriteLine(File.Exists(\"/etc/passwd\"));"));
    assert!(faulted(&report.outcome).contains("denied"));
}

#[test]
fn test_bin_module_is_linked() {
    let sandbox = TestSandbox::new();
    sandbox.install_module(CALC_MODULE, &calc_module_bytes());
    let refs = references().union(&ReferenceSet::new(vec![calc_library()]));

    let report = sandbox.run_with(
        "using Core;\nusing Ext;\nclass P { static void Main() { Console.WriteLine(Calc.Add(2, 3) * Calc.Mul(2, 4)); } }",
        &refs,
        &main_entry(),
        None,
    );
    assert_eq!(report.outcome, ExecutionOutcome::Completed);
    assert_eq!(report.stdout, "40\n");
}

#[test]
fn test_missing_bin_module_fails_load() {
    let sandbox = TestSandbox::new();
    let refs = references().union(&ReferenceSet::new(vec![calc_library()]));
    let image = compile_image(
        "using Core;\nusing Ext;\nclass P { static void Main() { Console.WriteLine(Calc.Add(1, 1)); } }",
        &refs,
    );

    let mut runtime = IsolatedRuntime::create(sandbox.host()).unwrap();
    let err = runtime.load(&image).unwrap_err();
    assert!(matches!(err, SandboxError::ModuleNotFound { ref module, .. } if module == CALC_MODULE));
    assert!(!runtime.is_loaded());
}

#[test]
fn test_invoke_requires_loaded_export() {
    let sandbox = TestSandbox::new();
    let mut runtime = IsolatedRuntime::create(sandbox.host()).unwrap();
    assert!(matches!(
        runtime.invoke(&main_entry(), None, None),
        Err(SandboxError::NotLoaded)
    ));

    let image = compile_image(&program(""), &references());
    runtime.load(&image).unwrap();
    let missing = EntryPoint::new("", "P", "Other");
    assert!(matches!(
        runtime.invoke(&missing, None, None),
        Err(SandboxError::EntryPointNotFound(name)) if name == "P.Other"
    ));
}

#[test]
fn test_output_cap_truncates() {
    let sandbox = TestSandbox::with_setup(|b| b.max_output_bytes(5));
    let report = sandbox.run_main(&program("Console.WriteLine(\"0123456789\");"));
    assert_eq!(report.outcome, ExecutionOutcome::Completed);
    assert_eq!(report.stdout, "01234");
    assert!(report.stdout_truncated);
}

#[test]
fn test_state_does_not_leak_between_invocations() {
    let sandbox = TestSandbox::new();
    let image = compile_image(
        &program("Console.WriteLine(Table.Count()); Table.Set(\"k\", \"v\");"),
        &references(),
    );
    let mut runtime = sandbox.runtime(&image);
    for _ in 0..2 {
        let report = runtime.invoke(&main_entry(), None, None).unwrap();
        assert_eq!(report.stdout, "0\n");
    }
}

#[test]
fn test_runtimes_are_isolated_from_each_other() {
    let sandbox = TestSandbox::new();
    let image = compile_image(&program("Console.WriteLine(\"x\");"), &references());
    let a = sandbox.runtime(&image);
    let b = sandbox.runtime(&image);
    assert_ne!(a.id(), b.id());
}

#[test]
fn test_vanished_grant_is_a_provisioning_error() {
    let dir = tempfile::tempdir().unwrap();
    let granted = dir.path().join("granted");
    std::fs::create_dir(&granted).unwrap();
    let host = std::sync::Arc::new(
        SandboxHost::builder()
            .grant_dir(&granted, ".", true)
            .build()
            .unwrap(),
    );
    std::fs::remove_dir(&granted).unwrap();

    let err = IsolatedRuntime::create(&host).unwrap_err();
    assert!(matches!(err, SandboxError::HostProvisioning { .. }));
}
