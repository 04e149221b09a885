//! Compile-and-run requests end to end.

use std::sync::Arc;

use crucible_core::{ExecutionOutcome, StatusSink};
use crucible_service::prelude::*;
use crucible_test::prelude::*;
use tokio_util::sync::CancellationToken;

fn orchestrator(sandbox: &TestSandbox) -> Orchestrator {
    let sandbox_refs = references();
    Orchestrator::new(Arc::clone(sandbox.host()), &core_references(), &sandbox_refs)
}

#[test]
fn test_hello_world_reports_every_phase() {
    let sandbox = TestSandbox::new();
    let sink = RecordingSink::new();
    let report = orchestrator(&sandbox)
        .compile_and_run("Console.WriteLine(1+1);", RunOptions::default(), &sink)
        .unwrap();

    assert_eq!(
        sink.statuses(),
        vec![
            "Creating Sandbox Environment..",
            "Compiling Code..",
            "Compilation Succeeded",
            "Executing Code..",
        ]
    );
    assert_eq!(sink.results().len(), 1);
    assert!(sink.results()[0].success);
    assert!(report.compilation.success);
    let execution = report.execution.unwrap();
    assert_eq!(execution.outcome, ExecutionOutcome::Completed);
    assert_eq!(execution.stdout, "2\n");
}

#[test]
fn test_compile_failure_stops_before_execution() {
    let sandbox = TestSandbox::new();
    let sink = RecordingSink::new();
    let report = orchestrator(&sandbox)
        .compile_and_run("int x = ;", RunOptions::default(), &sink)
        .unwrap();

    let statuses = sink.statuses();
    assert_eq!(
        statuses.last().map(String::as_str),
        Some("Compilation Failed with 1 errors.")
    );
    assert!(!statuses.iter().any(|s| s == "Executing Code.."));
    assert!(report.execution.is_none());
    assert_eq!(report.compilation.errors.len(), 1);
    assert_eq!(report.compilation.errors[0].id, "CRU1525");
    assert_eq!(report.compilation.errors[0].line, 1);
    assert_eq!(sink.results(), vec![report.compilation]);
}

#[test]
fn test_error_lines_are_relative_to_the_snippet() {
    let sandbox = TestSandbox::new();
    let report = orchestrator(&sandbox)
        .compile_and_run(
            "int a = 1;\nint b = missing;\nConsole.WriteLine(a + b);",
            RunOptions::default(),
            &RecordingSink::new(),
        )
        .unwrap();
    assert!(!report.compilation.success);
    assert_eq!(report.compilation.errors[0].id, "CRU0103");
    assert_eq!(report.compilation.errors[0].line, 2);
    assert_eq!(report.compilation.errors[0].column, Some(9));
}

#[test]
fn test_unclosed_block_points_at_the_snippet() {
    let sandbox = TestSandbox::new();
    let report = orchestrator(&sandbox)
        .compile_and_run("if (true) {", RunOptions::default(), &RecordingSink::new())
        .unwrap();
    assert!(report.execution.is_none());
    assert_eq!(report.compilation.errors[0].id, "CRU1513");
    assert_eq!(report.compilation.errors[0].line, 1);
    assert_eq!(report.compilation.errors[0].column, None);
    assert!(report.compilation.errors.iter().all(|e| e.line <= 1));
}

#[test]
fn test_deeply_nested_snippet_fails_to_compile() {
    let sandbox = TestSandbox::new();
    let snippet = format!("Console.WriteLine({}1{});", "(".repeat(5000), ")".repeat(5000));
    let report = orchestrator(&sandbox)
        .compile_and_run(&snippet, RunOptions::default(), &RecordingSink::new())
        .unwrap();
    assert!(report.execution.is_none());
    let ids: Vec<_> = report.compilation.errors.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["CRU8078"]);
    assert_eq!(report.compilation.errors[0].line, 1);
}

#[test]
fn test_empty_snippet_is_a_no_op() {
    let sandbox = TestSandbox::new();
    let report = orchestrator(&sandbox)
        .compile_and_run("", RunOptions::default(), &RecordingSink::new())
        .unwrap();
    assert!(report.compilation.success);
    let execution = report.execution.unwrap();
    assert_eq!(execution.outcome, ExecutionOutcome::Completed);
    assert!(execution.stdout.is_empty());
}

#[test]
fn test_harness_imports_collections_and_sequences() {
    let sandbox = TestSandbox::new();
    let report = orchestrator(&sandbox)
        .compile_and_run(
            "int[] xs = new int[] { 1, 2, 3 };\nTable.Set(\"sum\", \"\" + xs.Sum());\nConsole.WriteLine(Table.Get(\"sum\"));",
            RunOptions::default(),
            &RecordingSink::new(),
        )
        .unwrap();
    assert_eq!(report.execution.unwrap().stdout, "6\n");
}

#[test]
fn test_guest_fault_is_data() {
    let sandbox = TestSandbox::new();
    let report = orchestrator(&sandbox)
        .compile_and_run(
            "int z = 0;\nConsole.WriteLine(1 / z);",
            RunOptions::default(),
            &RecordingSink::new(),
        )
        .unwrap();
    assert!(matches!(
        report.execution.unwrap().outcome,
        ExecutionOutcome::Faulted { .. }
    ));
}

#[test]
fn test_infinite_loop_times_out() {
    let sandbox = TestSandbox::new();
    let report = orchestrator(&sandbox)
        .compile_and_run(
            "while (true) { }",
            RunOptions::with_timeout_ms(200),
            &RecordingSink::new(),
        )
        .unwrap();
    assert_eq!(
        report.execution.unwrap().outcome,
        ExecutionOutcome::TimedOut { budget_ms: 200 }
    );
}

#[test]
fn test_sandbox_file_access_uses_qualified_names() {
    let sandbox = TestSandbox::new();
    let report = orchestrator(&sandbox)
        .compile_and_run(
            "Sandbox.IO.File.WriteAllText(\"note.txt\", \"kept\");\nConsole.WriteLine(Sandbox.IO.File.ReadAllText(\"note.txt\"));",
            RunOptions::default(),
            &RecordingSink::new(),
        )
        .unwrap();
    let execution = report.execution.unwrap();
    assert_eq!(execution.outcome, ExecutionOutcome::Completed);
    assert_eq!(execution.stdout, "kept\n");
    assert_eq!(sandbox.read_work_file("note.txt").as_deref(), Some("kept"));
}

#[test]
fn test_vanished_grant_is_a_host_fault() {
    let sandbox = TestSandbox::new();
    let orchestrator = orchestrator(&sandbox);
    std::fs::remove_dir_all(sandbox.work_dir()).unwrap();

    let sink = RecordingSink::new();
    let err = orchestrator
        .compile_and_run("Console.WriteLine(1);", RunOptions::default(), &sink)
        .unwrap_err();
    assert!(matches!(err, ServiceError::Sandbox(_)));
    assert_eq!(sink.statuses(), vec!["Creating Sandbox Environment.."]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_spawned_run_matches_blocking_run() {
    let sandbox = TestSandbox::new();
    let orchestrator = Arc::new(orchestrator(&sandbox));
    let sink = RecordingSink::new();

    let report = Arc::clone(&orchestrator)
        .spawn_compile_and_run(
            "Console.WriteLine(\"async\");".to_owned(),
            RunOptions::default(),
            Arc::new(sink.clone()) as Arc<dyn StatusSink>,
            CancellationToken::new(),
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(report.execution.unwrap().stdout, "async\n");
    assert_eq!(sink.statuses().len(), 4);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cancellation_interrupts_the_guest() {
    let sandbox = TestSandbox::new();
    let orchestrator = Arc::new(orchestrator(&sandbox));
    let cancel = CancellationToken::new();

    let handle = Arc::clone(&orchestrator).spawn_compile_and_run(
        "while (true) { }".to_owned(),
        RunOptions::with_timeout_ms(30_000),
        Arc::new(RecordingSink::new()),
        cancel.clone(),
    );
    tokio::time::sleep(std::time::Duration::from_millis(300)).await;
    cancel.cancel();

    let report = handle.await.unwrap().unwrap();
    assert_eq!(
        report.execution.unwrap().outcome,
        ExecutionOutcome::Faulted {
            reason: "cancelled".to_owned()
        }
    );
}

#[test]
fn test_concurrent_requests_are_isolated() {
    let sandbox = TestSandbox::new();
    let orchestrator = Arc::new(orchestrator(&sandbox));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let orchestrator = Arc::clone(&orchestrator);
            std::thread::spawn(move || {
                orchestrator
                    .compile_and_run(
                        &format!("Table.Set(\"k\", \"{i}\");\nConsole.WriteLine(Table.Count() + \":\" + Table.Get(\"k\"));"),
                        RunOptions::default(),
                        &RecordingSink::new(),
                    )
                    .unwrap()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let report = handle.join().unwrap();
        assert_eq!(report.execution.unwrap().stdout, format!("1:{i}\n"));
    }
}
