//! End-to-end runs of the `crucible` binary.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

fn runtime_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../runtime")
}

/// A scratch home with a config pointing at the workspace runtime.
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("work");
        std::fs::create_dir(&work).unwrap();
        let runtime = runtime_dir();
        let config = format!(
            "[compiler]\nlibrary_dir = {lib:?}\n\n\
             [sandbox]\nwork_dir = {work:?}\nbin_dir = {bin:?}\nsupport_dir = {support:?}\n\n\
             [logging]\nlevel = \"warn\"\n",
            lib = runtime.join("lib").display().to_string(),
            work = work.display().to_string(),
            bin = runtime.join("bin").display().to_string(),
            support = runtime.join("sandbox").display().to_string(),
        );
        std::fs::write(dir.path().join("crucible.toml"), config).unwrap();
        Self { dir }
    }

    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn crucible(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_crucible"))
            .env("CRUCIBLE_HOME", self.dir.path().join("home"))
            .arg("--config")
            .arg(self.dir.path().join("crucible.toml"))
            .args(args)
            .output()
            .unwrap()
    }
}

fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_compile_reports_success() {
    let ws = Workspace::new();
    let file = ws.write("ok.cs", "public class C { static int M() { return 1; } }");
    let output = ws.crucible(&["compile", file.to_str().unwrap()]);

    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["success"], true);
    assert_eq!(json["errors"], serde_json::json!([]));
}

#[test]
fn test_compile_reports_errors_with_failure_status() {
    let ws = Workspace::new();
    let file = ws.write("bad.cs", "public class C { void M() { return 1; } }");
    let output = ws.crucible(&["compile", file.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    let json = stdout_json(&output);
    assert_eq!(json["success"], false);
    assert_eq!(json["errors"][0]["id"], "CRU0127");
    assert_eq!(json["errors"][0]["line"], 8);
}

#[test]
fn test_run_prints_report() {
    let ws = Workspace::new();
    let file = ws.write("snippet.txt", "Console.WriteLine(1+1);");
    let output = ws.crucible(&["run", file.to_str().unwrap()]);

    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["compilation"]["success"], true);
    assert_eq!(json["execution"]["outcome"]["status"], "completed");
    assert_eq!(json["execution"]["stdout"], "2\n");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Executing Code.."));
}

#[test]
fn test_run_honours_timeout() {
    let ws = Workspace::new();
    let file = ws.write("loop.txt", "while (true) { }");
    let output = ws.crucible(&["run", file.to_str().unwrap(), "--timeout-ms", "200"]);

    assert_eq!(output.status.code(), Some(1));
    let json = stdout_json(&output);
    assert_eq!(json["execution"]["outcome"]["status"], "timed_out");
    assert_eq!(json["execution"]["outcome"]["budget_ms"], 200);
}

#[test]
fn test_missing_file_is_a_host_error() {
    let ws = Workspace::new();
    let output = ws.crucible(&["compile", "/nonexistent/file.cs"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_config_shows_effective_values() {
    let ws = Workspace::new();
    let output = ws.crucible(&["config", "--format", "json"]);

    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["config"]["logging"]["level"], "warn");
    assert_eq!(json["config"]["sandbox"]["default_timeout_ms"], 10000);
}

#[test]
fn test_missing_config_file_names_the_flag() {
    let ws = Workspace::new();
    let output = Command::new(env!("CARGO_BIN_EXE_crucible"))
        .env("CRUCIBLE_HOME", ws.dir.path().join("home"))
        .arg("--config")
        .arg(ws.dir.path().join("absent.toml"))
        .arg("config")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--config file"), "{stderr}");
    assert!(stderr.contains("does not exist"), "{stderr}");
}
