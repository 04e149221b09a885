//! A throwaway sandbox host for end-to-end tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crucible_compiler::{EntryPoint, ModuleImage, ReferenceSet};
use crucible_core::ExecutionReport;
use crucible_sandbox::{IsolatedRuntime, SandboxHost};
use tempfile::TempDir;

use crate::fixtures::{compile_image, init_test_logging, references};

/// A sandbox host over temporary directories.
///
/// Layout: `work/` is granted read/write as `.`, `data/` read-only as
/// `/data`, and `bin/` is the bin directory.
#[derive(Debug)]
pub struct TestSandbox {
    dir: TempDir,
    host: Arc<SandboxHost>,
}

impl Default for TestSandbox {
    fn default() -> Self {
        Self::new()
    }
}

impl TestSandbox {
    /// Provision a fresh host with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::with_setup(|builder| builder)
    }

    /// Provision a host, letting `setup` adjust the builder.
    #[must_use]
    pub fn with_setup(
        setup: impl FnOnce(crucible_sandbox::SandboxHostBuilder) -> crucible_sandbox::SandboxHostBuilder,
    ) -> Self {
        init_test_logging();
        let dir = tempfile::tempdir().expect("temp dir");
        for sub in ["work", "data", "bin"] {
            std::fs::create_dir(dir.path().join(sub)).expect("sandbox layout");
        }
        let builder = SandboxHost::builder()
            .grant_dir(dir.path().join("work"), ".", true)
            .grant_dir(dir.path().join("data"), "/data", false)
            .bin_dir(dir.path().join("bin"));
        let host = setup(builder).build().expect("sandbox host");
        Self {
            dir,
            host: Arc::new(host),
        }
    }

    /// The shared host.
    #[must_use]
    pub fn host(&self) -> &Arc<SandboxHost> {
        &self.host
    }

    /// The read/write working directory.
    #[must_use]
    pub fn work_dir(&self) -> PathBuf {
        self.dir.path().join("work")
    }

    /// The read-only data directory.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.dir.path().join("data")
    }

    /// The bin directory.
    #[must_use]
    pub fn bin_dir(&self) -> PathBuf {
        self.dir.path().join("bin")
    }

    /// Install `bytes` as `<bin>/<name>.wasm`.
    pub fn install_module(&self, name: &str, bytes: &[u8]) {
        std::fs::write(self.bin_dir().join(format!("{name}.wasm")), bytes)
            .expect("install bin module");
    }

    /// Create a runtime and load `image` into it.
    #[must_use]
    pub fn runtime(&self, image: &ModuleImage) -> IsolatedRuntime {
        let mut runtime = IsolatedRuntime::create(&self.host).expect("runtime");
        runtime.load(image).expect("load image");
        runtime
    }

    /// Compile `source` and run `entry` with `timeout`.
    #[must_use]
    pub fn run_with(
        &self,
        source: &str,
        refs: &ReferenceSet,
        entry: &EntryPoint,
        timeout: Option<Duration>,
    ) -> ExecutionReport {
        let image = compile_image(source, refs);
        self.runtime(&image)
            .invoke(entry, timeout, None)
            .expect("invoke")
    }

    /// Compile `source` and run its global `P.Main` entry point.
    #[must_use]
    pub fn run_main(&self, source: &str) -> ExecutionReport {
        self.run_with(source, &references(), &EntryPoint::new("", "P", "Main"), None)
    }

    /// Read a file below the working directory.
    #[must_use]
    pub fn read_work_file(&self, relative: impl AsRef<Path>) -> Option<String> {
        std::fs::read_to_string(self.work_dir().join(relative)).ok()
    }
}
