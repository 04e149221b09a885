//! Compile-and-run orchestration.
//!
//! One request walks `Provisioning → Compiling → CompileFailed` or
//! `Provisioning → Compiling → CompileSucceeded → Executing`, announcing
//! each phase to the caller's [`StatusSink`]. A fresh [`IsolatedRuntime`]
//! is created per request and dropped on every exit path.

use std::sync::Arc;
use std::time::Duration;

use crucible_compiler::{CompilerError, EmitTarget, ReferenceManifest, ReferenceSet, compile};
use crucible_core::{Phase, RunReport, StatusSink};
use crucible_sandbox::{IsolatedRuntime, SandboxHost};
use crucible_telemetry::{InvocationContext, InvocationKind};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::ServiceResult;
use crate::harness::HarnessSynthesizer;
use crate::mapper::to_result;

/// Name given to the image compiled from a caller's snippet.
pub const IMAGE_NAME: &str = "UserCodeAssembly";

/// Per-request execution options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Execution budget; the host's default when `None`.
    pub timeout: Option<Duration>,
}

impl RunOptions {
    /// Options with a budget in milliseconds.
    #[must_use]
    pub fn with_timeout_ms(ms: u64) -> Self {
        Self {
            timeout: Some(Duration::from_millis(ms)),
        }
    }
}

/// Compiles statement snippets and runs them in isolated runtimes.
#[derive(Debug)]
pub struct Orchestrator {
    host: Arc<SandboxHost>,
    references: Arc<ReferenceSet>,
    synthesizer: HarnessSynthesizer,
}

impl Orchestrator {
    /// Create an orchestrator compiling against `core ∪ sandbox`.
    #[must_use]
    pub fn new(host: Arc<SandboxHost>, core: &ReferenceSet, sandbox: &ReferenceSet) -> Self {
        Self {
            host,
            references: Arc::new(core.union(sandbox)),
            synthesizer: HarnessSynthesizer,
        }
    }

    /// Resolve both manifests and create an orchestrator.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ServiceError::References`] if a descriptor cannot be loaded
    /// or is invalid.
    pub fn from_manifests(
        host: Arc<SandboxHost>,
        core: &ReferenceManifest,
        sandbox: &ReferenceManifest,
    ) -> ServiceResult<Self> {
        Ok(Self::new(host, &core.resolve()?, &sandbox.resolve()?))
    }

    /// The shared sandbox host.
    #[must_use]
    pub fn host(&self) -> &Arc<SandboxHost> {
        &self.host
    }

    /// Compile `code` inside the harness and, if it compiles, run it.
    ///
    /// Blocks the calling thread until the guest finishes or its budget
    /// elapses.
    ///
    /// # Errors
    ///
    /// Returns an error for host-side faults only: the runtime cannot be
    /// created, an imported module is missing, or the toolchain fails.
    /// Compile errors and guest faults are part of the returned report.
    pub fn compile_and_run(
        &self,
        code: &str,
        options: RunOptions,
        sink: &dyn StatusSink,
    ) -> ServiceResult<RunReport> {
        self.run(code, options, sink, None)
    }

    /// Run [`Orchestrator::compile_and_run`] on tokio's blocking pool.
    ///
    /// Cancelling `cancel` interrupts a running guest; its outcome becomes
    /// `Faulted { reason: "cancelled" }`.
    #[must_use]
    pub fn spawn_compile_and_run(
        self: Arc<Self>,
        code: String,
        options: RunOptions,
        sink: Arc<dyn StatusSink>,
        cancel: CancellationToken,
    ) -> JoinHandle<ServiceResult<RunReport>> {
        tokio::task::spawn_blocking(move || self.run(&code, options, sink.as_ref(), Some(&cancel)))
    }

    fn run(
        &self,
        code: &str,
        options: RunOptions,
        sink: &dyn StatusSink,
        cancel: Option<&CancellationToken>,
    ) -> ServiceResult<RunReport> {
        let _guard = InvocationContext::new(InvocationKind::CompileAndRun, "service")
            .with_metadata("code_bytes", code.len().to_string())
            .enter();

        sink.on_phase(Phase::Provisioning);
        let mut runtime = IsolatedRuntime::create(&self.host)?;
        debug!(runtime = %runtime.id(), "Isolated runtime ready");

        sink.on_phase(Phase::Compiling);
        let harness = self.synthesizer.wrap(code);
        let output = compile(
            &harness.source,
            &self.references,
            &EmitTarget::Image(IMAGE_NAME.to_owned()),
        )?;
        let compilation = to_result(&output.diagnostics, harness.line_offset());

        if !compilation.success {
            let errors = compilation.error_count();
            sink.on_phase(Phase::CompileFailed { errors });
            sink.on_result(&compilation);
            info!(errors, "Compilation failed; nothing to run");
            return Ok(RunReport::not_run(compilation));
        }
        let image = output.image.ok_or_else(|| {
            CompilerError::Codegen("successful compilation produced no image".to_owned())
        })?;

        sink.on_phase(Phase::CompileSucceeded);
        sink.on_result(&compilation);

        sink.on_phase(Phase::Executing);
        runtime.load(&image)?;
        let execution = runtime.invoke(&self.synthesizer.entry_point(), options.timeout, cancel)?;
        info!(
            outcome = ?execution.outcome,
            elapsed_ms = execution.elapsed_ms,
            stdout_bytes = execution.stdout.len(),
            "Compile-and-run request finished"
        );

        Ok(RunReport {
            compilation,
            execution: Some(execution),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_options() {
        assert_eq!(RunOptions::default().timeout, None);
        assert_eq!(
            RunOptions::with_timeout_ms(250).timeout,
            Some(Duration::from_millis(250))
        );
    }
}
