//! The isolated runtime: one loaded guest module and its invocations.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use crucible_compiler::{EntryPoint, ModuleImage};
use crucible_core::{ExecutionOutcome, ExecutionReport};
use extism::{Manifest, Plugin, PluginBuilder, UserData, Wasm};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{SandboxError, SandboxResult};
use crate::host::{register_host_functions, util};
use crate::modules::{LinkedModule, resolve_modules};
use crate::provision::SandboxHost;
use crate::state::HostState;
use crate::watchdog::{Trigger, Watchdog};

/// Extra time the manifest timeout grants over the watchdog budget. The
/// watchdog normally fires first; the manifest timeout only catches a
/// watchdog that could not be started.
const TIMEOUT_GRACE: Duration = Duration::from_millis(500);

/// Name of the guest module inside the Extism manifest.
const MAIN_MODULE: &str = "main";

struct Loaded {
    image: ModuleImage,
    modules: Vec<LinkedModule>,
}

/// An isolated execution environment for one compiled module.
///
/// Each runtime owns its host state; nothing leaks between runtimes, and
/// console output, the key/value table and any recorded fault are cleared
/// before every invocation.
pub struct IsolatedRuntime {
    id: Uuid,
    host: Arc<SandboxHost>,
    user_data: UserData<HostState>,
    loaded: Option<Loaded>,
}

impl std::fmt::Debug for IsolatedRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IsolatedRuntime")
            .field("id", &self.id)
            .field("loaded", &self.loaded.as_ref().map(|l| l.image.name.as_str()))
            .finish_non_exhaustive()
    }
}

impl IsolatedRuntime {
    /// Create an empty runtime on `host`.
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError::HostProvisioning`] if a granted directory
    /// disappeared since the host was built.
    pub fn create(host: &Arc<SandboxHost>) -> SandboxResult<Self> {
        host.verify()?;
        let limits = host.limits();
        let state = HostState::new(
            host.shared_grants(),
            limits.max_output_bytes,
            limits.max_file_bytes,
        );
        let id = Uuid::new_v4();
        debug!(runtime = %id, "Created isolated runtime");
        Ok(Self {
            id,
            host: Arc::clone(host),
            user_data: UserData::new(state),
            loaded: None,
        })
    }

    /// Unique id of this runtime, used in logs.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Whether a module has been loaded.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    /// Load `image`, resolving the bin-directory modules it imports.
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError::ModuleNotFound`] when an imported module is
    /// missing from the bin directory.
    pub fn load(&mut self, image: &ModuleImage) -> SandboxResult<()> {
        let modules = resolve_modules(self.host.bin_dir(), &image.required_modules)?;
        info!(
            runtime = %self.id,
            image = %image.name,
            digest = %image.digest,
            modules = modules.len(),
            "Loaded module into isolated runtime"
        );
        self.loaded = Some(Loaded {
            image: image.clone(),
            modules,
        });
        Ok(())
    }

    /// Run `entry` to completion, fault, timeout or cancellation.
    ///
    /// `timeout` defaults to the host's configured budget. Guest
    /// misbehaviour is reported in the returned outcome, never as `Err`.
    ///
    /// # Errors
    ///
    /// Returns an error when nothing is loaded, the entry point is not
    /// exported, or the plugin cannot be instantiated.
    pub fn invoke(
        &mut self,
        entry: &EntryPoint,
        timeout: Option<Duration>,
        cancel: Option<&CancellationToken>,
    ) -> SandboxResult<ExecutionReport> {
        let loaded = self.loaded.as_ref().ok_or(SandboxError::NotLoaded)?;
        let export = entry.export_name();
        if !loaded.image.exports_entry(entry) {
            return Err(SandboxError::EntryPointNotFound(export));
        }
        let budget = timeout.unwrap_or(self.host.limits().default_timeout);

        let interrupted = {
            let shared = util::shared(&self.user_data).map_err(state_error)?;
            let mut state = util::lock(&shared).map_err(state_error)?;
            state.reset();
            Arc::clone(&state.interrupted)
        };

        let mut plugin = self.build_plugin(loaded, budget)?;
        debug!(runtime = %self.id, entry = %export, budget_ms = budget.as_millis(), "Invoking guest entry point");

        let watchdog = Watchdog::spawn(
            budget,
            cancel.cloned(),
            plugin.cancel_handle(),
            Arc::clone(&interrupted),
        );
        let started = Instant::now();
        let result = plugin.call::<&[u8], Vec<u8>>(&export, &[]).map(|_| ());
        let elapsed = started.elapsed();
        let trigger = watchdog.finish();
        drop(plugin);

        let (stdout, stdout_truncated, fault) = {
            let shared = util::shared(&self.user_data).map_err(state_error)?;
            let mut state = util::lock(&shared).map_err(state_error)?;
            (
                std::mem::take(&mut state.stdout),
                state.truncated,
                state.fault,
            )
        };
        interrupted.store(false, Ordering::SeqCst);

        let outcome = match result {
            Ok(()) => ExecutionOutcome::Completed,
            Err(e) => {
                let budget_ms = u64::try_from(budget.as_millis()).unwrap_or(u64::MAX);
                match (trigger, fault) {
                    (Some(Trigger::Budget), _) => ExecutionOutcome::TimedOut { budget_ms },
                    (Some(Trigger::Cancelled), _) => ExecutionOutcome::Faulted {
                        reason: "cancelled".to_owned(),
                    },
                    (None, Some(code)) => ExecutionOutcome::Faulted {
                        reason: code.message().to_owned(),
                    },
                    (None, None) => {
                        let reason = e.root_cause().to_string();
                        if reason.contains("timeout") {
                            ExecutionOutcome::TimedOut { budget_ms }
                        } else {
                            ExecutionOutcome::Faulted { reason }
                        }
                    },
                }
            },
        };

        let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        match &outcome {
            ExecutionOutcome::Completed => {
                debug!(runtime = %self.id, elapsed_ms, "Guest completed");
            },
            ExecutionOutcome::Faulted { reason } => {
                info!(runtime = %self.id, elapsed_ms, reason = %reason, "Guest faulted");
            },
            ExecutionOutcome::TimedOut { budget_ms } => {
                warn!(runtime = %self.id, budget_ms, "Guest exceeded its execution budget");
            },
        }

        Ok(ExecutionReport {
            outcome,
            stdout,
            stdout_truncated,
            elapsed_ms,
        })
    }

    fn build_plugin(&self, loaded: &Loaded, budget: Duration) -> SandboxResult<Plugin> {
        let limits = self.host.limits();
        let wasms: Vec<Wasm> = loaded
            .modules
            .iter()
            .map(|m| Wasm::data(m.bytes.clone()).with_name(m.name.clone()))
            .chain(std::iter::once(
                Wasm::data(loaded.image.bytes.clone()).with_name(MAIN_MODULE),
            ))
            .collect();

        let mut manifest = Manifest::new(wasms)
            .with_timeout(budget.saturating_add(TIMEOUT_GRACE))
            .with_memory_max(limits.memory_max_pages);
        for grant in self.host.grants() {
            let source = if grant.writable {
                grant.host_path.display().to_string()
            } else {
                format!("ro:{}", grant.host_path.display())
            };
            manifest = manifest.with_allowed_path(source, &grant.guest_path);
        }

        let mut builder = PluginBuilder::new(manifest).with_wasi(true);
        builder = register_host_functions(builder, &self.user_data);
        if let Some(fuel) = limits.fuel_limit {
            builder = builder.with_fuel_limit(fuel);
        }
        builder
            .build()
            .map_err(|e| SandboxError::PluginBuild(e.to_string()))
    }
}

fn state_error(e: extism::Error) -> SandboxError {
    SandboxError::State(e.to_string())
}

impl Drop for IsolatedRuntime {
    fn drop(&mut self) {
        debug!(runtime = %self.id, "Released isolated runtime");
    }
}
