//! Sandbox host provisioning.
//!
//! A [`SandboxHost`] is built once at startup and shared by every
//! invocation. It fixes what a guest may touch: the preopened directories,
//! where imported modules are loaded from, and the resource limits.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::{SandboxError, SandboxResult};

/// Default execution budget per invocation: 10 seconds.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default maximum linear memory: 1024 pages (64 MB).
pub const DEFAULT_MEMORY_MAX_PAGES: u32 = 1024;

/// Default console output cap: 1 MB.
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 1024 * 1024;

/// Largest file a guest may read or write through the host: 10 MB.
pub const DEFAULT_MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// A host directory made visible to guests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryGrant {
    /// Canonical host path.
    pub host_path: PathBuf,
    /// Path the guest uses for it (`.` for the working directory).
    pub guest_path: String,
    /// Whether guests may create, modify or delete files.
    pub writable: bool,
}

/// Resource limits applied to every invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum linear memory in 64 KiB pages.
    pub memory_max_pages: u32,
    /// Instruction fuel per invocation, unmetered when `None`.
    pub fuel_limit: Option<u64>,
    /// Budget used when the caller does not pass one.
    pub default_timeout: Duration,
    /// Console output kept per invocation; the rest is dropped.
    pub max_output_bytes: usize,
    /// Largest file guests may read or write.
    pub max_file_bytes: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            memory_max_pages: DEFAULT_MEMORY_MAX_PAGES,
            fuel_limit: None,
            default_timeout: DEFAULT_TIMEOUT,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }
}

/// Immutable isolated-runtime host configuration.
///
/// Guests get no network access: no allowed hosts are configured and no
/// HTTP host function exists.
#[derive(Debug)]
pub struct SandboxHost {
    grants: Arc<[DirectoryGrant]>,
    bin_dir: Option<PathBuf>,
    limits: Limits,
}

impl SandboxHost {
    /// Start configuring a host.
    #[must_use]
    pub fn builder() -> SandboxHostBuilder {
        SandboxHostBuilder::default()
    }

    /// Directory grants, in configuration order.
    #[must_use]
    pub fn grants(&self) -> &[DirectoryGrant] {
        &self.grants
    }

    pub(crate) fn shared_grants(&self) -> Arc<[DirectoryGrant]> {
        Arc::clone(&self.grants)
    }

    /// Directory searched for imported modules.
    #[must_use]
    pub fn bin_dir(&self) -> Option<&Path> {
        self.bin_dir.as_deref()
    }

    /// Resource limits.
    #[must_use]
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Check that every granted directory still exists.
    pub(crate) fn verify(&self) -> SandboxResult<()> {
        for grant in self.grants.iter() {
            if !grant.host_path.is_dir() {
                return Err(SandboxError::HostProvisioning {
                    path: grant.host_path.clone(),
                    message: "granted directory no longer exists".to_owned(),
                });
            }
        }
        Ok(())
    }
}

/// Builder for [`SandboxHost`].
#[derive(Debug, Default)]
pub struct SandboxHostBuilder {
    grants: Vec<(PathBuf, String, bool)>,
    bin_dir: Option<PathBuf>,
    limits: Limits,
}

impl SandboxHostBuilder {
    /// Preopen `host_path` for guests as `guest_path`.
    ///
    /// Without any grant the process working directory is preopened as `.`
    /// read/write.
    #[must_use]
    pub fn grant_dir(
        mut self,
        host_path: impl Into<PathBuf>,
        guest_path: impl Into<String>,
        writable: bool,
    ) -> Self {
        self.grants.push((host_path.into(), guest_path.into(), writable));
        self
    }

    /// Load imported modules from `dir`.
    #[must_use]
    pub fn bin_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.bin_dir = Some(dir.into());
        self
    }

    /// Replace all limits.
    #[must_use]
    pub fn limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Cap linear memory.
    #[must_use]
    pub fn memory_max_pages(mut self, pages: u32) -> Self {
        self.limits.memory_max_pages = pages;
        self
    }

    /// Meter instructions.
    #[must_use]
    pub fn fuel_limit(mut self, fuel: Option<u64>) -> Self {
        self.limits.fuel_limit = fuel;
        self
    }

    /// Budget used when callers pass none.
    #[must_use]
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.limits.default_timeout = timeout;
        self
    }

    /// Cap captured console output.
    #[must_use]
    pub fn max_output_bytes(mut self, bytes: usize) -> Self {
        self.limits.max_output_bytes = bytes;
        self
    }

    /// Canonicalise the grants and freeze the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError::HostProvisioning`] if a granted directory
    /// does not exist, is not a directory, or if the working directory is
    /// needed and cannot be determined.
    pub fn build(self) -> SandboxResult<SandboxHost> {
        let mut requested = self.grants;
        if requested.is_empty() {
            let cwd = std::env::current_dir().map_err(|e| SandboxError::HostProvisioning {
                path: PathBuf::from("."),
                message: format!("cannot determine working directory: {e}"),
            })?;
            requested.push((cwd, ".".to_owned(), true));
        }

        let mut grants = Vec::with_capacity(requested.len());
        for (host_path, guest_path, writable) in requested {
            let canonical =
                host_path
                    .canonicalize()
                    .map_err(|e| SandboxError::HostProvisioning {
                        path: host_path.clone(),
                        message: e.to_string(),
                    })?;
            if !canonical.is_dir() {
                return Err(SandboxError::HostProvisioning {
                    path: host_path,
                    message: "not a directory".to_owned(),
                });
            }
            grants.push(DirectoryGrant {
                host_path: canonical,
                guest_path,
                writable,
            });
        }

        let bin_dir = self.bin_dir.map(|dir| {
            dir.canonicalize().unwrap_or_else(|_| {
                warn!(path = %dir.display(), "Bin directory does not exist; module imports will fail");
                dir
            })
        });

        info!(
            grants = grants.len(),
            bin_dir = ?bin_dir,
            memory_max_pages = self.limits.memory_max_pages,
            fuel_limit = ?self.limits.fuel_limit,
            default_timeout_ms = self.limits.default_timeout.as_millis(),
            "Sandbox host provisioned"
        );

        Ok(SandboxHost {
            grants: grants.into(),
            bin_dir,
            limits: self.limits,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grants_are_canonicalised() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a");
        std::fs::create_dir(&nested).unwrap();

        let host = SandboxHost::builder()
            .grant_dir(nested.join("..").join("a"), ".", true)
            .build()
            .unwrap();
        assert_eq!(host.grants().len(), 1);
        assert_eq!(host.grants()[0].host_path, nested.canonicalize().unwrap());
        assert_eq!(host.grants()[0].guest_path, ".");
    }

    #[test]
    fn test_missing_grant_is_a_provisioning_fault() {
        let dir = tempfile::tempdir().unwrap();
        let err = SandboxHost::builder()
            .grant_dir(dir.path().join("missing"), ".", true)
            .build()
            .unwrap_err();
        assert!(matches!(err, SandboxError::HostProvisioning { .. }));
    }

    #[test]
    fn test_default_grant_is_working_directory() {
        let host = SandboxHost::builder().build().unwrap();
        assert_eq!(host.grants().len(), 1);
        assert_eq!(host.grants()[0].guest_path, ".");
        assert!(host.grants()[0].writable);
    }

    #[test]
    fn test_limit_setters() {
        let host = SandboxHost::builder()
            .memory_max_pages(16)
            .fuel_limit(Some(1_000))
            .default_timeout(Duration::from_millis(50))
            .max_output_bytes(8)
            .build()
            .unwrap();
        assert_eq!(host.limits().memory_max_pages, 16);
        assert_eq!(host.limits().fuel_limit, Some(1_000));
        assert_eq!(host.limits().default_timeout, Duration::from_millis(50));
        assert_eq!(host.limits().max_output_bytes, 8);
    }
}
