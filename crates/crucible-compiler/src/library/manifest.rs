//! Namespace → descriptor manifest.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::{Library, ReferenceSet, load_descriptor};
use crate::error::{ReferenceError, ReferenceResult};

/// Descriptor file extension.
const DESCRIPTOR_EXTENSION: &str = "toml";

/// Explicit mapping from namespace to descriptor path.
///
/// Built from configuration at startup and resolved once into a
/// [`ReferenceSet`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceManifest {
    entries: BTreeMap<String, PathBuf>,
}

impl ReferenceManifest {
    /// An empty manifest.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `namespace` to `path`, replacing any previous entry.
    #[must_use]
    pub fn with(mut self, namespace: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.insert(namespace, path);
        self
    }

    /// Map `namespace` to `path`, replacing any previous entry.
    pub fn insert(&mut self, namespace: impl Into<String>, path: impl Into<PathBuf>) {
        self.entries.insert(namespace.into(), path.into());
    }

    /// Manifest of every `<Namespace>.toml` file directly inside `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`ReferenceError::Read`] if the directory cannot be listed.
    pub fn from_directory(dir: &Path) -> ReferenceResult<Self> {
        let read_err = |source| ReferenceError::Read {
            path: dir.to_path_buf(),
            source,
        };

        let mut manifest = Self::new();
        for entry in std::fs::read_dir(dir).map_err(read_err)? {
            let path = entry.map_err(read_err)?.path();
            if !path.is_file()
                || path.extension().and_then(|e| e.to_str()) != Some(DESCRIPTOR_EXTENSION)
            {
                continue;
            }
            if let Some(namespace) = path.file_stem().and_then(|s| s.to_str()) {
                debug!(namespace, path = %path.display(), "Found library descriptor");
                manifest.insert(namespace, path.clone());
            }
        }
        Ok(manifest)
    }

    /// Entries ordered by namespace.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.entries.iter().map(|(ns, p)| (ns.as_str(), p.as_path()))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the manifest has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load and validate every descriptor.
    ///
    /// # Errors
    ///
    /// Returns the first [`ReferenceError`] encountered: a missing or
    /// unreadable file, a malformed descriptor, a namespace that does not
    /// match its manifest key, or an invalid binding.
    pub fn resolve(&self) -> ReferenceResult<ReferenceSet> {
        let mut libraries = Vec::with_capacity(self.entries.len());
        for (namespace, path) in &self.entries {
            if !path.exists() {
                return Err(ReferenceError::NotFound {
                    namespace: namespace.clone(),
                    path: path.clone(),
                });
            }
            let descriptor = load_descriptor(path)?;
            if descriptor.namespace != *namespace {
                return Err(ReferenceError::NamespaceMismatch {
                    path: path.clone(),
                    expected: namespace.clone(),
                    found: descriptor.namespace,
                });
            }
            let library = Library::from_descriptor(descriptor, path)?;
            debug!(
                namespace = %namespace,
                types = library.types.len(),
                "Resolved reference library"
            );
            libraries.push(library);
        }
        info!(count = libraries.len(), "Reference set resolved");
        Ok(ReferenceSet::new(libraries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_from_directory_picks_toml_files() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Core.toml", "namespace = \"Core\"\n");
        write(dir.path(), "Core.Text.toml", "namespace = \"Core.Text\"\n");
        write(dir.path(), "README.md", "ignored");

        let manifest = ReferenceManifest::from_directory(dir.path()).unwrap();
        let names: Vec<_> = manifest.entries().map(|(ns, _)| ns).collect();
        assert_eq!(names, vec!["Core", "Core.Text"]);

        let set = manifest.resolve().unwrap();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_missing_descriptor() {
        let manifest = ReferenceManifest::new().with("Core", "/nonexistent/Core.toml");
        assert!(matches!(
            manifest.resolve(),
            Err(ReferenceError::NotFound { namespace, .. }) if namespace == "Core"
        ));
    }

    #[test]
    fn test_namespace_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "Core.toml", "namespace = \"Other\"\n");
        let manifest = ReferenceManifest::new().with("Core", path);
        assert!(matches!(
            manifest.resolve(),
            Err(ReferenceError::NamespaceMismatch { .. })
        ));
    }

    #[test]
    fn test_missing_directory() {
        assert!(ReferenceManifest::from_directory(Path::new("/nonexistent/lib")).is_err());
    }
}
