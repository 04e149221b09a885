//! Compiled module images.

use std::collections::BTreeSet;

use crate::semantic::ir::Program;

/// What to do with the emitted module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmitTarget {
    /// Run code generation for its diagnostics, drop the bytes.
    Discard,
    /// Keep the module as a named in-memory image.
    Image(String),
}

/// An exported entry point of a compiled module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    /// Namespace of the declaring class, empty for the global namespace.
    pub namespace: String,
    /// Declaring class.
    pub type_name: String,
    /// Method name.
    pub method: String,
}

impl EntryPoint {
    /// Build an entry point.
    #[must_use]
    pub fn new(
        namespace: impl Into<String>,
        type_name: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            type_name: type_name.into(),
            method: method.into(),
        }
    }

    /// Name of the Wasm export invoking this entry point.
    #[must_use]
    pub fn export_name(&self) -> String {
        if self.namespace.is_empty() {
            format!("{}.{}", self.type_name, self.method)
        } else {
            format!("{}.{}.{}", self.namespace, self.type_name, self.method)
        }
    }
}

/// A compiled guest module held in memory.
#[derive(Debug, Clone)]
pub struct ModuleImage {
    /// Image name given at emit time.
    pub name: String,
    /// Wasm bytes.
    pub bytes: Vec<u8>,
    /// Exported entry point names (`Namespace.Class.Method`).
    pub exports: Vec<String>,
    /// Bin-directory modules the image imports from.
    pub required_modules: BTreeSet<String>,
    /// Hex-encoded BLAKE3 digest of `bytes`.
    pub digest: String,
}

impl ModuleImage {
    pub(crate) fn new(name: String, bytes: Vec<u8>, program: &Program) -> Self {
        let digest = blake3::hash(&bytes).to_hex().to_string();
        Self {
            name,
            exports: program
                .entry_points
                .iter()
                .map(|e| e.export.clone())
                .collect(),
            required_modules: program
                .module_imports
                .iter()
                .map(|i| i.module.clone())
                .collect(),
            digest,
            bytes,
        }
    }

    /// Whether `entry` is exported by this image.
    #[must_use]
    pub fn exports_entry(&self, entry: &EntryPoint) -> bool {
        let name = entry.export_name();
        self.exports.iter().any(|e| *e == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_name() {
        assert_eq!(
            EntryPoint::new("Sandbox", "Runner", "Run").export_name(),
            "Sandbox.Runner.Run"
        );
        assert_eq!(EntryPoint::new("", "C", "Main").export_name(), "C.Main");
    }

    #[test]
    fn test_digest_is_stable() {
        let program = Program::default();
        let a = ModuleImage::new("a".to_owned(), vec![0, 1, 2], &program);
        let b = ModuleImage::new("b".to_owned(), vec![0, 1, 2], &program);
        assert_eq!(a.digest, b.digest);
        assert_eq!(a.digest.len(), 64);
    }
}
