//! Compile-only service.

use std::sync::Arc;

use crucible_compiler::{EmitTarget, ReferenceManifest, ReferenceSet, compile};
use crucible_core::CompilationResult;
use crucible_telemetry::{InvocationContext, InvocationKind};
use tracing::{debug, info};

use crate::error::ServiceResult;
use crate::mapper::{LineOffset, to_result};

/// Namespaces imported by every compile-only request unless configured
/// otherwise.
pub const DEFAULT_IMPORTS: [&str; 6] = [
    "Core",
    "Core.Collections",
    "Core.Sequences",
    "Core.Text",
    "Core.Concurrency",
    "Core.Serialization",
];

/// Compiles complete units against a fixed reference set and reports
/// diagnostics. Nothing is emitted or run.
#[derive(Debug, Clone)]
pub struct CompileOnlyService {
    default_imports: Arc<[String]>,
    references: Arc<ReferenceSet>,
}

impl CompileOnlyService {
    /// Create a service with explicit default imports.
    #[must_use]
    pub fn new(default_imports: impl Into<Arc<[String]>>, references: Arc<ReferenceSet>) -> Self {
        Self {
            default_imports: default_imports.into(),
            references,
        }
    }

    /// Create a service with [`DEFAULT_IMPORTS`].
    #[must_use]
    pub fn with_default_imports(references: Arc<ReferenceSet>) -> Self {
        let imports: Vec<String> = DEFAULT_IMPORTS.iter().map(|s| (*s).to_owned()).collect();
        Self::new(imports, references)
    }

    /// Resolve `manifest` and create a service over it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ServiceError::References`] if a descriptor cannot be
    /// loaded or is invalid.
    pub fn from_manifest(
        default_imports: impl Into<Arc<[String]>>,
        manifest: &ReferenceManifest,
    ) -> ServiceResult<Self> {
        let references = manifest.resolve()?;
        Ok(Self::new(default_imports, Arc::new(references)))
    }

    /// The default import list.
    #[must_use]
    pub fn default_imports(&self) -> &[String] {
        &self.default_imports
    }

    /// The translation unit compiled for `code`: one `using` line per
    /// import (defaults, then `extra_imports` verbatim), a blank line, then
    /// the code.
    #[must_use]
    pub fn translation_unit(&self, code: &str, extra_imports: Option<&[String]>) -> String {
        let mut unit = String::new();
        let extras = extra_imports.unwrap_or_default();
        for import in self.default_imports.iter().chain(extras) {
            unit.push_str("using ");
            unit.push_str(import);
            unit.push_str(";\n");
        }
        unit.push('\n');
        unit.push_str(code);
        unit
    }

    /// Compile `code` and report whether it is valid.
    ///
    /// Invalid code yields a failed [`CompilationResult`] with 1-based
    /// positions relative to the translation unit (import lines included).
    ///
    /// # Errors
    ///
    /// Returns [`crate::ServiceError::Compiler`] only for toolchain faults.
    pub fn compile_only(
        &self,
        code: &str,
        extra_imports: Option<&[String]>,
    ) -> ServiceResult<CompilationResult> {
        let _guard = InvocationContext::new(InvocationKind::CompileOnly, "service")
            .with_metadata("code_bytes", code.len().to_string())
            .enter();

        let unit = self.translation_unit(code, extra_imports);
        debug!(
            imports = self
                .default_imports
                .len()
                .saturating_add(extra_imports.map_or(0, <[String]>::len)),
            "Compiling translation unit"
        );
        let output = compile(&unit, &self.references, &EmitTarget::Discard)?;
        let result = to_result(&output.diagnostics, LineOffset::NONE);
        info!(
            success = result.success,
            errors = result.error_count(),
            "Compile-only request finished"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> CompileOnlyService {
        CompileOnlyService::with_default_imports(Arc::new(ReferenceSet::new(Vec::new())))
    }

    #[test]
    fn test_translation_unit_layout() {
        let unit = service().translation_unit("class C {}", Some(&["Extra".to_owned()][..]));
        let lines: Vec<&str> = unit.lines().collect();
        assert_eq!(lines.len(), 9);
        assert_eq!(lines[0], "using Core;");
        assert_eq!(lines[5], "using Core.Serialization;");
        assert_eq!(lines[6], "using Extra;");
        assert_eq!(lines[7], "");
        assert_eq!(lines[8], "class C {}");
    }

    #[test]
    fn test_extras_are_kept_verbatim() {
        let extras = vec!["Core".to_owned(), "Core".to_owned()];
        let unit = service().translation_unit("", Some(extras.as_slice()));
        assert_eq!(unit.matches("using Core;\n").count(), 3);
    }

    #[test]
    fn test_default_imports() {
        let service = service();
        assert_eq!(service.default_imports().len(), DEFAULT_IMPORTS.len());
        assert_eq!(service.default_imports()[0], "Core");
    }
}
