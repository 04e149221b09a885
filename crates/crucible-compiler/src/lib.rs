//! Crucible Compiler - Guest-language toolchain.
//!
//! This crate provides:
//! - Lexing and parsing of guest source ([`syntax`])
//! - Reference libraries resolved from TOML descriptors ([`ReferenceManifest`], [`ReferenceSet`])
//! - Binding and type checking with stable diagnostic ids ([`Diagnostic`])
//! - Lowering to a core WebAssembly module ([`ModuleImage`])
//!
//! The toolchain keeps no state between calls: [`compile`] borrows a
//! read-only [`ReferenceSet`] and may run on any number of threads at once.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

mod codegen;
pub mod diagnostics;
pub mod error;
pub mod image;
pub mod library;
pub mod semantic;
pub mod syntax;
pub mod types;

use std::time::Instant;

use tracing::debug;

pub use diagnostics::{Code, Diagnostic, Location};
pub use error::{CompilerError, CompilerResult, ReferenceError, ReferenceResult};
pub use image::{EmitTarget, EntryPoint, ModuleImage};
pub use library::{Library, ReferenceManifest, ReferenceSet};
pub use types::Ty;

use diagnostics::DiagnosticBag;
use syntax::LineIndex;

/// Result of one compilation.
#[derive(Debug, Clone)]
pub struct CompileOutput {
    /// Every diagnostic, ordered by position. Locations are 0-based.
    pub diagnostics: Vec<Diagnostic>,
    /// The emitted module, present when the target was
    /// [`EmitTarget::Image`] and no error was reported.
    pub image: Option<ModuleImage>,
}

impl CompileOutput {
    /// Whether any diagnostic has error severity.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    /// Error-severity diagnostics.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }
}

/// Compile one translation unit.
///
/// Malformed source is reported through [`CompileOutput::diagnostics`].
/// Semantic analysis is skipped when the source has syntax errors, and code
/// generation only runs for programs without errors.
///
/// # Errors
///
/// Returns [`CompilerError::SourceTooLarge`] when `source` exceeds what
/// spans can address and [`CompilerError::Codegen`] when code generation
/// fails on a checked program.
pub fn compile(
    source: &str,
    references: &ReferenceSet,
    target: &EmitTarget,
) -> CompilerResult<CompileOutput> {
    if u32::try_from(source.len()).is_err() {
        return Err(CompilerError::SourceTooLarge(source.len()));
    }
    let started = Instant::now();
    let mut diags = DiagnosticBag::new();

    let tokens = syntax::lex(source, &mut diags);
    let unit = syntax::parse(tokens, &mut diags);
    let syntax_ok = !diags.has_errors();
    let program = syntax_ok.then(|| semantic::check(&unit, references, &mut diags));

    let image = match program {
        Some(program) if !diags.has_errors() => {
            let bytes = codegen::emit(&program)?;
            match target {
                EmitTarget::Discard => None,
                EmitTarget::Image(name) => Some(ModuleImage::new(name.clone(), bytes, &program)),
            }
        },
        _ => None,
    };

    let diagnostics = diags.into_diagnostics(&LineIndex::new(source));
    debug!(
        diagnostics = diagnostics.len(),
        syntax_ok,
        emitted = image.is_some(),
        elapsed_us = started.elapsed().as_micros(),
        "Compiled unit"
    );
    Ok(CompileOutput { diagnostics, image })
}
