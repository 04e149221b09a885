//! Reference libraries, compiled images and bin modules for tests.

use std::path::{Path, PathBuf};
use std::sync::Once;

use crucible_compiler::library::parse_descriptor;
use crucible_compiler::{EmitTarget, Library, ModuleImage, ReferenceManifest, ReferenceSet, compile};
use wasm_encoder::{
    CodeSection, ExportKind, ExportSection, Function, FunctionSection, Instruction, Module,
    TypeSection, ValType,
};

/// Name of the bin module built by [`calc_module_bytes`].
pub const CALC_MODULE: &str = "calc";

/// Descriptor binding `Ext.Calc` methods to the [`CALC_MODULE`] exports.
const CALC_DESCRIPTOR: &str = r#"
namespace = "Ext"

[[types]]
name = "Calc"

[[types.methods]]
name = "Add"
params = ["int", "int"]
returns = "int"
module = "calc"
export = "add"

[[types.methods]]
name = "Mul"
params = ["int", "int"]
returns = "int"
module = "calc"
export = "mul"
"#;

/// The repository's `runtime/` directory.
#[must_use]
pub fn runtime_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../runtime")
}

/// The core library (`runtime/lib`) only.
#[must_use]
pub fn core_references() -> ReferenceSet {
    ReferenceManifest::from_directory(&runtime_dir().join("lib"))
        .expect("core library manifest")
        .resolve()
        .expect("core library descriptors")
}

/// The core library plus the sandbox support library.
#[must_use]
pub fn references() -> ReferenceSet {
    let sandbox = ReferenceManifest::from_directory(&runtime_dir().join("sandbox"))
        .expect("sandbox library manifest")
        .resolve()
        .expect("sandbox library descriptors");
    core_references().union(&sandbox)
}

/// Library whose `Ext.Calc.Add` / `Ext.Calc.Mul` live in [`CALC_MODULE`].
#[must_use]
pub fn calc_library() -> Library {
    let path = Path::new("Ext.toml");
    let descriptor = parse_descriptor(path, CALC_DESCRIPTOR).expect("calc descriptor");
    Library::from_descriptor(descriptor, path).expect("calc library")
}

/// Compile `source` against [`references`], panicking on any error.
#[must_use]
pub fn compile_image(source: &str, refs: &ReferenceSet) -> ModuleImage {
    let output = compile(source, refs, &EmitTarget::Image("TestImage".to_owned()))
        .expect("compiler failure");
    let errors: Vec<String> = output.errors().map(ToString::to_string).collect();
    assert!(errors.is_empty(), "unexpected diagnostics: {errors:#?}");
    output.image.expect("image must be emitted")
}

/// A bin module exporting `add(i32, i32) -> i32` and `mul(i32, i32) -> i32`.
#[must_use]
pub fn calc_module_bytes() -> Vec<u8> {
    let mut types = TypeSection::new();
    types
        .ty()
        .function([ValType::I32, ValType::I32], [ValType::I32]);

    let mut functions = FunctionSection::new();
    functions.function(0);
    functions.function(0);

    let mut exports = ExportSection::new();
    exports.export("add", ExportKind::Func, 0);
    exports.export("mul", ExportKind::Func, 1);

    let mut code = CodeSection::new();
    for op in [Instruction::I32Add, Instruction::I32Mul] {
        let mut f = Function::new([]);
        f.instruction(&Instruction::LocalGet(0));
        f.instruction(&Instruction::LocalGet(1));
        f.instruction(&op);
        f.instruction(&Instruction::End);
        code.function(&f);
    }

    let mut module = Module::new();
    module
        .section(&types)
        .section(&functions)
        .section(&exports)
        .section(&code);
    module.finish()
}

/// Install a test subscriber once; honours `RUST_LOG`.
pub fn init_test_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_references_include_sandbox_namespace() {
        let refs = references();
        assert!(refs.has_namespace("Core"));
        assert!(refs.has_namespace("Sandbox.IO"));
        assert!(!core_references().has_namespace("Sandbox.IO"));
    }

    #[test]
    fn test_calc_module_starts_with_wasm_magic() {
        assert_eq!(&calc_module_bytes()[..4], b"\0asm");
    }

    #[test]
    fn test_calc_library_is_module_bound() {
        let refs = ReferenceSet::new(vec![calc_library()]);
        assert!(refs.modules().contains(CALC_MODULE));
    }
}
