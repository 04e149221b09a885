//! Wasm emission.
//!
//! A checked [`Program`] becomes one core Wasm module laid out as:
//!
//! - imports: the Extism kernel (`alloc`, `store_u8`), every host function
//!   of the ABI table, then bin-directory module functions;
//! - defined functions: runtime helpers, the static initializer, user
//!   functions, then one exported `() -> i32` wrapper per entry point;
//! - globals: heap pointer, initializer flag, one slot per static field,
//!   then one cached handle per string literal;
//! - one exported linear memory holding literal bytes and the array heap.
//!
//! Arrays live in linear memory as `[len: i32][pad: i32][elements]`. String
//! values are Extism memory handles; literals are copied into Extism memory
//! on first use and cached in their global.

mod function;
mod runtime;

use std::collections::HashMap;

use crucible_core::abi::{HOST_NAMESPACE, KERNEL_NAMESPACE};
use crucible_core::{HostFunction, WasmType};
use tracing::debug;
use wasm_encoder::{
    CodeSection, ConstExpr, DataSection, EntityType, ExportKind, ExportSection, Function,
    FunctionSection, GlobalSection, GlobalType, ImportSection, Instruction, MemorySection,
    MemoryType, Module, TypeSection, ValType,
};

use crate::error::{CompilerError, CompilerResult};
use crate::semantic::ir::Program;
use crate::types::Ty;
use function::FunctionEmitter;
pub(crate) use runtime::Helper;

/// Kernel import: `alloc(len: i64) -> i64`.
const KERNEL_ALLOC: u32 = 0;
/// Kernel import: `store_u8(offset: i64, byte: i32)`.
const KERNEL_STORE_U8: u32 = 1;
/// First host-function import.
const HOST_BASE: u32 = 2;

/// Bump-allocator top.
const GLOBAL_HEAP: u32 = 0;
/// Set once static initializers have run.
const GLOBAL_INITIALIZED: u32 = 1;
/// First static-field slot.
const GLOBAL_FIELDS: u32 = 2;

/// Literal bytes start here; lower addresses stay unused so `0` is null.
const DATA_BASE: u32 = 16;
/// Array header: length plus padding that keeps 8-byte elements aligned.
pub(crate) const ARRAY_HEADER: u32 = 8;
const PAGE_SIZE: u32 = 65_536;

/// Function and global index space of the module being emitted.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Layout {
    module_base: u32,
    helper_base: u32,
    init: u32,
    function_base: u32,
    literal_base: u32,
}

impl Layout {
    fn new(program: &Program) -> CompilerResult<Self> {
        let host_count = count(HostFunction::ALL.len())?;
        let module_base = HOST_BASE.saturating_add(host_count);
        let helper_base = module_base.saturating_add(count(program.module_imports.len())?);
        let init = helper_base.saturating_add(count(Helper::ALL.len())?);
        let function_base = init.saturating_add(1);
        let literal_base = GLOBAL_FIELDS.saturating_add(count(program.globals.len())?);
        Ok(Self {
            module_base,
            helper_base,
            init,
            function_base,
            literal_base,
        })
    }

    pub(crate) fn host(self, host: HostFunction) -> u32 {
        HOST_BASE.saturating_add(u32::try_from(host.index()).unwrap_or(u32::MAX))
    }

    pub(crate) fn module_import(self, index: u32) -> u32 {
        self.module_base.saturating_add(index)
    }

    pub(crate) fn helper(self, helper: Helper) -> u32 {
        self.helper_base.saturating_add(helper.index())
    }

    pub(crate) fn function(self, id: u32) -> u32 {
        self.function_base.saturating_add(id)
    }

    pub(crate) fn field(self, id: u32) -> u32 {
        GLOBAL_FIELDS.saturating_add(id)
    }
}

fn count(len: usize) -> CompilerResult<u32> {
    u32::try_from(len).map_err(|_| CompilerError::Codegen("index space overflow".to_owned()))
}

/// Wasm value type for a guest type that carries a value.
pub(crate) fn val_type(ty: &Ty) -> Option<ValType> {
    ty.wasm().map(wasm_val)
}

pub(crate) fn wasm_val(ty: WasmType) -> ValType {
    match ty {
        WasmType::I32 => ValType::I32,
        WasmType::I64 => ValType::I64,
        WasmType::F64 => ValType::F64,
    }
}

/// Interned function signatures.
#[derive(Default)]
struct TypeTable {
    section: TypeSection,
    indices: HashMap<(Vec<WasmType>, Vec<WasmType>), u32>,
}

impl TypeTable {
    fn intern(&mut self, params: &[WasmType], results: &[WasmType]) -> u32 {
        let key = (params.to_vec(), results.to_vec());
        if let Some(index) = self.indices.get(&key) {
            return *index;
        }
        let index = self.section.len();
        self.section.ty().function(
            params.iter().copied().map(wasm_val),
            results.iter().copied().map(wasm_val),
        );
        self.indices.insert(key, index);
        index
    }

    fn intern_tys(&mut self, params: &[Ty], returns: &Ty) -> u32 {
        let params: Vec<_> = params.iter().filter_map(Ty::wasm).collect();
        let results: Vec<_> = returns.wasm().into_iter().collect();
        self.intern(&params, &results)
    }
}

/// String literals placed in the data segment.
#[derive(Debug, Default)]
pub(crate) struct Literals {
    bytes: Vec<u8>,
    entries: HashMap<String, Literal>,
    order: Vec<String>,
    global_base: u32,
}

/// A placed literal.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Literal {
    pub(crate) offset: u32,
    pub(crate) len: u32,
    pub(crate) global: u32,
}

impl Literals {
    fn new(global_base: u32) -> Self {
        Self {
            global_base,
            ..Self::default()
        }
    }

    /// Place `text` (once) and return where it lives.
    pub(crate) fn intern(&mut self, text: &str) -> CompilerResult<Literal> {
        if let Some(lit) = self.entries.get(text) {
            return Ok(*lit);
        }
        let offset = DATA_BASE.saturating_add(count(self.bytes.len())?);
        let len = count(text.len())?;
        let global = self.global_base.saturating_add(count(self.order.len())?);
        self.bytes.extend_from_slice(text.as_bytes());
        let lit = Literal {
            offset,
            len,
            global,
        };
        self.entries.insert(text.to_owned(), lit);
        self.order.push(text.to_owned());
        Ok(lit)
    }

    /// First free address after the data segment, 8-byte aligned.
    fn heap_base(&self) -> CompilerResult<u32> {
        let end = DATA_BASE
            .checked_add(count(self.bytes.len())?)
            .and_then(|end| end.checked_add(7))
            .ok_or_else(|| CompilerError::Codegen("data segment too large".to_owned()))?;
        Ok(end & !7)
    }
}

/// Emit `program` as a Wasm module.
///
/// # Errors
///
/// Returns [`CompilerError::Codegen`] if the program contains constructs
/// that should have been rejected by the checker.
pub(crate) fn emit(program: &Program) -> CompilerResult<Vec<u8>> {
    let layout = Layout::new(program)?;
    let mut types = TypeTable::default();
    let mut literals = Literals::new(layout.literal_base);

    // Imports.
    let mut imports = ImportSection::new();
    let alloc = types.intern(&[WasmType::I64], &[WasmType::I64]);
    imports.import(KERNEL_NAMESPACE, "alloc", EntityType::Function(alloc));
    let store = types.intern(&[WasmType::I64, WasmType::I32], &[]);
    imports.import(KERNEL_NAMESPACE, "store_u8", EntityType::Function(store));
    for host in HostFunction::ALL {
        let ty = types.intern(host.params(), host.results());
        imports.import(HOST_NAMESPACE, host.name(), EntityType::Function(ty));
    }
    for import in &program.module_imports {
        let ty = types.intern_tys(&import.params, &import.returns);
        imports.import(&import.module, &import.export, EntityType::Function(ty));
    }

    // Defined functions, in index order.
    let mut functions = FunctionSection::new();
    let mut code = CodeSection::new();

    for helper in Helper::ALL {
        let (params, results) = helper.signature();
        functions.function(types.intern(params, results));
        code.function(&helper.body(layout));
    }

    functions.function(types.intern(&[], &[]));
    let init = FunctionEmitter::new(program, layout, &mut literals, &program.init)?.finish()?;
    code.function(&init);

    for func in &program.functions {
        let params = func
            .locals
            .get(..func.param_count as usize)
            .ok_or_else(|| CompilerError::Codegen(format!("{}: missing parameters", func.name)))?;
        functions.function(types.intern_tys(params, &func.returns));
        let body = FunctionEmitter::new(program, layout, &mut literals, func)?.finish()?;
        code.function(&body);
    }

    let entry_ty = types.intern(&[], &[WasmType::I32]);
    let mut exports = ExportSection::new();
    let entry_base = layout
        .function_base
        .saturating_add(count(program.functions.len())?);
    for (offset, entry) in program.entry_points.iter().enumerate() {
        functions.function(entry_ty);
        code.function(&entry_wrapper(layout, entry.function, entry.takes_args));
        exports.export(
            &entry.export,
            ExportKind::Func,
            entry_base.saturating_add(count(offset)?),
        );
    }
    exports.export("memory", ExportKind::Memory, 0);

    // Memory sized to hold the data segment; arrays grow it on demand.
    let heap_base = literals.heap_base()?;
    let mut memories = MemorySection::new();
    memories.memory(MemoryType {
        minimum: u64::from(heap_base / PAGE_SIZE).saturating_add(1),
        maximum: None,
        memory64: false,
        shared: false,
        page_size_log2: None,
    });

    let mut globals = GlobalSection::new();
    let heap_start = i32::try_from(heap_base)
        .map_err(|_| CompilerError::Codegen("heap base out of range".to_owned()))?;
    globals.global(mutable(ValType::I32), &ConstExpr::i32_const(heap_start));
    globals.global(mutable(ValType::I32), &ConstExpr::i32_const(0));
    for global in &program.globals {
        let vt = val_type(&global.ty)
            .ok_or_else(|| CompilerError::Codegen(format!("{}: field without a value type", global.name)))?;
        globals.global(mutable(vt), &zero_const(vt));
    }
    for _ in &literals.order {
        globals.global(mutable(ValType::I64), &ConstExpr::i64_const(0));
    }

    let mut data = DataSection::new();
    if !literals.bytes.is_empty() {
        let base = i32::try_from(DATA_BASE).unwrap_or_default();
        data.active(0, &ConstExpr::i32_const(base), literals.bytes.iter().copied());
    }

    let mut module = Module::new();
    module.section(&types.section);
    module.section(&imports);
    module.section(&functions);
    module.section(&memories);
    module.section(&globals);
    module.section(&exports);
    module.section(&code);
    module.section(&data);
    let bytes = module.finish();

    debug!(
        functions = program.functions.len(),
        entry_points = program.entry_points.len(),
        literals = literals.order.len(),
        size = bytes.len(),
        "Emitted module"
    );
    Ok(bytes)
}

fn mutable(val_type: ValType) -> GlobalType {
    GlobalType {
        val_type,
        mutable: true,
        shared: false,
    }
}

fn zero_const(vt: ValType) -> ConstExpr {
    match vt {
        ValType::I64 => ConstExpr::i64_const(0),
        ValType::F64 => ConstExpr::f64_const(0.0_f64.into()),
        _ => ConstExpr::i32_const(0),
    }
}

/// Exported `() -> i32` wrapper: run initializers once, call the target.
fn entry_wrapper(layout: Layout, target: u32, takes_args: bool) -> Function {
    let mut f = Function::new([]);
    f.instruction(&Instruction::Call(layout.helper(Helper::EnsureInitialized)));
    if takes_args {
        // `string[] args` is always null.
        f.instruction(&Instruction::I32Const(0));
    }
    f.instruction(&Instruction::Call(layout.function(target)));
    f.instruction(&Instruction::I32Const(0));
    f.instruction(&Instruction::End);
    f
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::ir::{EntryDef, Expr, ExprKind, Function as IrFunction, Stmt};

    fn validate(bytes: &[u8]) {
        wasmparser::Validator::new()
            .validate_all(bytes)
            .expect("emitted module must validate");
    }

    fn hello() -> Program {
        let write = Expr::new(
            ExprKind::Call(
                crate::semantic::ir::Callee::Host(HostFunction::ConsoleWriteLineStr),
                vec![Expr::new(ExprKind::Str("hi".to_owned()), Ty::String)],
            ),
            Ty::Void,
        );
        Program {
            functions: vec![IrFunction {
                name: "Demo.Program.Run".to_owned(),
                param_count: 0,
                returns: Ty::Void,
                locals: Vec::new(),
                body: vec![Stmt::Expr(write)],
            }],
            entry_points: vec![EntryDef {
                export: "Demo.Program.Run".to_owned(),
                function: 0,
                takes_args: false,
            }],
            ..Program::default()
        }
    }

    #[test]
    fn test_empty_program_validates() {
        let bytes = emit(&Program::default()).unwrap();
        validate(&bytes);
    }

    #[test]
    fn test_hello_program_validates_and_exports_entry() {
        let bytes = emit(&hello()).unwrap();
        validate(&bytes);

        let mut exports = Vec::new();
        for payload in wasmparser::Parser::new(0).parse_all(&bytes) {
            if let wasmparser::Payload::ExportSection(reader) = payload.unwrap() {
                for export in reader {
                    exports.push(export.unwrap().name.to_owned());
                }
            }
        }
        assert!(exports.contains(&"Demo.Program.Run".to_owned()));
        assert!(exports.contains(&"memory".to_owned()));
    }

    #[test]
    fn test_literals_are_interned_once() {
        let mut literals = Literals::new(5);
        let a = literals.intern("abc").unwrap();
        let b = literals.intern("abc").unwrap();
        let c = literals.intern("de").unwrap();
        assert_eq!(a.offset, b.offset);
        assert_eq!(a.global, 5);
        assert_eq!(c.offset, DATA_BASE + 3);
        assert_eq!(c.global, 6);
        assert_eq!(literals.heap_base().unwrap(), 24);
    }
}
