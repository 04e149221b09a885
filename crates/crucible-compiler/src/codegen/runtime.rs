//! Runtime helpers emitted into every module.
//!
//! Generated code calls these instead of inlining allocation, bounds checks
//! and sequence loops at every use site.

use crucible_core::{FaultCode, HostFunction, WasmType};
use wasm_encoder::{BlockType, Function, Instruction, MemArg, ValType};

use super::{ARRAY_HEADER, GLOBAL_HEAP, GLOBAL_INITIALIZED, KERNEL_ALLOC, KERNEL_STORE_U8, Layout};

use Instruction as I;
use WasmType::{F64, I32, I64};

/// Helper functions, in definition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Helper {
    /// `(offset, len) -> handle`: copy literal bytes into Extism memory.
    StrLiteral,
    /// `(len, elem_size) -> ptr`: zeroed array from the bump heap.
    AllocArray,
    /// `(ptr, index, elem_size) -> addr`: checked element address.
    ElemAddr,
    /// `(ptr) -> len`: checked array length.
    ArrayLen,
    /// Run static initializers on first entry.
    EnsureInitialized,
    I32Abs,
    I32Min,
    I32Max,
    /// `double % double`.
    F64Rem,
    SeqSum,
    SeqMin,
    SeqMax,
    SeqAverage,
    SeqContains,
    SeqRange,
}

impl Helper {
    pub(crate) const ALL: [Self; 15] = [
        Self::StrLiteral,
        Self::AllocArray,
        Self::ElemAddr,
        Self::ArrayLen,
        Self::EnsureInitialized,
        Self::I32Abs,
        Self::I32Min,
        Self::I32Max,
        Self::F64Rem,
        Self::SeqSum,
        Self::SeqMin,
        Self::SeqMax,
        Self::SeqAverage,
        Self::SeqContains,
        Self::SeqRange,
    ];

    pub(crate) fn index(self) -> u32 {
        Self::ALL
            .iter()
            .position(|h| *h == self)
            .and_then(|i| u32::try_from(i).ok())
            .unwrap_or_default()
    }

    pub(crate) fn signature(self) -> (&'static [WasmType], &'static [WasmType]) {
        match self {
            Self::StrLiteral => (&[I32, I32], &[I64]),
            Self::AllocArray | Self::I32Min | Self::I32Max | Self::SeqContains | Self::SeqRange => {
                (&[I32, I32], &[I32])
            },
            Self::ElemAddr => (&[I32, I32, I32], &[I32]),
            Self::ArrayLen | Self::I32Abs | Self::SeqSum | Self::SeqMin | Self::SeqMax => {
                (&[I32], &[I32])
            },
            Self::EnsureInitialized => (&[], &[]),
            Self::F64Rem => (&[F64, F64], &[F64]),
            Self::SeqAverage => (&[I32], &[F64]),
        }
    }

    pub(crate) fn body(self, layout: Layout) -> Function {
        let (locals, code): (&[(u32, ValType)], Vec<Instruction<'static>>) = match self {
            Self::StrLiteral => (&[(1, ValType::I64), (1, ValType::I32)], str_literal()),
            Self::AllocArray => (&[(2, ValType::I32)], alloc_array(layout)),
            Self::ElemAddr => (&[], elem_addr(layout)),
            Self::ArrayLen => {
                let mut code = null_check(layout, 0);
                code.extend([I::LocalGet(0), I::I32Load(mem(0, 2))]);
                (&[], code)
            },
            Self::EnsureInitialized => (
                &[],
                vec![
                    I::GlobalGet(GLOBAL_INITIALIZED),
                    I::I32Eqz,
                    I::If(BlockType::Empty),
                    I::I32Const(1),
                    I::GlobalSet(GLOBAL_INITIALIZED),
                    I::Call(layout.init),
                    I::End,
                ],
            ),
            Self::I32Abs => (
                &[],
                vec![
                    I::I32Const(0),
                    I::LocalGet(0),
                    I::I32Sub,
                    I::LocalGet(0),
                    I::LocalGet(0),
                    I::I32Const(0),
                    I::I32LtS,
                    I::Select,
                ],
            ),
            Self::I32Min | Self::I32Max => (
                &[],
                vec![
                    I::LocalGet(0),
                    I::LocalGet(1),
                    I::LocalGet(0),
                    I::LocalGet(1),
                    if self == Self::I32Min { I::I32LtS } else { I::I32GtS },
                    I::Select,
                ],
            ),
            Self::F64Rem => (
                &[],
                vec![
                    I::LocalGet(0),
                    I::LocalGet(0),
                    I::LocalGet(1),
                    I::F64Div,
                    I::F64Trunc,
                    I::LocalGet(1),
                    I::F64Mul,
                    I::F64Sub,
                ],
            ),
            Self::SeqSum => (&[(3, ValType::I32)], seq_sum(layout)),
            Self::SeqMin => (&[(3, ValType::I32)], seq_extreme(layout, I::I32LtS)),
            Self::SeqMax => (&[(3, ValType::I32)], seq_extreme(layout, I::I32GtS)),
            Self::SeqAverage => (
                &[(2, ValType::I32), (1, ValType::I64)],
                seq_average(layout),
            ),
            Self::SeqContains => (&[(2, ValType::I32)], seq_contains(layout)),
            Self::SeqRange => (&[(2, ValType::I32)], seq_range(layout)),
        };

        let mut f = Function::new(locals.iter().copied());
        for instruction in &code {
            f.instruction(instruction);
        }
        f.instruction(&I::End);
        f
    }
}

pub(crate) fn mem(offset: u64, align: u32) -> MemArg {
    MemArg {
        offset,
        align,
        memory_index: 0,
    }
}

/// Raise `code` through the host and trap.
pub(crate) fn fault(layout: Layout, code: FaultCode) -> [Instruction<'static>; 3] {
    [
        I::I32Const(code as i32),
        I::Call(layout.host(HostFunction::RuntimeFault)),
        I::Unreachable,
    ]
}

fn null_check(layout: Layout, local: u32) -> Vec<Instruction<'static>> {
    let mut code = vec![I::LocalGet(local), I::I32Eqz, I::If(BlockType::Empty)];
    code.extend(fault(layout, FaultCode::NullReference));
    code.push(I::End);
    code
}

/// `block loop (br_if 1 when index >= len) body (index += 1) br 0 end end`
fn counted_loop(index: u32, len: u32, body: Vec<Instruction<'static>>) -> Vec<Instruction<'static>> {
    let mut code = vec![
        I::Block(BlockType::Empty),
        I::Loop(BlockType::Empty),
        I::LocalGet(index),
        I::LocalGet(len),
        I::I32GeS,
        I::BrIf(1),
    ];
    code.extend(body);
    code.extend([
        I::LocalGet(index),
        I::I32Const(1),
        I::I32Add,
        I::LocalSet(index),
        I::Br(0),
        I::End,
        I::End,
    ]);
    code
}

/// Push element `index` of the `int[]` in local `array` (bounds already known).
fn int_element(array: u32, index: u32) -> [Instruction<'static>; 6] {
    [
        I::LocalGet(array),
        I::LocalGet(index),
        I::I32Const(2),
        I::I32Shl,
        I::I32Add,
        I::I32Load(mem(u64::from(ARRAY_HEADER), 2)),
    ]
}

fn str_literal() -> Vec<Instruction<'static>> {
    // params: offset 0, len 1; locals: handle 2, i 3
    let mut code = vec![
        I::LocalGet(1),
        I::I64ExtendI32U,
        I::Call(KERNEL_ALLOC),
        I::LocalSet(2),
    ];
    code.extend([
        I::Block(BlockType::Empty),
        I::Loop(BlockType::Empty),
        I::LocalGet(3),
        I::LocalGet(1),
        I::I32GeU,
        I::BrIf(1),
        I::LocalGet(2),
        I::LocalGet(3),
        I::I64ExtendI32U,
        I::I64Add,
        I::LocalGet(0),
        I::LocalGet(3),
        I::I32Add,
        I::I32Load8U(mem(0, 0)),
        I::Call(KERNEL_STORE_U8),
        I::LocalGet(3),
        I::I32Const(1),
        I::I32Add,
        I::LocalSet(3),
        I::Br(0),
        I::End,
        I::End,
        I::LocalGet(2),
    ]);
    code
}

fn alloc_array(layout: Layout) -> Vec<Instruction<'static>> {
    // params: len 0, size 1; locals: ptr 2, top 3
    let header = i32::try_from(ARRAY_HEADER).unwrap_or(8);
    let mut code = vec![I::LocalGet(0), I::I32Const(0), I::I32LtS, I::If(BlockType::Empty)];
    code.extend(fault(layout, FaultCode::NegativeArraySize));
    code.push(I::End);

    code.extend([
        I::GlobalGet(GLOBAL_HEAP),
        I::LocalSet(2),
        // top = (ptr + len * size + header + 7) & !7
        I::LocalGet(2),
        I::LocalGet(0),
        I::LocalGet(1),
        I::I32Mul,
        I::I32Add,
        I::I32Const(header.saturating_add(7)),
        I::I32Add,
        I::I32Const(-8),
        I::I32And,
        I::LocalSet(3),
        // Wrapped around the address space.
        I::LocalGet(3),
        I::LocalGet(2),
        I::I32LtU,
        I::If(BlockType::Empty),
        I::Unreachable,
        I::End,
        // Grow memory to cover `top`.
        I::LocalGet(3),
        I::MemorySize(0),
        I::I32Const(16),
        I::I32Shl,
        I::I32GtU,
        I::If(BlockType::Empty),
        I::LocalGet(3),
        I::MemorySize(0),
        I::I32Const(16),
        I::I32Shl,
        I::I32Sub,
        I::I32Const(65_535),
        I::I32Add,
        I::I32Const(16),
        I::I32ShrU,
        I::MemoryGrow(0),
        I::I32Const(-1),
        I::I32Eq,
        I::If(BlockType::Empty),
        I::Unreachable,
        I::End,
        I::End,
        I::LocalGet(3),
        I::GlobalSet(GLOBAL_HEAP),
        I::LocalGet(2),
        I::LocalGet(0),
        I::I32Store(mem(0, 2)),
        I::LocalGet(2),
    ]);
    code
}

fn elem_addr(layout: Layout) -> Vec<Instruction<'static>> {
    // params: ptr 0, index 1, size 2
    let header = i32::try_from(ARRAY_HEADER).unwrap_or(8);
    let mut code = null_check(layout, 0);
    code.extend([
        I::LocalGet(1),
        I::LocalGet(0),
        I::I32Load(mem(0, 2)),
        I::I32GeU,
        I::If(BlockType::Empty),
    ]);
    code.extend(fault(layout, FaultCode::IndexOutOfRange));
    code.extend([
        I::End,
        I::LocalGet(0),
        I::I32Const(header),
        I::I32Add,
        I::LocalGet(1),
        I::LocalGet(2),
        I::I32Mul,
        I::I32Add,
    ]);
    code
}

fn load_len(layout: Layout) -> [Instruction<'static>; 3] {
    [
        I::LocalGet(0),
        I::Call(layout.helper(Helper::ArrayLen)),
        I::LocalSet(1),
    ]
}

fn require_elements(layout: Layout) -> Vec<Instruction<'static>> {
    let mut code = vec![I::LocalGet(1), I::I32Eqz, I::If(BlockType::Empty)];
    code.extend(fault(layout, FaultCode::EmptySequence));
    code.push(I::End);
    code
}

fn seq_sum(layout: Layout) -> Vec<Instruction<'static>> {
    // param: arr 0; locals: len 1, i 2, sum 3
    let mut code = load_len(layout).to_vec();
    let mut body = vec![I::LocalGet(3)];
    body.extend(int_element(0, 2));
    body.extend([I::I32Add, I::LocalSet(3)]);
    code.extend(counted_loop(2, 1, body));
    code.push(I::LocalGet(3));
    code
}

fn seq_extreme(layout: Layout, better: Instruction<'static>) -> Vec<Instruction<'static>> {
    // param: arr 0; locals: len 1, i 2, best 3
    let mut code = load_len(layout).to_vec();
    code.extend(require_elements(layout));
    code.extend([
        I::LocalGet(0),
        I::I32Load(mem(u64::from(ARRAY_HEADER), 2)),
        I::LocalSet(3),
        I::I32Const(1),
        I::LocalSet(2),
    ]);
    let mut body: Vec<Instruction<'static>> = int_element(0, 2).to_vec();
    body.push(I::LocalGet(3));
    body.extend(int_element(0, 2));
    body.extend([I::LocalGet(3), better, I::Select, I::LocalSet(3)]);
    code.extend(counted_loop(2, 1, body));
    code.push(I::LocalGet(3));
    code
}

fn seq_average(layout: Layout) -> Vec<Instruction<'static>> {
    // param: arr 0; locals: len 1, i 2, sum 3 (i64)
    let mut code = load_len(layout).to_vec();
    code.extend(require_elements(layout));
    let mut body = vec![I::LocalGet(3)];
    body.extend(int_element(0, 2));
    body.extend([I::I64ExtendI32S, I::I64Add, I::LocalSet(3)]);
    code.extend(counted_loop(2, 1, body));
    code.extend([
        I::LocalGet(3),
        I::F64ConvertI64S,
        I::LocalGet(1),
        I::F64ConvertI32S,
        I::F64Div,
    ]);
    code
}

fn seq_contains(layout: Layout) -> Vec<Instruction<'static>> {
    // params: arr 0, value 1; locals: len 2, i 3
    let mut code = vec![
        I::LocalGet(0),
        I::Call(layout.helper(Helper::ArrayLen)),
        I::LocalSet(2),
    ];
    let mut body: Vec<Instruction<'static>> = int_element(0, 3).to_vec();
    body.extend([
        I::LocalGet(1),
        I::I32Eq,
        I::If(BlockType::Empty),
        I::I32Const(1),
        I::Return,
        I::End,
    ]);
    code.extend(counted_loop(3, 2, body));
    code.push(I::I32Const(0));
    code
}

fn seq_range(layout: Layout) -> Vec<Instruction<'static>> {
    // params: start 0, count 1; locals: arr 2, i 3
    let mut code = vec![
        I::LocalGet(1),
        I::I32Const(4),
        I::Call(layout.helper(Helper::AllocArray)),
        I::LocalSet(2),
    ];
    let body = vec![
        I::LocalGet(2),
        I::LocalGet(3),
        I::I32Const(2),
        I::I32Shl,
        I::I32Add,
        I::LocalGet(0),
        I::LocalGet(3),
        I::I32Add,
        I::I32Store(mem(u64::from(ARRAY_HEADER), 2)),
    ];
    code.extend(counted_loop(3, 1, body));
    code.push(I::LocalGet(2));
    code
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_follow_definition_order() {
        for (i, helper) in Helper::ALL.iter().enumerate() {
            assert_eq!(helper.index() as usize, i);
        }
    }

    #[test]
    fn test_signatures_have_at_most_one_result() {
        assert!(Helper::ALL.iter().all(|h| h.signature().1.len() <= 1));
    }
}
