//! Lowering of one IR function body to Wasm instructions.

use crucible_core::{HostFunction, WasmType};
use wasm_encoder::{BlockType, Function, Instruction, ValType};

use super::runtime::mem;
use super::{ARRAY_HEADER, Helper, Layout, Literals, val_type};
use crate::error::{CompilerError, CompilerResult};
use crate::library::Intrinsic;
use crate::semantic::ir::{self, BinOp, Callee, Expr, ExprKind, Place, Program, Stmt, UnOp};
use crate::types::Ty;

use Instruction as I;

/// Branch targets of an enclosing loop, as block nesting levels.
#[derive(Debug, Clone, Copy)]
struct LoopLabels {
    /// Block around the whole loop; `break` lands after it.
    exit: u32,
    /// Block around the body; `continue` lands on the step.
    next: u32,
}

pub(super) struct FunctionEmitter<'a> {
    program: &'a Program,
    layout: Layout,
    literals: &'a mut Literals,
    func: &'a ir::Function,
    /// Parameters, declared locals, then emitter temporaries.
    locals: Vec<ValType>,
    /// One reusable scratch local per value type, for stores that yield.
    scratch: [Option<u32>; 3],
    code: Vec<Instruction<'static>>,
    depth: u32,
    loops: Vec<LoopLabels>,
}

impl<'a> FunctionEmitter<'a> {
    pub(super) fn new(
        program: &'a Program,
        layout: Layout,
        literals: &'a mut Literals,
        func: &'a ir::Function,
    ) -> CompilerResult<Self> {
        let locals = func
            .locals
            .iter()
            .map(|ty| {
                val_type(ty).ok_or_else(|| {
                    CompilerError::Codegen(format!("{}: local of type '{ty}'", func.name))
                })
            })
            .collect::<CompilerResult<Vec<_>>>()?;
        if func.param_count as usize > locals.len() {
            return Err(CompilerError::Codegen(format!(
                "{}: missing parameters",
                func.name
            )));
        }
        Ok(Self {
            program,
            layout,
            literals,
            func,
            locals,
            scratch: [None; 3],
            code: Vec::new(),
            depth: 0,
            loops: Vec::new(),
        })
    }

    pub(super) fn finish(mut self) -> CompilerResult<Function> {
        let func = self.func;
        self.stmts(&func.body)?;
        if func.returns != Ty::Void {
            // Every path returned already; the checker reported otherwise.
            self.code.push(I::Unreachable);
        }

        let declared = self
            .locals
            .get(self.func.param_count as usize..)
            .unwrap_or_default()
            .to_vec();
        let mut f = Function::new_with_locals_types(declared);
        for instruction in &self.code {
            f.instruction(instruction);
        }
        f.instruction(&I::End);
        Ok(f)
    }

    fn temp(&mut self, vt: ValType) -> CompilerResult<u32> {
        let index = u32::try_from(self.locals.len())
            .map_err(|_| CompilerError::Codegen("too many locals".to_owned()))?;
        self.locals.push(vt);
        Ok(index)
    }

    fn scratch(&mut self, vt: ValType) -> CompilerResult<u32> {
        let slot = match vt {
            ValType::I64 => 1,
            ValType::F64 => 2,
            _ => 0,
        };
        if let Some(index) = self.scratch[slot] {
            return Ok(index);
        }
        let index = self.temp(vt)?;
        self.scratch[slot] = Some(index);
        Ok(index)
    }

    fn open(&mut self, instruction: Instruction<'static>) -> u32 {
        self.code.push(instruction);
        self.depth = self.depth.saturating_add(1);
        self.depth
    }

    fn close(&mut self) {
        self.code.push(I::End);
        self.depth = self.depth.saturating_sub(1);
    }

    fn branch_to(&self, level: u32) -> u32 {
        self.depth.saturating_sub(level)
    }

    // ---------------------------------------------------------------------
    // Statements
    // ---------------------------------------------------------------------

    fn stmts(&mut self, stmts: &[Stmt]) -> CompilerResult<()> {
        for stmt in stmts {
            self.stmt(stmt)?;
        }
        Ok(())
    }

    fn stmt(&mut self, stmt: &Stmt) -> CompilerResult<()> {
        match stmt {
            Stmt::Expr(expr) => self.discard(expr)?,
            Stmt::If {
                cond,
                then,
                otherwise,
            } => {
                self.expr(cond)?;
                self.open(I::If(BlockType::Empty));
                self.stmts(then)?;
                if !otherwise.is_empty() {
                    self.code.push(I::Else);
                    self.stmts(otherwise)?;
                }
                self.close();
            },
            Stmt::Loop { cond, body, step } => {
                let exit = self.open(I::Block(BlockType::Empty));
                let top = self.open(I::Loop(BlockType::Empty));
                if let Some(cond) = cond {
                    self.expr(cond)?;
                    let target = self.branch_to(exit);
                    self.code.extend([I::I32Eqz, I::BrIf(target)]);
                }
                let next = self.open(I::Block(BlockType::Empty));
                self.loops.push(LoopLabels { exit, next });
                self.stmts(body)?;
                self.loops.pop();
                self.close();
                for expr in step {
                    self.discard(expr)?;
                }
                let target = self.branch_to(top);
                self.code.push(I::Br(target));
                self.close();
                self.close();
            },
            Stmt::Return(value) => {
                if let Some(value) = value {
                    self.expr(value)?;
                }
                self.code.push(I::Return);
            },
            Stmt::Break | Stmt::Continue => {
                let labels = self
                    .loops
                    .last()
                    .copied()
                    .ok_or_else(|| CompilerError::Codegen("jump outside a loop".to_owned()))?;
                let level = if matches!(stmt, Stmt::Break) {
                    labels.exit
                } else {
                    labels.next
                };
                let target = self.branch_to(level);
                self.code.push(I::Br(target));
            },
            Stmt::Block(stmts) => self.stmts(stmts)?,
        }
        Ok(())
    }

    /// Evaluate for side effects only.
    fn discard(&mut self, expr: &Expr) -> CompilerResult<()> {
        if let ExprKind::Assign(place, value) = &expr.kind {
            return self.assign(place, value, &expr.ty, false);
        }
        self.expr(expr)?;
        if val_type(&expr.ty).is_some() {
            self.code.push(I::Drop);
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Expressions
    // ---------------------------------------------------------------------

    fn expr(&mut self, expr: &Expr) -> CompilerResult<()> {
        match &expr.kind {
            ExprKind::Int(v) => self.code.push(I::I32Const(*v)),
            ExprKind::Long(v) => self.code.push(I::I64Const(*v)),
            ExprKind::Double(v) => self.code.push(I::F64Const((*v).into())),
            ExprKind::Bool(v) => self.code.push(I::I32Const(i32::from(*v))),
            ExprKind::Str(text) => self.string_literal(text)?,
            ExprKind::Null => self.code.push(match val_type(&expr.ty) {
                Some(ValType::I64) => I::I64Const(0),
                _ => I::I32Const(0),
            }),
            ExprKind::Local(id) => self.code.push(I::LocalGet(*id)),
            ExprKind::Global(id) => self.code.push(I::GlobalGet(self.layout.field(*id))),
            ExprKind::Convert(inner) => {
                self.expr(inner)?;
                self.convert(&inner.ty, &expr.ty)?;
            },
            ExprKind::ToString(inner) => {
                self.expr(inner)?;
                let host = match inner.ty {
                    Ty::Int => HostFunction::StrFromI32,
                    Ty::Long => HostFunction::StrFromI64,
                    Ty::Double => HostFunction::StrFromF64,
                    Ty::Bool => HostFunction::StrFromBool,
                    Ty::String => return Ok(()),
                    ref other => {
                        return Err(CompilerError::Codegen(format!(
                            "cannot format '{other}' as a string"
                        )));
                    },
                };
                self.host(host);
            },
            ExprKind::Unary(op, operand) => self.unary(*op, operand)?,
            ExprKind::Binary(op, left, right) => {
                self.expr(left)?;
                self.expr(right)?;
                self.binary(*op, &left.ty)?;
            },
            ExprKind::Concat(left, right) => {
                self.expr(left)?;
                self.expr(right)?;
                self.host(HostFunction::StrConcat);
            },
            ExprKind::StrEq(negated, left, right) => {
                self.expr(left)?;
                self.expr(right)?;
                self.host(HostFunction::StrEquals);
                if *negated {
                    self.code.push(I::I32Eqz);
                }
            },
            ExprKind::RefEq(negated, left, right) => {
                self.expr(left)?;
                self.expr(right)?;
                self.code.push(if *negated { I::I32Ne } else { I::I32Eq });
            },
            ExprKind::Logical(and, left, right) => {
                self.expr(left)?;
                self.open(I::If(BlockType::Result(ValType::I32)));
                if *and {
                    self.expr(right)?;
                    self.code.push(I::Else);
                    self.code.push(I::I32Const(0));
                } else {
                    self.code.push(I::I32Const(1));
                    self.code.push(I::Else);
                    self.expr(right)?;
                }
                self.close();
            },
            ExprKind::Conditional(cond, then, otherwise) => {
                self.expr(cond)?;
                let block = val_type(&expr.ty).map_or(BlockType::Empty, BlockType::Result);
                self.open(I::If(block));
                self.expr(then)?;
                self.code.push(I::Else);
                self.expr(otherwise)?;
                self.close();
            },
            ExprKind::Call(callee, args) => {
                for arg in args {
                    self.expr(arg)?;
                }
                self.call(*callee)?;
            },
            ExprKind::NewArray(len) => {
                self.expr(len)?;
                self.code.push(I::I32Const(elem_size(&expr.ty)?));
                self.helper(Helper::AllocArray);
            },
            ExprKind::ArrayLit(items) => self.array_literal(items, &expr.ty)?,
            ExprKind::ArrayLen(array) => {
                self.expr(array)?;
                self.helper(Helper::ArrayLen);
            },
            ExprKind::Index(array, index) => {
                self.element_address(array, index)?;
                self.code.push(load(&expr.ty, 0)?);
            },
            ExprKind::Assign(place, value) => self.assign(place, value, &expr.ty, true)?,
            ExprKind::Let(local, value, body) => {
                self.expr(value)?;
                self.code.push(I::LocalSet(*local));
                self.expr(body)?;
            },
            ExprKind::Seq(first, second) => {
                self.discard(first)?;
                self.expr(second)?;
            },
            ExprKind::Error => {
                return Err(CompilerError::Codegen(format!(
                    "{}: unchecked expression reached codegen",
                    self.func.name
                )));
            },
        }
        Ok(())
    }

    /// Literal handle, copied into Extism memory on first use.
    fn string_literal(&mut self, text: &str) -> CompilerResult<()> {
        if text.is_empty() {
            // Handle 0 reads as the empty string on the host side.
            self.code.push(I::I64Const(0));
            return Ok(());
        }
        let lit = self.literals.intern(text)?;
        let offset = i32::try_from(lit.offset)
            .map_err(|_| CompilerError::Codegen("literal offset out of range".to_owned()))?;
        let len = i32::try_from(lit.len)
            .map_err(|_| CompilerError::Codegen("literal too long".to_owned()))?;
        self.code.extend([I::GlobalGet(lit.global), I::I64Eqz]);
        self.open(I::If(BlockType::Empty));
        self.code.extend([I::I32Const(offset), I::I32Const(len)]);
        self.helper(Helper::StrLiteral);
        self.code.push(I::GlobalSet(lit.global));
        self.close();
        self.code.push(I::GlobalGet(lit.global));
        Ok(())
    }

    fn convert(&mut self, from: &Ty, to: &Ty) -> CompilerResult<()> {
        let op = match (from, to) {
            _ if from == to => return Ok(()),
            (Ty::Int, Ty::Long) => I::I64ExtendI32S,
            (Ty::Int, Ty::Double) => I::F64ConvertI32S,
            (Ty::Long, Ty::Int) => I::I32WrapI64,
            (Ty::Long, Ty::Double) => I::F64ConvertI64S,
            (Ty::Double, Ty::Int) => I::I32TruncSatF64S,
            (Ty::Double, Ty::Long) => I::I64TruncSatF64S,
            _ => {
                return Err(CompilerError::Codegen(format!(
                    "no conversion from '{from}' to '{to}'"
                )));
            },
        };
        self.code.push(op);
        Ok(())
    }

    fn unary(&mut self, op: UnOp, operand: &Expr) -> CompilerResult<()> {
        match (op, &operand.ty) {
            (UnOp::Not, _) => {
                self.expr(operand)?;
                self.code.push(I::I32Eqz);
            },
            (UnOp::Neg, Ty::Int) => {
                self.code.push(I::I32Const(0));
                self.expr(operand)?;
                self.code.push(I::I32Sub);
            },
            (UnOp::Neg, Ty::Long) => {
                self.code.push(I::I64Const(0));
                self.expr(operand)?;
                self.code.push(I::I64Sub);
            },
            (UnOp::Neg, Ty::Double) => {
                self.expr(operand)?;
                self.code.push(I::F64Neg);
            },
            (UnOp::Neg, other) => {
                return Err(CompilerError::Codegen(format!("cannot negate '{other}'")));
            },
        }
        Ok(())
    }

    fn binary(&mut self, op: BinOp, operands: &Ty) -> CompilerResult<()> {
        let instruction = match operands.wasm() {
            Some(WasmType::I32) => match op {
                BinOp::Add => I::I32Add,
                BinOp::Sub => I::I32Sub,
                BinOp::Mul => I::I32Mul,
                BinOp::Div => I::I32DivS,
                BinOp::Rem => I::I32RemS,
                BinOp::Eq => I::I32Eq,
                BinOp::Ne => I::I32Ne,
                BinOp::Lt => I::I32LtS,
                BinOp::Gt => I::I32GtS,
                BinOp::Le => I::I32LeS,
                BinOp::Ge => I::I32GeS,
            },
            Some(WasmType::I64) => match op {
                BinOp::Add => I::I64Add,
                BinOp::Sub => I::I64Sub,
                BinOp::Mul => I::I64Mul,
                BinOp::Div => I::I64DivS,
                BinOp::Rem => I::I64RemS,
                BinOp::Eq => I::I64Eq,
                BinOp::Ne => I::I64Ne,
                BinOp::Lt => I::I64LtS,
                BinOp::Gt => I::I64GtS,
                BinOp::Le => I::I64LeS,
                BinOp::Ge => I::I64GeS,
            },
            Some(WasmType::F64) => match op {
                BinOp::Add => I::F64Add,
                BinOp::Sub => I::F64Sub,
                BinOp::Mul => I::F64Mul,
                BinOp::Div => I::F64Div,
                BinOp::Rem => I::Call(self.layout.helper(Helper::F64Rem)),
                BinOp::Eq => I::F64Eq,
                BinOp::Ne => I::F64Ne,
                BinOp::Lt => I::F64Lt,
                BinOp::Gt => I::F64Gt,
                BinOp::Le => I::F64Le,
                BinOp::Ge => I::F64Ge,
            },
            None => {
                return Err(CompilerError::Codegen(format!(
                    "operator {op:?} on '{operands}'"
                )));
            },
        };
        self.code.push(instruction);
        Ok(())
    }

    fn call(&mut self, callee: Callee) -> CompilerResult<()> {
        match callee {
            Callee::Function(id) => {
                if id as usize >= self.program.functions.len() {
                    return Err(CompilerError::Codegen(format!("no function #{id}")));
                }
                self.code.push(I::Call(self.layout.function(id)));
            },
            Callee::Host(host) => self.host(host),
            Callee::Module(index) => {
                if index as usize >= self.program.module_imports.len() {
                    return Err(CompilerError::Codegen(format!("no module import #{index}")));
                }
                self.code.push(I::Call(self.layout.module_import(index)));
            },
            Callee::Intrinsic(intrinsic) => self.intrinsic(intrinsic),
        }
        Ok(())
    }

    fn intrinsic(&mut self, intrinsic: Intrinsic) {
        let instruction = match intrinsic {
            Intrinsic::F64Sqrt => I::F64Sqrt,
            Intrinsic::F64Abs => I::F64Abs,
            Intrinsic::F64Floor => I::F64Floor,
            Intrinsic::F64Ceil => I::F64Ceil,
            Intrinsic::F64Trunc => I::F64Trunc,
            Intrinsic::F64Nearest => I::F64Nearest,
            Intrinsic::F64Min => I::F64Min,
            Intrinsic::F64Max => I::F64Max,
            Intrinsic::I32Abs => return self.helper(Helper::I32Abs),
            Intrinsic::I32Min => return self.helper(Helper::I32Min),
            Intrinsic::I32Max => return self.helper(Helper::I32Max),
            Intrinsic::SeqSum => return self.helper(Helper::SeqSum),
            Intrinsic::SeqMin => return self.helper(Helper::SeqMin),
            Intrinsic::SeqMax => return self.helper(Helper::SeqMax),
            Intrinsic::SeqAverage => return self.helper(Helper::SeqAverage),
            Intrinsic::SeqContains => return self.helper(Helper::SeqContains),
            Intrinsic::SeqRange => return self.helper(Helper::SeqRange),
        };
        self.code.push(instruction);
    }

    fn host(&mut self, host: HostFunction) {
        self.code.push(I::Call(self.layout.host(host)));
    }

    fn helper(&mut self, helper: Helper) {
        self.code.push(I::Call(self.layout.helper(helper)));
    }

    fn array_literal(&mut self, items: &[Expr], ty: &Ty) -> CompilerResult<()> {
        let elem = ty
            .element()
            .ok_or_else(|| CompilerError::Codegen(format!("array literal of type '{ty}'")))?;
        let size = elem_size(ty)?;
        let len = i32::try_from(items.len())
            .map_err(|_| CompilerError::Codegen("array literal too long".to_owned()))?;
        let array = self.temp(ValType::I32)?;

        self.code.extend([I::I32Const(len), I::I32Const(size)]);
        self.helper(Helper::AllocArray);
        self.code.push(I::LocalSet(array));
        let mut offset = u64::from(ARRAY_HEADER);
        for item in items {
            self.code.push(I::LocalGet(array));
            self.expr(item)?;
            self.code.push(store(elem, offset)?);
            offset = offset.saturating_add(u64::from(elem.elem_size()));
        }
        self.code.push(I::LocalGet(array));
        Ok(())
    }

    /// Push the checked address of `array[index]`.
    fn element_address(&mut self, array: &Expr, index: &Expr) -> CompilerResult<()> {
        self.expr(array)?;
        self.expr(index)?;
        self.code.push(I::I32Const(elem_size(&array.ty)?));
        self.helper(Helper::ElemAddr);
        Ok(())
    }

    fn assign(&mut self, place: &Place, value: &Expr, ty: &Ty, keep: bool) -> CompilerResult<()> {
        match place {
            Place::Local(local) => {
                self.expr(value)?;
                self.code.push(if keep {
                    I::LocalTee(*local)
                } else {
                    I::LocalSet(*local)
                });
            },
            Place::Global(global) => {
                self.expr(value)?;
                let slot = self.layout.field(*global);
                self.code.push(I::GlobalSet(slot));
                if keep {
                    self.code.push(I::GlobalGet(slot));
                }
            },
            Place::Index { array, index } => {
                self.element_address(array, index)?;
                self.expr(value)?;
                let scratch = if keep {
                    let vt = val_type(ty).ok_or_else(|| {
                        CompilerError::Codegen(format!("store of type '{ty}'"))
                    })?;
                    let scratch = self.scratch(vt)?;
                    self.code.push(I::LocalTee(scratch));
                    Some(scratch)
                } else {
                    None
                };
                self.code.push(store(ty, 0)?);
                if let Some(scratch) = scratch {
                    self.code.push(I::LocalGet(scratch));
                }
            },
        }
        Ok(())
    }
}

fn elem_size(array: &Ty) -> CompilerResult<i32> {
    let elem = array
        .element()
        .ok_or_else(|| CompilerError::Codegen(format!("'{array}' is not an array")))?;
    Ok(if elem.elem_size() == 8 { 8 } else { 4 })
}

fn load(ty: &Ty, offset: u64) -> CompilerResult<Instruction<'static>> {
    Ok(match ty.wasm() {
        Some(WasmType::I32) => I::I32Load(mem(offset, 2)),
        Some(WasmType::I64) => I::I64Load(mem(offset, 3)),
        Some(WasmType::F64) => I::F64Load(mem(offset, 3)),
        None => return Err(CompilerError::Codegen(format!("load of type '{ty}'"))),
    })
}

fn store(ty: &Ty, offset: u64) -> CompilerResult<Instruction<'static>> {
    Ok(match ty.wasm() {
        Some(WasmType::I32) => I::I32Store(mem(offset, 2)),
        Some(WasmType::I64) => I::I64Store(mem(offset, 3)),
        Some(WasmType::F64) => I::F64Store(mem(offset, 3)),
        None => return Err(CompilerError::Codegen(format!("store of type '{ty}'"))),
    })
}
