use super::func::Func;
use super::insn::{Insn, InsnCode, Label, Mem, Operand, Reg};
use super::module::{ItemRef, ProtoId, Var};
use super::types::Type;

/// Incremental construction of a [`Func`].
///
/// Used by tests, benches and the CLI demos; it does no validation beyond what the compiler
/// itself asserts.
pub struct FuncBuilder {
    func: Func,
    next_label: u32,
}

impl FuncBuilder {
    pub fn new(name: impl Into<String>, res_types: Vec<Type>, args: Vec<Var>) -> Self {
        Self {
            func: Func::new(name, res_types, args, false),
            next_label: 0,
        }
    }

    pub fn new_vararg(name: impl Into<String>, res_types: Vec<Type>, args: Vec<Var>) -> Self {
        Self {
            func: Func::new(name, res_types, args, true),
            next_label: 0,
        }
    }

    pub fn arg(&self, idx: usize) -> Reg {
        self.func.arg_reg(idx)
    }

    pub fn reg(&mut self, name: impl Into<String>, ty: Type) -> Reg {
        self.func.new_reg(name, ty)
    }

    pub fn hard_reg(&mut self, name: impl Into<String>, ty: Type, hard_reg: impl Into<String>) -> Reg {
        self.func.new_hard_reg(name, ty, hard_reg)
    }

    pub fn new_label(&mut self) -> Label {
        let label = Label(self.next_label);
        self.next_label += 1;
        label
    }

    /// Places `label` at the current end of the instruction list.
    pub fn bind(&mut self, label: Label) -> &mut Self {
        self.emit(InsnCode::Label, [Operand::Label(label)])
    }

    pub fn emit<I>(&mut self, code: InsnCode, ops: I) -> &mut Self
    where
        I: IntoIterator<Item = Operand>,
    {
        self.func.push(Insn::new(code, ops.into_iter().collect()));
        self
    }

    pub fn mov_i(&mut self, dst: Reg, imm: i64) -> &mut Self {
        self.emit(InsnCode::Mov, [dst.into(), Operand::Int(imm)])
    }

    pub fn mov(&mut self, dst: Reg, src: Reg) -> &mut Self {
        self.emit(InsnCode::Mov, [dst.into(), src.into()])
    }

    pub fn mov_ref(&mut self, dst: Reg, item: ItemRef) -> &mut Self {
        self.emit(InsnCode::Mov, [dst.into(), item.into()])
    }

    /// Typed load `dst = *(ty *) base` using the move family that matches `ty`.
    pub fn load(&mut self, ty: Type, dst: Reg, base: Reg) -> &mut Self {
        self.emit(move_code(ty), [dst.into(), Mem::base(ty, base).into()])
    }

    /// Typed store `*(ty *) base = src`.
    pub fn store(&mut self, ty: Type, base: Reg, src: Reg) -> &mut Self {
        self.emit(move_code(ty), [Mem::base(ty, base).into(), src.into()])
    }

    pub fn unop(&mut self, code: InsnCode, dst: Reg, src: Reg) -> &mut Self {
        self.emit(code, [dst.into(), src.into()])
    }

    pub fn binop(&mut self, code: InsnCode, dst: Reg, a: Reg, b: Reg) -> &mut Self {
        self.emit(code, [dst.into(), a.into(), b.into()])
    }

    pub fn jmp(&mut self, target: Label) -> &mut Self {
        self.emit(InsnCode::Jmp, [target.into()])
    }

    pub fn branch(&mut self, code: InsnCode, target: Label, a: Reg, b: Reg) -> &mut Self {
        self.emit(code, [target.into(), a.into(), b.into()])
    }

    pub fn call(&mut self, proto: ProtoId, callee: impl Into<Operand>, results: &[Reg], args: &[Operand]) -> &mut Self {
        self.call_with(InsnCode::Call, proto, callee, results, args)
    }

    pub fn call_with(
        &mut self,
        code: InsnCode,
        proto: ProtoId,
        callee: impl Into<Operand>,
        results: &[Reg],
        args: &[Operand],
    ) -> &mut Self {
        debug_assert!(code.is_call());
        let mut ops = Vec::with_capacity(2 + results.len() + args.len());
        ops.push(Operand::Ref(ItemRef::Proto(proto)));
        ops.push(callee.into());
        ops.extend(results.iter().map(|r| Operand::Reg(*r)));
        ops.extend_from_slice(args);
        self.emit(code, ops)
    }

    pub fn ret(&mut self, values: &[Reg]) -> &mut Self {
        self.emit(InsnCode::Ret, values.iter().map(|r| Operand::Reg(*r)))
    }

    pub fn finish(self) -> Func {
        self.func
    }
}

fn move_code(ty: Type) -> InsnCode {
    match ty {
        Type::F => InsnCode::FMov,
        Type::D => InsnCode::DMov,
        Type::LD => InsnCode::LdMov,
        _ => InsnCode::Mov,
    }
}
