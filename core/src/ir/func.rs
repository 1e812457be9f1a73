use std::sync::Arc;

use once_cell::sync::OnceCell;

use super::insn::{Insn, Reg};
use super::module::Var;
use super::types::Type;
use crate::vm::bytecode::CompiledFunc;

#[derive(Debug, Clone, PartialEq)]
pub struct RegDecl {
    pub name: String,
    pub ty: Type,
    /// Hardware register the variable is pinned to, if any.
    pub hard_reg: Option<String>,
}

/// Function item: signature, register declarations and the instruction list.
///
/// The compiled form is attached lazily by the interpreter and dropped by every method that
/// changes the instruction list or the register declarations.
#[derive(Debug, Clone)]
pub struct Func {
    name: String,
    res_types: Vec<Type>,
    args: Vec<Var>,
    vararg: bool,
    regs: Vec<RegDecl>,
    insns: Vec<Insn>,
    compiled: OnceCell<Arc<CompiledFunc>>,
}

impl Func {
    pub fn new(name: impl Into<String>, res_types: Vec<Type>, args: Vec<Var>, vararg: bool) -> Self {
        let regs = args
            .iter()
            .map(|arg| RegDecl {
                name: arg.name.clone(),
                ty: if arg.ty.is_blk() { Type::P } else { arg.ty },
                hard_reg: None,
            })
            .collect();
        Self {
            name: name.into(),
            res_types,
            args,
            vararg,
            regs,
            insns: Vec::new(),
            compiled: OnceCell::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn res_types(&self) -> &[Type] {
        &self.res_types
    }

    pub fn args(&self) -> &[Var] {
        &self.args
    }

    pub fn is_vararg(&self) -> bool {
        self.vararg
    }

    /// Register holding the `idx`-th argument.
    pub fn arg_reg(&self, idx: usize) -> Reg {
        assert!(idx < self.args.len(), "argument {idx} out of range for {}", self.name);
        Reg(idx as u32 + 1)
    }

    pub fn new_reg(&mut self, name: impl Into<String>, ty: Type) -> Reg {
        self.declare(name.into(), ty, None)
    }

    /// Declares a register pinned to the named hardware register.
    pub fn new_hard_reg(&mut self, name: impl Into<String>, ty: Type, hard_reg: impl Into<String>) -> Reg {
        self.declare(name.into(), ty, Some(hard_reg.into()))
    }

    fn declare(&mut self, name: String, ty: Type, hard_reg: Option<String>) -> Reg {
        self.invalidate();
        self.regs.push(RegDecl { name, ty, hard_reg });
        Reg(self.regs.len() as u32)
    }

    pub fn reg(&self, reg: Reg) -> Option<&RegDecl> {
        (reg.0 as usize).checked_sub(1).and_then(|idx| self.regs.get(idx))
    }

    pub fn reg_type(&self, reg: Reg) -> Option<Type> {
        self.reg(reg).map(|decl| decl.ty)
    }

    pub fn reg_count(&self) -> usize {
        self.regs.len()
    }

    pub fn insns(&self) -> &[Insn] {
        &self.insns
    }

    pub fn push(&mut self, insn: Insn) {
        self.invalidate();
        self.insns.push(insn);
    }

    pub fn insert(&mut self, idx: usize, insn: Insn) {
        self.invalidate();
        self.insns.insert(idx, insn);
    }

    pub fn remove(&mut self, idx: usize) -> Insn {
        self.invalidate();
        self.insns.remove(idx)
    }

    pub fn replace(&mut self, idx: usize, insn: Insn) -> Insn {
        self.invalidate();
        std::mem::replace(&mut self.insns[idx], insn)
    }

    pub fn compiled(&self) -> Option<&Arc<CompiledFunc>> {
        self.compiled.get()
    }

    pub(crate) fn compiled_cell(&self) -> &OnceCell<Arc<CompiledFunc>> {
        &self.compiled
    }

    /// Drops the compiled form; the next execution recompiles.
    pub fn invalidate(&mut self) {
        if self.compiled.take().is_some() {
            tracing::debug!(target: "mir::interp::compile", func = %self.name, "compiled form invalidated");
        }
    }
}
