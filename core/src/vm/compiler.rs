//! Lowering of IR functions into the flat slot array run by the execution engine.
//!
//! Every instruction becomes a tag word followed by its operand words. Register operands are
//! frame indices, immediates are stored pre-encoded, labels become absolute offsets patched
//! once the whole function has been laid out. Moves that touch memory are split into typed
//! load/store tags and moves of hardware-tied registers into global slot transfers.

use std::sync::Arc;

use anyhow::Result;
use once_cell::sync::OnceCell;
use tracing::debug;

use crate::ir::{Func, FuncId, Insn, InsnCode, ItemRef, Label, Mem, Module, Operand, Proto, Reg, Type};
use crate::util::fast_map::{FastHashMap, fast_hash_map_new};
use crate::vm::abi::{GLOBAL_SLOTS, TargetAbi};
use crate::vm::bytecode::{CallSite, CompiledFunc, Tag, is_cond_branch};
use crate::vm::error::InterpError;
use crate::vm::ffi::{ArgDesc, HostRegistry};
use crate::vm::slot::{Addr, Slot};

/// Item addresses and target facts the compiler needs from the owning context.
pub(crate) struct Resolver<'a> {
    pub module: &'a Module,
    pub hosts: &'a HostRegistry,
    pub data: &'a [Addr],
    pub abi: &'a dyn TargetAbi,
}

impl Resolver<'_> {
    /// Imports bind to host functions first, then to module functions of the same name.
    pub fn item_addr(&self, item: ItemRef) -> Result<Addr> {
        match item {
            ItemRef::Func(id) => {
                self.module
                    .func(id)
                    .ok_or_else(|| InterpError::Link(format!("unknown function {item}")))?;
                Ok(Addr::func(id))
            }
            ItemRef::Import(id) => {
                let import = self
                    .module
                    .import(id)
                    .ok_or_else(|| InterpError::Link(format!("unknown import {item}")))?;
                if let Some(host) = self.hosts.lookup(&import.name) {
                    return Ok(Addr::host(host));
                }
                self.module
                    .find_func(&import.name)
                    .map(Addr::func)
                    .ok_or_else(|| InterpError::Link(format!("unresolved import '{}'", import.name)).into())
            }
            ItemRef::Data(id) => self
                .data
                .get(id.0 as usize)
                .copied()
                .ok_or_else(|| InterpError::Link(format!("unknown data item {item}")).into()),
            ItemRef::Proto(_) => Err(InterpError::Link(format!("prototype {item} has no address")).into()),
        }
    }

    fn proto(&self, op: &Operand) -> &Proto {
        let Operand::Ref(ItemRef::Proto(id)) = op else {
            panic!("call without a prototype operand: {op}");
        };
        self.module
            .proto(*id)
            .unwrap_or_else(|| panic!("call through unknown prototype @proto{}", id.0))
    }
}

/// Compiles `func` into its executable form.
pub(crate) fn compile_func(func: &Func, id: FuncId, resolver: &Resolver<'_>) -> Result<CompiledFunc> {
    let mut c = CodeCompiler {
        func,
        resolver,
        code: Vec::with_capacity(func.insns().len() * 4),
        labels: fast_hash_map_new(),
        fixups: Vec::new(),
        call_sites: Vec::new(),
        max_reg: func.args().len() as u32,
    };
    for insn in func.insns() {
        c.insn(insn)?;
    }
    // Falling off the end returns whatever the result registers hold.
    c.push_tag(Tag::Ret);
    c.push(Slot::ZERO);

    for (pos, label) in &c.fixups {
        let target = c
            .labels
            .get(label)
            .copied()
            .unwrap_or_else(|| panic!("{}: branch to undefined label L{}", func.name(), label.0));
        c.code[*pos] = Slot::from_u64(target as u64);
    }
    let mut labels: Vec<usize> = c.labels.values().copied().collect();
    labels.sort_unstable();
    labels.dedup();

    let compiled = CompiledFunc {
        func: id,
        name: Arc::from(func.name()),
        nregs: c.max_reg as usize + 1,
        code: c.code.into_boxed_slice(),
        call_sites: c.call_sites.into_boxed_slice(),
        labels: labels.into_boxed_slice(),
        threaded: OnceCell::new(),
    };
    debug!(
        target: "mir::interp::compile",
        func = %compiled.name,
        words = compiled.code.len(),
        nregs = compiled.nregs,
        call_sites = compiled.call_sites.len(),
        "compiled"
    );
    Ok(compiled)
}

struct CodeCompiler<'a> {
    func: &'a Func,
    resolver: &'a Resolver<'a>,
    code: Vec<Slot>,
    labels: FastHashMap<Label, usize>,
    fixups: Vec<(usize, Label)>,
    call_sites: Vec<CallSite>,
    max_reg: u32,
}

impl CodeCompiler<'_> {
    fn push(&mut self, word: Slot) {
        self.code.push(word);
    }

    fn push_tag(&mut self, tag: Tag) {
        self.code.push(tag.encode());
    }

    fn push_label(&mut self, op: &Operand) {
        let Operand::Label(label) = op else {
            panic!("{}: expected a label operand, got {op}", self.func.name());
        };
        self.fixups.push((self.code.len(), *label));
        self.code.push(Slot::ZERO);
    }

    fn reg_index(&mut self, reg: Reg) -> u64 {
        assert!(reg.0 != 0, "{}: register 0 is reserved", self.func.name());
        self.max_reg = self.max_reg.max(reg.0);
        reg.0 as u64
    }

    /// Frame index of a plain register operand.
    fn get_reg(&mut self, op: &Operand) -> Slot {
        let Operand::Reg(reg) = op else {
            panic!("{}: expected a register operand, got {op}", self.func.name());
        };
        assert!(
            self.hard_reg(*reg).is_none(),
            "{}: hardware-tied r{} used outside a move",
            self.func.name(),
            reg.0
        );
        Slot::from_u64(self.reg_index(*reg))
    }

    fn push_reg(&mut self, op: &Operand) {
        let word = self.get_reg(op);
        self.push(word);
    }

    /// Base register of a memory operand.
    fn push_mem(&mut self, mem: &Mem) {
        assert!(
            mem.is_base_only(),
            "{}: memory operands must be base-register only, got {}",
            self.func.name(),
            Operand::Mem(*mem)
        );
        let Some(base) = mem.base else {
            unreachable!("base-only memory operand without a base");
        };
        self.push_reg(&Operand::Reg(base));
    }

    fn hard_reg(&self, reg: Reg) -> Option<usize> {
        let name = self.func.reg(reg)?.hard_reg.as_deref()?;
        let idx = self
            .resolver
            .abi
            .hard_reg(name)
            .unwrap_or_else(|| panic!("{}: target has no hardware register '{name}'", self.func.name()));
        assert!(idx < GLOBAL_SLOTS);
        Some(idx)
    }

    fn insn(&mut self, insn: &Insn) -> Result<()> {
        let ops = insn.ops.as_slice();
        match insn.code {
            InsnCode::Mov | InsnCode::FMov | InsnCode::DMov | InsnCode::LdMov => self.mov(insn.code, ops)?,
            InsnCode::Addr | InsnCode::Addr8 | InsnCode::Addr16 | InsnCode::Addr32 => {
                return Err(InterpError::Unsupported(format!(
                    "{}: {} is not supported by the interpreter",
                    self.func.name(),
                    insn.code
                ))
                .into());
            }
            InsnCode::Label => {
                let Operand::Label(label) = ops[0] else {
                    panic!("{}: label instruction without a label", self.func.name());
                };
                self.labels.insert(label, self.code.len());
            }
            InsnCode::PrSet => {}
            InsnCode::PrBeq | InsnCode::PrBne => {
                let taken = match (insn.code, &ops[2]) {
                    (InsnCode::PrBeq, Operand::Int(0)) => true,
                    (InsnCode::PrBne, Operand::Int(v)) => *v != 0,
                    _ => false,
                };
                if taken {
                    self.push_tag(Tag::Jmp);
                    self.push_label(&ops[0]);
                }
            }
            InsnCode::Call | InsnCode::Inline | InsnCode::JCall => self.call(insn.code, ops)?,
            InsnCode::Switch => {
                self.push_tag(Tag::Switch);
                self.push(Slot::from_u64(ops.len() as u64));
                self.push_reg(&ops[0]);
                for op in &ops[1..] {
                    self.push_label(op);
                }
            }
            InsnCode::Ret => {
                assert_eq!(
                    ops.len(),
                    self.func.res_types().len(),
                    "{}: ret operand count does not match the result types",
                    self.func.name()
                );
                self.push_tag(Tag::Ret);
                self.push(Slot::from_u64(ops.len() as u64));
                for op in ops {
                    self.push_reg(op);
                }
            }
            InsnCode::LAddr => {
                self.push_tag(Tag::LAddr);
                self.push_reg(&ops[0]);
                self.push_label(&ops[1]);
            }
            InsnCode::VaArg => {
                let Operand::Mem(mem) = ops[2] else {
                    panic!("{}: va_arg type operand must be a memory operand", self.func.name());
                };
                self.push_tag(Tag::VaArg);
                self.push_reg(&ops[0]);
                self.push_reg(&ops[1]);
                self.push(Slot::from_u64(mem.ty.code()));
            }
            InsnCode::Invalid | InsnCode::Unspec | InsnCode::Use | InsnCode::Phi => {
                return Err(InterpError::InvalidInsn(format!(
                    "{}: {} cannot be executed",
                    self.func.name(),
                    insn.code
                ))
                .into());
            }
            code => self.generic(code, ops),
        }
        Ok(())
    }

    /// Tags whose operand words follow the IR operands one to one.
    fn generic(&mut self, code: InsnCode, ops: &[Operand]) {
        let tag = Tag::for_insn(code).unwrap_or_else(|| panic!("{code} has no executable tag"));
        assert_eq!(
            Some(ops.len()),
            code.arity(),
            "{}: {code} takes {:?} operands",
            self.func.name(),
            code.arity()
        );
        self.push_tag(tag);
        let is_branch = matches!(tag, Tag::Jmp | Tag::Bo | Tag::Ubo | Tag::Bno | Tag::Ubno) || is_cond_branch(tag);
        for (i, op) in ops.iter().enumerate() {
            if is_branch && i == 0 {
                self.push_label(op);
            } else {
                self.push_reg(op);
            }
        }
    }

    fn mov(&mut self, code: InsnCode, ops: &[Operand]) -> Result<()> {
        match (&ops[0], &ops[1]) {
            (Operand::Reg(dst), Operand::Reg(src)) => {
                let (dst_hard, src_hard) = (self.hard_reg(*dst), self.hard_reg(*src));
                match (dst_hard, src_hard) {
                    (None, None) => {
                        self.push_tag(Tag::for_insn(code).unwrap_or(Tag::Mov));
                        self.push_reg(&ops[0]);
                        self.push_reg(&ops[1]);
                    }
                    (Some(global), None) => {
                        self.push_tag(global_tag(code, true));
                        self.push(Slot::from_u64(global as u64));
                        self.push_reg(&ops[1]);
                    }
                    (None, Some(global)) => {
                        self.push_tag(global_tag(code, false));
                        self.push_reg(&ops[0]);
                        self.push(Slot::from_u64(global as u64));
                    }
                    (Some(_), Some(_)) => panic!("{}: move between two hardware registers", self.func.name()),
                }
            }
            (Operand::Reg(_), Operand::Mem(mem)) => {
                self.push_tag(load_tag(code, mem.ty));
                self.push_reg(&ops[0]);
                self.push_mem(mem);
            }
            (Operand::Mem(mem), Operand::Reg(_)) => {
                self.push_tag(store_tag(code, mem.ty));
                self.push_reg(&ops[1]);
                self.push_mem(mem);
            }
            (Operand::Reg(_), imm) => {
                let (tag, word) = match (code, imm) {
                    (InsnCode::Mov, Operand::Int(v)) => (Tag::Movi, Slot::from_i64(*v)),
                    (InsnCode::Mov, Operand::Uint(v)) => (Tag::Movi, Slot::from_u64(*v)),
                    (InsnCode::Mov, Operand::Ref(item)) => (Tag::Movp, Slot::from_addr(self.resolver.item_addr(*item)?)),
                    (InsnCode::FMov, Operand::Float(v)) => (Tag::Movf, Slot::from_f32(*v)),
                    (InsnCode::DMov, Operand::Double(v)) => (Tag::Movd, Slot::from_f64(*v)),
                    (InsnCode::LdMov, Operand::LDouble(v)) => (Tag::Movld, Slot::from_ld(*v)),
                    _ => panic!("{}: {code} cannot take immediate {imm}", self.func.name()),
                };
                self.push_tag(tag);
                self.push_reg(&ops[0]);
                self.push(word);
            }
            (dst, src) => panic!("{}: unsupported {code} operands {dst}, {src}", self.func.name()),
        }
        Ok(())
    }

    fn call(&mut self, code: InsnCode, ops: &[Operand]) -> Result<()> {
        let resolver = self.resolver;
        let proto = resolver.proto(&ops[0]);
        let nres = proto.res_types.len();
        assert!(ops.len() >= 2 + nres, "{}: call is missing result operands", self.func.name());
        let nargs = ops.len() - 2 - nres;
        assert!(
            nargs >= proto.args.len() && (proto.vararg || nargs == proto.args.len()),
            "{}: call to {} passes {nargs} arguments",
            self.func.name(),
            proto.name
        );

        let jcall = code == InsnCode::JCall;
        let (tag, callee) = match &ops[1] {
            Operand::Ref(item) => (
                if jcall { Tag::ImmJCall } else { Tag::ImmCall },
                Slot::from_addr(self.resolver.item_addr(*item)?),
            ),
            op @ Operand::Reg(_) => (if jcall { Tag::JCall } else { Tag::Call }, self.get_reg(op)),
            op => panic!("{}: call target must be a register or an item, got {op}", self.func.name()),
        };

        let mut args = Vec::with_capacity(nargs);
        for (i, op) in ops[2 + nres..].iter().enumerate() {
            let desc = if let Some(var) = proto.args.get(i) {
                ArgDesc::new(var.ty, var.size)
            } else {
                match op {
                    Operand::Mem(mem) => {
                        assert!(mem.ty.is_blk(), "{}: variadic memory argument must be a block", self.func.name());
                        ArgDesc::new(mem.ty, mem.disp as u64)
                    }
                    Operand::Reg(reg) => ArgDesc::scalar(match self.func.reg_type(*reg) {
                        Some(Type::F) => Type::F,
                        Some(Type::D) => Type::D,
                        Some(Type::LD) => Type::LD,
                        _ => Type::I64,
                    }),
                    op => panic!("{}: unsupported variadic argument {op}", self.func.name()),
                }
            };
            args.push(desc);
        }

        let site = self.call_sites.len();
        self.call_sites.push(CallSite {
            proto: match ops[0] {
                Operand::Ref(ItemRef::Proto(id)) => id,
                _ => unreachable!(),
            },
            res_types: proto.res_types.clone().into_boxed_slice(),
            args: args.into_boxed_slice(),
            nfixed: proto.args.len(),
            thunk: OnceCell::new(),
        });

        self.push_tag(tag);
        self.push(Slot::from_u64((2 + nres + nargs) as u64));
        self.push(Slot::from_u64(site as u64));
        self.push(callee);
        for op in &ops[2..2 + nres] {
            self.push_reg(op);
        }
        for op in &ops[2 + nres..] {
            match op {
                Operand::Mem(Mem { base: Some(base), .. }) => self.push_reg(&Operand::Reg(*base)),
                op => self.push_reg(op),
            }
        }
        Ok(())
    }
}

fn global_tag(code: InsnCode, to_global: bool) -> Tag {
    match (code, to_global) {
        (InsnCode::FMov, true) => Tag::FMovTg,
        (InsnCode::DMov, true) => Tag::DMovTg,
        (InsnCode::LdMov, true) => Tag::LdMovTg,
        (_, true) => Tag::MovTg,
        (InsnCode::FMov, false) => Tag::FMovFg,
        (InsnCode::DMov, false) => Tag::DMovFg,
        (InsnCode::LdMov, false) => Tag::LdMovFg,
        (_, false) => Tag::MovFg,
    }
}

fn load_tag(code: InsnCode, ty: Type) -> Tag {
    match (code, ty) {
        (InsnCode::Mov, Type::I8) => Tag::Ldi8,
        (InsnCode::Mov, Type::U8) => Tag::Ldu8,
        (InsnCode::Mov, Type::I16) => Tag::Ldi16,
        (InsnCode::Mov, Type::U16) => Tag::Ldu16,
        (InsnCode::Mov, Type::I32) => Tag::Ldi32,
        (InsnCode::Mov, Type::U32) => Tag::Ldu32,
        (InsnCode::Mov, Type::I64 | Type::U64 | Type::P) => Tag::Ldi64,
        (InsnCode::FMov, Type::F) => Tag::Ldf,
        (InsnCode::DMov, Type::D) => Tag::Ldd,
        (InsnCode::LdMov, Type::LD) => Tag::Ldld,
        _ => panic!("{code} cannot load a value of type {ty}"),
    }
}

fn store_tag(code: InsnCode, ty: Type) -> Tag {
    match (code, ty) {
        (InsnCode::Mov, Type::I8) => Tag::Sti8,
        (InsnCode::Mov, Type::U8) => Tag::Stu8,
        (InsnCode::Mov, Type::I16) => Tag::Sti16,
        (InsnCode::Mov, Type::U16) => Tag::Stu16,
        (InsnCode::Mov, Type::I32) => Tag::Sti32,
        (InsnCode::Mov, Type::U32) => Tag::Stu32,
        (InsnCode::Mov, Type::I64 | Type::U64 | Type::P) => Tag::Sti64,
        (InsnCode::FMov, Type::F) => Tag::Stf,
        (InsnCode::DMov, Type::D) => Tag::Std,
        (InsnCode::LdMov, Type::LD) => Tag::Stld,
        _ => panic!("{code} cannot store a value of type {ty}"),
    }
}
