use anyhow::Result;

use crate::ir::Type;
use crate::vm::alloc::Memory;
use crate::vm::error::InterpError;
use crate::vm::slot::{Addr, Slot};

/// Number of global slots backing hardware-tied registers.
pub const GLOBAL_SLOTS: usize = 32;

/// Spill area of an activation's variadic arguments, `[start, end)` in interpreter memory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VaArea {
    pub start: u64,
    pub end: u64,
}

/// Target hooks used by the block-stack and variadic instructions, plus hardware register
/// numbering for the global slot file.
pub trait TargetAbi: Send + Sync {
    fn name(&self) -> &'static str;

    /// Global slot index of a hardware register, `None` if the target has no such register.
    fn hard_reg(&self, name: &str) -> Option<usize>;

    fn bstart(&self, mem: &mut Memory) -> Result<Addr>;
    fn bend(&self, mem: &mut Memory, mark: Addr) -> Result<()>;

    /// Lays out the variadic tail of an incoming call.
    fn spill_varargs(&self, mem: &mut Memory, values: &[Slot]) -> Result<VaArea>;

    fn va_start(&self, mem: &mut Memory, va_list: Addr, area: VaArea) -> Result<()>;
    /// Address of the next variadic argument of type `ty`; advances the list.
    fn va_arg(&self, mem: &mut Memory, va_list: Addr, ty: Type) -> Result<Addr>;
    fn va_block_arg(&self, mem: &mut Memory, dst: Addr, va_list: Addr, size: u64, case: u64) -> Result<()>;
    fn va_end(&self, mem: &mut Memory, va_list: Addr) -> Result<()>;
}

const GPR_NAMES: [&str; 16] = [
    "rax", "rcx", "rdx", "rbx", "rsp", "rbp", "rsi", "rdi", "r8", "r9", "r10", "r11", "r12", "r13", "r14", "r15",
];
const VA_SLOT: u64 = 8;

/// ABI over the interpreter's own memory model.
///
/// Variadic arguments are spilled as consecutive 8-byte slots; a `va_list` is two words, the
/// next slot and the end of the area. Blocks passed variadically travel as the address of the
/// block.
#[derive(Debug, Clone, Copy, Default)]
pub struct PortableAbi;

impl TargetAbi for PortableAbi {
    fn name(&self) -> &'static str {
        "portable-x86_64"
    }

    fn hard_reg(&self, name: &str) -> Option<usize> {
        if let Some(idx) = GPR_NAMES.iter().position(|gpr| *gpr == name) {
            return Some(idx);
        }
        let n: usize = name.strip_prefix("xmm")?.parse().ok()?;
        (n < 16).then_some(GPR_NAMES.len() + n)
    }

    fn bstart(&self, mem: &mut Memory) -> Result<Addr> {
        Ok(mem.stack_top())
    }

    fn bend(&self, mem: &mut Memory, mark: Addr) -> Result<()> {
        mem.set_stack_top(mark)
    }

    fn spill_varargs(&self, mem: &mut Memory, values: &[Slot]) -> Result<VaArea> {
        if values.is_empty() {
            return Ok(VaArea::default());
        }
        let start = mem.alloca(values.len() as u64 * VA_SLOT)?.bits();
        for (i, v) in values.iter().enumerate() {
            mem.write_u64(start + i as u64 * VA_SLOT, v.u())?;
        }
        Ok(VaArea {
            start,
            end: start + values.len() as u64 * VA_SLOT,
        })
    }

    fn va_start(&self, mem: &mut Memory, va_list: Addr, area: VaArea) -> Result<()> {
        mem.write_u64(va_list.bits(), area.start)?;
        mem.write_u64(va_list.bits() + 8, area.end)
    }

    fn va_arg(&self, mem: &mut Memory, va_list: Addr, ty: Type) -> Result<Addr> {
        if ty == Type::F {
            return Err(InterpError::CallOp("float values are promoted to double in variadic calls".into()).into());
        }
        let next = mem.read_u64(va_list.bits())?;
        let end = mem.read_u64(va_list.bits() + 8)?;
        if next == 0 || next + VA_SLOT > end {
            return Err(InterpError::CallOp("va_arg read past the last variadic argument".into()).into());
        }
        mem.write_u64(va_list.bits(), next + VA_SLOT)?;
        Ok(Addr::mem(next))
    }

    fn va_block_arg(&self, mem: &mut Memory, dst: Addr, va_list: Addr, size: u64, _case: u64) -> Result<()> {
        let slot = self.va_arg(mem, va_list, Type::P)?;
        let src = mem.read_u64(slot.bits())?;
        mem.copy(dst.bits(), src, size as usize)
    }

    fn va_end(&self, _mem: &mut Memory, _va_list: Addr) -> Result<()> {
        Ok(())
    }
}
