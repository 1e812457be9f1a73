//! Execution engine: activations, the dispatch loops and the per-opcode semantics.

mod dispatch;
mod exec;
mod frame;
mod invoke;
mod math;
mod opcode;
mod pools;

use anyhow::Result;

use crate::vm::bytecode::CompiledFunc;
use crate::vm::context::Interp;
use crate::vm::slot::Slot;

pub(crate) use dispatch::DispatchTable;
pub(crate) use frame::Frame;
pub(crate) use invoke::{first_arg, write_first_result};
pub(crate) use pools::{FramePool, ScratchPool};

/// Handler stored in a resolved opcode slot for direct dispatch.
pub(crate) type Handler = fn(&mut Machine<'_>, usize) -> Result<Flow>;

/// Outcome of one executed instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Next(usize),
    Return,
}

/// State of a single activation while its instruction array executes.
pub(crate) struct Machine<'a> {
    pub interp: &'a mut Interp,
    pub cf: &'a CompiledFunc,
    pub code: &'a [Slot],
    pub frame: &'a mut Frame,
    pub results: &'a mut [Slot],
    pub signed_overflow: bool,
    pub unsigned_overflow: bool,
}

impl Machine<'_> {
    #[inline(always)]
    pub fn word(&self, at: usize) -> Slot {
        self.code[at]
    }

    /// Register named by the operand word at `at`.
    #[inline(always)]
    pub fn get(&self, at: usize) -> Slot {
        self.frame.regs[self.code[at].index()]
    }

    #[inline(always)]
    pub fn set(&mut self, at: usize, v: Slot) {
        let idx = self.code[at].index();
        self.frame.regs[idx] = v;
    }

    #[inline(always)]
    pub fn target(&self, at: usize) -> usize {
        self.code[at].index()
    }
}
