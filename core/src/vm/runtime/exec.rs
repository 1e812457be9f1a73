use anyhow::Result;

use super::{Machine, dispatch};
use crate::ir::FuncId;
use crate::vm::context::Interp;
use crate::vm::error::InterpError;
use crate::vm::slot::Slot;

impl Interp {
    /// Runs one activation of `func`.
    ///
    /// `fixed` fills registers `1..` (extra values beyond the frame are dropped), `varargs` is
    /// spilled through the target ABI for `va_start`. Stack storage allocated by the activation
    /// is released when it returns, whether normally or with an error.
    pub(crate) fn run_function(
        &mut self,
        func: FuncId,
        fixed: &[Slot],
        varargs: &[Slot],
        results: &mut [Slot],
    ) -> Result<()> {
        let cf = self.compile(func)?;
        if self.depth >= self.config.max_call_depth {
            return Err(InterpError::CallDepth(self.config.max_call_depth).into());
        }

        self.depth += 1;
        let mark = self.memory.stack_mark();
        let mut frame = self.frames.acquire(cf.nregs);
        let outcome = (|| {
            let n = fixed.len().min(cf.nregs.saturating_sub(1));
            frame.regs[1..=n].copy_from_slice(&fixed[..n]);
            if !varargs.is_empty() {
                frame.va = self.abi.spill_varargs(&mut self.memory, varargs)?;
            }
            let mode = self.config.dispatch;
            let trace = self.config.trace;
            let mut m = Machine {
                interp: &mut *self,
                cf: &cf,
                code: &cf.code,
                frame: &mut frame,
                results: &mut *results,
                signed_overflow: false,
                unsigned_overflow: false,
            };
            dispatch::run(&mut m, mode, trace)
        })();
        self.frames.release(frame);
        self.memory.release(mark);
        self.depth -= 1;
        outcome
    }
}
