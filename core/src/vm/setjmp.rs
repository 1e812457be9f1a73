//! `setjmp`/`longjmp` support.
//!
//! A C `setjmp` must return twice into the same frame, which a native call made through a
//! thunk cannot do for an interpreted caller. Calls whose callee is the `setjmp` primitive are
//! therefore executed in place by the call bridge: the jump buffer is bound to the current
//! activation and the call position. `longjmp` unwinds as an error until it reaches that
//! activation, which resumes right after the recorded call.

use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::ir::FuncId;
use crate::vm::context::Interp;
use crate::vm::error::{InterpError, LongJump};
use crate::vm::runtime::{Flow, Machine, first_arg, write_first_result};
use crate::vm::slot::{Addr, Slot};

pub const SETJMP: &str = "setjmp";
pub const LONGJMP: &str = "longjmp";

/// Resume point bound to a jump buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct JmpTarget {
    pub depth: usize,
    pub func: FuncId,
    pub pc: usize,
}

/// Registers both primitives and returns the address of `setjmp`.
pub(crate) fn install(interp: &mut Interp) -> Addr {
    let setjmp = interp.register_host(
        SETJMP,
        1,
        Arc::new(|_: &mut Interp, _: &[Slot], _: &mut [Slot]| {
            Err(InterpError::CallOp("setjmp must be called directly from interpreted code".into()).into())
        }),
    );
    interp.register_host(
        LONGJMP,
        0,
        Arc::new(|interp: &mut Interp, args: &[Slot], _: &mut [Slot]| {
            let [buf, value, ..] = args else {
                return Err(InterpError::CallOp("longjmp expects a buffer and a value".into()).into());
            };
            let token = interp.memory.read_u64(buf.u())?;
            Err(LongJump {
                token,
                value: value.i(),
            }
            .into())
        }),
    );
    setjmp
}

/// In-place execution of a `setjmp` call at `pc`.
pub(crate) fn enter(m: &mut Machine<'_>, pc: usize, next: usize) -> Result<Flow> {
    let buf = first_arg(m, pc).ok_or_else(|| InterpError::CallOp("setjmp called without a buffer".into()))?;
    let target = JmpTarget {
        depth: m.interp.depth,
        func: m.cf.func,
        pc,
    };
    let token = m.interp.bind_jmp_target(target);
    m.interp.memory.write_u64(buf.u(), token)?;
    debug!(target: "mir::interp::ffi", func = %m.cf.name, pc, token, "setjmp");

    write_first_result(m, pc, Slot::ZERO);
    Ok(Flow::Next(next))
}

/// Consumes `err` if it is a `longjmp` aimed at this activation and returns the offset to
/// resume at; any other error is passed through.
pub(crate) fn catch(m: &mut Machine<'_>, err: anyhow::Error) -> Result<usize> {
    let Some(jump) = err.downcast_ref::<LongJump>().copied() else {
        return Err(err);
    };
    match m.interp.jmp_target(jump.token) {
        Some(target) if target.depth == m.interp.depth && target.func == m.cf.func => {
            let value = if jump.value == 0 { 1 } else { jump.value };
            write_first_result(m, target.pc, Slot::from_i64(value));
            debug!(target: "mir::interp::ffi", func = %m.cf.name, pc = target.pc, value, "longjmp landed");
            Ok(target.pc + 2 + m.code[target.pc + 1].index())
        }
        Some(_) => Err(err),
        None => Err(InterpError::InvalidInsn(format!("longjmp through unbound buffer #{}", jump.token)).into()),
    }
}
