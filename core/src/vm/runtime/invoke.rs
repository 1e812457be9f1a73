use anyhow::Result;
use tracing::trace;

use super::{Flow, Machine};
use crate::ir::Type;
use crate::vm::bytecode::CallSite;
use crate::vm::error::InterpError;
use crate::vm::ffi::Thunk;
use crate::vm::ffi::marshal::coerce;
use crate::vm::setjmp;
use crate::vm::slot::{AddrKind, Slot};

/// Word offsets inside a compiled call: `[tag, n, site, callee, results.., args..]`.
const SITE: usize = 2;
const CALLEE: usize = 3;
const OPERANDS: usize = 4;

/// Executes a call instruction at `pc`.
///
/// `imm` selects an immediate callee word over a callee register; `jcall` continues at the
/// label recorded by the callee's `jret` instead of after the call.
pub(super) fn call(m: &mut Machine<'_>, pc: usize, imm: bool, jcall: bool) -> Result<Flow> {
    let next = pc + 2 + m.word(pc + 1).index();
    let callee = if imm {
        m.word(pc + CALLEE).addr()
    } else {
        m.get(pc + CALLEE).addr()
    };

    if callee == m.interp.setjmp_addr {
        if jcall {
            return Err(InterpError::InvalidInsn("setjmp cannot be reached through jcall".into()).into());
        }
        return setjmp::enter(m, pc, next);
    }

    let cf = m.cf;
    let site = &cf.call_sites[m.word(pc + SITE).index()];
    let thunk = site_thunk(m, site)?;
    let nres = site.nres();
    let nargs = site.nargs();
    let res_at = pc + OPERANDS;
    let args_at = res_at + nres;

    let mut buf = m.interp.scratch.take(nres + nargs);
    for i in 0..nargs {
        let v = m.get(args_at + i);
        buf[nres + i] = if i < site.nfixed { coerce(v, site.args[i].ty) } else { v };
    }
    trace!(target: "mir::interp::ffi", caller = %m.cf.name, callee = ?callee, nargs, "call");
    let outcome = thunk(&mut *m.interp, callee, &mut buf);
    if outcome.is_ok() {
        for i in 0..nres {
            let v = coerce(buf[i], site.res_types[i]);
            m.set(res_at + i, v);
        }
    }
    m.interp.scratch.give_back(buf);
    outcome?;

    if !jcall {
        return Ok(Flow::Next(next));
    }
    match m.interp.jret_addr.kind() {
        AddrKind::Label { func, offset } if func == cf.func && cf.is_label(offset) => Ok(Flow::Next(offset)),
        other => Err(InterpError::Unsupported(format!(
            "jcall in {} continued at {other:?}, outside the calling function",
            m.cf.name
        ))
        .into()),
    }
}

/// Thunk for `site`: the site's reserved slot when filled, otherwise the interface cache.
fn site_thunk(m: &mut Machine<'_>, site: &CallSite) -> Result<Thunk> {
    if let Some(thunk) = site.thunk.get() {
        m.interp.ffi.note_site_hit();
        return Ok(thunk.clone());
    }
    if let Some(arg) = site.args[site.nfixed..].iter().find(|arg| arg.ty == Type::F) {
        return Err(InterpError::CallOp(format!(
            "variadic argument of type {} must be promoted to double",
            arg.ty
        ))
        .into());
    }
    let shape = site.shape();
    let thunk = m.interp.interface(&shape)?;
    let _ = site.thunk.set(thunk.clone());
    Ok(thunk)
}

/// Stores `value` into the first result register of the call at `pc`, if it has one.
pub(crate) fn write_first_result(m: &mut Machine<'_>, pc: usize, value: Slot) {
    let cf = m.cf;
    let site = &cf.call_sites[m.word(pc + SITE).index()];
    if site.nres() > 0 {
        m.set(pc + OPERANDS, coerce(value, site.res_types[0]));
    }
}

/// First argument register value of the call at `pc`.
pub(crate) fn first_arg(m: &Machine<'_>, pc: usize) -> Option<Slot> {
    let site = &m.cf.call_sites[m.word(pc + SITE).index()];
    (site.nargs() > 0).then(|| m.get(pc + OPERANDS + site.nres()))
}
