use anyhow::Result;

use super::marshal::coerce;
use super::thunk::EntrySignature;
use crate::ir::{FuncId, Type};
use crate::vm::context::Interp;
use crate::vm::error::InterpError;
use crate::vm::slot::Slot;

/// Converts native arguments into frame slots and runs `func`.
///
/// Named arguments are re-normalized to their declared types. By-value blocks arrive as the
/// address of the caller's copy and are duplicated onto the stack so the callee owns its block.
/// Whatever follows the named arguments is handed to the activation as its variadic tail.
pub(crate) fn enter_interpreted(
    interp: &mut Interp,
    func: FuncId,
    sig: &EntrySignature,
    raw: &[Slot],
    results: &mut [Slot],
) -> Result<()> {
    let nfixed = sig.args.len();
    if raw.len() < nfixed || (!sig.vararg && raw.len() > nfixed) {
        return Err(InterpError::CallOp(format!(
            "{} expects {nfixed}{} arguments, got {}",
            sig.name,
            if sig.vararg { " or more" } else { "" },
            raw.len()
        ))
        .into());
    }
    if results.len() != sig.res_types.len() {
        return Err(InterpError::CallOp(format!(
            "{} returns {} values, caller expects {}",
            sig.name,
            sig.res_types.len(),
            results.len()
        ))
        .into());
    }

    let mark = interp.memory.stack_mark();
    let mut fixed = interp.scratch.take(nfixed);
    let outcome = (|| {
        for (i, var) in sig.args.iter().enumerate() {
            fixed[i] = if matches!(var.ty, Type::Blk(_)) {
                let copy = interp.memory.alloca(var.size)?;
                interp.memory.copy(copy.bits(), raw[i].u(), var.size as usize)?;
                Slot::from_addr(copy)
            } else {
                coerce(raw[i], var.ty)
            };
        }
        interp.run_function(func, &fixed, &raw[nfixed..], results)
    })();
    interp.scratch.give_back(fixed);
    interp.memory.release(mark);
    outcome?;

    for (slot, ty) in results.iter_mut().zip(&sig.res_types) {
        *slot = coerce(*slot, *ty);
    }
    Ok(())
}
