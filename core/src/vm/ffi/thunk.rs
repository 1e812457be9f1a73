use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use super::entry::enter_interpreted;
use super::shape::CallShape;
use crate::ir::{FuncId, Type, Var};
use crate::vm::context::Interp;
use crate::vm::error::InterpError;
use crate::vm::slot::{Addr, Slot};

/// Interp→native call thunk. The buffer holds the result slots first, then the arguments.
pub type Thunk = Arc<dyn Fn(&mut Interp, Addr, &mut [Slot]) -> Result<()> + Send + Sync>;

/// Native→interp entry: `(context, native args, results)`.
pub type EntryShim = Arc<dyn Fn(&mut Interp, &[Slot], &mut [Slot]) -> Result<()> + Send + Sync>;

/// Native-facing signature of an interpreted function.
#[derive(Debug, Clone, PartialEq)]
pub struct EntrySignature {
    pub name: Arc<str>,
    pub res_types: Vec<Type>,
    pub args: Vec<Var>,
    pub vararg: bool,
}

/// Producer of the machine-level glue between interpreted frames and native calls.
///
/// The interpreter core only relies on this contract; how a generator realizes it (portable
/// closures, emitted machine code) is its own business.
pub trait ThunkGenerator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Thunk performing a native call of the given shape through any callee address.
    fn call_thunk(&self, shape: &CallShape) -> Result<Thunk>;

    /// Entry that accepts native arguments and runs `func` in the interpreter.
    fn entry_shim(&self, func: FuncId, sig: EntrySignature) -> Result<EntryShim>;
}

/// Generator that realizes thunks as closures over the context's own call routing.
#[derive(Debug, Clone, Copy, Default)]
pub struct PortableThunks;

impl ThunkGenerator for PortableThunks {
    fn name(&self) -> &'static str {
        "portable"
    }

    fn call_thunk(&self, shape: &CallShape) -> Result<Thunk> {
        if let Some(ty) = shape.results.iter().find(|ty| ty.is_blk() || **ty == Type::Undef) {
            return Err(InterpError::CallOp(format!("result type {ty} cannot be returned in registers")).into());
        }
        if let Some(arg) = shape.args.iter().find(|arg| arg.ty == Type::Undef) {
            return Err(InterpError::CallOp(format!("argument type {} has no native layout", arg.ty)).into());
        }
        let nres = shape.nres();
        let expected = shape.nargs();
        Ok(Arc::new(move |interp: &mut Interp, callee: Addr, buf: &mut [Slot]| {
            debug_assert_eq!(buf.len(), nres + expected);
            let (results, args) = buf.split_at_mut(nres);
            interp.call_native(callee, args, results)
        }))
    }

    fn entry_shim(&self, func: FuncId, sig: EntrySignature) -> Result<EntryShim> {
        debug!(target: "mir::interp::ffi", func = %sig.name, nargs = sig.args.len(), vararg = sig.vararg, "entry shim");
        let sig = Arc::new(sig);
        Ok(Arc::new(move |interp: &mut Interp, args: &[Slot], results: &mut [Slot]| {
            enter_interpreted(interp, func, &sig, args, results)
        }))
    }
}
