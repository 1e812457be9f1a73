pub(super) use std::sync::{Arc, Mutex};

pub(super) use anyhow::Result;

pub(super) use crate::ir::{FuncBuilder, FuncId, InsnCode, ItemRef, Mem, Module, Operand, Proto, Type, Var};
pub(super) use crate::perf::scenarios;
pub(super) use crate::vm::{DispatchMode, ErrorKind, Interp, InterpConfig, InterpError, Slot};

pub(super) const MODES: [DispatchMode; 2] = [DispatchMode::Direct, DispatchMode::Indexed];

pub(super) fn vars(names: &[&str]) -> Vec<Var> {
    names.iter().map(|name| Var::new(*name, Type::I64)).collect()
}

/// Module holding one function named `f`.
pub(super) fn single(res: Vec<Type>, args: Vec<Var>, build: impl FnOnce(&mut FuncBuilder)) -> Module {
    let mut module = Module::new("test");
    let mut b = FuncBuilder::new("f", res, args);
    build(&mut b);
    module.add_func(b.finish());
    module
}

pub(super) fn context(module: Module, mode: DispatchMode) -> Interp {
    let mut interp = Interp::with_config(module, InterpConfig::default().with_dispatch(mode)).unwrap();
    interp.set_error_handler(|_, _| {});
    interp
}

/// Runs `entry` once per dispatch mode, each in a fresh context, and checks both agree.
pub(super) fn run_both_with(
    module: &Module,
    entry: &str,
    args: &[Slot],
    setup: impl Fn(&mut Interp),
) -> Result<Vec<Slot>> {
    let mut outcomes = Vec::new();
    for mode in MODES {
        let mut interp = context(module.clone(), mode);
        setup(&mut interp);
        let id = interp.module().find_func(entry).unwrap();
        outcomes.push(interp.interp(id, args));
    }
    let indexed = outcomes.pop().unwrap();
    let direct = outcomes.pop().unwrap();
    match (&direct, &indexed) {
        (Ok(a), Ok(b)) => assert_eq!(a, b, "dispatch modes disagree"),
        (Err(a), Err(b)) => assert_eq!(InterpError::kind_of(a), InterpError::kind_of(b)),
        _ => panic!("dispatch modes disagree: {direct:?} vs {indexed:?}"),
    }
    direct
}

pub(super) fn run_both(module: &Module, entry: &str, args: &[Slot]) -> Result<Vec<Slot>> {
    run_both_with(module, entry, args, |_| {})
}

pub(super) fn run_i64(module: &Module, args: &[i64]) -> i64 {
    let slots: Vec<Slot> = args.iter().copied().map(Slot::from_i64).collect();
    run_both(module, "f", &slots).unwrap()[0].i()
}

pub(super) fn err_kind(module: &Module, args: &[i64]) -> ErrorKind {
    let slots: Vec<Slot> = args.iter().copied().map(Slot::from_i64).collect();
    let err = run_both(module, "f", &slots).unwrap_err();
    InterpError::kind_of(&err)
}

pub(super) fn host(
    f: impl Fn(&mut Interp, &[Slot], &mut [Slot]) -> Result<()> + Send + Sync + 'static,
) -> crate::vm::HostFn {
    Arc::new(f)
}

mod arithmetic;
mod calls;
mod control_flow;
mod dispatch;
mod memory;
mod varargs;
