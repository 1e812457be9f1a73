use super::*;

#[test]
fn every_scenario_agrees_across_dispatch_modes() {
    for spec in scenarios::all() {
        let module = spec.module();
        let args: Vec<Slot> = spec.default_args.iter().copied().map(Slot::from_i64).collect();
        let setup = |interp: &mut Interp| {
            if spec.key == "sum_squares" {
                interp.register_host(
                    "square",
                    1,
                    host(|_, args, res| {
                        res[0] = Slot::from_i64(args[0].i() * args[0].i());
                        Ok(())
                    }),
                );
            }
        };
        let out = run_both_with(&module, spec.entry, &args, setup).unwrap();
        assert_eq!(out[0].i(), spec.reference(spec.default_args), "{}", spec.key);
    }
}

#[test]
fn handlers_are_resolved_on_first_direct_run() {
    let module = scenarios::find("fib").unwrap().module();

    let mut indexed = context(module.clone(), DispatchMode::Indexed);
    indexed.interp(FuncId(0), &[Slot::from_i64(5)]).unwrap();
    assert!(!indexed.compile(FuncId(0)).unwrap().is_threaded());

    let mut direct = context(module, DispatchMode::Direct);
    assert!(!direct.compile(FuncId(0)).unwrap().is_threaded());
    direct.interp(FuncId(0), &[Slot::from_i64(5)]).unwrap();
    assert!(direct.compile(FuncId(0)).unwrap().is_threaded());
}

#[test]
fn tracing_does_not_change_results() {
    let module = scenarios::find("sum_to").unwrap().module();
    for mode in MODES {
        let config = InterpConfig::default().with_dispatch(mode).with_trace(true);
        let mut interp = Interp::with_config(module.clone(), config).unwrap();
        let out = interp.interp(FuncId(0), &[Slot::from_i64(10)]).unwrap();
        assert_eq!(out[0].i(), 55);
    }
}

#[test]
fn contexts_do_not_share_state() {
    let spec = scenarios::find("sum_squares").unwrap();
    let mut a = spec.prepare(InterpConfig::default()).unwrap();
    let mut b = spec.prepare(InterpConfig::default().with_dispatch(DispatchMode::Indexed)).unwrap();
    a.run(&[4]).unwrap();
    assert_eq!(b.interp().cache_stats().generated, 0);
    b.run(&[4]).unwrap();
    assert_eq!(a.interp().cache_stats(), b.interp().cache_stats());
}
