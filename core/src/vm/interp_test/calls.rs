use super::*;

/// `f(a)` calls import `name` with one argument of `arg_ty` and returns its `res_ty` result.
fn import_call(name: &str, res_ty: Type, arg_ty: Type) -> Module {
    let mut module = Module::new("test");
    let import = module.add_import(name);
    let proto = module.add_proto(Proto::new("p", vec![res_ty], vec![Var::new("x", arg_ty)], false));
    let mut b = FuncBuilder::new("f", vec![Type::I64], vars(&["a"]));
    let a = b.arg(0);
    let r = b.reg("r", Type::I64);
    b.call(proto, ItemRef::Import(import), &[r], &[a.into()]).ret(&[r]);
    module.add_func(b.finish());
    module
}

#[test]
fn host_results_are_narrowed_to_the_prototype() {
    let module = import_call("wide", Type::I32, Type::I64);
    let out = run_both_with(&module, "f", &[Slot::from_i64(0)], |interp| {
        interp.register_host(
            "wide",
            1,
            host(|_, _, res| {
                res[0] = Slot::from_u64(0x1_FFFF_FFFF);
                Ok(())
            }),
        );
    })
    .unwrap();
    assert_eq!(out[0].i(), -1);
}

#[test]
fn host_arguments_are_narrowed_to_the_prototype() {
    let module = import_call("echo", Type::I64, Type::I8);
    let out = run_both_with(&module, "f", &[Slot::from_i64(0x1FF)], |interp| {
        interp.register_host(
            "echo",
            1,
            host(|_, args, res| {
                res[0] = args[0];
                Ok(())
            }),
        );
    })
    .unwrap();
    assert_eq!(out[0].i(), -1);
}

#[test]
fn host_errors_propagate_to_the_caller() {
    let module = import_call("boom", Type::I64, Type::I64);
    let err = run_both_with(&module, "f", &[Slot::ZERO], |interp| {
        interp.register_host("boom", 1, host(|_, _, _| Err(anyhow::anyhow!("host failed"))));
    })
    .unwrap_err();
    assert!(format!("{err:#}").contains("host failed"));
}

#[test]
fn result_count_mismatch_with_host_is_a_call_error() {
    let module = import_call("nothing", Type::I64, Type::I64);
    let err = run_both_with(&module, "f", &[Slot::ZERO], |interp| {
        interp.register_host("nothing", 0, host(|_, _, _| Ok(())));
    })
    .unwrap_err();
    assert_eq!(InterpError::kind_of(&err), ErrorKind::CallOp);
}

#[test]
fn imports_fall_back_to_module_functions() {
    let mut module = import_call("twice", Type::I64, Type::I64);
    let mut b = FuncBuilder::new("twice", vec![Type::I64], vars(&["x"]));
    let x = b.arg(0);
    let r = b.reg("r", Type::I64);
    b.binop(InsnCode::Add, r, x, x).ret(&[r]);
    module.add_func(b.finish());
    assert_eq!(run_i64(&module, &[21]), 42);
}

#[test]
fn host_can_reenter_the_interpreter() {
    let mut module = Module::new("test");
    let apply = module.add_import("apply");
    let proto = module.add_proto(Proto::new(
        "apply_p",
        vec![Type::I64],
        vec![Var::new("fn", Type::P), Var::new("x", Type::I64)],
        false,
    ));

    let mut b = FuncBuilder::new("square", vec![Type::I64], vars(&["x"]));
    let x = b.arg(0);
    let r = b.reg("r", Type::I64);
    b.binop(InsnCode::Mul, r, x, x).ret(&[r]);
    let square = module.add_func(b.finish());

    let mut b = FuncBuilder::new("f", vec![Type::I64], vars(&["a"]));
    let a = b.arg(0);
    let fp = b.reg("fp", Type::P);
    let r = b.reg("r", Type::I64);
    b.mov_ref(fp, ItemRef::Func(square))
        .call(proto, ItemRef::Import(apply), &[r], &[fp.into(), a.into()])
        .ret(&[r]);
    module.add_func(b.finish());

    let out = run_both_with(&module, "f", &[Slot::from_i64(9)], |interp| {
        interp.register_host(
            "apply",
            1,
            host(|interp, args, res| {
                let out = interp.call(args[0].addr(), &args[1..], 1)?;
                res[0] = Slot::from_i64(out[0].i() + 1);
                Ok(())
            }),
        );
    })
    .unwrap();
    assert_eq!(out[0].i(), 82);
}

#[test]
fn native_callers_reach_interpreted_functions() {
    let module = scenarios::find("add").unwrap().module();
    let mut interp = context(module, DispatchMode::Direct);
    let addr = interp.func_addr("add").unwrap();
    let out = interp.call(addr, &[Slot::from_i64(40), Slot::from_i64(2)], 1).unwrap();
    assert_eq!(out[0].i(), 42);

    let err = interp.call(addr, &[Slot::from_i64(1)], 1).unwrap_err();
    assert_eq!(InterpError::kind_of(&err), ErrorKind::CallOp);
}

#[test]
fn call_sites_converge_on_one_thunk() {
    let spec = scenarios::find("sum_squares").unwrap();
    let mut prepared = spec.prepare(InterpConfig::default()).unwrap();
    assert_eq!(prepared.run(&[10]).unwrap(), 385);

    let stats = prepared.interp().cache_stats();
    assert_eq!(stats.generated, 1);
    assert_eq!(stats.hits, 0);
    assert_eq!(stats.site_hits, 9);

    let cf = prepared.interp().compile(prepared.entry()).unwrap();
    assert!(cf.call_sites()[0].has_cached_thunk());
}

#[test]
fn sites_with_the_same_shape_share_the_cache_entry() {
    let mut module = Module::new("test");
    let import = module.add_import("inc");
    let proto = module.add_proto(Proto::new("p", vec![Type::I64], vars(&["x"]), false));
    let mut b = FuncBuilder::new("f", vec![Type::I64], vars(&["a"]));
    let a = b.arg(0);
    let r = b.reg("r", Type::I64);
    b.call(proto, ItemRef::Import(import), &[r], &[a.into()])
        .call(proto, ItemRef::Import(import), &[r], &[r.into()])
        .ret(&[r]);
    module.add_func(b.finish());

    let mut interp = context(module, DispatchMode::Indexed);
    interp.register_host(
        "inc",
        1,
        host(|_, args, res| {
            res[0] = Slot::from_i64(args[0].i() + 1);
            Ok(())
        }),
    );
    let out = interp.interp(FuncId(0), &[Slot::from_i64(1)]).unwrap();
    assert_eq!(out[0].i(), 3);
    let stats = interp.cache_stats();
    assert_eq!((stats.generated, stats.hits, stats.site_hits), (1, 1, 0));
}

#[test]
fn blocks_are_passed_by_value() {
    let mut module = Module::new("test");
    let blk = Var::block("b", Type::Blk(0), 16);
    let proto = module.add_proto(Proto::new("p", vec![Type::I64], vec![blk.clone()], false));

    let mut b = FuncBuilder::new("clobber", vec![Type::I64], vec![blk]);
    let p = b.arg(0);
    let v = b.reg("v", Type::I64);
    let junk = b.reg("junk", Type::I64);
    b.load(Type::I64, v, p).mov_i(junk, 99).store(Type::I64, p, junk).ret(&[v]);
    let clobber = module.add_func(b.finish());

    let mut b = FuncBuilder::new("f", vec![Type::I64], vars(&["a"]));
    let a = b.arg(0);
    let size = b.reg("size", Type::I64);
    let p = b.reg("p", Type::P);
    let got = b.reg("got", Type::I64);
    let after = b.reg("after", Type::I64);
    b.mov_i(size, 16)
        .emit(InsnCode::Alloca, [Operand::Reg(p), Operand::Reg(size)])
        .store(Type::I64, p, a)
        .call(proto, ItemRef::Func(clobber), &[got], &[Mem::block(Type::Blk(0), p, 16).into()])
        .load(Type::I64, after, p)
        .binop(InsnCode::Add, got, got, after)
        .ret(&[got]);
    module.add_func(b.finish());

    assert_eq!(run_i64(&module, &[7]), 14);
}

#[test]
fn float_in_variadic_position_is_rejected() {
    let mut module = Module::new("test");
    let import = module.add_import("printf_like");
    let proto = module.add_proto(Proto::new("p", vec![], vars(&["n"]), true));
    let mut b = FuncBuilder::new("f", vec![], vars(&["n"]));
    let n = b.arg(0);
    let x = b.reg("x", Type::F);
    b.emit(InsnCode::FMov, [Operand::Reg(x), Operand::Float(1.0)])
        .call(proto, ItemRef::Import(import), &[], &[n.into(), x.into()]);
    module.add_func(b.finish());

    let err = run_both_with(&module, "f", &[Slot::from_i64(1)], |interp| {
        interp.register_host("printf_like", 0, host(|_, _, _| Ok(())));
    })
    .unwrap_err();
    assert_eq!(InterpError::kind_of(&err), ErrorKind::CallOp);
}

#[test]
fn jcall_continues_at_the_label_from_jret() {
    let mut module = Module::new("test");
    let proto = module.add_proto(Proto::new("k", vec![], vec![Var::new("to", Type::P)], false));

    let mut b = FuncBuilder::new("bounce", vec![], vec![Var::new("to", Type::P)]);
    let to = b.arg(0);
    b.emit(InsnCode::JRet, [Operand::Reg(to)]);
    let bounce = module.add_func(b.finish());

    let mut b = FuncBuilder::new("f", vec![Type::I64], vec![]);
    let p = b.reg("p", Type::P);
    let r = b.reg("r", Type::I64);
    let resume = b.new_label();
    b.emit(InsnCode::LAddr, [Operand::Reg(p), Operand::Label(resume)])
        .call_with(InsnCode::JCall, proto, ItemRef::Func(bounce), &[], &[p.into()])
        .mov_i(r, 1)
        .ret(&[r]);
    b.bind(resume).mov_i(r, 2).ret(&[r]);
    module.add_func(b.finish());

    assert_eq!(run_i64(&module, &[]), 2);
}

#[test]
fn jret_into_a_foreign_function_is_unsupported() {
    let mut module = Module::new("test");
    let proto = module.add_proto(Proto::new("k", vec![], vec![], false));

    let mut b = FuncBuilder::new("bounce", vec![], vec![]);
    let p = b.reg("p", Type::P);
    let own = b.new_label();
    b.bind(own)
        .emit(InsnCode::LAddr, [Operand::Reg(p), Operand::Label(own)])
        .emit(InsnCode::JRet, [Operand::Reg(p)]);
    let bounce = module.add_func(b.finish());

    let mut b = FuncBuilder::new("f", vec![], vec![]);
    b.call_with(InsnCode::JCall, proto, ItemRef::Func(bounce), &[], &[]);
    module.add_func(b.finish());

    assert_eq!(err_kind(&module, &[]), ErrorKind::Unsupported);
}

#[test]
fn escaping_errors_reach_the_handler_once() {
    let module = import_call("missing", Type::I64, Type::I64);
    let mut interp = Interp::new(module).unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    interp.set_error_handler(move |kind, msg| sink.lock().unwrap().push((kind, msg.to_string())));

    assert!(interp.interp(FuncId(0), &[Slot::ZERO]).is_err());
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, ErrorKind::Link);
    assert!(seen[0].1.contains("missing"));
}

#[test]
fn scratch_buffers_track_the_widest_call() {
    let spec = scenarios::find("varsum").unwrap();
    let mut prepared = spec.prepare(InterpConfig::default()).unwrap();
    prepared.run(&[1, 2, 3]).unwrap();
    // one result plus four arguments
    assert_eq!(prepared.interp().scratch_high_water(), 5);
}

#[test]
fn reentrant_failures_are_reported_once() {
    let module = single(vec![Type::I64], vars(&["a", "b"]), |b| {
        let (x, y) = (b.arg(0), b.arg(1));
        let r = b.reg("r", Type::I64);
        b.binop(InsnCode::Div, r, x, y).ret(&[r]);
    });
    let mut interp = Interp::new(module).unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    interp.set_error_handler(move |kind, _| sink.lock().unwrap().push(kind));
    let divide = interp.register_host(
        "divide",
        1,
        host(|interp, args, res| {
            let out = interp.interp(FuncId(0), args)?;
            res[0] = out[0];
            Ok(())
        }),
    );

    let out = interp.call(divide, &[Slot::from_i64(12), Slot::from_i64(4)], 1).unwrap();
    assert_eq!(out[0].i(), 3);
    assert!(seen.lock().unwrap().is_empty());

    let err = interp.call(divide, &[Slot::from_i64(1), Slot::ZERO], 1).unwrap_err();
    assert_eq!(InterpError::kind_of(&err), ErrorKind::DivisionByZero);
    assert_eq!(*seen.lock().unwrap(), vec![ErrorKind::DivisionByZero]);

    assert!(interp.interp(FuncId(0), &[Slot::from_i64(1), Slot::ZERO]).is_err());
    assert_eq!(seen.lock().unwrap().len(), 2);
}
