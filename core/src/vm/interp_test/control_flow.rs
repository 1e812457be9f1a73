use super::*;

#[test]
fn counting_loop_terminates() {
    let spec = scenarios::find("sum_to").unwrap();
    let module = spec.module();
    for n in [0, 1, 1000] {
        let out = run_both(&module, "sum_to", &[Slot::from_i64(n)]).unwrap();
        assert_eq!(out[0].i(), spec.reference(&[n]));
    }
}

#[test]
fn truth_branches_test_the_whole_word() {
    let module = single(vec![Type::I64], vars(&["a"]), |b| {
        let a = b.arg(0);
        let r = b.reg("r", Type::I64);
        let yes = b.new_label();
        b.emit(InsnCode::Bt, [Operand::Label(yes), Operand::Reg(a)])
            .mov_i(r, 0)
            .ret(&[r]);
        b.bind(yes).mov_i(r, 1).ret(&[r]);
    });
    assert_eq!(run_i64(&module, &[0]), 0);
    assert_eq!(run_i64(&module, &[0x1_0000_0000]), 1);
}

fn switch_module() -> Module {
    single(vec![Type::I64], vars(&["idx"]), |b| {
        let idx = b.arg(0);
        let r = b.reg("r", Type::I64);
        let targets = [b.new_label(), b.new_label(), b.new_label()];
        let mut ops = vec![Operand::Reg(idx)];
        ops.extend(targets.iter().map(|l| Operand::Label(*l)));
        b.emit(InsnCode::Switch, ops);
        for (i, label) in targets.into_iter().enumerate() {
            b.bind(label).mov_i(r, (i as i64 + 1) * 10).ret(&[r]);
        }
    })
}

#[test]
fn switch_selects_by_index() {
    let module = switch_module();
    assert_eq!(run_i64(&module, &[0]), 10);
    assert_eq!(run_i64(&module, &[2]), 30);
}

#[test]
fn switch_index_out_of_range_is_rejected() {
    assert_eq!(err_kind(&switch_module(), &[3]), ErrorKind::InvalidInsn);
    assert_eq!(err_kind(&switch_module(), &[-1]), ErrorKind::InvalidInsn);
}

#[test]
fn indirect_jump_to_label_address() {
    let module = single(vec![Type::I64], vec![], |b| {
        let p = b.reg("p", Type::P);
        let r = b.reg("r", Type::I64);
        let there = b.new_label();
        b.emit(InsnCode::LAddr, [Operand::Reg(p), Operand::Label(there)])
            .emit(InsnCode::JmpI, [Operand::Reg(p)])
            .mov_i(r, 1)
            .ret(&[r]);
        b.bind(there).mov_i(r, 2).ret(&[r]);
    });
    assert_eq!(run_i64(&module, &[]), 2);
}

#[test]
fn indirect_jump_to_plain_address_is_invalid() {
    let module = single(vec![], vars(&["p"]), |b| {
        let p = b.arg(0);
        b.emit(InsnCode::JmpI, [Operand::Reg(p)]);
    });
    assert_eq!(err_kind(&module, &[0x1_0000]), ErrorKind::InvalidInsn);
}

#[test]
fn indirect_jump_into_another_function_is_unsupported() {
    let mut module = Module::new("test");
    let proto = module.add_proto(Proto::new("g_p", vec![Type::P], vec![], false));

    let mut g = FuncBuilder::new("g", vec![Type::P], vec![]);
    let p = g.reg("p", Type::P);
    let inside = g.new_label();
    g.emit(InsnCode::LAddr, [Operand::Reg(p), Operand::Label(inside)]).ret(&[p]);
    g.bind(inside).ret(&[p]);
    let gid = module.add_func(g.finish());

    let mut f = FuncBuilder::new("f", vec![], vec![]);
    let q = f.reg("q", Type::P);
    f.call(proto, ItemRef::Func(gid), &[q], &[])
        .emit(InsnCode::JmpI, [Operand::Reg(q)]);
    module.add_func(f.finish());

    assert_eq!(err_kind(&module, &[]), ErrorKind::Unsupported);
}

#[test]
fn recursion_through_immediate_calls() {
    let spec = scenarios::find("fib").unwrap();
    let out = run_both(&spec.module(), "fib", &[Slot::from_i64(15)]).unwrap();
    assert_eq!(out[0].i(), 610);
}

#[test]
fn runaway_recursion_hits_the_depth_limit() {
    let mut module = Module::new("test");
    let proto = module.add_proto(Proto::new("f_p", vec![], vec![], false));
    let mut b = FuncBuilder::new("f", vec![], vec![]);
    b.call(proto, ItemRef::Func(FuncId(0)), &[], &[]);
    module.add_func(b.finish());

    let config = InterpConfig {
        max_call_depth: 16,
        ..InterpConfig::default()
    };
    let mut interp = Interp::with_config(module, config).unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    interp.set_error_handler(move |kind, _| sink.lock().unwrap().push(kind));

    let err = interp.interp(FuncId(0), &[]).unwrap_err();
    assert_eq!(InterpError::kind_of(&err), ErrorKind::CallDepth);
    // reported once, by the outermost entry
    assert_eq!(*seen.lock().unwrap(), vec![ErrorKind::CallDepth]);
    assert_eq!(interp.memory().stack_mark(), 0);
}

#[test]
fn falling_off_the_end_returns_zeroed_results() {
    let module = single(vec![Type::I64], vars(&["a"]), |b| {
        let a = b.arg(0);
        let r = b.reg("r", Type::I64);
        b.binop(InsnCode::Add, r, a, a);
    });
    assert_eq!(run_i64(&module, &[21]), 0);
}
