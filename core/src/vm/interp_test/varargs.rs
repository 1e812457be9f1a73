use super::*;

fn varsum() -> Module {
    scenarios::find("varsum").unwrap().module()
}

fn ints(values: &[i64]) -> Vec<Slot> {
    values.iter().copied().map(Slot::from_i64).collect()
}

#[test]
fn variadic_call_between_interpreted_functions() {
    let module = varsum();
    assert_eq!(run_both(&module, "main", &ints(&[1, 2, 3])).unwrap()[0].i(), 6);
    assert_eq!(run_both(&module, "main", &ints(&[-5, 0, 5])).unwrap()[0].i(), 0);
}

#[test]
fn extra_entry_arguments_form_the_variadic_tail() {
    let module = varsum();
    assert_eq!(run_both(&module, "vsum", &ints(&[2, 10, 20])).unwrap()[0].i(), 30);
    assert_eq!(run_both(&module, "vsum", &ints(&[0])).unwrap()[0].i(), 0);
}

#[test]
fn native_callers_may_pass_variadic_arguments() {
    let mut interp = context(varsum(), DispatchMode::Direct);
    let addr = interp.func_addr("vsum").unwrap();
    let out = interp.call(addr, &ints(&[2, 4, 5]), 1).unwrap();
    assert_eq!(out[0].i(), 9);
}

#[test]
fn reading_past_the_last_argument_is_a_call_error() {
    let err = run_both(&varsum(), "vsum", &ints(&[3, 1, 2])).unwrap_err();
    assert_eq!(InterpError::kind_of(&err), ErrorKind::CallOp);
}

#[test]
fn doubles_travel_through_variadic_slots() {
    let mut module = Module::new("test");
    let mut b = FuncBuilder::new_vararg("f", vec![Type::D], vars(&["n"]));
    let n = b.arg(0);
    let va = b.reg("va", Type::P);
    let size = b.reg("size", Type::I64);
    let p = b.reg("p", Type::P);
    let x = b.reg("x", Type::D);
    let acc = b.reg("acc", Type::D);
    let i = b.reg("i", Type::I64);
    let one = b.reg("one", Type::I64);
    let (head, done) = (b.new_label(), b.new_label());
    b.mov_i(size, 16)
        .emit(InsnCode::Alloca, [Operand::Reg(va), Operand::Reg(size)])
        .emit(InsnCode::VaStart, [Operand::Reg(va)])
        .emit(InsnCode::DMov, [Operand::Reg(acc), Operand::Double(0.0)])
        .mov_i(i, 0)
        .mov_i(one, 1);
    b.bind(head)
        .branch(InsnCode::Bge, done, i, n)
        .emit(
            InsnCode::VaArg,
            [Operand::Reg(p), Operand::Reg(va), Operand::Mem(Mem::base(Type::D, va))],
        )
        .load(Type::D, x, p)
        .binop(InsnCode::DAdd, acc, acc, x)
        .binop(InsnCode::Add, i, i, one)
        .jmp(head);
    b.bind(done).emit(InsnCode::VaEnd, [Operand::Reg(va)]).ret(&[acc]);
    module.add_func(b.finish());

    let args = [Slot::from_i64(3), Slot::from_f64(0.5), Slot::from_f64(1.25), Slot::from_f64(2.0)];
    assert_eq!(run_both(&module, "f", &args).unwrap()[0].d(), 3.75);
}

#[test]
fn variadic_blocks_are_copied_out() {
    let mut module = Module::new("test");
    let proto = module.add_proto(Proto::new("vb_p", vec![Type::I64], vars(&["n"]), true));

    let mut b = FuncBuilder::new_vararg("vb", vec![Type::I64], vars(&["n"]));
    let va = b.reg("va", Type::P);
    let dst = b.reg("dst", Type::P);
    let size = b.reg("size", Type::I64);
    let case = b.reg("case", Type::I64);
    let v = b.reg("v", Type::I64);
    b.mov_i(size, 16)
        .emit(InsnCode::Alloca, [Operand::Reg(va), Operand::Reg(size)])
        .emit(InsnCode::Alloca, [Operand::Reg(dst), Operand::Reg(size)])
        .emit(InsnCode::VaStart, [Operand::Reg(va)])
        .mov_i(case, 0)
        .emit(
            InsnCode::VaBlockArg,
            [Operand::Reg(dst), Operand::Reg(va), Operand::Reg(size), Operand::Reg(case)],
        )
        .load(Type::I64, v, dst)
        .ret(&[v]);
    let vb = module.add_func(b.finish());

    let mut b = FuncBuilder::new("f", vec![Type::I64], vars(&["a"]));
    let a = b.arg(0);
    let one = b.reg("one", Type::I64);
    let size = b.reg("size", Type::I64);
    let p = b.reg("p", Type::P);
    let r = b.reg("r", Type::I64);
    b.mov_i(size, 16)
        .mov_i(one, 1)
        .emit(InsnCode::Alloca, [Operand::Reg(p), Operand::Reg(size)])
        .store(Type::I64, p, a)
        .call(
            proto,
            ItemRef::Func(vb),
            &[r],
            &[one.into(), Mem::block(Type::Blk(0), p, 16).into()],
        )
        .ret(&[r]);
    module.add_func(b.finish());

    assert_eq!(run_i64(&module, &[77]), 77);
}
