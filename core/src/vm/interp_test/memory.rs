use super::*;

#[test]
fn byte_loads_extend_by_type() {
    let mut module = Module::new("test");
    let byte = module.add_data("byte", vec![0xFF, 0, 0, 0]);
    let mut b = FuncBuilder::new("f", vec![Type::I64, Type::I64], vec![]);
    let p = b.reg("p", Type::P);
    let signed = b.reg("signed", Type::I64);
    let unsigned = b.reg("unsigned", Type::I64);
    b.mov_ref(p, ItemRef::Data(byte))
        .load(Type::I8, signed, p)
        .load(Type::U8, unsigned, p)
        .ret(&[signed, unsigned]);
    module.add_func(b.finish());

    let out = run_both(&module, "f", &[]).unwrap();
    assert_eq!(out[0].i(), -1);
    assert_eq!(out[1].i(), 255);
}

#[test]
fn data_items_are_addressable_from_the_context() {
    let mut module = Module::new("test");
    let id = module.add_data("word", 0x1234_5678_u32.to_le_bytes().to_vec());
    module.add_func(FuncBuilder::new("f", vec![], vec![]).finish());
    let interp = context(module, DispatchMode::Direct);
    let addr = interp.data_addr(id).unwrap();
    assert_eq!(interp.memory().load::<4>(addr.bits()).unwrap(), [0x78, 0x56, 0x34, 0x12]);
}

fn alloca_module() -> Module {
    single(vec![Type::I64, Type::I64], vars(&["v"]), |b| {
        let v = b.arg(0);
        let size = b.reg("size", Type::I64);
        let p = b.reg("p", Type::P);
        let s = b.reg("s", Type::I64);
        let u = b.reg("u", Type::I64);
        b.mov_i(size, 8)
            .emit(InsnCode::Alloca, [Operand::Reg(p), Operand::Reg(size)])
            .store(Type::I32, p, v)
            .load(Type::I32, s, p)
            .load(Type::U32, u, p)
            .ret(&[s, u]);
    })
}

#[test]
fn alloca_round_trips_narrow_stores() {
    let out = run_both(&alloca_module(), "f", &[Slot::from_i64(-2)]).unwrap();
    assert_eq!(out[0].i(), -2);
    assert_eq!(out[1].u(), 0xFFFF_FFFE);
}

#[test]
fn stack_storage_is_released_on_return() {
    let mut interp = context(alloca_module(), DispatchMode::Direct);
    interp.interp(FuncId(0), &[Slot::from_i64(1)]).unwrap();
    assert_eq!(interp.memory().stack_mark(), 0);
    assert!(interp.memory().peak_stack() >= 8);
}

#[test]
fn block_stack_end_rewinds_to_start() {
    let module = single(vec![Type::I64], vec![], |b| {
        let s = b.reg("s", Type::P);
        let t = b.reg("t", Type::P);
        let size = b.reg("size", Type::I64);
        let p = b.reg("p", Type::P);
        let r = b.reg("r", Type::I64);
        b.emit(InsnCode::BStart, [Operand::Reg(s)])
            .mov_i(size, 64)
            .emit(InsnCode::Alloca, [Operand::Reg(p), Operand::Reg(size)])
            .emit(InsnCode::BEnd, [Operand::Reg(s)])
            .emit(InsnCode::BStart, [Operand::Reg(t)])
            .binop(InsnCode::Sub, r, t, s)
            .ret(&[r]);
    });
    assert_eq!(run_both(&module, "f", &[]).unwrap()[0].i(), 0);
}

#[test]
fn out_of_bounds_access_faults() {
    let module = single(vec![Type::I64], vars(&["a"]), |b| {
        let a = b.arg(0);
        let v = b.reg("v", Type::I64);
        b.load(Type::I64, v, a).ret(&[v]);
    });
    assert_eq!(err_kind(&module, &[0]), ErrorKind::MemoryFault);
    assert_eq!(err_kind(&module, &[0x500]), ErrorKind::MemoryFault);
}

#[test]
fn stack_limit_bounds_alloca() {
    let module = single(vec![Type::I64], vars(&["n"]), |b| {
        let n = b.arg(0);
        let p = b.reg("p", Type::P);
        b.emit(InsnCode::Alloca, [Operand::Reg(p), Operand::Reg(n)]).ret(&[n]);
    });
    let config = InterpConfig {
        stack_limit: 64,
        ..InterpConfig::default()
    };
    let mut interp = Interp::with_config(module, config).unwrap();
    interp.set_error_handler(|_, _| {});
    assert!(interp.interp(FuncId(0), &[Slot::from_i64(32)]).is_ok());
    let err = interp.interp(FuncId(0), &[Slot::from_i64(128)]).unwrap_err();
    assert_eq!(InterpError::kind_of(&err), ErrorKind::Alloc);
}

#[test]
fn hardware_registers_live_in_the_global_file() {
    let module = single(vec![Type::D], vars(&["a"]), |b| {
        let a = b.arg(0);
        let rax = b.hard_reg("rax", Type::I64, "rax");
        let xmm1 = b.hard_reg("xmm1", Type::D, "xmm1");
        let d = b.reg("d", Type::D);
        b.mov(rax, a)
            .emit(InsnCode::DMov, [Operand::Reg(d), Operand::Reg(xmm1)])
            .ret(&[d]);
    });
    for mode in MODES {
        let mut interp = context(module.clone(), mode);
        interp.set_global(17, Slot::from_f64(2.5));
        let out = interp.interp(FuncId(0), &[Slot::from_i64(42)]).unwrap();
        assert_eq!(out[0].d(), 2.5);
        assert_eq!(interp.global(0).i(), 42);
    }
}
