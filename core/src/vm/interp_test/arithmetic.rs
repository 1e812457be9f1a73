use super::*;

fn binop_module(code: InsnCode) -> Module {
    single(vec![Type::I64], vars(&["a", "b"]), |b| {
        let (x, y) = (b.arg(0), b.arg(1));
        let r = b.reg("r", Type::I64);
        b.binop(code, r, x, y).ret(&[r]);
    })
}

#[test]
fn adds_two_arguments() {
    assert_eq!(run_i64(&binop_module(InsnCode::Add), &[3, 4]), 7);
    assert_eq!(run_i64(&binop_module(InsnCode::Add), &[i64::MAX, 1]), i64::MIN);
}

#[test]
fn short_forms_use_the_low_32_bits() {
    assert_eq!(run_i64(&binop_module(InsnCode::AddS), &[i32::MAX as i64, 1]), i32::MIN as i64);
    assert_eq!(run_i64(&binop_module(InsnCode::MulS), &[0x1_0000_0003, 5]), 15);
    assert_eq!(run_i64(&binop_module(InsnCode::URshS), &[-1, 28]), 0xF);
}

#[test]
fn signed_and_unsigned_division_differ() {
    assert_eq!(run_i64(&binop_module(InsnCode::Div), &[-7, 2]), -3);
    assert_eq!(run_i64(&binop_module(InsnCode::Mod), &[-7, 2]), -1);
    assert_eq!(run_i64(&binop_module(InsnCode::UDiv), &[-2, 2]), i64::MAX);
}

#[test]
fn division_by_zero_is_an_error() {
    for code in [InsnCode::Div, InsnCode::UDiv, InsnCode::Mod, InsnCode::UModS] {
        assert_eq!(err_kind(&binop_module(code), &[1, 0]), ErrorKind::DivisionByZero, "{code}");
    }
}

#[test]
fn comparisons_produce_zero_or_one() {
    assert_eq!(run_i64(&binop_module(InsnCode::Lt), &[-1, 0]), 1);
    assert_eq!(run_i64(&binop_module(InsnCode::ULt), &[-1, 0]), 0);
    assert_eq!(run_i64(&binop_module(InsnCode::GeS), &[0x1_0000_0000, 0]), 1);
    assert_eq!(run_i64(&binop_module(InsnCode::Ne), &[5, 5]), 0);
}

#[test]
fn extensions_follow_signedness() {
    for (code, expected) in [
        (InsnCode::Ext8, -1),
        (InsnCode::UExt8, 0xFF),
        (InsnCode::Ext16, 0xFF),
        (InsnCode::UExt32, 0xFF),
    ] {
        let module = single(vec![Type::I64], vars(&["a"]), |b| {
            let a = b.arg(0);
            let r = b.reg("r", Type::I64);
            b.unop(code, r, a).ret(&[r]);
        });
        assert_eq!(run_i64(&module, &[0xFF]), expected, "{code}");
    }
}

#[test]
fn float_literals_keep_single_precision_bits() {
    let module = single(vec![Type::F], vec![], |b| {
        let x = b.reg("x", Type::F);
        b.emit(InsnCode::FMov, [Operand::Reg(x), Operand::Float(1.25)])
            .binop(InsnCode::FAdd, x, x, x)
            .ret(&[x]);
    });
    let out = run_both(&module, "f", &[]).unwrap();
    assert_eq!(out[0].f(), 2.5);
    assert_eq!(out[0].bits() >> 32, 0);
}

#[test]
fn conversions_between_int_and_double() {
    let module = single(vec![Type::I64], vars(&["a"]), |b| {
        let a = b.arg(0);
        let d = b.reg("d", Type::D);
        let half = b.reg("half", Type::D);
        let r = b.reg("r", Type::I64);
        b.unop(InsnCode::I2D, d, a)
            .emit(InsnCode::DMov, [Operand::Reg(half), Operand::Double(0.5)])
            .binop(InsnCode::DMul, d, d, half)
            .unop(InsnCode::D2I, r, d)
            .ret(&[r]);
    });
    assert_eq!(run_i64(&module, &[9]), 4);
    assert_eq!(run_i64(&module, &[-9]), -4);
}

#[test]
fn long_double_is_carried_as_double() {
    let module = single(vec![Type::LD], vec![], |b| {
        let x = b.reg("x", Type::LD);
        let y = b.reg("y", Type::LD);
        b.emit(InsnCode::LdMov, [Operand::Reg(x), Operand::LDouble(1.5)])
            .emit(InsnCode::LdMov, [Operand::Reg(y), Operand::LDouble(0.25)])
            .binop(InsnCode::LdSub, x, x, y)
            .ret(&[x]);
    });
    assert_eq!(run_both(&module, "f", &[]).unwrap()[0].ld(), 1.25);
}

fn overflow_module(code: InsnCode, flag: InsnCode) -> Module {
    single(vec![Type::I64], vars(&["a", "b"]), |b| {
        let (x, y) = (b.arg(0), b.arg(1));
        let r = b.reg("r", Type::I64);
        let out = b.reg("out", Type::I64);
        let taken = b.new_label();
        b.binop(code, r, x, y)
            .emit(flag, [Operand::Label(taken)])
            .mov_i(out, 0)
            .ret(&[out]);
        b.bind(taken).mov_i(out, 1).ret(&[out]);
    })
}

#[test]
fn signed_overflow_takes_bo() {
    let module = overflow_module(InsnCode::AddO, InsnCode::Bo);
    assert_eq!(run_i64(&module, &[i64::MAX, 1]), 1);
    assert_eq!(run_i64(&module, &[1, 2]), 0);
    let module = overflow_module(InsnCode::SubOS, InsnCode::Bno);
    assert_eq!(run_i64(&module, &[i32::MIN as i64, 1]), 0);
    assert_eq!(run_i64(&module, &[5, 1]), 1);
}

#[test]
fn unsigned_overflow_takes_ubo() {
    let module = overflow_module(InsnCode::UMulO, InsnCode::Ubo);
    assert_eq!(run_i64(&module, &[-1, 2]), 1);
    assert_eq!(run_i64(&module, &[3, 4]), 0);
    let module = overflow_module(InsnCode::AddO, InsnCode::Ubno);
    assert_eq!(run_i64(&module, &[-1, 1]), 0);
}

/// Overflow op followed by a move, a stack store and a reload before the flag branch.
fn overflow_then_moves_module(code: InsnCode, flag: InsnCode) -> Module {
    single(vec![Type::I64], vars(&["a", "b"]), |b| {
        let (x, y) = (b.arg(0), b.arg(1));
        let size = b.reg("size", Type::I64);
        let p = b.reg("p", Type::P);
        let r = b.reg("r", Type::I64);
        let copy = b.reg("copy", Type::I64);
        let out = b.reg("out", Type::I64);
        let taken = b.new_label();
        b.mov_i(size, 8)
            .emit(InsnCode::Alloca, [Operand::Reg(p), Operand::Reg(size)])
            .binop(code, r, x, y)
            .mov(copy, r)
            .store(Type::I64, p, copy)
            .load(Type::I64, out, p)
            .emit(flag, [Operand::Label(taken)])
            .mov_i(out, 0)
            .ret(&[out]);
        b.bind(taken).mov_i(out, 1).ret(&[out]);
    })
}

#[test]
fn overflow_flags_survive_moves_and_stores() {
    let module = overflow_then_moves_module(InsnCode::AddO, InsnCode::Bo);
    assert_eq!(run_i64(&module, &[i64::MAX, 1]), 1);
    assert_eq!(run_i64(&module, &[3, 4]), 0);

    let module = overflow_then_moves_module(InsnCode::AddO, InsnCode::Ubo);
    assert_eq!(run_i64(&module, &[-1, 1]), 1);
    assert_eq!(run_i64(&module, &[3, 4]), 0);

    let module = overflow_then_moves_module(InsnCode::SubO, InsnCode::Bno);
    assert_eq!(run_i64(&module, &[i64::MIN, 1]), 0);
    assert_eq!(run_i64(&module, &[5, 1]), 1);
}
