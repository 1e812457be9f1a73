use anyhow::Result;

use super::math::{self, Checked};
use super::{Flow, Machine, invoke};
use crate::ir::Type;
use crate::vm::bytecode::Tag;
use crate::vm::error::InterpError;
use crate::vm::slot::{Addr, AddrKind, Slot};

macro_rules! unop {
    ($m:ident, $pc:ident, |$a:ident| $e:expr) => {{
        let $a = $m.get($pc + 2);
        $m.set($pc + 1, $e);
        Ok(Flow::Next($pc + 3))
    }};
}

macro_rules! binop {
    ($m:ident, $pc:ident, |$a:ident, $b:ident| $e:expr) => {{
        let $a = $m.get($pc + 2);
        let $b = $m.get($pc + 3);
        $m.set($pc + 1, $e);
        Ok(Flow::Next($pc + 4))
    }};
}

macro_rules! cmp {
    ($m:ident, $pc:ident, |$a:ident, $b:ident| $e:expr) => {
        binop!($m, $pc, |$a, $b| Slot::from_i64(($e) as i64))
    };
}

macro_rules! branch {
    ($m:ident, $pc:ident, |$a:ident, $b:ident| $e:expr) => {{
        let $a = $m.get($pc + 2);
        let $b = $m.get($pc + 3);
        Ok(Flow::Next(if $e { $m.target($pc + 1) } else { $pc + 4 }))
    }};
}

macro_rules! branch1 {
    ($m:ident, $pc:ident, |$a:ident| $e:expr) => {{
        let $a = $m.get($pc + 2);
        Ok(Flow::Next(if $e { $m.target($pc + 1) } else { $pc + 3 }))
    }};
}

macro_rules! load {
    ($m:ident, $pc:ident, $n:literal, |$bytes:ident| $e:expr) => {{
        let addr = $m.get($pc + 2).u();
        let $bytes = $m.interp.memory.load::<$n>(addr)?;
        $m.set($pc + 1, $e);
        Ok(Flow::Next($pc + 3))
    }};
}

macro_rules! store {
    ($m:ident, $pc:ident, |$v:ident| $e:expr) => {{
        let $v = $m.get($pc + 1);
        let addr = $m.get($pc + 2).u();
        $m.interp.memory.store(addr, $e)?;
        Ok(Flow::Next($pc + 3))
    }};
}

#[inline(always)]
fn checked(m: &mut Machine<'_>, pc: usize, op: fn(i64, i64) -> Checked) -> Result<Flow> {
    let c = op(m.get(pc + 2).i(), m.get(pc + 3).i());
    if let Some(flag) = c.signed {
        m.signed_overflow = flag;
    }
    if let Some(flag) = c.unsigned {
        m.unsigned_overflow = flag;
    }
    m.set(pc + 1, Slot::from_i64(c.value));
    Ok(Flow::Next(pc + 4))
}

#[inline(always)]
fn flag_branch(m: &Machine<'_>, pc: usize, taken: bool) -> Result<Flow> {
    Ok(Flow::Next(if taken { m.target(pc + 1) } else { pc + 2 }))
}

/// Executes the instruction at `pc`, whose tag has already been decoded.
///
/// Shared by both dispatch modes; direct-mode handlers are monomorphized copies of this
/// function with `tag` fixed.
#[inline(always)]
pub(super) fn exec(m: &mut Machine<'_>, tag: Tag, pc: usize) -> Result<Flow> {
    match tag {
        Tag::Mov | Tag::FMov | Tag::DMov | Tag::LdMov => unop!(m, pc, |a| a),
        Tag::Movi | Tag::Movp | Tag::Movf | Tag::Movd | Tag::Movld => {
            let imm = m.word(pc + 2);
            m.set(pc + 1, imm);
            Ok(Flow::Next(pc + 3))
        }
        Tag::MovFg | Tag::FMovFg | Tag::DMovFg | Tag::LdMovFg => {
            let v = m.interp.globals[m.word(pc + 2).index()];
            m.set(pc + 1, v);
            Ok(Flow::Next(pc + 3))
        }
        Tag::MovTg | Tag::FMovTg | Tag::DMovTg | Tag::LdMovTg => {
            let v = m.get(pc + 2);
            m.interp.globals[m.word(pc + 1).index()] = v;
            Ok(Flow::Next(pc + 3))
        }

        Tag::Ext8 => unop!(m, pc, |a| Slot::from_i64(a.i() as i8 as i64)),
        Tag::Ext16 => unop!(m, pc, |a| Slot::from_i64(a.i() as i16 as i64)),
        Tag::Ext32 => unop!(m, pc, |a| Slot::from_i64(a.i() as i32 as i64)),
        Tag::UExt8 => unop!(m, pc, |a| Slot::from_u64(a.u() as u8 as u64)),
        Tag::UExt16 => unop!(m, pc, |a| Slot::from_u64(a.u() as u16 as u64)),
        Tag::UExt32 => unop!(m, pc, |a| Slot::from_u64(a.u() as u32 as u64)),

        Tag::I2F => unop!(m, pc, |a| Slot::from_f32(a.i() as f32)),
        Tag::I2D => unop!(m, pc, |a| Slot::from_f64(a.i() as f64)),
        Tag::I2Ld => unop!(m, pc, |a| Slot::from_ld(a.i() as f64)),
        Tag::Ui2F => unop!(m, pc, |a| Slot::from_f32(a.u() as f32)),
        Tag::Ui2D => unop!(m, pc, |a| Slot::from_f64(a.u() as f64)),
        Tag::Ui2Ld => unop!(m, pc, |a| Slot::from_ld(a.u() as f64)),
        Tag::F2I => unop!(m, pc, |a| Slot::from_i64(a.f() as i64)),
        Tag::D2I => unop!(m, pc, |a| Slot::from_i64(a.d() as i64)),
        Tag::Ld2I => unop!(m, pc, |a| Slot::from_i64(a.ld() as i64)),
        Tag::F2D => unop!(m, pc, |a| Slot::from_f64(a.f() as f64)),
        Tag::F2Ld => unop!(m, pc, |a| Slot::from_ld(a.f() as f64)),
        Tag::D2F => unop!(m, pc, |a| Slot::from_f32(a.d() as f32)),
        Tag::D2Ld => unop!(m, pc, |a| Slot::from_ld(a.d())),
        Tag::Ld2F => unop!(m, pc, |a| Slot::from_f32(a.ld() as f32)),
        Tag::Ld2D => unop!(m, pc, |a| Slot::from_f64(a.ld())),

        Tag::Neg => unop!(m, pc, |a| Slot::from_i64(a.i().wrapping_neg())),
        Tag::NegS => unop!(m, pc, |a| Slot::from_i64((a.i() as i32).wrapping_neg() as i64)),
        Tag::FNeg => unop!(m, pc, |a| Slot::from_f32(-a.f())),
        Tag::DNeg => unop!(m, pc, |a| Slot::from_f64(-a.d())),
        Tag::LdNeg => unop!(m, pc, |a| Slot::from_ld(-a.ld())),

        Tag::Add => binop!(m, pc, |a, b| Slot::from_i64(a.i().wrapping_add(b.i()))),
        Tag::AddS => binop!(m, pc, |a, b| Slot::from_i64((a.i() as i32).wrapping_add(b.i() as i32) as i64)),
        Tag::FAdd => binop!(m, pc, |a, b| Slot::from_f32(a.f() + b.f())),
        Tag::DAdd => binop!(m, pc, |a, b| Slot::from_f64(a.d() + b.d())),
        Tag::LdAdd => binop!(m, pc, |a, b| Slot::from_ld(a.ld() + b.ld())),
        Tag::Sub => binop!(m, pc, |a, b| Slot::from_i64(a.i().wrapping_sub(b.i()))),
        Tag::SubS => binop!(m, pc, |a, b| Slot::from_i64((a.i() as i32).wrapping_sub(b.i() as i32) as i64)),
        Tag::FSub => binop!(m, pc, |a, b| Slot::from_f32(a.f() - b.f())),
        Tag::DSub => binop!(m, pc, |a, b| Slot::from_f64(a.d() - b.d())),
        Tag::LdSub => binop!(m, pc, |a, b| Slot::from_ld(a.ld() - b.ld())),
        Tag::Mul => binop!(m, pc, |a, b| Slot::from_i64(a.i().wrapping_mul(b.i()))),
        Tag::MulS => binop!(m, pc, |a, b| Slot::from_i64((a.i() as i32).wrapping_mul(b.i() as i32) as i64)),
        Tag::FMul => binop!(m, pc, |a, b| Slot::from_f32(a.f() * b.f())),
        Tag::DMul => binop!(m, pc, |a, b| Slot::from_f64(a.d() * b.d())),
        Tag::LdMul => binop!(m, pc, |a, b| Slot::from_ld(a.ld() * b.ld())),
        Tag::Div => binop!(m, pc, |a, b| Slot::from_i64(math::div(a.i(), b.i())?)),
        Tag::DivS => binop!(m, pc, |a, b| Slot::from_i64(math::divs(a.i(), b.i())?)),
        Tag::UDiv => binop!(m, pc, |a, b| Slot::from_u64(math::udiv(a.u(), b.u())?)),
        Tag::UDivS => binop!(m, pc, |a, b| Slot::from_u64(math::udivs(a.u(), b.u())?)),
        Tag::FDiv => binop!(m, pc, |a, b| Slot::from_f32(a.f() / b.f())),
        Tag::DDiv => binop!(m, pc, |a, b| Slot::from_f64(a.d() / b.d())),
        Tag::LdDiv => binop!(m, pc, |a, b| Slot::from_ld(a.ld() / b.ld())),
        Tag::Mod => binop!(m, pc, |a, b| Slot::from_i64(math::rem(a.i(), b.i())?)),
        Tag::ModS => binop!(m, pc, |a, b| Slot::from_i64(math::rems(a.i(), b.i())?)),
        Tag::UMod => binop!(m, pc, |a, b| Slot::from_u64(math::urem(a.u(), b.u())?)),
        Tag::UModS => binop!(m, pc, |a, b| Slot::from_u64(math::urems(a.u(), b.u())?)),

        Tag::And => binop!(m, pc, |a, b| Slot::from_u64(a.u() & b.u())),
        Tag::AndS => binop!(m, pc, |a, b| Slot::from_i64((a.i() as i32 & b.i() as i32) as i64)),
        Tag::Or => binop!(m, pc, |a, b| Slot::from_u64(a.u() | b.u())),
        Tag::OrS => binop!(m, pc, |a, b| Slot::from_i64((a.i() as i32 | b.i() as i32) as i64)),
        Tag::Xor => binop!(m, pc, |a, b| Slot::from_u64(a.u() ^ b.u())),
        Tag::XorS => binop!(m, pc, |a, b| Slot::from_i64((a.i() as i32 ^ b.i() as i32) as i64)),
        Tag::Lsh => binop!(m, pc, |a, b| Slot::from_i64(a.i().wrapping_shl(b.u() as u32))),
        Tag::LshS => binop!(m, pc, |a, b| Slot::from_i64((a.i() as i32).wrapping_shl(b.u() as u32) as i64)),
        Tag::Rsh => binop!(m, pc, |a, b| Slot::from_i64(a.i().wrapping_shr(b.u() as u32))),
        Tag::RshS => binop!(m, pc, |a, b| Slot::from_i64((a.i() as i32).wrapping_shr(b.u() as u32) as i64)),
        Tag::URsh => binop!(m, pc, |a, b| Slot::from_u64(a.u().wrapping_shr(b.u() as u32))),
        Tag::URshS => binop!(m, pc, |a, b| Slot::from_u64((a.u() as u32).wrapping_shr(b.u() as u32) as u64)),

        Tag::Eq => cmp!(m, pc, |a, b| a.i() == b.i()),
        Tag::EqS => cmp!(m, pc, |a, b| a.i() as i32 == b.i() as i32),
        Tag::FEq => cmp!(m, pc, |a, b| a.f() == b.f()),
        Tag::DEq => cmp!(m, pc, |a, b| a.d() == b.d()),
        Tag::LdEq => cmp!(m, pc, |a, b| a.ld() == b.ld()),
        Tag::Ne => cmp!(m, pc, |a, b| a.i() != b.i()),
        Tag::NeS => cmp!(m, pc, |a, b| a.i() as i32 != b.i() as i32),
        Tag::FNe => cmp!(m, pc, |a, b| a.f() != b.f()),
        Tag::DNe => cmp!(m, pc, |a, b| a.d() != b.d()),
        Tag::LdNe => cmp!(m, pc, |a, b| a.ld() != b.ld()),
        Tag::Lt => cmp!(m, pc, |a, b| a.i() < b.i()),
        Tag::LtS => cmp!(m, pc, |a, b| (a.i() as i32) < b.i() as i32),
        Tag::ULt => cmp!(m, pc, |a, b| a.u() < b.u()),
        Tag::ULtS => cmp!(m, pc, |a, b| (a.u() as u32) < b.u() as u32),
        Tag::FLt => cmp!(m, pc, |a, b| a.f() < b.f()),
        Tag::DLt => cmp!(m, pc, |a, b| a.d() < b.d()),
        Tag::LdLt => cmp!(m, pc, |a, b| a.ld() < b.ld()),
        Tag::Le => cmp!(m, pc, |a, b| a.i() <= b.i()),
        Tag::LeS => cmp!(m, pc, |a, b| a.i() as i32 <= b.i() as i32),
        Tag::ULe => cmp!(m, pc, |a, b| a.u() <= b.u()),
        Tag::ULeS => cmp!(m, pc, |a, b| a.u() as u32 <= b.u() as u32),
        Tag::FLe => cmp!(m, pc, |a, b| a.f() <= b.f()),
        Tag::DLe => cmp!(m, pc, |a, b| a.d() <= b.d()),
        Tag::LdLe => cmp!(m, pc, |a, b| a.ld() <= b.ld()),
        Tag::Gt => cmp!(m, pc, |a, b| a.i() > b.i()),
        Tag::GtS => cmp!(m, pc, |a, b| a.i() as i32 > b.i() as i32),
        Tag::UGt => cmp!(m, pc, |a, b| a.u() > b.u()),
        Tag::UGtS => cmp!(m, pc, |a, b| a.u() as u32 > b.u() as u32),
        Tag::FGt => cmp!(m, pc, |a, b| a.f() > b.f()),
        Tag::DGt => cmp!(m, pc, |a, b| a.d() > b.d()),
        Tag::LdGt => cmp!(m, pc, |a, b| a.ld() > b.ld()),
        Tag::Ge => cmp!(m, pc, |a, b| a.i() >= b.i()),
        Tag::GeS => cmp!(m, pc, |a, b| a.i() as i32 >= b.i() as i32),
        Tag::UGe => cmp!(m, pc, |a, b| a.u() >= b.u()),
        Tag::UGeS => cmp!(m, pc, |a, b| a.u() as u32 >= b.u() as u32),
        Tag::FGe => cmp!(m, pc, |a, b| a.f() >= b.f()),
        Tag::DGe => cmp!(m, pc, |a, b| a.d() >= b.d()),
        Tag::LdGe => cmp!(m, pc, |a, b| a.ld() >= b.ld()),

        Tag::AddO => checked(m, pc, math::addo),
        Tag::AddOS => checked(m, pc, math::addos),
        Tag::SubO => checked(m, pc, math::subo),
        Tag::SubOS => checked(m, pc, math::subos),
        Tag::MulO => checked(m, pc, math::mulo),
        Tag::MulOS => checked(m, pc, math::mulos),
        Tag::UMulO => checked(m, pc, math::umulo),
        Tag::UMulOS => checked(m, pc, math::umulos),

        Tag::Jmp => Ok(Flow::Next(m.target(pc + 1))),
        Tag::Bt => branch1!(m, pc, |a| a.i() != 0),
        Tag::BtS => branch1!(m, pc, |a| a.i() as i32 != 0),
        Tag::Bf => branch1!(m, pc, |a| a.i() == 0),
        Tag::BfS => branch1!(m, pc, |a| a.i() as i32 == 0),
        Tag::Beq => branch!(m, pc, |a, b| a.i() == b.i()),
        Tag::BeqS => branch!(m, pc, |a, b| a.i() as i32 == b.i() as i32),
        Tag::FBeq => branch!(m, pc, |a, b| a.f() == b.f()),
        Tag::DBeq => branch!(m, pc, |a, b| a.d() == b.d()),
        Tag::LdBeq => branch!(m, pc, |a, b| a.ld() == b.ld()),
        Tag::Bne => branch!(m, pc, |a, b| a.i() != b.i()),
        Tag::BneS => branch!(m, pc, |a, b| a.i() as i32 != b.i() as i32),
        Tag::FBne => branch!(m, pc, |a, b| a.f() != b.f()),
        Tag::DBne => branch!(m, pc, |a, b| a.d() != b.d()),
        Tag::LdBne => branch!(m, pc, |a, b| a.ld() != b.ld()),
        Tag::Blt => branch!(m, pc, |a, b| a.i() < b.i()),
        Tag::BltS => branch!(m, pc, |a, b| (a.i() as i32) < b.i() as i32),
        Tag::UBlt => branch!(m, pc, |a, b| a.u() < b.u()),
        Tag::UBltS => branch!(m, pc, |a, b| (a.u() as u32) < b.u() as u32),
        Tag::FBlt => branch!(m, pc, |a, b| a.f() < b.f()),
        Tag::DBlt => branch!(m, pc, |a, b| a.d() < b.d()),
        Tag::LdBlt => branch!(m, pc, |a, b| a.ld() < b.ld()),
        Tag::Ble => branch!(m, pc, |a, b| a.i() <= b.i()),
        Tag::BleS => branch!(m, pc, |a, b| a.i() as i32 <= b.i() as i32),
        Tag::UBle => branch!(m, pc, |a, b| a.u() <= b.u()),
        Tag::UBleS => branch!(m, pc, |a, b| a.u() as u32 <= b.u() as u32),
        Tag::FBle => branch!(m, pc, |a, b| a.f() <= b.f()),
        Tag::DBle => branch!(m, pc, |a, b| a.d() <= b.d()),
        Tag::LdBle => branch!(m, pc, |a, b| a.ld() <= b.ld()),
        Tag::Bgt => branch!(m, pc, |a, b| a.i() > b.i()),
        Tag::BgtS => branch!(m, pc, |a, b| a.i() as i32 > b.i() as i32),
        Tag::UBgt => branch!(m, pc, |a, b| a.u() > b.u()),
        Tag::UBgtS => branch!(m, pc, |a, b| a.u() as u32 > b.u() as u32),
        Tag::FBgt => branch!(m, pc, |a, b| a.f() > b.f()),
        Tag::DBgt => branch!(m, pc, |a, b| a.d() > b.d()),
        Tag::LdBgt => branch!(m, pc, |a, b| a.ld() > b.ld()),
        Tag::Bge => branch!(m, pc, |a, b| a.i() >= b.i()),
        Tag::BgeS => branch!(m, pc, |a, b| a.i() as i32 >= b.i() as i32),
        Tag::UBge => branch!(m, pc, |a, b| a.u() >= b.u()),
        Tag::UBgeS => branch!(m, pc, |a, b| a.u() as u32 >= b.u() as u32),
        Tag::FBge => branch!(m, pc, |a, b| a.f() >= b.f()),
        Tag::DBge => branch!(m, pc, |a, b| a.d() >= b.d()),
        Tag::LdBge => branch!(m, pc, |a, b| a.ld() >= b.ld()),
        Tag::Bo => flag_branch(m, pc, m.signed_overflow),
        Tag::Ubo => flag_branch(m, pc, m.unsigned_overflow),
        Tag::Bno => flag_branch(m, pc, !m.signed_overflow),
        Tag::Ubno => flag_branch(m, pc, !m.unsigned_overflow),

        Tag::LAddr => {
            let addr = Addr::label(m.cf.func, m.target(pc + 2));
            m.set(pc + 1, Slot::from_addr(addr));
            Ok(Flow::Next(pc + 3))
        }
        Tag::JmpI => {
            let addr = m.get(pc + 1).addr();
            match addr.kind() {
                AddrKind::Label { func, offset } if func == m.cf.func && m.cf.is_label(offset) => {
                    Ok(Flow::Next(offset))
                }
                AddrKind::Label { func, .. } if func != m.cf.func => Err(InterpError::Unsupported(format!(
                    "indirect jump from {} into another function",
                    m.cf.name
                ))
                .into()),
                _ => Err(InterpError::InvalidInsn(format!("indirect jump to non-label address {addr:?}")).into()),
            }
        }

        Tag::Call => invoke::call(m, pc, false, false),
        Tag::JCall => invoke::call(m, pc, false, true),
        Tag::ImmCall => invoke::call(m, pc, true, false),
        Tag::ImmJCall => invoke::call(m, pc, true, true),
        Tag::Switch => {
            let ntargets = m.word(pc + 1).index() - 1;
            let idx = m.get(pc + 2).u();
            if idx >= ntargets as u64 {
                return Err(InterpError::InvalidInsn(format!(
                    "switch index {idx} out of range for {ntargets} targets"
                ))
                .into());
            }
            Ok(Flow::Next(m.target(pc + 3 + idx as usize)))
        }
        Tag::Ret => {
            let n = m.word(pc + 1).index();
            for i in 0..n.min(m.results.len()) {
                m.results[i] = m.get(pc + 2 + i);
            }
            Ok(Flow::Return)
        }
        Tag::JRet => {
            m.interp.jret_addr = m.get(pc + 1).addr();
            Ok(Flow::Return)
        }

        Tag::Alloca => {
            let size = m.get(pc + 2).u();
            let addr = m.interp.memory.alloca(size)?;
            m.set(pc + 1, Slot::from_addr(addr));
            Ok(Flow::Next(pc + 3))
        }
        Tag::BStart => {
            let addr = m.interp.abi.bstart(&mut m.interp.memory)?;
            m.set(pc + 1, Slot::from_addr(addr));
            Ok(Flow::Next(pc + 2))
        }
        Tag::BEnd => {
            let mark = m.get(pc + 1).addr();
            m.interp.abi.bend(&mut m.interp.memory, mark)?;
            Ok(Flow::Next(pc + 2))
        }
        Tag::VaArg => {
            let va = m.get(pc + 2).addr();
            let ty = Type::from_code(m.word(pc + 3).u())
                .ok_or_else(|| InterpError::InvalidInsn("corrupt va_arg type word".into()))?;
            let addr = m.interp.abi.va_arg(&mut m.interp.memory, va, ty)?;
            m.set(pc + 1, Slot::from_addr(addr));
            Ok(Flow::Next(pc + 4))
        }
        Tag::VaBlockArg => {
            let dst = m.get(pc + 1).addr();
            let va = m.get(pc + 2).addr();
            let size = m.get(pc + 3).u();
            let case = m.get(pc + 4).u();
            m.interp.abi.va_block_arg(&mut m.interp.memory, dst, va, size, case)?;
            Ok(Flow::Next(pc + 5))
        }
        Tag::VaStart => {
            let va = m.get(pc + 1).addr();
            let area = m.frame.va;
            m.interp.abi.va_start(&mut m.interp.memory, va, area)?;
            Ok(Flow::Next(pc + 2))
        }
        Tag::VaEnd => {
            let va = m.get(pc + 1).addr();
            m.interp.abi.va_end(&mut m.interp.memory, va)?;
            Ok(Flow::Next(pc + 2))
        }

        Tag::Ldi8 => load!(m, pc, 1, |b| Slot::from_i64(i8::from_le_bytes(b) as i64)),
        Tag::Ldu8 => load!(m, pc, 1, |b| Slot::from_u64(u8::from_le_bytes(b) as u64)),
        Tag::Ldi16 => load!(m, pc, 2, |b| Slot::from_i64(i16::from_le_bytes(b) as i64)),
        Tag::Ldu16 => load!(m, pc, 2, |b| Slot::from_u64(u16::from_le_bytes(b) as u64)),
        Tag::Ldi32 => load!(m, pc, 4, |b| Slot::from_i64(i32::from_le_bytes(b) as i64)),
        Tag::Ldu32 => load!(m, pc, 4, |b| Slot::from_u64(u32::from_le_bytes(b) as u64)),
        Tag::Ldi64 => load!(m, pc, 8, |b| Slot::from_i64(i64::from_le_bytes(b))),
        Tag::Ldf => load!(m, pc, 4, |b| Slot::from_f32(f32::from_le_bytes(b))),
        Tag::Ldd => load!(m, pc, 8, |b| Slot::from_f64(f64::from_le_bytes(b))),
        Tag::Ldld => load!(m, pc, 8, |b| Slot::from_ld(f64::from_le_bytes(b))),
        Tag::Sti8 | Tag::Stu8 => store!(m, pc, |v| (v.u() as u8).to_le_bytes()),
        Tag::Sti16 | Tag::Stu16 => store!(m, pc, |v| (v.u() as u16).to_le_bytes()),
        Tag::Sti32 | Tag::Stu32 => store!(m, pc, |v| (v.u() as u32).to_le_bytes()),
        Tag::Sti64 => store!(m, pc, |v| v.u().to_le_bytes()),
        Tag::Stf => store!(m, pc, |v| v.f().to_le_bytes()),
        Tag::Std => store!(m, pc, |v| v.d().to_le_bytes()),
        Tag::Stld => store!(m, pc, |v| v.ld().to_le_bytes()),
    }
}
