use crate::ir::Type;
use crate::vm::slot::Slot;

/// Re-normalizes `v` to the representation of `ty`: integers are truncated and re-extended
/// according to their signedness, everything else passes through untouched.
///
/// Used both for outgoing fixed arguments and for incoming results, which is what the native
/// calling convention guarantees for narrow integer types.
#[inline]
pub(crate) fn coerce(v: Slot, ty: Type) -> Slot {
    match ty {
        Type::I8 => Slot::from_i64(v.i() as i8 as i64),
        Type::U8 => Slot::from_u64(v.u() as u8 as u64),
        Type::I16 => Slot::from_i64(v.i() as i16 as i64),
        Type::U16 => Slot::from_u64(v.u() as u16 as u64),
        Type::I32 => Slot::from_i64(v.i() as i32 as i64),
        Type::U32 => Slot::from_u64(v.u() as u32 as u64),
        Type::F => Slot::from_f32(v.f()),
        _ => v,
    }
}
