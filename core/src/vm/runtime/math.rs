use anyhow::Result;

use crate::vm::error::InterpError;

/// Result of an overflow-checked operation: the wrapped value plus the flags it raised.
/// A flag left `None` keeps its previous state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Checked {
    pub value: i64,
    pub signed: Option<bool>,
    pub unsigned: Option<bool>,
}

#[inline]
pub(super) fn addo(a: i64, b: i64) -> Checked {
    let (value, signed) = a.overflowing_add(b);
    Checked {
        value,
        signed: Some(signed),
        unsigned: Some((a as u64).overflowing_add(b as u64).1),
    }
}

#[inline]
pub(super) fn addos(a: i64, b: i64) -> Checked {
    let (a, b) = (a as i32, b as i32);
    let (value, signed) = a.overflowing_add(b);
    Checked {
        value: value as i64,
        signed: Some(signed),
        unsigned: Some((a as u32).overflowing_add(b as u32).1),
    }
}

#[inline]
pub(super) fn subo(a: i64, b: i64) -> Checked {
    let (value, signed) = a.overflowing_sub(b);
    Checked {
        value,
        signed: Some(signed),
        unsigned: Some((a as u64) < (b as u64)),
    }
}

#[inline]
pub(super) fn subos(a: i64, b: i64) -> Checked {
    let (a, b) = (a as i32, b as i32);
    let (value, signed) = a.overflowing_sub(b);
    Checked {
        value: value as i64,
        signed: Some(signed),
        unsigned: Some((a as u32) < (b as u32)),
    }
}

#[inline]
pub(super) fn mulo(a: i64, b: i64) -> Checked {
    let (value, signed) = a.overflowing_mul(b);
    Checked {
        value,
        signed: Some(signed),
        unsigned: None,
    }
}

#[inline]
pub(super) fn mulos(a: i64, b: i64) -> Checked {
    let (value, signed) = (a as i32).overflowing_mul(b as i32);
    Checked {
        value: value as i64,
        signed: Some(signed),
        unsigned: None,
    }
}

#[inline]
pub(super) fn umulo(a: i64, b: i64) -> Checked {
    let (value, unsigned) = (a as u64).overflowing_mul(b as u64);
    Checked {
        value: value as i64,
        signed: None,
        unsigned: Some(unsigned),
    }
}

#[inline]
pub(super) fn umulos(a: i64, b: i64) -> Checked {
    let (value, unsigned) = (a as u32).overflowing_mul(b as u32);
    Checked {
        value: value as u64 as i64,
        signed: None,
        unsigned: Some(unsigned),
    }
}

#[inline]
fn nonzero<T: Default + PartialEq>(b: T) -> Result<T> {
    if b == T::default() {
        return Err(InterpError::DivisionByZero.into());
    }
    Ok(b)
}

#[inline]
pub(super) fn div(a: i64, b: i64) -> Result<i64> {
    Ok(a.wrapping_div(nonzero(b)?))
}

#[inline]
pub(super) fn divs(a: i64, b: i64) -> Result<i64> {
    Ok((a as i32).wrapping_div(nonzero(b as i32)?) as i64)
}

#[inline]
pub(super) fn udiv(a: u64, b: u64) -> Result<u64> {
    Ok(a / nonzero(b)?)
}

#[inline]
pub(super) fn udivs(a: u64, b: u64) -> Result<u64> {
    Ok(((a as u32) / nonzero(b as u32)?) as u64)
}

#[inline]
pub(super) fn rem(a: i64, b: i64) -> Result<i64> {
    Ok(a.wrapping_rem(nonzero(b)?))
}

#[inline]
pub(super) fn rems(a: i64, b: i64) -> Result<i64> {
    Ok((a as i32).wrapping_rem(nonzero(b as i32)?) as i64)
}

#[inline]
pub(super) fn urem(a: u64, b: u64) -> Result<u64> {
    Ok(a % nonzero(b)?)
}

#[inline]
pub(super) fn urems(a: u64, b: u64) -> Result<u64> {
    Ok(((a as u32) % nonzero(b as u32)?) as u64)
}
