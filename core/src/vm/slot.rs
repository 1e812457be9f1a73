use std::fmt;

use crate::ir::FuncId;
use crate::vm::ffi::HostId;

/// Untyped 64-bit register cell.
///
/// No type is recorded: whoever reads a slot must use the view it was written with. Floats
/// live in the low 32 bits with the upper half cleared; long doubles share the `f64` view.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Slot(u64);

impl Slot {
    pub const ZERO: Slot = Slot(0);

    #[inline(always)]
    pub const fn from_bits(bits: u64) -> Self {
        Slot(bits)
    }

    #[inline(always)]
    pub const fn from_i64(v: i64) -> Self {
        Slot(v as u64)
    }

    #[inline(always)]
    pub const fn from_u64(v: u64) -> Self {
        Slot(v)
    }

    #[inline(always)]
    pub fn from_f32(v: f32) -> Self {
        Slot(v.to_bits() as u64)
    }

    #[inline(always)]
    pub fn from_f64(v: f64) -> Self {
        Slot(v.to_bits())
    }

    #[inline(always)]
    pub fn from_ld(v: f64) -> Self {
        Slot(v.to_bits())
    }

    #[inline(always)]
    pub const fn from_addr(a: Addr) -> Self {
        Slot(a.0)
    }

    #[inline(always)]
    pub const fn bits(self) -> u64 {
        self.0
    }

    #[inline(always)]
    pub const fn i(self) -> i64 {
        self.0 as i64
    }

    #[inline(always)]
    pub const fn u(self) -> u64 {
        self.0
    }

    #[inline(always)]
    pub fn f(self) -> f32 {
        f32::from_bits(self.0 as u32)
    }

    #[inline(always)]
    pub fn d(self) -> f64 {
        f64::from_bits(self.0)
    }

    #[inline(always)]
    pub fn ld(self) -> f64 {
        f64::from_bits(self.0)
    }

    #[inline(always)]
    pub const fn addr(self) -> Addr {
        Addr(self.0)
    }

    /// Operand word read as a frame index.
    #[inline(always)]
    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Slot({:#x})", self.0)
    }
}

const KIND_SHIFT: u32 = 56;
const KIND_LABEL: u64 = 0xA1;
const KIND_FUNC: u64 = 0xA2;
const KIND_HOST: u64 = 0xA3;
const PAYLOAD_MASK: u64 = (1 << KIND_SHIFT) - 1;

/// Opaque address value.
///
/// Plain memory addresses are ordinary integers so that pointer arithmetic in interpreted code
/// works. Code labels, function entries and host functions carry a kind tag in the top byte and
/// are only produced and consumed by label, jump and call instructions.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Addr(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrKind {
    Mem(u64),
    Label { func: FuncId, offset: usize },
    Func(FuncId),
    Host(HostId),
}

impl Addr {
    pub const NULL: Addr = Addr(0);

    pub const fn mem(addr: u64) -> Self {
        Addr(addr)
    }

    pub(crate) const fn label(func: FuncId, offset: usize) -> Self {
        Addr((KIND_LABEL << KIND_SHIFT) | (((func.0 as u64) & 0xFF_FFFF) << 32) | (offset as u64 & 0xFFFF_FFFF))
    }

    pub const fn func(id: FuncId) -> Self {
        Addr((KIND_FUNC << KIND_SHIFT) | id.0 as u64)
    }

    pub const fn host(id: HostId) -> Self {
        Addr((KIND_HOST << KIND_SHIFT) | id.0 as u64)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    pub fn kind(self) -> AddrKind {
        let payload = self.0 & PAYLOAD_MASK;
        match self.0 >> KIND_SHIFT {
            KIND_LABEL => AddrKind::Label {
                func: FuncId((payload >> 32) as u32),
                offset: (payload & 0xFFFF_FFFF) as usize,
            },
            KIND_FUNC => AddrKind::Func(FuncId(payload as u32)),
            KIND_HOST => AddrKind::Host(HostId(payload as u32)),
            _ => AddrKind::Mem(self.0),
        }
    }
}

impl fmt::Debug for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            AddrKind::Mem(a) => write!(f, "Addr({a:#x})"),
            AddrKind::Label { func, offset } => write!(f, "Addr(label func{} +{offset})", func.0),
            AddrKind::Func(id) => write!(f, "Addr(func{})", id.0),
            AddrKind::Host(id) => write!(f, "Addr(host{})", id.0),
        }
    }
}
