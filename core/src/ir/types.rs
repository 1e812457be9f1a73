use std::fmt;

/// Value types of the instruction set.
///
/// `Blk(n)` is a by-value memory block whose passing convention is selected by `n` (0..=4);
/// `RBlk` is a block returned through a hidden pointer. Long double is carried with the same
/// precision as `D`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Type {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F,
    D,
    LD,
    P,
    Blk(u8),
    RBlk,
    Undef,
}

pub const MAX_BLK_CASE: u8 = 4;

impl Type {
    pub fn blk(case: u8) -> Self {
        assert!(case <= MAX_BLK_CASE, "block case {case} out of range");
        Type::Blk(case)
    }

    /// Integer-like types, pointers included.
    pub fn is_int(self) -> bool {
        matches!(
            self,
            Type::I8 | Type::U8 | Type::I16 | Type::U16 | Type::I32 | Type::U32 | Type::I64 | Type::U64 | Type::P
        )
    }

    pub fn is_fp(self) -> bool {
        matches!(self, Type::F | Type::D | Type::LD)
    }

    /// Any block type, including the result block.
    pub fn is_blk(self) -> bool {
        matches!(self, Type::Blk(_) | Type::RBlk)
    }

    /// Size in bytes of a scalar of this type in interpreter memory. Blocks report 0; their size
    /// travels with the variable or operand that uses them.
    pub fn size(self) -> usize {
        match self {
            Type::I8 | Type::U8 => 1,
            Type::I16 | Type::U16 => 2,
            Type::I32 | Type::U32 | Type::F => 4,
            Type::I64 | Type::U64 | Type::D | Type::LD | Type::P => 8,
            Type::Blk(_) | Type::RBlk | Type::Undef => 0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Type::I8 => "i8",
            Type::U8 => "u8",
            Type::I16 => "i16",
            Type::U16 => "u16",
            Type::I32 => "i32",
            Type::U32 => "u32",
            Type::I64 => "i64",
            Type::U64 => "u64",
            Type::F => "f",
            Type::D => "d",
            Type::LD => "ld",
            Type::P => "p",
            Type::Blk(0) => "blk",
            Type::Blk(1) => "blk2",
            Type::Blk(2) => "blk3",
            Type::Blk(3) => "blk4",
            Type::Blk(_) => "blk5",
            Type::RBlk => "rblk",
            Type::Undef => "undef",
        }
    }

    /// Stable small integer used when a type has to travel inside a compiled operand word.
    pub fn code(self) -> u64 {
        match self {
            Type::I8 => 0,
            Type::U8 => 1,
            Type::I16 => 2,
            Type::U16 => 3,
            Type::I32 => 4,
            Type::U32 => 5,
            Type::I64 => 6,
            Type::U64 => 7,
            Type::F => 8,
            Type::D => 9,
            Type::LD => 10,
            Type::P => 11,
            Type::Blk(n) => 12 + n as u64,
            Type::RBlk => 17,
            Type::Undef => 18,
        }
    }

    pub fn from_code(code: u64) -> Option<Self> {
        Some(match code {
            0 => Type::I8,
            1 => Type::U8,
            2 => Type::I16,
            3 => Type::U16,
            4 => Type::I32,
            5 => Type::U32,
            6 => Type::I64,
            7 => Type::U64,
            8 => Type::F,
            9 => Type::D,
            10 => Type::LD,
            11 => Type::P,
            12..=16 => Type::Blk((code - 12) as u8),
            17 => Type::RBlk,
            18 => Type::Undef,
            _ => return None,
        })
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
