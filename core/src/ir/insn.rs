use std::fmt;

use super::module::ItemRef;
use super::types::Type;

macro_rules! insn_codes {
    ($($variant:ident => $name:literal, $arity:expr;)*) => {
        /// Instruction codes of the IR.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum InsnCode {
            $($variant,)*
        }

        impl InsnCode {
            pub const ALL: &'static [InsnCode] = &[$(InsnCode::$variant,)*];

            pub fn name(self) -> &'static str {
                match self {
                    $(InsnCode::$variant => $name,)*
                }
            }

            /// Fixed operand count, `None` for variadic instructions.
            pub fn arity(self) -> Option<usize> {
                match self {
                    $(InsnCode::$variant => $arity,)*
                }
            }
        }
    };
}

insn_codes! {
    Mov => "mov", Some(2);
    FMov => "fmov", Some(2);
    DMov => "dmov", Some(2);
    LdMov => "ldmov", Some(2);
    Ext8 => "ext8", Some(2);
    Ext16 => "ext16", Some(2);
    Ext32 => "ext32", Some(2);
    UExt8 => "uext8", Some(2);
    UExt16 => "uext16", Some(2);
    UExt32 => "uext32", Some(2);
    I2F => "i2f", Some(2);
    I2D => "i2d", Some(2);
    I2Ld => "i2ld", Some(2);
    Ui2F => "ui2f", Some(2);
    Ui2D => "ui2d", Some(2);
    Ui2Ld => "ui2ld", Some(2);
    F2I => "f2i", Some(2);
    D2I => "d2i", Some(2);
    Ld2I => "ld2i", Some(2);
    F2D => "f2d", Some(2);
    F2Ld => "f2ld", Some(2);
    D2F => "d2f", Some(2);
    D2Ld => "d2ld", Some(2);
    Ld2F => "ld2f", Some(2);
    Ld2D => "ld2d", Some(2);
    Neg => "neg", Some(2);
    NegS => "negs", Some(2);
    FNeg => "fneg", Some(2);
    DNeg => "dneg", Some(2);
    LdNeg => "ldneg", Some(2);
    Addr => "addr", Some(2);
    Addr8 => "addr8", Some(2);
    Addr16 => "addr16", Some(2);
    Addr32 => "addr32", Some(2);
    Add => "add", Some(3);
    AddS => "adds", Some(3);
    FAdd => "fadd", Some(3);
    DAdd => "dadd", Some(3);
    LdAdd => "ldadd", Some(3);
    Sub => "sub", Some(3);
    SubS => "subs", Some(3);
    FSub => "fsub", Some(3);
    DSub => "dsub", Some(3);
    LdSub => "ldsub", Some(3);
    Mul => "mul", Some(3);
    MulS => "muls", Some(3);
    FMul => "fmul", Some(3);
    DMul => "dmul", Some(3);
    LdMul => "ldmul", Some(3);
    Div => "div", Some(3);
    DivS => "divs", Some(3);
    UDiv => "udiv", Some(3);
    UDivS => "udivs", Some(3);
    FDiv => "fdiv", Some(3);
    DDiv => "ddiv", Some(3);
    LdDiv => "lddiv", Some(3);
    Mod => "mod", Some(3);
    ModS => "mods", Some(3);
    UMod => "umod", Some(3);
    UModS => "umods", Some(3);
    And => "and", Some(3);
    AndS => "ands", Some(3);
    Or => "or", Some(3);
    OrS => "ors", Some(3);
    Xor => "xor", Some(3);
    XorS => "xors", Some(3);
    Lsh => "lsh", Some(3);
    LshS => "lshs", Some(3);
    Rsh => "rsh", Some(3);
    RshS => "rshs", Some(3);
    URsh => "ursh", Some(3);
    URshS => "urshs", Some(3);
    Eq => "eq", Some(3);
    EqS => "eqs", Some(3);
    FEq => "feq", Some(3);
    DEq => "deq", Some(3);
    LdEq => "ldeq", Some(3);
    Ne => "ne", Some(3);
    NeS => "nes", Some(3);
    FNe => "fne", Some(3);
    DNe => "dne", Some(3);
    LdNe => "ldne", Some(3);
    Lt => "lt", Some(3);
    LtS => "lts", Some(3);
    ULt => "ult", Some(3);
    ULtS => "ults", Some(3);
    FLt => "flt", Some(3);
    DLt => "dlt", Some(3);
    LdLt => "ldlt", Some(3);
    Le => "le", Some(3);
    LeS => "les", Some(3);
    ULe => "ule", Some(3);
    ULeS => "ules", Some(3);
    FLe => "fle", Some(3);
    DLe => "dle", Some(3);
    LdLe => "ldle", Some(3);
    Gt => "gt", Some(3);
    GtS => "gts", Some(3);
    UGt => "ugt", Some(3);
    UGtS => "ugts", Some(3);
    FGt => "fgt", Some(3);
    DGt => "dgt", Some(3);
    LdGt => "ldgt", Some(3);
    Ge => "ge", Some(3);
    GeS => "ges", Some(3);
    UGe => "uge", Some(3);
    UGeS => "uges", Some(3);
    FGe => "fge", Some(3);
    DGe => "dge", Some(3);
    LdGe => "ldge", Some(3);
    AddO => "addo", Some(3);
    AddOS => "addos", Some(3);
    SubO => "subo", Some(3);
    SubOS => "subos", Some(3);
    MulO => "mulo", Some(3);
    MulOS => "mulos", Some(3);
    UMulO => "umulo", Some(3);
    UMulOS => "umulos", Some(3);
    Jmp => "jmp", Some(1);
    Bt => "bt", Some(2);
    BtS => "bts", Some(2);
    Bf => "bf", Some(2);
    BfS => "bfs", Some(2);
    Beq => "beq", Some(3);
    BeqS => "beqs", Some(3);
    FBeq => "fbeq", Some(3);
    DBeq => "dbeq", Some(3);
    LdBeq => "ldbeq", Some(3);
    Bne => "bne", Some(3);
    BneS => "bnes", Some(3);
    FBne => "fbne", Some(3);
    DBne => "dbne", Some(3);
    LdBne => "ldbne", Some(3);
    Blt => "blt", Some(3);
    BltS => "blts", Some(3);
    UBlt => "ublt", Some(3);
    UBltS => "ublts", Some(3);
    FBlt => "fblt", Some(3);
    DBlt => "dblt", Some(3);
    LdBlt => "ldblt", Some(3);
    Ble => "ble", Some(3);
    BleS => "bles", Some(3);
    UBle => "uble", Some(3);
    UBleS => "ubles", Some(3);
    FBle => "fble", Some(3);
    DBle => "dble", Some(3);
    LdBle => "ldble", Some(3);
    Bgt => "bgt", Some(3);
    BgtS => "bgts", Some(3);
    UBgt => "ubgt", Some(3);
    UBgtS => "ubgts", Some(3);
    FBgt => "fbgt", Some(3);
    DBgt => "dbgt", Some(3);
    LdBgt => "ldbgt", Some(3);
    Bge => "bge", Some(3);
    BgeS => "bges", Some(3);
    UBge => "ubge", Some(3);
    UBgeS => "ubges", Some(3);
    FBge => "fbge", Some(3);
    DBge => "dbge", Some(3);
    LdBge => "ldbge", Some(3);
    Bo => "bo", Some(1);
    Ubo => "ubo", Some(1);
    Bno => "bno", Some(1);
    Ubno => "ubno", Some(1);
    LAddr => "laddr", Some(2);
    JmpI => "jmpi", Some(1);
    Call => "call", None;
    Inline => "inline", None;
    JCall => "jcall", None;
    Switch => "switch", None;
    Ret => "ret", None;
    JRet => "jret", Some(1);
    Alloca => "alloca", Some(2);
    BStart => "bstart", Some(1);
    BEnd => "bend", Some(1);
    VaArg => "va_arg", Some(3);
    VaBlockArg => "va_block_arg", Some(4);
    VaStart => "va_start", Some(1);
    VaEnd => "va_end", Some(1);
    Label => "label", Some(1);
    Unspec => "unspec", None;
    PrSet => "prset", Some(3);
    PrBeq => "prbeq", Some(3);
    PrBne => "prbne", Some(3);
    Use => "use", None;
    Phi => "phi", None;
    Invalid => "invalid_insn", Some(0);
}

impl InsnCode {
    pub fn is_call(self) -> bool {
        matches!(self, InsnCode::Call | InsnCode::Inline | InsnCode::JCall)
    }
}

impl fmt::Display for InsnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Symbolic register. Register 0 is reserved; function arguments occupy 1..=nargs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Reg(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub u32);

/// Memory operand `ty: disp(base, index, scale)`.
///
/// Call block arguments reuse this shape with `disp` holding the block size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mem {
    pub ty: Type,
    pub disp: i64,
    pub base: Option<Reg>,
    pub index: Option<Reg>,
    pub scale: u8,
}

impl Mem {
    /// Memory reference through a base register only.
    pub fn base(ty: Type, base: Reg) -> Self {
        Self {
            ty,
            disp: 0,
            base: Some(base),
            index: None,
            scale: 1,
        }
    }

    /// Block argument of `size` bytes whose address is held in `base`.
    pub fn block(ty: Type, base: Reg, size: u64) -> Self {
        Self {
            ty,
            disp: size as i64,
            base: Some(base),
            index: None,
            scale: 1,
        }
    }

    pub fn is_base_only(&self) -> bool {
        self.base.is_some() && self.index.is_none() && self.disp == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    Reg(Reg),
    Int(i64),
    Uint(u64),
    Float(f32),
    Double(f64),
    LDouble(f64),
    Ref(ItemRef),
    Mem(Mem),
    Label(Label),
}

impl From<Reg> for Operand {
    fn from(value: Reg) -> Self {
        Operand::Reg(value)
    }
}

impl From<Label> for Operand {
    fn from(value: Label) -> Self {
        Operand::Label(value)
    }
}

impl From<Mem> for Operand {
    fn from(value: Mem) -> Self {
        Operand::Mem(value)
    }
}

impl From<ItemRef> for Operand {
    fn from(value: ItemRef) -> Self {
        Operand::Ref(value)
    }
}

impl From<i64> for Operand {
    fn from(value: i64) -> Self {
        Operand::Int(value)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Reg(r) => write!(f, "r{}", r.0),
            Operand::Int(i) => write!(f, "{i}"),
            Operand::Uint(u) => write!(f, "{u}u"),
            Operand::Float(v) => write!(f, "{v}f"),
            Operand::Double(v) => write!(f, "{v}"),
            Operand::LDouble(v) => write!(f, "{v}L"),
            Operand::Ref(item) => write!(f, "{item}"),
            Operand::Label(l) => write!(f, "L{}", l.0),
            Operand::Mem(m) => {
                write!(f, "{}:", m.ty)?;
                if m.disp != 0 {
                    write!(f, "{}", m.disp)?;
                }
                f.write_str("(")?;
                if let Some(base) = m.base {
                    write!(f, "r{}", base.0)?;
                }
                if let Some(index) = m.index {
                    write!(f, ", r{}, {}", index.0, m.scale)?;
                }
                f.write_str(")")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Insn {
    pub code: InsnCode,
    pub ops: Vec<Operand>,
}

impl Insn {
    pub fn new(code: InsnCode, ops: Vec<Operand>) -> Self {
        Self { code, ops }
    }
}

impl fmt::Display for Insn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let (InsnCode::Label, [Operand::Label(l)]) = (self.code, self.ops.as_slice()) {
            return write!(f, "L{}:", l.0);
        }
        f.write_str(self.code.name())?;
        for (i, op) in self.ops.iter().enumerate() {
            f.write_str(if i == 0 { " " } else { ", " })?;
            write!(f, "{op}")?;
        }
        Ok(())
    }
}
