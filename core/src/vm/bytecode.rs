use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::ir::{FuncId, InsnCode, ProtoId, Type};
use crate::vm::ffi::{ArgDesc, CallShape, Thunk};
use crate::vm::runtime::Handler;
use crate::vm::slot::Slot;

/// Invokes `$callback!` with the complete tag list: tags shared with IR instruction codes first,
/// then the compiler-internal tags with their display names.
macro_rules! with_tags {
    ($callback:ident) => {
        $callback! {
            shared: [
                Mov, FMov, DMov, LdMov,
                Ext8, Ext16, Ext32, UExt8, UExt16, UExt32,
                I2F, I2D, I2Ld, Ui2F, Ui2D, Ui2Ld, F2I, D2I, Ld2I,
                F2D, F2Ld, D2F, D2Ld, Ld2F, Ld2D,
                Neg, NegS, FNeg, DNeg, LdNeg,
                Add, AddS, FAdd, DAdd, LdAdd,
                Sub, SubS, FSub, DSub, LdSub,
                Mul, MulS, FMul, DMul, LdMul,
                Div, DivS, UDiv, UDivS, FDiv, DDiv, LdDiv,
                Mod, ModS, UMod, UModS,
                And, AndS, Or, OrS, Xor, XorS,
                Lsh, LshS, Rsh, RshS, URsh, URshS,
                Eq, EqS, FEq, DEq, LdEq,
                Ne, NeS, FNe, DNe, LdNe,
                Lt, LtS, ULt, ULtS, FLt, DLt, LdLt,
                Le, LeS, ULe, ULeS, FLe, DLe, LdLe,
                Gt, GtS, UGt, UGtS, FGt, DGt, LdGt,
                Ge, GeS, UGe, UGeS, FGe, DGe, LdGe,
                AddO, AddOS, SubO, SubOS, MulO, MulOS, UMulO, UMulOS,
                Jmp, Bt, BtS, Bf, BfS,
                Beq, BeqS, FBeq, DBeq, LdBeq,
                Bne, BneS, FBne, DBne, LdBne,
                Blt, BltS, UBlt, UBltS, FBlt, DBlt, LdBlt,
                Ble, BleS, UBle, UBleS, FBle, DBle, LdBle,
                Bgt, BgtS, UBgt, UBgtS, FBgt, DBgt, LdBgt,
                Bge, BgeS, UBge, UBgeS, FBge, DBge, LdBge,
                Bo, Ubo, Bno, Ubno,
                LAddr, JmpI,
                Call, JCall, Switch, Ret, JRet,
                Alloca, BStart, BEnd,
                VaArg, VaBlockArg, VaStart, VaEnd,
            ],
            internal: [
                Ldi8 => "ldi8", Ldu8 => "ldu8", Ldi16 => "ldi16", Ldu16 => "ldu16",
                Ldi32 => "ldi32", Ldu32 => "ldu32", Ldi64 => "ldi64",
                Ldf => "ldf", Ldd => "ldd", Ldld => "ldld",
                Sti8 => "sti8", Stu8 => "stu8", Sti16 => "sti16", Stu16 => "stu16",
                Sti32 => "sti32", Stu32 => "stu32", Sti64 => "sti64",
                Stf => "stf", Std => "std", Stld => "stld",
                Movi => "movi", Movp => "movp", Movf => "movf", Movd => "movd", Movld => "movld",
                ImmCall => "imm_call", ImmJCall => "imm_jcall",
                MovFg => "movfg", FMovFg => "fmovfg", DMovFg => "dmovfg", LdMovFg => "ldmovfg",
                MovTg => "movtg", FMovTg => "fmovtg", DMovTg => "dmovtg", LdMovTg => "ldmovtg",
            ]
        }
    };
}
pub(crate) use with_tags;

macro_rules! define_tags {
    (shared: [$($s:ident),* $(,)?], internal: [$($i:ident => $iname:literal),* $(,)?]) => {
        /// Opcode of the compiled array.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u16)]
        pub enum Tag {
            $($s,)*
            $($i,)*
        }

        impl Tag {
            pub const ALL: &'static [Tag] = &[$(Tag::$s,)* $(Tag::$i,)*];
            pub const COUNT: usize = Self::ALL.len();

            pub fn name(self) -> &'static str {
                match self {
                    $(Tag::$s => InsnCode::$s.name(),)*
                    $(Tag::$i => $iname,)*
                }
            }

            /// Tag that executes `code` unchanged, if there is one.
            pub fn for_insn(code: InsnCode) -> Option<Tag> {
                match code {
                    $(InsnCode::$s => Some(Tag::$s),)*
                    _ => None,
                }
            }

            /// Fixed operand word count, `None` when the first operand word holds the count.
            #[allow(unreachable_patterns)]
            pub fn operand_words(self) -> Option<usize> {
                match self {
                    Tag::ImmCall | Tag::ImmJCall => None,
                    $(Tag::$s => InsnCode::$s.arity(),)*
                    $(Tag::$i => Some(2),)*
                }
            }
        }
    };
}

with_tags!(define_tags);

impl Tag {
    #[inline(always)]
    pub const fn from_u16(raw: u16) -> Option<Tag> {
        if (raw as usize) < Self::COUNT {
            Some(Self::ALL[raw as usize])
        } else {
            None
        }
    }

    #[inline(always)]
    pub const fn encode(self) -> Slot {
        Slot::from_u64(self as u16 as u64)
    }

    pub fn is_call(self) -> bool {
        matches!(self, Tag::Call | Tag::JCall | Tag::ImmCall | Tag::ImmJCall)
    }
}

/// Words occupied by the instruction whose tag sits at `pc`.
pub(crate) fn insn_width(code: &[Slot], pc: usize, tag: Tag) -> usize {
    match tag.operand_words() {
        Some(n) => 1 + n,
        None => 2 + code[pc + 1].index(),
    }
}

/// Call site side table entry.
///
/// Compiled call instructions refer to their entry by index. `thunk` is the reserved per-site
/// slot: filled on first execution and consulted before the context-wide interface cache.
pub struct CallSite {
    pub(crate) proto: ProtoId,
    pub(crate) res_types: Box<[Type]>,
    pub(crate) args: Box<[ArgDesc]>,
    pub(crate) nfixed: usize,
    pub(crate) thunk: OnceCell<Thunk>,
}

impl CallSite {
    pub fn proto(&self) -> ProtoId {
        self.proto
    }

    pub fn nres(&self) -> usize {
        self.res_types.len()
    }

    pub fn nargs(&self) -> usize {
        self.args.len()
    }

    pub fn shape(&self) -> CallShape {
        CallShape::new(self.res_types.to_vec(), self.args.to_vec(), self.nfixed)
    }

    pub fn has_cached_thunk(&self) -> bool {
        self.thunk.get().is_some()
    }
}

impl fmt::Debug for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallSite")
            .field("proto", &self.proto)
            .field("res_types", &self.res_types)
            .field("args", &self.args)
            .field("nfixed", &self.nfixed)
            .field("thunk", &self.thunk.get().map(|_| "<cached>"))
            .finish()
    }
}

/// Flat executable form of one function.
pub struct CompiledFunc {
    pub(crate) func: FuncId,
    pub(crate) name: Arc<str>,
    pub(crate) nregs: usize,
    pub(crate) code: Box<[Slot]>,
    pub(crate) call_sites: Box<[CallSite]>,
    /// Sorted offsets of every label; the only valid indirect-branch destinations.
    pub(crate) labels: Box<[usize]>,
    /// Per-slot handlers for direct dispatch, resolved on first direct run.
    pub(crate) threaded: OnceCell<Box<[Handler]>>,
}

impl CompiledFunc {
    pub fn func(&self) -> FuncId {
        self.func
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Frame size in slots: highest register used plus one.
    pub fn nregs(&self) -> usize {
        self.nregs
    }

    pub fn code(&self) -> &[Slot] {
        &self.code
    }

    pub fn call_sites(&self) -> &[CallSite] {
        &self.call_sites
    }

    pub(crate) fn is_label(&self, offset: usize) -> bool {
        self.labels.binary_search(&offset).is_ok()
    }

    /// Whether direct dispatch has resolved this function's handler array yet.
    pub fn is_threaded(&self) -> bool {
        self.threaded.get().is_some()
    }

    /// Start offset and tag of every compiled instruction, in order.
    pub fn insn_starts(&self) -> Vec<(usize, Tag)> {
        let mut out = Vec::new();
        let mut pc = 0;
        while pc < self.code.len() {
            let Some(tag) = Tag::from_u16(self.code[pc].u() as u16) else {
                break;
            };
            out.push((pc, tag));
            pc += insn_width(&self.code, pc, tag);
        }
        out
    }

    /// Branch targets embedded in the array, as `(instruction start, target offset)`.
    pub fn branch_targets(&self) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        for (pc, tag) in self.insn_starts() {
            match tag {
                Tag::Jmp | Tag::Bo | Tag::Ubo | Tag::Bno | Tag::Ubno => out.push((pc, self.code[pc + 1].index())),
                Tag::LAddr => out.push((pc, self.code[pc + 2].index())),
                Tag::Switch => {
                    let n = self.code[pc + 1].index();
                    for k in 1..n {
                        out.push((pc, self.code[pc + 2 + k].index()));
                    }
                }
                t if is_cond_branch(t) => out.push((pc, self.code[pc + 1].index())),
                _ => {}
            }
        }
        out
    }

    pub fn disassemble(&self) -> String {
        format!("{self:?}")
    }
}

pub(crate) fn is_cond_branch(tag: Tag) -> bool {
    use Tag::*;
    matches!(
        tag,
        Bt | BtS
            | Bf
            | BfS
            | Beq
            | BeqS
            | FBeq
            | DBeq
            | LdBeq
            | Bne
            | BneS
            | FBne
            | DBne
            | LdBne
            | Blt
            | BltS
            | UBlt
            | UBltS
            | FBlt
            | DBlt
            | LdBlt
            | Ble
            | BleS
            | UBle
            | UBleS
            | FBle
            | DBle
            | LdBle
            | Bgt
            | BgtS
            | UBgt
            | UBgtS
            | FBgt
            | DBgt
            | LdBgt
            | Bge
            | BgeS
            | UBge
            | UBgeS
            | FBge
            | DBge
            | LdBge
    )
}

impl fmt::Debug for CompiledFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "func {} (nregs={}, words={})", self.name, self.nregs, self.code.len())?;
        for (pc, tag) in self.insn_starts() {
            let width = insn_width(&self.code, pc, tag);
            let ops = &self.code[pc + 1..pc + width];
            write!(f, "{pc:5}: {}", tag.name())?;
            for (k, word) in ops.iter().enumerate() {
                f.write_str(if k == 0 { "\t" } else { ", " })?;
                match (tag, k) {
                    (Tag::Movf, 1) => write!(f, "{}f", word.f())?,
                    (Tag::Movd, 1) | (Tag::Movld, 1) => write!(f, "{}", word.d())?,
                    (Tag::Movp, 1) | (Tag::ImmCall, 2) | (Tag::ImmJCall, 2) => write!(f, "{:?}", word.addr())?,
                    (Tag::Movi, 1) => write!(f, "{}", word.i())?,
                    (Tag::Call | Tag::JCall | Tag::ImmCall | Tag::ImmJCall, 1) => write!(f, "site{}", word.u())?,
                    _ => write!(f, "{}", word.i())?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
