//! In-memory model of validated, simplified IR as handed over by the upstream pipeline.

pub mod builder;
pub mod func;
pub mod insn;
pub mod module;
pub mod types;

pub use builder::FuncBuilder;
pub use func::{Func, RegDecl};
pub use insn::{Insn, InsnCode, Label, Mem, Operand, Reg};
pub use module::{DataId, DataItem, FuncId, Import, ImportId, ItemRef, Module, Proto, ProtoId, Var};
pub use types::Type;
