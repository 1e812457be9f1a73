use std::fmt;

use crate::ir::Type;

/// Argument layout entry of a call shape. `size` is only meaningful for block types and is
/// zero otherwise, so derived equality compares block sizes and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArgDesc {
    pub ty: Type,
    pub size: u64,
}

impl ArgDesc {
    pub fn new(ty: Type, size: u64) -> Self {
        Self {
            ty,
            size: if ty.is_blk() { size } else { 0 },
        }
    }

    pub fn scalar(ty: Type) -> Self {
        Self::new(ty, 0)
    }
}

/// Key of the interface cache: result types, argument layout and how many leading arguments
/// are named (the rest form the variadic tail).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallShape {
    pub results: Vec<Type>,
    pub args: Vec<ArgDesc>,
    pub nfixed: usize,
}

impl CallShape {
    pub fn new(results: Vec<Type>, args: Vec<ArgDesc>, nfixed: usize) -> Self {
        debug_assert!(nfixed <= args.len());
        Self { results, args, nfixed }
    }

    pub fn nres(&self) -> usize {
        self.results.len()
    }

    pub fn nargs(&self) -> usize {
        self.args.len()
    }

    pub fn variadic(&self) -> &[ArgDesc] {
        &self.args[self.nfixed..]
    }
}

impl fmt::Display for CallShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            if i == self.nfixed {
                f.write_str("...")?;
            }
            write!(f, "{}", arg.ty)?;
            if arg.ty.is_blk() {
                write!(f, "[{}]", arg.size)?;
            }
        }
        f.write_str(") -> (")?;
        for (i, ty) in self.results.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{ty}")?;
        }
        f.write_str(")")
    }
}
