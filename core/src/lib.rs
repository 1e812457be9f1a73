//! Bytecode interpreter for a low-level, typed, register-based IR.
//!
//! [`ir`] models the validated input, [`vm`] compiles it into a flat executable array and runs
//! it, bridging calls to and from native code through the target hooks.

pub mod ir;
pub mod perf;
pub mod util;
pub mod vm;
