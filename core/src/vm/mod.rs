//! Interpreter subsystem
//!
//! Compiler from IR functions to the flat slot array, the execution engine with its two
//! dispatch modes, the call bridge to native code and the per-context state tying them
//! together.

pub mod abi;
pub mod alloc;
pub mod bytecode;
mod compiler;
pub mod config;
mod context;
pub mod error;
pub mod ffi;
mod runtime;
pub mod setjmp;
pub mod slot;

pub use abi::{GLOBAL_SLOTS, PortableAbi, TargetAbi, VaArea};
pub use alloc::Memory;
pub use bytecode::{CallSite, CompiledFunc, Tag};
pub use config::{DispatchMode, InterpConfig};
pub use context::{ErrorHandler, Interp};
pub use error::{ErrorKind, InterpError};
pub use ffi::{ArgDesc, CacheStats, CallShape, HostFn, PortableThunks, ThunkGenerator};
pub use slot::{Addr, AddrKind, Slot};

#[cfg(test)]
mod interp_test;
