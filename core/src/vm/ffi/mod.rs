//! Call bridge between interpreted frames and native calling conventions.

pub mod cache;
pub(crate) mod entry;
pub mod host;
pub(crate) mod marshal;
pub mod shape;
pub mod thunk;

pub use cache::{CacheStats, InterfaceCache};
pub use host::{HostFn, HostFunc, HostId, HostRegistry};
pub use shape::{ArgDesc, CallShape};
pub use thunk::{EntryShim, EntrySignature, PortableThunks, Thunk, ThunkGenerator};
