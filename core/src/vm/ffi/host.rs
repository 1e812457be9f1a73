use std::fmt;
use std::sync::Arc;

use anyhow::Result;

use crate::util::fast_map::{FastHashMap, fast_hash_map_new};
use crate::vm::context::Interp;
use crate::vm::slot::Slot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostId(pub u32);

/// Native function callable from interpreted code: `(context, args, results)`.
pub type HostFn = Arc<dyn Fn(&mut Interp, &[Slot], &mut [Slot]) -> Result<()> + Send + Sync>;

#[derive(Clone)]
pub struct HostFunc {
    pub name: String,
    pub nres: usize,
    pub f: HostFn,
}

impl fmt::Debug for HostFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostFunc")
            .field("name", &self.name)
            .field("nres", &self.nres)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
pub struct HostRegistry {
    funcs: Vec<HostFunc>,
    by_name: FastHashMap<String, HostId>,
}

impl HostRegistry {
    pub fn new() -> Self {
        Self {
            funcs: Vec::new(),
            by_name: fast_hash_map_new(),
        }
    }

    /// Registers `f` under `name`; re-registering a name replaces the function but keeps its id,
    /// so addresses handed out earlier stay valid.
    pub fn register(&mut self, name: &str, nres: usize, f: HostFn) -> HostId {
        let entry = HostFunc {
            name: name.to_string(),
            nres,
            f,
        };
        if let Some(id) = self.by_name.get(name).copied() {
            self.funcs[id.0 as usize] = entry;
            return id;
        }
        let id = HostId(self.funcs.len() as u32);
        self.funcs.push(entry);
        self.by_name.insert(name.to_string(), id);
        id
    }

    pub fn lookup(&self, name: &str) -> Option<HostId> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, id: HostId) -> Option<&HostFunc> {
        self.funcs.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.funcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.funcs.is_empty()
    }
}
