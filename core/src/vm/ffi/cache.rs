use anyhow::Result;
use tracing::debug;

use super::shape::CallShape;
use super::thunk::{Thunk, ThunkGenerator};
use crate::util::fast_map::{FastHashMap, fast_hash_map_new};

/// Counters exposed through [`crate::vm::Interp::cache_stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Thunks produced by the generator.
    pub generated: u64,
    /// Lookups answered by the shape table.
    pub hits: u64,
    /// Calls answered by a call site's own cached thunk, without touching the table.
    pub site_hits: u64,
}

/// Context-wide table of call thunks keyed by call shape.
///
/// Entries live as long as the owning context; a shape is generated at most once.
pub struct InterfaceCache {
    table: FastHashMap<CallShape, Thunk>,
    stats: CacheStats,
}

impl Default for InterfaceCache {
    fn default() -> Self {
        Self::new()
    }
}

impl InterfaceCache {
    pub fn new() -> Self {
        Self {
            table: fast_hash_map_new(),
            stats: CacheStats::default(),
        }
    }

    pub fn lookup_or_generate(&mut self, shape: &CallShape, generator: &dyn ThunkGenerator) -> Result<Thunk> {
        if let Some(thunk) = self.table.get(shape) {
            self.stats.hits += 1;
            return Ok(thunk.clone());
        }
        let thunk = generator.call_thunk(shape)?;
        self.stats.generated += 1;
        debug!(target: "mir::interp::ffi", %shape, total = self.table.len() + 1, "generated call thunk");
        self.table.insert(shape.clone(), thunk.clone());
        Ok(thunk)
    }

    #[inline]
    pub(crate) fn note_site_hit(&mut self) {
        self.stats.site_hits += 1;
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
