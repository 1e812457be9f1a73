//! Hash containers keyed by small integers, shapes and names.
//!
//! Keys never come from untrusted input, so the non-randomized Fx hasher is used throughout.

pub type FastHashMap<K, V> = rustc_hash::FxHashMap<K, V>;

pub type FastHashSet<K> = rustc_hash::FxHashSet<K>;

#[inline]
pub fn fast_hash_map_new<K, V>() -> FastHashMap<K, V> {
    FastHashMap::default()
}

#[inline]
pub fn fast_hash_set_new<K>() -> FastHashSet<K> {
    FastHashSet::default()
}
