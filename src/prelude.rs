//! Common imports shared across the crate.
//!
//! Re-exports the reference-counting and interior-mutability types the engine
//! is built on, together with the hash collections it standardizes on.

pub use std::{
    cell::{Cell, Ref, RefCell, RefMut},
    collections::VecDeque,
    fmt,
    rc::{Rc, Weak},
};

// ═══════════════════════════════════════════════════════════════════════════════
// Hash collections
// ═══════════════════════════════════════════════════════════════════════════════

pub use rustc_hash::{FxHashMap, FxHashSet};

/// Insertion-ordered map hashed with FxHasher.
///
/// Bindings and properties are kept in insertion order so that enumeration
/// (and therefore every observable iteration) is deterministic.
pub type IndexMap<K, V> =
    indexmap::IndexMap<K, V, core::hash::BuildHasherDefault<rustc_hash::FxHasher>>;

/// Insertion-ordered set hashed with FxHasher.
pub type IndexSet<T> =
    indexmap::IndexSet<T, core::hash::BuildHasherDefault<rustc_hash::FxHasher>>;

/// Create an empty IndexMap
#[inline]
pub fn index_map_new<K, V>() -> IndexMap<K, V>
where
    K: core::hash::Hash + Eq,
{
    indexmap::IndexMap::with_hasher(Default::default())
}

/// Create an empty IndexSet
#[inline]
pub fn index_set_new<T>() -> IndexSet<T>
where
    T: core::hash::Hash + Eq,
{
    indexmap::IndexSet::with_hasher(Default::default())
}
