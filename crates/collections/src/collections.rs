//! Collection aliases used across the Tilda crates.
//!
//! `FxHashMap`/`FxHashSet` hash small integer keys (pids, instance numbers,
//! keycodes) faster than the std hasher. `IndexMap` keeps insertion order.

pub use rustc_hash::{FxBuildHasher, FxHashMap, FxHashSet};

/// Insertion-ordered hash map with FxHash.
pub type IndexMap<K, V> = indexmap::IndexMap<K, V, FxBuildHasher>;
