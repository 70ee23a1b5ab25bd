//! Registry map types and the hasher behind stable hook identifiers.
//!
//! `ahash`/`hashbrown` by default; the `std-hash` feature swaps both for
//! their `std` equivalents.

use std::hash::{Hash, Hasher};

#[cfg(not(feature = "std-hash"))]
pub mod map {
    pub use hashbrown::{HashMap, HashSet};
}

#[cfg(feature = "std-hash")]
pub mod map {
    pub use std::collections::{HashMap, HashSet};
}

#[cfg(not(feature = "std-hash"))]
type DefaultHasher = ahash::AHasher;

#[cfg(feature = "std-hash")]
type DefaultHasher = std::collections::hash_map::DefaultHasher;

/// Hashes one value with whichever default hasher is active. Stable within
/// a process run, which is all hook-id derivation needs.
pub fn stable_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::default();
    value.hash(&mut hasher);
    hasher.finish()
}
