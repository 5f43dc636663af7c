// This file is Copyright its original authors, visible in version control
// history.
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

//! Generally this crate uses `std`'s `HashMap`s, however when built with the `hashbrown` feature,
//! `hashbrown`'s `HashMap`s are used instead.
//!
//! This module simply re-exports the `HashMap` used in the crate for public consumption.

#[cfg(not(feature = "hashbrown"))]
mod std_hashtables {
	pub use std::collections::{HashMap, HashSet};

	pub(crate) use std::collections::hash_map;
}
#[cfg(not(feature = "hashbrown"))]
pub use std_hashtables::*;

#[cfg(feature = "hashbrown")]
mod hashbrown_tables {
	pub use hashbrown::{HashMap, HashSet};

	pub(crate) use hashbrown::hash_map;
}
#[cfg(feature = "hashbrown")]
pub use hashbrown_tables::*;

/// Builds a new [`HashMap`].
pub fn new_hash_map<K, V>() -> HashMap<K, V> {
	HashMap::new()
}

/// Builds a new [`HashMap`] with the given capacity.
pub fn hash_map_with_capacity<K, V>(cap: usize) -> HashMap<K, V> {
	HashMap::with_capacity(cap)
}

pub(crate) fn new_hash_set<K>() -> HashSet<K> {
	HashSet::new()
}
