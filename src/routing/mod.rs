// This file is Copyright its original authors, visible in version control
// history.
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

//! Structs and impls for modeling the channel graph, rating channels and finding routes live here.

pub mod liquidity_hints;
pub mod network_graph;
pub mod pathfinding;
pub mod router;
pub mod scoring;

#[cfg(test)]
pub(crate) mod test_utils;

use crate::routing::liquidity_hints::LiquidityHintManager;

use core::cell::{RefCell, RefMut};
use core::ops::DerefMut;
use std::sync::{Mutex, MutexGuard};

/// A [`LiquidityHintManager`] that is accessed under a lock.
///
/// Needed so that the hints can be shared between route finding and whoever persists them, while
/// a rebalance holds the lock only for as long as it reads or updates knowledge. Payments are
/// never sent while the lock is held.
pub trait LockableLiquidityHints<'a> {
	/// The locked [`LiquidityHintManager`] type.
	type Locked: 'a + DerefMut<Target = LiquidityHintManager>;

	/// Returns the locked hint manager.
	fn lock(&'a self) -> Self::Locked;
}

impl<'a> LockableLiquidityHints<'a> for Mutex<LiquidityHintManager> {
	type Locked = MutexGuard<'a, LiquidityHintManager>;

	fn lock(&'a self) -> MutexGuard<'a, LiquidityHintManager> {
		Mutex::lock(self).unwrap()
	}
}

impl<'a> LockableLiquidityHints<'a> for RefCell<LiquidityHintManager> {
	type Locked = RefMut<'a, LiquidityHintManager>;

	fn lock(&'a self) -> RefMut<'a, LiquidityHintManager> {
		self.borrow_mut()
	}
}

#[cfg(test)]
mod tests {
	use super::LockableLiquidityHints;
	use crate::routing::liquidity_hints::{LiquidityHintManager, LiquidityHintsParameters};
	use crate::routing::test_utils::node_id;

	use core::cell::RefCell;
	use core::time::Duration;
	use std::sync::Mutex;

	#[test]
	fn locked_hints_share_knowledge() {
		let (from, to) = (node_id(2), node_id(3));
		let now = Duration::from_secs(1_000);
		let hints = Mutex::new(LiquidityHintManager::new(node_id(1), LiquidityHintsParameters::default()));
		LockableLiquidityHints::lock(&hints).update_can_send(&from, &to, 42, 1_000, now);
		assert_eq!(LockableLiquidityHints::lock(&hints).can_send(42, from > to, now), Some(1_000));

		let hints = RefCell::new(LiquidityHintManager::new(node_id(1), LiquidityHintsParameters::default()));
		LockableLiquidityHints::lock(&hints).blacklist(42, now);
		assert!(hints.borrow().is_blacklisted(42, now));
	}
}
