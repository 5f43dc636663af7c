// This file is Copyright its original authors, visible in version control
// history.
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

//! Shortest path searches over a [`NetworkGraph`].
//!
//! Edges are weighted by a callback which is handed the two nodes of a hop and the ids of all
//! channels connecting them, so that parallel channels can be rated together. A weight of
//! [`f64::INFINITY`] makes a hop unusable. Finite weights must not be negative.

use crate::routing::network_graph::{NetworkGraph, NodeId};
use crate::util::hash_tables::{new_hash_map, new_hash_set, HashSet};

use alloc::collections::BinaryHeap;
use core::cmp::Ordering;
use core::fmt;

/// An error returned by a path search.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum PathfindingError {
	/// The target can't be reached from the source over hops with finite weight.
	NoRoute,
}

impl fmt::Debug for PathfindingError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			PathfindingError::NoRoute => f.write_str("No route found"),
		}
	}
}

impl fmt::Display for PathfindingError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		fmt::Debug::fmt(self, f)
	}
}

impl std::error::Error for PathfindingError {}

/// A path through the graph together with the summed weight of its hops.
pub type WeightedPath = (Vec<NodeId>, f64);

// Entries are popped cheapest first. Equal costs are popped in the order they were pushed, so that
// ties are resolved by the order in which the graph lists neighbors.
struct HeapEntry<T> {
	cost: f64,
	counter: u64,
	item: T,
}

impl<T> PartialEq for HeapEntry<T> {
	fn eq(&self, other: &Self) -> bool {
		self.cmp(other) == Ordering::Equal
	}
}

impl<T> Eq for HeapEntry<T> {}

impl<T> PartialOrd for HeapEntry<T> {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl<T> Ord for HeapEntry<T> {
	fn cmp(&self, other: &Self) -> Ordering {
		other
			.cost
			.partial_cmp(&self.cost)
			.unwrap_or(Ordering::Equal)
			.then_with(|| other.counter.cmp(&self.counter))
	}
}

fn dijkstra<W>(
	graph: &NetworkGraph, source: &NodeId, target: &NodeId, weight: &mut W,
	excluded_hops: &HashSet<(NodeId, NodeId)>, excluded_nodes: &HashSet<NodeId>,
) -> Result<WeightedPath, PathfindingError>
where
	W: FnMut(&NodeId, &NodeId, &[u64]) -> f64,
{
	let mut costs = new_hash_map();
	let mut predecessors = new_hash_map();
	let mut visited = new_hash_set();
	let mut heap = BinaryHeap::new();
	let mut counter = 0;

	costs.insert(*source, 0.0);
	heap.push(HeapEntry { cost: 0.0, counter, item: *source });

	while let Some(HeapEntry { cost, item: node, .. }) = heap.pop() {
		if !visited.insert(node) {
			continue;
		}
		if node == *target {
			let mut path = vec![node];
			let mut current = node;
			while let Some(previous) = predecessors.get(&current) {
				path.push(*previous);
				current = *previous;
			}
			path.reverse();
			return Ok((path, cost));
		}

		for neighbor in graph.neighbors(&node) {
			let next = neighbor.node_id;
			if visited.contains(&next)
				|| excluded_nodes.contains(&next)
				|| excluded_hops.contains(&(node, next))
			{
				continue;
			}
			let hop_weight = weight(&node, &next, &neighbor.short_channel_ids);
			if !hop_weight.is_finite() {
				continue;
			}
			let next_cost = cost + hop_weight;
			if costs.get(&next).map_or(true, |known: &f64| next_cost < *known) {
				costs.insert(next, next_cost);
				predecessors.insert(next, node);
				counter += 1;
				heap.push(HeapEntry { cost: next_cost, counter, item: next });
			}
		}
	}
	Err(PathfindingError::NoRoute)
}

/// Finds the cheapest path from `source` to `target`, returning the nodes along it, both ends
/// included, and its cost.
pub fn shortest_path<W>(
	graph: &NetworkGraph, source: &NodeId, target: &NodeId, mut weight: W,
) -> Result<WeightedPath, PathfindingError>
where
	W: FnMut(&NodeId, &NodeId, &[u64]) -> f64,
{
	dijkstra(graph, source, target, &mut weight, &new_hash_set(), &new_hash_set())
}

/// Sums the weights of all hops along `path`. Returns infinity if any hop is unusable.
pub fn path_cost<W>(graph: &NetworkGraph, path: &[NodeId], mut weight: W) -> f64
where
	W: FnMut(&NodeId, &NodeId, &[u64]) -> f64,
{
	path.windows(2)
		.map(|hop| weight(&hop[0], &hop[1], graph.channels_between(&hop[0], &hop[1])))
		.sum()
}

/// Drops all paths which cost `max_cost` or more. Such paths can only be found by forcing the
/// use of blacklisted nodes.
pub fn discard_high_cost_paths(paths: Vec<WeightedPath>, max_cost: f64) -> Vec<WeightedPath> {
	paths.into_iter().filter(|(_, cost)| *cost < max_cost).collect()
}

/// Finds up to `k` loopless paths from `source` to `target` in order of non-decreasing cost.
///
/// Starting from the shortest path, every prefix of the most recently accepted path is used as a
/// root from which a deviating spur path is searched, with the hops which would lead back onto an
/// accepted path removed. The cheapest of all candidates found this way is accepted next. Fewer
/// than `k` paths are returned if no more exist, and paths costing `max_cost` or more are dropped.
pub fn k_shortest_paths<W>(
	graph: &NetworkGraph, source: &NodeId, target: &NodeId, k: usize, max_cost: f64, mut weight: W,
) -> Vec<WeightedPath>
where
	W: FnMut(&NodeId, &NodeId, &[u64]) -> f64,
{
	if k == 0 {
		return Vec::new();
	}
	let first = match dijkstra(graph, source, target, &mut weight, &new_hash_set(), &new_hash_set()) {
		Ok(path) => path,
		Err(PathfindingError::NoRoute) => return Vec::new(),
	};

	let mut seen: HashSet<Vec<NodeId>> = new_hash_set();
	seen.insert(first.0.clone());
	let mut accepted = vec![first];
	let mut candidates = BinaryHeap::new();
	let mut counter = 0u64;

	while accepted.len() < k {
		let last = match accepted.last() {
			Some((path, _)) => path.clone(),
			None => break,
		};
		for spur_index in 0..last.len().saturating_sub(1) {
			let spur_node = &last[spur_index];
			let root = &last[..=spur_index];

			let mut excluded_hops = new_hash_set();
			for (path, _) in accepted.iter() {
				if path.len() > spur_index + 1 && path[..=spur_index] == *root {
					excluded_hops.insert((path[spur_index], path[spur_index + 1]));
				}
			}
			let excluded_nodes: HashSet<NodeId> = root[..spur_index].iter().copied().collect();

			let spur = dijkstra(graph, spur_node, target, &mut weight, &excluded_hops, &excluded_nodes);
			if let Ok((spur_path, _)) = spur {
				let mut path = root[..spur_index].to_vec();
				path.extend(spur_path);
				if !seen.insert(path.clone()) {
					continue;
				}
				let cost = path_cost(graph, &path, &mut weight);
				if cost.is_finite() {
					counter += 1;
					candidates.push(HeapEntry { cost, counter, item: path });
				}
			}
		}

		match candidates.pop() {
			Some(HeapEntry { cost, item, .. }) => accepted.push((item, cost)),
			None => break,
		}
	}

	discard_high_cost_paths(accepted, max_cost)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::routing::liquidity_hints::{LiquidityHintManager, LiquidityHintsParameters};
	use crate::routing::scoring::{ChannelRater, ChannelRatingParameters};
	use crate::routing::test_utils::{add_channel, build_routing_graph, node_id};

	use core::time::Duration;

	const NOW: Duration = Duration::from_secs(1_700_000_000);
	const AMOUNT_MSAT: u64 = 100_000_000;

	#[test]
	fn follows_learned_liquidity() {
		let (graph, [a, b, c, d, e]) = build_routing_graph();
		let mut hints = LiquidityHintManager::new(a, LiquidityHintsParameters::default());
		let rater = ChannelRater::new(&graph, a, ChannelRatingParameters::default());

		let route = |hints: &LiquidityHintManager| {
			shortest_path(&graph, &a, &e, |from, to, scids| {
				rater.weight_for_directed_pair(hints, from, to, scids, AMOUNT_MSAT, NOW)
			})
			.unwrap()
		};

		let (path, cost) = route(&hints);
		assert_eq!(path, vec![a, b, e]);
		assert_eq!(cost.round(), 17_678.0);

		hints.update_cannot_send(&b, &e, 2, 1_000, NOW);
		assert_eq!(route(&hints).0, vec![a, d, e]);

		hints.update_cannot_send(&d, &e, 5, 1_000, NOW);
		let (path, cost) = route(&hints);
		assert_eq!(path, vec![a, b, c, e]);
		assert_eq!(cost.round(), 33_308.0);

		hints.update_can_send(&d, &c, 4, AMOUNT_MSAT + 1_000, NOW);
		let (path, cost) = route(&hints);
		assert_eq!(path, vec![a, d, c, e]);
		assert_eq!(cost.round(), 33_107.0);
	}

	#[test]
	fn unreachable_target() {
		let (mut graph, [a, ..]) = build_routing_graph();
		let f = node_id(15);
		let g = node_id(16);
		add_channel(&mut graph, 8, f, g, 1_000, 0, 0);

		assert_eq!(shortest_path(&graph, &a, &f, |_, _, _| 1.0), Err(PathfindingError::NoRoute));
		assert_eq!(shortest_path(&graph, &a, &node_id(17), |_, _, _| 1.0), Err(PathfindingError::NoRoute));
		// Infinite weights block a hop entirely.
		assert_eq!(
			shortest_path(&graph, &f, &g, |_, _, _| f64::INFINITY),
			Err(PathfindingError::NoRoute)
		);
		assert_eq!(shortest_path(&graph, &a, &a, |_, _, _| 1.0), Ok((vec![a], 0.0)));
	}

	#[test]
	fn enumerates_all_simple_paths() {
		let (graph, [a, b, c, d, e]) = build_routing_graph();
		let hints = LiquidityHintManager::new(a, LiquidityHintsParameters::default());
		let rater = ChannelRater::new(&graph, a, ChannelRatingParameters::default());

		let paths = k_shortest_paths(&graph, &a, &e, 10, f64::INFINITY, |from, to, scids| {
			rater.weight_for_directed_pair(&hints, from, to, scids, AMOUNT_MSAT, NOW)
		});
		assert_eq!(paths.len(), 6);
		assert_eq!(paths[0].0, vec![a, b, e]);
		assert!(paths.iter().any(|(path, _)| *path == vec![a, d, c, b, e]));

		for (i, (path, cost)) in paths.iter().enumerate() {
			assert_eq!(path.first(), Some(&a));
			assert_eq!(path.last(), Some(&e));
			let unique: HashSet<&NodeId> = path.iter().collect();
			assert_eq!(unique.len(), path.len(), "path {:?} loops", path);
			for (other, _) in paths[i + 1..].iter() {
				assert_ne!(path, other);
			}
			if i > 0 {
				assert!(*cost >= paths[i - 1].1);
			}
		}
	}

	#[test]
	fn returns_at_most_k_paths() {
		let (graph, [a, _b, _c, _d, e]) = build_routing_graph();
		let hop_count = |_: &NodeId, _: &NodeId, _: &[u64]| 1.0;

		assert!(k_shortest_paths(&graph, &a, &e, 0, f64::INFINITY, hop_count).is_empty());
		let paths = k_shortest_paths(&graph, &a, &e, 3, f64::INFINITY, hop_count);
		assert_eq!(paths.len(), 3);
		assert_eq!(paths.iter().map(|(_, cost)| *cost).collect::<Vec<_>>(), vec![2.0, 2.0, 3.0]);
		assert!(k_shortest_paths(&graph, &a, &node_id(17), 3, f64::INFINITY, hop_count).is_empty());
	}

	#[test]
	fn drops_paths_through_blacklisted_nodes() {
		let (graph, [a, b, c, d, e]) = build_routing_graph();
		let hints = LiquidityHintManager::new(a, LiquidityHintsParameters::default());
		let mut rater = ChannelRater::new(&graph, a, ChannelRatingParameters::default());
		rater.blacklist_node(d);
		let max_cost = rater.params().blacklist_penalty;

		let paths = k_shortest_paths(&graph, &a, &e, 10, max_cost, |from, to, scids| {
			rater.weight_for_directed_pair(&hints, from, to, scids, AMOUNT_MSAT, NOW)
		});
		let paths: Vec<Vec<NodeId>> = paths.into_iter().map(|(path, _)| path).collect();
		assert_eq!(paths, vec![vec![a, b, e], vec![a, b, c, e]]);
	}

	#[test]
	fn sums_path_costs() {
		let (graph, [a, b, _c, _d, e]) = build_routing_graph();
		let mut hops = Vec::new();
		let cost = path_cost(&graph, &[a, b, e], |from, to, scids| {
			hops.push((*from, *to, scids.to_vec()));
			10.0
		});
		assert_eq!(cost, 20.0);
		assert_eq!(hops, vec![(a, b, vec![3]), (b, e, vec![2])]);

		let paths = vec![(vec![a, b], 5.0), (vec![a, b, e], 50.0)];
		assert_eq!(discard_high_cost_paths(paths, 50.0), vec![(vec![a, b], 5.0)]);
	}
}
