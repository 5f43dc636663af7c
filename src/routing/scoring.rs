// This file is Copyright its original authors, visible in version control
// history.
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

//! Utilities for rating payment channels.
//!
//! [`ChannelRater`] turns a channel and an amount into a cost in millisatoshis which path finding
//! minimizes. The cost is made up of the fee the forwarding node charges, a small per-hop penalty
//! and the penalties derived from a [`LiquidityHintManager`]: liquidity uncertainty, badness of the
//! forwarding node and its reaction time. Channels which can't possibly forward the amount are
//! rated [`f64::INFINITY`].
//!
//! Next to the node-wide knowledge in [`LiquidityHintManager`], a rater carries blacklists which
//! only live as long as the rater, usually the duration of a single rebalance.
//!
//! # Example
//!
//! ```
//! # use lightning_rebalance::routing::liquidity_hints::{LiquidityHintManager, LiquidityHintsParameters};
//! # use lightning_rebalance::routing::network_graph::NetworkGraph;
//! # use lightning_rebalance::routing::scoring::{ChannelRater, ChannelRatingParameters};
//! # use core::time::Duration;
//! # fn rate(graph: &NetworkGraph, hints: &LiquidityHintManager, scid: u64, now: Duration) {
//! let rater = ChannelRater::new(graph, *hints.our_node_id(), ChannelRatingParameters {
//!     long_path_penalty_msat: 5_000,
//!     ..ChannelRatingParameters::default()
//! });
//! if let Some(channel) = graph.channel(scid) {
//!     let _cost = rater.weight_for_channel(
//!         hints, &channel.node_one, &channel.node_two, channel, 100_000_000, now);
//! }
//! # }
//! ```

use crate::routing::liquidity_hints::LiquidityHintManager;
use crate::routing::network_graph::{ChannelInfo, NetworkGraph, NodeId};
use crate::util::hash_tables::{new_hash_map, new_hash_set, HashMap, HashSet};

use core::time::Duration;

/// Parameters for [`ChannelRater`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChannelRatingParameters {
	/// The proportional fee rate, in parts per million, at which liquidity uncertainty is priced.
	///
	/// Default value: 200.
	pub reference_fee_rate_ppm: u64,
	/// A penalty added to every hop so that shorter paths are preferred.
	///
	/// Default value: 2,000 msat.
	pub long_path_penalty_msat: u64,
	/// Whether [`Self::long_path_penalty_msat`] is applied.
	///
	/// Default value: true.
	pub prefer_short_paths: bool,
	/// The cost added for touching a node blacklisted for the session. Paths whose cost exceeds it
	/// are not considered viable.
	///
	/// Default value: 1,000,000,000.
	pub blacklist_penalty: f64,
	/// The factor applied to the badness penalty of a hop whose liquidity is known to suffice.
	///
	/// Default value: 0.5.
	pub known_liquidity_badness_multiplier: f64,
}

impl Default for ChannelRatingParameters {
	fn default() -> Self {
		ChannelRatingParameters {
			reference_fee_rate_ppm: 200,
			long_path_penalty_msat: 2_000,
			prefer_short_paths: true,
			blacklist_penalty: 1_000_000_000.0,
			known_liquidity_badness_multiplier: 0.5,
		}
	}
}

/// Rates channels of a [`NetworkGraph`] for path finding.
pub struct ChannelRater<'a> {
	graph: &'a NetworkGraph,
	our_node_id: NodeId,
	params: ChannelRatingParameters,
	blacklisted_channels: HashMap<u64, (NodeId, NodeId)>,
	blacklisted_nodes: HashSet<NodeId>,
}

impl<'a> ChannelRater<'a> {
	/// Creates a rater for payments sent by `our_node_id`, with empty blacklists.
	pub fn new(graph: &'a NetworkGraph, our_node_id: NodeId, params: ChannelRatingParameters) -> Self {
		ChannelRater {
			graph,
			our_node_id,
			params,
			blacklisted_channels: new_hash_map(),
			blacklisted_nodes: new_hash_set(),
		}
	}

	/// The graph channels are rated on.
	pub fn graph(&self) -> &'a NetworkGraph {
		self.graph
	}

	/// The parameters channels are rated with.
	pub fn params(&self) -> &ChannelRatingParameters {
		&self.params
	}

	/// Excludes the channel in the direction from `source` to `target` for the rest of the session.
	pub fn blacklist_channel(&mut self, short_channel_id: u64, source: NodeId, target: NodeId) {
		self.blacklisted_channels.insert(short_channel_id, (source, target));
	}

	/// Penalizes every channel of `node` with [`ChannelRatingParameters::blacklist_penalty`] for
	/// the rest of the session.
	pub fn blacklist_node(&mut self, node: NodeId) {
		self.blacklisted_nodes.insert(node);
	}

	/// Lifts all channel blacklistings of the session. Node blacklistings are kept.
	pub fn reset_channel_blacklist(&mut self) {
		self.blacklisted_channels.clear();
	}

	/// Whether the channel is blacklisted for the session in the direction from `source` to
	/// `target`.
	pub fn is_channel_blacklisted(&self, short_channel_id: u64, source: &NodeId, target: &NodeId) -> bool {
		self.blacklisted_channels
			.get(&short_channel_id)
			.map_or(false, |(from, to)| from == source && to == target)
	}

	/// Whether the node is blacklisted for the session.
	pub fn is_node_blacklisted(&self, node: &NodeId) -> bool {
		self.blacklisted_nodes.contains(node)
	}

	/// The channels blacklisted for the session, sorted.
	pub fn blacklisted_channels(&self) -> Vec<u64> {
		let mut channels: Vec<u64> = self.blacklisted_channels.keys().copied().collect();
		channels.sort_unstable();
		channels
	}

	/// The cost of sending `amount_msat` from `from` to `to` over `channel`, in millisatoshis.
	pub fn weight_for_channel(
		&self, hints: &LiquidityHintManager, from: &NodeId, to: &NodeId, channel: &ChannelInfo,
		amount_msat: u64, now: Duration,
	) -> f64 {
		let scid = channel.short_channel_id;
		if self.is_channel_blacklisted(scid, from, to) || hints.is_blacklisted(scid, now) {
			return f64::INFINITY;
		}
		let max_capacity_sat =
			self.graph.max_capacity_sat(from, to).unwrap_or(channel.capacity_sat);
		if amount_msat > max_capacity_sat.saturating_mul(1000) {
			return f64::INFINITY;
		}
		let policy = match channel.policy_from(from) {
			Some((Some(policy), _)) => policy,
			_ => return f64::INFINITY,
		};
		if policy.disabled
			|| amount_msat < policy.htlc_minimum_msat
			|| amount_msat > policy.htlc_maximum_msat
		{
			return f64::INFINITY;
		}

		let fee = if *from == self.our_node_id { 0.0 } else { policy.fee_msat_f64(amount_msat) };
		let hop_penalty =
			if self.params.prefer_short_paths { self.params.long_path_penalty_msat as f64 } else { 0.0 };
		let liquidity_penalty = hints.penalty(
			from, to, scid, channel.capacity_sat, amount_msat, self.params.reference_fee_rate_ppm, now,
		);
		let mut badness_penalty = hints.badness_penalty(from, amount_msat, now);
		if liquidity_penalty == 0.0 {
			badness_penalty *= self.params.known_liquidity_badness_multiplier;
		}
		let time_penalty = hints.time_penalty(from, amount_msat);

		fee + hop_penalty + liquidity_penalty + badness_penalty + time_penalty
	}

	/// The cost of sending `amount_msat` from `from` to `to` over the cheapest of the given
	/// parallel channels, in millisatoshis.
	pub fn weight_for_directed_pair(
		&self, hints: &LiquidityHintManager, from: &NodeId, to: &NodeId, short_channel_ids: &[u64],
		amount_msat: u64, now: Duration,
	) -> f64 {
		self.cheapest_channel(hints, from, to, short_channel_ids, amount_msat, now)
			.map_or(f64::INFINITY, |(_, weight)| weight)
	}

	/// Returns the cheapest of the given parallel channels together with its cost, including the
	/// penalty for blacklisted nodes. Channels with infinite cost are never returned.
	pub fn cheapest_channel(
		&self, hints: &LiquidityHintManager, from: &NodeId, to: &NodeId, short_channel_ids: &[u64],
		amount_msat: u64, now: Duration,
	) -> Option<(u64, f64)> {
		let node_penalty = if self.is_node_blacklisted(from) || self.is_node_blacklisted(to) {
			self.params.blacklist_penalty
		} else {
			0.0
		};
		let mut cheapest: Option<(u64, f64)> = None;
		for scid in short_channel_ids {
			let channel = match self.graph.channel(*scid) {
				Some(channel) => channel,
				None => continue,
			};
			let weight = node_penalty + self.weight_for_channel(hints, from, to, channel, amount_msat, now);
			if !weight.is_finite() {
				continue;
			}
			if cheapest.map_or(true, |(_, best)| weight < best) {
				cheapest = Some((*scid, weight));
			}
		}
		cheapest
	}
}
