// This file is Copyright its original authors, visible in version control
// history.
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

//! Turning channel hops into payable routes lives here.
//!
//! [`build_route_from_hops`] computes the amounts, fees and expiries of every hop of a route which
//! was already decided on, and [`find_rebalance_route`] decides on the hops of a circular route
//! leaving through one of our channels and coming back through another.

use crate::routing::liquidity_hints::LiquidityHintManager;
use crate::routing::network_graph::{NetworkGraph, NodeId};
use crate::routing::pathfinding::{shortest_path, PathfindingError};
use crate::routing::scoring::ChannelRater;
use crate::util::logger::Logger;

use core::fmt;
use core::ops::Deref;
use core::time::Duration;

/// A hop in a route
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct RouteHop {
	/// The channel used for this hop.
	pub short_channel_id: u64,
	/// The capacity of the channel, in satoshis.
	pub channel_capacity_sat: u64,
	/// The amount the receiving node of this hop forwards over the next hop, in millisatoshis. For
	/// the last hop, this is the amount delivered to the destination.
	pub amount_to_forward_msat: u64,
	/// The fee the receiving node of this hop takes for forwarding over the next hop. Always zero
	/// for the last hop.
	pub fee_msat: u64,
	/// The absolute block height at which the HTLC over this hop expires.
	pub expiry_height: u32,
}

impl RouteHop {
	/// The amount sent over this hop's channel, in millisatoshis.
	pub fn amount_msat(&self) -> u64 {
		self.amount_to_forward_msat + self.fee_msat
	}

	/// [`Self::amount_to_forward_msat`] in whole satoshis, rounded down.
	pub fn amount_to_forward_sat(&self) -> u64 {
		self.amount_to_forward_msat / 1000
	}

	/// [`Self::fee_msat`] in whole satoshis, rounded down.
	pub fn fee_sat(&self) -> u64 {
		self.fee_msat / 1000
	}
}

/// A route directs a payment from the sender along a fixed sequence of channels to the
/// destination.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct Route {
	/// The hops, in payment direction.
	pub hops: Vec<RouteHop>,
	/// The nodes along the route, in payment direction, starting with the sender and ending with
	/// the destination. Always one longer than [`Self::hops`].
	pub node_hops: Vec<NodeId>,
	/// The amount the sender sends, fees included, in millisatoshis.
	pub total_amount_msat: u64,
	/// The fees paid to all forwarding nodes, in millisatoshis.
	pub total_fee_msat: u64,
	/// The absolute block height at which the sender's HTLC expires.
	pub total_time_lock: u32,
}

impl Route {
	/// The short channel ids of all hops, in payment direction.
	pub fn channel_hops(&self) -> Vec<u64> {
		self.hops.iter().map(|hop| hop.short_channel_id).collect()
	}

	/// [`Self::total_amount_msat`] in whole satoshis, rounded down.
	pub fn total_amount_sat(&self) -> u64 {
		self.total_amount_msat / 1000
	}

	/// [`Self::total_fee_msat`] in whole satoshis, rounded down.
	pub fn total_fee_sat(&self) -> u64 {
		self.total_fee_msat / 1000
	}

	/// The fees as a share of the total amount sent.
	pub fn effective_fee_rate(&self) -> f64 {
		if self.total_amount_msat == 0 {
			return 0.0;
		}
		self.total_fee_msat as f64 / self.total_amount_msat as f64
	}
}

/// An error returned by [`build_route_from_hops`].
#[derive(Clone, PartialEq, Eq)]
pub enum RouteBuildError {
	/// The channel is not part of the graph or does not connect to the next hop.
	UnknownChannel {
		/// The offending channel.
		short_channel_id: u64,
	},
	/// The forwarding node of the channel did not announce a policy.
	MissingPolicy {
		/// The offending channel.
		short_channel_id: u64,
	},
	/// The channel can't carry the amount it would have to forward.
	TooSmallCapacity {
		/// The offending channel.
		short_channel_id: u64,
	},
	/// Accumulating fees overflowed.
	FeeOverflow,
}

impl fmt::Debug for RouteBuildError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match *self {
			RouteBuildError::UnknownChannel { short_channel_id } => {
				write!(f, "Channel {} is unknown or does not continue the route", short_channel_id)
			},
			RouteBuildError::MissingPolicy { short_channel_id } => {
				write!(f, "Channel {} has no policy for the forwarding direction", short_channel_id)
			},
			RouteBuildError::TooSmallCapacity { short_channel_id } => {
				write!(f, "Amount too large for channel {}", short_channel_id)
			},
			RouteBuildError::FeeOverflow => f.write_str("Fees overflowed"),
		}
	}
}

impl fmt::Display for RouteBuildError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		fmt::Debug::fmt(self, f)
	}
}

impl std::error::Error for RouteBuildError {}

/// Builds a route delivering `final_value_msat` to `destination` over the given channels.
///
/// Hops are processed from the destination backwards: the fee a forwarding node charges is added
/// to what the previous hop has to carry, and its CLTV delta to the previous hop's expiry. The
/// sender of the first channel charges nothing.
pub fn build_route_from_hops(
	network: &NetworkGraph, channel_hops: &[u64], destination: &NodeId, final_value_msat: u64,
	best_block_height: u32, final_cltv_expiry_delta: u32,
) -> Result<Route, RouteBuildError> {
	let mut hops = Vec::with_capacity(channel_hops.len());
	let mut node_hops = Vec::with_capacity(channel_hops.len() + 1);
	node_hops.push(*destination);

	let mut node_right = *destination;
	let mut fee_msat = 0u64;
	let mut fees_after_msat = 0u64;
	let mut cltv_after = 0u32;

	for &short_channel_id in channel_hops.iter().rev() {
		let channel =
			network.channel(short_channel_id).ok_or(RouteBuildError::UnknownChannel { short_channel_id })?;
		let node_left = *channel
			.counterparty_of(&node_right)
			.ok_or(RouteBuildError::UnknownChannel { short_channel_id })?;
		let policy = match channel.policy_from(&node_left) {
			Some((Some(policy), _)) => policy,
			_ => return Err(RouteBuildError::MissingPolicy { short_channel_id }),
		};

		let amount_to_forward_msat =
			final_value_msat.checked_add(fees_after_msat).ok_or(RouteBuildError::FeeOverflow)?;
		if amount_to_forward_msat > channel.capacity_sat.saturating_mul(1000) {
			return Err(RouteBuildError::TooSmallCapacity { short_channel_id });
		}
		let expiry_height = best_block_height
			.saturating_add(final_cltv_expiry_delta)
			.saturating_add(cltv_after);
		hops.push(RouteHop {
			short_channel_id,
			channel_capacity_sat: channel.capacity_sat,
			amount_to_forward_msat,
			fee_msat,
			expiry_height,
		});

		let carried_msat =
			amount_to_forward_msat.checked_add(fee_msat).ok_or(RouteBuildError::FeeOverflow)?;
		let sender_fee_msat = policy.fee_msat(carried_msat).ok_or(RouteBuildError::FeeOverflow)?;
		fees_after_msat = fees_after_msat.checked_add(fee_msat).ok_or(RouteBuildError::FeeOverflow)?;
		fee_msat = sender_fee_msat;
		cltv_after = cltv_after.saturating_add(policy.cltv_expiry_delta as u32);

		node_hops.push(node_left);
		node_right = node_left;
	}

	hops.reverse();
	node_hops.reverse();

	let total_fee_msat = hops.iter().map(|hop| hop.fee_msat).sum::<u64>();
	let total_time_lock = hops
		.first()
		.map_or(best_block_height.saturating_add(final_cltv_expiry_delta), |hop| hop.expiry_height);
	Ok(Route {
		hops,
		node_hops,
		total_amount_msat: final_value_msat.checked_add(total_fee_msat).ok_or(RouteBuildError::FeeOverflow)?,
		total_fee_msat,
		total_time_lock,
	})
}

/// Finds a circular route which leaves our node through `send_channel` and comes back through
/// `receive_channel`, delivering `amount_msat` to ourselves.
///
/// The inner part of the route is the cheapest path between the two counterparties as rated by
/// `rater`, with our own node blacklisted so that the route doesn't pass through us in between.
/// Routes which are only found by crossing a blacklisted node are rejected.
pub fn find_rebalance_route<L: Deref>(
	rater: &mut ChannelRater, hints: &LiquidityHintManager, send_channel: u64,
	receive_channel: u64, amount_msat: u64, best_block_height: u32, final_cltv_expiry_delta: u32,
	now: Duration, logger: L,
) -> Result<Route, PathfindingError>
where
	L::Target: Logger,
{
	let network = rater.graph();
	let our_node_id = *hints.our_node_id();

	let (channel_from, channel_to) = match (network.channel(send_channel), network.channel(receive_channel)) {
		(Some(from), Some(to)) => (from, to),
		_ => {
			log_debug!(
				logger,
				"Channel {} or {} is not part of the network graph yet",
				send_channel,
				receive_channel
			);
			return Err(PathfindingError::NoRoute);
		},
	};
	let (first_hop_end, last_hop_start) =
		match (channel_from.counterparty_of(&our_node_id), channel_to.counterparty_of(&our_node_id)) {
			(Some(end), Some(start)) => (*end, *start),
			_ => {
				log_debug!(logger, "Channel {} or {} is not ours", send_channel, receive_channel);
				return Err(PathfindingError::NoRoute);
			},
		};

	rater.blacklist_node(our_node_id);
	let rater = &*rater;
	log_trace!(
		logger,
		"Searching for a route from {} to {} for {} msat",
		first_hop_end,
		last_hop_start,
		amount_msat
	);
	let (node_path, cost) = shortest_path(network, &first_hop_end, &last_hop_start, |from, to, scids| {
		rater.weight_for_directed_pair(hints, from, to, scids, amount_msat, now)
	})?;
	if cost >= rater.params().blacklist_penalty {
		log_debug!(logger, "Only found a route over blacklisted nodes, cost {}", cost);
		return Err(PathfindingError::NoRoute);
	}

	let mut channel_hops = Vec::with_capacity(node_path.len() + 1);
	channel_hops.push(send_channel);
	for pair in node_path.windows(2) {
		let scids = network.channels_between(&pair[0], &pair[1]);
		match rater.cheapest_channel(hints, &pair[0], &pair[1], scids, amount_msat, now) {
			Some((scid, _)) => channel_hops.push(scid),
			None => return Err(PathfindingError::NoRoute),
		}
	}
	channel_hops.push(receive_channel);

	let route = build_route_from_hops(
		network, &channel_hops, &our_node_id, amount_msat, best_block_height, final_cltv_expiry_delta,
	)
	.map_err(|err| {
		log_debug!(logger, "Discarding route over {:?}: {}", channel_hops, err);
		PathfindingError::NoRoute
	})?;
	log_debug!(logger, "Got rebalance route with cost {:.0}:\n{}", cost, log_route!(route));
	Ok(route)
}
