// This file is Copyright its original authors, visible in version control
// history.
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

//! Learned knowledge about the liquidity of channels in the network.
//!
//! Every payment attempt tells us something: hops before the failing one could forward the
//! amount, the failing hop could not. [`LiquidityHintManager`] records this per channel direction
//! as a lower bound (can send) and an upper bound (cannot send) and turns it into a penalty which
//! competes with routing fees during path finding. Next to that, it keeps per-node statistics about
//! routing successes, failures, reaction times and a decaying "badness" which is handed out to
//! nodes close to a failure.
//!
//! The direction of a channel is always `from > to`, comparing node ids.
//!
//! All methods take the current time explicitly, as a [`Duration`] since the UNIX epoch, so
//! knowledge can be aged deterministically.

use crate::routing::network_graph::{NetworkGraph, NodeId};
use crate::util::hash_tables::{new_hash_map, HashMap};
use crate::util::ser::{DecodeError, Readable, ReadableArgs, Writeable, Writer};

use core::time::Duration;
use std::io::{self, Read};

const SERIALIZATION_VERSION: u8 = 1;
const MIN_SERIALIZATION_VERSION: u8 = 1;

/// Parameters for aging and weighing learned liquidity knowledge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LiquidityHintsParameters {
	/// How long a learned amount stays valid after it was recorded.
	///
	/// Default value: 1 hour.
	pub hint_validity: Duration,
	/// How long a channel stays blacklisted.
	///
	/// Default value: 1 hour.
	pub blacklist_duration: Duration,
	/// Badness only decays once at least this much time passed since it was last updated.
	///
	/// Default value: 10 minutes.
	pub badness_decay_adjustment_interval: Duration,
	/// The time in which badness decays by a factor of e.
	///
	/// Default value: 1 day.
	pub badness_decay_half_life: Duration,
	/// The relative error below which the average reaction time of a node is trusted.
	///
	/// Default value: 0.2.
	pub time_expectation_accuracy: f64,
	/// The penalty per millisatoshi sent through a node of typical speed.
	///
	/// Default value: 0.00001.
	pub time_penalty_rate: f64,
	/// The reaction time in seconds above which a node counts as slow, raising its penalty
	/// exponentially.
	///
	/// Default value: 5.0.
	pub slow_node_threshold_secs: f64,
}

impl Default for LiquidityHintsParameters {
	fn default() -> Self {
		LiquidityHintsParameters {
			hint_validity: Duration::from_secs(60 * 60),
			blacklist_duration: Duration::from_secs(60 * 60),
			badness_decay_adjustment_interval: Duration::from_secs(10 * 60),
			badness_decay_half_life: Duration::from_secs(24 * 60 * 60),
			time_expectation_accuracy: 0.2,
			time_penalty_rate: 0.000_010,
			slow_node_threshold_secs: 5.0,
		}
	}
}

/// An amount together with the time it was learned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AmountHistory {
	/// The amount, in millisatoshis.
	pub amount_msat: u64,
	/// When the amount was learned, since the UNIX epoch.
	pub timestamp: Duration,
}

impl AmountHistory {
	fn is_valid(&self, now: Duration, validity: Duration) -> bool {
		now.saturating_sub(self.timestamp) <= validity
	}
}

fn valid_amount(entry: &Option<AmountHistory>, now: Duration, validity: Duration) -> Option<u64> {
	entry.filter(|history| history.is_valid(now, validity)).map(|history| history.amount_msat)
}

/// What we know about the liquidity of both directions of a single channel.
///
/// Expired amounts are treated as if they were never learned.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LiquidityHint {
	can_send_forward: Option<AmountHistory>,
	cannot_send_forward: Option<AmountHistory>,
	can_send_backward: Option<AmountHistory>,
	cannot_send_backward: Option<AmountHistory>,
	inflight_htlcs_forward: u32,
	inflight_htlcs_backward: u32,
	blacklist_timestamp: Option<Duration>,
}

impl LiquidityHint {
	fn bounds(&self, is_forward: bool) -> (&Option<AmountHistory>, &Option<AmountHistory>) {
		if is_forward {
			(&self.can_send_forward, &self.cannot_send_forward)
		} else {
			(&self.can_send_backward, &self.cannot_send_backward)
		}
	}

	fn bounds_mut(
		&mut self, is_forward: bool,
	) -> (&mut Option<AmountHistory>, &mut Option<AmountHistory>) {
		if is_forward {
			(&mut self.can_send_forward, &mut self.cannot_send_forward)
		} else {
			(&mut self.can_send_backward, &mut self.cannot_send_backward)
		}
	}

	/// The largest amount known to be sendable in the given direction.
	pub fn can_send(&self, is_forward: bool, now: Duration, validity: Duration) -> Option<u64> {
		valid_amount(self.bounds(is_forward).0, now, validity)
	}

	/// The smallest amount known not to be sendable in the given direction.
	pub fn cannot_send(&self, is_forward: bool, now: Duration, validity: Duration) -> Option<u64> {
		valid_amount(self.bounds(is_forward).1, now, validity)
	}

	/// Raises the lower bound. Amounts below the known lower bound are ignored, and an upper bound
	/// which is contradicted by the new amount is dropped.
	pub fn update_can_send(
		&mut self, is_forward: bool, amount_msat: u64, timestamp: Duration, now: Duration,
		validity: Duration,
	) {
		let (can, cannot) = self.bounds_mut(is_forward);
		if valid_amount(can, now, validity).map_or(false, |known| amount_msat < known) {
			return;
		}
		if valid_amount(cannot, now, validity).map_or(false, |upper| amount_msat >= upper) {
			*cannot = None;
		}
		*can = Some(AmountHistory { amount_msat, timestamp });
	}

	/// Lowers the upper bound. Amounts above the known upper bound are ignored, and a lower bound
	/// which is contradicted by the new amount is dropped.
	pub fn update_cannot_send(
		&mut self, is_forward: bool, amount_msat: u64, timestamp: Duration, now: Duration,
		validity: Duration,
	) {
		let (can, cannot) = self.bounds_mut(is_forward);
		if valid_amount(cannot, now, validity).map_or(false, |known| amount_msat > known) {
			return;
		}
		if valid_amount(can, now, validity).map_or(false, |lower| lower >= amount_msat) {
			*can = None;
		}
		*cannot = Some(AmountHistory { amount_msat, timestamp });
	}

	/// The number of HTLCs we currently have in flight in the given direction.
	pub fn inflight_htlcs(&self, is_forward: bool) -> u32 {
		if is_forward {
			self.inflight_htlcs_forward
		} else {
			self.inflight_htlcs_backward
		}
	}

	fn add_htlc(&mut self, is_forward: bool) {
		let count =
			if is_forward { &mut self.inflight_htlcs_forward } else { &mut self.inflight_htlcs_backward };
		*count = count.saturating_add(1);
	}

	fn remove_htlc(&mut self, is_forward: bool) {
		let count =
			if is_forward { &mut self.inflight_htlcs_forward } else { &mut self.inflight_htlcs_backward };
		*count = count.saturating_sub(1);
	}

	/// Whether the channel was blacklisted less than `duration` ago.
	pub fn is_blacklisted(&self, now: Duration, duration: Duration) -> bool {
		self.blacklist_timestamp.map_or(false, |timestamp| now.saturating_sub(timestamp) < duration)
	}

	fn reset_amounts(&mut self) {
		self.can_send_forward = None;
		self.cannot_send_forward = None;
		self.can_send_backward = None;
		self.cannot_send_backward = None;
	}
}

/// Statistics about a node's behavior as a forwarding hop.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NodeRoutingStats {
	/// How often the node forwarded a payment.
	pub could_route: u64,
	/// How often the node failed to forward a payment.
	pub could_not_route: u64,
	/// The accumulated time payments took up to this node.
	pub elapsed_time: Duration,
	/// The badness as of `badness_timestamp`, in units of a fee rate.
	pub badness: f64,
	/// When the badness was last updated, since the UNIX epoch.
	pub badness_timestamp: Option<Duration>,
	/// How often the node was part of one of our payment routes.
	pub route_participations: u64,
}

impl NodeRoutingStats {
	/// Returns the badness, decayed to `now`.
	pub fn decayed_badness(&self, now: Duration, params: &LiquidityHintsParameters) -> f64 {
		let timestamp = match self.badness_timestamp {
			Some(timestamp) => timestamp,
			None => return self.badness,
		};
		let elapsed = now.saturating_sub(timestamp);
		if elapsed > params.badness_decay_adjustment_interval {
			let decay_secs = params.badness_decay_half_life.as_secs_f64();
			self.badness * libm::exp(-elapsed.as_secs_f64() / decay_secs)
		} else {
			self.badness
		}
	}

	/// The average time payments took to reach this node, zero if it never forwarded.
	pub fn average_reaction_time(&self) -> Duration {
		if self.could_route == 0 {
			return Duration::ZERO;
		}
		self.elapsed_time.div_f64(self.could_route as f64)
	}
}

/// A routing result between two nodes as recorded by a third party payment history, such as the
/// mission control of a payment daemon.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MissionControlPair {
	/// The sending node of the pair.
	pub node_from: NodeId,
	/// The receiving node of the pair.
	pub node_to: NodeId,
	/// The largest amount which was forwarded, in millisatoshis.
	pub success_amt_msat: u64,
	/// When `success_amt_msat` was forwarded, `None` if never.
	pub success_time: Option<Duration>,
	/// The smallest amount which failed to be forwarded, in millisatoshis.
	pub fail_amt_msat: u64,
	/// When `fail_amt_msat` failed, `None` if never.
	pub fail_time: Option<Duration>,
}

/// Implements liquidity hints for channels in the graph.
///
/// Favors channels which are known to be able to forward an amount and penalizes channels which
/// are known not to be, see [`Self::penalty`].
#[derive(Clone, Debug, PartialEq)]
pub struct LiquidityHintManager {
	our_node_id: NodeId,
	params: LiquidityHintsParameters,
	hints: HashMap<u64, LiquidityHint>,
	node_stats: HashMap<NodeId, NodeRoutingStats>,
	mission_control_synced_at: Option<Duration>,
}

impl LiquidityHintManager {
	/// Creates a new manager without any knowledge, for payments sent by `our_node_id`.
	pub fn new(our_node_id: NodeId, params: LiquidityHintsParameters) -> Self {
		LiquidityHintManager {
			our_node_id,
			params,
			hints: new_hash_map(),
			node_stats: new_hash_map(),
			mission_control_synced_at: None,
		}
	}

	/// The node we send payments from.
	pub fn our_node_id(&self) -> &NodeId {
		&self.our_node_id
	}

	/// The parameters knowledge is aged and weighed with.
	pub fn params(&self) -> &LiquidityHintsParameters {
		&self.params
	}

	/// Returns the hint of a channel, creating an empty one if none exists yet.
	pub fn get_or_create_hint(&mut self, short_channel_id: u64) -> &mut LiquidityHint {
		self.hints.entry(short_channel_id).or_insert_with(LiquidityHint::default)
	}

	/// Returns the hint of a channel, if any.
	pub fn hint(&self, short_channel_id: u64) -> Option<&LiquidityHint> {
		self.hints.get(&short_channel_id)
	}

	fn stats_mut(&mut self, node: &NodeId) -> &mut NodeRoutingStats {
		self.node_stats.entry(*node).or_insert_with(NodeRoutingStats::default)
	}

	/// Returns the routing statistics of a node, if it was ever part of a route.
	pub fn node_stats(&self, node: &NodeId) -> Option<&NodeRoutingStats> {
		self.node_stats.get(node)
	}

	fn record_can_send(
		&mut self, from: &NodeId, to: &NodeId, short_channel_id: u64, amount_msat: u64,
		timestamp: Duration, now: Duration,
	) {
		let validity = self.params.hint_validity;
		self.get_or_create_hint(short_channel_id).update_can_send(
			from > to, amount_msat, timestamp, now, validity,
		);
	}

	fn record_cannot_send(
		&mut self, from: &NodeId, to: &NodeId, short_channel_id: u64, amount_msat: u64,
		timestamp: Duration, now: Duration,
	) {
		let validity = self.params.hint_validity;
		let hint = self.get_or_create_hint(short_channel_id);
		hint.update_cannot_send(from > to, amount_msat, timestamp, now, validity);
		// Whatever the forward direction lacks sits on the other side of the channel.
		hint.update_can_send(to > from, amount_msat, timestamp, now, validity);
	}

	/// Records that `amount_msat` was forwarded from `from` to `to` over the channel.
	pub fn update_can_send(
		&mut self, from: &NodeId, to: &NodeId, short_channel_id: u64, amount_msat: u64,
		now: Duration,
	) {
		self.record_can_send(from, to, short_channel_id, amount_msat, now, now);
		self.stats_mut(from).could_route += 1;
	}

	/// Records that `amount_msat` could not be forwarded from `from` to `to` over the channel,
	/// which also means that it can be sent from `to` to `from`.
	pub fn update_cannot_send(
		&mut self, from: &NodeId, to: &NodeId, short_channel_id: u64, amount_msat: u64,
		now: Duration,
	) {
		self.record_cannot_send(from, to, short_channel_id, amount_msat, now, now);
		self.stats_mut(from).could_not_route += 1;
	}

	/// The largest amount known to be sendable in the given direction of the channel.
	pub fn can_send(&self, short_channel_id: u64, is_forward: bool, now: Duration) -> Option<u64> {
		self.hint(short_channel_id)
			.and_then(|hint| hint.can_send(is_forward, now, self.params.hint_validity))
	}

	/// The smallest amount known not to be sendable in the given direction of the channel.
	pub fn cannot_send(
		&self, short_channel_id: u64, is_forward: bool, now: Duration,
	) -> Option<u64> {
		self.hint(short_channel_id)
			.and_then(|hint| hint.cannot_send(is_forward, now, self.params.hint_validity))
	}

	/// Notes an HTLC we put in flight from `from` to `to` over the channel.
	pub fn add_htlc(&mut self, from: &NodeId, to: &NodeId, short_channel_id: u64) {
		self.get_or_create_hint(short_channel_id).add_htlc(from > to);
	}

	/// Notes that an HTLC from `from` to `to` over the channel was resolved.
	pub fn remove_htlc(&mut self, from: &NodeId, to: &NodeId, short_channel_id: u64) {
		self.get_or_create_hint(short_channel_id).remove_htlc(from > to);
	}

	/// The number of HTLCs we have in flight in the given direction of the channel.
	pub fn inflight_htlcs(&self, short_channel_id: u64, is_forward: bool) -> u32 {
		self.hint(short_channel_id).map_or(0, |hint| hint.inflight_htlcs(is_forward))
	}

	/// Adds `badness` to the decayed badness of `node` and counts a route participation.
	pub fn update_badness(&mut self, node: &NodeId, badness: f64, now: Duration) {
		let params = self.params;
		let stats = self.stats_mut(node);
		stats.badness = stats.decayed_badness(now, &params) + badness;
		stats.badness_timestamp = Some(now);
		stats.route_participations += 1;
	}

	/// Counts a route participation of `node` without assigning badness.
	pub fn update_route_participation(&mut self, node: &NodeId) {
		self.stats_mut(node).route_participations += 1;
	}

	/// Adds the time a payment took to reach `node`.
	pub fn update_elapsed_time(&mut self, node: &NodeId, elapsed: Duration) {
		let stats = self.stats_mut(node);
		stats.elapsed_time += elapsed;
	}

	/// The decayed badness of `node`.
	pub fn badness(&self, node: &NodeId, now: Duration) -> f64 {
		self.node_stats(node).map_or(0.0, |stats| stats.decayed_badness(now, &self.params))
	}

	/// Blacklists the channel for [`LiquidityHintsParameters::blacklist_duration`].
	pub fn blacklist(&mut self, short_channel_id: u64, now: Duration) {
		self.get_or_create_hint(short_channel_id).blacklist_timestamp = Some(now);
	}

	/// Whether the channel is currently blacklisted.
	pub fn is_blacklisted(&self, short_channel_id: u64, now: Duration) -> bool {
		self.hint(short_channel_id)
			.map_or(false, |hint| hint.is_blacklisted(now, self.params.blacklist_duration))
	}

	/// Returns all currently blacklisted channels, sorted.
	pub fn blacklisted_channels(&self, now: Duration) -> Vec<u64> {
		let mut channels: Vec<u64> = self
			.hints
			.iter()
			.filter(|(_, hint)| hint.is_blacklisted(now, self.params.blacklist_duration))
			.map(|(scid, _)| *scid)
			.collect();
		channels.sort_unstable();
		channels
	}

	/// Lifts all blacklistings.
	pub fn clear_blacklist(&mut self) {
		for hint in self.hints.values_mut() {
			hint.blacklist_timestamp = None;
		}
	}

	/// Forgets all learned amounts. Blacklistings, HTLC counters and node statistics are kept.
	pub fn reset_liquidity_hints(&mut self) {
		for hint in self.hints.values_mut() {
			hint.reset_amounts();
		}
	}

	/// The liquidity penalty for sending `amount_msat` from `from` to `to` over a channel with the
	/// given capacity, in millisatoshis.
	///
	/// The penalty is zero if we are the sender or the amount is known to be sendable, and infinite
	/// if the amount is known not to be. In between, it grows logarithmically as the amount
	/// approaches the upper bound, scaled to be comparable to a proportional fee at
	/// `reference_fee_rate_ppm`.
	pub fn penalty(
		&self, from: &NodeId, to: &NodeId, short_channel_id: u64, capacity_sat: u64,
		amount_msat: u64, reference_fee_rate_ppm: u64, now: Duration,
	) -> f64 {
		if *from == self.our_node_id {
			return 0.0;
		}
		let is_forward = from > to;
		let can_send = self.can_send(short_channel_id, is_forward, now).unwrap_or(0);
		let cannot_send = self
			.cannot_send(short_channel_id, is_forward, now)
			.unwrap_or(capacity_sat.saturating_mul(1000));

		if amount_msat >= cannot_send {
			return f64::INFINITY;
		}
		if amount_msat <= can_send {
			return 0.0;
		}

		let remaining = (cannot_send - (amount_msat - can_send)) as f64;
		let log_penalty = -libm::log(remaining / cannot_send as f64);
		let base_penalty = reference_fee_rate_ppm.saturating_mul(amount_msat) / 1_000_000;
		log_penalty * base_penalty as f64
	}

	/// A penalty in millisatoshis for routing `amount_msat` through a node, which grows
	/// exponentially for nodes known to be slow.
	pub fn time_penalty(&self, node: &NodeId, amount_msat: u64) -> f64 {
		let default_penalty = self.params.time_penalty_rate * amount_msat as f64;
		let stats = match self.node_stats(node) {
			Some(stats) => stats,
			None => return default_penalty,
		};
		let elapsed = stats.elapsed_time.as_secs_f64();
		let average = stats.average_reaction_time().as_secs_f64();
		if average <= 0.0 || elapsed <= 0.0 {
			return default_penalty;
		}
		let estimated_error = average / elapsed;
		if estimated_error < self.params.time_expectation_accuracy {
			let slowness = average / self.params.slow_node_threshold_secs - 1.0;
			default_penalty * libm::exp(slowness)
		} else {
			default_penalty
		}
	}

	/// A penalty in millisatoshis for routing `amount_msat` through a node which was close to
	/// payment failures.
	pub fn badness_penalty(&self, node: &NodeId, amount_msat: u64, now: Duration) -> f64 {
		amount_msat as f64 * self.badness(node, now)
	}

	/// Seeds hints from a third party payment history. Successes raise the lower bound, failures
	/// lower the upper bound of every channel between the two nodes of a pair, dated to when they
	/// were observed.
	pub fn extend_with_mission_control(
		&mut self, graph: &NetworkGraph, pairs: &[MissionControlPair], now: Duration,
	) {
		for pair in pairs {
			let channels = graph.channels_between(&pair.node_from, &pair.node_to);
			if channels.is_empty() {
				continue;
			}
			if let Some(success_time) = pair.success_time {
				for &scid in channels {
					self.record_can_send(
						&pair.node_from, &pair.node_to, scid, pair.success_amt_msat, success_time, now,
					);
				}
				self.stats_mut(&pair.node_from).could_route += 1;
			}
			if let Some(fail_time) = pair.fail_time {
				for &scid in channels {
					self.record_cannot_send(
						&pair.node_from, &pair.node_to, scid, pair.fail_amt_msat, fail_time, now,
					);
				}
				self.stats_mut(&pair.node_from).could_not_route += 1;
			}
		}
		self.mission_control_synced_at = Some(now);
	}

	/// When third party payment history was last ingested.
	pub fn mission_control_synced_at(&self) -> Option<Duration> {
		self.mission_control_synced_at
	}
}

impl Writeable for AmountHistory {
	fn write<W: Writer>(&self, w: &mut W) -> Result<(), io::Error> {
		self.amount_msat.write(w)?;
		self.timestamp.write(w)
	}
}

impl Readable for AmountHistory {
	fn read<R: Read>(r: &mut R) -> Result<Self, DecodeError> {
		Ok(AmountHistory { amount_msat: Readable::read(r)?, timestamp: Readable::read(r)? })
	}
}

impl Writeable for LiquidityHint {
	fn write<W: Writer>(&self, w: &mut W) -> Result<(), io::Error> {
		self.can_send_forward.write(w)?;
		self.cannot_send_forward.write(w)?;
		self.can_send_backward.write(w)?;
		self.cannot_send_backward.write(w)?;
		self.inflight_htlcs_forward.write(w)?;
		self.inflight_htlcs_backward.write(w)?;
		self.blacklist_timestamp.write(w)
	}
}

impl Readable for LiquidityHint {
	fn read<R: Read>(r: &mut R) -> Result<Self, DecodeError> {
		Ok(LiquidityHint {
			can_send_forward: Readable::read(r)?,
			cannot_send_forward: Readable::read(r)?,
			can_send_backward: Readable::read(r)?,
			cannot_send_backward: Readable::read(r)?,
			inflight_htlcs_forward: Readable::read(r)?,
			inflight_htlcs_backward: Readable::read(r)?,
			blacklist_timestamp: Readable::read(r)?,
		})
	}
}

impl Writeable for NodeRoutingStats {
	fn write<W: Writer>(&self, w: &mut W) -> Result<(), io::Error> {
		self.could_route.write(w)?;
		self.could_not_route.write(w)?;
		self.elapsed_time.write(w)?;
		self.badness.write(w)?;
		self.badness_timestamp.write(w)?;
		self.route_participations.write(w)
	}
}

impl Readable for NodeRoutingStats {
	fn read<R: Read>(r: &mut R) -> Result<Self, DecodeError> {
		Ok(NodeRoutingStats {
			could_route: Readable::read(r)?,
			could_not_route: Readable::read(r)?,
			elapsed_time: Readable::read(r)?,
			badness: Readable::read(r)?,
			badness_timestamp: Readable::read(r)?,
			route_participations: Readable::read(r)?,
		})
	}
}

impl Writeable for LiquidityHintManager {
	fn write<W: Writer>(&self, w: &mut W) -> Result<(), io::Error> {
		SERIALIZATION_VERSION.write(w)?;
		MIN_SERIALIZATION_VERSION.write(w)?;
		self.our_node_id.write(w)?;
		self.hints.write(w)?;
		self.node_stats.write(w)?;
		self.mission_control_synced_at.write(w)
	}
}

impl ReadableArgs<LiquidityHintsParameters> for LiquidityHintManager {
	fn read<R: Read>(r: &mut R, params: LiquidityHintsParameters) -> Result<Self, DecodeError> {
		let _ver: u8 = Readable::read(r)?;
		let min_ver: u8 = Readable::read(r)?;
		if min_ver > SERIALIZATION_VERSION {
			return Err(DecodeError::UnknownVersion);
		}
		Ok(LiquidityHintManager {
			our_node_id: Readable::read(r)?,
			params,
			hints: Readable::read(r)?,
			node_stats: Readable::read(r)?,
			mission_control_synced_at: Readable::read(r)?,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::routing::network_graph::ChannelInfo;
	use crate::routing::test_utils::node_id;
	use crate::util::ser::ReadableArgs;

	use std::io::Cursor;

	const NOW: Duration = Duration::from_secs(1_700_000_000);

	fn manager() -> LiquidityHintManager {
		LiquidityHintManager::new(node_id(1), LiquidityHintsParameters::default())
	}

	#[test]
	fn can_send_only_increases() {
		let mut hints = manager();
		let (from, to) = (node_id(2), node_id(3));
		let is_forward = from > to;

		hints.update_can_send(&from, &to, 42, 5_000, NOW);
		assert_eq!(hints.can_send(42, is_forward, NOW), Some(5_000));
		hints.update_can_send(&from, &to, 42, 4_000, NOW);
		assert_eq!(hints.can_send(42, is_forward, NOW), Some(5_000));
		hints.update_can_send(&from, &to, 42, 6_000, NOW);
		assert_eq!(hints.can_send(42, is_forward, NOW), Some(6_000));
		assert_eq!(hints.can_send(42, !is_forward, NOW), None);
		assert_eq!(hints.node_stats(&from).unwrap().could_route, 3);
	}

	#[test]
	fn cannot_send_only_decreases() {
		let mut hints = manager();
		let (from, to) = (node_id(2), node_id(3));
		let is_forward = from > to;

		hints.update_cannot_send(&from, &to, 42, 5_000, NOW);
		assert_eq!(hints.cannot_send(42, is_forward, NOW), Some(5_000));
		hints.update_cannot_send(&from, &to, 42, 6_000, NOW);
		assert_eq!(hints.cannot_send(42, is_forward, NOW), Some(5_000));
		hints.update_cannot_send(&from, &to, 42, 4_000, NOW);
		assert_eq!(hints.cannot_send(42, is_forward, NOW), Some(4_000));
		assert_eq!(hints.node_stats(&from).unwrap().could_not_route, 3);
	}

	#[test]
	fn cannot_send_implies_can_send_in_reverse() {
		let mut hints = manager();
		let (from, to) = (node_id(2), node_id(3));

		hints.update_cannot_send(&from, &to, 42, 7_000, NOW);
		assert_eq!(hints.can_send(42, to > from, NOW), Some(7_000));
		assert_eq!(hints.cannot_send(42, to > from, NOW), None);
		// The reverse direction is learned, not routed by `to`.
		assert!(hints.node_stats(&to).is_none());
	}

	#[test]
	fn contradicting_bounds_are_dropped() {
		let mut hints = manager();
		let (from, to) = (node_id(2), node_id(3));
		let is_forward = from > to;

		hints.update_cannot_send(&from, &to, 42, 5_000, NOW);
		hints.update_can_send(&from, &to, 42, 5_000, NOW);
		assert_eq!(hints.can_send(42, is_forward, NOW), Some(5_000));
		assert_eq!(hints.cannot_send(42, is_forward, NOW), None);

		hints.update_cannot_send(&from, &to, 42, 3_000, NOW);
		assert_eq!(hints.cannot_send(42, is_forward, NOW), Some(3_000));
		assert_eq!(hints.can_send(42, is_forward, NOW), None);
	}

	#[test]
	fn hints_expire() {
		let mut hints = manager();
		let (from, to) = (node_id(2), node_id(3));
		let is_forward = from > to;
		let validity = hints.params().hint_validity;

		hints.update_can_send(&from, &to, 42, 5_000, NOW);
		assert_eq!(hints.can_send(42, is_forward, NOW + validity), Some(5_000));
		let later = NOW + validity + Duration::from_secs(1);
		assert_eq!(hints.can_send(42, is_forward, later), None);

		// An expired lower bound doesn't prevent learning a smaller one.
		hints.update_can_send(&from, &to, 42, 1_000, later);
		assert_eq!(hints.can_send(42, is_forward, later), Some(1_000));
	}

	#[test]
	fn penalty_bounds() {
		let mut hints = manager();
		let (ours, from, to) = (node_id(1), node_id(2), node_id(3));
		let capacity_sat = 1_000;

		assert_eq!(hints.penalty(&ours, &from, 42, capacity_sat, 999_999, 200, NOW), 0.0);
		assert_eq!(hints.penalty(&from, &to, 42, capacity_sat, 1_000_000, 200, NOW), f64::INFINITY);
		assert!(hints.penalty(&from, &to, 42, capacity_sat, 500_000, 200, NOW) > 0.0);

		hints.update_can_send(&from, &to, 42, 200_000, NOW);
		hints.update_cannot_send(&from, &to, 42, 800_000, NOW);
		assert_eq!(hints.penalty(&from, &to, 42, capacity_sat, 200_000, 200, NOW), 0.0);
		assert_eq!(hints.penalty(&from, &to, 42, capacity_sat, 150_000, 200, NOW), 0.0);
		assert_eq!(hints.penalty(&from, &to, 42, capacity_sat, 800_000, 200, NOW), f64::INFINITY);
	}

	#[test]
	fn penalty_is_monotonic_in_uncertain_band() {
		let mut hints = manager();
		let (from, to) = (node_id(2), node_id(3));
		hints.update_can_send(&from, &to, 42, 100_000, NOW);
		hints.update_cannot_send(&from, &to, 42, 900_000, NOW);

		let mut last = 0.0;
		for amount in (100_000..900_000).step_by(10_000) {
			let penalty = hints.penalty(&from, &to, 42, 1_000, amount, 200, NOW);
			assert!(penalty >= last, "penalty decreased at {}", amount);
			assert!(penalty.is_finite());
			last = penalty;
		}
	}

	#[test]
	fn penalty_matches_logarithmic_model() {
		let hints = manager();
		let (from, to) = (node_id(2), node_id(3));
		// Without knowledge: -ln((3e9 - 1e8) / 3e9) * 20_000.
		let penalty = hints.penalty(&from, &to, 42, 3_000_000, 100_000_000, 200, NOW);
		assert_eq!(penalty.round(), 678.0);
	}

	#[test]
	fn time_penalty_depends_on_reaction_time() {
		let mut hints = manager();
		let (from, to) = (node_id(2), node_id(3));
		assert!((hints.time_penalty(&from, 1_000_000) - 10.0).abs() < 1e-9);

		// Too few samples to trust the average.
		hints.update_can_send(&from, &to, 42, 1, NOW);
		hints.update_elapsed_time(&from, Duration::from_secs(10));
		assert!((hints.time_penalty(&from, 1_000_000) - 10.0).abs() < 1e-9);

		for _ in 0..9 {
			hints.update_can_send(&from, &to, 42, 1, NOW);
			hints.update_elapsed_time(&from, Duration::from_secs(10));
		}
		// Ten samples averaging 10 seconds, twice the slow node threshold.
		let expected = 10.0 * libm::exp(1.0);
		assert!((hints.time_penalty(&from, 1_000_000) - expected).abs() < 1e-9);
	}

	#[test]
	fn badness_decays() {
		let mut hints = manager();
		let node = node_id(2);
		let params = *hints.params();

		hints.update_badness(&node, 0.001, NOW);
		hints.update_badness(&node, 0.001, NOW);
		assert_eq!(hints.node_stats(&node).unwrap().route_participations, 2);
		assert!((hints.badness_penalty(&node, 1_000, NOW) - 2.0).abs() < 1e-12);

		let soon = NOW + params.badness_decay_adjustment_interval;
		assert_eq!(hints.badness(&node, soon), 0.002);

		let day_later = NOW + params.badness_decay_half_life;
		assert!((hints.badness(&node, day_later) - 0.002 / core::f64::consts::E).abs() < 1e-12);

		hints.update_route_participation(&node);
		assert_eq!(hints.node_stats(&node).unwrap().route_participations, 3);
	}

	#[test]
	fn blacklisting_expires_and_clears() {
		let mut hints = manager();
		let duration = hints.params().blacklist_duration;

		hints.blacklist(42, NOW);
		hints.blacklist(7, NOW + Duration::from_secs(10));
		assert!(hints.is_blacklisted(42, NOW));
		assert!(!hints.is_blacklisted(43, NOW));
		assert_eq!(hints.blacklisted_channels(NOW + Duration::from_secs(10)), vec![7, 42]);
		assert_eq!(hints.blacklisted_channels(NOW + duration), vec![7]);
		assert!(!hints.is_blacklisted(42, NOW + duration));

		hints.clear_blacklist();
		assert!(hints.blacklisted_channels(NOW).is_empty());
	}

	#[test]
	fn inflight_htlcs_floor_at_zero() {
		let mut hints = manager();
		let (from, to) = (node_id(2), node_id(3));

		hints.add_htlc(&from, &to, 42);
		hints.add_htlc(&from, &to, 42);
		hints.remove_htlc(&to, &from, 42);
		assert_eq!(hints.inflight_htlcs(42, from > to), 2);
		assert_eq!(hints.inflight_htlcs(42, to > from), 0);
		hints.remove_htlc(&from, &to, 42);
		hints.remove_htlc(&from, &to, 42);
		hints.remove_htlc(&from, &to, 42);
		assert_eq!(hints.inflight_htlcs(42, from > to), 0);
	}

	#[test]
	fn reset_keeps_blacklist() {
		let mut hints = manager();
		let (from, to) = (node_id(2), node_id(3));

		hints.update_can_send(&from, &to, 42, 5_000, NOW);
		hints.blacklist(42, NOW);
		hints.reset_liquidity_hints();
		assert_eq!(hints.can_send(42, from > to, NOW), None);
		assert!(hints.is_blacklisted(42, NOW));
		assert_eq!(hints.node_stats(&from).unwrap().could_route, 1);
	}

	#[test]
	fn ingests_mission_control() {
		let (a, b, c) = (node_id(1), node_id(2), node_id(3));
		let mut graph = NetworkGraph::new();
		graph.add_channel(ChannelInfo::new(1, b, c, 1_000)).unwrap();
		graph.add_channel(ChannelInfo::new(2, c, b, 2_000)).unwrap();
		graph.add_channel(ChannelInfo::new(3, a, b, 1_000)).unwrap();

		let mut hints = LiquidityHintManager::new(a, LiquidityHintsParameters::default());
		let pairs = [
			MissionControlPair {
				node_from: b,
				node_to: c,
				success_amt_msat: 300_000,
				success_time: Some(NOW - Duration::from_secs(60)),
				fail_amt_msat: 0,
				fail_time: None,
			},
			MissionControlPair {
				node_from: c,
				node_to: b,
				success_amt_msat: 0,
				success_time: None,
				fail_amt_msat: 800_000,
				fail_time: Some(NOW - Duration::from_secs(30)),
			},
			// Too old to be of any use.
			MissionControlPair {
				node_from: b,
				node_to: a,
				success_amt_msat: 0,
				success_time: None,
				fail_amt_msat: 100_000,
				fail_time: Some(NOW - Duration::from_secs(2 * 60 * 60)),
			},
		];
		hints.extend_with_mission_control(&graph, &pairs, NOW);

		for scid in [1, 2] {
			assert_eq!(hints.cannot_send(scid, c > b, NOW), Some(800_000));
			// The failure in the reverse direction taught us more than the success.
			assert_eq!(hints.can_send(scid, b > c, NOW), Some(800_000));
		}
		assert_eq!(hints.cannot_send(3, b > a, NOW), None);
		assert_eq!(hints.node_stats(&b).unwrap().could_route, 1);
		assert_eq!(hints.node_stats(&c).unwrap().could_not_route, 1);
		assert_eq!(hints.mission_control_synced_at(), Some(NOW));
	}

	#[test]
	fn persists_knowledge() {
		let mut hints = manager();
		let (from, to) = (node_id(2), node_id(3));
		hints.update_can_send(&from, &to, 42, 5_000, NOW);
		hints.update_cannot_send(&to, &from, 43, 9_000, NOW);
		hints.update_badness(&to, 0.5, NOW);
		hints.update_elapsed_time(&from, Duration::from_millis(1_500));
		hints.add_htlc(&from, &to, 42);
		hints.blacklist(44, NOW);

		let encoded = hints.encode();
		let read = <LiquidityHintManager as ReadableArgs<_>>::read(
			&mut Cursor::new(&encoded), LiquidityHintsParameters::default(),
		)
		.unwrap();
		assert_eq!(read, hints);
		assert_eq!(read.encode(), encoded);
	}

	#[test]
	fn rejects_unknown_versions() {
		let mut encoded = manager().encode();
		encoded[1] = SERIALIZATION_VERSION + 1;
		let res = <LiquidityHintManager as ReadableArgs<_>>::read(
			&mut Cursor::new(&encoded), LiquidityHintsParameters::default(),
		);
		assert_eq!(res, Err(DecodeError::UnknownVersion));

		let truncated = manager().encode()[..10].to_vec();
		let res = <LiquidityHintManager as ReadableArgs<_>>::read(
			&mut Cursor::new(truncated), LiquidityHintsParameters::default(),
		);
		assert_eq!(res, Err(DecodeError::ShortRead));
	}
}
