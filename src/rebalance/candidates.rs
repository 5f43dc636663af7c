// This file is Copyright its original authors, visible in version control
// history.
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

//! Selection and ordering of the channels which act as the other end of a rebalance.
//!
//! If we want to increase the local balance of a channel, another channel has to give up local
//! balance and vice versa. A channel qualifies as such a counterparty candidate if it can move the
//! amount, is not pushed too far out of balance by doing so and, unless forced, if the fees we
//! charge on the two channels leave room for paying for the rebalance.

use crate::payment::LocalChannel;
use crate::rebalance::channels::{effective_fee_rate, maximal_local_balance_change};
use crate::routing::network_graph::{ChannelPolicy, NetworkGraph, NodeId};
use crate::util::config::RebalanceConfig;
use crate::util::errors::RebalanceError;

use core::cmp::Ordering;
use core::fmt;
use core::str::FromStr;

/// The order in which counterparty candidates are tried.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CandidateStrategy {
	/// Channels which are furthest out of balance in the direction the rebalance moves them come
	/// first.
	#[default]
	AmountToBalance,
	/// Channels which can move the most liquidity come first.
	MostAffordable,
	/// Channels whose counterparty charges the lowest fee for forwarding to us come first.
	LowestCounterpartyFee,
	/// Channels whose unbalancedness is furthest on the side opposite to the rebalanced channel
	/// come first.
	BestOppositeUnbalancedness,
}

impl FromStr for CandidateStrategy {
	type Err = RebalanceError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"amount-to-balance" => Ok(CandidateStrategy::AmountToBalance),
			"most-affordable" => Ok(CandidateStrategy::MostAffordable),
			"lowest-counterparty-fee" => Ok(CandidateStrategy::LowestCounterpartyFee),
			"best-opposite-unbalancedness" => Ok(CandidateStrategy::BestOppositeUnbalancedness),
			_ => Err(RebalanceError::InvalidRequest { err: format!("Unknown candidate strategy {}", s) }),
		}
	}
}

impl fmt::Display for CandidateStrategy {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str(match self {
			CandidateStrategy::AmountToBalance => "amount-to-balance",
			CandidateStrategy::MostAffordable => "most-affordable",
			CandidateStrategy::LowestCounterpartyFee => "lowest-counterparty-fee",
			CandidateStrategy::BestOppositeUnbalancedness => "best-opposite-unbalancedness",
		})
	}
}

/// One of our channels which can take the other side of a rebalance.
#[derive(Clone, Debug, PartialEq)]
pub struct RebalanceCandidate {
	/// The channel as reported by our node.
	pub channel: LocalChannel,
	/// The unbalancedness of the channel.
	pub unbalancedness: f64,
	/// The most the channel can move in the direction the rebalance needs, in satoshis.
	pub affordable_sat: u64,
	/// Our policy for forwarding over the channel.
	pub local_policy: ChannelPolicy,
	/// The counterparty's policy for forwarding over the channel to us, if announced.
	pub remote_policy: Option<ChannelPolicy>,
	/// The difference between the fee rates we charge on the two channels, as a share of the
	/// amount. Infinite if the rebalance is forced.
	pub fee_rate_margin: f64,
}

impl RebalanceCandidate {
	/// The short channel id of the candidate.
	pub fn short_channel_id(&self) -> u64 {
		self.channel.short_channel_id
	}

	/// The effective fee rate the counterparty charges for forwarding `amount_sat` to us.
	pub fn counterparty_fee_rate(&self, amount_sat: u64) -> f64 {
		match self.remote_policy {
			Some(policy) => effective_fee_rate(amount_sat, policy.base_fee_msat, policy.fee_rate_ppm),
			None => f64::INFINITY,
		}
	}
}

impl fmt::Display for RebalanceCandidate {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(
			f,
			"scid:{} ub:{:4.2} aff:{:9} l:{:9} r:{:9} lbf:{:6} lfr:{:1.6} frm:{:1.6} peer:{}",
			self.channel.short_channel_id,
			self.unbalancedness,
			self.affordable_sat,
			self.channel.local_balance_sat,
			self.channel.remote_balance_sat,
			self.local_policy.base_fee_msat,
			self.local_policy.fee_rate_ppm as f64 / 1_000_000.0,
			self.fee_rate_margin,
			self.channel.remote_node_id
		)
	}
}

/// Returns the channels which can balance out a change of `local_balance_change_sat` in the local
/// balance of `rebalanced`, in the order given by `strategy`.
///
/// For a positive change the candidates send, for a negative one they receive. Channels with the
/// same peer as `rebalanced`, inactive channels and channels without our policy in `network` are
/// never candidates. When candidates receive, the fee of the counterparty forwarding to us is
/// unavoidable, so candidates charging more than `max_effective_fee_rate` for it are dropped.
/// Neither can we control over which channel a peer we have several channels with forwards to
/// us, so such peers' channels never receive.
pub fn rebalance_candidates(
	channels: &[LocalChannel], rebalanced: &LocalChannel, network: &NetworkGraph, our_node_id: &NodeId,
	local_balance_change_sat: i64, max_effective_fee_rate: f64, force: bool,
	strategy: CandidateStrategy, config: &RebalanceConfig,
) -> Vec<RebalanceCandidate> {
	let candidates_send = local_balance_change_sat > 0;
	let amount_sat = local_balance_change_sat.unsigned_abs();
	let max_unbalancedness = config.max_unbalancedness_for_candidates;
	let channel_fee_rate_ppm = local_policy(network, our_node_id, rebalanced.short_channel_id)
		.map_or(0, |policy| policy.fee_rate_ppm);

	let mut candidates = Vec::new();
	for channel in channels.iter() {
		if !channel.active || channel.remote_node_id == rebalanced.remote_node_id {
			continue;
		}
		if !candidates_send && is_multiple_connected(channels, &channel.remote_node_id) {
			continue;
		}
		let unbalancedness = channel.unbalancedness();
		let affordable_sat = maximal_local_balance_change(!candidates_send, channel);
		if affordable_sat <= amount_sat {
			continue;
		}
		if candidates_send && unbalancedness >= max_unbalancedness {
			continue;
		}
		if !candidates_send && unbalancedness <= -max_unbalancedness {
			continue;
		}
		let local_policy = match local_policy(network, our_node_id, channel.short_channel_id) {
			Some(policy) => policy,
			None => continue,
		};
		let remote_policy = network
			.channel(channel.short_channel_id)
			.and_then(|info| info.policy_from(&channel.remote_node_id))
			.and_then(|(policy, _)| policy.copied());

		let fee_rate_margin = if force {
			f64::INFINITY
		} else {
			let margin_ppm = if candidates_send {
				channel_fee_rate_ppm - local_policy.fee_rate_ppm
			} else {
				local_policy.fee_rate_ppm - channel_fee_rate_ppm
			};
			if margin_ppm <= config.reserved_fee_rate_margin_ppm {
				continue;
			}
			margin_ppm as f64 / 1_000_000.0
		};

		let candidate = RebalanceCandidate {
			channel: channel.clone(),
			unbalancedness,
			affordable_sat,
			local_policy,
			remote_policy,
			fee_rate_margin,
		};
		if !candidates_send && candidate.counterparty_fee_rate(amount_sat) > max_effective_fee_rate {
			continue;
		}
		candidates.push(candidate);
	}

	sort_candidates(&mut candidates, strategy, candidates_send, amount_sat);
	candidates
}

/// Whether we have more than one active channel with `peer`.
pub fn is_multiple_connected(channels: &[LocalChannel], peer: &NodeId) -> bool {
	channels.iter().filter(|channel| channel.active && channel.remote_node_id == *peer).count() > 1
}

fn local_policy(network: &NetworkGraph, our_node_id: &NodeId, short_channel_id: u64) -> Option<ChannelPolicy> {
	network
		.channel(short_channel_id)
		.and_then(|info| info.policy_from(our_node_id))
		.and_then(|(policy, _)| policy.copied())
}

fn sort_candidates(
	candidates: &mut Vec<RebalanceCandidate>, strategy: CandidateStrategy, candidates_send: bool,
	amount_sat: u64,
) {
	// Candidates which send hold too much local balance, their amount to balance is negative.
	let sign = if candidates_send { -1 } else { 1 };
	let by_float = |a: f64, b: f64| a.partial_cmp(&b).unwrap_or(Ordering::Equal);
	candidates.sort_by(|a, b| {
		let ord = match strategy {
			CandidateStrategy::AmountToBalance => {
				(sign * b.channel.amount_to_balanced_sat()).cmp(&(sign * a.channel.amount_to_balanced_sat()))
			},
			CandidateStrategy::MostAffordable => b.affordable_sat.cmp(&a.affordable_sat),
			CandidateStrategy::LowestCounterpartyFee => {
				by_float(a.counterparty_fee_rate(amount_sat), b.counterparty_fee_rate(amount_sat))
			},
			CandidateStrategy::BestOppositeUnbalancedness => {
				if candidates_send {
					by_float(a.unbalancedness, b.unbalancedness)
				} else {
					by_float(b.unbalancedness, a.unbalancedness)
				}
			},
		};
		ord.then_with(|| a.short_channel_id().cmp(&b.short_channel_id()))
	});
}
