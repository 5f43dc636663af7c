// This file is Copyright its original authors, visible in version control
// history.
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

//! Various user-configurable rebalancing limits and settings which the [`Rebalancer`] applies for
//! you.
//!
//! The parameters which tune liquidity learning and channel rating live next to the code that
//! uses them, see [`LiquidityHintsParameters`] and [`ChannelRatingParameters`].
//!
//! [`Rebalancer`]: crate::rebalance::rebalancer::Rebalancer
//! [`LiquidityHintsParameters`]: crate::routing::liquidity_hints::LiquidityHintsParameters
//! [`ChannelRatingParameters`]: crate::routing::scoring::ChannelRatingParameters

use crate::rebalance::candidates::CandidateStrategy;
use crate::routing::scoring::ChannelRatingParameters;

/// Options which apply to a single [`Rebalancer`].
///
/// Default::default() provides sane defaults.
///
/// [`Rebalancer`]: crate::rebalance::rebalancer::Rebalancer
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RebalanceConfig {
	/// The number of payment attempts made for a single pair of channels before giving up on the
	/// counterparty candidate. Can be overridden per request.
	///
	/// Default value: 10.
	pub rebalancing_trials: u32,
	/// The share of the originally requested amount after which a rebalance is considered done.
	///
	/// Default value: 0.9.
	pub completion_threshold: f64,
	/// Amounts are halved after every candidate failed, but never below this amount, in satoshis.
	///
	/// Default value: 20_000.
	pub min_rebalance_amount_sat: u64,
	/// If the amount required to reach the target is at most this many satoshis, the channel is
	/// already considered balanced and nothing is attempted.
	///
	/// Default value: 10_000.
	pub balanced_threshold_sat: u64,
	/// Counterparty candidates may be unbalanced by the rebalance, but only up to this
	/// unbalancedness on the side we push them to.
	///
	/// Default value: 0.2.
	pub max_unbalancedness_for_candidates: f64,
	/// A candidate is only economic if the fee rate we charge on it exceeds the fee rate we charge
	/// on the rebalanced channel by at least this margin, in parts per million. Ignored when a
	/// request sets `force`.
	///
	/// Default value: 50.
	pub reserved_fee_rate_margin_ppm: i64,
	/// The maximal effective fee rate used if a request provides neither a fee rate nor a budget.
	///
	/// Default value: 0.001 (1000 ppm).
	pub default_max_fee_rate: f64,
	/// The CLTV expiry delta of the final hop of a circular route.
	///
	/// Default value: 144.
	pub final_cltv_expiry_delta: u32,
	/// Scale of the badness which is handed out to nodes around a failing hop.
	///
	/// Default value: 0.0001.
	pub badness_rate: f64,
	/// Whether invoices to ourselves are requested without an amount and reused for every chunk.
	///
	/// Default value: false.
	pub use_zero_amount_invoices: bool,
	/// The order in which counterparty candidates are tried. Can be overridden per request.
	///
	/// Default value: [`CandidateStrategy::AmountToBalance`].
	pub candidate_strategy: CandidateStrategy,
	/// Parameters of the channel rater used to find routes.
	pub rating_params: ChannelRatingParameters,
}

impl Default for RebalanceConfig {
	fn default() -> Self {
		RebalanceConfig {
			rebalancing_trials: 10,
			completion_threshold: 0.9,
			min_rebalance_amount_sat: 20_000,
			balanced_threshold_sat: 10_000,
			max_unbalancedness_for_candidates: 0.2,
			reserved_fee_rate_margin_ppm: 50,
			default_max_fee_rate: 0.001,
			final_cltv_expiry_delta: 144,
			badness_rate: 0.0001,
			use_zero_amount_invoices: false,
			candidate_strategy: CandidateStrategy::AmountToBalance,
			rating_params: ChannelRatingParameters::default(),
		}
	}
}
