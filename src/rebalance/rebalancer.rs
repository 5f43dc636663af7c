// This file is Copyright its original authors, visible in version control
// history.
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

//! The [`Rebalancer`] moves liquidity into or out of one of our channels by paying ourselves
//! along a circular route.
//!
//! A rebalance first works out how much the local balance of the channel has to change, then
//! picks counterparty candidates among our other channels (see [`rebalance_candidates`]) and tries
//! them one after another. For each pair of channels a bounded number of payments is attempted.
//! Every attempt teaches the node-wide [`LiquidityHintManager`] about the channels along the
//! route, and failures exclude the failing channel for the rest of the rebalance. If no pair
//! manages to move the amount, the amount is halved until it drops below
//! [`RebalanceConfig::min_rebalance_amount_sat`].
//!
//! [`rebalance_candidates`]: crate::rebalance::candidates::rebalance_candidates

use crate::payment::{
	ChannelSource, Invoice, InvoiceProvider, LocalChannel, PaymentFailureReason, PaymentSender,
	SendFailure,
};
use crate::rebalance::candidates::{is_multiple_connected, rebalance_candidates, CandidateStrategy};
use crate::rebalance::channels::{maximal_local_balance_change, unbalancedness_to_local_balance};
use crate::routing::liquidity_hints::LiquidityHintManager;
use crate::routing::network_graph::NetworkGraph;
use crate::routing::router::{find_rebalance_route, Route};
use crate::routing::scoring::ChannelRater;
use crate::routing::LockableLiquidityHints;
use crate::util::config::RebalanceConfig;
use crate::util::errors::RebalanceError;
use crate::util::logger::{Logger, WithContext};
use crate::util::time::{duration_since_epoch, Instant};

use core::cmp;
use core::fmt;
use core::ops::Deref;
use core::time::Duration;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// How far a rebalance should move the local balance of a channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RebalanceAmount {
	/// Move the channel to the given unbalancedness in `[-1, 1]`, as far as the channel reserves
	/// allow. `0.0` balances the channel.
	TargetUnbalancedness(f64),
	/// Change the local balance by the given amount of satoshis. Positive amounts increase the
	/// local balance.
	AmountSat(i64),
}

/// A request to rebalance one of our channels.
#[derive(Clone, Debug, PartialEq)]
pub struct RebalanceRequest {
	/// The short channel id of the channel to rebalance.
	pub short_channel_id: u64,
	/// How far to move the local balance.
	pub amount: RebalanceAmount,
	/// The maximal fee we pay, as a share of the amount moved. See [`Self::budget_sat`].
	pub max_effective_fee_rate: Option<f64>,
	/// The maximal total fee we pay, in satoshis.
	///
	/// If only one of the budget and [`Self::max_effective_fee_rate`] is given, the other one is
	/// derived from it and the amount to move. If both are given, the larger of the budget and the
	/// budget implied by the fee rate applies. If neither is given,
	/// [`RebalanceConfig::default_max_fee_rate`] applies.
	pub budget_sat: Option<u64>,
	/// Find a route and stop right before sending the first payment.
	pub dry_run: bool,
	/// Also use counterparty candidates for which the rebalance is not economic.
	pub force: bool,
	/// The share of the remaining amount moved by a single payment, in `(0, 1]`.
	pub chunk_size: f64,
	/// Overrides [`RebalanceConfig::rebalancing_trials`].
	pub rebalancing_trials: Option<u32>,
	/// Overrides [`RebalanceConfig::candidate_strategy`].
	pub strategy: Option<CandidateStrategy>,
}

impl RebalanceRequest {
	/// A request without fee limits, moving the whole amount at once.
	pub fn new(short_channel_id: u64, amount: RebalanceAmount) -> Self {
		RebalanceRequest {
			short_channel_id,
			amount,
			max_effective_fee_rate: None,
			budget_sat: None,
			dry_run: false,
			force: false,
			chunk_size: 1.0,
			rebalancing_trials: None,
			strategy: None,
		}
	}
}

/// The result of a rebalance which did not fail.
#[derive(Clone, Debug, PartialEq)]
pub enum RebalanceOutcome {
	/// Enough of the requested amount was moved, see [`RebalanceConfig::completion_threshold`].
	Completed {
		/// The fees paid for all payments.
		fees_paid_msat: u64,
		/// The amount moved, in satoshis.
		amount_sat: u64,
	},
	/// The channel is already close enough to the requested target, nothing was attempted.
	AlreadyBalanced,
	/// The request was a dry run. This is the route which would have been tried first.
	DryRun {
		/// The route which would have been used.
		route: Route,
	},
	/// The rebalance was cancelled through [`Rebalancer::cancel`]. Payments which settled before
	/// are not undone.
	Cancelled {
		/// The fees paid for payments which settled before the cancellation.
		fees_paid_msat: u64,
	},
}

/// Why rebalancing with a single pair of channels stopped.
pub(crate) enum AttemptError {
	NoRoute,
	/// The route finder came up with the route which just failed.
	DuplicateRoute,
	TooExpensive {
		err: String,
	},
	TrialsExhausted,
	/// One of the two channels of the pair failed to forward.
	OwnChannelFailure {
		short_channel_id: u64,
	},
	PaymentTimeout,
	DryRun {
		route: Route,
	},
	Cancelled,
}

impl fmt::Debug for AttemptError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match *self {
			AttemptError::NoRoute => f.write_str("No route found"),
			AttemptError::DuplicateRoute => f.write_str("Route was already tried"),
			AttemptError::TooExpensive { ref err } => f.write_str(err),
			AttemptError::TrialsExhausted => f.write_str("Rebalancing trials exhausted"),
			AttemptError::OwnChannelFailure { short_channel_id } => {
				write!(f, "Own channel {} failed", short_channel_id)
			},
			AttemptError::PaymentTimeout => f.write_str("Payment timed out"),
			AttemptError::DryRun { .. } => f.write_str("Dry run"),
			AttemptError::Cancelled => f.write_str("Cancelled"),
		}
	}
}

impl fmt::Display for AttemptError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		fmt::Debug::fmt(self, f)
	}
}

/// The limits under which payments between one pair of channels are attempted.
struct PairAttempt {
	send_channel: u64,
	receive_channel: u64,
	amount_sat: u64,
	fee_rate_margin: f64,
	max_fee_rate: f64,
	budget_left_msat: u64,
	dry_run: bool,
	trials: u32,
}

/// Rebalances our channels by sending circular payments through a [`PaymentSender`].
///
/// Liquidity knowledge is read from and written to a [`LiquidityHintManager`] which is shared
/// with anyone else interested in it, such as a persister. The lock on it is never held while a
/// payment is in flight. Channels excluded because a payment failed over them are only excluded
/// for the duration of a single call to [`Self::rebalance`].
///
/// Only a single rebalance should run at a time, as concurrent rebalances compete for the same
/// local balances.
pub struct Rebalancer<'a, H: Deref, P: Deref, I: Deref, C: Deref, L: Deref>
where
	H::Target: for<'b> LockableLiquidityHints<'b>,
	P::Target: PaymentSender,
	I::Target: InvoiceProvider,
	C::Target: ChannelSource,
	L::Target: Logger,
{
	network_graph: &'a NetworkGraph,
	liquidity_hints: H,
	payment_sender: P,
	invoice_provider: I,
	channel_source: C,
	logger: L,
	config: RebalanceConfig,
	cancelled: Arc<AtomicBool>,
}

impl<'a, H: Deref, P: Deref, I: Deref, C: Deref, L: Deref> Rebalancer<'a, H, P, I, C, L>
where
	H::Target: for<'b> LockableLiquidityHints<'b>,
	P::Target: PaymentSender,
	I::Target: InvoiceProvider,
	C::Target: ChannelSource,
	L::Target: Logger,
{
	/// Creates a new rebalancer routing over `network_graph`.
	pub fn new(
		network_graph: &'a NetworkGraph, liquidity_hints: H, payment_sender: P, invoice_provider: I,
		channel_source: C, logger: L, config: RebalanceConfig,
	) -> Self {
		Rebalancer {
			network_graph,
			liquidity_hints,
			payment_sender,
			invoice_provider,
			channel_source,
			logger,
			config,
			cancelled: Arc::new(AtomicBool::new(false)),
		}
	}

	/// The config this rebalancer was created with.
	pub fn config(&self) -> &RebalanceConfig {
		&self.config
	}

	/// The flag through which a rebalance can be cancelled from another thread. It is checked
	/// before every payment attempt. Once set, every rebalance is cancelled until it is cleared.
	pub fn cancellation_flag(&self) -> Arc<AtomicBool> {
		Arc::clone(&self.cancelled)
	}

	/// Cancels the running rebalance once its in-flight payment, if any, resolved.
	pub fn cancel(&self) {
		self.cancelled.store(true, Ordering::Release);
	}

	fn is_cancelled(&self) -> bool {
		self.cancelled.load(Ordering::Acquire)
	}

	/// Rebalances a channel as described by `request`.
	///
	/// Returns the total fees paid on completion. On failure after some payments settled, the fees
	/// paid for them are available through [`RebalanceError::fees_paid_msat`].
	pub fn rebalance(&self, request: &RebalanceRequest) -> Result<RebalanceOutcome, RebalanceError> {
		if !(request.chunk_size > 0.0 && request.chunk_size <= 1.0) {
			return Err(RebalanceError::InvalidRequest {
				err: format!("Chunk size must be in (0, 1], got {}", request.chunk_size),
			});
		}
		if let RebalanceAmount::TargetUnbalancedness(target) = request.amount {
			if !(-1.0..=1.0).contains(&target) {
				return Err(RebalanceError::InvalidRequest {
					err: format!("Target must be between -1.0 and 1.0, got {}", target),
				});
			}
		}

		let scid = request.short_channel_id;
		let channels = self.channel_source.list_channels();
		let channel = channels
			.iter()
			.find(|channel| channel.short_channel_id == scid && channel.active)
			.cloned()
			.ok_or_else(|| RebalanceError::ChannelUnavailable {
				err: format!("Channel {} is not known or inactive", scid),
			})?;
		if self.network_graph.channel(scid).is_none() {
			return Err(RebalanceError::ChannelUnavailable {
				err: format!("Channel {} is not part of the network graph", scid),
			});
		}
		let logger = WithContext::from(&self.logger, Some(channel.remote_node_id), Some(scid), None);

		let initial_change_sat = match self.local_balance_change(&channel, request.amount)? {
			Some(change) => change,
			None => {
				log_info!(logger, "Channel {} is already balanced", scid);
				return Ok(RebalanceOutcome::AlreadyBalanced);
			},
		};
		let (budget_sat, max_fee_rate) = resolve_fee_limits(
			initial_change_sat.unsigned_abs(),
			request.budget_sat,
			request.max_effective_fee_rate,
			self.config.default_max_fee_rate,
		);

		log_info!(
			logger,
			"Trying to rebalance channel {} with a max rate of {} and a max fee of {} sat",
			scid,
			max_fee_rate,
			budget_sat
		);
		if request.dry_run {
			log_info!(logger, "This is a dry run, nothing to fear");
		}
		log_info!(
			logger,
			"The channel status before rebalancing is lb:{} sat rb:{} sat cap:{} sat",
			channel.local_balance_sat,
			channel.remote_balance_sat,
			channel.capacity_sat
		);
		log_debug!(
			logger,
			"Commit fee {} sat. We opened channel: {}. Channel reserve: {} sat",
			channel.commit_fee_sat,
			channel.initiator,
			channel.local_reserve_sat
		);
		log_info!(logger, "Trying to change the local balance by {} sat", initial_change_sat);

		if initial_change_sat > 0 && is_multiple_connected(&channels, &channel.remote_node_id) {
			log_error!(
				logger,
				"Refusing to receive into channel {}: we have several channels with {}",
				scid,
				channel.remote_node_id
			);
			return Err(RebalanceError::MultichannelInboundRebalance {
				err: format!(
					"Cannot receive into channel {} as its peer {} may forward over any of our channels with it",
					scid, channel.remote_node_id
				),
			});
		}

		let trials = request.rebalancing_trials.unwrap_or(self.config.rebalancing_trials);
		let strategy = request.strategy.unwrap_or(self.config.candidate_strategy);
		let our_node_id = self.channel_source.our_node_id();
		let mut rater = ChannelRater::new(self.network_graph, our_node_id, self.config.rating_params);

		let budget_msat = budget_sat.saturating_mul(1000);
		let mut fees_paid_msat = 0u64;
		let mut moved_sat = 0u64;
		let mut remaining_sat = initial_change_sat;
		let mut amount_sat = chunk_amount(remaining_sat, request.chunk_size);
		let mut invoice = None;

		loop {
			if self.is_cancelled() {
				log_info!(logger, "Rebalance cancelled after paying {} msat in fees", fees_paid_msat);
				return Ok(RebalanceOutcome::Cancelled { fees_paid_msat });
			}
			if fees_paid_msat >= budget_msat {
				log_info!(logger, "Fee budget exhausted. Total fees {:.3} sat", fees_paid_msat as f64 / 1000.0);
				return Err(RebalanceError::BudgetExhausted { fees_paid_msat });
			}

			let channels = self.channel_source.list_channels();
			let rebalanced = channels
				.iter()
				.find(|channel| channel.short_channel_id == scid)
				.ok_or_else(|| RebalanceError::ChannelUnavailable {
					err: format!("Channel {} disappeared during the rebalance", scid),
				})?;
			let candidates = rebalance_candidates(
				&channels,
				rebalanced,
				self.network_graph,
				&our_node_id,
				amount_sat,
				max_fee_rate,
				request.force,
				strategy,
				&self.config,
			);
			if candidates.is_empty() {
				log_info!(logger, "Didn't find counterparty rebalance candidates for {} sat", amount_sat);
				if fees_paid_msat == 0 {
					return Err(RebalanceError::NoRebalanceCandidates);
				}
				return Err(RebalanceError::CandidatesExhausted { fees_paid_msat });
			}
			log_debug!(logger, "Candidates in order of rebalance attempts:");
			for candidate in candidates.iter() {
				log_debug!(logger, "{}", candidate);
			}
			log_info!(
				logger,
				"Need to still change the local balance by {} sat to reach the goal of {} sat. Fees paid up to now: {:.3} sat",
				remaining_sat,
				initial_change_sat,
				fees_paid_msat as f64 / 1000.0
			);

			let mut settled_fee_msat = None;
			for candidate in candidates.iter() {
				let (send_channel, receive_channel) = if amount_sat < 0 {
					(scid, candidate.short_channel_id())
				} else {
					(candidate.short_channel_id(), scid)
				};
				let current_invoice = self.invoice_for(&mut invoice, amount_sat, scid)?;
				let attempt = PairAttempt {
					send_channel,
					receive_channel,
					amount_sat: amount_sat.unsigned_abs(),
					fee_rate_margin: candidate.fee_rate_margin,
					max_fee_rate,
					budget_left_msat: budget_msat.saturating_sub(fees_paid_msat),
					dry_run: request.dry_run,
					trials,
				};
				match self.rebalance_two_channels(&mut rater, &attempt, &current_invoice) {
					Ok(fee_msat) => {
						settled_fee_msat = Some(fee_msat);
						break;
					},
					Err(AttemptError::DryRun { route }) => {
						log_info!(logger, "Would have tried this route now, but it was a dry run");
						return Ok(RebalanceOutcome::DryRun { route });
					},
					Err(AttemptError::OwnChannelFailure { short_channel_id }) => {
						log_error!(
							logger,
							"Own channel {} failed. This is likely due to a wrong accounting for the channel reserve. Try with a smaller absolute target",
							short_channel_id
						);
						return Err(RebalanceError::OwnChannelFailure { short_channel_id, fees_paid_msat });
					},
					Err(AttemptError::PaymentTimeout) => {
						return Err(RebalanceError::PaymentTimeout { fees_paid_msat });
					},
					Err(AttemptError::Cancelled) => {
						log_info!(logger, "Rebalance cancelled after paying {} msat in fees", fees_paid_msat);
						return Ok(RebalanceOutcome::Cancelled { fees_paid_msat });
					},
					Err(err) => {
						log_info!(
							logger,
							"Could not rebalance with channel {}: {}",
							candidate.short_channel_id(),
							err
						);
					},
				}
			}

			match settled_fee_msat {
				Some(fee_msat) => {
					fees_paid_msat += fee_msat;
					moved_sat += amount_sat.unsigned_abs();
					remaining_sat -= amount_sat;
					// The invoice was paid.
					invoice = None;
					let relative_amount_to_go = remaining_sat as f64 / initial_change_sat as f64;
					if relative_amount_to_go <= 1.0 - self.config.completion_threshold {
						log_info!(
							logger,
							"Goal is reached. Rebalancing done. Total fees were {:.3} sat",
							fees_paid_msat as f64 / 1000.0
						);
						return Ok(RebalanceOutcome::Completed { fees_paid_msat, amount_sat: moved_sat });
					}
					amount_sat = chunk_amount(remaining_sat, request.chunk_size);
				},
				None => {
					amount_sat /= 2;
					if amount_sat.unsigned_abs() < self.config.min_rebalance_amount_sat {
						log_info!(
							logger,
							"It is unlikely we can rebalance the channel. Attempts with small amounts already failed"
						);
						return Err(RebalanceError::CandidatesExhausted { fees_paid_msat });
					}
					log_info!(
						logger,
						"Could not rebalance with this amount. Decreasing amount to {} sat",
						amount_sat
					);
				},
			}
		}
	}

	/// The signed change in local balance `amount` asks for, `None` if there is nothing to do.
	fn local_balance_change(
		&self, channel: &LocalChannel, amount: RebalanceAmount,
	) -> Result<Option<i64>, RebalanceError> {
		match amount {
			RebalanceAmount::TargetUnbalancedness(target) => {
				let increase_local_balance = target < channel.unbalancedness();
				let maximal_change_sat = maximal_local_balance_change(increase_local_balance, channel);
				let (target_local_balance_sat, _) = unbalancedness_to_local_balance(
					target,
					channel.capacity_sat,
					channel.commit_fee_sat,
					channel.initiator,
				);
				let required_change_sat =
					(target_local_balance_sat - channel.local_balance_sat as i64).unsigned_abs();
				let change_sat = cmp::min(required_change_sat, maximal_change_sat);
				if change_sat <= self.config.balanced_threshold_sat {
					return Ok(None);
				}
				let change_sat = change_sat as i64;
				Ok(Some(if increase_local_balance { change_sat } else { -change_sat }))
			},
			RebalanceAmount::AmountSat(0) => Ok(None),
			RebalanceAmount::AmountSat(amount_sat) => {
				let increase_local_balance = amount_sat > 0;
				let maximal_change_sat = maximal_local_balance_change(increase_local_balance, channel);
				if amount_sat.unsigned_abs() > maximal_change_sat {
					return Err(RebalanceError::InvalidRequest {
						err: format!(
							"Channel cannot {} (maximal value: {} sat). lb: {} sat rb: {} sat",
							if increase_local_balance { "receive" } else { "send" },
							maximal_change_sat,
							channel.local_balance_sat,
							channel.remote_balance_sat
						),
					});
				}
				Ok(Some(amount_sat))
			},
		}
	}

	/// Returns an invoice to ourselves suitable for moving `amount_sat`, reusing `current` if it
	/// is unpaid and fits.
	fn invoice_for(
		&self, current: &mut Option<Invoice>, amount_sat: i64, short_channel_id: u64,
	) -> Result<Invoice, RebalanceError> {
		let amount_msat = if self.config.use_zero_amount_invoices {
			None
		} else {
			Some(amount_sat.unsigned_abs() * 1000)
		};
		if let Some(invoice) = current {
			if invoice.amount_msat == amount_msat {
				return Ok(invoice.clone());
			}
		}
		let invoice = self
			.invoice_provider
			.create_invoice(amount_msat, &format!("Rebalance of channel {}", short_channel_id))
			.map_err(|err| RebalanceError::InvoiceCreation { err })?;
		*current = Some(invoice.clone());
		Ok(invoice)
	}

	/// Tries to move liquidity from `attempt.send_channel` to `attempt.receive_channel`, returning
	/// the fee paid on success.
	fn rebalance_two_channels(
		&self, rater: &mut ChannelRater<'a>, attempt: &PairAttempt, invoice: &Invoice,
	) -> Result<u64, AttemptError> {
		let amount_msat = attempt.amount_sat * 1000;
		let best_block_height = self.channel_source.best_block_height();
		let logger = WithContext::from(&self.logger, None, None, Some(invoice.payment_hash));
		let mut previous_hops: Option<Vec<u64>> = None;

		for trial in 1..=attempt.trials {
			if self.is_cancelled() {
				return Err(AttemptError::Cancelled);
			}
			log_info!(
				logger,
				"Trying to rebalance with {} sat (attempt number {})",
				attempt.amount_sat,
				trial
			);

			let now = duration_since_epoch();
			let hints = self.liquidity_hints.lock();
			let found = find_rebalance_route(
				rater,
				&*hints,
				attempt.send_channel,
				attempt.receive_channel,
				amount_msat,
				best_block_height,
				self.config.final_cltv_expiry_delta,
				now,
				&*self.logger,
			);
			core::mem::drop(hints);
			let route = found.map_err(|_| AttemptError::NoRoute)?;

			let channel_hops = route.channel_hops();
			if previous_hops.as_ref() == Some(&channel_hops) {
				return Err(AttemptError::DuplicateRoute);
			}
			let effective_fee_rate = route.effective_fee_rate();
			log_info!(
				logger,
				"Route summary: amount: {:.3} sat, total fee: {:.3} sat, fee rate: {:.6}, number of hops: {}",
				(route.total_amount_msat - route.total_fee_msat) as f64 / 1000.0,
				route.total_fee_msat as f64 / 1000.0,
				effective_fee_rate,
				route.hops.len()
			);
			log_debug!(logger, "Channel hops: {:?}", channel_hops);
			if attempt.fee_rate_margin.is_finite() {
				log_info!(
					logger,
					"Expected gain: {:.3} sat",
					(attempt.fee_rate_margin - effective_fee_rate) * attempt.amount_sat as f64
				);
			}
			previous_hops = Some(channel_hops);

			if effective_fee_rate > attempt.max_fee_rate {
				return Err(AttemptError::TooExpensive {
					err: format!(
						"Route is too expensive (rate too high). Rate: {:.6}, requested max rate: {:.6}",
						effective_fee_rate, attempt.max_fee_rate
					),
				});
			}
			if route.total_fee_msat > attempt.budget_left_msat {
				return Err(AttemptError::TooExpensive {
					err: format!(
						"Route is too expensive (budget exhausted). Total fee of route: {:.3} sat, budget: {:.3} sat",
						route.total_fee_msat as f64 / 1000.0,
						attempt.budget_left_msat as f64 / 1000.0
					),
				});
			}
			if attempt.dry_run {
				return Err(AttemptError::DryRun { route });
			}

			let started = Instant::now();
			let result =
				self.payment_sender.send_to_route(&route, invoice.payment_hash, invoice.payment_secret);
			let elapsed = started.elapsed();
			let now = duration_since_epoch();

			match result {
				Ok(preimage) => {
					log_debug!(logger, "Preimage: {}", preimage);
					log_info!(logger, "Success!");
					let mut hints = self.liquidity_hints.lock();
					self.report_success_up_to_failed_hop(&mut *hints, &route, None, elapsed, now);
					return Ok(route.total_fee_msat);
				},
				Err(SendFailure::TimedOut) => {
					log_error!(logger, "Payment timed out, its outcome is unknown");
					return Err(AttemptError::PaymentTimeout);
				},
				Err(SendFailure::Failed { failed_hop_index: Some(index), reason })
					if index < route.hops.len() =>
				{
					let failed_channel = route.hops[index].short_channel_id;
					if index == 0 || index == route.hops.len() - 1 {
						return Err(AttemptError::OwnChannelFailure { short_channel_id: failed_channel });
					}
					let source = route.node_hops[index];
					let target = route.node_hops[index + 1];
					log_info!(
						logger,
						"Failed: hop: {}, channel: {}, reason: {:?}",
						index + 1,
						failed_channel,
						reason
					);
					log_info!(logger, "Could not reach {}", target);
					log_debug!(logger, "Node hops {}", log_iter!(route.node_hops.iter()));

					let mut hints = self.liquidity_hints.lock();
					hints.update_cannot_send(&source, &target, failed_channel, route.hops[index].amount_msat(), now);
					match reason {
						PaymentFailureReason::ChannelDisabled | PaymentFailureReason::UnknownNextPeer => {
							hints.blacklist(failed_channel, now);
						},
						_ => {},
					}
					self.report_success_up_to_failed_hop(&mut *hints, &route, Some(index), elapsed, now);
					rater.blacklist_channel(failed_channel, source, target);
				},
				Err(SendFailure::Failed { failed_hop_index: Some(index), reason }) => {
					log_warn!(
						logger,
						"Failure ({:?}) reported for hop {} which is not part of the route",
						reason,
						index
					);
				},
				Err(SendFailure::Failed { failed_hop_index: None, reason }) => {
					log_warn!(logger, "Unattributable failure ({:?}), avoiding all inner hops of the route", reason);
					for index in 1..route.hops.len().saturating_sub(1) {
						rater.blacklist_channel(
							route.hops[index].short_channel_id,
							route.node_hops[index],
							route.node_hops[index + 1],
						);
					}
				},
			}
		}
		Err(AttemptError::TrialsExhausted)
	}

	/// Records that every hop before `failed_hop_index` (all of them if `None`) forwarded the
	/// payment, and blames the nodes around the failed hop.
	fn report_success_up_to_failed_hop(
		&self, hints: &mut LiquidityHintManager, route: &Route, failed_hop_index: Option<usize>,
		elapsed: Duration, now: Duration,
	) {
		log_debug!(self.logger, "Time elapsed: {:.1} s", elapsed.as_secs_f64());
		let success_path_length = failed_hop_index.map_or(route.hops.len(), |index| index + 1);
		for (index, hop) in route.hops.iter().enumerate() {
			let source = &route.node_hops[index];
			let target = &route.node_hops[index + 1];
			hints.update_elapsed_time(source, elapsed / success_path_length as u32);
			if failed_hop_index == Some(index) {
				break;
			}
			hints.update_can_send(source, target, hop.short_channel_id, hop.amount_msat(), now);
		}

		if let Some(failed_hop_index) = failed_hop_index {
			for (index, node) in route.node_hops.iter().enumerate() {
				let badness = node_badness(self.config.badness_rate, index, failed_hop_index);
				hints.update_badness(node, badness, now);
			}
		}
	}
}

/// The badness a failure at `failed_hop_index` assigns to the node at `node_index` of the route.
/// It decays exponentially with the distance to the failing hop.
fn node_badness(badness_rate: f64, node_index: usize, failed_hop_index: usize) -> f64 {
	let distance = failed_hop_index as f64 - (node_index as f64 + 0.5);
	badness_rate * libm::exp(-libm::fabs(distance))
}

/// Resolves the fee budget in satoshis and the maximal effective fee rate for moving
/// `amount_sat`.
fn resolve_fee_limits(
	amount_sat: u64, budget_sat: Option<u64>, max_fee_rate: Option<f64>, default_max_fee_rate: f64,
) -> (u64, f64) {
	let amount = amount_sat as f64;
	match (budget_sat, max_fee_rate) {
		(Some(budget_sat), None) => (budget_sat, budget_sat as f64 / amount),
		(None, Some(rate)) => ((rate * amount) as u64, rate),
		(Some(budget_sat), Some(rate)) => {
			let budget_sat = cmp::max((rate * amount) as u64, budget_sat);
			(budget_sat, budget_sat as f64 / amount)
		},
		(None, None) => ((default_max_fee_rate * amount) as u64, default_max_fee_rate),
	}
}

/// The signed amount a single payment moves when `remaining_sat` are left to move.
fn chunk_amount(remaining_sat: i64, chunk_size: f64) -> i64 {
	let amount_sat = cmp::max((remaining_sat.unsigned_abs() as f64 * chunk_size) as i64, 1);
	remaining_sat.signum() * amount_sat
}
