// This file is Copyright its original authors, visible in version control
// history.
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

//! Balance arithmetic for our own channels.
//!
//! A channel's unbalancedness is `-1` if all funds are on our side, `0` if it is split evenly and
//! `1` if all funds sit with the counterparty. The commitment fee is paid out of the initiator's
//! balance, so when we opened the channel it is counted as ours.

use crate::payment::LocalChannel;

/// The weight an HTLC output adds to a commitment transaction.
pub const COMMITMENT_TX_WEIGHT_PER_HTLC: u64 = 172;

/// Returns the unbalancedness of a channel and the part of the commitment fee which is attributed
/// to us, which is the full fee if we are the initiator and zero otherwise.
pub fn channel_unbalancedness_and_commit_fee(
	local_balance_sat: u64, capacity_sat: u64, commit_fee_sat: u64, initiator: bool,
) -> (f64, u64) {
	let commit_fee_sat = if initiator { commit_fee_sat } else { 0 };
	if capacity_sat == 0 {
		return (0.0, commit_fee_sat);
	}
	let unbalancedness =
		-(2.0 * (local_balance_sat + commit_fee_sat) as f64 / capacity_sat as f64 - 1.0);
	(unbalancedness, commit_fee_sat)
}

/// The inverse of [`channel_unbalancedness_and_commit_fee`]: the local balance a channel has at
/// the given unbalancedness, along with our part of the commitment fee.
///
/// The balance is negative if the commitment fee can't be paid at that unbalancedness.
pub fn unbalancedness_to_local_balance(
	unbalancedness: f64, capacity_sat: u64, commit_fee_sat: u64, initiator: bool,
) -> (i64, u64) {
	let commit_fee_sat = if initiator { commit_fee_sat } else { 0 };
	let local_balance = capacity_sat as f64 * 0.5 * (1.0 - unbalancedness) - commit_fee_sat as f64;
	(local_balance as i64, commit_fee_sat)
}

/// The most we can add to (`increase_local_balance`) or take from the local balance of a channel
/// in a single payment, in satoshis.
///
/// The side giving up funds has to keep its channel reserve, and the commitment transaction has
/// to pay for one more HTLC output at the channel's feerate.
pub fn maximal_local_balance_change(increase_local_balance: bool, channel: &LocalChannel) -> u64 {
	let available_sat = if increase_local_balance {
		channel.remote_balance_sat.saturating_sub(channel.remote_reserve_sat)
	} else {
		channel.local_balance_sat.saturating_sub(channel.local_reserve_sat)
	};
	let htlc_cost_sat = COMMITMENT_TX_WEIGHT_PER_HTLC * channel.fee_per_kw / 1000;
	available_sat.saturating_sub(htlc_cost_sat)
}

/// The fee charged for forwarding `amount_sat` as a share of the amount,
/// `(base_fee + fee_rate * amount) / amount`.
///
/// Returns [`f64::INFINITY`] for a zero amount.
pub fn effective_fee_rate(amount_sat: u64, base_fee_msat: i64, fee_rate_ppm: i64) -> f64 {
	if amount_sat == 0 {
		return f64::INFINITY;
	}
	let amount_msat = amount_sat as f64 * 1000.0;
	(base_fee_msat.unsigned_abs() as f64 + fee_rate_ppm.unsigned_abs() as f64 * amount_msat / 1_000_000.0)
		/ amount_msat
}

impl LocalChannel {
	/// The unbalancedness of the channel, see [`channel_unbalancedness_and_commit_fee`].
	pub fn unbalancedness(&self) -> f64 {
		channel_unbalancedness_and_commit_fee(
			self.local_balance_sat,
			self.capacity_sat,
			self.commit_fee_sat,
			self.initiator,
		)
		.0
	}

	/// The signed amount by which the local balance has to grow for the channel to be balanced,
	/// in satoshis. Negative if we hold more than half of the funds.
	pub fn amount_to_balanced_sat(&self) -> i64 {
		let (unbalancedness, commit_fee_sat) = channel_unbalancedness_and_commit_fee(
			self.local_balance_sat,
			self.capacity_sat,
			self.commit_fee_sat,
			self.initiator,
		);
		(unbalancedness * self.capacity_sat as f64 / 2.0 - commit_fee_sat as f64) as i64
	}
}
