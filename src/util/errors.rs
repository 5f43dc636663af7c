// This file is Copyright its original authors, visible in version control
// history.
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

//! Error types live here.

use core::fmt;

/// Indicates why a call to [`Rebalancer::rebalance`] did not complete.
///
/// Where a variant is returned after some payments already went through, it carries the fees
/// which were paid up to that point so that the caller can report partial progress.
///
/// [`Rebalancer::rebalance`]: crate::rebalance::rebalancer::Rebalancer::rebalance
#[derive(Clone, PartialEq, Eq)]
pub enum RebalanceError {
	/// The request was malformed (target unbalancedness outside of [-1, 1], chunk size outside of
	/// (0, 1], an amount the channel cannot move, etc). Nothing was attempted.
	InvalidRequest {
		/// A human-readable error message
		err: String,
	},
	/// The channel to rebalance is not known, inactive, or missing from the network graph.
	ChannelUnavailable {
		/// A human-readable error message
		err: String,
	},
	/// None of our other channels can act as the counterparty of this rebalance.
	NoRebalanceCandidates,
	/// We tried to receive into a channel with a peer we have several channels with. Due to
	/// non-strict forwarding we cannot control over which of them the payment arrives, so this is
	/// refused before any payment is attempted.
	MultichannelInboundRebalance {
		/// A human-readable error message
		err: String,
	},
	/// A payment failure was attributed to one of the two local channels of the circular route.
	/// This usually indicates wrong channel reserve accounting and is never retried.
	OwnChannelFailure {
		/// The short channel id of the failing local channel.
		short_channel_id: u64,
		/// The fees paid before the failure.
		fees_paid_msat: u64,
	},
	/// The payment backend did not resolve a payment in time. Its outcome is unknown, so no
	/// liquidity knowledge was derived from it.
	PaymentTimeout {
		/// The fees paid by earlier, settled payments.
		fees_paid_msat: u64,
	},
	/// The fee budget was used up before the rebalance reached its goal.
	BudgetExhausted {
		/// The fees paid so far.
		fees_paid_msat: u64,
	},
	/// Every counterparty candidate failed, even after reducing the amount down to the minimal
	/// rebalance amount.
	CandidatesExhausted {
		/// The fees paid so far.
		fees_paid_msat: u64,
	},
	/// The invoice provider failed to create an invoice to ourselves.
	InvoiceCreation {
		/// A human-readable error message
		err: String,
	},
}

impl RebalanceError {
	/// Returns the fees paid before the rebalance stopped, if any were paid.
	pub fn fees_paid_msat(&self) -> u64 {
		match self {
			RebalanceError::OwnChannelFailure { fees_paid_msat, .. }
			| RebalanceError::PaymentTimeout { fees_paid_msat }
			| RebalanceError::BudgetExhausted { fees_paid_msat }
			| RebalanceError::CandidatesExhausted { fees_paid_msat } => *fees_paid_msat,
			_ => 0,
		}
	}
}

impl fmt::Debug for RebalanceError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match *self {
			RebalanceError::InvalidRequest { ref err } => write!(f, "Invalid request: {}", err),
			RebalanceError::ChannelUnavailable { ref err } => write!(f, "Channel unavailable: {}", err),
			RebalanceError::NoRebalanceCandidates => {
				f.write_str("Didn't find counterparty rebalance candidates")
			},
			RebalanceError::MultichannelInboundRebalance { ref err } => f.write_str(err),
			RebalanceError::OwnChannelFailure { short_channel_id, fees_paid_msat } => write!(
				f,
				"Own channel {} failed, likely due to channel reserve accounting (fees paid: {} msat)",
				short_channel_id, fees_paid_msat
			),
			RebalanceError::PaymentTimeout { fees_paid_msat } => {
				write!(f, "Payment timed out (fees paid: {} msat)", fees_paid_msat)
			},
			RebalanceError::BudgetExhausted { fees_paid_msat } => {
				write!(f, "Fee budget exhausted (fees paid: {} msat)", fees_paid_msat)
			},
			RebalanceError::CandidatesExhausted { fees_paid_msat } => write!(
				f,
				"Rebalance candidates exhausted, attempts with small amounts already failed (fees paid: {} msat)",
				fees_paid_msat
			),
			RebalanceError::InvoiceCreation { ref err } => write!(f, "Invoice creation failed: {}", err),
		}
	}
}

impl fmt::Display for RebalanceError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		fmt::Debug::fmt(self, f)
	}
}

impl std::error::Error for RebalanceError {}
