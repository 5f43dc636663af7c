// This file is Copyright its original authors, visible in version control
// history.
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

//! The interfaces through which the rebalancer talks to the node it manages: sending payments
//! along explicit routes, creating invoices to ourselves and listing our channels.
//!
//! None of these are implemented here. A user wires them to their payment daemon of choice.

use crate::routing::network_graph::NodeId;
use crate::routing::router::Route;

use core::fmt;

/// The payment hash is the hash of the [`PaymentPreimage`] which is the value used to lock funds
/// in HTLCs while they transit the lightning network.
#[derive(Hash, Copy, Clone, PartialEq, Eq, Debug, Ord, PartialOrd)]
pub struct PaymentHash(pub [u8; 32]);

impl fmt::Display for PaymentHash {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{}", log_bytes!(self.0))
	}
}

/// The payment preimage is the "secret key" which is used to claim the funds of an HTLC on-chain
/// or in a lightning channel.
#[derive(Hash, Copy, Clone, PartialEq, Eq, Debug, Ord, PartialOrd)]
pub struct PaymentPreimage(pub [u8; 32]);

impl fmt::Display for PaymentPreimage {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{}", log_bytes!(self.0))
	}
}

/// The payment secret (or payment address) is used to authenticate the sender of an HTLC to the
/// recipient and prevent probing of the recipient.
#[derive(Hash, Copy, Clone, PartialEq, Eq, Debug, Ord, PartialOrd)]
pub struct PaymentSecret(pub [u8; 32]);

/// An invoice to ourselves, as far as the rebalancer needs to know about it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invoice {
	/// The hash the payment is locked to.
	pub payment_hash: PaymentHash,
	/// The payment address which has to be included in the final hop's onion.
	pub payment_secret: PaymentSecret,
	/// The requested amount, `None` for zero-amount invoices.
	pub amount_msat: Option<u64>,
}

/// Creates invoices which pay to our own node.
pub trait InvoiceProvider {
	/// Creates an invoice over `amount_msat` or, if `None`, a zero-amount invoice. The `memo` ends
	/// up in the invoice description.
	fn create_invoice(&self, amount_msat: Option<u64>, memo: &str) -> Result<Invoice, String>;
}

/// The reason a node along a route gave for failing a payment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaymentFailureReason {
	/// The reporting node could not forward over the next channel, usually due to a lack of
	/// outbound liquidity.
	TemporaryChannelFailure,
	/// The reporting node had a temporary problem not tied to a specific channel.
	TemporaryNodeFailure,
	/// The reporting node does not know the next channel of the route.
	UnknownNextPeer,
	/// The next channel of the route is disabled.
	ChannelDisabled,
	/// The fee we offered the reporting node was too low, usually due to a recent policy update.
	FeeInsufficient,
	/// The CLTV expiry we offered the reporting node did not match its policy.
	IncorrectCltvExpiry,
	/// Any other failure code.
	Unspecified,
}

/// How a payment sent by a [`PaymentSender`] failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendFailure {
	/// The payment failed. `failed_hop_index` is the index of the hop which could not be crossed,
	/// that is, the index into [`Route::hops`] of the channel the reporting node failed to
	/// forward over. It is `None` if the failure could not be attributed.
	Failed {
		/// The index of the hop which could not be crossed, if known.
		failed_hop_index: Option<usize>,
		/// What the reporting node told us.
		reason: PaymentFailureReason,
	},
	/// We did not get a resolution in time. The payment may still succeed or fail.
	TimedOut,
}

/// Sends payments along a given route.
pub trait PaymentSender {
	/// Sends a payment along `route` and blocks until it either settled, failed or exceeded the
	/// sender's timeout.
	fn send_to_route(
		&self, route: &Route, payment_hash: PaymentHash, payment_secret: PaymentSecret,
	) -> Result<PaymentPreimage, SendFailure>;
}

/// One of our channels, as reported by the node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalChannel {
	/// The short channel id.
	pub short_channel_id: u64,
	/// The node id of the counterparty.
	pub remote_node_id: NodeId,
	/// The total channel value, in satoshis.
	pub capacity_sat: u64,
	/// Our balance, in satoshis, excluding any commitment fee.
	pub local_balance_sat: u64,
	/// The counterparty's balance, in satoshis.
	pub remote_balance_sat: u64,
	/// The reserve we have to keep in the channel, in satoshis.
	pub local_reserve_sat: u64,
	/// The reserve the counterparty has to keep in the channel, in satoshis.
	pub remote_reserve_sat: u64,
	/// The current commitment transaction fee, in satoshis. It is paid by the initiator.
	pub commit_fee_sat: u64,
	/// The feerate of the commitment transaction, in satoshis per 1000 weight units.
	pub fee_per_kw: u64,
	/// Whether we opened the channel.
	pub initiator: bool,
	/// Whether the channel is currently usable.
	pub active: bool,
}

/// Lists our channels.
pub trait ChannelSource {
	/// Returns our node id.
	fn our_node_id(&self) -> NodeId;
	/// Returns all of our open channels.
	fn list_channels(&self) -> Vec<LocalChannel>;
	/// Returns the height of the best block we know about.
	fn best_block_height(&self) -> u32;
}

#[cfg(test)]
mod tests {
	use super::{PaymentHash, PaymentPreimage};

	#[test]
	fn hashes_display_as_hex() {
		let mut hash = [0u8; 32];
		hash[0] = 0xab;
		hash[31] = 0x01;
		let rendered = PaymentHash(hash).to_string();
		assert_eq!(rendered.len(), 64);
		assert!(rendered.starts_with("ab00"));
		assert!(rendered.ends_with("0001"));
		assert_eq!(PaymentPreimage([0x11; 32]).to_string(), "11".repeat(32));
	}
}
