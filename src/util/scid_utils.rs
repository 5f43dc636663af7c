// This file is Copyright its original authors, visible in version control
// history.
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

//! Conversions between the integer channel ids used throughout the crate and their
//! `block:tx:output` components.

use core::fmt;
use core::str::FromStr;

/// Maximum block height that can be used in a `short_channel_id`. This
/// value is based on the 3-bytes available for block height.
pub const MAX_SCID_BLOCK: u64 = 0x00ffffff;

/// Maximum transaction index that can be used in a `short_channel_id`.
/// This value is based on the 3-bytes available for tx index.
pub const MAX_SCID_TX_INDEX: u64 = 0x00ffffff;

/// Maximum vout index that can be used in a `short_channel_id`. This
/// value is based on the 2-bytes available for the vout index.
pub const MAX_SCID_VOUT_INDEX: u64 = 0xffff;

/// A `short_channel_id` construction or parsing error
#[derive(Debug, PartialEq, Eq)]
pub enum ShortChannelIdError {
	/// The block height does not fit into 3 bytes.
	BlockOverflow,
	/// The transaction index does not fit into 3 bytes.
	TxIndexOverflow,
	/// The output index does not fit into 2 bytes.
	VoutIndexOverflow,
	/// The string was not of the form `block:tx:output` or `blockxtxxoutput`.
	InvalidFormat,
}

/// Extracts the block height (most significant 3-bytes) from the `short_channel_id`
pub fn block_from_scid(short_channel_id: u64) -> u32 {
	(short_channel_id >> 40) as u32
}

/// Extracts the tx index (bytes [2..4]) from the `short_channel_id`
pub fn tx_index_from_scid(short_channel_id: u64) -> u32 {
	((short_channel_id >> 16) & MAX_SCID_TX_INDEX) as u32
}

/// Extracts the vout (bytes [0..2]) from the `short_channel_id`
pub fn vout_from_scid(short_channel_id: u64) -> u16 {
	(short_channel_id & MAX_SCID_VOUT_INDEX) as u16
}

/// Constructs a `short_channel_id` using the components pieces. Results in an error
/// if the block height, tx index, or vout index overflow the maximum sizes.
pub fn scid_from_parts(block: u64, tx_index: u64, vout_index: u64) -> Result<u64, ShortChannelIdError> {
	if block > MAX_SCID_BLOCK {
		return Err(ShortChannelIdError::BlockOverflow);
	}
	if tx_index > MAX_SCID_TX_INDEX {
		return Err(ShortChannelIdError::TxIndexOverflow);
	}
	if vout_index > MAX_SCID_VOUT_INDEX {
		return Err(ShortChannelIdError::VoutIndexOverflow);
	}
	Ok((block << 40) | (tx_index << 16) | vout_index)
}

/// A channel id in its human readable `block:tx:output` form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShortChannelId(pub u64);

impl fmt::Display for ShortChannelId {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{}:{}:{}", block_from_scid(self.0), tx_index_from_scid(self.0), vout_from_scid(self.0))
	}
}

impl FromStr for ShortChannelId {
	type Err = ShortChannelIdError;

	/// Parses `block:tx:output` as well as the `blockxtxxoutput` notation. A bare integer is taken
	/// to already be the encoded id.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if let Ok(id) = s.parse::<u64>() {
			return Ok(ShortChannelId(id));
		}
		let separator = if s.contains(':') { ':' } else { 'x' };
		let mut parts = s.split(separator).map(|part| part.parse::<u64>());
		match (parts.next(), parts.next(), parts.next(), parts.next()) {
			(Some(Ok(block)), Some(Ok(tx_index)), Some(Ok(vout)), None) => {
				scid_from_parts(block, tx_index, vout).map(ShortChannelId)
			},
			_ => Err(ShortChannelIdError::InvalidFormat),
		}
	}
}
