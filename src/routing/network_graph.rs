// This file is Copyright its original authors, visible in version control
// history.
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

//! The snapshot of the public channel graph which routes are computed on.
//!
//! The graph is a multigraph: two nodes may share several channels. Every node keeps its
//! neighbors in the order in which channels to them were first added, together with the ids of
//! all channels to that neighbor, and the largest capacity between any two nodes is tracked
//! alongside.

use bitcoin::secp256k1;
use bitcoin::secp256k1::constants::PUBLIC_KEY_SIZE;
use bitcoin::secp256k1::PublicKey;

use crate::util::hash_tables::{hash_map, new_hash_map, HashMap};
use crate::util::ser::{DecodeError, Readable, Writeable, Writer};

use core::{cmp, fmt};
use std::io;

/// Represents the compressed public key of a node
#[derive(Clone, Copy)]
pub struct NodeId([u8; PUBLIC_KEY_SIZE]);

impl NodeId {
	/// Create a new NodeId from a public key
	pub fn from_pubkey(pubkey: &PublicKey) -> Self {
		NodeId(pubkey.serialize())
	}

	/// Create a new NodeId from a slice of bytes
	pub fn from_slice(bytes: &[u8]) -> Result<Self, DecodeError> {
		if bytes.len() != PUBLIC_KEY_SIZE {
			return Err(DecodeError::InvalidValue);
		}
		let mut data = [0; PUBLIC_KEY_SIZE];
		data.copy_from_slice(bytes);
		Ok(NodeId(data))
	}

	/// Get the public key slice from this NodeId
	pub fn as_slice(&self) -> &[u8] {
		&self.0
	}

	/// Get the public key as an array from this NodeId
	pub fn as_array(&self) -> &[u8; PUBLIC_KEY_SIZE] {
		&self.0
	}

	/// Get the public key from this NodeId
	pub fn as_pubkey(&self) -> Result<PublicKey, secp256k1::Error> {
		PublicKey::from_slice(&self.0)
	}
}

impl fmt::Debug for NodeId {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "NodeId({})", log_bytes!(self.0))
	}
}
impl fmt::Display for NodeId {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{}", log_bytes!(self.0))
	}
}

impl core::hash::Hash for NodeId {
	fn hash<H: core::hash::Hasher>(&self, hasher: &mut H) {
		self.0.hash(hasher);
	}
}

impl Eq for NodeId {}

impl PartialEq for NodeId {
	fn eq(&self, other: &Self) -> bool {
		self.0[..] == other.0[..]
	}
}

impl cmp::PartialOrd for NodeId {
	fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for NodeId {
	fn cmp(&self, other: &Self) -> cmp::Ordering {
		self.0[..].cmp(&other.0[..])
	}
}

impl Writeable for NodeId {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), io::Error> {
		writer.write_all(&self.0)?;
		Ok(())
	}
}

impl Readable for NodeId {
	fn read<R: io::Read>(reader: &mut R) -> Result<Self, DecodeError> {
		let mut buf = [0; PUBLIC_KEY_SIZE];
		reader.read_exact(&mut buf)?;
		Ok(Self(buf))
	}
}

/// Two nodes in a canonical order, the smaller node id first.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct NodePair {
	smaller: NodeId,
	larger: NodeId,
}

impl NodePair {
	/// Builds the pair, independent of the order of `a` and `b`.
	pub fn new(a: NodeId, b: NodeId) -> Self {
		if a <= b {
			NodePair { smaller: a, larger: b }
		} else {
			NodePair { smaller: b, larger: a }
		}
	}

	/// The node with the smaller id.
	pub fn smaller(&self) -> &NodeId {
		&self.smaller
	}

	/// The node with the larger id.
	pub fn larger(&self) -> &NodeId {
		&self.larger
	}
}

/// The forwarding policy a node announced for one direction of a channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelPolicy {
	/// The fixed fee charged for every forwarded HTLC, in millisatoshis. Negative values are seen
	/// in the wild and are interpreted by their absolute value.
	pub base_fee_msat: i64,
	/// The proportional fee, in millionths of the forwarded amount. Negative values are
	/// interpreted by their absolute value.
	pub fee_rate_ppm: i64,
	/// The difference in CLTV expiry the forwarding node requires between incoming and outgoing
	/// HTLCs.
	pub cltv_expiry_delta: u16,
	/// Whether the node refuses to forward over this direction.
	pub disabled: bool,
	/// The smallest HTLC the node forwards, in millisatoshis.
	pub htlc_minimum_msat: u64,
	/// The largest HTLC the node forwards, in millisatoshis.
	pub htlc_maximum_msat: u64,
	/// When the policy was last updated, in seconds since the UNIX epoch.
	pub last_update: u32,
}

impl ChannelPolicy {
	/// The fee charged for forwarding `amount_msat`, `None` on overflow.
	pub fn fee_msat(&self, amount_msat: u64) -> Option<u64> {
		self.fee_rate_ppm
			.unsigned_abs()
			.checked_mul(amount_msat)
			.map(|prop| prop / 1_000_000)
			.and_then(|prop| prop.checked_add(self.base_fee_msat.unsigned_abs()))
	}

	/// The fee charged for forwarding `amount_msat` as a floating point amount, the form in which
	/// fees compete with penalties during path finding.
	pub fn fee_msat_f64(&self, amount_msat: u64) -> f64 {
		self.base_fee_msat.unsigned_abs() as f64
			+ amount_msat as f64 * self.fee_rate_ppm.unsigned_abs() as f64 / 1_000_000.0
	}
}

/// Details about a channel (both directions).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelInfo {
	/// The short channel id.
	pub short_channel_id: u64,
	/// Source node of the first direction of a channel, always the smaller node id.
	pub node_one: NodeId,
	/// Policy of `node_one` for forwarding to `node_two`.
	pub one_to_two: Option<ChannelPolicy>,
	/// Source node of the second direction of a channel.
	pub node_two: NodeId,
	/// Policy of `node_two` for forwarding to `node_one`.
	pub two_to_one: Option<ChannelPolicy>,
	/// The channel capacity as seen on-chain, in satoshis.
	pub capacity_sat: u64,
	/// When the channel was last updated, in seconds since the UNIX epoch.
	pub last_update: u32,
}

impl ChannelInfo {
	/// Builds a channel between `a` and `b` without any policies. The endpoints are put in
	/// canonical order.
	pub fn new(short_channel_id: u64, a: NodeId, b: NodeId, capacity_sat: u64) -> Self {
		let pair = NodePair::new(a, b);
		ChannelInfo {
			short_channel_id,
			node_one: *pair.smaller(),
			one_to_two: None,
			node_two: *pair.larger(),
			two_to_one: None,
			capacity_sat,
			last_update: 0,
		}
	}

	/// Returns the policy `source` announced for forwarding over this channel along with the node
	/// on the other end, or `None` if `source` is not an endpoint of the channel.
	pub fn policy_from(&self, source: &NodeId) -> Option<(Option<&ChannelPolicy>, &NodeId)> {
		if *source == self.node_one {
			Some((self.one_to_two.as_ref(), &self.node_two))
		} else if *source == self.node_two {
			Some((self.two_to_one.as_ref(), &self.node_one))
		} else {
			None
		}
	}

	/// Returns the other endpoint of the channel, or `None` if `node` is not an endpoint.
	pub fn counterparty_of(&self, node: &NodeId) -> Option<&NodeId> {
		self.policy_from(node).map(|(_, other)| other)
	}

	/// Sets the policy `source` uses for forwarding over this channel. Returns whether `source` is
	/// an endpoint of the channel.
	pub fn set_policy(&mut self, source: &NodeId, policy: ChannelPolicy) -> bool {
		let slot = if *source == self.node_one {
			&mut self.one_to_two
		} else if *source == self.node_two {
			&mut self.two_to_one
		} else {
			return false;
		};
		self.last_update = cmp::max(self.last_update, policy.last_update);
		*slot = Some(policy);
		true
	}
}

/// A neighbor of a node together with all channels connecting the two, in the order they were
/// added.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Neighbor {
	/// The node id of the neighbor.
	pub node_id: NodeId,
	/// The channels between the two nodes.
	pub short_channel_ids: Vec<u64>,
}

/// Errors which may occur when modifying a [`NetworkGraph`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GraphError {
	/// A channel without capacity can not forward anything.
	ZeroCapacity,
	/// Both endpoints of the channel are the same node.
	SelfLoop,
	/// The channel is already part of the graph.
	DuplicateChannel,
	/// The channel is not part of the graph.
	UnknownChannel,
	/// The node is not an endpoint of the channel.
	UnknownNode,
}

/// A snapshot of the public channel graph.
#[derive(Clone, Debug, PartialEq)]
pub struct NetworkGraph {
	channels: HashMap<u64, ChannelInfo>,
	adjacency: HashMap<NodeId, Vec<Neighbor>>,
	max_capacities: HashMap<NodePair, u64>,
}

impl NetworkGraph {
	/// Creates a new, empty, network graph.
	pub fn new() -> Self {
		NetworkGraph {
			channels: new_hash_map(),
			adjacency: new_hash_map(),
			max_capacities: new_hash_map(),
		}
	}

	/// Adds a channel to the graph. Parallel channels between the same two nodes are allowed.
	pub fn add_channel(&mut self, channel: ChannelInfo) -> Result<(), GraphError> {
		if channel.capacity_sat == 0 {
			return Err(GraphError::ZeroCapacity);
		}
		if channel.node_one == channel.node_two {
			return Err(GraphError::SelfLoop);
		}
		let channel = match self.channels.entry(channel.short_channel_id) {
			hash_map::Entry::Occupied(_) => return Err(GraphError::DuplicateChannel),
			hash_map::Entry::Vacant(entry) => entry.insert(channel),
		};

		for (node, other) in
			[(channel.node_one, channel.node_two), (channel.node_two, channel.node_one)]
		{
			let neighbors = self.adjacency.entry(node).or_insert_with(Vec::new);
			match neighbors.iter_mut().find(|neighbor| neighbor.node_id == other) {
				Some(neighbor) => neighbor.short_channel_ids.push(channel.short_channel_id),
				None => neighbors.push(Neighbor {
					node_id: other,
					short_channel_ids: vec![channel.short_channel_id],
				}),
			}
		}

		let max_capacity = self
			.max_capacities
			.entry(NodePair::new(channel.node_one, channel.node_two))
			.or_insert(0);
		*max_capacity = cmp::max(*max_capacity, channel.capacity_sat);
		Ok(())
	}

	/// Removes a channel from the graph, returning it.
	pub fn remove_channel(&mut self, short_channel_id: u64) -> Result<ChannelInfo, GraphError> {
		let channel = self.channels.remove(&short_channel_id).ok_or(GraphError::UnknownChannel)?;

		for (node, other) in
			[(channel.node_one, channel.node_two), (channel.node_two, channel.node_one)]
		{
			if let hash_map::Entry::Occupied(mut entry) = self.adjacency.entry(node) {
				let neighbors = entry.get_mut();
				if let Some(pos) = neighbors.iter().position(|neighbor| neighbor.node_id == other) {
					neighbors[pos].short_channel_ids.retain(|scid| *scid != short_channel_id);
					if neighbors[pos].short_channel_ids.is_empty() {
						neighbors.remove(pos);
					}
				}
				if neighbors.is_empty() {
					entry.remove();
				}
			}
		}

		let pair = NodePair::new(channel.node_one, channel.node_two);
		let remaining_max = self
			.channels_between(&channel.node_one, &channel.node_two)
			.iter()
			.filter_map(|scid| self.channels.get(scid))
			.map(|info| info.capacity_sat)
			.max();
		match remaining_max {
			Some(capacity) => {
				self.max_capacities.insert(pair, capacity);
			},
			None => {
				self.max_capacities.remove(&pair);
			},
		}
		Ok(channel)
	}

	/// Sets the forwarding policy `source` announced for a channel.
	pub fn update_channel_policy(
		&mut self, short_channel_id: u64, source: &NodeId, policy: ChannelPolicy,
	) -> Result<(), GraphError> {
		let channel = self.channels.get_mut(&short_channel_id).ok_or(GraphError::UnknownChannel)?;
		if channel.set_policy(source, policy) {
			Ok(())
		} else {
			Err(GraphError::UnknownNode)
		}
	}

	/// Returns the channel with the given short channel id.
	pub fn channel(&self, short_channel_id: u64) -> Option<&ChannelInfo> {
		self.channels.get(&short_channel_id)
	}

	/// Returns all channels of the graph, in no particular order.
	pub fn channels(&self) -> impl Iterator<Item = &ChannelInfo> {
		self.channels.values()
	}

	/// Returns the neighbors of `node` in the order they were first connected.
	pub fn neighbors(&self, node: &NodeId) -> &[Neighbor] {
		self.adjacency.get(node).map(|neighbors| &neighbors[..]).unwrap_or(&[])
	}

	/// Returns the ids of all channels between `a` and `b`, in the order they were added.
	pub fn channels_between(&self, a: &NodeId, b: &NodeId) -> &[u64] {
		self.neighbors(a)
			.iter()
			.find(|neighbor| neighbor.node_id == *b)
			.map(|neighbor| &neighbor.short_channel_ids[..])
			.unwrap_or(&[])
	}

	/// Returns the largest capacity of all channels between `a` and `b`, in satoshis.
	pub fn max_capacity_sat(&self, a: &NodeId, b: &NodeId) -> Option<u64> {
		self.max_capacities.get(&NodePair::new(*a, *b)).copied()
	}

	/// Returns whether `node` has at least one channel.
	pub fn contains_node(&self, node: &NodeId) -> bool {
		self.adjacency.contains_key(node)
	}

	/// The number of nodes with at least one channel.
	pub fn node_count(&self) -> usize {
		self.adjacency.len()
	}

	/// The number of channels.
	pub fn channel_count(&self) -> usize {
		self.channels.len()
	}
}

impl Default for NetworkGraph {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::routing::test_utils::node_id;

	fn policy(base_fee_msat: i64, fee_rate_ppm: i64) -> ChannelPolicy {
		ChannelPolicy {
			base_fee_msat,
			fee_rate_ppm,
			cltv_expiry_delta: 40,
			disabled: false,
			htlc_minimum_msat: 0,
			htlc_maximum_msat: u64::max_value(),
			last_update: 0,
		}
	}

	#[test]
	fn node_pairs_are_canonical() {
		let (a, b) = (node_id(1), node_id(2));
		assert_eq!(NodePair::new(a, b), NodePair::new(b, a));
		let pair = NodePair::new(b, a);
		assert!(pair.smaller() < pair.larger());
	}

	#[test]
	fn channels_put_endpoints_in_canonical_order() {
		let (a, b) = (node_id(1), node_id(2));
		let channel = ChannelInfo::new(1, b, a, 1_000);
		assert!(channel.node_one < channel.node_two);
		assert_eq!(channel.counterparty_of(&a), Some(&b));
		assert_eq!(channel.counterparty_of(&b), Some(&a));
		assert_eq!(channel.counterparty_of(&node_id(3)), None);
	}

	#[test]
	fn policies_are_directional() {
		let (a, b) = (node_id(1), node_id(2));
		let mut graph = NetworkGraph::new();
		graph.add_channel(ChannelInfo::new(7, a, b, 1_000)).unwrap();
		graph.update_channel_policy(7, &a, policy(1_000, 1)).unwrap();
		graph.update_channel_policy(7, &b, policy(2_000, 2)).unwrap();
		assert_eq!(graph.update_channel_policy(7, &node_id(3), policy(0, 0)), Err(GraphError::UnknownNode));
		assert_eq!(graph.update_channel_policy(8, &a, policy(0, 0)), Err(GraphError::UnknownChannel));

		let channel = graph.channel(7).unwrap();
		let (from_a, to) = channel.policy_from(&a).unwrap();
		assert_eq!(from_a.unwrap().base_fee_msat, 1_000);
		assert_eq!(*to, b);
		let (from_b, to) = channel.policy_from(&b).unwrap();
		assert_eq!(from_b.unwrap().base_fee_msat, 2_000);
		assert_eq!(*to, a);
	}

	#[test]
	fn fees_use_absolute_policy_values() {
		assert_eq!(policy(1_000, 100).fee_msat(1_000_000), Some(1_100));
		assert_eq!(policy(-1_000, -100).fee_msat(1_000_000), Some(1_100));
		assert_eq!(policy(0, i64::max_value()).fee_msat(u64::max_value()), None);
		assert_eq!(policy(1_000, 100).fee_msat_f64(1_000_000), 1_100.0);
	}

	#[test]
	fn rejects_invalid_channels() {
		let (a, b) = (node_id(1), node_id(2));
		let mut graph = NetworkGraph::new();
		assert_eq!(graph.add_channel(ChannelInfo::new(1, a, b, 0)), Err(GraphError::ZeroCapacity));
		assert_eq!(graph.add_channel(ChannelInfo::new(1, a, a, 10)), Err(GraphError::SelfLoop));
		graph.add_channel(ChannelInfo::new(1, a, b, 10)).unwrap();
		assert_eq!(graph.add_channel(ChannelInfo::new(1, a, b, 10)), Err(GraphError::DuplicateChannel));
		assert_eq!(graph.channel_count(), 1);
		assert_eq!(graph.node_count(), 2);
	}

	#[test]
	fn tracks_parallel_channels_and_max_capacity() {
		let (a, b, c) = (node_id(1), node_id(2), node_id(3));
		let mut graph = NetworkGraph::new();
		graph.add_channel(ChannelInfo::new(1, a, b, 100)).unwrap();
		graph.add_channel(ChannelInfo::new(2, a, c, 50)).unwrap();
		graph.add_channel(ChannelInfo::new(3, b, a, 300)).unwrap();

		let neighbors: Vec<NodeId> = graph.neighbors(&a).iter().map(|n| n.node_id).collect();
		assert_eq!(neighbors, vec![b, c]);
		assert_eq!(graph.channels_between(&a, &b), &[1, 3]);
		assert_eq!(graph.channels_between(&b, &a), &[1, 3]);
		assert_eq!(graph.max_capacity_sat(&b, &a), Some(300));

		graph.remove_channel(3).unwrap();
		assert_eq!(graph.channels_between(&a, &b), &[1]);
		assert_eq!(graph.max_capacity_sat(&a, &b), Some(100));

		graph.remove_channel(1).unwrap();
		assert!(graph.channels_between(&a, &b).is_empty());
		assert_eq!(graph.max_capacity_sat(&a, &b), None);
		assert!(!graph.contains_node(&b));
		assert!(graph.contains_node(&a));
		assert_eq!(graph.remove_channel(1), Err(GraphError::UnknownChannel));
	}

	#[test]
	fn node_ids_parse_from_slices() {
		let a = node_id(1);
		assert_eq!(NodeId::from_slice(a.as_slice()), Ok(a));
		assert_eq!(NodeId::from_slice(&a.as_slice()[1..]), Err(DecodeError::InvalidValue));
		assert!(a.as_pubkey().is_ok());
		assert_eq!(format!("{:?}", a), format!("NodeId({})", a));
	}
}
