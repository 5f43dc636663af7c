// This file is Copyright its original authors, visible in version control
// history.
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

use crate::routing::network_graph::{ChannelInfo, ChannelPolicy, NetworkGraph, NodeId};

use bitcoin::secp256k1::{PublicKey, Secp256k1, SecretKey};

pub(crate) fn node_id(n: u8) -> NodeId {
	let secp_ctx = Secp256k1::signing_only();
	let secret = SecretKey::from_slice(&[n; 32]).unwrap();
	NodeId::from_pubkey(&PublicKey::from_secret_key(&secp_ctx, &secret))
}

pub(crate) fn policy(base_fee_msat: i64, fee_rate_ppm: i64, capacity_sat: u64) -> ChannelPolicy {
	ChannelPolicy {
		base_fee_msat,
		fee_rate_ppm,
		cltv_expiry_delta: 40,
		disabled: false,
		htlc_minimum_msat: 0,
		htlc_maximum_msat: capacity_sat * 1000,
		last_update: 0,
	}
}

pub(crate) fn add_channel(
	graph: &mut NetworkGraph, short_channel_id: u64, a: NodeId, b: NodeId, capacity_sat: u64,
	base_fee_msat: i64, fee_rate_ppm: i64,
) {
	let mut channel = ChannelInfo::new(short_channel_id, a, b, capacity_sat);
	let policy = policy(base_fee_msat, fee_rate_ppm, capacity_sat);
	channel.one_to_two = Some(policy);
	channel.two_to_one = Some(policy);
	graph.add_channel(channel).unwrap();
}

/// Five nodes, seven channels, equal fees everywhere:
///
/// ```text
///         3
///     A  ---  B
///     |    2/ |
///   6 |   E   | 1
///     | /5 \7 |
///     D  ---  C
///         4
/// ```
///
/// Returns the graph and the nodes `[A, B, C, D, E]`.
pub(crate) fn build_routing_graph() -> (NetworkGraph, [NodeId; 5]) {
	let nodes = [node_id(10), node_id(11), node_id(12), node_id(13), node_id(14)];
	let [a, b, c, d, e] = nodes;
	let mut graph = NetworkGraph::new();
	add_channel(&mut graph, 3, a, b, 1_000_000, 1000, 100);
	add_channel(&mut graph, 6, a, d, 2_000_000, 1000, 100);
	add_channel(&mut graph, 2, b, e, 3_000_000, 1000, 100);
	add_channel(&mut graph, 1, b, c, 10_000_000, 1000, 100);
	add_channel(&mut graph, 7, c, e, 1_000_000, 1000, 100);
	add_channel(&mut graph, 4, c, d, 2_000_000, 1000, 100);
	add_channel(&mut graph, 5, d, e, 3_000_000, 1000, 100);
	(graph, nodes)
}

/// Our node A in the center with channels to B, C and D, which are connected in a ring:
///
/// ```text
///       B
///    1 / \ 3
///     A - C
///    5 \ / 6
///       D     (4 connects B and D)
/// ```
///
/// Returns the graph and the nodes `[A, B, C, D]`.
pub(crate) fn build_star_ring_graph() -> (NetworkGraph, [NodeId; 4]) {
	let nodes = [node_id(20), node_id(21), node_id(22), node_id(23)];
	let [a, b, c, d] = nodes;
	let mut graph = NetworkGraph::new();
	add_channel(&mut graph, 1, a, b, 1_000_000, 0, 1);
	add_channel(&mut graph, 2, a, c, 1_000_000, 0, 1);
	add_channel(&mut graph, 5, a, d, 1_000_000, 0, 1);
	add_channel(&mut graph, 3, b, c, 10_000_000, 1, 10);
	add_channel(&mut graph, 4, b, d, 10_000_000, 1, 10);
	add_channel(&mut graph, 6, c, d, 10_000_000, 1, 10);
	(graph, nodes)
}
