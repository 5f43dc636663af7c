// This file is Copyright its original authors, visible in version control
// history.
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

use crate::payment::{
	ChannelSource, Invoice, InvoiceProvider, LocalChannel, PaymentHash, PaymentPreimage,
	PaymentSecret, PaymentSender, SendFailure,
};
use crate::routing::network_graph::NodeId;
use crate::routing::router::Route;
use crate::util::hash_tables::{new_hash_map, HashMap};
use crate::util::logger::{Level, Logger, Record};

use bitcoin::hashes::sha256::Hash as Sha256;
use bitcoin::hashes::Hash;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

pub struct TestLogger {
	level: Level,
	id: String,
	pub lines: Mutex<HashMap<(String, String), usize>>,
	pub context: Mutex<HashMap<(String, Option<NodeId>, Option<u64>), usize>>,
}

impl TestLogger {
	pub fn new() -> TestLogger {
		TestLogger {
			level: Level::Trace,
			id: "".to_owned(),
			lines: Mutex::new(new_hash_map()),
			context: Mutex::new(new_hash_map()),
		}
	}

	/// Search for the number of occurrence of the logged lines which
	/// 1. belongs to the specified module and
	/// 2. contains `line` in it.
	/// And asserts if the number of occurrences is the same with the given `count`
	pub fn assert_log_contains(&self, module: &str, line: &str, count: usize) {
		let log_entries = self.lines.lock().unwrap();
		let l: usize = log_entries
			.iter()
			.filter(|&(&(ref m, ref l), _c)| m == module && l.contains(line))
			.map(|(_, c)| c)
			.sum();
		assert_eq!(l, count)
	}

	/// Search for the number of occurrences of logged lines which
	/// 1. belong to the specified module and
	/// 2. carry the given peer and channel context.
	/// Assert that the number of occurrences equals the given `count`
	pub fn assert_log_context_contains(
		&self, module: &str, peer_id: Option<NodeId>, channel_id: Option<u64>, count: usize,
	) {
		let context_entries = self.context.lock().unwrap();
		let l = context_entries.get(&(module.to_owned(), peer_id, channel_id)).copied().unwrap_or(0);
		assert_eq!(l, count)
	}
}

impl Logger for TestLogger {
	fn log(&self, record: Record) {
		*self
			.lines
			.lock()
			.unwrap()
			.entry((record.module_path.to_string(), format!("{}", record.args)))
			.or_insert(0) += 1;
		*self
			.context
			.lock()
			.unwrap()
			.entry((record.module_path.to_string(), record.peer_id, record.channel_id))
			.or_insert(0) += 1;
		if record.level >= self.level {
			println!(
				"{:<5} {} [{} : {}, {}] {}",
				record.level.to_string(),
				self.id,
				record.module_path,
				record.file,
				record.line,
				record.args
			);
		}
	}
}

/// Resolves payments with scripted outcomes, falling back to a default outcome once the script
/// runs out.
pub struct TestPaymentSender {
	pub outcomes: Mutex<VecDeque<Result<PaymentPreimage, SendFailure>>>,
	pub default_outcome: Mutex<Result<PaymentPreimage, SendFailure>>,
	pub sent: Mutex<Vec<(Route, PaymentHash, PaymentSecret)>>,
	/// Set on every send, to simulate a shutdown request arriving while a payment is in flight.
	pub cancel_on_send: Mutex<Option<Arc<AtomicBool>>>,
}

impl TestPaymentSender {
	pub fn new() -> Self {
		TestPaymentSender {
			outcomes: Mutex::new(VecDeque::new()),
			default_outcome: Mutex::new(Ok(PaymentPreimage([0x42; 32]))),
			sent: Mutex::new(Vec::new()),
			cancel_on_send: Mutex::new(None),
		}
	}

	pub fn expect(&self, outcome: Result<PaymentPreimage, SendFailure>) {
		self.outcomes.lock().unwrap().push_back(outcome);
	}

	pub fn set_default_outcome(&self, outcome: Result<PaymentPreimage, SendFailure>) {
		*self.default_outcome.lock().unwrap() = outcome;
	}

	pub fn sent_routes(&self) -> Vec<Route> {
		self.sent.lock().unwrap().iter().map(|(route, _, _)| route.clone()).collect()
	}

	pub fn sent_payment_hashes(&self) -> Vec<PaymentHash> {
		self.sent.lock().unwrap().iter().map(|(_, hash, _)| *hash).collect()
	}
}

impl PaymentSender for TestPaymentSender {
	fn send_to_route(
		&self, route: &Route, payment_hash: PaymentHash, payment_secret: PaymentSecret,
	) -> Result<PaymentPreimage, SendFailure> {
		self.sent.lock().unwrap().push((route.clone(), payment_hash, payment_secret));
		if let Some(flag) = self.cancel_on_send.lock().unwrap().as_ref() {
			flag.store(true, Ordering::Release);
		}
		match self.outcomes.lock().unwrap().pop_front() {
			Some(outcome) => outcome,
			None => *self.default_outcome.lock().unwrap(),
		}
	}
}

/// Hands out invoices with deterministic preimages.
pub struct TestInvoiceProvider {
	pub created: Mutex<Vec<(Option<u64>, String)>>,
	pub fail_with: Mutex<Option<String>>,
}

impl TestInvoiceProvider {
	pub fn new() -> Self {
		TestInvoiceProvider { created: Mutex::new(Vec::new()), fail_with: Mutex::new(None) }
	}

	pub fn preimage(index: usize) -> PaymentPreimage {
		PaymentPreimage([index as u8 + 1; 32])
	}

	pub fn invoice_count(&self) -> usize {
		self.created.lock().unwrap().len()
	}
}

impl InvoiceProvider for TestInvoiceProvider {
	fn create_invoice(&self, amount_msat: Option<u64>, memo: &str) -> Result<Invoice, String> {
		if let Some(err) = self.fail_with.lock().unwrap().as_ref() {
			return Err(err.clone());
		}
		let mut created = self.created.lock().unwrap();
		let preimage = Self::preimage(created.len());
		created.push((amount_msat, memo.to_owned()));
		Ok(Invoice {
			payment_hash: PaymentHash(Sha256::hash(&preimage.0).to_byte_array()),
			payment_secret: PaymentSecret([created.len() as u8; 32]),
			amount_msat,
		})
	}
}

pub struct TestChannelSource {
	pub our_node_id: NodeId,
	pub channels: Mutex<Vec<LocalChannel>>,
	pub best_block_height: u32,
}

impl TestChannelSource {
	pub fn new(our_node_id: NodeId, channels: Vec<LocalChannel>) -> Self {
		TestChannelSource { our_node_id, channels: Mutex::new(channels), best_block_height: 800_000 }
	}
}

impl ChannelSource for TestChannelSource {
	fn our_node_id(&self) -> NodeId {
		self.our_node_id
	}

	fn list_channels(&self) -> Vec<LocalChannel> {
		self.channels.lock().unwrap().clone()
	}

	fn best_block_height(&self) -> u32 {
		self.best_block_height
	}
}
