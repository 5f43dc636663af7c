// Pruned copy of crate rust log, without global logger
// https://github.com/rust-lang-nursery/log #7a60286
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

//! Log traits live here, which are called throughout the library to provide useful information for
//! debugging purposes.
//!
//! Log messages should be filtered client-side by implementing check against a given [`Record`]'s
//! [`Level`] field. Each module may have its own Logger or share one.

use core::cmp;
use core::fmt;
use core::fmt::Display;
use core::ops::Deref;

use crate::payment::PaymentHash;
use crate::routing::network_graph::NodeId;

static LOG_LEVEL_NAMES: [&'static str; 6] = ["GOSSIP", "TRACE", "DEBUG", "INFO", "WARN", "ERROR"];

/// An enum representing the available verbosity levels of the logger.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum Level {
	/// Designates extremely verbose information, such as every single edge weight evaluation
	Gossip,
	/// Designates very low priority, often extremely verbose, information
	Trace,
	/// Designates lower priority information
	Debug,
	/// Designates useful information
	Info,
	/// Designates hazardous situations
	Warn,
	/// Designates very serious errors
	Error,
}

impl PartialOrd for Level {
	#[inline]
	fn partial_cmp(&self, other: &Level) -> Option<cmp::Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for Level {
	#[inline]
	fn cmp(&self, other: &Level) -> cmp::Ordering {
		(*self as usize).cmp(&(*other as usize))
	}
}

impl fmt::Display for Level {
	fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
		fmt.pad(LOG_LEVEL_NAMES[*self as usize])
	}
}

impl Level {
	/// Returns the most verbose logging level.
	#[inline]
	pub fn max() -> Level {
		Level::Gossip
	}
}

/// A Record, unit of logging output with Metadata to enable filtering
/// Module_path, file, line to inform on log's source
#[derive(Clone, Debug)]
pub struct Record<'a> {
	/// The verbosity level of the message.
	pub level: Level,
	/// The node id of the peer pertaining to the logged record, if any.
	pub peer_id: Option<NodeId>,
	/// The short channel id of the channel pertaining to the logged record, if any.
	pub channel_id: Option<u64>,
	/// The message body.
	pub args: fmt::Arguments<'a>,
	/// The module path of the message.
	pub module_path: &'static str,
	/// The source file containing the message.
	pub file: &'static str,
	/// The line containing the message.
	pub line: u32,
	/// The payment hash of the rebalance payment pertaining to the logged record, if any.
	pub payment_hash: Option<PaymentHash>,
}

impl<'a> Record<'a> {
	/// Returns a new Record.
	#[inline]
	pub fn new(
		level: Level, peer_id: Option<NodeId>, channel_id: Option<u64>, args: fmt::Arguments<'a>,
		module_path: &'static str, file: &'static str, line: u32, payment_hash: Option<PaymentHash>,
	) -> Record<'a> {
		Record { level, peer_id, channel_id, args, module_path, file, line, payment_hash }
	}
}

impl<'a> Display for Record<'a> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:<5} [{}:{}]", self.level, self.module_path, self.line)?;
		if let Some(channel_id) = self.channel_id {
			write!(f, " ch:{}", channel_id)?;
		}
		if let Some(peer_id) = self.peer_id {
			write!(f, " p:{}", peer_id)?;
		}
		if let Some(payment_hash) = self.payment_hash {
			write!(f, " h:{}", payment_hash)?;
		}
		write!(f, " {}", self.args)
	}
}

/// A trait encapsulating the operations required of a logger. Keep in mind that log messages might
/// not be entirely self-explanatory and may need accompanying context fields to be fully understood.
pub trait Logger {
	/// Logs the [`Record`]. Since [`Record::channel_id`], [`Record::peer_id`] and
	/// [`Record::payment_hash`] are not embedded in the message body, log implementations should
	/// print those alongside the message to keep entries clear.
	fn log(&self, record: Record);
}

/// Adds relevant context to a [`Record`] before passing it to the wrapped [`Logger`].
pub struct WithContext<'a, L: Deref>
where
	L::Target: Logger,
{
	/// The logger to delegate to after adding context to the record.
	logger: &'a L,
	/// The node id of the peer pertaining to the logged record.
	peer_id: Option<NodeId>,
	/// The short channel id of the channel pertaining to the logged record.
	channel_id: Option<u64>,
	/// The payment hash of the payment pertaining to the logged record.
	payment_hash: Option<PaymentHash>,
}

impl<'a, L: Deref> Logger for WithContext<'a, L>
where
	L::Target: Logger,
{
	fn log(&self, mut record: Record) {
		if self.peer_id.is_some() {
			record.peer_id = self.peer_id
		};
		if self.channel_id.is_some() {
			record.channel_id = self.channel_id;
		}
		if self.payment_hash.is_some() {
			record.payment_hash = self.payment_hash;
		}
		self.logger.log(record)
	}
}

impl<'a, L: Deref> WithContext<'a, L>
where
	L::Target: Logger,
{
	/// Wraps the given logger, providing additional context to any logged records.
	pub fn from(
		logger: &'a L, peer_id: Option<NodeId>, channel_id: Option<u64>,
		payment_hash: Option<PaymentHash>,
	) -> Self {
		WithContext { logger, peer_id, channel_id, payment_hash }
	}
}

/// Wrapper for logging byte slices in hex format.
#[doc(hidden)]
pub struct DebugBytes<'a>(pub &'a [u8]);
impl<'a> core::fmt::Display for DebugBytes<'a> {
	fn fmt(&self, f: &mut core::fmt::Formatter) -> Result<(), core::fmt::Error> {
		for i in self.0 {
			write!(f, "{:02x}", i)?;
		}
		Ok(())
	}
}

/// Wrapper for logging `Iterator`s.
#[doc(hidden)]
pub struct DebugIter<T: fmt::Display, I: core::iter::Iterator<Item = T> + Clone>(pub I);
impl<T: fmt::Display, I: core::iter::Iterator<Item = T> + Clone> fmt::Display for DebugIter<T, I> {
	fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
		write!(f, "[")?;
		let mut iter = self.0.clone();
		if let Some(item) = iter.next() {
			write!(f, "{}", item)?;
		}
		for item in iter {
			write!(f, ", {}", item)?;
		}
		write!(f, "]")?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use crate::payment::PaymentHash;
	use crate::routing::network_graph::NodeId;
	use crate::util::logger::{Level, Logger, WithContext};
	use crate::util::test_utils::TestLogger;

	use bitcoin::secp256k1::{PublicKey, Secp256k1, SecretKey};

	#[test]
	fn test_level_show() {
		assert_eq!("INFO", Level::Info.to_string());
		assert_eq!("ERROR", Level::Error.to_string());
		assert_ne!("WARN", Level::Error.to_string());
	}

	struct WrapperLog {
		logger: &'static TestLogger,
	}

	impl WrapperLog {
		fn new(logger: &'static TestLogger) -> WrapperLog {
			WrapperLog { logger }
		}

		fn call_macros(&self) {
			log_error!(self.logger, "This is an error");
			log_warn!(self.logger, "This is a warning");
			log_info!(self.logger, "This is an info");
			log_debug!(self.logger, "This is a debug");
			log_trace!(self.logger, "This is a trace");
			log_gossip!(self.logger, "This is a gossip");
		}
	}

	#[test]
	fn test_logging_macros() {
		let logger = Box::leak(Box::new(TestLogger::new()));
		let wrapper = WrapperLog::new(logger);
		wrapper.call_macros();
		logger.assert_log_contains("lightning_rebalance::util::logger::tests", "This is a", 6);
	}

	#[test]
	fn test_logging_with_context() {
		let logger = &TestLogger::new();
		let secp_ctx = Secp256k1::new();
		let pk = PublicKey::from_secret_key(&secp_ctx, &SecretKey::from_slice(&[42; 32]).unwrap());
		let peer_id = NodeId::from_pubkey(&pk);
		let payment_hash = PaymentHash([0; 32]);
		let context_logger = WithContext::from(&logger, Some(peer_id), Some(42), Some(payment_hash));
		log_error!(context_logger, "This is an error");
		log_warn!(context_logger, "This is an error");
		log_debug!(context_logger, "This is an error");
		log_trace!(context_logger, "This is an error");
		log_gossip!(context_logger, "This is an error");
		log_info!(context_logger, "This is an error");
		logger.assert_log_context_contains(
			"lightning_rebalance::util::logger::tests", Some(peer_id), Some(42), 6,
		);
	}

	#[test]
	fn test_log_ordering() {
		assert!(Level::Error > Level::Warn);
		assert!(Level::Error >= Level::Warn);
		assert!(Level::Error >= Level::Error);
		assert!(Level::Warn > Level::Info);
		assert!(Level::Info > Level::Debug);
		assert!(Level::Debug > Level::Trace);
		assert!(Level::Trace > Level::Gossip);
		assert!(Level::Gossip < Level::Error);
		assert_eq!(Level::max(), Level::Gossip);
	}

	#[test]
	fn test_record_display() {
		let rendered = format!(
			"{}",
			crate::util::logger::Record::new(
				Level::Info, None, Some(7), format_args!("hello"), "m", "f", 3, None
			)
		);
		assert_eq!(rendered, "INFO  [m:3] ch:7 hello");
	}
}
