// This file is Copyright its original authors, visible in version control
// history.
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

#![crate_name = "lightning_rebalance"]

//! Liquidity management for a Lightning node.
//!
//! The crate models the public channel graph together with learned per-direction liquidity
//! knowledge ([`routing::liquidity_hints`]), rates channels for a given payment amount
//! ([`routing::scoring`]), finds cheap loopless paths ([`routing::pathfinding`]), turns channel
//! hops into onion-ready routes ([`routing::router`]) and drives circular self-payments that move
//! liquidity between local channels ([`rebalance`]).
//!
//! Everything that talks to a Lightning daemon (sending payments, creating invoices, listing local
//! channels) is abstracted behind the traits in [`payment`], so the library itself performs no I/O.

#![cfg_attr(not(test), deny(missing_docs))]
#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;
extern crate bitcoin;
extern crate libm;

#[macro_use]
pub mod util;
pub mod payment;
pub mod rebalance;
pub mod routing;
