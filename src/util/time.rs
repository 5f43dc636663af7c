// This file is Copyright its original authors, visible in version control
// history.
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

//! A simple module which either re-exports [`std::time::Instant`] or a mocked version of it for
//! tests, together with the wall clock used to timestamp liquidity knowledge.

use core::time::Duration;

#[cfg(not(test))]
pub use std::time::Instant;
#[cfg(test)]
pub use test::Instant;

/// Returns the current time as a [`Duration`] since the UNIX epoch.
#[cfg(not(test))]
pub fn duration_since_epoch() -> Duration {
	std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.unwrap_or(Duration::ZERO)
}

/// Returns the mocked time since the UNIX epoch, which only moves through [`Instant::advance`].
#[cfg(test)]
pub fn duration_since_epoch() -> Duration {
	test::MOCK_EPOCH + Instant::now().elapsed_since_start()
}

#[cfg(test)]
mod test {
	use core::cell::Cell;
	use core::time::Duration;

	/// Arbitrary fixed wall clock start for tests.
	pub const MOCK_EPOCH: Duration = Duration::from_secs(1_700_000_000);

	/// Time that can be advanced manually in tests.
	#[derive(Clone, Copy, Debug, PartialEq, Eq)]
	pub struct Instant(Duration);

	impl Instant {
		thread_local! {
			static ELAPSED: Cell<Duration> = core::cell::Cell::new(Duration::from_secs(0));
		}

		pub fn advance(duration: Duration) {
			Self::ELAPSED.with(|elapsed| elapsed.set(elapsed.get() + duration))
		}

		pub fn now() -> Self {
			Self(Self::ELAPSED.with(|elapsed| elapsed.get()))
		}

		pub fn duration_since(&self, earlier: Self) -> Duration {
			self.0 - earlier.0
		}

		pub fn elapsed(&self) -> Duration {
			Self::now().0 - self.0
		}

		pub(super) fn elapsed_since_start(&self) -> Duration {
			self.0
		}
	}

	#[test]
	fn time_passes_when_advanced() {
		let now = Instant::now();
		let wall_clock = super::duration_since_epoch();

		Instant::advance(Duration::from_secs(1));
		Instant::advance(Duration::from_secs(1));

		let later = Instant::now();

		assert_eq!(later.duration_since(now), Duration::from_secs(2));
		assert_eq!(now.elapsed(), Duration::from_secs(2));
		assert_eq!(super::duration_since_epoch() - wall_clock, Duration::from_secs(2));
	}
}
