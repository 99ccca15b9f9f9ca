//! Time source for timers and time-boxed work.

use std::cell::Cell;

/// Milliseconds since an arbitrary epoch.
pub trait Clock {
	fn now_ms(&self) -> f64;
}

/// Clock driven by hand. Optionally advances by `step` on every read, which
/// lets tests exercise wall-clock budgets.
#[derive(Debug, Default)]
pub struct ManualClock {
	now: Cell<f64>,
	step: f64,
}

impl ManualClock {
	pub fn new(start: f64) -> Self {
		Self {
			now: Cell::new(start),
			step: 0.0,
		}
	}

	pub fn stepping(step: f64) -> Self {
		Self {
			now: Cell::new(0.0),
			step,
		}
	}

	pub fn advance(&self, ms: f64) {
		self.now.set(self.now.get() + ms);
	}
}

impl Clock for ManualClock {
	fn now_ms(&self) -> f64 {
		let now = self.now.get();
		self.now.set(now + self.step);
		now
	}
}
