//! Backoff schedule applied to transient exchange failures.

// crates.io
use rand::Rng;
// self
use crate::_prelude::*;

/// Retry schedule for transient token endpoint failures.
///
/// Delays grow exponentially from `base_delay` by `multiplier`, gain a random
/// additive jitter of up to `jitter` times the computed delay, and are capped
/// at `max_delay`. With the defaults (1s doubling, up to 50% jitter) the
/// jittered ranges of consecutive retries never overlap, so observed delays
/// stay strictly increasing until the cap.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
	/// Maximum number of exchange attempts, including the first.
	pub max_attempts: u32,
	/// Delay before the first retry.
	pub base_delay: Duration,
	/// Exponential growth factor between consecutive retries.
	pub multiplier: f64,
	/// Upper bound of the additive jitter, as a fraction of the grown delay.
	pub jitter: f64,
	/// Ceiling applied after growth and jitter.
	pub max_delay: Duration,
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			base_delay: Duration::seconds(1),
			multiplier: 2.,
			jitter: 0.5,
			max_delay: Duration::seconds(30),
		}
	}
}
impl RetryPolicy {
	/// Number of attempts the orchestrator will perform, never below one.
	pub fn attempts(&self) -> u32 {
		self.max_attempts.max(1)
	}

	/// Computes the jittered backoff delay after a failed attempt (1-based).
	pub fn delay_for(&self, attempt: u32) -> Duration {
		self.delay_with(attempt, rand::rng().random::<f64>())
	}

	/// Deterministic core of [`delay_for`](Self::delay_for); `roll` is the jitter draw in `[0, 1)`.
	fn delay_with(&self, attempt: u32, roll: f64) -> Duration {
		let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
		let grown = self.base_delay.as_seconds_f64() * self.multiplier.powi(exponent);
		let jittered = grown * (1. + self.jitter * roll);

		// Cap in float space; large exponents overflow `Duration` otherwise.
		Duration::seconds_f64(jittered.min(self.max_delay.as_seconds_f64()))
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn defaults_are_conservative() {
		let policy = RetryPolicy::default();

		assert_eq!(policy.attempts(), 3);
		assert_eq!(policy.base_delay, Duration::seconds(1));
		assert_eq!(policy.max_delay, Duration::seconds(30));
	}

	#[test]
	fn delays_double_without_jitter() {
		let policy = RetryPolicy::default();

		assert_eq!(policy.delay_with(1, 0.), Duration::seconds(1));
		assert_eq!(policy.delay_with(2, 0.), Duration::seconds(2));
		assert_eq!(policy.delay_with(3, 0.), Duration::seconds(4));
	}

	#[test]
	fn jitter_is_additive_and_bounded() {
		let policy = RetryPolicy::default();

		assert_eq!(policy.delay_with(1, 1.), Duration::seconds_f64(1.5));

		for _ in 0..32 {
			let delay = policy.delay_for(2);

			assert!(delay >= Duration::seconds(2), "Jitter must never shrink the delay.");
			assert!(delay < Duration::seconds(3), "Jitter must stay within 50% of the delay.");
		}
	}

	#[test]
	fn consecutive_delay_ranges_never_overlap() {
		let policy = RetryPolicy::default();

		for attempt in 1..4 {
			assert!(
				policy.delay_with(attempt, 1.) < policy.delay_with(attempt + 1, 0.),
				"Worst-case delay of attempt {attempt} must undercut the next one.",
			);
		}
	}

	#[test]
	fn delays_cap_at_the_maximum() {
		let policy = RetryPolicy::default();

		assert_eq!(policy.delay_with(10, 1.), Duration::seconds(30));
		assert_eq!(policy.delay_with(u32::MAX, 0.5), Duration::seconds(30));
	}

	#[test]
	fn zero_attempts_still_run_once() {
		let policy = RetryPolicy { max_attempts: 0, ..RetryPolicy::default() };

		assert_eq!(policy.attempts(), 1);
	}
}
