//! Shared helpers for the acquisition flow (request state, freshness checks, guards).

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ScopeSet},
	flows::Broker,
	http::TokenHttpClient,
	store::StoreKey,
};

/// Request parameters evaluated against cached records before contacting the
/// token endpoint.
#[derive(Clone, Debug)]
pub struct TokenRequest {
	/// Normalized scope set for the request.
	pub scope: ScopeSet,
	/// Forces cache bypass when true.
	pub force: bool,
	/// Buffer subtracted from the cached expiry when judging freshness.
	pub safety_buffer: Duration,
}
impl TokenRequest {
	const DEFAULT_SAFETY_BUFFER: Duration = Duration::seconds(300);

	/// Creates a new request for the provided scope set.
	pub fn new(scope: ScopeSet) -> Self {
		Self { scope, force: false, safety_buffer: Self::DEFAULT_SAFETY_BUFFER }
	}

	/// Forces the broker to bypass cache checks.
	pub fn force_refresh(mut self) -> Self {
		self.force = true;

		self
	}

	/// Overrides the force flag.
	pub fn with_force(mut self, force: bool) -> Self {
		self.force = force;

		self
	}

	/// Overrides the freshness safety buffer (defaults to 300 seconds).
	pub fn with_safety_buffer(mut self, buffer: Duration) -> Self {
		self.safety_buffer = if buffer.is_negative() { Duration::ZERO } else { buffer };

		self
	}

	/// Determines whether the cached record must be replaced.
	///
	/// The check is deterministic so a record flips from fresh to stale at the
	/// same instant for every caller.
	pub fn should_refresh(&self, record: &AccessToken, now: OffsetDateTime) -> bool {
		self.force || record.needs_refresh_at(now, self.safety_buffer)
	}
}

/// Returns (and creates on demand) the singleflight guard for a store key.
pub(crate) fn flow_guard<C>(broker: &Broker<C>, key: &StoreKey) -> Arc<AsyncMutex<()>>
where
	C: ?Sized + TokenHttpClient,
{
	let mut guards = broker.flow_guards.lock();

	guards.entry(key.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;

	// self
	use super::*;

	fn record_expiring_at(expires_at: OffsetDateTime) -> AccessToken {
		AccessToken::builder(ScopeSet::default())
			.access_token("secret")
			.expires_at(expires_at)
			.build()
			.expect("Failed to build test record.")
	}

	#[test]
	fn freshness_boundary_is_exact() {
		let record = record_expiring_at(datetime!(2026-01-01 01:00 UTC));
		let request = TokenRequest::new(ScopeSet::default());

		// Stale exactly when `now` reaches `expires_at - safety_buffer`.
		assert!(!request.should_refresh(&record, datetime!(2026-01-01 00:54:59 UTC)));
		assert!(request.should_refresh(&record, datetime!(2026-01-01 00:55:00 UTC)));
	}

	#[test]
	fn expired_records_always_refresh() {
		// Issued 3700 seconds before `now` with a 3600 second lifetime.
		let record = AccessToken::builder(ScopeSet::default())
			.access_token("secret")
			.issued_at(datetime!(2026-01-01 00:00 UTC))
			.expires_in(Duration::seconds(3_600))
			.build()
			.expect("Failed to build test record.");
		let request = TokenRequest::new(ScopeSet::default());

		assert!(request.should_refresh(&record, datetime!(2026-01-01 01:01:40 UTC)));
	}

	#[test]
	fn force_overrides_a_fresh_record() {
		let record = record_expiring_at(datetime!(2026-01-01 01:00 UTC));
		let request = TokenRequest::new(ScopeSet::default()).force_refresh();

		assert!(request.should_refresh(&record, datetime!(2026-01-01 00:00 UTC)));
	}

	#[test]
	fn negative_safety_buffer_clamps_to_zero() {
		let record = record_expiring_at(datetime!(2026-01-01 01:00 UTC));
		let request = TokenRequest::new(ScopeSet::default()).with_safety_buffer(Duration::seconds(-5));

		assert_eq!(request.safety_buffer, Duration::ZERO);
		assert!(!request.should_refresh(&record, datetime!(2026-01-01 00:59:59 UTC)));
		assert!(request.should_refresh(&record, datetime!(2026-01-01 01:00:00 UTC)));
	}
}
