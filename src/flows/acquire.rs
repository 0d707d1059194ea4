//! Token acquisition orchestration with caching, singleflight guards and retries.
//!
//! The broker exposes [`Broker::get_valid_token`] so callers can reuse cached
//! access tokens for a scope set. Each request evaluates the cached record
//! against a deterministic safety buffer and only contacts the token endpoint
//! when the record is missing/stale/forced. A per-`StoreKey` singleflight guard
//! ensures concurrent callers piggy-back on the same in-flight acquisition
//! instead of stampeding the token endpoint. Every exchange attempt signs a
//! fresh assertion, and retryable failures back off exponentially with jitter,
//! honoring `Retry-After` hints up to the policy ceiling.

mod metrics;

pub use metrics::AcquireMetrics;

// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	exchange,
	flows::{
		Broker,
		common::{self, TokenRequest},
	},
	http::TokenHttpClient,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	retry::RetryPolicy,
	store::{StoreKey, TokenStore},
};

impl<C> Broker<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Returns a valid access token for the requested scope, reusing the cache
	/// when the stored record is still outside its safety buffer.
	pub async fn get_valid_token(&self, request: TokenRequest) -> Result<AccessToken> {
		const KIND: FlowKind = FlowKind::Acquire;

		let span = FlowSpan::new(KIND, "get_valid_token");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				self.acquire_metrics.record_attempt();

				let client_id = self.signer.identity().client_id();
				let key = StoreKey::new(client_id, &request.scope);
				let guard = common::flow_guard(self, &key);
				let _singleflight = guard.lock().await;
				let now = OffsetDateTime::now_utc();

				if let Some(current) =
					<dyn TokenStore>::fetch(self.store.as_ref(), client_id, &request.scope)
						.await
						.map_err(Error::from)?
						.filter(|record| !request.should_refresh(record, now))
				{
					self.acquire_metrics.record_cache_hit();
					obs::record_flow_outcome(KIND, FlowOutcome::CacheHit);

					return Ok(current);
				}

				let record = self.exchange_with_retry(&request).await?;

				<dyn TokenStore>::save(self.store.as_ref(), client_id, record.clone())
					.await
					.map_err(Error::from)?;

				Ok(record)
			})
			.await;

		match &result {
			Ok(_) => {
				self.acquire_metrics.record_success();
				obs::record_flow_outcome(KIND, FlowOutcome::Success);
			},
			Err(_) => {
				self.acquire_metrics.record_failure();
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
			},
		}

		result
	}

	/// Runs exchange attempts until one succeeds, a terminal error surfaces, or
	/// the retry budget is exhausted.
	async fn exchange_with_retry(&self, request: &TokenRequest) -> Result<AccessToken> {
		let attempts = self.retry.attempts();
		let mut attempt = 0;

		loop {
			attempt += 1;

			let err = match self.exchange_once(request).await {
				Ok(record) => return Ok(record),
				Err(err) => err,
			};

			if !err.is_retryable() {
				return Err(err);
			}
			if attempt >= attempts {
				return Err(Error::TokenAcquisitionFailed { attempts: attempt, source: err.into() });
			}

			let delay = effective_delay(&self.retry, attempt, err.retry_after_hint());

			self.acquire_metrics.record_retry();
			obs::record_flow_outcome(FlowKind::Acquire, FlowOutcome::Retry);
			tokio::time::sleep(delay.unsigned_abs()).await;
		}
	}

	/// Signs a fresh assertion and performs a single token endpoint exchange.
	async fn exchange_once(&self, request: &TokenRequest) -> Result<AccessToken> {
		let assertion = self.signer.sign()?;
		let form = exchange::build_token_request_form(&assertion, &request.scope);
		let response =
			self.http_client.post_form(self.endpoint.url(), &form).await.map_err(Error::from)?;

		exchange::classify_response(response, &request.scope)
	}
}

/// Picks the backoff delay for a failed attempt, stretching to the server's
/// `Retry-After` hint when it exceeds the computed delay but never past the
/// policy ceiling.
fn effective_delay(policy: &RetryPolicy, attempt: u32, hint: Option<Duration>) -> Duration {
	let computed = policy.delay_for(attempt);

	match hint {
		Some(hinted) if hinted > computed => hinted.min(policy.max_delay),
		_ => computed,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn retry_after_hints_stretch_the_delay() {
		let policy = RetryPolicy::default();

		assert_eq!(effective_delay(&policy, 1, Some(Duration::seconds(12))), Duration::seconds(12));
	}

	#[test]
	fn retry_after_hints_cap_at_the_policy_ceiling() {
		let policy = RetryPolicy::default();

		assert_eq!(effective_delay(&policy, 1, Some(Duration::seconds(900))), Duration::seconds(30));
	}

	#[test]
	fn short_hints_defer_to_the_computed_backoff() {
		let policy = RetryPolicy::default();
		let delay = effective_delay(&policy, 1, Some(Duration::milliseconds(10)));

		assert!(delay >= Duration::seconds(1));
		assert!(delay < Duration::seconds_f64(1.5));
	}
}
