//! Token acquisition flow built around the broker facade.

pub mod acquire;
pub mod common;

pub use acquire::*;
pub use common::*;

// self
use crate::{
	_prelude::*,
	assertion::AssertionSigner,
	auth::ClientIdentity,
	endpoint::TokenEndpoint,
	http::TokenHttpClient,
	retry::RetryPolicy,
	store::{StoreKey, TokenStore},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

#[cfg(feature = "reqwest")]
/// Broker specialized for the crate's default reqwest transport.
pub type ReqwestBroker = Broker<ReqwestHttpClient>;

/// Coordinates assertion signing, token exchange, caching and retries for one
/// client identity against one token endpoint.
///
/// The broker owns the HTTP client, token store, signer and retry policy so the
/// acquisition flow can focus on orchestration. Clones share the underlying
/// store, transport and flight guards, so concurrent holders still deduplicate
/// in-flight acquisitions.
#[derive(Clone)]
pub struct Broker<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// HTTP client wrapper used for every token endpoint request.
	pub http_client: Arc<C>,
	/// Token store implementation that caches acquired tokens.
	pub store: Arc<dyn TokenStore>,
	/// Validated token endpoint the broker exchanges assertions against.
	pub endpoint: TokenEndpoint,
	/// Signer producing a fresh client assertion for every exchange attempt.
	pub signer: AssertionSigner,
	/// Backoff schedule applied to retryable exchange failures.
	pub retry: RetryPolicy,
	/// Shared metrics recorder for acquisition flow outcomes.
	pub acquire_metrics: Arc<AcquireMetrics>,
	flow_guards: Arc<Mutex<HashMap<StoreKey, Arc<AsyncMutex<()>>>>>,
}
impl<C> Broker<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Creates a broker that reuses the caller-provided transport.
	pub fn with_http_client(
		store: Arc<dyn TokenStore>,
		identity: ClientIdentity,
		endpoint: TokenEndpoint,
		http_client: impl Into<Arc<C>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			store,
			signer: AssertionSigner::new(identity, &endpoint),
			endpoint,
			retry: RetryPolicy::default(),
			acquire_metrics: Default::default(),
			flow_guards: Default::default(),
		}
	}

	/// Replaces the default backoff schedule.
	pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
		self.retry = retry;

		self
	}
}
#[cfg(feature = "reqwest")]
impl Broker<ReqwestHttpClient> {
	/// Creates a new broker for the provided identity and token endpoint.
	///
	/// The broker provisions its own reqwest-backed transport so callers do not need
	/// to pass HTTP handles explicitly. Use [`Broker::with_http_client`] to supply a
	/// custom transport instead.
	pub fn new(store: Arc<dyn TokenStore>, identity: ClientIdentity, endpoint: TokenEndpoint) -> Self {
		Self::with_http_client(store, identity, endpoint, ReqwestHttpClient::default())
	}
}
impl<C> Debug for Broker<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Broker")
			.field("client_id", self.signer.identity().client_id())
			.field("endpoint", &self.endpoint)
			.field("retry", &self.retry)
			.finish()
	}
}
