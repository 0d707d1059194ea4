//! Storage contracts and built-in cache implementations for access tokens.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ClientId, ScopeSet},
};

/// Boxed future returned by [`TokenStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Cache backend contract for acquired access tokens.
///
/// Tokens are keyed by client id plus requested-scope fingerprint, so distinct
/// scope sets never share a cache slot. Implementations only need
/// last-writer-wins semantics; the broker serializes writers per key before
/// calling in.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Persists or replaces the token cached for the client + scope pair.
	fn save<'a>(&'a self, client_id: &'a ClientId, record: AccessToken) -> StoreFuture<'a, ()>;

	/// Fetches the token cached for the client + scope pair, if present.
	fn fetch<'a>(
		&'a self,
		client_id: &'a ClientId,
		scope: &'a ScopeSet,
	) -> StoreFuture<'a, Option<AccessToken>>;
}

/// Error type produced by [`TokenStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Unique key identifying a cached token.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreKey {
	/// Owning client identifier.
	pub client_id: ClientId,
	/// Scope fingerprint used for partitioning.
	pub scope_fingerprint: String,
}
impl StoreKey {
	/// Builds a key from the client id and the requested scope set.
	pub fn new(client_id: &ClientId, scope: &ScopeSet) -> Self {
		Self { client_id: client_id.clone(), scope_fingerprint: scope.fingerprint() }
	}
}
