//! Thread-safe in-memory [`TokenStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ClientId, ScopeSet},
	store::{StoreError, StoreFuture, StoreKey, TokenStore},
};

type StoreMap = Arc<RwLock<HashMap<StoreKey, AccessToken>>>;

/// Thread-safe cache backend that keeps tokens in-process for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	fn save_now(map: StoreMap, client_id: &ClientId, record: AccessToken) -> Result<(), StoreError> {
		let key = StoreKey::new(client_id, &record.scope);

		map.write().insert(key, record);

		Ok(())
	}

	fn fetch_now(map: StoreMap, client_id: &ClientId, scope: &ScopeSet) -> Option<AccessToken> {
		let key = StoreKey::new(client_id, scope);

		map.read().get(&key).cloned()
	}
}
impl TokenStore for MemoryStore {
	fn save<'a>(&'a self, client_id: &'a ClientId, record: AccessToken) -> StoreFuture<'a, ()> {
		let map = self.0.clone();

		Box::pin(async move { Self::save_now(map, client_id, record) })
	}

	fn fetch<'a>(
		&'a self,
		client_id: &'a ClientId,
		scope: &'a ScopeSet,
	) -> StoreFuture<'a, Option<AccessToken>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::fetch_now(map, client_id, scope)) })
	}
}
