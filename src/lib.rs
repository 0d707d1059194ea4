//! JWT-bearer OAuth 2.0 token lifecycle for backend services - signed RS384 assertions, cached
//! access tokens, and retry-aware refresh orchestration in one crate.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod assertion;
pub mod auth;
pub mod endpoint;
pub mod error;
pub mod exchange;
pub mod flows;
pub mod http;
pub mod jwks;
pub mod obs;
pub mod retry;
pub mod store;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::{ClientId, ClientIdentity, KeyId},
		endpoint::TokenEndpoint,
		flows::Broker,
		http::ReqwestHttpClient,
		store::{MemoryStore, TokenStore},
	};

	/// Broker type alias used by reqwest-backed integration tests.
	pub type ReqwestTestBroker = Broker<ReqwestHttpClient>;

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Client identity backed by the checked-in RSA test key.
	pub fn test_identity() -> ClientIdentity {
		ClientIdentity::new(
			ClientId::new("test-client").expect("Failed to build test client id."),
			KeyId::new("key-1").expect("Failed to build test key id."),
			include_str!("../tests/fixtures/rsa2048.pem"),
		)
		.expect("Failed to parse the checked-in RSA test key.")
	}

	/// Constructs a [`Broker`] backed by an in-memory store, the checked-in test identity, and
	/// the insecure reqwest transport used across integration tests.
	pub fn build_reqwest_test_broker(
		endpoint: TokenEndpoint,
	) -> (ReqwestTestBroker, Arc<MemoryStore>) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn TokenStore> = store_backend.clone();
		let http_client = test_reqwest_http_client();
		let broker = Broker::with_http_client(store, test_identity(), endpoint, http_client);

		(broker, store_backend)
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		hash::{Hash, Hasher},
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use jsonwebtoken;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
