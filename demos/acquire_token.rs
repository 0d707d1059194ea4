//! Demonstrates acquiring and reusing a cached access token with the default reqwest
//! transport and in-memory token store.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use jwt_bearer_broker::{
	auth::{ClientId, ClientIdentity, KeyId, ScopeSet},
	endpoint::TokenEndpoint,
	flows::{Broker, TokenRequest},
	http::ReqwestHttpClient,
	reqwest::Client,
	store::{MemoryStore, TokenStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let store: Arc<dyn TokenStore> = Arc::new(MemoryStore::default());
	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"token_type\":\"Bearer\",\"expires_in\":3600}",
			);
		})
		.await;
	let identity = ClientIdentity::new(
		ClientId::new("demo-client")?,
		KeyId::new("demo-key-1")?,
		include_str!("../tests/fixtures/rsa2048.pem"),
	)?;
	let endpoint = TokenEndpoint::new(Url::parse(&server.url("/token"))?)?;
	let http_client = ReqwestHttpClient::with_client(
		Client::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()?,
	);
	let broker =
		<Broker<ReqwestHttpClient>>::with_http_client(store, identity, endpoint, http_client);
	let request =
		TokenRequest::new(ScopeSet::new(["system/Observation.read", "system/Patient.read"])?);
	let first = broker.get_valid_token(request.clone()).await?;
	let second = broker.get_valid_token(request).await?;

	println!("Bearer header for downstream requests: {}.", first.bearer_header());
	println!(
		"Second call reused the cached token: {}.",
		second.access_token.expose() == first.access_token.expose()
	);
	println!(
		"Acquisition metrics: {} attempt(s), {} cache hit(s).",
		broker.acquire_metrics.attempts(),
		broker.acquire_metrics.cache_hits()
	);

	token_mock.assert_async().await;

	Ok(())
}
