//! Demonstrates registering a custom HTTP transport that emits scripted responses.
//!
//! 1. Implement [`TokenHttpClient`] so the transport posts the assertion form however your
//!    stack likes and hands back raw [`TokenEndpointResponse`]s.
//! 2. Pass the implementation to [`Broker::with_http_client`].
//! 3. Classification still happens inside the broker, so throttled and rejected responses map
//!    to the same error variants the bundled reqwest transport produces.

// std
use std::{
	collections::VecDeque,
	fmt::{Display, Formatter, Result as FmtResult},
	sync::Arc,
};
// crates.io
use color_eyre::Result;
use parking_lot::Mutex;
use time::Duration;
use url::Url;
// self
use jwt_bearer_broker::{
	auth::{ClientId, ClientIdentity, KeyId, ScopeSet},
	endpoint::TokenEndpoint,
	error::TransportError,
	flows::{Broker, TokenRequest},
	http::{HttpFuture, TokenEndpointResponse, TokenHttpClient},
	retry::RetryPolicy,
	store::{MemoryStore, TokenStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let identity = ClientIdentity::new(
		ClientId::new("demo-client")?,
		KeyId::new("demo-key-1")?,
		include_str!("../tests/fixtures/rsa2048.pem"),
	)?;
	let endpoint = TokenEndpoint::new(Url::parse("https://auth.example.org/oauth2/token")?)?;
	let transport = ScriptedTransport::replying([
		ScriptedReply::Offline,
		ScriptedReply::Status(TokenEndpointResponse {
			status: 503,
			retry_after: Some(Duration::milliseconds(50)),
			body: b"try later".to_vec(),
		}),
		ScriptedReply::Status(TokenEndpointResponse {
			status: 200,
			retry_after: None,
			body: br#"{"access_token":"scripted-access","token_type":"Bearer","expires_in":900}"#
				.to_vec(),
		}),
	]);
	let store: Arc<dyn TokenStore> = Arc::new(MemoryStore::default());
	let broker: Broker<ScriptedTransport> =
		Broker::with_http_client(store, identity, endpoint, Arc::new(transport)).with_retry_policy(
			RetryPolicy {
				base_delay: Duration::milliseconds(20),
				..RetryPolicy::default()
			},
		);
	let request = TokenRequest::new(ScopeSet::new(["system/Patient.read"])?);
	let record = broker.get_valid_token(request).await?;

	println!("Access token issued by the scripted transport: {}.", record.access_token.expose());
	println!(
		"The broker retried {} time(s) before the endpoint recovered.",
		broker.acquire_metrics.retries()
	);

	Ok(())
}

/// Transport that pops one scripted reply per exchange attempt.
struct ScriptedTransport {
	replies: Mutex<VecDeque<ScriptedReply>>,
}
impl ScriptedTransport {
	fn replying(replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
		Self { replies: Mutex::new(replies.into_iter().collect()) }
	}
}
impl TokenHttpClient for ScriptedTransport {
	fn post_form<'a>(
		&'a self,
		_url: &'a Url,
		form: &'a [(&'static str, String)],
	) -> HttpFuture<'a> {
		println!(
			"Scripted transport received fields: {}.",
			form.iter().map(|(key, _)| *key).collect::<Vec<_>>().join(", ")
		);

		let reply = self.replies.lock().pop_front();

		Box::pin(async move {
			match reply {
				Some(ScriptedReply::Status(response)) => Ok(response),
				Some(ScriptedReply::Offline) | None => Err(TransportError::network(ScriptEnded)),
			}
		})
	}
}

enum ScriptedReply {
	/// Respond with a canned HTTP status and body.
	Status(TokenEndpointResponse),
	/// Fail as if the endpoint were unreachable.
	Offline,
}

#[derive(Debug)]
struct ScriptEnded;
impl Display for ScriptEnded {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("scripted transport has no replies left")
	}
}
impl std::error::Error for ScriptEnded {}
