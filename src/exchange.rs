//! Token request construction and response classification.
//!
//! Every exchange posts the same four-field form defined by RFC 7523 for
//! JWT-bearer client authentication and funnels the raw response through one
//! classifier, so retry decisions stay consistent no matter which transport
//! produced the response.

// self
use crate::{
	_prelude::*,
	assertion::SignedAssertion,
	auth::{AccessToken, ScopeSet},
	error::{ConfigError, TransientError},
	http::TokenEndpointResponse,
};

/// Grant type posted on every exchange.
pub const GRANT_TYPE: &str = "client_credentials";
/// Client assertion type URI defined by RFC 7523.
pub const CLIENT_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";
/// Expiry assumed when the token response omits `expires_in`.
pub const DEFAULT_EXPIRES_IN: Duration = Duration::seconds(3_600);

/// Successful token response wire format. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
struct TokenEndpointReply {
	access_token: String,
	#[serde(default)]
	token_type: Option<String>,
	#[serde(default)]
	expires_in: Option<i64>,
}

/// OAuth error body (RFC 6749 section 5.2). Parsed leniently since error
/// payloads in the wild are frequently HTML or empty.
#[derive(Debug, Default, Deserialize)]
struct OAuthErrorBody {
	#[serde(default)]
	error: Option<String>,
	#[serde(default)]
	error_description: Option<String>,
}

/// Builds the form body for a JWT-bearer client-credentials exchange.
///
/// The `scope` parameter is omitted entirely when the requested set is empty,
/// letting the server fall back to the scopes registered for the client.
pub fn build_token_request_form(
	assertion: &SignedAssertion,
	scope: &ScopeSet,
) -> Vec<(&'static str, String)> {
	let mut form = vec![
		("grant_type", GRANT_TYPE.to_owned()),
		("client_assertion_type", CLIENT_ASSERTION_TYPE.to_owned()),
		("client_assertion", assertion.jwt.expose().to_owned()),
	];

	if !scope.is_empty() {
		form.push(("scope", scope.normalized()));
	}

	form
}

/// Classifies a raw token endpoint response against the current UTC instant.
pub fn classify_response(
	response: TokenEndpointResponse,
	requested_scope: &ScopeSet,
) -> Result<AccessToken> {
	classify_response_at(response, requested_scope, OffsetDateTime::now_utc())
}

/// Classifies a raw token endpoint response into a token record or an error.
///
/// Success statuses must carry a usable JSON body. Ambiguous statuses lean
/// retryable: 429 and every 5xx map to [`TransientError`], while the
/// remaining 4xx statuses mean the assertion or client registration was
/// rejected and a retry with a fresh assertion cannot succeed. The record is
/// stamped with the scope that was *requested*, since servers may expand
/// wildcard scopes in their responses.
pub fn classify_response_at(
	response: TokenEndpointResponse,
	requested_scope: &ScopeSet,
	now: OffsetDateTime,
) -> Result<AccessToken> {
	match response.status {
		200..=299 => parse_success(response, requested_scope, now),
		429 => {
			let message = match oauth_error_fragment(&response.body) {
				Some(fragment) => format!("throttled, server reported {fragment}"),
				None => "throttled".into(),
			};

			Err(TransientError::TokenEndpoint {
				message,
				status: Some(response.status),
				retry_after: response.retry_after,
			}
			.into())
		},
		400..=499 => Err(Error::AuthRejected {
			reason: rejection_reason(&response.body, response.status),
			status: Some(response.status),
		}),
		500..=599 => {
			let message = match oauth_error_fragment(&response.body) {
				Some(fragment) => format!("server reported {fragment}"),
				None => format!("HTTP {}", response.status),
			};

			Err(TransientError::TokenEndpoint {
				message,
				status: Some(response.status),
				retry_after: response.retry_after,
			}
			.into())
		},
		other => Err(TransientError::TokenEndpoint {
			message: format!("unexpected HTTP {other}"),
			status: Some(other),
			retry_after: response.retry_after,
		}
		.into()),
	}
}

fn parse_success(
	response: TokenEndpointResponse,
	requested_scope: &ScopeSet,
	now: OffsetDateTime,
) -> Result<AccessToken> {
	let mut deserializer = serde_json::Deserializer::from_slice(&response.body);
	let reply: TokenEndpointReply =
		serde_path_to_error::deserialize(&mut deserializer).map_err(|source| {
			Error::MalformedResponse {
				reason: format!("body is not a valid token response at `{}`", source.path()),
				status: Some(response.status),
				source: Some(source),
			}
		})?;

	if reply.access_token.is_empty() {
		return Err(Error::MalformedResponse {
			reason: "access_token is empty".into(),
			status: Some(response.status),
			source: None,
		});
	}

	let expires_in = match reply.expires_in {
		Some(seconds) if seconds <= 0 =>
			return Err(Error::MalformedResponse {
				reason: format!("expires_in is not positive ({seconds})"),
				status: Some(response.status),
				source: None,
			}),
		Some(seconds) => Duration::seconds(seconds),
		None => DEFAULT_EXPIRES_IN,
	};
	let mut builder = AccessToken::builder(requested_scope.clone())
		.access_token(reply.access_token)
		.issued_at(now)
		.expires_in(expires_in);

	if let Some(token_type) = reply.token_type {
		builder = builder.token_type(token_type);
	}

	builder.build().map_err(|err| ConfigError::from(err).into())
}

/// Renders `error`/`error_description` from an OAuth error body, if present.
fn oauth_error_fragment(body: &[u8]) -> Option<String> {
	let parsed: OAuthErrorBody = serde_json::from_slice(body).unwrap_or_default();
	let error = parsed.error?;

	Some(match parsed.error_description {
		Some(description) => format!("{error}: {description}"),
		None => error,
	})
}

fn rejection_reason(body: &[u8], status: u16) -> String {
	let parsed: OAuthErrorBody = serde_json::from_slice(body).unwrap_or_default();

	match parsed.error {
		Some(error) => {
			let mut reason = match parsed.error_description {
				Some(description) => format!("server reported {error}: {description}"),
				None => format!("server reported {error}"),
			};

			// Key uploads propagate slowly on some servers; the hint saves a
			// debugging session for the most common cause.
			if error == "invalid_client" {
				reason.push_str("; newly registered signing keys may still be propagating");
			}

			reason
		},
		None => format!("HTTP {status} with no OAuth error body"),
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::{
		assertion::{AssertionSigner, claims::ASSERTION_TTL},
		auth::{ClientId, ClientIdentity, KeyId, TokenSecret},
		endpoint::TokenEndpoint,
		error::TransportError,
	};

	const TEST_KEY_PEM: &str = include_str!("../tests/fixtures/rsa2048.pem");

	fn scope_fixture() -> ScopeSet {
		ScopeSet::new(["system/Patient.read"]).expect("Scope fixture should be valid.")
	}

	fn signed_assertion() -> SignedAssertion {
		let identity = ClientIdentity::new(
			ClientId::new("test-client").expect("Client id fixture should be valid."),
			KeyId::new("key-1").expect("Key id fixture should be valid."),
			TEST_KEY_PEM,
		)
		.expect("Fixture key should parse into an identity.");
		let endpoint = TokenEndpoint::new(
			Url::parse("https://auth.example.org/oauth2/token")
				.expect("Endpoint URL fixture should parse."),
		)
		.expect("HTTPS endpoint should validate.");

		AssertionSigner::new(identity, &endpoint)
			.sign()
			.expect("Signing with the fixture key should succeed.")
	}

	fn response(status: u16, body: &str) -> TokenEndpointResponse {
		TokenEndpointResponse { status, retry_after: None, body: body.as_bytes().to_vec() }
	}

	#[test]
	fn form_carries_the_jwt_bearer_fields() {
		let assertion = signed_assertion();
		let form = build_token_request_form(&assertion, &scope_fixture());

		assert_eq!(form.len(), 4);
		assert_eq!(form[0], ("grant_type", "client_credentials".to_owned()));
		assert_eq!(
			form[1],
			(
				"client_assertion_type",
				"urn:ietf:params:oauth:client-assertion-type:jwt-bearer".to_owned()
			),
		);
		assert_eq!(form[2].1, assertion.jwt.expose());
		assert_eq!(form[3], ("scope", "system/Patient.read".to_owned()));
	}

	#[test]
	fn empty_scope_set_omits_the_parameter() {
		let assertion = signed_assertion();
		let form = build_token_request_form(&assertion, &ScopeSet::default());

		assert_eq!(form.len(), 3);
		assert!(form.iter().all(|(key, _)| *key != "scope"));
	}

	#[test]
	fn success_reply_builds_a_record() {
		let now = macros::datetime!(2025-03-01 09:00 UTC);
		let body = r#"{"access_token":"abc123","token_type":"bearer","expires_in":3600,"scope":"system/Patient.read system/Observation.read"}"#;
		let record = classify_response_at(response(200, body), &scope_fixture(), now)
			.expect("Well-formed success reply should classify into a record.");

		assert_eq!(record.access_token, TokenSecret::new("abc123"));
		assert_eq!(record.token_type, "bearer");
		assert_eq!(record.issued_at, now);
		assert_eq!(record.expires_at, now + Duration::seconds(3_600));
		assert_eq!(record.scope, scope_fixture(), "Requested scope wins over the server echo.");
	}

	#[test]
	fn success_reply_defaults_expiry_and_type() {
		let now = macros::datetime!(2025-03-01 09:00 UTC);
		let record =
			classify_response_at(response(200, r#"{"access_token":"abc123"}"#), &scope_fixture(), now)
				.expect("Minimal success reply should classify into a record.");

		assert_eq!(record.token_type, "Bearer");
		assert_eq!(record.expires_at, now + DEFAULT_EXPIRES_IN);
	}

	#[test]
	fn malformed_success_bodies_are_terminal() {
		let scope = scope_fixture();
		let not_json = classify_response(response(200, "<html>login</html>"), &scope)
			.expect_err("Non-JSON success body must be malformed.");

		assert!(matches!(not_json, Error::MalformedResponse { status: Some(200), .. }));
		assert!(!not_json.is_retryable());

		let missing_token = classify_response(response(200, r#"{"token_type":"Bearer"}"#), &scope)
			.expect_err("Missing access_token must be malformed.");

		assert!(missing_token.to_string().contains("access_token"));

		let empty_token = classify_response(response(200, r#"{"access_token":""}"#), &scope)
			.expect_err("Empty access_token must be malformed.");

		assert!(matches!(empty_token, Error::MalformedResponse { .. }));

		let stale = classify_response(
			response(200, r#"{"access_token":"abc123","expires_in":0}"#),
			&scope,
		)
		.expect_err("Non-positive expires_in must be malformed.");

		assert!(stale.to_string().contains("expires_in"));
	}

	#[test]
	fn client_rejections_are_terminal_and_explained() {
		let scope = scope_fixture();
		let body = r#"{"error":"invalid_client","error_description":"client authentication failed"}"#;
		let err = classify_response(response(400, body), &scope)
			.expect_err("OAuth 400 must classify as a rejection.");

		assert!(!err.is_retryable());

		let Error::AuthRejected { reason, status } = err else {
			panic!("Expected an AuthRejected classification.");
		};

		assert_eq!(status, Some(400));
		assert!(reason.contains("invalid_client: client authentication failed"));
		assert!(reason.contains("propagating"), "invalid_client should carry the key hint.");

		let bare = classify_response(response(401, ""), &scope)
			.expect_err("Bodyless 401 must classify as a rejection.");

		assert!(bare.to_string().contains("HTTP 401"));
	}

	#[test]
	fn throttling_is_retryable_with_the_server_hint() {
		let scope = scope_fixture();
		let throttled = TokenEndpointResponse {
			status: 429,
			retry_after: Some(Duration::seconds(12)),
			body: Vec::new(),
		};
		let err = classify_response(throttled, &scope)
			.expect_err("HTTP 429 must classify as transient.");

		assert!(err.is_retryable());
		assert_eq!(err.retry_after_hint(), Some(Duration::seconds(12)));
	}

	#[test]
	fn server_failures_and_odd_statuses_are_retryable() {
		let scope = scope_fixture();
		let outage = classify_response(
			response(503, r#"{"error":"temporarily_unavailable"}"#),
			&scope,
		)
		.expect_err("HTTP 503 must classify as transient.");

		assert!(outage.is_retryable());
		assert!(outage.to_string().contains("temporarily_unavailable"));

		let redirect = classify_response(response(303, ""), &scope)
			.expect_err("HTTP 303 must classify as transient.");

		assert!(redirect.is_retryable());
		assert!(redirect.to_string().contains("unexpected HTTP 303"));
	}

	#[test]
	fn transport_errors_never_reach_classification() {
		// The classifier only sees responses with a status; transports raise
		// their own error type, which stays retryable at the broker level.
		let transport: Error = TransportError::network(std::io::Error::other("refused")).into();

		assert!(transport.is_retryable());
	}

	#[test]
	fn assertion_ttl_matches_the_window_servers_enforce() {
		assert_eq!(ASSERTION_TTL, Duration::minutes(5));
	}
}
