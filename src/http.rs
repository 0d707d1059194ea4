//! Transport primitives for token endpoint exchanges.
//!
//! The module exposes [`TokenHttpClient`] as the broker's only dependency on
//! an HTTP stack. Transports post a form and hand back the raw status, body,
//! and `Retry-After` hint as a [`TokenEndpointResponse`]; they never interpret
//! the payload. Status classification and JSON parsing live in the exchange
//! layer so custom transports cannot drift from the bundled behavior.

// std
use std::ops::Deref;
// crates.io
#[cfg(feature = "reqwest")] use reqwest::header::{ACCEPT, HeaderMap, RETRY_AFTER};
#[cfg(feature = "reqwest")] use time::format_description::well_known::Rfc2822;
// self
use crate::{_prelude::*, error::TransportError};

/// Per-request timeout applied by the bundled reqwest transport.
#[cfg(feature = "reqwest")]
pub const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Boxed future returned by [`TokenHttpClient::post_form`].
pub type HttpFuture<'a> =
	Pin<Box<dyn Future<Output = Result<TokenEndpointResponse, TransportError>> + 'a + Send>>;

/// Raw token endpoint response handed back to the exchange layer.
#[derive(Clone, Debug, Default)]
pub struct TokenEndpointResponse {
	/// HTTP status code returned by the token endpoint.
	pub status: u16,
	/// Retry-After hint expressed as a relative duration.
	pub retry_after: Option<Duration>,
	/// Raw response body bytes.
	pub body: Vec<u8>,
}

/// Abstraction over HTTP transports capable of posting token requests.
///
/// Callers provide an implementation (typically behind `Arc<T>` where
/// `T: TokenHttpClient`) and the broker shares it across every exchange
/// attempt. Implementations must be `Send + Sync + 'static` so they can be
/// shared across broker instances without additional wrappers, and the
/// futures they return must be `Send` so the broker's boxed flows inherit the
/// same guarantee.
pub trait TokenHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Posts `form` to `url` as `application/x-www-form-urlencoded`.
	///
	/// Every HTTP status, including errors, must surface as a
	/// [`TokenEndpointResponse`]; [`TransportError`] is reserved for failures
	/// where no status was obtained (DNS, TCP, TLS, timeout).
	fn post_form<'a>(&'a self, url: &'a Url, form: &'a [(&'static str, String)])
	-> HttpFuture<'a>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one
/// place. Token requests should not follow redirects, matching OAuth 2.0
/// guidance that token endpoints return results directly instead of
/// delegating to another URI; configure any custom [`ReqwestClient`]
/// accordingly. Each request carries a [`REQUEST_TIMEOUT`] deadline and an
/// `Accept: application/json` header.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl TokenHttpClient for ReqwestHttpClient {
	fn post_form<'a>(
		&'a self,
		url: &'a Url,
		form: &'a [(&'static str, String)],
	) -> HttpFuture<'a> {
		let request = self
			.0
			.post(url.clone())
			.timeout(REQUEST_TIMEOUT)
			.header(ACCEPT, "application/json")
			.form(form);

		Box::pin(async move {
			let response = request.send().await.map_err(TransportError::from)?;
			let status = response.status().as_u16();
			let retry_after = parse_retry_after(response.headers());
			let body = response.bytes().await.map_err(TransportError::from)?.to_vec();

			Ok(TokenEndpointResponse { status, retry_after, body })
		})
	}
}

#[cfg(feature = "reqwest")]
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(Duration::seconds(secs as i64));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// crates.io
	use reqwest::header::HeaderValue;
	// self
	use super::*;

	#[test]
	fn retry_after_parses_delta_seconds() {
		let mut headers = HeaderMap::new();

		headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));

		assert_eq!(parse_retry_after(&headers), Some(Duration::seconds(7)));
	}

	#[test]
	fn retry_after_parses_http_dates() {
		let mut headers = HeaderMap::new();

		headers.insert(RETRY_AFTER, HeaderValue::from_static("Fri, 01 Jan 2100 00:00:00 +0000"));

		let parsed = parse_retry_after(&headers).expect("Future date should yield a hint.");

		assert!(parsed > Duration::days(365));
	}

	#[test]
	fn retry_after_ignores_garbage_and_past_dates() {
		let mut headers = HeaderMap::new();

		headers.insert(RETRY_AFTER, HeaderValue::from_static("soon"));

		assert_eq!(parse_retry_after(&headers), None);

		headers.insert(RETRY_AFTER, HeaderValue::from_static("Sat, 01 Jan 2000 00:00:00 +0000"));

		assert_eq!(parse_retry_after(&headers), None);
	}
}
