//! Broker-level error types shared across signing, exchange, and storage.

// self
use crate::_prelude::*;

/// Broker-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical broker error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem; the caller must fix their setup.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Cryptographic signing failure while building the client assertion.
	#[error(transparent)]
	Signing(#[from] SigningError),
	/// Temporary upstream failure; retry with backoff.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Authorization server rejected the client assertion (HTTP 4xx).
	///
	/// A fresh assertion with the same key would be rejected too, so this is never
	/// retried. A common cause is signing-key propagation delay, which can take up
	/// to an hour in sandbox environments and up to twelve hours in production.
	#[error("Authorization server rejected the client assertion: {reason}.")]
	AuthRejected {
		/// Server- or broker-supplied reason string.
		reason: String,
		/// HTTP status code returned by the token endpoint, when available.
		status: Option<u16>,
	},
	/// Token endpoint returned a success status with an unusable body.
	#[error("Token endpoint returned a malformed response: {reason}.")]
	MalformedResponse {
		/// Summary of what made the body unusable.
		reason: String,
		/// HTTP status code returned by the token endpoint, when available.
		status: Option<u16>,
		/// Structured parsing failure, when the body failed JSON decoding.
		#[source]
		source: Option<serde_path_to_error::Error<serde_json::error::Error>>,
	},
	/// Every permitted exchange attempt failed; carries the final cause.
	#[error("Token acquisition failed after {attempts} attempt(s).")]
	TokenAcquisitionFailed {
		/// Number of exchange attempts performed before giving up.
		attempts: u32,
		/// Error raised by the final attempt.
		#[source]
		source: Box<Error>,
	},
}
impl Error {
	/// Returns `true` when the orchestrator may retry the failed exchange.
	///
	/// Only transient endpoint failures (5xx, 429, unexpected statuses) and
	/// transport failures qualify; rejections and malformed bodies never do.
	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::Transient(_) | Self::Transport(_))
	}

	/// Returns the server's `Retry-After` hint attached to a transient failure.
	pub fn retry_after_hint(&self) -> Option<Duration> {
		match self {
			Self::Transient(TransientError::TokenEndpoint { retry_after, .. }) => *retry_after,
			_ => None,
		}
	}
}

/// Configuration and validation failures raised by the broker.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Private key material is missing or empty.
	#[error("Private key material is empty.")]
	MissingPrivateKey,
	/// Private key PEM could not be parsed as an RSA signing key.
	#[error("Private key is not a valid RSA PEM.")]
	InvalidPrivateKey {
		/// Underlying key parsing failure.
		#[source]
		source: jsonwebtoken::errors::Error,
	},
	/// Public key parameters could not be derived from the private key PEM.
	#[error("Public key parameters could not be derived from the private key PEM.")]
	PublicKeyExtraction {
		/// Underlying RSA decoding failure.
		#[source]
		source: BoxError,
	},
	/// Client or key identifier failed validation.
	#[error("Invalid identifier.")]
	InvalidIdentifier(#[from] crate::auth::IdentifierError),
	/// Token endpoint configuration failed validation.
	#[error("Invalid token endpoint configuration.")]
	InvalidEndpoint(#[from] crate::endpoint::EndpointError),
	/// Request scopes cannot be normalized.
	#[error("Requested scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
	/// Access token builder validation failed.
	#[error("Unable to build access token record.")]
	TokenBuild(#[from] crate::auth::AccessTokenBuilderError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for ConfigError {
	fn from(e: reqwest::Error) -> Self {
		Self::http_client_build(e)
	}
}

/// Cryptographic failures raised while producing signed assertions.
#[derive(Debug, ThisError)]
pub enum SigningError {
	/// The JWS signing operation itself failed.
	#[error("The client assertion could not be signed.")]
	Sign {
		/// Underlying signing failure.
		#[source]
		source: jsonwebtoken::errors::Error,
	},
}

/// Temporary failure variants (safe to retry).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Token endpoint returned an unexpected but non-fatal response.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	TokenEndpoint {
		/// Server- or broker-supplied message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the token endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the token endpoint.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
