//! Token endpoint configuration and assertion audience resolution.

// self
use crate::_prelude::*;

/// Errors raised while validating endpoint configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum EndpointError {
	/// Token exchanges carry signed credentials and must use HTTPS.
	#[error("The token endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Endpoint URL that failed validation.
		url: String,
	},
}

/// Validated token endpoint plus the audience expected in client assertions.
///
/// Authorization servers compare the assertion `aud` claim byte for byte, so
/// the audience defaults to the exact serialization of the endpoint URL. The
/// [`with_audience`](Self::with_audience) override covers servers that sit behind a
/// gateway and advertise a canonical audience different from the URL clients
/// actually post to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEndpoint {
	url: Url,
	audience: Option<String>,
}
impl TokenEndpoint {
	/// Creates a validated endpoint from an HTTPS URL.
	pub fn new(url: Url) -> Result<Self, EndpointError> {
		if url.scheme() != "https" {
			return Err(EndpointError::InsecureEndpoint { url: url.to_string() });
		}

		Ok(Self { url, audience: None })
	}

	/// Overrides the audience value stamped into assertions.
	pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
		self.audience = Some(audience.into());

		self
	}

	/// URL token requests are posted to.
	pub fn url(&self) -> &Url {
		&self.url
	}

	/// Audience for the assertion `aud` claim.
	pub fn audience(&self) -> &str {
		self.audience.as_deref().unwrap_or_else(|| self.url.as_str())
	}
}
