//! Claim set carried by JWT-bearer client assertions.

// self
use crate::_prelude::*;

/// Assertion lifetime. Servers commonly reject `exp` values more than five
/// minutes out, so the expiry is pinned to exactly that window.
pub const ASSERTION_TTL: Duration = Duration::seconds(300);
/// Upper bound some authorization servers place on `jti` length.
pub const JTI_MAX_LEN: usize = 151;

/// Registered claims for a JWT-bearer client assertion.
///
/// The client authenticates as itself, so `iss` and `sub` both carry the
/// client identifier. `aud` must match the value the authorization server
/// compares against byte for byte. Timestamps are UNIX seconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
	/// Issuer, the registered client id.
	pub iss: String,
	/// Subject, identical to `iss` for client self-assertions.
	pub sub: String,
	/// Audience the assertion is scoped to.
	pub aud: String,
	/// Unique assertion identifier used for server-side replay detection.
	pub jti: String,
	/// Issued-at instant in UNIX seconds.
	pub iat: i64,
	/// Not-before instant, equal to `iat`.
	pub nbf: i64,
	/// Expiry instant, `iat` plus [`ASSERTION_TTL`].
	pub exp: i64,
}
