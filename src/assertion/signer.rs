//! RS384 assertion signing.

// crates.io
use jsonwebtoken::{Algorithm, Header};
use rand::Rng;
// self
use crate::{
	_prelude::*,
	assertion::claims::{ASSERTION_TTL, AssertionClaims},
	auth::{ClientIdentity, TokenSecret},
	endpoint::TokenEndpoint,
	error::SigningError,
};

/// A freshly signed client assertion plus the metadata callers may log.
///
/// The compact JWT is wrapped in [`TokenSecret`] because an unexpired
/// assertion is a usable credential. The `jti` and instants are safe to log
/// and useful when correlating replay rejections with server-side records.
#[derive(Clone, Debug)]
pub struct SignedAssertion {
	/// Compact JWS serialization posted as `client_assertion`.
	pub jwt: TokenSecret,
	/// Unique assertion identifier.
	pub jti: String,
	/// Instant the assertion was issued.
	pub issued_at: OffsetDateTime,
	/// Instant the assertion expires, [`ASSERTION_TTL`] after issuance.
	pub expires_at: OffsetDateTime,
}

/// Builds and signs one-shot client assertions for a fixed identity and
/// audience.
///
/// Assertions are cheap to produce and short-lived, so the signer never
/// caches them. Each retry attempt gets a fresh assertion with a new `jti`,
/// which keeps replay detection on the server side from rejecting retries of
/// a failed exchange.
#[derive(Clone)]
pub struct AssertionSigner {
	identity: ClientIdentity,
	audience: String,
}
impl AssertionSigner {
	/// Creates a signer for the identity and endpoint pair.
	pub fn new(identity: ClientIdentity, endpoint: &TokenEndpoint) -> Self {
		Self { identity, audience: endpoint.audience().to_owned() }
	}

	/// Identity the signer produces assertions for.
	pub fn identity(&self) -> &ClientIdentity {
		&self.identity
	}

	/// Signs an assertion issued at the current UTC instant.
	pub fn sign(&self) -> Result<SignedAssertion, SigningError> {
		self.sign_at(OffsetDateTime::now_utc())
	}

	/// Signs an assertion issued at the provided instant.
	pub fn sign_at(&self, instant: OffsetDateTime) -> Result<SignedAssertion, SigningError> {
		let issued_unix = instant.unix_timestamp();
		let jti = new_jti();
		let claims = AssertionClaims {
			iss: self.identity.client_id().to_string(),
			sub: self.identity.client_id().to_string(),
			aud: self.audience.clone(),
			jti: jti.clone(),
			iat: issued_unix,
			nbf: issued_unix,
			exp: issued_unix + ASSERTION_TTL.whole_seconds(),
		};
		let mut header = Header::new(Algorithm::RS384);

		header.kid = Some(self.identity.key_id().to_string());

		if let Some(jwks_url) = self.identity.jwks_url() {
			header.jku = Some(jwks_url.to_string());
		}

		let jwt = jsonwebtoken::encode(&header, &claims, self.identity.encoding_key())
			.map_err(|source| SigningError::Sign { source })?;

		Ok(SignedAssertion {
			jwt: TokenSecret::new(jwt),
			jti,
			issued_at: instant,
			expires_at: instant + ASSERTION_TTL,
		})
	}
}
impl Debug for AssertionSigner {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AssertionSigner")
			.field("identity", &self.identity)
			.field("audience", &self.audience)
			.finish()
	}
}

/// Generates a 128-bit CSPRNG identifier rendered as 32 lowercase hex chars,
/// comfortably inside [`JTI_MAX_LEN`](crate::assertion::claims::JTI_MAX_LEN).
fn new_jti() -> String {
	format!("{:032x}", rand::rng().random::<u128>())
}

#[cfg(test)]
mod tests {
	// crates.io
	use jsonwebtoken::{DecodingKey, Validation};
	use rsa::{RsaPrivateKey, RsaPublicKey, pkcs8::DecodePrivateKey, traits::PublicKeyParts};
	use time::macros;
	// self
	use super::*;
	use crate::{
		assertion::claims::JTI_MAX_LEN,
		auth::{ClientId, KeyId},
	};

	const TEST_KEY_PEM: &str = include_str!("../../tests/fixtures/rsa2048.pem");
	const TEST_AUDIENCE: &str = "https://auth.example.org/oauth2/token";

	fn signer() -> AssertionSigner {
		let identity = ClientIdentity::new(
			ClientId::new("test-client").expect("Client id fixture should be valid."),
			KeyId::new("key-1").expect("Key id fixture should be valid."),
			TEST_KEY_PEM,
		)
		.expect("Fixture key should parse into an identity.");
		let endpoint = TokenEndpoint::new(
			Url::parse(TEST_AUDIENCE).expect("Audience URL fixture should parse."),
		)
		.expect("HTTPS endpoint should validate.");

		AssertionSigner::new(identity, &endpoint)
	}

	fn decoding_key() -> DecodingKey {
		let private = RsaPrivateKey::from_pkcs8_pem(TEST_KEY_PEM)
			.expect("Fixture key should parse as PKCS#8.");
		let public = RsaPublicKey::from(&private);

		DecodingKey::from_rsa_raw_components(
			&public.n().to_bytes_be(),
			&public.e().to_bytes_be(),
		)
	}

	#[test]
	fn assertion_claims_bind_client_and_audience() {
		let signer = signer();
		let assertion = signer.sign().expect("Signing with the fixture key should succeed.");
		let mut validation = Validation::new(Algorithm::RS384);

		validation.set_audience(&[TEST_AUDIENCE]);
		validation.set_issuer(&["test-client"]);

		let decoded =
			jsonwebtoken::decode::<AssertionClaims>(assertion.jwt.expose(), &decoding_key(), &validation)
				.expect("Assertion should verify against the derived public key.");

		assert_eq!(decoded.header.alg, Algorithm::RS384);
		assert_eq!(decoded.header.kid.as_deref(), Some("key-1"));
		assert_eq!(decoded.header.typ.as_deref(), Some("JWT"));
		assert_eq!(decoded.claims.iss, decoded.claims.sub);
		assert_eq!(decoded.claims.aud, TEST_AUDIENCE);
		assert_eq!(decoded.claims.iat, decoded.claims.nbf);
		assert_eq!(decoded.claims.exp - decoded.claims.iat, 300);
	}

	#[test]
	fn assertion_timestamps_follow_the_issue_instant() {
		let signer = signer();
		let instant = macros::datetime!(2025-06-01 12:00 UTC);
		let assertion =
			signer.sign_at(instant).expect("Signing with the fixture key should succeed.");

		assert_eq!(assertion.issued_at, instant);
		assert_eq!(assertion.expires_at, instant + Duration::seconds(300));
	}

	#[test]
	fn jti_is_unique_and_bounded() {
		let signer = signer();
		let first = signer.sign().expect("First signing attempt should succeed.");
		let second = signer.sign().expect("Second signing attempt should succeed.");

		assert_ne!(first.jti, second.jti, "Each assertion must carry a fresh jti.");
		assert_eq!(first.jti.len(), 32);
		assert!(first.jti.len() <= JTI_MAX_LEN);
		assert!(first.jti.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
	}
}
