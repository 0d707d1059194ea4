//! JWKS document rendering for the registered signing key.
//!
//! Authorization servers verify client assertions against the public half of
//! the registered RSA key. Deployments that register a JWK Set URL instead of
//! uploading raw keys can render that document here and publish it at the
//! stable HTTPS location the server polls, so key rotation becomes a
//! deployment concern rather than a re-registration one.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rsa::{
	RsaPrivateKey, RsaPublicKey, pkcs1::DecodeRsaPrivateKey, pkcs8::DecodePrivateKey,
	traits::PublicKeyParts,
};
// self
use crate::{
	_prelude::*,
	auth::ClientIdentity,
	error::ConfigError,
	obs::{FlowKind, FlowSpan},
};

/// JSON Web Key Set document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwks {
	/// Public keys in the set.
	pub keys: Vec<Jwk>,
}
impl Jwks {
	/// Renders the JWKS document exposing the identity's public signing key.
	pub fn for_identity(identity: &ClientIdentity) -> Result<Self, ConfigError> {
		let _guard = FlowSpan::new(FlowKind::Jwks, "for_identity").entered();
		let public = decode_private_key(identity.private_key_pem().expose())?.to_public_key();

		Ok(Self { keys: vec![Jwk::from_public_key(identity, &public)] })
	}
}

/// Single RSA public key entry within a [`Jwks`] document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
	/// Key type, always `RSA`.
	pub kty: String,
	/// Key identifier matching the assertion's `kid` header.
	pub kid: String,
	/// Intended key use, always `sig`.
	#[serde(rename = "use")]
	pub use_: String,
	/// Signature algorithm, always `RS384`.
	pub alg: String,
	/// RSA modulus, base64url-encoded without padding.
	pub n: String,
	/// RSA public exponent, base64url-encoded without padding.
	pub e: String,
}
impl Jwk {
	fn from_public_key(identity: &ClientIdentity, public: &RsaPublicKey) -> Self {
		Self {
			kty: "RSA".into(),
			kid: identity.key_id().to_string(),
			use_: "sig".into(),
			alg: "RS384".into(),
			n: URL_SAFE_NO_PAD.encode(public.n().to_bytes_be()),
			e: URL_SAFE_NO_PAD.encode(public.e().to_bytes_be()),
		}
	}
}

// Registration tooling hands out both PKCS#8 and PKCS#1 PEMs, so accept either
// framing just like the signer does.
fn decode_private_key(pem: &str) -> Result<RsaPrivateKey, ConfigError> {
	RsaPrivateKey::from_pkcs8_pem(pem)
		.or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
		.map_err(|err| ConfigError::PublicKeyExtraction { source: Box::new(err) })
}
