// crates.io
use url::Url;
// self
use jwt_bearer_broker::{
	assertion::{AssertionClaims, AssertionSigner},
	auth::{ClientId, ClientIdentity, KeyId},
	endpoint::TokenEndpoint,
	jsonwebtoken::{self, Algorithm, DecodingKey, Validation},
	jwks::Jwks,
};

const TEST_KEY_PEM: &str = include_str!("fixtures/rsa2048.pem");
const AUDIENCE: &str = "https://example.org/oauth2/token";

fn build_identity() -> ClientIdentity {
	ClientIdentity::new(
		ClientId::new("test-client").expect("Client id fixture should be valid."),
		KeyId::new("key-1").expect("Key id fixture should be valid."),
		TEST_KEY_PEM,
	)
	.expect("Fixture key should parse into an identity.")
}

fn build_signer(identity: ClientIdentity) -> AssertionSigner {
	let endpoint = TokenEndpoint::new(
		Url::parse(AUDIENCE).expect("Audience URL fixture should parse."),
	)
	.expect("HTTPS endpoint should validate.");

	AssertionSigner::new(identity, &endpoint)
}

#[test]
fn published_jwks_verifies_freshly_signed_assertions() {
	let identity = build_identity();
	let jwks = Jwks::for_identity(&identity)
		.expect("JWKS rendering should succeed for the fixture key.");
	let jwk = jwks.keys.first().expect("JWKS document should carry the signing key.");
	let assertion = build_signer(identity)
		.sign()
		.expect("Signing with the fixture key should succeed.");
	let decoding_key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
		.expect("JWKS components should reconstruct the public key.");
	let mut validation = Validation::new(Algorithm::RS384);

	validation.set_audience(&[AUDIENCE]);
	validation.set_issuer(&["test-client"]);

	let decoded = jsonwebtoken::decode::<AssertionClaims>(
		assertion.jwt.expose(),
		&decoding_key,
		&validation,
	)
	.expect("Assertion must verify against the key the crate publishes.");

	assert_eq!(decoded.header.alg, Algorithm::RS384);
	assert_eq!(decoded.header.kid.as_deref(), Some(jwk.kid.as_str()));
	assert_eq!(decoded.claims.iss, "test-client");
	assert_eq!(decoded.claims.sub, "test-client");
	assert_eq!(decoded.claims.aud, AUDIENCE);
	assert_eq!(decoded.claims.jti, assertion.jti);
}

#[test]
fn jku_header_advertises_the_registered_jwks_url() {
	let jwks_url =
		Url::parse("https://keys.example.org/jwks.json").expect("JWKS URL fixture should parse.");
	let identity = build_identity().with_jwks_url(jwks_url.clone());
	let assertion = build_signer(identity)
		.sign()
		.expect("Signing with the fixture key should succeed.");
	let header = jsonwebtoken::decode_header(assertion.jwt.expose())
		.expect("Assertion header should decode.");

	assert_eq!(header.jku.as_deref(), Some(jwks_url.as_str()));
}

#[test]
fn assertions_without_a_jwks_url_omit_jku() {
	let assertion = build_signer(build_identity())
		.sign()
		.expect("Signing with the fixture key should succeed.");
	let header = jsonwebtoken::decode_header(assertion.jwt.expose())
		.expect("Assertion header should decode.");

	assert_eq!(header.jku, None);
}
