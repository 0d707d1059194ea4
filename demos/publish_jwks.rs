//! Renders the JWKS document for the registered signing key so deployments can publish it at
//! the JWK Set URL registered with the authorization server.

// crates.io
use color_eyre::Result;
use url::Url;
// self
use jwt_bearer_broker::{
	auth::{ClientId, ClientIdentity, KeyId},
	jwks::Jwks,
};

fn main() -> Result<()> {
	color_eyre::install()?;

	let identity = ClientIdentity::new(
		ClientId::new("demo-client")?,
		KeyId::new("demo-key-1")?,
		include_str!("../tests/fixtures/rsa2048.pem"),
	)?
	.with_jwks_url(Url::parse("https://keys.example.org/jwks.json")?);
	let jwks = Jwks::for_identity(&identity)?;

	println!("Publish this document at {}:", identity.jwks_url().map(Url::as_str).unwrap_or("-"));
	println!("{}", serde_json::to_string_pretty(&jwks)?);

	Ok(())
}
