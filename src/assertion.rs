//! Client assertion claims and RS384 signing.

pub mod claims;
pub mod signer;

pub use claims::*;
pub use signer::*;
