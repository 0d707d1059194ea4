//! Auth-domain identifiers, client identity, scope sets, and token models.

pub mod id;
pub mod identity;
pub mod scope;
pub mod token;

pub use id::*;
pub use identity::*;
pub use scope::*;
pub use token::{record::*, secret::*};
