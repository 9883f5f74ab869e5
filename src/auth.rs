//! Service-account credentials, scope sets, and access token models.

pub mod credentials;
pub mod scope;
pub mod token;

pub use credentials::*;
pub use scope::*;
pub use token::{record::*, secret::*};
