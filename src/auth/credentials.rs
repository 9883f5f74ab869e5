//! Service-account identity descriptor and its validation.

// self
use crate::{_prelude::*, error::ConfigError};

/// Identity of a service account: the issuer email plus the PKCS#8 PEM key that signs its
/// assertions.
///
/// Deserializes from the key file format handed out by the identity provider; fields other
/// than `client_email`, `private_key`, and `private_key_id` are ignored. Missing fields
/// deserialize as empty strings so [`validate`](Self::validate) can report them by name.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceAccountKey {
	/// Service account email; becomes the `iss` claim.
	#[serde(default)]
	pub client_email: String,
	/// PEM text wrapping base64 PKCS#8 RSA key material.
	#[serde(default)]
	pub private_key: String,
	/// Key identifier, forwarded as the JWT `kid` header when present.
	#[serde(default)]
	pub private_key_id: Option<String>,
}
impl ServiceAccountKey {
	/// Creates a key from its two mandatory parts.
	pub fn new(client_email: impl Into<String>, private_key: impl Into<String>) -> Self {
		Self {
			client_email: client_email.into(),
			private_key: private_key.into(),
			private_key_id: None,
		}
	}

	/// Sets the key identifier advertised in assertion headers.
	pub fn with_private_key_id(mut self, id: impl Into<String>) -> Self {
		self.private_key_id = Some(id.into());

		self
	}

	/// Parses a service account key from its JSON representation.
	///
	/// Parsing does not validate; [`TokenIssuer`](crate::issuer::TokenIssuer) construction does.
	pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
		let mut de = serde_json::Deserializer::from_str(raw);

		serde_path_to_error::deserialize(&mut de)
			.map_err(|source| ConfigError::InvalidCredentials { source })
	}

	/// Ensures both mandatory fields are present and non-blank.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.client_email.trim().is_empty() {
			return Err(ConfigError::MissingCredentialField { field: "client_email" });
		}
		if self.private_key.trim().is_empty() {
			return Err(ConfigError::MissingCredentialField { field: "private_key" });
		}

		Ok(())
	}
}
impl Debug for ServiceAccountKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ServiceAccountKey")
			.field("client_email", &self.client_email)
			.field("private_key", &"<redacted>")
			.field("private_key_id", &self.private_key_id)
			.finish()
	}
}
