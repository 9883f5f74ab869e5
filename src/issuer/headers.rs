//! Header set handed to downstream API calls.

// crates.io
use oauth2::http::{
	HeaderMap, HeaderValue,
	header::{AUTHORIZATION, CONTENT_TYPE},
};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::{AuthenticationError, ConfigError},
};

/// Content type attached to downstream API calls unless overridden.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// `Authorization` and `Content-Type` values for one downstream request.
///
/// Media uploads swap the content type with [`with_content_type`](Self::with_content_type)
/// and keep the bearer credential.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthHeaders {
	authorization: String,
	content_type: String,
}
impl AuthHeaders {
	/// Builds `Authorization: Bearer <token>` with a JSON content type.
	pub fn bearer(token: &TokenSecret) -> Self {
		Self { authorization: token.bearer_header(), content_type: JSON_CONTENT_TYPE.into() }
	}

	/// Replaces the content type.
	pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
		self.content_type = content_type.into();

		self
	}

	/// `Authorization` header value. Callers must avoid logging it.
	pub fn authorization(&self) -> &str {
		&self.authorization
	}

	/// `Content-Type` header value.
	pub fn content_type(&self) -> &str {
		&self.content_type
	}

	/// Converts into an HTTP header map, marking the credential as sensitive.
	pub fn to_header_map(&self) -> Result<HeaderMap> {
		let mut authorization = HeaderValue::from_str(&self.authorization)
			.map_err(|_| AuthenticationError::InvalidAccessToken)?;
		let content_type = HeaderValue::from_str(&self.content_type)
			.map_err(|_| ConfigError::InvalidContentType { value: self.content_type.clone() })?;
		let mut headers = HeaderMap::with_capacity(2);

		authorization.set_sensitive(true);
		headers.insert(AUTHORIZATION, authorization);
		headers.insert(CONTENT_TYPE, content_type);

		Ok(headers)
	}
}
impl Debug for AuthHeaders {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthHeaders")
			.field("authorization", &"Bearer <redacted>")
			.field("content_type", &self.content_type)
			.finish()
	}
}
