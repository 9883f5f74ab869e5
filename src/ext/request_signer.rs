//! Request signing contracts that attach issued access tokens to arbitrary HTTP clients.

// crates.io
use oauth2::http::{HeaderValue, header::AUTHORIZATION, request::Builder as HttpRequestBuilder};
// self
use crate::{auth::AccessToken, error::AuthenticationError};

/// Describes how to attach an [`AccessToken`] to an outbound request without constraining
/// the HTTP client type.
pub trait RequestSignerExt<Request, Error>
where
	Self: Send + Sync,
{
	/// Consumes the request and injects the token's `Authorization` header.
	fn attach_token(&self, request: Request, token: &AccessToken) -> Result<Request, Error>;
}

/// Signer that sets `Authorization: Bearer <token>` and marks the header sensitive.
#[derive(Clone, Copy, Debug, Default)]
pub struct BearerSigner;
impl RequestSignerExt<HttpRequestBuilder, AuthenticationError> for BearerSigner {
	fn attach_token(
		&self,
		request: HttpRequestBuilder,
		token: &AccessToken,
	) -> Result<HttpRequestBuilder, AuthenticationError> {
		Ok(request.header(AUTHORIZATION, bearer_value(token)?))
	}
}
#[cfg(feature = "reqwest")]
impl RequestSignerExt<reqwest::RequestBuilder, std::convert::Infallible> for BearerSigner {
	fn attach_token(
		&self,
		request: reqwest::RequestBuilder,
		token: &AccessToken,
	) -> Result<reqwest::RequestBuilder, std::convert::Infallible> {
		Ok(request.bearer_auth(token.secret.expose()))
	}
}

fn bearer_value(token: &AccessToken) -> Result<HeaderValue, AuthenticationError> {
	let mut value = HeaderValue::from_str(&token.secret.bearer_header())
		.map_err(|_| AuthenticationError::InvalidAccessToken)?;

	value.set_sensitive(true);

	Ok(value)
}
