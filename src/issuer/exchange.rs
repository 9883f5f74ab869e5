//! One JWT-bearer exchange against the token endpoint.

// crates.io
use oauth2::{
	AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse,
	http::{
		Method, Request,
		header::{ACCEPT, CONTENT_TYPE},
	},
};
use url::form_urlencoded::Serializer;
// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	clock::Clock,
	error::{AuthenticationError, ConfigError},
	http::{ResponseMetadata, TokenHttpClient},
	jwt::{AssertionBuilder, SignedAssertion},
};

/// `grant_type` value of the JWT-bearer grant.
pub const JWT_BEARER_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const DEFAULT_TOKEN_TYPE: &str = "Bearer";

#[derive(Deserialize)]
struct TokenResponse {
	access_token: String,
	#[serde(default)]
	expires_in: Option<i64>,
	#[serde(default)]
	token_type: Option<String>,
}

/// Everything one exchange needs, owned so the exchange can run on a scheduler worker.
pub(crate) struct Exchange<C>
where
	C: ?Sized + TokenHttpClient,
{
	pub(crate) handle: C::Handle,
	pub(crate) endpoint: Url,
	pub(crate) assertions: Arc<AssertionBuilder>,
	pub(crate) clock: Arc<dyn Clock>,
}
impl<C> Exchange<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Signs a fresh assertion, posts it, and turns the response into an [`AccessToken`].
	pub(crate) async fn run(self) -> Result<AccessToken> {
		let assertion = self.assertions.build(self.clock.as_ref())?;
		let request = token_request(&self.endpoint, &assertion)?;
		let response = self.handle.call(request).await.map_err(map_transport_error)?;

		parse_token_response(&response, self.clock.as_ref())
	}
}

fn token_request(endpoint: &Url, assertion: &SignedAssertion) -> Result<HttpRequest> {
	let body = Serializer::new(String::new())
		.append_pair("grant_type", JWT_BEARER_GRANT_TYPE)
		.append_pair("assertion", assertion.expose())
		.finish();
	let request = Request::builder()
		.method(Method::POST)
		.uri(endpoint.as_str())
		.header(CONTENT_TYPE, FORM_CONTENT_TYPE)
		.header(ACCEPT, "application/json")
		.body(body.into_bytes())
		.map_err(ConfigError::from)?;

	Ok(request)
}

fn parse_token_response(response: &HttpResponse, clock: &dyn Clock) -> Result<AccessToken> {
	let now = clock.now();
	let status = response.status();

	if !status.is_success() {
		let meta = ResponseMetadata::from_response(response, now);
		let body = serde_json::from_slice(response.body()).unwrap_or_else(|_| {
			serde_json::Value::String(String::from_utf8_lossy(response.body()).into_owned())
		});

		return Err(AuthenticationError::Rejected {
			status: meta.status,
			body,
			retry_after: meta.retry_after,
		}
		.into());
	}

	let mut de = serde_json::Deserializer::from_slice(response.body());
	let parsed: TokenResponse = serde_path_to_error::deserialize(&mut de).map_err(|source| {
		AuthenticationError::MalformedResponse { source, status: status.as_u16() }
	})?;
	let expires_in = parsed.expires_in.ok_or(AuthenticationError::MissingExpiresIn)?;

	if expires_in <= 0 {
		return Err(AuthenticationError::NonPositiveExpiresIn.into());
	}

	let token = AccessToken::try_new(
		parsed.access_token,
		parsed.token_type.unwrap_or_else(|| DEFAULT_TOKEN_TYPE.into()),
		now,
		Duration::seconds(expires_in),
	)
	.ok_or(AuthenticationError::ExpiresInOutOfRange)?;

	Ok(token)
}

fn map_transport_error<E>(err: HttpClientError<E>) -> Error
where
	E: 'static + Send + Sync + StdError,
{
	match err {
		HttpClientError::Reqwest(inner) => AuthenticationError::network(*inner).into(),
		HttpClientError::Http(inner) => ConfigError::from(inner).into(),
		HttpClientError::Io(inner) => AuthenticationError::Io(inner).into(),
		HttpClientError::Other(message) => AuthenticationError::Transport { message }.into(),
		_ => AuthenticationError::Transport { message: "unrecognized transport failure".into() }
			.into(),
	}
}
