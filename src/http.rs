//! Transport primitives for token-endpoint exchanges.
//!
//! [`TokenHttpClient`] is the issuer's only dependency on an HTTP stack. It hands out
//! [`AsyncHttpClient`] handles from the `oauth2` crate, so any transport that already speaks
//! that trait plugs in unchanged. [`ReqwestHttpClient`] is the default implementation.

// crates.io
use oauth2::{
	AsyncHttpClient, HttpClientError, HttpResponse,
	http::{HeaderMap, header::RETRY_AFTER},
};
use time::format_description::well_known::Rfc2822;
// self
use crate::_prelude::*;

/// Abstraction over HTTP transports capable of posting JWT-bearer grants.
///
/// Implementations must be `Send + Sync + 'static` so a single transport can back many
/// issuers, and the handles they return must own whatever state their request futures need
/// so those futures stay `Send` (token exchanges may run on a scheduler's worker task).
pub trait TokenHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// Request handle used for a single exchange.
	type Handle: for<'c> AsyncHttpClient<
			'c,
			Error = HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Returns a handle for one exchange.
	fn handle(&self) -> Self::Handle;
}

/// Response facts used when classifying a token-endpoint failure.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseMetadata {
	/// HTTP status code returned by the token endpoint.
	pub status: u16,
	/// Retry-After hint expressed as a relative duration.
	pub retry_after: Option<Duration>,
}
impl ResponseMetadata {
	/// Extracts status and Retry-After from a response, measuring HTTP-date hints from `now`.
	pub fn from_response(response: &HttpResponse, now: OffsetDateTime) -> Self {
		Self {
			status: response.status().as_u16(),
			retry_after: parse_retry_after(response.headers(), now),
		}
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Token endpoints answer directly, so clients built by [`ReqwestHttpClient::new`] never
/// follow redirects. Apply the same policy to clients passed to
/// [`ReqwestHttpClient::with_client`].
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Builds a client that does not follow redirects.
	pub fn new() -> Result<Self, crate::error::ConfigError> {
		let client =
			ReqwestClient::builder().redirect(reqwest::redirect::Policy::none()).build()?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl TokenHttpClient for ReqwestHttpClient {
	type Handle = ReqwestHandle;
	type TransportError = ReqwestError;

	fn handle(&self) -> Self::Handle {
		ReqwestHandle(self.0.clone())
	}
}

/// [`AsyncHttpClient`] handle returned by [`ReqwestHttpClient`].
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestHandle(ReqwestClient);
#[cfg(feature = "reqwest")]
impl<'c> AsyncHttpClient<'c> for ReqwestHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: oauth2::HttpRequest) -> Self::Future {
		let client = self.0.clone();

		Box::pin(async move {
			let response =
				client.execute(request.try_into().map_err(Box::new)?).await.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut converted =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*converted.status_mut() = status;
			*converted.headers_mut() = headers;

			Ok(converted)
		})
	}
}

fn parse_retry_after(headers: &HeaderMap, now: OffsetDateTime) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u32>() {
		return Some(Duration::seconds(secs.into()));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - now;

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}

#[cfg(test)]
mod tests {
	// crates.io
	use oauth2::http::{HeaderValue, StatusCode};
	use time::macros;
	// self
	use super::*;

	fn response(status: StatusCode, retry_after: Option<&'static str>) -> HttpResponse {
		let mut response = HttpResponse::new(Vec::new());

		*response.status_mut() = status;

		if let Some(value) = retry_after {
			response.headers_mut().insert(RETRY_AFTER, HeaderValue::from_static(value));
		}

		response
	}

	#[test]
	fn metadata_reads_status_and_delta_seconds() {
		let meta = ResponseMetadata::from_response(
			&response(StatusCode::TOO_MANY_REQUESTS, Some("30")),
			OffsetDateTime::now_utc(),
		);

		assert_eq!(meta.status, 429);
		assert_eq!(meta.retry_after, Some(Duration::seconds(30)));
	}

	#[test]
	fn metadata_reads_http_date_relative_to_now() {
		let now = macros::datetime!(2025-01-01 00:00 UTC);
		let meta = ResponseMetadata::from_response(
			&response(StatusCode::SERVICE_UNAVAILABLE, Some("Wed, 01 Jan 2025 00:02:00 +0000")),
			now,
		);

		assert_eq!(meta.status, 503);
		assert_eq!(meta.retry_after, Some(Duration::minutes(2)));
	}

	#[test]
	fn metadata_ignores_past_or_garbled_hints() {
		let now = macros::datetime!(2025-01-01 00:00 UTC);

		for hint in ["Tue, 31 Dec 2024 23:00:00 +0000", "soon", "-5"] {
			let meta = ResponseMetadata::from_response(&response(StatusCode::OK, Some(hint)), now);

			assert_eq!(meta.retry_after, None, "Hint `{hint}` should be ignored.");
		}
	}
}
