//! Crate-level error types shared by the issuer, the assertion builder, and the scheduler.

// self
use crate::{_prelude::*, auth::ScopeValidationError};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem; never retried.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Assertion signing or token exchange failure; callers may retry.
	#[error(transparent)]
	Authentication(#[from] AuthenticationError),
}

/// Configuration and validation failures raised before any network use.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Service account credentials lack a mandatory field.
	#[error("Service account credentials must include a non-empty `{field}`.")]
	MissingCredentialField {
		/// Name of the missing field as it appears in the key file.
		field: &'static str,
	},
	/// Service account JSON could not be parsed.
	#[error("Service account credentials could not be parsed.")]
	InvalidCredentials {
		/// Path-aware parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Requested scopes cannot be normalized.
	#[error("Requested scopes are invalid.")]
	InvalidScope(#[from] ScopeValidationError),
	/// No scope was configured; the token endpoint requires at least one.
	#[error("At least one OAuth scope must be requested.")]
	EmptyScope,
	/// Token endpoint is not an absolute HTTP(S) URL.
	#[error("Token endpoint `{endpoint}` must be an http or https URL.")]
	InvalidTokenEndpoint {
		/// Rejected endpoint.
		endpoint: String,
	},
	/// Content type override cannot be carried in an HTTP header.
	#[error("Content type `{value}` is not a valid header value.")]
	InvalidContentType {
		/// Rejected content type.
		value: String,
	},
	/// Scheduler was configured without any concurrency slot.
	#[error("Request scheduler requires at least one concurrency slot.")]
	InvalidConcurrency,
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Failures while minting an assertion or exchanging it for an access token.
#[derive(Debug, ThisError)]
pub enum AuthenticationError {
	/// Private key is not base64 PKCS#8 RSA material.
	#[error("Service account private key was rejected: {reason}.")]
	InvalidPrivateKey {
		/// Decoder or key-import failure description.
		reason: String,
	},
	/// Assertion header or claims could not be serialized.
	#[error("JWT assertion could not be encoded.")]
	Encoding(#[source] serde_json::Error),
	/// RSA signing failed.
	#[error("JWT assertion could not be signed: {reason}.")]
	Signing {
		/// Signer failure description.
		reason: String,
	},
	/// Token endpoint answered with a non-success status.
	#[error("Token endpoint rejected the assertion with HTTP {status}: {body}.")]
	Rejected {
		/// HTTP status code.
		status: u16,
		/// Error body returned by the endpoint, passed through verbatim.
		body: serde_json::Value,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Token endpoint responded with JSON that does not match the token response shape.
	#[error("Token endpoint returned malformed JSON.")]
	MalformedResponse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the response.
		status: u16,
	},
	/// Token endpoint response omitted `expires_in`.
	#[error("Token endpoint response is missing expires_in.")]
	MissingExpiresIn,
	/// Token endpoint returned a non-positive lifetime.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
	/// Token endpoint returned a lifetime that does not fit a representable expiry instant.
	#[error("The expires_in value is out of range.")]
	ExpiresInOutOfRange,
	/// Issued access token cannot be carried in an HTTP header.
	#[error("Issued access token is not a valid header value.")]
	InvalidAccessToken,
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the token endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the token endpoint.")]
	Io(#[from] std::io::Error),
	/// HTTP client failed without a structured cause.
	#[error("HTTP client error occurred while calling the token endpoint: {message}.")]
	Transport {
		/// Client-supplied description.
		message: String,
	},
	/// Exchange was submitted to a request scheduler that dropped it.
	#[error("Token exchange was abandoned by the request scheduler.")]
	SchedulerUnavailable,
}
impl AuthenticationError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}

/// Failure reported by [`RequestScheduler::execute`](crate::scheduler::RequestScheduler::execute).
#[derive(Debug, ThisError)]
pub enum TaskError<E> {
	/// Error returned by the submitted operation, unmodified.
	#[error(transparent)]
	Operation(E),
	/// Operation never settled (it panicked or its runtime shut down).
	#[error("Scheduled task was abandoned before it settled.")]
	Abandoned,
}
impl<E> TaskError<E> {
	/// Returns the operation's own error, if that is what failed.
	pub fn into_operation_error(self) -> Option<E> {
		match self {
			Self::Operation(e) => Some(e),
			Self::Abandoned => None,
		}
	}

	/// Returns `true` when the scheduler lost the task instead of the task failing.
	pub fn is_abandoned(&self) -> bool {
		matches!(self, Self::Abandoned)
	}
}
