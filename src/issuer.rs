//! Service-account token issuer with an in-memory cache and single-flight refreshes.
//!
//! [`TokenIssuer`] hands out the cached [`AccessToken`] while it is fresh (the instant is
//! before `expires_at - expiry_margin`) and otherwise signs a new assertion and trades it
//! at the token endpoint. Concurrent callers that miss the cache queue behind one refresh
//! guard and re-check the cache once they hold it, so a burst of misses produces a single
//! exchange. A failed refresh leaves the previous cache entry in place.

pub mod headers;

mod exchange;

pub use exchange::JWT_BEARER_GRANT_TYPE;
pub use headers::*;

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, DEFAULT_EXPIRY_MARGIN, ScopeSet, ServiceAccountKey, TokenSecret},
	clock::{Clock, SystemClock},
	error::{AuthenticationError, ConfigError, TaskError},
	http::TokenHttpClient,
	issuer::exchange::Exchange,
	jwt::AssertionBuilder,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	scheduler::RequestScheduler,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

/// Token endpoint used when [`IssuerConfig::token_endpoint`] is unset.
pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

#[cfg(feature = "reqwest")]
/// Issuer specialized for the crate's default reqwest transport.
pub type ReqwestTokenIssuer = TokenIssuer<ReqwestHttpClient>;

/// Issuer settings. Deserializes with every field optional.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssuerConfig {
	/// Token endpoint; `None` selects [`DEFAULT_TOKEN_ENDPOINT`]. Also the assertion audience.
	pub token_endpoint: Option<Url>,
	/// Scopes requested in every assertion.
	pub scope: ScopeSet,
	/// How long before expiry a cached token stops being handed out, in milliseconds.
	///
	/// Defaults to [`DEFAULT_EXPIRY_MARGIN`].
	pub expiry_margin_ms: u64,
}
impl IssuerConfig {
	/// Overrides the token endpoint.
	pub fn with_token_endpoint(mut self, endpoint: Url) -> Self {
		self.token_endpoint = Some(endpoint);

		self
	}

	/// Overrides the requested scopes.
	pub fn with_scope(mut self, scope: ScopeSet) -> Self {
		self.scope = scope;

		self
	}

	/// Overrides the expiry margin. Negative margins clamp to zero.
	pub fn with_expiry_margin(mut self, margin: Duration) -> Self {
		self.expiry_margin_ms = margin.whole_milliseconds().clamp(0, u64::MAX.into()) as u64;

		self
	}

	/// Expiry margin as a [`Duration`].
	pub fn expiry_margin(&self) -> Duration {
		Duration::milliseconds(self.expiry_margin_ms.min(i64::MAX as u64) as i64)
	}

	/// Resolves the endpoint the issuer posts to, rejecting anything but absolute HTTP(S) URLs.
	pub fn endpoint(&self) -> Result<Url, ConfigError> {
		let endpoint = match &self.token_endpoint {
			Some(endpoint) => endpoint.clone(),
			None => Url::parse(DEFAULT_TOKEN_ENDPOINT).map_err(|_| {
				ConfigError::InvalidTokenEndpoint { endpoint: DEFAULT_TOKEN_ENDPOINT.into() }
			})?,
		};

		match endpoint.scheme() {
			"http" | "https" if endpoint.has_host() => Ok(endpoint),
			_ => Err(ConfigError::InvalidTokenEndpoint { endpoint: endpoint.into() }),
		}
	}
}
impl Default for IssuerConfig {
	fn default() -> Self {
		Self {
			token_endpoint: None,
			scope: ScopeSet::defaults(),
			expiry_margin_ms: DEFAULT_EXPIRY_MARGIN.whole_milliseconds() as u64,
		}
	}
}

/// Issues and caches access tokens for one service account.
///
/// Clones share the cache, the refresh guard, and the optional scheduler.
pub struct TokenIssuer<C>
where
	C: ?Sized + TokenHttpClient,
{
	http_client: Arc<C>,
	config: IssuerConfig,
	endpoint: Url,
	assertions: Arc<AssertionBuilder>,
	clock: Arc<dyn Clock>,
	scheduler: Option<RequestScheduler>,
	cache: Arc<RwLock<Option<AccessToken>>>,
	refresh_guard: Arc<AsyncMutex<()>>,
}
impl<C> TokenIssuer<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Creates an issuer on top of a caller-provided transport.
	///
	/// Validates the key and configuration; performs no I/O and no key decoding.
	pub fn with_http_client(
		key: &ServiceAccountKey,
		config: IssuerConfig,
		http_client: impl Into<Arc<C>>,
	) -> Result<Self> {
		key.validate()?;

		if config.scope.is_empty() {
			return Err(ConfigError::EmptyScope.into());
		}

		let endpoint = config.endpoint()?;
		let assertions = Arc::new(AssertionBuilder::new(key, &endpoint, &config.scope));

		Ok(Self {
			http_client: http_client.into(),
			config,
			endpoint,
			assertions,
			clock: Arc::new(SystemClock),
			scheduler: None,
			cache: Default::default(),
			refresh_guard: Default::default(),
		})
	}

	/// Replaces the clock used for assertion timestamps and freshness checks.
	pub fn with_clock(mut self, clock: impl Clock) -> Self {
		self.clock = Arc::new(clock);

		self
	}

	/// Routes token exchanges through `scheduler` so they share its pacing with other calls.
	pub fn with_scheduler(mut self, scheduler: RequestScheduler) -> Self {
		self.scheduler = Some(scheduler);

		self
	}

	/// Active configuration.
	pub fn config(&self) -> &IssuerConfig {
		&self.config
	}

	/// Returns the cached token, whether or not it is still fresh.
	pub fn cached(&self) -> Option<AccessToken> {
		self.cache.read().clone()
	}

	/// Returns a fresh access token, refreshing the cache when needed.
	pub async fn access_token(&self) -> Result<AccessToken> {
		self.issue(false).await
	}

	/// Exchanges a new assertion even if the cached token is still fresh.
	pub async fn force_refresh(&self) -> Result<AccessToken> {
		self.issue(true).await
	}

	/// Returns the bearer value of a fresh access token.
	pub async fn bearer_token(&self) -> Result<TokenSecret> {
		Ok(self.access_token().await?.secret)
	}

	/// Builds `Authorization`/`Content-Type` headers around a fresh access token.
	pub async fn auth_headers(&self) -> Result<AuthHeaders> {
		let token = self.access_token().await?;

		Ok(AuthHeaders::bearer(&token.secret))
	}

	/// Alias of [`auth_headers`](Self::auth_headers).
	pub async fn request_headers(&self) -> Result<AuthHeaders> {
		self.auth_headers().await
	}

	fn reusable(&self, force: bool) -> Option<AccessToken> {
		if force {
			return None;
		}

		let now = self.clock.now();
		let margin = self.config.expiry_margin();

		self.cache.read().as_ref().filter(|token| token.is_fresh_at(now, margin)).cloned()
	}

	#[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
	async fn issue(&self, force: bool) -> Result<AccessToken> {
		const KIND: FlowKind = FlowKind::TokenIssue;

		if let Some(token) = self.reusable(force) {
			obs::event!(trace, expires_at = %token.expires_at, "Serving cached access token.");

			return Ok(token);
		}

		let span = FlowSpan::new(KIND, if force { "force_refresh" } else { "access_token" });

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let _singleflight = self.refresh_guard.lock().await;

				if let Some(token) = self.reusable(force) {
					obs::event!(debug, "Access token was refreshed by a concurrent caller.");

					return Ok(token);
				}

				let token = self.exchange().await?;

				*self.cache.write() = Some(token.clone());

				obs::event!(info, expires_at = %token.expires_at, "Access token refreshed.");

				Ok(token)
			})
			.await;

		obs::record_flow_result(KIND, &result);

		if let Err(e) = &result {
			obs::event!(warn, error = %e, "Access token refresh failed.");
		}

		result
	}

	async fn exchange(&self) -> Result<AccessToken> {
		let exchange = Exchange::<C> {
			handle: self.http_client.handle(),
			endpoint: self.endpoint.clone(),
			assertions: self.assertions.clone(),
			clock: self.clock.clone(),
		};

		match &self.scheduler {
			Some(scheduler) => scheduler.execute(move || exchange.run()).await.map_err(|e| match e {
				TaskError::Operation(e) => e,
				TaskError::Abandoned => AuthenticationError::SchedulerUnavailable.into(),
			}),
			None => exchange.run().await,
		}
	}
}
#[cfg(feature = "reqwest")]
impl TokenIssuer<ReqwestHttpClient> {
	/// Creates an issuer backed by its own reqwest client.
	pub fn new(key: &ServiceAccountKey, config: IssuerConfig) -> Result<Self> {
		Self::with_http_client(key, config, ReqwestHttpClient::new()?)
	}
}
impl<C> Clone for TokenIssuer<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn clone(&self) -> Self {
		Self {
			http_client: self.http_client.clone(),
			config: self.config.clone(),
			endpoint: self.endpoint.clone(),
			assertions: self.assertions.clone(),
			clock: self.clock.clone(),
			scheduler: self.scheduler.clone(),
			cache: self.cache.clone(),
			refresh_guard: self.refresh_guard.clone(),
		}
	}
}
impl<C> Debug for TokenIssuer<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenIssuer")
			.field("endpoint", &self.endpoint.as_str())
			.field("assertions", &self.assertions)
			.field("cached", &self.cache.read().is_some())
			.field("scheduled", &self.scheduler.is_some())
			.finish()
	}
}
