//! Fixtures shared by integration tests.

#![allow(dead_code)]

// crates.io
use httpmock::MockServer;
use time::macros;
// self
use service_account_broker::{
	auth::ServiceAccountKey,
	clock::ManualClock,
	http::ReqwestHttpClient,
	issuer::{IssuerConfig, ReqwestTokenIssuer},
	url::Url,
};

/// PKCS#8 RSA key used to sign assertions in tests.
pub const TEST_PRIVATE_KEY_PEM: &str = include_str!("../fixtures/service_account_key.pem");
/// Service account email baked into [`service_account_key`].
pub const TEST_CLIENT_EMAIL: &str = "robot@project.iam.gserviceaccount.com";

pub fn service_account_key() -> ServiceAccountKey {
	ServiceAccountKey::new(TEST_CLIENT_EMAIL, TEST_PRIVATE_KEY_PEM)
}

pub fn test_clock() -> ManualClock {
	ManualClock::new(macros::datetime!(2025-01-01 00:00 UTC))
}

/// Issuer that posts to the mock server's `/token` route and reads time from `clock`.
pub fn mock_issuer(server: &MockServer, clock: &ManualClock) -> ReqwestTokenIssuer {
	let endpoint = Url::parse(&server.url("/token")).expect("Mock token endpoint should parse.");
	let http_client = ReqwestHttpClient::new().expect("Reqwest client should build.");

	ReqwestTokenIssuer::with_http_client(
		&service_account_key(),
		IssuerConfig::default().with_token_endpoint(endpoint),
		http_client,
	)
	.expect("Issuer should build from fixtures.")
	.with_clock(clock.clone())
}

/// JSON body of a successful token response.
pub fn token_body(access_token: &str, expires_in: i64) -> String {
	format!(r#"{{"access_token":"{access_token}","token_type":"Bearer","expires_in":{expires_in}}}"#)
}
