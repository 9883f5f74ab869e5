//! Cached access token record and its freshness rules.

// self
use crate::{_prelude::*, auth::token::secret::TokenSecret};

/// Margin subtracted from a token's expiry before it is treated as stale.
pub const DEFAULT_EXPIRY_MARGIN: Duration = Duration::seconds(60);

/// Freshness of an [`AccessToken`] relative to an instant and a safety margin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenStatus {
	/// Usable: the instant is before `expires_at - margin`.
	Fresh,
	/// Still accepted upstream but inside the safety margin; refresh before use.
	Stale,
	/// Past its expiry instant.
	Expired,
}

/// Access token issued by the token endpoint.
///
/// Records are immutable; a refresh produces a new record that replaces the cached one.
#[derive(Clone)]
pub struct AccessToken {
	/// Bearer token value; callers must avoid logging it.
	pub secret: TokenSecret,
	/// Token type reported by the endpoint (normally `Bearer`).
	pub token_type: String,
	/// Instant the exchange completed.
	pub issued_at: OffsetDateTime,
	/// `issued_at` plus the endpoint's `expires_in`.
	pub expires_at: OffsetDateTime,
}
impl AccessToken {
	/// Creates a record that expires `expires_in` after `issued_at`.
	///
	/// An expiry past the representable range saturates; use [`AccessToken::try_new`] to
	/// reject it instead.
	pub fn new(
		secret: impl Into<String>,
		token_type: impl Into<String>,
		issued_at: OffsetDateTime,
		expires_in: Duration,
	) -> Self {
		Self {
			secret: TokenSecret::new(secret),
			token_type: token_type.into(),
			issued_at,
			expires_at: issued_at.saturating_add(expires_in),
		}
	}

	/// Like [`AccessToken::new`], but returns `None` when `issued_at + expires_in` overflows.
	pub fn try_new(
		secret: impl Into<String>,
		token_type: impl Into<String>,
		issued_at: OffsetDateTime,
		expires_in: Duration,
	) -> Option<Self> {
		let expires_at = issued_at.checked_add(expires_in)?;

		Some(Self {
			secret: TokenSecret::new(secret),
			token_type: token_type.into(),
			issued_at,
			expires_at,
		})
	}

	/// Classifies the record at `instant`, treating the last `margin` before expiry as stale.
	pub fn status_at(&self, instant: OffsetDateTime, margin: Duration) -> TokenStatus {
		if instant >= self.expires_at {
			return TokenStatus::Expired;
		}
		// A margin reaching past the earliest representable instant covers the whole lifetime.
		match self.expires_at.checked_sub(margin) {
			Some(stale_at) if instant < stale_at => TokenStatus::Fresh,
			_ => TokenStatus::Stale,
		}
	}

	/// Returns `true` if the record can be handed out at `instant` without refreshing.
	pub fn is_fresh_at(&self, instant: OffsetDateTime, margin: Duration) -> bool {
		matches!(self.status_at(instant, margin), TokenStatus::Fresh)
	}

	/// Time left until expiry at `instant`, clamped at zero.
	pub fn remaining_at(&self, instant: OffsetDateTime) -> Duration {
		let remaining = self.expires_at - instant;

		if remaining.is_negative() { Duration::ZERO } else { remaining }
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessToken")
			.field("secret", &"<redacted>")
			.field("token_type", &self.token_type)
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn token() -> AccessToken {
		AccessToken::new(
			"ya29.token",
			"Bearer",
			macros::datetime!(2025-01-01 00:00 UTC),
			Duration::hours(1),
		)
	}

	#[test]
	fn status_honors_the_safety_margin() {
		let token = token();

		assert_eq!(token.expires_at, macros::datetime!(2025-01-01 01:00 UTC));
		assert_eq!(
			token.status_at(macros::datetime!(2025-01-01 00:58:59 UTC), DEFAULT_EXPIRY_MARGIN),
			TokenStatus::Fresh
		);
		assert_eq!(
			token.status_at(macros::datetime!(2025-01-01 00:59 UTC), DEFAULT_EXPIRY_MARGIN),
			TokenStatus::Stale
		);
		assert_eq!(
			token.status_at(macros::datetime!(2025-01-01 01:00 UTC), DEFAULT_EXPIRY_MARGIN),
			TokenStatus::Expired
		);
	}

	#[test]
	fn zero_margin_keeps_token_fresh_until_expiry() {
		let token = token();

		assert!(token.is_fresh_at(macros::datetime!(2025-01-01 00:59:59 UTC), Duration::ZERO));
		assert!(!token.is_fresh_at(macros::datetime!(2025-01-01 01:00 UTC), Duration::ZERO));
	}

	#[test]
	fn remaining_clamps_at_zero() {
		let token = token();

		assert_eq!(token.remaining_at(macros::datetime!(2025-01-01 00:30 UTC)), Duration::minutes(30));
		assert_eq!(token.remaining_at(macros::datetime!(2025-01-01 02:00 UTC)), Duration::ZERO);
	}

	#[test]
	fn oversized_margins_mark_the_token_stale() {
		let token = token();

		assert_eq!(
			token.status_at(macros::datetime!(2025-01-01 00:00 UTC), Duration::MAX),
			TokenStatus::Stale
		);
		assert_eq!(
			token.status_at(
				macros::datetime!(2025-01-01 00:00 UTC),
				Duration::milliseconds(1_000_000_000_000_000)
			),
			TokenStatus::Stale
		);
		assert_eq!(
			token.status_at(macros::datetime!(2025-01-01 01:00 UTC), Duration::MAX),
			TokenStatus::Expired
		);
	}

	#[test]
	fn out_of_range_lifetimes_are_detected() {
		let issued_at = macros::datetime!(2025-01-01 00:00 UTC);

		assert!(
			AccessToken::try_new("a", "Bearer", issued_at, Duration::seconds(9_000_000_000_000))
				.is_none()
		);
		assert_eq!(
			AccessToken::try_new("a", "Bearer", issued_at, Duration::hours(1))
				.map(|token| token.expires_at),
			Some(macros::datetime!(2025-01-01 01:00 UTC))
		);

		let saturated =
			AccessToken::new("a", "Bearer", issued_at, Duration::seconds(9_000_000_000_000));

		assert!(saturated.expires_at > issued_at);
		assert!(saturated.is_fresh_at(issued_at, DEFAULT_EXPIRY_MARGIN));
	}

	#[test]
	fn debug_redacts_secret() {
		assert!(!format!("{:?}", token()).contains("ya29.token"));
	}
}
