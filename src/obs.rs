//! Optional observability helpers for token issuance and scheduling.
//!
//! # Feature Flags
//!
//! - Enable `tracing` (on by default) to emit spans named `service_account_broker.flow` with the
//!   `flow` and `stage` fields, plus events for cache hits, refreshes, dispatches, and failures.
//! - Enable `metrics` to increment the `service_account_broker_flow_total` counter for every
//!   attempt/success/failure, labeled by `flow` + `outcome`.
//!   The scheduler also publishes its queue depth and slot usage as the
//!   `service_account_broker_scheduler_queued` and `service_account_broker_scheduler_running`
//!   gauges.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Emits a `tracing` event when the `tracing` feature is enabled and compiles to nothing
/// otherwise.
macro_rules! event {
	($level:ident, $($arg:tt)+) => {{
		#[cfg(feature = "tracing")]
		::tracing::$level!($($arg)+);
	}};
}
pub(crate) use event;

/// Operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Access token issuance (cache refresh through the JWT-bearer grant).
	TokenIssue,
	/// Task submitted to a request scheduler.
	Schedule,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::TokenIssue => "token_issue",
			FlowKind::Schedule => "schedule",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to an instrumented operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
