// self
use crate::obs::{FlowKind, FlowOutcome};

/// Counter incremented once per attempt, success, and failure.
pub const FLOW_COUNTER: &str = "service_account_broker_flow_total";
/// Gauge holding the number of operations waiting in a scheduler queue.
pub const SCHEDULER_QUEUED_GAUGE: &str = "service_account_broker_scheduler_queued";
/// Gauge holding the number of scheduler slots currently taken.
pub const SCHEDULER_RUNNING_GAUGE: &str = "service_account_broker_scheduler_running";

/// Maps a settled operation onto its outcome label.
pub fn outcome_of<T, E>(result: &Result<T, E>) -> FlowOutcome {
	if result.is_ok() { FlowOutcome::Success } else { FlowOutcome::Failure }
}

/// Increments [`FLOW_COUNTER`] when the `metrics` feature is enabled.
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(FLOW_COUNTER, "flow" => kind.as_str(), "outcome" => outcome.as_str())
			.increment(1);
	}
	#[cfg(not(feature = "metrics"))]
	let _ = (kind, outcome);
}

/// Records the success or failure of a settled operation and returns the label used.
pub fn record_flow_result<T, E>(kind: FlowKind, result: &Result<T, E>) -> FlowOutcome {
	let outcome = outcome_of(result);

	record_flow_outcome(kind, outcome);

	outcome
}

/// Publishes scheduler queue depth and slot usage.
pub fn record_scheduler_load(queued: usize, running: usize) {
	#[cfg(feature = "metrics")]
	{
		metrics::gauge!(SCHEDULER_QUEUED_GAUGE).set(queued as f64);
		metrics::gauge!(SCHEDULER_RUNNING_GAUGE).set(running as f64);
	}
	#[cfg(not(feature = "metrics"))]
	let _ = (queued, running);
}
