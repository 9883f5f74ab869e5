//! FIFO request scheduler with a concurrency cap and a global minimum dispatch interval.
//!
//! [`RequestScheduler::execute`] enqueues an operation immediately, in call order. A single
//! dispatcher task (spawned on the caller's Tokio runtime the first time one is available)
//! takes the queue head, waits for a free slot, waits until `min_interval` has passed since
//! the previous dispatch, and then runs the operation on its own task. The slot is released
//! when the operation settles, whether it succeeds, fails, or panics.
//!
//! Pacing is global: with `max_concurrent = 5` and `min_interval = 1s`, operations still start
//! at most once per second even when slots are free.
//!
//! An operation must not wait on another operation queued behind it on the same scheduler;
//! with every slot held that wait never ends.

// std
use std::time::Duration as StdDuration;
// crates.io
use tokio::{
	runtime::Handle,
	sync::{Semaphore, mpsc, oneshot},
	time::{Instant, sleep_until},
};
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TaskError},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Default [`SchedulerConfig::max_concurrent`].
pub const DEFAULT_MAX_CONCURRENT: usize = 5;
/// Default [`SchedulerConfig::min_interval_ms`].
pub const DEFAULT_MIN_INTERVAL_MS: u64 = 1_000;

/// Future returned by [`RequestScheduler::execute`].
pub type TaskFuture<T, E> = Pin<Box<dyn Future<Output = Result<T, TaskError<E>>> + Send>>;

type Job = Pin<Box<dyn Future<Output = ()> + Send>>;
type JobFactory = Box<dyn FnOnce() -> Job + Send>;

/// Scheduler limits. Deserializes with every field optional.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
	/// Operations allowed to run at the same time. Must be at least one.
	pub max_concurrent: usize,
	/// Minimum gap between two consecutive dispatches, in milliseconds.
	pub min_interval_ms: u64,
}
impl SchedulerConfig {
	/// Overrides the concurrency cap.
	pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
		self.max_concurrent = max_concurrent;

		self
	}

	/// Overrides the minimum dispatch interval.
	pub fn with_min_interval_ms(mut self, min_interval_ms: u64) -> Self {
		self.min_interval_ms = min_interval_ms;

		self
	}

	/// Minimum dispatch interval as a [`std::time::Duration`].
	pub fn min_interval(&self) -> StdDuration {
		StdDuration::from_millis(self.min_interval_ms)
	}

	/// Rejects limits the scheduler cannot honor.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.max_concurrent == 0 || self.max_concurrent > Semaphore::MAX_PERMITS {
			return Err(ConfigError::InvalidConcurrency);
		}

		Ok(())
	}
}
impl Default for SchedulerConfig {
	fn default() -> Self {
		Self { max_concurrent: DEFAULT_MAX_CONCURRENT, min_interval_ms: DEFAULT_MIN_INTERVAL_MS }
	}
}

/// Point-in-time view of a scheduler's counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulerSnapshot {
	/// Slots currently held by dispatched operations.
	pub running: usize,
	/// Operations submitted but not yet dispatched.
	pub queued: usize,
	/// Operations dispatched since the scheduler was created.
	pub dispatched: u64,
	/// Monotonic instant of the latest dispatch.
	pub last_dispatch_at: Option<Instant>,
}

struct QueuedTask {
	#[cfg_attr(not(feature = "tracing"), allow(dead_code))]
	seq: u64,
	job: JobFactory,
}

#[derive(Default)]
struct DispatchState {
	next_seq: u64,
	queued: usize,
	dispatched: u64,
	last_dispatch_at: Option<Instant>,
}

struct SchedulerShared {
	config: SchedulerConfig,
	slots: Arc<Semaphore>,
	state: Mutex<DispatchState>,
	receiver: Mutex<Option<mpsc::UnboundedReceiver<QueuedTask>>>,
}
impl SchedulerShared {
	fn ensure_dispatcher(self: &Arc<Self>) {
		let Ok(runtime) = Handle::try_current() else {
			return;
		};
		let Some(receiver) = self.receiver.lock().take() else {
			return;
		};

		obs::event!(
			debug,
			max_concurrent = self.config.max_concurrent,
			min_interval_ms = self.config.min_interval_ms,
			"Starting request dispatcher."
		);

		runtime.spawn(dispatch(self.clone(), receiver));
	}

	/// Waits out the remainder of `min_interval`, then stamps the dispatch.
	async fn pace(&self) {
		let min_interval = self.config.min_interval();
		let last = self.state.lock().last_dispatch_at;

		if let Some(last) = last {
			let ready_at = last + min_interval;

			if ready_at > Instant::now() {
				sleep_until(ready_at).await;
			}
		}

		let mut state = self.state.lock();

		state.queued = state.queued.saturating_sub(1);
		state.dispatched += 1;
		state.last_dispatch_at = Some(Instant::now());
	}

	fn publish_load(&self) {
		let queued = self.state.lock().queued;
		let running = self.config.max_concurrent - self.slots.available_permits();

		obs::record_scheduler_load(queued, running);
	}
}

async fn dispatch(
	shared: Arc<SchedulerShared>,
	mut receiver: mpsc::UnboundedReceiver<QueuedTask>,
) {
	while let Some(task) = receiver.recv().await {
		let Ok(slot) = shared.slots.clone().acquire_owned().await else {
			break;
		};

		shared.pace().await;
		shared.publish_load();

		obs::event!(trace, seq = task.seq, "Dispatching scheduled task.");

		let span = FlowSpan::new(FlowKind::Schedule, "run");

		tokio::spawn(span.instrument(async move {
			let _slot = slot;

			(task.job)().await;
		}));
	}

	obs::event!(debug, "Request dispatcher stopped; every scheduler handle was dropped.");
}

/// FIFO scheduler handle. Clones share the same queue, slots, and pacing.
///
/// The dispatcher exits once every handle is dropped and the queue has drained.
#[derive(Clone)]
pub struct RequestScheduler {
	shared: Arc<SchedulerShared>,
	sender: mpsc::UnboundedSender<QueuedTask>,
}
impl RequestScheduler {
	/// Creates a scheduler; fails with [`ConfigError::InvalidConcurrency`] on a zero cap.
	pub fn new(config: SchedulerConfig) -> Result<Self> {
		config.validate()?;

		let (sender, receiver) = mpsc::unbounded_channel();
		let shared = Arc::new(SchedulerShared {
			slots: Arc::new(Semaphore::new(config.max_concurrent)),
			config,
			state: Default::default(),
			receiver: Mutex::new(Some(receiver)),
		});

		Ok(Self { shared, sender })
	}

	/// Active configuration.
	pub fn config(&self) -> &SchedulerConfig {
		&self.shared.config
	}

	/// Current counters.
	pub fn snapshot(&self) -> SchedulerSnapshot {
		let state = self.shared.state.lock();

		SchedulerSnapshot {
			running: self.shared.config.max_concurrent - self.shared.slots.available_permits(),
			queued: state.queued,
			dispatched: state.dispatched,
			last_dispatch_at: state.last_dispatch_at,
		}
	}

	/// Queues `op` and resolves with its output once it has run.
	///
	/// The operation is queued before this returns, so FIFO order is call order. Dropping
	/// the returned future does not cancel the operation; its output is discarded. An
	/// operation error comes back as [`TaskError::Operation`]; an operation that panics
	/// comes back as [`TaskError::Abandoned`].
	pub fn execute<F, Fut, T, E>(&self, op: F) -> TaskFuture<T, E>
	where
		F: 'static + Send + FnOnce() -> Fut,
		Fut: 'static + Send + Future<Output = Result<T, E>>,
		T: 'static + Send,
		E: 'static + Send,
	{
		const KIND: FlowKind = FlowKind::Schedule;

		let (tx, rx) = oneshot::channel();
		let job: JobFactory = Box::new(move || {
			Box::pin(async move {
				let result = op().await;

				obs::record_flow_result(KIND, &result);

				// The caller may have dropped its future; the output is discarded then.
				let _ = tx.send(result);
			})
		});

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		self.enqueue(job);
		self.shared.ensure_dispatcher();

		let shared = self.shared.clone();

		Box::pin(async move {
			shared.ensure_dispatcher();

			match rx.await {
				Ok(result) => result.map_err(TaskError::Operation),
				Err(_) => {
					obs::record_flow_outcome(KIND, FlowOutcome::Failure);
					obs::event!(warn, "Scheduled task was abandoned before it settled.");

					Err(TaskError::Abandoned)
				},
			}
		})
	}

	fn enqueue(&self, job: JobFactory) {
		// Sequence numbers follow channel order.
		let mut state = self.shared.state.lock();
		let seq = state.next_seq;

		state.next_seq += 1;

		if self.sender.send(QueuedTask { seq, job }).is_ok() {
			state.queued += 1;
		}

		drop(state);
		self.shared.publish_load();
	}
}
impl Debug for RequestScheduler {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestScheduler")
			.field("config", &self.shared.config)
			.field("snapshot", &self.snapshot())
			.finish()
	}
}
