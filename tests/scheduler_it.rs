// std
use std::{
	io,
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};
// crates.io
use parking_lot::Mutex;
use tokio::time::{Instant, sleep};
// self
use service_account_broker::{
	error::TaskError,
	scheduler::{RequestScheduler, SchedulerConfig},
};

#[derive(Clone, Debug, Default)]
struct Overlap {
	current: Arc<AtomicUsize>,
	peak: Arc<AtomicUsize>,
}
impl Overlap {
	fn enter(&self) {
		let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;

		self.peak.fetch_max(now, Ordering::SeqCst);
	}

	fn exit(&self) {
		self.current.fetch_sub(1, Ordering::SeqCst);
	}

	fn peak(&self) -> usize {
		self.peak.load(Ordering::SeqCst)
	}
}

async fn explode() -> Result<(), io::Error> {
	panic!("operation blew up");
}

fn scheduler(max_concurrent: usize, min_interval_ms: u64) -> RequestScheduler {
	RequestScheduler::new(
		SchedulerConfig::default()
			.with_max_concurrent(max_concurrent)
			.with_min_interval_ms(min_interval_ms),
	)
	.expect("Scheduler config should be valid.")
}

#[tokio::test(start_paused = true)]
async fn running_tasks_never_exceed_the_cap() {
	let scheduler = scheduler(2, 0);
	let overlap = Overlap::default();
	let pending = (0..5)
		.map(|i| {
			let overlap = overlap.clone();

			scheduler.execute(move || async move {
				overlap.enter();
				sleep(Duration::from_millis(50)).await;
				overlap.exit();

				Ok::<_, io::Error>(i)
			})
		})
		.collect::<Vec<_>>();

	for (i, task) in pending.into_iter().enumerate() {
		assert_eq!(task.await.expect("Task should succeed."), i);
	}

	assert_eq!(overlap.peak(), 2);
	assert_eq!(scheduler.snapshot().dispatched, 5);
}

#[tokio::test(start_paused = true)]
async fn dispatches_are_spaced_by_the_minimum_interval() {
	let scheduler = scheduler(1, 100);
	let origin = Instant::now();
	let pending = (0..5)
		.map(|_| scheduler.execute(|| async { Ok::<_, io::Error>(Instant::now()) }))
		.collect::<Vec<_>>();
	let mut starts = Vec::new();

	for task in pending {
		starts.push(task.await.expect("Task should succeed."));
	}

	for pair in starts.windows(2) {
		assert!(pair[1] - pair[0] >= Duration::from_millis(100), "Starts were {starts:?}.");
	}

	assert!(origin.elapsed() >= Duration::from_millis(400));
}

#[tokio::test(start_paused = true)]
async fn pacing_is_global_across_free_slots() {
	let scheduler = scheduler(5, 100);
	let pending = (0..3)
		.map(|_| scheduler.execute(|| async { Ok::<_, io::Error>(Instant::now()) }))
		.collect::<Vec<_>>();
	let mut starts = Vec::new();

	for task in pending {
		starts.push(task.await.expect("Task should succeed."));
	}

	assert!(starts[2] - starts[0] >= Duration::from_millis(200));
}

#[tokio::test(start_paused = true)]
async fn tasks_start_in_submission_order() {
	let scheduler = scheduler(1, 0);
	let order = Arc::new(Mutex::new(Vec::new()));
	let pending = (0..5)
		.map(|i| {
			let order = order.clone();

			scheduler.execute(move || async move {
				order.lock().push(i);

				Ok::<_, io::Error>(())
			})
		})
		.collect::<Vec<_>>();

	for task in pending {
		task.await.expect("Task should succeed.");
	}

	assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4]);
}

#[tokio::test(start_paused = true)]
async fn failing_tasks_do_not_block_the_queue() {
	let scheduler = scheduler(1, 10);
	let failing = scheduler.execute(|| async { Err::<(), _>(io::Error::other("quota exceeded")) });
	let following = scheduler.execute(|| async { Ok::<_, io::Error>("next") });
	let err = failing.await.expect_err("The failing task should report its error.");

	assert!(matches!(&err, TaskError::Operation(e) if e.to_string() == "quota exceeded"));
	assert_eq!(following.await.expect("The queue should keep draining."), "next");
	assert_eq!(scheduler.snapshot().queued, 0);
}

#[tokio::test(start_paused = true)]
async fn panicking_tasks_are_reported_as_abandoned() {
	let scheduler = scheduler(1, 0);
	let panicking = scheduler.execute(explode);
	let following = scheduler.execute(|| async { Ok::<_, io::Error>(42) });

	assert!(panicking.await.expect_err("A panicking task must not settle.").is_abandoned());
	assert_eq!(following.await.expect("The slot should be released after a panic."), 42);
}

#[tokio::test(start_paused = true)]
async fn dropped_futures_still_run_their_task() {
	let scheduler = scheduler(1, 0);
	let ran = Arc::new(AtomicUsize::new(0));

	{
		let ran = ran.clone();

		drop(scheduler.execute(move || async move {
			ran.fetch_add(1, Ordering::SeqCst);

			Ok::<_, io::Error>(())
		}));
	}

	scheduler
		.execute(|| async { Ok::<_, io::Error>(()) })
		.await
		.expect("Follow-up task should succeed.");

	assert_eq!(ran.load(Ordering::SeqCst), 1);
}
