//! Task-stealing render pool.
//!
//! Every worker owns one FIFO queue. Submissions are spread over the queues round-robin. A worker
//! first drains its own queue, then probes its peers starting with the next index and steals the
//! first task it finds. When nothing is stealable it blocks on its own queue. Enqueuing while any
//! worker is idle nudges the other queues, so idle workers retry stealing and a skewed queue still
//! gets drained by everyone.

use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{
        Arc, Mutex, OnceLock, PoisonError,
        atomic::{self, AtomicBool, AtomicU64, AtomicUsize, Ordering},
    },
    thread::{self, JoinHandle},
};

use crate::{
    foundation::{
        config::SchedulerConfig,
        error::{RenderError, RenderResult},
    },
    instance::Animation,
    render::{
        queue::{Pop, TaskQueue},
        surface::Surface,
        task::{RenderFuture, RenderTask},
    },
};

static GLOBAL: OnceLock<RenderScheduler> = OnceLock::new();

/// Stop the process-wide scheduler if it was ever started.
///
/// Idempotent. Tasks queued before the call still complete; later submissions are rejected with
/// [`RenderError::SchedulerShutdown`]. Callers must make sure no submission races this call.
pub fn shutdown_scheduler() {
    if let Some(scheduler) = GLOBAL.get() {
        scheduler.shutdown();
    }
}

/// Snapshot of scheduler counters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Tasks executed by each worker, by worker index.
    pub executed_per_worker: Vec<u64>,
    /// Tasks a worker took from a peer's queue.
    pub steals: u64,
    /// Tasks executed inline on the submitting thread.
    pub inline: u64,
    /// Times an idle worker woke up without finding a task in its own queue.
    pub idle_wakeups: u64,
}

impl SchedulerStats {
    /// Total tasks executed.
    pub fn executed(&self) -> u64 {
        self.executed_per_worker.iter().sum::<u64>() + self.inline
    }
}

struct Shared {
    queues: Vec<TaskQueue<RenderTask>>,
    executed: Vec<AtomicU64>,
    steals: AtomicU64,
    inline: AtomicU64,
    idle: AtomicUsize,
    idle_wakeups: AtomicU64,
}

impl Shared {
    fn new(workers: usize, capacity: Option<usize>) -> Self {
        Self {
            queues: (0..workers)
                .map(|_| TaskQueue::with_capacity(capacity))
                .collect(),
            executed: (0..workers).map(|_| AtomicU64::new(0)).collect(),
            steals: AtomicU64::new(0),
            inline: AtomicU64::new(0),
            idle: AtomicUsize::new(0),
            idle_wakeups: AtomicU64::new(0),
        }
    }

    /// Nudge every queue but `target` if some worker is parked or about to park.
    fn wake_idle(&self, target: usize) {
        atomic::fence(Ordering::SeqCst);
        if self.idle.load(Ordering::SeqCst) == 0 {
            return;
        }
        for (i, q) in self.queues.iter().enumerate() {
            if i != target {
                q.nudge();
            }
        }
    }
}

/// Fixed pool of render workers.
pub struct RenderScheduler {
    shared: Arc<Shared>,
    next: AtomicUsize,
    running: AtomicBool,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl RenderScheduler {
    /// Start a pool. `config.workers == 0` runs every task inline on the submitting thread.
    pub fn new(config: SchedulerConfig) -> RenderResult<Self> {
        let workers = config.workers;
        let shared = Arc::new(Shared::new(workers, config.queue_capacity));
        let scheduler = Self {
            shared,
            next: AtomicUsize::new(0),
            running: AtomicBool::new(true),
            threads: Mutex::new(Vec::with_capacity(workers)),
        };

        for index in 0..workers {
            let shared = Arc::clone(&scheduler.shared);
            let spawned = thread::Builder::new()
                .name(format!("{}-{index}", config.thread_name_prefix))
                .spawn(move || worker_loop(&shared, index));
            match spawned {
                Ok(handle) => scheduler.lock_threads().push(handle),
                Err(e) => {
                    scheduler.shutdown();
                    return Err(RenderError::Other(
                        anyhow::Error::new(e).context("spawn render worker"),
                    ));
                }
            }
        }

        tracing::debug!(workers, capacity = ?config.queue_capacity, "render scheduler started");
        Ok(scheduler)
    }

    fn inline_only() -> Self {
        Self {
            shared: Arc::new(Shared::new(0, None)),
            next: AtomicUsize::new(0),
            running: AtomicBool::new(true),
            threads: Mutex::new(Vec::new()),
        }
    }

    /// The process-wide scheduler, started on first use from [`SchedulerConfig::from_env`].
    ///
    /// Falls back to inline execution if worker threads cannot be spawned.
    pub fn global() -> &'static RenderScheduler {
        GLOBAL.get_or_init(|| {
            RenderScheduler::new(SchedulerConfig::from_env()).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "render workers unavailable, rendering inline");
                RenderScheduler::inline_only()
            })
        })
    }

    fn lock_threads(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.threads.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of worker threads. Zero in inline mode.
    pub fn workers(&self) -> usize {
        self.shared.queues.len()
    }

    /// Worker threads not yet joined. Zero after [`RenderScheduler::shutdown`] returns.
    pub fn live_threads(&self) -> usize {
        self.lock_threads().len()
    }

    /// Return `true` until [`RenderScheduler::shutdown`] is called.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Queue a render of `frame` (relative) on `animation`.
    pub fn submit(
        &self,
        animation: Arc<Animation>,
        frame: i64,
        surface: Surface,
        keep_aspect_ratio: bool,
    ) -> RenderResult<RenderFuture> {
        let (task, future) = RenderTask::new(animation, frame, surface, keep_aspect_ratio);
        self.dispatch(task)?;
        Ok(future)
    }

    fn dispatch(&self, mut task: RenderTask) -> RenderResult<()> {
        if !self.is_running() {
            return Err(RenderError::SchedulerShutdown);
        }
        task.mark_queued();

        let queues = &self.shared.queues;
        let count = queues.len();
        if count == 0 {
            self.shared.inline.fetch_add(1, Ordering::Relaxed);
            execute(task);
            return Ok(());
        }

        let start = self.next.fetch_add(1, Ordering::Relaxed);
        for n in 0..count {
            let index = (start + n) % count;
            match queues[index].try_push(task) {
                Ok(()) => {
                    self.shared.wake_idle(index);
                    return Ok(());
                }
                Err(t) => task = t,
            }
        }
        self.push_blocking(start % count, task)
    }

    fn push_blocking(&self, index: usize, task: RenderTask) -> RenderResult<()> {
        self.shared.queues[index]
            .push(task)
            .map_err(|_| RenderError::SchedulerShutdown)?;
        self.shared.wake_idle(index);
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn dispatch_to(&self, index: usize, mut task: RenderTask) -> RenderResult<()> {
        task.mark_queued();
        self.push_blocking(index, task)
    }

    /// Stop accepting work, let workers drain their queues, and join them.
    ///
    /// Safe to call repeatedly and on a scheduler that never received a task.
    pub fn shutdown(&self) {
        if self.running.swap(false, Ordering::AcqRel) {
            tracing::debug!(workers = self.workers(), "render scheduler stopping");
        }
        for q in &self.shared.queues {
            q.done();
        }

        let mut threads = self.lock_threads();
        let current = thread::current().id();
        for handle in threads.drain(..) {
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                tracing::error!("render worker exited with a panic");
            }
        }
    }

    /// Current counters.
    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            executed_per_worker: self
                .shared
                .executed
                .iter()
                .map(|c| c.load(Ordering::Relaxed))
                .collect(),
            steals: self.shared.steals.load(Ordering::Relaxed),
            inline: self.shared.inline.load(Ordering::Relaxed),
            idle_wakeups: self.shared.idle_wakeups.load(Ordering::Relaxed),
        }
    }
}

impl Drop for RenderScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for RenderScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderScheduler")
            .field("workers", &self.workers())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

fn worker_loop(shared: &Shared, index: usize) {
    let own = &shared.queues[index];
    loop {
        if let Some(task) = own.try_pop().or_else(|| steal(shared, index)) {
            run_counted(shared, index, task);
            continue;
        }

        // Announce idleness before the last steal attempt: a submitter either sees the count and
        // nudges, or pushed early enough for that attempt to find the task.
        shared.idle.fetch_add(1, Ordering::SeqCst);
        atomic::fence(Ordering::SeqCst);
        let popped = match own.try_pop().or_else(|| steal(shared, index)) {
            Some(task) => Pop::Item(task),
            None => own.wait_pop(),
        };
        shared.idle.fetch_sub(1, Ordering::SeqCst);

        match popped {
            Pop::Item(task) => run_counted(shared, index, task),
            Pop::Woken | Pop::Timeout => {
                shared.idle_wakeups.fetch_add(1, Ordering::Relaxed);
            }
            Pop::Closed => break,
        }
    }
    tracing::trace!(index, "render worker exiting");
}

fn run_counted(shared: &Shared, index: usize, task: RenderTask) {
    execute(task);
    shared.executed[index].fetch_add(1, Ordering::Relaxed);
}

/// Probe peers round-robin starting after `index`, up to twice around the pool.
fn steal(shared: &Shared, index: usize) -> Option<RenderTask> {
    let count = shared.queues.len();
    for n in 1..=2 * count {
        let peer = (index + n) % count;
        if let Some(task) = shared.queues[peer].try_pop() {
            if peer != index {
                shared.steals.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(worker = index, peer, "stole render task");
            }
            return Some(task);
        }
    }
    None
}

fn execute(task: RenderTask) {
    let frame = task.frame();
    if catch_unwind(AssertUnwindSafe(|| task.run())).is_err() {
        tracing::error!(frame, "renderer panicked, task dropped");
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/scheduler.rs"]
mod tests;
