/// Environment variable overriding the worker count. `0` selects synchronous execution.
pub const ENV_THREADS: &str = "ANIM_RENDER_THREADS";
/// Environment variable bounding each worker queue.
pub const ENV_QUEUE_CAPACITY: &str = "ANIM_RENDER_QUEUE_CAPACITY";

/// Render pool configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Number of worker threads. `0` runs every task on the submitting thread.
    pub workers: usize,
    /// Per-queue capacity. `None` means unbounded.
    pub queue_capacity: Option<usize>,
    /// Worker threads are named `{prefix}-{index}`.
    pub thread_name_prefix: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            queue_capacity: None,
            thread_name_prefix: "anim-render".to_string(),
        }
    }
}

impl SchedulerConfig {
    /// Synchronous configuration: no worker threads.
    pub fn synchronous() -> Self {
        Self {
            workers: 0,
            ..Self::default()
        }
    }

    /// Default configuration with the given worker count.
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers,
            ..Self::default()
        }
    }

    /// Default configuration with overrides read from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        if let Some(n) = lookup(ENV_THREADS).and_then(|v| v.trim().parse::<usize>().ok()) {
            cfg.workers = n;
        }
        cfg.queue_capacity = lookup(ENV_QUEUE_CAPACITY)
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|&n| n > 0);
        cfg
    }

    /// Return `true` when tasks run on the submitting thread.
    pub fn is_synchronous(&self) -> bool {
        self.workers == 0
    }
}
