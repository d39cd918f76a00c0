//! Rasterization and the asynchronous render pool.
//!
//! An [`Animation`](crate::Animation) paints through a [`backend::Renderer`]. Asynchronous
//! requests become [`task::RenderTask`]s executed by the task-stealing
//! [`scheduler::RenderScheduler`].

/// Renderer trait and property overrides.
pub mod backend;
/// CPU renderer built on `vello_cpu`.
pub mod cpu;
/// Blocking FIFO used as a per-worker queue.
pub mod queue;
/// Worker pool with round-robin submission and stealing.
pub mod scheduler;
/// Caller-owned ARGB32 pixel buffers.
pub mod surface;
/// Render requests and their completion futures.
pub mod task;
