use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use futures::channel::oneshot;

use crate::{
    foundation::error::{RenderError, RenderResult},
    instance::Animation,
    render::surface::Surface,
};

/// Lifecycle of a [`RenderTask`]. States only move forward; there is no cancellation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum TaskState {
    /// Built, not yet handed to the scheduler.
    Created,
    /// Sitting in a worker queue (or about to run inline).
    Queued,
    /// Picked up by a worker.
    Running,
    /// Result published to the completion slot.
    Completed,
}

/// One asynchronous render request plus the producer side of its completion slot.
pub struct RenderTask {
    animation: Arc<Animation>,
    frame: i64,
    surface: Surface,
    keep_aspect_ratio: bool,
    sender: oneshot::Sender<Surface>,
    state: TaskState,
}

impl RenderTask {
    /// Build a task and the future that will receive its surface.
    pub fn new(
        animation: Arc<Animation>,
        frame: i64,
        surface: Surface,
        keep_aspect_ratio: bool,
    ) -> (Self, RenderFuture) {
        let (sender, receiver) = oneshot::channel();
        let task = Self {
            animation,
            frame,
            surface,
            keep_aspect_ratio,
            sender,
            state: TaskState::Created,
        };
        (task, RenderFuture { receiver })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Requested frame, relative to the animation start.
    pub fn frame(&self) -> i64 {
        self.frame
    }

    fn advance(&mut self, next: TaskState) {
        debug_assert!(
            next > self.state,
            "render task moved backwards: {:?} -> {next:?}",
            self.state
        );
        self.state = next;
    }

    pub(crate) fn mark_queued(&mut self) {
        self.advance(TaskState::Queued);
    }

    /// Render and publish the result. Consumes the task; returns the final state.
    pub(crate) fn run(mut self) -> TaskState {
        self.advance(TaskState::Running);
        let Self {
            animation,
            frame,
            surface,
            keep_aspect_ratio,
            sender,
            ..
        } = self;
        let result = animation.render_sync(frame, surface, keep_aspect_ratio);
        if sender.send(result).is_err() {
            tracing::trace!(frame, "render result not observed");
        }
        TaskState::Completed
    }
}

impl std::fmt::Debug for RenderTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderTask")
            .field("frame", &self.frame)
            .field("keep_aspect_ratio", &self.keep_aspect_ratio)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Consumer side of a task's completion slot.
///
/// Resolves exactly once, to the rendered surface or to [`RenderError::TaskDropped`] if the task
/// was destroyed without publishing (for example when its renderer panicked).
#[derive(Debug)]
#[must_use = "a render future does nothing unless awaited or waited on"]
pub struct RenderFuture {
    receiver: oneshot::Receiver<Surface>,
}

impl RenderFuture {
    /// Block the calling thread until the task completes.
    pub fn wait(self) -> RenderResult<Surface> {
        pollster::block_on(self)
    }

    /// Take the result if it is already available, without blocking.
    pub fn try_take(&mut self) -> RenderResult<Option<Surface>> {
        self.receiver
            .try_recv()
            .map_err(|_| RenderError::TaskDropped)
    }
}

impl Future for RenderFuture {
    type Output = RenderResult<Surface>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|res| res.map_err(|_| RenderError::TaskDropped))
    }
}
