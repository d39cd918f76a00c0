/// Convenience result type used across the engine.
pub type RenderResult<T> = Result<T, RenderError>;

/// Top-level error taxonomy used by engine APIs.
///
/// Contention on an instance, out-of-range frames and rejected draw regions are not errors; they
/// resolve to an unchanged surface plus a diagnostic.
#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    /// Invalid composition data or surface buffer.
    #[error("validation error: {0}")]
    Validation(String),

    /// Keyframe data that cannot be sampled.
    #[error("animation error: {0}")]
    Animation(String),

    /// Errors when decoding a composition description.
    #[error("serialization error: {0}")]
    Serde(String),

    /// A render was submitted after the scheduler was shut down.
    #[error("render scheduler is shut down")]
    SchedulerShutdown,

    /// The completion slot was dropped before a result was published.
    #[error("render task dropped before completion")]
    TaskDropped,

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RenderError {
    /// Build a [`RenderError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`RenderError::Animation`] value.
    pub fn animation(msg: impl Into<String>) -> Self {
        Self::Animation(msg.into())
    }

    /// Build a [`RenderError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}
