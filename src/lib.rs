//! anim-render plays vector animations into caller-owned pixel buffers.
//!
//! - Load an immutable [`Composition`] from JSON and share it across any number of viewers
//! - Bind an [`Animation`] per viewer and render frames into a [`Surface`], synchronously or
//!   through the process-wide task-stealing [`RenderScheduler`]
//! - Stop the pool with [`shutdown_scheduler`] before the process exits
//!
//! Frame requests are relative to the animation's first frame and saturate to its last one, and
//! each instance renders at most one frame at a time.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

/// Keyframed properties and easing.
pub mod animation;
/// Composition model.
pub mod composition;
mod foundation;
/// Per-viewer animation instances.
pub mod instance;
/// Renderers, surfaces, and the render pool.
pub mod render;

pub use crate::animation::anim::{Anim, InterpMode, Keyframe, Keyframes, Lerp};
pub use crate::animation::ease::Ease;
pub use crate::composition::model::{Composition, Layer, LayerInfo, Marker, Shape};
pub use crate::foundation::config::{ENV_QUEUE_CAPACITY, ENV_THREADS, SchedulerConfig};
pub use crate::foundation::core::{
    Affine, BezPath, FrameRate, FrameSpan, Point, Rect, Rgba8, Size, Vec2, pack_argb32,
    unpack_argb32_straight,
};
pub use crate::foundation::error::{RenderError, RenderResult};
pub use crate::instance::Animation;
pub use crate::render::backend::{KEYPATH_ALL, PropertyValue, Renderer};
pub use crate::render::cpu::CpuRenderer;
pub use crate::render::queue::{Pop, TaskQueue};
pub use crate::render::scheduler::{RenderScheduler, SchedulerStats, shutdown_scheduler};
pub use crate::render::surface::{DrawRegion, Surface};
pub use crate::render::task::{RenderFuture, RenderTask, TaskState};
