use std::{
    path::Path,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};

use crate::{
    composition::model::{Composition, LayerInfo, Marker},
    foundation::{core::Size, error::RenderResult},
    render::{
        backend::{PropertyValue, Renderer},
        cpu::CpuRenderer,
        scheduler::RenderScheduler,
        surface::Surface,
        task::RenderFuture,
    },
};

/// Per-viewer playback state bound to one [`Composition`].
///
/// The composition is shared; the renderer and its caches belong to this instance alone. At most
/// one render runs on an instance at a time: a render that finds another one in flight is refused
/// and hands the caller's surface back untouched. Refusals are not queued or retried.
pub struct Animation {
    comp: Arc<Composition>,
    renderer: Mutex<Box<dyn Renderer>>,
    in_progress: AtomicBool,
}

/// Holds an instance's render-in-progress flag; clears it on drop.
struct RenderGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for RenderGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl Animation {
    /// Bind a new instance to `comp` with the default CPU renderer.
    pub fn new(comp: Arc<Composition>) -> Self {
        let renderer = CpuRenderer::new(Arc::clone(&comp));
        Self::with_renderer(comp, Box::new(renderer))
    }

    /// Bind a new instance to `comp` with a custom renderer.
    pub fn with_renderer(comp: Arc<Composition>, renderer: Box<dyn Renderer>) -> Self {
        Self {
            comp,
            renderer: Mutex::new(renderer),
            in_progress: AtomicBool::new(false),
        }
    }

    /// Load a JSON composition and bind an instance to it. `None` for empty or invalid data.
    pub fn load_from_data(data: &str) -> Option<Self> {
        if data.trim().is_empty() {
            tracing::warn!("composition data is empty");
            return None;
        }
        match Composition::from_json_str(data) {
            Ok(comp) => Some(Self::new(comp)),
            Err(e) => {
                tracing::warn!(error = %e, "failed to load composition");
                None
            }
        }
    }

    /// Load a JSON composition from disk and bind an instance to it.
    pub fn load_from_file(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            tracing::warn!("composition path is empty");
            return None;
        }
        match Composition::from_path(path) {
            Ok(comp) => Some(Self::new(comp)),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to load composition");
                None
            }
        }
    }

    /// The shared composition.
    pub fn composition(&self) -> &Arc<Composition> {
        &self.comp
    }

    /// Natural render resolution.
    pub fn size(&self) -> Size {
        self.comp.size()
    }

    /// Playback length in seconds.
    pub fn duration(&self) -> f64 {
        self.comp.duration()
    }

    /// Frames per second.
    pub fn frame_rate(&self) -> f64 {
        self.comp.frame_rate()
    }

    /// Number of renderable frames.
    pub fn total_frame(&self) -> u64 {
        self.comp.total_frame()
    }

    /// Frame (relative to the start) for a normalized position in `[0, 1]`.
    pub fn frame_at_pos(&self, pos: f64) -> u64 {
        self.comp.frame_at_pos(pos)
    }

    /// Layer visibility ranges.
    pub fn layers(&self) -> &[LayerInfo] {
        self.comp.layer_info_list()
    }

    /// Named time ranges.
    pub fn markers(&self) -> &[Marker] {
        self.comp.markers()
    }

    /// Map a frame relative to the animation's first frame onto an absolute, renderable frame.
    ///
    /// Out-of-range requests saturate to the first or last frame; this never fails.
    pub fn map_frame(&self, requested: i64) -> u64 {
        self.comp.span().map_relative(requested)
    }

    /// Return `true` while a render holds this instance.
    pub fn is_rendering(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    fn try_begin_render(&self) -> Option<RenderGuard<'_>> {
        self.in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RenderGuard {
                flag: &self.in_progress,
            })
    }

    fn with_renderer_locked<R>(&self, f: impl FnOnce(&mut dyn Renderer) -> R) -> R {
        let mut renderer = self.renderer.lock().unwrap_or_else(PoisonError::into_inner);
        f(renderer.as_mut())
    }

    /// Render `frame` (relative) into `surface`'s draw region on the calling thread.
    ///
    /// Returns the surface, unmodified if the instance is already rendering or the draw region is
    /// empty.
    #[tracing::instrument(level = "trace", skip(self, surface))]
    pub fn render_sync(&self, frame: i64, mut surface: Surface, keep_aspect_ratio: bool) -> Surface {
        let Some(_guard) = self.try_begin_render() else {
            tracing::warn!("render already in progress for this animation, request dropped");
            return surface;
        };
        if surface.is_empty() {
            return surface;
        }
        let abs = self.map_frame(frame);
        let res = self.with_renderer_locked(|r| r.paint(abs, &mut surface, keep_aspect_ratio));
        if let Err(e) = res {
            tracing::error!(frame = abs, error = %e, "render failed");
        }
        surface
    }

    /// Render `frame` (relative) into the surface's draw region only, laying the frame out for
    /// the full surface and using the region's offset as the origin into it.
    #[tracing::instrument(level = "trace", skip(self, surface))]
    pub fn render_partial_sync(&self, frame: i64, mut surface: Surface) -> Surface {
        let Some(_guard) = self.try_begin_render() else {
            tracing::warn!("render already in progress for this animation, request dropped");
            return surface;
        };
        if surface.is_empty() {
            return surface;
        }
        let abs = self.map_frame(frame);
        let res = self.with_renderer_locked(|r| r.paint_partial(abs, &mut surface));
        if let Err(e) = res {
            tracing::error!(frame = abs, error = %e, "partial render failed");
        }
        surface
    }

    /// Queue a render on the process-wide scheduler.
    ///
    /// The instance stays alive until the task completes. Fails only after
    /// [`shutdown_scheduler`](crate::shutdown_scheduler).
    pub fn render_async(
        self: &Arc<Self>,
        frame: i64,
        surface: Surface,
        keep_aspect_ratio: bool,
    ) -> RenderResult<RenderFuture> {
        RenderScheduler::global().submit(Arc::clone(self), frame, surface, keep_aspect_ratio)
    }

    /// Override a property on the layers `keypath` selects (`"**"` for all). Empty keypaths are
    /// ignored.
    ///
    /// Waits for an in-flight render on this instance to finish.
    pub fn set_value(&self, keypath: &str, value: PropertyValue) {
        if keypath.is_empty() {
            return;
        }
        self.with_renderer_locked(|r| r.set_value(keypath, value));
    }
}

impl std::fmt::Debug for Animation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Animation")
            .field("start_frame", &self.comp.start_frame())
            .field("end_frame", &self.comp.end_frame())
            .field("rendering", &self.is_rendering())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "../tests/unit/instance.rs"]
mod tests;
