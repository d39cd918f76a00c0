use crate::{
    foundation::{core::Rgba8, error::RenderResult},
    render::surface::Surface,
};

/// Keypath that addresses every layer.
pub const KEYPATH_ALL: &str = "**";

/// Property override applied to the layers a keypath selects.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PropertyValue {
    /// Replace the fill color.
    FillColor(Rgba8),
    /// Replace the opacity (clamped to `[0, 1]`).
    Opacity(f64),
}

/// Paints frames of one composition into surfaces.
///
/// A renderer carries mutable per-instance state (caches, overrides). It is only ever driven by
/// one thread at a time: the owning [`Animation`](crate::Animation) serializes access through
/// its render guard.
pub trait Renderer: Send {
    /// Paint absolute frame `frame` into the surface's draw region, fitting the composition to
    /// the region.
    fn paint(&mut self, frame: u64, surface: &mut Surface, keep_aspect_ratio: bool)
    -> RenderResult<()>;

    /// Paint absolute frame `frame` laid out for the full surface, writing only the draw region.
    ///
    /// The region's position is the origin into the frame, so painting a band produces the same
    /// pixels as the matching band of a full paint with the aspect ratio kept.
    fn paint_partial(&mut self, frame: u64, surface: &mut Surface) -> RenderResult<()>;

    /// Install a property override for the layers `keypath` selects.
    fn set_value(&mut self, keypath: &str, value: PropertyValue) {
        let _ = (keypath, value);
    }
}

/// Return `true` when `keypath` selects a layer named `layer`.
pub fn keypath_matches(keypath: &str, layer: &str) -> bool {
    keypath == KEYPATH_ALL || keypath == layer
}
