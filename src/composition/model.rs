use std::{path::Path, sync::Arc, sync::OnceLock};

use kurbo::Shape as _;

use crate::{
    animation::anim::Anim,
    foundation::core::{Affine, BezPath, FrameRate, FrameSpan, Rgba8, Size, Vec2},
    foundation::error::{RenderError, RenderResult},
};

/// Tolerance used when flattening analytic shapes into paths.
const PATH_TOLERANCE: f64 = 0.1;

/// Immutable animation description shared by every instance rendering from it.
///
/// Frames are absolute indices; `[start_frame, end_frame]` is inclusive. Every deserialized or
/// constructed composition is validated, and it is never mutated afterwards, so it can be read
/// from any number of threads without locking.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "RawComposition")]
pub struct Composition {
    /// Human-readable name.
    #[serde(default)]
    pub name: String,
    /// First frame of the animation.
    pub start_frame: u64,
    /// Last frame of the animation (inclusive).
    pub end_frame: u64,
    /// Playback rate.
    pub frame_rate: FrameRate,
    /// Natural render resolution.
    pub size: Size,
    /// Layers, painted in order (first is bottom-most).
    #[serde(default)]
    pub layers: Vec<Layer>,
    /// Named time ranges.
    #[serde(default)]
    pub markers: Vec<Marker>,
    #[serde(skip)]
    layer_info: OnceLock<Vec<LayerInfo>>,
}

/// Unvalidated wire form of [`Composition`].
#[derive(serde::Deserialize)]
struct RawComposition {
    #[serde(default)]
    name: String,
    start_frame: u64,
    end_frame: u64,
    frame_rate: FrameRate,
    size: Size,
    #[serde(default)]
    layers: Vec<Layer>,
    #[serde(default)]
    markers: Vec<Marker>,
}

impl TryFrom<RawComposition> for Composition {
    type Error = RenderError;

    fn try_from(raw: RawComposition) -> RenderResult<Self> {
        let comp = Self {
            name: raw.name,
            start_frame: raw.start_frame,
            end_frame: raw.end_frame,
            frame_rate: raw.frame_rate,
            size: raw.size,
            layers: raw.layers,
            markers: raw.markers,
            layer_info: OnceLock::new(),
        };
        comp.validate()?;
        Ok(comp)
    }
}

/// One painted layer.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Layer {
    /// Layer name, used as the keypath for property overrides.
    pub name: String,
    /// First frame the layer is visible. Defaults to the composition start.
    #[serde(default)]
    pub in_frame: Option<u64>,
    /// Frame the layer stops being visible (exclusive). Defaults to after the composition end.
    #[serde(default)]
    pub out_frame: Option<u64>,
    /// Geometry in composition space.
    pub shape: Shape,
    /// Fill color.
    pub fill: Rgba8,
    /// Opacity in `[0, 1]`; sampled values are clamped.
    #[serde(default = "full_opacity")]
    pub opacity: Anim<f64>,
    /// Translation applied after scaling.
    #[serde(default = "no_offset")]
    pub position: Anim<Vec2>,
    /// Per-axis scale around the composition origin.
    #[serde(default = "unit_scale")]
    pub scale: Anim<Vec2>,
}

fn full_opacity() -> Anim<f64> {
    Anim::Constant(1.0)
}

fn no_offset() -> Anim<Vec2> {
    Anim::Constant(Vec2::ZERO)
}

fn unit_scale() -> Anim<Vec2> {
    Anim::Constant(Vec2::new(1.0, 1.0))
}

/// Layer geometry.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    /// Axis-aligned rectangle, optionally with rounded corners.
    Rect {
        /// Left edge.
        x: f64,
        /// Top edge.
        y: f64,
        /// Width.
        width: f64,
        /// Height.
        height: f64,
        /// Corner radius.
        #[serde(default)]
        radius: f64,
    },
    /// Axis-aligned ellipse.
    Ellipse {
        /// Center x.
        cx: f64,
        /// Center y.
        cy: f64,
        /// Horizontal radius.
        rx: f64,
        /// Vertical radius.
        ry: f64,
    },
    /// SVG path data (`d` attribute syntax).
    Path {
        /// Path data.
        d: String,
    },
}

impl Shape {
    /// Build the outline as a path in composition space.
    pub fn to_bezpath(&self) -> RenderResult<BezPath> {
        match self {
            Self::Rect {
                x,
                y,
                width,
                height,
                radius,
            } => {
                if *width < 0.0 || *height < 0.0 {
                    return Err(RenderError::validation("rect width/height must be >= 0"));
                }
                let rect = kurbo::Rect::new(*x, *y, x + width, y + height);
                if *radius > 0.0 {
                    Ok(rect.to_rounded_rect(*radius).to_path(PATH_TOLERANCE))
                } else {
                    Ok(rect.to_path(PATH_TOLERANCE))
                }
            }
            Self::Ellipse { cx, cy, rx, ry } => {
                if *rx < 0.0 || *ry < 0.0 {
                    return Err(RenderError::validation("ellipse radii must be >= 0"));
                }
                Ok(
                    kurbo::Ellipse::new((*cx, *cy), Vec2::new(*rx, *ry), 0.0)
                        .to_path(PATH_TOLERANCE),
                )
            }
            Self::Path { d } => BezPath::from_svg(d)
                .map_err(|e| RenderError::validation(format!("invalid path data: {e}"))),
        }
    }
}

/// Named time range inside the animation.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Marker {
    /// Marker name.
    pub name: String,
    /// First frame.
    pub start_frame: u64,
    /// Last frame (inclusive). Defaults to `start_frame`.
    #[serde(default)]
    pub end_frame: Option<u64>,
}

/// Resolved visibility range of a layer.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct LayerInfo {
    /// Layer name.
    pub name: String,
    /// First visible frame.
    pub in_frame: u64,
    /// First frame the layer is no longer visible.
    pub out_frame: u64,
}

/// Per-frame sampled layer state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayerSample {
    /// Layer transform in composition space.
    pub transform: Affine,
    /// Opacity in `[0, 1]`.
    pub opacity: f64,
}

impl Layer {
    /// Resolved `[in, out)` visibility range.
    pub fn visibility(&self, span: FrameSpan) -> (u64, u64) {
        let in_frame = self.in_frame.unwrap_or(span.start);
        let out_frame = self
            .out_frame
            .unwrap_or_else(|| span.end.saturating_add(1));
        (in_frame, out_frame)
    }

    /// Sample the layer at an absolute frame. `None` when the layer is hidden.
    pub fn sample(&self, span: FrameSpan, frame: u64) -> RenderResult<Option<LayerSample>> {
        let (in_frame, out_frame) = self.visibility(span);
        if frame < in_frame || frame >= out_frame {
            return Ok(None);
        }
        let opacity = self.opacity.sample(frame)?.clamp(0.0, 1.0);
        let position = self.position.sample(frame)?;
        let scale = self.scale.sample(frame)?;
        Ok(Some(LayerSample {
            transform: Affine::translate(position) * Affine::scale_non_uniform(scale.x, scale.y),
            opacity,
        }))
    }

    fn validate(&self) -> RenderResult<()> {
        if let (Some(i), Some(o)) = (self.in_frame, self.out_frame) {
            if i > o {
                return Err(RenderError::validation(format!(
                    "layer '{}' has in_frame > out_frame",
                    self.name
                )));
            }
        }
        self.opacity.validate()?;
        self.position.validate()?;
        self.scale.validate()?;
        self.shape.to_bezpath().map_err(|e| {
            RenderError::validation(format!("layer '{}': {e}", self.name))
        })?;
        Ok(())
    }
}

impl Composition {
    /// Build and validate a composition in code.
    pub fn new(
        start_frame: u64,
        end_frame: u64,
        frame_rate: f64,
        size: Size,
        layers: Vec<Layer>,
    ) -> RenderResult<Arc<Self>> {
        let comp = Self {
            name: String::new(),
            start_frame,
            end_frame,
            frame_rate: FrameRate(frame_rate),
            size,
            layers,
            markers: Vec::new(),
            layer_info: OnceLock::new(),
        };
        comp.validate()?;
        Ok(Arc::new(comp))
    }

    /// Decode and validate a JSON description.
    pub fn from_json_str(json: &str) -> RenderResult<Arc<Self>> {
        Self::from_json_slice(json.as_bytes())
    }

    /// Decode and validate a JSON description from bytes.
    pub fn from_json_slice(json: &[u8]) -> RenderResult<Arc<Self>> {
        if json.iter().all(u8::is_ascii_whitespace) {
            return Err(RenderError::validation("composition data is empty"));
        }
        let comp: Self =
            serde_json::from_slice(json).map_err(|e| RenderError::serde(e.to_string()))?;
        Ok(Arc::new(comp))
    }

    /// Read, decode and validate a JSON description from disk.
    pub fn from_path(path: impl AsRef<Path>) -> RenderResult<Arc<Self>> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            RenderError::validation(format!("failed to read '{}': {e}", path.display()))
        })?;
        Self::from_json_slice(&bytes)
    }

    /// Check the invariants every renderer relies on.
    pub fn validate(&self) -> RenderResult<()> {
        FrameSpan::new(self.start_frame, self.end_frame)?;
        self.frame_rate.validate()?;
        if self.size.is_empty() {
            return Err(RenderError::validation("composition size must be > 0"));
        }
        for layer in &self.layers {
            layer.validate()?;
        }
        for m in &self.markers {
            if m.end_frame.is_some_and(|e| e < m.start_frame) {
                return Err(RenderError::validation(format!(
                    "marker '{}' ends before it starts",
                    m.name
                )));
            }
        }
        Ok(())
    }

    /// The inclusive frame span.
    pub fn span(&self) -> FrameSpan {
        FrameSpan {
            start: self.start_frame,
            end: self.end_frame,
        }
    }

    /// First frame.
    pub fn start_frame(&self) -> u64 {
        self.start_frame
    }

    /// Last frame (inclusive).
    pub fn end_frame(&self) -> u64 {
        self.end_frame
    }

    /// Natural render resolution.
    pub fn size(&self) -> Size {
        self.size
    }

    /// Frames per second.
    pub fn frame_rate(&self) -> f64 {
        self.frame_rate.as_f64()
    }

    /// Number of renderable frames.
    pub fn total_frame(&self) -> u64 {
        self.end_frame.saturating_sub(self.start_frame) + 1
    }

    /// Playback length in seconds.
    pub fn duration(&self) -> f64 {
        self.frame_rate.frames_to_secs(self.total_frame())
    }

    /// Frame relative to the start for a normalized position in `[0, 1]`.
    pub fn frame_at_pos(&self, pos: f64) -> u64 {
        let pos = if pos.is_nan() { 0.0 } else { pos.clamp(0.0, 1.0) };
        (pos * self.span().len_frames() as f64).round() as u64
    }

    /// Resolved layer visibility ranges, computed once.
    pub fn layer_info_list(&self) -> &[LayerInfo] {
        self.layer_info.get_or_init(|| {
            let span = self.span();
            self.layers
                .iter()
                .map(|l| {
                    let (in_frame, out_frame) = l.visibility(span);
                    LayerInfo {
                        name: l.name.clone(),
                        in_frame,
                        out_frame,
                    }
                })
                .collect()
        })
    }

    /// Named time ranges.
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }
}

#[cfg(test)]
#[path = "../../tests/unit/composition/model.rs"]
mod tests;
