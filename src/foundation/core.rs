use crate::foundation::error::{RenderError, RenderResult};

pub use kurbo::{Affine, BezPath, Point, Rect, Vec2};

/// Inclusive span `[start, end]` of absolute frame indices.
///
/// Both bounds are valid, renderable frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct FrameSpan {
    /// First frame.
    pub start: u64,
    /// Last frame (inclusive).
    pub end: u64,
}

impl FrameSpan {
    /// Create a validated span with `start <= end`.
    pub fn new(start: u64, end: u64) -> RenderResult<Self> {
        if start > end {
            return Err(RenderError::validation(
                "frame span start must be <= end",
            ));
        }
        Ok(Self { start, end })
    }

    /// Number of frame steps between `start` and `end`.
    pub fn len_frames(self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// Return `true` when `f` is inside `[start, end]`.
    pub fn contains(self, f: u64) -> bool {
        self.start <= f && f <= self.end
    }

    /// Map a frame relative to `start` into the span, saturating at both bounds.
    ///
    /// Negative inputs land on `start`; anything past `end - start` lands on `end`.
    pub fn map_relative(self, relative: i64) -> u64 {
        let abs = if relative >= 0 {
            self.start.saturating_add(relative.unsigned_abs())
        } else {
            self.start.saturating_sub(relative.unsigned_abs())
        };
        abs.min(self.end).max(self.start)
    }
}

/// Frames per second. Always finite and strictly positive once validated.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct FrameRate(pub f64);

impl FrameRate {
    /// Create a validated frame rate.
    pub fn new(fps: f64) -> RenderResult<Self> {
        let rate = Self(fps);
        rate.validate()?;
        Ok(rate)
    }

    pub(crate) fn validate(self) -> RenderResult<()> {
        if !self.0.is_finite() || self.0 <= 0.0 {
            return Err(RenderError::validation("frame rate must be finite and > 0"));
        }
        Ok(())
    }

    /// Convert to floating-point FPS.
    pub fn as_f64(self) -> f64 {
        self.0
    }

    /// Convert a frame count to seconds.
    pub fn frames_to_secs(self, frames: u64) -> f64 {
        (frames as f64) / self.0
    }
}

/// Pixel dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Size {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Size {
    /// Build a size from width and height.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Return `true` when either dimension is zero.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Straight-alpha RGBA8 color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Rgba8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    #[serde(default = "opaque")]
    pub a: u8,
}

fn opaque() -> u8 {
    255
}

impl Rgba8 {
    /// Build a color from straight-alpha channels.
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Fully opaque color.
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

/// Pack premultiplied RGBA8 channels into an ARGB32 word (`0xAARRGGBB`).
pub fn pack_argb32(r: u8, g: u8, b: u8, a: u8) -> u32 {
    (u32::from(a) << 24) | (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
}

/// Unpack a premultiplied ARGB32 word into straight-alpha RGBA8 bytes.
pub fn unpack_argb32_straight(px: u32) -> [u8; 4] {
    let a = (px >> 24) as u8;
    if a == 0 {
        return [0, 0, 0, 0];
    }
    let unpremul = |c: u8| -> u8 {
        let v = (u32::from(c) * 255 + u32::from(a) / 2) / u32::from(a);
        v.min(255) as u8
    };
    [
        unpremul((px >> 16) as u8),
        unpremul((px >> 8) as u8),
        unpremul(px as u8),
        a,
    ]
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
