use crate::foundation::{
    core::{Size, unpack_argb32_straight},
    error::{RenderError, RenderResult},
};

/// Rectangle inside a surface that a renderer is allowed to touch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct DrawRegion {
    /// Left column.
    pub x: usize,
    /// Top row.
    pub y: usize,
    /// Width in pixels.
    pub width: usize,
    /// Height in pixels.
    pub height: usize,
}

/// Caller-owned pixel buffer plus the region a render may write.
///
/// Pixels are premultiplied ARGB32 (`0xAARRGGBB`), one `u32` per pixel, rows `bytes_per_line`
/// apart. The surface moves into a render call and comes back out of it, so the buffer has exactly
/// one owner at any time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Surface {
    buffer: Vec<u32>,
    width: usize,
    height: usize,
    bytes_per_line: usize,
    region: DrawRegion,
}

impl Surface {
    /// Allocate a zeroed, tightly packed surface.
    ///
    /// # Panics
    ///
    /// Panics when the pixel count or the stride in bytes overflows. Use [`Surface::try_new`] for
    /// sizes that come from untrusted input.
    pub fn new(width: usize, height: usize) -> Self {
        match Self::try_new(width, height) {
            Ok(surface) => surface,
            Err(e) => panic!("{e}"),
        }
    }

    /// Allocate a zeroed, tightly packed surface, rejecting sizes whose buffer cannot be addressed.
    pub fn try_new(width: usize, height: usize) -> RenderResult<Self> {
        let overflow = || {
            RenderError::validation(format!("surface dimensions {width}x{height} overflow"))
        };
        let pixels = width.checked_mul(height).ok_or_else(overflow)?;
        let bytes_per_line = width.checked_mul(4).ok_or_else(overflow)?;
        if pixels > isize::MAX as usize / 4 {
            return Err(overflow());
        }
        Ok(Self {
            buffer: vec![0; pixels],
            width,
            height,
            bytes_per_line,
            region: DrawRegion {
                x: 0,
                y: 0,
                width,
                height,
            },
        })
    }

    /// Wrap an existing buffer.
    ///
    /// `bytes_per_line` must be a multiple of 4, cover at least `width` pixels, and the buffer must
    /// hold `height` rows of that stride.
    pub fn from_buffer(
        buffer: Vec<u32>,
        width: usize,
        height: usize,
        bytes_per_line: usize,
    ) -> RenderResult<Self> {
        if bytes_per_line % 4 != 0 {
            return Err(RenderError::validation(
                "bytes_per_line must be a multiple of 4",
            ));
        }
        if bytes_per_line / 4 < width {
            return Err(RenderError::validation(
                "bytes_per_line is smaller than one row",
            ));
        }
        let needed = (bytes_per_line / 4)
            .checked_mul(height)
            .ok_or_else(|| RenderError::validation("surface dimensions overflow"))?;
        if buffer.len() < needed {
            return Err(RenderError::validation(format!(
                "surface buffer holds {} pixels, needs {needed}",
                buffer.len()
            )));
        }
        Ok(Self {
            buffer,
            width,
            height,
            bytes_per_line,
            region: DrawRegion {
                x: 0,
                y: 0,
                width,
                height,
            },
        })
    }

    /// Restrict rendering to a sub-rectangle.
    ///
    /// Returns `false` and leaves the current region untouched when the rectangle does not fit.
    pub fn set_draw_region(&mut self, x: usize, y: usize, width: usize, height: usize) -> bool {
        let fits_x = x.checked_add(width).is_some_and(|r| r <= self.width);
        let fits_y = y.checked_add(height).is_some_and(|b| b <= self.height);
        if !fits_x || !fits_y {
            tracing::warn!(
                x,
                y,
                width,
                height,
                surface_width = self.width,
                surface_height = self.height,
                "draw region out of bounds, ignored"
            );
            return false;
        }
        self.region = DrawRegion {
            x,
            y,
            width,
            height,
        };
        true
    }

    /// Full buffer width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Full buffer height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Row stride in bytes.
    pub fn bytes_per_line(&self) -> usize {
        self.bytes_per_line
    }

    /// Current draw region.
    pub fn draw_region(&self) -> DrawRegion {
        self.region
    }

    /// Draw region width.
    pub fn draw_region_width(&self) -> usize {
        self.region.width
    }

    /// Draw region height.
    pub fn draw_region_height(&self) -> usize {
        self.region.height
    }

    /// Draw region left column.
    pub fn draw_region_pos_x(&self) -> usize {
        self.region.x
    }

    /// Draw region top row.
    pub fn draw_region_pos_y(&self) -> usize {
        self.region.y
    }

    /// Return `true` when there is nothing a render could write.
    pub fn is_empty(&self) -> bool {
        self.region.width == 0 || self.region.height == 0
    }

    pub(crate) fn region_size(&self) -> Option<Size> {
        let w = u32::try_from(self.region.width).ok()?;
        let h = u32::try_from(self.region.height).ok()?;
        Some(Size::new(w, h))
    }

    fn stride(&self) -> usize {
        self.bytes_per_line / 4
    }

    /// Whole pixel buffer, including stride padding.
    pub fn pixels(&self) -> &[u32] {
        &self.buffer
    }

    /// Visible pixels of row `y`.
    pub fn row(&self, y: usize) -> &[u32] {
        let start = y * self.stride();
        &self.buffer[start..start + self.width]
    }

    /// Mutable visible pixels of row `y`.
    pub fn row_mut(&mut self, y: usize) -> &mut [u32] {
        let start = y * self.stride();
        let width = self.width;
        &mut self.buffer[start..start + width]
    }

    /// Set every pixel of the draw region to `argb`.
    pub fn fill_region(&mut self, argb: u32) {
        let DrawRegion {
            x,
            y,
            width,
            height,
        } = self.region;
        for row in y..y + height {
            self.row_mut(row)[x..x + width].fill(argb);
        }
    }

    /// Give the buffer back to the caller.
    pub fn into_buffer(self) -> Vec<u32> {
        self.buffer
    }

    /// Straight-alpha RGBA8 bytes, tightly packed, for image export.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.width * self.height * 4);
        for y in 0..self.height {
            for &px in self.row(y) {
                out.extend_from_slice(&unpack_argb32_straight(px));
            }
        }
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/surface.rs"]
mod tests;
