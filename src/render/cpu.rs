use std::sync::Arc;

use crate::{
    composition::model::Composition,
    foundation::{
        core::{Affine, Rgba8, Size, pack_argb32},
        error::{RenderError, RenderResult},
    },
    render::{
        backend::{PropertyValue, Renderer, keypath_matches},
        surface::Surface,
    },
};

/// CPU renderer built on `vello_cpu`.
///
/// Keeps the last rasterized frame; painting the same frame into a region of the same size
/// again only copies pixels.
pub struct CpuRenderer {
    comp: Arc<Composition>,
    paths: Vec<Option<vello_cpu::kurbo::BezPath>>,
    overrides: Vec<(String, PropertyValue)>,
    generation: u64,
    cache: Option<CachedFrame>,
}

struct CachedFrame {
    key: FrameKey,
    pixmap: vello_cpu::Pixmap,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct FrameKey {
    frame: u64,
    width: u16,
    height: u16,
    view: [f64; 6],
    generation: u64,
}

impl CpuRenderer {
    /// Build a renderer for `comp`. Layers whose geometry cannot be built are skipped.
    pub fn new(comp: Arc<Composition>) -> Self {
        let paths = comp
            .layers
            .iter()
            .map(|layer| match layer.shape.to_bezpath() {
                Ok(path) => Some(bezpath_to_cpu(&path)),
                Err(e) => {
                    tracing::warn!(layer = %layer.name, error = %e, "layer skipped");
                    None
                }
            })
            .collect();
        Self {
            comp,
            paths,
            overrides: Vec::new(),
            generation: 0,
            cache: None,
        }
    }

    /// Prepare the pixels for `frame` under `view`. Returns `true` when a new raster was produced.
    fn update(&mut self, frame: u64, width: u16, height: u16, view: Affine) -> RenderResult<bool> {
        let key = FrameKey {
            frame,
            width,
            height,
            view: view.as_coeffs(),
            generation: self.generation,
        };
        if self.cache.as_ref().is_some_and(|c| c.key == key) {
            return Ok(false);
        }
        let pixmap = self.rasterize(frame, width, height, view)?;
        self.cache = Some(CachedFrame { key, pixmap });
        Ok(true)
    }

    fn rasterize(
        &self,
        frame: u64,
        width: u16,
        height: u16,
        view: Affine,
    ) -> RenderResult<vello_cpu::Pixmap> {
        let mut ctx = vello_cpu::RenderContext::new(width, height);

        let span = self.comp.span();
        for (layer, path) in self.comp.layers.iter().zip(&self.paths) {
            let Some(path) = path else {
                continue;
            };
            let Some(sample) = layer.sample(span, frame)? else {
                continue;
            };
            let (fill, opacity) = self.resolve_paint(&layer.name, layer.fill, sample.opacity);
            if opacity <= 0.0 {
                continue;
            }

            ctx.set_transform(affine_to_cpu(view * sample.transform));
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                fill.r, fill.g, fill.b, fill.a,
            ));
            if opacity < 1.0 {
                ctx.push_opacity_layer(opacity as f32);
            }
            ctx.fill_path(path);
            if opacity < 1.0 {
                ctx.pop_layer();
            }
        }

        ctx.flush();
        let mut pixmap = vello_cpu::Pixmap::new(width, height);
        ctx.render_to_pixmap(&mut pixmap);
        Ok(pixmap)
    }

    fn resolve_paint(&self, layer: &str, fill: Rgba8, opacity: f64) -> (Rgba8, f64) {
        self.overrides
            .iter()
            .filter(|(keypath, _)| keypath_matches(keypath, layer))
            .fold((fill, opacity), |(fill, opacity), (_, value)| match *value {
                PropertyValue::FillColor(c) => (c, opacity),
                PropertyValue::Opacity(o) => (fill, o.clamp(0.0, 1.0)),
            })
    }

    /// Copy the cached raster into the surface's draw region.
    fn blit(&self, surface: &mut Surface) {
        let Some(cache) = &self.cache else {
            return;
        };
        let region = surface.draw_region();
        let width = usize::from(cache.key.width);
        let src = cache.pixmap.data_as_u8_slice();
        for (row_idx, src_row) in src.chunks_exact(width * 4).enumerate() {
            let dst = &mut surface.row_mut(region.y + row_idx)[region.x..region.x + width];
            for (d, px) in dst.iter_mut().zip(src_row.chunks_exact(4)) {
                *d = pack_argb32(px[0], px[1], px[2], px[3]);
            }
        }
    }
}

impl Renderer for CpuRenderer {
    fn paint(
        &mut self,
        frame: u64,
        surface: &mut Surface,
        keep_aspect_ratio: bool,
    ) -> RenderResult<()> {
        if surface.is_empty() {
            return Ok(());
        }
        let (width, height) = region_dims(surface)?;
        let view = viewport_transform(
            self.comp.size(),
            f64::from(width),
            f64::from(height),
            keep_aspect_ratio,
        );
        self.update(frame, width, height, view)?;
        self.blit(surface);
        Ok(())
    }

    fn paint_partial(&mut self, frame: u64, surface: &mut Surface) -> RenderResult<()> {
        if surface.is_empty() {
            return Ok(());
        }
        let (width, height) = region_dims(surface)?;
        let region = surface.draw_region();
        let view = Affine::translate((-(region.x as f64), -(region.y as f64)))
            * viewport_transform(
                self.comp.size(),
                surface.width() as f64,
                surface.height() as f64,
                true,
            );
        self.update(frame, width, height, view)?;
        self.blit(surface);
        Ok(())
    }

    fn set_value(&mut self, keypath: &str, value: PropertyValue) {
        self.overrides.push((keypath.to_string(), value));
        self.generation += 1;
    }
}

fn region_dims(surface: &Surface) -> RenderResult<(u16, u16)> {
    let width: u16 = surface
        .draw_region_width()
        .try_into()
        .map_err(|_| RenderError::validation("draw region width exceeds u16"))?;
    let height: u16 = surface
        .draw_region_height()
        .try_into()
        .map_err(|_| RenderError::validation("draw region height exceeds u16"))?;
    Ok((width, height))
}

/// Map composition space onto a `vw` x `vh` viewport.
///
/// Keeping the aspect ratio scales uniformly and centers; otherwise each axis stretches.
pub(crate) fn viewport_transform(natural: Size, vw: f64, vh: f64, keep_aspect_ratio: bool) -> Affine {
    let sx = vw / f64::from(natural.width);
    let sy = vh / f64::from(natural.height);
    if !keep_aspect_ratio {
        return Affine::scale_non_uniform(sx, sy);
    }
    let s = sx.min(sy);
    let tx = (vw - f64::from(natural.width) * s) / 2.0;
    let ty = (vh - f64::from(natural.height) * s) / 2.0;
    Affine::translate((tx, ty)) * Affine::scale(s)
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn point_to_cpu(p: kurbo::Point) -> vello_cpu::kurbo::Point {
    vello_cpu::kurbo::Point::new(p.x, p.y)
}

fn bezpath_to_cpu(path: &kurbo::BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(point_to_cpu(p)),
            PathEl::LineTo(p) => out.line_to(point_to_cpu(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(point_to_cpu(p1), point_to_cpu(p2)),
            PathEl::CurveTo(p1, p2, p3) => {
                out.curve_to(point_to_cpu(p1), point_to_cpu(p2), point_to_cpu(p3));
            }
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}
