use super::*;
use crate::foundation::{core::Rgba8, error::RenderError};
use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::mpsc,
    thread,
    time::Duration,
};

const SQUARE: &str = r#"{
    "start_frame": 0,
    "end_frame": 100,
    "frame_rate": 30.0,
    "size": { "width": 16, "height": 16 },
    "layers": [
        {
            "name": "square",
            "shape": { "type": "rect", "x": 2, "y": 2, "width": 12, "height": 12 },
            "fill": { "r": 255, "g": 0, "b": 0 }
        }
    ]
}"#;

fn square() -> Animation {
    Animation::load_from_data(SQUARE).unwrap()
}

/// Reports entry, then parks until released.
struct BlockingRenderer {
    entered: mpsc::Sender<()>,
    release: mpsc::Receiver<()>,
}

impl Renderer for BlockingRenderer {
    fn paint(&mut self, frame: u64, surface: &mut Surface, _keep: bool) -> RenderResult<()> {
        self.entered.send(()).unwrap();
        self.release.recv().unwrap();
        surface.fill_region(frame as u32);
        Ok(())
    }

    fn paint_partial(&mut self, frame: u64, surface: &mut Surface) -> RenderResult<()> {
        self.paint(frame, surface, true)
    }
}

struct FailingRenderer;

impl Renderer for FailingRenderer {
    fn paint(&mut self, _frame: u64, _surface: &mut Surface, _keep: bool) -> RenderResult<()> {
        Err(RenderError::animation("boom"))
    }

    fn paint_partial(&mut self, _frame: u64, _surface: &mut Surface) -> RenderResult<()> {
        Err(RenderError::animation("boom"))
    }
}

struct PanickingRenderer;

impl Renderer for PanickingRenderer {
    fn paint(&mut self, _frame: u64, _surface: &mut Surface, _keep: bool) -> RenderResult<()> {
        panic!("renderer exploded");
    }

    fn paint_partial(&mut self, _frame: u64, _surface: &mut Surface) -> RenderResult<()> {
        panic!("renderer exploded");
    }
}

/// Writes the absolute frame it was asked for.
struct FrameEcho;

impl Renderer for FrameEcho {
    fn paint(&mut self, frame: u64, surface: &mut Surface, _keep: bool) -> RenderResult<()> {
        surface.fill_region(frame as u32);
        Ok(())
    }

    fn paint_partial(&mut self, frame: u64, surface: &mut Surface) -> RenderResult<()> {
        self.paint(frame, surface, true)
    }
}

fn comp(start: u64, end: u64) -> Arc<Composition> {
    Composition::new(start, end, 30.0, Size::new(4, 4), Vec::new()).unwrap()
}

#[test]
fn frames_map_relative_to_start_and_saturate() {
    let anim = Animation::new(comp(0, 100));
    assert_eq!(anim.map_frame(150), 100);
    assert_eq!(anim.map_frame(-3), 0);
    assert_eq!(anim.map_frame(42), 42);
    assert_eq!(anim.map_frame(i64::MAX), 100);
    assert_eq!(anim.map_frame(i64::MIN), 0);

    let offset = Animation::new(comp(10, 70));
    assert_eq!(offset.map_frame(0), 10);
    assert_eq!(offset.map_frame(60), 70);
    assert_eq!(offset.map_frame(61), 70);
    let again = offset.map_frame(offset.map_frame(500) as i64 - 10);
    assert_eq!(again, 70);
}

#[test]
fn renderer_receives_the_mapped_frame() {
    let anim = Animation::with_renderer(comp(10, 70), Box::new(FrameEcho));
    let out = anim.render_sync(150, Surface::new(2, 2), true);
    assert!(out.pixels().iter().all(|&px| px == 70));
    let out = anim.render_sync(-1, out, true);
    assert!(out.pixels().iter().all(|&px| px == 10));
    let out = anim.render_partial_sync(5, out);
    assert!(out.pixels().iter().all(|&px| px == 15));
}

#[test]
fn concurrent_render_on_same_instance_is_refused() {
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let anim = Arc::new(Animation::with_renderer(
        comp(0, 10),
        Box::new(BlockingRenderer {
            entered: entered_tx,
            release: release_rx,
        }),
    ));

    let first = {
        let anim = Arc::clone(&anim);
        thread::spawn(move || anim.render_sync(5, Surface::new(2, 2), true))
    };
    entered_rx.recv_timeout(Duration::from_secs(10)).unwrap();
    assert!(anim.is_rendering());

    let mut mine = Surface::new(2, 2);
    mine.fill_region(0xDEAD_BEEF);
    let refused = anim.render_sync(3, mine, true);
    assert!(refused.pixels().iter().all(|&px| px == 0xDEAD_BEEF));
    let refused = anim.render_partial_sync(3, refused);
    assert!(refused.pixels().iter().all(|&px| px == 0xDEAD_BEEF));

    release_tx.send(()).unwrap();
    let done = first.join().unwrap();
    assert!(done.pixels().iter().all(|&px| px == 5));
    assert!(!anim.is_rendering());
}

#[test]
fn guard_is_released_after_renderer_error() {
    let anim = Animation::with_renderer(comp(0, 10), Box::new(FailingRenderer));
    let out = anim.render_sync(1, Surface::new(2, 2), true);
    assert!(out.pixels().iter().all(|&px| px == 0));
    assert!(!anim.is_rendering());
    let out = anim.render_partial_sync(1, out);
    assert_eq!(out.width(), 2);
    assert!(!anim.is_rendering());
}

#[test]
fn guard_is_released_after_renderer_panic() {
    let anim = Animation::with_renderer(comp(0, 10), Box::new(PanickingRenderer));
    let res = catch_unwind(AssertUnwindSafe(|| anim.render_sync(1, Surface::new(2, 2), true)));
    assert!(res.is_err());
    assert!(!anim.is_rendering());
    assert!(anim.try_begin_render().is_some());
}

#[test]
fn empty_draw_region_leaves_surface_untouched() {
    let anim = Animation::with_renderer(comp(0, 10), Box::new(FrameEcho));
    let out = anim.render_sync(4, Surface::new(0, 0), true);
    assert!(out.pixels().is_empty());
    assert!(!anim.is_rendering());
}

#[test]
fn repeated_renders_are_byte_identical() {
    let anim = square();
    let a = anim.render_sync(0, Surface::new(16, 16), true);
    let b = anim.render_sync(0, Surface::new(16, 16), true);
    let c = square().render_sync(0, Surface::new(16, 16), true);
    assert_eq!(a.pixels(), b.pixels());
    assert_eq!(a.pixels(), c.pixels());
    assert_eq!(a.row(8)[8], 0xFFFF_0000);
    assert_eq!(a.row(0)[0], 0);
}

#[test]
fn partial_band_matches_full_render() {
    let anim = square();
    let full = anim.render_sync(0, Surface::new(16, 16), true);

    let mut band = Surface::new(16, 16);
    assert!(band.set_draw_region(0, 8, 16, 8));
    let band = anim.render_partial_sync(0, band);
    for y in 8..16 {
        assert_eq!(band.row(y), full.row(y), "row {y}");
    }
    for y in 0..8 {
        assert!(band.row(y).iter().all(|&px| px == 0), "row {y} outside the band");
    }
}

#[test]
fn fill_override_changes_pixels() {
    let anim = square();
    let before = anim.render_sync(0, Surface::new(16, 16), true);
    anim.set_value("**", PropertyValue::FillColor(Rgba8::opaque(0, 0, 255)));
    anim.set_value("", PropertyValue::Opacity(0.0));
    let after = anim.render_sync(0, Surface::new(16, 16), true);
    assert_eq!(before.row(8)[8], 0xFFFF_0000);
    assert_eq!(after.row(8)[8], 0xFF00_00FF);
}

#[test]
fn loading_rejects_empty_and_malformed_data() {
    assert!(Animation::load_from_data("").is_none());
    assert!(Animation::load_from_data("   ").is_none());
    assert!(Animation::load_from_data("{ not json").is_none());
    assert!(Animation::load_from_file("").is_none());
    assert!(Animation::load_from_file("/definitely/not/here.json").is_none());
}

#[test]
fn metadata_is_forwarded_from_the_composition() {
    let anim = square();
    assert_eq!(anim.size(), Size::new(16, 16));
    assert_eq!(anim.total_frame(), 101);
    assert!((anim.frame_rate() - 30.0).abs() < f64::EPSILON);
    assert!((anim.duration() - 101.0 / 30.0).abs() < 1e-12);
    assert_eq!(anim.frame_at_pos(0.5), 50);
    assert_eq!(anim.layers().len(), 1);
    assert!(anim.markers().is_empty());
}

#[test]
fn inverted_range_renders_without_panicking() {
    let mut comp: Composition = serde_json::from_str(SQUARE).unwrap();
    comp.start_frame = 50;
    comp.end_frame = 10;
    let anim = Animation::new(Arc::new(comp));
    assert_eq!(anim.map_frame(0), 50);
    assert_eq!(anim.total_frame(), 1);
    let out = anim.render_sync(7, Surface::new(16, 16), true);
    assert_eq!(out.width(), 16);
    assert!(!anim.is_rendering());
}
