use super::*;

#[test]
fn frame_span_rejects_inverted_bounds() {
    assert!(FrameSpan::new(5, 4).is_err());
    assert!(FrameSpan::new(4, 4).is_ok());
}

#[test]
fn frame_span_contains_is_inclusive() {
    let s = FrameSpan::new(2, 5).unwrap();
    assert!(!s.contains(1));
    assert!(s.contains(2));
    assert!(s.contains(5));
    assert!(!s.contains(6));
    assert_eq!(s.len_frames(), 3);
}

#[test]
fn map_relative_saturates_both_ends() {
    let s = FrameSpan::new(10, 20).unwrap();
    assert_eq!(s.map_relative(-1), 10);
    assert_eq!(s.map_relative(i64::MIN), 10);
    assert_eq!(s.map_relative(0), 10);
    assert_eq!(s.map_relative(7), 17);
    assert_eq!(s.map_relative(10), 20);
    assert_eq!(s.map_relative(11), 20);
    assert_eq!(s.map_relative(i64::MAX), 20);
}

#[test]
fn map_relative_on_inverted_span_is_total() {
    let s = FrameSpan { start: 10, end: 5 };
    assert_eq!(s.len_frames(), 0);
    assert_eq!(s.map_relative(-4), 10);
    assert_eq!(s.map_relative(0), 10);
    assert_eq!(s.map_relative(i64::MAX), 10);
}

#[test]
fn frame_rate_must_be_positive_and_finite() {
    assert!(FrameRate::new(0.0).is_err());
    assert!(FrameRate::new(-30.0).is_err());
    assert!(FrameRate::new(f64::NAN).is_err());
    assert!(FrameRate::new(f64::INFINITY).is_err());
    let fps = FrameRate::new(25.0).unwrap();
    assert!((fps.frames_to_secs(50) - 2.0).abs() < 1e-12);
}

#[test]
fn argb32_packing_matches_channel_layout() {
    assert_eq!(pack_argb32(0x11, 0x22, 0x33, 0x44), 0x4411_2233);
    assert_eq!(unpack_argb32_straight(0), [0, 0, 0, 0]);
    assert_eq!(
        unpack_argb32_straight(pack_argb32(255, 0, 128, 255)),
        [255, 0, 128, 255]
    );
    // 50% alpha red, premultiplied to 128.
    assert_eq!(
        unpack_argb32_straight(pack_argb32(128, 0, 0, 128)),
        [255, 0, 0, 128]
    );
}
