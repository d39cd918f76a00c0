use super::*;
use kurbo::Shape as _;

const SAMPLE: &str = r#"{
    "name": "pulse",
    "start_frame": 10,
    "end_frame": 70,
    "frame_rate": 30.0,
    "size": { "width": 64, "height": 32 },
    "layers": [
        {
            "name": "bg",
            "shape": { "type": "rect", "x": 0, "y": 0, "width": 64, "height": 32 },
            "fill": { "r": 10, "g": 20, "b": 30 }
        },
        {
            "name": "dot",
            "in_frame": 20,
            "out_frame": 40,
            "shape": { "type": "ellipse", "cx": 0, "cy": 0, "rx": 4, "ry": 4 },
            "fill": { "r": 255, "g": 0, "b": 0, "a": 255 },
            "opacity": { "keys": [ { "frame": 20, "value": 0.0 }, { "frame": 30, "value": 1.0 } ] },
            "position": { "x": 32, "y": 16 }
        }
    ],
    "markers": [ { "name": "intro", "start_frame": 10, "end_frame": 19 } ]
}"#;

#[test]
fn json_description_loads_and_derives_metadata() {
    let comp = Composition::from_json_str(SAMPLE).unwrap();
    assert_eq!(comp.name, "pulse");
    assert_eq!(comp.start_frame(), 10);
    assert_eq!(comp.end_frame(), 70);
    assert_eq!(comp.total_frame(), 61);
    assert!((comp.duration() - 61.0 / 30.0).abs() < 1e-12);
    assert_eq!(comp.size(), Size::new(64, 32));
    assert_eq!(comp.markers().len(), 1);
    assert_eq!(comp.layers[0].fill.a, 255);
}

#[test]
fn layer_info_resolves_default_visibility() {
    let comp = Composition::from_json_str(SAMPLE).unwrap();
    let info = comp.layer_info_list();
    assert_eq!(
        info,
        &[
            LayerInfo {
                name: "bg".to_string(),
                in_frame: 10,
                out_frame: 71,
            },
            LayerInfo {
                name: "dot".to_string(),
                in_frame: 20,
                out_frame: 40,
            },
        ]
    );
    // Cached: the same slice comes back.
    assert!(std::ptr::eq(info, comp.layer_info_list()));
}

#[test]
fn layer_sampling_respects_visibility_and_keys() {
    let comp = Composition::from_json_str(SAMPLE).unwrap();
    let dot = &comp.layers[1];
    assert!(dot.sample(comp.span(), 19).unwrap().is_none());
    assert!(dot.sample(comp.span(), 40).unwrap().is_none());
    let s = dot.sample(comp.span(), 25).unwrap().unwrap();
    assert!((s.opacity - 0.5).abs() < 1e-12);
    assert_eq!(s.transform, Affine::translate(Vec2::new(32.0, 16.0)));
}

#[test]
fn frame_at_pos_is_relative_and_clamped() {
    let comp = Composition::from_json_str(SAMPLE).unwrap();
    assert_eq!(comp.frame_at_pos(0.0), 0);
    assert_eq!(comp.frame_at_pos(0.5), 30);
    assert_eq!(comp.frame_at_pos(1.0), 60);
    assert_eq!(comp.frame_at_pos(4.0), 60);
    assert_eq!(comp.frame_at_pos(-1.0), 0);
    assert_eq!(comp.frame_at_pos(f64::NAN), 0);
}

#[test]
fn empty_and_malformed_sources_are_rejected() {
    assert!(matches!(
        Composition::from_json_str("  \n"),
        Err(RenderError::Validation(_))
    ));
    assert!(matches!(
        Composition::from_json_str("{ not json"),
        Err(RenderError::Serde(_))
    ));
}

#[test]
fn invariants_are_validated_on_load() {
    let inverted = SAMPLE.replace("\"end_frame\": 70", "\"end_frame\": 5");
    assert!(Composition::from_json_str(&inverted).is_err());

    let zero_fps = SAMPLE.replace("\"frame_rate\": 30.0", "\"frame_rate\": 0.0");
    assert!(Composition::from_json_str(&zero_fps).is_err());

    let zero_size = SAMPLE.replace("\"width\": 64, \"height\": 32 }", "\"width\": 0, \"height\": 32 }");
    assert!(Composition::from_json_str(&zero_size).is_err());

    let bad_path = SAMPLE.replace(
        "{ \"type\": \"ellipse\", \"cx\": 0, \"cy\": 0, \"rx\": 4, \"ry\": 4 }",
        "{ \"type\": \"path\", \"d\": \"M 0 0 X 5\" }",
    );
    assert!(Composition::from_json_str(&bad_path).is_err());
}

#[test]
fn direct_deserialization_is_validated() {
    let inverted = SAMPLE.replace("\"start_frame\": 10", "\"start_frame\": 90");
    let err = serde_json::from_str::<Composition>(&inverted).unwrap_err();
    assert!(err.to_string().contains("start must be <= end"), "{err}");

    let bad_marker = SAMPLE.replace("\"end_frame\": 19", "\"end_frame\": 3");
    assert!(serde_json::from_str::<Composition>(&bad_marker).is_err());

    let comp: Composition = serde_json::from_str(SAMPLE).unwrap();
    assert_eq!(comp.total_frame(), 61);
}

#[test]
fn inverted_span_after_mutation_does_not_panic() {
    let mut comp: Composition = serde_json::from_str(SAMPLE).unwrap();
    comp.start_frame = 90;
    comp.end_frame = 5;
    assert_eq!(comp.total_frame(), 1);
    assert_eq!(comp.frame_at_pos(1.0), 0);
    assert_eq!(comp.span().map_relative(3), 90);
}

#[test]
fn shapes_build_closed_outlines() {
    let rect = Shape::Rect {
        x: 1.0,
        y: 2.0,
        width: 3.0,
        height: 4.0,
        radius: 0.0,
    };
    let bbox = rect.to_bezpath().unwrap().bounding_box();
    assert_eq!(bbox, kurbo::Rect::new(1.0, 2.0, 4.0, 6.0));

    let path = Shape::Path {
        d: "M0,0 L10,0 L10,10 Z".to_string(),
    };
    assert_eq!(
        path.to_bezpath().unwrap().bounding_box(),
        kurbo::Rect::new(0.0, 0.0, 10.0, 10.0)
    );
}
