use kurbo::{Point, Rect};
use mockup::{
    BlendMode, DetectorConfig, LayerBounds, LayerTree, MockupError, OutputFormat,
    PlacementOptions, Quad, Raster, Strategy, TemplateSpec, TransformMatrix, detect_regions,
    layers::{LayerKind, LayerNode},
    place::{FitConfig, fit_artwork},
    template::{BlendSpec, MarkerSpec},
};

const WHITE: [u8; 4] = [255, 255, 255, 255];
const MAGENTA: [u8; 4] = [255, 0, 255, 255];

fn white(w: u32, h: u32) -> Raster {
    Raster::filled(w, h, WHITE).unwrap()
}

fn paint(r: &mut Raster, x: u32, y: u32, w: u32, h: u32, px: [u8; 4]) {
    for yy in y..y + h {
        for xx in x..x + w {
            r.set_pixel(xx, yy, px);
        }
    }
}

fn magenta_template() -> Raster {
    let mut t = white(1000, 1000);
    paint(&mut t, 400, 400, 200, 200, MAGENTA);
    t
}

fn marker_spec() -> TemplateSpec {
    let mut spec = TemplateSpec::new("template.png");
    spec.marker = Some(MarkerSpec::Preset(mockup::detect::RulePreset::Magenta));
    spec
}

fn artwork(w: u32, h: u32) -> Raster {
    let mut a = Raster::transparent(w, h).unwrap();
    for y in 0..h {
        for x in 0..w {
            a.set_pixel(x, y, [(x % 150) as u8, 40, (y % 150) as u8, 255]);
        }
    }
    a
}

fn smart_layer_spec(bounds: LayerBounds, transform: TransformMatrix) -> TemplateSpec {
    let mut tree = LayerTree::new();
    let mut node = LayerNode::new(mockup::DEFAULT_SMART_LAYER, LayerKind::SmartObject);
    node.bounds = Some(bounds);
    node.transform = Some(transform);
    tree.push(None, node).unwrap();
    let mut spec = TemplateSpec::new("template.png");
    spec.layers = Some(tree);
    spec
}

#[test]
fn single_magenta_square_is_one_region_of_40000_pixels() {
    let template = magenta_template();
    let det = detect_regions(
        &template,
        &mockup::ColorClassRule::magenta(),
        &DetectorConfig::default(),
    )
    .unwrap();
    assert_eq!(det.regions.len(), 1);
    let r = det.regions[0];
    assert_eq!((r.x, r.y, r.width, r.height), (400, 400, 200, 200));
    assert_eq!(r.pixel_count, 40_000);
    assert_eq!(det.total_marker_pixels(), 40_000);
}

#[test]
fn marker_placement_replaces_every_marker_pixel() {
    let template = magenta_template();
    let art = artwork(300, 300);
    let result =
        mockup::place_mockup(&art, &template, &marker_spec(), &PlacementOptions::default())
            .unwrap();

    assert_eq!(result.method, Strategy::MarkerRegion);
    assert_eq!(result.regions_found, 1);
    assert_eq!(result.total_marker_pixels, 40_000);
    assert_eq!(result.chosen_region.unwrap().pixel_count, 40_000);

    let rule = mockup::ColorClassRule::magenta();
    assert!(
        result
            .image
            .data()
            .chunks_exact(4)
            .all(|px| !rule.matches(px[0], px[1], px[2]))
    );
    // Padding ring is inpainted with the surrounding white.
    assert_eq!(result.image.pixel(402, 402), WHITE);
    // Artwork occupies the padded 180×180 box at (410, 410).
    assert_ne!(result.image.pixel(500, 500), WHITE);
    assert_eq!(result.image.pixel(409, 500), WHITE);
    assert_eq!(result.image.pixel(590, 500), WHITE);
    // Outside the region nothing changed.
    assert_eq!(result.image.pixel(100, 100), WHITE);
}

#[test]
fn marker_placement_is_deterministic() {
    let template = magenta_template();
    let art = artwork(120, 80);
    let options = PlacementOptions {
        detector: DetectorConfig {
            parallel: true,
            ..Default::default()
        },
        ..Default::default()
    };
    let a = mockup::place_mockup(&art, &template, &marker_spec(), &options).unwrap();
    let b = mockup::place_mockup(&art, &template, &marker_spec(), &PlacementOptions::default())
        .unwrap();
    assert_eq!(a.image, b.image);
    assert_eq!(a.diagnostics(), b.diagnostics());
}

#[test]
fn equal_regions_resolve_to_the_first_in_scan_order() {
    let mut template = white(300, 200);
    paint(&mut template, 200, 20, 50, 50, MAGENTA);
    paint(&mut template, 20, 100, 50, 50, MAGENTA);
    let result = mockup::place_mockup(
        &artwork(10, 10),
        &template,
        &marker_spec(),
        &PlacementOptions::default(),
    )
    .unwrap();
    assert_eq!(result.regions_found, 2);
    let chosen = result.chosen_region.unwrap();
    assert_eq!((chosen.x, chosen.y), (200, 20));
}

#[test]
fn landscape_artwork_in_a_square_region_keeps_vertical_margins() {
    let region = Rect::new(0.0, 0.0, 500.0, 500.0);
    let p = fit_artwork((800, 600), region, &FitConfig::default()).unwrap();
    let pb = p.pixel_box();
    assert_eq!((pb.width, pb.height), (450, 337));
    assert_eq!(pb.x, 25);
    assert!((p.dest.width() / p.dest.height() - 800.0 / 600.0).abs() < 1e-9);
    // Centered vertically with equal margins.
    assert!(((p.dest.y0 - 0.0) - (500.0 - p.dest.y1)).abs() < 1e-9);
    assert!(p.dest.y0 > 25.0);
}

#[test]
fn zero_area_transform_fails_as_degenerate() {
    let spec = smart_layer_spec(
        LayerBounds {
            left: 0.0,
            top: 0.0,
            right: 100.0,
            bottom: 100.0,
        },
        TransformMatrix::Affine([0.0, 0.0, 0.0, 0.0, 50.0, 50.0]),
    );
    let err = mockup::place_mockup(
        &artwork(10, 10),
        &white(200, 200),
        &spec,
        &PlacementOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, MockupError::DegenerateQuad(_)), "{err}");
}

#[test]
fn auto_falls_back_to_the_quad_when_no_marker_exists() {
    let mut spec = smart_layer_spec(
        LayerBounds {
            left: 0.0,
            top: 0.0,
            right: 100.0,
            bottom: 100.0,
        },
        TransformMatrix::Perspective([1.0, 0.1, 20.0, 0.0, 1.0, 30.0, 0.0005, 0.0]),
    );
    spec.marker = Some(MarkerSpec::Preset(mockup::detect::RulePreset::Magenta));
    let template = white(300, 300);
    let art = Raster::filled(50, 50, [0, 128, 0, 255]).unwrap();

    let result = mockup::place_mockup(
        &art,
        &template,
        &spec,
        &PlacementOptions {
            strategy: Some(Strategy::Auto),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(result.method, Strategy::QuadTransform);
    assert_eq!(result.requested, Strategy::Auto);
    assert_eq!(result.regions_found, 0);
    assert!(result.warnings.iter().any(|w| w.starts_with("marker-region failed")));

    let quad = result.chosen_quad.unwrap();
    let c = quad.bounds().center();
    assert!(quad.contains(c));
    assert_eq!(result.image.pixel(c.x as u32, c.y as u32), [0, 128, 0, 255]);

    let json = serde_json::to_value(result.diagnostics()).unwrap();
    assert_eq!(json["method"], "quad-transform");
    assert_eq!(json["requested"], "auto");
    assert!(json["chosenRegion"].is_null());
}

#[test]
fn every_strategy_failing_reports_each_reason() {
    let err = mockup::place_mockup(
        &artwork(10, 10),
        &white(64, 64),
        &TemplateSpec::new("template.png"),
        &PlacementOptions::default(),
    )
    .unwrap_err();
    let failures = match err {
        MockupError::AllMethodsFailed(failures) => failures,
        other => panic!("expected AllMethodsFailed, got {other}"),
    };
    let methods: Vec<_> = failures.iter().map(|f| f.method.as_str()).collect();
    assert_eq!(methods, ["marker-region", "quad-transform", "layer-bounds"]);
    assert!(failures[0].reason.contains("no placement region"));
}

#[test]
fn zero_opacity_leaves_the_template_untouched() {
    let template = white(120, 120);
    let mut spec = TemplateSpec::new("template.png");
    spec.corners = Some(Quad::new(
        Point::new(10.0, 20.0),
        Point::new(100.0, 10.0),
        Point::new(110.0, 100.0),
        Point::new(20.0, 110.0),
    ));
    spec.blend = Some(BlendSpec {
        mode: "multiply".into(),
        opacity: 0.0,
    });
    let result = mockup::place_mockup(
        &artwork(40, 40),
        &template,
        &spec,
        &PlacementOptions::default(),
    )
    .unwrap();
    assert_eq!(result.image, template);
}

#[test]
fn full_opacity_axis_aligned_quad_reproduces_the_artwork() {
    let template = Raster::filled(64, 64, [30, 30, 30, 255]).unwrap();
    let art = artwork(16, 16);
    let mut spec = TemplateSpec::new("template.png");
    spec.corners = Some(Quad::from_rect(Rect::new(8.0, 8.0, 24.0, 24.0)));
    let result =
        mockup::place_mockup(&art, &template, &spec, &PlacementOptions::default()).unwrap();
    for y in 0..16 {
        for x in 0..16 {
            let got = result.image.pixel(8 + x, 8 + y);
            let want = art.pixel(x, y);
            for c in 0..4 {
                assert!(got[c].abs_diff(want[c]) <= 1, "({x},{y}) {got:?} vs {want:?}");
            }
        }
    }
    assert_eq!(result.image.pixel(7, 7), [30, 30, 30, 255]);
}

#[test]
fn feather_softens_the_quad_edge() {
    let template = Raster::filled(80, 80, [0, 0, 0, 255]).unwrap();
    let art = white(20, 20);
    let mut spec = TemplateSpec::new("template.png");
    spec.corners = Some(Quad::from_rect(Rect::new(20.0, 20.0, 60.0, 60.0)));
    let hard = mockup::place_mockup(&art, &template, &spec, &PlacementOptions::default())
        .unwrap();
    spec.feather_px = 3.0;
    let soft = mockup::place_mockup(&art, &template, &spec, &PlacementOptions::default())
        .unwrap();
    assert_eq!(hard.image.pixel(20, 40), WHITE);
    let edge = soft.image.pixel(20, 40)[0];
    assert!(edge > 0 && edge < 255, "{edge}");
    assert_eq!(soft.image.pixel(40, 40), WHITE);
}

#[test]
fn unknown_blend_mode_is_a_warning_not_an_error() {
    let template = white(40, 40);
    let mut spec = TemplateSpec::new("template.png");
    spec.corners = Some(Quad::from_rect(Rect::new(5.0, 5.0, 35.0, 35.0)));
    spec.blend = Some(BlendSpec {
        mode: "Linear Light".into(),
        opacity: 1.0,
    });
    let art = Raster::filled(10, 10, [9, 99, 199, 255]).unwrap();
    let result =
        mockup::place_mockup(&art, &template, &spec, &PlacementOptions::default()).unwrap();
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("Linear Light"));
    assert_eq!(result.image.pixel(20, 20), [9, 99, 199, 255]);
    assert_eq!(BlendMode::from_name("Linear Light"), None);
}

#[test]
fn encoded_output_decodes_to_the_same_image() {
    let template = magenta_template();
    let result = mockup::place_mockup(
        &artwork(64, 64),
        &template,
        &marker_spec(),
        &PlacementOptions::default(),
    )
    .unwrap();
    let png = result.encode(OutputFormat::Png).unwrap();
    assert_eq!(Raster::decode(&png).unwrap(), result.image);
    let jpeg = result.encode(OutputFormat::jpeg()).unwrap();
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
}

#[test]
fn huge_feather_is_a_validation_error() {
    let json = r#"{ "background": "t.png", "corners": [[5,5],[30,5],[30,30],[5,30]] }"#;
    let mut spec = TemplateSpec::from_json(json).unwrap();
    spec.feather_px = 1e9;
    let err = mockup::place_mockup(
        &artwork(10, 10),
        &white(40, 40),
        &spec,
        &PlacementOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, MockupError::Validation(_)), "{err}");
}
