use super::*;
use crate::foundation::core::{Point, Rect};

const ALL: [Orientation; 4] = [
    Orientation::LandscapeRight,
    Orientation::LandscapeLeft,
    Orientation::Portrait,
    Orientation::PortraitUpsideDown,
];

fn assert_rect_close(got: Rect, want: Rect) {
    let close = |a: f64, b: f64| (a - b).abs() < 1e-6;
    assert!(
        close(got.x0, want.x0)
            && close(got.y0, want.y0)
            && close(got.x1, want.x1)
            && close(got.y1, want.y1),
        "got {got:?}, want {want:?}"
    );
}

#[test]
fn transform_is_deterministic_for_every_orientation() {
    let corrected = Size::new(1080, 1920);
    for o in ALL {
        let a = orientation_transform(o, corrected, 0.75);
        let b = orientation_transform(o, corrected, 0.75);
        assert_eq!(a.as_coeffs(), b.as_coeffs(), "{o:?}");
    }
}

#[test]
fn landscape_right_is_pure_scale() {
    let t = orientation_transform(Orientation::LandscapeRight, Size::new(1920, 1080), 0.5);
    assert_eq!(t.as_coeffs(), Affine::scale(0.5).as_coeffs());
}

#[test]
fn portrait_maps_sideways_buffer_upright_at_origin() {
    let natural = Size::new(1920, 1080);
    let corrected = Orientation::Portrait.corrected_size(natural);
    let t = orientation_transform(Orientation::Portrait, corrected, 1.0);

    let placed = t.transform_rect_bbox(Rect::new(0.0, 0.0, 1920.0, 1080.0));
    assert_rect_close(placed, Rect::new(0.0, 0.0, 1080.0, 1920.0));

    // The buffer's top-left corner ends up at the top-right of the upright picture.
    let p = t * Point::new(0.0, 0.0);
    assert!((p.x - 1080.0).abs() < 1e-6 && p.y.abs() < 1e-6);
}

#[test]
fn portrait_upside_down_maps_sideways_buffer_upright_at_origin() {
    let natural = Size::new(1920, 1080);
    let corrected = Orientation::PortraitUpsideDown.corrected_size(natural);
    let t = orientation_transform(Orientation::PortraitUpsideDown, corrected, 1.0);

    let placed = t.transform_rect_bbox(Rect::new(0.0, 0.0, 1920.0, 1080.0));
    assert_rect_close(placed, Rect::new(0.0, 0.0, 1080.0, 1920.0));
}

#[test]
fn scale_is_applied_after_placement() {
    let corrected = Size::new(1080, 1920);
    let t = orientation_transform(Orientation::Portrait, corrected, 0.5);
    let placed = t.transform_rect_bbox(Rect::new(0.0, 0.0, 1920.0, 1080.0));
    assert_rect_close(placed, Rect::new(0.0, 0.0, 540.0, 960.0));
}

#[test]
fn reversed_composition_misplaces_three_orientations() {
    let corrected = Size::new(1080, 1920);
    let mut differing = 0;
    for o in ALL {
        let p = placement(o, corrected);
        let reversed = Affine::rotate(p.angle) * Affine::translate(p.offset) * Affine::scale(1.0);
        let forward = orientation_transform(o, corrected, 1.0);
        let a = forward * Point::ORIGIN;
        let b = reversed * Point::ORIGIN;
        if (a - b).hypot() > 1e-6 {
            differing += 1;
        }
    }
    assert_eq!(differing, 3);
}

#[test]
fn scale_factor_handles_degenerate_width() {
    assert_eq!(scale_factor(960, 1920), 0.5);
    assert_eq!(scale_factor(1080, 1080), 1.0);
    assert_eq!(scale_factor(640, 0), 1.0);
}

#[test]
fn quarter_turns_are_recovered_from_layer_transforms() {
    let c = Size::new(1080, 1920);
    assert_eq!(
        QuarterTurn::of(orientation_transform(Orientation::LandscapeRight, c, 2.0)),
        Some(QuarterTurn::None)
    );
    assert_eq!(
        QuarterTurn::of(orientation_transform(Orientation::Portrait, c, 1.0)),
        Some(QuarterTurn::Clockwise)
    );
    assert_eq!(
        QuarterTurn::of(orientation_transform(Orientation::PortraitUpsideDown, c, 1.0)),
        Some(QuarterTurn::CounterClockwise)
    );
    assert_eq!(
        QuarterTurn::of(Affine::scale(-1.0)),
        Some(QuarterTurn::Half)
    );
    assert_eq!(QuarterTurn::of(Affine::skew(0.3, 0.0)), None);
    assert_eq!(QuarterTurn::of(Affine::FLIP_X), None);
}
