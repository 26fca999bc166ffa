//! Rotated IoU geometry cases with hand-derived expected values.

use detops::kernels::{box_iou_rotated_pair, RotatedBox};

fn bx(cx: f32, cy: f32, w: f32, h: f32, angle: f32) -> RotatedBox {
    RotatedBox { cx, cy, w, h, angle }
}

fn assert_close(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() < 1e-5,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn identical_boxes_have_full_overlap() {
    let a = bx(3.0, -2.0, 4.0, 2.0, 0.7);
    assert_close(box_iou_rotated_pair(&a, &a), 1.0);
}

#[test]
fn disjoint_boxes_have_zero_overlap() {
    let a = bx(0.0, 0.0, 2.0, 2.0, 0.3);
    let b = bx(100.0, 100.0, 2.0, 2.0, -0.9);
    assert_close(box_iou_rotated_pair(&a, &b), 0.0);
}

#[test]
fn axis_aligned_half_offset_is_one_third() {
    // Unit squares offset by half a side: intersection 0.5, union 1.5.
    let a = bx(0.0, 0.0, 1.0, 1.0, 0.0);
    let b = bx(0.5, 0.0, 1.0, 1.0, 0.0);
    assert_close(box_iou_rotated_pair(&a, &b), 1.0 / 3.0);
}

#[test]
fn diagonal_turn_same_center_is_sqrt2_over_2() {
    // Side-2 squares sharing a center, one turned 45 degrees: the
    // intersection is a regular octagon and the IoU reduces to sqrt(2)/2.
    let a = bx(0.0, 0.0, 2.0, 2.0, 0.0);
    let b = bx(0.0, 0.0, 2.0, 2.0, std::f32::consts::FRAC_PI_4);
    assert_close(box_iou_rotated_pair(&a, &b), std::f32::consts::FRAC_1_SQRT_2);
}

#[test]
fn contained_box_ratio_is_area_quotient() {
    // The rotated inner square stays strictly inside the outer one, so the
    // intersection is the inner area: IoU = 4 / 16.
    let outer = bx(0.0, 0.0, 4.0, 4.0, 0.0);
    let inner = bx(0.0, 0.0, 2.0, 2.0, 0.3);
    assert_close(box_iou_rotated_pair(&outer, &inner), 0.25);
}

#[test]
fn rotation_is_periodic() {
    let a = bx(1.0, 1.0, 3.0, 1.5, 0.4);
    let b = bx(1.5, 0.5, 2.0, 2.5, -0.2);
    let b_turned = bx(1.5, 0.5, 2.0, 2.5, -0.2 + 2.0 * std::f32::consts::PI);
    let plain = box_iou_rotated_pair(&a, &b);
    let turned = box_iou_rotated_pair(&a, &b_turned);
    assert!((plain - turned).abs() < 1e-5);
}

#[test]
fn overlap_is_symmetric() {
    let a = bx(0.0, 0.0, 3.0, 2.0, 0.9);
    let b = bx(1.0, -0.5, 2.0, 2.0, -0.4);
    assert_close(
        box_iou_rotated_pair(&a, &b),
        box_iou_rotated_pair(&b, &a),
    );
}

#[test]
fn degenerate_extents_yield_zero() {
    let line = bx(0.0, 0.0, 0.0, 5.0, 0.2);
    let square = bx(0.0, 0.0, 2.0, 2.0, 0.0);
    assert_close(box_iou_rotated_pair(&line, &square), 0.0);
    assert_close(box_iou_rotated_pair(&square, &line), 0.0);
    assert_close(box_iou_rotated_pair(&line, &line), 0.0);
}

#[test]
fn touching_edges_do_not_overlap() {
    // Side-by-side unit squares share only a boundary line.
    let a = bx(0.0, 0.0, 1.0, 1.0, 0.0);
    let b = bx(1.0, 0.0, 1.0, 1.0, 0.0);
    assert_close(box_iou_rotated_pair(&a, &b), 0.0);
}

#[test]
fn from_row_ignores_extra_columns() {
    let row = [1.0, 2.0, 3.0, 4.0, 5.0, 9.0];
    let parsed = RotatedBox::from_row(&row);
    assert_eq!(parsed, bx(1.0, 2.0, 3.0, 4.0, 5.0));
}
