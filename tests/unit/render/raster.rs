use kurbo::Shape as _;

use super::*;

fn rect_path(x0: f64, y0: f64, x1: f64, y1: f64) -> BezPath {
    kurbo::Rect::new(x0, y0, x1, y1).to_path(0.1)
}

fn fill(path: &BezPath, canvas: Canvas, rule: FillRule) -> Coverage {
    let mut cov = Coverage::new(canvas);
    fill_into(&mut cov, path, Affine::IDENTITY, rule, 4, 0.1);
    cov
}

#[test]
fn pixel_aligned_rect_is_fully_covered() {
    let cov = fill(&rect_path(0.0, 0.0, 10.0, 10.0), Canvas::new(10, 10), FillRule::NonZero);
    assert_eq!(cov.rows(), 0..10);
    for y in 0..10 {
        for x in 0..10 {
            assert_eq!(cov.get(x, y), 1.0, "pixel ({x}, {y})");
        }
    }
}

#[test]
fn partial_pixels_get_fractional_coverage() {
    let canvas = Canvas::new(2, 2);
    let cov = fill(&rect_path(0.0, 0.0, 0.5, 1.0), canvas, FillRule::NonZero);
    assert_eq!(cov.get(0, 0), 0.5);
    assert_eq!(cov.get(1, 0), 0.0);
    assert_eq!(cov.get(0, 1), 0.0);

    let cov = fill(&rect_path(0.0, 0.0, 2.0, 0.5), canvas, FillRule::NonZero);
    assert_eq!(cov.get(0, 0), 0.5);
    assert_eq!(cov.get(1, 0), 0.5);
}

#[test]
fn winding_rules_differ_for_nested_rects() {
    let mut path = rect_path(0.0, 0.0, 4.0, 4.0);
    path.extend(rect_path(1.0, 1.0, 3.0, 3.0));
    let canvas = Canvas::new(4, 4);

    let nonzero = fill(&path, canvas, FillRule::NonZero);
    assert_eq!(nonzero.get(2, 2), 1.0);
    assert_eq!(nonzero.get(0, 0), 1.0);

    let evenodd = fill(&path, canvas, FillRule::EvenOdd);
    assert_eq!(evenodd.get(2, 2), 0.0);
    assert_eq!(evenodd.get(0, 0), 1.0);
}

#[test]
fn open_subpaths_are_closed_for_filling() {
    let mut path = BezPath::new();
    path.move_to((0.0, 0.0));
    path.line_to((4.0, 0.0));
    path.line_to((4.0, 4.0));
    path.line_to((0.0, 4.0));
    let cov = fill(&path, Canvas::new(4, 4), FillRule::NonZero);
    assert_eq!(cov.get(1, 1), 1.0);
    assert_eq!(cov.get(3, 3), 1.0);
}

#[test]
fn geometry_outside_canvas_is_clipped() {
    let cov = fill(&rect_path(-5.0, -5.0, 5.0, 5.0), Canvas::new(10, 10), FillRule::NonZero);
    assert_eq!(cov.rows(), 0..5);
    assert_eq!(cov.get(4, 4), 1.0);
    assert_eq!(cov.get(5, 4), 0.0);
    assert_eq!(cov.get(4, 5), 0.0);

    let none = fill(&rect_path(20.0, 20.0, 30.0, 30.0), Canvas::new(10, 10), FillRule::NonZero);
    assert!(none.rows().is_empty());
}

#[test]
fn transform_is_applied_before_scan() {
    let mut cov = Coverage::new(Canvas::new(10, 10));
    fill_into(
        &mut cov,
        &rect_path(0.0, 0.0, 1.0, 1.0),
        Affine::translate((2.0, 3.0)) * Affine::scale(2.0),
        FillRule::NonZero,
        4,
        0.1,
    );
    assert_eq!(cov.rows(), 3..5);
    assert_eq!(cov.get(2, 3), 1.0);
    assert_eq!(cov.get(3, 4), 1.0);
    assert_eq!(cov.get(4, 4), 0.0);
}

#[test]
fn reused_coverage_is_reset() {
    let mut cov = Coverage::new(Canvas::new(4, 4));
    fill_into(&mut cov, &rect_path(0.0, 0.0, 4.0, 4.0), Affine::IDENTITY, FillRule::NonZero, 4, 0.1);
    fill_into(&mut cov, &rect_path(0.0, 0.0, 1.0, 1.0), Affine::IDENTITY, FillRule::NonZero, 4, 0.1);
    assert_eq!(cov.get(0, 0), 1.0);
    assert_eq!(cov.get(3, 3), 0.0);
}

#[test]
fn stroke_outline_spans_half_width_each_side() {
    let mut line = BezPath::new();
    line.move_to((0.0, 5.0));
    line.line_to((10.0, 5.0));
    let stroke = ResolvedStroke {
        width: 2.0,
        cap: LineCap::Butt,
        join: LineJoin::Miter,
        miter_limit: 4.0,
        dash: None,
    };
    let bb = stroke_outline(&line, &stroke, 0.01).bounding_box();
    assert!((bb.y0 - 4.0).abs() < 1e-6 && (bb.y1 - 6.0).abs() < 1e-6);
    assert!(bb.x0.abs() < 1e-6 && (bb.x1 - 10.0).abs() < 1e-6);

    let square = ResolvedStroke {
        cap: LineCap::Square,
        ..stroke.clone()
    };
    let bb = stroke_outline(&line, &square, 0.01).bounding_box();
    assert!((bb.x0 + 1.0).abs() < 1e-6 && (bb.x1 - 11.0).abs() < 1e-6);
}

#[test]
fn dashed_stroke_leaves_gaps() {
    let mut line = BezPath::new();
    line.move_to((0.0, 5.0));
    line.line_to((10.0, 5.0));
    let stroke = ResolvedStroke {
        width: 2.0,
        cap: LineCap::Butt,
        join: LineJoin::Miter,
        miter_limit: 4.0,
        dash: Some((vec![2.0, 2.0], 0.0)),
    };
    let outline = stroke_outline(&line, &stroke, 0.01);
    let cov = fill(&outline, Canvas::new(10, 10), FillRule::NonZero);
    assert!(cov.get(0, 4) > 0.999);
    assert!(cov.get(2, 4) < 0.001);
    assert!(cov.get(4, 4) > 0.999);
}

#[test]
fn local_tolerance_scales_inversely() {
    assert_eq!(local_tolerance(Affine::scale(4.0), 0.2), 0.05);
    assert_eq!(local_tolerance(Affine::IDENTITY, 0.2), 0.2);
    assert_eq!(local_tolerance(Affine::scale(0.0), 0.2), 0.2);
}
