use crate::{
    animation::anim::Lerp,
    eval::evaluator::ResolvedPaint,
    foundation::core::{Affine, Point, Rgba8, Vec2},
    scene::model::GradientStop,
};

/// Per-pixel color lookup for a resolved paint drawn through a device transform.
pub(crate) struct PaintSampler<'a> {
    paint: &'a ResolvedPaint,
    inverse: Option<Affine>,
}

impl<'a> PaintSampler<'a> {
    /// `device` maps shape space to pixel space.
    pub(crate) fn new(paint: &'a ResolvedPaint, device: Affine) -> Self {
        let inverse = (device.determinant().abs() > 1e-12).then(|| device.inverse());
        Self { paint, inverse }
    }

    /// Straight-alpha color at the center of pixel `(x, y)`.
    pub(crate) fn color_at(&self, x: u32, y: u32) -> Rgba8 {
        let (stops, t) = match self.paint {
            ResolvedPaint::Solid(c) => return *c,
            ResolvedPaint::Linear { start, end, stops } => {
                let Some(p) = self.local(x, y) else {
                    return first_color(stops);
                };
                (stops, linear_t(*start, *end, p))
            }
            ResolvedPaint::Radial {
                center,
                focal,
                radius,
                stops,
            } => {
                let Some(p) = self.local(x, y) else {
                    return first_color(stops);
                };
                (stops, radial_t(*center, *focal, *radius, p))
            }
        };
        stop_color(stops, t)
    }

    fn local(&self, x: u32, y: u32) -> Option<Point> {
        self.inverse
            .map(|inv| inv * Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5))
    }
}

fn first_color(stops: &[GradientStop]) -> Rgba8 {
    stops.first().map_or(Rgba8::TRANSPARENT, |s| s.color)
}

/// Projection of `p` onto the `start -> end` axis, clamped to `[0, 1]`.
pub(crate) fn linear_t(start: Point, end: Point, p: Point) -> f64 {
    let axis = end - start;
    let len2 = axis.hypot2();
    if len2 <= f64::EPSILON {
        return 0.0;
    }
    ((p - start).dot(axis) / len2).clamp(0.0, 1.0)
}

/// Gradient offset of `p` for a focal radial gradient, clamped to `[0, 1]`.
///
/// Solves for the circle centered at `focal + t * (center - focal)` with radius
/// `t * radius` that passes through `p`. The focal point is pulled inside the circle.
pub(crate) fn radial_t(center: Point, focal: Point, radius: f64, p: Point) -> f64 {
    if radius <= f64::EPSILON {
        return 1.0;
    }
    let mut e: Vec2 = center - focal;
    let max_offset = radius * 0.99;
    if e.hypot() > max_offset {
        e = e * (max_offset / e.hypot());
    }
    let focal = center - e;
    let d = p - focal;

    let a = e.hypot2() - radius * radius;
    let b = d.dot(e);
    let c = d.hypot2();
    // a < 0 because the focal point lies inside the circle, so the roots have opposite signs.
    let disc = (b * b - a * c).max(0.0);
    let t = (b - disc.sqrt()) / a;
    if t.is_finite() { t.clamp(0.0, 1.0) } else { 1.0 }
}

/// Color at offset `t` between the two nearest stops.
pub(crate) fn stop_color(stops: &[GradientStop], t: f64) -> Rgba8 {
    let (Some(first), Some(last)) = (stops.first(), stops.last()) else {
        return Rgba8::TRANSPARENT;
    };
    if t <= first.offset {
        return first.color;
    }
    if t >= last.offset {
        return last.color;
    }
    let idx = stops.partition_point(|s| s.offset <= t);
    let (a, b) = (&stops[idx - 1], &stops[idx]);
    let span = b.offset - a.offset;
    if span <= f64::EPSILON {
        return b.color;
    }
    Rgba8::lerp(&a.color, &b.color, (t - a.offset) / span)
}

#[cfg(test)]
#[path = "../../tests/unit/render/paint.rs"]
mod tests;
