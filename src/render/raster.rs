use std::ops::Range;

use kurbo::{Cap, Join, PathEl, StrokeOpts};

use crate::{
    eval::evaluator::ResolvedStroke,
    foundation::core::{Affine, BezPath, Canvas, Point},
    scene::model::{FillRule, LineCap, LineJoin},
};

/// Per-pixel coverage in `[0, 1]` over a whole canvas.
///
/// Only the rows in `rows` may be non-zero.
#[derive(Clone, Debug)]
pub(crate) struct Coverage {
    width: u32,
    height: u32,
    rows: Range<u32>,
    data: Vec<f32>,
}

impl Coverage {
    pub(crate) fn new(canvas: Canvas) -> Self {
        Self {
            width: canvas.width,
            height: canvas.height,
            rows: 0..0,
            data: vec![0.0; canvas.pixel_count()],
        }
    }

    /// Coverage of 1 everywhere.
    pub(crate) fn full(canvas: Canvas) -> Self {
        Self {
            width: canvas.width,
            height: canvas.height,
            rows: 0..canvas.height,
            data: vec![1.0; canvas.pixel_count()],
        }
    }

    pub(crate) fn rows(&self) -> Range<u32> {
        self.rows.clone()
    }

    pub(crate) fn get(&self, x: u32, y: u32) -> f32 {
        if !self.rows.contains(&y) || x >= self.width {
            return 0.0;
        }
        self.data[(y as usize) * (self.width as usize) + (x as usize)]
    }

    pub(crate) fn row_mut(&mut self, y: u32) -> &mut [f32] {
        let w = self.width as usize;
        let start = (y as usize) * w;
        &mut self.data[start..start + w]
    }

    pub(crate) fn set_rows(&mut self, rows: Range<u32>) {
        self.rows = rows;
    }

    fn reset(&mut self) {
        let w = self.width as usize;
        let (a, b) = (self.rows.start as usize * w, self.rows.end as usize * w);
        self.data[a..b].fill(0.0);
        self.rows = 0..0;
    }
}

#[derive(Clone, Copy, Debug)]
struct Edge {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
    dir: i32,
}

fn push_edge(edges: &mut Vec<Edge>, from: Point, to: Point) {
    if from.y == to.y || !(from.is_finite() && to.is_finite()) {
        return;
    }
    let (a, b, dir) = if from.y < to.y {
        (from, to, 1)
    } else {
        (to, from, -1)
    };
    edges.push(Edge {
        x0: a.x,
        y0: a.y,
        x1: b.x,
        y1: b.y,
        dir,
    });
}

// Open subpaths are closed implicitly, as fills require.
fn collect_edges(path: &BezPath, transform: Affine, tolerance: f64) -> Vec<Edge> {
    let mut edges = Vec::new();
    let mut start: Option<Point> = None;
    let mut cur = Point::ZERO;
    kurbo::flatten(path.iter().map(|el| transform * el), tolerance, |el| match el {
        PathEl::MoveTo(p) => {
            if let Some(s) = start {
                push_edge(&mut edges, cur, s);
            }
            start = Some(p);
            cur = p;
        }
        PathEl::LineTo(p) => {
            if start.is_none() {
                start = Some(cur);
            }
            push_edge(&mut edges, cur, p);
            cur = p;
        }
        PathEl::ClosePath => {
            if let Some(s) = start {
                push_edge(&mut edges, cur, s);
                cur = s;
            }
        }
        PathEl::QuadTo(..) | PathEl::CurveTo(..) => {}
    });
    if let Some(s) = start {
        push_edge(&mut edges, cur, s);
    }
    edges
}

fn add_span(row: &mut [f32], xa: f64, xb: f64, weight: f32) {
    let w = row.len() as f64;
    let (xa, xb) = (xa.clamp(0.0, w), xb.clamp(0.0, w));
    if xb <= xa {
        return;
    }
    let ia = xa.floor() as usize;
    let ib = xb.floor() as usize;
    if ia == ib {
        row[ia] += (xb - xa) as f32 * weight;
        return;
    }
    row[ia] += (ia as f64 + 1.0 - xa) as f32 * weight;
    for v in &mut row[ia + 1..ib] {
        *v += weight;
    }
    if ib < row.len() {
        row[ib] += (xb - ib as f64) as f32 * weight;
    }
}

/// Scanline fill of `path` mapped through `transform` into `out`.
///
/// Horizontal coverage is exact; vertically each pixel row is sampled at
/// `subsamples` evenly spaced sub-scanlines.
pub(crate) fn fill_into(
    out: &mut Coverage,
    path: &BezPath,
    transform: Affine,
    rule: FillRule,
    subsamples: u32,
    tolerance: f64,
) {
    out.reset();
    let mut edges = collect_edges(path, transform, tolerance);
    if edges.is_empty() || out.width == 0 {
        return;
    }
    edges.sort_by(|a, b| a.y0.total_cmp(&b.y0));

    let ymin = edges[0].y0;
    let ymax = edges.iter().map(|e| e.y1).fold(f64::MIN, f64::max);
    let row_start = ymin.floor().clamp(0.0, f64::from(out.height)) as u32;
    let row_end = ymax.ceil().clamp(0.0, f64::from(out.height)) as u32;
    if row_start >= row_end {
        return;
    }

    let n = subsamples.max(1);
    let weight = 1.0 / n as f32;
    let mut crossings: Vec<(f64, i32)> = Vec::new();

    for y in row_start..row_end {
        let row = out.row_mut(y);
        for s in 0..n {
            let sy = f64::from(y) + (f64::from(s) + 0.5) / f64::from(n);
            crossings.clear();
            for e in &edges {
                if e.y0 > sy {
                    break;
                }
                if sy < e.y1 {
                    let x = e.x0 + (sy - e.y0) * (e.x1 - e.x0) / (e.y1 - e.y0);
                    crossings.push((x, e.dir));
                }
            }
            crossings.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut winding = 0;
            for pair in crossings.windows(2) {
                winding += pair[0].1;
                let inside = match rule {
                    FillRule::NonZero => winding != 0,
                    FillRule::EvenOdd => winding % 2 != 0,
                };
                if inside {
                    add_span(row, pair[0].0, pair[1].0, weight);
                }
            }
        }
        for v in row.iter_mut() {
            *v = v.min(1.0);
        }
    }
    out.set_rows(row_start..row_end);
}

/// Fill outline of a stroke, in the same space as `path`.
pub(crate) fn stroke_outline(path: &BezPath, stroke: &ResolvedStroke, tolerance: f64) -> BezPath {
    let cap = match stroke.cap {
        LineCap::Butt => Cap::Butt,
        LineCap::Round => Cap::Round,
        LineCap::Square => Cap::Square,
    };
    let join = match stroke.join {
        LineJoin::Miter => Join::Miter,
        LineJoin::Round => Join::Round,
        LineJoin::Bevel => Join::Bevel,
    };
    let mut style = kurbo::Stroke::new(stroke.width)
        .with_caps(cap)
        .with_join(join)
        .with_miter_limit(stroke.miter_limit);
    if let Some((pattern, offset)) = &stroke.dash {
        style = style.with_dashes(*offset, pattern.iter().copied());
    }
    kurbo::stroke(path.iter(), &style, &StrokeOpts::default(), tolerance)
}

/// Flattening tolerance in the local space of `transform` for a device tolerance.
pub(crate) fn local_tolerance(transform: Affine, tolerance: f64) -> f64 {
    let scale = transform.determinant().abs().sqrt();
    if scale > 1e-9 {
        tolerance / scale
    } else {
        tolerance
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/raster.rs"]
mod tests;
