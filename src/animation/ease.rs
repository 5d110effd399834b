/// Easing applied between one keyframe and the next.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ease {
    /// Straight interpolation.
    #[default]
    Linear,
    /// Hold the keyframe value until the next keyframe.
    Step,
    /// CSS-style timing curve through `(0,0)`, `(x1,y1)`, `(x2,y2)`, `(1,1)`.
    Bezier([f64; 4]),
}

impl Ease {
    /// Map normalized progress `t` in `[0, 1]` to eased progress.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::Step => 0.0,
            Self::Bezier([x1, y1, x2, y2]) => bezier_ease(t, x1, y1, x2, y2),
        }
    }
}

fn cubic(p1: f64, p2: f64, t: f64) -> f64 {
    let u = 1.0 - t;
    3.0 * u * u * t * p1 + 3.0 * u * t * t * p2 + t * t * t
}

// Invert x(s) = t by bisection, then evaluate y(s).
fn bezier_ease(t: f64, x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    if x1 == y1 && x2 == y2 {
        return t;
    }
    let (x1, x2) = (x1.clamp(0.0, 1.0), x2.clamp(0.0, 1.0));
    let mut lo = 0.0f64;
    let mut hi = 1.0f64;
    let mut mid = t;
    for _ in 0..32 {
        let x = cubic(x1, x2, mid);
        if (x - t).abs() < 1e-9 {
            break;
        }
        if x < t {
            lo = mid;
        } else {
            hi = mid;
        }
        mid = 0.5 * (lo + hi);
    }
    cubic(y1, y2, mid)
}

#[cfg(test)]
#[path = "../../tests/unit/animation/ease.rs"]
mod tests;
