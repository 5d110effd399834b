use crate::{
    animation::ease::Ease,
    foundation::core::{Point, Rect, Rgba8, Vec2},
    foundation::error::{LottieError, LottieResult},
    foundation::math::{lerp_f64, lerp_u8},
};

/// Values that can be blended between two keyframes.
pub trait Lerp: Sized {
    /// Blend `a` toward `b` by `t` in `[0, 1]`.
    fn lerp(a: &Self, b: &Self, t: f64) -> Self;
}

impl Lerp for f64 {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        lerp_f64(*a, *b, t)
    }
}

impl Lerp for Vec2 {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        a.lerp(*b, t)
    }
}

impl Lerp for Point {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        a.lerp(*b, t)
    }
}

impl Lerp for Rect {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        Rect::new(
            lerp_f64(a.x0, b.x0, t),
            lerp_f64(a.y0, b.y0, t),
            lerp_f64(a.x1, b.x1, t),
            lerp_f64(a.y1, b.y1, t),
        )
    }
}

impl Lerp for Rgba8 {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        Self {
            r: lerp_u8(a.r, b.r, t),
            g: lerp_u8(a.g, b.g, t),
            b: lerp_u8(a.b, b.b, t),
            a: lerp_u8(a.a, b.a, t),
        }
    }
}

// Dash patterns only blend when both sides have the same shape.
impl Lerp for Vec<f64> {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        if a.len() != b.len() {
            return a.clone();
        }
        a.iter().zip(b).map(|(x, y)| lerp_f64(*x, *y, t)).collect()
    }
}

/// An animatable property: either a constant or a keyframe track.
///
/// Deserializes from a bare value or from `{"keyframes": [...]}`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum Anim<T> {
    /// Keyframe track sorted by frame.
    Keyframed {
        /// Keys sorted by `frame`.
        keyframes: Vec<Keyframe<T>>,
    },
    /// Value that never changes.
    Constant(T),
}

/// One sample of a keyframe track.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Keyframe<T> {
    /// Timeline position, in (possibly fractional) frames.
    pub frame: f64,
    /// Value at `frame`.
    pub value: T,
    /// Easing toward the next key.
    #[serde(default)]
    pub ease: Ease,
}

impl<T> Keyframe<T> {
    /// Build a keyframe.
    pub fn new(frame: f64, value: T, ease: Ease) -> Self {
        Self { frame, value, ease }
    }
}

impl<T> Anim<T>
where
    T: Lerp + Clone,
{
    /// Build a constant property.
    pub fn constant(value: T) -> Self {
        Self::Constant(value)
    }

    /// Build a keyframed property.
    pub fn keyframes(keyframes: Vec<Keyframe<T>>) -> Self {
        Self::Keyframed { keyframes }
    }

    /// Whether the property changes over time.
    pub fn is_animated(&self) -> bool {
        matches!(self, Self::Keyframed { keyframes } if keyframes.len() > 1)
    }

    /// Check that the track is non-empty and sorted by frame.
    pub fn validate(&self) -> LottieResult<()> {
        let Self::Keyframed { keyframes } = self else {
            return Ok(());
        };
        if keyframes.is_empty() {
            return Err(LottieError::scene_invalid(
                "keyframe track must have at least one key",
            ));
        }
        if keyframes.iter().any(|k| !k.frame.is_finite()) {
            return Err(LottieError::scene_invalid("keyframe frame must be finite"));
        }
        if !keyframes.windows(2).all(|w| w[0].frame <= w[1].frame) {
            return Err(LottieError::scene_invalid(
                "keyframe track must be sorted by frame",
            ));
        }
        Ok(())
    }

    /// Evaluate at `frame`, holding the end values outside the track.
    pub fn sample(&self, frame: f64) -> LottieResult<T> {
        let keys = match self {
            Self::Constant(v) => return Ok(v.clone()),
            Self::Keyframed { keyframes } => keyframes,
        };
        let (Some(first), Some(last)) = (keys.first(), keys.last()) else {
            return Err(LottieError::scene_invalid("keyframe track has no keys"));
        };

        let idx = keys.partition_point(|k| k.frame <= frame);
        if idx == 0 {
            return Ok(first.value.clone());
        }
        if idx >= keys.len() {
            return Ok(last.value.clone());
        }

        let a = &keys[idx - 1];
        let b = &keys[idx];
        let denom = b.frame - a.frame;
        if denom <= 0.0 {
            return Ok(a.value.clone());
        }

        let t = (frame - a.frame) / denom;
        match a.ease {
            Ease::Step => Ok(a.value.clone()),
            ease => Ok(T::lerp(&a.value, &b.value, ease.apply(t))),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/anim.rs"]
mod tests;
