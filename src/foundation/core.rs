use std::fmt;

use crate::foundation::error::{LottieError, LottieResult};

pub use kurbo::{Affine, BezPath, Point, Rect, Vec2};

/// Zero-based frame index on the animation timeline.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Half-open frame range `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FrameRange {
    /// First frame inside the range.
    pub start: FrameIndex,
    /// First frame past the range.
    pub end: FrameIndex, // exclusive
}

impl FrameRange {
    /// Build a range, rejecting `start > end`.
    pub fn new(start: FrameIndex, end: FrameIndex) -> LottieResult<Self> {
        if start.0 > end.0 {
            return Err(LottieError::scene_invalid("FrameRange start must be <= end"));
        }
        Ok(Self { start, end })
    }

    /// Number of frames covered by the range.
    pub fn len_frames(self) -> u64 {
        self.end.0.saturating_sub(self.start.0)
    }

    /// Whether the range covers no frames.
    pub fn is_empty(self) -> bool {
        self.start.0 == self.end.0
    }

    /// Whether `f` lies inside `[start, end)`.
    pub fn contains(self, f: FrameIndex) -> bool {
        self.start.0 <= f.0 && f.0 < self.end.0
    }
}

/// Output surface dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Build a canvas from width and height.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of pixels on the canvas.
    pub fn pixel_count(self) -> usize {
        (self.width as usize) * (self.height as usize)
    }
}

impl std::str::FromStr for Canvas {
    type Err = LottieError;

    /// Parse `WIDTHxHEIGHT`, e.g. `200x120`. Both sides must be positive integers.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || LottieError::scene_invalid(format!("invalid size '{s}', expected WxH"));
        let (w, h) = s.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
        let w: u32 = w.trim().parse().map_err(|_| invalid())?;
        let h: u32 = h.trim().parse().map_err(|_| invalid())?;
        if w == 0 || h == 0 {
            return Err(invalid());
        }
        Ok(Self::new(w, h))
    }
}

impl fmt::Display for Canvas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Straight (non-premultiplied) RGBA8 color.
///
/// Deserializes from `[r, g, b, a]`, `[r, g, b]` or a `"#rrggbb"` / `"#rrggbbaa"` string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
pub struct Rgba8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Rgba8 {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);

    /// Build a color from its four channels.
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Build an opaque color.
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Parse `rrggbb` or `rrggbbaa` hex, with or without a leading `#`.
    pub fn from_hex(s: &str) -> LottieResult<Self> {
        let hex = s.trim().trim_start_matches('#');
        let channel = |i: usize| {
            hex.get(i..i + 2)
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| LottieError::scene_invalid(format!("invalid hex color '{s}'")))
        };
        match hex.len() {
            6 => Ok(Self::opaque(channel(0)?, channel(2)?, channel(4)?)),
            8 => Ok(Self::new(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
            _ => Err(LottieError::scene_invalid(format!("invalid hex color '{s}'"))),
        }
    }

    /// Rec. 601 luma in `[0, 1]`, ignoring alpha.
    pub fn luma(self) -> f32 {
        (0.299 * f32::from(self.r) + 0.587 * f32::from(self.g) + 0.114 * f32::from(self.b))
            / 255.0
    }
}

impl<'de> serde::Deserialize<'de> for Rgba8 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(serde::Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Rgba([u8; 4]),
            Rgb([u8; 3]),
            Hex(String),
            Obj { r: u8, g: u8, b: u8, a: u8 },
        }

        match Repr::deserialize(deserializer)? {
            Repr::Rgba([r, g, b, a]) | Repr::Obj { r, g, b, a } => Ok(Self::new(r, g, b, a)),
            Repr::Rgb([r, g, b]) => Ok(Self::opaque(r, g, b)),
            Repr::Hex(s) => Self::from_hex(&s).map_err(serde::de::Error::custom),
        }
    }
}

/// Opaque RGB8 color, used for background flattening.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Rgb8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb8 {
    /// Opaque white.
    pub const WHITE: Self = Self::new(255, 255, 255);

    /// Build a color from its three channels.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Unpack the low 24 bits of `0x??rrggbb`.
    pub const fn from_u32(v: u32) -> Self {
        Self::new(
            ((v & 0x00ff_0000) >> 16) as u8,
            ((v & 0x0000_ff00) >> 8) as u8,
            (v & 0x0000_00ff) as u8,
        )
    }

    /// Parse a hex RGB value such as `ff00ff` or `#ff00ff`. Alpha is not accepted.
    pub fn from_hex(s: &str) -> LottieResult<Self> {
        let hex = s.trim().trim_start_matches('#');
        if hex.is_empty() || hex.len() > 6 {
            return Err(LottieError::scene_invalid(format!(
                "background color '{s}' must be up to 6 hex digits (rrggbb)"
            )));
        }
        let v = u32::from_str_radix(hex, 16).map_err(|e| {
            LottieError::scene_invalid(format!("background color '{s}' is not hex: {e}"))
        })?;
        Ok(Self::from_u32(v))
    }
}

/// Layer transform in local space.
///
/// Converts to an affine matrix as `T(position) * R(rotation) * S(scale) * T(-anchor)`
/// (kurbo column-vector convention: `p' = M * p`).
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Transform2D {
    /// Translation of the anchor point in parent space.
    pub position: Vec2,
    /// Pivot in local space.
    pub anchor: Vec2,
    /// Scale factors, `(1, 1)` is identity.
    pub scale: Vec2,
    /// Clockwise rotation in degrees (y axis points down).
    pub rotation_deg: f64,
}

impl Default for Transform2D {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            anchor: Vec2::ZERO,
            scale: Vec2::new(1.0, 1.0),
            rotation_deg: 0.0,
        }
    }
}

impl Transform2D {
    /// Build the local affine matrix.
    pub fn to_affine(self) -> Affine {
        Affine::translate(self.position)
            * Affine::rotate(self.rotation_deg.to_radians())
            * Affine::scale_non_uniform(self.scale.x, self.scale.y)
            * Affine::translate(-self.anchor)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
