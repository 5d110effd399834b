use std::collections::HashMap;

use crate::{
    foundation::core::{Canvas, Rgba8},
    foundation::error::{LottieError, LottieResult},
    render::buffer::FrameBuffer,
};

/// Maximum number of palette entries in an indexed frame.
pub const MAX_PALETTE_LEN: usize = 256;

/// How colors beyond the palette capacity are handled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PaletteMode {
    /// Keep the 256 most frequent colors and map the rest to their nearest entry.
    #[default]
    Approximate,
    /// Fail with [`LottieError::PaletteOverflow`] when a frame has more than 256 colors.
    Exact,
}

/// Quantizer configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QuantizeOpts {
    /// Overflow policy.
    pub mode: PaletteMode,
}

/// Ordered color table of up to 256 entries.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Rgba8>,
}

impl Palette {
    /// Entries in index order.
    pub fn colors(&self) -> &[Rgba8] {
        &self.colors
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Whether the palette has no entries.
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// First fully transparent entry, if any.
    pub fn transparent_index(&self) -> Option<u8> {
        self.colors
            .iter()
            .position(|c| c.a == 0)
            .and_then(|i| u8::try_from(i).ok())
    }

    /// `R, G, B` triples as a GIF color table expects.
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        self.colors.iter().flat_map(|c| [c.r, c.g, c.b]).collect()
    }
}

/// Frame expressed as palette indices.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexedFrame {
    /// Frame dimensions.
    pub canvas: Canvas,
    /// One palette index per pixel, row-major.
    pub indices: Vec<u8>,
    /// Palette index used for fully transparent pixels.
    pub transparent: Option<u8>,
}

/// Pack a pixel as `(r << 24) | (g << 16) | (b << 8) | a`.
pub fn pack_key(px: [u8; 4]) -> u32 {
    u32::from_be_bytes(px)
}

fn unpack_key(key: u32) -> Rgba8 {
    let [r, g, b, a] = key.to_be_bytes();
    Rgba8::new(r, g, b, a)
}

/// Reduces a rendered frame to at most 256 colors.
#[derive(Clone, Debug, Default)]
pub struct PaletteQuantizer {
    opts: QuantizeOpts,
}

impl PaletteQuantizer {
    /// Quantizer with the given options.
    pub fn new(opts: QuantizeOpts) -> Self {
        Self { opts }
    }

    /// Build a palette from the frame's color histogram and index every pixel.
    ///
    /// Entries are ordered by descending frequency, ties broken by ascending key.
    /// Pixels whose color did not make the cut map to the nearest entry by squared
    /// RGBA distance (lowest index on ties).
    pub fn quantize(&self, frame: &FrameBuffer) -> LottieResult<(IndexedFrame, Palette)> {
        let pixels = frame.pixels();
        let mut histogram: HashMap<u32, u32> = HashMap::new();
        for px in pixels {
            *histogram.entry(pack_key(*px)).or_insert(0) += 1;
        }

        let distinct = histogram.len();
        if self.opts.mode == PaletteMode::Exact && distinct > MAX_PALETTE_LEN {
            return Err(LottieError::PaletteOverflow { distinct });
        }

        let mut ranked: Vec<(u32, u32)> = histogram.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(MAX_PALETTE_LEN);

        let palette = Palette {
            colors: ranked.iter().map(|(key, _)| unpack_key(*key)).collect(),
        };
        let mut lookup: HashMap<u32, u8> = ranked
            .iter()
            .enumerate()
            .map(|(i, (key, _))| (*key, i as u8))
            .collect();

        let mut indices = Vec::with_capacity(pixels.len());
        for px in pixels {
            let key = pack_key(*px);
            let idx = match lookup.get(&key) {
                Some(i) => *i,
                None => {
                    let i = nearest(&palette.colors, *px);
                    lookup.insert(key, i);
                    i
                }
            };
            indices.push(idx);
        }

        if distinct > MAX_PALETTE_LEN {
            tracing::debug!(distinct, "palette reduced to {MAX_PALETTE_LEN} entries");
        }

        let transparent = palette.transparent_index();
        Ok((
            IndexedFrame {
                canvas: frame.canvas(),
                indices,
                transparent,
            },
            palette,
        ))
    }
}

fn nearest(colors: &[Rgba8], px: [u8; 4]) -> u8 {
    let dist = |c: &Rgba8| {
        let d = |a: u8, b: u8| {
            let v = i32::from(a) - i32::from(b);
            (v * v) as u32
        };
        d(c.r, px[0]) + d(c.g, px[1]) + d(c.b, px[2]) + d(c.a, px[3])
    };
    let mut best = 0usize;
    let mut best_d = u32::MAX;
    for (i, c) in colors.iter().enumerate() {
        let dd = dist(c);
        if dd < best_d {
            best = i;
            best_d = dd;
        }
    }
    best as u8
}

#[cfg(test)]
#[path = "../../tests/unit/quantize/palette.rs"]
mod tests;
