use crate::{
    foundation::core::Canvas,
    foundation::error::{LottieError, LottieResult},
    render::composite::{PremulRgba8, unpremultiply},
};

/// Premultiplied RGBA8 pixels, row-major, top-left origin.
///
/// Reused across frames by the session; every render clears it first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameBuffer {
    canvas: Canvas,
    data: Vec<PremulRgba8>,
}

impl FrameBuffer {
    /// Transparent buffer of `width x height`.
    pub fn new(width: u32, height: u32) -> Self {
        let canvas = Canvas::new(width, height);
        Self {
            canvas,
            data: vec![[0; 4]; canvas.pixel_count()],
        }
    }

    /// Buffer dimensions.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.canvas.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.canvas.height
    }

    /// Fill every pixel with `px`.
    pub fn clear(&mut self, px: PremulRgba8) {
        self.data.fill(px);
    }

    /// All pixels, row-major.
    pub fn pixels(&self) -> &[PremulRgba8] {
        &self.data
    }

    /// Mutable pixels, row-major.
    pub fn pixels_mut(&mut self) -> &mut [PremulRgba8] {
        &mut self.data
    }

    /// Raw bytes in `R, G, B, A` order.
    pub fn as_bytes(&self) -> &[u8] {
        self.data.as_flattened()
    }

    /// Pixel at `(x, y)`, or `None` outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<PremulRgba8> {
        self.index(x, y).map(|i| self.data[i])
    }

    /// Pixel at `(x, y)` packed as `0xAARRGGBB`.
    pub fn argb(&self, x: u32, y: u32) -> Option<u32> {
        self.pixel(x, y).map(pack_argb)
    }

    /// Every pixel packed as `0xAARRGGBB`.
    pub fn to_argb_words(&self) -> Vec<u32> {
        self.data.iter().copied().map(pack_argb).collect()
    }

    /// Overwrite the buffer from `0xAARRGGBB` words.
    pub fn copy_from_argb_words(&mut self, words: &[u32]) -> LottieResult<()> {
        if words.len() != self.data.len() {
            return Err(LottieError::Other(anyhow::anyhow!(
                "expected {} argb words for {}, got {}",
                self.data.len(),
                self.canvas,
                words.len()
            )));
        }
        for (px, w) in self.data.iter_mut().zip(words) {
            let [a, r, g, b] = w.to_be_bytes();
            *px = [r, g, b, a];
        }
        Ok(())
    }

    /// Straight-alpha RGBA8 bytes, as image encoders expect.
    pub fn to_straight_rgba8(&self) -> Vec<u8> {
        self.data.iter().flat_map(|px| unpremultiply(*px)).collect()
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.canvas.width && y < self.canvas.height)
            .then(|| (y as usize) * (self.canvas.width as usize) + (x as usize))
    }
}

fn pack_argb([r, g, b, a]: PremulRgba8) -> u32 {
    u32::from_be_bytes([a, r, g, b])
}

#[cfg(test)]
#[path = "../../tests/unit/render/buffer.rs"]
mod tests;
