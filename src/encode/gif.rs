use std::{borrow::Cow, io::Write};

use crate::{
    encode::sink::{FrameSink, SinkConfig},
    foundation::core::{Canvas, FrameIndex},
    foundation::error::{LottieError, LottieResult},
    quantize::palette::{IndexedFrame, Palette},
};

/// Check that `canvas` is non-empty and fits the 16-bit GIF screen size.
///
/// Cheap enough to run before any pixel storage is allocated.
pub fn check_gif_canvas(canvas: Canvas) -> LottieResult<()> {
    if canvas.width == 0 || canvas.height == 0 {
        return Err(LottieError::encode(format!("gif canvas must be non-empty, got {canvas}")));
    }
    if u16::try_from(canvas.width).is_err() || u16::try_from(canvas.height).is_err() {
        return Err(LottieError::encode(format!(
            "gif canvas {canvas} exceeds {}x{}",
            u16::MAX,
            u16::MAX
        )));
    }
    Ok(())
}

// Sink write failures stay I/O errors; everything else is an encode error.
fn gif_error(stage: &str, err: ::gif::EncodingError) -> LottieError {
    match err {
        ::gif::EncodingError::Io(e) => LottieError::Io(e),
        other => LottieError::encode(format!("{stage}: {other}")),
    }
}

struct PendingFrame {
    frame: IndexedFrame,
    palette: Palette,
    delay_cs: u16,
}

/// Animated GIF writer with an infinite loop count.
///
/// Frames are buffered until [`GifEncoder::finalize`], which writes the header,
/// one image block per frame with its own local color table, and the trailer.
pub struct GifEncoder<W: Write> {
    sink: Option<W>,
    canvas: Canvas,
    frames: Vec<PendingFrame>,
}

impl<W: Write> GifEncoder<W> {
    /// Start a session writing a `width x height` animation to `sink`.
    ///
    /// Fails as [`check_gif_canvas`] does.
    pub fn open(sink: W, width: u32, height: u32) -> LottieResult<Self> {
        let canvas = Canvas::new(width, height);
        check_gif_canvas(canvas)?;
        Ok(Self {
            sink: Some(sink),
            canvas,
            frames: Vec::new(),
        })
    }

    /// Session dimensions.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Number of frames appended so far.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Queue a frame displayed for `delay_cs` centiseconds.
    pub fn append_frame(
        &mut self,
        frame: IndexedFrame,
        palette: Palette,
        delay_cs: u16,
    ) -> LottieResult<()> {
        if self.sink.is_none() {
            return Err(LottieError::AlreadyFinalized);
        }
        if frame.canvas != self.canvas {
            return Err(LottieError::dimension_mismatch(self.canvas, frame.canvas));
        }
        if frame.indices.len() != self.canvas.pixel_count() {
            return Err(LottieError::encode(format!(
                "frame holds {} indices, expected {}",
                frame.indices.len(),
                self.canvas.pixel_count()
            )));
        }
        if palette.is_empty() {
            return Err(LottieError::encode("frame palette must be non-empty"));
        }
        self.frames.push(PendingFrame {
            frame,
            palette,
            delay_cs,
        });
        Ok(())
    }

    /// Write the whole animation and hand the sink back.
    ///
    /// A second call fails with [`LottieError::AlreadyFinalized`].
    pub fn finalize(&mut self) -> LottieResult<W> {
        let Some(mut sink) = self.sink.take() else {
            return Err(LottieError::AlreadyFinalized);
        };
        let frames = std::mem::take(&mut self.frames);
        // Dimensions were checked in `open`.
        let (w, h) = (self.canvas.width as u16, self.canvas.height as u16);

        {
            let mut enc = ::gif::Encoder::new(&mut sink, w, h, &[])
                .map_err(|e| gif_error("write gif header", e))?;
            enc.set_repeat(::gif::Repeat::Infinite)
                .map_err(|e| gif_error("write gif loop extension", e))?;

            for p in &frames {
                let dispose = if p.frame.transparent.is_some() {
                    ::gif::DisposalMethod::Background
                } else {
                    ::gif::DisposalMethod::Keep
                };
                let frame = ::gif::Frame {
                    width: w,
                    height: h,
                    delay: p.delay_cs,
                    dispose,
                    transparent: p.frame.transparent,
                    palette: Some(p.palette.to_rgb_bytes()),
                    buffer: Cow::Borrowed(&p.frame.indices),
                    ..::gif::Frame::default()
                };
                enc.write_frame(&frame)
                    .map_err(|e| gif_error("write gif frame", e))?;
            }
            enc.into_inner()?;
        }
        sink.flush()?;

        tracing::info!(
            frames = frames.len(),
            size = %self.canvas,
            "gif animation written"
        );
        Ok(sink)
    }
}

impl<W: Write> FrameSink for GifEncoder<W> {
    fn begin(&mut self, cfg: SinkConfig) -> LottieResult<()> {
        if cfg.canvas != self.canvas {
            return Err(LottieError::dimension_mismatch(self.canvas, cfg.canvas));
        }
        Ok(())
    }

    fn push_frame(
        &mut self,
        _idx: FrameIndex,
        frame: IndexedFrame,
        palette: Palette,
        delay_cs: u16,
    ) -> LottieResult<()> {
        self.append_frame(frame, palette, delay_cs)
    }

    fn end(&mut self) -> LottieResult<()> {
        self.finalize().map(drop)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/gif.rs"]
mod tests;
