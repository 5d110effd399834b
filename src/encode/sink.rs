use crate::foundation::core::{Canvas, FrameIndex};
use crate::foundation::error::LottieResult;
use crate::quantize::palette::{IndexedFrame, Palette};

/// Configuration provided to a [`FrameSink`] before the first frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkConfig {
    /// Output dimensions.
    pub canvas: Canvas,
    /// Nominal frames per second of the source.
    pub frame_rate: f64,
    /// Number of frames that will be pushed.
    pub frame_count: u64,
    /// Display time of each frame in centiseconds.
    pub delay_cs: u16,
}

/// Consumer of indexed frames in timeline order.
///
/// Ordering contract: `push_frame` is called in strictly increasing `FrameIndex` order.
pub trait FrameSink {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> LottieResult<()>;
    /// Push one frame with its palette and display delay.
    fn push_frame(
        &mut self,
        idx: FrameIndex,
        frame: IndexedFrame,
        palette: Palette,
        delay_cs: u16,
    ) -> LottieResult<()>;
    /// Called once after the last frame is pushed.
    fn end(&mut self) -> LottieResult<()>;
}

/// One frame captured by [`InMemorySink`].
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedFrame {
    /// Timeline position.
    pub idx: FrameIndex,
    /// Palette indices.
    pub frame: IndexedFrame,
    /// Frame palette.
    pub palette: Palette,
    /// Display delay in centiseconds.
    pub delay_cs: u16,
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<CapturedFrame>,
    ended: bool,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<&SinkConfig> {
        self.cfg.as_ref()
    }

    /// Captured frames in push order.
    pub fn frames(&self) -> &[CapturedFrame] {
        &self.frames
    }

    /// Whether `end` was called.
    pub fn is_ended(&self) -> bool {
        self.ended
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> LottieResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.ended = false;
        Ok(())
    }

    fn push_frame(
        &mut self,
        idx: FrameIndex,
        frame: IndexedFrame,
        palette: Palette,
        delay_cs: u16,
    ) -> LottieResult<()> {
        self.frames.push(CapturedFrame {
            idx,
            frame,
            palette,
            delay_cs,
        });
        Ok(())
    }

    fn end(&mut self) -> LottieResult<()> {
        self.ended = true;
        Ok(())
    }
}
