use rayon::prelude::*;

use crate::{
    encode::sink::{FrameSink, SinkConfig},
    eval::evaluator::{Evaluator, RenderList},
    foundation::core::{Canvas, FrameIndex},
    foundation::error::{LottieError, LottieResult},
    quantize::palette::{IndexedFrame, Palette, PaletteQuantizer, QuantizeOpts},
    render::buffer::FrameBuffer,
    render::cpu::{RasterOpts, Rasterizer},
    scene::decode::Animation,
    scene::model::SceneGraph,
};

/// Frame rates above this are rendered but flagged; GIF delays get coarse past it.
const FRAME_RATE_WARN_THRESHOLD: f64 = 30.0;

/// Options controlling [`RenderSession`].
#[derive(Clone, Debug, PartialEq)]
pub struct RenderSessionOpts {
    /// Rasterizer configuration (background, anti-aliasing).
    pub raster: RasterOpts,
    /// Palette configuration.
    pub quantize: QuantizeOpts,
    /// Enable frame-level parallelism on a dedicated rayon pool.
    pub parallel: bool,
    /// Override the number of worker threads. `None` uses rayon defaults.
    pub threads: Option<usize>,
    /// Frames rendered per parallel batch before they are handed to the sink.
    pub chunk_size: usize,
    /// Render every Nth frame; the delay is stretched to keep the duration.
    pub frame_step: u32,
    /// Fixed per-frame delay in centiseconds instead of the derived one.
    pub delay_override_cs: Option<u16>,
}

impl Default for RenderSessionOpts {
    fn default() -> Self {
        Self {
            raster: RasterOpts::default(),
            quantize: QuantizeOpts::default(),
            parallel: false,
            threads: None,
            chunk_size: 32,
            frame_step: 1,
            delay_override_cs: None,
        }
    }
}

/// Range render statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Frames on the animation timeline.
    pub frames_total: u64,
    /// Frames rendered and pushed to the sink.
    pub frames_rendered: u64,
    /// Largest palette used by any frame.
    pub max_palette_len: usize,
}

/// Per-frame delay in centiseconds: `round(duration * 100 * step / total_frames)`,
/// clamped to `[1, u16::MAX]`.
pub fn frame_delay_cs(duration_secs: f64, total_frames: u64, frame_step: u32) -> u16 {
    if total_frames == 0 || !duration_secs.is_finite() {
        return 1;
    }
    let cs = (duration_secs * 100.0 * f64::from(frame_step.max(1)) / total_frames as f64).round();
    cs.clamp(1.0, f64::from(u16::MAX)) as u16
}

/// Drives evaluate, rasterize, quantize and encode for every frame of an animation.
///
/// The sequential path reuses one [`FrameBuffer`] and one [`RenderList`] for all frames.
pub struct RenderSession<'a> {
    anim: &'a Animation,
    canvas: Canvas,
    opts: RenderSessionOpts,
    rasterizer: Rasterizer,
    quantizer: PaletteQuantizer,
    list: RenderList,
    buffer: FrameBuffer,
}

impl<'a> RenderSession<'a> {
    /// Session rendering `anim` at `output` size, or its native size when `None`.
    pub fn new(
        anim: &'a Animation,
        output: Option<Canvas>,
        opts: RenderSessionOpts,
    ) -> LottieResult<Self> {
        let canvas = output.unwrap_or_else(|| anim.size());
        if canvas.width == 0 || canvas.height == 0 {
            return Err(LottieError::Other(anyhow::anyhow!(
                "output size must be non-empty, got {canvas}"
            )));
        }
        if opts.frame_step == 0 {
            return Err(LottieError::Other(anyhow::anyhow!(
                "frame_step must be >= 1"
            )));
        }
        if anim.frame_rate() > FRAME_RATE_WARN_THRESHOLD {
            tracing::warn!(
                frame_rate = anim.frame_rate(),
                "frame rate above {FRAME_RATE_WARN_THRESHOLD} fps; gif players may slow it down"
            );
        }
        Ok(Self {
            anim,
            canvas,
            rasterizer: Rasterizer::new(opts.raster.clone()),
            quantizer: PaletteQuantizer::new(opts.quantize),
            list: RenderList::empty(anim.size()),
            buffer: FrameBuffer::new(canvas.width, canvas.height),
            opts,
        })
    }

    /// Output dimensions.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Frames that will be rendered, in order.
    pub fn frames(&self) -> Vec<FrameIndex> {
        (0..self.anim.total_frames())
            .step_by(self.opts.frame_step.max(1) as usize)
            .map(FrameIndex)
            .collect()
    }

    /// Display time of each rendered frame.
    pub fn frame_delay_cs(&self) -> u16 {
        self.opts.delay_override_cs.map_or_else(
            || {
                frame_delay_cs(
                    self.anim.duration_secs(),
                    self.anim.total_frames(),
                    self.opts.frame_step,
                )
            },
            |cs| cs.max(1),
        )
    }

    /// Evaluate and rasterize one frame into the session buffer.
    pub fn render_frame(&mut self, frame: FrameIndex) -> LottieResult<&FrameBuffer> {
        Evaluator::evaluate_into(self.anim.scene(), frame, &mut self.list)?;
        self.rasterizer.render_into(&self.list, &mut self.buffer)?;
        Ok(&self.buffer)
    }

    /// Render every selected frame and stream it into `sink` in timeline order.
    #[tracing::instrument(skip(self, sink), fields(size = %self.canvas))]
    pub fn render_to_sink(&mut self, sink: &mut dyn FrameSink) -> LottieResult<RenderStats> {
        let frames = self.frames();
        let delay_cs = self.frame_delay_cs();
        sink.begin(SinkConfig {
            canvas: self.canvas,
            frame_rate: self.anim.frame_rate(),
            frame_count: frames.len() as u64,
            delay_cs,
        })?;

        let mut stats = RenderStats {
            frames_total: self.anim.total_frames(),
            ..RenderStats::default()
        };
        let mut emit = |idx: FrameIndex, frame: IndexedFrame, palette: Palette| {
            stats.frames_rendered += 1;
            stats.max_palette_len = stats.max_palette_len.max(palette.len());
            tracing::debug!(frame = idx.0, palette = palette.len(), "frame ready");
            sink.push_frame(idx, frame, palette, delay_cs)
        };

        if self.opts.parallel {
            let pool = build_thread_pool(self.opts.threads)?;
            let ctx = FrameCtx {
                scene: self.anim.scene(),
                canvas: self.canvas,
                rasterizer: &self.rasterizer,
                quantizer: &self.quantizer,
            };
            for chunk in frames.chunks(self.opts.chunk_size.max(1)) {
                let rendered: Vec<LottieResult<(IndexedFrame, Palette)>> = pool.install(|| {
                    chunk
                        .par_iter()
                        .map_init(
                            || ctx.scratch(),
                            |(list, buffer), &f| ctx.render(f, list, buffer),
                        )
                        .collect()
                });
                for (&idx, res) in chunk.iter().zip(rendered) {
                    let (frame, palette) = res?;
                    emit(idx, frame, palette)?;
                }
            }
        } else {
            for &idx in &frames {
                Evaluator::evaluate_into(self.anim.scene(), idx, &mut self.list)?;
                self.rasterizer.render_into(&self.list, &mut self.buffer)?;
                let (frame, palette) = self.quantizer.quantize(&self.buffer)?;
                emit(idx, frame, palette)?;
            }
        }

        sink.end()?;
        tracing::info!(
            frames = stats.frames_rendered,
            delay_cs,
            max_palette = stats.max_palette_len,
            "render finished"
        );
        Ok(stats)
    }
}

// Shared, read-only state for parallel workers; each worker owns its scratch buffers.
#[derive(Clone, Copy)]
struct FrameCtx<'a> {
    scene: &'a SceneGraph,
    canvas: Canvas,
    rasterizer: &'a Rasterizer,
    quantizer: &'a PaletteQuantizer,
}

impl FrameCtx<'_> {
    fn scratch(&self) -> (RenderList, FrameBuffer) {
        (
            RenderList::empty(self.scene.canvas()),
            FrameBuffer::new(self.canvas.width, self.canvas.height),
        )
    }

    fn render(
        &self,
        frame: FrameIndex,
        list: &mut RenderList,
        buffer: &mut FrameBuffer,
    ) -> LottieResult<(IndexedFrame, Palette)> {
        Evaluator::evaluate_into(self.scene, frame, list)?;
        self.rasterizer.render_into(list, buffer)?;
        self.quantizer.quantize(buffer)
    }
}

fn build_thread_pool(threads: Option<usize>) -> LottieResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(LottieError::Other(anyhow::anyhow!(
            "'threads' must be >= 1 when set"
        )));
    }
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| LottieError::Other(anyhow::anyhow!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/session/render_session.rs"]
mod tests;
