use crate::{
    eval::evaluator::{GroupId, MatteRef, PaintStyle, RenderList, RenderNode},
    foundation::core::{Affine, Canvas, Rgb8},
    foundation::error::{LottieError, LottieResult},
    render::buffer::FrameBuffer,
    render::composite::{flatten_on, over, premul_luma, premultiply},
    render::paint::PaintSampler,
    render::raster::{Coverage, fill_into, local_tolerance, stroke_outline},
    scene::model::{FillRule, MaskMode, MatteMode},
};

/// Environment variable overriding the default [`RasterOpts::subsamples`].
pub const SUBSAMPLES_ENV: &str = "LOTTIE2GIF_SUBSAMPLES";

/// Rasterizer configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct RasterOpts {
    /// Opaque color to flatten onto after painting; `None` keeps transparency.
    pub background: Option<Rgb8>,
    /// Vertical sub-scanlines per pixel row used for anti-aliasing.
    pub subsamples: u32,
    /// Curve flattening tolerance in device pixels.
    pub tolerance: f64,
}

impl Default for RasterOpts {
    fn default() -> Self {
        let subsamples = std::env::var(SUBSAMPLES_ENV)
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(4);
        Self {
            background: None,
            subsamples,
            tolerance: 0.1,
        }
    }
}

/// CPU rasterizer turning a [`RenderList`] into premultiplied pixels.
#[derive(Clone, Debug, Default)]
pub struct Rasterizer {
    opts: RasterOpts,
}

impl Rasterizer {
    /// Rasterizer with the given options.
    pub fn new(opts: RasterOpts) -> Self {
        Self { opts }
    }

    /// Active options.
    pub fn opts(&self) -> &RasterOpts {
        &self.opts
    }

    /// Render into a fresh `width x height` buffer.
    pub fn render(&self, list: &RenderList, width: u32, height: u32) -> LottieResult<FrameBuffer> {
        let mut buffer = FrameBuffer::new(width, height);
        self.render_into(list, &mut buffer)?;
        Ok(buffer)
    }

    /// Clear `buffer` and paint `list` into it.
    ///
    /// The scene viewport is scaled uniformly to fit the buffer and centered.
    pub fn render_into(&self, list: &RenderList, buffer: &mut FrameBuffer) -> LottieResult<()> {
        buffer.clear([0; 4]);
        let canvas = buffer.canvas();
        if canvas.pixel_count() == 0 {
            return Ok(());
        }

        let mut gates = Gates {
            list,
            canvas,
            viewport: viewport(list.canvas, canvas),
            clips: vec![None; list.clips.len()],
            masks: vec![None; list.masks.len()],
            mattes: vec![None; list.mattes.len()],
            in_progress: vec![false; list.mattes.len()],
        };
        let mut scratch = Coverage::new(canvas);
        self.paint_nodes(&list.nodes, 0, &mut gates, &mut scratch, buffer)?;

        if let Some(bg) = self.opts.background {
            for px in buffer.pixels_mut() {
                *px = flatten_on(*px, bg);
            }
        }
        tracing::debug!(frame = list.frame.0, size = %canvas, "rasterized frame");
        Ok(())
    }

    // Paints `nodes`, whose first `depth` groups are already applied by the
    // caller. Each deeper group is painted on its own surface and then
    // composited through its gates in one pass.
    fn paint_nodes(
        &self,
        nodes: &[RenderNode],
        depth: usize,
        gates: &mut Gates<'_>,
        scratch: &mut Coverage,
        buffer: &mut FrameBuffer,
    ) -> LottieResult<()> {
        let mut i = 0;
        while i < nodes.len() {
            let Some(&group) = nodes[i].groups.get(depth) else {
                self.paint_node(&nodes[i], gates.viewport, scratch, buffer);
                i += 1;
                continue;
            };
            let len = nodes[i..]
                .iter()
                .take_while(|n| n.groups.get(depth) == Some(&group))
                .count();
            let members = &nodes[i..i + len];
            i += len;
            if !members.iter().any(is_painted) {
                continue;
            }

            gates.prepare(group, self)?;
            let mut layer = FrameBuffer::new(buffer.width(), buffer.height());
            self.paint_nodes(members, depth + 1, gates, scratch, &mut layer)?;

            let width = buffer.width();
            let pixels = buffer.pixels_mut().iter_mut().zip(layer.pixels());
            for (k, (dst, src)) in pixels.enumerate() {
                if src[3] == 0 {
                    continue;
                }
                let (x, y) = (k as u32 % width, k as u32 / width);
                let g = gates.factor(group, x, y);
                if g > 0.0 {
                    *dst = over(*dst, *src, g);
                }
            }
        }
        Ok(())
    }

    fn paint_node(
        &self,
        node: &RenderNode,
        viewport: Affine,
        scratch: &mut Coverage,
        buffer: &mut FrameBuffer,
    ) {
        if !is_painted(node) {
            return;
        }
        self.node_coverage(node, viewport, scratch);
        let rows = scratch.rows();
        if rows.is_empty() {
            return;
        }

        let width = buffer.width();
        let sampler = PaintSampler::new(&node.paint, viewport * node.transform);
        let alpha = f32::from(node.alpha) / 255.0;
        let pixels = buffer.pixels_mut();
        for y in rows {
            for x in 0..width {
                let c = scratch.get(x, y);
                if c <= 0.0 {
                    continue;
                }
                let src = premultiply(sampler.color_at(x, y));
                let px = &mut pixels[(y as usize) * (width as usize) + (x as usize)];
                *px = over(*px, src, c * alpha);
            }
        }
    }

    fn node_coverage(&self, node: &RenderNode, viewport: Affine, out: &mut Coverage) {
        let device = viewport * node.transform;
        match &node.style {
            PaintStyle::Fill(rule) => fill_into(
                out,
                &node.path,
                device,
                *rule,
                self.opts.subsamples,
                self.opts.tolerance,
            ),
            PaintStyle::Stroke(stroke) => {
                let outline = stroke_outline(
                    &node.path,
                    stroke,
                    local_tolerance(device, self.opts.tolerance),
                );
                fill_into(
                    out,
                    &outline,
                    device,
                    FillRule::NonZero,
                    self.opts.subsamples,
                    self.opts.tolerance,
                );
            }
        }
    }
}

fn is_painted(node: &RenderNode) -> bool {
    node.visible && node.alpha > 0
}

/// Uniform fit-and-center mapping from the scene viewport onto the output surface.
pub fn viewport(scene: Canvas, output: Canvas) -> Affine {
    if scene == output || scene.width == 0 || scene.height == 0 {
        return Affine::IDENTITY;
    }
    let (sw, sh) = (f64::from(scene.width), f64::from(scene.height));
    let (ow, oh) = (f64::from(output.width), f64::from(output.height));
    let s = (ow / sw).min(oh / sh);
    Affine::translate(((ow - sw * s) / 2.0, (oh - sh * s) / 2.0)) * Affine::scale(s)
}

// Lazily computed group gates for one frame.
struct Gates<'a> {
    list: &'a RenderList,
    canvas: Canvas,
    viewport: Affine,
    clips: Vec<Option<Coverage>>,
    masks: Vec<Option<Coverage>>,
    mattes: Vec<Option<FrameBuffer>>,
    in_progress: Vec<bool>,
}

impl Gates<'_> {
    fn prepare(&mut self, group: GroupId, raster: &Rasterizer) -> LottieResult<()> {
        let list = self.list;
        let gate = *list
            .groups
            .get(group)
            .ok_or_else(|| LottieError::scene_invalid(format!("unknown group id {group}")))?;

        if let Some(id) = gate.clip {
            let path = list
                .clips
                .get(id)
                .ok_or_else(|| LottieError::scene_invalid(format!("unknown clip id {id}")))?;
            if self.clips[id].is_none() {
                let mut cov = Coverage::new(self.canvas);
                fill_into(
                    &mut cov,
                    path,
                    self.viewport,
                    FillRule::NonZero,
                    raster.opts.subsamples,
                    raster.opts.tolerance,
                );
                self.clips[id] = Some(cov);
            }
        }

        if let Some(id) = gate.mask {
            if list.masks.get(id).is_none() {
                return Err(LottieError::scene_invalid(format!("unknown mask id {id}")));
            }
            if self.masks[id].is_none() {
                let cov = self.mask_coverage(id, raster);
                self.masks[id] = Some(cov);
            }
        }

        if let Some(MatteRef { id, .. }) = gate.matte {
            let source = list
                .mattes
                .get(id)
                .ok_or_else(|| LottieError::scene_invalid(format!("unknown matte id {id}")))?;
            if self.mattes[id].is_some() {
                return Ok(());
            }
            if self.in_progress[id] {
                return Err(LottieError::scene_invalid(format!(
                    "matte {id} references itself"
                )));
            }
            self.in_progress[id] = true;
            let mut layer = FrameBuffer::new(self.canvas.width, self.canvas.height);
            let mut scratch = Coverage::new(self.canvas);
            raster.paint_nodes(&source.nodes, 0, self, &mut scratch, &mut layer)?;
            self.in_progress[id] = false;
            self.mattes[id] = Some(layer);
        }
        Ok(())
    }

    fn mask_coverage(&self, id: usize, raster: &Rasterizer) -> Coverage {
        let group = &self.list.masks[id];
        let mut acc = match group.masks.first().map(|m| m.mode) {
            Some(MaskMode::Subtract | MaskMode::Intersect) => Coverage::full(self.canvas),
            _ => {
                let mut c = Coverage::new(self.canvas);
                c.set_rows(0..self.canvas.height);
                c
            }
        };
        let mut cov = Coverage::new(self.canvas);
        for mask in &group.masks {
            fill_into(
                &mut cov,
                &mask.path,
                self.viewport,
                FillRule::NonZero,
                raster.opts.subsamples,
                raster.opts.tolerance,
            );
            let opacity = mask.opacity as f32;
            for y in 0..self.canvas.height {
                let row = acc.row_mut(y);
                for (x, a) in row.iter_mut().enumerate() {
                    let c = cov.get(x as u32, y) * opacity;
                    *a = match mask.mode {
                        MaskMode::Add => *a + c - *a * c,
                        MaskMode::Subtract => *a * (1.0 - c),
                        MaskMode::Intersect => *a * c,
                        MaskMode::Difference => *a + c - 2.0 * *a * c,
                    }
                    .clamp(0.0, 1.0);
                }
            }
        }
        acc
    }

    // Only valid for groups already passed through `prepare`.
    fn factor(&self, group: GroupId, x: u32, y: u32) -> f32 {
        let Some(gate) = self.list.groups.get(group) else {
            return 1.0;
        };
        let mut f = 1.0;
        if let Some(id) = gate.clip {
            f *= self.clips[id].as_ref().map_or(1.0, |c| c.get(x, y));
        }
        if let Some(id) = gate.mask {
            f *= self.masks[id].as_ref().map_or(1.0, |c| c.get(x, y));
        }
        if let Some(m) = gate.matte {
            let px = self.mattes[m.id]
                .as_ref()
                .and_then(|b| b.pixel(x, y))
                .unwrap_or([0; 4]);
            f *= match m.mode {
                MatteMode::Alpha => f32::from(px[3]) / 255.0,
                MatteMode::AlphaInverted => 1.0 - f32::from(px[3]) / 255.0,
                MatteMode::Luma => premul_luma(px),
                MatteMode::LumaInverted => 1.0 - premul_luma(px),
            };
        }
        f
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
