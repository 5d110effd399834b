use std::collections::{HashMap, HashSet};

use smallvec::SmallVec;

use crate::{
    foundation::core::{Affine, BezPath, Canvas, FrameIndex, Point, Rgba8},
    foundation::error::{LottieError, LottieResult},
    foundation::math::unit_to_u8,
    scene::model::{
        FillRule, GradientStop, Layer, LineCap, LineJoin, MaskMode, MatteMode, Node, Paint,
        SceneGraph, Shape,
    },
};

/// Curve tolerance used when converting rectangles and ellipses to paths.
const PATH_TOLERANCE: f64 = 0.05;

/// Index into [`RenderList::clips`].
pub type ClipId = usize;
/// Index into [`RenderList::masks`].
pub type MaskId = usize;
/// Index into [`RenderList::mattes`].
pub type MatteId = usize;
/// Index into [`RenderList::groups`].
pub type GroupId = usize;

/// Flattened, fully resolved draw list for one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderList {
    /// Evaluated frame.
    pub frame: FrameIndex,
    /// Scene viewport the node coordinates live in.
    pub canvas: Canvas,
    /// Draw operations in paint order.
    pub nodes: Vec<RenderNode>,
    /// Clip outlines in scene space.
    pub clips: Vec<BezPath>,
    /// Mask groups, one per masked layer.
    pub masks: Vec<MaskGroup>,
    /// Flattened matte source layers.
    pub mattes: Vec<MatteSource>,
    /// Gated layers, one per layer with a clip, masks or a matte.
    pub groups: Vec<GateGroup>,
}

impl RenderList {
    /// Empty list for `canvas`, used as a reusable working buffer.
    pub fn empty(canvas: Canvas) -> Self {
        Self {
            frame: FrameIndex(0),
            canvas,
            nodes: Vec::new(),
            clips: Vec::new(),
            masks: Vec::new(),
            mattes: Vec::new(),
            groups: Vec::new(),
        }
    }

    fn reset(&mut self, frame: FrameIndex, canvas: Canvas) {
        self.frame = frame;
        self.canvas = canvas;
        self.nodes.clear();
        self.clips.clear();
        self.masks.clear();
        self.mattes.clear();
        self.groups.clear();
    }
}

/// One fill or stroke draw operation.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderNode {
    /// Dot-joined ids from the root (`#n` for unnamed nodes).
    pub key: String,
    /// Absolute transform from shape space to scene space.
    pub transform: Affine,
    /// Outline in shape space.
    pub path: BezPath,
    /// Paint with all animated values resolved.
    pub paint: ResolvedPaint,
    /// Fill or stroke.
    pub style: PaintStyle,
    /// Absolute opacity (ancestors times paint opacity), `0..=255`.
    pub alpha: u8,
    /// Whether the node contributes any pixels.
    pub visible: bool,
    /// Enclosing gated layers, outermost first.
    ///
    /// Nodes sharing a group are contiguous in paint order.
    pub groups: SmallVec<[GroupId; 2]>,
}

/// How a node's outline is turned into coverage.
#[derive(Clone, Debug, PartialEq)]
pub enum PaintStyle {
    /// Fill the interior under a winding rule.
    Fill(FillRule),
    /// Stroke the outline.
    Stroke(ResolvedStroke),
}

/// Stroke parameters at one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedStroke {
    /// Full width.
    pub width: f64,
    /// End cap.
    pub cap: LineCap,
    /// Corner join.
    pub join: LineJoin,
    /// Miter limit.
    pub miter_limit: f64,
    /// Dash pattern and offset; `None` for solid strokes.
    pub dash: Option<(Vec<f64>, f64)>,
}

/// Paint source at one frame. Gradient geometry is in shape space.
#[derive(Clone, Debug, PartialEq)]
pub enum ResolvedPaint {
    /// Single straight-alpha color.
    Solid(Rgba8),
    /// Linear gradient.
    Linear {
        /// Offset 0.
        start: Point,
        /// Offset 1.
        end: Point,
        /// Stops sorted by offset.
        stops: Vec<GradientStop>,
    },
    /// Radial gradient.
    Radial {
        /// Circle center.
        center: Point,
        /// Focal point (offset 0).
        focal: Point,
        /// Circle radius (offset 1).
        radius: f64,
        /// Stops sorted by offset.
        stops: Vec<GradientStop>,
    },
}

/// Ordered masks of one layer.
#[derive(Clone, Debug, PartialEq)]
pub struct MaskGroup {
    /// Masks in application order.
    pub masks: Vec<ResolvedMask>,
}

/// One mask at one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedMask {
    /// Outline in scene space.
    pub path: BezPath,
    /// Combination mode.
    pub mode: MaskMode,
    /// Opacity in `[0, 1]`.
    pub opacity: f64,
}

/// Draw operations of a layer used as a track matte.
#[derive(Clone, Debug, PartialEq)]
pub struct MatteSource {
    /// Nodes in paint order; they only ever reference lower matte ids.
    pub nodes: Vec<RenderNode>,
}

/// Gates of one layer, applied to the composite of its whole subtree.
///
/// The subtree is painted on its own surface first; every gate present then
/// scales that surface before it is composited into the parent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GateGroup {
    /// Clip outline, if the layer clips.
    pub clip: Option<ClipId>,
    /// Combined masks, if the layer has any.
    pub mask: Option<MaskId>,
    /// Track matte, if the layer is matted.
    pub matte: Option<MatteRef>,
}

impl GateGroup {
    fn is_empty(&self) -> bool {
        self.clip.is_none() && self.mask.is_none() && self.matte.is_none()
    }
}

/// Reference from a gated layer to its matte source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MatteRef {
    /// Source index.
    pub id: MatteId,
    /// Channel used as the gate.
    pub mode: MatteMode,
}

/// Turns a [`SceneGraph`] into a [`RenderList`] for a given frame.
pub struct Evaluator;

impl Evaluator {
    /// Evaluate `frame` into a fresh list.
    #[tracing::instrument(skip(scene))]
    pub fn evaluate(scene: &SceneGraph, frame: FrameIndex) -> LottieResult<RenderList> {
        let mut list = RenderList::empty(scene.canvas());
        Self::evaluate_into(scene, frame, &mut list)?;
        Ok(list)
    }

    /// Evaluate `frame` into `list`, reusing its allocations.
    pub fn evaluate_into(
        scene: &SceneGraph,
        frame: FrameIndex,
        list: &mut RenderList,
    ) -> LottieResult<()> {
        if frame.0 >= scene.total_frames {
            return Err(LottieError::OutOfRange {
                frame: frame.0,
                total: scene.total_frames,
            });
        }
        list.reset(frame, scene.canvas());

        let mut nodes = std::mem::take(&mut list.nodes);
        let root = Ctx {
            transform: Affine::IDENTITY,
            opacity: 1.0,
            visible: true,
            key: String::new(),
            groups: SmallVec::new(),
        };
        let mut walker = Walker {
            index: frame,
            frame: frame.0 as f64,
            list: &mut *list,
        };
        let res = walker.walk(&scene.layers, &root, &mut nodes);
        list.nodes = nodes;
        res?;

        tracing::debug!(
            frame = frame.0,
            nodes = list.nodes.len(),
            mattes = list.mattes.len(),
            "evaluated frame"
        );
        Ok(())
    }
}

#[derive(Clone)]
struct Ctx {
    transform: Affine,
    opacity: f64,
    visible: bool,
    key: String,
    groups: SmallVec<[GroupId; 2]>,
}

impl Ctx {
    fn child_key(&self, id: Option<&str>, index: usize) -> String {
        let own = id.map_or_else(|| format!("#{index}"), str::to_owned);
        if self.key.is_empty() {
            own
        } else {
            format!("{}.{own}", self.key)
        }
    }
}

struct Walker<'a> {
    index: FrameIndex,
    frame: f64,
    list: &'a mut RenderList,
}

impl Walker<'_> {
    fn walk(&mut self, children: &[Node], ctx: &Ctx, out: &mut Vec<RenderNode>) -> LottieResult<()> {
        let sources: HashSet<&str> = children
            .iter()
            .filter_map(|n| match n {
                Node::Layer(l) => l.matte.as_ref().map(|m| m.source.as_str()),
                Node::Shape(_) => None,
            })
            .collect();
        let mut cache: HashMap<usize, MatteId> = HashMap::new();

        for (i, child) in children.iter().enumerate() {
            match child {
                Node::Shape(shape) => self.shape(shape, i, ctx, out)?,
                Node::Layer(layer) => {
                    if layer.id.as_deref().is_some_and(|id| sources.contains(id)) {
                        continue;
                    }
                    let matte = self.resolve_matte(children, i, ctx, &mut cache, &mut Vec::new())?;
                    self.layer(layer, i, ctx, matte, out)?;
                }
            }
        }
        Ok(())
    }

    fn resolve_matte(
        &mut self,
        siblings: &[Node],
        target: usize,
        ctx: &Ctx,
        cache: &mut HashMap<usize, MatteId>,
        visiting: &mut Vec<usize>,
    ) -> LottieResult<Option<MatteRef>> {
        let Node::Layer(layer) = &siblings[target] else {
            return Ok(None);
        };
        let Some(matte) = &layer.matte else {
            return Ok(None);
        };
        let src = siblings
            .iter()
            .position(|n| n.id() == Some(matte.source.as_str()))
            .ok_or_else(|| {
                LottieError::scene_invalid(format!("unknown matte source '{}'", matte.source))
            })?;
        let Node::Layer(src_layer) = &siblings[src] else {
            return Err(LottieError::scene_invalid(format!(
                "matte source '{}' is not a layer",
                matte.source
            )));
        };
        if src == target || visiting.contains(&src) {
            return Err(LottieError::scene_invalid(format!(
                "cyclic matte reference through '{}'",
                matte.source
            )));
        }

        let id = match cache.get(&src) {
            Some(id) => *id,
            None => {
                visiting.push(target);
                let nested = self.resolve_matte(siblings, src, ctx, cache, visiting)?;
                visiting.pop();
                // The source is painted on its own surface, so the parent's
                // gates and opacity are left to the matted layer.
                let source_ctx = Ctx {
                    opacity: 1.0,
                    groups: SmallVec::new(),
                    ..ctx.clone()
                };
                let mut nodes = Vec::new();
                self.layer(src_layer, src, &source_ctx, nested, &mut nodes)?;
                let id = self.list.mattes.len();
                self.list.mattes.push(MatteSource { nodes });
                cache.insert(src, id);
                id
            }
        };
        Ok(Some(MatteRef {
            id,
            mode: matte.mode,
        }))
    }

    fn layer(
        &mut self,
        layer: &Layer,
        index: usize,
        ctx: &Ctx,
        matte: Option<MatteRef>,
        out: &mut Vec<RenderNode>,
    ) -> LottieResult<()> {
        let transform = ctx.transform * layer.transform.affine_at(self.frame)?;
        let opacity = ctx.opacity * layer.opacity.sample(self.frame)?.clamp(0.0, 1.0);
        let in_range = layer.range.is_none_or(|r| r.contains(self.index));

        let mut child = Ctx {
            transform,
            opacity,
            visible: ctx.visible && layer.visible && in_range,
            key: ctx.child_key(layer.id.as_deref(), index),
            groups: ctx.groups.clone(),
        };
        let mut gates = GateGroup {
            matte,
            ..GateGroup::default()
        };

        if let Some(clip) = &layer.clip {
            let path = transform * clip.path_at(self.frame, PATH_TOLERANCE)?;
            gates.clip = Some(self.list.clips.len());
            self.list.clips.push(path);
        }

        if !layer.masks.is_empty() {
            let masks = layer
                .masks
                .iter()
                .map(|m| {
                    Ok(ResolvedMask {
                        path: transform * m.geometry.path_at(self.frame, PATH_TOLERANCE)?,
                        mode: m.mode,
                        opacity: m.opacity.sample(self.frame)?.clamp(0.0, 1.0),
                    })
                })
                .collect::<LottieResult<Vec<_>>>()?;
            gates.mask = Some(self.list.masks.len());
            self.list.masks.push(MaskGroup { masks });
        }

        if !gates.is_empty() {
            child.groups.push(self.list.groups.len());
            self.list.groups.push(gates);
        }
        self.walk(&layer.children, &child, out)
    }

    fn shape(
        &mut self,
        shape: &Shape,
        index: usize,
        ctx: &Ctx,
        out: &mut Vec<RenderNode>,
    ) -> LottieResult<()> {
        let path = shape.geometry.path_at(self.frame, PATH_TOLERANCE)?;
        let key = ctx.child_key(shape.id.as_deref(), index);
        let node = |paint, style, opacity: f64, drawable: bool| {
            let alpha = unit_to_u8((ctx.opacity * opacity) as f32);
            RenderNode {
                key: key.clone(),
                transform: ctx.transform,
                path: path.clone(),
                paint,
                style,
                alpha,
                visible: ctx.visible && drawable && alpha > 0,
                groups: ctx.groups.clone(),
            }
        };

        if let Some(fill) = &shape.fill {
            let paint = resolve_paint(&fill.paint, self.frame)?;
            let opacity = fill.opacity.sample(self.frame)?.clamp(0.0, 1.0);
            out.push(node(paint, PaintStyle::Fill(fill.rule), opacity, true));
        }

        if let Some(stroke) = &shape.stroke {
            let paint = resolve_paint(&stroke.paint, self.frame)?;
            let opacity = stroke.opacity.sample(self.frame)?.clamp(0.0, 1.0);
            let width = stroke.width.sample(self.frame)?.max(0.0);
            let dash = match &stroke.dash {
                Some(d) => {
                    let pattern = d.pattern.sample(self.frame)?;
                    let offset = d.offset.sample(self.frame)?;
                    // All-zero patterns would never advance.
                    (pattern.iter().any(|v| *v > 0.0) && pattern.iter().all(|v| *v >= 0.0))
                        .then_some((pattern, offset))
                }
                None => None,
            };
            let style = PaintStyle::Stroke(ResolvedStroke {
                width,
                cap: stroke.cap,
                join: stroke.join,
                miter_limit: stroke.miter_limit,
                dash,
            });
            out.push(node(paint, style, opacity, width > 0.0));
        }
        Ok(())
    }
}

fn resolve_paint(paint: &Paint, frame: f64) -> LottieResult<ResolvedPaint> {
    Ok(match paint {
        Paint::Solid(color) => ResolvedPaint::Solid(color.sample(frame)?),
        Paint::Linear { start, end, stops } => ResolvedPaint::Linear {
            start: start.sample(frame)?,
            end: end.sample(frame)?,
            stops: sorted_stops(stops.sample(frame)?.0),
        },
        Paint::Radial {
            center,
            radius,
            focal,
            stops,
        } => {
            let center = center.sample(frame)?;
            let focal = match focal {
                Some(f) => f.sample(frame)?,
                None => center,
            };
            ResolvedPaint::Radial {
                center,
                focal,
                radius: radius.sample(frame)?.max(0.0),
                stops: sorted_stops(stops.sample(frame)?.0),
            }
        }
    })
}

fn sorted_stops(mut stops: Vec<GradientStop>) -> Vec<GradientStop> {
    for s in &mut stops {
        s.offset = s.offset.clamp(0.0, 1.0);
    }
    stops.sort_by(|a, b| a.offset.total_cmp(&b.offset));
    stops
}

#[cfg(test)]
#[path = "../../tests/unit/eval/evaluator.rs"]
mod tests;
