use kurbo::{Ellipse, RoundedRect, Shape as _};

use crate::{
    animation::anim::{Anim, Lerp},
    foundation::core::{Affine, BezPath, Canvas, FrameRange, Point, Rect, Rgba8, Transform2D, Vec2},
    foundation::error::LottieResult,
};

/// Decoded animation: an immutable tree of layers and shapes plus timing metadata.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SceneGraph {
    /// Native viewport width in pixels.
    pub width: u32,
    /// Native viewport height in pixels.
    pub height: u32,
    /// Nominal frames per second.
    pub frame_rate: f64,
    /// Number of frames on the timeline.
    pub total_frames: u64,
    /// Named animation segments.
    #[serde(default)]
    pub markers: Vec<Marker>,
    /// Top-level nodes in paint order (first is painted first).
    pub layers: Vec<Node>,
}

impl SceneGraph {
    /// Native viewport.
    pub fn canvas(&self) -> Canvas {
        Canvas::new(self.width, self.height)
    }

    /// Duration in seconds (`total_frames / frame_rate`).
    pub fn duration_secs(&self) -> f64 {
        if self.frame_rate > 0.0 {
            self.total_frames as f64 / self.frame_rate
        } else {
            0.0
        }
    }
}

/// Named `(start, end)` frame segment. Metadata only.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Marker {
    /// Marker name.
    pub name: String,
    /// First frame of the segment.
    pub start: u64,
    /// Last frame of the segment.
    pub end: u64,
}

/// Scene tree node.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    /// Group with its own transform, opacity, masks and matte.
    Layer(Layer),
    /// Leaf geometry with fill and/or stroke paint.
    Shape(Shape),
}

impl Node {
    /// Optional identifier used by keypaths and matte references.
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Layer(l) => l.id.as_deref(),
            Self::Shape(s) => s.id.as_deref(),
        }
    }
}

/// Layer node.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Layer {
    /// Identifier, unique among siblings.
    #[serde(default)]
    pub id: Option<String>,
    /// Local transform.
    #[serde(default)]
    pub transform: TransformAnim,
    /// Local opacity in `[0, 1]`.
    #[serde(default = "full_opacity")]
    pub opacity: Anim<f64>,
    /// Children in paint order.
    #[serde(default)]
    pub children: Vec<Node>,
    /// Masks intersected with the layer's coverage, in application order.
    #[serde(default)]
    pub masks: Vec<Mask>,
    /// Earlier sibling whose alpha or luma gates this layer.
    #[serde(default)]
    pub matte: Option<Matte>,
    /// Hidden layers are evaluated but never painted.
    #[serde(default = "default_true")]
    pub visible: bool,
    /// In/out frames; outside this range the layer is hidden.
    #[serde(default)]
    pub range: Option<FrameRange>,
    /// Clip geometry in layer space.
    #[serde(default)]
    pub clip: Option<Geometry>,
}

impl Default for Layer {
    fn default() -> Self {
        Self {
            id: None,
            transform: TransformAnim::default(),
            opacity: full_opacity(),
            children: Vec::new(),
            masks: Vec::new(),
            matte: None,
            visible: true,
            range: None,
            clip: None,
        }
    }
}

/// Keyframable [`Transform2D`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TransformAnim {
    /// Anchor position in parent space.
    pub position: Anim<Vec2>,
    /// Pivot in local space.
    pub anchor: Anim<Vec2>,
    /// Scale factors.
    pub scale: Anim<Vec2>,
    /// Rotation in degrees.
    pub rotation_deg: Anim<f64>,
}

impl Default for TransformAnim {
    fn default() -> Self {
        Self {
            position: Anim::constant(Vec2::ZERO),
            anchor: Anim::constant(Vec2::ZERO),
            scale: Anim::constant(Vec2::new(1.0, 1.0)),
            rotation_deg: Anim::constant(0.0),
        }
    }
}

impl TransformAnim {
    /// Sample every component at `frame`.
    pub fn sample(&self, frame: f64) -> LottieResult<Transform2D> {
        Ok(Transform2D {
            position: self.position.sample(frame)?,
            anchor: self.anchor.sample(frame)?,
            scale: self.scale.sample(frame)?,
            rotation_deg: self.rotation_deg.sample(frame)?,
        })
    }

    /// Sample and convert to a local affine matrix.
    pub fn affine_at(&self, frame: f64) -> LottieResult<Affine> {
        Ok(self.sample(frame)?.to_affine())
    }
}

/// Mask attached to a layer.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Mask {
    /// Mask outline in layer space.
    pub geometry: Geometry,
    /// How this mask combines with the previous ones.
    #[serde(default)]
    pub mode: MaskMode,
    /// Mask opacity in `[0, 1]`.
    #[serde(default = "full_opacity")]
    pub opacity: Anim<f64>,
}

/// Mask combination mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskMode {
    /// Union with the accumulated mask.
    #[default]
    Add,
    /// Remove from the accumulated mask.
    Subtract,
    /// Keep only the overlap.
    Intersect,
    /// Symmetric difference.
    Difference,
}

/// Track matte reference.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Matte {
    /// Id of an earlier sibling layer. That layer is not painted itself.
    pub source: String,
    /// Which channel of the source gates this layer.
    #[serde(default)]
    pub mode: MatteMode,
}

/// Track matte channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatteMode {
    /// Source alpha.
    #[default]
    Alpha,
    /// One minus source alpha.
    AlphaInverted,
    /// Source luminance.
    Luma,
    /// One minus source luminance.
    LumaInverted,
}

/// Shape leaf.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Shape {
    /// Identifier, unique among siblings.
    #[serde(default)]
    pub id: Option<String>,
    /// Outline.
    pub geometry: Geometry,
    /// Interior paint.
    #[serde(default)]
    pub fill: Option<Fill>,
    /// Outline paint, painted above the fill.
    #[serde(default)]
    pub stroke: Option<Stroke>,
}

/// Keyframable outline.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Geometry {
    /// Free-form bezier path.
    Path(Anim<PathData>),
    /// Axis-aligned rectangle with optional rounded corners.
    Rect {
        /// Rectangle bounds `[x0, y0, x1, y1]`.
        rect: Anim<Rect>,
        /// Corner radius.
        #[serde(default = "zero")]
        radius: Anim<f64>,
    },
    /// Axis-aligned ellipse.
    Ellipse {
        /// Center point.
        center: Anim<Point>,
        /// Horizontal and vertical radii.
        radii: Anim<Vec2>,
    },
}

impl Geometry {
    /// Resolve the outline at `frame`, in local space.
    pub fn path_at(&self, frame: f64, tolerance: f64) -> LottieResult<BezPath> {
        match self {
            Self::Path(data) => Ok(data.sample(frame)?.to_bez_path()),
            Self::Rect { rect, radius } => {
                let rect = rect.sample(frame)?.abs();
                let radius = radius.sample(frame)?.max(0.0);
                if radius > 0.0 {
                    Ok(RoundedRect::from_rect(rect, radius).to_path(tolerance))
                } else {
                    Ok(rect.to_path(tolerance))
                }
            }
            Self::Ellipse { center, radii } => {
                let center = center.sample(frame)?;
                let radii = radii.sample(frame)?;
                Ok(Ellipse::new(center, (radii.x.abs(), radii.y.abs()), 0.0).to_path(tolerance))
            }
        }
    }
}

/// Bezier outline as vertices with tangents relative to each vertex.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PathData {
    /// On-curve points.
    pub vertices: Vec<Point>,
    /// Incoming control offsets; empty means straight segments.
    #[serde(default)]
    pub in_tangents: Vec<Vec2>,
    /// Outgoing control offsets; empty means straight segments.
    #[serde(default)]
    pub out_tangents: Vec<Vec2>,
    /// Whether the last vertex connects back to the first.
    #[serde(default)]
    pub closed: bool,
}

impl PathData {
    fn tangent(list: &[Vec2], i: usize) -> Vec2 {
        list.get(i).copied().unwrap_or(Vec2::ZERO)
    }

    /// Convert to move/line/cubic/close elements.
    pub fn to_bez_path(&self) -> BezPath {
        let mut path = BezPath::new();
        let Some(&first) = self.vertices.first() else {
            return path;
        };
        path.move_to(first);

        let n = self.vertices.len();
        let segments = if self.closed { n } else { n - 1 };
        for seg in 0..segments {
            let from = seg;
            let to = (seg + 1) % n;
            let c1 = Self::tangent(&self.out_tangents, from);
            let c2 = Self::tangent(&self.in_tangents, to);
            let p0 = self.vertices[from];
            let p1 = self.vertices[to];
            if c1 == Vec2::ZERO && c2 == Vec2::ZERO {
                path.line_to(p1);
            } else {
                path.curve_to(p0 + c1, p1 + c2, p1);
            }
        }
        if self.closed {
            path.close_path();
        }
        path
    }
}

// Paths only blend vertex-by-vertex when their topology matches.
impl Lerp for PathData {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        if a.vertices.len() != b.vertices.len()
            || a.in_tangents.len() != b.in_tangents.len()
            || a.out_tangents.len() != b.out_tangents.len()
        {
            return a.clone();
        }
        Self {
            vertices: a
                .vertices
                .iter()
                .zip(&b.vertices)
                .map(|(p, q)| p.lerp(*q, t))
                .collect(),
            in_tangents: a
                .in_tangents
                .iter()
                .zip(&b.in_tangents)
                .map(|(p, q)| p.lerp(*q, t))
                .collect(),
            out_tangents: a
                .out_tangents
                .iter()
                .zip(&b.out_tangents)
                .map(|(p, q)| p.lerp(*q, t))
                .collect(),
            closed: a.closed,
        }
    }
}

/// Fill attributes.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Fill {
    /// Paint source.
    pub paint: Paint,
    /// Paint opacity in `[0, 1]`.
    #[serde(default = "full_opacity")]
    pub opacity: Anim<f64>,
    /// Winding rule.
    #[serde(default)]
    pub rule: FillRule,
}

/// Stroke attributes.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Stroke {
    /// Paint source.
    pub paint: Paint,
    /// Paint opacity in `[0, 1]`.
    #[serde(default = "full_opacity")]
    pub opacity: Anim<f64>,
    /// Full stroke width (half on each side of the path).
    pub width: Anim<f64>,
    /// End cap style.
    #[serde(default)]
    pub cap: LineCap,
    /// Corner join style.
    #[serde(default)]
    pub join: LineJoin,
    /// Miter length limit, as a multiple of the half width.
    #[serde(default = "default_miter_limit")]
    pub miter_limit: f64,
    /// Optional dash pattern.
    #[serde(default)]
    pub dash: Option<Dash>,
}

/// Alternating on/off dash lengths.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Dash {
    /// On/off lengths, starting with "on".
    pub pattern: Anim<Vec<f64>>,
    /// Distance into the pattern at the start of the path.
    #[serde(default = "zero")]
    pub offset: Anim<f64>,
}

/// Winding rule deciding which regions are inside.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillRule {
    /// Inside when the winding number is non-zero.
    #[default]
    NonZero,
    /// Inside when the winding number is odd.
    EvenOdd,
}

/// Stroke end cap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineCap {
    /// Flat, ends at the path end.
    #[default]
    Butt,
    /// Half-disc past the path end.
    Round,
    /// Half-square past the path end.
    Square,
}

/// Stroke corner join.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineJoin {
    /// Sharp corner up to the miter limit.
    #[default]
    Miter,
    /// Rounded corner.
    Round,
    /// Cut-off corner.
    Bevel,
}

/// Paint source for fills and strokes.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Paint {
    /// Single color.
    Solid(Anim<Rgba8>),
    /// Linear gradient along `start -> end`.
    Linear {
        /// Axis start (offset 0), in shape space.
        start: Anim<Point>,
        /// Axis end (offset 1), in shape space.
        end: Anim<Point>,
        /// Color stops.
        stops: Anim<GradientStops>,
    },
    /// Radial gradient around `center`.
    Radial {
        /// Circle center (offset 1 lies on its rim), in shape space.
        center: Anim<Point>,
        /// Circle radius.
        radius: Anim<f64>,
        /// Focal point (offset 0); defaults to the center.
        #[serde(default)]
        focal: Option<Anim<Point>>,
        /// Color stops.
        stops: Anim<GradientStops>,
    },
}

/// One gradient color stop.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GradientStop {
    /// Position along the gradient in `[0, 1]`.
    pub offset: f64,
    /// Straight-alpha color at `offset`.
    pub color: Rgba8,
}

/// Ordered gradient stops.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct GradientStops(pub Vec<GradientStop>);

impl Lerp for GradientStops {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        if a.0.len() != b.0.len() {
            return a.clone();
        }
        Self(
            a.0.iter()
                .zip(&b.0)
                .map(|(x, y)| GradientStop {
                    offset: f64::lerp(&x.offset, &y.offset, t),
                    color: Rgba8::lerp(&x.color, &y.color, t),
                })
                .collect(),
        )
    }
}

fn full_opacity() -> Anim<f64> {
    Anim::constant(1.0)
}

fn zero() -> Anim<f64> {
    Anim::constant(0.0)
}

fn default_true() -> bool {
    true
}

fn default_miter_limit() -> f64 {
    4.0
}

#[cfg(test)]
#[path = "../../tests/unit/scene/model.rs"]
mod tests;
