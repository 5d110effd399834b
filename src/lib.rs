//! lottie2gif evaluates keyframed vector animations, rasterizes them on the CPU and
//! encodes the result as a looping animated GIF.
//!
//! The public API is session-oriented:
//!
//! - Load and validate an [`Animation`] (JSON, or gzip-compressed `.tgs`)
//! - Inspect a frame as a [`RenderList`] via [`Evaluator`], or paint it with [`Rasterizer`]
//! - Create a [`RenderSession`] and stream every frame into a [`FrameSink`] such as
//!   [`GifEncoder`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub(crate) mod animation;
pub(crate) mod encode;
pub(crate) mod eval;
pub(crate) mod quantize;
pub(crate) mod render;
pub(crate) mod scene;
pub(crate) mod session;

pub use crate::foundation::core::{
    Affine, BezPath, Canvas, FrameIndex, FrameRange, Point, Rect, Rgb8, Rgba8, Transform2D, Vec2,
};
pub use crate::foundation::error::{LottieError, LottieResult};

pub use crate::animation::anim::{Anim, Keyframe, Lerp};
pub use crate::animation::ease::Ease;
pub use crate::encode::gif::{GifEncoder, check_gif_canvas};
pub use crate::encode::sink::{CapturedFrame, FrameSink, InMemorySink, SinkConfig};
pub use crate::eval::evaluator::{
    ClipId, Evaluator, GateGroup, GroupId, MaskGroup, MaskId, MatteId, MatteRef, MatteSource,
    PaintStyle, RenderList, RenderNode, ResolvedMask, ResolvedPaint, ResolvedStroke,
};
pub use crate::quantize::palette::{
    IndexedFrame, MAX_PALETTE_LEN, Palette, PaletteMode, PaletteQuantizer, QuantizeOpts, pack_key,
};
pub use crate::render::buffer::FrameBuffer;
pub use crate::render::composite::{PremulRgba8, flatten_on, over, premultiply, unpremultiply};
pub use crate::render::cpu::{RasterOpts, Rasterizer, SUBSAMPLES_ENV, viewport};
pub use crate::scene::decode::Animation;
pub use crate::scene::keypath::{KeyPath, PropertyValue};
pub use crate::scene::model::{
    Dash, Fill, FillRule, Geometry, GradientStop, GradientStops, Layer, LineCap, LineJoin, Marker,
    Mask, MaskMode, Matte, MatteMode, Node, Paint, PathData, SceneGraph, Shape, Stroke,
    TransformAnim,
};
pub use crate::scene::validate::validate_scene;
pub use crate::session::render_session::{
    RenderSession, RenderSessionOpts, RenderStats, frame_delay_cs,
};
