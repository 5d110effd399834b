use std::{
    io::Read,
    path::{Path, PathBuf},
};

use flate2::read::GzDecoder;

use crate::{
    eval::evaluator::{Evaluator, RenderList},
    foundation::core::{Canvas, FrameIndex},
    foundation::error::{LottieError, LottieResult},
    scene::keypath::{KeyPath, PropertyValue, apply_override},
    scene::model::{Marker, SceneGraph},
    scene::validate::validate_scene,
};

/// A decoded, validated animation plus the metadata queries built on it.
#[derive(Clone, Debug)]
pub struct Animation {
    scene: SceneGraph,
    resource_path: Option<PathBuf>,
}

impl Animation {
    /// Wrap an in-memory scene after validating it.
    pub fn from_scene(scene: SceneGraph) -> LottieResult<Self> {
        validate_scene(&scene)?;
        Ok(Self {
            scene,
            resource_path: None,
        })
    }

    /// Decode a JSON scene description.
    ///
    /// `resource_path` is the base directory for external resources, kept for callers.
    pub fn from_data(data: &str, resource_path: Option<PathBuf>) -> LottieResult<Self> {
        let scene: SceneGraph = serde_json::from_str(data)
            .map_err(|e| LottieError::scene_load(format!("parse scene json: {e}")))?;
        validate_scene(&scene).map_err(|e| LottieError::scene_load(e.to_string()))?;
        Ok(Self {
            scene,
            resource_path,
        })
    }

    /// Decode a JSON scene from a reader.
    pub fn from_reader<R: Read>(mut reader: R) -> LottieResult<Self> {
        let mut data = String::new();
        reader
            .read_to_string(&mut data)
            .map_err(|e| LottieError::scene_load(format!("read scene: {e}")))?;
        Self::from_data(&data, None)
    }

    /// Load a scene file. Files ending in `.tgs` are gunzipped first.
    pub fn from_path(path: impl AsRef<Path>) -> LottieResult<Self> {
        let path = path.as_ref();
        let with_path = |e: LottieError| LottieError::scene_load(format!("'{}': {e}", path.display()));

        let file = std::fs::File::open(path).map_err(|e| with_path(e.into()))?;
        let data = if is_gzip_sticker(path) {
            let mut s = String::new();
            GzDecoder::new(file)
                .read_to_string(&mut s)
                .map_err(|e| with_path(LottieError::scene_load(format!("gunzip: {e}"))))?;
            s
        } else {
            std::io::read_to_string(file).map_err(|e| with_path(e.into()))?
        };

        let base = path.parent().map(Path::to_path_buf);
        let anim = Self::from_data(&data, base).map_err(with_path)?;
        tracing::debug!(
            path = %path.display(),
            size = %anim.size(),
            frames = anim.total_frames(),
            "loaded animation"
        );
        Ok(anim)
    }

    /// Underlying scene graph.
    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    /// Base directory for external resources, if known.
    pub fn resource_path(&self) -> Option<&Path> {
        self.resource_path.as_deref()
    }

    /// Native viewport size.
    pub fn size(&self) -> Canvas {
        self.scene.canvas()
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.scene.duration_secs()
    }

    /// Number of frames.
    pub fn total_frames(&self) -> u64 {
        self.scene.total_frames
    }

    /// Nominal frames per second.
    pub fn frame_rate(&self) -> f64 {
        self.scene.frame_rate
    }

    /// Named segments.
    pub fn markers(&self) -> &[Marker] {
        &self.scene.markers
    }

    /// Frame at normalized position `pos` (clamped to `[0, 1]`).
    pub fn frame_at_pos(&self, pos: f64) -> FrameIndex {
        let pos = if pos.is_nan() { 0.0 } else { pos.clamp(0.0, 1.0) };
        let last = self.scene.total_frames.saturating_sub(1);
        FrameIndex((pos * last as f64).round() as u64)
    }

    /// Evaluated draw list for `frame`.
    pub fn render_tree(&self, frame: FrameIndex) -> LottieResult<RenderList> {
        Evaluator::evaluate(&self.scene, frame)
    }

    /// Force a constant value onto every property selected by `keypath`.
    ///
    /// Returns the number of properties changed.
    pub fn set_property(&mut self, keypath: &str, value: PropertyValue) -> usize {
        let changed = apply_override(&mut self.scene, &KeyPath::parse(keypath), value);
        tracing::debug!(keypath, changed, "property override");
        changed
    }
}

fn is_gzip_sticker(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("tgs"))
}

#[cfg(test)]
#[path = "../../tests/unit/scene/decode.rs"]
mod tests;
