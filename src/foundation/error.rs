use crate::foundation::core::Canvas;

/// Convenience result type used across lottie2gif.
pub type LottieResult<T> = Result<T, LottieError>;

/// Top-level error taxonomy used by the rendering core.
#[derive(thiserror::Error, Debug)]
pub enum LottieError {
    /// Malformed or unreadable animation input.
    #[error("scene load failed: {0}")]
    SceneLoadFailed(String),

    /// Structurally invalid scene (unsorted tracks, dangling or cyclic matte references).
    #[error("invalid scene: {0}")]
    SceneInvalid(String),

    /// Frame index outside `[0, total_frames)`.
    #[error("frame {frame} is out of range (total frames: {total})")]
    OutOfRange {
        /// Requested frame.
        frame: u64,
        /// Total frame count of the animation.
        total: u64,
    },

    /// Frame size inconsistent with the session.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Session dimensions.
        expected: Canvas,
        /// Offending frame dimensions.
        actual: Canvas,
    },

    /// More than 256 distinct colors while an exact palette was required.
    #[error("palette overflow: {distinct} distinct colors exceed 256 entries")]
    PaletteOverflow {
        /// Number of distinct colors in the frame.
        distinct: usize,
    },

    /// The encoder session was already finalized.
    #[error("encoder session already finalized")]
    AlreadyFinalized,

    /// Sink or file IO failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Container encoding failure.
    #[error("encode error: {0}")]
    Encode(String),

    /// Wrapped lower-level error from dependencies.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LottieError {
    /// Build a [`LottieError::SceneLoadFailed`] value.
    pub fn scene_load(msg: impl Into<String>) -> Self {
        Self::SceneLoadFailed(msg.into())
    }

    /// Build a [`LottieError::SceneInvalid`] value.
    pub fn scene_invalid(msg: impl Into<String>) -> Self {
        Self::SceneInvalid(msg.into())
    }

    /// Build a [`LottieError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Build a [`LottieError::DimensionMismatch`] value.
    pub fn dimension_mismatch(expected: Canvas, actual: Canvas) -> Self {
        Self::DimensionMismatch { expected, actual }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
