use std::fmt;
use std::path::PathBuf;

/// Convenience result type used across animorph.
pub type AnimResult<T> = Result<T, AnimError>;

/// Pipeline stage an error originated from.
///
/// Fatal errors carry their stage so a failed run reports where it stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Best-alignment search over the driving sequence.
    Search,
    /// Keypoint detection on the source or a driving frame.
    KeypointDetection,
    /// Keypoint motion adaptation (`standard`/`relative`/`avd`).
    MotionTransfer,
    /// Dense motion estimation.
    MotionEstimation,
    /// Rendering the output frame.
    Rendering,
    /// Frame decoding/encoding and file-system access.
    Io,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Search => "search",
            Self::KeypointDetection => "keypoint detection",
            Self::MotionTransfer => "motion transfer",
            Self::MotionEstimation => "motion estimation",
            Self::Rendering => "rendering",
            Self::Io => "io",
        };
        f.write_str(name)
    }
}

/// Top-level error taxonomy used by the animation pipeline.
#[derive(thiserror::Error, Debug)]
pub enum AnimError {
    /// A source path does not exist.
    #[error("io error: not found: '{}'", .0.display())]
    NotFound(PathBuf),

    /// Convex-hull computation on a degenerate (too small or collinear) point set.
    #[error("motion transfer error: degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// No usable landmarks for one frame. Recovered locally during best-frame search.
    #[error("search error: landmark extraction failed: {0}")]
    LandmarkExtraction(String),

    /// An external model collaborator failed.
    #[error("{stage} error: {msg}")]
    Model {
        /// Stage the collaborator belongs to.
        stage: Stage,
        /// Collaborator-provided message.
        msg: String,
    },

    /// The driving sequence produced no frames.
    #[error("search error: empty driving sequence: {0}")]
    EmptyDriving(String),

    /// Frame decode/encode failures.
    #[error("io error: {0}")]
    Io(String),

    /// Invalid user-provided options or data.
    #[error("io error: invalid input: {0}")]
    Validation(String),

    /// Invalid config or checkpoint documents.
    #[error("io error: invalid config: {0}")]
    Config(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error("io error: {0:#}")]
    Other(#[from] anyhow::Error),
}

impl AnimError {
    /// Build a [`AnimError::DegenerateGeometry`] value.
    pub fn degenerate(msg: impl Into<String>) -> Self {
        Self::DegenerateGeometry(msg.into())
    }

    /// Build a [`AnimError::LandmarkExtraction`] value.
    pub fn landmarks(msg: impl Into<String>) -> Self {
        Self::LandmarkExtraction(msg.into())
    }

    /// Build a [`AnimError::Model`] value for `stage`.
    pub fn model(stage: Stage, msg: impl Into<String>) -> Self {
        Self::Model {
            stage,
            msg: msg.into(),
        }
    }

    /// Build a [`AnimError::EmptyDriving`] value.
    pub fn empty_driving(msg: impl Into<String>) -> Self {
        Self::EmptyDriving(msg.into())
    }

    /// Build a [`AnimError::Io`] value.
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Build a [`AnimError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`AnimError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Stage this error is attributed to.
    pub fn stage(&self) -> Stage {
        match self {
            Self::NotFound(_)
            | Self::Io(_)
            | Self::Validation(_)
            | Self::Config(_)
            | Self::Other(_) => Stage::Io,
            Self::DegenerateGeometry(_) => Stage::MotionTransfer,
            Self::LandmarkExtraction(_) | Self::EmptyDriving(_) => Stage::Search,
            Self::Model { stage, .. } => *stage,
        }
    }

    /// Re-tag a model error raised by a collaborator with the stage that called it.
    ///
    /// Errors that already identify a more specific failure are left untouched.
    pub(crate) fn at(self, stage: Stage) -> Self {
        match self {
            Self::Model { msg, .. } => Self::Model { stage, msg },
            Self::Other(e) => Self::Model {
                stage,
                msg: format!("{e:#}"),
            },
            other => other,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
