//! Typed contracts for the pretrained networks the pipeline drives.
//!
//! The pipeline treats every network as an opaque inference function. Implementations may
//! wrap a neural runtime, a remote service, or the pure-Rust [`crate::model::reference`]
//! stand-ins used by the CLI and tests.

use crate::foundation::core::{Frame, Point};
use crate::foundation::error::{AnimError, AnimResult};
use crate::model::checkpoint::Checkpoint;
use crate::model::config::ModelConfig;
use crate::model::context::{Device, InferenceContext};
use crate::model::keypoints::Keypoints;

/// Dense warp produced for one source/driving keypoint pair.
///
/// `deformation[y * width + x]` is the normalized `[-1, 1]` source position sampled for output
/// pixel `(x, y)`. Consumed once by the renderer.
#[derive(Clone, Debug, PartialEq)]
pub struct MotionField {
    /// Field width in pixels.
    pub width: u32,
    /// Field height in pixels.
    pub height: u32,
    /// Backward sampling grid, row-major.
    pub deformation: Vec<Point>,
    /// Optional per-pixel visibility in `[0, 1]`; `None` means fully visible.
    pub occlusion: Option<Vec<f32>>,
}

impl MotionField {
    /// Create a field, checking buffer sizes against `width * height`.
    pub fn new(
        width: u32,
        height: u32,
        deformation: Vec<Point>,
        occlusion: Option<Vec<f32>>,
    ) -> AnimResult<Self> {
        let n = width as usize * height as usize;
        if deformation.len() != n {
            return Err(AnimError::validation(format!(
                "deformation has {} entries, expected {n}",
                deformation.len()
            )));
        }
        if let Some(occ) = occlusion.as_ref()
            && occ.len() != n
        {
            return Err(AnimError::validation(format!(
                "occlusion has {} entries, expected {n}",
                occ.len()
            )));
        }
        Ok(Self {
            width,
            height,
            deformation,
            occlusion,
        })
    }
}

/// Detects keypoints on a frame.
pub trait KeypointDetector {
    /// Keypoints for `frame`.
    fn detect(&self, frame: &Frame, ctx: &InferenceContext) -> AnimResult<Keypoints>;
}

/// Estimates dense motion from a source frame and a keypoint pair.
pub trait DenseMotionNetwork {
    /// Motion that moves `kp_source` onto `kp_driving`. No background-motion input is used.
    fn estimate(
        &self,
        source: &Frame,
        kp_driving: &Keypoints,
        kp_source: &Keypoints,
        ctx: &InferenceContext,
    ) -> AnimResult<MotionField>;
}

/// Renders the output frame from the source and a motion field.
pub trait InpaintingNetwork {
    /// Warped and inpainted prediction, same shape as `source`.
    fn render(
        &self,
        source: &Frame,
        motion: &MotionField,
        ctx: &InferenceContext,
    ) -> AnimResult<Frame>;
}

/// Animation-via-disentanglement network.
pub trait AvdNetwork {
    /// Driving pose re-expressed with the source's identity.
    fn transfer(
        &self,
        kp_source: &Keypoints,
        kp_driving: &Keypoints,
        ctx: &InferenceContext,
    ) -> AnimResult<Keypoints>;
}

/// 2D facial landmark detector used by the best-frame search.
pub trait LandmarkDetector {
    /// Landmarks of the first face in `frame`, or `None` when no face is found.
    fn landmarks(&self, frame: &Frame) -> AnimResult<Option<Vec<Point>>>;
}

/// The loaded networks, shared read-only across every frame of a run.
pub struct Models {
    /// Keypoint detector.
    pub kp_detector: Box<dyn KeypointDetector>,
    /// Dense motion estimator.
    pub dense_motion: Box<dyn DenseMotionNetwork>,
    /// Inpainting renderer.
    pub inpainting: Box<dyn InpaintingNetwork>,
    /// AVD network, when the checkpoint carries one.
    pub avd: Option<Box<dyn AvdNetwork>>,
}

impl std::fmt::Debug for Models {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Models")
            .field("avd", &self.avd.is_some())
            .finish_non_exhaustive()
    }
}

/// Builds [`Models`] from a config document and a checkpoint.
pub trait ModelLoader {
    /// Construct and load every network for `device`.
    fn load(
        &self,
        config: &ModelConfig,
        checkpoint: &Checkpoint,
        device: Device,
    ) -> AnimResult<Models>;
}
