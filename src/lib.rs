//! Animorph animates a still image with the motion of a driving video.
//!
//! Keypoints are detected on the source image and on every driving frame; the driving motion
//! is transferred onto the source keypoints, turned into a dense motion field, and rendered into
//! one output frame per driving frame.
//!
//! # Pipeline overview
//!
//! 1. **Read**: [`FrameSource`] yields driving frames from a video, an image directory, or a
//!    numbered file pattern, normalized to a fixed [`FrameShape`].
//! 2. **Align** (optional): [`find_best_frame`] picks the driving frame whose facial landmarks
//!    best match the source; [`animate_bidirectional`] animates outward from it.
//! 3. **Animate**: [`Animation`] streams one rendered frame per driving frame through the
//!    [`Models`] collaborators, using [`compute_motion`] for the keypoint transfer.
//! 4. **Write**: [`FrameSink`] appends frames to a video (system `ffmpeg`) or numbered images.
//!
//! [`run`] wires these together the way the `animorph` binary uses them.
//!
//! The networks are opaque [`KeypointDetector`], [`DenseMotionNetwork`], [`InpaintingNetwork`],
//! [`AvdNetwork`], and [`LandmarkDetector`] implementations. The [`reference`] module provides
//! deterministic pure-Rust stand-ins.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod animate;
mod foundation;
mod media;
mod model;
mod pipeline;

pub use model::reference;

pub use animate::bidirectional::animate_bidirectional;
pub use animate::generator::{Animation, animate};
pub use animate::motion::{TransferMode, compute_motion, movement_scale, relative_keypoints};
pub use animate::search::{AlignmentIndex, find_best_frame, landmark_distance, normalize_landmarks};
pub use foundation::core::{Fps, Frame, FrameShape, Point, Vec2};
pub use foundation::error::{AnimError, AnimResult, Stage};
pub use foundation::geometry::{centroid, convex_hull, hull_area};
pub use media::convert::{frame_to_rgb8, load_image, normalize_frame};
pub use media::ffmpeg::{VideoInfo, is_ffmpeg_on_path, is_ffprobe_on_path, probe_video};
pub use media::pattern::NumberedPattern;
pub use media::sink::{ContainerSink, DIRECTORY_PATTERN, DirectorySink, FrameSink};
pub use media::source::{
    ContainerFrames, DirectoryFrames, FrameSource, IMAGE_EXTENSIONS, MediaKind, PatternFrames,
};
pub use model::checkpoint::{Checkpoint, ParamSet};
pub use model::config::{ModelConfig, ModelParams, ParamGroup};
pub use model::context::{Device, InferenceContext, Precision};
pub use model::keypoints::{Keypoints, Tensor};
pub use model::network::{
    AvdNetwork, DenseMotionNetwork, InpaintingNetwork, KeypointDetector, LandmarkDetector,
    ModelLoader, Models, MotionField,
};
pub use pipeline::{RunOpts, RunStats, run};
