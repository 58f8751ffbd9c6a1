use std::path::PathBuf;

use tracing::{debug, info};

use crate::animate::bidirectional::animate_bidirectional;
use crate::animate::generator::{animate, ensure_mode_supported};
use crate::animate::motion::TransferMode;
use crate::animate::search::{AlignmentIndex, find_best_frame};
use crate::foundation::core::{Frame, FrameShape};
use crate::foundation::error::{AnimError, AnimResult};
use crate::media::convert::{load_image, normalize_frame};
use crate::media::sink::FrameSink;
use crate::media::source::FrameSource;
use crate::model::context::{Device, InferenceContext};
use crate::model::network::{LandmarkDetector, Models};

/// Emit a progress event every this many written frames.
const PROGRESS_EVERY: u64 = 25;

/// Options for one animation run.
#[derive(Clone, Debug, PartialEq)]
pub struct RunOpts {
    /// Still image to animate.
    pub source_image: PathBuf,
    /// Driving video, image directory, or numbered pattern.
    pub driving: PathBuf,
    /// Output video or image directory.
    pub output: PathBuf,
    /// Shape every frame is normalized to before processing.
    pub shape: FrameShape,
    /// Keypoint transfer mode.
    pub mode: TransferMode,
    /// Align at the driving frame closest to the source and animate outward from it.
    pub find_best_frame: bool,
    /// Device the models were loaded on.
    pub device: Device,
    /// Run per-frame inference in reduced precision.
    pub reduced_precision: bool,
}

impl RunOpts {
    /// Options with default shape (256x256), relative mode, CPU, full precision.
    pub fn new(
        source_image: impl Into<PathBuf>,
        driving: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source_image: source_image.into(),
            driving: driving.into(),
            output: output.into(),
            shape: FrameShape::default(),
            mode: TransferMode::default(),
            find_best_frame: false,
            device: Device::Cpu,
            reduced_precision: false,
        }
    }

    /// Inference context implied by the device and precision options.
    pub fn context(&self) -> InferenceContext {
        InferenceContext::new(self.device, self.reduced_precision)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// Outcome of a completed run.
pub struct RunStats {
    /// Driving frame count reported by the source, when known.
    pub frames_total: Option<u64>,
    /// Frames written to the output.
    pub frames_written: u64,
    /// Alignment index used, when best-frame alignment was requested.
    pub alignment: Option<AlignmentIndex>,
}

/// Animate `opts.source_image` with `opts.driving` and write the result to `opts.output`.
///
/// `landmarks` is required when `opts.find_best_frame` is set. The output is created only
/// once the inputs are known to be usable, and it is finalized even when animation fails
/// midway.
#[tracing::instrument(
    level = "info",
    skip_all,
    fields(driving = %opts.driving.display(), mode = %opts.mode)
)]
pub fn run(
    models: &Models,
    landmarks: Option<&dyn LandmarkDetector>,
    opts: &RunOpts,
) -> AnimResult<RunStats> {
    ensure_mode_supported(models, opts.mode)?;
    let landmarks = if opts.find_best_frame {
        Some(landmarks.ok_or_else(|| {
            AnimError::validation("best-frame alignment needs a landmark detector")
        })?)
    } else {
        None
    };

    let source = normalize_frame(&load_image(&opts.source_image)?, opts.shape);
    let driving = FrameSource::open(&opts.driving)?;
    let (fps, total) = (driving.fps(), driving.len());
    let mut frames = driving.frames(opts.shape).peekable();
    if frames.peek().is_none() {
        return Err(AnimError::empty_driving(format!(
            "'{}' has no frames",
            opts.driving.display()
        )));
    }
    let ctx = opts.context();
    info!(
        total = ?total,
        fps = fps.as_f64(),
        shape = %opts.shape,
        precision = ?ctx.precision,
        "animating"
    );

    let mut stats = RunStats {
        frames_total: total,
        ..RunStats::default()
    };

    let frames_written = if let Some(detector) = landmarks {
        let alignment = find_best_frame(detector, &source, frames)?;
        info!(alignment, "best aligned driving frame");
        stats.alignment = Some(alignment);

        let open_driving = || FrameSource::open(&opts.driving).map(|s| s.frames(opts.shape));
        let animation =
            animate_bidirectional(models, &source, open_driving, alignment, opts.mode, ctx)?;
        let mut sink = FrameSink::create(&opts.output, fps, opts.shape)?;
        write_all(&mut sink, animation, total)?;
        sink.finish()?
    } else {
        let animation = animate(models, &source, frames, opts.mode, ctx)?;
        let mut sink = FrameSink::create(&opts.output, fps, opts.shape)?;
        write_all(&mut sink, animation, total)?;
        sink.finish()?
    };

    stats.frames_written = frames_written;
    info!(frames = frames_written, output = %opts.output.display(), "run finished");
    Ok(stats)
}

fn write_all(
    sink: &mut FrameSink,
    frames: impl Iterator<Item = AnimResult<Frame>>,
    total: Option<u64>,
) -> AnimResult<()> {
    for frame in frames {
        sink.append(&frame?)?;
        let written = sink.frames_written();
        if written % PROGRESS_EVERY == 0 || Some(written) == total {
            info!(frame = written, total = ?total, "progress");
        } else {
            debug!(frame = written, "frame written");
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../tests/unit/pipeline.rs"]
mod tests;
