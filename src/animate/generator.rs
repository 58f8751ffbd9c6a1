use tracing::debug;

use crate::animate::motion::{TransferMode, compute_motion};
use crate::foundation::core::Frame;
use crate::foundation::error::{AnimError, AnimResult, Stage};
use crate::model::context::InferenceContext;
use crate::model::keypoints::Keypoints;
use crate::model::network::Models;

/// Streaming animation of one source frame by a driving sequence.
///
/// Yields exactly one rendered frame per driving frame, in order, holding at most one frame
/// at a time. The keypoints of the first driving frame are cached as the relative-mode
/// reference for the lifetime of the iterator. The first error ends the stream.
pub struct Animation<'a, I> {
    models: &'a Models,
    source: &'a Frame,
    kp_source: Keypoints,
    kp_driving_initial: Option<Keypoints>,
    mode: TransferMode,
    ctx: InferenceContext,
    driving: I,
    produced: u64,
    done: bool,
}

impl<'a, I> Animation<'a, I>
where
    I: Iterator<Item = AnimResult<Frame>>,
{
    /// Detect the source keypoints and prepare to animate `driving`.
    ///
    /// Fails before any driving frame is read when `mode` is [`TransferMode::Avd`] and
    /// `models` has no AVD network.
    pub fn new(
        models: &'a Models,
        source: &'a Frame,
        driving: impl IntoIterator<IntoIter = I>,
        mode: TransferMode,
        ctx: InferenceContext,
    ) -> AnimResult<Self> {
        ensure_mode_supported(models, mode)?;
        let kp_source = models
            .kp_detector
            .detect(source, &ctx)
            .map_err(|e| e.at(Stage::KeypointDetection))?;
        debug!(
            keypoints = kp_source.len(),
            %mode,
            precision = ?ctx.precision,
            "animation started"
        );

        Ok(Self {
            models,
            source,
            kp_source,
            kp_driving_initial: None,
            mode,
            ctx,
            driving: driving.into_iter(),
            produced: 0,
            done: false,
        })
    }

    /// Keypoints detected on the source frame.
    pub fn kp_source(&self) -> &Keypoints {
        &self.kp_source
    }

    /// Frames rendered so far.
    pub fn produced(&self) -> u64 {
        self.produced
    }

    fn step(&mut self, frame: &Frame) -> AnimResult<Frame> {
        if frame.dimensions() != self.source.dimensions() {
            return Err(AnimError::validation(format!(
                "driving frame is {}x{}, source is {}x{}",
                frame.width(),
                frame.height(),
                self.source.width(),
                self.source.height()
            )));
        }

        let kp_driving = self
            .models
            .kp_detector
            .detect(frame, &self.ctx)
            .map_err(|e| e.at(Stage::KeypointDetection))?;
        let kp_initial = self
            .kp_driving_initial
            .get_or_insert_with(|| kp_driving.clone());

        let kp_norm = compute_motion(
            &self.kp_source,
            &kp_driving,
            kp_initial,
            self.mode,
            self.models.avd.as_deref(),
            &self.ctx,
        )?;
        let motion = self
            .models
            .dense_motion
            .estimate(self.source, &kp_norm, &self.kp_source, &self.ctx)
            .map_err(|e| e.at(Stage::MotionEstimation))?;
        self.models
            .inpainting
            .render(self.source, &motion, &self.ctx)
            .map_err(|e| e.at(Stage::Rendering))
    }
}

impl<I> Iterator for Animation<'_, I>
where
    I: Iterator<Item = AnimResult<Frame>>,
{
    type Item = AnimResult<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let Some(frame) = self.driving.next() else {
            self.done = true;
            return None;
        };
        let out = frame.and_then(|frame| self.step(&frame));
        match &out {
            Ok(_) => self.produced += 1,
            Err(e) => {
                debug!(frame = self.produced, error = %e, "animation aborted");
                self.done = true;
            }
        }
        Some(out)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            (0, Some(0))
        } else {
            self.driving.size_hint()
        }
    }
}

/// Fail when `mode` needs a network that `models` does not carry.
pub(crate) fn ensure_mode_supported(models: &Models, mode: TransferMode) -> AnimResult<()> {
    if mode == TransferMode::Avd && models.avd.is_none() {
        return Err(AnimError::validation(
            "avd mode requires an AVD network in the checkpoint",
        ));
    }
    Ok(())
}

/// Animate `source` with every frame of `driving`. See [`Animation`].
pub fn animate<'a, D>(
    models: &'a Models,
    source: &'a Frame,
    driving: D,
    mode: TransferMode,
    ctx: InferenceContext,
) -> AnimResult<Animation<'a, D::IntoIter>>
where
    D: IntoIterator<Item = AnimResult<Frame>>,
{
    Animation::new(models, source, driving, mode, ctx)
}

#[cfg(test)]
#[path = "../../tests/unit/animate/generator.rs"]
mod tests;
