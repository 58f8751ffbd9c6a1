use tracing::debug;

use crate::animate::generator::Animation;
use crate::animate::motion::TransferMode;
use crate::animate::search::AlignmentIndex;
use crate::foundation::core::Frame;
use crate::foundation::error::AnimResult;
use crate::model::context::InferenceContext;
use crate::model::network::Models;

/// Animate a driving sequence outward from the frame at `alignment`.
///
/// `open_driving` must yield the same sequence every time it is called; it is called once per
/// direction. Frames `[alignment, ..., 0]` are animated first and their output is buffered and
/// reversed, so memory grows with `alignment`. Frames `[alignment, ..., n - 1]` are then
/// streamed, dropping the output for `alignment` which the backward pass already produced.
///
/// The returned iterator yields one frame per driving frame in original order. An alignment
/// past the end of the sequence animates what exists backward and nothing forward.
pub fn animate_bidirectional<'a, F, D>(
    models: &'a Models,
    source: &'a Frame,
    mut open_driving: F,
    alignment: AlignmentIndex,
    mode: TransferMode,
    ctx: InferenceContext,
) -> AnimResult<impl Iterator<Item = AnimResult<Frame>>>
where
    F: FnMut() -> AnimResult<D>,
    D: IntoIterator<Item = AnimResult<Frame>>,
{
    let mut prefix = open_driving()?
        .into_iter()
        .take(alignment.saturating_add(1))
        .collect::<AnimResult<Vec<Frame>>>()?;
    let reaches_alignment = prefix.len() > alignment;
    prefix.reverse();

    let mut backward = Animation::new(models, source, prefix.into_iter().map(Ok), mode, ctx)?
        .collect::<AnimResult<Vec<Frame>>>()?;
    backward.reverse();
    debug!(alignment, backward = backward.len(), "backward pass done");

    let forward = if reaches_alignment {
        let mut frames = open_driving()?.into_iter();
        for _ in 0..alignment {
            if let Some(Err(e)) = frames.next() {
                return Err(e);
            }
        }
        let mut forward = Animation::new(models, source, frames, mode, ctx)?;
        // Output for the alignment frame itself came from the backward pass.
        if let Some(Err(e)) = forward.next() {
            return Err(e);
        }
        Some(forward)
    } else {
        None
    };

    Ok(backward.into_iter().map(Ok).chain(forward.into_iter().flatten()))
}

#[cfg(test)]
#[path = "../../tests/unit/animate/bidirectional.rs"]
mod tests;
