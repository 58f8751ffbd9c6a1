use tracing::{debug, warn};

use crate::foundation::core::{Frame, Point};
use crate::foundation::error::{AnimError, AnimResult, Stage};
use crate::foundation::geometry::{centroid, hull_area};
use crate::model::network::LandmarkDetector;

/// Offset into a driving sequence of the frame best aligned with the source.
pub type AlignmentIndex = usize;

/// Translation- and scale-invariant landmarks: centered on their centroid and divided by the
/// square root of their convex-hull area.
pub fn normalize_landmarks(points: &[Point]) -> AnimResult<Vec<Point>> {
    let scale = hull_area(points)?.sqrt();
    let c = centroid(points);
    Ok(points.iter().map(|p| ((*p - c) / scale).to_point()).collect())
}

/// Sum of squared per-coordinate differences between two landmark sets of equal length.
pub fn landmark_distance(a: &[Point], b: &[Point]) -> f64 {
    a.iter().zip(b).map(|(p, q)| (*p - *q).hypot2()).sum()
}

/// Index of the driving frame whose normalized landmarks are closest to the source's.
///
/// Consumes the whole sequence. Frames without usable landmarks are skipped; ties keep the
/// earliest frame. When no frame qualifies the result is 0. Decoding errors from `driving`
/// are propagated.
#[tracing::instrument(level = "info", skip_all)]
pub fn find_best_frame<I>(
    detector: &dyn LandmarkDetector,
    source: &Frame,
    driving: I,
) -> AnimResult<AlignmentIndex>
where
    I: IntoIterator<Item = AnimResult<Frame>>,
{
    let reference = match frame_landmarks(detector, source) {
        Ok(lm) => lm,
        Err(e) => {
            return Err(AnimError::model(
                Stage::Search,
                format!("source image has no usable landmarks: {e}"),
            ));
        }
    };

    let mut best: Option<(AlignmentIndex, f64)> = None;
    let mut examined = 0usize;
    for (i, frame) in driving.into_iter().enumerate() {
        let frame = frame?;
        examined += 1;

        let landmarks = match frame_landmarks(detector, &frame) {
            Ok(lm) if lm.len() == reference.len() => lm,
            Ok(lm) => {
                debug!(
                    frame = i,
                    got = lm.len(),
                    expected = reference.len(),
                    "landmark count mismatch"
                );
                continue;
            }
            Err(e) => {
                debug!(frame = i, error = %e, "skipping frame");
                continue;
            }
        };

        let dist = landmark_distance(&reference, &landmarks);
        if !dist.is_finite() {
            continue;
        }
        if best.is_none_or(|(_, d)| dist < d) {
            best = Some((i, dist));
        }
    }

    if examined == 0 {
        return Err(AnimError::empty_driving("no frames to search"));
    }
    match best {
        Some((index, dist)) => {
            debug!(index, dist, examined, "best aligned frame");
            Ok(index)
        }
        None => {
            warn!(examined, "no driving frame had usable landmarks; aligning at frame 0");
            Ok(0)
        }
    }
}

fn frame_landmarks(detector: &dyn LandmarkDetector, frame: &Frame) -> AnimResult<Vec<Point>> {
    let points = detector
        .landmarks(frame)
        .map_err(|e| AnimError::landmarks(e.to_string()))?
        .ok_or_else(|| AnimError::landmarks("no face found"))?;
    normalize_landmarks(&points).map_err(|e| AnimError::landmarks(e.to_string()))
}

#[cfg(test)]
#[path = "../../tests/unit/animate/search.rs"]
mod tests;
