use std::fmt;
use std::str::FromStr;

use crate::foundation::error::{AnimError, AnimResult, Stage};
use crate::foundation::geometry::hull_area;
use crate::model::context::InferenceContext;
use crate::model::keypoints::Keypoints;
use crate::model::network::AvdNetwork;

/// How driving keypoints are turned into the keypoints that drive the source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferMode {
    /// Use the driving keypoints as-is.
    Standard,
    /// Apply the driving motion, relative to its first frame, to the source keypoints.
    #[default]
    Relative,
    /// Let the AVD network disentangle pose from identity.
    Avd,
}

impl TransferMode {
    /// Lowercase name as used on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Relative => "relative",
            Self::Avd => "avd",
        }
    }
}

impl fmt::Display for TransferMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransferMode {
    type Err = AnimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(Self::Standard),
            "relative" => Ok(Self::Relative),
            "avd" => Ok(Self::Avd),
            other => Err(AnimError::validation(format!(
                "unknown mode '{other}' (expected standard, relative or avd)"
            ))),
        }
    }
}

/// Factor that maps driving motion onto the source's geometric scale:
/// `sqrt(hull area of kp_source) / sqrt(hull area of kp_driving_initial)`.
pub fn movement_scale(kp_source: &Keypoints, kp_driving_initial: &Keypoints) -> AnimResult<f64> {
    let source_area = hull_area(&kp_source.fg_kp)?;
    let driving_area = hull_area(&kp_driving_initial.fg_kp)?;
    Ok(source_area.sqrt() / driving_area.sqrt())
}

/// Relative-mode keypoints: source keypoints displaced by the scaled motion of `kp_driving`
/// since `kp_driving_initial`. Non-positional fields come from `kp_driving` untouched.
pub fn relative_keypoints(
    kp_source: &Keypoints,
    kp_driving: &Keypoints,
    kp_driving_initial: &Keypoints,
) -> AnimResult<Keypoints> {
    kp_source.ensure_same_len(kp_driving)?;
    let scale = movement_scale(kp_source, kp_driving_initial)?;
    let displacement = kp_driving.displacement_from(kp_driving_initial)?;

    let moved = kp_source
        .fg_kp
        .iter()
        .zip(displacement)
        .map(|(src, d)| *src + d * scale)
        .collect();
    kp_driving.with_positions(moved)
}

/// Normalized keypoints that drive the source for one frame under `mode`.
///
/// `avd` must be provided for [`TransferMode::Avd`].
pub fn compute_motion(
    kp_source: &Keypoints,
    kp_driving: &Keypoints,
    kp_driving_initial: &Keypoints,
    mode: TransferMode,
    avd: Option<&dyn AvdNetwork>,
    ctx: &InferenceContext,
) -> AnimResult<Keypoints> {
    match mode {
        TransferMode::Standard => Ok(kp_driving.clone()),
        TransferMode::Relative => relative_keypoints(kp_source, kp_driving, kp_driving_initial),
        TransferMode::Avd => {
            let avd = avd.ok_or_else(|| {
                AnimError::validation("avd mode requires an AVD network in the checkpoint")
            })?;
            avd.transfer(kp_source, kp_driving, ctx)
                .map_err(|e| e.at(Stage::MotionTransfer))
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animate/motion.rs"]
mod tests;
