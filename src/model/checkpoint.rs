use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context as _;
use tracing::debug;

use crate::foundation::error::{AnimError, AnimResult};
use crate::model::keypoints::Tensor;

/// Named parameters of one network.
pub type ParamSet = BTreeMap<String, Tensor>;

/// Persisted parameter bundle for the four networks.
///
/// The inpainting, keypoint and dense-motion groups are required; loading fails as a whole if
/// any is missing. The AVD group is optional.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Checkpoint {
    /// Inpainting renderer parameters.
    pub inpainting_network: ParamSet,
    /// Keypoint detector parameters.
    pub kp_detector: ParamSet,
    /// Dense motion estimator parameters.
    pub dense_motion_network: ParamSet,
    /// AVD network parameters, when present.
    pub avd_network: Option<ParamSet>,
}

impl Checkpoint {
    /// Group name of the inpainting renderer.
    pub const INPAINTING: &'static str = "inpainting_network";
    /// Group name of the keypoint detector.
    pub const KP_DETECTOR: &'static str = "kp_detector";
    /// Group name of the dense motion estimator.
    pub const DENSE_MOTION: &'static str = "dense_motion_network";
    /// Group name of the optional AVD network.
    pub const AVD: &'static str = "avd_network";

    /// Parse a checkpoint from its JSON form: an object of groups, each an object of tensors.
    pub fn from_json_str(s: &str) -> AnimResult<Self> {
        let groups: BTreeMap<String, ParamSet> = serde_json::from_str(s)
            .map_err(|e| AnimError::config(format!("invalid checkpoint: {e}")))?;
        Self::from_groups(groups)
    }

    /// Read and parse a checkpoint file.
    pub fn from_path(path: &Path) -> AnimResult<Self> {
        if !path.exists() {
            return Err(AnimError::NotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read checkpoint '{}'", path.display()))?;
        Self::from_json_str(&text)
    }

    /// Assemble a checkpoint from named groups, validating every tensor.
    pub fn from_groups(mut groups: BTreeMap<String, ParamSet>) -> AnimResult<Self> {
        let mut take = |name: &str| {
            groups
                .remove(name)
                .ok_or_else(|| AnimError::config(format!("checkpoint is missing '{name}'")))
        };
        let inpainting_network = take(Self::INPAINTING)?;
        let kp_detector = take(Self::KP_DETECTOR)?;
        let dense_motion_network = take(Self::DENSE_MOTION)?;

        let avd_network = groups.remove(Self::AVD);
        if avd_network.is_none() {
            debug!("checkpoint has no '{}' group; skipping", Self::AVD);
        }
        for name in groups.keys() {
            debug!(group = %name, "ignoring unused checkpoint group");
        }

        let ckpt = Self {
            inpainting_network,
            kp_detector,
            dense_motion_network,
            avd_network,
        };
        for (group, params) in ckpt.groups() {
            for (name, t) in params {
                t.validate()
                    .map_err(|e| AnimError::config(format!("{group}.{name}: {e}")))?;
            }
        }
        Ok(ckpt)
    }

    /// Present groups with their names.
    pub fn groups(&self) -> impl Iterator<Item = (&'static str, &ParamSet)> {
        [
            (Self::INPAINTING, Some(&self.inpainting_network)),
            (Self::KP_DETECTOR, Some(&self.kp_detector)),
            (Self::DENSE_MOTION, Some(&self.dense_motion_network)),
            (Self::AVD, self.avd_network.as_ref()),
        ]
        .into_iter()
        .filter_map(|(name, group)| group.map(|g| (name, g)))
    }

    /// Total number of scalar parameters across all groups.
    pub fn parameter_count(&self) -> usize {
        self.groups()
            .flat_map(|(_, g)| g.values())
            .map(|t| t.data.len())
            .sum()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/checkpoint.rs"]
mod tests;
