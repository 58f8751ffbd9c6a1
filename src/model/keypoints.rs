use std::collections::BTreeMap;

use crate::foundation::core::{Point, Vec2};
use crate::foundation::error::{AnimError, AnimResult};

/// Dense `f32` tensor with an explicit shape, row-major.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Tensor {
    /// Dimension sizes, outermost first.
    pub shape: Vec<usize>,
    /// Row-major values; `data.len()` equals the product of `shape`.
    pub data: Vec<f32>,
}

impl Tensor {
    /// Create a tensor, checking that `data` fills `shape` exactly.
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> AnimResult<Self> {
        let t = Self { shape, data };
        t.validate()?;
        Ok(t)
    }

    /// Zero-dimensional tensor holding `v`.
    pub fn scalar(v: f32) -> Self {
        Self {
            shape: Vec::new(),
            data: vec![v],
        }
    }

    /// Number of elements implied by `shape`.
    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }

    /// Check that `data` matches `shape`.
    pub fn validate(&self) -> AnimResult<()> {
        if self.data.len() != self.numel() {
            return Err(AnimError::validation(format!(
                "tensor shape {:?} expects {} values, got {}",
                self.shape,
                self.numel(),
                self.data.len()
            )));
        }
        Ok(())
    }
}

/// Keypoints produced by a detector for one frame.
///
/// `fg_kp` holds the positional control points in normalized `[-1, 1]` image coordinates.
/// Anything else a detector emits (jacobians, confidences...) lives in `extras` under its
/// semantic key. Sets are never mutated in place; adapters derive new ones.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Keypoints {
    /// Foreground keypoint positions.
    pub fg_kp: Vec<Point>,
    /// Non-positional fields keyed by name.
    #[serde(default)]
    pub extras: BTreeMap<String, Tensor>,
}

impl Keypoints {
    /// Keypoints without extra fields.
    pub fn new(fg_kp: Vec<Point>) -> Self {
        Self {
            fg_kp,
            extras: BTreeMap::new(),
        }
    }

    /// Attach a named non-positional field.
    pub fn with_extra(mut self, key: impl Into<String>, value: Tensor) -> Self {
        self.extras.insert(key.into(), value);
        self
    }

    /// Number of foreground keypoints.
    pub fn len(&self) -> usize {
        self.fg_kp.len()
    }

    /// Return `true` when there are no foreground keypoints.
    pub fn is_empty(&self) -> bool {
        self.fg_kp.is_empty()
    }

    /// Per-keypoint displacement of `self` relative to `reference`.
    pub fn displacement_from(&self, reference: &Keypoints) -> AnimResult<Vec<Vec2>> {
        self.ensure_same_len(reference)?;
        Ok(self
            .fg_kp
            .iter()
            .zip(&reference.fg_kp)
            .map(|(cur, init)| *cur - *init)
            .collect())
    }

    /// Copy of `self` with foreground positions replaced by `fg_kp`; extras are kept as-is.
    pub fn with_positions(&self, fg_kp: Vec<Point>) -> AnimResult<Self> {
        if fg_kp.len() != self.fg_kp.len() {
            return Err(AnimError::validation(format!(
                "replacement keypoint count {} does not match {}",
                fg_kp.len(),
                self.fg_kp.len()
            )));
        }
        Ok(Self {
            fg_kp,
            extras: self.extras.clone(),
        })
    }

    pub(crate) fn ensure_same_len(&self, other: &Keypoints) -> AnimResult<()> {
        if self.fg_kp.len() != other.fg_kp.len() {
            return Err(AnimError::validation(format!(
                "keypoint count mismatch: {} vs {}",
                self.fg_kp.len(),
                other.fg_kp.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/keypoints.rs"]
mod tests;
