use std::path::Path;

use anyhow::Context as _;
use serde_json::{Map, Value};

use crate::foundation::error::{AnimError, AnimResult};

/// One nested parameter group of the config document.
///
/// Groups are passed whole to model construction; the typed accessors only read the few scalar
/// keys a loader needs.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ParamGroup(pub Map<String, Value>);

impl ParamGroup {
    /// Raw value under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Non-negative integer under `key`, if present.
    pub fn get_u32(&self, key: &str) -> AnimResult<Option<u32>> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => v
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .map(Some)
                .ok_or_else(|| {
                    AnimError::config(format!("'{key}' must be a non-negative integer, got {v}"))
                }),
        }
    }

    /// Number under `key`, if present.
    pub fn get_f64(&self, key: &str) -> AnimResult<Option<f64>> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => v
                .as_f64()
                .map(Some)
                .ok_or_else(|| AnimError::config(format!("'{key}' must be a number, got {v}"))),
        }
    }

    /// Boolean under `key`, if present.
    pub fn get_bool(&self, key: &str) -> AnimResult<Option<bool>> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => v
                .as_bool()
                .map(Some)
                .ok_or_else(|| AnimError::config(format!("'{key}' must be a boolean, got {v}"))),
        }
    }
}

/// Parameter groups feeding model construction.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ModelParams {
    /// Parameters shared by every network (`num_tps`, `num_channels`, `bg`...).
    pub common_params: ParamGroup,
    /// Inpainting renderer parameters.
    pub generator_params: ParamGroup,
    /// Dense motion estimator parameters.
    pub dense_motion_params: ParamGroup,
    /// AVD network parameters; absent in configs without an AVD stage.
    #[serde(default)]
    pub avd_network_params: ParamGroup,
}

/// Model config document.
///
/// Only `model_params` is interpreted; other top-level sections (dataset, training...) are kept
/// verbatim so the document round-trips.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ModelConfig {
    /// Model parameter groups.
    pub model_params: ModelParams,
    /// Remaining top-level sections.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl ModelConfig {
    /// Parse a config from JSON text.
    pub fn from_json_str(s: &str) -> AnimResult<Self> {
        serde_json::from_str(s).map_err(|e| AnimError::config(format!("invalid model config: {e}")))
    }

    /// Read and parse a config file.
    pub fn from_path(path: &Path) -> AnimResult<Self> {
        if !path.exists() {
            return Err(AnimError::NotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read model config '{}'", path.display()))?;
        Self::from_json_str(&text)
    }

    /// `common_params.num_tps`, the number of thin-plate transforms (5 keypoints each).
    pub fn num_tps(&self) -> AnimResult<u32> {
        let n = self
            .model_params
            .common_params
            .get_u32("num_tps")?
            .ok_or_else(|| AnimError::config("common_params.num_tps is required"))?;
        if n == 0 {
            return Err(AnimError::config("common_params.num_tps must be > 0"));
        }
        Ok(n)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/config.rs"]
mod tests;
