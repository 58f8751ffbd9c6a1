use std::fmt;
use std::str::FromStr;

use crate::foundation::error::{AnimError, AnimResult};

pub use kurbo::{Point, Vec2};

/// A normalized RGB frame: `f32` samples in `[0, 1]`, row-major.
///
/// Frames are produced at the configured [`FrameShape`] and treated as immutable once yielded.
pub type Frame = image::Rgb32FImage;

/// Spatial shape every frame is resized to before it reaches a model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FrameShape {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl FrameShape {
    /// Create a validated shape with non-zero sides.
    pub fn new(width: u32, height: u32) -> AnimResult<Self> {
        if width == 0 || height == 0 {
            return Err(AnimError::validation("frame shape must be non-zero"));
        }
        Ok(Self { width, height })
    }

    /// Return `true` when `frame` already has this shape.
    pub fn matches(self, frame: &Frame) -> bool {
        frame.dimensions() == (self.width, self.height)
    }

    /// Number of pixels in one frame.
    pub fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl Default for FrameShape {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
        }
    }
}

impl fmt::Display for FrameShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.width, self.height)
    }
}

impl FromStr for FrameShape {
    type Err = AnimError;

    /// Parse `"W,H"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(',')
            .ok_or_else(|| AnimError::validation(format!("frame shape '{s}' must be 'W,H'")))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<u32>()
                .map_err(|e| AnimError::validation(format!("frame shape '{s}': {e}")))
        };
        Self::new(parse(w)?, parse(h)?)
    }
}

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32,
}

impl Fps {
    /// Frame rate assumed when a source carries no metadata.
    pub const DEFAULT: Self = Self { num: 30, den: 1 };

    /// Create a validated FPS value.
    pub fn new(num: u32, den: u32) -> AnimResult<Self> {
        if den == 0 {
            return Err(AnimError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(AnimError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Parse an ffprobe-style rational such as `"30000/1001"` or a plain `"25"`.
    ///
    /// Returns `None` for `"0/0"` and other unusable values.
    pub fn parse_rational(s: &str) -> Option<Self> {
        let (num, den) = match s.split_once('/') {
            Some((n, d)) => (n.trim().parse().ok()?, d.trim().parse().ok()?),
            None => (s.trim().parse().ok()?, 1),
        };
        Self::new(num, den).ok()
    }

    /// Convert to floating-point FPS.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }
}

impl Default for Fps {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
