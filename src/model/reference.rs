//! Deterministic pure-Rust stand-ins for the pretrained networks.
//!
//! These follow the same contracts as the real networks but use classical image operations:
//! luminance centroids for keypoints, Gaussian-weighted keypoint displacement for dense motion,
//! and a bilinear backward warp for rendering. They let the whole pipeline run without a
//! neural runtime and give tests fully predictable collaborators.

use image::Rgb;
use tracing::{debug, warn};

use crate::foundation::core::{Frame, Point, Vec2};
use crate::foundation::error::{AnimError, AnimResult, Stage};
use crate::foundation::geometry::centroid;
use crate::model::checkpoint::Checkpoint;
use crate::model::config::ModelConfig;
use crate::model::context::{Device, InferenceContext};
use crate::model::keypoints::{Keypoints, Tensor};
use crate::model::network::{
    AvdNetwork, DenseMotionNetwork, InpaintingNetwork, KeypointDetector, LandmarkDetector,
    ModelLoader, Models, MotionField,
};

/// Keypoints per thin-plate transform.
pub const KP_PER_TPS: u32 = 5;

const DEFAULT_KP_VARIANCE: f64 = 0.01;
const WEIGHT_EPS: f64 = 1e-6;
/// Luminance variance under which a frame is considered featureless (no face).
const FLAT_VARIANCE: f64 = 1e-6;

/// Luminance-centroid keypoint detector over a `rows x cols` tile grid.
#[derive(Clone, Copy, Debug)]
pub struct TileKeypointDetector {
    rows: u32,
    cols: u32,
}

impl TileKeypointDetector {
    /// Detector producing `rows * cols` keypoints.
    pub fn new(rows: u32, cols: u32) -> AnimResult<Self> {
        if rows < 2 || cols < 2 {
            return Err(AnimError::config("keypoint grid needs at least 2x2 tiles"));
        }
        Ok(Self { rows, cols })
    }
}

impl KeypointDetector for TileKeypointDetector {
    fn detect(&self, frame: &Frame, ctx: &InferenceContext) -> AnimResult<Keypoints> {
        let (w, h) = frame.dimensions();
        if w < self.cols || h < self.rows {
            return Err(AnimError::model(
                Stage::KeypointDetection,
                format!(
                    "frame {w}x{h} is smaller than the {}x{} keypoint grid",
                    self.cols, self.rows
                ),
            ));
        }

        let n = (self.rows * self.cols) as usize;
        let mut fg_kp = Vec::with_capacity(n);
        let mut mass = Vec::with_capacity(n);
        for row in 0..self.rows {
            let (y0, y1) = (row * h / self.rows, (row + 1) * h / self.rows);
            for col in 0..self.cols {
                let (x0, x1) = (col * w / self.cols, (col + 1) * w / self.cols);

                // Luminance-weighted centroid; the constant term keeps flat tiles centered.
                let (mut sx, mut sy, mut sw, mut lum_sum) = (0.0, 0.0, 0.0, 0.0);
                for y in y0..y1 {
                    for x in x0..x1 {
                        let lum = luminance(frame.get_pixel(x, y));
                        let wgt = lum + 1e-3;
                        sx += wgt * f64::from(x);
                        sy += wgt * f64::from(y);
                        sw += wgt;
                        lum_sum += lum;
                    }
                }
                let px = Point::new(sx / sw, sy / sw);
                let p = to_normalized(px, w, h);
                fg_kp.push(Point::new(
                    ctx.precision.round_f64(p.x),
                    ctx.precision.round_f64(p.y),
                ));
                let area = f64::from((x1 - x0) * (y1 - y0));
                mass.push(ctx.precision.round((lum_sum / area) as f32));
            }
        }

        Ok(Keypoints::new(fg_kp).with_extra("fg_mass", Tensor::new(vec![n], mass)?))
    }
}

/// Dense motion from Gaussian-weighted keypoint displacements.
#[derive(Clone, Copy, Debug)]
pub struct GaussianMotion {
    variance: f64,
}

impl GaussianMotion {
    /// Estimator with kernel variance `variance` in normalized coordinates.
    pub fn new(variance: f64) -> AnimResult<Self> {
        if !variance.is_finite() || variance <= 0.0 {
            return Err(AnimError::config("kp_variance must be a positive number"));
        }
        Ok(Self { variance })
    }
}

impl DenseMotionNetwork for GaussianMotion {
    fn estimate(
        &self,
        source: &Frame,
        kp_driving: &Keypoints,
        kp_source: &Keypoints,
        ctx: &InferenceContext,
    ) -> AnimResult<MotionField> {
        kp_driving
            .ensure_same_len(kp_source)
            .map_err(|e| AnimError::model(Stage::MotionEstimation, e.to_string()))?;

        let (w, h) = source.dimensions();
        let shifts: Vec<(Point, Vec2)> = kp_driving
            .fg_kp
            .iter()
            .zip(&kp_source.fg_kp)
            .map(|(d, s)| (*d, *s - *d))
            .collect();
        let inv = 1.0 / (2.0 * self.variance);

        let mut deformation = Vec::with_capacity(w as usize * h as usize);
        for y in 0..h {
            for x in 0..w {
                let p = to_normalized(Point::new(f64::from(x), f64::from(y)), w, h);
                let (mut acc, mut total) = (Vec2::ZERO, 0.0);
                for (kd, shift) in &shifts {
                    let wgt = (-(p - *kd).hypot2() * inv).exp();
                    acc += *shift * wgt;
                    total += wgt;
                }
                let q = p + acc / (total + WEIGHT_EPS);
                deformation.push(Point::new(
                    ctx.precision.round_f64(q.x),
                    ctx.precision.round_f64(q.y),
                ));
            }
        }
        MotionField::new(w, h, deformation, None)
    }
}

/// Bilinear backward-warp renderer.
#[derive(Clone, Copy, Debug, Default)]
pub struct WarpRenderer;

impl InpaintingNetwork for WarpRenderer {
    fn render(
        &self,
        source: &Frame,
        motion: &MotionField,
        ctx: &InferenceContext,
    ) -> AnimResult<Frame> {
        let (w, h) = source.dimensions();
        if (motion.width, motion.height) != (w, h) {
            return Err(AnimError::model(
                Stage::Rendering,
                format!(
                    "motion field {}x{} does not match source {w}x{h}",
                    motion.width, motion.height
                ),
            ));
        }

        let mut out = Frame::new(w, h);
        for (x, y, px) in out.enumerate_pixels_mut() {
            let i = (y * w + x) as usize;
            let q = to_pixel(motion.deformation[i], w, h);
            let warped = bilinear_sample(source, q.x, q.y);
            let vis = motion.occlusion.as_ref().map_or(1.0, |o| o[i].clamp(0.0, 1.0));
            let orig = source.get_pixel(x, y).0;
            for c in 0..3 {
                px.0[c] = ctx.precision.round(vis * warped[c] + (1.0 - vis) * orig[c]);
            }
        }
        Ok(out)
    }
}

/// AVD stand-in: keeps the driving pose, moves it onto the source's position and spread.
#[derive(Clone, Copy, Debug, Default)]
pub struct CentroidAvd;

impl AvdNetwork for CentroidAvd {
    fn transfer(
        &self,
        kp_source: &Keypoints,
        kp_driving: &Keypoints,
        ctx: &InferenceContext,
    ) -> AnimResult<Keypoints> {
        kp_driving
            .ensure_same_len(kp_source)
            .map_err(|e| AnimError::model(Stage::MotionTransfer, e.to_string()))?;

        let (cs, cd) = (centroid(&kp_source.fg_kp), centroid(&kp_driving.fg_kp));
        let (ss, sd) = (spread(&kp_source.fg_kp, cs), spread(&kp_driving.fg_kp, cd));
        let scale = if sd > 0.0 { ss / sd } else { 1.0 };

        let moved = kp_driving
            .fg_kp
            .iter()
            .map(|p| {
                let q = cs + (*p - cd) * scale;
                Point::new(ctx.precision.round_f64(q.x), ctx.precision.round_f64(q.y))
            })
            .collect();
        kp_driving.with_positions(moved)
    }
}

/// Landmark stand-in built on the tile detector; reports no face on featureless frames.
#[derive(Clone, Copy, Debug)]
pub struct TileLandmarks {
    detector: TileKeypointDetector,
}

impl TileLandmarks {
    /// Landmarks from a `rows x cols` tile grid.
    pub fn new(rows: u32, cols: u32) -> AnimResult<Self> {
        Ok(Self {
            detector: TileKeypointDetector::new(rows, cols)?,
        })
    }
}

impl LandmarkDetector for TileLandmarks {
    fn landmarks(&self, frame: &Frame) -> AnimResult<Option<Vec<Point>>> {
        if luminance_variance(frame) < FLAT_VARIANCE {
            return Ok(None);
        }
        let kp = self.detector.detect(frame, &InferenceContext::default())?;
        // Pixel units, like a face-alignment detector reports.
        let (w, h) = frame.dimensions();
        Ok(Some(kp.fg_kp.into_iter().map(|p| to_pixel(p, w, h)).collect()))
    }
}

/// Loader for the reference backend.
///
/// Reads `common_params.num_tps` (keypoints = `num_tps * 5`, laid out as `num_tps` rows of 5
/// tiles) and `dense_motion_params.kp_variance` (default 0.01). The AVD stand-in is enabled only
/// when the checkpoint carries an AVD group.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReferenceLoader;

impl ReferenceLoader {
    /// Landmark detector matching the keypoint layout of `config`.
    pub fn landmarks(config: &ModelConfig) -> AnimResult<TileLandmarks> {
        TileLandmarks::new(config.num_tps()?.max(2), KP_PER_TPS)
    }
}

impl ModelLoader for ReferenceLoader {
    fn load(
        &self,
        config: &ModelConfig,
        checkpoint: &Checkpoint,
        device: Device,
    ) -> AnimResult<Models> {
        if device != Device::Cpu {
            warn!("reference backend has no accelerator support; running on CPU");
        }
        let rows = config.num_tps()?.max(2);
        let variance = config
            .model_params
            .dense_motion_params
            .get_f64("kp_variance")?
            .unwrap_or(DEFAULT_KP_VARIANCE);
        debug!(
            rows,
            cols = KP_PER_TPS,
            variance,
            parameters = checkpoint.parameter_count(),
            "loaded reference models"
        );

        Ok(Models {
            kp_detector: Box::new(TileKeypointDetector::new(rows, KP_PER_TPS)?),
            dense_motion: Box::new(GaussianMotion::new(variance)?),
            inpainting: Box::new(WarpRenderer),
            avd: checkpoint
                .avd_network
                .as_ref()
                .map(|_| Box::new(CentroidAvd) as Box<dyn AvdNetwork>),
        })
    }
}

fn luminance(px: &Rgb<f32>) -> f64 {
    let [r, g, b] = px.0;
    0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b)
}

fn luminance_variance(frame: &Frame) -> f64 {
    let n = f64::from(frame.width()) * f64::from(frame.height());
    if n == 0.0 {
        return 0.0;
    }
    let (mut sum, mut sq) = (0.0, 0.0);
    for px in frame.pixels() {
        let l = luminance(px);
        sum += l;
        sq += l * l;
    }
    let mean = sum / n;
    (sq / n - mean * mean).max(0.0)
}

fn spread(points: &[Point], c: Point) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    let ss: f64 = points.iter().map(|p| (*p - c).hypot2()).sum();
    (ss / points.len() as f64).sqrt()
}

/// Pixel position to `[-1, 1]` coordinates (corner-aligned).
fn to_normalized(p: Point, w: u32, h: u32) -> Point {
    Point::new(norm_axis(p.x, w), norm_axis(p.y, h))
}

fn to_pixel(p: Point, w: u32, h: u32) -> Point {
    Point::new(pixel_axis(p.x, w), pixel_axis(p.y, h))
}

fn norm_axis(v: f64, size: u32) -> f64 {
    if size <= 1 {
        return 0.0;
    }
    2.0 * v / f64::from(size - 1) - 1.0
}

fn pixel_axis(v: f64, size: u32) -> f64 {
    if size <= 1 {
        return 0.0;
    }
    (v + 1.0) * 0.5 * f64::from(size - 1)
}

/// Bilinear sample with border clamping.
fn bilinear_sample(img: &Frame, x: f64, y: f64) -> [f32; 3] {
    let (w, h) = img.dimensions();
    let x = x.clamp(0.0, f64::from(w - 1));
    let y = y.clamp(0.0, f64::from(h - 1));
    let (x0, y0) = (x.floor() as u32, y.floor() as u32);
    let (x1, y1) = ((x0 + 1).min(w - 1), (y0 + 1).min(h - 1));
    let (fx, fy) = ((x - f64::from(x0)) as f32, (y - f64::from(y0)) as f32);

    let p00 = img.get_pixel(x0, y0).0;
    let p10 = img.get_pixel(x1, y0).0;
    let p01 = img.get_pixel(x0, y1).0;
    let p11 = img.get_pixel(x1, y1).0;

    let mut out = [0.0f32; 3];
    for c in 0..3 {
        out[c] = p00[c] * (1.0 - fx) * (1.0 - fy)
            + p10[c] * fx * (1.0 - fy)
            + p01[c] * (1.0 - fx) * fy
            + p11[c] * fx * fy;
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/model/reference.rs"]
mod tests;
