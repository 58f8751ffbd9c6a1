use std::cell::RefCell;
use std::rc::Rc;

use image::Rgb;

use super::*;
use crate::foundation::core::{Point, Vec2};
use crate::model::context::Device;
use crate::model::network::{
    AvdNetwork, DenseMotionNetwork, InpaintingNetwork, KeypointDetector, MotionField,
};
use crate::model::reference::{CentroidAvd, GaussianMotion, TileKeypointDetector, WarpRenderer};

fn models(avd: bool) -> Models {
    Models {
        kp_detector: Box::new(TileKeypointDetector::new(2, 5).unwrap()),
        dense_motion: Box::new(GaussianMotion::new(0.05).unwrap()),
        inpainting: Box::new(WarpRenderer),
        avd: avd.then(|| Box::new(CentroidAvd) as Box<dyn AvdNetwork>),
    }
}

fn pattern(shift: u32) -> Frame {
    Frame::from_fn(20, 10, |x, y| {
        let v = ((x + shift) % 20) as f32 / 20.0;
        Rgb([v, (y as f32 / 10.0), 0.5])
    })
}

fn assert_close(a: &Frame, b: &Frame) {
    for (p, q) in a.pixels().zip(b.pixels()) {
        for c in 0..3 {
            assert!((p.0[c] - q.0[c]).abs() < 1e-4, "{:?} vs {:?}", p.0, q.0);
        }
    }
}

struct BrokenRenderer;

impl InpaintingNetwork for BrokenRenderer {
    fn render(
        &self,
        _source: &Frame,
        _motion: &MotionField,
        _ctx: &InferenceContext,
    ) -> AnimResult<Frame> {
        Err(AnimError::Other(anyhow::anyhow!("out of device memory")))
    }
}

#[test]
fn one_output_frame_per_driving_frame() {
    let models = models(true);
    let source = pattern(0);
    for mode in [TransferMode::Standard, TransferMode::Relative, TransferMode::Avd] {
        let driving: Vec<_> = (0..5).map(|s| Ok(pattern(s * 3))).collect();
        let out: Vec<Frame> = animate(&models, &source, driving, mode, InferenceContext::default())
            .unwrap()
            .collect::<AnimResult<_>>()
            .unwrap();
        assert_eq!(out.len(), 5, "mode {mode}");
        assert!(out.iter().all(|f| f.dimensions() == source.dimensions()));
    }
}

#[test]
fn empty_driving_yields_nothing() {
    let models = models(false);
    let source = pattern(0);
    let mut anim = animate(
        &models,
        &source,
        Vec::<AnimResult<Frame>>::new(),
        TransferMode::Relative,
        InferenceContext::default(),
    )
    .unwrap();
    assert!(anim.next().is_none());
    assert_eq!(anim.produced(), 0);
}

#[test]
fn relative_mode_reproduces_source_whenever_driving_matches_first_frame() {
    let models = models(false);
    let source = pattern(0);
    let first = pattern(7);
    let driving = vec![Ok(first.clone()), Ok(pattern(2)), Ok(first)];

    let out: Vec<Frame> = animate(
        &models,
        &source,
        driving,
        TransferMode::Relative,
        InferenceContext::default(),
    )
    .unwrap()
    .collect::<AnimResult<_>>()
    .unwrap();
    assert_close(&out[0], &source);
    assert_close(&out[2], &source);
    assert!(
        out[1]
            .pixels()
            .zip(source.pixels())
            .any(|(p, q)| (p.0[0] - q.0[0]).abs() > 1e-4)
    );
}

const SOURCE_ID: u32 = 99;

fn tagged(id: u32) -> Frame {
    Frame::from_pixel(2, 2, Rgb([id as f32 / 100.0, 0.0, 0.0]))
}

/// Unit square at `(id, 0)` for driving frames, a 2x2 square at the origin for the source.
struct ScriptedDetector;

impl KeypointDetector for ScriptedDetector {
    fn detect(&self, frame: &Frame, _ctx: &InferenceContext) -> AnimResult<Keypoints> {
        let id = (frame.get_pixel(0, 0).0[0] * 100.0).round() as u32;
        let (x, side) = if id == SOURCE_ID {
            (0.0, 2.0)
        } else {
            (f64::from(id), 1.0)
        };
        Ok(Keypoints::new(vec![
            Point::new(x, 0.0),
            Point::new(x + side, 0.0),
            Point::new(x + side, side),
            Point::new(x, side),
        ]))
    }
}

/// Records the transferred keypoints it is asked to estimate motion for.
struct RecordingMotion {
    seen: Rc<RefCell<Vec<Keypoints>>>,
}

impl DenseMotionNetwork for RecordingMotion {
    fn estimate(
        &self,
        source: &Frame,
        kp_driving: &Keypoints,
        _kp_source: &Keypoints,
        _ctx: &InferenceContext,
    ) -> AnimResult<MotionField> {
        self.seen.borrow_mut().push(kp_driving.clone());
        let (w, h) = source.dimensions();
        MotionField::new(w, h, vec![Point::ORIGIN; (w * h) as usize], None)
    }
}

#[test]
fn relative_motion_is_measured_from_first_driving_frame() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let models = Models {
        kp_detector: Box::new(ScriptedDetector),
        dense_motion: Box::new(RecordingMotion {
            seen: Rc::clone(&seen),
        }),
        inpainting: Box::new(WarpRenderer),
        avd: None,
    };
    let source = tagged(SOURCE_ID);
    let driving: Vec<_> = [3, 5, 3, 8].into_iter().map(|id| Ok(tagged(id))).collect();

    let out = animate(
        &models,
        &source,
        driving,
        TransferMode::Relative,
        InferenceContext::default(),
    )
    .unwrap()
    .count();
    assert_eq!(out, 4);

    // Hull areas 4 and 1 give a movement scale of 2.
    let offsets: Vec<f64> = seen.borrow().iter().map(|kp| kp.fg_kp[0].x).collect();
    assert_eq!(offsets, vec![0.0, 4.0, 0.0, 10.0]);
    let source_kp = ScriptedDetector
        .detect(&source, &InferenceContext::default())
        .unwrap();
    for (kp, dx) in seen.borrow().iter().zip(&offsets) {
        for (p, q) in kp.fg_kp.iter().zip(&source_kp.fg_kp) {
            assert_eq!(*p, *q + Vec2::new(*dx, 0.0));
        }
    }
}

#[test]
fn avd_mode_without_network_fails_up_front() {
    let models = models(false);
    let source = pattern(0);
    let err = match animate(
        &models,
        &source,
        vec![Ok(pattern(1))],
        TransferMode::Avd,
        InferenceContext::default(),
    ) {
        Err(e) => e,
        Ok(_) => panic!("avd without network must fail"),
    };
    assert!(matches!(err, AnimError::Validation(_)));
}

#[test]
fn collaborator_failure_is_tagged_and_ends_stream() {
    let mut models = models(false);
    models.inpainting = Box::new(BrokenRenderer);
    let source = pattern(0);
    let driving: Vec<_> = (0..3).map(|s| Ok(pattern(s))).collect();

    let mut anim = animate(
        &models,
        &source,
        driving,
        TransferMode::Standard,
        InferenceContext::default(),
    )
    .unwrap();
    let err = anim.next().unwrap().unwrap_err();
    assert_eq!(err.stage(), Stage::Rendering);
    assert!(err.to_string().contains("out of device memory"));
    assert!(anim.next().is_none());
}

#[test]
fn mismatched_driving_shape_is_rejected() {
    let models = models(false);
    let source = pattern(0);
    let small = Frame::from_pixel(10, 10, Rgb([0.2, 0.4, 0.6]));
    let mut anim = animate(
        &models,
        &source,
        vec![Ok(small)],
        TransferMode::Standard,
        InferenceContext::default(),
    )
    .unwrap();
    assert!(matches!(
        anim.next().unwrap().unwrap_err(),
        AnimError::Validation(_)
    ));
}

#[test]
fn reduced_precision_output_stays_close() {
    let models = models(false);
    let source = pattern(0);
    let driving = || (0..3).map(|s| Ok::<_, AnimError>(pattern(s * 2)));

    let full: Vec<Frame> = animate(
        &models,
        &source,
        driving(),
        TransferMode::Relative,
        InferenceContext::default(),
    )
    .unwrap()
    .collect::<AnimResult<_>>()
    .unwrap();
    let reduced: Vec<Frame> = animate(
        &models,
        &source,
        driving(),
        TransferMode::Relative,
        InferenceContext::new(Device::Cpu, true),
    )
    .unwrap()
    .collect::<AnimResult<_>>()
    .unwrap();

    assert_eq!(full.len(), reduced.len());
    for (a, b) in full.iter().zip(&reduced) {
        for (p, q) in a.pixels().zip(b.pixels()) {
            assert!((p.0[0] - q.0[0]).abs() < 2e-2);
        }
    }
}
