use super::*;

fn gradient(w: u32, h: u32) -> Frame {
    Frame::from_fn(w, h, |x, y| {
        let v = (x + y) as f32 / (w + h) as f32;
        Rgb([v, 1.0 - v, 0.5])
    })
}

fn ctx() -> InferenceContext {
    InferenceContext::default()
}

#[test]
fn tile_detector_emits_one_keypoint_per_tile() {
    let det = TileKeypointDetector::new(2, 5).unwrap();
    let kp = det.detect(&gradient(40, 20), &ctx()).unwrap();

    assert_eq!(kp.len(), 10);
    assert_eq!(kp.extras["fg_mass"].shape, vec![10]);
    assert!(kp.fg_kp.iter().all(|p| (-1.0..=1.0).contains(&p.x)));
    assert!(kp.fg_kp.iter().all(|p| (-1.0..=1.0).contains(&p.y)));
}

#[test]
fn flat_frame_keypoints_sit_at_tile_centers() {
    let det = TileKeypointDetector::new(2, 2).unwrap();
    let flat = Frame::from_pixel(5, 5, Rgb([0.5, 0.5, 0.5]));
    let kp = det.detect(&flat, &ctx()).unwrap();

    // Tiles cover pixels 0..2 and 2..5 on each axis.
    let lo = 2.0 * 0.5 / 4.0 - 1.0;
    let hi = 2.0 * 3.0 / 4.0 - 1.0;
    assert!((kp.fg_kp[0].x - lo).abs() < 1e-9);
    assert!((kp.fg_kp[3].x - hi).abs() < 1e-9);
    assert!((kp.fg_kp[3].y - hi).abs() < 1e-9);
}

#[test]
fn detector_rejects_frames_smaller_than_grid() {
    let det = TileKeypointDetector::new(4, 5).unwrap();
    let err = det.detect(&gradient(3, 3), &ctx()).unwrap_err();
    assert_eq!(err.stage(), Stage::KeypointDetection);
    assert!(TileKeypointDetector::new(1, 5).is_err());
}

#[test]
fn identical_keypoints_give_identity_warp() {
    let src = gradient(16, 16);
    let kp = TileKeypointDetector::new(2, 2)
        .unwrap()
        .detect(&src, &ctx())
        .unwrap();
    let motion = GaussianMotion::new(0.01)
        .unwrap()
        .estimate(&src, &kp, &kp, &ctx())
        .unwrap();
    let out = WarpRenderer.render(&src, &motion, &ctx()).unwrap();

    for (a, b) in out.pixels().zip(src.pixels()) {
        for c in 0..3 {
            assert!((a.0[c] - b.0[c]).abs() < 1e-5);
        }
    }
}

#[test]
fn uniform_shift_moves_content() {
    let src = gradient(32, 32);
    let kp_source = Keypoints::new(vec![
        Point::new(-0.5, -0.5),
        Point::new(0.5, -0.5),
        Point::new(-0.5, 0.5),
        Point::new(0.5, 0.5),
    ]);
    let shifted = kp_source
        .fg_kp
        .iter()
        .map(|p| *p + Vec2::new(0.2, 0.0))
        .collect();
    let kp_driving = kp_source.with_positions(shifted).unwrap();

    let motion = GaussianMotion::new(10.0)
        .unwrap()
        .estimate(&src, &kp_driving, &kp_source, &ctx())
        .unwrap();
    // Every output pixel samples the source 0.2 to its left.
    let center = motion.deformation[(16 * 32 + 16) as usize];
    let p = to_normalized(Point::new(16.0, 16.0), 32, 32);
    assert!((center.x - (p.x - 0.2)).abs() < 1e-6);
    assert!((center.y - p.y).abs() < 1e-6);
}

#[test]
fn renderer_rejects_mismatched_field() {
    let src = gradient(8, 8);
    let field = MotionField::new(4, 4, vec![Point::ORIGIN; 16], None).unwrap();
    let err = WarpRenderer.render(&src, &field, &ctx()).unwrap_err();
    assert_eq!(err.stage(), Stage::Rendering);
}

#[test]
fn centroid_avd_moves_pose_onto_source() {
    let kp_source = Keypoints::new(vec![
        Point::new(0.0, 0.0),
        Point::new(2.0, 0.0),
        Point::new(0.0, 2.0),
    ]);
    let kp_driving = Keypoints::new(vec![
        Point::new(10.0, 10.0),
        Point::new(11.0, 10.0),
        Point::new(10.0, 11.0),
    ])
    .with_extra("jacobian", Tensor::scalar(1.0));

    let out = CentroidAvd.transfer(&kp_source, &kp_driving, &ctx()).unwrap();
    let c = centroid(&out.fg_kp);
    let cs = centroid(&kp_source.fg_kp);
    assert!((c - cs).hypot() < 1e-9);
    assert!(((out.fg_kp[1] - out.fg_kp[0]).hypot() - 2.0).abs() < 1e-9);
    assert_eq!(out.extras, kp_driving.extras);
}

#[test]
fn landmarks_report_no_face_on_flat_frames() {
    let lm = TileLandmarks::new(2, 5).unwrap();
    let flat = Frame::from_pixel(20, 20, Rgb([0.3, 0.3, 0.3]));
    assert!(lm.landmarks(&flat).unwrap().is_none());

    let pts = lm.landmarks(&gradient(20, 20)).unwrap().unwrap();
    assert_eq!(pts.len(), 10);
    assert!(pts.iter().all(|p| (0.0..=19.0).contains(&p.x)));
}

#[test]
fn reduced_precision_rounds_outputs() {
    let src = gradient(20, 20);
    let half = InferenceContext::new(Device::Cpu, true);
    let kp = TileKeypointDetector::new(2, 2)
        .unwrap()
        .detect(&src, &half)
        .unwrap();
    for p in &kp.fg_kp {
        assert_eq!(p.x, f64::from(half.precision.round(p.x as f32)));
    }
}

#[test]
fn loader_builds_models_from_config() {
    let cfg = ModelConfig::from_json_str(
        r#"{ "model_params": { "common_params": { "num_tps": 2 }, "generator_params": {}, "dense_motion_params": { "kp_variance": 0.05 } } }"#,
    )
    .unwrap();
    let no_avd = Checkpoint::default();
    let models = ReferenceLoader.load(&cfg, &no_avd, Device::Cpu).unwrap();
    assert!(models.avd.is_none());

    let with_avd = Checkpoint {
        avd_network: Some(Default::default()),
        ..Checkpoint::default()
    };
    let models = ReferenceLoader.load(&cfg, &with_avd, Device::Cpu).unwrap();
    assert!(models.avd.is_some());

    let kp = models.kp_detector.detect(&gradient(20, 20), &ctx()).unwrap();
    assert_eq!(kp.len(), 10);
}
