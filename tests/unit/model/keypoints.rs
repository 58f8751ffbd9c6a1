use super::*;

#[test]
fn tensor_shape_must_match_data() {
    assert!(Tensor::new(vec![2, 3], vec![0.0; 6]).is_ok());
    assert!(Tensor::new(vec![2, 3], vec![0.0; 5]).is_err());

    let s = Tensor::scalar(1.5);
    assert_eq!(s.numel(), 1);
    s.validate().unwrap();
}

#[test]
fn displacement_is_pointwise() {
    let init = Keypoints::new(vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)]);
    let cur = Keypoints::new(vec![Point::new(0.5, 0.0), Point::new(1.0, 0.75)]);

    let d = cur.displacement_from(&init).unwrap();
    assert_eq!(d, vec![Vec2::new(0.5, 0.0), Vec2::new(0.0, -0.25)]);
}

#[test]
fn displacement_rejects_count_mismatch() {
    let a = Keypoints::new(vec![Point::ORIGIN]);
    let b = Keypoints::new(vec![Point::ORIGIN, Point::ORIGIN]);
    assert!(a.displacement_from(&b).is_err());
}

#[test]
fn with_positions_keeps_extras() {
    let kp = Keypoints::new(vec![Point::ORIGIN]).with_extra("jacobian", Tensor::scalar(2.0));
    let moved = kp.with_positions(vec![Point::new(0.25, 0.25)]).unwrap();

    assert_eq!(moved.fg_kp, vec![Point::new(0.25, 0.25)]);
    assert_eq!(moved.extras, kp.extras);
    assert!(kp.with_positions(Vec::new()).is_err());
}

#[test]
fn keypoints_deserialize_without_extras() {
    let kp: Keypoints =
        serde_json::from_str(r#"{ "fg_kp": [{ "x": 0.5, "y": -0.5 }] }"#).unwrap();
    assert_eq!(kp.len(), 1);
    assert!(kp.extras.is_empty());
}
