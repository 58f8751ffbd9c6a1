use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        AnimError::degenerate("x")
            .to_string()
            .contains("degenerate geometry:")
    );
    assert!(
        AnimError::validation("x")
            .to_string()
            .contains("invalid input:")
    );
    assert!(AnimError::config("x").to_string().contains("invalid config:"));
    assert!(AnimError::io("x").to_string().contains("io error:"));
    assert!(
        AnimError::empty_driving("x")
            .to_string()
            .contains("empty driving sequence:")
    );
}

#[test]
fn every_variant_displays_its_stage() {
    let errors = [
        AnimError::NotFound(PathBuf::from("missing.png")),
        AnimError::degenerate("point set is collinear"),
        AnimError::landmarks("no face"),
        AnimError::model(Stage::MotionEstimation, "x"),
        AnimError::empty_driving("x"),
        AnimError::io("x"),
        AnimError::validation("x"),
        AnimError::config("x"),
        AnimError::Other(anyhow::anyhow!("decode image 'bad.png'")),
    ];
    for err in errors {
        let shown = err.to_string();
        assert!(
            shown.starts_with(&format!("{} error:", err.stage())),
            "{shown}"
        );
    }
}

#[test]
fn wrapped_errors_show_their_context_chain() {
    let err = AnimError::Other(
        anyhow::anyhow!("invalid png signature").context("decode image 'bad.png'"),
    );
    assert_eq!(
        err.to_string(),
        "io error: decode image 'bad.png': invalid png signature"
    );
}

#[test]
fn model_errors_name_their_stage() {
    let err = AnimError::model(Stage::Rendering, "nan in output");
    assert_eq!(err.to_string(), "rendering error: nan in output");
    assert_eq!(err.stage(), Stage::Rendering);

    let err = AnimError::model(Stage::KeypointDetection, "bad shape");
    assert!(err.to_string().starts_with("keypoint detection error:"));
}

#[test]
fn at_retags_model_and_wrapped_errors_only() {
    let retagged = AnimError::model(Stage::Rendering, "x").at(Stage::MotionEstimation);
    assert_eq!(retagged.stage(), Stage::MotionEstimation);

    let wrapped = AnimError::Other(anyhow::anyhow!("boom")).at(Stage::KeypointDetection);
    assert_eq!(wrapped.stage(), Stage::KeypointDetection);
    assert!(wrapped.to_string().contains("boom"));

    let kept = AnimError::degenerate("collinear").at(Stage::Rendering);
    assert!(matches!(kept, AnimError::DegenerateGeometry(_)));
}

#[test]
fn not_found_shows_path() {
    let err = AnimError::NotFound(PathBuf::from("missing/driving.mp4"));
    assert!(err.to_string().contains("missing/driving.mp4"));
    assert_eq!(err.stage(), Stage::Io);
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = AnimError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
