use super::*;

#[test]
fn zero_padded_pattern() {
    let p = NumberedPattern::parse("out/%05d.png").unwrap();
    assert_eq!(p.path_for(0), PathBuf::from("out/00000.png"));
    assert_eq!(p.path_for(42), PathBuf::from("out/00042.png"));
    assert_eq!(p.path_for(123_456), PathBuf::from("out/123456.png"));
}

#[test]
fn plain_pattern_has_no_padding() {
    let p = NumberedPattern::parse("frame_%d.jpg").unwrap();
    assert_eq!(p.path_for(7), PathBuf::from("frame_7.jpg"));
}

#[test]
fn escaped_percent_is_literal() {
    let p = NumberedPattern::parse("100%%/img%03d.png").unwrap();
    assert_eq!(p.path_for(5), PathBuf::from("100%/img005.png"));
}

#[test]
fn rejects_bad_patterns() {
    assert!(NumberedPattern::parse("frames/plain.png").is_err());
    assert!(NumberedPattern::parse("frames/%s.png").is_err());
    assert!(NumberedPattern::parse("%d_%d.png").is_err());
}
