use image::{Rgb, RgbImage};

use super::*;

fn write_png(path: &Path, shade: u8) {
    RgbImage::from_pixel(6, 4, Rgb([shade, shade, shade]))
        .save(path)
        .unwrap();
}

#[test]
fn directory_listing_is_sorted_and_filtered() {
    let names = vec!["b.png".to_string(), "a.jpg".to_string(), "c.txt".to_string()];
    assert_eq!(select_image_files(names), vec!["a.jpg", "b.png"]);
}

#[test]
fn extension_filter_is_case_insensitive() {
    let names = vec![
        "02.TIFF".to_string(),
        "01.Png".to_string(),
        "notes".to_string(),
        "03.gif".to_string(),
    ];
    assert_eq!(select_image_files(names), vec!["01.Png", "02.TIFF"]);
}

#[test]
fn directory_source_reads_in_name_order() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir.path().join("b.png"), 200);
    write_png(&dir.path().join("a.png"), 10);
    std::fs::write(dir.path().join("c.txt"), "skip me").unwrap();
    std::fs::create_dir(dir.path().join("d.png")).unwrap();

    let source = FrameSource::open(dir.path()).unwrap();
    assert_eq!(source.kind(), MediaKind::Directory);
    assert_eq!(source.len(), Some(2));
    assert_eq!(source.fps(), Fps::DEFAULT);

    let shades: Vec<u8> = source
        .map(|img| img.unwrap().to_rgb8().get_pixel(0, 0).0[0])
        .collect();
    assert_eq!(shades, vec![10, 200]);
}

#[test]
fn frames_are_normalized_to_shape() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir.path().join("0.png"), 255);

    let shape = FrameShape::new(3, 2).unwrap();
    let frames: Vec<Frame> = FrameSource::open(dir.path())
        .unwrap()
        .frames(shape)
        .collect::<AnimResult<_>>()
        .unwrap();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].dimensions(), (3, 2));
    assert!((frames[0].get_pixel(1, 1).0[0] - 1.0).abs() < 1e-6);
}

#[test]
fn pattern_source_expands_from_first_existing_index() {
    let dir = tempfile::tempdir().unwrap();
    for i in 1..=3 {
        write_png(&dir.path().join(format!("img{i:03}.png")), i as u8);
    }
    // A gap ends the sequence.
    write_png(&dir.path().join("img005.png"), 5);

    let pattern = dir.path().join("img%03d.png");
    let source = FrameSource::open(&pattern).unwrap();
    assert_eq!(source.kind(), MediaKind::Pattern);
    assert_eq!(source.len(), None);

    let shades: Vec<u8> = source
        .map(|img| img.unwrap().to_rgb8().get_pixel(0, 0).0[0])
        .collect();
    assert_eq!(shades, vec![1, 2, 3]);
}

#[test]
fn pattern_without_matches_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let mut source = FrameSource::open(dir.path().join("%05d.png")).unwrap();
    assert!(source.next().is_none());
}

#[test]
fn missing_container_is_not_found() {
    let err = match FrameSource::open("definitely/missing/driving.mp4") {
        Err(e) => e,
        Ok(_) => panic!("missing file must fail"),
    };
    assert!(matches!(err, AnimError::NotFound(_)));
}

#[test]
fn media_kind_classifies_paths() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(MediaKind::of(dir.path()), MediaKind::Directory);
    assert_eq!(MediaKind::of(Path::new("x/%04d.png")), MediaKind::Pattern);
    assert_eq!(MediaKind::of(Path::new("x/driving.mp4")), MediaKind::Container);
}
