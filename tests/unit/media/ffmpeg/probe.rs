use super::*;

use crate::geometry::orientation::Orientation;

const PORTRAIT_PHONE: &str = r#"{
  "streams": [
    {
      "index": 0,
      "codec_type": "video",
      "width": 1920,
      "height": 1080,
      "avg_frame_rate": "30000/1001",
      "side_data_list": [{ "side_data_type": "Display Matrix", "rotation": -90 }]
    },
    { "index": 1, "codec_type": "audio", "sample_rate": "44100" },
    { "index": 2, "codec_type": "data" }
  ],
  "format": { "duration": "20.000000" }
}"#;

#[test]
fn probe_json_yields_tracks_and_duration() {
    let info = parse_probe_json(PORTRAIT_PHONE.as_bytes()).unwrap();
    assert_eq!(info.tracks.len(), 2);

    let video = &info.tracks[0];
    assert_eq!(video.kind, MediaKind::Video);
    assert_eq!(video.id, TrackId(0));
    assert_eq!(video.natural_size, Size::new(1920, 1080));
    assert_eq!(video.display_size(), Size::new(1080, 1920));
    assert!((video.nominal_frame_rate.unwrap() - 29.97).abs() < 0.01);
    assert_eq!(
        Orientation::resolve(video.preferred_transform, video.natural_size),
        Orientation::Portrait
    );

    assert_eq!(info.tracks[1].kind, MediaKind::Audio);
    assert_eq!(info.tracks[1].id, TrackId(1));
    assert_eq!(info.duration.map(MediaTime::as_secs_f64), Some(20.0));
}

#[test]
fn legacy_rotate_tag_is_clockwise() {
    let json = r#"{ "streams": [
        { "index": 0, "codec_type": "video", "width": 640, "height": 480,
          "tags": { "rotate": "180" } }
    ] }"#;
    let info = parse_probe_json(json.as_bytes()).unwrap();
    let v = &info.tracks[0];
    assert_eq!(
        Orientation::resolve(v.preferred_transform, v.natural_size),
        Orientation::LandscapeLeft
    );
    assert!(info.duration.is_none());
}

#[test]
fn quarter_turns_map_to_native_translations() {
    let n = Size::new(1920, 1080);
    let t = |deg| rotation_transform(deg, n).as_coeffs();
    assert_eq!(rotation_transform(0.0, n), Affine::IDENTITY);
    assert_eq!(&t(90.0)[4..], &[1080.0, 0.0]);
    assert_eq!(&t(180.0)[4..], &[1920.0, 1080.0]);
    assert_eq!(&t(270.0)[4..], &[0.0, 1920.0]);
    assert_eq!(t(-90.0), t(270.0));

    assert_eq!(
        Orientation::resolve(rotation_transform(270.0, n), n),
        Orientation::PortraitUpsideDown
    );
    // Every quarter turn keeps the picture inside the positive quadrant.
    for deg in [90.0, 180.0, 270.0] {
        let bbox = rotation_transform(deg, n)
            .transform_rect_bbox(crate::foundation::core::Rect::new(0.0, 0.0, 1920.0, 1080.0));
        assert!(bbox.x0.abs() < 1e-9 && bbox.y0.abs() < 1e-9, "{deg}: {bbox:?}");
    }
}

#[test]
fn rates_parse_as_rationals() {
    assert_eq!(parse_rate("30/1"), Some(30.0));
    assert_eq!(parse_rate("25"), Some(25.0));
    assert_eq!(parse_rate("0/0"), None);
    assert_eq!(parse_rate("abc"), None);
}

#[test]
fn malformed_probe_output_is_a_serde_error() {
    let err = parse_probe_json(b"not json").unwrap_err();
    assert!(matches!(err, TranscodeError::Serde(_)));

    let missing = r#"{ "streams": [{ "index": 0, "codec_type": "video" }] }"#;
    let err = parse_probe_json(missing.as_bytes()).unwrap_err();
    assert!(matches!(err, TranscodeError::Reader(_)));
}
