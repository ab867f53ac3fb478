use super::*;

#[test]
fn size_swap_and_area() {
    let s = Size::new(1920, 1080);
    assert_eq!(s.swapped(), Size::new(1080, 1920));
    assert_eq!(s.area(), 1920 * 1080);
    assert!(!s.is_empty());
    assert!(Size::new(0, 4).is_empty());
}

#[test]
fn transformed_size_follows_quarter_turns() {
    let natural = Size::new(1920, 1080);
    assert_eq!(natural.transformed_by(Affine::IDENTITY), natural);

    let portrait = Affine::new([0.0, 1.0, -1.0, 0.0, 1080.0, 0.0]);
    assert_eq!(natural.transformed_by(portrait), Size::new(1080, 1920));

    let upside_down = Affine::new([-1.0, 0.0, 0.0, -1.0, 1920.0, 1080.0]);
    assert_eq!(natural.transformed_by(upside_down), natural);
}

#[test]
fn media_time_rejects_zero_timescale() {
    assert!(MediaTime::new(1, 0).is_err());
    assert!(MediaTime::new(1, 600).is_ok());
}

#[test]
fn media_time_compares_across_timescales() {
    let a = MediaTime::new(1, 2).unwrap();
    let b = MediaTime::new(300, 600).unwrap();
    assert_eq!(a, b);
    assert!(MediaTime::new(301, 600).unwrap() > a);
    assert!(MediaTime::ZERO < a);
}

#[test]
fn media_time_arithmetic_saturates_at_zero() {
    let five = MediaTime::from_secs_f64(5.0, 600);
    let two = MediaTime::from_secs_f64(2.0, 1000);
    assert_eq!(five.saturating_sub(two).as_secs_f64(), 3.0);
    assert_eq!(two.saturating_sub(five).as_secs_f64(), 0.0);
    assert_eq!(two.saturating_add(five).as_secs_f64(), 7.0);
}

#[test]
fn time_range_validation() {
    assert!(TimeRange::from_secs(-1.0, 2.0).is_err());
    assert!(TimeRange::from_secs(0.0, -2.0).is_err());
    assert!(TimeRange::from_secs(f64::NAN, 2.0).is_err());
    assert!(TimeRange::from_secs(0.0, 0.0).is_ok());
}

#[test]
fn time_range_contains_is_half_open() {
    let r = TimeRange::from_secs(1.0, 2.0).unwrap();
    assert!(!r.contains(MediaTime::from_secs_f64(0.5, 600)));
    assert!(r.contains(MediaTime::from_secs_f64(1.0, 600)));
    assert!(r.contains(MediaTime::from_secs_f64(2.9, 600)));
    assert!(!r.contains(MediaTime::from_secs_f64(3.0, 600)));

    let open = TimeRange::full();
    assert!(open.contains(MediaTime::from_secs_f64(1e6, 600)));
    assert_eq!(open.end(), None);
}

#[test]
fn open_range_resolves_against_asset_duration() {
    let total = MediaTime::from_secs_f64(20.0, 600);
    let r = TimeRange {
        start: MediaTime::from_secs_f64(5.0, 600),
        duration: None,
    }
    .resolved(Some(total));
    assert_eq!(r.duration.map(MediaTime::as_secs_f64), Some(15.0));

    let finite = TimeRange::from_secs(0.0, 5.0).unwrap();
    assert_eq!(finite.resolved(Some(total)), finite);
    assert_eq!(TimeRange::full().resolved(None).duration, None);
}
