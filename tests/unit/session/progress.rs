use super::*;

fn secs(s: f64) -> MediaTime {
    MediaTime::from_secs_f64(s, 600)
}

#[test]
fn progress_is_scaled_into_the_transcode_ceiling() {
    let t = ProgressTracker::new(TimeRange::from_secs(0.0, 10.0).unwrap(), Progress::new());
    t.update(secs(0.0));
    assert_eq!(t.value(), 0.0);
    t.update(secs(5.0));
    assert!((t.value() - 0.45).abs() < 1e-12);
    t.update(secs(10.0));
    assert!((t.value() - 0.9).abs() < 1e-12);
}

#[test]
fn progress_stays_within_bounds_for_timestamps_in_range() {
    let range = TimeRange::from_secs(2.0, 3.0).unwrap();
    let t = ProgressTracker::new(range, Progress::new());
    let mut last = 0.0;
    for i in 0..=300 {
        t.update(secs(2.0 + f64::from(i) * 0.01));
        let v = t.value();
        assert!((0.0..=TRANSCODE_PROGRESS_CEILING).contains(&v));
        assert!(v >= last, "progress decreased: {last} -> {v}");
        last = v;
    }
}

#[test]
fn out_of_range_timestamps_are_clamped_and_never_lower_progress() {
    let t = ProgressTracker::new(TimeRange::from_secs(1.0, 2.0).unwrap(), Progress::new());
    t.update(secs(0.0));
    assert_eq!(t.value(), 0.0);
    t.update(secs(100.0));
    assert_eq!(t.value(), TRANSCODE_PROGRESS_CEILING);
    t.update(secs(1.5));
    assert_eq!(t.value(), TRANSCODE_PROGRESS_CEILING);
}

#[test]
fn unknown_or_empty_duration_does_not_advance() {
    let open = ProgressTracker::new(TimeRange::full(), Progress::new());
    open.update(secs(3.0));
    assert_eq!(open.value(), 0.0);

    let empty = ProgressTracker::new(TimeRange::from_secs(0.0, 0.0).unwrap(), Progress::new());
    empty.update(secs(3.0));
    assert_eq!(empty.value(), 0.0);
}

#[test]
fn finalize_is_exactly_one_and_shared() {
    let shared = Progress::new();
    let t = ProgressTracker::new(TimeRange::from_secs(0.0, 1.0).unwrap(), shared.clone());
    t.update(secs(0.5));
    t.finalize();
    assert_eq!(t.value(), 1.0);
    assert_eq!(shared.get(), 1.0);
}

#[test]
fn new_tracker_resets_shared_progress() {
    let shared = Progress::new();
    let first = ProgressTracker::new(TimeRange::from_secs(0.0, 1.0).unwrap(), shared.clone());
    first.finalize();
    let _second = ProgressTracker::new(TimeRange::from_secs(0.0, 1.0).unwrap(), shared.clone());
    assert_eq!(shared.get(), 0.0);
}
