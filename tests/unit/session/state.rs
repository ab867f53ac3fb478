use super::*;

#[test]
fn writer_status_maps_unexpected_states_to_failed() {
    assert_eq!(
        ExportStatus::from_writer(WriterStatus::Completed),
        ExportStatus::Completed
    );
    assert_eq!(
        ExportStatus::from_writer(WriterStatus::Cancelled),
        ExportStatus::Cancelled
    );
    assert_eq!(
        ExportStatus::from_writer(WriterStatus::Failed),
        ExportStatus::Failed
    );
    assert_eq!(
        ExportStatus::from_writer(WriterStatus::Writing),
        ExportStatus::Failed
    );
    assert_eq!(
        ExportStatus::from_writer(WriterStatus::Unknown),
        ExportStatus::Failed
    );
}

#[test]
fn state_cell_round_trips_every_state() {
    let cell = StateCell::default();
    assert_eq!(cell.get(), SessionState::Idle);
    for s in [
        SessionState::Configuring,
        SessionState::Writing,
        SessionState::Finalizing,
        SessionState::Completed,
        SessionState::Failed,
        SessionState::Cancelled,
        SessionState::Idle,
    ] {
        cell.set(s);
        assert_eq!(cell.get(), s);
    }
}

#[test]
fn only_outcomes_are_terminal() {
    assert!(SessionState::from(ExportStatus::Failed).is_terminal());
    assert!(!SessionState::Writing.is_terminal());
    assert!(!SessionState::Idle.is_terminal());
}

#[test]
fn status_serializes_as_snake_case() {
    let s = serde_json::to_string(&ExportStatus::Cancelled).unwrap();
    assert_eq!(s, "\"cancelled\"");
    assert_eq!(ExportStatus::Completed.to_string(), "completed");
}
