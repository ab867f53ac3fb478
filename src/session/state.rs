use std::sync::atomic::{AtomicU8, Ordering};

use crate::media::writer::WriterStatus;

/// Terminal result of one export call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportStatus {
    /// The output was written and finalized.
    Completed,
    /// The export failed; see [`TranscodeSession::failure_reason`](super::TranscodeSession::failure_reason).
    Failed,
    /// The export was cancelled.
    Cancelled,
}

impl ExportStatus {
    /// Map a writer's terminal status. Anything but `Completed` or `Cancelled` is a failure.
    pub fn from_writer(status: WriterStatus) -> Self {
        match status {
            WriterStatus::Completed => Self::Completed,
            WriterStatus::Cancelled => Self::Cancelled,
            WriterStatus::Failed | WriterStatus::Writing | WriterStatus::Unknown => Self::Failed,
        }
    }
}

impl std::fmt::Display for ExportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        })
    }
}

/// Lifecycle state of a session, observable while an export runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SessionState {
    /// No export has started, or the last one is being reset.
    Idle = 0,
    /// Validating the request and building reader/writer.
    Configuring = 1,
    /// Track pipelines are running.
    Writing = 2,
    /// Both pipelines finished; the writer is finalizing.
    Finalizing = 3,
    /// Terminal: output completed.
    Completed = 4,
    /// Terminal: export failed.
    Failed = 5,
    /// Terminal: export cancelled.
    Cancelled = 6,
}

impl SessionState {
    /// Whether the state is one of the three terminal states.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Configuring,
            2 => Self::Writing,
            3 => Self::Finalizing,
            4 => Self::Completed,
            5 => Self::Failed,
            6 => Self::Cancelled,
            _ => Self::Idle,
        }
    }
}

impl From<ExportStatus> for SessionState {
    fn from(status: ExportStatus) -> Self {
        match status {
            ExportStatus::Completed => Self::Completed,
            ExportStatus::Failed => Self::Failed,
            ExportStatus::Cancelled => Self::Cancelled,
        }
    }
}

/// Atomic cell holding a [`SessionState`].
#[derive(Debug, Default)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn get(&self) -> SessionState {
        SessionState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn set(&self, state: SessionState) {
        let prev = SessionState::from_u8(self.0.swap(state as u8, Ordering::AcqRel));
        if prev != state {
            tracing::debug!(from = ?prev, to = ?state, "session state");
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/state.rs"]
mod tests;
