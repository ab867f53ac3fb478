//! Export sessions: planning, the two track pipelines, progress and the stage machine that
//! drives them.

/// Rendezvous for the two pipeline workers.
pub mod barrier;
/// Shared cancellation flag.
pub mod cancel;
/// Pull/append loop for one track.
pub mod pipeline;
/// Export planning from asset tracks and configuration.
pub mod plan;
/// Export progress as a fraction of the requested range.
pub mod progress;
/// Caller-supplied export request.
pub mod request;
/// Session states and terminal export statuses.
pub mod state;
/// Export orchestration.
pub mod transcode;

pub use cancel::CancelToken;
pub use plan::ExportPlan;
pub use progress::{Progress, ProgressTracker};
pub use request::ExportRequest;
pub use state::{ExportStatus, SessionState};
pub use transcode::{ExportHandle, TranscodeSession};
