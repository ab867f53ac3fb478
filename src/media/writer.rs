use std::path::Path;

use crate::encode::settings::{InputSettings, WriterOptions};
use crate::foundation::core::MediaTime;
use crate::foundation::error::TranscodeResult;
use crate::media::sample::SampleBuffer;

/// Lifecycle status of a writer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriterStatus {
    /// Created, not started.
    Unknown,
    /// Accepting samples.
    Writing,
    /// Output finalized successfully.
    Completed,
    /// Writing failed; see [`AssetWriter::error`].
    Failed,
    /// Writing was cancelled and the output discarded.
    Cancelled,
}

/// Answer to a demand request from a track input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Demand {
    /// The input can take more samples now.
    Ready,
    /// The input will never accept samples again.
    Closed,
}

/// Sink-side input for one track.
pub trait TrackInput: Send {
    /// Block until the input wants more data.
    ///
    /// This is the only place a track pipeline suspends.
    fn request_media_data(&mut self) -> Demand;

    /// Whether the input can take another sample without blocking.
    fn is_ready_for_more_media_data(&self) -> bool;

    /// Append one sample.
    fn append(&mut self, sample: SampleBuffer) -> TranscodeResult<()>;

    /// Signal that no more samples will be appended. Idempotent.
    fn mark_as_finished(&mut self);
}

/// Sink-side writer producing one output container.
pub trait AssetWriter: Send {
    /// Register an input. Registration order is the track order of the output container.
    fn add_input(&mut self, settings: InputSettings) -> TranscodeResult<Box<dyn TrackInput>>;

    /// Start accepting samples.
    fn start_writing(&mut self) -> TranscodeResult<()>;

    /// Anchor the output timeline at `start`.
    fn start_session_at(&mut self, start: MediaTime);

    /// Finalize the output once all inputs are finished and return the terminal status.
    fn finish_writing(&mut self) -> WriterStatus;

    /// Abort writing and discard partial output.
    fn cancel_writing(&mut self);

    /// Current status.
    fn status(&self) -> WriterStatus;

    /// Diagnostic detail when the status is [`WriterStatus::Failed`].
    fn error(&self) -> Option<String>;
}

/// Creates writers for output paths.
pub trait WriterFactory: Send + Sync {
    /// Create a writer targeting `path`.
    fn create_writer(
        &self,
        path: &Path,
        opts: WriterOptions,
    ) -> TranscodeResult<Box<dyn AssetWriter>>;
}
