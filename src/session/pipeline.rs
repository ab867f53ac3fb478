use crate::media::asset::MediaKind;
use crate::media::reader::TrackOutput;
use crate::media::writer::{Demand, TrackInput};
use crate::session::cancel::CancelToken;
use crate::session::progress::ProgressTracker;

/// Why a track pipeline stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// The source ran out of samples.
    Exhausted,
    /// The sink refused a sample.
    AppendFailed,
    /// The source failed to produce a sample.
    ReadFailed,
    /// The sink stopped asking for data.
    InputClosed,
    /// Cancellation was requested.
    Cancelled,
}

impl PipelineOutcome {
    /// Whether the loop ran to the end of its source.
    pub fn is_success(self) -> bool {
        self == Self::Exhausted
    }
}

/// Terminal report of one track pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PipelineReport {
    /// Track kind.
    pub kind: MediaKind,
    /// Terminal condition.
    pub outcome: PipelineOutcome,
    /// Samples accepted by the sink.
    pub samples_written: u64,
}

/// Demand-driven pull loop moving samples from one reader output to one writer input.
pub struct TrackPipeline<'a> {
    kind: MediaKind,
    output: Box<dyn TrackOutput>,
    input: Box<dyn TrackInput>,
    progress: Option<&'a ProgressTracker>,
    cancel: CancelToken,
}

impl<'a> TrackPipeline<'a> {
    /// Video pipeline; reports each sample's timestamp to `progress` before appending it.
    pub fn video(
        output: Box<dyn TrackOutput>,
        input: Box<dyn TrackInput>,
        progress: &'a ProgressTracker,
        cancel: CancelToken,
    ) -> Self {
        Self {
            kind: MediaKind::Video,
            output,
            input,
            progress: Some(progress),
            cancel,
        }
    }

    /// Audio pipeline.
    pub fn audio(
        output: Box<dyn TrackOutput>,
        input: Box<dyn TrackInput>,
        cancel: CancelToken,
    ) -> Self {
        Self {
            kind: MediaKind::Audio,
            output,
            input,
            progress: None,
            cancel,
        }
    }

    /// Run until a terminal condition, then mark the input finished.
    ///
    /// The loop only suspends in [`TrackInput::request_media_data`]; while the input reports
    /// readiness it pulls and appends without waiting.
    pub fn run(mut self) -> PipelineReport {
        let mut samples_written = 0u64;

        let outcome = 'demand: loop {
            if self.cancel.is_cancelled() {
                break PipelineOutcome::Cancelled;
            }
            if self.input.request_media_data() == Demand::Closed {
                break PipelineOutcome::InputClosed;
            }

            while self.input.is_ready_for_more_media_data() {
                if self.cancel.is_cancelled() {
                    break 'demand PipelineOutcome::Cancelled;
                }

                let sample = match self.output.copy_next_sample() {
                    Ok(Some(sample)) => sample,
                    Ok(None) => break 'demand PipelineOutcome::Exhausted,
                    Err(e) => {
                        self.log_failure("source read failed", &e);
                        break 'demand PipelineOutcome::ReadFailed;
                    }
                };

                if let Some(progress) = self.progress {
                    progress.update(sample.pts);
                }

                if let Err(e) = self.input.append(sample) {
                    self.log_failure("sample append failed", &e);
                    break 'demand PipelineOutcome::AppendFailed;
                }
                samples_written += 1;
            }
        };

        self.input.mark_as_finished();
        tracing::debug!(
            kind = %self.kind,
            ?outcome,
            samples_written,
            "track pipeline finished"
        );

        PipelineReport {
            kind: self.kind,
            outcome,
            samples_written,
        }
    }

    fn log_failure(&self, what: &str, err: &crate::foundation::error::TranscodeError) {
        match self.kind {
            MediaKind::Video => {
                tracing::warn!(error = %err, "video {what}; finishing video input early");
            }
            MediaKind::Audio => tracing::debug!(error = %err, "audio {what}"),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/pipeline.rs"]
mod tests;
