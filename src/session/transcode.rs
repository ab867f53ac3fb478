//! Export orchestration: one request in, one [`ExportStatus`] out.
//!
//! An export moves through typed stages. `Configured` owns a reader and writer with every
//! output and input attached, `Writing` owns them while both track pipelines run, and
//! `Finalizing` owns them until the writer reports its terminal status. Each stage consumes the
//! previous one, so a collaborator can only be used in the state it is valid for.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::encode::settings::InputSettings;
use crate::foundation::core::TimeRange;
use crate::foundation::error::TranscodeResult;
use crate::media::asset::MediaKind;
use crate::media::reader::{
    AssetReader, AudioDecodeSettings, PixelFormat, TrackOutput, VideoOutputSettings,
};
use crate::media::writer::{AssetWriter, TrackInput, WriterFactory, WriterStatus};
use crate::session::barrier::JoinBarrier;
use crate::session::cancel::CancelToken;
use crate::session::pipeline::{PipelineOutcome, PipelineReport, TrackPipeline};
use crate::session::plan::ExportPlan;
use crate::session::progress::{Progress, ProgressTracker};
use crate::session::request::{ExportRequest, ExportTarget};
use crate::session::state::{ExportStatus, SessionState, StateCell};

/// State shared between a session, its export thread and its handle.
#[derive(Debug, Default)]
struct Shared {
    state: StateCell,
    progress: Progress,
    cancel: CancelToken,
    failure: Mutex<Option<String>>,
}

impl Shared {
    fn record_failure(&self, reason: String) {
        *self.failure.lock().unwrap_or_else(|p| p.into_inner()) = Some(reason);
    }

    fn failure_reason(&self) -> Option<String> {
        self.failure
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}

/// One source-to-sink video transcode.
///
/// A session may run [`export`](Self::export) more than once; every call starts from
/// [`SessionState::Idle`] with progress reset and reports exactly one status.
pub struct TranscodeSession {
    request: ExportRequest,
    writers: Arc<dyn WriterFactory>,
    shared: Arc<Shared>,
}

impl TranscodeSession {
    /// Create a session for `request`, writing through `writers`.
    pub fn new(request: ExportRequest, writers: Arc<dyn WriterFactory>) -> Self {
        Self {
            request,
            writers,
            shared: Arc::new(Shared::default()),
        }
    }

    /// Use `token` instead of the session's own cancellation token.
    ///
    /// Lets a host cancel several sessions, or a collaborator, through one shared token.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.shared = Arc::new(Shared {
            cancel: token,
            ..Shared::default()
        });
        self
    }

    /// The request this session exports.
    pub fn request(&self) -> &ExportRequest {
        &self.request
    }

    /// Current progress in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        self.shared.progress.get()
    }

    /// Shared progress cell, readable from any thread while an export runs.
    pub fn progress_handle(&self) -> Progress {
        self.shared.progress.clone()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.shared.state.get()
    }

    /// Token that cancels this session's exports when triggered.
    pub fn cancel_token(&self) -> CancelToken {
        self.shared.cancel.clone()
    }

    /// Diagnostic detail of the most recent failed export.
    pub fn failure_reason(&self) -> Option<String> {
        self.shared.failure_reason()
    }

    /// Run the export on the calling thread and return its terminal status.
    ///
    /// Reader and writer are released before this returns.
    #[tracing::instrument(skip(self), fields(output = ?self.request.output_path))]
    pub fn export(&self) -> ExportStatus {
        let shared = &self.shared;
        shared.state.set(SessionState::Idle);
        shared.progress.reset();
        *shared.failure.lock().unwrap_or_else(|p| p.into_inner()) = None;

        let status = match self.run() {
            Ok(status) => status,
            Err(e) => {
                tracing::error!(error = %e, "export failed");
                shared.record_failure(e.to_string());
                ExportStatus::Failed
            }
        };

        shared.state.set(status.into());
        tracing::info!(%status, progress = shared.progress.get(), "export finished");
        status
    }

    /// Run the export on a background thread.
    ///
    /// `on_complete` is called exactly once with the terminal status, on the export thread (or on
    /// the calling thread when no thread could be spawned).
    pub fn spawn<F>(self, on_complete: F) -> ExportHandle
    where
        F: FnOnce(ExportStatus) + Send + 'static,
    {
        let shared = Arc::clone(&self.shared);
        let callback = Arc::new(Mutex::new(Some(on_complete)));
        let thread_callback = Arc::clone(&callback);

        let spawned = std::thread::Builder::new()
            .name("wavyte-transcode-export".to_string())
            .spawn(move || {
                let status = self.export();
                if let Some(cb) = take_callback(&thread_callback) {
                    cb(status);
                }
                status
            });

        let thread = match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::error!(error = %e, "failed to spawn export thread");
                shared.record_failure(format!("failed to spawn export thread: {e}"));
                shared.state.set(SessionState::Failed);
                if let Some(cb) = take_callback(&callback) {
                    cb(ExportStatus::Failed);
                }
                None
            }
        };

        ExportHandle { shared, thread }
    }

    fn run(&self) -> TranscodeResult<ExportStatus> {
        let shared = &self.shared;
        if shared.cancel.is_cancelled() {
            return Ok(ExportStatus::Cancelled);
        }

        shared.state.set(SessionState::Configuring);
        let target = self.request.target()?;
        let plan = ExportPlan::build(target.asset, &self.request.config, target.file_type)?;
        let configured = Configured::build(&target, &plan, self.writers.as_ref())?;

        if shared.cancel.is_cancelled() {
            return Ok(ExportStatus::Cancelled);
        }

        let writing = configured.start(plan.time_range)?;
        shared.state.set(SessionState::Writing);

        let tracker = ProgressTracker::new(plan.time_range, shared.progress.clone());
        let finalizing = writing.run(&tracker, &shared.cancel);

        shared.state.set(SessionState::Finalizing);
        let (status, detail) = finalizing.finish(shared.cancel.is_cancelled());

        let status = ExportStatus::from_writer(status);
        match status {
            ExportStatus::Completed => tracker.finalize(),
            ExportStatus::Cancelled => {}
            ExportStatus::Failed => {
                let reason = detail.unwrap_or_else(|| "writer did not complete".to_string());
                tracing::error!(reason = %reason, "writer failed to finalize");
                shared.record_failure(reason);
            }
        }
        Ok(status)
    }
}

fn take_callback<F>(slot: &Mutex<Option<F>>) -> Option<F> {
    slot.lock().unwrap_or_else(|p| p.into_inner()).take()
}

/// Handle to an export running on a background thread.
#[derive(Debug)]
pub struct ExportHandle {
    shared: Arc<Shared>,
    thread: Option<JoinHandle<ExportStatus>>,
}

impl ExportHandle {
    /// Current progress in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        self.shared.progress.get()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.shared.state.get()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.shared.cancel.cancel();
    }

    /// Diagnostic detail when the export failed.
    pub fn failure_reason(&self) -> Option<String> {
        self.shared.failure_reason()
    }

    /// Whether the export thread has finished.
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(|t| t.is_finished())
    }

    /// Wait for the export and return its status.
    pub fn join(self) -> ExportStatus {
        let Some(thread) = self.thread else {
            return ExportStatus::Failed;
        };
        thread.join().unwrap_or_else(|_| {
            self.shared
                .record_failure("export thread panicked".to_string());
            self.shared.state.set(SessionState::Failed);
            ExportStatus::Failed
        })
    }
}

/// One reader output wired to one writer input.
struct TrackLink {
    output: Box<dyn TrackOutput>,
    input: Box<dyn TrackInput>,
}

/// Reader and writer built, every output and input attached, nothing started.
struct Configured {
    reader: Box<dyn AssetReader>,
    writer: Box<dyn AssetWriter>,
    video: TrackLink,
    audio: Option<TrackLink>,
}

impl Configured {
    fn build(
        target: &ExportTarget<'_>,
        plan: &ExportPlan,
        writers: &dyn WriterFactory,
    ) -> TranscodeResult<Self> {
        remove_existing_output(target.output_path);

        let mut writer = writers.create_writer(target.output_path, plan.writer_options)?;
        let mut reader = target.asset.create_reader()?;

        let video_output = reader.add_video_output(
            plan.video_track.id,
            VideoOutputSettings {
                pixel_format: PixelFormat::Bgra32,
            },
            plan.composition.clone(),
        )?;

        // Audio registers first so it becomes the first track of the container.
        let audio = match (&plan.audio_track, &plan.audio) {
            (Some(track), Some(settings)) => {
                let output = reader.add_audio_output(
                    track.id,
                    AudioDecodeSettings {
                        sample_rate: settings.sample_rate,
                        channels: settings.channels,
                    },
                )?;
                let input = writer.add_input(InputSettings::Audio(settings.clone()))?;
                Some(TrackLink { output, input })
            }
            _ => None,
        };
        let video_input = writer.add_input(InputSettings::Video(plan.video.clone()))?;

        Ok(Self {
            reader,
            writer,
            video: TrackLink {
                output: video_output,
                input: video_input,
            },
            audio,
        })
    }

    fn start(self, range: TimeRange) -> TranscodeResult<Writing> {
        let Self {
            mut reader,
            mut writer,
            video,
            audio,
        } = self;

        reader.set_time_range(range);
        reader.start_reading()?;
        if let Err(e) = writer.start_writing() {
            reader.cancel_reading();
            return Err(e);
        }
        writer.start_session_at(range.start);

        Ok(Writing {
            reader,
            writer,
            video,
            audio,
        })
    }
}

/// Reading and writing started; pipelines not yet joined.
struct Writing {
    reader: Box<dyn AssetReader>,
    writer: Box<dyn AssetWriter>,
    video: TrackLink,
    audio: Option<TrackLink>,
}

impl Writing {
    fn run(self, tracker: &ProgressTracker, cancel: &CancelToken) -> Finalizing {
        let Self {
            reader,
            writer,
            video,
            audio,
        } = self;
        let barrier = JoinBarrier::new();

        let reports = std::thread::scope(|scope| {
            let mut workers = Vec::with_capacity(2);

            if let Some(link) = audio {
                let guard = barrier.enter();
                let cancel = cancel.clone();
                let spawned = std::thread::Builder::new()
                    .name("wavyte-transcode-audio".to_string())
                    .spawn_scoped(scope, move || {
                        let _guard = guard;
                        TrackPipeline::audio(link.output, link.input, cancel).run()
                    });
                workers.push((MediaKind::Audio, spawned));
            }

            let guard = barrier.enter();
            let cancel = cancel.clone();
            let spawned = std::thread::Builder::new()
                .name("wavyte-transcode-video".to_string())
                .spawn_scoped(scope, move || {
                    let _guard = guard;
                    TrackPipeline::video(video.output, video.input, tracker, cancel).run()
                });
            workers.push((MediaKind::Video, spawned));

            barrier.wait();

            workers
                .into_iter()
                .map(|(kind, spawned)| join_worker(kind, spawned))
                .collect::<Vec<_>>()
        });

        Finalizing {
            reader,
            writer,
            reports,
        }
    }
}

fn join_worker(
    kind: MediaKind,
    spawned: std::io::Result<std::thread::ScopedJoinHandle<'_, PipelineReport>>,
) -> PipelineReport {
    let failed = PipelineReport {
        kind,
        outcome: PipelineOutcome::ReadFailed,
        samples_written: 0,
    };
    match spawned {
        Ok(handle) => handle.join().unwrap_or_else(|_| {
            tracing::error!(%kind, "track pipeline panicked");
            failed
        }),
        Err(e) => {
            tracing::error!(%kind, error = %e, "failed to spawn track pipeline");
            failed
        }
    }
}

/// Both pipelines finished; the writer still has to be finalized or cancelled.
struct Finalizing {
    reader: Box<dyn AssetReader>,
    writer: Box<dyn AssetWriter>,
    reports: Vec<PipelineReport>,
}

impl Finalizing {
    /// Stop the reader, then finalize (or cancel) the writer. Both are dropped on return.
    fn finish(self, cancelled: bool) -> (WriterStatus, Option<String>) {
        let Self {
            mut reader,
            mut writer,
            reports,
        } = self;

        for r in &reports {
            tracing::debug!(
                kind = %r.kind,
                outcome = ?r.outcome,
                samples = r.samples_written,
                "pipeline report"
            );
        }

        reader.cancel_reading();
        let status = if cancelled {
            writer.cancel_writing();
            writer.status()
        } else {
            writer.finish_writing()
        };
        let detail = writer.error();

        drop(reader);
        drop(writer);
        (status, detail)
    }
}

fn remove_existing_output(path: &Path) {
    if !path.is_file() {
        return;
    }
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "removed existing output"),
        Err(e) => tracing::debug!(path = %path.display(), error = %e, "could not remove existing output"),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/transcode.rs"]
mod tests;
