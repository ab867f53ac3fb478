use super::*;

use std::path::PathBuf;
use std::sync::mpsc;

use crate::config::export::{ExportConfig, TimeRangeConfig};
use crate::encode::settings::WriterOptions;
use crate::foundation::core::{Affine, MediaTime, Size};
use crate::media::asset::TrackInfo;
use crate::media::memory::{InMemoryAsset, InMemoryWriterFactory, uniform_samples};
use crate::media::sample::SampleBuffer;
use crate::media::writer::Demand;

fn asset_with_audio() -> Arc<InMemoryAsset> {
    Arc::new(
        InMemoryAsset::new(Some(MediaTime::from_secs_f64(2.0, 600)))
            .with_track(
                TrackInfo::video(1, Size::new(320, 240), Affine::IDENTITY),
                uniform_samples(MediaKind::Video, 20, 0.1),
            )
            .with_track(
                TrackInfo::audio(2),
                uniform_samples(MediaKind::Audio, 8, 0.25),
            ),
    )
}

fn session(
    asset: Arc<InMemoryAsset>,
    factory: &InMemoryWriterFactory,
) -> (tempfile::TempDir, TranscodeSession) {
    let dir = tempfile::tempdir().unwrap();
    let s = TranscodeSession::new(
        ExportRequest::new(asset, dir.path().join("out.mp4")),
        Arc::new(factory.clone()),
    );
    (dir, s)
}

#[test]
fn completed_export_reaches_full_progress() {
    let asset = asset_with_audio();
    let factory = InMemoryWriterFactory::new().with_demand_batch(4);
    let (_dir, s) = session(Arc::clone(&asset), &factory);

    assert_eq!(s.state(), SessionState::Idle);
    assert_eq!(s.export(), ExportStatus::Completed);
    assert_eq!(s.state(), SessionState::Completed);
    assert_eq!(s.progress(), 1.0);
    assert!(s.failure_reason().is_none());

    let rec = factory.record();
    assert_eq!(rec.video_pts.len(), 20);
    assert_eq!(rec.audio_pts.len(), 8);
    assert_eq!(rec.status, WriterStatus::Completed);
    assert_eq!(rec.session_start, Some(MediaTime::ZERO));

    let log = asset.reader_log();
    assert!(log.started);
    assert!(log.cancelled, "reader is cancelled once both pipelines finished");
}

#[test]
fn audio_input_is_registered_before_video() {
    let factory = InMemoryWriterFactory::new();
    let (_dir, s) = session(asset_with_audio(), &factory);
    s.export();
    assert_eq!(
        factory.record().registration_order(),
        vec![MediaKind::Audio, MediaKind::Video]
    );
}

#[test]
fn session_starts_at_the_range_start() {
    let factory = InMemoryWriterFactory::new();
    let cfg = ExportConfig {
        time_range: Some(TimeRangeConfig {
            start_secs: 0.5,
            duration_secs: Some(1.0),
        }),
        ..ExportConfig::default()
    };
    let dir = tempfile::tempdir().unwrap();
    let s = TranscodeSession::new(
        ExportRequest::new(asset_with_audio(), dir.path().join("out.mp4")).with_config(cfg),
        Arc::new(factory.clone()),
    );

    assert_eq!(s.export(), ExportStatus::Completed);
    let rec = factory.record();
    assert_eq!(
        rec.session_start,
        Some(MediaTime::from_secs_f64(0.5, MediaTime::DEFAULT_TIMESCALE))
    );
    // 0.5s..1.5s at 0.1s steps.
    assert_eq!(rec.video_pts.len(), 10);
}

#[test]
fn writer_refusing_to_start_fails_without_running_pipelines() {
    let asset = asset_with_audio();
    let factory = InMemoryWriterFactory::new().with_refused_start();
    let (_dir, s) = session(Arc::clone(&asset), &factory);

    assert_eq!(s.export(), ExportStatus::Failed);
    assert_eq!(s.state(), SessionState::Failed);
    let rec = factory.record();
    assert!(rec.video_pts.is_empty());
    assert!(rec.finished.is_empty());
    assert!(asset.reader_log().cancelled);
    assert!(
        s.failure_reason()
            .is_some_and(|r| r.contains("refused to start"))
    );
}

#[test]
fn reader_refusing_to_start_never_starts_the_writer() {
    let asset = Arc::new(
        InMemoryAsset::new(None)
            .with_track(
                TrackInfo::video(1, Size::new(320, 240), Affine::IDENTITY),
                uniform_samples(MediaKind::Video, 3, 0.1),
            )
            .with_refused_start(),
    );
    let factory = InMemoryWriterFactory::new();
    let (_dir, s) = session(asset, &factory);

    assert_eq!(s.export(), ExportStatus::Failed);
    assert_eq!(factory.record().status, WriterStatus::Unknown);
}

#[test]
fn unexpected_writer_status_is_a_failure() {
    let factory = InMemoryWriterFactory::new().finishing_with(WriterStatus::Unknown);
    let (_dir, s) = session(asset_with_audio(), &factory);

    assert_eq!(s.export(), ExportStatus::Failed);
    assert!(s.progress() < 1.0);
    assert_eq!(
        s.failure_reason().as_deref(),
        Some("writer did not complete")
    );
}

#[test]
fn cancel_before_export_builds_nothing() {
    let asset = asset_with_audio();
    let factory = InMemoryWriterFactory::new();
    let (_dir, s) = session(Arc::clone(&asset), &factory);
    s.cancel_token().cancel();

    assert_eq!(s.export(), ExportStatus::Cancelled);
    assert_eq!(s.state(), SessionState::Cancelled);
    assert_eq!(factory.record().writers_created, 0);
    assert_eq!(asset.reader_log().readers_created, 0);
}

struct CancellingFactory {
    inner: InMemoryWriterFactory,
    token: CancelToken,
}

impl WriterFactory for CancellingFactory {
    fn create_writer(
        &self,
        path: &Path,
        opts: WriterOptions,
    ) -> TranscodeResult<Box<dyn AssetWriter>> {
        Ok(Box::new(CancellingWriter {
            inner: self.inner.create_writer(path, opts)?,
            token: self.token.clone(),
        }))
    }
}

struct CancellingWriter {
    inner: Box<dyn AssetWriter>,
    token: CancelToken,
}

impl AssetWriter for CancellingWriter {
    fn add_input(
        &mut self,
        settings: crate::encode::settings::InputSettings,
    ) -> TranscodeResult<Box<dyn TrackInput>> {
        let kind = settings.kind();
        Ok(Box::new(CancellingInput {
            inner: self.inner.add_input(settings)?,
            token: self.token.clone(),
            kind,
        }))
    }
    fn start_writing(&mut self) -> TranscodeResult<()> {
        self.inner.start_writing()
    }
    fn start_session_at(&mut self, start: MediaTime) {
        self.inner.start_session_at(start)
    }
    fn finish_writing(&mut self) -> WriterStatus {
        self.inner.finish_writing()
    }
    fn cancel_writing(&mut self) {
        self.inner.cancel_writing()
    }
    fn status(&self) -> WriterStatus {
        self.inner.status()
    }
    fn error(&self) -> Option<String> {
        self.inner.error()
    }
}

struct CancellingInput {
    inner: Box<dyn TrackInput>,
    token: CancelToken,
    kind: MediaKind,
}

impl TrackInput for CancellingInput {
    fn request_media_data(&mut self) -> Demand {
        self.inner.request_media_data()
    }
    fn is_ready_for_more_media_data(&self) -> bool {
        self.inner.is_ready_for_more_media_data()
    }
    fn append(&mut self, sample: SampleBuffer) -> TranscodeResult<()> {
        self.inner.append(sample)?;
        if self.kind == MediaKind::Video {
            self.token.cancel();
        }
        Ok(())
    }
    fn mark_as_finished(&mut self) {
        self.inner.mark_as_finished()
    }
}

#[test]
fn cancel_mid_stream_cancels_the_writer() {
    let inner = InMemoryWriterFactory::new();
    let token = CancelToken::new();
    let factory = CancellingFactory {
        inner: inner.clone(),
        token: token.clone(),
    };
    let dir = tempfile::tempdir().unwrap();
    let s = TranscodeSession::new(
        ExportRequest::new(asset_with_audio(), dir.path().join("out.mp4")),
        Arc::new(factory),
    )
    .with_cancel_token(token);

    assert_eq!(s.export(), ExportStatus::Cancelled);
    let rec = inner.record();
    assert_eq!(rec.status, WriterStatus::Cancelled);
    assert_eq!(rec.video_pts.len(), 1);
    assert_eq!(rec.finished.len(), 2);
    assert!(s.progress() < 1.0);
}

#[test]
fn existing_output_is_removed_before_writing() {
    let dir = tempfile::tempdir().unwrap();
    let out: PathBuf = dir.path().join("out.mp4");
    std::fs::write(&out, b"stale").unwrap();

    let factory = InMemoryWriterFactory::new();
    let s = TranscodeSession::new(
        ExportRequest::new(asset_with_audio(), &out),
        Arc::new(factory.clone()),
    );

    assert_eq!(s.export(), ExportStatus::Completed);
    assert!(!out.exists());
    assert_eq!(factory.record().path.as_deref(), Some(out.as_path()));
}

#[test]
fn spawned_export_reports_once() {
    let factory = InMemoryWriterFactory::new();
    let (_dir, s) = session(asset_with_audio(), &factory);
    let (tx, rx) = mpsc::channel();

    let handle = s.spawn(move |status| {
        tx.send(status).unwrap();
    });
    let status = handle.join();

    assert_eq!(status, ExportStatus::Completed);
    let delivered: Vec<_> = rx.try_iter().collect();
    assert_eq!(delivered, vec![ExportStatus::Completed]);
}

#[test]
fn handle_exposes_state_after_completion() {
    let factory = InMemoryWriterFactory::new().finishing_with(WriterStatus::Failed);
    let (_dir, s) = session(asset_with_audio(), &factory);
    let (tx, rx) = mpsc::channel();
    let handle = s.spawn(move |status| {
        tx.send(status).unwrap();
    });

    assert_eq!(rx.recv().unwrap(), ExportStatus::Failed);
    while !handle.is_finished() {
        std::thread::yield_now();
    }
    assert_eq!(handle.state(), SessionState::Failed);
    assert!(handle.failure_reason().is_some());
    assert_eq!(handle.join(), ExportStatus::Failed);
}
