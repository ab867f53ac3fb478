//! In-memory asset and writer for tests, debugging and host integration harnesses.
//!
//! Samples are supplied up front; the writer records everything it is asked to do in a shared
//! [`WriterRecord`] and never touches the file system.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::encode::settings::{InputSettings, WriterOptions};
use crate::foundation::core::{MediaTime, TimeRange};
use crate::foundation::error::{TranscodeError, TranscodeResult};
use crate::media::asset::{Asset, MediaKind, TrackId, TrackInfo};
use crate::media::reader::{
    AssetReader, AudioDecodeSettings, TrackOutput, VideoComposition, VideoOutputSettings,
};
use crate::media::sample::SampleBuffer;
use crate::media::writer::{AssetWriter, Demand, TrackInput, WriterFactory, WriterStatus};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicking test thread must not hide the record from the asserting thread.
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Build `count` back-to-back samples of `step_secs` each, starting at zero.
pub fn uniform_samples(kind: MediaKind, count: usize, step_secs: f64) -> Vec<SampleBuffer> {
    (0..count)
        .map(|i| {
            SampleBuffer::new(
                kind,
                MediaTime::from_secs_f64(i as f64 * step_secs, MediaTime::DEFAULT_TIMESCALE),
                MediaTime::from_secs_f64(step_secs, MediaTime::DEFAULT_TIMESCALE),
                vec![i as u8; 4],
            )
        })
        .collect()
}

/// One track of an [`InMemoryAsset`].
#[derive(Clone, Debug)]
pub struct InMemoryTrack {
    /// Track description.
    pub info: TrackInfo,
    /// Samples in presentation order.
    pub samples: Vec<SampleBuffer>,
}

/// What readers of an [`InMemoryAsset`] were asked to do.
#[derive(Clone, Debug, Default)]
pub struct ReaderLog {
    /// Number of readers created.
    pub readers_created: usize,
    /// Time range set on the most recent reader.
    pub time_range: Option<TimeRange>,
    /// Video compositions bound to video outputs, in attach order.
    pub video_compositions: Vec<VideoComposition>,
    /// Tracks attached as outputs, in attach order.
    pub attached: Vec<TrackId>,
    /// Whether the most recent reader started.
    pub started: bool,
    /// Whether the most recent reader was cancelled.
    pub cancelled: bool,
}

/// Asset whose tracks and samples live in memory.
pub struct InMemoryAsset {
    tracks: Vec<InMemoryTrack>,
    duration: Option<MediaTime>,
    refuse_start: bool,
    log: Arc<Mutex<ReaderLog>>,
}

impl InMemoryAsset {
    /// Empty asset with the given total duration.
    pub fn new(duration: Option<MediaTime>) -> Self {
        Self {
            tracks: Vec::new(),
            duration,
            refuse_start: false,
            log: Arc::new(Mutex::new(ReaderLog::default())),
        }
    }

    /// Add a track with its samples.
    pub fn with_track(mut self, info: TrackInfo, samples: Vec<SampleBuffer>) -> Self {
        self.tracks.push(InMemoryTrack { info, samples });
        self
    }

    /// Make `start_reading` fail on every reader.
    pub fn with_refused_start(mut self) -> Self {
        self.refuse_start = true;
        self
    }

    /// Snapshot of the reader log.
    pub fn reader_log(&self) -> ReaderLog {
        lock(&self.log).clone()
    }
}

impl Asset for InMemoryAsset {
    fn tracks(&self) -> Vec<TrackInfo> {
        self.tracks.iter().map(|t| t.info.clone()).collect()
    }

    fn duration(&self) -> Option<MediaTime> {
        self.duration
    }

    fn create_reader(&self) -> TranscodeResult<Box<dyn AssetReader>> {
        {
            let mut log = lock(&self.log);
            log.readers_created += 1;
            log.time_range = None;
            log.video_compositions.clear();
            log.attached.clear();
            log.started = false;
            log.cancelled = false;
        }
        Ok(Box::new(InMemoryReader {
            tracks: self.tracks.clone(),
            range: TimeRange::full(),
            outputs: Vec::new(),
            refuse_start: self.refuse_start,
            log: Arc::clone(&self.log),
        }))
    }
}

#[derive(Default)]
struct OutputQueue {
    samples: Mutex<VecDeque<SampleBuffer>>,
    started: AtomicBool,
    cancelled: AtomicBool,
}

struct InMemoryReader {
    tracks: Vec<InMemoryTrack>,
    range: TimeRange,
    outputs: Vec<(TrackId, Arc<OutputQueue>)>,
    refuse_start: bool,
    log: Arc<Mutex<ReaderLog>>,
}

impl InMemoryReader {
    fn attach(&mut self, track: TrackId) -> TranscodeResult<Box<dyn TrackOutput>> {
        if !self.tracks.iter().any(|t| t.info.id == track) {
            return Err(TranscodeError::reader(format!(
                "track {} does not exist",
                track.0
            )));
        }
        let queue = Arc::new(OutputQueue::default());
        self.outputs.push((track, Arc::clone(&queue)));
        lock(&self.log).attached.push(track);
        Ok(Box::new(InMemoryTrackOutput { queue }))
    }
}

impl AssetReader for InMemoryReader {
    fn set_time_range(&mut self, range: TimeRange) {
        self.range = range;
        lock(&self.log).time_range = Some(range);
    }

    fn add_video_output(
        &mut self,
        track: TrackId,
        _settings: VideoOutputSettings,
        composition: VideoComposition,
    ) -> TranscodeResult<Box<dyn TrackOutput>> {
        let out = self.attach(track)?;
        lock(&self.log).video_compositions.push(composition);
        Ok(out)
    }

    fn add_audio_output(
        &mut self,
        track: TrackId,
        _settings: AudioDecodeSettings,
    ) -> TranscodeResult<Box<dyn TrackOutput>> {
        self.attach(track)
    }

    fn start_reading(&mut self) -> TranscodeResult<()> {
        if self.refuse_start {
            return Err(TranscodeError::reader("reader refused to start"));
        }
        for (id, queue) in &self.outputs {
            let Some(track) = self.tracks.iter().find(|t| t.info.id == *id) else {
                continue;
            };
            let mut samples = lock(&queue.samples);
            samples.extend(
                track
                    .samples
                    .iter()
                    .filter(|s| self.range.contains(s.pts))
                    .cloned(),
            );
            queue.started.store(true, Ordering::Release);
        }
        lock(&self.log).started = true;
        Ok(())
    }

    fn cancel_reading(&mut self) {
        for (_, queue) in &self.outputs {
            queue.cancelled.store(true, Ordering::Release);
            lock(&queue.samples).clear();
        }
        lock(&self.log).cancelled = true;
    }
}

struct InMemoryTrackOutput {
    queue: Arc<OutputQueue>,
}

impl TrackOutput for InMemoryTrackOutput {
    fn copy_next_sample(&mut self) -> TranscodeResult<Option<SampleBuffer>> {
        if self.queue.cancelled.load(Ordering::Acquire) {
            return Ok(None);
        }
        if !self.queue.started.load(Ordering::Acquire) {
            return Err(TranscodeError::reader("reader has not started"));
        }
        Ok(lock(&self.queue.samples).pop_front())
    }
}

/// Everything an [`InMemoryWriterFactory`]'s most recent writer was asked to do.
#[derive(Clone, Debug)]
pub struct WriterRecord {
    /// Number of writers created by the factory.
    pub writers_created: usize,
    /// Output path of the most recent writer.
    pub path: Option<PathBuf>,
    /// Writer options of the most recent writer.
    pub options: Option<WriterOptions>,
    /// Input registrations, in order.
    pub registrations: Vec<InputSettings>,
    /// Timestamps of accepted video samples.
    pub video_pts: Vec<MediaTime>,
    /// Timestamps of accepted audio samples.
    pub audio_pts: Vec<MediaTime>,
    /// Inputs marked finished, in order.
    pub finished: Vec<MediaKind>,
    /// Kinds whose appends were refused, one entry per refusal.
    pub refused: Vec<MediaKind>,
    /// Session start passed to `start_session_at`.
    pub session_start: Option<MediaTime>,
    /// Number of demand requests served.
    pub demand_requests: usize,
    /// Current writer status.
    pub status: WriterStatus,
    /// Failure detail.
    pub error: Option<String>,
}

impl Default for WriterRecord {
    fn default() -> Self {
        Self {
            writers_created: 0,
            path: None,
            options: None,
            registrations: Vec::new(),
            video_pts: Vec::new(),
            audio_pts: Vec::new(),
            finished: Vec::new(),
            refused: Vec::new(),
            session_start: None,
            demand_requests: 0,
            status: WriterStatus::Unknown,
            error: None,
        }
    }
}

impl WriterRecord {
    /// Kinds of the registered inputs, in order.
    pub fn registration_order(&self) -> Vec<MediaKind> {
        self.registrations.iter().map(InputSettings::kind).collect()
    }
}

#[derive(Clone, Debug)]
struct WriterBehavior {
    refuse_after: Vec<(MediaKind, usize)>,
    demand_batch: Option<usize>,
    refusal_fails_writer: bool,
    refuse_start: bool,
    finish_status: Option<WriterStatus>,
}

impl Default for WriterBehavior {
    fn default() -> Self {
        Self {
            refuse_after: Vec::new(),
            demand_batch: None,
            refusal_fails_writer: true,
            refuse_start: false,
            finish_status: None,
        }
    }
}

/// Factory for in-memory writers sharing one inspectable [`WriterRecord`].
#[derive(Clone, Debug, Default)]
pub struct InMemoryWriterFactory {
    record: Arc<Mutex<WriterRecord>>,
    behavior: WriterBehavior,
}

impl InMemoryWriterFactory {
    /// Factory with default behavior: every input always ready, every append accepted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse every `kind` append once `after` samples of that kind were accepted.
    pub fn refuse_appends(mut self, kind: MediaKind, after: usize) -> Self {
        self.behavior.refuse_after.push((kind, after));
        self
    }

    /// Stop reporting readiness after `batch` appends until the next demand request.
    pub fn with_demand_batch(mut self, batch: usize) -> Self {
        self.behavior.demand_batch = Some(batch.max(1));
        self
    }

    /// Whether a refused append makes `finish_writing` report failure (default `true`).
    pub fn refusal_fails_writer(mut self, fails: bool) -> Self {
        self.behavior.refusal_fails_writer = fails;
        self
    }

    /// Make `start_writing` fail.
    pub fn with_refused_start(mut self) -> Self {
        self.behavior.refuse_start = true;
        self
    }

    /// Force the status returned by `finish_writing`.
    pub fn finishing_with(mut self, status: WriterStatus) -> Self {
        self.behavior.finish_status = Some(status);
        self
    }

    /// Snapshot of the shared record.
    pub fn record(&self) -> WriterRecord {
        lock(&self.record).clone()
    }
}

impl WriterFactory for InMemoryWriterFactory {
    fn create_writer(
        &self,
        path: &Path,
        opts: WriterOptions,
    ) -> TranscodeResult<Box<dyn AssetWriter>> {
        if path.is_dir() {
            return Err(TranscodeError::writer(format!(
                "output path '{}' is a directory",
                path.display()
            )));
        }
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.is_dir()
        {
            return Err(TranscodeError::writer(format!(
                "output directory '{}' does not exist",
                parent.display()
            )));
        }

        let mut record = lock(&self.record);
        let writers_created = record.writers_created + 1;
        *record = WriterRecord {
            writers_created,
            path: Some(path.to_path_buf()),
            options: Some(opts),
            ..WriterRecord::default()
        };
        drop(record);

        Ok(Box::new(InMemoryWriter {
            record: Arc::clone(&self.record),
            behavior: self.behavior.clone(),
        }))
    }
}

struct InMemoryWriter {
    record: Arc<Mutex<WriterRecord>>,
    behavior: WriterBehavior,
}

impl AssetWriter for InMemoryWriter {
    fn add_input(&mut self, settings: InputSettings) -> TranscodeResult<Box<dyn TrackInput>> {
        let kind = settings.kind();
        let mut record = lock(&self.record);
        if record.status != WriterStatus::Unknown {
            return Err(TranscodeError::writer(
                "inputs must be added before writing starts",
            ));
        }
        record.registrations.push(settings);
        drop(record);

        let refuse_after = self
            .behavior
            .refuse_after
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, n)| *n);
        Ok(Box::new(InMemoryTrackInput {
            kind,
            record: Arc::clone(&self.record),
            refuse_after,
            demand_batch: self.behavior.demand_batch,
            since_demand: 0,
            accepted: 0,
            finished: false,
        }))
    }

    fn start_writing(&mut self) -> TranscodeResult<()> {
        if self.behavior.refuse_start {
            let mut record = lock(&self.record);
            record.status = WriterStatus::Failed;
            record.error = Some("writer refused to start".to_string());
            return Err(TranscodeError::writer("writer refused to start"));
        }
        lock(&self.record).status = WriterStatus::Writing;
        Ok(())
    }

    fn start_session_at(&mut self, start: MediaTime) {
        lock(&self.record).session_start = Some(start);
    }

    fn finish_writing(&mut self) -> WriterStatus {
        let mut record = lock(&self.record);
        if record.status != WriterStatus::Writing {
            return record.status;
        }
        let status = if let Some(forced) = self.behavior.finish_status {
            forced
        } else if self.behavior.refusal_fails_writer && !record.refused.is_empty() {
            record.error = Some(format!(
                "{} sample(s) were refused by the writer",
                record.refused.len()
            ));
            WriterStatus::Failed
        } else {
            WriterStatus::Completed
        };
        record.status = status;
        status
    }

    fn cancel_writing(&mut self) {
        lock(&self.record).status = WriterStatus::Cancelled;
    }

    fn status(&self) -> WriterStatus {
        lock(&self.record).status
    }

    fn error(&self) -> Option<String> {
        lock(&self.record).error.clone()
    }
}

struct InMemoryTrackInput {
    kind: MediaKind,
    record: Arc<Mutex<WriterRecord>>,
    refuse_after: Option<usize>,
    demand_batch: Option<usize>,
    since_demand: usize,
    accepted: usize,
    finished: bool,
}

impl TrackInput for InMemoryTrackInput {
    fn request_media_data(&mut self) -> Demand {
        let mut record = lock(&self.record);
        record.demand_requests += 1;
        if self.finished || record.status != WriterStatus::Writing {
            return Demand::Closed;
        }
        self.since_demand = 0;
        Demand::Ready
    }

    fn is_ready_for_more_media_data(&self) -> bool {
        if self.finished || lock(&self.record).status != WriterStatus::Writing {
            return false;
        }
        self.demand_batch.is_none_or(|b| self.since_demand < b)
    }

    fn append(&mut self, sample: SampleBuffer) -> TranscodeResult<()> {
        if self.finished {
            return Err(TranscodeError::writer(format!(
                "{} input is already finished",
                self.kind
            )));
        }
        let mut record = lock(&self.record);
        if record.status != WriterStatus::Writing {
            return Err(TranscodeError::writer("writer is not accepting samples"));
        }
        if self.refuse_after.is_some_and(|n| self.accepted >= n) {
            record.refused.push(self.kind);
            return Err(TranscodeError::writer(format!(
                "{} input refused sample at {:.3}s",
                self.kind,
                sample.pts.as_secs_f64()
            )));
        }
        match self.kind {
            MediaKind::Video => record.video_pts.push(sample.pts),
            MediaKind::Audio => record.audio_pts.push(sample.pts),
        }
        self.accepted += 1;
        self.since_demand += 1;
        Ok(())
    }

    fn mark_as_finished(&mut self) {
        if !self.finished {
            self.finished = true;
            lock(&self.record).finished.push(self.kind);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/media/memory.rs"]
mod tests;
