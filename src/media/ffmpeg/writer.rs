use std::ffi::OsString;
use std::fs::File;
use std::io::{BufWriter, Write as _};
use std::path::{Path, PathBuf};
use std::process::{ChildStdin, Command, Stdio};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::encode::settings::{
    AudioEncodeConfig, ColorPrimaries, InputSettings, TransferFunction, VideoEncodeConfig,
    WriterOptions, YCbCrMatrix,
};
use crate::foundation::core::MediaTime;
use crate::foundation::error::{TranscodeError, TranscodeResult};
use crate::media::asset::MediaKind;
use crate::media::ffmpeg::{FfmpegChild, temp_path};
use crate::media::sample::SampleBuffer;
use crate::media::writer::{AssetWriter, Demand, TrackInput, WriterFactory, WriterStatus};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|p| p.into_inner())
}

fn primaries_name(p: ColorPrimaries) -> &'static str {
    match p {
        ColorPrimaries::SmpteC => "smpte170m",
        ColorPrimaries::ItuR709 => "bt709",
    }
}

fn transfer_name(t: TransferFunction) -> &'static str {
    match t {
        TransferFunction::ItuR709 => "bt709",
    }
}

fn matrix_name(m: YCbCrMatrix) -> &'static str {
    match m {
        YCbCrMatrix::ItuR601 => "smpte170m",
        YCbCrMatrix::ItuR709 => "bt709",
    }
}

/// Arguments encoding raw BGRA frames from stdin into a video-only H.264 file.
pub fn encode_video_args(cfg: &VideoEncodeConfig, out: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "-y",
        "-v",
        "error",
        "-f",
        "rawvideo",
        "-pix_fmt",
        "bgra",
        "-s",
    ]
    .map(OsString::from)
    .into();
    args.push(format!("{}x{}", cfg.width, cfg.height).into());
    args.push("-r".into());
    args.push(cfg.expected_frame_rate.max(1).to_string().into());
    args.extend(["-i", "pipe:0", "-an", "-c:v", "libx264", "-b:v"].map(OsString::from));
    args.push(cfg.average_bitrate.to_string().into());
    args.push("-g".into());
    args.push(cfg.max_key_frame_interval.max(1).to_string().into());
    if !cfg.allow_frame_reordering {
        args.extend(["-bf", "0"].map(OsString::from));
    }
    if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
        // yuv420p needs even sides; pad the odd edge by one pixel.
        args.extend(["-vf", "pad=ceil(iw/2)*2:ceil(ih/2)*2"].map(OsString::from));
    }
    args.extend(
        [
            "-pix_fmt",
            "yuv420p",
            "-color_primaries",
            primaries_name(cfg.color.primaries),
            "-color_trc",
            transfer_name(cfg.color.transfer),
            "-colorspace",
            matrix_name(cfg.color.matrix),
            "-f",
            "mp4",
        ]
        .map(OsString::from),
    );
    args.push(out.into());
    args
}

/// Inputs of the final mux.
#[derive(Clone, Debug, PartialEq)]
pub struct MuxPlan {
    /// Video-only intermediate file.
    pub video: PathBuf,
    /// Raw `f32le` audio and its encoder settings, when audio was written.
    pub audio: Option<(PathBuf, AudioEncodeConfig)>,
    /// Registration order of the inputs; the output track order.
    pub order: Vec<MediaKind>,
    /// Destination options.
    pub options: WriterOptions,
    /// Destination file.
    pub out: PathBuf,
}

/// Arguments muxing the intermediates into the destination container.
///
/// Inputs and maps follow the registration order, so the output track order matches it.
pub fn mux_args(plan: &MuxPlan) -> Vec<OsString> {
    let order: Vec<MediaKind> = plan
        .order
        .iter()
        .copied()
        .filter(|k| *k == MediaKind::Video || plan.audio.is_some())
        .collect();

    let mut args: Vec<OsString> = ["-y", "-v", "error"].map(OsString::from).into();
    for kind in &order {
        match (kind, &plan.audio) {
            (MediaKind::Audio, Some((path, cfg))) => {
                args.extend(["-f", "f32le", "-ar"].map(OsString::from));
                args.push(cfg.sample_rate.to_string().into());
                args.push("-ac".into());
                args.push(cfg.channels.to_string().into());
                args.push("-i".into());
                args.push(path.clone().into());
            }
            _ => {
                args.push("-i".into());
                args.push(plan.video.clone().into());
            }
        }
    }
    for (idx, kind) in order.iter().enumerate() {
        let stream = match kind {
            MediaKind::Video => "v",
            MediaKind::Audio => "a",
        };
        args.push("-map".into());
        args.push(format!("{idx}:{stream}:0").into());
    }

    args.extend(["-c:v", "copy"].map(OsString::from));
    if let Some((_, cfg)) = &plan.audio {
        args.extend(["-c:a", "aac", "-b:a"].map(OsString::from));
        args.push(cfg.bitrate.to_string().into());
        args.push("-ar".into());
        args.push(cfg.sample_rate.to_string().into());
        args.push("-ac".into());
        args.push(cfg.channels.to_string().into());
    }
    if plan.options.optimize_for_network {
        args.extend(["-movflags", "+faststart"].map(OsString::from));
    }
    args.push("-f".into());
    args.push(plan.options.file_type.muxer_name().into());
    args.push(plan.out.clone().into());
    args
}

/// Creates [`AssetWriter`]s that encode with `ffmpeg`.
#[derive(Clone, Copy, Debug, Default)]
pub struct FfmpegWriterFactory;

impl FfmpegWriterFactory {
    /// New factory.
    pub fn new() -> Self {
        Self
    }
}

impl WriterFactory for FfmpegWriterFactory {
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
        Ok(Box::new(FfmpegWriter::new(path.to_path_buf(), opts)))
    }
}

struct WriterShared {
    status: Mutex<WriterStatus>,
    error: Mutex<Option<String>>,
}

impl Default for WriterShared {
    fn default() -> Self {
        Self {
            status: Mutex::new(WriterStatus::Unknown),
            error: Mutex::new(None),
        }
    }
}

impl WriterShared {
    fn status(&self) -> WriterStatus {
        *lock(&self.status)
    }

    // Keeps the first error; the status is left to the caller.
    fn record(&self, msg: String) {
        let mut error = lock(&self.error);
        if error.is_none() {
            *error = Some(msg);
        }
    }

    fn has_error(&self) -> bool {
        lock(&self.error).is_some()
    }

    fn fail(&self, msg: String) {
        tracing::error!(error = %msg, "ffmpeg writer failed");
        self.record(msg);
        *lock(&self.status) = WriterStatus::Failed;
    }
}

#[derive(Default)]
struct VideoSink {
    child: Option<FfmpegChild>,
    stdin: Option<ChildStdin>,
    frame_len: usize,
}

#[derive(Default)]
struct AudioSink {
    file: Option<BufWriter<File>>,
    bytes: u64,
}

/// Writer encoding video through a streaming `ffmpeg` child and muxing at finalization.
struct FfmpegWriter {
    out: PathBuf,
    options: WriterOptions,
    shared: Arc<WriterShared>,
    order: Vec<MediaKind>,
    video: Option<(VideoEncodeConfig, Arc<Mutex<VideoSink>>)>,
    audio: Option<(AudioEncodeConfig, Arc<Mutex<AudioSink>>)>,
    video_tmp: PathBuf,
    audio_tmp: PathBuf,
}

impl FfmpegWriter {
    fn new(out: PathBuf, options: WriterOptions) -> Self {
        Self {
            out,
            options,
            shared: Arc::new(WriterShared::default()),
            order: Vec::new(),
            video: None,
            audio: None,
            video_tmp: temp_path("video", "mp4"),
            audio_tmp: temp_path("audio", "f32le"),
        }
    }

    fn remove_temporaries(&self) {
        for p in [&self.video_tmp, &self.audio_tmp] {
            if p.exists() {
                let _ = std::fs::remove_file(p);
            }
        }
    }

    fn kill_video(&self) {
        if let Some((_, sink)) = &self.video {
            let mut sink = lock(sink);
            drop(sink.stdin.take());
            if let Some(child) = sink.child.take() {
                child.kill();
            }
        }
    }

    fn finalize(&mut self) -> anyhow::Result<()> {
        use anyhow::Context as _;

        let (_, video) = self
            .video
            .as_ref()
            .context("no video input was registered")?;
        let child = {
            let mut sink = lock(video);
            drop(sink.stdin.take());
            sink.child.take()
        };
        child
            .context("video encoder is not running")?
            .wait()
            .context("video encode failed")?;

        let audio = match &self.audio {
            Some((cfg, sink)) => {
                let mut sink = lock(sink);
                if let Some(mut file) = sink.file.take() {
                    file.flush().context("failed to flush audio scratch file")?;
                }
                (sink.bytes > 0).then(|| (self.audio_tmp.clone(), cfg.clone()))
            }
            None => None,
        };

        let plan = MuxPlan {
            video: self.video_tmp.clone(),
            audio,
            order: self.order.clone(),
            options: self.options,
            out: self.out.clone(),
        };
        let mut cmd = Command::new("ffmpeg");
        cmd.args(mux_args(&plan))
            .stdin(Stdio::null())
            .stdout(Stdio::null());
        FfmpegChild::spawn(&mut cmd)?.wait().context("mux failed")?;
        Ok(())
    }
}

impl AssetWriter for FfmpegWriter {
    fn add_input(&mut self, settings: InputSettings) -> TranscodeResult<Box<dyn TrackInput>> {
        if self.shared.status() != WriterStatus::Unknown {
            return Err(TranscodeError::writer(
                "inputs must be added before writing starts",
            ));
        }
        let kind = settings.kind();
        let input = match settings {
            InputSettings::Video(cfg) => {
                if self.video.is_some() {
                    return Err(TranscodeError::writer("only one video input is supported"));
                }
                cfg.validate()?;
                let sink = Arc::new(Mutex::new(VideoSink {
                    frame_len: usize::try_from(cfg.size().area())
                        .map_err(|_| TranscodeError::writer("video size is too large"))?
                        * 4,
                    ..VideoSink::default()
                }));
                self.video = Some((cfg, Arc::clone(&sink)));
                FfmpegTrackInput {
                    shared: Arc::clone(&self.shared),
                    sink: InputSink::Video(sink),
                    finished: false,
                }
            }
            InputSettings::Audio(cfg) => {
                if self.audio.is_some() {
                    return Err(TranscodeError::writer("only one audio input is supported"));
                }
                let sink = Arc::new(Mutex::new(AudioSink::default()));
                self.audio = Some((cfg, Arc::clone(&sink)));
                FfmpegTrackInput {
                    shared: Arc::clone(&self.shared),
                    sink: InputSink::Audio(sink),
                    finished: false,
                }
            }
        };
        self.order.push(kind);
        Ok(Box::new(input))
    }

    fn start_writing(&mut self) -> TranscodeResult<()> {
        let start = || -> anyhow::Result<()> {
            use anyhow::Context as _;
            let (cfg, sink) = self
                .video
                .as_ref()
                .context("a video input must be registered before writing starts")?;
            let mut cmd = Command::new("ffmpeg");
            cmd.args(encode_video_args(cfg, &self.video_tmp))
                .stdin(Stdio::piped())
                .stdout(Stdio::null());
            let mut child = FfmpegChild::spawn(&mut cmd)?;
            let stdin = child
                .take_stdin()
                .context("failed to open ffmpeg stdin")?;
            let mut sink = lock(sink);
            sink.child = Some(child);
            sink.stdin = Some(stdin);
            drop(sink);

            if let Some((_, sink)) = &self.audio {
                let file = File::create(&self.audio_tmp).with_context(|| {
                    format!("failed to create '{}'", self.audio_tmp.display())
                })?;
                lock(sink).file = Some(BufWriter::new(file));
            }
            Ok(())
        };

        if let Err(e) = start() {
            let msg = format!("{e:#}");
            self.shared.fail(msg.clone());
            self.kill_video();
            self.remove_temporaries();
            return Err(TranscodeError::writer(msg));
        }
        *lock(&self.shared.status) = WriterStatus::Writing;
        tracing::debug!(out = %self.out.display(), "ffmpeg writer started");
        Ok(())
    }

    fn start_session_at(&mut self, start: MediaTime) {
        // The encoder stamps frames by count at the configured rate; sample pts are not forwarded.
        tracing::debug!(start = start.as_secs_f64(), "writer session start");
    }

    fn finish_writing(&mut self) -> WriterStatus {
        let status = self.shared.status();
        if status != WriterStatus::Writing {
            self.kill_video();
            self.remove_temporaries();
            return status;
        }
        if self.shared.has_error() {
            // An input refused a sample; the output would be incomplete.
            tracing::error!(error = ?self.error(), "ffmpeg writer failed");
            *lock(&self.shared.status) = WriterStatus::Failed;
            self.kill_video();
            if let Some((_, sink)) = &self.audio {
                lock(sink).file = None;
            }
            self.remove_temporaries();
            return WriterStatus::Failed;
        }

        match self.finalize() {
            Ok(()) => *lock(&self.shared.status) = WriterStatus::Completed,
            Err(e) => {
                self.shared.fail(format!("{e:#}"));
                let _ = std::fs::remove_file(&self.out);
            }
        }
        self.remove_temporaries();
        self.shared.status()
    }

    fn cancel_writing(&mut self) {
        let status = self.shared.status();
        if matches!(status, WriterStatus::Completed | WriterStatus::Cancelled) {
            return;
        }
        *lock(&self.shared.status) = WriterStatus::Cancelled;
        self.kill_video();
        if let Some((_, sink)) = &self.audio {
            lock(sink).file = None;
        }
        self.remove_temporaries();
        if self.out.is_file() {
            let _ = std::fs::remove_file(&self.out);
        }
    }

    fn status(&self) -> WriterStatus {
        self.shared.status()
    }

    fn error(&self) -> Option<String> {
        lock(&self.shared.error).clone()
    }
}

impl Drop for FfmpegWriter {
    fn drop(&mut self) {
        if self.shared.status() == WriterStatus::Writing {
            self.cancel_writing();
        } else {
            self.kill_video();
            self.remove_temporaries();
        }
    }
}

enum InputSink {
    Video(Arc<Mutex<VideoSink>>),
    Audio(Arc<Mutex<AudioSink>>),
}

struct FfmpegTrackInput {
    shared: Arc<WriterShared>,
    sink: InputSink,
    finished: bool,
}

impl FfmpegTrackInput {
    fn kind(&self) -> MediaKind {
        match self.sink {
            InputSink::Video(_) => MediaKind::Video,
            InputSink::Audio(_) => MediaKind::Audio,
        }
    }
}

impl TrackInput for FfmpegTrackInput {
    // Pipe writes block while the encoder is behind, so demand is answered immediately and
    // backpressure is applied inside `append`.
    fn request_media_data(&mut self) -> Demand {
        if self.is_ready_for_more_media_data() {
            Demand::Ready
        } else {
            Demand::Closed
        }
    }

    fn is_ready_for_more_media_data(&self) -> bool {
        !self.finished && self.shared.status() == WriterStatus::Writing
    }

    fn append(&mut self, sample: SampleBuffer) -> TranscodeResult<()> {
        if !self.is_ready_for_more_media_data() {
            return Err(TranscodeError::writer(format!(
                "{} input is not accepting samples",
                self.kind()
            )));
        }
        let result = match &self.sink {
            InputSink::Video(sink) => {
                let mut sink = lock(sink);
                if sample.data.len() != sink.frame_len {
                    Err(format!(
                        "video frame is {} bytes, expected {}",
                        sample.data.len(),
                        sink.frame_len
                    ))
                } else if let Some(stdin) = sink.stdin.as_mut() {
                    stdin
                        .write_all(&sample.data)
                        .map_err(|e| format!("failed to write frame to ffmpeg stdin: {e}"))
                } else {
                    Err("video encoder is not running".to_string())
                }
            }
            InputSink::Audio(sink) => {
                let mut sink = lock(sink);
                let written = match sink.file.as_mut() {
                    Some(file) => file
                        .write_all(&sample.data)
                        .map_err(|e| format!("failed to write audio scratch file: {e}")),
                    None => Err("audio scratch file is not open".to_string()),
                };
                if written.is_ok() {
                    sink.bytes += sample.data.len() as u64;
                }
                written
            }
        };

        // Only this input stops; the writer fails once it is finished.
        result.map_err(|msg| {
            tracing::warn!(kind = %self.kind(), error = %msg, "ffmpeg input refused sample");
            self.shared.record(msg.clone());
            self.mark_as_finished();
            TranscodeError::writer(msg)
        })
    }

    fn mark_as_finished(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        if let InputSink::Video(sink) = &self.sink {
            // Closing stdin lets the encoder flush while the other track finishes.
            drop(lock(sink).stdin.take());
        }
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/media/ffmpeg/writer.rs"]
mod tests;
