use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::foundation::core::{MediaTime, Size, TimeRange};
use crate::foundation::error::{TranscodeError, TranscodeResult};
use crate::geometry::transform::QuarterTurn;
use crate::media::asset::{MediaKind, TrackId, TrackInfo};
use crate::media::ffmpeg::probe::find_track;
use crate::media::ffmpeg::{FfmpegChild, read_chunk, secs_arg};
use crate::media::reader::{
    AssetReader, AudioDecodeSettings, PixelFormat, TrackOutput, VideoComposition,
    VideoOutputSettings,
};
use crate::media::sample::SampleBuffer;

/// Interleaved audio frames per emitted sample buffer.
const AUDIO_FRAMES_PER_CHUNK: usize = 1024;
/// Timescale of emitted video timestamps.
const VIDEO_TIMESCALE: u32 = 90_000;

/// `-vf` filter chain that renders a stored frame through `composition`.
///
/// The layer transform's rotation becomes `transpose`/flip filters; the scale and placement
/// collapse into one `scale` to the render size since the rotated picture always fills it.
pub fn video_filter_chain(
    composition: &VideoComposition,
    pixel_format: PixelFormat,
) -> TranscodeResult<String> {
    let turn = QuarterTurn::of(composition.layer_transform()).ok_or_else(|| {
        TranscodeError::reader("layer transform is not an axis-aligned quarter turn")
    })?;

    let mut filters = Vec::with_capacity(5);
    match turn {
        QuarterTurn::None => {}
        QuarterTurn::Clockwise => filters.push("transpose=clock".to_string()),
        QuarterTurn::CounterClockwise => filters.push("transpose=cclock".to_string()),
        QuarterTurn::Half => filters.push("hflip,vflip".to_string()),
    }
    let Size { width, height } = composition.render_size;
    filters.push(format!("scale={width}:{height}"));
    let fps = composition.frame_duration;
    filters.push(format!("fps={}/{}", fps.timescale, fps.value.max(1)));
    filters.push(format!("format={}", pix_fmt_name(pixel_format)));
    Ok(filters.join(","))
}

fn pix_fmt_name(format: PixelFormat) -> &'static str {
    match format {
        PixelFormat::Bgra32 => "bgra",
        PixelFormat::Rgba32 => "rgba",
    }
}

fn range_args(range: TimeRange) -> (Vec<OsString>, Vec<OsString>) {
    let mut before_input = Vec::new();
    let mut after_input = Vec::new();
    if range.start.value > 0 {
        before_input.push("-ss".into());
        before_input.push(secs_arg(range.start.as_secs_f64()).into());
    }
    if let Some(d) = range.duration {
        after_input.push("-t".into());
        after_input.push(secs_arg(d.as_secs_f64()).into());
    }
    (before_input, after_input)
}

/// Arguments decoding one stream of `source` to raw data on stdout.
pub(crate) fn decode_args(
    source: &std::path::Path,
    stream: TrackId,
    range: TimeRange,
    output: &OutputPlan,
) -> Vec<OsString> {
    let (before, after) = range_args(range);
    let mut args: Vec<OsString> = vec!["-v".into(), "error".into(), "-noautorotate".into()];
    args.extend(before);
    args.push("-i".into());
    args.push(source.into());
    args.extend(after);
    args.push("-map".into());
    args.push(format!("0:{}", stream.0).into());
    match output {
        OutputPlan::Video { filter, format, .. } => {
            args.extend(["-an", "-vf"].map(OsString::from));
            args.push(filter.into());
            args.extend(["-f", "rawvideo", "-pix_fmt"].map(OsString::from));
            args.push(pix_fmt_name(*format).into());
        }
        OutputPlan::Audio { settings } => {
            args.extend(["-vn", "-f", "f32le", "-acodec", "pcm_f32le", "-ac"].map(OsString::from));
            args.push(settings.channels.to_string().into());
            args.push("-ar".into());
            args.push(settings.sample_rate.to_string().into());
        }
    }
    args.push("pipe:1".into());
    args
}

/// How one attached output is decoded.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum OutputPlan {
    Video {
        filter: String,
        format: PixelFormat,
        frame_len: usize,
        frame_rate: f64,
    },
    Audio {
        settings: AudioDecodeSettings,
    },
}

impl OutputPlan {
    fn chunk_len(&self) -> usize {
        match self {
            Self::Video { frame_len, .. } => *frame_len,
            Self::Audio { settings } => {
                AUDIO_FRAMES_PER_CHUNK * usize::from(settings.channels.max(1)) * 4
            }
        }
    }
}

#[derive(Default)]
struct StreamSlot {
    child: Mutex<Option<FfmpegChild>>,
    stdout: Mutex<Option<ChildStdout>>,
    start: Mutex<Option<MediaTime>>,
    started: AtomicBool,
    cancelled: AtomicBool,
}

/// Reader spawning one `ffmpeg` decode process per attached output.
pub struct FfmpegReader {
    source: PathBuf,
    tracks: Vec<TrackInfo>,
    range: TimeRange,
    outputs: Vec<(TrackId, OutputPlan, Arc<StreamSlot>)>,
    reading: bool,
}

impl FfmpegReader {
    pub(crate) fn new(source: PathBuf, tracks: Vec<TrackInfo>) -> Self {
        Self {
            source,
            tracks,
            range: TimeRange::full(),
            outputs: Vec::new(),
            reading: false,
        }
    }

    fn attach(
        &mut self,
        track: TrackId,
        kind: MediaKind,
        plan: OutputPlan,
    ) -> TranscodeResult<Box<dyn TrackOutput>> {
        let info = find_track(&self.tracks, track)
            .ok_or_else(|| TranscodeError::reader(format!("stream {} does not exist", track.0)))?;
        if info.kind != kind {
            return Err(TranscodeError::reader(format!(
                "stream {} is not a {kind} stream",
                track.0
            )));
        }
        if self.reading {
            return Err(TranscodeError::reader(
                "outputs must be attached before reading starts",
            ));
        }

        let slot = Arc::new(StreamSlot::default());
        let (units_per_chunk, rate) = match &plan {
            OutputPlan::Video { frame_rate, .. } => (1, *frame_rate),
            OutputPlan::Audio { settings } => {
                (AUDIO_FRAMES_PER_CHUNK as u64, f64::from(settings.sample_rate))
            }
        };
        let output = FfmpegTrackOutput {
            kind,
            slot: Arc::clone(&slot),
            chunk_len: plan.chunk_len(),
            start: MediaTime::ZERO,
            rate,
            units_per_chunk,
            emitted_units: 0,
            timescale: match &plan {
                OutputPlan::Video { .. } => VIDEO_TIMESCALE,
                OutputPlan::Audio { settings } => settings.sample_rate.max(1),
            },
        };
        self.outputs.push((track, plan, slot));
        Ok(Box::new(output))
    }
}

impl AssetReader for FfmpegReader {
    fn set_time_range(&mut self, range: TimeRange) {
        self.range = range;
    }

    fn add_video_output(
        &mut self,
        track: TrackId,
        settings: VideoOutputSettings,
        composition: VideoComposition,
    ) -> TranscodeResult<Box<dyn TrackOutput>> {
        let filter = video_filter_chain(&composition, settings.pixel_format)?;
        let frame_len = usize::try_from(composition.render_size.area())
            .map_err(|_| TranscodeError::reader("render size is too large"))?
            * settings.pixel_format.bytes_per_pixel();
        let plan = OutputPlan::Video {
            filter,
            format: settings.pixel_format,
            frame_len,
            frame_rate: composition.frame_rate(),
        };
        self.attach(track, MediaKind::Video, plan)
    }

    fn add_audio_output(
        &mut self,
        track: TrackId,
        settings: AudioDecodeSettings,
    ) -> TranscodeResult<Box<dyn TrackOutput>> {
        self.attach(track, MediaKind::Audio, OutputPlan::Audio { settings })
    }

    fn start_reading(&mut self) -> TranscodeResult<()> {
        self.reading = true;
        for (track, plan, slot) in &self.outputs {
            let mut cmd = Command::new("ffmpeg");
            cmd.args(decode_args(&self.source, *track, self.range, plan))
                .stdin(Stdio::null())
                .stdout(Stdio::piped());
            let mut child = FfmpegChild::spawn(&mut cmd)
                .map_err(|e| TranscodeError::reader(format!("{e:#}")))?;
            let stdout = child
                .take_stdout()
                .ok_or_else(|| TranscodeError::reader("failed to open ffmpeg stdout"))?;
            *slot.start.lock().unwrap_or_else(|p| p.into_inner()) = Some(self.range.start);
            *slot.stdout.lock().unwrap_or_else(|p| p.into_inner()) = Some(stdout);
            *slot.child.lock().unwrap_or_else(|p| p.into_inner()) = Some(child);
            slot.started.store(true, Ordering::Release);
            tracing::debug!(stream = track.0, "decode process started");
        }
        Ok(())
    }

    fn cancel_reading(&mut self) {
        for (_, _, slot) in &self.outputs {
            slot.cancelled.store(true, Ordering::Release);
            if let Some(child) = slot.child.lock().unwrap_or_else(|p| p.into_inner()).take() {
                child.kill();
            }
        }
    }
}

impl Drop for FfmpegReader {
    fn drop(&mut self) {
        self.cancel_reading();
    }
}

struct FfmpegTrackOutput {
    kind: MediaKind,
    slot: Arc<StreamSlot>,
    chunk_len: usize,
    start: MediaTime,
    rate: f64,
    units_per_chunk: u64,
    emitted_units: u64,
    timescale: u32,
}

impl FfmpegTrackOutput {
    fn pts_of(&self, units: u64) -> MediaTime {
        let offset = if self.rate > 0.0 {
            units as f64 / self.rate
        } else {
            0.0
        };
        MediaTime::from_secs_f64(self.start.as_secs_f64() + offset, self.timescale)
    }

    // End of stream is only clean if the decode process exited successfully.
    fn reap(&self) -> TranscodeResult<()> {
        let child = self
            .slot
            .child
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take();
        let Some(child) = child else {
            return Ok(());
        };
        if self.slot.cancelled.load(Ordering::Acquire) {
            child.kill();
            return Ok(());
        }
        child.wait().map_err(|e| {
            TranscodeError::reader(format!("decoding {} failed: {e:#}", self.kind))
        })
    }
}

impl TrackOutput for FfmpegTrackOutput {
    fn copy_next_sample(&mut self) -> TranscodeResult<Option<SampleBuffer>> {
        if self.slot.cancelled.load(Ordering::Acquire) {
            return Ok(None);
        }
        if !self.slot.started.load(Ordering::Acquire) {
            return Err(TranscodeError::reader("reader has not started"));
        }

        if let Some(start) = *self.slot.start.lock().unwrap_or_else(|p| p.into_inner()) {
            self.start = start;
        }
        let mut guard = self.slot.stdout.lock().unwrap_or_else(|p| p.into_inner());
        let Some(stdout) = guard.as_mut() else {
            return Ok(None);
        };

        let mut data = vec![0u8; self.chunk_len];
        let n = read_chunk(stdout, &mut data).map_err(|e| {
            TranscodeError::reader(format!("failed to read decoded {}: {e}", self.kind))
        })?;

        let units = match self.kind {
            // A truncated trailing frame is dropped.
            MediaKind::Video if n < self.chunk_len => 0,
            MediaKind::Video => 1,
            MediaKind::Audio => {
                let frame_bytes = (self.chunk_len as u64 / self.units_per_chunk.max(1)).max(1);
                n as u64 / frame_bytes
            }
        };
        if units == 0 {
            *guard = None;
            drop(guard);
            self.reap()?;
            return Ok(None);
        }
        drop(guard);

        if self.kind == MediaKind::Audio {
            let frame_bytes = self.chunk_len / self.units_per_chunk.max(1) as usize;
            data.truncate(units as usize * frame_bytes);
        }

        let pts = self.pts_of(self.emitted_units);
        self.emitted_units += units;
        let end = self.pts_of(self.emitted_units);
        Ok(Some(SampleBuffer::new(
            self.kind,
            pts,
            end.saturating_sub(pts),
            data,
        )))
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/media/ffmpeg/reader.rs"]
mod tests;
