use crate::foundation::core::{Affine, MediaTime, Size, TimeRange};
use crate::foundation::error::TranscodeResult;
use crate::media::asset::TrackId;
use crate::media::sample::SampleBuffer;

/// Pixel layout of decoded video samples.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8-bit BGRA, 4 bytes per pixel.
    #[default]
    Bgra32,
    /// 8-bit RGBA, 4 bytes per pixel.
    Rgba32,
}

impl PixelFormat {
    /// Bytes per pixel.
    pub fn bytes_per_pixel(self) -> usize {
        4
    }
}

/// Decoded-pixel passthrough settings for a video output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VideoOutputSettings {
    /// Requested pixel layout.
    pub pixel_format: PixelFormat,
}

/// A single rendering step: which slice of time to render, and how to place the source layer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderInstruction {
    /// Time span covered by this instruction.
    pub time_range: TimeRange,
    /// Transform applied to the source video layer.
    pub layer_transform: Affine,
}

/// Render description bound to a video output.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoComposition {
    /// Output frame size.
    pub render_size: Size,
    /// Duration of one output frame.
    pub frame_duration: MediaTime,
    /// Rendering instructions; exports use exactly one spanning the whole requested range.
    pub instructions: Vec<RenderInstruction>,
}

impl VideoComposition {
    /// Composition with a single instruction covering `time_range`.
    pub fn single(
        render_size: Size,
        frame_rate: u32,
        time_range: TimeRange,
        layer_transform: Affine,
    ) -> Self {
        Self {
            render_size,
            frame_duration: MediaTime {
                value: 1,
                timescale: frame_rate.max(1),
            },
            instructions: vec![RenderInstruction {
                time_range,
                layer_transform,
            }],
        }
    }

    /// Layer transform of the first instruction, identity when there is none.
    pub fn layer_transform(&self) -> Affine {
        self.instructions
            .first()
            .map(|i| i.layer_transform)
            .unwrap_or(Affine::IDENTITY)
    }

    /// Output frame rate derived from the frame duration.
    pub fn frame_rate(&self) -> f64 {
        let secs = self.frame_duration.as_secs_f64();
        if secs > 0.0 { 1.0 / secs } else { 0.0 }
    }
}

/// Linear PCM decode settings for an audio output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AudioDecodeSettings {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
}

impl Default for AudioDecodeSettings {
    fn default() -> Self {
        Self {
            sample_rate: crate::encode::settings::AUDIO_SAMPLE_RATE,
            channels: crate::encode::settings::AUDIO_CHANNELS,
        }
    }
}

/// Pullable sequence of decoded samples for one track.
pub trait TrackOutput: Send {
    /// Return the next sample, or `None` once the track is exhausted or the reader stopped.
    fn copy_next_sample(&mut self) -> TranscodeResult<Option<SampleBuffer>>;
}

/// Source-side reader over one asset.
///
/// Outputs are attached before [`AssetReader::start_reading`]; they stay usable from other
/// threads after the reader starts, and yield `None` once the reader is cancelled.
pub trait AssetReader: Send {
    /// Restrict reading to `range`. Must be called before starting.
    fn set_time_range(&mut self, range: TimeRange);

    /// Attach a decoded video output for `track` rendered through `composition`.
    fn add_video_output(
        &mut self,
        track: TrackId,
        settings: VideoOutputSettings,
        composition: VideoComposition,
    ) -> TranscodeResult<Box<dyn TrackOutput>>;

    /// Attach a decoded audio output for `track`.
    fn add_audio_output(
        &mut self,
        track: TrackId,
        settings: AudioDecodeSettings,
    ) -> TranscodeResult<Box<dyn TrackOutput>>;

    /// Start decoding.
    fn start_reading(&mut self) -> TranscodeResult<()>;

    /// Stop any further decode work. Idempotent.
    fn cancel_reading(&mut self);
}
