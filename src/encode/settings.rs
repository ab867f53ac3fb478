use crate::foundation::core::Size;
use crate::foundation::error::{TranscodeError, TranscodeResult};

/// Default output frame rate.
pub const DEFAULT_FRAME_RATE: u32 = 30;
/// Audio output sample rate in Hz.
pub const AUDIO_SAMPLE_RATE: u32 = 44_100;
/// Audio output channel count.
pub const AUDIO_CHANNELS: u16 = 2;
/// Audio output bitrate in bits per second.
pub const AUDIO_BITRATE: u32 = 128_000;

/// Output video codec.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoCodec {
    /// H.264 / AVC.
    #[default]
    H264,
}

/// Color primaries tag written into the encoded stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorPrimaries {
    /// SMPTE-C (SMPTE 170M) primaries.
    SmpteC,
    /// ITU-R BT.709 primaries.
    ItuR709,
}

/// Transfer function tag written into the encoded stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferFunction {
    /// ITU-R BT.709 transfer function.
    ItuR709,
}

/// YCbCr matrix tag written into the encoded stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YCbCrMatrix {
    /// ITU-R BT.601 matrix.
    ItuR601,
    /// ITU-R BT.709 matrix.
    ItuR709,
}

/// Color primaries / transfer / matrix triple.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ColorProperties {
    /// Primaries.
    pub primaries: ColorPrimaries,
    /// Transfer function.
    pub transfer: TransferFunction,
    /// YCbCr matrix.
    pub matrix: YCbCrMatrix,
}

impl ColorProperties {
    /// Standard-definition compatible triple used for every export.
    pub const STANDARD_DEFINITION: Self = Self {
        primaries: ColorPrimaries::SmpteC,
        transfer: TransferFunction::ItuR709,
        matrix: YCbCrMatrix::ItuR601,
    };
}

/// Video encoder settings for one export.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VideoEncodeConfig {
    /// Target codec.
    pub codec: VideoCodec,
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Color tags.
    pub color: ColorProperties,
    /// Average bitrate in bits per second.
    pub average_bitrate: u64,
    /// Maximum distance between key frames, in frames.
    pub max_key_frame_interval: u32,
    /// Whether B-frame style reordering is allowed.
    pub allow_frame_reordering: bool,
    /// Expected frame rate of the source samples.
    pub expected_frame_rate: u32,
}

impl VideoEncodeConfig {
    /// Default settings for `size` at `frame_rate`.
    ///
    /// Bitrate defaults to `width * height * 3`, key frames to every two seconds.
    pub fn new(size: Size, frame_rate: u32) -> Self {
        Self {
            codec: VideoCodec::H264,
            width: size.width,
            height: size.height,
            color: ColorProperties::STANDARD_DEFINITION,
            average_bitrate: default_video_bitrate(size),
            max_key_frame_interval: frame_rate.saturating_mul(2),
            allow_frame_reordering: false,
            expected_frame_rate: frame_rate,
        }
    }

    /// Override the average bitrate.
    pub fn with_bitrate(mut self, bits_per_second: u64) -> Self {
        self.average_bitrate = bits_per_second;
        self
    }

    /// Output size.
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Check encoder invariants.
    pub fn validate(&self) -> TranscodeResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(TranscodeError::validation(
                "encode width/height must be non-zero",
            ));
        }
        if self.expected_frame_rate == 0 {
            return Err(TranscodeError::validation("encode frame rate must be non-zero"));
        }
        if self.average_bitrate == 0 {
            return Err(TranscodeError::validation("encode bitrate must be non-zero"));
        }
        Ok(())
    }
}

/// Default bitrate for a given output size.
pub fn default_video_bitrate(size: Size) -> u64 {
    size.area().saturating_mul(3)
}

/// Output audio codec.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioCodec {
    /// MPEG-4 AAC.
    #[default]
    Aac,
}

/// Audio encoder settings for one export.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AudioEncodeConfig {
    /// Target codec.
    pub codec: AudioCodec,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
    /// Bitrate in bits per second.
    pub bitrate: u32,
}

impl Default for AudioEncodeConfig {
    fn default() -> Self {
        Self {
            codec: AudioCodec::Aac,
            sample_rate: AUDIO_SAMPLE_RATE,
            channels: AUDIO_CHANNELS,
            bitrate: AUDIO_BITRATE,
        }
    }
}

/// Settings for one writer input, in registration order.
#[derive(Clone, Debug, PartialEq)]
pub enum InputSettings {
    /// Video encoder input.
    Video(VideoEncodeConfig),
    /// Audio encoder input.
    Audio(AudioEncodeConfig),
}

impl InputSettings {
    /// Media kind of this input.
    pub fn kind(&self) -> crate::media::asset::MediaKind {
        match self {
            Self::Video(_) => crate::media::asset::MediaKind::Video,
            Self::Audio(_) => crate::media::asset::MediaKind::Audio,
        }
    }
}

/// Output container kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// MPEG-4 (`.mp4`).
    #[default]
    Mp4,
    /// QuickTime movie (`.mov`).
    QuickTime,
    /// Apple MPEG-4 video (`.m4v`).
    M4v,
}

impl FileType {
    /// Conventional file extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::QuickTime => "mov",
            Self::M4v => "m4v",
        }
    }

    /// `ffmpeg` muxer name.
    pub fn muxer_name(self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::QuickTime => "mov",
            Self::M4v => "ipod",
        }
    }
}

impl std::str::FromStr for FileType {
    type Err = TranscodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mp4" => Ok(Self::Mp4),
            "mov" | "quicktime" => Ok(Self::QuickTime),
            "m4v" => Ok(Self::M4v),
            other => Err(TranscodeError::validation(format!(
                "unknown output file type '{other}'"
            ))),
        }
    }
}

/// Options passed to a [`WriterFactory`](crate::media::writer::WriterFactory).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WriterOptions {
    /// Output container kind.
    pub file_type: FileType,
    /// Place the index at the front of the file for progressive download.
    pub optimize_for_network: bool,
}

#[cfg(test)]
#[path = "../../tests/unit/encode/settings.rs"]
mod tests;
