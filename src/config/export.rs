use std::path::Path;

use crate::encode::settings::DEFAULT_FRAME_RATE;
use crate::foundation::core::{MediaTime, Size, TimeRange};
use crate::foundation::error::{TranscodeError, TranscodeResult};

/// Requested time span in seconds.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeRangeConfig {
    /// Start offset in seconds.
    #[serde(default)]
    pub start_secs: f64,
    /// Duration in seconds. Absent means "until the end of the asset".
    #[serde(default)]
    pub duration_secs: Option<f64>,
}

impl TimeRangeConfig {
    fn to_time_range(self) -> TranscodeResult<TimeRange> {
        if !self.start_secs.is_finite() || self.start_secs < 0.0 {
            return Err(TranscodeError::validation(
                "time_range.start_secs must be finite and >= 0",
            ));
        }
        match self.duration_secs {
            Some(d) => TimeRange::from_secs(self.start_secs, d),
            None => Ok(TimeRange {
                start: MediaTime::from_secs_f64(self.start_secs, MediaTime::DEFAULT_TIMESCALE),
                duration: None,
            }),
        }
    }
}

/// Caller-supplied export configuration.
///
/// Every key is optional; the JSON form uses the field names below.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    /// Output width. Must be given together with `height`.
    pub width: Option<u32>,
    /// Output height. Must be given together with `width`.
    pub height: Option<u32>,
    /// Output frame rate, default 30.
    pub frame_rate: Option<u32>,
    /// Requested span of the source, default the whole asset.
    pub time_range: Option<TimeRangeConfig>,
    /// Ask the writer to lay the file out for progressive download.
    pub optimize_for_network: bool,
    /// Average video bitrate override in bits per second.
    pub video_bitrate: Option<u64>,
    /// Audio bitrate override in bits per second.
    pub audio_bitrate: Option<u32>,
}

impl ExportConfig {
    /// Parse a JSON configuration mapping.
    pub fn from_json_str(s: &str) -> TranscodeResult<Self> {
        let cfg: Self = serde_json::from_str(s).map_err(|e| TranscodeError::serde(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read and parse a JSON configuration file.
    pub fn from_path(path: &Path) -> TranscodeResult<Self> {
        use anyhow::Context as _;
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read export config '{}'", path.display()))?;
        Self::from_json_str(&s)
    }

    /// Check the configuration for values no export could honor.
    pub fn validate(&self) -> TranscodeResult<()> {
        match (self.width, self.height) {
            (Some(w), Some(h)) => {
                if w == 0 || h == 0 {
                    return Err(TranscodeError::validation(
                        "width/height must be non-zero",
                    ));
                }
            }
            (None, None) => {}
            _ => {
                return Err(TranscodeError::validation(
                    "width and height must be given together",
                ));
            }
        }
        if self.frame_rate == Some(0) {
            return Err(TranscodeError::validation("frame_rate must be non-zero"));
        }
        if self.video_bitrate == Some(0) || self.audio_bitrate == Some(0) {
            return Err(TranscodeError::validation("bitrates must be non-zero"));
        }
        if let Some(r) = self.time_range {
            r.to_time_range()?;
        }
        Ok(())
    }

    /// Explicit output size, when both sides were given.
    pub fn output_size(&self) -> Option<Size> {
        Some(Size::new(self.width?, self.height?))
    }

    /// Frame rate with the default applied.
    pub fn frame_rate_or_default(&self) -> u32 {
        self.frame_rate.unwrap_or(DEFAULT_FRAME_RATE)
    }

    /// Requested range with the default (whole asset) applied.
    pub fn time_range_or_default(&self) -> TranscodeResult<TimeRange> {
        match self.time_range {
            Some(r) => r.to_time_range(),
            None => Ok(TimeRange::full()),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/config/export.rs"]
mod tests;
