use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::Context as _;

use crate::foundation::core::{Affine, MediaTime, Size};
use crate::foundation::error::{TranscodeError, TranscodeResult};
use crate::media::asset::{Asset, MediaKind, TrackId, TrackInfo};
use crate::media::ffmpeg::reader::FfmpegReader;
use crate::media::reader::AssetReader;

#[derive(Debug, Default, serde::Deserialize)]
struct ProbeSideData {
    rotation: Option<f64>,
}

#[derive(Debug, Default, serde::Deserialize)]
struct ProbeTags {
    rotate: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct ProbeStream {
    index: u32,
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    #[serde(default)]
    tags: ProbeTags,
    #[serde(default)]
    side_data_list: Vec<ProbeSideData>,
}

#[derive(Debug, Default, serde::Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct ProbeOut {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    #[serde(default)]
    format: ProbeFormat,
}

/// Result of probing a media file.
#[derive(Clone, Debug, PartialEq)]
pub struct ProbeInfo {
    /// Video and audio tracks in stream order; track ids are ffmpeg stream indices.
    pub tracks: Vec<TrackInfo>,
    /// Container duration.
    pub duration: Option<MediaTime>,
}

/// Parse `ffprobe -print_format json -show_streams -show_format` output.
pub fn parse_probe_json(json: &[u8]) -> TranscodeResult<ProbeInfo> {
    let parsed: ProbeOut = serde_json::from_slice(json)
        .map_err(|e| TranscodeError::serde(format!("ffprobe json parse failed: {e}")))?;

    let mut tracks = Vec::new();
    for s in &parsed.streams {
        match s.codec_type.as_deref() {
            Some("video") => {
                let (Some(w), Some(h)) = (s.width, s.height) else {
                    return Err(TranscodeError::reader(format!(
                        "video stream {} has no dimensions",
                        s.index
                    )));
                };
                let natural = Size::new(w, h);
                let mut info =
                    TrackInfo::video(s.index, natural, rotation_transform(stream_rotation(s), natural));
                info.nominal_frame_rate = s.avg_frame_rate.as_deref().and_then(parse_rate);
                tracks.push(info);
            }
            Some("audio") => tracks.push(TrackInfo::audio(s.index)),
            _ => {}
        }
    }

    let duration = parsed
        .format
        .duration
        .as_deref()
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
        .map(|d| MediaTime::from_secs_f64(d, MediaTime::DEFAULT_TIMESCALE));

    Ok(ProbeInfo { tracks, duration })
}

/// Clockwise display rotation in degrees, normalized to `[0, 360)`.
///
/// The display-matrix side data is counter-clockwise; the legacy `rotate` tag is clockwise.
fn stream_rotation(s: &ProbeStream) -> f64 {
    let cw = s
        .side_data_list
        .iter()
        .find_map(|d| d.rotation)
        .map(|ccw| -ccw)
        .or_else(|| s.tags.rotate.as_deref().and_then(|r| r.trim().parse().ok()))
        .unwrap_or(0.0);
    cw.rem_euclid(360.0)
}

/// Native transform equivalent to a clockwise display rotation of a `natural`-sized track.
///
/// Only quarter turns are representable; other angles snap to the nearest one.
pub fn rotation_transform(clockwise_degrees: f64, natural: Size) -> Affine {
    let w = f64::from(natural.width);
    let h = f64::from(natural.height);
    let quarter = ((clockwise_degrees / 90.0).round() as i64).rem_euclid(4);
    match quarter {
        1 => Affine::new([0.0, 1.0, -1.0, 0.0, h, 0.0]),
        2 => Affine::new([-1.0, 0.0, 0.0, -1.0, w, h]),
        3 => Affine::new([0.0, -1.0, 1.0, 0.0, 0.0, w]),
        _ => Affine::IDENTITY,
    }
}

/// Parse an ffprobe rational like `30000/1001`. Zero or malformed rates yield `None`.
pub fn parse_rate(s: &str) -> Option<f64> {
    let (num, den) = match s.split_once('/') {
        Some((n, d)) => (n.trim().parse::<f64>().ok()?, d.trim().parse::<f64>().ok()?),
        None => (s.trim().parse::<f64>().ok()?, 1.0),
    };
    let rate = num / den;
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

/// Source asset backed by a media file probed with `ffprobe`.
#[derive(Clone, Debug)]
pub struct FfmpegAsset {
    path: PathBuf,
    info: ProbeInfo,
}

impl FfmpegAsset {
    /// Probe `path`.
    #[tracing::instrument]
    pub fn open(path: &Path) -> TranscodeResult<Self> {
        let out = Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_streams",
                "-show_format",
            ])
            .arg(path)
            .output()
            .context("failed to run ffprobe")?;
        if !out.status.success() {
            return Err(TranscodeError::reader(format!(
                "ffprobe failed for '{}': {}",
                path.display(),
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }

        let info = parse_probe_json(&out.stdout)?;
        tracing::debug!(
            tracks = info.tracks.len(),
            duration = info.duration.map(MediaTime::as_secs_f64),
            "probed source"
        );
        Ok(Self {
            path: path.to_path_buf(),
            info,
        })
    }

    /// Source file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Probe result.
    pub fn info(&self) -> &ProbeInfo {
        &self.info
    }
}

impl Asset for FfmpegAsset {
    fn tracks(&self) -> Vec<TrackInfo> {
        self.info.tracks.clone()
    }

    fn duration(&self) -> Option<MediaTime> {
        self.info.duration
    }

    fn create_reader(&self) -> TranscodeResult<Box<dyn AssetReader>> {
        Ok(Box::new(FfmpegReader::new(
            self.path.clone(),
            self.info.tracks.clone(),
        )))
    }

    fn tracks_with_kind(&self, kind: MediaKind) -> Vec<TrackInfo> {
        self.info
            .tracks
            .iter()
            .filter(|t| t.kind == kind)
            .cloned()
            .collect()
    }
}

/// Find a track by id.
pub(crate) fn find_track(tracks: &[TrackInfo], id: TrackId) -> Option<&TrackInfo> {
    tracks.iter().find(|t| t.id == id)
}

#[cfg(test)]
#[path = "../../../tests/unit/media/ffmpeg/probe.rs"]
mod tests;
