//! Everything derived from the source asset and the caller configuration before any
//! collaborator is constructed.

use crate::config::export::ExportConfig;
use crate::encode::settings::{
    AUDIO_BITRATE, AudioEncodeConfig, FileType, VideoEncodeConfig, WriterOptions,
};
use crate::foundation::core::{Affine, Size, TimeRange};
use crate::foundation::error::{TranscodeError, TranscodeResult};
use crate::geometry::orientation::{ResolvedOrientation, resolve_orientation};
use crate::geometry::transform::{orientation_transform, scale_factor};
use crate::media::asset::{Asset, MediaKind, TrackInfo};
use crate::media::reader::VideoComposition;

/// Resolved geometry, encoder settings and time range for one export.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportPlan {
    /// Primary (first) video track.
    pub video_track: TrackInfo,
    /// First audio track, when the source has one.
    pub audio_track: Option<TrackInfo>,
    /// Size of the video track after its native transform.
    pub display_size: Size,
    /// Orientation and corrected size.
    pub orientation: ResolvedOrientation,
    /// Output frame size.
    pub render_size: Size,
    /// Uniform scale from corrected width to output width.
    pub scale: f64,
    /// Layer transform bound to the video output.
    pub layer_transform: Affine,
    /// Requested range, resolved against the asset duration when open-ended.
    pub time_range: TimeRange,
    /// Video encoder input settings.
    pub video: VideoEncodeConfig,
    /// Audio encoder input settings, present exactly when `audio_track` is.
    pub audio: Option<AudioEncodeConfig>,
    /// Render description for the video output.
    pub composition: VideoComposition,
    /// Writer options.
    pub writer_options: WriterOptions,
}

impl ExportPlan {
    /// Derive the plan for exporting `asset` with `config` into a `file_type` container.
    ///
    /// Fails when the configuration is invalid or the asset has no video track.
    pub fn build(
        asset: &dyn Asset,
        config: &ExportConfig,
        file_type: FileType,
    ) -> TranscodeResult<Self> {
        config.validate()?;

        let video_track = asset
            .tracks_with_kind(MediaKind::Video)
            .into_iter()
            .next()
            .ok_or_else(|| TranscodeError::validation("source asset has no video track"))?;
        let audio_track = asset.tracks_with_kind(MediaKind::Audio).into_iter().next();

        let display_size = video_track.display_size();
        let orientation =
            resolve_orientation(video_track.preferred_transform, video_track.natural_size);
        let render_size = config.output_size().unwrap_or(display_size);
        if render_size.is_empty() {
            return Err(TranscodeError::validation(format!(
                "video track {} has an empty display size",
                video_track.id.0
            )));
        }

        let scale = scale_factor(render_size.width, orientation.corrected_size.width);
        let layer_transform =
            orientation_transform(orientation.orientation, orientation.corrected_size, scale);

        let frame_rate = config.frame_rate_or_default();
        let mut video = VideoEncodeConfig::new(render_size, frame_rate);
        if let Some(bitrate) = config.video_bitrate {
            video = video.with_bitrate(bitrate);
        }
        video.validate()?;

        let audio = audio_track.as_ref().map(|_| AudioEncodeConfig {
            bitrate: config.audio_bitrate.unwrap_or(AUDIO_BITRATE),
            ..AudioEncodeConfig::default()
        });

        let time_range = config.time_range_or_default()?.resolved(asset.duration());
        let composition =
            VideoComposition::single(render_size, frame_rate, time_range, layer_transform);

        tracing::debug!(
            orientation = ?orientation.orientation,
            natural = ?video_track.natural_size,
            corrected = ?orientation.corrected_size,
            render = ?render_size,
            scale,
            has_audio = audio_track.is_some(),
            "export plan"
        );

        Ok(Self {
            video_track,
            audio_track,
            display_size,
            orientation,
            render_size,
            scale,
            layer_transform,
            time_range,
            video,
            audio,
            composition,
            writer_options: WriterOptions {
                file_type,
                optimize_for_network: config.optimize_for_network,
            },
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/plan.rs"]
mod tests;
