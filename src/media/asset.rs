use crate::foundation::core::{Affine, MediaTime, Size};
use crate::foundation::error::TranscodeResult;
use crate::media::reader::AssetReader;

/// Kind of media carried by a track.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// Picture track.
    Video,
    /// Sound track.
    Audio,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Video => f.write_str("video"),
            Self::Audio => f.write_str("audio"),
        }
    }
}

/// Identifier of a track within one asset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(pub u32);

/// Static description of one source track.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackInfo {
    /// Track identifier, unique within its asset.
    pub id: TrackId,
    /// Media kind.
    pub kind: MediaKind,
    /// Untransformed pixel size (zero for audio tracks).
    pub natural_size: Size,
    /// Transform that displays the stored pixels upright.
    pub preferred_transform: Affine,
    /// Nominal frame rate when known.
    pub nominal_frame_rate: Option<f64>,
}

impl TrackInfo {
    /// Describe a video track.
    pub fn video(id: u32, natural_size: Size, preferred_transform: Affine) -> Self {
        Self {
            id: TrackId(id),
            kind: MediaKind::Video,
            natural_size,
            preferred_transform,
            nominal_frame_rate: None,
        }
    }

    /// Describe an audio track.
    pub fn audio(id: u32) -> Self {
        Self {
            id: TrackId(id),
            kind: MediaKind::Audio,
            natural_size: Size::new(0, 0),
            preferred_transform: Affine::IDENTITY,
            nominal_frame_rate: None,
        }
    }

    /// Size of the track once its preferred transform is applied.
    pub fn display_size(&self) -> Size {
        self.natural_size.transformed_by(self.preferred_transform)
    }
}

/// Immutable handle to source media.
pub trait Asset: Send + Sync {
    /// All tracks in container order.
    fn tracks(&self) -> Vec<TrackInfo>;

    /// Total duration, when known.
    fn duration(&self) -> Option<MediaTime>;

    /// Create a fresh reader over this asset.
    fn create_reader(&self) -> TranscodeResult<Box<dyn AssetReader>>;

    /// Tracks of one media kind, in container order.
    fn tracks_with_kind(&self, kind: MediaKind) -> Vec<TrackInfo> {
        self.tracks().into_iter().filter(|t| t.kind == kind).collect()
    }
}
