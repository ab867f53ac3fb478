//! Wavyte Transcode re-encodes a single video asset into an orientation-normalized file.
//!
//! One [`TranscodeSession`] takes an [`ExportRequest`] and produces one [`ExportStatus`]:
//!
//! - Resolve the capture orientation of the first video track and build the upright layer
//!   transform
//! - Drive the video and audio track pipelines concurrently, pulling decoded samples from an
//!   [`AssetReader`](media::reader::AssetReader) and appending them to an
//!   [`AssetWriter`](media::writer::AssetWriter) under its backpressure
//! - Report progress as a fraction of the requested time range and finalize or cancel the
//!   writer
//!
//! Media I/O sits behind the [`media`] traits. The crate ships an in-memory backend and, behind
//! the `media-ffmpeg` feature, one that drives the system `ffmpeg`/`ffprobe` binaries.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub mod config;
pub mod encode;
pub mod geometry;
pub mod media;
pub mod session;

pub use crate::foundation::core::{Affine, MediaTime, Point, Rect, Size, TimeRange, Vec2};
pub use crate::foundation::error::{TranscodeError, TranscodeResult};

pub use crate::config::export::{ExportConfig, TimeRangeConfig};
pub use crate::encode::settings::{AudioEncodeConfig, FileType, VideoEncodeConfig, WriterOptions};
pub use crate::geometry::orientation::{Orientation, ResolvedOrientation, resolve_orientation};
pub use crate::geometry::transform::orientation_transform;
pub use crate::media::asset::{Asset, MediaKind, TrackId, TrackInfo};
pub use crate::media::memory::{InMemoryAsset, InMemoryWriterFactory};
pub use crate::media::writer::{WriterFactory, WriterStatus};
pub use crate::session::{
    CancelToken, ExportHandle, ExportPlan, ExportRequest, ExportStatus, Progress, SessionState,
    TranscodeSession,
};

#[cfg(feature = "media-ffmpeg")]
pub use crate::media::ffmpeg::{FfmpegAsset, FfmpegWriterFactory};
