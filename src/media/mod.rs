//! Collaborator boundary: source assets, readers, writers, and the shipped backends.

/// Source asset and track descriptions.
pub mod asset;
/// `ffmpeg`/`ffprobe` process backend.
#[cfg(feature = "media-ffmpeg")]
pub mod ffmpeg;
/// In-memory backend for tests and debugging.
pub mod memory;
/// Reader-side traits and decode settings.
pub mod reader;
/// Sample buffers exchanged between readers and writers.
pub mod sample;
/// Writer-side traits and statuses.
pub mod writer;
