//! Encoder and container settings handed to writers.

/// Video/audio encoder settings and output container kinds.
pub mod settings;
