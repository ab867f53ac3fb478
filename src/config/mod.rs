//! Caller-facing export configuration.

/// JSON-loadable export configuration mapping.
pub mod export;
