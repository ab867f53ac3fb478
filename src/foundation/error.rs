/// Convenience result type used across the crate.
pub type TranscodeResult<T> = Result<T, TranscodeError>;

/// Top-level error taxonomy used by session and collaborator APIs.
#[derive(thiserror::Error, Debug)]
pub enum TranscodeError {
    /// Invalid caller-provided request or configuration data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors raised by the source-side reader or its track outputs.
    #[error("reader error: {0}")]
    Reader(String),

    /// Errors raised by the sink-side writer or its track inputs.
    #[error("writer error: {0}")]
    Writer(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TranscodeError {
    /// Build a [`TranscodeError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`TranscodeError::Reader`] value.
    pub fn reader(msg: impl Into<String>) -> Self {
        Self::Reader(msg.into())
    }

    /// Build a [`TranscodeError::Writer`] value.
    pub fn writer(msg: impl Into<String>) -> Self {
        Self::Writer(msg.into())
    }

    /// Build a [`TranscodeError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
