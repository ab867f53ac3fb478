use crate::foundation::core::MediaTime;
use crate::media::asset::MediaKind;

/// One timestamped unit of media moving from a reader output to a writer input.
///
/// The payload is opaque to the session and is never modified in transit.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleBuffer {
    /// Media kind of the payload.
    pub kind: MediaKind,
    /// Presentation timestamp.
    pub pts: MediaTime,
    /// Duration covered by the payload.
    pub duration: MediaTime,
    /// Payload bytes (decoded pixels or interleaved PCM, as agreed with the collaborators).
    pub data: Vec<u8>,
}

impl SampleBuffer {
    /// Create a sample.
    pub fn new(kind: MediaKind, pts: MediaTime, duration: MediaTime, data: Vec<u8>) -> Self {
        Self {
            kind,
            pts,
            duration,
            data,
        }
    }
}
