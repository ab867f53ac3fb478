use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::foundation::core::{MediaTime, TimeRange};

/// Share of progress reachable while samples are still being transcoded.
///
/// The remainder is reserved for finalizing the output.
pub const TRANSCODE_PROGRESS_CEILING: f64 = 0.9;

/// Shared, lock-free fractional progress in `[0, 1]`.
#[derive(Clone, Debug, Default)]
pub struct Progress(Arc<AtomicU64>);

impl Progress {
    /// New progress at `0.0`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value.
    pub fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }

    fn set(&self, v: f64) {
        self.0.store(v.to_bits(), Ordering::Release);
    }

    pub(crate) fn reset(&self) {
        self.set(0.0);
    }
}

/// Converts video sample timestamps into [`Progress`] for one export.
#[derive(Debug)]
pub struct ProgressTracker {
    range_start: MediaTime,
    range_duration_secs: Option<f64>,
    progress: Progress,
}

impl ProgressTracker {
    /// Track progress through `range`, writing into `progress` (reset to zero).
    pub fn new(range: TimeRange, progress: Progress) -> Self {
        progress.reset();
        Self {
            range_start: range.start,
            range_duration_secs: range.duration.map(MediaTime::as_secs_f64),
            progress,
        }
    }

    /// Record that the sample at `pts` is about to be written.
    ///
    /// Progress is `((pts - start) / duration) * 0.9`, clamped to `[0, 0.9]` and never lowered.
    /// Without a positive duration progress does not advance.
    pub fn update(&self, pts: MediaTime) {
        let Some(duration) = self.range_duration_secs.filter(|d| *d > 0.0) else {
            return;
        };
        let elapsed = pts.as_secs_f64() - self.range_start.as_secs_f64();
        let v = ((elapsed / duration) * TRANSCODE_PROGRESS_CEILING)
            .clamp(0.0, TRANSCODE_PROGRESS_CEILING);
        if v > self.progress.get() {
            self.progress.set(v);
        }
    }

    /// Mark the export as fully written. Only called after a successful finalize.
    pub fn finalize(&self) {
        self.progress.set(1.0);
    }

    /// Current value.
    pub fn value(&self) -> f64 {
        self.progress.get()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/progress.rs"]
mod tests;
