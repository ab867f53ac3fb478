use std::cmp::Ordering;

use crate::foundation::error::{TranscodeError, TranscodeResult};

pub use kurbo::{Affine, Point, Rect, Vec2};

/// Pixel dimensions of a track, a render target or an encoder input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Size {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Size {
    /// Create a size from width and height.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Return the size with width and height exchanged.
    pub const fn swapped(self) -> Self {
        Self {
            width: self.height,
            height: self.width,
        }
    }

    /// Return `true` when either side is zero.
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Total pixel count as `u64`.
    pub fn area(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Size of the bounding box of `[0, w] x [0, h]` mapped through `transform`.
    ///
    /// This is the display size of a track whose natural size is `self` and whose native
    /// transform is `transform`.
    pub fn transformed_by(self, transform: Affine) -> Self {
        let bbox = transform.transform_rect_bbox(Rect::new(
            0.0,
            0.0,
            f64::from(self.width),
            f64::from(self.height),
        ));
        Self {
            width: bbox.width().abs().round() as u32,
            height: bbox.height().abs().round() as u32,
        }
    }
}

/// Rational media timestamp `value / timescale` seconds.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct MediaTime {
    /// Tick count.
    pub value: i64,
    /// Ticks per second, must be non-zero.
    pub timescale: u32,
}

impl MediaTime {
    /// Time zero.
    pub const ZERO: Self = Self {
        value: 0,
        timescale: 1,
    };

    /// Default timescale used when converting from floating-point seconds.
    pub const DEFAULT_TIMESCALE: u32 = 600;

    /// Create a validated timestamp.
    pub fn new(value: i64, timescale: u32) -> TranscodeResult<Self> {
        if timescale == 0 {
            return Err(TranscodeError::validation("MediaTime timescale must be > 0"));
        }
        Ok(Self { value, timescale })
    }

    /// Convert floating-point seconds into ticks of `timescale` (rounded to nearest).
    pub fn from_secs_f64(secs: f64, timescale: u32) -> Self {
        let timescale = timescale.max(1);
        Self {
            value: (secs * f64::from(timescale)).round() as i64,
            timescale,
        }
    }

    /// Convert to floating-point seconds.
    pub fn as_secs_f64(self) -> f64 {
        self.value as f64 / f64::from(self.timescale.max(1))
    }

    /// Return `true` when the timestamp is strictly negative.
    pub fn is_negative(self) -> bool {
        self.value < 0
    }

    /// Difference `self - rhs` expressed in `self`'s timescale, saturating at zero.
    pub fn saturating_sub(self, rhs: Self) -> Self {
        let rhs_ticks = rescale(rhs, self.timescale);
        Self {
            value: self.value.saturating_sub(rhs_ticks).max(0),
            timescale: self.timescale,
        }
    }

    /// Sum `self + rhs` expressed in `self`'s timescale.
    pub fn saturating_add(self, rhs: Self) -> Self {
        Self {
            value: self.value.saturating_add(rescale(rhs, self.timescale)),
            timescale: self.timescale,
        }
    }
}

fn rescale(t: MediaTime, timescale: u32) -> i64 {
    if t.timescale == timescale {
        return t.value;
    }
    let v = i128::from(t.value) * i128::from(timescale) / i128::from(t.timescale.max(1));
    v.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

impl PartialEq for MediaTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MediaTime {}

impl PartialOrd for MediaTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MediaTime {
    fn cmp(&self, other: &Self) -> Ordering {
        // Cross-multiply so differing timescales compare exactly.
        let lhs = i128::from(self.value) * i128::from(other.timescale);
        let rhs = i128::from(other.value) * i128::from(self.timescale);
        lhs.cmp(&rhs)
    }
}

/// Time range with a start instant and either a finite duration or "until end".
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TimeRange {
    /// Inclusive range start, `>= 0`.
    pub start: MediaTime,
    /// Range duration, `>= 0`. `None` means "until the end of the asset".
    pub duration: Option<MediaTime>,
}

impl Default for TimeRange {
    fn default() -> Self {
        Self::full()
    }
}

impl TimeRange {
    /// The whole asset: start at zero, run until the end.
    pub const fn full() -> Self {
        Self {
            start: MediaTime::ZERO,
            duration: None,
        }
    }

    /// Create a validated finite range.
    pub fn new(start: MediaTime, duration: MediaTime) -> TranscodeResult<Self> {
        if start.is_negative() {
            return Err(TranscodeError::validation("TimeRange start must be >= 0"));
        }
        if duration.is_negative() {
            return Err(TranscodeError::validation("TimeRange duration must be >= 0"));
        }
        Ok(Self {
            start,
            duration: Some(duration),
        })
    }

    /// Create a validated finite range from floating-point seconds.
    pub fn from_secs(start_secs: f64, duration_secs: f64) -> TranscodeResult<Self> {
        if !start_secs.is_finite() || !duration_secs.is_finite() {
            return Err(TranscodeError::validation(
                "TimeRange seconds must be finite",
            ));
        }
        Self::new(
            MediaTime::from_secs_f64(start_secs, MediaTime::DEFAULT_TIMESCALE),
            MediaTime::from_secs_f64(duration_secs, MediaTime::DEFAULT_TIMESCALE),
        )
    }

    /// Exclusive end, when the duration is known.
    pub fn end(self) -> Option<MediaTime> {
        self.duration.map(|d| self.start.saturating_add(d))
    }

    /// Return `true` when `t` is inside `[start, end)`; open-ended ranges only check the start.
    pub fn contains(self, t: MediaTime) -> bool {
        if t < self.start {
            return false;
        }
        match self.end() {
            Some(end) => t < end,
            None => true,
        }
    }

    /// Replace an open-ended duration with the remainder of an asset of length `asset_duration`.
    pub fn resolved(self, asset_duration: Option<MediaTime>) -> Self {
        match (self.duration, asset_duration) {
            (None, Some(total)) => Self {
                start: self.start,
                duration: Some(total.saturating_sub(self.start)),
            },
            _ => self,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
