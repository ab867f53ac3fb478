//! Layer transform that renders a source track upright and scaled to the output size.

use std::f64::consts::FRAC_PI_2;

use crate::foundation::core::{Affine, Size, Vec2};
use crate::geometry::orientation::Orientation;

/// Offset and rotation applied for one orientation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrientationPlacement {
    /// Translation applied after rotating, in corrected-size units.
    pub offset: Vec2,
    /// Rotation angle in radians (positive is clockwise in y-down pixel space).
    pub angle: f64,
}

/// Offset and angle for `orientation` given the corrected (upright) size.
pub fn placement(orientation: Orientation, corrected: Size) -> OrientationPlacement {
    let w = f64::from(corrected.width);
    let h = f64::from(corrected.height);
    match orientation {
        Orientation::LandscapeLeft => OrientationPlacement {
            offset: Vec2::new(w, h),
            angle: FRAC_PI_2,
        },
        Orientation::LandscapeRight => OrientationPlacement {
            offset: Vec2::ZERO,
            angle: 0.0,
        },
        Orientation::PortraitUpsideDown => OrientationPlacement {
            offset: Vec2::new(0.0, h),
            angle: -FRAC_PI_2,
        },
        Orientation::Portrait => OrientationPlacement {
            offset: Vec2::new(w, 0.0),
            angle: FRAC_PI_2,
        },
    }
}

/// Build the layer transform for a source track.
///
/// Order is fixed: start from a uniform scale, translate by the placement offset, then rotate.
/// Each step post-concatenates, so a source point is rotated first, then offset, then scaled.
pub fn orientation_transform(orientation: Orientation, corrected: Size, scale: f64) -> Affine {
    let p = placement(orientation, corrected);
    Affine::scale(scale) * Affine::translate(p.offset) * Affine::rotate(p.angle)
}

/// Uniform scale mapping the corrected source width onto the output width.
///
/// A zero-width source yields `1.0`.
pub fn scale_factor(output_width: u32, corrected_width: u32) -> f64 {
    if corrected_width == 0 {
        return 1.0;
    }
    f64::from(output_width) / f64::from(corrected_width)
}

/// Axis-aligned rotation carried by the linear part of a layer transform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuarterTurn {
    /// No rotation.
    None,
    /// 90 degrees clockwise (y-down).
    Clockwise,
    /// 180 degrees.
    Half,
    /// 90 degrees counter-clockwise (y-down).
    CounterClockwise,
}

impl QuarterTurn {
    /// Classify the linear part of `transform`.
    ///
    /// Returns `None` for shears, mirrors and non-right angles.
    pub fn of(transform: Affine) -> Option<Self> {
        const EPS: f64 = 1e-9;
        let [a, b, c, d, _, _] = transform.as_coeffs();
        let zero = |v: f64| v.abs() <= EPS * (a.abs() + b.abs() + c.abs() + d.abs()).max(1.0);

        if zero(b) && zero(c) && a > 0.0 && d > 0.0 {
            Some(Self::None)
        } else if zero(b) && zero(c) && a < 0.0 && d < 0.0 {
            Some(Self::Half)
        } else if zero(a) && zero(d) && b > 0.0 && c < 0.0 {
            Some(Self::Clockwise)
        } else if zero(a) && zero(d) && b < 0.0 && c > 0.0 {
            Some(Self::CounterClockwise)
        } else {
            None
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/geometry/transform.rs"]
mod tests;
