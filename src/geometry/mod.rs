//! Orientation detection and the upright-placement transform.

/// Orientation classification of native track transforms.
pub mod orientation;
/// Upright-placement layer transform.
pub mod transform;
