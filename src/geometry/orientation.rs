use crate::foundation::core::{Affine, Size};

const TRANSLATION_EPS: f64 = 1e-6;

/// Capture orientation of a video track, derived from its native transform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// Untransformed landscape (identity placement).
    LandscapeRight,
    /// Landscape, recorded upside down.
    LandscapeLeft,
    /// Portrait. Also the fallback for any transform that is not recognized.
    Portrait,
    /// Portrait, recorded upside down.
    PortraitUpsideDown,
}

impl Orientation {
    /// Classify a native transform by its translation pair.
    ///
    /// - `(0, 0)` -> landscape right
    /// - `(natural.width, natural.height)` -> landscape left
    /// - `(0, natural.width)` -> portrait upside down
    /// - anything else -> portrait
    pub fn resolve(native_transform: Affine, natural: Size) -> Self {
        let [.., tx, ty] = native_transform.as_coeffs();
        let w = f64::from(natural.width);
        let h = f64::from(natural.height);

        if approx(tx, 0.0) && approx(ty, 0.0) {
            Self::LandscapeRight
        } else if approx(tx, w) && approx(ty, h) {
            Self::LandscapeLeft
        } else if approx(tx, 0.0) && approx(ty, w) {
            Self::PortraitUpsideDown
        } else {
            Self::Portrait
        }
    }

    /// Return `true` for the two portrait cases, whose pixel buffers are stored sideways.
    pub fn is_portrait(self) -> bool {
        matches!(self, Self::Portrait | Self::PortraitUpsideDown)
    }

    /// Size of the upright picture for a track with the given natural size.
    pub fn corrected_size(self, natural: Size) -> Size {
        if self.is_portrait() {
            natural.swapped()
        } else {
            natural
        }
    }
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() <= TRANSLATION_EPS
}

/// Orientation of a track together with its upright dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedOrientation {
    /// Discrete orientation.
    pub orientation: Orientation,
    /// Natural size with the orientation applied.
    pub corrected_size: Size,
}

/// Resolve orientation and corrected size for a video track in one step.
pub fn resolve_orientation(native_transform: Affine, natural: Size) -> ResolvedOrientation {
    let orientation = Orientation::resolve(native_transform, natural);
    ResolvedOrientation {
        orientation,
        corrected_size: orientation.corrected_size(natural),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/geometry/orientation.rs"]
mod tests;
