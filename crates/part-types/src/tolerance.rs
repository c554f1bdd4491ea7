use serde::{Deserialize, Serialize};

/// Numeric tolerances reported by the geometry kernel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    /// Points closer than this are coincident; lengths below it are zero.
    pub confusion: f64,
    /// Angles (radians) below this are zero.
    pub angular: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            confusion: 1e-7,
            angular: 1e-12,
        }
    }
}

impl Tolerance {
    /// Smallest dimension a primitive can be built with. The kernel cannot
    /// build a face whose width is exactly the confusion distance.
    pub fn min_feature_size(&self) -> f64 {
        2.0 * self.confusion
    }

    pub fn is_zero_length(&self, length: f64) -> bool {
        length.abs() < self.confusion
    }

    pub fn is_zero_angle(&self, angle: f64) -> bool {
        angle.abs() < self.angular
    }
}
