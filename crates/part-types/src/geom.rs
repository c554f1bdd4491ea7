use nalgebra::Unit;
use serde::{Deserialize, Serialize};

pub type Point3 = nalgebra::Point3<f64>;
pub type Vector3 = nalgebra::Vector3<f64>;
pub type UnitVector3 = Unit<Vector3>;

/// A located direction: mirror normals, pattern directions, rotation axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub base: Point3,
    pub direction: UnitVector3,
}

impl Axis {
    pub fn new(base: Point3, direction: UnitVector3) -> Self {
        Self { base, direction }
    }

    /// Build an axis from a raw direction. Returns None for a zero vector.
    pub fn try_new(base: Point3, direction: Vector3) -> Option<Self> {
        Unit::try_new(direction, 0.0).map(|direction| Self { base, direction })
    }

    pub fn x() -> Self {
        Self::new(Point3::origin(), Vector3::x_axis())
    }

    pub fn y() -> Self {
        Self::new(Point3::origin(), Vector3::y_axis())
    }

    pub fn z() -> Self {
        Self::new(Point3::origin(), Vector3::z_axis())
    }

    pub fn reversed(&self) -> Self {
        Self {
            base: self.base,
            direction: Unit::new_unchecked(-self.direction.into_inner()),
        }
    }

    /// The plane through `base` whose normal is this axis.
    pub fn as_plane_normal(&self) -> Plane {
        Plane::new(self.base, self.direction)
    }
}

/// An infinite plane given by a point on it and its unit normal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub base: Point3,
    pub normal: UnitVector3,
}

impl Plane {
    pub fn new(base: Point3, normal: UnitVector3) -> Self {
        Self { base, normal }
    }

    pub fn xy() -> Self {
        Self::new(Point3::origin(), Vector3::z_axis())
    }

    pub fn yz() -> Self {
        Self::new(Point3::origin(), Vector3::x_axis())
    }

    pub fn xz() -> Self {
        Self::new(Point3::origin(), Vector3::y_axis())
    }

    pub fn normal_axis(&self) -> Axis {
        Axis::new(self.base, self.normal)
    }

    /// Signed distance of `p` along the normal.
    pub fn signed_distance(&self, p: &Point3) -> f64 {
        self.normal.dot(&(p - self.base))
    }
}
