use std::ops::Mul;

use nalgebra::{Isometry3, Matrix3, Matrix4, Rotation3, Translation3, Unit, UnitQuaternion};
use serde::{Deserialize, Serialize};

use crate::geom::{Axis, Plane, Point3, Vector3};

/// A 4x4 homogeneous transform: a rotation plus translation, or a reflection.
///
/// Used both for placements (local-to-parent) and for the occurrences a
/// pattern produces. Composition follows matrix multiplication, so
/// `a * b` applies `b` first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RigidTransform {
    matrix: Matrix4<f64>,
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl RigidTransform {
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    pub fn translation(offset: Vector3) -> Self {
        Self {
            matrix: Matrix4::new_translation(&offset),
        }
    }

    /// A placement: rotate first, then move to `position`.
    pub fn from_parts(position: Vector3, rotation: UnitQuaternion<f64>) -> Self {
        Self {
            matrix: Isometry3::from_parts(Translation3::from(position), rotation).to_homogeneous(),
        }
    }

    /// Rotation by `angle` radians around a located axis (right-hand rule).
    pub fn rotation(axis: &Axis, angle: f64) -> Self {
        let rotation = Rotation3::from_axis_angle(&axis.direction, angle).to_homogeneous();
        let to_axis = Matrix4::new_translation(&axis.base.coords);
        let from_axis = Matrix4::new_translation(&-axis.base.coords);
        Self {
            matrix: to_axis * rotation * from_axis,
        }
    }

    /// Reflection through a plane.
    pub fn mirror(plane: &Plane) -> Self {
        let n = plane.normal.into_inner();
        let householder = Matrix3::identity() - 2.0 * n * n.transpose();
        let shift = 2.0 * n.dot(&plane.base.coords) * n;

        let mut matrix = householder.to_homogeneous();
        matrix[(0, 3)] = shift.x;
        matrix[(1, 3)] = shift.y;
        matrix[(2, 3)] = shift.z;
        Self { matrix }
    }

    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.matrix
    }

    /// Returns None if the matrix is singular.
    pub fn inverse(&self) -> Option<Self> {
        self.matrix.try_inverse().map(|matrix| Self { matrix })
    }

    pub fn transform_point(&self, p: &Point3) -> Point3 {
        self.matrix.transform_point(p)
    }

    pub fn transform_vector(&self, v: &Vector3) -> Vector3 {
        self.matrix.transform_vector(v)
    }

    /// Map an axis through this transform. Returns None if the direction
    /// collapses, which only a singular matrix can cause.
    pub fn transform_axis(&self, axis: &Axis) -> Option<Axis> {
        let base = self.transform_point(&axis.base);
        let direction = self.transform_vector(&axis.direction);
        Unit::try_new(direction, 0.0).map(|direction| Axis { base, direction })
    }

    pub fn transform_plane(&self, plane: &Plane) -> Option<Plane> {
        self.transform_axis(&plane.normal_axis())
            .map(|axis| axis.as_plane_normal())
    }

    pub fn translation_part(&self) -> Vector3 {
        Vector3::new(
            self.matrix[(0, 3)],
            self.matrix[(1, 3)],
            self.matrix[(2, 3)],
        )
    }

    pub fn linear_part(&self) -> Matrix3<f64> {
        self.matrix.fixed_view::<3, 3>(0, 0).into_owned()
    }

    /// True if the transform flips handedness (mirrors).
    pub fn is_reflection(&self) -> bool {
        self.linear_part().determinant() < 0.0
    }

    pub fn is_identity(&self, eps: f64) -> bool {
        self.approx_eq(&Self::identity(), eps)
    }

    pub fn approx_eq(&self, other: &Self, eps: f64) -> bool {
        self.matrix
            .iter()
            .zip(other.matrix.iter())
            .all(|(a, b)| (a - b).abs() <= eps)
    }
}

impl Mul for RigidTransform {
    type Output = RigidTransform;

    fn mul(self, rhs: RigidTransform) -> RigidTransform {
        RigidTransform {
            matrix: self.matrix * rhs.matrix,
        }
    }
}

impl Mul<&RigidTransform> for &RigidTransform {
    type Output = RigidTransform;

    fn mul(self, rhs: &RigidTransform) -> RigidTransform {
        RigidTransform {
            matrix: self.matrix * rhs.matrix,
        }
    }
}
