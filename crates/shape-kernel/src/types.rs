use part_types::{Axis, Plane, Point3, RigidTransform};

/// Kernel-internal identifier of a stored geometry entry.
/// Stable within a single kernel session. NEVER persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShapeId(pub(crate) u64);

/// Opaque handle to a solid, face, wire or compound held by the kernel.
///
/// The handle carries a location (local-to-parent transform) on top of the
/// stored geometry. Moving or locating a shape is free and never touches the
/// kernel; `Kernel::transform` bakes a transform into new geometry instead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shape {
    id: ShapeId,
    location: RigidTransform,
}

impl Shape {
    pub(crate) fn new(id: ShapeId) -> Self {
        Self {
            id,
            location: RigidTransform::identity(),
        }
    }

    pub fn id(&self) -> ShapeId {
        self.id
    }

    pub fn location(&self) -> &RigidTransform {
        &self.location
    }

    /// The same geometry with `transform` applied on top of the current location.
    pub fn moved(&self, transform: &RigidTransform) -> Shape {
        Shape {
            id: self.id,
            location: transform * &self.location,
        }
    }

    /// The same geometry with its location replaced by `location`.
    pub fn located(&self, location: RigidTransform) -> Shape {
        Shape {
            id: self.id,
            location,
        }
    }
}

/// Axis-aligned bounding box, used for solid counting and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point3,
    pub max: Point3,
}

impl Aabb {
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3>) -> Option<Aabb> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        Some(iter.fold(
            Aabb {
                min: first,
                max: first,
            },
            |acc, p| Aabb {
                min: acc.min.inf(p),
                max: acc.max.sup(p),
            },
        ))
    }

    pub fn center(&self) -> Point3 {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn size(&self) -> part_types::Vector3 {
        self.max - self.min
    }

    /// True if the boxes overlap or touch within `tol`.
    pub fn touches(&self, other: &Aabb, tol: f64) -> bool {
        (0..3).all(|i| self.min[i] <= other.max[i] + tol && other.min[i] <= self.max[i] + tol)
    }

    /// True if `other` lies inside this box (within `tol`).
    pub fn contains(&self, other: &Aabb, tol: f64) -> bool {
        (0..3).all(|i| self.min[i] <= other.min[i] + tol && other.max[i] <= self.max[i] + tol)
    }

    pub fn intersection(&self, other: &Aabb) -> Option<Aabb> {
        let min = self.min.sup(&other.min);
        let max = self.max.inf(&other.max);
        (0..3)
            .all(|i| min[i] < max[i])
            .then_some(Aabb { min, max })
    }
}

/// Geometric classification of a face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FaceGeometry {
    /// Planar face: a point on the face and its outward normal.
    Plane(Plane),
    /// Cylindrical, conical or any other curved surface.
    Other,
}

/// Geometric classification of an edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EdgeGeometry {
    /// Straight edge: location and direction of the carrying line.
    Line(Axis),
    /// Circle or arc of circle: center and axis.
    Circle(Axis),
    Other,
}

/// A named sub-element extracted from a shape's boundary, expressed in the
/// parent frame of the queried shape (its location applied).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SubShape {
    Face(FaceGeometry),
    Edge(EdgeGeometry),
    Vertex(Point3),
}

impl SubShape {
    pub fn kind_name(&self) -> &'static str {
        match self {
            SubShape::Face(_) => "face",
            SubShape::Edge(_) => "edge",
            SubShape::Vertex(_) => "vertex",
        }
    }
}

/// Errors from kernel operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum KernelError {
    #[error("boolean operation failed: {reason}")]
    BooleanFailed { reason: String },

    #[error("transform operation failed: {reason}")]
    TransformFailed { reason: String },

    #[error("refine failed: {reason}")]
    RefineFailed { reason: String },

    #[error("cannot build face: {reason}")]
    FaceFailed { reason: String },

    #[error("cannot build primitive: {reason}")]
    PrimitiveFailed { reason: String },

    #[error("unknown shape: {id:?}")]
    ShapeNotFound { id: ShapeId },

    #[error("sub-element '{name}' not found")]
    SubShapeNotFound { name: String },

    #[error("operation not supported: {operation}")]
    NotSupported { operation: String },
}
