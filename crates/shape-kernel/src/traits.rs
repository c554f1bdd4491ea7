use part_types::{BooleanOp, Point3, RigidTransform, Tolerance, Vector3};

use crate::types::*;

/// Core geometry kernel trait. Provides all shape construction and modification operations.
///
/// Every operation returns a new shape; inputs are never modified. Input shape
/// locations are honored, and results come back with an identity location.
pub trait Kernel {
    /// Box with one corner at the origin, extending to (length, width, height).
    fn make_box(&mut self, length: f64, width: f64, height: f64) -> Result<Shape, KernelError>;

    /// Cylinder around +Z with its bottom on the XY plane. `angle` is the
    /// sweep in radians; less than a full turn gives a sector.
    fn make_cylinder(&mut self, radius: f64, height: f64, angle: f64)
        -> Result<Shape, KernelError>;

    /// Polyline wire through `points`, closed back to the first point if `closed`.
    fn make_polygon(&mut self, points: &[Point3], closed: bool) -> Result<Shape, KernelError>;

    /// Group shapes into a single compound.
    fn make_compound(&mut self, shapes: &[Shape]) -> Result<Shape, KernelError>;

    /// Planar face bounded by closed wires. Inner wires become holes.
    fn make_face(&mut self, wires: &[Shape]) -> Result<Shape, KernelError>;

    /// Finite prism sweeping `face` along `vector`.
    fn make_prism(&mut self, face: &Shape, vector: Vector3) -> Result<Shape, KernelError>;

    /// Combine `argument` with every shape in `tools` using a single solver run.
    fn boolean(
        &mut self,
        op: BooleanOp,
        argument: &Shape,
        tools: &[Shape],
    ) -> Result<Shape, KernelError>;

    /// Remove redundant edges and faces left behind by booleans.
    fn refine(&mut self, shape: &Shape) -> Result<Shape, KernelError>;

    /// Apply `transform` to the geometry itself (not just the location).
    fn transform(&mut self, shape: &Shape, transform: &RigidTransform)
        -> Result<Shape, KernelError>;
}

/// Topology introspection trait. Provides read-only queries on kernel geometry.
pub trait KernelIntrospect {
    /// True for the empty shape a boolean returns when nothing is left.
    fn is_null(&self, shape: &Shape) -> bool;

    /// Number of disjoint solids in the shape.
    fn count_solids(&self, shape: &Shape) -> usize;

    /// Extract a named boundary element ("Face3", "Edge1", "Vertex2").
    /// Numbering starts at 1.
    fn sub_shape(&self, shape: &Shape, name: &str) -> Result<SubShape, KernelError>;

    /// All wires contained in the shape, located in the shape's parent frame.
    fn wires(&self, shape: &Shape) -> Vec<Shape>;

    /// Bounding box of every solid component, in the shape's parent frame.
    fn solid_bounds(&self, shape: &Shape) -> Vec<Aabb>;

    /// Linear and angular confusion tolerances.
    fn tolerance(&self) -> Tolerance;
}
