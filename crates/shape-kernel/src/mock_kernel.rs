//! Deterministic in-memory kernel for tests. Implements both kernel traits.
//!
//! Solids are kept as lists of placed primitive pieces. Booleans work on the
//! pieces' bounding boxes: fuse keeps everything, cut drops pieces swallowed
//! by a tool, common keeps the overlap boxes. That is enough to count solids,
//! locate results and detect empty results the way a real kernel would.

use std::collections::HashMap;
use std::f64::consts::TAU;

use part_types::{Axis, BooleanOp, Plane, Point3, RigidTransform, Tolerance, Vector3};
use tracing::debug;

use crate::traits::{Kernel, KernelIntrospect};
use crate::types::*;

/// Samples per full turn when bounding a cylinder sector.
const ARC_SAMPLES: usize = 16;

#[derive(Debug, Clone)]
enum PieceKind {
    Box {
        length: f64,
        width: f64,
        height: f64,
    },
    Cylinder {
        radius: f64,
        height: f64,
        angle: f64,
    },
    /// Swept polygon loops. The first loop is the outer boundary.
    Prism {
        loops: Vec<Vec<Point3>>,
        vector: Vector3,
    },
}

/// A primitive placed in its owner's frame.
#[derive(Debug, Clone)]
struct Piece {
    kind: PieceKind,
    placement: RigidTransform,
}

#[derive(Debug, Clone)]
enum Entry {
    /// An empty list is the null shape.
    Solid(Vec<Piece>),
    Wire { points: Vec<Point3>, closed: bool },
    Face { loops: Vec<Vec<Point3>> },
    Compound(Vec<Shape>),
}

/// Boundary elements of a shape, in the order they are numbered.
#[derive(Debug, Default)]
struct Topology {
    faces: Vec<FaceGeometry>,
    edges: Vec<EdgeGeometry>,
    vertices: Vec<Point3>,
}

impl Topology {
    fn extend(&mut self, other: Topology) {
        self.faces.extend(other.faces);
        self.edges.extend(other.edges);
        self.vertices.extend(other.vertices);
    }

    fn transformed(self, t: &RigidTransform) -> Topology {
        Topology {
            faces: self
                .faces
                .into_iter()
                .map(|f| match f {
                    FaceGeometry::Plane(p) => t
                        .transform_plane(&p)
                        .map(FaceGeometry::Plane)
                        .unwrap_or(FaceGeometry::Other),
                    FaceGeometry::Other => FaceGeometry::Other,
                })
                .collect(),
            edges: self
                .edges
                .into_iter()
                .map(|e| match e {
                    EdgeGeometry::Line(a) => t
                        .transform_axis(&a)
                        .map(EdgeGeometry::Line)
                        .unwrap_or(EdgeGeometry::Other),
                    EdgeGeometry::Circle(a) => t
                        .transform_axis(&a)
                        .map(EdgeGeometry::Circle)
                        .unwrap_or(EdgeGeometry::Other),
                    EdgeGeometry::Other => EdgeGeometry::Other,
                })
                .collect(),
            vertices: self.vertices.iter().map(|p| t.transform_point(p)).collect(),
        }
    }
}

/// One recorded `Kernel::boolean` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BooleanCall {
    pub op: BooleanOp,
    pub tool_count: usize,
}

/// Deterministic test double for the geometry kernel.
/// Implements both Kernel and KernelIntrospect.
pub struct MockKernel {
    next_id: u64,
    entries: HashMap<ShapeId, Entry>,
    tolerance: Tolerance,
    fail_next_boolean: bool,
    fail_refine: bool,
    fail_transform: bool,
    boolean_calls: Vec<BooleanCall>,
    refine_calls: usize,
}

impl Default for MockKernel {
    fn default() -> Self {
        Self::new()
    }
}

impl MockKernel {
    pub fn new() -> Self {
        Self::with_tolerance(Tolerance::default())
    }

    pub fn with_tolerance(tolerance: Tolerance) -> Self {
        Self {
            next_id: 1,
            entries: HashMap::new(),
            tolerance,
            fail_next_boolean: false,
            fail_refine: false,
            fail_transform: false,
            boolean_calls: Vec::new(),
            refine_calls: 0,
        }
    }

    /// Make the next `boolean` call report a solver failure.
    pub fn fail_next_boolean(&mut self) {
        self.fail_next_boolean = true;
    }

    /// Make every `refine` call fail until reset.
    pub fn set_fail_refine(&mut self, fail: bool) {
        self.fail_refine = fail;
    }

    /// Make every `transform` call fail until reset.
    pub fn set_fail_transform(&mut self, fail: bool) {
        self.fail_transform = fail;
    }

    /// Boolean calls made so far, in order.
    pub fn boolean_calls(&self) -> &[BooleanCall] {
        &self.boolean_calls
    }

    pub fn refine_calls(&self) -> usize {
        self.refine_calls
    }

    pub fn clear_log(&mut self) {
        self.boolean_calls.clear();
        self.refine_calls = 0;
    }

    fn store(&mut self, entry: Entry) -> Shape {
        let id = ShapeId(self.next_id);
        self.next_id += 1;
        self.entries.insert(id, entry);
        Shape::new(id)
    }

    fn entry(&self, shape: &Shape) -> Result<&Entry, KernelError> {
        self.entries
            .get(&shape.id())
            .ok_or(KernelError::ShapeNotFound { id: shape.id() })
    }

    /// Solid pieces of `shape`, placed in the shape's parent frame.
    fn placed_pieces(&self, shape: &Shape) -> Result<Vec<Piece>, KernelError> {
        let location = shape.location();
        match self.entry(shape)? {
            Entry::Solid(pieces) => Ok(pieces
                .iter()
                .map(|p| Piece {
                    kind: p.kind.clone(),
                    placement: location * &p.placement,
                })
                .collect()),
            Entry::Compound(children) => {
                let mut pieces = Vec::new();
                for child in children {
                    pieces.extend(self.placed_pieces(&child.moved(location))?);
                }
                Ok(pieces)
            }
            Entry::Wire { .. } | Entry::Face { .. } => Err(KernelError::NotSupported {
                operation: "solid operation on a wire or face".into(),
            }),
        }
    }

    fn topology(&self, shape: &Shape) -> Result<Topology, KernelError> {
        let location = shape.location();
        let topo = match self.entry(shape)? {
            Entry::Solid(pieces) => {
                let mut topo = Topology::default();
                for piece in pieces {
                    topo.extend(piece_topology(&piece.kind).transformed(&piece.placement));
                }
                topo
            }
            Entry::Wire { points, closed } => Topology {
                faces: Vec::new(),
                edges: polyline_edges(points, *closed),
                vertices: points.clone(),
            },
            Entry::Face { loops } => {
                let mut topo = Topology::default();
                if let Some(plane) = loop_plane(loops) {
                    topo.faces.push(FaceGeometry::Plane(plane));
                }
                for l in loops {
                    topo.edges.extend(polyline_edges(l, true));
                    topo.vertices.extend(l.iter().copied());
                }
                topo
            }
            Entry::Compound(children) => {
                let mut topo = Topology::default();
                for child in children {
                    topo.extend(self.topology(child)?);
                }
                topo
            }
        };
        Ok(topo.transformed(location))
    }

    fn bake(&self, shape: &Shape, t: &RigidTransform) -> Result<Entry, KernelError> {
        let full = t * shape.location();
        let entry = match self.entry(shape)? {
            Entry::Solid(pieces) => Entry::Solid(
                pieces
                    .iter()
                    .map(|p| Piece {
                        kind: p.kind.clone(),
                        placement: &full * &p.placement,
                    })
                    .collect(),
            ),
            Entry::Wire { points, closed } => Entry::Wire {
                points: points.iter().map(|p| full.transform_point(p)).collect(),
                closed: *closed,
            },
            Entry::Face { loops } => Entry::Face {
                loops: transform_loops(loops, &full),
            },
            Entry::Compound(children) => {
                Entry::Compound(children.iter().map(|c| c.moved(&full)).collect())
            }
        };
        Ok(entry)
    }

    fn components(&self, pieces: &[Piece]) -> Vec<Aabb> {
        let bounds: Vec<Aabb> = pieces.iter().filter_map(piece_bounds).collect();
        let tol = self.tolerance.confusion;

        // label propagation over the "touches" graph
        let mut label: Vec<usize> = (0..bounds.len()).collect();
        let mut changed = true;
        while changed {
            changed = false;
            for i in 0..bounds.len() {
                for j in (i + 1)..bounds.len() {
                    if label[i] != label[j] && bounds[i].touches(&bounds[j], tol) {
                        let low = label[i].min(label[j]);
                        label[i] = low;
                        label[j] = low;
                        changed = true;
                    }
                }
            }
        }

        let mut order: Vec<usize> = Vec::new();
        let mut merged: HashMap<usize, Aabb> = HashMap::new();
        for (b, l) in bounds.iter().zip(&label) {
            merged
                .entry(*l)
                .and_modify(|acc| {
                    acc.min = acc.min.inf(&b.min);
                    acc.max = acc.max.sup(&b.max);
                })
                .or_insert_with(|| {
                    order.push(*l);
                    *b
                });
        }
        order.iter().filter_map(|l| merged.get(l).copied()).collect()
    }
}

impl Kernel for MockKernel {
    fn make_box(&mut self, length: f64, width: f64, height: f64) -> Result<Shape, KernelError> {
        if length <= 0.0 || width <= 0.0 || height <= 0.0 {
            return Err(KernelError::PrimitiveFailed {
                reason: format!("box dimensions must be positive: {length} x {width} x {height}"),
            });
        }
        Ok(self.store(Entry::Solid(vec![Piece {
            kind: PieceKind::Box {
                length,
                width,
                height,
            },
            placement: RigidTransform::identity(),
        }])))
    }

    fn make_cylinder(
        &mut self,
        radius: f64,
        height: f64,
        angle: f64,
    ) -> Result<Shape, KernelError> {
        if radius <= 0.0 || height <= 0.0 {
            return Err(KernelError::PrimitiveFailed {
                reason: format!("cylinder dimensions must be positive: r={radius} h={height}"),
            });
        }
        if angle <= 0.0 || angle > TAU + self.tolerance.angular {
            return Err(KernelError::PrimitiveFailed {
                reason: format!("cylinder angle out of range: {angle}"),
            });
        }
        Ok(self.store(Entry::Solid(vec![Piece {
            kind: PieceKind::Cylinder {
                radius,
                height,
                angle: angle.min(TAU),
            },
            placement: RigidTransform::identity(),
        }])))
    }

    fn make_polygon(&mut self, points: &[Point3], closed: bool) -> Result<Shape, KernelError> {
        let needed = if closed { 3 } else { 2 };
        if points.len() < needed {
            return Err(KernelError::FaceFailed {
                reason: format!("polygon needs at least {needed} points"),
            });
        }
        Ok(self.store(Entry::Wire {
            points: points.to_vec(),
            closed,
        }))
    }

    fn make_compound(&mut self, shapes: &[Shape]) -> Result<Shape, KernelError> {
        for s in shapes {
            self.entry(s)?;
        }
        Ok(self.store(Entry::Compound(shapes.to_vec())))
    }

    fn make_face(&mut self, wires: &[Shape]) -> Result<Shape, KernelError> {
        let mut loops = Vec::new();
        for wire in wires.iter().flat_map(|w| self.wires(w)) {
            match self.bake(&wire, &RigidTransform::identity())? {
                Entry::Wire {
                    points,
                    closed: true,
                } => loops.push(points),
                Entry::Wire { closed: false, .. } => {
                    return Err(KernelError::FaceFailed {
                        reason: "wire is not closed".into(),
                    })
                }
                _ => {
                    return Err(KernelError::FaceFailed {
                        reason: "expected a wire".into(),
                    })
                }
            }
        }
        if loops.is_empty() {
            return Err(KernelError::FaceFailed {
                reason: "no wires given".into(),
            });
        }
        if loop_plane(&loops).is_none() {
            return Err(KernelError::FaceFailed {
                reason: "degenerate outer wire".into(),
            });
        }
        Ok(self.store(Entry::Face { loops }))
    }

    fn make_prism(&mut self, face: &Shape, vector: Vector3) -> Result<Shape, KernelError> {
        if vector.norm() < self.tolerance.confusion {
            return Err(KernelError::PrimitiveFailed {
                reason: "prism vector has zero length".into(),
            });
        }
        let loops = match self.bake(face, &RigidTransform::identity())? {
            Entry::Face { loops } => loops,
            _ => {
                return Err(KernelError::NotSupported {
                    operation: "prism of a non-face shape".into(),
                })
            }
        };
        Ok(self.store(Entry::Solid(vec![Piece {
            kind: PieceKind::Prism { loops, vector },
            placement: RigidTransform::identity(),
        }])))
    }

    fn boolean(
        &mut self,
        op: BooleanOp,
        argument: &Shape,
        tools: &[Shape],
    ) -> Result<Shape, KernelError> {
        self.boolean_calls.push(BooleanCall {
            op,
            tool_count: tools.len(),
        });
        if std::mem::take(&mut self.fail_next_boolean) {
            return Err(KernelError::BooleanFailed {
                reason: "solver did not converge".into(),
            });
        }

        let arg_pieces = self.placed_pieces(argument)?;
        let mut tool_pieces = Vec::new();
        for tool in tools {
            tool_pieces.extend(self.placed_pieces(tool)?);
        }
        let tol = self.tolerance.confusion;

        let result: Vec<Piece> = match op {
            BooleanOp::Fuse => arg_pieces.into_iter().chain(tool_pieces).collect(),
            BooleanOp::Cut => {
                let tool_bounds: Vec<Aabb> = tool_pieces.iter().filter_map(piece_bounds).collect();
                arg_pieces
                    .into_iter()
                    .filter(|p| match piece_bounds(p) {
                        Some(b) => !tool_bounds.iter().any(|t| t.contains(&b, tol)),
                        None => false,
                    })
                    .collect()
            }
            BooleanOp::Common => {
                let tool_bounds: Vec<Aabb> = tool_pieces.iter().filter_map(piece_bounds).collect();
                arg_pieces
                    .iter()
                    .filter_map(piece_bounds)
                    .flat_map(|a| {
                        tool_bounds
                            .iter()
                            .filter_map(move |t| a.intersection(t))
                            .collect::<Vec<_>>()
                    })
                    .map(|overlap| {
                        let size = overlap.size();
                        Piece {
                            kind: PieceKind::Box {
                                length: size.x,
                                width: size.y,
                                height: size.z,
                            },
                            placement: RigidTransform::translation(overlap.min.coords),
                        }
                    })
                    .collect()
            }
        };

        debug!(op = op.name(), tools = tools.len(), pieces = result.len(), "mock boolean");
        Ok(self.store(Entry::Solid(result)))
    }

    fn refine(&mut self, shape: &Shape) -> Result<Shape, KernelError> {
        self.refine_calls += 1;
        if self.fail_refine {
            return Err(KernelError::RefineFailed {
                reason: "could not merge faces".into(),
            });
        }
        let pieces = self.placed_pieces(shape)?;
        Ok(self.store(Entry::Solid(pieces)))
    }

    fn transform(
        &mut self,
        shape: &Shape,
        transform: &RigidTransform,
    ) -> Result<Shape, KernelError> {
        if self.fail_transform {
            return Err(KernelError::TransformFailed {
                reason: "geometry could not be transformed".into(),
            });
        }
        let entry = self.bake(shape, transform)?;
        Ok(self.store(entry))
    }
}

impl KernelIntrospect for MockKernel {
    fn is_null(&self, shape: &Shape) -> bool {
        match self.entries.get(&shape.id()) {
            None => true,
            Some(Entry::Solid(pieces)) => pieces.is_empty(),
            Some(Entry::Compound(children)) => children.iter().all(|c| self.is_null(c)),
            Some(_) => false,
        }
    }

    fn count_solids(&self, shape: &Shape) -> usize {
        self.solid_bounds(shape).len()
    }

    fn sub_shape(&self, shape: &Shape, name: &str) -> Result<SubShape, KernelError> {
        let not_found = || KernelError::SubShapeNotFound {
            name: name.to_string(),
        };
        let (kind, index) = parse_sub_name(name).ok_or_else(not_found)?;
        let topo = self.topology(shape)?;
        let sub = match kind {
            "Face" => topo.faces.get(index).copied().map(SubShape::Face),
            "Edge" => topo.edges.get(index).copied().map(SubShape::Edge),
            _ => topo.vertices.get(index).copied().map(SubShape::Vertex),
        };
        sub.ok_or_else(not_found)
    }

    fn wires(&self, shape: &Shape) -> Vec<Shape> {
        match self.entries.get(&shape.id()) {
            Some(Entry::Wire { .. }) => vec![*shape],
            Some(Entry::Compound(children)) => children
                .iter()
                .flat_map(|c| self.wires(&c.moved(shape.location())))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn solid_bounds(&self, shape: &Shape) -> Vec<Aabb> {
        match self.placed_pieces(shape) {
            Ok(pieces) => self.components(&pieces),
            Err(_) => Vec::new(),
        }
    }

    fn tolerance(&self) -> Tolerance {
        self.tolerance
    }
}

/// Split "Face12" into ("Face", 11). Numbering in names starts at 1.
fn parse_sub_name(name: &str) -> Option<(&'static str, usize)> {
    ["Face", "Edge", "Vertex"].into_iter().find_map(|kind| {
        let n: usize = name.strip_prefix(kind)?.parse().ok()?;
        n.checked_sub(1).map(|i| (kind, i))
    })
}

fn transform_loops(loops: &[Vec<Point3>], t: &RigidTransform) -> Vec<Vec<Point3>> {
    loops
        .iter()
        .map(|l| l.iter().map(|p| t.transform_point(p)).collect())
        .collect()
}

fn polyline_edges(points: &[Point3], closed: bool) -> Vec<EdgeGeometry> {
    let count = if closed {
        points.len()
    } else {
        points.len().saturating_sub(1)
    };
    (0..count)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % points.len()];
            Axis::try_new(a, b - a)
                .map(EdgeGeometry::Line)
                .unwrap_or(EdgeGeometry::Other)
        })
        .collect()
}

/// Plane of the outer loop (Newell normal), based at the loop centroid.
fn loop_plane(loops: &[Vec<Point3>]) -> Option<Plane> {
    let outer = loops.first()?;
    let mut normal = Vector3::zeros();
    for (i, a) in outer.iter().enumerate() {
        let b = outer[(i + 1) % outer.len()];
        normal += a.coords.cross(&b.coords);
    }
    let centroid = centroid(outer)?;
    Axis::try_new(centroid, normal).map(|axis| axis.as_plane_normal())
}

fn centroid(points: &[Point3]) -> Option<Point3> {
    if points.is_empty() {
        return None;
    }
    let sum = points
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords);
    Some(Point3::from(sum / points.len() as f64))
}

fn piece_points(kind: &PieceKind) -> Vec<Point3> {
    match kind {
        PieceKind::Box {
            length,
            width,
            height,
        } => box_corners(*length, *width, *height).to_vec(),
        PieceKind::Cylinder {
            radius,
            height,
            angle,
        } => {
            let steps = ((ARC_SAMPLES as f64 * angle / TAU).ceil() as usize).max(1);
            let mut points = Vec::with_capacity(2 * steps + 4);
            for k in 0..=steps {
                let a = angle * k as f64 / steps as f64;
                let (s, c) = a.sin_cos();
                points.push(Point3::new(radius * c, radius * s, 0.0));
                points.push(Point3::new(radius * c, radius * s, *height));
            }
            if *angle < TAU {
                points.push(Point3::origin());
                points.push(Point3::new(0.0, 0.0, *height));
            }
            points
        }
        PieceKind::Prism { loops, vector } => {
            let base = loops.first().cloned().unwrap_or_default();
            let top: Vec<Point3> = base.iter().map(|p| *p + *vector).collect();
            base.into_iter().chain(top).collect()
        }
    }
}

fn piece_bounds(piece: &Piece) -> Option<Aabb> {
    let points: Vec<Point3> = piece_points(&piece.kind)
        .iter()
        .map(|p| piece.placement.transform_point(p))
        .collect();
    Aabb::from_points(&points)
}

fn box_corners(l: f64, w: f64, h: f64) -> [Point3; 8] {
    [
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(l, 0.0, 0.0),
        Point3::new(l, w, 0.0),
        Point3::new(0.0, w, 0.0),
        Point3::new(0.0, 0.0, h),
        Point3::new(l, 0.0, h),
        Point3::new(l, w, h),
        Point3::new(0.0, w, h),
    ]
}

fn plane(base: Point3, normal: Vector3) -> FaceGeometry {
    Plane::new(base, nalgebra::Unit::new_normalize(normal)).into()
}

impl From<Plane> for FaceGeometry {
    fn from(p: Plane) -> Self {
        FaceGeometry::Plane(p)
    }
}

/// Boundary of a primitive in its own frame.
///
/// Box faces: -X, +X, -Y, +Y, -Z, +Z. Box edges: bottom loop, top loop,
/// then the four verticals. Cylinder faces: lateral, top, bottom, then the
/// two cut faces of a sector. Cylinder edges: top circle, seam, bottom circle.
/// Prism faces: one side per profile segment, then bottom, then top.
fn piece_topology(kind: &PieceKind) -> Topology {
    match kind {
        PieceKind::Box {
            length: l,
            width: w,
            height: h,
        } => {
            let (l, w, h) = (*l, *w, *h);
            let corners = box_corners(l, w, h);
            let faces = vec![
                plane(Point3::new(0.0, w / 2.0, h / 2.0), -Vector3::x()),
                plane(Point3::new(l, w / 2.0, h / 2.0), Vector3::x()),
                plane(Point3::new(l / 2.0, 0.0, h / 2.0), -Vector3::y()),
                plane(Point3::new(l / 2.0, w, h / 2.0), Vector3::y()),
                plane(Point3::new(l / 2.0, w / 2.0, 0.0), -Vector3::z()),
                plane(Point3::new(l / 2.0, w / 2.0, h), Vector3::z()),
            ];
            let mut edges = polyline_edges(&corners[0..4], true);
            edges.extend(polyline_edges(&corners[4..8], true));
            edges.extend((0..4).map(|i| EdgeGeometry::Line(Axis::new(corners[i], Vector3::z_axis()))));
            Topology {
                faces,
                edges,
                vertices: corners.to_vec(),
            }
        }
        PieceKind::Cylinder {
            radius,
            height,
            angle,
        } => {
            let (r, h, a) = (*radius, *height, *angle);
            let mut faces = vec![
                FaceGeometry::Other,
                plane(Point3::new(0.0, 0.0, h), Vector3::z()),
                plane(Point3::origin(), -Vector3::z()),
            ];
            let mut edges = vec![
                EdgeGeometry::Circle(Axis::new(Point3::new(0.0, 0.0, h), Vector3::z_axis())),
                EdgeGeometry::Line(Axis::new(Point3::new(r, 0.0, 0.0), Vector3::z_axis())),
                EdgeGeometry::Circle(Axis::z()),
            ];
            let mut vertices = vec![Point3::new(r, 0.0, h), Point3::new(r, 0.0, 0.0)];
            if a < TAU {
                let (s, c) = a.sin_cos();
                faces.push(plane(Point3::new(r / 2.0, 0.0, h / 2.0), -Vector3::y()));
                faces.push(plane(
                    Point3::new(r * c / 2.0, r * s / 2.0, h / 2.0),
                    Vector3::new(-s, c, 0.0),
                ));
                edges.push(EdgeGeometry::Line(Axis::z()));
                vertices.push(Point3::new(r * c, r * s, h));
                vertices.push(Point3::new(r * c, r * s, 0.0));
            }
            Topology {
                faces,
                edges,
                vertices,
            }
        }
        PieceKind::Prism { loops, vector } => {
            let mut topo = Topology::default();
            let sweep = nalgebra::Unit::new_normalize(*vector);
            for l in loops {
                for (i, a) in l.iter().enumerate() {
                    let b = l[(i + 1) % l.len()];
                    let mid = nalgebra::center(a, &b) + *vector / 2.0;
                    let n = (b - *a).cross(vector);
                    topo.faces.push(
                        Axis::try_new(mid, n)
                            .map(|axis| FaceGeometry::Plane(axis.as_plane_normal()))
                            .unwrap_or(FaceGeometry::Other),
                    );
                }
            }
            if let Some(cap) = loop_plane(loops) {
                let up = if cap.normal.dot(&sweep.into_inner()) >= 0.0 {
                    cap.normal
                } else {
                    nalgebra::Unit::new_unchecked(-cap.normal.into_inner())
                };
                let down = nalgebra::Unit::new_unchecked(-up.into_inner());
                topo.faces.push(FaceGeometry::Plane(Plane::new(cap.base, down)));
                topo.faces
                    .push(FaceGeometry::Plane(Plane::new(cap.base + *vector, up)));
            }
            for l in loops {
                let top: Vec<Point3> = l.iter().map(|p| *p + *vector).collect();
                topo.edges.extend(polyline_edges(l, true));
                topo.edges.extend(polyline_edges(&top, true));
                topo.edges
                    .extend(l.iter().map(|p| EdgeGeometry::Line(Axis::new(*p, sweep))));
                topo.vertices.extend(l.iter().copied());
                topo.vertices.extend(top);
            }
            topo
        }
    }
}
