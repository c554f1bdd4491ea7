//! Reference resolution: turn a link to another object into the plane,
//! direction or axis a pattern needs, in the body frame.

use part_types::{Axis, Plane, Point3, RigidTransform, UnitVector3, Vector3};
use shape_kernel::{EdgeGeometry, FaceGeometry, KernelError, KernelIntrospect, Shape, SubShape};

use crate::types::{EngineError, FeatureKind, LinkSub, ProfileParams};
use crate::Engine;

/// What a link points at, classified once before any geometry is derived.
#[derive(Debug)]
pub(crate) enum RefTarget<'a> {
    Profile {
        params: &'a ProfileParams,
        placement: RigidTransform,
        shape: Option<Shape>,
        sub: Option<&'a str>,
    },
    DatumPlane(Plane),
    DatumLine(Axis),
    Solid {
        shape: Shape,
        sub: Option<&'a str>,
    },
}

/// A profile axis in profile coordinates. `direction` keeps the length of
/// construction lines.
#[derive(Debug, Clone, Copy)]
struct LocalAxis {
    base: Point3,
    direction: Vector3,
}

impl LocalAxis {
    fn h() -> Self {
        Self {
            base: Point3::origin(),
            direction: Vector3::x(),
        }
    }

    fn v() -> Self {
        Self {
            base: Point3::origin(),
            direction: Vector3::y(),
        }
    }

    fn n() -> Self {
        Self {
            base: Point3::origin(),
            direction: Vector3::z(),
        }
    }

    /// Express in the body frame, normalizing the direction.
    fn placed(&self, placement: &RigidTransform) -> Result<Axis, EngineError> {
        Axis::try_new(
            placement.transform_point(&self.base),
            placement.transform_vector(&self.direction),
        )
        .ok_or_else(|| EngineError::geometry("profile axis has zero length"))
    }
}

/// "H_Axis", "V_Axis", "N_Axis" or a construction line "AxisN" (from 0).
fn profile_axis(params: &ProfileParams, name: &str) -> Result<LocalAxis, EngineError> {
    match name {
        "H_Axis" => Ok(LocalAxis::h()),
        "V_Axis" => Ok(LocalAxis::v()),
        "N_Axis" => Ok(LocalAxis::n()),
        _ => {
            let line = name
                .strip_prefix("Axis")
                .and_then(|n| n.parse::<usize>().ok())
                .and_then(|i| params.construction.get(i))
                .ok_or_else(|| EngineError::UnknownSubElement {
                    name: name.to_string(),
                })?;
            let start = Point3::new(line.start.x, line.start.y, 0.0);
            let end = Point3::new(line.end.x, line.end.y, 0.0);
            Ok(LocalAxis {
                base: start,
                direction: end - start,
            })
        }
    }
}

fn is_edge_name(name: &str) -> bool {
    name.strip_prefix("Edge")
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

/// Look up a named sub-element, reporting unknown names as such.
fn sub_shape(
    kernel: &dyn KernelIntrospect,
    shape: &Shape,
    name: &str,
) -> Result<SubShape, EngineError> {
    kernel.sub_shape(shape, name).map_err(|e| match e {
        KernelError::SubShapeNotFound { name } => EngineError::UnknownSubElement { name },
        other => EngineError::Kernel(other),
    })
}

/// A sub-element name is required: both an empty list and an empty name
/// leave nothing to select on a solid.
fn required_sub<'a>(sub: Option<&'a str>, what: &'static str) -> Result<&'a str, EngineError> {
    match sub {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Err(EngineError::MissingReference { what }),
    }
}

impl Engine {
    pub(crate) fn classify<'a>(&'a self, link: &'a LinkSub) -> Result<RefTarget<'a>, EngineError> {
        let feature = self.feature(link.object)?;
        let sub = link.first_sub();
        let placement = feature.placement;
        match &feature.kind {
            FeatureKind::Profile(params) => Ok(RefTarget::Profile {
                params,
                placement,
                shape: feature.shape,
                sub,
            }),
            FeatureKind::DatumPlane(p) => {
                let normal = UnitVector3::try_new(p.normal, f64::EPSILON)
                    .ok_or_else(|| EngineError::geometry("datum plane normal has zero length"))?;
                placement
                    .transform_plane(&Plane::new(p.base, normal))
                    .map(RefTarget::DatumPlane)
                    .ok_or_else(|| EngineError::geometry("datum plane normal has zero length"))
            }
            FeatureKind::DatumLine(p) => Axis::try_new(p.base, p.direction)
                .and_then(|axis| placement.transform_axis(&axis))
                .map(RefTarget::DatumLine)
                .ok_or_else(|| EngineError::geometry("datum line direction has zero length")),
            _ => {
                let shape = feature.shape.ok_or_else(|| EngineError::MissingShape {
                    name: feature.name.clone(),
                })?;
                Ok(RefTarget::Solid { shape, sub })
            }
        }
    }

    /// Plane a mirror reflects through.
    ///
    /// On a profile, "H_Axis" mirrors across the horizontal axis (the plane
    /// normal is the vertical axis) and vice versa; an empty name or
    /// "N_Axis" selects the profile plane itself. A construction line
    /// "AxisN" mirrors across itself.
    pub fn resolve_mirror_plane(
        &self,
        kernel: &dyn KernelIntrospect,
        link: Option<&LinkSub>,
    ) -> Result<Plane, EngineError> {
        let link = link.ok_or(EngineError::MissingReference {
            what: "mirror plane",
        })?;
        match self.classify(link)? {
            RefTarget::Profile {
                params,
                placement,
                sub,
                ..
            } => {
                let name = sub.ok_or(EngineError::MissingReference {
                    what: "mirror plane",
                })?;
                let normal = match name {
                    "" | "N_Axis" => LocalAxis::n(),
                    "H_Axis" => LocalAxis::v(),
                    "V_Axis" => LocalAxis::h(),
                    // construction line: the plane through its midpoint,
                    // perpendicular to it within the sketch
                    _ if name.starts_with("Axis") => {
                        let line = profile_axis(params, name)?;
                        let d = line.direction;
                        LocalAxis {
                            base: line.base + d * 0.5,
                            direction: Vector3::new(-d.y, d.x, d.z),
                        }
                    }
                    _ => {
                        return Err(EngineError::UnknownSubElement {
                            name: name.to_string(),
                        })
                    }
                };
                Ok(normal.placed(&placement)?.as_plane_normal())
            }
            RefTarget::DatumPlane(plane) => Ok(plane),
            RefTarget::DatumLine(_) => Err(EngineError::unsupported(
                "mirror plane reference must be a profile axis, a face or a datum plane",
            )),
            RefTarget::Solid { shape, sub } => {
                let name = required_sub(sub, "mirror plane")?;
                match sub_shape(kernel, &shape, name)? {
                    SubShape::Face(FaceGeometry::Plane(plane)) => Ok(plane),
                    SubShape::Face(FaceGeometry::Other) => {
                        Err(EngineError::geometry("mirror face must be planar"))
                    }
                    other => Err(EngineError::geometry(format!(
                        "mirror plane reference must be a face, not {}",
                        other.kind_name()
                    ))),
                }
            }
        }
    }

    /// Direction a linear pattern steps along.
    pub fn resolve_direction(
        &self,
        kernel: &dyn KernelIntrospect,
        link: Option<&LinkSub>,
    ) -> Result<UnitVector3, EngineError> {
        let link = link.ok_or(EngineError::MissingReference { what: "direction" })?;
        match self.classify(link)? {
            RefTarget::Profile {
                params,
                placement,
                shape,
                sub,
            } => {
                let name = sub.ok_or(EngineError::MissingReference { what: "direction" })?;
                if is_edge_name(name) {
                    // profile shapes are already located in the body frame
                    let shape = shape.ok_or_else(|| EngineError::MissingShape {
                        name: self.features[link.object].name.clone(),
                    })?;
                    return match sub_shape(kernel, &shape, name)? {
                        SubShape::Edge(EdgeGeometry::Line(axis)) => Ok(axis.direction),
                        _ => Err(EngineError::geometry(
                            "direction edge must be a straight line",
                        )),
                    };
                }
                Ok(profile_axis(params, name)?.placed(&placement)?.direction)
            }
            RefTarget::DatumPlane(plane) => Ok(plane.normal),
            RefTarget::DatumLine(axis) => Ok(axis.direction),
            RefTarget::Solid { shape, sub } => {
                let name = required_sub(sub, "direction")?;
                match sub_shape(kernel, &shape, name)? {
                    SubShape::Face(FaceGeometry::Plane(plane)) => Ok(plane.normal),
                    SubShape::Face(FaceGeometry::Other) => {
                        Err(EngineError::geometry("direction face must be planar"))
                    }
                    SubShape::Edge(EdgeGeometry::Line(axis)) => Ok(axis.direction),
                    SubShape::Edge(_) => Err(EngineError::geometry(
                        "direction edge must be a straight line",
                    )),
                    SubShape::Vertex(_) => Err(EngineError::geometry(
                        "direction reference must be edge or face",
                    )),
                }
            }
        }
    }

    /// Axis a polar pattern rotates about.
    pub fn resolve_rotation_axis(
        &self,
        kernel: &dyn KernelIntrospect,
        link: Option<&LinkSub>,
    ) -> Result<Axis, EngineError> {
        let link = link.ok_or(EngineError::MissingReference { what: "axis" })?;
        match self.classify(link)? {
            RefTarget::Profile {
                params,
                placement,
                sub,
                ..
            } => {
                let name = sub.ok_or(EngineError::MissingReference { what: "axis" })?;
                profile_axis(params, name)?.placed(&placement)
            }
            RefTarget::DatumLine(axis) => Ok(axis),
            RefTarget::DatumPlane(_) => Err(EngineError::unsupported(
                "axis reference must be a profile axis, an edge or a datum line",
            )),
            RefTarget::Solid { shape, sub } => {
                let name = required_sub(sub, "axis")?;
                match sub_shape(kernel, &shape, name)? {
                    SubShape::Edge(EdgeGeometry::Line(axis))
                    | SubShape::Edge(EdgeGeometry::Circle(axis)) => Ok(axis),
                    SubShape::Edge(EdgeGeometry::Other) => Err(EngineError::geometry(
                        "rotation edge must be a straight line, circle or arc of circle",
                    )),
                    _ => Err(EngineError::geometry("axis reference must be an edge")),
                }
            }
        }
    }
}
