use std::collections::BTreeMap;

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

use modeling_ops::{
    BoxParams, CylinderParams, ExtrudeParams, LinearSpacing, OpError, PolarSpacing,
};
use part_types::{BooleanOp, Point3, RigidTransform, Vector3};
use shape_kernel::{KernelError, Shape};

new_key_type! {
    /// Stable handle of a feature in the engine arena.
    pub struct FeatureId;
    /// Stable handle of a body in the engine arena.
    pub struct BodyId;
}

/// A link to another object, optionally narrowed to named sub-elements.
///
/// An empty `subnames` list and a list holding one empty name are different
/// references: the empty name selects a profile's normal axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSub {
    pub object: FeatureId,
    pub subnames: Vec<String>,
}

impl LinkSub {
    pub fn object(object: FeatureId) -> Self {
        Self {
            object,
            subnames: Vec::new(),
        }
    }

    pub fn sub(object: FeatureId, name: impl Into<String>) -> Self {
        Self {
            object,
            subnames: vec![name.into()],
        }
    }

    /// The first sub-element name, if any was given.
    pub fn first_sub(&self) -> Option<&str> {
        self.subnames.first().map(String::as_str)
    }
}

/// A construction line of a profile, in profile coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConstructionLine {
    pub start: Point2<f64>,
    pub end: Point2<f64>,
}

/// A planar 2D profile: closed polygons plus construction lines, placed
/// in the body by the feature placement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileParams {
    pub loops: Vec<Vec<Point2<f64>>>,
    pub construction: Vec<ConstructionLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatumPlaneParams {
    pub base: Point3,
    pub normal: Vector3,
}

impl Default for DatumPlaneParams {
    fn default() -> Self {
        Self {
            base: Point3::origin(),
            normal: Vector3::z(),
        }
    }
}

impl DatumPlaneParams {
    /// The XY plane of `placement`, baked into the parameters.
    ///
    /// The datum's own feature placement is applied on top when the plane is
    /// referenced, so leave it at identity for a datum built this way.
    pub fn from_placement(placement: &RigidTransform) -> Self {
        Self {
            base: Point3::from(placement.translation_part()),
            normal: placement.transform_vector(&Vector3::z()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatumLineParams {
    pub base: Point3,
    pub direction: Vector3,
}

impl Default for DatumLineParams {
    fn default() -> Self {
        Self {
            base: Point3::origin(),
            direction: Vector3::x(),
        }
    }
}

impl DatumLineParams {
    /// The X axis of `placement`, baked into the parameters.
    ///
    /// As with [`DatumPlaneParams::from_placement`], the datum's feature
    /// placement must stay at identity or it is applied twice.
    pub fn from_placement(placement: &RigidTransform) -> Self {
        Self {
            base: Point3::from(placement.translation_part()),
            direction: placement.transform_vector(&Vector3::x()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BooleanParams {
    pub tool: Option<FeatureId>,
    /// Place the tool where it sits globally instead of at this feature's placement.
    pub use_tool_placement: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MirroredParams {
    pub features: Vec<FeatureId>,
    pub plane: Option<LinkSub>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearPatternParams {
    pub features: Vec<FeatureId>,
    pub direction: Option<LinkSub>,
    pub spacing: LinearSpacing,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolarPatternParams {
    pub features: Vec<FeatureId>,
    pub axis: Option<LinkSub>,
    pub spacing: PolarSpacing,
}

/// What a feature is, with its typed parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FeatureKind {
    Profile(ProfileParams),
    DatumPlane(DatumPlaneParams),
    DatumLine(DatumLineParams),
    /// A solid-bearing object whose shape is supplied from outside.
    Solid,
    Box {
        params: BoxParams,
        operation: BooleanOp,
    },
    Cylinder {
        params: CylinderParams,
        operation: BooleanOp,
    },
    Extrude {
        profile: Option<LinkSub>,
        params: ExtrudeParams,
        operation: BooleanOp,
    },
    Boolean {
        params: BooleanParams,
        operation: BooleanOp,
    },
    Mirrored(MirroredParams),
    LinearPattern(LinearPatternParams),
    PolarPattern(PolarPatternParams),
}

impl FeatureKind {
    /// True for kinds that contribute tool shapes to a body.
    pub fn provides_tool_shapes(&self) -> bool {
        !matches!(
            self,
            FeatureKind::Profile(_)
                | FeatureKind::DatumPlane(_)
                | FeatureKind::DatumLine(_)
                | FeatureKind::Solid
        )
    }

    pub fn is_pattern(&self) -> bool {
        matches!(
            self,
            FeatureKind::Mirrored(_) | FeatureKind::LinearPattern(_) | FeatureKind::PolarPattern(_)
        )
    }

    /// Input features of a pattern; empty for everything else.
    pub fn pattern_features(&self) -> &[FeatureId] {
        match self {
            FeatureKind::Mirrored(p) => &p.features,
            FeatureKind::LinearPattern(p) => &p.features,
            FeatureKind::PolarPattern(p) => &p.features,
            _ => &[],
        }
    }

    /// Objects this kind reads while computing its tool shapes.
    pub fn links(&self) -> Vec<FeatureId> {
        let mut links: Vec<FeatureId> = self.pattern_features().to_vec();
        let reference = match self {
            FeatureKind::Extrude { profile, .. } => profile.as_ref(),
            FeatureKind::Mirrored(p) => p.plane.as_ref(),
            FeatureKind::LinearPattern(p) => p.direction.as_ref(),
            FeatureKind::PolarPattern(p) => p.axis.as_ref(),
            _ => None,
        };
        links.extend(reference.map(|l| l.object));
        if let FeatureKind::Boolean { params, .. } = self {
            links.extend(params.tool);
        }
        links
    }

    /// Tracked parameters, by name, for change detection.
    pub fn params(&self) -> Vec<(&'static str, ParamValue)> {
        use ParamValue as P;
        match self {
            FeatureKind::Profile(p) => vec![
                ("Loops", P::Points(p.loops.clone())),
                (
                    "Construction",
                    P::Points(
                        p.construction
                            .iter()
                            .map(|c| vec![c.start, c.end])
                            .collect(),
                    ),
                ),
            ],
            FeatureKind::DatumPlane(p) => vec![
                ("Base", P::Point(p.base)),
                ("Normal", P::Vector(Some(p.normal))),
            ],
            FeatureKind::DatumLine(p) => vec![
                ("Base", P::Point(p.base)),
                ("Direction", P::Vector(Some(p.direction))),
            ],
            FeatureKind::Solid => Vec::new(),
            FeatureKind::Box { params, operation } => vec![
                ("Length", P::Float(params.length)),
                ("Width", P::Float(params.width)),
                ("Height", P::Float(params.height)),
                ("Operation", P::Enum(operation.name().into())),
            ],
            FeatureKind::Cylinder { params, operation } => vec![
                ("Radius", P::Float(params.radius)),
                ("Height", P::Float(params.height)),
                ("Angle", P::Float(params.angle)),
                ("Operation", P::Enum(operation.name().into())),
            ],
            FeatureKind::Extrude {
                profile,
                params,
                operation,
            } => vec![
                ("Profile", P::Link(profile.clone())),
                ("Type", P::Enum(format!("{:?}", params.extrude_type))),
                ("Length", P::Float(params.length)),
                ("Length2", P::Float(params.length2)),
                ("Reversed", P::Bool(params.reversed)),
                ("Midplane", P::Bool(params.midplane)),
                ("Direction", P::Vector(params.direction)),
                ("Operation", P::Enum(operation.name().into())),
            ],
            FeatureKind::Boolean { params, operation } => vec![
                ("Tool", P::Links(params.tool.into_iter().collect())),
                ("UseToolPlacement", P::Bool(params.use_tool_placement)),
                ("Operation", P::Enum(operation.name().into())),
            ],
            FeatureKind::Mirrored(p) => vec![
                ("Features", P::Links(p.features.clone())),
                ("MirrorPlane", P::Link(p.plane.clone())),
            ],
            FeatureKind::LinearPattern(p) => vec![
                ("Features", P::Links(p.features.clone())),
                ("Direction", P::Link(p.direction.clone())),
                ("Mode", P::Enum(format!("{:?}", p.spacing.mode))),
                ("Length", P::Float(p.spacing.length)),
                ("Offset", P::Float(p.spacing.offset)),
                ("Reversed", P::Bool(p.spacing.reversed)),
                ("Occurrences", P::Int(p.spacing.occurrences.into())),
            ],
            FeatureKind::PolarPattern(p) => vec![
                ("Features", P::Links(p.features.clone())),
                ("Axis", P::Link(p.axis.clone())),
                ("Mode", P::Enum(format!("{:?}", p.spacing.mode))),
                ("Angle", P::Float(p.spacing.angle)),
                ("Offset", P::Float(p.spacing.offset)),
                ("Reversed", P::Bool(p.spacing.reversed)),
                ("Occurrences", P::Int(p.spacing.occurrences.into())),
            ],
        }
    }
}

/// Kinds the factory can construct with defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureType {
    Profile,
    DatumPlane,
    DatumLine,
    Box,
    Cylinder,
    Extrude,
    Boolean,
    Mirrored,
    LinearPattern,
    PolarPattern,
}

impl FeatureType {
    /// Base of generated feature names.
    pub fn base_name(&self) -> &'static str {
        match self {
            FeatureType::Profile => "Profile",
            FeatureType::DatumPlane => "DatumPlane",
            FeatureType::DatumLine => "DatumLine",
            FeatureType::Box => "Box",
            FeatureType::Cylinder => "Cylinder",
            FeatureType::Extrude => "Extrude",
            FeatureType::Boolean => "Boolean",
            FeatureType::Mirrored => "Mirrored",
            FeatureType::LinearPattern => "LinearPattern",
            FeatureType::PolarPattern => "PolarPattern",
        }
    }

    /// Parameters a freshly created feature starts with.
    pub fn default_kind(&self) -> FeatureKind {
        match self {
            FeatureType::Profile => FeatureKind::Profile(ProfileParams::default()),
            FeatureType::DatumPlane => FeatureKind::DatumPlane(DatumPlaneParams::default()),
            FeatureType::DatumLine => FeatureKind::DatumLine(DatumLineParams::default()),
            FeatureType::Box => FeatureKind::Box {
                params: BoxParams::default(),
                operation: BooleanOp::Fuse,
            },
            FeatureType::Cylinder => FeatureKind::Cylinder {
                params: CylinderParams::default(),
                operation: BooleanOp::Fuse,
            },
            FeatureType::Extrude => FeatureKind::Extrude {
                profile: None,
                params: ExtrudeParams::default(),
                operation: BooleanOp::Fuse,
            },
            FeatureType::Boolean => FeatureKind::Boolean {
                params: BooleanParams::default(),
                operation: BooleanOp::Fuse,
            },
            FeatureType::Mirrored => FeatureKind::Mirrored(MirroredParams::default()),
            FeatureType::LinearPattern => {
                FeatureKind::LinearPattern(LinearPatternParams::default())
            }
            FeatureType::PolarPattern => FeatureKind::PolarPattern(PolarPatternParams::default()),
        }
    }
}

/// A tracked parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Float(f64),
    Int(i64),
    Bool(bool),
    Enum(String),
    Point(Point3),
    Vector(Option<Vector3>),
    Points(Vec<Vec<Point2<f64>>>),
    Placement(RigidTransform),
    Link(Option<LinkSub>),
    Links(Vec<FeatureId>),
}

pub type ParamSnapshot = BTreeMap<&'static str, ParamValue>;

/// A single feature in the engine arena.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    /// User-visible name, unique within the engine.
    pub name: String,
    /// Owning body, if any.
    pub body: Option<BodyId>,
    /// Local-to-body transform.
    pub placement: RigidTransform,
    /// Clean up redundant edges after the boolean fold.
    pub refine: bool,
    pub kind: FeatureKind,

    /// Last valid result, located at `placement`. Runtime only.
    #[serde(skip)]
    pub(crate) shape: Option<Shape>,
    /// Parameter values at the last successful recompute.
    #[serde(skip)]
    pub(crate) snapshot: Option<ParamSnapshot>,
    /// Engine clock value of the last successful recompute; 0 means never.
    #[serde(skip)]
    pub(crate) recomputed_at: u64,
    /// Body predecessor the last successful recompute built on.
    #[serde(skip)]
    pub(crate) based_on: Option<FeatureId>,
    /// Message of the last failed recompute, cleared on success.
    #[serde(skip)]
    pub(crate) error: Option<String>,
}

impl Feature {
    pub(crate) fn new(name: String, body: Option<BodyId>, kind: FeatureKind, refine: bool) -> Self {
        Self {
            name,
            body,
            placement: RigidTransform::identity(),
            refine,
            kind,
            shape: None,
            snapshot: None,
            recomputed_at: 0,
            based_on: None,
            error: None,
        }
    }

    pub fn shape(&self) -> Option<&Shape> {
        self.shape.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Every tracked parameter, including placement and refine.
    pub fn params(&self) -> ParamSnapshot {
        let mut all: ParamSnapshot = self.kind.params().into_iter().collect();
        all.insert("Placement", ParamValue::Placement(self.placement));
        all.insert("Refine", ParamValue::Bool(self.refine));
        all
    }

    /// Names of parameters that differ from the last successful recompute.
    pub fn touched(&self) -> Vec<&'static str> {
        let current = self.params();
        match &self.snapshot {
            None => current.keys().copied().collect(),
            Some(snapshot) => current
                .iter()
                .filter(|(name, value)| snapshot.get(*name) != Some(*value))
                .map(|(name, _)| *name)
                .collect(),
        }
    }
}

/// Category of a failure, matching how callers react to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Missing or invalid references and parameters.
    Configuration,
    /// A reference resolved to geometry of the wrong kind.
    Geometry,
    /// The kernel failed or produced an unusable result.
    Kernel,
}

/// Errors from the feature engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("feature not found: {id:?}")]
    FeatureNotFound { id: FeatureId },

    #[error("body not found: {id:?}")]
    BodyNotFound { id: BodyId },

    #[error("cannot do boolean on feature '{name}' which is not in a body")]
    NotInBody { name: String },

    #[error("no {what} reference specified")]
    MissingReference { what: &'static str },

    #[error("{reason}")]
    UnsupportedReference { reason: String },

    #[error("unknown sub-element '{name}'")]
    UnknownSubElement { name: String },

    #[error("{reason}")]
    Geometry { reason: String },

    #[error("feature '{name}' has no valid shape")]
    MissingShape { name: String },

    #[error("pattern inputs form a cycle through '{name}'")]
    Cycle { name: String },

    #[error("only features with tool shapes can be patterned ('{name}' cannot)")]
    NotPatternable { name: String },

    #[error("operation error: {0}")]
    Op(#[from] OpError),

    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),
}

impl EngineError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EngineError::Geometry { .. } => ErrorCategory::Geometry,
            EngineError::Op(e) if e.is_configuration() => ErrorCategory::Configuration,
            EngineError::Op(_) | EngineError::Kernel(_) => ErrorCategory::Kernel,
            _ => ErrorCategory::Configuration,
        }
    }

    pub(crate) fn unsupported(reason: impl Into<String>) -> Self {
        EngineError::UnsupportedReference {
            reason: reason.into(),
        }
    }

    pub(crate) fn geometry(reason: impl Into<String>) -> Self {
        EngineError::Geometry {
            reason: reason.into(),
        }
    }
}
