use nalgebra::Unit;
use part_types::{BooleanOp, RigidTransform, Tolerance, UnitVector3, Vector3};
use serde::{Deserialize, Serialize};
use shape_kernel::Shape;
use tracing::{debug, instrument};

use crate::kernel_ext::KernelBundle;
use crate::types::{OpError, ToolShape};

/// How the extrusion length is specified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExtrudeType {
    /// One length in the sweep direction.
    #[default]
    Length,
    /// `length` forward plus `length2` backward.
    TwoLengths,
}

/// Parameters for an extrude operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtrudeParams {
    pub extrude_type: ExtrudeType,
    pub length: f64,
    pub length2: f64,
    pub reversed: bool,
    /// Symmetric to the profile plane. Only used with `ExtrudeType::Length`.
    pub midplane: bool,
    /// Sweep direction in the body frame. `None` uses the profile normal.
    pub direction: Option<Vector3>,
}

impl Default for ExtrudeParams {
    fn default() -> Self {
        Self {
            extrude_type: ExtrudeType::Length,
            length: 10.0,
            length2: 10.0,
            reversed: false,
            midplane: false,
            direction: None,
        }
    }
}

/// Signed sweep length and the shift applied to the face before sweeping,
/// both measured along the sweep direction.
fn sweep_span(params: &ExtrudeParams, factor: f64) -> (f64, f64) {
    let l = params.length / factor;
    let l2 = params.length2 / factor;
    match params.extrude_type {
        ExtrudeType::TwoLengths => {
            let shift = if params.reversed { -l } else { -l2 };
            (l + l2, shift)
        }
        ExtrudeType::Length if params.midplane => (l, -l / 2.0),
        ExtrudeType::Length if params.reversed => (-l, 0.0),
        ExtrudeType::Length => (l, 0.0),
    }
}

/// Face the profile wires and sweep them into a prism.
///
/// `wires` and `profile_normal` are in the body frame. The prism is built in
/// the feature frame and returned located in the body frame.
#[instrument(skip(kb, wires))]
pub fn extrude_tool_shape(
    kb: &mut dyn KernelBundle,
    wires: &[Shape],
    profile_normal: &UnitVector3,
    params: &ExtrudeParams,
    operation: BooleanOp,
    placement: &RigidTransform,
    tol: &Tolerance,
) -> Result<ToolShape, OpError> {
    if wires.is_empty() {
        return Err(OpError::invalid("linked shape object is not a wire"));
    }

    let direction = match params.direction {
        Some(v) => Unit::try_new(v, tol.confusion)
            .ok_or_else(|| OpError::invalid("extrude direction has zero length"))?,
        None => *profile_normal,
    };

    // Lengths are measured along the profile normal, not along the sweep.
    let factor = direction.dot(&profile_normal.into_inner()).abs();
    if factor < tol.confusion {
        return Err(OpError::invalid(
            "extrude direction is orthogonal to the profile normal",
        ));
    }

    let (total, shift) = sweep_span(params, factor);
    if tol.is_zero_length(total) {
        return Err(OpError::invalid("cannot create an extrude with a height of zero"));
    }

    let to_local = placement
        .inverse()
        .ok_or_else(|| OpError::invalid("feature placement is not invertible"))?;
    let dir = to_local.transform_vector(&direction);

    let face = kb.make_face(wires)?.moved(&to_local);
    let from = if shift != 0.0 {
        face.moved(&RigidTransform::translation(dir * shift))
    } else {
        face
    };
    debug!(total, shift, "extrude sweep");

    let prism = kb.make_prism(&from, dir * total)?;
    let prism = kb.non_null(prism)?;
    Ok(ToolShape::new(operation, prism.moved(placement)))
}
