use part_types::{BooleanOp, RigidTransform, Tolerance};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::kernel_ext::KernelBundle;
use crate::types::{OpError, ToolShape};

/// Box dimensions along X, Y and Z of the feature frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxParams {
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for BoxParams {
    fn default() -> Self {
        Self {
            length: 10.0,
            width: 10.0,
            height: 10.0,
        }
    }
}

/// Cylinder around the feature's Z axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CylinderParams {
    pub radius: f64,
    pub height: f64,
    /// Closing angle in degrees; below 360 gives a sector.
    pub angle: f64,
}

impl Default for CylinderParams {
    fn default() -> Self {
        Self {
            radius: 10.0,
            height: 10.0,
            angle: 360.0,
        }
    }
}

fn check_size(value: f64, what: &str, tol: &Tolerance) -> Result<(), OpError> {
    if value < tol.min_feature_size() {
        return Err(OpError::invalid(format!("{what} too small")));
    }
    Ok(())
}

/// Build the box in the feature frame and move it into the body frame.
#[instrument(skip(kb))]
pub fn box_tool_shape(
    kb: &mut dyn KernelBundle,
    params: &BoxParams,
    operation: BooleanOp,
    placement: &RigidTransform,
    tol: &Tolerance,
) -> Result<ToolShape, OpError> {
    check_size(params.length, "length of box", tol)?;
    check_size(params.width, "width of box", tol)?;
    check_size(params.height, "height of box", tol)?;

    let shape = kb.make_box(params.length, params.width, params.height)?;
    Ok(ToolShape::new(operation, kb.non_null(shape)?.moved(placement)))
}

#[instrument(skip(kb))]
pub fn cylinder_tool_shape(
    kb: &mut dyn KernelBundle,
    params: &CylinderParams,
    operation: BooleanOp,
    placement: &RigidTransform,
    tol: &Tolerance,
) -> Result<ToolShape, OpError> {
    check_size(params.radius, "radius of cylinder", tol)?;
    check_size(params.height, "height of cylinder", tol)?;
    if params.angle < tol.confusion {
        return Err(OpError::invalid("rotation angle of cylinder too small"));
    }
    if params.angle > 360.0 + tol.confusion {
        return Err(OpError::invalid("rotation angle of cylinder too large"));
    }

    let angle = params.angle.min(360.0).to_radians();
    let shape = kb.make_cylinder(params.radius, params.height, angle)?;
    Ok(ToolShape::new(operation, kb.non_null(shape)?.moved(placement)))
}
