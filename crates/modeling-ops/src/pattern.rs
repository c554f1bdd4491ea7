//! Transformation rules for duplication features.
//!
//! Each rule turns resolved references plus spacing parameters into the
//! transforms of the extra occurrences. Occurrence 0 is the original and
//! never gets a transform.

use part_types::{Axis, Plane, RigidTransform, Tolerance, UnitVector3};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::kernel_ext::KernelBundle;
use crate::types::{OpError, ToolShape};

/// How a linear pattern spaces its occurrences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LinearMode {
    /// `length` is the span from the first to the last occurrence.
    #[default]
    Length,
    /// `offset` is the distance between neighbours.
    Offset,
}

/// How a polar pattern spaces its occurrences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PolarMode {
    /// `angle` is the total sweep (degrees).
    #[default]
    Angle,
    /// `offset` is the angle between neighbours (degrees).
    Offset,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearSpacing {
    pub mode: LinearMode,
    pub length: f64,
    pub offset: f64,
    pub reversed: bool,
    pub occurrences: i32,
}

impl Default for LinearSpacing {
    fn default() -> Self {
        Self {
            mode: LinearMode::Length,
            length: 100.0,
            offset: 10.0,
            reversed: false,
            occurrences: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolarSpacing {
    pub mode: PolarMode,
    /// Degrees.
    pub angle: f64,
    /// Degrees.
    pub offset: f64,
    pub reversed: bool,
    pub occurrences: i32,
}

impl Default for PolarSpacing {
    fn default() -> Self {
        Self {
            mode: PolarMode::Angle,
            angle: 360.0,
            offset: 120.0,
            reversed: false,
            occurrences: 3,
        }
    }
}

/// Number of transforms a pattern with `occurrences` copies produces.
pub fn extra_occurrences(occurrences: i32) -> Result<usize, OpError> {
    if occurrences < 1 {
        return Err(OpError::invalid("at least one occurrence required"));
    }
    Ok((occurrences - 1) as usize)
}

/// Reflection through `plane`, with the plane given in the body frame and
/// the result expressed in the frame of a feature placed at `placement`.
pub fn mirror_transform(
    plane: &Plane,
    placement: &RigidTransform,
) -> Result<RigidTransform, OpError> {
    let local = placement
        .inverse()
        .and_then(|inv| inv.transform_plane(plane))
        .ok_or_else(|| OpError::invalid("feature placement is not invertible"))?;
    Ok(RigidTransform::mirror(&local))
}

pub fn linear_transforms(
    direction: &UnitVector3,
    spacing: &LinearSpacing,
    tol: &Tolerance,
) -> Result<Vec<RigidTransform>, OpError> {
    let steps = extra_occurrences(spacing.occurrences)?;
    if steps == 0 {
        return Ok(Vec::new());
    }

    let distance = match spacing.mode {
        LinearMode::Length => {
            if spacing.length < tol.confusion {
                return Err(OpError::invalid("pattern length too small"));
            }
            spacing.length / steps as f64
        }
        LinearMode::Offset => {
            if tol.is_zero_length(spacing.offset) {
                return Err(OpError::invalid("pattern offset too small"));
            }
            spacing.offset
        }
    };

    let mut step = direction.into_inner() * distance;
    if spacing.reversed {
        step = -step;
    }
    debug!(?step, steps, "linear pattern");

    Ok((1..=steps)
        .map(|i| RigidTransform::translation(step * i as f64))
        .collect())
}

pub fn polar_transforms(
    axis: &Axis,
    spacing: &PolarSpacing,
    tol: &Tolerance,
) -> Result<Vec<RigidTransform>, OpError> {
    let steps = extra_occurrences(spacing.occurrences)?;
    if steps == 0 {
        return Ok(Vec::new());
    }

    let axis = if spacing.reversed {
        axis.reversed()
    } else {
        *axis
    };

    if spacing.mode == PolarMode::Angle && spacing.angle > 360.0 + tol.confusion {
        return Err(OpError::invalid("pattern angle too large"));
    }
    let degrees = match spacing.mode {
        // a full turn has no separate last occurrence: spread evenly
        PolarMode::Angle if (spacing.angle - 360.0).abs() < tol.confusion => {
            spacing.angle / spacing.occurrences as f64
        }
        PolarMode::Angle => spacing.angle / steps as f64,
        PolarMode::Offset => spacing.offset,
    };
    let step = degrees.to_radians();
    if step < tol.angular {
        return Err(OpError::invalid("pattern angle too small"));
    }
    debug!(step_degrees = degrees, steps, "polar pattern");

    Ok((1..=steps)
        .map(|i| RigidTransform::rotation(&axis, step * i as f64))
        .collect())
}

/// Move every tool by every transform, transform-major.
pub fn apply_moved(tools: &[ToolShape], transforms: &[RigidTransform]) -> Vec<ToolShape> {
    transforms
        .iter()
        .flat_map(|t| {
            tools
                .iter()
                .map(move |tool| ToolShape::new(tool.operation, tool.shape.moved(t)))
        })
        .collect()
}

/// Replace every tool with its mirror image. Mirroring flips handedness, so
/// the kernel rebuilds the geometry instead of relocating it.
pub fn apply_mirror(
    kb: &mut dyn KernelBundle,
    tools: &[ToolShape],
    mirror: &RigidTransform,
) -> Result<Vec<ToolShape>, OpError> {
    tools
        .iter()
        .map(|tool| {
            let shape = kb
                .transform(&tool.shape, mirror)
                .map_err(|e| OpError::TransformFailed {
                    reason: e.to_string(),
                })?;
            Ok(ToolShape::new(tool.operation, kb.non_null(shape)?))
        })
        .collect()
}
