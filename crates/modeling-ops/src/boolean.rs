use part_types::{BooleanOp, RigidTransform};
use shape_kernel::Shape;
use tracing::{debug, instrument, warn};

use crate::kernel_ext::KernelBundle;
use crate::types::{OpError, ToolShape};

/// Fold a feature's tool shapes into the body's base shape.
///
/// `base` is the previous result (located in the body frame) or `None` for
/// the first feature of a body, in which case the first tool must be a fuse
/// and becomes the base. Consecutive tools with the same operation go to the
/// kernel in one boolean call. All boolean work happens in the base shape's
/// own frame; the result is then rebaked so that, located at `placement`, it
/// sits where the base sat in the body.
///
/// Returns the new base shape, located at `placement`.
#[instrument(skip(kb, base, tools), fields(tools = tools.len()))]
pub fn accumulate(
    kb: &mut dyn KernelBundle,
    base: Option<Shape>,
    tools: &[ToolShape],
    refine: bool,
    placement: &RigidTransform,
) -> Result<Shape, OpError> {
    let mut remaining = tools.iter().peekable();

    let base = match base {
        Some(shape) => shape,
        None => {
            let first = remaining.next().ok_or(OpError::NoToolShapes)?;
            if first.operation != BooleanOp::Fuse {
                return Err(OpError::NonFuseBase);
            }
            first.shape
        }
    };

    let base_to_body = *base.location();
    let body_to_base = base_to_body.inverse().ok_or_else(|| OpError::TransformFailed {
        reason: "base shape placement is not invertible".into(),
    })?;
    let mut result = base.located(RigidTransform::identity());

    while let Some(first) = remaining.next() {
        let op = first.operation;
        let mut group = vec![first.shape.moved(&body_to_base)];
        while let Some(next) = remaining.next_if(|t| t.operation == op) {
            group.push(next.shape.moved(&body_to_base));
        }
        debug!(op = op.name(), tools = group.len(), "boolean group");

        let shape = kb
            .boolean(op, &result, &group)
            .map_err(|e| OpError::BooleanFailed {
                op,
                reason: e.to_string(),
            })?;
        result = kb.non_null(shape)?;
    }

    if refine {
        match kb.refine(&result) {
            Ok(refined) => result = refined,
            Err(e) => warn!(error = %e, "refine failed, keeping unrefined result"),
        }
    }

    let result = kb.single_solid(result)?;

    let to_feature = placement
        .inverse()
        .ok_or_else(|| OpError::TransformFailed {
            reason: "feature placement is not invertible".into(),
        })?
        * base_to_body;
    let baked = kb
        .transform(&result, &to_feature)
        .map_err(|e| OpError::TransformFailed {
            reason: e.to_string(),
        })?;

    Ok(kb.non_null(baked)?.located(*placement))
}
