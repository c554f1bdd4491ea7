use part_types::BooleanOp;
use shape_kernel::Shape;

/// A feature's geometric contribution: a shape and how it combines with the body.
///
/// By the time a tool shape reaches the accumulator its shape is located in
/// the body's frame, not the producing feature's.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolShape {
    pub operation: BooleanOp,
    pub shape: Shape,
}

impl ToolShape {
    pub fn new(operation: BooleanOp, shape: Shape) -> Self {
        Self { operation, shape }
    }
}

/// Errors from modeling operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OpError {
    #[error("kernel error: {0}")]
    Kernel(#[from] shape_kernel::KernelError),

    #[error("invalid parameter: {reason}")]
    InvalidParameter { reason: String },

    #[error("no tool shape to derive base shape")]
    NoToolShapes,

    #[error("base shape cannot be derived from non-fuse tool shape")]
    NonFuseBase,

    #[error("{} operation failed: {reason}", op.name())]
    BooleanFailed { op: BooleanOp, reason: String },

    #[error("resulting shape is not a solid")]
    EmptyResult,

    #[error("result has multiple solids ({count}): that is not currently supported")]
    MultipleSolids { count: usize },

    #[error("transform operation failed: {reason}")]
    TransformFailed { reason: String },
}

impl OpError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        OpError::InvalidParameter {
            reason: reason.into(),
        }
    }

    /// True for errors caused by parameter values rather than by the kernel.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            OpError::InvalidParameter { .. } | OpError::NoToolShapes | OpError::NonFuseBase
        )
    }
}
