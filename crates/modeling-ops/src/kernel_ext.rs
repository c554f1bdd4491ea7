use shape_kernel::{Kernel, KernelIntrospect, Shape};

use crate::types::OpError;

/// A kernel that can both build shapes and answer questions about them.
///
/// Ops take `&mut dyn KernelBundle` so a single object serves both roles
/// without juggling a `&mut` and a `&` borrow of the same value.
pub trait KernelBundle: Kernel + KernelIntrospect {
    fn as_introspect(&self) -> &dyn KernelIntrospect;

    /// Pass `shape` through unless the kernel reports it as null.
    fn non_null(&self, shape: Shape) -> Result<Shape, OpError> {
        if self.is_null(&shape) {
            Err(OpError::EmptyResult)
        } else {
            Ok(shape)
        }
    }

    /// Fail if `shape` holds more than one disjoint solid.
    fn single_solid(&self, shape: Shape) -> Result<Shape, OpError> {
        match self.count_solids(&shape) {
            count if count > 1 => Err(OpError::MultipleSolids { count }),
            _ => Ok(shape),
        }
    }
}

impl<T: Kernel + KernelIntrospect> KernelBundle for T {
    fn as_introspect(&self) -> &dyn KernelIntrospect {
        self
    }
}
