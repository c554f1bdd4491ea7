pub mod boolean;
pub mod extrude;
pub mod kernel_ext;
pub mod pattern;
pub mod primitive;
pub mod types;

pub use boolean::accumulate;
pub use extrude::{extrude_tool_shape, ExtrudeParams, ExtrudeType};
pub use kernel_ext::KernelBundle;
pub use pattern::{
    apply_mirror, apply_moved, extra_occurrences, linear_transforms, mirror_transform,
    polar_transforms, LinearMode, LinearSpacing, PolarMode, PolarSpacing,
};
pub use primitive::{box_tool_shape, cylinder_tool_shape, BoxParams, CylinderParams};
pub use types::*;
