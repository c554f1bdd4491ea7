pub mod geom;
pub mod op;
pub mod tolerance;
pub mod transform;

pub use geom::*;
pub use op::*;
pub use tolerance::*;
pub use transform::*;
