use serde::{Deserialize, Serialize};

/// How a tool shape is combined with the accumulated body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BooleanOp {
    /// Add the tool to the body.
    #[default]
    Fuse,
    /// Remove the tool from the body.
    Cut,
    /// Keep only the region shared by body and tool.
    Common,
}

impl BooleanOp {
    pub fn name(&self) -> &'static str {
        match self {
            BooleanOp::Fuse => "Fuse",
            BooleanOp::Cut => "Cut",
            BooleanOp::Common => "Common",
        }
    }
}
