use serde::{Deserialize, Serialize};

use part_types::Tolerance;

/// Engine-wide settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Initial `refine` flag of newly created features.
    pub refine_by_default: bool,
    /// Overrides the kernel's tolerances when set.
    pub tolerance: Option<Tolerance>,
}
