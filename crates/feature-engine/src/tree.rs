use serde::{Deserialize, Serialize};

use part_types::RigidTransform;

use crate::types::FeatureId;

/// An ordered chain of solid features sharing one accumulated shape.
///
/// Only features that provide tool shapes sit in the chain. Profiles and
/// datums may belong to a body without taking part in accumulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Body {
    pub name: String,
    /// Body-to-global transform.
    pub placement: RigidTransform,
    features: Vec<FeatureId>,
}

impl Body {
    pub fn new(name: String) -> Self {
        Self {
            name,
            placement: RigidTransform::identity(),
            features: Vec::new(),
        }
    }

    /// Solid features in accumulation order.
    pub fn features(&self) -> &[FeatureId] {
        &self.features
    }

    pub(crate) fn push(&mut self, id: FeatureId) {
        self.features.push(id);
    }

    pub fn index_of(&self, id: FeatureId) -> Option<usize> {
        self.features.iter().position(|f| *f == id)
    }

    /// The feature whose result is `id`'s base shape.
    pub fn predecessor(&self, id: FeatureId) -> Option<FeatureId> {
        match self.index_of(id)? {
            0 => None,
            i => Some(self.features[i - 1]),
        }
    }

    /// Last feature of the chain, whose result is the body shape.
    pub fn tip(&self) -> Option<FeatureId> {
        self.features.last().copied()
    }

    /// Move a feature to `new_pos`, clamped to the chain length.
    /// Returns false if the feature is not in this body.
    pub(crate) fn move_feature(&mut self, id: FeatureId, new_pos: usize) -> bool {
        let Some(old_pos) = self.index_of(id) else {
            return false;
        };
        let feature = self.features.remove(old_pos);
        let clamped = new_pos.min(self.features.len());
        self.features.insert(clamped, feature);
        true
    }
}
