pub mod config;
pub mod pattern;
pub mod rebuild;
pub mod resolve;
pub mod tool_shapes;
pub mod tree;
pub mod types;

use slotmap::SlotMap;
use tracing::debug;

use part_types::{RigidTransform, Tolerance};
use shape_kernel::{KernelIntrospect, Shape};

pub use config::EngineConfig;
pub use tree::Body;
pub use types::*;

/// The feature composition engine.
///
/// Owns every feature and body in slotmap arenas. Features refer to each
/// other by id, never by pointer, so patterns of patterns and cross-body
/// boolean tools are plain data.
pub struct Engine {
    config: EngineConfig,
    features: SlotMap<FeatureId, Feature>,
    bodies: SlotMap<BodyId, Body>,
    /// Bumped on every successful recompute.
    clock: u64,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            features: SlotMap::with_key(),
            bodies: SlotMap::with_key(),
            clock: 0,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Tolerances in effect: the configured override or the kernel's own.
    pub fn tolerance(&self, kernel: &dyn KernelIntrospect) -> Tolerance {
        self.config.tolerance.unwrap_or_else(|| kernel.tolerance())
    }

    pub fn create_body(&mut self, name: impl Into<String>) -> BodyId {
        self.bodies.insert(Body::new(name.into()))
    }

    pub fn body(&self, id: BodyId) -> Result<&Body, EngineError> {
        self.bodies.get(id).ok_or(EngineError::BodyNotFound { id })
    }

    pub fn set_body_placement(
        &mut self,
        id: BodyId,
        placement: RigidTransform,
    ) -> Result<(), EngineError> {
        let body = self
            .bodies
            .get_mut(id)
            .ok_or(EngineError::BodyNotFound { id })?;
        body.placement = placement;
        Ok(())
    }

    /// Create a feature of type `ty` with default parameters in `body`.
    ///
    /// Solid features are appended to the body's chain; profiles and datums
    /// only record the body as their frame.
    pub fn create_feature(
        &mut self,
        body: BodyId,
        ty: FeatureType,
    ) -> Result<FeatureId, EngineError> {
        self.body(body)?;
        let id = self.insert(Some(body), ty);
        if self.features[id].kind.provides_tool_shapes() {
            self.bodies[body].push(id);
        }
        debug!(name = %self.features[id].name, "created feature");
        Ok(id)
    }

    /// Create a feature that belongs to no body.
    pub fn add_object(&mut self, ty: FeatureType) -> FeatureId {
        self.insert(None, ty)
    }

    /// Add a solid supplied from outside. Its placement is the shape's location.
    pub fn add_solid(&mut self, name: impl Into<String>, shape: Shape) -> FeatureId {
        let name = self.unique_name(&name.into());
        let mut feature = Feature::new(name, None, FeatureKind::Solid, false);
        feature.placement = *shape.location();
        let id = self.features.insert(feature);
        self.store_result(id, shape);
        id
    }

    /// Replace an outside solid's shape, marking it as freshly recomputed.
    pub fn set_solid_shape(&mut self, id: FeatureId, shape: Shape) -> Result<(), EngineError> {
        let feature = self.feature_mut(id)?;
        if feature.kind != FeatureKind::Solid {
            return Err(EngineError::unsupported(format!(
                "'{}' is not an outside solid",
                feature.name
            )));
        }
        feature.placement = *shape.location();
        self.store_result(id, shape);
        Ok(())
    }

    pub fn feature(&self, id: FeatureId) -> Result<&Feature, EngineError> {
        self.features.get(id).ok_or(EngineError::FeatureNotFound { id })
    }

    /// Mutable access for parameter edits. Edits are picked up by
    /// [`Engine::must_execute`] through the parameter snapshot.
    pub fn feature_mut(&mut self, id: FeatureId) -> Result<&mut Feature, EngineError> {
        self.features
            .get_mut(id)
            .ok_or(EngineError::FeatureNotFound { id })
    }

    pub fn feature_by_name(&self, name: &str) -> Option<FeatureId> {
        self.features
            .iter()
            .find(|(_, f)| f.name == name)
            .map(|(id, _)| id)
    }

    /// Reorder a solid feature within its body.
    pub fn move_feature(&mut self, id: FeatureId, new_pos: usize) -> Result<(), EngineError> {
        let feature = self.feature(id)?;
        let body = feature.body.ok_or_else(|| EngineError::NotInBody {
            name: feature.name.clone(),
        })?;
        if !self.bodies[body].move_feature(id, new_pos) {
            return Err(EngineError::NotInBody {
                name: self.features[id].name.clone(),
            });
        }
        Ok(())
    }

    /// Result of the body's last feature.
    pub fn body_shape(&self, id: BodyId) -> Result<Option<Shape>, EngineError> {
        let tip = self.body(id)?.tip();
        Ok(tip.and_then(|f| self.features.get(f)).and_then(|f| f.shape))
    }

    /// Feature-to-global transform: body placement times feature placement.
    pub fn global_placement(&self, id: FeatureId) -> Result<RigidTransform, EngineError> {
        let feature = self.feature(id)?;
        Ok(match feature.body {
            Some(body) => self.body(body)?.placement * feature.placement,
            None => feature.placement,
        })
    }

    fn insert(&mut self, body: Option<BodyId>, ty: FeatureType) -> FeatureId {
        let name = self.unique_name(ty.base_name());
        let feature = Feature::new(name, body, ty.default_kind(), self.config.refine_by_default);
        self.features.insert(feature)
    }

    /// `base` if unused, otherwise `base` with the first free three-digit suffix.
    fn unique_name(&self, base: &str) -> String {
        let taken = |name: &str| self.features.values().any(|f| f.name == name);
        if !taken(base) {
            return base.to_string();
        }
        (1..)
            .map(|n| format!("{base}{n:03}"))
            .find(|name| !taken(name))
            .unwrap_or_else(|| base.to_string())
    }

    /// Previous feature in the body chain of `id`, if any.
    pub(crate) fn chain_predecessor(&self, id: FeatureId) -> Option<FeatureId> {
        self.features
            .get(id)
            .and_then(|f| f.body)
            .and_then(|body| self.bodies.get(body))
            .and_then(|body| body.predecessor(id))
    }

    /// Record a successful result and advance the clock.
    pub(crate) fn store_result(&mut self, id: FeatureId, shape: Shape) {
        self.store_empty_result(id);
        if let Some(feature) = self.features.get_mut(id) {
            feature.shape = Some(shape);
        }
    }

    /// Record a successful recompute that yields no shape.
    pub(crate) fn store_empty_result(&mut self, id: FeatureId) {
        self.clock += 1;
        let clock = self.clock;
        let based_on = self.chain_predecessor(id);
        if let Some(feature) = self.features.get_mut(id) {
            feature.snapshot = Some(feature.params());
            feature.recomputed_at = clock;
            feature.based_on = based_on;
            feature.error = None;
        }
    }
}
