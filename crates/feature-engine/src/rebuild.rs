use tracing::{info, instrument, warn};

use modeling_ops::{accumulate, KernelBundle};
use part_types::{Point3, RigidTransform};
use shape_kernel::Shape;

use crate::types::{BodyId, EngineError, FeatureId, FeatureKind, ProfileParams};
use crate::Engine;

impl Engine {
    /// Features whose results `id` reads: its body predecessor plus every
    /// linked object.
    pub fn dependencies(&self, id: FeatureId) -> Result<Vec<FeatureId>, EngineError> {
        let feature = self.feature(id)?;
        let mut deps = feature.kind.links();
        if let Some(body) = feature.body {
            deps.extend(self.body(body)?.predecessor(id));
        }
        Ok(deps)
    }

    /// True if `id` has never been recomputed, has edited parameters, sits
    /// on a different predecessor since then, or depends on something
    /// recomputed after it.
    pub fn must_execute(&self, id: FeatureId) -> Result<bool, EngineError> {
        let feature = self.feature(id)?;
        if feature.recomputed_at == 0 || !feature.touched().is_empty() {
            return Ok(true);
        }
        // moved within the body
        if feature.based_on != self.chain_predecessor(id) {
            return Ok(true);
        }
        let stale = self
            .dependencies(id)?
            .into_iter()
            .filter_map(|dep| self.features.get(dep))
            .any(|dep| dep.recomputed_at > feature.recomputed_at);
        Ok(stale)
    }

    /// Result of the previous feature in the body chain, or `None` for the
    /// first feature.
    pub fn base_shape(&self, id: FeatureId) -> Result<Option<Shape>, EngineError> {
        let feature = self.feature(id)?;
        let not_in_body = || EngineError::NotInBody {
            name: feature.name.clone(),
        };
        let body = self.body(feature.body.ok_or_else(not_in_body)?)?;
        if body.index_of(id).is_none() {
            return Err(not_in_body());
        }
        match body.predecessor(id) {
            None => Ok(None),
            Some(prev) => {
                let prev = self.feature(prev)?;
                prev.shape.map(Some).ok_or_else(|| EngineError::MissingShape {
                    name: prev.name.clone(),
                })
            }
        }
    }

    /// Recompute one feature. On failure the previous result and snapshot
    /// stay in place and the error is recorded on the feature.
    #[instrument(skip(self, kb))]
    pub fn recompute_feature(
        &mut self,
        kb: &mut dyn KernelBundle,
        id: FeatureId,
    ) -> Result<(), EngineError> {
        match self.execute(kb, id) {
            Ok(shape) => {
                match shape {
                    Some(shape) => self.store_result(id, shape),
                    None => self.store_empty_result(id),
                }
                info!(feature = %self.features[id].name, "feature recomputed");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, category = ?e.category(), "feature recompute failed");
                if let Some(feature) = self.features.get_mut(id) {
                    feature.error = Some(e.to_string());
                }
                Err(e)
            }
        }
    }

    /// Recompute, in order, every feature of the body that must execute,
    /// along with any stale profiles and datums they read. Stops at the
    /// first error. Returns how many features were recomputed.
    #[instrument(skip(self, kb))]
    pub fn recompute_body(
        &mut self,
        kb: &mut dyn KernelBundle,
        body: BodyId,
    ) -> Result<usize, EngineError> {
        let chain = self.body(body)?.features().to_vec();
        let mut count = 0;
        for id in chain {
            for dep in self.dependencies(id)? {
                let is_reference = self.features.get(dep).is_some_and(|f| {
                    matches!(
                        f.kind,
                        FeatureKind::Profile(_)
                            | FeatureKind::DatumPlane(_)
                            | FeatureKind::DatumLine(_)
                    )
                });
                if is_reference && self.must_execute(dep)? {
                    self.recompute_feature(kb, dep)?;
                    count += 1;
                }
            }
            if self.must_execute(id)? {
                self.recompute_feature(kb, id)?;
                count += 1;
            }
        }
        info!(body = %self.bodies[body].name, recomputed = count, "body recomputed");
        Ok(count)
    }

    fn execute(
        &mut self,
        kb: &mut dyn KernelBundle,
        id: FeatureId,
    ) -> Result<Option<Shape>, EngineError> {
        self.adopt_profile_placement(id)?;
        let feature = self.feature(id)?;
        match &feature.kind {
            FeatureKind::Profile(params) => {
                build_profile(kb, params, &feature.placement).map(Some)
            }
            FeatureKind::DatumPlane(_) | FeatureKind::DatumLine(_) => Ok(None),
            FeatureKind::Solid => feature
                .shape
                .map(Some)
                .ok_or_else(|| EngineError::MissingShape {
                    name: feature.name.clone(),
                }),
            _ => {
                if feature.body.is_none() {
                    return Err(EngineError::NotInBody {
                        name: feature.name.clone(),
                    });
                }
                let base = self.base_shape(id)?;
                let tools = self.tool_shapes(kb, id)?;
                Ok(Some(accumulate(
                    kb,
                    base,
                    &tools,
                    feature.refine,
                    &feature.placement,
                )?))
            }
        }
    }

    /// An extrude is built in its profile's frame.
    fn adopt_profile_placement(&mut self, id: FeatureId) -> Result<(), EngineError> {
        let FeatureKind::Extrude {
            profile: Some(link),
            ..
        } = &self.feature(id)?.kind
        else {
            return Ok(());
        };
        let profile = self.feature(link.object)?;
        if matches!(profile.kind, FeatureKind::Profile(_)) {
            let placement = profile.placement;
            self.feature_mut(id)?.placement = placement;
        }
        Ok(())
    }
}

/// Closed polygon wires of a profile, grouped and located at `placement`.
fn build_profile(
    kb: &mut dyn KernelBundle,
    params: &ProfileParams,
    placement: &RigidTransform,
) -> Result<Shape, EngineError> {
    let wires = params
        .loops
        .iter()
        .map(|points| {
            let points: Vec<Point3> = points.iter().map(|p| Point3::new(p.x, p.y, 0.0)).collect();
            kb.make_polygon(&points, true)
        })
        .collect::<Result<Vec<_>, _>>()?;
    let compound = kb.make_compound(&wires)?;
    Ok(compound.located(*placement))
}
