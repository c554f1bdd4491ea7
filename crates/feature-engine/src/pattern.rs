use tracing::debug;

use modeling_ops::{
    apply_mirror, apply_moved, extra_occurrences, linear_transforms, mirror_transform,
    polar_transforms, KernelBundle, OpError, ToolShape,
};
use part_types::BooleanOp;

use crate::types::{
    EngineError, FeatureId, LinearPatternParams, MirroredParams, PolarPatternParams,
};
use crate::Engine;

impl Engine {
    /// Every feature a pattern repeats, in order. A nested pattern is
    /// followed by its own inputs.
    pub fn gather_pattern_inputs(&self, id: FeatureId) -> Result<Vec<FeatureId>, EngineError> {
        let mut inputs = Vec::new();
        let mut path = vec![id];
        self.gather_into(id, &mut path, &mut inputs)?;
        Ok(inputs)
    }

    fn gather_into(
        &self,
        id: FeatureId,
        path: &mut Vec<FeatureId>,
        inputs: &mut Vec<FeatureId>,
    ) -> Result<(), EngineError> {
        for &input in self.feature(id)?.kind.pattern_features() {
            let feature = self.feature(input)?;
            if path.contains(&input) {
                return Err(EngineError::Cycle {
                    name: feature.name.clone(),
                });
            }
            inputs.push(input);
            if feature.kind.is_pattern() {
                path.push(input);
                self.gather_into(input, path, inputs)?;
                path.pop();
            }
        }
        Ok(())
    }

    /// Untransformed tool shapes of a pattern's inputs. A pattern without
    /// inputs repeats the whole base shape.
    fn pattern_inputs(
        &self,
        kb: &mut dyn KernelBundle,
        id: FeatureId,
    ) -> Result<Vec<ToolShape>, EngineError> {
        let inputs = self.gather_pattern_inputs(id)?;
        if inputs.is_empty() {
            let base = self.base_shape(id)?.ok_or(OpError::NoToolShapes)?;
            return Ok(vec![ToolShape::new(BooleanOp::Fuse, base)]);
        }

        let mut tools = Vec::new();
        for input in inputs {
            let feature = self.feature(input)?;
            if !feature.kind.provides_tool_shapes() {
                return Err(EngineError::NotPatternable {
                    name: feature.name.clone(),
                });
            }
            tools.extend(self.tool_shapes(kb, input)?);
        }
        Ok(tools)
    }

    pub(crate) fn mirrored_tools(
        &self,
        kb: &mut dyn KernelBundle,
        id: FeatureId,
        params: &MirroredParams,
    ) -> Result<Vec<ToolShape>, EngineError> {
        let tools = self.pattern_inputs(kb, id)?;
        let plane = self.resolve_mirror_plane(kb.as_introspect(), params.plane.as_ref())?;
        let mirror = mirror_transform(&plane, &self.feature(id)?.placement)?;
        debug!(?plane, tools = tools.len(), "mirroring");
        Ok(apply_mirror(kb, &tools, &mirror)?)
    }

    pub(crate) fn linear_pattern_tools(
        &self,
        kb: &mut dyn KernelBundle,
        id: FeatureId,
        params: &LinearPatternParams,
    ) -> Result<Vec<ToolShape>, EngineError> {
        let steps = extra_occurrences(params.spacing.occurrences)?;
        let tools = self.pattern_inputs(kb, id)?;
        if steps == 0 {
            return Ok(Vec::new());
        }

        let direction = self.resolve_direction(kb.as_introspect(), params.direction.as_ref())?;
        debug!(?direction, tools = tools.len(), "linear pattern direction");
        let tol = self.tolerance(kb.as_introspect());
        let transforms = linear_transforms(&direction, &params.spacing, &tol)?;
        Ok(apply_moved(&tools, &transforms))
    }

    pub(crate) fn polar_pattern_tools(
        &self,
        kb: &mut dyn KernelBundle,
        id: FeatureId,
        params: &PolarPatternParams,
    ) -> Result<Vec<ToolShape>, EngineError> {
        let steps = extra_occurrences(params.spacing.occurrences)?;
        let tools = self.pattern_inputs(kb, id)?;
        if steps == 0 {
            return Ok(Vec::new());
        }

        let axis = self.resolve_rotation_axis(kb.as_introspect(), params.axis.as_ref())?;
        debug!(?axis, tools = tools.len(), "polar pattern axis");
        let tol = self.tolerance(kb.as_introspect());
        let transforms = polar_transforms(&axis, &params.spacing, &tol)?;
        Ok(apply_moved(&tools, &transforms))
    }
}
