use tracing::debug;

use modeling_ops::{
    box_tool_shape, cylinder_tool_shape, extrude_tool_shape, ExtrudeParams, KernelBundle,
    ToolShape,
};
use part_types::{BooleanOp, Tolerance, UnitVector3, Vector3};

use crate::types::{BooleanParams, EngineError, Feature, FeatureId, FeatureKind, LinkSub};
use crate::Engine;

impl Engine {
    /// Tool shapes feature `id` contributes, located in its body's frame.
    pub fn tool_shapes(
        &self,
        kb: &mut dyn KernelBundle,
        id: FeatureId,
    ) -> Result<Vec<ToolShape>, EngineError> {
        let feature = self.feature(id)?;
        let tol = self.tolerance(kb.as_introspect());
        let placement = feature.placement;

        let tools = match &feature.kind {
            FeatureKind::Box { params, operation } => {
                vec![box_tool_shape(kb, params, *operation, &placement, &tol)?]
            }
            FeatureKind::Cylinder { params, operation } => {
                vec![cylinder_tool_shape(kb, params, *operation, &placement, &tol)?]
            }
            FeatureKind::Extrude {
                profile,
                params,
                operation,
            } => vec![self.extrude_tool(kb, feature, profile.as_ref(), params, *operation, &tol)?],
            FeatureKind::Boolean { params, operation } => {
                vec![self.boolean_tool(feature, params, *operation)?]
            }
            FeatureKind::Mirrored(params) => self.mirrored_tools(kb, id, params)?,
            FeatureKind::LinearPattern(params) => self.linear_pattern_tools(kb, id, params)?,
            FeatureKind::PolarPattern(params) => self.polar_pattern_tools(kb, id, params)?,
            FeatureKind::Profile(_)
            | FeatureKind::DatumPlane(_)
            | FeatureKind::DatumLine(_)
            | FeatureKind::Solid => {
                return Err(EngineError::unsupported(format!(
                    "'{}' does not provide tool shapes",
                    feature.name
                )))
            }
        };
        debug!(feature = %feature.name, count = tools.len(), "tool shapes");
        Ok(tools)
    }

    fn extrude_tool(
        &self,
        kb: &mut dyn KernelBundle,
        feature: &Feature,
        profile: Option<&LinkSub>,
        params: &ExtrudeParams,
        operation: BooleanOp,
        tol: &Tolerance,
    ) -> Result<ToolShape, EngineError> {
        let link = profile.ok_or(EngineError::MissingReference { what: "profile" })?;
        let profile = self.feature(link.object)?;
        if !matches!(profile.kind, FeatureKind::Profile(_)) {
            return Err(EngineError::unsupported(format!(
                "extrude profile '{}' is not a profile",
                profile.name
            )));
        }
        let shape = profile.shape.ok_or_else(|| EngineError::MissingShape {
            name: profile.name.clone(),
        })?;

        let wires = kb.wires(&shape);
        let normal = UnitVector3::try_new(
            profile.placement.transform_vector(&Vector3::z()),
            f64::EPSILON,
        )
        .ok_or_else(|| EngineError::geometry("profile placement is degenerate"))?;

        Ok(extrude_tool_shape(
            kb,
            &wires,
            &normal,
            params,
            operation,
            &feature.placement,
            tol,
        )?)
    }

    /// The referenced solid, relocated either to where it sits relative to
    /// this feature's body or to this feature's placement.
    fn boolean_tool(
        &self,
        feature: &Feature,
        params: &BooleanParams,
        operation: BooleanOp,
    ) -> Result<ToolShape, EngineError> {
        let tool_id = params
            .tool
            .ok_or(EngineError::MissingReference { what: "boolean tool" })?;
        let tool = self.feature(tool_id)?;
        if matches!(
            tool.kind,
            FeatureKind::Profile(_) | FeatureKind::DatumPlane(_) | FeatureKind::DatumLine(_)
        ) {
            return Err(EngineError::unsupported(
                "cannot do boolean with anything but solid features",
            ));
        }
        let shape = tool.shape.ok_or_else(|| EngineError::MissingShape {
            name: tool.name.clone(),
        })?;

        let location = if params.use_tool_placement {
            let body = feature.body.ok_or_else(|| EngineError::NotInBody {
                name: feature.name.clone(),
            })?;
            let to_body = self
                .body(body)?
                .placement
                .inverse()
                .ok_or_else(|| EngineError::geometry("body placement is not invertible"))?;
            to_body * self.global_placement(tool_id)?
        } else {
            feature.placement
        };

        Ok(ToolShape::new(operation, shape.located(location)))
    }
}
