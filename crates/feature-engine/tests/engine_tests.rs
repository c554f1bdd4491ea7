use approx::assert_relative_eq;
use feature_engine::*;
use modeling_ops::{OpError, PolarSpacing};
use nalgebra::Point2;
use part_types::{BooleanOp, Point3, RigidTransform, Vector3};
use shape_kernel::{Aabb, Kernel, KernelIntrospect, MockKernel};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("feature_engine=debug,modeling_ops=debug")
        .try_init();
}

fn setup() -> (Engine, MockKernel, BodyId) {
    init_tracing();
    let mut engine = Engine::default();
    let body = engine.create_body("Body");
    (engine, MockKernel::new(), body)
}

fn edit(engine: &mut Engine, id: FeatureId, f: impl FnOnce(&mut FeatureKind)) {
    f(&mut engine.feature_mut(id).unwrap().kind);
}

fn add_box(engine: &mut Engine, body: BodyId) -> FeatureId {
    engine.create_feature(body, FeatureType::Box).unwrap()
}

fn set_box_length(engine: &mut Engine, id: FeatureId, length: f64) {
    edit(engine, id, |kind| {
        if let FeatureKind::Box { params, .. } = kind {
            params.length = length;
        }
    });
}

fn set_operation(engine: &mut Engine, id: FeatureId, op: BooleanOp) {
    edit(engine, id, |kind| match kind {
        FeatureKind::Box { operation, .. }
        | FeatureKind::Cylinder { operation, .. }
        | FeatureKind::Extrude { operation, .. }
        | FeatureKind::Boolean { operation, .. } => *operation = op,
        _ => {}
    });
}

/// A datum line along +X through the body origin.
fn x_line(engine: &mut Engine, body: BodyId) -> FeatureId {
    engine.create_feature(body, FeatureType::DatumLine).unwrap()
}

fn linear_pattern(
    engine: &mut Engine,
    body: BodyId,
    features: Vec<FeatureId>,
    direction: Option<LinkSub>,
    length: f64,
    occurrences: i32,
) -> FeatureId {
    let id = engine.create_feature(body, FeatureType::LinearPattern).unwrap();
    edit(engine, id, |kind| {
        if let FeatureKind::LinearPattern(p) = kind {
            p.features = features;
            p.direction = direction;
            p.spacing.length = length;
            p.spacing.occurrences = occurrences;
        }
    });
    id
}

fn mirrored(
    engine: &mut Engine,
    body: BodyId,
    features: Vec<FeatureId>,
    plane: LinkSub,
) -> FeatureId {
    let id = engine.create_feature(body, FeatureType::Mirrored).unwrap();
    edit(engine, id, |kind| {
        if let FeatureKind::Mirrored(p) = kind {
            p.features = features;
            p.plane = Some(plane);
        }
    });
    id
}

fn square_profile(engine: &mut Engine, body: BodyId, size: f64) -> FeatureId {
    let id = engine.create_feature(body, FeatureType::Profile).unwrap();
    edit(engine, id, |kind| {
        if let FeatureKind::Profile(p) = kind {
            p.loops = vec![vec![
                Point2::new(0.0, 0.0),
                Point2::new(size, 0.0),
                Point2::new(size, size),
                Point2::new(0.0, size),
            ]];
        }
    });
    id
}

fn body_bounds(engine: &Engine, kernel: &MockKernel, body: BodyId) -> Vec<Aabb> {
    let shape = engine.body_shape(body).unwrap().expect("body has a shape");
    kernel.solid_bounds(&shape)
}

// ── Factory Tests ──────────────────────────────────────────────────────────

#[test]
fn created_features_get_unique_names() {
    let (mut engine, _, body) = setup();
    let a = add_box(&mut engine, body);
    let b = add_box(&mut engine, body);
    let c = add_box(&mut engine, body);
    let cyl = engine.create_feature(body, FeatureType::Cylinder).unwrap();

    assert_eq!(engine.feature(a).unwrap().name, "Box");
    assert_eq!(engine.feature(b).unwrap().name, "Box001");
    assert_eq!(engine.feature(c).unwrap().name, "Box002");
    assert_eq!(engine.feature(cyl).unwrap().name, "Cylinder");
    assert_eq!(engine.feature_by_name("Box001"), Some(b));
}

#[test]
fn created_features_carry_defaults() {
    init_tracing();
    let mut engine = Engine::new(EngineConfig {
        refine_by_default: true,
        tolerance: None,
    });
    let body = engine.create_body("Body");
    let pattern = engine.create_feature(body, FeatureType::PolarPattern).unwrap();
    let feature = engine.feature(pattern).unwrap();

    assert!(feature.refine);
    assert!(feature.shape().is_none());
    match &feature.kind {
        FeatureKind::PolarPattern(p) => {
            assert_eq!(p.spacing, PolarSpacing::default());
            assert_relative_eq!(p.spacing.angle, 360.0);
            assert_eq!(p.spacing.occurrences, 3);
        }
        other => panic!("unexpected kind {other:?}"),
    }
}

#[test]
fn reference_objects_stay_out_of_the_chain() {
    let (mut engine, _, body) = setup();
    let profile = square_profile(&mut engine, body, 10.0);
    let line = x_line(&mut engine, body);
    let b = add_box(&mut engine, body);

    assert_eq!(engine.body(body).unwrap().features(), &[b]);
    assert_eq!(engine.feature(profile).unwrap().body, Some(body));
    assert_eq!(engine.feature(line).unwrap().body, Some(body));
}

#[test]
fn create_feature_in_unknown_body_fails() {
    let mut engine = Engine::default();
    let err = engine
        .create_feature(BodyId::default(), FeatureType::Box)
        .unwrap_err();
    assert!(matches!(err, EngineError::BodyNotFound { .. }));
}

#[test]
fn move_feature_reorders_chain() {
    let (mut engine, _, body) = setup();
    let a = add_box(&mut engine, body);
    let b = add_box(&mut engine, body);
    engine.move_feature(b, 0).unwrap();
    assert_eq!(engine.body(body).unwrap().features(), &[b, a]);
    assert_eq!(engine.base_shape(b).unwrap(), None);
}

// ── Recompute Tests ────────────────────────────────────────────────────────

#[test]
fn single_box_becomes_body_shape() {
    let (mut engine, mut kernel, body) = setup();
    add_box(&mut engine, body);

    assert_eq!(engine.recompute_body(&mut kernel, body).unwrap(), 1);
    let bounds = body_bounds(&engine, &kernel, body);
    assert_eq!(bounds.len(), 1);
    assert_relative_eq!(bounds[0].max, Point3::new(10.0, 10.0, 10.0));
}

#[test]
fn first_feature_must_fuse() {
    let (mut engine, mut kernel, body) = setup();
    let b = add_box(&mut engine, body);
    set_operation(&mut engine, b, BooleanOp::Cut);

    let err = engine.recompute_body(&mut kernel, body).unwrap_err();
    assert_eq!(err, EngineError::Op(OpError::NonFuseBase));
    assert_eq!(err.category(), ErrorCategory::Configuration);
}

#[test]
fn cutting_everything_is_not_a_solid() {
    let (mut engine, mut kernel, body) = setup();
    add_box(&mut engine, body);
    let cutter = add_box(&mut engine, body);
    set_operation(&mut engine, cutter, BooleanOp::Cut);
    edit(&mut engine, cutter, |kind| {
        if let FeatureKind::Box { params, .. } = kind {
            params.length = 20.0;
            params.width = 20.0;
            params.height = 20.0;
        }
    });
    engine.feature_mut(cutter).unwrap().placement =
        RigidTransform::translation(Vector3::new(-5.0, -5.0, -5.0));

    let err = engine.recompute_body(&mut kernel, body).unwrap_err();
    assert_eq!(err, EngineError::Op(OpError::EmptyResult));
    assert_eq!(err.to_string(), "operation error: resulting shape is not a solid");
    assert_eq!(err.category(), ErrorCategory::Kernel);
}

#[test]
fn recompute_only_runs_stale_features() {
    let (mut engine, mut kernel, body) = setup();
    let first = add_box(&mut engine, body);
    let second = add_box(&mut engine, body);
    engine.feature_mut(second).unwrap().placement =
        RigidTransform::translation(Vector3::new(5.0, 0.0, 0.0));

    assert_eq!(engine.recompute_body(&mut kernel, body).unwrap(), 2);
    assert!(!engine.must_execute(first).unwrap());
    assert!(!engine.must_execute(second).unwrap());
    assert_eq!(engine.recompute_body(&mut kernel, body).unwrap(), 0);

    set_box_length(&mut engine, first, 12.0);
    assert_eq!(engine.feature(first).unwrap().touched(), vec!["Length"]);
    assert!(engine.must_execute(first).unwrap());
    assert!(!engine.must_execute(second).unwrap());

    // the second box picks up the newer predecessor result
    assert_eq!(engine.recompute_body(&mut kernel, body).unwrap(), 2);
    let bounds = body_bounds(&engine, &kernel, body);
    assert_relative_eq!(bounds[0].max.x, 15.0);
}

#[test]
fn reordering_makes_moved_features_stale() {
    let (mut engine, mut kernel, body) = setup();
    let a = add_box(&mut engine, body);
    let b = add_box(&mut engine, body);
    engine.feature_mut(b).unwrap().placement =
        RigidTransform::translation(Vector3::new(10.0, 0.0, 0.0));
    assert_eq!(engine.recompute_body(&mut kernel, body).unwrap(), 2);
    let fused = kernel.solid_bounds(engine.feature(b).unwrap().shape().unwrap());
    assert_relative_eq!(fused[0].min.x, 0.0);

    engine.move_feature(b, 0).unwrap();
    assert!(engine.feature(b).unwrap().touched().is_empty());
    assert!(engine.must_execute(b).unwrap());
    assert!(engine.must_execute(a).unwrap());

    assert_eq!(engine.recompute_body(&mut kernel, body).unwrap(), 2);
    // b now starts the chain and no longer includes a
    let alone = kernel.solid_bounds(engine.feature(b).unwrap().shape().unwrap());
    assert_eq!(alone.len(), 1);
    assert_relative_eq!(alone[0].min.x, 10.0);
    assert_relative_eq!(alone[0].max.x, 20.0);
    let bounds = body_bounds(&engine, &kernel, body);
    assert_relative_eq!(bounds[0].min.x, 0.0);
    assert!(!engine.must_execute(a).unwrap());
    assert!(!engine.must_execute(b).unwrap());
}

#[test]
fn placement_and_refine_are_tracked() {
    let (mut engine, mut kernel, body) = setup();
    let b = add_box(&mut engine, body);
    engine.recompute_body(&mut kernel, body).unwrap();

    let feature = engine.feature_mut(b).unwrap();
    feature.placement = RigidTransform::translation(Vector3::new(0.0, 0.0, 1.0));
    feature.refine = true;
    let touched = engine.feature(b).unwrap().touched();
    assert!(touched.contains(&"Placement"));
    assert!(touched.contains(&"Refine"));
    assert!(engine.must_execute(b).unwrap());
}

#[test]
fn failed_recompute_keeps_previous_result() {
    let (mut engine, mut kernel, body) = setup();
    let b = add_box(&mut engine, body);
    engine.recompute_body(&mut kernel, body).unwrap();
    let before = engine.feature(b).unwrap().shape().copied();

    set_box_length(&mut engine, b, 0.0);
    let err = engine.recompute_feature(&mut kernel, b).unwrap_err();
    assert_eq!(
        err,
        EngineError::Op(OpError::InvalidParameter {
            reason: "length of box too small".into()
        })
    );
    assert_eq!(err.category(), ErrorCategory::Configuration);

    let feature = engine.feature(b).unwrap();
    assert_eq!(feature.shape().copied(), before);
    assert!(feature.error().is_some());
    assert!(engine.must_execute(b).unwrap());

    set_box_length(&mut engine, b, 10.0);
    engine.recompute_feature(&mut kernel, b).unwrap();
    assert!(engine.feature(b).unwrap().error().is_none());
}

#[test]
fn base_shape_lookup_is_explicit() {
    let (mut engine, mut kernel, body) = setup();
    let first = add_box(&mut engine, body);
    let second = add_box(&mut engine, body);

    assert_eq!(engine.base_shape(first).unwrap(), None);
    assert_eq!(
        engine.base_shape(second).unwrap_err(),
        EngineError::MissingShape { name: "Box".into() }
    );

    engine.recompute_feature(&mut kernel, first).unwrap();
    assert_eq!(
        engine.base_shape(second).unwrap(),
        engine.feature(first).unwrap().shape().copied()
    );
}

#[test]
fn feature_outside_a_body_cannot_accumulate() {
    init_tracing();
    let mut engine = Engine::default();
    let mut kernel = MockKernel::new();
    let b = engine.add_object(FeatureType::Box);

    let err = engine.recompute_feature(&mut kernel, b).unwrap_err();
    assert_eq!(err, EngineError::NotInBody { name: "Box".into() });
}

#[test]
fn body_placement_does_not_move_body_local_result() {
    let (mut engine, mut kernel, body) = setup();
    add_box(&mut engine, body);
    engine
        .set_body_placement(body, RigidTransform::translation(Vector3::new(100.0, 0.0, 0.0)))
        .unwrap();
    engine.recompute_body(&mut kernel, body).unwrap();

    let bounds = body_bounds(&engine, &kernel, body);
    assert_relative_eq!(bounds[0].min.x, 0.0);
}

// ── Linear Pattern Tests ───────────────────────────────────────────────────

#[test]
fn disjoint_linear_copies_are_rejected() {
    let (mut engine, mut kernel, body) = setup();
    let b = add_box(&mut engine, body);
    let line = x_line(&mut engine, body);
    let pattern = linear_pattern(
        &mut engine,
        body,
        vec![b],
        Some(LinkSub::object(line)),
        30.0,
        3,
    );

    let err = engine.recompute_body(&mut kernel, body).unwrap_err();
    assert_eq!(err, EngineError::Op(OpError::MultipleSolids { count: 3 }));
    assert_eq!(err.category(), ErrorCategory::Kernel);

    let tools = engine.tool_shapes(&mut kernel, pattern).unwrap();
    let offsets: Vec<f64> = tools
        .iter()
        .map(|t| t.shape.location().translation_part().x)
        .collect();
    assert_eq!(tools.len(), 2);
    assert_relative_eq!(offsets[0], 15.0);
    assert_relative_eq!(offsets[1], 30.0);
}

#[test]
fn overlapping_linear_copies_fuse_in_one_call() {
    let (mut engine, mut kernel, body) = setup();
    let b = add_box(&mut engine, body);
    let line = x_line(&mut engine, body);
    linear_pattern(
        &mut engine,
        body,
        vec![b],
        Some(LinkSub::object(line)),
        10.0,
        3,
    );

    kernel.clear_log();
    engine.recompute_body(&mut kernel, body).unwrap();

    let calls = kernel.boolean_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].op, BooleanOp::Fuse);
    assert_eq!(calls[0].tool_count, 2);
    let bounds = body_bounds(&engine, &kernel, body);
    assert_eq!(bounds.len(), 1);
    assert_relative_eq!(bounds[0].max.x, 20.0);
}

#[test]
fn reversed_linear_pattern_steps_backwards() {
    let (mut engine, mut kernel, body) = setup();
    let b = add_box(&mut engine, body);
    let line = x_line(&mut engine, body);
    let pattern = linear_pattern(
        &mut engine,
        body,
        vec![b],
        Some(LinkSub::object(line)),
        10.0,
        2,
    );
    edit(&mut engine, pattern, |kind| {
        if let FeatureKind::LinearPattern(p) = kind {
            p.spacing.reversed = true;
        }
    });

    engine.recompute_body(&mut kernel, body).unwrap();
    let bounds = body_bounds(&engine, &kernel, body);
    assert_relative_eq!(bounds[0].min.x, -10.0);
    assert_relative_eq!(bounds[0].max.x, 10.0);
}

#[test]
fn single_occurrence_skips_reference_resolution() {
    let (mut engine, mut kernel, body) = setup();
    let b = add_box(&mut engine, body);
    let pattern = linear_pattern(&mut engine, body, vec![b], None, 30.0, 1);

    engine.recompute_body(&mut kernel, body).unwrap();
    assert!(engine.tool_shapes(&mut kernel, pattern).unwrap().is_empty());
    let bounds = body_bounds(&engine, &kernel, body);
    assert_relative_eq!(bounds[0].max.x, 10.0);
}

#[test]
fn missing_direction_is_a_configuration_error() {
    let (mut engine, mut kernel, body) = setup();
    let b = add_box(&mut engine, body);
    linear_pattern(&mut engine, body, vec![b], None, 30.0, 3);

    let err = engine.recompute_body(&mut kernel, body).unwrap_err();
    assert_eq!(err, EngineError::MissingReference { what: "direction" });
    assert_eq!(err.category(), ErrorCategory::Configuration);
}

#[test]
fn zero_occurrences_are_rejected() {
    let (mut engine, mut kernel, body) = setup();
    let b = add_box(&mut engine, body);
    let line = x_line(&mut engine, body);
    linear_pattern(&mut engine, body, vec![b], Some(LinkSub::object(line)), 30.0, 0);

    let err = engine.recompute_body(&mut kernel, body).unwrap_err();
    assert_eq!(
        err,
        EngineError::Op(OpError::InvalidParameter {
            reason: "at least one occurrence required".into()
        })
    );
}

#[test]
fn direction_from_profile_edge() {
    let (mut engine, mut kernel, body) = setup();
    let profile = square_profile(&mut engine, body, 10.0);
    let b = add_box(&mut engine, body);
    linear_pattern(
        &mut engine,
        body,
        vec![b],
        Some(LinkSub::sub(profile, "Edge2")),
        10.0,
        2,
    );

    // the profile is recomputed on demand as a dependency
    engine.recompute_body(&mut kernel, body).unwrap();
    assert!(engine.feature(profile).unwrap().shape().is_some());
    let bounds = body_bounds(&engine, &kernel, body);
    assert_relative_eq!(bounds[0].max.y, 20.0);
    assert_relative_eq!(bounds[0].max.x, 10.0);
}

#[test]
fn direction_from_profile_axis_follows_placement() {
    let (mut engine, kernel, body) = setup();
    let profile = square_profile(&mut engine, body, 10.0);
    engine.feature_mut(profile).unwrap().placement = RigidTransform::rotation(
        &part_types::Axis::z(),
        std::f64::consts::FRAC_PI_2,
    );

    let dir = engine
        .resolve_direction(&kernel, Some(&LinkSub::sub(profile, "H_Axis")))
        .unwrap();
    assert_relative_eq!(dir.into_inner(), Vector3::y(), epsilon = 1e-12);

    let err = engine
        .resolve_direction(&kernel, Some(&LinkSub::sub(profile, "Axis0")))
        .unwrap_err();
    assert_eq!(err, EngineError::UnknownSubElement { name: "Axis0".into() });
}

#[test]
fn direction_from_solid_faces_and_edges() {
    let (mut engine, mut kernel, body) = setup();
    let b = add_box(&mut engine, body);
    // own body, so sub-element names are the cylinder's alone
    let other = engine.create_body("Body001");
    let cyl = engine.create_feature(other, FeatureType::Cylinder).unwrap();
    engine.recompute_feature(&mut kernel, b).unwrap();
    engine.recompute_feature(&mut kernel, cyl).unwrap();

    let dir = engine
        .resolve_direction(&kernel, Some(&LinkSub::sub(b, "Face2")))
        .unwrap();
    assert_relative_eq!(dir.into_inner(), Vector3::x());

    let dir = engine
        .resolve_direction(&kernel, Some(&LinkSub::sub(b, "Edge9")))
        .unwrap();
    assert_relative_eq!(dir.into_inner(), Vector3::z());

    let err = engine
        .resolve_direction(&kernel, Some(&LinkSub::sub(cyl, "Face1")))
        .unwrap_err();
    assert_eq!(err.to_string(), "direction face must be planar");
    assert_eq!(err.category(), ErrorCategory::Geometry);

    let err = engine
        .resolve_direction(&kernel, Some(&LinkSub::sub(cyl, "Edge1")))
        .unwrap_err();
    assert_eq!(err.to_string(), "direction edge must be a straight line");

    let err = engine
        .resolve_direction(&kernel, Some(&LinkSub::sub(b, "Vertex1")))
        .unwrap_err();
    assert_eq!(err.to_string(), "direction reference must be edge or face");

    let err = engine
        .resolve_direction(&kernel, Some(&LinkSub::object(b)))
        .unwrap_err();
    assert_eq!(err, EngineError::MissingReference { what: "direction" });
}

#[test]
fn pattern_without_inputs_repeats_the_body() {
    let (mut engine, mut kernel, body) = setup();
    add_box(&mut engine, body);
    let line = x_line(&mut engine, body);
    linear_pattern(&mut engine, body, Vec::new(), Some(LinkSub::object(line)), 10.0, 2);

    engine.recompute_body(&mut kernel, body).unwrap();
    let bounds = body_bounds(&engine, &kernel, body);
    assert_relative_eq!(bounds[0].max.x, 20.0);
}

#[test]
fn empty_pattern_as_first_feature_has_nothing_to_repeat() {
    let (mut engine, mut kernel, body) = setup();
    let line = x_line(&mut engine, body);
    linear_pattern(&mut engine, body, Vec::new(), Some(LinkSub::object(line)), 10.0, 2);

    let err = engine.recompute_body(&mut kernel, body).unwrap_err();
    assert_eq!(err, EngineError::Op(OpError::NoToolShapes));
}

// ── Mirror Tests ───────────────────────────────────────────────────────────

#[test]
fn mirror_across_a_box_face() {
    let (mut engine, mut kernel, body) = setup();
    let b = add_box(&mut engine, body);
    mirrored(&mut engine, body, vec![b], LinkSub::sub(b, "Face2"));

    engine.recompute_body(&mut kernel, body).unwrap();
    let bounds = body_bounds(&engine, &kernel, body);
    assert_eq!(bounds.len(), 1);
    assert_relative_eq!(bounds[0].min.x, 0.0, epsilon = 1e-9);
    assert_relative_eq!(bounds[0].max.x, 20.0, epsilon = 1e-9);
}

#[test]
fn mirror_across_profile_axes() {
    let (mut engine, mut kernel, body) = setup();
    let profile = square_profile(&mut engine, body, 10.0);
    let b = add_box(&mut engine, body);
    let m = mirrored(&mut engine, body, vec![b], LinkSub::sub(profile, "H_Axis"));

    engine.recompute_body(&mut kernel, body).unwrap();
    let bounds = body_bounds(&engine, &kernel, body);
    assert_relative_eq!(bounds[0].min.y, -10.0, epsilon = 1e-9);
    assert_relative_eq!(bounds[0].max.y, 10.0, epsilon = 1e-9);

    // an empty name mirrors through the profile plane
    edit(&mut engine, m, |kind| {
        if let FeatureKind::Mirrored(p) = kind {
            p.plane = Some(LinkSub::sub(profile, ""));
        }
    });
    engine.recompute_body(&mut kernel, body).unwrap();
    let bounds = body_bounds(&engine, &kernel, body);
    assert_relative_eq!(bounds[0].min.z, -10.0, epsilon = 1e-9);
    assert_relative_eq!(bounds[0].min.y, 0.0, epsilon = 1e-9);
}

#[test]
fn mirror_plane_from_profile_normal_axis() {
    let (mut engine, mut kernel, body) = setup();
    let profile = square_profile(&mut engine, body, 10.0);
    engine.recompute_feature(&mut kernel, profile).unwrap();

    for name in ["N_Axis", ""] {
        let plane = engine
            .resolve_mirror_plane(&kernel, Some(&LinkSub::sub(profile, name)))
            .unwrap();
        assert_relative_eq!(plane.base, Point3::origin());
        assert_relative_eq!(plane.normal.into_inner(), Vector3::z());
    }

    let err = engine
        .resolve_mirror_plane(&kernel, Some(&LinkSub::sub(profile, "Edge1")))
        .unwrap_err();
    assert_eq!(err, EngineError::UnknownSubElement { name: "Edge1".into() });
}

#[test]
fn mirror_across_a_construction_line() {
    let (mut engine, mut kernel, body) = setup();
    let profile = square_profile(&mut engine, body, 10.0);
    edit(&mut engine, profile, |kind| {
        if let FeatureKind::Profile(p) = kind {
            p.construction.push(ConstructionLine {
                start: Point2::new(10.0, 0.0),
                end: Point2::new(10.0, 10.0),
            });
        }
    });
    let b = add_box(&mut engine, body);
    mirrored(&mut engine, body, vec![b], LinkSub::sub(profile, "Axis0"));

    engine.recompute_body(&mut kernel, body).unwrap();
    let bounds = body_bounds(&engine, &kernel, body);
    assert_relative_eq!(bounds[0].max.x, 20.0, epsilon = 1e-9);
}

#[test]
fn mirror_across_a_datum_plane() {
    let (mut engine, mut kernel, body) = setup();
    let plane = engine.create_feature(body, FeatureType::DatumPlane).unwrap();
    edit(&mut engine, plane, |kind| {
        *kind = FeatureKind::DatumPlane(DatumPlaneParams::from_placement(
            &RigidTransform::translation(Vector3::new(0.0, 0.0, 10.0)),
        ));
    });
    let b = add_box(&mut engine, body);
    mirrored(&mut engine, body, vec![b], LinkSub::object(plane));

    engine.recompute_body(&mut kernel, body).unwrap();
    let bounds = body_bounds(&engine, &kernel, body);
    assert_relative_eq!(bounds[0].max.z, 20.0, epsilon = 1e-9);
}

#[test]
fn datum_line_from_placement_matches_placed_default() {
    let (mut engine, kernel, body) = setup();
    let placement = RigidTransform::translation(Vector3::new(0.0, 5.0, 0.0))
        * RigidTransform::rotation(&part_types::Axis::z(), std::f64::consts::FRAC_PI_2);

    let baked = x_line(&mut engine, body);
    edit(&mut engine, baked, |kind| {
        *kind = FeatureKind::DatumLine(DatumLineParams::from_placement(&placement));
    });
    let placed = x_line(&mut engine, body);
    engine.feature_mut(placed).unwrap().placement = placement;

    for line in [baked, placed] {
        let axis = engine
            .resolve_rotation_axis(&kernel, Some(&LinkSub::object(line)))
            .unwrap();
        assert_relative_eq!(axis.base, Point3::new(0.0, 5.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(axis.direction.into_inner(), Vector3::y(), epsilon = 1e-12);
    }
}

#[test]
fn mirror_through_curved_face_is_a_geometry_error() {
    let (mut engine, mut kernel, body) = setup();
    let cyl = engine.create_feature(body, FeatureType::Cylinder).unwrap();
    mirrored(&mut engine, body, vec![cyl], LinkSub::sub(cyl, "Face1"));

    let err = engine.recompute_body(&mut kernel, body).unwrap_err();
    assert_eq!(err.to_string(), "mirror face must be planar");
    assert_eq!(err.category(), ErrorCategory::Geometry);
}

#[test]
fn mirror_rejects_datum_lines() {
    let (mut engine, mut kernel, body) = setup();
    let line = x_line(&mut engine, body);
    let b = add_box(&mut engine, body);
    mirrored(&mut engine, body, vec![b], LinkSub::object(line));

    let err = engine.recompute_body(&mut kernel, body).unwrap_err();
    assert!(matches!(err, EngineError::UnsupportedReference { .. }));
    assert_eq!(err.category(), ErrorCategory::Configuration);
}

// ── Polar Pattern Tests ────────────────────────────────────────────────────

#[test]
fn polar_full_turn_spreads_evenly() {
    let (mut engine, mut kernel, body) = setup();
    let b = add_box(&mut engine, body);
    let axis = engine.create_feature(body, FeatureType::DatumLine).unwrap();
    edit(&mut engine, axis, |kind| {
        *kind = FeatureKind::DatumLine(DatumLineParams {
            base: Point3::origin(),
            direction: Vector3::z(),
        });
    });
    let pattern = engine.create_feature(body, FeatureType::PolarPattern).unwrap();
    edit(&mut engine, pattern, |kind| {
        if let FeatureKind::PolarPattern(p) = kind {
            p.features = vec![b];
            p.axis = Some(LinkSub::object(axis));
            p.spacing.occurrences = 4;
        }
    });

    kernel.clear_log();
    engine.recompute_body(&mut kernel, body).unwrap();

    assert_eq!(kernel.boolean_calls().len(), 1);
    assert_eq!(kernel.boolean_calls()[0].tool_count, 3);
    let bounds = body_bounds(&engine, &kernel, body);
    assert_eq!(bounds.len(), 1);
    assert_relative_eq!(bounds[0].min, Point3::new(-10.0, -10.0, 0.0), epsilon = 1e-9);
    assert_relative_eq!(bounds[0].max, Point3::new(10.0, 10.0, 10.0), epsilon = 1e-9);
}

#[test]
fn rotation_axis_from_solid_edges() {
    let (mut engine, mut kernel, body) = setup();
    let cyl = engine.create_feature(body, FeatureType::Cylinder).unwrap();
    engine.recompute_feature(&mut kernel, cyl).unwrap();

    let circle = engine
        .resolve_rotation_axis(&kernel, Some(&LinkSub::sub(cyl, "Edge1")))
        .unwrap();
    assert_relative_eq!(circle.base, Point3::new(0.0, 0.0, 10.0));
    assert_relative_eq!(circle.direction.into_inner(), Vector3::z());

    let seam = engine
        .resolve_rotation_axis(&kernel, Some(&LinkSub::sub(cyl, "Edge2")))
        .unwrap();
    assert_relative_eq!(seam.base, Point3::new(10.0, 0.0, 0.0));

    let err = engine
        .resolve_rotation_axis(&kernel, Some(&LinkSub::sub(cyl, "Face2")))
        .unwrap_err();
    assert_eq!(err.to_string(), "axis reference must be an edge");
    assert_eq!(err.category(), ErrorCategory::Geometry);

    let err = engine
        .resolve_rotation_axis(&kernel, Some(&LinkSub::sub(cyl, "Edge99")))
        .unwrap_err();
    assert_eq!(err, EngineError::UnknownSubElement { name: "Edge99".into() });
}

#[test]
fn rotation_axis_rejects_datum_planes() {
    let (mut engine, kernel, body) = setup();
    let plane = engine.create_feature(body, FeatureType::DatumPlane).unwrap();
    let err = engine
        .resolve_rotation_axis(&kernel, Some(&LinkSub::object(plane)))
        .unwrap_err();
    assert!(matches!(err, EngineError::UnsupportedReference { .. }));
}

// ── Boolean Feature Tests ──────────────────────────────────────────────────

#[test]
fn boolean_tool_relocation() {
    let (mut engine, mut kernel, body) = setup();
    let solid = kernel
        .make_box(10.0, 10.0, 10.0)
        .unwrap()
        .located(RigidTransform::translation(Vector3::new(5.0, 0.0, 0.0)));
    let tool = engine.add_solid("Imported", solid);
    add_box(&mut engine, body);
    let boolean = engine.create_feature(body, FeatureType::Boolean).unwrap();
    edit(&mut engine, boolean, |kind| {
        if let FeatureKind::Boolean { params, .. } = kind {
            params.tool = Some(tool);
            params.use_tool_placement = true;
        }
    });
    engine
        .set_body_placement(body, RigidTransform::translation(Vector3::new(100.0, 0.0, 0.0)))
        .unwrap();

    let tools = engine.tool_shapes(&mut kernel, boolean).unwrap();
    assert_relative_eq!(tools[0].shape.location().translation_part().x, -95.0);

    edit(&mut engine, boolean, |kind| {
        if let FeatureKind::Boolean { params, .. } = kind {
            params.use_tool_placement = false;
        }
    });
    let tools = engine.tool_shapes(&mut kernel, boolean).unwrap();
    assert!(tools[0].shape.location().is_identity(1e-12));
}

#[test]
fn boolean_fuses_placed_tool() {
    let (mut engine, mut kernel, body) = setup();
    let solid = kernel
        .make_box(10.0, 10.0, 10.0)
        .unwrap()
        .located(RigidTransform::translation(Vector3::new(5.0, 0.0, 0.0)));
    let tool = engine.add_solid("Imported", solid);
    add_box(&mut engine, body);
    let boolean = engine.create_feature(body, FeatureType::Boolean).unwrap();
    edit(&mut engine, boolean, |kind| {
        if let FeatureKind::Boolean { params, .. } = kind {
            params.tool = Some(tool);
            params.use_tool_placement = true;
        }
    });

    engine.recompute_body(&mut kernel, body).unwrap();
    let bounds = body_bounds(&engine, &kernel, body);
    assert_relative_eq!(bounds[0].max.x, 15.0);

    // replacing the outside solid makes the boolean stale
    assert!(!engine.must_execute(boolean).unwrap());
    let moved = solid.located(RigidTransform::translation(Vector3::new(8.0, 0.0, 0.0)));
    engine.set_solid_shape(tool, moved).unwrap();
    assert!(engine.must_execute(boolean).unwrap());
    engine.recompute_body(&mut kernel, body).unwrap();
    let bounds = body_bounds(&engine, &kernel, body);
    assert_relative_eq!(bounds[0].max.x, 18.0);
}

#[test]
fn boolean_requires_a_solid_tool() {
    let (mut engine, mut kernel, body) = setup();
    add_box(&mut engine, body);
    let boolean = engine.create_feature(body, FeatureType::Boolean).unwrap();

    let err = engine.tool_shapes(&mut kernel, boolean).unwrap_err();
    assert_eq!(err, EngineError::MissingReference { what: "boolean tool" });

    let profile = square_profile(&mut engine, body, 10.0);
    edit(&mut engine, boolean, |kind| {
        if let FeatureKind::Boolean { params, .. } = kind {
            params.tool = Some(profile);
        }
    });
    let err = engine.tool_shapes(&mut kernel, boolean).unwrap_err();
    assert_eq!(
        err.to_string(),
        "cannot do boolean with anything but solid features"
    );
}

// ── Extrude Tests ──────────────────────────────────────────────────────────

fn extrude(engine: &mut Engine, body: BodyId, profile: FeatureId, length: f64) -> FeatureId {
    let id = engine.create_feature(body, FeatureType::Extrude).unwrap();
    edit(engine, id, |kind| {
        if let FeatureKind::Extrude {
            profile: link,
            params,
            ..
        } = kind
        {
            *link = Some(LinkSub::object(profile));
            params.length = length;
        }
    });
    id
}

#[test]
fn extrude_sweeps_profile() {
    let (mut engine, mut kernel, body) = setup();
    let profile = square_profile(&mut engine, body, 10.0);
    extrude(&mut engine, body, profile, 5.0);

    engine.recompute_body(&mut kernel, body).unwrap();
    let bounds = body_bounds(&engine, &kernel, body);
    assert_relative_eq!(bounds[0].min, Point3::origin(), epsilon = 1e-9);
    assert_relative_eq!(bounds[0].max, Point3::new(10.0, 10.0, 5.0), epsilon = 1e-9);
}

#[test]
fn extrude_adopts_profile_placement() {
    let (mut engine, mut kernel, body) = setup();
    let profile = square_profile(&mut engine, body, 10.0);
    let lifted = RigidTransform::translation(Vector3::new(0.0, 0.0, 20.0));
    engine.feature_mut(profile).unwrap().placement = lifted;
    let pad = extrude(&mut engine, body, profile, 5.0);

    engine.recompute_body(&mut kernel, body).unwrap();
    assert!(engine.feature(pad).unwrap().placement.approx_eq(&lifted, 1e-12));
    let bounds = body_bounds(&engine, &kernel, body);
    assert_relative_eq!(bounds[0].min.z, 20.0, epsilon = 1e-9);
    assert_relative_eq!(bounds[0].max.z, 25.0, epsilon = 1e-9);
}

#[test]
fn extrude_without_profile_fails() {
    let (mut engine, mut kernel, body) = setup();
    engine.create_feature(body, FeatureType::Extrude).unwrap();

    let err = engine.recompute_body(&mut kernel, body).unwrap_err();
    assert_eq!(err, EngineError::MissingReference { what: "profile" });
}

// ── Pattern Graph Tests ────────────────────────────────────────────────────

#[test]
fn pattern_cycles_are_detected() {
    let (mut engine, mut kernel, body) = setup();
    let line = x_line(&mut engine, body);
    let a = linear_pattern(&mut engine, body, Vec::new(), Some(LinkSub::object(line)), 10.0, 2);
    let b = linear_pattern(&mut engine, body, vec![a], Some(LinkSub::object(line)), 10.0, 2);
    edit(&mut engine, a, |kind| {
        if let FeatureKind::LinearPattern(p) = kind {
            p.features = vec![b];
        }
    });

    let err = engine.gather_pattern_inputs(a).unwrap_err();
    assert_eq!(err, EngineError::Cycle { name: "LinearPattern".into() });
    assert_eq!(err.category(), ErrorCategory::Configuration);
    assert!(engine.tool_shapes(&mut kernel, b).is_err());
}

#[test]
fn nested_patterns_contribute_their_inputs() {
    let (mut engine, _, body) = setup();
    let line = x_line(&mut engine, body);
    let b = add_box(&mut engine, body);
    let inner = linear_pattern(&mut engine, body, vec![b], Some(LinkSub::object(line)), 10.0, 2);
    let outer = linear_pattern(&mut engine, body, vec![inner], Some(LinkSub::object(line)), 20.0, 2);

    assert_eq!(engine.gather_pattern_inputs(outer).unwrap(), vec![inner, b]);
}

#[test]
fn nested_pattern_tool_shapes_are_transform_major() {
    let (mut engine, mut kernel, body) = setup();
    let line = x_line(&mut engine, body);
    let b = add_box(&mut engine, body);
    let inner = linear_pattern(&mut engine, body, vec![b], Some(LinkSub::object(line)), 10.0, 2);
    let outer = linear_pattern(&mut engine, body, vec![inner], Some(LinkSub::object(line)), 40.0, 3);

    // per outer step: the inner copy at x = 10, then the box itself
    let tools = engine.tool_shapes(&mut kernel, outer).unwrap();
    let offsets: Vec<f64> = tools
        .iter()
        .map(|t| t.shape.location().translation_part().x)
        .collect();
    assert_eq!(offsets.len(), 4);
    for (offset, expected) in offsets.iter().zip([30.0, 20.0, 50.0, 40.0]) {
        assert_relative_eq!(*offset, expected, epsilon = 1e-9);
    }
    assert!(tools.iter().all(|t| t.operation == BooleanOp::Fuse));

    assert_eq!(engine.recompute_body(&mut kernel, body).unwrap(), 4);
    let bounds = body_bounds(&engine, &kernel, body);
    assert_eq!(bounds.len(), 1);
    assert_relative_eq!(bounds[0].min.x, 0.0, epsilon = 1e-9);
    assert_relative_eq!(bounds[0].max.x, 60.0, epsilon = 1e-9);
}

#[test]
fn only_tool_shape_features_can_be_patterned() {
    let (mut engine, mut kernel, body) = setup();
    let line = x_line(&mut engine, body);
    add_box(&mut engine, body);
    linear_pattern(&mut engine, body, vec![line], Some(LinkSub::object(line)), 10.0, 2);

    let err = engine.recompute_body(&mut kernel, body).unwrap_err();
    assert_eq!(err, EngineError::NotPatternable { name: "DatumLine".into() });
}

// ── Serialization Tests ────────────────────────────────────────────────────

#[test]
fn feature_parameters_serialize() {
    let (mut engine, _, body) = setup();
    let b = add_box(&mut engine, body);
    let line = x_line(&mut engine, body);
    let pattern = linear_pattern(
        &mut engine,
        body,
        vec![b],
        Some(LinkSub::sub(line, "")),
        30.0,
        3,
    );

    let feature = engine.feature(pattern).unwrap();
    let json = serde_json::to_string(feature).unwrap();
    let back: Feature = serde_json::from_str(&json).unwrap();
    assert_eq!(back.kind, feature.kind);
    assert_eq!(back.name, "LinearPattern");
    assert!(back.shape().is_none());

    let config = EngineConfig {
        refine_by_default: true,
        tolerance: Some(part_types::Tolerance::default()),
    };
    let json = serde_json::to_string(&config).unwrap();
    assert_eq!(serde_json::from_str::<EngineConfig>(&json).unwrap(), config);
}
