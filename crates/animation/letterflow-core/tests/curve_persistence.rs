use approx::assert_abs_diff_eq;
use letterflow_core::store::DebugReport;
use letterflow_core::{
    AnimError, AuditConfig, AuditScope, ControlPoint, CurveStore, HandleType, OvershootConfig,
    Phase, PhaseCurve, SceneGraph, Transform,
};

fn scene() -> SceneGraph {
    let mut scene = SceneGraph::new();
    scene.spawn_text("Headline_Root", "Hello", Transform::default());
    scene.spawn_text("Other", "World", Transform::default());
    scene
}

fn custom_points() -> Vec<ControlPoint> {
    vec![
        ControlPoint::new(0.0, 0.0).with_handle(HandleType::Vector),
        ControlPoint::new(0.35, 1.4).with_handle(HandleType::AutoClamped),
        ControlPoint::new(0.7, 0.85),
        ControlPoint::new(1.0, 1.0),
    ]
}

#[test]
fn export_then_import_reproduces_points() {
    let scene = scene();
    let mut store = CurveStore::default();
    store
        .set_points(&scene, "Headline_Root", Phase::Entry, custom_points())
        .unwrap();
    let exported = store.export(&scene, "Headline_Root", 42).unwrap();
    assert_eq!(exported.base_name, "Headline");
    assert_eq!(exported.object_name, "Headline_Root");
    assert_eq!(exported.export_time, 42);
    assert_eq!(exported.curves[&Phase::Hold].node_name, "Headline_curve_hold");

    let json = serde_json::to_string(&exported).unwrap();
    let mut other = CurveStore::default();
    assert_eq!(other.import_json(&scene, "Other", &json).unwrap(), 3);

    for phase in Phase::ALL {
        let a = store.curve("Headline", phase).unwrap().points();
        let b = other.curve("Other", phase).unwrap().points();
        assert_eq!(a.len(), b.len());
        for (p, q) in a.iter().zip(b) {
            assert_abs_diff_eq!(p.x, q.x, epsilon = 1e-6);
            assert_abs_diff_eq!(p.y, q.y, epsilon = 1e-6);
            assert_eq!(p.handle_type, q.handle_type);
        }
    }
}

#[test]
fn invalid_import_changes_nothing() {
    let scene = scene();
    let mut store = CurveStore::default();
    let mut export = store.export(&scene, "Other", 0).unwrap();
    export
        .curves
        .get_mut(&Phase::Exit)
        .unwrap()
        .points
        .push(ControlPoint::new(0.5, 9.0));
    export
        .curves
        .get_mut(&Phase::Entry)
        .unwrap()
        .points
        .push(ControlPoint::new(0.5, 0.5));

    let before = store.curve("Other", Phase::Entry).cloned();
    let err = store.import(&scene, "Other", &export).unwrap_err();
    assert!(matches!(err, AnimError::InvalidCurve { .. }));
    assert_eq!(store.curve("Other", Phase::Entry).cloned(), before);
}

#[test]
fn audit_counts_and_repairs() {
    let scene = scene();
    let mut store = CurveStore::default();
    store.ensure_all("Headline");
    store.ensure_all("Other");
    store.insert("Other", Phase::Hold, PhaseCurve::from_xy(&[(0.0, 0.0), (1.0, 5.0)]));
    store.insert("Other", Phase::Exit, PhaseCurve::from_xy(&[(0.5, 0.5)]));

    let report = store
        .audit(
            &scene,
            &AuditScope::All,
            &AuditConfig {
                auto_repair: false,
                ..AuditConfig::default()
            },
        );
    assert_eq!((report.total, report.valid, report.invalid), (2, 1, 1));
    assert_eq!(report.repaired, 0);
    assert!(!store.curve("Other", Phase::Hold).unwrap().is_valid(store.y_limit()));

    assert_eq!(store.repair(&scene, "Other").unwrap(), 2);
    assert_eq!(store.curve("Other", Phase::Exit), Some(&PhaseCurve::preset(Phase::Exit)));
}

#[test]
fn debug_evaluate_samples_every_phase() {
    let scene = scene();
    let mut store = CurveStore::default();
    let overshoot = OvershootConfig::default();
    let report: DebugReport = store
        .debug_evaluate(&scene, "Other", None, &overshoot)
        .unwrap();
    assert_eq!(report.test_points, vec![0.0, 0.5, 1.0]);
    assert_eq!(report.results.len(), 3);
    assert!(store
        .debug_evaluate(&scene, "Missing", None, &overshoot)
        .is_err());
}
