use letterflow_core::{
    AnimError, AnimationSession, Config, CurveStore, Direction, EvaluationStrategy, EvictionPolicy,
    Phase, PresetBundle, SceneGraph, TimingConfig, Transform,
};
use letterflow_test_fixtures::{bundles, configs};

#[test]
fn every_bundle_fixture_parses_as_expected() {
    for name in bundles::keys() {
        let json = bundles::json(&name).unwrap();
        let parsed = PresetBundle::parse(&json);
        if bundles::expected_valid(&name).unwrap() {
            assert!(parsed.is_ok(), "{name}: {:?}", parsed.err());
        } else {
            assert!(matches!(parsed, Err(AnimError::Bundle { .. })), "{name}");
        }
    }
}

#[test]
fn broken_bundle_lists_every_issue() {
    let value: serde_json::Value = bundles::load("broken-curves").unwrap();
    let validation = PresetBundle::validate_value(&value);
    assert_eq!(validation.issues.len(), 2, "{:?}", validation.issues);
    assert!(validation.issues.iter().any(|i| i.contains("entry")));
    assert!(validation.issues.iter().any(|i| i.contains("material")));
}

#[test]
fn legacy_bundle_applies_with_defaults() {
    let (bundle, validation) =
        PresetBundle::parse(&bundles::json("legacy-components").unwrap()).unwrap();
    assert!(validation.warnings.iter().any(|w| w.contains("schema")));

    let mut timing = TimingConfig::default();
    bundle.apply_timing(&mut timing);
    assert_eq!(timing.start_frame, 10);
    assert_eq!(timing.duration, 50);
    assert_eq!(timing.overlap, 3.0);

    let mut store = CurveStore::default();
    assert_eq!(bundle.apply_curves(&mut store, "Title"), 3);
    assert_eq!(store.curve("Title", Phase::Exit).unwrap().evaluate(1.0), 0.0);
}

#[test]
fn bounce_bundle_drives_a_session() {
    let mut scene = SceneGraph::new();
    let ids: Vec<_> = (0..4)
        .map(|i| scene.spawn(format!("Bounce_{i}"), Transform::default()))
        .collect();
    let mut session = AnimationSession::default();
    session.register_fragments(&scene, "Bounce", &ids);
    let applied = session
        .load_bundle(&bundles::json("bounce-in").unwrap(), "Bounce")
        .unwrap();
    assert_eq!(applied, 3);
    assert_eq!(session.config().timing.duration, 60);
    assert_eq!(session.config().timing.overlap, 8.0);

    let report = session.scan_cycle(EvaluationStrategy::HardSwitch);
    assert_eq!(report.frames_scanned, 61);
    assert_eq!(report.fallbacks, 0);
}

#[test]
fn config_fixtures_load() {
    assert_eq!(configs::load::<Config>("default").unwrap(), Config::default());

    let cfg: Config = configs::load("blended-lru").unwrap();
    assert_eq!(cfg.strategy, EvaluationStrategy::Blended);
    assert_eq!(cfg.timing.direction, Direction::CenterOut);
    assert_eq!(cfg.cache.policy, EvictionPolicy::Lru);
    assert!(!cfg.overshoot.enabled);
    assert_eq!(cfg.overshoot.limit, 2.0);

    let session = AnimationSession::new(cfg.clone());
    assert_eq!(session.config(), &cfg);
    assert_eq!(session.cache().config().max_size, 8);
}
