use letterflow_core::{
    CacheConfig, CachedSeparation, EvictionPolicy, FragmentMode, Scene, SceneGraph,
    SeparationCache, Transform,
};

fn texts(n: usize) -> (SceneGraph, Vec<String>) {
    let mut scene = SceneGraph::new();
    let names: Vec<String> = (0..n).map(|i| format!("Text{i}")).collect();
    for name in &names {
        scene.spawn_text(name.as_str(), "letters", Transform::default());
    }
    (scene, names)
}

fn entry(scene: &SceneGraph, name: &str) -> CachedSeparation {
    let root = scene.find(name).unwrap();
    CachedSeparation {
        root,
        fragments: vec![root],
    }
}

#[test]
fn set_then_get_hits_and_parameters_matter() {
    let (scene, names) = texts(1);
    let mut cache = SeparationCache::default();
    let value = entry(&scene, &names[0]);
    assert!(cache.set(&scene, &names[0], FragmentMode::Letters, 0.01, value.clone()));

    assert_eq!(cache.get(&scene, &names[0], FragmentMode::Letters, 0.01), Some(value));
    assert_eq!(cache.get(&scene, &names[0], FragmentMode::Words, 0.01), None);
    assert_eq!(cache.get(&scene, &names[0], FragmentMode::Letters, 0.02), None);

    let stats = cache.stats();
    assert_eq!((stats.hits, stats.misses, stats.sets), (1, 2, 1));
    assert_eq!(stats.total_operations, 4);
}

#[test]
fn unresolved_identity_is_an_untimed_miss() {
    let (scene, _) = texts(0);
    let mut cache = SeparationCache::default();
    assert_eq!(cache.get(&scene, "Ghost", FragmentMode::Letters, 0.0), None);
    let stats = cache.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.total_operations, 0);
}

#[test]
fn fifo_eviction_drops_the_earliest_inserted() {
    let max_size = 5;
    let (scene, names) = texts(max_size + 1);
    let mut cache = SeparationCache::new(CacheConfig {
        max_size,
        cleanup_threshold: 3,
        ..CacheConfig::default()
    });
    for name in &names[..max_size] {
        cache.set(&scene, name, FragmentMode::Letters, 0.0, entry(&scene, name));
        // Reads do not protect a key under FIFO.
        assert!(cache.get(&scene, &names[0], FragmentMode::Letters, 0.0).is_some());
    }
    let last = &names[max_size];
    cache.set(&scene, last, FragmentMode::Letters, 0.0, entry(&scene, last));

    assert!(cache.len() <= max_size);
    assert_eq!(cache.get(&scene, &names[0], FragmentMode::Letters, 0.0), None);
    for name in &names[1..] {
        assert!(cache.get(&scene, name, FragmentMode::Letters, 0.0).is_some(), "{name}");
    }
    assert_eq!(cache.stats().clears, 1);
}

#[test]
fn lru_eviction_spares_recently_read_keys() {
    let max_size = 5;
    let (scene, names) = texts(max_size + 1);
    let mut cache = SeparationCache::new(CacheConfig {
        max_size,
        cleanup_threshold: 3,
        policy: EvictionPolicy::Lru,
        ..CacheConfig::default()
    });
    for name in &names[..max_size] {
        cache.set(&scene, name, FragmentMode::Letters, 0.0, entry(&scene, name));
    }
    assert!(cache.get(&scene, &names[0], FragmentMode::Letters, 0.0).is_some());
    let newest = entry(&scene, &names[max_size]);
    cache.set(&scene, &names[max_size], FragmentMode::Letters, 0.0, newest);

    assert_eq!(cache.len(), max_size);
    assert!(cache.get(&scene, &names[0], FragmentMode::Letters, 0.0).is_some());
    assert_eq!(cache.get(&scene, &names[1], FragmentMode::Letters, 0.0), None);
}

#[test]
fn changed_text_or_transform_misses() {
    let (mut scene, names) = texts(1);
    let mut cache = SeparationCache::default();
    let id = scene.find(&names[0]).unwrap();
    cache.set(&scene, &names[0], FragmentMode::Letters, 0.0, entry(&scene, &names[0]));

    scene.set_text(id, "other letters").unwrap();
    assert_eq!(cache.get(&scene, &names[0], FragmentMode::Letters, 0.0), None);

    scene.set_text(id, "letters").unwrap();
    assert!(cache.get(&scene, &names[0], FragmentMode::Letters, 0.0).is_some());

    scene.set_transform(id, Transform::at([0.0, 0.0, 1.0])).unwrap();
    assert_eq!(cache.get(&scene, &names[0], FragmentMode::Letters, 0.0), None);
}

#[test]
fn optimize_drops_entries_with_deleted_fragments() {
    let (mut scene, names) = texts(2);
    let mut cache = SeparationCache::default();
    let piece = scene.spawn("Text0_piece", Transform::default());
    cache.set(
        &scene,
        &names[0],
        FragmentMode::Letters,
        0.0,
        CachedSeparation {
            root: scene.find(&names[0]).unwrap(),
            fragments: vec![piece],
        },
    );
    cache.set(&scene, &names[1], FragmentMode::Letters, 0.0, entry(&scene, &names[1]));

    scene.despawn(piece);
    assert_eq!(cache.optimize(&scene), 1);
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.stats().clears, 1);
    assert_eq!(cache.clear(), 1);
    assert_eq!(cache.stats().clears, 2);
    assert!(cache.is_empty());
}

#[test]
fn stats_snapshot_serializes_every_field() {
    let cache = SeparationCache::default();
    let value = serde_json::to_value(cache.stats()).unwrap();
    for field in [
        "size",
        "max_size",
        "hit_rate",
        "hits",
        "misses",
        "sets",
        "clears",
        "avg_get_time",
        "avg_set_time",
        "total_operations",
        "last_cleanup",
    ] {
        assert!(value.get(field).is_some(), "{field}");
    }
}
