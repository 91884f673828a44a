use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use letterflow_core::{
    AnimationSession, Config, EntityId, EvaluationStrategy, SceneGraph, Transform,
};

fn session_with(letters: usize, strategy: EvaluationStrategy) -> (AnimationSession, SceneGraph) {
    let mut scene = SceneGraph::new();
    let ids: Vec<EntityId> = (0..letters)
        .map(|i| scene.spawn(format!("Title_{i}"), Transform::at([i as f32, 0.0, 0.0])))
        .collect();
    let mut session = AnimationSession::new(Config {
        strategy,
        ..Config::default()
    });
    session.register_fragments(&scene, "Title", &ids);
    (session, scene)
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("Frame tick");

    for letters in [10, 100, 1000] {
        for strategy in [EvaluationStrategy::HardSwitch, EvaluationStrategy::Blended] {
            let (session, _scene) = session_with(letters, strategy);
            group.bench_with_input(
                BenchmarkId::new(format!("{strategy:?}"), letters),
                &letters,
                |b, _| {
                    let mut frame = 0;
                    b.iter(|| {
                        frame = (frame + 1) % 60;
                        black_box(session.tick(black_box(frame)))
                    })
                },
            );
        }
    }

    group.finish();
}

fn bench_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("Frame apply");

    for letters in [10, 100, 1000] {
        let (mut session, mut scene) = session_with(letters, EvaluationStrategy::HardSwitch);
        session.start();
        group.bench_with_input(BenchmarkId::new("on_frame_changed", letters), &letters, |b, _| {
            let mut frame = 0;
            b.iter(|| {
                // Step by the minimum delta so no frame is gated.
                frame = (frame + 2) % 60;
                black_box(session.on_frame_changed(&mut scene, frame))
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_tick, bench_apply);
criterion_main!(benches);
