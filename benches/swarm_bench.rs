use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use swarm_sim::{CameraView, EnemyType, Float3, SwarmParams, SwarmWorld, VisibilityConfig, VisibilitySet};

fn populated_world(agents: usize) -> SwarmWorld {
    let params = SwarmParams {
        separation: 120.0,
        chase_target: true,
        lock_z: true,
        ground_z: 55.0,
        ..Default::default()
    };
    let mut world = SwarmWorld::new(
        params,
        vec![EnemyType::new(40.0, 600.0, 10.0, 5.0), EnemyType::new(60.0, 400.0, 30.0, 8.0)],
        20_000,
        2000.0,
        20.0,
    );
    let mut rng = StdRng::seed_from_u64(0xBEEF);
    for i in 0..agents {
        let p = Float3::new(rng.gen_range(-6000.0..6000.0), rng.gen_range(-6000.0..6000.0), 0.0);
        world.spawn(i % 2, p);
    }
    world
}

fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("swarm_step");
    group.sample_size(30);
    group.measurement_time(Duration::from_secs(8));
    for agents in [2_000usize, 10_000] {
        group.bench_function(format!("agents{agents}"), |b| {
            b.iter_batched(
                || populated_world(agents),
                |mut world| {
                    for _ in 0..16 {
                        world.step(1.0 / 60.0);
                    }
                    world
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn bench_visibility(c: &mut Criterion) {
    let world = populated_world(10_000);
    let camera = CameraView::default();
    let config = VisibilityConfig::default();
    let mut visibility = VisibilitySet::new();
    c.bench_function("visibility_10000", |b| {
        b.iter(|| {
            visibility.compute(&world, &camera, &config);
            visibility.total()
        })
    });
}

criterion_group!(benches, bench_step, bench_visibility);
criterion_main!(benches);
