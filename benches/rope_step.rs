use climbfall_physics::config::RawConfig;
use climbfall_physics::world::World;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn many_segments_config() -> climbfall_physics::SimConfig {
    let mut raw = RawConfig::new();
    raw.set_flag("fixed-anchor", true);
    raw.set("climber-height", 6.0);
    raw.set("climber-weight", 70.0);
    raw.set("rope-segments", 200.0);
    raw.set("elasticity-constant", 0.079);
    raw.set("rope-weight", 0.062);
    raw.set("physics-step-size", 0.01);
    raw.into_sim_config(1)
}

fn bench_single_step(c: &mut Criterion) {
    let cfg = many_segments_config();
    c.bench_function("rope_force_pass_200_segments", |b| {
        b.iter_batched(
            || World::from_config(&cfg).unwrap(),
            |mut world| {
                world.step(cfg.physics_step_seconds).unwrap();
                black_box(world.rope().segments().len());
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_single_step);
criterion_main!(benches);
