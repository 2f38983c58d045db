use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use climbfall_physics::config::RawConfig;
use climbfall_physics::world::World;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn short_fall_config() -> climbfall_physics::SimConfig {
    let mut raw = RawConfig::new();
    raw.set_flag("fixed-anchor", true);
    raw.set("climber-height", 6.0);
    raw.set("climber-weight", 70.0);
    raw.set("rope-segments", 70.0);
    raw.set("elasticity-constant", 0.079);
    raw.set("rope-weight", 0.062);
    raw.set("friction-coefficient", 0.125);
    raw.set("simulation-duration", 0.05);
    raw.set("physics-step-size", 0.01);
    raw.into_sim_config(1)
}

fn bench_advance(c: &mut Criterion) {
    c.bench_function("advance_loop_short_fall", |b| {
        b.iter(|| {
            let cfg = short_fall_config();
            let mut world = World::from_config(&cfg).unwrap();
            let snapshots = world.advance(Arc::new(AtomicBool::new(false))).unwrap();
            black_box(snapshots.len());
        });
    });
}

criterion_group!(benches, bench_advance);
criterion_main!(benches);
