// physics_laws_tests.rs - quantified invariants and boundary behaviours
//
// Covers §8's numbered invariants: rest-length and mass conservation
// across steps, zero-mass bodies staying at rest, barrier projection, and
// interruption preserving partial snapshots.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use climbfall_physics::config::RawConfig;
use climbfall_physics::world::World;

fn free_fall_config(duration_seconds: f64) -> climbfall_physics::SimConfig {
    let mut raw = RawConfig::new();
    raw.set_flag("fixed-anchor", true);
    raw.set("climber-height", 6.0);
    raw.set("climber-weight", 70.0);
    raw.set("rope-segments", 40.0);
    raw.set("elasticity-constant", 0.079);
    raw.set("rope-weight", 0.062);
    raw.set("friction-coefficient", 0.125);
    raw.set("rope-bend-damping", 0.02);
    raw.set("rope-stretch-damping", 0.1);
    raw.set("simulation-duration", duration_seconds);
    raw.set("physics-step-size", 1.0);
    raw.into_sim_config(7)
}

#[test]
fn rest_length_is_conserved_across_remeshing() {
    let cfg = free_fall_config(50.0);
    let mut world = World::from_config(&cfg).unwrap();
    let initial_rest: f64 = world.rope().rest_length();

    world.advance(Arc::new(AtomicBool::new(false))).unwrap();

    let final_rest: f64 = world.rope().rest_length();
    assert!(
        (final_rest - initial_rest).abs() <= 1e-8 * initial_rest.max(1.0),
        "rest length drifted from {initial_rest} to {final_rest}"
    );
}

#[test]
fn mass_is_conserved_across_remeshing() {
    let cfg = free_fall_config(50.0);
    let mut world = World::from_config(&cfg).unwrap();
    let initial_mass: f64 = world.rope().total_mass();

    world.advance(Arc::new(AtomicBool::new(false))).unwrap();

    let final_mass: f64 = world.rope().total_mass();
    assert!(
        (final_mass - initial_mass).abs() <= 1e-8_f64.max(initial_mass.abs() * 1e-8),
        "rope mass drifted from {initial_mass} to {final_mass}"
    );
}

#[test]
fn fixed_anchor_never_gains_velocity() {
    let cfg = free_fall_config(30.0);
    let mut world = World::from_config(&cfg).unwrap();
    let belayer = world.rope().belayer();

    world.advance(Arc::new(AtomicBool::new(false))).unwrap();

    assert_eq!(
        world.bodies()[belayer.raw() as usize].velocity(),
        climbfall_physics::Vector::ZERO
    );
}

#[test]
fn ground_barrier_keeps_climber_above_ground_level() {
    let mut raw = RawConfig::new();
    raw.set_flag("fixed-anchor", true);
    raw.set_flag("ground-present", true);
    raw.set("ground-level", 0.0);
    raw.set("climber-height", 3.0);
    raw.set("climber-weight", 70.0);
    raw.set("rope-segments", 20.0);
    raw.set("elasticity-constant", 0.079);
    raw.set("rope-weight", 0.062);
    raw.set("simulation-duration", 200.0);
    raw.set("physics-step-size", 1.0);
    let cfg = raw.into_sim_config(3);
    let mut world = World::from_config(&cfg).unwrap();

    world.advance(Arc::new(AtomicBool::new(false))).unwrap();

    let climber = world.rope().climber();
    assert!(world.bodies()[climber.raw() as usize].position().y() >= -1e-6);
}

#[test]
fn interruption_preserves_partial_snapshots() {
    let cfg = free_fall_config(2.0);
    let mut world = World::from_config(&cfg).unwrap();
    let flag = Arc::new(AtomicBool::new(true));

    let snapshots = world.advance(flag).unwrap();

    assert!(!snapshots.is_empty());
    let last = snapshots.last().unwrap();
    assert!(last.time <= 2.0);
}

#[test]
fn total_energy_is_non_increasing_for_a_released_climber() {
    let cfg = free_fall_config(3.0);
    let mut world = World::from_config(&cfg).unwrap();

    let snapshots = world.advance(Arc::new(AtomicBool::new(false))).unwrap();
    let totals: Vec<f64> = snapshots
        .iter()
        .map(|s| s.bodies.iter().map(|b| b.total_energy).sum())
        .collect();

    let scale = totals[0].abs().max(1.0);
    for pair in totals.windows(2) {
        assert!(
            pair[1] <= pair[0] + 1e-6 * scale,
            "total energy rose from {} to {} (scale {scale})",
            pair[0],
            pair[1]
        );
    }
}

#[test]
fn peak_tension_matches_free_fall_closed_form() {
    // Matches spec.md's "vertical free fall, no draw" scenario (§8
    // invariant 9): draw-number = 0, ground-present = false, fixed
    // anchor, climber released from rest.
    let mut raw = RawConfig::new();
    raw.set_flag("fixed-anchor", true);
    raw.set("climber-height", 6.0);
    raw.set("climber-weight", 70.0);
    raw.set("rope-segments", 10.0);
    raw.set("elasticity-constant", 0.079);
    raw.set("rope-weight", 0.062);
    raw.set("physics-step-size", 1.0);
    let cfg = raw.into_sim_config(11);
    let mut world = World::from_config(&cfg).unwrap();

    let belayer = world.rope().belayer();
    let climber = world.rope().climber();
    let rest_length = world.rope().rest_length();
    let kappa = world.rope().params().kappa;
    let dt = cfg.physics_step_seconds;

    let anchor_height = world.bodies()[belayer.raw() as usize].position().y();
    let start_height = world.bodies()[climber.raw() as usize].position().y();

    let mut max_tension = 0.0_f64;
    let steps = (2.0 / dt) as u64;
    for _ in 0..steps {
        world.step(dt).unwrap();
        let p_a = world.bodies()[belayer.raw() as usize].position();
        let p_b = world.bodies()[climber.raw() as usize].position();
        let len = (p_b - p_a).length();
        let tension = (len - rest_length) / (rest_length * kappa);
        if tension > max_tension {
            max_tension = tension;
        }
    }

    let m = cfg.climber_weight;
    let g = 9.81;
    let h = start_height - anchor_height;
    let expected = m * g
        + ((m * g).powi(2) + 2.0 * m * g * (2.0 * h) / (rest_length * kappa)).sqrt();

    assert!(
        (max_tension - expected).abs() <= 0.2 * expected,
        "peak tension {max_tension} not within tolerance of closed form {expected}"
    );
}
