//! Keyed configuration contract (§6): a loosely-typed front end
//! (`RawConfig`) that is validated and clamped into the strongly-typed
//! [`SimConfig`] the world is built from. Grounded on the `*Config` +
//! `Default` shape the teacher uses for `ClothConfig`/`GravityManager`
//! settings — a plain struct with named fields and a `Default` impl,
//! rather than a builder-pattern API.

use std::collections::HashMap;

use tracing::warn;

/// A single recognised configuration key with its clamping bounds and
/// documented default, per the table in §6.
#[derive(Debug, Clone, Copy)]
struct Bounds {
    min: f64,
    max: f64,
    default: f64,
}

impl Bounds {
    const fn new(min: f64, max: f64, default: f64) -> Self {
        Self { min, max, default }
    }

    fn clamp(self, key: &str, value: f64) -> f64 {
        let clamped = value.clamp(self.min, self.max);
        if (clamped - value).abs() > f64::EPSILON {
            warn!(key, value, clamped, "configuration value clamped to range");
        }
        clamped
    }
}

const WALL_ANGLE: Bounds = Bounds::new(0.0, 45.0, 5.0);
const GROUND_LEVEL: Bounds = Bounds::new(-1000.0, 1000.0, 0.0);
const CLIMBER_HEIGHT: Bounds = Bounds::new(-1000.0, 1000.0, 6.0);
const CLIMBER_SIDEWAYS: Bounds = Bounds::new(-100.0, 100.0, 0.0);
const CLIMBER_WEIGHT: Bounds = Bounds::new(1.0, 300.0, 70.0);
const BELAYER_WEIGHT: Bounds = Bounds::new(0.0, 300.0, 70.0);
const ROPE_SEGMENTS: Bounds = Bounds::new(1.0, 500.0, 70.0);
const PHYSICS_STEP_MS: Bounds = Bounds::new(0.001, 100.0, 0.01);
const ELASTICITY_CONSTANT: Bounds = Bounds::new(1e-6, 10.0, 0.079);
const ROPE_WEIGHT: Bounds = Bounds::new(0.01, 1.0, 0.062);
const ROPE_BEND_DAMPING: Bounds = Bounds::new(0.0, 10.0, 0.02);
const ROPE_STRETCH_DAMPING: Bounds = Bounds::new(0.0, 10.0, 0.1);
const FRICTION_COEFFICIENT: Bounds = Bounds::new(0.0, 1.0, 0.125);
const SLACK: Bounds = Bounds::new(0.0, 50.0, 0.1);
const FRAME_RATE: Bounds = Bounds::new(1.0, 240.0, 40.0);
const SIMULATION_DURATION: Bounds = Bounds::new(0.01, 3600.0, 2.0);
const DRAW_HEIGHT: Bounds = Bounds::new(-1000.0, 1000.0, 5.0);
const DRAW_SIDEWAYS: Bounds = Bounds::new(-100.0, 100.0, 0.0);
const DRAW_WALL_DISTANCE: Bounds = Bounds::new(0.0, 10.0, 0.1);
const DRAW_NUMBER: Bounds = Bounds::new(0.0, 50.0, 0.0);

/// Documented default distances that are not subject to min/max clamping
/// (they are simple fallbacks for missing optional values), per §6.
pub const BELAYER_WALL_DISTANCE_DEFAULT: f64 = 0.5;
pub const CLIMBER_WALL_DISTANCE_DEFAULT: f64 = 0.3;

/// Placement of a single deflection point, already clamped.
#[derive(Debug, Clone, Copy)]
pub struct DrawPlacement {
    pub height: f64,
    pub sideways: f64,
    pub wall_distance: f64,
}

/// The fully validated, typed configuration a [`crate::world::World`] is
/// built from.
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub wall_angle_degrees: f64,
    pub ground_present: bool,
    pub ground_level: f64,
    pub climber_height: f64,
    pub climber_sideways: f64,
    pub climber_weight: f64,
    pub climber_wall_distance: f64,
    pub fixed_anchor: bool,
    pub belayer_fixed: bool,
    pub belayer_weight: f64,
    pub belayer_wall_distance: f64,
    pub draws: Vec<DrawPlacement>,
    pub rope_segments: usize,
    pub physics_step_seconds: f64,
    pub elasticity_constant: f64,
    pub rope_weight_per_metre: f64,
    pub rope_bend_damping: f64,
    pub rope_stretch_damping: f64,
    pub friction_coefficient: f64,
    pub slack: f64,
    pub frame_rate: f64,
    pub simulation_duration: f64,
    /// Required input (§9 Open Question iii): the jitter applied during
    /// construction is reproducible only if a caller supplies a seed.
    pub jitter_seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        RawConfig::new().into_sim_config(0)
    }
}

/// A loosely-typed `key -> value` configuration, the shape an external
/// caller (setup wizard, persisted preset, CLI) actually hands the core.
#[derive(Debug, Clone, Default)]
pub struct RawConfig {
    values: HashMap<String, f64>,
    flags: HashMap<String, bool>,
}

impl RawConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: f64) -> &mut Self {
        self.values.insert(key.to_string(), value);
        self
    }

    pub fn set_flag(&mut self, key: &str, value: bool) -> &mut Self {
        self.flags.insert(key.to_string(), value);
        self
    }

    fn get(&self, key: &str, bounds: Bounds) -> f64 {
        match self.values.get(key) {
            Some(&v) => bounds.clamp(key, v),
            None => bounds.default,
        }
    }

    fn get_flag(&self, key: &str, default: bool) -> bool {
        *self.flags.get(key).unwrap_or(&default)
    }

    /// Validates, clamps, and resolves every recognised key into a
    /// [`SimConfig`], logging a warning for every value that was out of
    /// range (§7 "Configuration out-of-range").
    pub fn into_sim_config(self, jitter_seed: u64) -> SimConfig {
        let draw_count = self.get("draw-number", DRAW_NUMBER).round() as usize;
        let mut draws = Vec::with_capacity(draw_count);
        for i in 0..draw_count {
            // The highest (last) draw may be given directly via
            // `last-draw-height` instead of `draw-{i}-height` (§6).
            let height = if i + 1 == draw_count && !self.values.contains_key(&format!("draw-{i}-height")) {
                self.get("last-draw-height", DRAW_HEIGHT)
            } else {
                self.get(&format!("draw-{i}-height"), DRAW_HEIGHT)
            };
            let sideways = self.get(&format!("draw-{i}-sideways"), DRAW_SIDEWAYS);
            let wall_distance = self.get(&format!("draw-{i}-wall-distance"), DRAW_WALL_DISTANCE);
            draws.push(DrawPlacement {
                height,
                sideways,
                wall_distance,
            });
        }

        SimConfig {
            wall_angle_degrees: self.get("wall-angle", WALL_ANGLE),
            ground_present: self.get_flag("ground-present", false),
            ground_level: self.get("ground-level", GROUND_LEVEL),
            climber_height: self.get("climber-height", CLIMBER_HEIGHT),
            climber_sideways: self.get("climber-sideways", CLIMBER_SIDEWAYS),
            climber_weight: self.get("climber-weight", CLIMBER_WEIGHT),
            climber_wall_distance: CLIMBER_WALL_DISTANCE_DEFAULT,
            fixed_anchor: self.get_flag("fixed-anchor", false),
            belayer_fixed: self.get_flag("belayer-fixed", false),
            belayer_weight: self.get("belayer-weight", BELAYER_WEIGHT),
            belayer_wall_distance: BELAYER_WALL_DISTANCE_DEFAULT,
            draws,
            rope_segments: self.get("rope-segments", ROPE_SEGMENTS).round() as usize,
            physics_step_seconds: self.get("physics-step-size", PHYSICS_STEP_MS) / 1000.0,
            elasticity_constant: self.get("elasticity-constant", ELASTICITY_CONSTANT) * 1e-3,
            rope_weight_per_metre: self.get("rope-weight", ROPE_WEIGHT),
            rope_bend_damping: self.get("rope-bend-damping", ROPE_BEND_DAMPING),
            rope_stretch_damping: self.get("rope-stretch-damping", ROPE_STRETCH_DAMPING),
            friction_coefficient: self.get("friction-coefficient", FRICTION_COEFFICIENT),
            slack: self.get("slack", SLACK),
            frame_rate: self.get("frame-rate", FRAME_RATE),
            simulation_duration: self.get("simulation-duration", SIMULATION_DURATION),
            jitter_seed,
        }
    }
}
