//! Point-mass bodies: the belayer, climber, deflection points, and rope
//! joints are all the same underlying type, distinguished only by a tag,
//! following the "no inheritance, flat tagged variant" design note this
//! crate grounds its snapshot/body split on.

use std::collections::VecDeque;

use crate::vector::Vector;

/// Stable process-wide identity for a [`Body`]. Monotonic, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct BodyId(u64);

impl BodyId {
    pub(crate) fn from_raw(raw: u64) -> Self {
        BodyId(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Downstream-consumer tag distinguishing the role a body plays; carries no
/// behavioural difference inside the solver itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BodyKind {
    Anchor,
    Quickdraw,
    Climber,
    RopeJoint,
    Generic,
}

/// Default width, in seconds, of a body's rolling force-average window.
pub const DEFAULT_FORCE_AVG_WINDOW: f64 = 0.05;

/// One entry in a body's force-history deque: how much simulated time this
/// sample represents, and the instantaneous force magnitude recorded then.
#[derive(Debug, Clone, Copy)]
struct ForceSample {
    dt: f64,
    magnitude: f64,
}

/// A point mass: position, velocity, accumulated force for the current
/// step, and the bookkeeping needed for the rolling force average and
/// running maxima exposed to the snapshot layer.
#[derive(Debug, Clone)]
pub struct Body {
    id: BodyId,
    kind: BodyKind,
    position: Vector,
    velocity: Vector,
    force: Vector,
    mass: f64,
    /// Velocity damping factor applied per second, in (0, 1].
    damping_per_second: f64,
    /// Capstan friction coefficient, meaningful only when this body is
    /// referenced as a deflection point.
    friction: f64,
    force_window: VecDeque<ForceSample>,
    force_window_len: f64,
    force_window_weighted_sum: f64,
    force_avg_window: f64,
    max_average_force: f64,
    max_speed: f64,
}

impl Body {
    pub fn new(
        id: BodyId,
        kind: BodyKind,
        position: Vector,
        mass: f64,
        damping_per_second: f64,
        friction: f64,
    ) -> Self {
        Self {
            id,
            kind,
            position,
            velocity: Vector::ZERO,
            force: Vector::ZERO,
            mass: mass.max(0.0),
            damping_per_second: damping_per_second.clamp(f64::EPSILON, 1.0),
            friction: friction.max(0.0),
            force_window: VecDeque::new(),
            force_window_len: 0.0,
            force_window_weighted_sum: 0.0,
            force_avg_window: DEFAULT_FORCE_AVG_WINDOW,
            max_average_force: 0.0,
            max_speed: 0.0,
        }
    }

    pub fn id(&self) -> BodyId {
        self.id
    }

    pub fn kind(&self) -> BodyKind {
        self.kind
    }

    pub fn position(&self) -> Vector {
        self.position
    }

    pub fn velocity(&self) -> Vector {
        self.velocity
    }

    pub fn force(&self) -> Vector {
        self.force
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn friction(&self) -> f64 {
        self.friction
    }

    pub fn is_fixed(&self) -> bool {
        self.mass <= 0.0
    }

    /// Sets this body's mass, used by rope re-meshing to apply the
    /// ½-neighbour joint-mass rule (§4.4). Does not otherwise disturb the
    /// body's position, velocity, or force history.
    pub fn set_mass(&mut self, mass: f64) {
        self.mass = mass.max(0.0);
        if self.is_fixed() {
            self.velocity = Vector::ZERO;
        }
    }

    pub fn set_force_avg_window(&mut self, seconds: f64) {
        self.force_avg_window = seconds.max(f64::EPSILON);
    }

    pub fn set_position(&mut self, position: Vector) {
        self.position = position;
    }

    pub fn set_velocity(&mut self, velocity: Vector) {
        if self.is_fixed() {
            debug_assert_eq!(velocity, Vector::ZERO, "a fixed body must stay at rest");
            self.velocity = Vector::ZERO;
        } else {
            self.velocity = velocity;
            let speed = self.velocity.length();
            if speed > self.max_speed {
                self.max_speed = speed;
            }
        }
    }

    /// Zeroes the accumulated force. Called once per step before the force
    /// passes run, for every body with positive mass.
    pub fn clear_force(&mut self) {
        self.force = Vector::ZERO;
    }

    /// Adds to the accumulated force for this step. No-op on fixed bodies.
    pub fn apply_force(&mut self, force: Vector) {
        if !self.is_fixed() {
            self.force += force;
        }
    }

    /// Explicit semi-implicit Euler step: `v <- (v + a*dt) * damping^dt`,
    /// `p <- p + v*dt`. No-op on fixed bodies.
    pub fn integrate(&mut self, dt: f64) {
        if self.is_fixed() {
            return;
        }
        let acceleration = self.force * (1.0 / self.mass);
        let damping = self.damping_per_second.powf(dt);
        let new_velocity = (self.velocity + acceleration * dt) * damping;
        self.set_velocity(new_velocity);
        self.position = self.position + self.velocity * dt;
    }

    /// Records the current instantaneous force magnitude into the rolling
    /// window, weighted by `dt`, and evicts samples older than the window.
    pub fn record_force_sample(&mut self, dt: f64) {
        let magnitude = self.force.length();
        self.force_window.push_back(ForceSample { dt, magnitude });
        self.force_window_len += dt;
        self.force_window_weighted_sum += magnitude * dt;

        while self.force_window_len > self.force_avg_window {
            if let Some(front) = self.force_window.pop_front() {
                self.force_window_len -= front.dt;
                self.force_window_weighted_sum -= front.magnitude * front.dt;
            } else {
                break;
            }
        }
        self.force_window_len = self.force_window_len.max(0.0);
        self.force_window_weighted_sum = self.force_window_weighted_sum.max(0.0);

        let avg = self.average_force();
        if avg > self.max_average_force {
            self.max_average_force = avg;
        }
    }

    pub fn instantaneous_force(&self) -> f64 {
        self.force.length()
    }

    /// Time-weighted average of recorded force magnitudes over the last
    /// `force_avg_window` seconds (or less, early in the simulation).
    pub fn average_force(&self) -> f64 {
        if self.force_window_len <= 0.0 {
            0.0
        } else {
            self.force_window_weighted_sum / self.force_window_len
        }
    }

    pub fn max_average_force(&self) -> f64 {
        self.max_average_force
    }

    pub fn max_speed(&self) -> f64 {
        self.max_speed
    }

    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.mass * self.velocity.length_squared()
    }

    /// Gravitational potential energy relative to the world origin, for a
    /// constant gravity vector `g` (acceleration, pointing "down").
    pub fn potential_energy(&self, gravity: Vector) -> f64 {
        -self.mass * gravity.dot(&self.position)
    }
}

/// Pushes a new body onto the world's arena and returns its freshly
/// minted id. The id is always `bodies.len()` before the push — the
/// arena-with-indices model described in the design notes this crate
/// follows: a `BodyId` *is* an index, never reclaimed.
pub fn alloc_body(
    bodies: &mut Vec<Body>,
    kind: BodyKind,
    position: Vector,
    mass: f64,
    damping_per_second: f64,
    friction: f64,
) -> BodyId {
    let id = BodyId::from_raw(bodies.len() as u64);
    bodies.push(Body::new(id, kind, position, mass, damping_per_second, friction));
    id
}
