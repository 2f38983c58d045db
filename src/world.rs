//! World construction (§4.1), barrier enforcement (§4.5), and the
//! long-running advance loop (§4.6). Grounded on the teacher's
//! `PhysicsWorld`/`PhysicsConfig` shape in `lib.rs` — a single struct
//! bundling the body arena, constants, and a `step()` entry point — and on
//! `async_scheduler.rs`'s cooperative-yield loop for the wall-clock
//! interrupt boundary.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::barrier::Barrier;
use crate::body::{alloc_body, Body, BodyId, BodyKind};
use crate::config::SimConfig;
use crate::error::SimResult;
use crate::rope::Rope;
use crate::segment::{RopeParams, RopeSegment};
use crate::snapshot::{point_mass_snapshot, BodySnapshot, Snapshot, SnapshotBodyType, Visible};
use crate::vector::Vector;

const YIELD_BUDGET: Duration = Duration::from_millis(500);
const JITTER_MAGNITUDE: f64 = 0.01;

/// The global simulation state: every registered body, every barrier, the
/// rope, and the constants the advance loop needs (§3 "World").
pub struct World {
    bodies: Vec<Body>,
    barriers: Vec<Barrier>,
    rope: Rope,
    gravity: Vector,
    max_step: f64,
    frame_interval: f64,
    duration: f64,
}

fn jitter(rng: &mut StdRng) -> Vector {
    let d = |rng: &mut StdRng| rng.gen_range(-JITTER_MAGNITUDE..=JITTER_MAGNITUDE);
    Vector::new(d(rng), d(rng), d(rng))
}

/// One cut point along the construction-time polyline: either an existing
/// deflection point, or a fresh segment-boundary joint to be created.
enum Cut {
    Deflection { index: usize, cumulative: f64 },
    Boundary { cumulative: f64 },
}

impl World {
    /// Builds a `World` from a validated [`SimConfig`], following §4.1's
    /// six-step construction procedure.
    pub fn from_config(config: &SimConfig) -> SimResult<Self> {
        let mut rng = StdRng::seed_from_u64(config.jitter_seed);
        let mut bodies: Vec<Body> = Vec::new();

        // Step 1: seed positions with jitter.
        let belayer_pos =
            Vector::new(0.0, 0.0, config.belayer_wall_distance) + jitter(&mut rng);
        let climber_pos = Vector::new(
            config.climber_sideways,
            config.climber_height,
            config.climber_wall_distance,
        ) + jitter(&mut rng);

        let belayer_mass = if config.fixed_anchor || config.belayer_fixed {
            0.0
        } else {
            config.belayer_weight
        };
        let belayer = alloc_body(&mut bodies, BodyKind::Anchor, belayer_pos, belayer_mass, 0.999, 0.0);
        let climber = alloc_body(
            &mut bodies,
            BodyKind::Climber,
            climber_pos,
            config.climber_weight,
            0.999,
            0.0,
        );

        let mut draw_ids = Vec::with_capacity(config.draws.len());
        let mut draw_positions = Vec::with_capacity(config.draws.len());
        for draw in &config.draws {
            let pos = Vector::new(draw.sideways, draw.height, draw.wall_distance) + jitter(&mut rng);
            let id = alloc_body(
                &mut bodies,
                BodyKind::Quickdraw,
                pos,
                0.0,
                0.999,
                config.friction_coefficient,
            );
            draw_ids.push(id);
            draw_positions.push(pos);
        }

        // Step 2: stretched length L0 and stretching factor f.
        let mut polyline_positions = Vec::with_capacity(draw_positions.len() + 2);
        polyline_positions.push(belayer_pos);
        polyline_positions.extend_from_slice(&draw_positions);
        polyline_positions.push(climber_pos);

        let mut edge_lengths = Vec::with_capacity(polyline_positions.len() - 1);
        let mut cumulative = vec![0.0];
        for pair in polyline_positions.windows(2) {
            let len = (pair[1] - pair[0]).length();
            edge_lengths.push(len);
            cumulative.push(cumulative.last().unwrap() + len);
        }
        let l0 = *cumulative.last().unwrap();
        let rest_length = l0 + config.slack;
        let f = if rest_length > f64::EPSILON { l0 / rest_length } else { 1.0 };

        // Step 3+4: build N segments of equal stretched length L0/N,
        // inserting a joint body at every boundary, threading through any
        // deflection points that fall inside a given segment's span.
        let n = config.rope_segments.max(1);
        let chunk = l0 / n as f64;

        let mut cuts: Vec<Cut> = Vec::new();
        for (j, &c) in cumulative.iter().enumerate().skip(1).take(draw_positions.len()) {
            cuts.push(Cut::Deflection { index: j - 1, cumulative: c });
        }
        for k in 1..n {
            cuts.push(Cut::Boundary {
                cumulative: chunk * k as f64,
            });
        }
        cuts.sort_by(|a, b| cut_cumulative(a).partial_cmp(&cut_cumulative(b)).unwrap());

        let interpolate = |target: f64| -> Vector {
            let mut v_idx = 0;
            for (i, &c) in cumulative.iter().enumerate().skip(1) {
                if target <= c || i == cumulative.len() - 1 {
                    v_idx = i - 1;
                    break;
                }
            }
            let span_start = cumulative[v_idx];
            let span_len = edge_lengths[v_idx].max(f64::EPSILON);
            let t = ((target - span_start) / span_len).clamp(0.0, 1.0);
            polyline_positions[v_idx] + (polyline_positions[v_idx + 1] - polyline_positions[v_idx]) * t
        };

        let rope_params = RopeParams {
            kappa: config.elasticity_constant,
            d_perp: config.rope_bend_damping,
            d_par: config.rope_stretch_damping,
            rest_min: 0.01 * (rest_length / n as f64).max(f64::EPSILON),
            rest_max: 1.1 * (rest_length / n as f64).max(f64::EPSILON),
            rest_default: rest_length / n as f64,
        };

        let mut segments = Vec::with_capacity(n);
        let mut current_a = belayer;
        let mut prev_cumulative = 0.0;
        let mut pending_deflections: Vec<BodyId> = Vec::new();
        let mut pending_partitions: Vec<f64> = Vec::new();

        for cut in &cuts {
            match cut {
                Cut::Deflection { index, cumulative: c } => {
                    pending_partitions.push((c - prev_cumulative) / f);
                    pending_deflections.push(draw_ids[*index]);
                    prev_cumulative = *c;
                }
                Cut::Boundary { cumulative: c } => {
                    pending_partitions.push((c - prev_cumulative) / f);
                    let pos = interpolate(*c);
                    let joint = alloc_body(&mut bodies, BodyKind::RopeJoint, pos, 0.0, 0.999, 0.0);
                    let mass = pending_partitions.iter().sum::<f64>() * config.rope_weight_per_metre;
                    segments.push(RopeSegment::new(
                        current_a,
                        joint,
                        mass,
                        std::mem::take(&mut pending_partitions),
                        std::mem::take(&mut pending_deflections),
                    ));
                    current_a = joint;
                    prev_cumulative = *c;
                }
            }
        }
        pending_partitions.push((l0 - prev_cumulative) / f);
        let mass = pending_partitions.iter().sum::<f64>() * config.rope_weight_per_metre;
        segments.push(RopeSegment::new(
            current_a,
            climber,
            mass,
            pending_partitions,
            pending_deflections,
        ));

        // Step 4 (end): rebalance interior joint masses, outer ends keep
        // their configured mass (rope donates none to them).
        for i in 1..segments.len() {
            let joint = segments[i - 1].b();
            let joint_mass = 0.5 * segments[i - 1].mass() + 0.5 * segments[i].mass();
            bodies[joint.raw() as usize].set_mass(joint_mass);
        }

        let mut rope = Rope::new(segments, rope_params)?;

        // Step 5: barriers.
        let mut barriers = Vec::new();
        let theta = config.wall_angle_degrees.to_radians();
        if let Some(wall) = Barrier::new(Vector::new(0.0, theta.sin(), theta.cos()), 0.0) {
            barriers.push(wall);
        }
        if config.ground_present {
            if let Some(ground) = Barrier::new(Vector::new(0.0, 1.0, 0.0), config.ground_level) {
                barriers.push(ground);
            }
        }

        // Step 6: one pass of re-meshing to absorb any already-short tail.
        rope.remesh(&mut bodies)?;

        Ok(Self {
            bodies,
            barriers,
            rope,
            gravity: Vector::new(0.0, -9.81, 0.0),
            max_step: config.physics_step_seconds,
            frame_interval: 1.0 / config.frame_rate,
            duration: config.simulation_duration,
        })
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn rope(&self) -> &Rope {
        &self.rope
    }

    pub fn gravity(&self) -> Vector {
        self.gravity
    }

    /// Barrier projection for every movable body, in barrier insertion
    /// order (§4.5).
    fn project_barriers(&mut self) {
        for body_idx in 0..self.bodies.len() {
            if self.bodies[body_idx].is_fixed() {
                continue;
            }
            let mut position = self.bodies[body_idx].position();
            let mut velocity = self.bodies[body_idx].velocity();
            for barrier in &self.barriers {
                let (p, v) = barrier.project(position, velocity);
                position = p;
                velocity = v;
            }
            self.bodies[body_idx].set_position(position);
            self.bodies[body_idx].set_velocity(velocity);
        }
    }

    fn clear_forces(&mut self) {
        for body in self.bodies.iter_mut() {
            if !body.is_fixed() {
                body.clear_force();
            }
        }
    }

    fn apply_rope_forces(&mut self) -> SimResult<()> {
        self.clear_forces();
        self.rope.apply_forces(&mut self.bodies, self.gravity)
    }

    fn integrate(&mut self, dt: f64) {
        for body in self.bodies.iter_mut() {
            body.integrate(dt);
            body.record_force_sample(dt);
        }
    }

    /// One full step at `dt` seconds: forces, integrate, barrier-project,
    /// Capstan sliding, re-mesh (§4.2-§4.4, ordering per §5). Exposed for
    /// callers that want single-step control instead of the batch
    /// behaviour of [`World::advance`].
    pub fn step(&mut self, dt: f64) -> SimResult<()> {
        self.apply_rope_forces()?;
        self.integrate(dt);
        self.project_barriers();
        self.rope.update_sliding(&self.bodies, dt);
        self.rope.remesh(&mut self.bodies)?;
        self.rope.warn_small_rest_lengths();
        Ok(())
    }

    fn take_snapshot(&self, time: f64) -> Snapshot {
        let mut records: Vec<BodySnapshot> = Vec::new();
        let rope_ids: std::collections::HashSet<u64> = {
            let mut set = std::collections::HashSet::new();
            set.insert(self.rope.belayer().raw());
            set.insert(self.rope.climber().raw());
            for segment in self.rope.segments() {
                set.insert(segment.a().raw());
                set.insert(segment.b().raw());
                for d in segment.deflections() {
                    set.insert(d.raw());
                }
            }
            set
        };
        for body in &self.bodies {
            if rope_ids.contains(&body.id().raw()) && body.kind() == BodyKind::RopeJoint {
                // rope-joint point masses are represented via the rope
                // polyline record below, not individually.
                continue;
            }
            records.push(point_mass_snapshot(body, self.gravity));
        }

        let mut rope_kinetic_energy = 0.0;
        let mut rope_potential_energy = 0.0;
        for body in &self.bodies {
            if body.kind() == BodyKind::RopeJoint {
                rope_kinetic_energy += body.kinetic_energy();
                rope_potential_energy += body.potential_energy(self.gravity);
            }
        }

        let mut polyline = Vec::new();
        let mut elastic_energy = 0.0;
        for segment in self.rope.segments() {
            let a_pos = self.bodies[segment.a().raw() as usize].position();
            polyline.push([a_pos.x(), a_pos.y(), a_pos.z()]);
            for d in segment.deflections() {
                let p = self.bodies[d.raw() as usize].position();
                polyline.push([p.x(), p.y(), p.z()]);
            }
            for (rest, len) in segment
                .partitions()
                .iter()
                .zip(segment_sub_edge_lengths(self, segment))
            {
                elastic_energy += 0.5 * (len - rest).powi(2) / (rest * self.rope.params().kappa);
            }
        }
        if let Some(segment) = self.rope.segments().last() {
            let b_pos = self.bodies[segment.b().raw() as usize].position();
            polyline.push([b_pos.x(), b_pos.y(), b_pos.z()]);
        }

        let rope_snapshot = BodySnapshot {
            body_type: SnapshotBodyType::Rope,
            id: u64::MAX,
            name: "rope".to_string(),
            instantaneous_force: 0.0,
            average_force: 0.0,
            force_avg_window: crate::body::DEFAULT_FORCE_AVG_WINDOW,
            kinetic_energy: rope_kinetic_energy,
            potential_energy: rope_potential_energy,
            elastic_energy,
            total_energy: rope_kinetic_energy + rope_potential_energy + elastic_energy,
            max_speed: 0.0,
            max_average_force: 0.0,
            visible: Visible::Rope { polyline },
            color: crate::snapshot::color_for_kind(BodyKind::RopeJoint),
            radius: 0.0,
            thickness: 0.01,
        };
        records.push(rope_snapshot);

        Snapshot {
            time,
            bodies: records,
        }
    }

    /// Runs the advance loop (§4.6) until `duration` elapses or
    /// `interrupt` is observed set, yielding cooperatively every ~500ms of
    /// wall-clock time (§5).
    pub fn advance(&mut self, interrupt: Arc<AtomicBool>) -> SimResult<Vec<Snapshot>> {
        let dt = self.max_step;
        let total_steps = (self.duration / dt).ceil() as u64;
        let mut snapshots = Vec::new();
        let mut last_snapshot_time = 0.0;
        let mut last_yield = Instant::now();
        let mut final_time = 0.0;

        info!(total_steps, dt, "advance loop starting");

        self.apply_rope_forces()?;
        snapshots.push(self.take_snapshot(0.0));
        last_snapshot_time = 0.0;

        for i in 1..=total_steps {
            self.step(dt)?;

            self.apply_rope_forces()?;

            let t = i as f64 * dt;
            final_time = t;
            if t - last_snapshot_time >= self.frame_interval {
                let snap = self.take_snapshot(t);
                debug!(time = t, count = snapshots.len(), "snapshot emitted");
                snapshots.push(snap);
                last_snapshot_time = t;
            }

            if last_yield.elapsed() >= YIELD_BUDGET {
                if interrupt.load(Ordering::SeqCst) {
                    info!(time = t, "advance loop interrupted");
                    return Ok(snapshots);
                }
                std::thread::yield_now();
                last_yield = Instant::now();
            }
        }

        info!(time = final_time, "advance loop completed");
        Ok(snapshots)
    }
}

fn cut_cumulative(cut: &Cut) -> f64 {
    match cut {
        Cut::Deflection { cumulative, .. } => *cumulative,
        Cut::Boundary { cumulative } => *cumulative,
    }
}

fn segment_sub_edge_lengths(world: &World, segment: &RopeSegment) -> Vec<f64> {
    let mut ids = vec![segment.a()];
    ids.extend_from_slice(segment.deflections());
    ids.push(segment.b());
    ids.windows(2)
        .map(|pair| {
            let pa = world.bodies[pair[0].raw() as usize].position();
            let pb = world.bodies[pair[1].raw() as usize].position();
            (pb - pa).length()
        })
        .collect()
}
