//! Spring-damper rope segments with Capstan-friction deflection points.
//!
//! This is the largest single piece of the solver (§4.2-§4.4 of the design
//! this crate implements). It is grounded on the teacher's
//! `DistanceConstraint`/`ClothCollider` position-and-velocity-correction
//! style in `cloth.rs`, generalised from a single spring to a polyline of
//! sub-edges threaded through deflection points, with Capstan sliding and
//! rest-length transport layered on top.

use crate::body::{Body, BodyId};
use crate::error::{SimError, SimResult};
use crate::vector::Vector;

/// Rope-wide constants shared by every segment of a [`crate::rope::Rope`],
/// kept in one place so merging/splitting never has to reconcile divergent
/// copies (§3: "elasticity constant... shared across a rope").
#[derive(Debug, Clone, Copy)]
pub struct RopeParams {
    /// 1/Newton elasticity constant, κ.
    pub kappa: f64,
    /// Transverse (shear) damping coefficient.
    pub d_perp: f64,
    /// Longitudinal (stretch-rate) damping coefficient.
    pub d_par: f64,
    pub rest_min: f64,
    pub rest_max: f64,
    pub rest_default: f64,
}

/// Numerical tolerance for rest-length partition bookkeeping (§4.2).
pub const REST_LENGTH_EPS: f64 = 1e-10;

/// A spring-damper between two joint bodies, threading zero or more
/// deflection points. Holds only [`BodyId`]s, never borrows bodies — the
/// arena-with-indices ownership model (§9 design notes).
#[derive(Debug, Clone)]
pub struct RopeSegment {
    a: BodyId,
    b: BodyId,
    mass: f64,
    rest_length: f64,
    /// `partitions.len() == deflections.len() + 1`; sums to `rest_length`.
    partitions: Vec<f64>,
    deflections: Vec<BodyId>,
    /// Signed sliding speed at each deflection point; positive = A-to-B.
    sliding_speeds: Vec<f64>,
    /// Sub-edge tensions computed by the most recent `apply_forces` call,
    /// cached for the Capstan sliding update that follows barrier
    /// projection in the same step (§2 data flow order).
    cached_tensions: Vec<f64>,
}

impl RopeSegment {
    pub fn new(a: BodyId, b: BodyId, mass: f64, partitions: Vec<f64>, deflections: Vec<BodyId>) -> Self {
        debug_assert_eq!(partitions.len(), deflections.len() + 1);
        let rest_length = partitions.iter().sum();
        let n = deflections.len();
        Self {
            a,
            b,
            mass,
            rest_length,
            partitions,
            deflections,
            sliding_speeds: vec![0.0; n],
            cached_tensions: Vec::new(),
        }
    }

    pub fn a(&self) -> BodyId {
        self.a
    }

    pub fn b(&self) -> BodyId {
        self.b
    }

    pub fn set_a(&mut self, a: BodyId) {
        self.a = a;
    }

    pub fn set_b(&mut self, b: BodyId) {
        self.b = b;
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn set_mass(&mut self, mass: f64) {
        self.mass = mass;
    }

    pub fn rest_length(&self) -> f64 {
        self.rest_length
    }

    pub fn partitions(&self) -> &[f64] {
        &self.partitions
    }

    pub fn partitions_mut(&mut self) -> &mut Vec<f64> {
        &mut self.partitions
    }

    pub fn deflections(&self) -> &[BodyId] {
        &self.deflections
    }

    pub fn deflections_mut(&mut self) -> &mut Vec<BodyId> {
        &mut self.deflections
    }

    pub fn sliding_speeds_mut(&mut self) -> &mut Vec<f64> {
        &mut self.sliding_speeds
    }

    pub fn sub_edge_count(&self) -> usize {
        self.deflections.len() + 1
    }

    /// Recomputes `rest_length` from the current partitions; called after
    /// any re-meshing mutation of `partitions`.
    pub fn recompute_rest_length(&mut self) {
        self.rest_length = self.partitions.iter().sum();
    }

    fn polyline(&self) -> Vec<BodyId> {
        let mut v = Vec::with_capacity(self.deflections.len() + 2);
        v.push(self.a);
        v.extend_from_slice(&self.deflections);
        v.push(self.b);
        v
    }

    /// Unit direction and length of every sub-edge, in A-to-B order.
    /// Returns a `CollocatedDeflectionPoint` error for any sub-edge whose
    /// endpoints coincide.
    fn sub_edges(&self, bodies: &[Body], segment_index: usize) -> SimResult<Vec<(Vector, f64)>> {
        let ids = self.polyline();
        let mut out = Vec::with_capacity(ids.len() - 1);
        for (i, pair) in ids.windows(2).enumerate() {
            let pa = bodies[pair[0].raw() as usize].position();
            let pb = bodies[pair[1].raw() as usize].position();
            let delta = pb - pa;
            let len = delta.length();
            if len <= f64::EPSILON {
                return Err(SimError::CollocatedDeflectionPoint {
                    segment: segment_index,
                    sub_edge: i,
                });
            }
            out.push((delta / len, len));
        }
        Ok(out)
    }

    /// Validates that the partitions still sum to `rest_length` within
    /// [`REST_LENGTH_EPS`] and that none is exactly zero.
    fn validate_partitions(&self, segment_index: usize) -> SimResult<()> {
        let sum: f64 = self.partitions.iter().sum();
        if (sum - self.rest_length).abs() > REST_LENGTH_EPS.max(self.rest_length * REST_LENGTH_EPS)
        {
            return Err(SimError::RestLengthMismatch {
                segment: segment_index,
                expected: self.rest_length,
                actual: sum,
                eps: REST_LENGTH_EPS,
            });
        }
        for (i, &p) in self.partitions.iter().enumerate() {
            if p == 0.0 {
                return Err(SimError::ZeroRestLengthPartition {
                    segment: segment_index,
                    partition: i,
                });
            }
        }
        Ok(())
    }

    /// Sub-edges whose partition entry is below half of `rest_min` — a
    /// recoverable warning condition (§7 "Small rest length").
    pub fn small_rest_length_indices(&self, rest_min: f64) -> Vec<usize> {
        self.partitions
            .iter()
            .enumerate()
            .filter(|(_, &p)| p < 0.5 * rest_min)
            .map(|(i, _)| i)
            .collect()
    }

    /// Clears force on A and B (A always; B only when `contributes_b`, so
    /// the climber end only receives gravity/spring contribution once
    /// across the whole rope — §4.2 "but only once per body").
    pub fn apply_gravity(&self, bodies: &mut [Body], gravity: Vector, contributes_b: bool) {
        let a_idx = self.a.raw() as usize;
        let mass_a = bodies[a_idx].mass();
        bodies[a_idx].apply_force(gravity * mass_a);
        if contributes_b {
            let b_idx = self.b.raw() as usize;
            let mass_b = bodies[b_idx].mass();
            bodies[b_idx].apply_force(gravity * mass_b);
        }
    }

    /// Spring tension, transverse damping, and longitudinal damping for
    /// this segment (§4.2). Tensions are cached for the Capstan pass.
    pub fn apply_forces(
        &mut self,
        bodies: &mut [Body],
        params: &RopeParams,
        segment_index: usize,
    ) -> SimResult<()> {
        self.validate_partitions(segment_index)?;
        let edges = self.sub_edges(bodies, segment_index)?;

        let tensions: Vec<f64> = edges
            .iter()
            .zip(self.partitions.iter())
            .map(|((_, len), &rest)| (len - rest) / (rest * params.kappa))
            .collect();
        self.cached_tensions = tensions.clone();

        let (u_a, _) = edges[0];
        let (u_b, _) = *edges.last().unwrap();
        let tau_0 = tensions[0];
        let tau_n = *tensions.last().unwrap();

        let a_idx = self.a.raw() as usize;
        let b_idx = self.b.raw() as usize;
        bodies[a_idx].apply_force(u_a * tau_0);
        bodies[b_idx].apply_force(u_b * (-tau_n));

        let a_movable = !bodies[a_idx].is_fixed();
        let b_movable = !bodies[b_idx].is_fixed();
        if a_movable && b_movable {
            let v_a = bodies[a_idx].velocity();
            let v_b = bodies[b_idx].velocity();
            let v_perp_a = v_a - u_a * v_a.dot(&u_a);
            let v_perp_b = v_b - u_b * v_b.dot(&u_b);
            let transverse = (v_perp_a + v_perp_b) * (-params.d_perp / self.rest_length);
            bodies[a_idx].apply_force(transverse);
            bodies[b_idx].apply_force(transverse);
        }

        // Longitudinal damping only needs at least one movable endpoint —
        // a fixed endpoint contributes v=0 to lambda and still damps the
        // other end, so this is not gated behind `a_movable && b_movable`.
        if a_movable || b_movable {
            let v_a = bodies[a_idx].velocity();
            let v_b = bodies[b_idx].velocity();
            let lambda = v_a.dot(&(-u_a)) + v_b.dot(&u_b);
            let scale = params.d_par / self.rest_length * lambda;
            bodies[a_idx].apply_force(u_a * scale);
            bodies[b_idx].apply_force(u_b * (-scale));
        }

        Ok(())
    }

    /// Capstan sliding update for every interior deflection point of this
    /// segment (§4.3). Runs after barrier projection, using the tensions
    /// cached by the most recent `apply_forces` call.
    pub fn update_sliding(&mut self, bodies: &[Body], dt: f64) {
        let n = self.deflections.len();
        if n == 0 || self.cached_tensions.len() < n + 1 {
            return;
        }
        let edges_dirs: Vec<Vector> = {
            let ids = self.polyline();
            ids.windows(2)
                .map(|pair| {
                    let pa = bodies[pair[0].raw() as usize].position();
                    let pb = bodies[pair[1].raw() as usize].position();
                    (pb - pa).normalize().unwrap_or(Vector::ZERO)
                })
                .collect()
        };

        for k in 0..n {
            let mu = bodies[self.deflections[k].raw() as usize].friction();
            let tau_l = self.cached_tensions[k];
            let tau_r = self.cached_tensions[k + 1];
            let delta = tau_r - tau_l;

            let incoming = edges_dirs[k];
            let outgoing = edges_dirs[k + 1];
            let cos_theta = incoming.dot(&outgoing).clamp(-1.0, 1.0);
            let theta = cos_theta.acos();

            let f_mu = if tau_l > 0.0 && tau_r > 0.0 {
                tau_l.min(tau_r) * ((mu * theta).exp() - 1.0)
            } else {
                0.0
            };

            let s = self.sliding_speeds[k];
            let effective = if s > 0.0 {
                delta - f_mu
            } else if s < 0.0 {
                delta + f_mu
            } else if delta.abs() <= f_mu {
                0.0
            } else {
                delta - delta.signum() * f_mu
            };

            let mass = if self.mass > 0.0 { self.mass } else { 1.0 };
            let a = effective / mass;
            let mut new_s = s + a * dt;
            let static_would_hold = delta.abs() <= f_mu;
            if static_would_hold && (new_s.abs() < (a * dt).abs() + REST_LENGTH_EPS) {
                new_s = 0.0;
            }
            self.sliding_speeds[k] = new_s;

            let transported = new_s * dt;
            self.partitions[k] -= transported;
            self.partitions[k + 1] += transported;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyKind;

    fn make_bodies(positions: &[Vector]) -> Vec<Body> {
        positions
            .iter()
            .enumerate()
            .map(|(i, &p)| Body::new(BodyId::from_raw(i as u64), BodyKind::Generic, p, 1.0, 0.999, 0.1))
            .collect()
    }

    fn default_params() -> RopeParams {
        RopeParams {
            kappa: 1e-3,
            d_perp: 0.02,
            d_par: 0.1,
            rest_min: 0.01,
            rest_max: 1.0,
            rest_default: 0.1,
        }
    }

    #[test]
    fn stretched_segment_pulls_endpoints_together() {
        let mut bodies = make_bodies(&[Vector::new(0.0, 0.0, 0.0), Vector::new(2.0, 0.0, 0.0)]);
        let mut seg = RopeSegment::new(BodyId::from_raw(0), BodyId::from_raw(1), 0.0, vec![1.0], vec![]);
        let params = default_params();
        bodies[0].clear_force();
        bodies[1].clear_force();
        seg.apply_forces(&mut bodies, &params, 0).unwrap();
        // A is pulled toward B (+x), B is pulled toward A (-x)
        assert!(bodies[0].force().x() > 0.0);
        assert!(bodies[1].force().x() < 0.0);
    }

    #[test]
    fn collocated_endpoints_are_a_fatal_error() {
        let mut bodies = make_bodies(&[Vector::ZERO, Vector::ZERO]);
        let mut seg = RopeSegment::new(BodyId::from_raw(0), BodyId::from_raw(1), 0.0, vec![1.0], vec![]);
        let params = default_params();
        let err = seg.apply_forces(&mut bodies, &params, 3).unwrap_err();
        assert_eq!(
            err,
            SimError::CollocatedDeflectionPoint {
                segment: 3,
                sub_edge: 0
            }
        );
    }

    #[test]
    fn capstan_sticks_when_pulling_force_is_within_friction_capacity() {
        let bodies = make_bodies(&[
            Vector::new(-1.0, 0.0, 0.0),
            Vector::new(0.0, -1.0, 0.0),
            Vector::new(1.0, 0.0, 0.0),
        ]);
        let mut seg = RopeSegment::new(
            BodyId::from_raw(0),
            BodyId::from_raw(2),
            0.1,
            vec![0.5, 0.5],
            vec![BodyId::from_raw(1)],
        );
        // equal tensions on both sides -> delta = 0 -> always sticks
        seg.cached_tensions = vec![5.0, 5.0];
        seg.update_sliding(&bodies, 0.01);
        assert_eq!(seg.sliding_speeds[0], 0.0);
        assert_eq!(seg.partitions[0], 0.5);
        assert_eq!(seg.partitions[1], 0.5);
    }

    #[test]
    fn capstan_slides_when_pulling_force_exceeds_friction_capacity() {
        let bodies = make_bodies(&[
            Vector::new(-1.0, 0.0, 0.0),
            Vector::new(0.0, -1.0, 0.0),
            Vector::new(1.0, 0.0, 0.0),
        ]);
        let mut seg = RopeSegment::new(
            BodyId::from_raw(0),
            BodyId::from_raw(2),
            0.1,
            vec![0.5, 0.5],
            vec![BodyId::from_raw(1)],
        );
        seg.cached_tensions = vec![100.0, 1.0];
        seg.update_sliding(&bodies, 0.01);
        assert_ne!(seg.sliding_speeds[0], 0.0);
    }
}
