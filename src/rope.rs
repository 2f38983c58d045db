//! The rope: an ordered chain of [`RopeSegment`]s and joint bodies, with
//! the per-step aggregate force pass and the merge/split re-meshing driver
//! (§4.4). Grounded on the teacher's `Cloth`/`ClothManager` ownership
//! shape in `cloth.rs` — one owning collection driving `update()` over its
//! constraints each step — generalised from a fixed grid to a rope whose
//! topology itself changes every step.

use tracing::warn;

use crate::body::{alloc_body, Body, BodyId, BodyKind};
use crate::error::{SimError, SimResult};
use crate::segment::{RopeParams, RopeSegment};
use crate::vector::Vector;

/// A rope owns its segments and, implicitly, the joint bodies at each
/// segment boundary (`segments[i].b() == segments[i + 1].a()`).
#[derive(Debug, Clone)]
pub struct Rope {
    segments: Vec<RopeSegment>,
    params: RopeParams,
}

impl Rope {
    pub fn new(segments: Vec<RopeSegment>, params: RopeParams) -> SimResult<Self> {
        if segments.is_empty() {
            return Err(SimError::EmptyRope {
                deflection_points: 0,
            });
        }
        Ok(Self { segments, params })
    }

    pub fn params(&self) -> &RopeParams {
        &self.params
    }

    pub fn segments(&self) -> &[RopeSegment] {
        &self.segments
    }

    pub fn belayer(&self) -> BodyId {
        self.segments[0].a()
    }

    pub fn climber(&self) -> BodyId {
        self.segments[self.segments.len() - 1].b()
    }

    /// Sum of every segment's rest length; must track the rope's
    /// configured rest length within 10⁻⁸ · L_rest (§8.1).
    pub fn rest_length(&self) -> f64 {
        self.segments.iter().map(|s| s.rest_length()).sum()
    }

    /// Sum of every segment's mass; must track the rope's initial mass
    /// within 10⁻⁸ kg across merges and splits (§8.2).
    pub fn total_mass(&self) -> f64 {
        self.segments.iter().map(|s| s.mass()).sum()
    }

    pub fn deflection_point_count(&self) -> usize {
        self.segments.iter().map(|s| s.deflections().len()).sum()
    }

    /// Gravity + spring + damping force pass over every segment, in
    /// ascending index order (§4.2, §5 ordering guarantee).
    pub fn apply_forces(&mut self, bodies: &mut [Body], gravity: Vector) -> SimResult<()> {
        let last = self.segments.len() - 1;
        for (i, segment) in self.segments.iter().enumerate() {
            segment.apply_gravity(bodies, gravity, i == last);
        }
        for (i, segment) in self.segments.iter_mut().enumerate() {
            segment.apply_forces(bodies, &self.params, i)?;
        }
        Ok(())
    }

    /// Capstan sliding update for every segment (§4.3), run after barrier
    /// projection per the data-flow order in §2.
    pub fn update_sliding(&mut self, bodies: &[Body], dt: f64) {
        for segment in self.segments.iter_mut() {
            segment.update_sliding(bodies, dt);
        }
    }

    /// Recomputes every interior joint's mass from the ½-neighbour rule,
    /// leaving the two rope ends (belayer, climber) at their configured
    /// mass — they never receive donated rope mass (§4.4).
    fn rebalance_joints(&self, bodies: &mut [Body]) {
        for i in 1..self.segments.len() {
            let joint = self.segments[i - 1].b();
            let mass = 0.5 * self.segments[i - 1].mass() + 0.5 * self.segments[i].mass();
            bodies[joint.raw() as usize].set_mass(mass);
        }
    }

    /// Recoverable-warning scan: sub-edges shorter than half of `L_min`.
    pub fn warn_small_rest_lengths(&self) {
        for (i, segment) in self.segments.iter().enumerate() {
            for sub_edge in segment.small_rest_length_indices(self.params.rest_min) {
                warn!(segment = i, sub_edge, "rope partition below half of L_min");
            }
        }
    }

    /// Runs Pass A (merge) then Pass B (split) once, per §4.4.
    pub fn remesh(&mut self, bodies: &mut Vec<Body>) -> SimResult<()> {
        self.pass_a_merge(bodies)?;
        self.pass_b_split(bodies)?;
        Ok(())
    }

    fn pass_a_merge(&mut self, bodies: &mut Vec<Body>) -> SimResult<()> {
        let mut i = 0usize;
        let mut guard = 0usize;
        while i < self.segments.len() {
            guard += 1;
            if guard > 10_000 {
                break;
            }
            if self.try_merge_front(i) {
                self.rebalance_joints(bodies);
                continue;
            }
            if self.try_merge_back(i) {
                self.rebalance_joints(bodies);
                continue;
            }
            i += 1;
        }
        Ok(())
    }

    /// Handles `partition[0] < L_min` for segment `i`.
    fn try_merge_front(&mut self, i: usize) -> bool {
        let rest_min = self.params.rest_min;
        let first_too_short = self.segments[i].partitions()[0] < rest_min;
        if !first_too_short {
            return false;
        }
        let has_deflections = !self.segments[i].deflections().is_empty();
        if i == 0 {
            if has_deflections {
                let seg = &mut self.segments[0];
                let absorbed = seg.partitions()[0];
                seg.partitions_mut().remove(0);
                seg.partitions_mut()[0] += absorbed;
                seg.deflections_mut().remove(0);
                seg.sliding_speeds_mut().remove(0);
                seg.recompute_rest_length();
                true
            } else {
                warn!(segment = 0, "degenerate short tail with no deflection to slip");
                false
            }
        } else {
            self.merge_pair(i - 1, i);
            true
        }
    }

    /// Handles `partition[last] < L_min` for segment `i`.
    fn try_merge_back(&mut self, i: usize) -> bool {
        let rest_min = self.params.rest_min;
        let last_idx = self.segments[i].partitions().len() - 1;
        let last_too_short = self.segments[i].partitions()[last_idx] < rest_min;
        if !last_too_short {
            return false;
        }
        let has_deflections = !self.segments[i].deflections().is_empty();
        let is_last = i + 1 == self.segments.len();
        if is_last {
            if has_deflections {
                let seg = &mut self.segments[i];
                let last = seg.partitions().len() - 1;
                let absorbed = seg.partitions()[last];
                seg.partitions_mut().pop();
                let new_last = seg.partitions().len() - 1;
                seg.partitions_mut()[new_last] += absorbed;
                seg.deflections_mut().pop();
                seg.sliding_speeds_mut().pop();
                seg.recompute_rest_length();
                true
            } else {
                warn!(segment = i, "degenerate short tail with no deflection to slip");
                false
            }
        } else {
            self.merge_pair(i, i + 1);
            true
        }
    }

    /// Merges segment `right` into segment `left` (`left` adopts its own
    /// `a`, the merged segment's `b` becomes `right`'s `b`); deletes
    /// `right` from the rope.
    fn merge_pair(&mut self, left: usize, right: usize) {
        debug_assert_eq!(left + 1, right);
        let right_seg = self.segments.remove(right);
        let left_seg = &mut self.segments[left];

        let mut partitions = left_seg.partitions().to_vec();
        let boundary = partitions.pop().unwrap() + right_seg.partitions()[0];
        partitions.push(boundary);
        partitions.extend_from_slice(&right_seg.partitions()[1..]);

        let mut deflections = left_seg.deflections().to_vec();
        deflections.extend_from_slice(right_seg.deflections());

        let mass = left_seg.mass() + right_seg.mass();
        let b = right_seg.b();

        *left_seg = RopeSegment::new(left_seg.a(), b, mass, partitions, deflections);
    }

    fn pass_b_split(&mut self, bodies: &mut Vec<Body>) -> SimResult<()> {
        let mut i = 0usize;
        let mut guard = 0usize;
        while i < self.segments.len() {
            guard += 1;
            if guard > 10_000 {
                break;
            }
            if self.try_split_front(i, bodies)? {
                continue;
            }
            if self.try_split_back(i, bodies)? {
                continue;
            }
            self.check_interior_bounds(i)?;
            i += 1;
        }
        Ok(())
    }

    fn check_interior_bounds(&self, i: usize) -> SimResult<()> {
        let partitions = self.segments[i].partitions();
        if partitions.len() <= 2 {
            return Ok(());
        }
        for (p_idx, &p) in partitions.iter().enumerate().skip(1).take(partitions.len() - 2) {
            if p > self.params.rest_max {
                return Err(SimError::UnsupportedInteriorSplit {
                    segment: i,
                    partition: p_idx,
                });
            }
        }
        Ok(())
    }

    /// Handles `partition[0] > L_max` for segment `i`: splits off a new
    /// segment of rest length `L_default` between `A` and the first
    /// deflection point.
    fn try_split_front(&mut self, i: usize, bodies: &mut Vec<Body>) -> SimResult<bool> {
        let rest_max = self.params.rest_max;
        let rest_default = self.params.rest_default;
        let seg = &self.segments[i];
        if seg.partitions()[0] <= rest_max || seg.deflections().is_empty() {
            return Ok(false);
        }
        let old_partition0 = seg.partitions()[0];
        let fraction = rest_default / old_partition0;
        let original_a = seg.a();
        let d0 = seg.deflections()[0];
        let a_pos = bodies[original_a.raw() as usize].position();
        let d0_pos = bodies[d0.raw() as usize].position();
        let a_vel = bodies[original_a.raw() as usize].velocity();
        let new_pos = a_pos + (d0_pos - a_pos) * fraction;
        let new_mass_fraction = rest_default / seg.rest_length();
        let new_segment_mass = seg.mass() * new_mass_fraction;

        let new_joint = alloc_body(bodies, BodyKind::RopeJoint, new_pos, 0.0, 0.999, 0.0);
        bodies[new_joint.raw() as usize].set_velocity(a_vel);

        let seg_mut = &mut self.segments[i];
        seg_mut.set_mass(seg_mut.mass() - new_segment_mass);
        seg_mut.partitions_mut()[0] -= rest_default;
        seg_mut.recompute_rest_length();
        seg_mut.set_a(new_joint);

        let new_segment = RopeSegment::new(original_a, new_joint, new_segment_mass, vec![rest_default], vec![]);
        self.segments.insert(i, new_segment);
        self.rebalance_joints(bodies);
        Ok(true)
    }

    /// Handles `partition[last] > L_max` for segment `i`: splits off a new
    /// segment of rest length `L_default` between the last deflection
    /// point and `B`.
    fn try_split_back(&mut self, i: usize, bodies: &mut Vec<Body>) -> SimResult<bool> {
        let rest_max = self.params.rest_max;
        let rest_default = self.params.rest_default;
        let seg = &self.segments[i];
        let last = seg.partitions().len() - 1;
        if seg.partitions()[last] <= rest_max || seg.deflections().is_empty() {
            return Ok(false);
        }
        let old_partition_last = seg.partitions()[last];
        let fraction = rest_default / old_partition_last;
        let original_b = seg.b();
        let dn = seg.deflections()[seg.deflections().len() - 1];
        let b_pos = bodies[original_b.raw() as usize].position();
        let dn_pos = bodies[dn.raw() as usize].position();
        let b_vel = bodies[original_b.raw() as usize].velocity();
        let new_pos = b_pos + (dn_pos - b_pos) * fraction;
        let new_mass_fraction = rest_default / seg.rest_length();
        let new_segment_mass = seg.mass() * new_mass_fraction;

        let new_joint = alloc_body(bodies, BodyKind::RopeJoint, new_pos, 0.0, 0.999, 0.0);
        bodies[new_joint.raw() as usize].set_velocity(b_vel);

        let seg_mut = &mut self.segments[i];
        seg_mut.set_mass(seg_mut.mass() - new_segment_mass);
        let last_idx = seg_mut.partitions().len() - 1;
        seg_mut.partitions_mut()[last_idx] -= rest_default;
        seg_mut.recompute_rest_length();
        seg_mut.set_b(new_joint);

        let new_segment = RopeSegment::new(new_joint, original_b, new_segment_mass, vec![rest_default], vec![]);
        self.segments.insert(i + 1, new_segment);
        self.rebalance_joints(bodies);
        Ok(true)
    }
}
