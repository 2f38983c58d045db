//! Half-space barrier constraints: the overhanging wall and optional
//! ground. Grounded on the teacher's `ClothCollider::Plane` handling in
//! `cloth.rs`, which already does position-plus-velocity plane projection;
//! here the shape is fixed to a half-space and there is no tangential
//! (sliding) friction term, per §4.5.

use crate::vector::Vector;

/// A closed half-space `{ x : n . x >= s }`. Immutable once constructed.
#[derive(Debug, Clone, Copy)]
pub struct Barrier {
    normal: Vector,
    shift: f64,
}

impl Barrier {
    /// `normal` need not already be unit length; it is normalized at
    /// construction. Returns `None` if `normal` is the zero vector.
    pub fn new(normal: Vector, shift: f64) -> Option<Self> {
        let normal = normal.normalize()?;
        Some(Self { normal, shift })
    }

    pub fn normal(&self) -> Vector {
        self.normal
    }

    pub fn shift(&self) -> f64 {
        self.shift
    }

    /// `n . p - s`; negative means `p` is on the excluded side.
    pub fn signed_distance(&self, position: Vector) -> f64 {
        self.normal.dot(&position) - self.shift
    }

    /// Projects a disallowed position back onto the boundary and, if the
    /// velocity points further into the barrier, zeroes only the inward
    /// component — the tangential component survives untouched (§4.5: no
    /// sliding friction on barriers).
    ///
    /// Returns the corrected `(position, velocity)`. A no-op if `position`
    /// is already on the allowed side.
    pub fn project(&self, position: Vector, velocity: Vector) -> (Vector, Vector) {
        let distance = self.signed_distance(position);
        if distance >= 0.0 {
            return (position, velocity);
        }
        let corrected_position = position + self.normal * (-distance);
        let inward = self.normal.dot(&velocity);
        let corrected_velocity = if inward < 0.0 {
            velocity + self.normal * (-inward)
        } else {
            velocity
        };
        (corrected_position, corrected_velocity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ground() -> Barrier {
        Barrier::new(Vector::new(0.0, 1.0, 0.0), 0.0).unwrap()
    }

    #[test]
    fn zero_normal_is_rejected() {
        assert!(Barrier::new(Vector::ZERO, 0.0).is_none());
    }

    #[test]
    fn position_above_ground_is_untouched() {
        let g = ground();
        let p = Vector::new(0.0, 1.0, 0.0);
        let v = Vector::new(1.0, -1.0, 0.0);
        let (p2, v2) = g.project(p, v);
        assert_eq!(p2, p);
        assert_eq!(v2, v);
    }

    #[test]
    fn position_below_ground_is_projected_to_surface() {
        let g = ground();
        let p = Vector::new(2.0, -0.5, 3.0);
        let v = Vector::new(1.0, -4.0, 0.0);
        let (p2, v2) = g.project(p, v);
        assert!((g.signed_distance(p2)).abs() < 1e-12);
        assert_eq!(p2.x(), 2.0);
        assert_eq!(p2.z(), 3.0);
        // inward (downward) component zeroed, tangential x preserved
        assert_eq!(v2.y(), 0.0);
        assert_eq!(v2.x(), 1.0);
    }

    #[test]
    fn outward_velocity_below_ground_is_not_clamped() {
        let g = ground();
        let p = Vector::new(0.0, -0.1, 0.0);
        let v = Vector::new(0.0, 3.0, 0.0);
        let (_, v2) = g.project(p, v);
        assert_eq!(v2.y(), 3.0);
    }

    #[test]
    fn overhanging_wall_projects_along_its_normal() {
        // wall leaning out over the climber: normal tilted from vertical
        let wall = Barrier::new(Vector::new(1.0, 0.0, 0.0), 0.2).unwrap();
        let p = Vector::new(0.0, 5.0, 0.0);
        let (p2, _) = wall.project(p, Vector::ZERO);
        assert!(wall.signed_distance(p2) >= -1e-12);
    }
}
