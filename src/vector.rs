//! Three-dimensional real vector with immutable arithmetic semantics.
//!
//! Wraps [`glam::DVec3`] rather than re-deriving vector algebra by hand —
//! the same choice the teacher crate makes for its particle and rigid-body
//! math. `f64` is used instead of `glam`'s usual `f32` because the
//! quantified invariants this crate is checked against (rest-length sums to
//! within 10⁻⁸, determinism to within 10⁻⁶) need more headroom than single
//! precision gives.

use glam::DVec3;

/// A point or direction in 3-space. Every operator returns a new value;
/// there is no in-place mutation in the public API.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Vector {
    inner: DVec3,
    /// Cached "this vector is known to have unit norm" flag, set only by
    /// [`Vector::normalize`] and cleared by any operator that could change
    /// the length.
    known_normalized: bool,
}

impl Vector {
    pub const ZERO: Vector = Vector {
        inner: DVec3::ZERO,
        known_normalized: false,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            inner: DVec3::new(x, y, z),
            known_normalized: false,
        }
    }

    pub fn x(&self) -> f64 {
        self.inner.x
    }

    pub fn y(&self) -> f64 {
        self.inner.y
    }

    pub fn z(&self) -> f64 {
        self.inner.z
    }

    pub fn dot(&self, other: &Vector) -> f64 {
        self.inner.dot(other.inner)
    }

    pub fn cross(&self, other: &Vector) -> Vector {
        Vector::from(self.inner.cross(other.inner))
    }

    pub fn length(&self) -> f64 {
        if self.known_normalized {
            1.0
        } else {
            self.inner.length()
        }
    }

    pub fn length_squared(&self) -> f64 {
        if self.known_normalized {
            1.0
        } else {
            self.inner.length_squared()
        }
    }

    /// Returns a unit-length vector along `self`, or `None` if `self` is
    /// (numerically) the zero vector.
    pub fn normalize(&self) -> Option<Vector> {
        if self.known_normalized {
            return Some(*self);
        }
        let len = self.inner.length();
        if len <= f64::EPSILON {
            None
        } else {
            Some(Vector {
                inner: self.inner / len,
                known_normalized: true,
            })
        }
    }

    pub fn is_finite(&self) -> bool {
        self.inner.is_finite()
    }
}

impl From<DVec3> for Vector {
    fn from(v: DVec3) -> Self {
        Self {
            inner: v,
            known_normalized: false,
        }
    }
}

impl From<Vector> for DVec3 {
    fn from(v: Vector) -> Self {
        v.inner
    }
}

impl std::ops::Add for Vector {
    type Output = Vector;
    fn add(self, rhs: Vector) -> Vector {
        Vector::from(self.inner + rhs.inner)
    }
}

impl std::ops::Sub for Vector {
    type Output = Vector;
    fn sub(self, rhs: Vector) -> Vector {
        Vector::from(self.inner - rhs.inner)
    }
}

impl std::ops::Neg for Vector {
    type Output = Vector;
    fn neg(self) -> Vector {
        Vector::from(-self.inner)
    }
}

impl std::ops::Mul<f64> for Vector {
    type Output = Vector;
    fn mul(self, rhs: f64) -> Vector {
        Vector::from(self.inner * rhs)
    }
}

impl std::ops::Div<f64> for Vector {
    type Output = Vector;
    fn div(self, rhs: f64) -> Vector {
        Vector::from(self.inner / rhs)
    }
}

impl std::ops::AddAssign for Vector {
    fn add_assign(&mut self, rhs: Vector) {
        *self = *self + rhs;
    }
}

impl Default for Vector {
    fn default() -> Self {
        Vector::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_vector_has_zero_length() {
        assert_eq!(Vector::ZERO.length(), 0.0);
    }

    #[test]
    fn normalize_zero_vector_is_none() {
        assert!(Vector::ZERO.normalize().is_none());
    }

    #[test]
    fn normalize_then_length_is_one() {
        let v = Vector::new(3.0, 4.0, 0.0);
        let n = v.normalize().unwrap();
        assert!((n.length() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn dot_of_orthogonal_unit_vectors_is_zero() {
        let a = Vector::new(1.0, 0.0, 0.0);
        let b = Vector::new(0.0, 1.0, 0.0);
        assert_eq!(a.dot(&b), 0.0);
    }

    #[test]
    fn cross_of_basis_vectors() {
        let x = Vector::new(1.0, 0.0, 0.0);
        let y = Vector::new(0.0, 1.0, 0.0);
        let z = x.cross(&y);
        assert_eq!(z, Vector::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn arithmetic_is_immutable() {
        let a = Vector::new(1.0, 1.0, 1.0);
        let b = a + Vector::new(1.0, 0.0, 0.0);
        assert_eq!(a, Vector::new(1.0, 1.0, 1.0));
        assert_eq!(b, Vector::new(2.0, 1.0, 1.0));
    }

    #[test]
    fn known_normalized_survives_copy() {
        let v = Vector::new(2.0, 0.0, 0.0).normalize().unwrap();
        let v2 = v;
        assert!((v2.length() - 1.0).abs() < 1e-15);
    }
}
