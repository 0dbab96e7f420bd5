//! Position/Direction newtypes over `glam::Vec3`, plus the Ray type.
//!
//! Grounded on `original_source/include/vec3.h` (the semantic split between
//! points and vectors under affine transforms) and on the teacher's use of
//! `glam` throughout `kernels/src/*.rs` for all vector algebra.

use glam::Vec3;

/// A point in space. Transforms as `M * p` (implicit w = 1) under an affine
/// transform.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position3(pub Vec3);

/// A free vector. Transforms as `M * d` (implicit w = 0) under an affine
/// transform; normals use the inverse-transpose instead (see
/// [`crate::transform::Transform`]).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Direction3(pub Vec3);

impl Position3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self(Vec3::new(x, y, z))
    }

    pub fn to_vec3(self) -> Vec3 {
        self.0
    }
}

impl std::ops::Sub for Position3 {
    type Output = Direction3;
    fn sub(self, rhs: Self) -> Direction3 {
        Direction3(self.0 - rhs.0)
    }
}

impl std::ops::Add<Direction3> for Position3 {
    type Output = Position3;
    fn add(self, rhs: Direction3) -> Position3 {
        Position3(self.0 + rhs.0)
    }
}

impl Direction3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self(Vec3::new(x, y, z))
    }

    pub fn to_vec3(self) -> Vec3 {
        self.0
    }

    pub fn dot(self, rhs: Direction3) -> f32 {
        self.0.dot(rhs.0)
    }

    pub fn cross(self, rhs: Direction3) -> Direction3 {
        Direction3(self.0.cross(rhs.0))
    }

    pub fn length(self) -> f32 {
        self.0.length()
    }

    /// Normalizes, except a zero-magnitude vector is returned unchanged
    /// (spec.md §7 "zero-magnitude vectors in normalize").
    pub fn normalize_or_self(self) -> Direction3 {
        if self.0 == Vec3::ZERO {
            self
        } else {
            Direction3(self.0.normalize())
        }
    }
}

impl std::ops::Neg for Direction3 {
    type Output = Direction3;
    fn neg(self) -> Direction3 {
        Direction3(-self.0)
    }
}

impl std::ops::Mul<f32> for Direction3 {
    type Output = Direction3;
    fn mul(self, rhs: f32) -> Direction3 {
        Direction3(self.0 * rhs)
    }
}

impl std::ops::Add for Direction3 {
    type Output = Direction3;
    fn add(self, rhs: Direction3) -> Direction3 {
        Direction3(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Direction3 {
    type Output = Direction3;
    fn sub(self, rhs: Direction3) -> Direction3 {
        Direction3(self.0 - rhs.0)
    }
}

/// An origin and unit-length direction. `point_at(t) = origin + direction * t`.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Position3,
    pub direction: Direction3,
}

impl Ray {
    pub fn new(origin: Position3, direction: Direction3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_self(),
        }
    }

    pub fn point_at(&self, t: f32) -> Position3 {
        self.origin + self.direction * t
    }
}

/// Hughes-Moller "build orthonormal basis from a single vector" routine.
/// Grounded on `kernels/src/util.rs::create_cartesian` and
/// `original_source`'s sphere tangent-frame construction; picks whichever of
/// x/y has greater magnitude to avoid dividing by a near-zero component.
pub fn orthonormal_basis(n: Direction3) -> (Direction3, Direction3) {
    let n = n.0;
    let sign = if n.z >= 0.0 { 1.0 } else { -1.0 };
    let a = -1.0 / (sign + n.z);
    let b = n.x * n.y * a;
    let t = Vec3::new(1.0 + sign * n.x * n.x * a, sign * b, -sign * n.x);
    let bt = Vec3::new(b, sign + n.y * n.y * a, -n.y);
    (Direction3(t), Direction3(bt))
}

pub fn clamped_dot(a: Direction3, b: Direction3) -> f32 {
    a.dot(b).max(0.0)
}

pub fn reflect(incident: Direction3, normal: Direction3) -> Direction3 {
    let i = incident.0;
    let n = normal.0;
    Direction3(i - n * 2.0 * i.dot(n))
}

/// Snell's law refraction. Returns the zero vector on total internal
/// reflection (spec.md §7: "signaled out-of-band as reflection-only").
pub fn refract(incident: Direction3, normal: Direction3, eta: f32) -> Direction3 {
    let i = incident.0;
    let n = normal.0;
    let cos_i = -i.dot(n);
    let sin2_t = eta * eta * (1.0 - cos_i * cos_i);
    if sin2_t > 1.0 {
        return Direction3(Vec3::ZERO);
    }
    let cos_t = (1.0 - sin2_t).sqrt();
    Direction3(i * eta + n * (eta * cos_i - cos_t))
}
