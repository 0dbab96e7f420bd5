//! Affine transform pair (forward + maintained inverse).
//!
//! Grounded on `original_source/include/traceable.h`'s world<->object space
//! ray bridge and spec.md §3 "Affine transform". Built on `glam::Affine3A`
//! rather than a hand-rolled 3x4 matrix, since `glam` (a teacher dependency)
//! already represents exactly this pair of basis + translation with a fast
//! inverse.

use glam::{Affine3A, Mat3A, Quat, Vec3};

use crate::math::{Direction3, Position3, Ray};

#[derive(Debug, Clone, Copy)]
pub struct Transform {
    forward: Affine3A,
    reverse: Affine3A,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            forward: Affine3A::IDENTITY,
            reverse: Affine3A::IDENTITY,
        }
    }

    pub fn from_translation(t: Vec3) -> Self {
        let forward = Affine3A::from_translation(t);
        Self {
            forward,
            reverse: forward.inverse(),
        }
    }

    pub fn from_translation_rotation_scale(t: Vec3, r: Quat, s: Vec3) -> Self {
        let forward = Affine3A::from_scale_rotation_translation(s, r, t);
        Self {
            forward,
            reverse: forward.inverse(),
        }
    }

    pub fn from_affine(forward: Affine3A) -> Self {
        Self {
            forward,
            reverse: forward.inverse(),
        }
    }

    /// Composes `self` then `other` (world = other(self(object))).
    pub fn then(&self, other: &Transform) -> Transform {
        let forward = other.forward * self.forward;
        Transform {
            forward,
            reverse: forward.inverse(),
        }
    }

    pub fn transform_position(&self, p: Position3) -> Position3 {
        Position3(self.forward.transform_point3(p.0))
    }

    pub fn transform_direction(&self, d: Direction3) -> Direction3 {
        Direction3(self.forward.transform_vector3(d.0))
    }

    pub fn inverse_transform_position(&self, p: Position3) -> Position3 {
        Position3(self.reverse.transform_point3(p.0))
    }

    pub fn inverse_transform_direction(&self, d: Direction3) -> Direction3 {
        Direction3(self.reverse.transform_vector3(d.0))
    }

    /// Transforms a normal by `(reverse)^T`, per spec.md §3.
    pub fn transform_normal(&self, n: Direction3) -> Direction3 {
        let linear: Mat3A = self.reverse.matrix3;
        Direction3(linear.transpose() * n.0)
    }

    pub fn inverse_transform_normal(&self, n: Direction3) -> Direction3 {
        let linear: Mat3A = self.forward.matrix3;
        Direction3(linear.transpose() * n.0)
    }

    /// Builds the object-space ray for a world-space ray, per
    /// `original_source/include/traceable.h`. Direction is re-normalized
    /// after transforming (non-uniform scale can change its length).
    pub fn world_to_object_ray(&self, ray: &Ray) -> Ray {
        let origin = self.inverse_transform_position(ray.origin);
        let direction = self.inverse_transform_direction(ray.direction);
        Ray::new(origin, direction)
    }

    /// Object-space minimum distance: transform the world-space minimum
    /// distance *point* into object space and measure from the object-space
    /// origin, rather than naively scaling the distance (spec.md §3, §4.3).
    pub fn world_to_object_min_distance(&self, world_ray: &Ray, world_min_distance: f32) -> f32 {
        let world_point = world_ray.point_at(world_min_distance);
        let object_point = self.inverse_transform_position(world_point);
        let object_origin = self.inverse_transform_position(world_ray.origin);
        (object_point.0 - object_origin.0).length()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::EulerRot;

    #[test]
    fn affine_round_trip() {
        let t = Transform::from_translation_rotation_scale(
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_euler(EulerRot::XYZ, 0.3, 0.5, 0.1),
            Vec3::new(1.5, 0.8, 2.0),
        );
        let p = Position3::new(0.3, -1.2, 4.0);
        let world = t.transform_position(p);
        let back = t.inverse_transform_position(world);
        assert!((back.0 - p.0).length() < 1e-4);
    }

    #[test]
    fn identity_ray_round_trips() {
        let t = Transform::identity();
        let ray = Ray::new(Position3::new(0.0, 0.0, 0.0), Direction3::new(0.0, 0.0, 1.0));
        let obj_ray = t.world_to_object_ray(&ray);
        assert!((obj_ray.origin.0 - ray.origin.0).length() < 1e-6);
        assert!((obj_ray.direction.0 - ray.direction.0).length() < 1e-6);
    }
}
