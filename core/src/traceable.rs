//! World-space wrapper bridging a `Shape` and its `Transform`.
//!
//! Grounded on `original_source/include/traceable.h`: build the object-space
//! ray, evaluate the shape, transform hits back to world space. Also hosts
//! the disk light's double duty as intersectable geometry (spec.md §3
//! "Light variants").

use crate::intersection::RayIntersection;
use crate::math::Ray;
use crate::shapes::slab::Slab;
use crate::shapes::Shape;
use crate::transform::Transform;

pub struct Traceable {
    pub shape: Shape,
    pub transform: Transform,
}

impl Traceable {
    pub fn new(shape: Shape, transform: Transform) -> Self {
        Self { shape, transform }
    }

    pub fn intersects(&self, ray: &Ray, min_dist: f32, max_dist: f32) -> bool {
        let object_ray = self.transform.world_to_object_ray(ray);
        let object_min_dist = self.transform.world_to_object_min_distance(ray, min_dist);
        // max_dist is carried in world-space units; under non-uniform scale
        // this is an approximation shared with the source (object-space max
        // isn't separately re-derived, matching the asymmetry spec.md §3
        // only calls out for min-distance).
        self.shape.intersects(&object_ray, object_min_dist, max_dist)
    }

    pub fn find_intersection(&self, ray: &Ray, min_dist: f32) -> Option<RayIntersection> {
        let object_ray = self.transform.world_to_object_ray(ray);
        let object_min_dist = self.transform.world_to_object_min_distance(ray, min_dist);
        let mut hit = self.shape.find_intersection(&object_ray, object_min_dist)?;

        hit.position = self.transform.transform_position(hit.position);
        hit.normal = self.transform.transform_normal(hit.normal).normalize_or_self();
        hit.tangent = self.transform.transform_direction(hit.tangent).normalize_or_self();
        hit.bitangent = self.transform.transform_direction(hit.bitangent).normalize_or_self();
        hit.distance = (hit.position.0 - ray.origin.0).length();
        hit.ray = *ray;

        Some(hit)
    }

    pub fn world_bounding_slab(&self) -> Slab {
        // Conservative: transform the 8 corners of the object-space bound.
        let local = self.shape.bounding_slab();
        let corners = [
            glam::Vec3::new(local.min.0.x, local.min.0.y, local.min.0.z),
            glam::Vec3::new(local.max.0.x, local.min.0.y, local.min.0.z),
            glam::Vec3::new(local.min.0.x, local.max.0.y, local.min.0.z),
            glam::Vec3::new(local.max.0.x, local.max.0.y, local.min.0.z),
            glam::Vec3::new(local.min.0.x, local.min.0.y, local.max.0.z),
            glam::Vec3::new(local.max.0.x, local.min.0.y, local.max.0.z),
            glam::Vec3::new(local.min.0.x, local.max.0.y, local.max.0.z),
            glam::Vec3::new(local.max.0.x, local.max.0.y, local.max.0.z),
        ];
        let mut min = glam::Vec3::splat(f32::INFINITY);
        let mut max = glam::Vec3::splat(f32::NEG_INFINITY);
        for c in corners {
            let world = self
                .transform
                .transform_position(crate::math::Position3(c))
                .0;
            min = min.min(world);
            max = max.max(world);
        }
        Slab::from_min_max(
            crate::math::Position3(min),
            crate::math::Position3(max),
            crate::intersection::NO_MATERIAL,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Direction3, Position3};
    use crate::shapes::sphere::Sphere;
    use glam::{Quat, Vec3};

    #[test]
    fn scaled_sphere_hits_in_world_space() {
        let shape = Shape::Sphere(Sphere::new(Position3::new(0.0, 0.0, 0.0), 1.0, 0));
        let transform = Transform::from_translation_rotation_scale(
            Vec3::new(5.0, 0.0, 0.0),
            Quat::IDENTITY,
            Vec3::splat(2.0),
        );
        let obj = Traceable::new(shape, transform);
        let ray = Ray::new(Position3::new(5.0, 0.0, -10.0), Direction3::new(0.0, 0.0, 1.0));
        let hit = obj.find_intersection(&ray, 0.0).unwrap();
        // Scaled radius is 2.0, centered at x=5 z=0: surface hit at z=-2.
        assert!((hit.distance - 8.0).abs() < 1e-3);
    }
}
