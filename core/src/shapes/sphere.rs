//! Ray/sphere intersection. Grounded on spec.md §4.1 "Sphere" and the
//! quadratic-solve + Hughes-Moller tangent frame used throughout the
//! teacher's `kernels/src/intersection.rs` triangle path (the basis routine
//! itself lives in `crate::math::orthonormal_basis`).

use crate::intersection::{RayIntersection, NO_MATERIAL};
use crate::math::{orthonormal_basis, Position3, Ray};
use crate::texture::TextureCoordinate;

#[derive(Debug, Clone, Copy)]
pub struct Sphere {
    pub center: Position3,
    pub radius: f32,
    pub material: u32,
}

impl Sphere {
    pub fn new(center: Position3, radius: f32, material: u32) -> Self {
        Self {
            center,
            radius,
            material,
        }
    }

    fn roots(&self, ray: &Ray) -> Option<(f32, f32)> {
        let oc = ray.origin.0 - self.center.0;
        let b = oc.dot(ray.direction.0);
        let c = oc.length_squared() - self.radius * self.radius;
        let disc = b * b - c;
        if disc < 0.0 {
            return None;
        }
        let sqrt_disc = disc.sqrt();
        Some((-b - sqrt_disc, -b + sqrt_disc))
    }

    pub fn intersects(&self, ray: &Ray, min_dist: f32, max_dist: f32) -> bool {
        match self.roots(ray) {
            None => false,
            Some((t1, t2)) => {
                let t = if t1 >= min_dist { t1 } else { t2 };
                t >= min_dist && t <= max_dist
            }
        }
    }

    pub fn find_intersection(&self, ray: &Ray, min_dist: f32) -> Option<RayIntersection> {
        let (t1, t2) = self.roots(ray)?;
        let t = if t1 >= min_dist {
            t1
        } else if t2 >= min_dist {
            t2
        } else {
            return None;
        };

        let position = ray.point_at(t);
        let normal = (position - self.center) * (1.0 / self.radius);
        let (tangent, bitangent) = orthonormal_basis(normal);

        Some(RayIntersection {
            ray: *ray,
            position,
            normal,
            tangent,
            bitangent,
            distance: t,
            material: self.material,
            texcoord: TextureCoordinate::default(),
            has_texcoord: false,
        })
    }

    pub fn bounding_slab(&self) -> super::slab::Slab {
        let r = glam::Vec3::splat(self.radius);
        super::slab::Slab::from_min_max(
            Position3(self.center.0 - r),
            Position3(self.center.0 + r),
            NO_MATERIAL,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Direction3;

    #[test]
    fn hit_lies_on_sphere_surface() {
        let s = Sphere::new(Position3::new(0.0, 0.0, 0.0), 2.0, 0);
        let ray = Ray::new(Position3::new(-5.0, 0.3, 0.1), Direction3::new(1.0, 0.0, 0.0));
        let hit = s.find_intersection(&ray, 0.0).unwrap();
        assert!((hit.position.0 - s.center.0).length() - s.radius < 1e-4);
        assert!(hit.distance >= 0.0);
        let expected = ray.point_at(hit.distance);
        assert!((expected.0 - hit.position.0).length() < 1e-4);
    }

    #[test]
    fn min_dist_skips_near_root() {
        let s = Sphere::new(Position3::new(0.0, 0.0, 0.0), 1.0, 0);
        let ray = Ray::new(Position3::new(0.0, 0.0, -5.0), Direction3::new(0.0, 0.0, 1.0));
        // min_dist placed just past the near intersection (t=4) should pick the far one (t=6).
        let hit = s.find_intersection(&ray, 4.5).unwrap();
        assert!((hit.distance - 6.0).abs() < 1e-4);
    }

    #[test]
    fn miss_returns_none() {
        let s = Sphere::new(Position3::new(0.0, 0.0, 0.0), 1.0, 0);
        let ray = Ray::new(Position3::new(0.0, 5.0, -5.0), Direction3::new(0.0, 0.0, 1.0));
        assert!(s.find_intersection(&ray, 0.0).is_none());
    }
}
