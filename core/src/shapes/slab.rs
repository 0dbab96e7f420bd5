//! Axis-aligned box (slab) intersection via the classic slab method.
//! Grounded on spec.md §4.1 "Slab".

use crate::intersection::RayIntersection;
use crate::math::{Direction3, Position3, Ray};
use crate::texture::TextureCoordinate;

#[derive(Debug, Clone, Copy)]
pub struct Slab {
    pub min: Position3,
    pub max: Position3,
    pub material: u32,
}

const FACE_NORMALS: [glam::Vec3; 6] = [
    glam::Vec3::new(-1.0, 0.0, 0.0),
    glam::Vec3::new(1.0, 0.0, 0.0),
    glam::Vec3::new(0.0, -1.0, 0.0),
    glam::Vec3::new(0.0, 1.0, 0.0),
    glam::Vec3::new(0.0, 0.0, -1.0),
    glam::Vec3::new(0.0, 0.0, 1.0),
];

impl Slab {
    /// Canonicalizes min <= max per axis (spec.md §3 invariant).
    pub fn from_min_max(a: Position3, b: Position3, material: u32) -> Self {
        Self {
            min: Position3(a.0.min(b.0)),
            max: Position3(a.0.max(b.0)),
            material,
        }
    }

    pub fn union(&self, other: &Slab) -> Slab {
        Slab {
            min: Position3(self.min.0.min(other.min.0)),
            max: Position3(self.max.0.max(other.max.0)),
            material: self.material,
        }
    }

    pub fn contains(&self, p: Position3, eps: f32) -> bool {
        p.0.cmpge(self.min.0 - glam::Vec3::splat(eps)).all()
            && p.0.cmple(self.max.0 + glam::Vec3::splat(eps)).all()
    }

    /// Returns (entry, exit, entry_face, exit_face) without filling a full
    /// `RayIntersection`; used by both the predicate and octree/k-d-tree
    /// bound tests.
    pub fn intersect_interval(&self, ray: &Ray) -> Option<(f32, f32, usize, usize)> {
        let mut t_min = f32::NEG_INFINITY;
        let mut t_max = f32::INFINITY;
        let mut entry_face = 0usize;
        let mut exit_face = 0usize;

        for axis in 0..3 {
            let o = ray.origin.0[axis];
            let d = ray.direction.0[axis];
            let (lo, hi) = (self.min.0[axis], self.max.0[axis]);

            if d.abs() < 1e-12 {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }

            let inv_d = 1.0 / d;
            let mut t0 = (lo - o) * inv_d;
            let mut t1 = (hi - o) * inv_d;
            let (mut face0, mut face1) = (axis * 2, axis * 2 + 1);
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
                std::mem::swap(&mut face0, &mut face1);
            }
            if t0 > t_min {
                t_min = t0;
                entry_face = face0;
            }
            if t1 < t_max {
                t_max = t1;
                exit_face = face1;
            }
            if t_min > t_max {
                return None;
            }
        }

        Some((t_min, t_max, entry_face, exit_face))
    }

    pub fn intersects(&self, ray: &Ray, min_dist: f32, max_dist: f32) -> bool {
        match self.intersect_interval(ray) {
            None => false,
            Some((t_min, t_max, _, _)) => {
                let t = if t_min >= min_dist { t_min } else { t_max };
                t >= min_dist && t <= max_dist && t_min <= t_max
            }
        }
    }

    pub fn find_intersection(&self, ray: &Ray, min_dist: f32) -> Option<RayIntersection> {
        let (t_min, t_max, entry_face, exit_face) = self.intersect_interval(ray)?;
        let (t, face) = if t_min >= min_dist {
            (t_min, entry_face)
        } else if t_max >= min_dist {
            (t_max, exit_face)
        } else {
            return None;
        };

        let position = ray.point_at(t);
        let normal = Direction3(FACE_NORMALS[face]);
        let (tangent, bitangent) = crate::math::orthonormal_basis(normal);

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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalizes_min_max() {
        let s = Slab::from_min_max(Position3::new(1.0, -1.0, 5.0), Position3::new(-1.0, 2.0, -5.0), 0);
        assert!(s.min.0.x <= s.max.0.x);
        assert!(s.min.0.y <= s.max.0.y);
        assert!(s.min.0.z <= s.max.0.z);
    }

    #[test]
    fn hit_point_matches_ray_distance() {
        let s = Slab::from_min_max(Position3::new(-1.0, -1.0, -1.0), Position3::new(1.0, 1.0, 1.0), 0);
        let ray = Ray::new(Position3::new(-5.0, 0.0, 0.0), Direction3::new(1.0, 0.0, 0.0));
        let hit = s.find_intersection(&ray, 0.0).unwrap();
        assert!((hit.distance - 4.0).abs() < 1e-4);
        let p = ray.point_at(hit.distance);
        assert!((p.0 - hit.position.0).length() < 1e-4);
    }
}
