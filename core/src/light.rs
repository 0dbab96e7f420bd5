//! Point and disk light sources.
//!
//! Grounded on `original_source/include/DiskLight.h` (disk lights are both
//! emitters and intersectable geometry, double-sided emission) and spec.md
//! §3/§4.7.3 "Direct light sampling".

use crate::math::{Direction3, Position3, Ray};
use crate::rng::Rng;

#[derive(Debug, Clone, Copy)]
pub struct PointLight {
    pub position: Position3,
    pub intensity: [f32; 3],
}

impl PointLight {
    /// Radiance contribution with inverse-square falloff, no solid-angle
    /// PDF since point lights are sampled with probability one (spec.md
    /// §4.7.3).
    pub fn sample(&self, from: Position3) -> (Direction3, f32, [f32; 3]) {
        let delta = self.position - from;
        let distance = delta.length();
        let direction = delta * (1.0 / distance.max(1e-8));
        let falloff = 1.0 / (distance * distance).max(1e-8);
        (
            direction,
            distance,
            [
                self.intensity[0] * falloff,
                self.intensity[1] * falloff,
                self.intensity[2] * falloff,
            ],
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DiskLight {
    pub center: Position3,
    pub normal: Direction3,
    pub radius: f32,
    pub emission: [f32; 3],
    pub material: u32,
}

impl DiskLight {
    pub fn area(&self) -> f32 {
        std::f32::consts::PI * self.radius * self.radius
    }

    pub fn intersects(&self, ray: &Ray) -> bool {
        self.find_intersection(ray, 0.0, f32::MAX).is_some()
    }

    /// Single-sided or double-sided emission: disk lights emit from both
    /// faces (`original_source/include/DiskLight.h`'s `isDoubleSided`
    /// default).
    pub fn find_intersection(&self, ray: &Ray, min_dist: f32, max_dist: f32) -> Option<f32> {
        let denom = ray.direction.dot(self.normal);
        if denom.abs() < 1e-7 {
            return None;
        }
        let t = (self.center - ray.origin).dot(self.normal) / denom;
        if t < min_dist || t > max_dist {
            return None;
        }
        let p = ray.point_at(t);
        if (p - self.center).length() > self.radius {
            return None;
        }
        Some(t)
    }

    /// Uniform-area sample on the disk, returning a direction from `from`,
    /// the distance, the solid-angle PDF, and the disk's emitted radiance
    /// towards `from` (zero if `from` is behind the emitting face when
    /// single-sided; this type is always double-sided per spec.md §3).
    pub fn sample(&self, rng: &mut Rng, from: Position3) -> (Direction3, f32, f32, [f32; 3]) {
        let (t, b) = crate::math::orthonormal_basis(self.normal);
        let d = rng.concentric_unit_disk() * self.radius;
        let point = self.center + t * d.x + b * d.y;
        let delta = point - from;
        let distance = delta.length().max(1e-8);
        let direction = delta * (1.0 / distance);
        let cos_light = direction.dot(self.normal).abs();
        let pdf = if cos_light > 1e-7 {
            (distance * distance) / (cos_light * self.area())
        } else {
            0.0
        };
        (direction, distance, pdf, self.emission)
    }

    pub fn pdf(&self, from: Position3, direction: Direction3, distance: f32) -> f32 {
        let cos_light = direction.dot(self.normal).abs();
        if cos_light > 1e-7 {
            let _ = from;
            (distance * distance) / (cos_light * self.area())
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_light_falloff_is_inverse_square() {
        let light = PointLight {
            position: Position3::new(0.0, 0.0, 10.0),
            intensity: [100.0, 100.0, 100.0],
        };
        let (_, distance, radiance) = light.sample(Position3::new(0.0, 0.0, 0.0));
        assert!((distance - 10.0).abs() < 1e-5);
        assert!((radiance[0] - 1.0).abs() < 1e-4);
    }

    #[test]
    fn disk_light_intersection_lies_within_radius() {
        let disk = DiskLight {
            center: Position3::new(0.0, 0.0, 5.0),
            normal: Direction3::new(0.0, 0.0, -1.0),
            radius: 2.0,
            emission: [1.0, 1.0, 1.0],
            material: 0,
        };
        let ray = Ray::new(Position3::new(0.0, 0.0, 0.0), Direction3::new(0.0, 0.0, 1.0));
        let hit = disk.find_intersection(&ray, 0.0, f32::MAX);
        assert!(hit.is_some());
        assert!((hit.unwrap() - 5.0).abs() < 1e-5);
    }

    #[test]
    fn disk_light_sample_pdf_is_positive() {
        let disk = DiskLight {
            center: Position3::new(0.0, 0.0, 5.0),
            normal: Direction3::new(0.0, 0.0, -1.0),
            radius: 2.0,
            emission: [1.0, 1.0, 1.0],
            material: 0,
        };
        let mut rng = Rng::from_seed(5);
        let (_, _, pdf, _) = disk.sample(&mut rng, Position3::new(0.0, 0.0, 0.0));
        assert!(pdf > 0.0);
    }
}
