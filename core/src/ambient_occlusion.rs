//! Ambient occlusion AOV: fraction of hemisphere samples that are
//! unoccluded within a short probe distance.
//!
//! Grounded on `original_source/include/ambientocclusion.h` and the
//! `-a/--ao`, `-c/--aocosine`, `-S/--aosamples` flags in
//! `app/trace_scene.cpp`.

use crate::intersection::RayIntersection;
use crate::math::{Direction3, Ray};
use crate::rng::Rng;
use crate::sampling::{cosine_sample_hemisphere, uniform_sample_hemisphere};
use crate::scene::Scene;

pub const DEFAULT_SAMPLES: u32 = 10;
/// Probe distance cap; ambient occlusion is a local effect and does not
/// need to reach infinity.
pub const PROBE_DISTANCE: f32 = 1e4;

/// Returns the unoccluded fraction in `[0, 1]`: 1.0 is fully open, 0.0 is
/// fully occluded.
pub fn ambient_occlusion(
    scene: &Scene,
    hit: &RayIntersection,
    rng: &mut Rng,
    samples: u32,
    cosine_weighted: bool,
    epsilon: f32,
) -> f32 {
    if samples == 0 {
        return 1.0;
    }
    let n = hit.normal;
    let origin = hit.position + n * epsilon;
    let mut unoccluded = 0u32;
    for _ in 0..samples {
        let direction = sample_direction(rng, n, cosine_weighted);
        let ray = Ray::new(origin, direction);
        if !scene.any_hit(&ray, epsilon, PROBE_DISTANCE) {
            unoccluded += 1;
        }
    }
    unoccluded as f32 / samples as f32
}

fn sample_direction(rng: &mut Rng, n: Direction3, cosine_weighted: bool) -> Direction3 {
    if cosine_weighted {
        cosine_sample_hemisphere(rng, n).direction
    } else {
        uniform_sample_hemisphere(rng, n).direction
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::envmap::EnvironmentMap;
    use crate::material::Material;
    use crate::math::Position3;
    use crate::scene::SceneBuilder;
    use crate::sensor::Sensor;
    use crate::shapes::sphere::Sphere;
    use crate::shapes::Shape;
    use crate::texture::TextureCoordinate;
    use crate::transform::Transform;

    fn flat_plane_scene() -> Scene {
        let mut builder = SceneBuilder::new();
        let mat = builder.add_material(Material::diffuse_white());
        builder.add_traceable(crate::traceable::Traceable::new(
            Shape::Sphere(Sphere::new(Position3::new(0.0, -1000.0, 0.0), 1000.0, mat)),
            Transform::identity(),
        ));
        builder.build(
            Camera::Pinhole {
                hfov: 0.5,
                vfov: 0.5,
                focus_distance: 5.0,
                focus_divergence: 0.0,
            },
            Transform::identity(),
            Sensor::new(4, 4),
            EnvironmentMap::Trivial,
        )
    }

    #[test]
    fn open_hemisphere_is_mostly_unoccluded() {
        let scene = flat_plane_scene();
        let hit = RayIntersection {
            ray: Ray::new(Position3::new(0.0, 0.0, 0.0), Direction3::new(0.0, 1.0, 0.0)),
            position: Position3::new(0.0, 0.0, 0.0),
            normal: Direction3::new(0.0, 1.0, 0.0),
            tangent: Direction3::new(1.0, 0.0, 0.0),
            bitangent: Direction3::new(0.0, 0.0, 1.0),
            distance: 0.0,
            material: 0,
            texcoord: TextureCoordinate::default(),
            has_texcoord: false,
        };
        let mut rng = Rng::from_seed(1);
        let ao = ambient_occlusion(&scene, &hit, &mut rng, 64, false, 1e-3);
        assert!(ao > 0.9);
    }
}
