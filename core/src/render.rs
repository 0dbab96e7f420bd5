//! Render driver: pixel-order strategies, per-thread RNGs, and the
//! process-wide flush flag.
//!
//! Grounded on `original_source/include/sensor.h`'s
//! `forEachPixelThreaded`/`forEachPixelTiledThreaded` and
//! `app/trace_scene.cpp`'s render loop (per-pixel Gaussian jitter via
//! `rng.gaussian2D(0.5)`, thin-lens blur coordinate via
//! `uniformUnitCircle`, and the raster/tiled/progressive render-order
//! dispatch).

use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;

use crate::artifacts::{Artifacts, PixelArtifacts};
use crate::integrator::{trace_ray, TraceConfig};
use crate::material;
use crate::math::Ray;
use crate::medium::MediumStack;
use crate::rng::Rng;
use crate::scene::Scene;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOrder {
    Raster,
    Tiled,
    /// One full pass over the image per sample, so an interrupted render
    /// still has a usable (noisier) image at every pixel.
    Progressive,
}

#[derive(Clone)]
pub struct RenderSettings {
    pub samples_per_pixel: u32,
    pub threads: usize,
    pub order: RenderOrder,
    pub trace: TraceConfig,
    pub ambient_occlusion: Option<AmbientOcclusionSettings>,
    pub seed: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct AmbientOcclusionSettings {
    pub samples: u32,
    pub cosine_weighted: bool,
}

/// Set from a signal handler to request an out-of-band AOV flush at the
/// next convenient point (`SIGUSR1`/`SIGALRM` in `app/trace_scene.cpp`).
pub static FLUSH_REQUESTED: AtomicBool = AtomicBool::new(false);

pub fn render(scene: &Scene, settings: &RenderSettings) -> Artifacts {
    let width = scene.sensor.pixel_width;
    let height = scene.sensor.pixel_height;
    let mut artifacts = Artifacts::new(width, height);
    if settings.ambient_occlusion.is_some() {
        artifacts.enable_ambient_occlusion();
    }

    let pixel_order = match settings.order {
        RenderOrder::Raster => scene.sensor.raster_order(),
        RenderOrder::Tiled | RenderOrder::Progressive => scene.sensor.tiled_order(),
    };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(settings.threads.max(1))
        .build()
        .expect("failed to build render thread pool");

    pool.install(|| match settings.order {
        RenderOrder::Progressive => {
            for sample_index in 0..settings.samples_per_pixel {
                render_pass(scene, settings, &pixel_order, &mut artifacts, sample_index, 1);
                maybe_flush(&artifacts, &scene_output_hint());
                log::info!(
                    "progress: {:.2}%",
                    (sample_index + 1) as f32 / settings.samples_per_pixel as f32 * 100.0
                );
            }
        }
        RenderOrder::Raster | RenderOrder::Tiled => {
            render_pass(scene, settings, &pixel_order, &mut artifacts, 0, settings.samples_per_pixel);
        }
    });

    artifacts
}

fn scene_output_hint() -> std::path::PathBuf {
    std::path::PathBuf::from("render_flush")
}

fn maybe_flush(artifacts: &Artifacts, directory: &std::path::Path) {
    if FLUSH_REQUESTED.swap(false, Ordering::SeqCst) {
        if let Err(e) = artifacts.write_all(directory, "trace_") {
            log::warn!("flush write failed: {e}");
        }
    }
}

/// Traces every pixel in `pixel_order` into a disjoint scratch cell per
/// pixel (one slot per entry, zipped element-for-element so two workers
/// never touch the same cell), then folds the whole scratch buffer back
/// into `artifacts` single-threaded. No pixel write takes a lock: spec.md
/// §5 requires pixels be partitioned disjointly across threads, and a
/// `Vec<PixelArtifacts>` the same length as `pixel_order` is that
/// partition made explicit.
fn render_pass(
    scene: &Scene,
    settings: &RenderSettings,
    pixel_order: &[(u32, u32)],
    artifacts: &mut Artifacts,
    sample_offset: u32,
    samples_this_pass: u32,
) {
    let mut cells: Vec<PixelArtifacts> = vec![PixelArtifacts::new(); pixel_order.len()];

    pixel_order
        .par_iter()
        .zip(cells.par_iter_mut())
        .enumerate()
        .for_each(|(i, (&(x, y), cell))| {
            let mut rng = Rng::for_thread(settings.seed, (i as u32).wrapping_add(sample_offset));
            let started = std::time::Instant::now();

            if sample_offset == 0 {
                if let Some(hit) = primary_hit(
                    scene,
                    &scene.camera.ray_through_standard_image_plane(
                        scene.sensor.pixel_standard_image_location(x, y, 0.5, 0.5),
                        &scene.camera_transform,
                        &mut rng,
                    ),
                ) {
                    let material = material::resolve_material(&scene.materials, &scene.default_material, hit.material);
                    let diffuse = material.diffuse.evaluate(&scene.textures, hit.texcoord);
                    let specular = material.specular.evaluate(&scene.textures, hit.texcoord);
                    cell.set_intersection(&hit, diffuse, specular);
                }
            }

            for s in 0..samples_this_pass {
                let sample_index = sample_offset + s;
                let (radiance, ao_value) = trace_pixel(scene, settings, x, y, sample_index, &mut rng);
                cell.accumulate_radiance(radiance);
                if let Some(ao) = ao_value {
                    cell.set_ambient_occlusion(ao);
                }
            }

            cell.add_time(started.elapsed().as_secs_f32());
        });

    for (&(x, y), cell) in pixel_order.iter().zip(cells.iter()) {
        artifacts.merge_pixel(x, y, cell, sample_offset == 0);
    }

    if FLUSH_REQUESTED.load(Ordering::Relaxed) {
        maybe_flush(artifacts, &scene_output_hint());
    }
}

fn trace_pixel(
    scene: &Scene,
    settings: &RenderSettings,
    x: u32,
    y: u32,
    _sample_index: u32,
    rng: &mut Rng,
) -> ([f32; 3], Option<f32>) {
    let jitter = rng.gaussian_2d(0.5);
    let (u, v) = scene.sensor.pixel_standard_image_location(x, y, jitter.x, jitter.y);
    let ray = scene
        .camera
        .ray_through_standard_image_plane((u, v), &scene.camera_transform, rng);

    let radiance = trace_ray(scene, rng, &ray, 0.0, 0, &MediumStack::new(), &settings.trace);

    let ao_value = settings.ambient_occlusion.map(|ao| {
        let hit = primary_hit(scene, &ray);
        match hit {
            Some(hit) => crate::ambient_occlusion::ambient_occlusion(
                scene,
                &hit,
                rng,
                ao.samples,
                ao.cosine_weighted,
                settings.trace.epsilon,
            ),
            None => 1.0,
        }
    });

    (radiance, ao_value)
}

fn primary_hit(scene: &Scene, ray: &Ray) -> Option<crate::intersection::RayIntersection> {
    scene.find_nearest(ray, 0.0).map(|(_, hit)| hit)
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
    use crate::transform::Transform;

    fn small_scene() -> Scene {
        let mut builder = SceneBuilder::new();
        let mat = builder.add_material(Material::diffuse_white());
        builder.add_traceable(crate::traceable::Traceable::new(
            Shape::Sphere(Sphere::new(Position3::new(0.0, 0.0, 5.0), 1.0, mat)),
            Transform::identity(),
        ));
        builder.add_point_light(crate::light::PointLight {
            position: Position3::new(2.0, 2.0, 0.0),
            intensity: [50.0, 50.0, 50.0],
        });
        builder.build(
            Camera::Pinhole {
                hfov: 0.4,
                vfov: 0.4,
                focus_distance: 5.0,
                focus_divergence: 0.0,
            },
            Transform::identity(),
            Sensor::new(8, 8),
            EnvironmentMap::Trivial,
        )
    }

    #[test]
    fn render_fills_every_pixel_with_samples() {
        let scene = small_scene();
        let settings = RenderSettings {
            samples_per_pixel: 2,
            threads: 1,
            order: RenderOrder::Tiled,
            trace: TraceConfig::default(),
            ambient_occlusion: None,
            seed: 1,
        };
        let artifacts = render(&scene, &settings);
        for y in 0..8 {
            for x in 0..8 {
                assert_eq!(artifacts.sample_count(x, y), 2);
            }
        }
    }
}
