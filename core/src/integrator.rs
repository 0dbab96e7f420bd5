//! Recursive Monte Carlo path integrator.
//!
//! Grounded on `original_source/src/renderer.cpp`'s `traceCameraRay` /
//! `shade` / `shadeReflect` / `shadeRefract` family (reflectance split into
//! a diffuse Lambertian lobe, a Phong specular/glossy lobe, and a
//! Fresnel-weighted refractive interface, each contributing both a direct
//! next-event-estimation term and a recursively sampled indirect term) and
//! spec.md §4.7 "Integrator".

use crate::intersection::RayIntersection;
use crate::material::{self, Material};
use crate::math::{Direction3, Position3, Ray};
use crate::medium::MediumStack;
use crate::optics;
use crate::rng::Rng;
use crate::sampling;
use crate::scene::Scene;

#[derive(Debug, Clone, Copy)]
pub struct TraceConfig {
    pub max_depth: u32,
    pub epsilon: f32,
    /// Russian-roulette termination probability (`-r/--rr`, spec.md §4.7
    /// step 2 "russianRouletteChance"): with this probability the path is
    /// terminated; otherwise it continues and its contribution is divided
    /// by `1 - chance` to keep the estimator unbiased.
    pub rr_termination_chance: f32,
    /// Depth at which Russian roulette starts being applied.
    pub rr_start_depth: u32,
    /// When false (`-R/--nomontecarlorefraction`), the refractive interface
    /// deterministically splits into weighted reflect + refract
    /// contributions instead of stochastically picking one.
    pub monte_carlo_refraction: bool,
    /// When false (`-C/--nosamplecosine`), diffuse indirect bounces use a
    /// uniform hemisphere sample instead of cosine-weighted importance
    /// sampling.
    pub sample_cosine: bool,
    /// When false (`-X/--nosamplespecular`), the glossy lobe samples a
    /// uniform hemisphere instead of the Phong lobe.
    pub sample_specular: bool,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            max_depth: 10,
            epsilon: 1e-4,
            rr_termination_chance: 0.1,
            rr_start_depth: 3,
            monte_carlo_refraction: true,
            sample_cosine: true,
            sample_specular: true,
        }
    }
}

/// Entry point for one camera sample: traces from `ray` through the scene,
/// accumulating radiance recursively until depth, Russian roulette, or a
/// miss terminates the path.
pub fn trace_ray(
    scene: &Scene,
    rng: &mut Rng,
    ray: &Ray,
    min_dist: f32,
    depth: u32,
    media: &MediumStack,
    config: &TraceConfig,
) -> [f32; 3] {
    if depth > config.max_depth {
        return [0.0, 0.0, 0.0];
    }

    let object_hit = scene.find_nearest(ray, min_dist);
    let disk_hit = scene.find_nearest_disk_light(
        ray,
        min_dist,
        object_hit.as_ref().map_or(f32::MAX, |(_, h)| h.distance),
    );

    if let Some((disk_idx, distance)) = disk_hit {
        if object_hit.as_ref().map_or(true, |(_, h)| distance < h.distance) {
            let disk = &scene.disk_lights[disk_idx];
            return media.top().attenuate(disk.emission, distance);
        }
    }

    let Some((_, mut hit)) = object_hit else {
        return scene.environment_map.sample_ray(ray.direction);
    };

    if let Some(map_tex) = material::resolve_material(&scene.materials, &scene.default_material, hit.material).normal_map {
        material::apply_normal_map(&mut hit, &scene.textures, map_tex);
    }
    let wo = -ray.direction;
    hit.face_forward(wo);

    let material = material::resolve_material(&scene.materials, &scene.default_material, hit.material);

    let alpha = material.alpha.evaluate(&scene.textures, hit.texcoord);
    if alpha < 1.0 && rng.uniform01() >= alpha {
        // Alpha transparency: the ray passes through unaffected, as if the
        // surface were absent (spec.md §4.5 "Alpha transparency").
        let continuation = Ray::new(hit.position + ray.direction * config.epsilon, ray.direction);
        return trace_ray(scene, rng, &continuation, 0.0, depth + 1, media, config);
    }

    let shaded = shade(scene, rng, &hit, wo, depth, media, config, material);
    media.top().attenuate(shaded, hit.distance)
}

fn shade(
    scene: &Scene,
    rng: &mut Rng,
    hit: &RayIntersection,
    wo: Direction3,
    depth: u32,
    media: &MediumStack,
    config: &TraceConfig,
    material: &Material,
) -> [f32; 3] {
    let mut radiance = material.emission;

    if material.is_refractive {
        return optics::rgb_add(radiance, shade_refractive_interface(scene, rng, hit, wo, depth, media, config, material));
    }

    let diffuse_albedo = material.diffuse.evaluate(&scene.textures, hit.texcoord);
    let specular_albedo = material.specular.evaluate(&scene.textures, hit.texcoord);

    // Fresnel-weighted combine: Lo = (1-F)*D*Ld + F*Ls (spec.md §4.7 step 6,
    // original_source/src/renderer.cpp:154).
    let fresnel = optics::fresnel_schlick(specular_albedo, hit.normal.dot(wo).max(0.0));
    let fresnel_residual = optics::rgb_residual(fresnel);

    if diffuse_albedo != [0.0, 0.0, 0.0] {
        let ld = direct_lighting_diffuse(scene, rng, hit, diffuse_albedo);
        radiance = optics::rgb_add(radiance, optics::rgb_mul(fresnel_residual, ld));
    }
    if specular_albedo != [0.0, 0.0, 0.0] {
        let ls = direct_lighting_specular(scene, rng, hit, wo, specular_albedo, material.specular_exponent);
        radiance = optics::rgb_add(radiance, optics::rgb_mul(fresnel, ls));
    }

    if let Some(survival) = russian_roulette(rng, depth, config) {
        let indirect = sample_indirect(scene, rng, hit, wo, depth, media, config, diffuse_albedo, specular_albedo, material.specular_exponent);
        radiance = optics::rgb_add(radiance, optics::rgb_scale(indirect, 1.0 / survival));
    }

    radiance
}

/// Returns `Some(survival_probability)` if the path should continue, `None`
/// if it was terminated. Below `rr_start_depth` the path always continues
/// with probability 1 (spec.md §4.7 step 2 "Russian roulette termination").
fn russian_roulette(rng: &mut Rng, depth: u32, config: &TraceConfig) -> Option<f32> {
    if depth < config.rr_start_depth {
        return Some(1.0);
    }
    let chance = config.rr_termination_chance.clamp(0.0, 0.99);
    if rng.uniform01() < chance {
        None
    } else {
        Some(1.0 - chance)
    }
}

fn direct_lighting_diffuse(scene: &Scene, rng: &mut Rng, hit: &RayIntersection, albedo: [f32; 3]) -> [f32; 3] {
    let mut sum = [0.0f32; 3];
    let brdf = sampling::lambertian_brdf(albedo);

    for light in &scene.point_lights {
        let (direction, distance, radiance) = light.sample(hit.position);
        let cos_theta = hit.normal.dot(direction);
        if cos_theta <= 0.0 {
            continue;
        }
        let origin = hit.position + hit.normal * 1e-4;
        let shadow = Ray::new(origin, direction);
        if scene.any_hit(&shadow, 1e-4, distance - 2e-4) {
            continue;
        }
        sum = optics::rgb_add(sum, optics::rgb_scale(optics::rgb_mul(brdf, radiance), cos_theta));
    }

    for disk in &scene.disk_lights {
        let (direction, distance, pdf, emission) = disk.sample(rng, hit.position);
        if pdf <= 0.0 {
            continue;
        }
        let cos_theta = hit.normal.dot(direction);
        if cos_theta <= 0.0 {
            continue;
        }
        let origin = hit.position + hit.normal * 1e-4;
        let shadow = Ray::new(origin, direction);
        if scene.any_hit(&shadow, 1e-4, distance - 2e-4) {
            continue;
        }
        let bsdf_pdf = sampling::cosine_hemisphere_pdf(cos_theta);
        let weight = optics::power_heuristic(1.0, pdf, 1.0, bsdf_pdf);
        let contribution = optics::rgb_scale(optics::rgb_mul(brdf, emission), cos_theta * weight / pdf);
        sum = optics::rgb_add(sum, contribution);
    }

    if scene.environment_map.can_importance_sample() {
        if let Some(env) = scene.environment_map.importance_sample_direction(rng) {
            let cos_theta = hit.normal.dot(env.direction);
            if cos_theta > 0.0 && env.pdf > 0.0 {
                let origin = hit.position + hit.normal * 1e-4;
                let shadow = Ray::new(origin, env.direction);
                if !scene.any_hit(&shadow, 1e-4, f32::MAX) {
                    let bsdf_pdf = sampling::cosine_hemisphere_pdf(cos_theta);
                    let weight = optics::power_heuristic(1.0, env.pdf, 1.0, bsdf_pdf);
                    let contribution = optics::rgb_scale(optics::rgb_mul(brdf, env.radiance), cos_theta * weight / env.pdf);
                    sum = optics::rgb_add(sum, contribution);
                }
            }
        }
    }

    sum
}

fn direct_lighting_specular(
    scene: &Scene,
    rng: &mut Rng,
    hit: &RayIntersection,
    wo: Direction3,
    albedo: [f32; 3],
    exponent: f32,
) -> [f32; 3] {
    let mut sum = [0.0f32; 3];
    let r = crate::math::reflect(-wo, hit.normal);

    for light in &scene.point_lights {
        let (direction, distance, radiance) = light.sample(hit.position);
        let cos_theta = hit.normal.dot(direction);
        if cos_theta <= 0.0 {
            continue;
        }
        let origin = hit.position + hit.normal * 1e-4;
        let shadow = Ray::new(origin, direction);
        if scene.any_hit(&shadow, 1e-4, distance - 2e-4) {
            continue;
        }
        let brdf = sampling::phong_brdf(direction, r, exponent);
        sum = optics::rgb_add(sum, optics::rgb_scale(optics::rgb_mul(albedo, radiance), brdf * cos_theta));
    }

    for disk in &scene.disk_lights {
        let (direction, distance, pdf, emission) = disk.sample(rng, hit.position);
        if pdf <= 0.0 {
            continue;
        }
        let cos_theta = hit.normal.dot(direction);
        if cos_theta <= 0.0 {
            continue;
        }
        let origin = hit.position + hit.normal * 1e-4;
        let shadow = Ray::new(origin, direction);
        if scene.any_hit(&shadow, 1e-4, distance - 2e-4) {
            continue;
        }
        let brdf = sampling::phong_brdf(direction, r, exponent);
        let contribution = optics::rgb_scale(optics::rgb_mul(albedo, emission), brdf * cos_theta / pdf);
        sum = optics::rgb_add(sum, contribution);
    }

    sum
}

#[allow(clippy::too_many_arguments)]
fn sample_indirect(
    scene: &Scene,
    rng: &mut Rng,
    hit: &RayIntersection,
    wo: Direction3,
    depth: u32,
    media: &MediumStack,
    config: &TraceConfig,
    diffuse_albedo: [f32; 3],
    specular_albedo: [f32; 3],
    exponent: f32,
) -> [f32; 3] {
    // pSpec = mean(S), not normalized against D (spec.md §4.7 step 6,
    // original_source/src/renderer.cpp:130 "probSpec = (S.r+S.g+S.b)/3.0f").
    let prob_specular = optics::rgb_mean(specular_albedo).clamp(0.0, 1.0);
    let prob_diffuse = 1.0 - prob_specular;
    let pick_specular = rng.uniform01() < prob_specular;

    if pick_specular {
        let r = crate::math::reflect(-wo, hit.normal);
        let sample = if config.sample_specular && exponent > 0.0 {
            sampling::phong_sample(rng, r, exponent)
        } else {
            sampling::uniform_sample_hemisphere(rng, hit.normal)
        };
        if sample.pdf <= 0.0 {
            return [0.0, 0.0, 0.0];
        }
        let cos_theta = hit.normal.dot(sample.direction);
        if cos_theta <= 0.0 {
            return [0.0, 0.0, 0.0];
        }
        let brdf = sampling::phong_brdf(sample.direction, r, exponent);
        let origin = hit.position + hit.normal * config.epsilon;
        let bounce = Ray::new(origin, sample.direction);
        let incoming = trace_ray(scene, rng, &bounce, 0.0, depth + 1, media, config);
        optics::rgb_scale(optics::rgb_mul(specular_albedo, incoming), brdf * cos_theta / (sample.pdf * prob_specular))
    } else {
        let sample = if config.sample_cosine {
            sampling::cosine_sample_hemisphere(rng, hit.normal)
        } else {
            sampling::uniform_sample_hemisphere(rng, hit.normal)
        };
        if sample.pdf <= 0.0 {
            return [0.0, 0.0, 0.0];
        }
        let cos_theta = hit.normal.dot(sample.direction).max(0.0);
        let brdf = sampling::lambertian_brdf(diffuse_albedo);
        let origin = hit.position + hit.normal * config.epsilon;
        let bounce = Ray::new(origin, sample.direction);
        let incoming = trace_ray(scene, rng, &bounce, 0.0, depth + 1, media, config);
        optics::rgb_scale(optics::rgb_mul(brdf, incoming), cos_theta / (sample.pdf * prob_diffuse))
    }
}

#[allow(clippy::too_many_arguments)]
fn shade_refractive_interface(
    scene: &Scene,
    rng: &mut Rng,
    hit: &RayIntersection,
    wo: Direction3,
    depth: u32,
    media: &MediumStack,
    config: &TraceConfig,
    material: &Material,
) -> [f32; 3] {
    let inner = material.inner_medium.unwrap_or(crate::medium::Medium::VACUUM);
    let leaving = media.is_leaving();
    let (n1, n2, next_media) = if leaving {
        (media.top().index_of_refraction, media.pop().top().index_of_refraction, media.pop())
    } else {
        (media.top().index_of_refraction, inner.index_of_refraction, media.push(inner))
    };

    let cos_i = hit.normal.dot(wo).clamp(0.0, 1.0);
    let fresnel = optics::fresnel_dielectric(cos_i, n1, n2);
    let eta = n1 / n2;
    let refracted = crate::math::refract(-wo, hit.normal, eta);
    let total_internal_reflection = refracted.0 == glam::Vec3::ZERO;

    let reflect_dir = crate::math::reflect(-wo, hit.normal);
    let reflect_origin = hit.position + hit.normal * config.epsilon;
    let refract_origin = hit.position - hit.normal * config.epsilon;

    if total_internal_reflection {
        let ray = Ray::new(reflect_origin, reflect_dir);
        return trace_ray(scene, rng, &ray, 0.0, depth + 1, media, config);
    }

    if config.monte_carlo_refraction {
        if rng.uniform01() < fresnel {
            let ray = Ray::new(reflect_origin, reflect_dir);
            trace_ray(scene, rng, &ray, 0.0, depth + 1, media, config)
        } else {
            let ray = Ray::new(refract_origin, refracted);
            trace_ray(scene, rng, &ray, 0.0, depth + 1, &next_media, config)
        }
    } else {
        let reflect_ray = Ray::new(reflect_origin, reflect_dir);
        let refract_ray = Ray::new(refract_origin, refracted);
        let reflected_radiance = trace_ray(scene, rng, &reflect_ray, 0.0, depth + 1, media, config);
        let refracted_radiance = trace_ray(scene, rng, &refract_ray, 0.0, depth + 1, &next_media, config);
        optics::rgb_add(
            optics::rgb_scale(reflected_radiance, fresnel),
            optics::rgb_scale(refracted_radiance, 1.0 - fresnel),
        )
    }
}
