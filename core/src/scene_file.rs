//! Minimal `ron` scene description format.
//!
//! Full scene-graph parsing (arbitrary mesh import, shader graphs, nested
//! prefabs) is out of scope (see SPEC_FULL.md §1 Non-goals); this format
//! covers the primitives `core_rt` actually models — spheres, axis-aligned
//! slabs, point lights, disk lights, a pinhole camera, and solid-color
//! materials — so small scenes can be described declaratively instead of
//! only programmatically via [`crate::scene::SceneBuilder`].

use serde::Deserialize;

use crate::camera::Camera;
use crate::envmap::EnvironmentMap;
use crate::error::SceneError;
use crate::light::{DiskLight, PointLight};
use crate::material::Material;
use crate::math::{Direction3, Position3};
use crate::scene::{Scene, SceneBuilder};
use crate::sensor::Sensor;
use crate::shapes::slab::Slab;
use crate::shapes::sphere::Sphere;
use crate::shapes::Shape;
use crate::traceable::Traceable;
use crate::transform::Transform;

#[derive(Debug, Deserialize)]
pub struct SceneFile {
    pub sensor: SensorDesc,
    pub camera: CameraDesc,
    #[serde(default)]
    pub materials: Vec<MaterialDesc>,
    #[serde(default)]
    pub spheres: Vec<SphereDesc>,
    #[serde(default)]
    pub slabs: Vec<SlabDesc>,
    #[serde(default)]
    pub point_lights: Vec<PointLightDesc>,
    #[serde(default)]
    pub disk_lights: Vec<DiskLightDesc>,
}

#[derive(Debug, Deserialize)]
pub struct SensorDesc {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Deserialize)]
pub struct CameraDesc {
    pub position: [f32; 3],
    /// Forward direction the camera points along.
    pub look_at: [f32; 3],
    pub hfov_degrees: f32,
    pub vfov_degrees: f32,
    #[serde(default)]
    pub focus_distance: f32,
    #[serde(default)]
    pub focus_divergence: f32,
}

#[derive(Debug, Deserialize)]
pub struct MaterialDesc {
    #[serde(default = "default_diffuse")]
    pub diffuse: [f32; 3],
    #[serde(default)]
    pub specular: [f32; 3],
    #[serde(default)]
    pub specular_exponent: f32,
    #[serde(default)]
    pub emission: [f32; 3],
    #[serde(default)]
    pub is_refractive: bool,
    #[serde(default = "default_ior")]
    pub index_of_refraction: f32,
}

fn default_diffuse() -> [f32; 3] {
    [0.8, 0.8, 0.8]
}

fn default_ior() -> f32 {
    1.5
}

#[derive(Debug, Deserialize)]
pub struct SphereDesc {
    pub center: [f32; 3],
    pub radius: f32,
    pub material: usize,
}

#[derive(Debug, Deserialize)]
pub struct SlabDesc {
    pub min: [f32; 3],
    pub max: [f32; 3],
    pub material: usize,
}

#[derive(Debug, Deserialize)]
pub struct PointLightDesc {
    pub position: [f32; 3],
    pub intensity: [f32; 3],
}

#[derive(Debug, Deserialize)]
pub struct DiskLightDesc {
    pub center: [f32; 3],
    pub normal: [f32; 3],
    pub radius: f32,
    pub emission: [f32; 3],
}

pub fn load(path: &std::path::Path) -> Result<Scene, SceneError> {
    let text = std::fs::read_to_string(path).map_err(|_| SceneError::MissingFile(path.to_path_buf()))?;
    let file: SceneFile = ron::from_str(&text).map_err(|e| SceneError::Parse(e.to_string()))?;
    build(file)
}

fn build(file: SceneFile) -> Result<Scene, SceneError> {
    let mut builder = SceneBuilder::new();

    let material_count = file.materials.len();
    for desc in &file.materials {
        let medium = if desc.is_refractive {
            Some(crate::medium::Medium::new(desc.index_of_refraction, [0.0, 0.0, 0.0]))
        } else {
            None
        };
        builder.add_material(Material {
            diffuse: crate::material::RgbParam::constant(desc.diffuse),
            specular: crate::material::RgbParam::constant(desc.specular),
            specular_exponent: desc.specular_exponent,
            alpha: crate::material::AlphaParam::opaque(),
            emission: desc.emission,
            normal_map: None,
            is_refractive: desc.is_refractive,
            inner_medium: medium,
        });
    }

    for desc in &file.spheres {
        if desc.material >= material_count {
            return Err(SceneError::InvalidMaterialRef(desc.material));
        }
        builder.add_traceable(Traceable::new(
            Shape::Sphere(Sphere::new(
                Position3::new(desc.center[0], desc.center[1], desc.center[2]),
                desc.radius,
                desc.material as u32,
            )),
            Transform::identity(),
        ));
    }

    for desc in &file.slabs {
        if desc.material >= material_count {
            return Err(SceneError::InvalidMaterialRef(desc.material));
        }
        builder.add_traceable(Traceable::new(
            Shape::Slab(Slab::from_min_max(
                Position3::new(desc.min[0], desc.min[1], desc.min[2]),
                Position3::new(desc.max[0], desc.max[1], desc.max[2]),
                desc.material as u32,
            )),
            Transform::identity(),
        ));
    }

    for desc in &file.point_lights {
        builder.add_point_light(PointLight {
            position: Position3::new(desc.position[0], desc.position[1], desc.position[2]),
            intensity: desc.intensity,
        });
    }

    for desc in &file.disk_lights {
        builder.add_disk_light(DiskLight {
            center: Position3::new(desc.center[0], desc.center[1], desc.center[2]),
            normal: Direction3::new(desc.normal[0], desc.normal[1], desc.normal[2]).normalize_or_self(),
            radius: desc.radius,
            emission: desc.emission,
            material: crate::material::DEFAULT_MATERIAL,
        });
    }

    let position = Position3::new(file.camera.position[0], file.camera.position[1], file.camera.position[2]);
    let look_at = Position3::new(file.camera.look_at[0], file.camera.look_at[1], file.camera.look_at[2]);
    let forward = (look_at - position).normalize_or_self();
    let camera_transform = look_at_transform(position, forward);

    let camera = Camera::Pinhole {
        hfov: file.camera.hfov_degrees.to_radians(),
        vfov: file.camera.vfov_degrees.to_radians(),
        focus_distance: if file.camera.focus_distance > 0.0 {
            file.camera.focus_distance
        } else {
            1.0
        },
        focus_divergence: file.camera.focus_divergence,
    };

    Ok(builder.build(
        camera,
        camera_transform,
        Sensor::new(file.sensor.width, file.sensor.height),
        EnvironmentMap::Trivial,
    ))
}

/// Builds a right-handed look-at transform with +Z as forward, matching the
/// axis convention `camera.rs`'s pinhole ray generation assumes.
fn look_at_transform(position: Position3, forward: Direction3) -> Transform {
    let world_up = Direction3::new(0.0, 1.0, 0.0);
    let right = if forward.dot(world_up).abs() > 0.999 {
        Direction3::new(1.0, 0.0, 0.0)
    } else {
        forward.cross(world_up).normalize_or_self()
    };
    let up = right.cross(forward).normalize_or_self();

    let basis = glam::Mat3::from_cols(right.0, up.0, forward.0);
    let affine = glam::Affine3A::from_mat3_translation(basis, position.0);
    Transform::from_affine(affine)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_scene_parses_and_builds() {
        let text = r#"
        (
            sensor: (width: 4, height: 4),
            camera: (
                position: [0.0, 0.0, 0.0],
                look_at: [0.0, 0.0, 1.0],
                hfov_degrees: 30.0,
                vfov_degrees: 30.0,
            ),
            materials: [(diffuse: [0.8, 0.2, 0.2])],
            spheres: [(center: [0.0, 0.0, 5.0], radius: 1.0, material: 0)],
            point_lights: [(position: [0.0, 5.0, 0.0], intensity: [100.0, 100.0, 100.0])],
        )
        "#;
        let file: SceneFile = ron::from_str(text).unwrap();
        let scene = build(file).unwrap();
        assert_eq!(scene.traceables.len(), 1);
        assert_eq!(scene.point_lights.len(), 1);
    }

    #[test]
    fn out_of_range_material_is_rejected() {
        let text = r#"
        (
            sensor: (width: 4, height: 4),
            camera: (
                position: [0.0, 0.0, 0.0],
                look_at: [0.0, 0.0, 1.0],
                hfov_degrees: 30.0,
                vfov_degrees: 30.0,
            ),
            spheres: [(center: [0.0, 0.0, 5.0], radius: 1.0, material: 0)],
        )
        "#;
        let file: SceneFile = ron::from_str(text).unwrap();
        assert!(build(file).is_err());
    }
}
