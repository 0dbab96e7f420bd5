//! Scene container and a programmatic builder.
//!
//! Grounded on spec.md §3 "Scene" / §9 "Scene graph shape" (a homogeneous
//! `Vec<Traceable>` tagged-sum collection rather than
//! `original_source/include/scene.h`'s per-primitive-type vectors) and
//! §FULL-4.12 of SPEC_FULL.md (no general scene-graph parser; scenes are
//! either built programmatically or loaded from the minimal `ron` format in
//! [`crate::scene_file`]).

use std::sync::Arc;

use crate::camera::Camera;
use crate::envmap::EnvironmentMap;
use crate::kdtree::KdTree;
use crate::light::{DiskLight, PointLight};
use crate::material::Material;
use crate::sensor::Sensor;
use crate::shapes::mesh::MeshData;
use crate::texture::Texture;
use crate::traceable::Traceable;
use crate::transform::Transform;

pub struct Scene {
    pub traceables: Vec<Traceable>,
    pub point_lights: Vec<PointLight>,
    pub disk_lights: Vec<DiskLight>,
    pub materials: Vec<Material>,
    pub default_material: Material,
    pub textures: Vec<Texture>,
    /// Kept alive so `TriangleMesh` instances built from the same asset can
    /// share geometry; not consulted directly during tracing.
    pub mesh_data: Vec<Arc<MeshData>>,
    pub camera: Camera,
    pub camera_transform: Transform,
    pub sensor: Sensor,
    pub environment_map: EnvironmentMap,
    /// Present once the object count crosses the acceleration threshold
    /// (spec.md §4.4); absent scenes fall back to a linear scan.
    pub kdtree: Option<KdTree>,
}

impl Scene {
    pub fn find_nearest(&self, ray: &crate::math::Ray, min_dist: f32) -> Option<(usize, crate::intersection::RayIntersection)> {
        match &self.kdtree {
            Some(tree) => {
                let object_hit = tree.find_nearest(&self.traceables, ray, min_dist)?;
                let hit = self.traceables[object_hit.object_index].find_intersection(ray, min_dist)?;
                Some((object_hit.object_index, hit))
            }
            None => {
                let mut best: Option<(usize, crate::intersection::RayIntersection)> = None;
                for (i, obj) in self.traceables.iter().enumerate() {
                    if let Some(hit) = obj.find_intersection(ray, min_dist) {
                        if best.as_ref().map_or(true, |(_, b)| hit.distance < b.distance) {
                            best = Some((i, hit));
                        }
                    }
                }
                best
            }
        }
    }

    pub fn any_hit(&self, ray: &crate::math::Ray, min_dist: f32, max_dist: f32) -> bool {
        match &self.kdtree {
            Some(tree) => tree.any_hit(&self.traceables, ray, min_dist, max_dist),
            None => self.traceables.iter().any(|obj| obj.intersects(ray, min_dist, max_dist)),
        }
    }

    /// Disk lights double as intersectable geometry (spec.md §3); checked
    /// separately from `traceables` since their hit record is simpler.
    pub fn find_nearest_disk_light(&self, ray: &crate::math::Ray, min_dist: f32, max_dist: f32) -> Option<(usize, f32)> {
        let mut best: Option<(usize, f32)> = None;
        for (i, disk) in self.disk_lights.iter().enumerate() {
            if let Some(t) = disk.find_intersection(ray, min_dist, max_dist) {
                if best.map_or(true, |(_, bt)| t < bt) {
                    best = Some((i, t));
                }
            }
        }
        best
    }
}

/// Object count above which [`SceneBuilder::build`] constructs a [`KdTree`]
/// instead of leaving the scene to a linear scan, per spec.md §4.4.
pub const KDTREE_THRESHOLD: usize = 8;

#[derive(Default)]
pub struct SceneBuilder {
    traceables: Vec<Traceable>,
    point_lights: Vec<PointLight>,
    disk_lights: Vec<DiskLight>,
    materials: Vec<Material>,
    textures: Vec<Texture>,
    mesh_data: Vec<Arc<MeshData>>,
}

impl SceneBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_traceable(&mut self, traceable: Traceable) -> &mut Self {
        self.traceables.push(traceable);
        self
    }

    pub fn add_point_light(&mut self, light: PointLight) -> &mut Self {
        self.point_lights.push(light);
        self
    }

    pub fn add_disk_light(&mut self, light: DiskLight) -> &mut Self {
        self.disk_lights.push(light);
        self
    }

    /// Returns the id of the newly added material, for use in
    /// `Shape`/`Face`/`DiskLight` material fields.
    pub fn add_material(&mut self, material: Material) -> u32 {
        self.materials.push(material);
        (self.materials.len() - 1) as u32
    }

    pub fn add_texture(&mut self, texture: Texture) -> u32 {
        self.textures.push(texture);
        (self.textures.len() - 1) as u32
    }

    pub fn add_mesh_data(&mut self, data: Arc<MeshData>) -> &mut Self {
        self.mesh_data.push(data);
        self
    }

    pub fn build(
        self,
        camera: Camera,
        camera_transform: Transform,
        sensor: Sensor,
        environment_map: EnvironmentMap,
    ) -> Scene {
        let kdtree = if self.traceables.len() >= KDTREE_THRESHOLD {
            Some(KdTree::build(&self.traceables))
        } else {
            None
        };
        Scene {
            traceables: self.traceables,
            point_lights: self.point_lights,
            disk_lights: self.disk_lights,
            materials: self.materials,
            default_material: Material::default_material(),
            textures: self.textures,
            mesh_data: self.mesh_data,
            camera,
            camera_transform,
            sensor,
            environment_map,
            kdtree,
        }
    }
}
