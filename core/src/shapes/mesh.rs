//! Triangle mesh: shared immutable vertex data plus brute-force and
//! octree-accelerated intersection. Grounded on spec.md §3 "Triangle mesh"
//! and §9 "Shared immutable mesh data" (Arc instead of per-instance copies).

use std::sync::Arc;

use glam::Vec3;

use super::triangle::{barycentric_interpolate, moller_trumbore};
use crate::intersection::RayIntersection;
use crate::math::{Direction3, Position3, Ray};
use crate::shapes::octree::TriangleMeshOctree;
use crate::shapes::slab::Slab;
use crate::texture::TextureCoordinate;

pub const NO_TEXCOORD: u32 = u32::MAX;

#[derive(Debug, Clone, Copy)]
pub struct Face {
    pub vertex_indices: [u32; 3],
    pub normal_indices: [u32; 3],
    pub texcoord_indices: [u32; 3],
    pub material: u32,
}

/// Shared, immutable geometry for one mesh asset. Instances reference this
/// through an `Arc` and carry only a transform (see
/// [`crate::traceable::Traceable`]).
#[derive(Debug)]
pub struct MeshData {
    pub vertices: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub texcoords: Vec<TextureCoordinate>,
    pub faces: Vec<Face>,
    pub bounds: Slab,
}

impl MeshData {
    pub fn new(
        vertices: Vec<Vec3>,
        normals: Vec<Vec3>,
        texcoords: Vec<TextureCoordinate>,
        faces: Vec<Face>,
    ) -> Arc<Self> {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for v in &vertices {
            min = min.min(*v);
            max = max.max(*v);
        }
        let bounds = Slab::from_min_max(Position3(min), Position3(max), crate::intersection::NO_MATERIAL);
        Arc::new(Self {
            vertices,
            normals,
            texcoords,
            faces,
            bounds,
        })
    }

    fn fill_hit(&self, face: &Face, ray: &Ray, t: f32, u: f32, v: f32, material_override: Option<u32>) -> RayIntersection {
        let v0 = self.vertices[face.vertex_indices[0] as usize];
        let v1 = self.vertices[face.vertex_indices[1] as usize];
        let v2 = self.vertices[face.vertex_indices[2] as usize];
        let position = Position3(barycentric_interpolate(v0, v1, v2, u, v));

        let n0 = self.normals[face.normal_indices[0] as usize];
        let n1 = self.normals[face.normal_indices[1] as usize];
        let n2 = self.normals[face.normal_indices[2] as usize];
        let normal = Direction3(barycentric_interpolate(n0, n1, n2, u, v)).normalize_or_self();
        let (tangent, bitangent) = crate::math::orthonormal_basis(normal);

        let has_texcoord = face.texcoord_indices.iter().all(|&i| i != NO_TEXCOORD);
        let texcoord = if has_texcoord {
            let t0 = self.texcoords[face.texcoord_indices[0] as usize];
            let t1 = self.texcoords[face.texcoord_indices[1] as usize];
            let t2 = self.texcoords[face.texcoord_indices[2] as usize];
            TextureCoordinate {
                u: t0.u * (1.0 - u - v) + t1.u * u + t2.u * v,
                v: t0.v * (1.0 - u - v) + t1.v * u + t2.v * v,
            }
        } else {
            TextureCoordinate::default()
        };

        RayIntersection {
            ray: *ray,
            position,
            normal,
            tangent,
            bitangent,
            distance: t,
            material: material_override.unwrap_or(face.material),
            texcoord,
            has_texcoord,
        }
    }

    /// Brute-force: linearly iterate every triangle, track best `t`.
    /// Used for bare meshes (no octree) and as the octree's fallback / test
    /// oracle (spec.md §8 scenario 5).
    pub fn find_intersection_brute_force(
        &self,
        ray: &Ray,
        min_dist: f32,
        material_override: Option<u32>,
    ) -> Option<RayIntersection> {
        let mut best: Option<(f32, usize, f32, f32)> = None;
        for (i, face) in self.faces.iter().enumerate() {
            if let Some(hit) = self.intersect_face(ray, face, min_dist, f32::MAX) {
                if best.map_or(true, |(bt, ..)| hit.t < bt) {
                    best = Some((hit.t, i, hit.u, hit.v));
                }
            }
        }
        best.map(|(t, face_idx, u, v)| self.fill_hit(&self.faces[face_idx], ray, t, u, v, material_override))
    }

    pub fn intersects_brute_force(&self, ray: &Ray, min_dist: f32, max_dist: f32) -> bool {
        self.faces
            .iter()
            .any(|face| self.intersect_face(ray, face, min_dist, max_dist).is_some())
    }

    pub(crate) fn intersect_face(
        &self,
        ray: &Ray,
        face: &Face,
        min_dist: f32,
        max_dist: f32,
    ) -> Option<super::triangle::TriangleHit> {
        let v0 = self.vertices[face.vertex_indices[0] as usize];
        let v1 = self.vertices[face.vertex_indices[1] as usize];
        let v2 = self.vertices[face.vertex_indices[2] as usize];
        let hit = moller_trumbore(ray.origin.0, ray.direction.0, v0, v1, v2)?;
        if hit.t >= min_dist && hit.t <= max_dist {
            Some(hit)
        } else {
            None
        }
    }

    pub(crate) fn fill_hit_for_face(
        &self,
        face_idx: usize,
        ray: &Ray,
        t: f32,
        u: f32,
        v: f32,
        material_override: Option<u32>,
    ) -> RayIntersection {
        self.fill_hit(&self.faces[face_idx], ray, t, u, v, material_override)
    }
}

/// A mesh instance: shared geometry plus an optional material override
/// (supersedes per-face materials when present) and, optionally, a
/// precomputed octree accelerator.
#[derive(Debug)]
pub struct TriangleMesh {
    pub data: Arc<MeshData>,
    pub material_override: Option<u32>,
    pub octree: Option<Arc<TriangleMeshOctree>>,
}

impl TriangleMesh {
    pub fn new(data: Arc<MeshData>, material_override: Option<u32>) -> Self {
        Self {
            data,
            material_override,
            octree: None,
        }
    }

    pub fn with_octree(mut self, octree: Arc<TriangleMeshOctree>) -> Self {
        self.octree = Some(octree);
        self
    }

    pub fn bounding_slab(&self) -> Slab {
        let mut slab = self.data.bounds;
        slab.material = crate::intersection::NO_MATERIAL;
        slab
    }

    pub fn intersects(&self, ray: &Ray, min_dist: f32, max_dist: f32) -> bool {
        match &self.octree {
            Some(oct) => oct.intersects(ray, min_dist, max_dist),
            None => self.data.intersects_brute_force(ray, min_dist, max_dist),
        }
    }

    pub fn find_intersection(&self, ray: &Ray, min_dist: f32) -> Option<RayIntersection> {
        match &self.octree {
            Some(oct) => oct.find_intersection(ray, min_dist, self.material_override),
            None => self
                .data
                .find_intersection_brute_force(ray, min_dist, self.material_override),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_mesh() -> Arc<MeshData> {
        let vertices = vec![
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(-1.0, 1.0, 0.0),
        ];
        let normals = vec![Vec3::new(0.0, 0.0, 1.0)];
        let texcoords = vec![];
        let faces = vec![
            Face {
                vertex_indices: [0, 1, 2],
                normal_indices: [0, 0, 0],
                texcoord_indices: [NO_TEXCOORD; 3],
                material: 0,
            },
            Face {
                vertex_indices: [0, 2, 3],
                normal_indices: [0, 0, 0],
                texcoord_indices: [NO_TEXCOORD; 3],
                material: 0,
            },
        ];
        MeshData::new(vertices, normals, texcoords, faces)
    }

    #[test]
    fn brute_force_hits_quad_center() {
        let data = quad_mesh();
        let mesh = TriangleMesh::new(data, None);
        let ray = Ray::new(Position3::new(0.0, 0.0, -5.0), Direction3::new(0.0, 0.0, 1.0));
        let hit = mesh.find_intersection(&ray, 0.0).unwrap();
        assert!((hit.distance - 5.0).abs() < 1e-4);
        assert!((hit.normal.0.z - 1.0).abs() < 1e-4);
    }
}
