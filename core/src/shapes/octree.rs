//! Axis-aligned octree over a mesh's triangles.
//!
//! Grounded on `original_source/include/trianglemeshoctree.h` and
//! `src/trianglemeshoctree.cpp`: build recurses by splitting bounds into 8
//! octants at the midpoint, classifying each triangle against every octant's
//! half-space with a vertex-in-halfspace test (known over-inclusive
//! deficiency, carried forward per spec.md §4.2 / §9). Traversal visits
//! octants in a per-ray front-to-back order and, to compensate for the
//! build's complementary under-inclusion, never early-exits once any
//! candidate child reports a hit — this follows spec.md's stated algorithm
//! rather than the literal source (see DESIGN.md).

use std::sync::Arc;

use glam::Vec3;

use crate::intersection::RayIntersection;
use crate::math::{Position3, Ray};
use crate::shapes::mesh::MeshData;
use crate::shapes::slab::Slab;

pub const BUILD_CUTOFF_NUM_TRIANGLES: usize = 32;
pub const BUILD_MAX_LEVEL: u32 = 8;

#[derive(Debug, Clone, Copy, Default)]
pub struct OctreeNode {
    pub bounds: Slab,
    /// Index into `nodes`, 0 meaning "no child" (node 0 is always the root
    /// and can therefore never be referenced as a child).
    pub children: [u32; 8],
    pub first_triangle: u32,
    pub num_triangles: u32,
    pub level: u32,
}

impl OctreeNode {
    fn is_leaf(&self) -> bool {
        self.children.iter().all(|&c| c == 0)
    }
}

#[derive(Debug)]
pub struct TriangleMeshOctree {
    pub mesh: Arc<MeshData>,
    pub nodes: Vec<OctreeNode>,
    pub triangle_indices: Vec<u32>,
}

fn vertex_octant_mask(v: Vec3, mid: Vec3) -> u8 {
    let x = if v.x >= mid.x { 4 } else { 0 };
    let y = if v.y >= mid.y { 2 } else { 0 };
    let z = if v.z >= mid.z { 1 } else { 0 };
    x | y | z
}

/// Octant bounds for label `octant` (bit2=X, bit1=Y, bit0=Z; 1 = high half).
fn octant_bounds(bounds: &Slab, octant: u8) -> Slab {
    let mid = (bounds.min.0 + bounds.max.0) * 0.5;
    let min = Vec3::new(
        if octant & 4 != 0 { mid.x } else { bounds.min.0.x },
        if octant & 2 != 0 { mid.y } else { bounds.min.0.y },
        if octant & 1 != 0 { mid.z } else { bounds.min.0.z },
    );
    let max = Vec3::new(
        if octant & 4 != 0 { bounds.max.0.x } else { mid.x },
        if octant & 2 != 0 { bounds.max.0.y } else { mid.y },
        if octant & 1 != 0 { bounds.max.0.z } else { mid.z },
    );
    Slab::from_min_max(Position3(min), Position3(max), crate::intersection::NO_MATERIAL)
}

struct BuildState<'a> {
    mesh: &'a MeshData,
    nodes: Vec<OctreeNode>,
    triangle_indices: Vec<u32>,
}

impl TriangleMeshOctree {
    pub fn build(mesh: Arc<MeshData>) -> Self {
        let all_triangles: Vec<u32> = (0..mesh.faces.len() as u32).collect();
        let mut state = BuildState {
            mesh: &mesh,
            nodes: Vec::new(),
            triangle_indices: Vec::new(),
        };
        state.nodes.push(OctreeNode::default());
        let root_bounds = mesh.bounds;
        state.build_node(0, root_bounds, all_triangles, 0);

        let BuildState {
            nodes,
            triangle_indices,
            ..
        } = state;
        Self {
            mesh,
            nodes,
            triangle_indices,
        }
    }

    /// Validator for spec.md §8's "nodesCoverAllTriangles" testable
    /// property: every triangle must appear in at least one leaf.
    pub fn covers_all_triangles(&self) -> bool {
        let mut seen = vec![false; self.mesh.faces.len()];
        for node in &self.nodes {
            if node.is_leaf() {
                for i in 0..node.num_triangles {
                    let tri = self.triangle_indices[(node.first_triangle + i) as usize];
                    seen[tri as usize] = true;
                }
            }
        }
        seen.into_iter().all(|b| b)
    }

    pub fn intersects(&self, ray: &Ray, min_dist: f32, max_dist: f32) -> bool {
        self.find_intersection(ray, min_dist, None)
            .map_or(false, |hit| hit.distance <= max_dist)
    }

    pub fn find_intersection(
        &self,
        ray: &Ray,
        min_dist: f32,
        material_override: Option<u32>,
    ) -> Option<RayIntersection> {
        let order = child_order_for_direction(ray.direction.0);
        let mut best: Option<(f32, usize, f32, f32)> = None;
        let mut stack = vec![0u32];

        while let Some(node_idx) = stack.pop() {
            let node = &self.nodes[node_idx as usize];
            if node.bounds.intersect_interval(ray).is_none() {
                continue;
            }

            if node.is_leaf() {
                for i in 0..node.num_triangles {
                    let tri = self.triangle_indices[(node.first_triangle + i) as usize] as usize;
                    let face = &self.mesh.faces[tri];
                    if let Some(hit) = self.mesh.intersect_face(ray, face, min_dist, f32::MAX) {
                        if best.map_or(true, |(bt, ..)| hit.t < bt) {
                            best = Some((hit.t, tri, hit.u, hit.v));
                        }
                    }
                }
            } else {
                // Push children in reverse traversal order so the
                // front-most octant pops first.
                for &octant in order.iter().rev() {
                    let child = node.children[octant as usize];
                    if child != 0 {
                        stack.push(child);
                    }
                }
            }
        }

        best.map(|(t, tri, u, v)| self.mesh.fill_hit_for_face(tri, ray, t, u, v, material_override))
    }
}

impl<'a> BuildState<'a> {
    fn build_node(&mut self, node_idx: usize, bounds: Slab, triangles: Vec<u32>, level: u32) {
        self.nodes[node_idx].bounds = bounds;
        self.nodes[node_idx].level = level;

        if triangles.len() <= BUILD_CUTOFF_NUM_TRIANGLES || level >= BUILD_MAX_LEVEL {
            self.nodes[node_idx].first_triangle = self.triangle_indices.len() as u32;
            self.nodes[node_idx].num_triangles = triangles.len() as u32;
            self.triangle_indices.extend(triangles);
            return;
        }

        let mid = (bounds.min.0 + bounds.max.0) * 0.5;
        let mut buckets: [Vec<u32>; 8] = Default::default();

        for &tri in &triangles {
            let face = &self.mesh.faces[tri as usize];
            let v0 = self.mesh.vertices[face.vertex_indices[0] as usize];
            let v1 = self.mesh.vertices[face.vertex_indices[1] as usize];
            let v2 = self.mesh.vertices[face.vertex_indices[2] as usize];
            let masks = [
                vertex_octant_mask(v0, mid),
                vertex_octant_mask(v1, mid),
                vertex_octant_mask(v2, mid),
            ];
            // A triangle is assigned to every octant it overlaps on every
            // axis: per axis, include the octant bit if ANY vertex lies on
            // that side. This is the known over-inclusive approximation
            // (vertex-in-halfspace, not a full AABB-triangle test).
            let any_high_x = masks.iter().any(|m| m & 4 != 0);
            let any_low_x = masks.iter().any(|m| m & 4 == 0);
            let any_high_y = masks.iter().any(|m| m & 2 != 0);
            let any_low_y = masks.iter().any(|m| m & 2 == 0);
            let any_high_z = masks.iter().any(|m| m & 1 != 0);
            let any_low_z = masks.iter().any(|m| m & 1 == 0);

            for octant in 0u8..8 {
                let wants_high_x = octant & 4 != 0;
                let wants_high_y = octant & 2 != 0;
                let wants_high_z = octant & 1 != 0;
                let x_ok = if wants_high_x { any_high_x } else { any_low_x };
                let y_ok = if wants_high_y { any_high_y } else { any_low_y };
                let z_ok = if wants_high_z { any_high_z } else { any_low_z };
                if x_ok && y_ok && z_ok {
                    buckets[octant as usize].push(tri);
                }
            }
        }

        for octant in 0u8..8 {
            let bucket = std::mem::take(&mut buckets[octant as usize]);
            if bucket.is_empty() {
                continue;
            }
            let child_idx = self.nodes.len();
            self.nodes.push(OctreeNode::default());
            self.nodes[node_idx].children[octant as usize] = child_idx as u32;
            let child_bounds = octant_bounds(&bounds, octant);
            self.build_node(child_idx, child_bounds, bucket, level + 1);
        }
    }
}

/// Per-ray octant traversal order: the largest-magnitude axis steps
/// fastest, and the sign of each component picks near-to-far within that
/// axis. Grounded on
/// `original_source/src/trianglemeshoctree.cpp::childOrderForDirection`.
fn child_order_for_direction(direction: Vec3) -> [u8; 8] {
    let x_sense: u8 = if direction.x >= 0.0 { 0 } else { 4 };
    let y_sense: u8 = if direction.y >= 0.0 { 0 } else { 2 };
    let z_sense: u8 = if direction.z >= 0.0 { 0 } else { 1 };

    let mags = [direction.x.abs(), direction.y.abs(), direction.z.abs()];
    // Rank axes by magnitude, largest first; each axis contributes its bit
    // to the octant index, stepping fastest for the largest-magnitude axis.
    let mut axes = [0usize, 1, 2];
    axes.sort_by(|&a, &b| mags[b].partial_cmp(&mags[a]).unwrap());

    let bit_for_axis = |axis: usize| -> u8 {
        match axis {
            0 => 4,
            1 => 2,
            _ => 1,
        }
    };

    let mut order = [0u8; 8];
    for i in 0..8u8 {
        // Reinterpret i's bits in axes-by-speed order so the fastest-moving
        // axis toggles most often near the front of the sequence, then flip
        // according to the ray's sign per axis.
        let mut octant = 0u8;
        for (rank, &axis) in axes.iter().enumerate() {
            let bit_set = (i >> rank) & 1 != 0;
            if bit_set {
                octant |= bit_for_axis(axis);
            }
        }
        order[i as usize] = octant ^ (x_sense | y_sense | z_sense);
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Direction3;
    use crate::shapes::mesh::{Face, MeshData};

    fn grid_mesh(n: usize) -> Arc<MeshData> {
        // n x n grid of unit quads in the z=0 plane, enough triangles to
        // force at least one octree split.
        let mut vertices = Vec::new();
        let mut faces = Vec::new();
        for j in 0..=n {
            for i in 0..=n {
                vertices.push(Vec3::new(i as f32, j as f32, 0.0));
            }
        }
        let idx = |i: usize, j: usize| (j * (n + 1) + i) as u32;
        for j in 0..n {
            for i in 0..n {
                faces.push(Face {
                    vertex_indices: [idx(i, j), idx(i + 1, j), idx(i + 1, j + 1)],
                    normal_indices: [0, 0, 0],
                    texcoord_indices: [u32::MAX; 3],
                    material: 0,
                });
                faces.push(Face {
                    vertex_indices: [idx(i, j), idx(i + 1, j + 1), idx(i, j + 1)],
                    normal_indices: [0, 0, 0],
                    texcoord_indices: [u32::MAX; 3],
                    material: 0,
                });
            }
        }
        MeshData::new(vertices, vec![Vec3::new(0.0, 0.0, 1.0)], vec![], faces)
    }

    #[test]
    fn octree_covers_all_triangles() {
        let mesh = grid_mesh(10);
        let octree = TriangleMeshOctree::build(mesh);
        assert!(octree.covers_all_triangles());
    }

    #[test]
    fn octree_matches_brute_force() {
        let mesh = grid_mesh(8);
        let octree = TriangleMeshOctree::build(mesh.clone());

        let mut mismatches = 0;
        let mut rng_state: u64 = 0x1234_5678;
        let mut next = || {
            rng_state = rng_state.wrapping_mul(6364136223846793005).wrapping_add(1);
            ((rng_state >> 33) as f32) / (u32::MAX as f32)
        };

        for _ in 0..256 {
            let x = next() * 8.0;
            let y = next() * 8.0;
            let ray = Ray::new(Position3::new(x, y, -5.0), Direction3::new(0.0, 0.0, 1.0));
            let brute = mesh.find_intersection_brute_force(&ray, 0.0, None);
            let fast = octree.find_intersection(&ray, 0.0, None);
            match (brute, fast) {
                (Some(a), Some(b)) => {
                    if (a.distance - b.distance).abs() > 1e-4 {
                        mismatches += 1;
                    }
                }
                (None, None) => {}
                _ => mismatches += 1,
            }
        }
        assert_eq!(mismatches, 0);
    }
}
