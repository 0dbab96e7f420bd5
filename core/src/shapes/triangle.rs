//! Moller-Trumbore ray/triangle intersection. Grounded on spec.md §4.1
//! "Triangle" and `kernels/src/intersection.rs::muller_trumbore`.

use glam::Vec3;

pub struct TriangleHit {
    pub t: f32,
    pub u: f32,
    pub v: f32,
}

/// Returns barycentric (u, v) and distance `t` on hit. Rejects
/// near-degenerate (near-zero-area, or ray near-parallel to the plane)
/// triangles via the determinant threshold, per spec.md.
pub fn moller_trumbore(
    origin: Vec3,
    direction: Vec3,
    v0: Vec3,
    v1: Vec3,
    v2: Vec3,
) -> Option<TriangleHit> {
    let e1 = v1 - v0;
    let e2 = v2 - v0;
    let p = direction.cross(e2);
    let det = e1.dot(p);
    if det.abs() < 1e-6 {
        return None;
    }
    let inv_det = 1.0 / det;
    let t_vec = origin - v0;
    let u = t_vec.dot(p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = t_vec.cross(e1);
    let v = direction.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = e2.dot(q) * inv_det;
    Some(TriangleHit { t, u, v })
}

/// Barycentric interpolation of per-vertex attributes, used for
/// normal/texcoord interpolation across a hit triangle (spec.md §8
/// "Barycentric" round-trip).
pub fn barycentric_interpolate(v0: Vec3, v1: Vec3, v2: Vec3, u: f32, v: f32) -> Vec3 {
    v0 * (1.0 - u - v) + v1 * u + v2 * v
}

/// Recovers barycentric coordinates for a point known to lie in the plane
/// of the triangle (used by tests and by the octree's known-containment
/// invariant, not by the hot intersection path).
pub fn barycentric_for(p: Vec3, v0: Vec3, v1: Vec3, v2: Vec3) -> (f32, f32, f32) {
    let e1 = v1 - v0;
    let e2 = v2 - v0;
    let ep = p - v0;

    let d00 = e1.dot(e1);
    let d01 = e1.dot(e2);
    let d11 = e2.dot(e2);
    let d20 = ep.dot(e1);
    let d21 = ep.dot(e2);
    let denom = d00 * d11 - d01 * d01;

    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;
    let u = 1.0 - v - w;
    (u, v, w)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn barycentric_round_trip() {
        let v0 = Vec3::new(0.0, 0.0, 0.0);
        let v1 = Vec3::new(1.0, 0.0, 0.0);
        let v2 = Vec3::new(0.0, 1.0, 0.0);
        let (bu, bv, bw) = (0.2, 0.3, 0.5);
        let p = v0 * bu + v1 * bv + v2 * bw;

        let (u, v, w) = barycentric_for(p, v0, v1, v2);
        let reconstructed = v0 * u + v1 * v + v2 * w;
        assert!((reconstructed - p).length() < 1e-5);
    }

    #[test]
    fn hits_front_facing_triangle() {
        let v0 = Vec3::new(-1.0, -1.0, 0.0);
        let v1 = Vec3::new(1.0, -1.0, 0.0);
        let v2 = Vec3::new(0.0, 1.0, 0.0);
        let hit = moller_trumbore(Vec3::new(0.0, 0.0, -5.0), Vec3::new(0.0, 0.0, 1.0), v0, v1, v2).unwrap();
        assert!((hit.t - 5.0).abs() < 1e-4);
    }

    #[test]
    fn misses_outside_triangle() {
        let v0 = Vec3::new(-1.0, -1.0, 0.0);
        let v1 = Vec3::new(1.0, -1.0, 0.0);
        let v2 = Vec3::new(0.0, 1.0, 0.0);
        let hit = moller_trumbore(Vec3::new(5.0, 5.0, -5.0), Vec3::new(0.0, 0.0, 1.0), v0, v1, v2);
        assert!(hit.is_none());
    }
}
