//! `RayIntersection`, the shared hit record filled by every shape predicate.
//!
//! Grounded on spec.md §3 "RayIntersection" and the field set
//! `original_source/include/artifacts.h::setIntersection` reads from.

use crate::math::{Direction3, Position3, Ray};
use crate::texture::TextureCoordinate;

pub const NO_MATERIAL: u32 = u32::MAX;

#[derive(Debug, Clone, Copy)]
pub struct RayIntersection {
    pub ray: Ray,
    pub position: Position3,
    pub normal: Direction3,
    pub tangent: Direction3,
    pub bitangent: Direction3,
    pub distance: f32,
    pub material: u32,
    pub texcoord: TextureCoordinate,
    pub has_texcoord: bool,
}

impl RayIntersection {
    /// Orients `normal` so that `dot(normal, wo) >= 0`, per spec.md §3.
    pub fn face_forward(&mut self, wo: Direction3) {
        if self.normal.dot(wo) < 0.0 {
            self.normal = -self.normal;
            self.tangent = -self.tangent;
        }
    }
}
