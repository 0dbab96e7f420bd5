//! Material parameter bundle and evaluation.
//!
//! Grounded on spec.md §3 "Material" / §4.5 "Material parameter evaluation",
//! and on the teacher's `kernels/src/bsdf.rs::get_pbr_bsdf` texture-lookup
//! pattern (constant-or-texture evaluation), adapted from a trait-object
//! BSDF to the tagged-sum shading dispatch spec.md §9 prescribes.

use crate::intersection::RayIntersection;
use crate::medium::Medium;
use crate::texture::{Texture, TextureCoordinate};

pub const NO_TEXTURE: u32 = u32::MAX;
pub const DEFAULT_MATERIAL: u32 = u32::MAX;

/// A parameter that is either a constant RGB or a texture lookup.
#[derive(Debug, Clone, Copy)]
pub struct RgbParam {
    pub constant: [f32; 3],
    pub texture: u32,
}

impl RgbParam {
    pub fn constant(rgb: [f32; 3]) -> Self {
        Self {
            constant: rgb,
            texture: NO_TEXTURE,
        }
    }

    pub fn textured(texture: u32) -> Self {
        Self {
            constant: [0.0; 3],
            texture,
        }
    }

    pub fn evaluate(&self, textures: &[Texture], texcoord: TextureCoordinate) -> [f32; 3] {
        if self.texture == NO_TEXTURE {
            self.constant
        } else {
            textures[self.texture as usize].sample_rgb(texcoord)
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AlphaParam {
    pub constant: f32,
    pub texture: u32,
}

impl AlphaParam {
    pub fn opaque() -> Self {
        Self {
            constant: 1.0,
            texture: NO_TEXTURE,
        }
    }

    pub fn evaluate(&self, textures: &[Texture], texcoord: TextureCoordinate) -> f32 {
        if self.texture == NO_TEXTURE {
            self.constant
        } else {
            textures[self.texture as usize].sample_alpha(texcoord)
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Material {
    pub diffuse: RgbParam,
    pub specular: RgbParam,
    /// 0 = perfect mirror, >0 = Phong glossy exponent.
    pub specular_exponent: f32,
    pub alpha: AlphaParam,
    pub emission: [f32; 3],
    pub normal_map: Option<u32>,
    pub is_refractive: bool,
    pub inner_medium: Option<Medium>,
}

impl Material {
    pub fn default_material() -> Self {
        Self {
            diffuse: RgbParam::constant([0.8, 0.8, 0.8]),
            specular: RgbParam::constant([0.0, 0.0, 0.0]),
            specular_exponent: 0.0,
            alpha: AlphaParam::opaque(),
            emission: [0.0, 0.0, 0.0],
            normal_map: None,
            is_refractive: false,
            inner_medium: None,
        }
    }

    pub fn diffuse_white() -> Self {
        Self::default_material()
    }

    pub fn emissive(radiance: [f32; 3]) -> Self {
        Self {
            emission: radiance,
            diffuse: RgbParam::constant([0.0, 0.0, 0.0]),
            ..Self::default_material()
        }
    }

    pub fn mirror() -> Self {
        Self {
            diffuse: RgbParam::constant([0.0, 0.0, 0.0]),
            specular: RgbParam::constant([1.0, 1.0, 1.0]),
            specular_exponent: 0.0,
            ..Self::default_material()
        }
    }

    pub fn refractive(ior: f32, attenuation: [f32; 3]) -> Self {
        Self {
            diffuse: RgbParam::constant([0.0, 0.0, 0.0]),
            specular: RgbParam::constant([0.04, 0.04, 0.04]),
            is_refractive: true,
            inner_medium: Some(Medium::new(ior, attenuation)),
            ..Self::default_material()
        }
    }
}

/// Resolves a possibly-sentinel material id against the scene's material
/// array, substituting the renderer default on out-of-range ids (spec.md
/// §7 "Scene graph faults").
pub fn resolve_material<'a>(materials: &'a [Material], default: &'a Material, id: u32) -> &'a Material {
    if id == DEFAULT_MATERIAL {
        return default;
    }
    match materials.get(id as usize) {
        Some(m) => m,
        None => {
            log::warn!("out-of-range material id {id}, substituting default material");
            default
        }
    }
}

/// Applies normal-map frame perturbation in place, per spec.md §4.5.
pub fn apply_normal_map(intersection: &mut RayIntersection, textures: &[Texture], map_texture: u32) {
    let sample = textures[map_texture as usize].sample_rgb(intersection.texcoord);
    let map = glam::Vec3::new(sample[0] * 2.0 - 1.0, sample[1] * 2.0 - 1.0, sample[2] * 2.0 - 1.0);

    let n = intersection.normal.0;
    let t = intersection.tangent.0;
    let b = intersection.bitangent.0;

    let new_normal = (n * map.z + t * map.x + b * map.y).normalize();
    let new_tangent = b.cross(new_normal);
    let new_bitangent = new_normal.cross(new_tangent);

    intersection.normal = crate::math::Direction3(new_normal);
    intersection.tangent = crate::math::Direction3(new_tangent.normalize());
    intersection.bitangent = crate::math::Direction3(new_bitangent.normalize());
}
