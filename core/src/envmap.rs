//! Environment map variants and lat/lon importance sampling.
//!
//! Grounded on `original_source/include/environmentmap.h`,
//! `GradientEnvironmentMap.h`, `LatLonEnvironmentMap.h` (virtual dispatch
//! over `sampleRay`/`canImportanceSample`/`importanceSampleDirection`) and
//! spec.md §4.6/§9: replaced here with a tagged sum, per spec.md §9
//! "Pluggable environment map".

use glam::Vec3;

use crate::math::Direction3;
use crate::rng::Rng;
use crate::texture::{Texture, TextureCoordinate};

pub struct EnvSample {
    pub direction: Direction3,
    pub radiance: [f32; 3],
    pub pdf: f32,
}

pub enum EnvironmentMap {
    /// Returns zero radiance always; the default when no map is configured
    /// (spec.md §3).
    Trivial,
    Gradient {
        low: [f32; 3],
        high: [f32; 3],
        direction: Direction3,
    },
    LatLon(LatLonEnvironmentMap),
}

impl EnvironmentMap {
    pub fn sample_ray(&self, direction: Direction3) -> [f32; 3] {
        match self {
            EnvironmentMap::Trivial => [0.0, 0.0, 0.0],
            EnvironmentMap::Gradient { low, high, direction: axis } => {
                let t = (direction.dot(*axis) * 0.5 + 0.5).clamp(0.0, 1.0);
                [
                    crate::optics::lerp(low[0], high[0], t),
                    crate::optics::lerp(low[1], high[1], t),
                    crate::optics::lerp(low[2], high[2], t),
                ]
            }
            EnvironmentMap::LatLon(map) => map.sample_ray(direction),
        }
    }

    pub fn can_importance_sample(&self) -> bool {
        matches!(self, EnvironmentMap::LatLon(_))
    }

    pub fn importance_sample_direction(&self, rng: &mut Rng) -> Option<EnvSample> {
        match self {
            EnvironmentMap::LatLon(map) => Some(map.importance_sample_direction(rng)),
            _ => None,
        }
    }
}

/// Direction <-> lat/lon pixel mapping, per spec.md §4.6:
/// `phi = u*2pi - pi, theta = v*pi`,
/// `direction = (sin(phi)sin(theta), cos(theta), -cos(phi)sin(theta))`.
fn pixel_to_direction(u: f32, v: f32) -> Direction3 {
    let phi = u * std::f32::consts::TAU - std::f32::consts::PI;
    let theta = v * std::f32::consts::PI;
    Direction3(Vec3::new(
        phi.sin() * theta.sin(),
        theta.cos(),
        -phi.cos() * theta.sin(),
    ))
}

fn direction_to_pixel(d: Direction3) -> (f32, f32) {
    let theta = d.0.y.clamp(-1.0, 1.0).acos();
    let phi = d.0.z.atan2(d.0.x) * -1.0;
    let u = (phi + std::f32::consts::PI) / std::f32::consts::TAU;
    let v = theta / std::f32::consts::PI;
    (u.rem_euclid(1.0), v.clamp(0.0, 1.0))
}

pub struct LatLonEnvironmentMap {
    texture: Texture,
    width: usize,
    height: usize,
    scale_factor: f32,
    /// Per-row cumulative sum of channel-sums, scaled by 2*pi.
    row_cumulative: Vec<Vec<f32>>,
    /// Per-row aggregate cumulative, normalized to [0,1].
    cum_rows: Vec<f32>,
    /// Normalized 2D PDF image, integrating to 1/(4*pi) over the sphere.
    pdf2d: Vec<f32>,
}

impl LatLonEnvironmentMap {
    pub fn build(texture: Texture, width: usize, height: usize, scale_factor: f32) -> Self {
        let mut row_cumulative = Vec::with_capacity(height);
        let mut row_totals = Vec::with_capacity(height);
        let mut weighted_row_totals = Vec::with_capacity(height);

        for y in 0..height {
            let v = (y as f32 + 0.5) / height as f32;
            let elevation = crate::optics::lerp_from_to(
                y as f32 + 0.5,
                0.0,
                height as f32,
                -std::f32::consts::FRAC_PI_2,
                std::f32::consts::FRAC_PI_2,
            );
            let cos_el = elevation.cos();
            let _ = v;

            let mut cumulative = Vec::with_capacity(width);
            let mut running = 0.0f32;
            for x in 0..width {
                let u = (x as f32 + 0.5) / width as f32;
                let vv = (y as f32 + 0.5) / height as f32;
                let rgb = texture.sample_rgb(TextureCoordinate { u, v: vv });
                let channel_sum = (rgb[0] + rgb[1] + rgb[2]) * std::f32::consts::TAU;
                running += channel_sum;
                cumulative.push(running);
            }
            let row_total = running;
            row_totals.push(row_total);
            weighted_row_totals.push(row_total * cos_el);
            row_cumulative.push(cumulative);
        }

        // Normalize each row's cumulative sums to [0, 1].
        for (row, &total) in row_cumulative.iter_mut().zip(row_totals.iter()) {
            if total > 0.0 {
                for v in row.iter_mut() {
                    *v /= total;
                }
            }
        }

        let mut cum_rows = Vec::with_capacity(height);
        let mut running = 0.0f32;
        for &w in &weighted_row_totals {
            running += w;
            cum_rows.push(running);
        }
        let grand_total = running.max(1e-12);
        for v in cum_rows.iter_mut() {
            *v /= grand_total;
        }

        let mut pdf2d = vec![0.0f32; width * height];
        let sphere_area = 4.0 * std::f32::consts::PI;
        for y in 0..height {
            for x in 0..width {
                let rgb = texture.sample_rgb(TextureCoordinate {
                    u: (x as f32 + 0.5) / width as f32,
                    v: (y as f32 + 0.5) / height as f32,
                });
                let luminance = (rgb[0] + rgb[1] + rgb[2]) / 3.0;
                pdf2d[y * width + x] = luminance / sphere_area;
            }
        }
        let pdf_sum: f32 = pdf2d.iter().sum::<f32>().max(1e-12);
        let target_sum = (width * height) as f32 / sphere_area;
        for v in pdf2d.iter_mut() {
            *v = *v / pdf_sum * target_sum;
        }

        Self {
            texture,
            width,
            height,
            scale_factor,
            row_cumulative,
            cum_rows,
            pdf2d,
        }
    }

    pub fn sample_ray(&self, direction: Direction3) -> [f32; 3] {
        let (u, v) = direction_to_pixel(direction);
        let rgb = self.texture.sample_rgb(TextureCoordinate { u, v });
        [
            rgb[0] * self.scale_factor,
            rgb[1] * self.scale_factor,
            rgb[2] * self.scale_factor,
        ]
    }

    fn binary_search_row(&self, e2: f32) -> usize {
        self.cum_rows.partition_point(|&c| c < e2).min(self.height - 1)
    }

    fn binary_search_col(&self, row: usize, e1: f32) -> usize {
        self.row_cumulative[row].partition_point(|&c| c < e1).min(self.width - 1)
    }

    pub fn importance_sample_direction(&self, rng: &mut Rng) -> EnvSample {
        let e1 = rng.uniform01();
        let e2 = rng.uniform01();

        let y = self.binary_search_row(e2);
        let x = self.binary_search_col(y, e1);

        let u = (x as f32 + 0.5) / self.width as f32;
        let v = (y as f32 + 0.5) / self.height as f32;
        let direction = pixel_to_direction(u, v);
        let pdf = self.pdf2d[y * self.width + x] * (self.width * self.height) as f32;
        let radiance = self.sample_ray(direction);

        EnvSample {
            direction,
            radiance,
            pdf,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::WrapMode;

    fn uniform_latlon(w: usize, h: usize, value: f32) -> LatLonEnvironmentMap {
        let data = vec![value; w * h * 3];
        let tex = Texture::new(w, h, 3, WrapMode::Clamp, data);
        LatLonEnvironmentMap::build(tex, w, h, 1.0)
    }

    #[test]
    fn importance_sample_direction_is_unit_length() {
        let map = uniform_latlon(16, 8, 1.0);
        let mut rng = Rng::from_seed(3);
        for _ in 0..64 {
            let s = map.importance_sample_direction(&mut rng);
            assert!((s.direction.length() - 1.0).abs() < 1e-3);
            assert!(s.pdf > 0.0);
        }
    }

    #[test]
    fn gradient_map_interpolates_between_endpoints() {
        let map = EnvironmentMap::Gradient {
            low: [0.0, 0.0, 0.0],
            high: [1.0, 1.0, 1.0],
            direction: Direction3::new(0.0, 1.0, 0.0),
        };
        let up = map.sample_ray(Direction3::new(0.0, 1.0, 0.0));
        let down = map.sample_ray(Direction3::new(0.0, -1.0, 0.0));
        assert!(up[0] > down[0]);
    }

    #[test]
    fn trivial_map_is_always_zero() {
        let map = EnvironmentMap::Trivial;
        assert_eq!(map.sample_ray(Direction3::new(1.0, 0.0, 0.0)), [0.0, 0.0, 0.0]);
    }
}
