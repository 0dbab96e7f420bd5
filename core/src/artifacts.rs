//! Per-pixel AOV accumulation and image output.
//!
//! Grounded on `original_source/include/artifacts.h`: `accumPixelRadiance`
//! (running mean + Welford variance, with `Inf`/`NaN`/negative-color
//! warnings), `setIntersection`/`setBasicLighting` (fixed-direction
//! single-light preview shading), `setDistColor` (distance AOV color
//! coding), and position/direction/texcoord AOV encodings
//! (`v*0.5 + 0.5`).
//!
//! All per-pixel state lives in one `Vec<PixelArtifacts>`, one cell per
//! pixel. The render driver (`crate::render`) gives each worker thread a
//! disjoint scratch [`PixelArtifacts`] per pixel it samples and folds the
//! results back in with [`Artifacts::merge_pixel`] once the parallel phase
//! finishes, so no pixel write ever takes a lock (spec.md §5: "pixels are
//! partitioned disjointly across threads... no locking is required under
//! the partitioning discipline").

use crate::intersection::RayIntersection;
use crate::math::Direction3;

#[derive(Debug, Clone, Copy, Default)]
struct PixelAccumulator {
    mean: [f32; 3],
    /// Welford's running sum of squared deviations from the mean.
    m2: [f32; 3],
    count: u32,
}

impl PixelAccumulator {
    fn accumulate(&mut self, sample: [f32; 3]) {
        // A NaN/Inf/negative sample is warned about but still accumulated
        // unconditionally: excluding it would bias the estimator
        // (spec.md §5, §7; matches `Artifacts::accumPixelColor`, which only
        // logs before calling through to `accum`).
        if sample.iter().any(|c| c.is_infinite()) {
            log::warn!("pixel color has Inf value: {sample:?}");
        }
        if sample.iter().any(|c| c.is_nan()) {
            log::warn!("pixel color has NaN value: {sample:?}");
        }
        if sample.iter().any(|&c| c < 0.0) {
            log::warn!("pixel color has negative value: {sample:?}");
        }
        self.count += 1;
        let n = self.count as f32;
        for c in 0..3 {
            let x = sample[c];
            let delta = x - self.mean[c];
            self.mean[c] += delta / n;
            let delta2 = x - self.mean[c];
            self.m2[c] += delta * delta2;
        }
    }

    fn variance(&self) -> [f32; 3] {
        if self.count < 2 {
            return [0.0; 3];
        }
        let n = self.count as f32;
        [self.m2[0] / n, self.m2[1] / n, self.m2[2] / n]
    }

    /// Chan et al.'s parallel combination of two Welford accumulators, used
    /// to fold a worker's per-pass batch into the pixel's running total
    /// without re-visiting individual samples.
    fn merge(&mut self, other: &PixelAccumulator) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = *other;
            return;
        }
        let n_a = self.count as f32;
        let n_b = other.count as f32;
        let n = n_a + n_b;
        for c in 0..3 {
            let delta = other.mean[c] - self.mean[c];
            self.mean[c] += delta * n_b / n;
            self.m2[c] += other.m2[c] + delta * delta * n_a * n_b / n;
        }
        self.count += other.count;
    }
}

/// One pixel's worth of every AOV buffer an offline render can produce.
#[derive(Debug, Clone, Copy, Default)]
pub struct PixelArtifacts {
    radiance: PixelAccumulator,
    hit_mask: bool,
    distance: f32,
    position: [f32; 3],
    normal: [f32; 3],
    tangent: [f32; 3],
    bitangent: [f32; 3],
    texcoord: [f32; 2],
    basic_lighting: [f32; 3],
    mat_diffuse: [f32; 3],
    mat_specular: [f32; 3],
    ambient_occlusion: f32,
    pixel_time: f32,
}

const BASIC_LIGHT_DIRECTION: (f32, f32, f32) = (1.0, 1.0, 1.0);
const BASIC_SPECULAR_EXPONENT: f32 = 10.0;

impl PixelArtifacts {
    /// A blank per-pixel cell, as handed to each worker thread's disjoint
    /// share of a render pass (`render::render_pass`'s scratch buffer).
    pub fn new() -> Self {
        Self {
            distance: f32::MAX,
            ..Default::default()
        }
    }

    pub fn accumulate_radiance(&mut self, sample: [f32; 3]) {
        self.radiance.accumulate(sample);
    }

    /// Fills every geometric AOV from an intersection, plus the fixed
    /// single-directional-light preview render (`setBasicLighting`).
    pub fn set_intersection(&mut self, hit: &RayIntersection, diffuse: [f32; 3], specular: [f32; 3]) {
        self.hit_mask = true;
        self.distance = hit.distance;
        self.position = encode_position(hit.position);
        self.normal = encode_direction(hit.normal);
        self.tangent = encode_direction(hit.tangent);
        self.bitangent = encode_direction(hit.bitangent);
        self.texcoord = [hit.texcoord.u, hit.texcoord.v];
        self.mat_diffuse = diffuse;
        self.mat_specular = specular;
        self.basic_lighting = basic_lighting(hit, diffuse, specular);
    }

    pub fn set_ambient_occlusion(&mut self, value: f32) {
        self.ambient_occlusion = value;
    }

    /// Accumulates wall-clock seconds spent tracing a pixel (`setTime`);
    /// additive so progressive render order, which revisits every pixel
    /// once per sample pass, ends with the pixel's total trace time.
    pub fn add_time(&mut self, seconds: f32) {
        self.pixel_time += seconds;
    }

    /// Folds another worker cell's samples and elapsed time into this one;
    /// the intersection AOVs are copied wholesale rather than merged, since
    /// they're only ever populated on the first sample pass of a pixel.
    fn merge_from(&mut self, other: &PixelArtifacts, copy_intersection: bool) {
        self.radiance.merge(&other.radiance);
        self.pixel_time += other.pixel_time;
        if other.ambient_occlusion != 0.0 {
            self.ambient_occlusion = other.ambient_occlusion;
        }
        if copy_intersection {
            self.hit_mask = other.hit_mask;
            self.distance = other.distance;
            self.position = other.position;
            self.normal = other.normal;
            self.tangent = other.tangent;
            self.bitangent = other.bitangent;
            self.texcoord = other.texcoord;
            self.basic_lighting = other.basic_lighting;
            self.mat_diffuse = other.mat_diffuse;
            self.mat_specular = other.mat_specular;
        }
    }

    /// Renders the distance AOV to a greyscale/color-coded image per
    /// `setDistColor`: yellow for misses, red for `Inf`, magenta for `NaN`,
    /// cyan below the trace epsilon, orange at the far clip, else
    /// `log10(distance)` greyscale.
    fn distance_color(&self) -> [f32; 3] {
        let d = self.distance;
        if d.is_nan() {
            return [1.0, 0.0, 1.0];
        }
        if d.is_infinite() {
            return [1.0, 0.0, 0.0];
        }
        if d >= f32::MAX * 0.999 {
            return [1.0, 1.0, 0.0];
        }
        if d < 1e-6 {
            return [0.0, 1.0, 1.0];
        }
        let g = d.max(1e-6).log10().clamp(0.0, 1.0);
        [g, g, g]
    }
}

/// The render driver's output buffer: one [`PixelArtifacts`] cell per
/// pixel, row-major.
pub struct Artifacts {
    pub width: u32,
    pub height: u32,
    pixels: Vec<PixelArtifacts>,
    has_ao: bool,
}

impl Artifacts {
    pub fn new(width: u32, height: u32) -> Self {
        let n = (width * height) as usize;
        Self {
            width,
            height,
            pixels: vec![PixelArtifacts::new(); n],
            has_ao: false,
        }
    }

    fn index(&self, x: u32, y: u32) -> usize {
        (y * self.width + x) as usize
    }

    /// Marks the ambient-occlusion AOV as present; called once up front
    /// from the render driver rather than per-pixel, since per-pixel
    /// writes happen on disjoint row chunks with no shared flag to race on.
    pub fn enable_ambient_occlusion(&mut self) {
        self.has_ao = true;
    }

    /// Folds one worker cell from a render pass's scratch buffer
    /// (`render::render_pass`) into this pixel, with no lock: the merge
    /// runs single-threaded after the pass's parallel phase has finished
    /// writing into disjoint scratch cells, per spec.md §5's no-locking
    /// partitioning discipline.
    pub fn merge_pixel(&mut self, x: u32, y: u32, cell: &PixelArtifacts, copy_intersection: bool) {
        let i = self.index(x, y);
        self.pixels[i].merge_from(cell, copy_intersection);
    }

    pub fn accum_pixel_radiance(&mut self, x: u32, y: u32, sample: [f32; 3]) {
        let i = self.index(x, y);
        self.pixels[i].accumulate_radiance(sample);
    }

    pub fn pixel_mean(&self, x: u32, y: u32) -> [f32; 3] {
        self.pixels[self.index(x, y)].radiance.mean
    }

    pub fn pixel_variance(&self, x: u32, y: u32) -> [f32; 3] {
        self.pixels[self.index(x, y)].radiance.variance()
    }

    pub fn sample_count(&self, x: u32, y: u32) -> u32 {
        self.pixels[self.index(x, y)].radiance.count
    }

    pub fn set_intersection(&mut self, x: u32, y: u32, hit: &RayIntersection, diffuse: [f32; 3], specular: [f32; 3]) {
        let i = self.index(x, y);
        self.pixels[i].set_intersection(hit, diffuse, specular);
    }

    pub fn set_ambient_occlusion(&mut self, x: u32, y: u32, value: f32) {
        let i = self.index(x, y);
        self.pixels[i].set_ambient_occlusion(value);
    }

    pub fn add_pixel_time(&mut self, x: u32, y: u32, seconds: f32) {
        let i = self.index(x, y);
        self.pixels[i].add_time(seconds);
    }

    pub fn pixel_time(&self, x: u32, y: u32) -> f32 {
        self.pixels[self.index(x, y)].pixel_time
    }

    pub fn distance_color(&self, x: u32, y: u32) -> [f32; 3] {
        self.pixels[self.index(x, y)].distance_color()
    }

    pub fn has_ambient_occlusion(&self) -> bool {
        self.has_ao
    }

    pub fn ambient_occlusion(&self, x: u32, y: u32) -> f32 {
        self.pixels[self.index(x, y)].ambient_occlusion
    }

    /// Writes the primary radiance AOV, gamma-corrected but not tonemapped
    /// (`writePixelColor`'s `prefix + "color.png"`).
    pub fn write_color_png(&self, path: &std::path::Path) -> image::ImageResult<()> {
        self.write_aov_png(path, |s, x, y| crate::tonemap::gamma_only(s.pixel_mean(x, y)))
    }

    /// Writes the primary radiance AOV untouched (linear, unclamped) as an
    /// HDR image, for downstream tonemapping/denoising
    /// (`writePixelColor`'s `prefix + "color.hdr"`).
    pub fn write_radiance_hdr(&self, path: &std::path::Path) -> image::ImageResult<()> {
        self.write_hdr(path, |s, x, y| s.pixel_mean(x, y))
    }

    /// Writes the tonemapped-and-gamma-corrected primary radiance AOV
    /// (`writePixelColor`'s `prefix + "color_tone_mapped.png"`).
    pub fn write_color_tone_mapped_png(&self, path: &std::path::Path) -> image::ImageResult<()> {
        self.write_aov_png(path, |s, x, y| crate::tonemap::tonemap(s.pixel_mean(x, y)))
    }

    /// Writes every enabled AOV to `directory`, named per spec.md §6's
    /// `trace_` file set (`original_source/src/artifacts.cpp::writeAll`).
    pub fn write_all(&self, directory: &std::path::Path, prefix: &str) -> std::io::Result<()> {
        std::fs::create_dir_all(directory)?;
        self.write_aov_png(&directory.join(format!("{prefix}hit_mask.png")), |s, x, y| {
            let v = if s.pixels[s.index(x, y)].hit_mask { 1.0 } else { 0.0 };
            [v, v, v]
        })
        .map_err(to_io_error)?;
        self.write_aov_png(&directory.join(format!("{prefix}isect_distance.png")), |s, x, y| s.distance_color(x, y))
            .map_err(to_io_error)?;
        self.write_aov_png(&directory.join(format!("{prefix}isect_normal.png")), |s, x, y| {
            s.pixels[s.index(x, y)].normal
        })
        .map_err(to_io_error)?;
        self.write_aov_png(&directory.join(format!("{prefix}isect_tangent.png")), |s, x, y| {
            s.pixels[s.index(x, y)].tangent
        })
        .map_err(to_io_error)?;
        self.write_aov_png(&directory.join(format!("{prefix}isect_bitangent.png")), |s, x, y| {
            s.pixels[s.index(x, y)].bitangent
        })
        .map_err(to_io_error)?;
        self.write_aov_png(&directory.join(format!("{prefix}isect_texcoord.png")), |s, x, y| {
            let uv = s.pixels[s.index(x, y)].texcoord;
            [uv[0], uv[1], 0.0]
        })
        .map_err(to_io_error)?;
        self.write_aov_png(&directory.join(format!("{prefix}isect_mat_diffuse.png")), |s, x, y| {
            s.pixels[s.index(x, y)].mat_diffuse
        })
        .map_err(to_io_error)?;
        self.write_aov_png(&directory.join(format!("{prefix}isect_mat_specular.png")), |s, x, y| {
            s.pixels[s.index(x, y)].mat_specular
        })
        .map_err(to_io_error)?;
        self.write_aov_png(&directory.join(format!("{prefix}isect_basic_lighting.png")), |s, x, y| {
            s.pixels[s.index(x, y)].basic_lighting
        })
        .map_err(to_io_error)?;
        self.write_hdr(&directory.join(format!("{prefix}isect_time.hdr")), |s, x, y| {
            let t = s.pixel_time(x, y);
            [t, t, t]
        })
        .map_err(to_io_error)?;
        self.write_aov_png(&directory.join(format!("{prefix}isect_stddev.png")), |s, x, y| {
            let v = s.pixel_variance(x, y);
            [v[0].sqrt(), v[1].sqrt(), v[2].sqrt()]
        })
        .map_err(to_io_error)?;
        if self.has_ao {
            self.write_aov_png(&directory.join(format!("{prefix}ao.png")), |s, x, y| {
                let v = s.ambient_occlusion(x, y);
                [v, v, v]
            })
            .map_err(to_io_error)?;
        }
        self.write_color_png(&directory.join(format!("{prefix}color.png")))
            .map_err(to_io_error)?;
        self.write_radiance_hdr(&directory.join(format!("{prefix}color.hdr")))
            .map_err(to_io_error)?;
        self.write_color_tone_mapped_png(&directory.join(format!("{prefix}color_tone_mapped.png")))
            .map_err(to_io_error)?;
        Ok(())
    }

    fn write_aov_png(&self, path: &std::path::Path, f: impl Fn(&Self, u32, u32) -> [f32; 3]) -> image::ImageResult<()> {
        let mut buf = image::RgbImage::new(self.width, self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                let v = f(self, x, y);
                buf.put_pixel(x, y, image::Rgb(crate::tonemap::to_u8(v)));
            }
        }
        buf.save(path)
    }

    fn write_hdr(&self, path: &std::path::Path, f: impl Fn(&Self, u32, u32) -> [f32; 3]) -> image::ImageResult<()> {
        let mut buf = image::Rgb32FImage::new(self.width, self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                let v = f(self, x, y);
                buf.put_pixel(x, y, image::Rgb(v));
            }
        }
        image::DynamicImage::ImageRgb32F(buf).save(path)
    }
}

fn to_io_error(e: image::ImageError) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, e)
}

fn encode_direction(d: Direction3) -> [f32; 3] {
    [d.0.x * 0.5 + 0.5, d.0.y * 0.5 + 0.5, d.0.z * 0.5 + 0.5]
}

fn encode_position(p: crate::math::Position3) -> [f32; 3] {
    [p.0.x * 0.5 + 0.5, p.0.y * 0.5 + 0.5, p.0.z * 0.5 + 0.5]
}

fn basic_lighting(hit: &RayIntersection, diffuse: [f32; 3], specular: [f32; 3]) -> [f32; 3] {
    let light = Direction3::new(BASIC_LIGHT_DIRECTION.0, BASIC_LIGHT_DIRECTION.1, BASIC_LIGHT_DIRECTION.2).normalize_or_self();
    let n_dot_l = hit.normal.dot(light).max(0.0);
    let r = crate::math::reflect(-light, hit.normal);
    let v_dot_r = hit.ray.direction.dot(r).max(0.0).min(1.0);
    let spec_term = v_dot_r.powf(BASIC_SPECULAR_EXPONENT);
    [
        diffuse[0] * n_dot_l + specular[0] * spec_term,
        diffuse[1] * n_dot_l + specular[1] * spec_term,
        diffuse[2] * n_dot_l + specular[2] * spec_term,
    ]
}
