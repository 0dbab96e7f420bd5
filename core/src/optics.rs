//! Fresnel reflectance and small RGB-algebra helpers.
//!
//! Grounded on `kernels/src/util.rs::fresnel_schlick`/`fresnel_schlick_scalar`
//! and spec.md §4.7/§8 (Fresnel limits, Schlick approximation).

/// Schlick's approximation with a vector F0 (spec.md §4.7: `F = Schlick(S, |Wo.N|)`).
pub fn fresnel_schlick(f0: [f32; 3], cos_theta: f32) -> [f32; 3] {
    let m = (1.0 - cos_theta).clamp(0.0, 1.0).powi(5);
    [
        f0[0] + (1.0 - f0[0]) * m,
        f0[1] + (1.0 - f0[1]) * m,
        f0[2] + (1.0 - f0[2]) * m,
    ]
}

pub fn fresnel_schlick_scalar(f0: f32, cos_theta: f32) -> f32 {
    let m = (1.0 - cos_theta).clamp(0.0, 1.0).powi(5);
    f0 + (1.0 - f0) * m
}

/// Exact unpolarized dielectric Fresnel reflectance for indices of
/// refraction n1 (incident side) and n2 (transmitted side).
pub fn fresnel_dielectric(cos_theta_i: f32, n1: f32, n2: f32) -> f32 {
    let cos_i = cos_theta_i.clamp(-1.0, 1.0);
    let sin2_t = (n1 / n2).powi(2) * (1.0 - cos_i * cos_i).max(0.0);
    if sin2_t >= 1.0 {
        return 1.0; // total internal reflection
    }
    let cos_t = (1.0 - sin2_t).sqrt();
    let r_parallel = (n2 * cos_i - n1 * cos_t) / (n2 * cos_i + n1 * cos_t);
    let r_perp = (n1 * cos_i - n2 * cos_t) / (n1 * cos_i + n2 * cos_t);
    0.5 * (r_parallel * r_parallel + r_perp * r_perp)
}

pub fn power_heuristic(nf: f32, f_pdf: f32, ng: f32, g_pdf: f32) -> f32 {
    let f = nf * f_pdf;
    let g = ng * g_pdf;
    if f * f + g * g == 0.0 {
        0.0
    } else {
        (f * f) / (f * f + g * g)
    }
}

pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

pub fn lerp_from_to(x: f32, a0: f32, a1: f32, b0: f32, b1: f32) -> f32 {
    b0 + (b1 - b0) * ((x - a0) / (a1 - a0))
}

pub fn rgb_add(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

pub fn rgb_scale(a: [f32; 3], s: f32) -> [f32; 3] {
    [a[0] * s, a[1] * s, a[2] * s]
}

pub fn rgb_mul(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] * b[0], a[1] * b[1], a[2] * b[2]]
}

pub fn rgb_mean(a: [f32; 3]) -> f32 {
    (a[0] + a[1] + a[2]) / 3.0
}

/// `1 - f`, per channel, used for `(1-F)*D*Ld + F*Ls` combination (spec.md §4.7).
pub fn rgb_residual(a: [f32; 3]) -> [f32; 3] {
    [1.0 - a[0], 1.0 - a[1], 1.0 - a[2]]
}
