//! Per-thread random number generator with named domain-sampling methods.
//!
//! Grounded on `original_source/include/rng.h`'s `RNG` struct (a named
//! wrapper around an engine plus distribution state, exposing
//! `uniformCircle`, `cosineAboutDirection`, `uniformUnitCircle`,
//! `gaussian2D`, etc.) — the struct shape is the template; the underlying
//! engine is `rand`'s `StdRng` (a teacher dependency) rather than a
//! hand-rolled Mersenne Twister, satisfying spec.md §9's "Mersenne-Twister
//! or equivalent" allowance without inventing a new dependency.

use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng as _, SeedableRng};

pub struct Rng {
    engine: StdRng,
}

impl Rng {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            engine: StdRng::seed_from_u64(seed),
        }
    }

    /// One independent RNG per worker thread, seeded from a base seed and
    /// thread index so runs are reproducible given the same seed and
    /// thread count (spec.md §9 "Per-thread RNG").
    pub fn for_thread(base_seed: u64, thread_index: u32) -> Self {
        Self::from_seed(base_seed.wrapping_add(0x9E37_79B9_7F4A_7C15u64.wrapping_mul(thread_index as u64 + 1)))
    }

    pub fn uniform01(&mut self) -> f32 {
        self.engine.gen::<f32>()
    }

    pub fn uniform_range(&mut self, lo: f32, hi: f32) -> f32 {
        lo + (hi - lo) * self.uniform01()
    }

    pub fn uniform_rectangle(&mut self, hw: f32, hh: f32) -> Vec2 {
        Vec2::new(self.uniform_range(-hw, hw), self.uniform_range(-hh, hh))
    }

    /// Gaussian-jittered 2D offset, grounded on `RNG::gaussian2D` in
    /// `original_source/include/rng.h` (used for camera-ray pixel jitter).
    pub fn gaussian_2d(&mut self, sigma: f32) -> Vec2 {
        Vec2::new(self.gaussian(sigma), self.gaussian(sigma))
    }

    pub fn gaussian(&mut self, sigma: f32) -> f32 {
        // Box-Muller.
        let u1 = self.uniform01().max(1e-7);
        let u2 = self.uniform01();
        (-2.0 * u1.ln()).sqrt() * (std::f32::consts::TAU * u2).cos() * sigma
    }

    /// Rejection-sampled point in the unit disk, used for thin-lens defocus
    /// blur (`randomBlurCoord` in `app/trace_scene.cpp`).
    pub fn uniform_unit_circle(&mut self) -> Vec2 {
        loop {
            let p = Vec2::new(self.uniform_range(-1.0, 1.0), self.uniform_range(-1.0, 1.0));
            if p.length_squared() <= 1.0 {
                return p;
            }
        }
    }

    /// Concentric (non-rejection) unit-disk sample, used for cosine-lobe
    /// and disk-light sampling (spec.md §4.6 / §4.7.3).
    pub fn concentric_unit_disk(&mut self) -> Vec2 {
        let u = Vec2::new(self.uniform_range(-1.0, 1.0), self.uniform_range(-1.0, 1.0));
        if u.x == 0.0 && u.y == 0.0 {
            return Vec2::ZERO;
        }
        let (r, theta) = if u.x.abs() > u.y.abs() {
            (u.x, std::f32::consts::FRAC_PI_4 * (u.y / u.x))
        } else {
            (u.y, std::f32::consts::FRAC_PI_2 - std::f32::consts::FRAC_PI_4 * (u.x / u.y))
        };
        Vec2::new(r * theta.cos(), r * theta.sin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform01_stays_in_range() {
        let mut rng = Rng::from_seed(42);
        for _ in 0..1000 {
            let v = rng.uniform01();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn unit_circle_samples_stay_inside_disk() {
        let mut rng = Rng::from_seed(7);
        for _ in 0..1000 {
            let p = rng.uniform_unit_circle();
            assert!(p.length_squared() <= 1.0 + 1e-6);
        }
    }

    #[test]
    fn per_thread_rngs_differ() {
        let mut a = Rng::for_thread(1, 0);
        let mut b = Rng::for_thread(1, 1);
        assert_ne!(a.uniform01(), b.uniform01());
    }
}
