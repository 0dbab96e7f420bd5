//! Offline, physically-based Monte Carlo path tracer core.
//!
//! This crate is the CPU integrator, scene representation, and render
//! driver; [`crate::render`] is the entry point a host binary calls after
//! building a [`crate::scene::Scene`].

pub mod ambient_occlusion;
pub mod artifacts;
pub mod camera;
pub mod envmap;
pub mod error;
pub mod integrator;
pub mod intersection;
pub mod kdtree;
pub mod light;
pub mod material;
pub mod math;
pub mod medium;
pub mod optics;
pub mod render;
pub mod rng;
pub mod sampling;
pub mod scene;
pub mod scene_file;
pub mod sensor;
pub mod shapes;
pub mod texture;
pub mod tonemap;
pub mod traceable;
pub mod transform;
