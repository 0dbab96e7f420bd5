//! Camera models: pinhole (with optional thin-lens defocus blur) and
//! orthographic.
//!
//! Grounded on `original_source/include/camera.h` (`PinholeCamera`,
//! `OrthographicCamera`, both deriving rays from a standard image-plane
//! location in `[-1, 1]^2`) and spec.md §3/§4.1.

use crate::math::{Direction3, Position3, Ray};
use crate::rng::Rng;
use crate::transform::Transform;

pub enum Camera {
    Pinhole {
        /// Horizontal half-angle, radians.
        hfov: f32,
        /// Vertical half-angle, radians.
        vfov: f32,
        focus_distance: f32,
        /// Lens radius; zero disables defocus blur (spec.md §3).
        focus_divergence: f32,
    },
    Orthographic {
        hsize: f32,
        vsize: f32,
    },
}

impl Camera {
    /// `image_location` is in `[-1, 1] x [-1, 1]` standard image-plane
    /// coordinates (spec.md §3 "Sensor").
    pub fn ray_through_standard_image_plane(
        &self,
        image_location: (f32, f32),
        transform: &Transform,
        rng: &mut Rng,
    ) -> Ray {
        match *self {
            Camera::Pinhole {
                hfov,
                vfov,
                focus_distance,
                focus_divergence,
            } => {
                let (x, y) = image_location;
                let dir_camera = Direction3::new(x * hfov.tan(), y * vfov.tan(), 1.0).normalize_or_self();

                if focus_divergence <= 0.0 {
                    let origin = transform.transform_position(Position3::new(0.0, 0.0, 0.0));
                    let direction = transform.transform_direction(dir_camera).normalize_or_self();
                    return Ray::new(origin, direction);
                }

                // Thin-lens model: focus the sharp ray at `focus_distance`
                // along the unperturbed direction, then jitter the origin
                // within a lens disk and re-aim at the focal point.
                let focal_point_camera = dir_camera * (focus_distance / dir_camera.0.z.max(1e-6));
                let lens = rng.uniform_unit_circle() * focus_divergence;
                let origin_camera = Position3::new(lens.x, lens.y, 0.0);
                let direction_camera =
                    (Position3::new(0.0, 0.0, 0.0) + focal_point_camera - origin_camera).normalize_or_self();

                let origin = transform.transform_position(origin_camera);
                let direction = transform.transform_direction(direction_camera).normalize_or_self();
                Ray::new(origin, direction)
            }
            Camera::Orthographic { hsize, vsize } => {
                let (x, y) = image_location;
                let origin_camera = Position3::new(x * hsize, y * vsize, 0.0);
                let origin = transform.transform_position(origin_camera);
                let direction = transform
                    .transform_direction(Direction3::new(0.0, 0.0, 1.0))
                    .normalize_or_self();
                Ray::new(origin, direction)
            }
        }
    }
}
