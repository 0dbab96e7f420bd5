//! Pixel grid and the three pixel-iteration strategies (raster, tiled,
//! progressive).
//!
//! Grounded on `original_source/include/sensor.h`'s
//! `pixelStandardImageLocation`, `forEachPixelThreaded` and
//! `forEachPixelTiledThreaded`, and `app/trace_scene.cpp`'s render-order
//! dispatch (tile size hardcoded to 8).

pub const TILE_SIZE: u32 = 8;

#[derive(Debug, Clone, Copy)]
pub struct Sensor {
    pub pixel_width: u32,
    pub pixel_height: u32,
}

impl Sensor {
    pub fn new(pixel_width: u32, pixel_height: u32) -> Self {
        Self {
            pixel_width,
            pixel_height,
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.pixel_width as usize * self.pixel_height as usize
    }

    /// Scales both pixel dimensions by `factor`, rounding to the nearest
    /// pixel with a floor of 1 (`--sensorscale`, spec.md §6).
    pub fn scaled(&self, factor: f32) -> Self {
        let scale = |dim: u32| ((dim as f32 * factor).round() as u32).max(1);
        Self {
            pixel_width: scale(self.pixel_width),
            pixel_height: scale(self.pixel_height),
        }
    }

    /// Maps a pixel coordinate (+ subpixel jitter) to standard image-plane
    /// location in `[-1, 1]^2`, Y-flipped so that row 0 is the top of the
    /// image (spec.md §3 "Sensor").
    pub fn pixel_standard_image_location(&self, x: u32, y: u32, jitter_x: f32, jitter_y: f32) -> (f32, f32) {
        let aspect = self.pixel_width as f32 / self.pixel_height as f32;
        let u = ((x as f32 + 0.5 + jitter_x) / self.pixel_width as f32) * 2.0 - 1.0;
        let v = 1.0 - ((y as f32 + 0.5 + jitter_y) / self.pixel_height as f32) * 2.0;
        (u * aspect, v)
    }

    /// Row-major raster order: `(0,0), (1,0), ..., (w-1,0), (0,1), ...`.
    pub fn raster_order(&self) -> Vec<(u32, u32)> {
        let mut pixels = Vec::with_capacity(self.pixel_count());
        for y in 0..self.pixel_height {
            for x in 0..self.pixel_width {
                pixels.push((x, y));
            }
        }
        pixels
    }

    /// Tiled order: `TILE_SIZE x TILE_SIZE` blocks in raster order, pixels
    /// within each tile also in raster order. Matches
    /// `Sensor::forEachPixelTiledThreaded`.
    pub fn tiled_order(&self) -> Vec<(u32, u32)> {
        let mut pixels = Vec::with_capacity(self.pixel_count());
        let tiles_x = self.pixel_width.div_ceil(TILE_SIZE);
        let tiles_y = self.pixel_height.div_ceil(TILE_SIZE);
        for ty in 0..tiles_y {
            for tx in 0..tiles_x {
                let x0 = tx * TILE_SIZE;
                let y0 = ty * TILE_SIZE;
                let x1 = (x0 + TILE_SIZE).min(self.pixel_width);
                let y1 = (y0 + TILE_SIZE).min(self.pixel_height);
                for y in y0..y1 {
                    for x in x0..x1 {
                        pixels.push((x, y));
                    }
                }
            }
        }
        pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raster_order_covers_every_pixel_once() {
        let sensor = Sensor::new(4, 3);
        let order = sensor.raster_order();
        assert_eq!(order.len(), 12);
        assert_eq!(order[0], (0, 0));
        assert_eq!(order[4], (0, 1));
    }

    #[test]
    fn tiled_order_covers_every_pixel_exactly_once() {
        let sensor = Sensor::new(20, 17);
        let mut order = sensor.tiled_order();
        order.sort();
        let mut raster = sensor.raster_order();
        raster.sort();
        assert_eq!(order, raster);
    }

    #[test]
    fn center_pixel_maps_near_image_origin() {
        let sensor = Sensor::new(100, 100);
        let (u, v) = sensor.pixel_standard_image_location(49, 49, 0.5, 0.5);
        assert!(u.abs() < 0.05);
        assert!(v.abs() < 0.05);
    }

    #[test]
    fn top_row_maps_to_positive_v() {
        let sensor = Sensor::new(10, 10);
        let (_, v) = sensor.pixel_standard_image_location(5, 0, 0.5, 0.5);
        assert!(v > 0.0);
    }
}
