use serde::{Deserialize, Serialize};

use crate::consts::EPSILON;

/// Affine pixel-to-world mapping in GDAL coefficient order.
///
/// World `x = origin_x + col * pixel_width + row * row_rotation` and
/// `y = origin_y + col * col_rotation + row * pixel_height`, where `(col, row)`
/// are continuous pixel coordinates with `(0, 0)` at the outer corner of the
/// first pixel.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub pixel_width: f64,
    pub row_rotation: f64,
    pub origin_y: f64,
    pub col_rotation: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// An axis-aligned transform. `pixel_height` is negative for north-up grids.
    pub fn north_up(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            pixel_width,
            row_rotation: 0.0,
            origin_y,
            col_rotation: 0.0,
            pixel_height,
        }
    }

    pub fn from_coefficients(c: [f64; 6]) -> Self {
        Self {
            origin_x: c[0],
            pixel_width: c[1],
            row_rotation: c[2],
            origin_y: c[3],
            col_rotation: c[4],
            pixel_height: c[5],
        }
    }

    pub fn coefficients(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            self.row_rotation,
            self.origin_y,
            self.col_rotation,
            self.pixel_height,
        ]
    }

    /// Map continuous pixel coordinates to world coordinates.
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width + row * self.row_rotation,
            self.origin_y + col * self.col_rotation + row * self.pixel_height,
        )
    }

    /// Inverse transform (world to pixel), or `None` for a singular matrix.
    pub fn invert(&self) -> Option<GeoTransform> {
        let det = self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation;
        if det.abs() < EPSILON * EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;
        Some(GeoTransform {
            origin_x: (self.row_rotation * self.origin_y - self.origin_x * self.pixel_height)
                * inv_det,
            pixel_width: self.pixel_height * inv_det,
            row_rotation: -self.row_rotation * inv_det,
            origin_y: (self.origin_x * self.col_rotation - self.pixel_width * self.origin_y)
                * inv_det,
            col_rotation: -self.col_rotation * inv_det,
            pixel_height: self.pixel_width * inv_det,
        })
    }

    pub fn is_north_up(&self) -> bool {
        self.row_rotation == 0.0 && self.col_rotation == 0.0
    }

    /// Ground distance covered by one pixel step along columns and rows,
    /// in CRS units.
    pub fn pixel_size(&self) -> (f64, f64) {
        (
            self.pixel_width.hypot(self.col_rotation),
            self.row_rotation.hypot(self.pixel_height),
        )
    }

    /// Axis-aligned world bounds `(minx, miny, maxx, maxy)` of a `width x height` grid.
    pub fn bounds(&self, width: usize, height: usize) -> (f64, f64, f64, f64) {
        let corners = [
            self.apply(0.0, 0.0),
            self.apply(width as f64, 0.0),
            self.apply(width as f64, height as f64),
            self.apply(0.0, height as f64),
        ];
        corners.iter().fold(
            (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            |(minx, miny, maxx, maxy), &(x, y)| (minx.min(x), miny.min(y), maxx.max(x), maxy.max(y)),
        )
    }
}

impl Default for GeoTransform {
    /// Identity pixel grid (GDAL's default when no georeference exists).
    fn default() -> Self {
        Self::north_up(0.0, 0.0, 1.0, 1.0)
    }
}
