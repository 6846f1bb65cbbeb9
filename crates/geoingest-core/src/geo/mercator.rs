//! Spherical web mercator (EPSG:3857) and the XYZ tile grid laid over it.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use crate::consts::{EARTH_RADIUS_M, MAX_MERCATOR_LATITUDE};

/// Half the width of the mercator square, metres (20_037_508.34...).
pub const ORIGIN_SHIFT: f64 = PI * EARTH_RADIUS_M;

/// Project longitude/latitude degrees to web mercator metres.
///
/// Latitude is clamped to the mercator square.
pub fn lon_lat_to_mercator(lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(-MAX_MERCATOR_LATITUDE, MAX_MERCATOR_LATITUDE);
    let x = EARTH_RADIUS_M * lon.to_radians();
    let y = EARTH_RADIUS_M * (FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
    (x, y)
}

/// Web mercator metres to longitude/latitude degrees.
pub fn mercator_to_lon_lat(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / EARTH_RADIUS_M).to_degrees();
    let lat = (2.0 * (y / EARTH_RADIUS_M).exp().atan() - FRAC_PI_2).to_degrees();
    (lon, lat)
}

/// Ground resolution (metres per pixel at the equator) of a zoom level.
pub fn resolution(zoom: u8, tile_size: u32) -> f64 {
    2.0 * ORIGIN_SHIFT / (tile_size as f64 * tiles_per_axis(zoom) as f64)
}

/// Number of tiles along one axis at `zoom`.
pub fn tiles_per_axis(zoom: u8) -> u32 {
    1u32 << zoom
}

/// Bounding box in web mercator metres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub minx: f64,
    pub miny: f64,
    pub maxx: f64,
    pub maxy: f64,
}

impl BoundingBox {
    pub fn new(minx: f64, miny: f64, maxx: f64, maxy: f64) -> Self {
        Self { minx, miny, maxx, maxy }
    }

    /// Extent of XYZ tile `(x, y)` at zoom `z` (row 0 at the north edge).
    pub fn from_xyz(z: u8, x: u32, y: u32) -> Self {
        let span = 2.0 * ORIGIN_SHIFT / tiles_per_axis(z) as f64;
        let minx = -ORIGIN_SHIFT + x as f64 * span;
        let maxy = ORIGIN_SHIFT - y as f64 * span;
        Self {
            minx,
            miny: maxy - span,
            maxx: minx + span,
            maxy,
        }
    }

    pub fn contains(&self, other: &BoundingBox) -> bool {
        self.minx <= other.minx
            && self.miny <= other.miny
            && self.maxx >= other.maxx
            && self.maxy >= other.maxy
    }

    pub fn width(&self) -> f64 {
        self.maxx - self.minx
    }

    pub fn height(&self) -> f64 {
        self.maxy - self.miny
    }
}

/// Inclusive range of tile columns and rows intersecting a box at one zoom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    pub zoom: u8,
    pub min_x: u32,
    pub max_x: u32,
    pub min_y: u32,
    pub max_y: u32,
}

impl TileRange {
    /// Tiles touched by `bbox` at `zoom`. Edges that fall exactly on a tile
    /// boundary do not pull in the neighbouring tile.
    pub fn covering(bbox: &BoundingBox, zoom: u8) -> Self {
        let n = tiles_per_axis(zoom);
        let last = (n - 1) as f64;
        let scale = n as f64 / (2.0 * ORIGIN_SHIFT);
        let fx0 = (bbox.minx + ORIGIN_SHIFT) * scale;
        let fx1 = (bbox.maxx + ORIGIN_SHIFT) * scale;
        let fy0 = (ORIGIN_SHIFT - bbox.maxy) * scale;
        let fy1 = (ORIGIN_SHIFT - bbox.miny) * scale;

        let lo = |f: f64| f.floor().clamp(0.0, last) as u32;
        let hi = |f0: f64, f1: f64| (f1.ceil() - 1.0).max(f0.floor()).clamp(0.0, last) as u32;
        Self {
            zoom,
            min_x: lo(fx0),
            max_x: hi(fx0, fx1),
            min_y: lo(fy0),
            max_y: hi(fy0, fy1),
        }
    }

    pub fn is_single_tile(&self) -> bool {
        self.min_x == self.max_x && self.min_y == self.max_y
    }

    pub fn tile_count(&self) -> usize {
        (self.max_x - self.min_x + 1) as usize * (self.max_y - self.min_y + 1) as usize
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (self.min_y..=self.max_y).flat_map(move |y| (self.min_x..=self.max_x).map(move |x| (x, y)))
    }
}
