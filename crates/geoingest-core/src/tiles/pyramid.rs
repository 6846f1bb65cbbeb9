use std::path::{Path, PathBuf};

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::consts::{MAX_ZOOM_LEVEL, MIN_TILE_SIZE, OPAQUE};
use crate::error::{IngestError, Result};
use crate::geo::mercator::resolution;
use crate::geo::{BoundingBox, TileRange};

/// XYZ tile address (row 0 at the north edge).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    pub fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// The tile one level coarser that contains this one.
    pub fn parent(&self) -> Option<TileCoord> {
        (self.z > 0).then(|| TileCoord::new(self.z - 1, self.x / 2, self.y / 2))
    }

    /// The four tiles one level finer, in (NW, NE, SW, SE) order.
    pub fn children(&self) -> [TileCoord; 4] {
        let (z, x, y) = (self.z + 1, self.x * 2, self.y * 2);
        [
            TileCoord::new(z, x, y),
            TileCoord::new(z, x + 1, y),
            TileCoord::new(z, x, y + 1),
            TileCoord::new(z, x + 1, y + 1),
        ]
    }

    /// `{root}/{z}/{x}/{y}.png`
    pub fn path(&self, root: &Path) -> PathBuf {
        root.join(self.z.to_string())
            .join(self.x.to_string())
            .join(format!("{}.png", self.y))
    }

    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::from_xyz(self.z, self.x, self.y)
    }
}

impl std::fmt::Display for TileCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Pixels of one square tile: one or three colour channels plus alpha
/// (255 valid, 0 nodata).
#[derive(Clone, Debug, PartialEq)]
pub struct TileImage {
    pub channels: Vec<Array2<u8>>,
    pub alpha: Array2<u8>,
}

impl TileImage {
    pub fn empty(size: usize, channel_count: usize) -> Self {
        Self {
            channels: vec![Array2::zeros((size, size)); channel_count],
            alpha: Array2::zeros((size, size)),
        }
    }

    pub fn size(&self) -> usize {
        self.alpha.nrows()
    }

    pub fn is_valid(&self, row: usize, col: usize) -> bool {
        self.alpha[[row, col]] == OPAQUE
    }

    pub fn has_valid_pixel(&self) -> bool {
        self.alpha.iter().any(|&a| a == OPAQUE)
    }
}

/// Tiles written for one zoom level, sorted by coordinate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PyramidLevel {
    pub zoom: u8,
    pub tiles: Vec<TileCoord>,
}

/// A generated tile pyramid, coarsest level first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TilePyramid {
    pub tile_size: u32,
    pub root: PathBuf,
    pub levels: Vec<PyramidLevel>,
}

impl TilePyramid {
    pub fn min_zoom(&self) -> Option<u8> {
        self.levels.first().map(|l| l.zoom)
    }

    pub fn max_zoom(&self) -> Option<u8> {
        self.levels.last().map(|l| l.zoom)
    }

    pub fn level(&self, zoom: u8) -> Option<&PyramidLevel> {
        self.levels.iter().find(|l| l.zoom == zoom)
    }

    pub fn tile_count(&self) -> usize {
        self.levels.iter().map(|l| l.tiles.len()).sum()
    }

    /// Rebase every path on a new root, used once staged output is committed.
    pub fn relocate(&mut self, root: PathBuf) {
        self.root = root;
    }
}

pub fn validate_tile_size(tile_size: u32) -> Result<()> {
    if tile_size < MIN_TILE_SIZE || !tile_size.is_power_of_two() {
        return Err(IngestError::InvalidConfig(format!(
            "tile size must be a power of two >= {MIN_TILE_SIZE}, got {tile_size}"
        )));
    }
    Ok(())
}

/// Finest zoom whose pixel size is not finer than the ground sample distance.
pub fn native_zoom(ground_sample_distance: f64, tile_size: u32) -> u8 {
    (0..=MAX_ZOOM_LEVEL)
        .take_while(|&z| resolution(z, tile_size) >= ground_sample_distance)
        .last()
        .unwrap_or(0)
}

/// Finest zoom at or below `max_zoom` whose grid covers `bbox` with one tile.
pub fn single_tile_zoom(bbox: &BoundingBox, max_zoom: u8) -> u8 {
    (0..=max_zoom)
        .rev()
        .find(|&z| TileRange::covering(bbox, z).is_single_tile())
        .unwrap_or(0)
}

/// Zoom range for a raster, honouring optional overrides.
pub fn zoom_range(
    bbox: &BoundingBox,
    ground_sample_distance: f64,
    tile_size: u32,
    min_override: Option<u8>,
    max_override: Option<u8>,
) -> Result<(u8, u8)> {
    let max_zoom = match max_override {
        Some(z) if z > MAX_ZOOM_LEVEL => {
            return Err(IngestError::InvalidConfig(format!(
                "max zoom {z} exceeds {MAX_ZOOM_LEVEL}"
            )))
        }
        Some(z) => z,
        None => native_zoom(ground_sample_distance, tile_size),
    };
    let min_zoom = match min_override {
        Some(z) if z > max_zoom => {
            return Err(IngestError::InvalidConfig(format!(
                "min zoom {z} is greater than max zoom {max_zoom}"
            )))
        }
        Some(z) => z,
        None => single_tile_zoom(bbox, max_zoom),
    };
    Ok((min_zoom, max_zoom))
}
