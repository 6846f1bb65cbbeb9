use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::compose::CompositeConfig;
use crate::consts::{DEFAULT_THUMBNAIL_SIZE, DEFAULT_TILE_SIZE, MAX_ZOOM_LEVEL};
use crate::error::{IngestError, Result};
use crate::tiles::pyramid::validate_tile_size;
use crate::warp::ResamplingMethod;

/// Settings for one ingestion. Every field has a default, so a TOML file
/// only needs the values it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IngestConfig {
    #[serde(flatten)]
    pub composite: CompositeConfig,
    #[serde(default)]
    pub resampling_method: ResamplingMethod,
    #[serde(default = "default_tile_size")]
    pub tile_size: u32,
    #[serde(default)]
    pub min_zoom: Option<u8>,
    #[serde(default)]
    pub max_zoom: Option<u8>,
    /// Tile worker threads; 0 uses the global rayon pool.
    #[serde(default)]
    pub max_workers: usize,
    /// Per-capture output directories are created under this root.
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,
    #[serde(default = "default_true")]
    pub write_thumbnail: bool,
    #[serde(default = "default_thumbnail_size")]
    pub thumbnail_size: u32,
}

fn default_tile_size() -> u32 {
    DEFAULT_TILE_SIZE
}
fn default_output_root() -> PathBuf {
    PathBuf::from("output")
}
fn default_true() -> bool {
    true
}
fn default_thumbnail_size() -> u32 {
    DEFAULT_THUMBNAIL_SIZE
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            composite: CompositeConfig::default(),
            resampling_method: ResamplingMethod::default(),
            tile_size: default_tile_size(),
            min_zoom: None,
            max_zoom: None,
            max_workers: 0,
            output_root: default_output_root(),
            write_thumbnail: default_true(),
            thumbnail_size: default_thumbnail_size(),
        }
    }
}

impl IngestConfig {
    /// Reject settings no capture could satisfy. Band overrides are checked
    /// against the capture once its band count is known.
    pub fn validate(&self) -> Result<()> {
        let (low, high) = (
            self.composite.stretch_low_percentile,
            self.composite.stretch_high_percentile,
        );
        if !(0.0..=100.0).contains(&low) || !(0.0..=100.0).contains(&high) || low >= high {
            return Err(IngestError::InvalidConfig(format!(
                "stretch percentiles must satisfy 0 <= low < high <= 100, got {low}/{high}"
            )));
        }
        if let Some(bands) = &self.composite.band_selection_override {
            if !matches!(bands.len(), 1 | 3) {
                return Err(IngestError::InvalidConfig(format!(
                    "band override needs 1 or 3 bands, got {}",
                    bands.len()
                )));
            }
            if bands.contains(&0) {
                return Err(IngestError::InvalidConfig(
                    "band override numbers are 1-based".into(),
                ));
            }
        }
        validate_tile_size(self.tile_size)?;
        for zoom in [self.min_zoom, self.max_zoom].into_iter().flatten() {
            if zoom > MAX_ZOOM_LEVEL {
                return Err(IngestError::InvalidConfig(format!(
                    "zoom {zoom} exceeds {MAX_ZOOM_LEVEL}"
                )));
            }
        }
        if let (Some(min), Some(max)) = (self.min_zoom, self.max_zoom) {
            if min > max {
                return Err(IngestError::InvalidConfig(format!(
                    "min zoom {min} is greater than max zoom {max}"
                )));
            }
        }
        if self.write_thumbnail && self.thumbnail_size == 0 {
            return Err(IngestError::InvalidConfig("thumbnail size must be positive".into()));
        }
        Ok(())
    }
}
