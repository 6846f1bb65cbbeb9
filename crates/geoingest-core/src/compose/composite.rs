use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::consts::{DEFAULT_STRETCH_HIGH_PERCENTILE, DEFAULT_STRETCH_LOW_PERCENTILE};
use crate::error::{IngestError, Result};
use crate::geo::GeoTransform;
use crate::raster::RasterBuffer;
use crate::sensor::{CompositeBands, SensorProfile};

use super::stretch::{percentile_bounds, stretch_band, StretchParams};

/// Band composition settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompositeConfig {
    #[serde(default = "default_low")]
    pub stretch_low_percentile: f32,
    #[serde(default = "default_high")]
    pub stretch_high_percentile: f32,
    /// 1-based band numbers: three for RGB or one for grayscale.
    #[serde(default)]
    pub band_selection_override: Option<Vec<usize>>,
}

fn default_low() -> f32 {
    DEFAULT_STRETCH_LOW_PERCENTILE
}
fn default_high() -> f32 {
    DEFAULT_STRETCH_HIGH_PERCENTILE
}

impl Default for CompositeConfig {
    fn default() -> Self {
        Self {
            stretch_low_percentile: default_low(),
            stretch_high_percentile: default_high(),
            band_selection_override: None,
        }
    }
}

impl CompositeConfig {
    /// Resolve the band override against a capture, as 0-based indices.
    pub fn override_bands(&self, band_count: usize) -> Result<Option<CompositeBands>> {
        let Some(bands) = &self.band_selection_override else {
            return Ok(None);
        };
        if let Some(&bad) = bands.iter().find(|&&b| b == 0 || b > band_count) {
            return Err(IngestError::InvalidConfig(format!(
                "band override {bad} is outside 1..={band_count}"
            )));
        }
        match bands.as_slice() {
            &[g] => Ok(Some(CompositeBands::Gray(g - 1))),
            &[r, g, b] => Ok(Some(CompositeBands::Rgb([r - 1, g - 1, b - 1]))),
            other => Err(IngestError::InvalidConfig(format!(
                "band override needs 1 or 3 bands, got {}",
                other.len()
            ))),
        }
    }
}

/// Byte-depth display composite: one (gray) or three (RGB) channels plus a
/// validity mask, on the grid of the raster it was built from.
#[derive(Clone, Debug)]
pub struct Composite {
    pub channels: Vec<Array2<u8>>,
    pub mask: Array2<bool>,
    pub geotransform: GeoTransform,
    pub crs: Option<String>,
    pub stretches: Vec<StretchParams>,
    /// 0-based source band per channel.
    pub bands: Vec<usize>,
}

impl Composite {
    pub fn width(&self) -> usize {
        self.mask.ncols()
    }

    pub fn height(&self) -> usize {
        self.mask.nrows()
    }

    pub fn is_rgb(&self) -> bool {
        self.channels.len() == 3
    }

    pub fn has_valid_pixel(&self) -> bool {
        self.mask.iter().any(|&v| v)
    }
}

/// Select the display bands and stretch each to bytes.
///
/// A pixel is valid only where every selected band holds data.
pub fn compose(buffer: &RasterBuffer, profile: &SensorProfile, config: &CompositeConfig) -> Result<Composite> {
    let selection = match config.override_bands(buffer.band_count())? {
        Some(bands) => bands,
        None => profile.composite,
    };
    let indices = selection.indices();
    if let Some(&bad) = indices.iter().find(|&&b| b >= buffer.band_count()) {
        return Err(IngestError::InvalidConfig(format!(
            "composite band {} does not exist in a {}-band raster",
            bad + 1,
            buffer.band_count()
        )));
    }

    let mut mask = Array2::from_elem((buffer.height(), buffer.width()), true);
    for &b in &indices {
        Zip::from(&mut mask)
            .and(buffer.band(b))
            .for_each(|m, &v| *m = *m && !buffer.is_nodata(v));
    }

    let mut channels = Vec::with_capacity(indices.len());
    let mut stretches = Vec::with_capacity(indices.len());
    for &b in &indices {
        let band = buffer.band(b);
        let params = percentile_bounds(
            band,
            &mask,
            config.stretch_low_percentile,
            config.stretch_high_percentile,
        )
        .unwrap_or_else(|| {
            warn!(band = b + 1, "Band has no valid pixels, stretch is empty");
            StretchParams { low: 0.0, high: 0.0 }
        });
        channels.push(stretch_band(band, &mask, params));
        stretches.push(params);
    }

    info!(
        bands = ?indices.iter().map(|b| b + 1).collect::<Vec<_>>(),
        stretch = ?stretches,
        "Composed display bands"
    );
    Ok(Composite {
        channels,
        mask,
        geotransform: buffer.geotransform,
        crs: buffer.crs.clone(),
        stretches,
        bands: indices,
    })
}
