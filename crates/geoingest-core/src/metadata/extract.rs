use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::raster::{RasterBuffer, SampleType};
use crate::sensor::{SensorKind, SensorProfile};

use super::footprint::valid_data_footprint;

/// Spatial and spectral description of one ingested capture, handed to the
/// record store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IngestionMetadata {
    pub name: String,
    pub source_files: Vec<String>,
    pub sensor: SensorKind,
    /// CRS the capture was delivered in.
    pub source_crs: Option<String>,
    /// CRS of the delivered raster and tiles.
    pub crs: String,
    /// Closed counter-clockwise `[lon, lat]` ring of the valid data.
    pub footprint: Vec<[f64; 2]>,
    pub centroid: Option<[f64; 2]>,
    /// `[min_lon, min_lat, max_lon, max_lat]`.
    pub bounds: Option<[f64; 4]>,
    /// Pixel size in CRS units.
    pub pixel_size: f64,
    /// Approximate ground sample distance in metres at the centroid.
    pub ground_resolution: f64,
    pub width: usize,
    pub height: usize,
    pub band_count: usize,
    /// Band centre wavelengths, nanometres (empty when unknown).
    pub wavelengths_nm: Vec<f64>,
    pub band_descriptions: Vec<String>,
    /// 1-based bands used for the display composite.
    pub composite_bands: Vec<usize>,
    pub acquisition_date: Option<NaiveDate>,
    pub data_type: SampleType,
    pub nodata: Option<f32>,
    pub rpc_corrected: bool,
}

impl IngestionMetadata {
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn read_json(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }
}

/// Facts about the capture that the raster itself does not carry.
#[derive(Clone, Debug, Default)]
pub struct CaptureFacts {
    pub name: String,
    pub source_files: Vec<String>,
    pub source_crs: Option<String>,
    pub rpc_corrected: bool,
}

/// Describe a reprojected, corrected raster.
pub fn extract_metadata(
    buffer: &RasterBuffer,
    profile: &SensorProfile,
    facts: &CaptureFacts,
) -> IngestionMetadata {
    let footprint = valid_data_footprint(buffer);
    let (px, py) = buffer.geotransform.pixel_size();
    let pixel_size = (px + py) / 2.0;
    // Mercator metres shrink by cos(latitude) on the ground.
    let ground_resolution = match footprint.centroid {
        Some([_, lat]) if buffer.crs.as_deref() == Some(crate::consts::WEB_MERCATOR_CRS) => {
            pixel_size * lat.to_radians().cos()
        }
        _ => pixel_size,
    };

    let metadata = IngestionMetadata {
        name: facts.name.clone(),
        source_files: facts.source_files.clone(),
        sensor: profile.kind,
        source_crs: facts.source_crs.clone(),
        crs: buffer.crs.clone().unwrap_or_default(),
        bounds: footprint.bounds(),
        centroid: footprint.centroid,
        footprint: footprint.ring,
        pixel_size,
        ground_resolution,
        width: buffer.width(),
        height: buffer.height(),
        band_count: buffer.band_count(),
        wavelengths_nm: profile.wavelengths.clone(),
        band_descriptions: profile.band_descriptions(buffer.band_count()),
        composite_bands: profile.composite.indices().iter().map(|b| b + 1).collect(),
        acquisition_date: acquisition_date(&facts.name),
        data_type: buffer.sample_type,
        nodata: buffer.nodata,
        rpc_corrected: facts.rpc_corrected,
    };
    info!(
        name = %metadata.name,
        sensor = metadata.sensor.code(),
        vertices = metadata.footprint.len(),
        ground_resolution = metadata.ground_resolution,
        "Extracted metadata"
    );
    metadata
}

/// Date from the first `YYYYMMDD`-prefixed segment of a product name, e.g.
/// `GF5_AHSI_E116.5_N40.1_20190601_005805` or `S2A_MSIL1C_20210101T103421`.
pub fn acquisition_date(name: &str) -> Option<NaiveDate> {
    name.split(['_', '-', '.'])
        .filter(|seg| seg.len() >= 8 && seg.as_bytes()[..8].iter().all(u8::is_ascii_digit))
        .find_map(|seg| NaiveDate::parse_from_str(&seg[..8], "%Y%m%d").ok())
}
