use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{IngestError, Result};
use crate::geo::GeoTransform;

/// Numeric type of the samples in the source payload.
///
/// Samples are always held in memory as `f32`; this records what they were
/// decoded from so metadata can report the native depth.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleType {
    U8,
    I16,
    I32,
    F32,
    F64,
    U16,
    U32,
    I64,
    U64,
}

impl SampleType {
    /// Map an ENVI `data type` code to a sample type.
    pub fn from_envi_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Self::U8),
            2 => Some(Self::I16),
            3 => Some(Self::I32),
            4 => Some(Self::F32),
            5 => Some(Self::F64),
            12 => Some(Self::U16),
            13 => Some(Self::U32),
            14 => Some(Self::I64),
            15 => Some(Self::U64),
            _ => None,
        }
    }

    pub fn envi_code(&self) -> u32 {
        match self {
            Self::U8 => 1,
            Self::I16 => 2,
            Self::I32 => 3,
            Self::F32 => 4,
            Self::F64 => 5,
            Self::U16 => 12,
            Self::U32 => 13,
            Self::I64 => 14,
            Self::U64 => 15,
        }
    }

    /// Bytes per sample.
    pub fn size(&self) -> usize {
        match self {
            Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::F64 | Self::I64 | Self::U64 => 8,
        }
    }
}

/// Multi-band raster owned by one ingestion.
///
/// All bands share the same dimensions and geotransform; the constructor
/// rejects anything else. NaN samples are always nodata, in addition to the
/// optional sentinel.
#[derive(Clone, Debug)]
pub struct RasterBuffer {
    bands: Vec<Array2<f32>>,
    pub geotransform: GeoTransform,
    /// CRS identifier (`EPSG:n` or a PROJ string); `None` when the capture
    /// carries no georeference.
    pub crs: Option<String>,
    pub nodata: Option<f32>,
    pub sample_type: SampleType,
}

impl RasterBuffer {
    pub fn new(
        bands: Vec<Array2<f32>>,
        geotransform: GeoTransform,
        crs: Option<String>,
        nodata: Option<f32>,
        sample_type: SampleType,
    ) -> Result<Self> {
        let Some(first) = bands.first() else {
            return Err(IngestError::MalformedHeader(
                "raster must contain at least one band".into(),
            ));
        };
        let dim = first.dim();
        if dim.0 == 0 || dim.1 == 0 {
            return Err(IngestError::MalformedHeader(format!(
                "invalid raster dimensions: {}x{}",
                dim.1, dim.0
            )));
        }
        if let Some((i, band)) = bands.iter().enumerate().find(|(_, b)| b.dim() != dim) {
            return Err(IngestError::MalformedHeader(format!(
                "band {} is {}x{}, expected {}x{}",
                i + 1,
                band.ncols(),
                band.nrows(),
                dim.1,
                dim.0
            )));
        }
        Ok(Self {
            bands,
            geotransform,
            crs,
            nodata,
            sample_type,
        })
    }

    pub fn width(&self) -> usize {
        self.bands[0].ncols()
    }

    pub fn height(&self) -> usize {
        self.bands[0].nrows()
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    pub fn band(&self, index: usize) -> &Array2<f32> {
        &self.bands[index]
    }

    pub fn bands(&self) -> &[Array2<f32>] {
        &self.bands
    }

    /// Whether a sample value is nodata for this raster.
    pub fn is_nodata(&self, value: f32) -> bool {
        value.is_nan() || self.nodata.is_some_and(|nd| value == nd)
    }

    /// Per-pixel validity: a pixel is valid when at least one band holds data.
    pub fn valid_mask(&self) -> Array2<bool> {
        let mut mask = Array2::from_elem((self.height(), self.width()), false);
        for band in &self.bands {
            ndarray::Zip::from(&mut mask)
                .and(band)
                .for_each(|m, &v| *m = *m || !self.is_nodata(v));
        }
        mask
    }

    pub fn has_valid_pixel(&self) -> bool {
        self.bands
            .iter()
            .any(|band| band.iter().any(|&v| !self.is_nodata(v)))
    }
}
