use std::fs::File;
use std::path::Path;

use byteorder::{BigEndian, LittleEndian};
use memmap2::Mmap;
use ndarray::Array2;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::error::{IngestError, Result};
use crate::io::envi_header::{ByteOrder, EnviHeader, Interleave};
use crate::raster::{RasterBuffer, SampleType};

/// Memory-mapped reader over an ENVI header/payload pair.
pub struct EnviReader {
    mmap: Mmap,
    pub header: EnviHeader,
}

impl EnviReader {
    /// Parse the header and map the payload, checking its size.
    pub fn open(header_path: &Path, payload_path: &Path) -> Result<Self> {
        let header = EnviHeader::open(header_path)?;
        let expected_data = header.data_byte_size().ok_or_else(|| {
            IngestError::MalformedHeader(format!(
                "{}x{}x{} raster overflows the addressable size",
                header.samples, header.lines, header.bands
            ))
        })?;
        let expected = header
            .header_offset
            .checked_add(expected_data)
            .ok_or_else(|| IngestError::MalformedHeader("header offset overflows".into()))?;

        let file = File::open(payload_path)?;
        let actual = file.metadata()?.len();
        if actual < expected {
            return Err(IngestError::TruncatedPayload { expected, actual });
        }
        if actual > expected {
            return Err(IngestError::MalformedHeader(format!(
                "payload holds {actual} bytes but the header describes {expected}"
            )));
        }

        let mmap = unsafe { Mmap::map(&file)? };
        debug!(
            path = %payload_path.display(),
            bytes = actual,
            "Mapped ENVI payload"
        );
        Ok(Self { mmap, header })
    }

    pub fn width(&self) -> usize {
        self.header.samples
    }

    pub fn height(&self) -> usize {
        self.header.lines
    }

    pub fn band_count(&self) -> usize {
        self.header.bands
    }

    /// Decode one band to `f32`, regardless of interleave.
    pub fn read_band(&self, band: usize) -> Result<Array2<f32>> {
        if band >= self.header.bands {
            return Err(IngestError::MalformedHeader(format!(
                "band {band} requested but the header declares {}",
                self.header.bands
            )));
        }
        let data = &self.mmap[self.header.header_offset as usize..];
        Ok(match self.header.byte_order {
            ByteOrder::LittleEndian => decode_band::<LittleEndian>(data, &self.header, band),
            ByteOrder::BigEndian => decode_band::<BigEndian>(data, &self.header, band),
        })
    }

    /// Decode every band into a raster carrying the header's georeference.
    ///
    /// A header without map info yields the identity geotransform and no CRS.
    pub fn read_raster(&self) -> Result<RasterBuffer> {
        let bands = (0..self.header.bands)
            .into_par_iter()
            .map(|b| self.read_band(b))
            .collect::<Result<Vec<_>>>()?;

        let geotransform = self.header.geotransform().unwrap_or_default();
        let crs = self.header.crs_id();
        if crs.is_none() && self.header.map_info.is_some() {
            warn!(
                projection = %self.header.map_info.as_ref().map_or("", |m| m.projection.as_str()),
                "Map info projection has no known CRS identifier"
            );
        }
        let nodata = self.header.data_ignore_value.map(|v| v as f32);
        RasterBuffer::new(bands, geotransform, crs, nodata, self.header.data_type)
    }
}

fn decode_band<E: byteorder::ByteOrder>(data: &[u8], header: &EnviHeader, band: usize) -> Array2<f32> {
    let (w, h, nb) = (header.samples, header.lines, header.bands);
    let size = header.data_type.size();
    let sample_index = |row: usize, col: usize| -> usize {
        match header.interleave {
            Interleave::Bsq => (band * h + row) * w + col,
            Interleave::Bil => (row * nb + band) * w + col,
            Interleave::Bip => (row * w + col) * nb + band,
        }
    };
    Array2::from_shape_fn((h, w), |(row, col)| {
        let offset = sample_index(row, col) * size;
        decode_sample::<E>(&data[offset..offset + size], header.data_type)
    })
}

fn decode_sample<E: byteorder::ByteOrder>(bytes: &[u8], sample_type: SampleType) -> f32 {
    match sample_type {
        SampleType::U8 => bytes[0] as f32,
        SampleType::I16 => E::read_i16(bytes) as f32,
        SampleType::U16 => E::read_u16(bytes) as f32,
        SampleType::I32 => E::read_i32(bytes) as f32,
        SampleType::U32 => E::read_u32(bytes) as f32,
        SampleType::F32 => E::read_f32(bytes),
        SampleType::F64 => E::read_f64(bytes) as f32,
        SampleType::I64 => E::read_i64(bytes) as f32,
        SampleType::U64 => E::read_u64(bytes) as f32,
    }
}
