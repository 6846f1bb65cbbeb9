//! ENVI `.hdr` descriptor parsing.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::warn;

use crate::error::{IngestError, Result};
use crate::geo::GeoTransform;
use crate::io::rpc::RpcModel;
use crate::raster::SampleType;

const ENVI_MAGIC: &str = "ENVI";

/// Sample layout of the binary payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Interleave {
    /// Band sequential: every band is a contiguous image.
    Bsq,
    /// Band interleaved by line: each row holds one line of every band.
    Bil,
    /// Band interleaved by pixel: each pixel holds all its bands.
    Bip,
}

impl Interleave {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "bsq" => Some(Self::Bsq),
            "bil" => Some(Self::Bil),
            "bip" => Some(Self::Bip),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ByteOrder {
    LittleEndian,
    BigEndian,
}

/// Parsed `map info` block.
#[derive(Clone, Debug, PartialEq)]
pub struct MapInfo {
    pub projection: String,
    /// 1-based reference pixel the tie point refers to.
    pub reference_pixel: (f64, f64),
    pub tie_point: (f64, f64),
    pub pixel_size: (f64, f64),
    pub utm_zone: Option<(u32, bool)>,
    pub datum: Option<String>,
    pub units: Option<String>,
    /// Counter-clockwise grid rotation, degrees.
    pub rotation: f64,
}

impl MapInfo {
    fn parse(value: &str) -> Result<Self> {
        let parts: Vec<&str> = value.split(',').map(str::trim).collect();
        if parts.len() < 7 {
            return Err(IngestError::MalformedHeader(format!(
                "map info has {} fields, expected at least 7",
                parts.len()
            )));
        }
        let num = |i: usize| -> Result<f64> {
            parts[i].parse::<f64>().map_err(|_| {
                IngestError::MalformedHeader(format!("map info field {} is not numeric: '{}'", i + 1, parts[i]))
            })
        };
        let projection = parts[0].to_string();
        let reference_pixel = (num(1)?, num(2)?);
        let tie_point = (num(3)?, num(4)?);
        let pixel_size = (num(5)?, num(6)?);

        let mut rest = &parts[7..];
        let mut utm_zone = None;
        if projection.eq_ignore_ascii_case("UTM") && rest.len() >= 2 {
            let zone = rest[0].parse::<u32>().map_err(|_| {
                IngestError::MalformedHeader(format!("invalid UTM zone '{}'", rest[0]))
            })?;
            let north = !rest[1].eq_ignore_ascii_case("south");
            utm_zone = Some((zone, north));
            rest = &rest[2..];
        }

        let mut datum = None;
        let mut units = None;
        let mut rotation = 0.0;
        for token in rest {
            match token.split_once('=') {
                Some((k, v)) if k.trim().eq_ignore_ascii_case("units") => {
                    units = Some(v.trim().to_string())
                }
                Some((k, v)) if k.trim().eq_ignore_ascii_case("rotation") => {
                    rotation = v.trim().parse().map_err(|_| {
                        IngestError::MalformedHeader(format!("map info rotation is not numeric: '{}'", v.trim()))
                    })?
                }
                Some(_) => {}
                None if datum.is_none() && !token.is_empty() => datum = Some(token.to_string()),
                None => {}
            }
        }

        Ok(Self {
            projection,
            reference_pixel,
            tie_point,
            pixel_size,
            utm_zone,
            datum,
            units,
            rotation,
        })
    }

    /// Affine transform implied by the tie point, pixel size and rotation.
    pub fn geotransform(&self) -> GeoTransform {
        let (sin, cos) = self.rotation.to_radians().sin_cos();
        let (px, py) = self.pixel_size;
        let pixel_width = cos * px;
        let row_rotation = sin * py;
        let col_rotation = sin * px;
        let pixel_height = -cos * py;
        let (ref_col, ref_row) = (self.reference_pixel.0 - 1.0, self.reference_pixel.1 - 1.0);
        GeoTransform {
            origin_x: self.tie_point.0 - ref_col * pixel_width - ref_row * row_rotation,
            pixel_width,
            row_rotation,
            origin_y: self.tie_point.1 - ref_col * col_rotation - ref_row * pixel_height,
            col_rotation,
            pixel_height,
        }
    }

    /// CRS identifier for the well-known projection names.
    pub fn crs_id(&self) -> Option<String> {
        let wgs84 = self
            .datum
            .as_deref()
            .map_or(true, |d| d.replace(['-', ' '], "").eq_ignore_ascii_case("WGS84"));
        let name = self.projection.to_ascii_lowercase();
        if name.starts_with("geographic") && wgs84 {
            return Some("EPSG:4326".into());
        }
        match self.utm_zone {
            Some((zone, north)) if wgs84 && (1..=60).contains(&zone) => {
                let base = if north { 32600 } else { 32700 };
                Some(format!("EPSG:{}", base + zone))
            }
            _ => None,
        }
    }
}

/// A parsed ENVI header.
#[derive(Clone, Debug)]
pub struct EnviHeader {
    pub samples: usize,
    pub lines: usize,
    pub bands: usize,
    pub header_offset: u64,
    pub data_type: SampleType,
    pub interleave: Interleave,
    pub byte_order: ByteOrder,
    pub data_ignore_value: Option<f64>,
    pub map_info: Option<MapInfo>,
    pub coordinate_system: Option<String>,
    /// Band centre wavelengths in nanometres (empty when absent).
    pub wavelengths: Vec<f64>,
    pub band_names: Vec<String>,
    pub sensor_type: Option<String>,
    pub rpc: Option<RpcModel>,
    /// Every raw `key = value` pair, keys lower-cased.
    pub fields: BTreeMap<String, String>,
}

impl EnviHeader {
    pub fn open(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let fields = parse_fields(text)?;

        let dimension = |key: &str| -> Result<usize> {
            let value = fields
                .get(key)
                .ok_or_else(|| IngestError::MalformedHeader(format!("missing required field '{key}'")))?;
            match value.trim().parse::<usize>() {
                Ok(n) if n > 0 => Ok(n),
                _ => Err(IngestError::MalformedHeader(format!(
                    "field '{key}' must be a positive integer, got '{value}'"
                ))),
            }
        };
        let samples = dimension("samples")?;
        let lines = dimension("lines")?;
        let bands = dimension("bands")?;

        let data_type = fields
            .get("data type")
            .ok_or_else(|| IngestError::MalformedHeader("missing required field 'data type'".into()))
            .and_then(|v| {
                v.trim()
                    .parse::<u32>()
                    .ok()
                    .and_then(SampleType::from_envi_code)
                    .ok_or_else(|| IngestError::MalformedHeader(format!("unsupported data type '{v}'")))
            })?;

        let interleave = match fields.get("interleave") {
            Some(v) => Interleave::parse(v)
                .ok_or_else(|| IngestError::MalformedHeader(format!("unknown interleave '{v}'")))?,
            None => {
                warn!("Header has no interleave field, assuming bsq");
                Interleave::Bsq
            }
        };

        let header_offset = match fields.get("header offset") {
            Some(v) => v.trim().parse::<u64>().map_err(|_| {
                IngestError::MalformedHeader(format!("invalid header offset '{v}'"))
            })?,
            None => 0,
        };

        let byte_order = match fields.get("byte order").map(|v| v.trim()) {
            None | Some("0") => ByteOrder::LittleEndian,
            Some("1") => ByteOrder::BigEndian,
            Some(v) => {
                return Err(IngestError::MalformedHeader(format!("invalid byte order '{v}'")))
            }
        };

        let data_ignore_value = fields
            .get("data ignore value")
            .and_then(|v| v.trim().parse::<f64>().ok());

        let map_info = fields.get("map info").map(|v| MapInfo::parse(v)).transpose()?;

        let coordinate_system = fields
            .get("coordinate system string")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let wavelengths = parse_wavelengths(&fields, bands);
        let band_names = fields
            .get("band names")
            .map(|v| split_list(v).map(str::to_string).collect())
            .unwrap_or_default();

        let sensor_type = fields
            .get("sensor type")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("unknown"));

        let rpc = fields
            .get("rpc info")
            .map(|v| {
                let values: Vec<f64> = split_list(v).filter_map(|t| t.parse().ok()).collect();
                RpcModel::from_envi_values(&values)
            })
            .transpose()?;

        Ok(Self {
            samples,
            lines,
            bands,
            header_offset,
            data_type,
            interleave,
            byte_order,
            data_ignore_value,
            map_info,
            coordinate_system,
            wavelengths,
            band_names,
            sensor_type,
            rpc,
            fields,
        })
    }

    /// Bytes per band-plane.
    pub fn band_byte_size(&self) -> Option<u64> {
        (self.samples as u64)
            .checked_mul(self.lines as u64)?
            .checked_mul(self.data_type.size() as u64)
    }

    /// Payload bytes described by the header, excluding the header offset.
    pub fn data_byte_size(&self) -> Option<u64> {
        self.band_byte_size()?.checked_mul(self.bands as u64)
    }

    /// CRS identifier: the coordinate system string wins over map info.
    pub fn crs_id(&self) -> Option<String> {
        self.coordinate_system
            .as_deref()
            .and_then(crs_from_coordinate_system)
            .or_else(|| self.map_info.as_ref().and_then(MapInfo::crs_id))
    }

    pub fn geotransform(&self) -> Option<GeoTransform> {
        self.map_info.as_ref().map(MapInfo::geotransform)
    }
}

/// Extract a CRS identifier from a `coordinate system string` value.
///
/// PROJ strings pass through; WKT yields its outermost EPSG authority.
fn crs_from_coordinate_system(value: &str) -> Option<String> {
    let value = value.trim();
    if value.starts_with("+proj=") {
        return Some(value.to_string());
    }
    if let Some(code) = value.strip_prefix("EPSG:") {
        return Some(format!("EPSG:{}", code.trim()));
    }
    // The CRS's own authority is the last one in WKT1.
    let idx = value.rfind("AUTHORITY[")?;
    let tail = &value[idx + "AUTHORITY[".len()..];
    let mut quoted = tail.split('"').skip(1).step_by(2);
    let (authority, code) = (quoted.next()?, quoted.next()?);
    authority
        .eq_ignore_ascii_case("EPSG")
        .then(|| format!("EPSG:{code}"))
}

fn parse_wavelengths(fields: &BTreeMap<String, String>, bands: usize) -> Vec<f64> {
    let Some(raw) = fields.get("wavelength") else {
        return Vec::new();
    };
    let values: Vec<f64> = split_list(raw).filter_map(|t| t.parse().ok()).collect();
    if values.len() != bands {
        warn!(
            wavelengths = values.len(),
            bands, "Wavelength count does not match band count, ignoring table"
        );
        return Vec::new();
    }
    let units = fields
        .get("wavelength units")
        .map(|u| u.trim().to_ascii_lowercase())
        .unwrap_or_default();
    let factor = match units.as_str() {
        "micrometers" | "micrometer" | "microns" | "um" => 1000.0,
        "millimeters" | "mm" => 1_000_000.0,
        _ => 1.0,
    };
    values.into_iter().map(|w| w * factor).collect()
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|t| !t.is_empty())
}

/// Parse `key = value` lines, joining `{ ... }` blocks that span lines.
fn parse_fields(text: &str) -> Result<BTreeMap<String, String>> {
    let mut lines = text.lines();
    let magic = lines.by_ref().map(str::trim).find(|l| !l.is_empty());
    if magic != Some(ENVI_MAGIC) {
        return Err(IngestError::MalformedHeader("missing ENVI magic line".into()));
    }

    let mut fields = BTreeMap::new();
    let mut pending: Option<(String, String)> = None;
    for line in lines {
        if let Some((key, mut acc)) = pending.take() {
            acc.push(' ');
            acc.push_str(line.trim());
            if line.contains('}') {
                fields.insert(key, strip_braces(&acc));
            } else {
                pending = Some((key, acc));
            }
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = normalize_key(key);
        let value = value.trim();
        if value.starts_with('{') && !value.contains('}') {
            pending = Some((key, value.to_string()));
        } else {
            fields.insert(key, strip_braces(value));
        }
    }

    if let Some((key, _)) = pending {
        return Err(IngestError::MalformedHeader(format!("unterminated block for '{key}'")));
    }
    Ok(fields)
}

fn normalize_key(key: &str) -> String {
    key.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase()
}

fn strip_braces(value: &str) -> String {
    let v = value.trim();
    let v = v.strip_prefix('{').unwrap_or(v);
    let v = v.strip_suffix('}').unwrap_or(v);
    v.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "ENVI
description = {
  synthetic capture}
samples = 4
lines = 3
bands = 2
header offset = 0
data type = 12
interleave = bil
byte order = 1
map info = {UTM, 1, 1, 500000.0, 4100000.0, 30.0, 30.0, 50, North, WGS-84, units=Meters}
wavelength units = Micrometers
wavelength = { 0.45,
 0.55 }
";

    #[test]
    fn parses_required_and_optional_fields() {
        let header = EnviHeader::parse(HEADER).unwrap();
        assert_eq!((header.samples, header.lines, header.bands), (4, 3, 2));
        assert_eq!(header.data_type, SampleType::U16);
        assert_eq!(header.interleave, Interleave::Bil);
        assert_eq!(header.byte_order, ByteOrder::BigEndian);
        assert_eq!(header.wavelengths, vec![450.0, 550.0]);
        assert_eq!(header.crs_id().as_deref(), Some("EPSG:32650"));
        assert_eq!(header.fields.get("description").map(String::as_str), Some("synthetic capture"));
    }

    #[test]
    fn map_info_geotransform_is_north_up() {
        let header = EnviHeader::parse(HEADER).unwrap();
        let gt = header.geotransform().unwrap();
        assert_eq!(gt.origin_x, 500000.0);
        assert_eq!(gt.origin_y, 4100000.0);
        assert_eq!(gt.pixel_width, 30.0);
        assert_eq!(gt.pixel_height, -30.0);
        assert!(gt.is_north_up());
    }

    #[test]
    fn wkt_authority_is_taken_from_the_outer_crs() {
        let wkt = r#"PROJCS["WGS 84 / UTM zone 33N",GEOGCS["WGS 84",AUTHORITY["EPSG","4326"]],AUTHORITY["EPSG","32633"]]"#;
        assert_eq!(crs_from_coordinate_system(wkt).as_deref(), Some("EPSG:32633"));
    }

    #[test]
    fn map_info_rotation_is_parsed() {
        let text = HEADER.replace("units=Meters}", "units=Meters, rotation=30.0}");
        let header = EnviHeader::parse(&text).unwrap();
        assert_eq!(header.map_info.unwrap().rotation, 30.0);
    }

    #[test]
    fn non_numeric_rotation_is_malformed() {
        let text = HEADER.replace("units=Meters}", "units=Meters, rotation=abc}");
        let err = EnviHeader::parse(&text).unwrap_err();
        assert!(matches!(err, IngestError::MalformedHeader(_)), "got {err:?}");
    }

    #[test]
    fn missing_band_count_is_malformed() {
        let text = "ENVI\nsamples = 4\nlines = 3\ndata type = 1\n";
        let err = EnviHeader::parse(text).unwrap_err();
        assert!(matches!(err, IngestError::MalformedHeader(_)), "got {err:?}");
    }
}
