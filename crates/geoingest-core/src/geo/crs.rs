//! CRS resolution and geodetic transforms.
//!
//! Identifiers are `EPSG:n` codes or PROJ strings. Geographic, web mercator
//! and equirectangular definitions are evaluated in closed form; everything
//! else goes through proj4rs with definitions from crs-definitions.

use std::collections::HashMap;

use proj4rs::proj::Proj;
use proj4rs::transform::transform;

use crate::consts::EARTH_RADIUS_M;
use crate::error::{IngestError, Result};

use super::mercator::{lon_lat_to_mercator, mercator_to_lon_lat};

const WGS84_PROJ: &str = "+proj=longlat +datum=WGS84 +no_defs";

/// A resolved coordinate reference system.
#[derive(Clone, Debug, PartialEq)]
pub enum CrsDefinition {
    /// Longitude/latitude in degrees.
    Geographic,
    /// Spherical web mercator, metres.
    WebMercator,
    /// Equidistant cylindrical (plate carrée), metres.
    Equirectangular {
        lon_0: f64,
        lat_ts: f64,
        x_0: f64,
        y_0: f64,
        radius: f64,
    },
    /// Any other PROJ definition, evaluated by proj4rs.
    Proj(String),
}

impl CrsDefinition {
    /// Resolve an identifier to a definition, or fail with `UnsupportedCrs`.
    pub fn resolve(id: &str) -> Result<Self> {
        let id = id.trim();
        if id.starts_with("+proj=") || id.starts_with("proj=") {
            return Self::from_proj_string(id);
        }
        let code = id
            .strip_prefix("EPSG:")
            .or_else(|| id.strip_prefix("epsg:"))
            .and_then(|c| c.trim().parse::<u32>().ok())
            .ok_or_else(|| IngestError::UnsupportedCrs(format!("unrecognised identifier '{id}'")))?;
        Self::from_epsg(code)
    }

    pub fn from_epsg(code: u32) -> Result<Self> {
        match code {
            4326 => Ok(Self::Geographic),
            3857 | 3785 | 900913 | 102100 => Ok(Self::WebMercator),
            _ => {
                let proj4 = u16::try_from(code)
                    .ok()
                    .and_then(crs_definitions::from_code)
                    .map(|def| def.proj4)
                    .ok_or_else(|| {
                        IngestError::UnsupportedCrs(format!(
                            "EPSG:{code} is not in the crs-definitions database"
                        ))
                    })?;
                Self::from_proj_string(proj4)
            }
        }
    }

    pub fn from_proj_string(definition: &str) -> Result<Self> {
        let params = parse_proj_params(definition);
        let number = |key: &str, default: f64| -> f64 {
            params
                .get(key)
                .and_then(|v| v.as_deref())
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        };
        let proj = params
            .get("proj")
            .and_then(|v| v.as_deref())
            .ok_or_else(|| {
                IngestError::UnsupportedCrs(format!("missing +proj in '{definition}'"))
            })?;

        match proj {
            "longlat" | "latlong" | "lonlat" | "latlon" => Ok(Self::Geographic),
            "merc"
                if (number("a", 0.0) == EARTH_RADIUS_M && number("b", 0.0) == EARTH_RADIUS_M)
                    || number("R", 0.0) == EARTH_RADIUS_M =>
            {
                Ok(Self::WebMercator)
            }
            "webmerc" => Ok(Self::WebMercator),
            "eqc" => Ok(Self::Equirectangular {
                lon_0: number("lon_0", 0.0),
                lat_ts: number("lat_ts", 0.0),
                x_0: number("x_0", 0.0),
                y_0: number("y_0", 0.0),
                radius: number("R", number("a", EARTH_RADIUS_M)),
            }),
            _ => {
                Proj::from_proj_string(definition).map_err(|e| {
                    IngestError::UnsupportedCrs(format!("invalid PROJ definition '{definition}': {e:?}"))
                })?;
                Ok(Self::Proj(definition.to_string()))
            }
        }
    }

    pub fn is_geographic(&self) -> bool {
        matches!(self, Self::Geographic)
    }

    /// Build a transformer between this CRS and geodetic longitude/latitude.
    pub fn transformer(&self) -> Result<GeodeticTransformer> {
        let projs = match self {
            Self::Proj(definition) => {
                let source = Proj::from_proj_string(definition).map_err(|e| {
                    IngestError::UnsupportedCrs(format!("invalid PROJ definition: {e:?}"))
                })?;
                let wgs84 = Proj::from_proj_string(WGS84_PROJ).map_err(|e| {
                    IngestError::UnsupportedCrs(format!("WGS84 definition rejected: {e:?}"))
                })?;
                Some((source, wgs84))
            }
            _ => None,
        };
        Ok(GeodeticTransformer {
            definition: self.clone(),
            projs,
        })
    }
}

/// Converts between one CRS and WGS84 longitude/latitude degrees.
///
/// Conversions return `None` for points the projection cannot represent.
pub struct GeodeticTransformer {
    definition: CrsDefinition,
    projs: Option<(Proj, Proj)>,
}

impl GeodeticTransformer {
    pub fn definition(&self) -> &CrsDefinition {
        &self.definition
    }

    pub fn to_lon_lat(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let out = match &self.definition {
            CrsDefinition::Geographic => (x, y),
            CrsDefinition::WebMercator => mercator_to_lon_lat(x, y),
            CrsDefinition::Equirectangular {
                lon_0,
                lat_ts,
                x_0,
                y_0,
                radius,
            } => {
                let k = radius * lat_ts.to_radians().cos();
                (
                    lon_0 + ((x - x_0) / k).to_degrees(),
                    ((y - y_0) / radius).to_degrees(),
                )
            }
            CrsDefinition::Proj(_) => {
                let (source, wgs84) = self.projs.as_ref()?;
                let mut point = (x, y, 0.0);
                transform(source, wgs84, &mut point).ok()?;
                (point.0.to_degrees(), point.1.to_degrees())
            }
        };
        (out.0.is_finite() && out.1.is_finite()).then_some(out)
    }

    pub fn from_lon_lat(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        let out = match &self.definition {
            CrsDefinition::Geographic => (lon, lat),
            CrsDefinition::WebMercator => lon_lat_to_mercator(lon, lat),
            CrsDefinition::Equirectangular {
                lon_0,
                lat_ts,
                x_0,
                y_0,
                radius,
            } => (
                x_0 + radius * lat_ts.to_radians().cos() * (lon - lon_0).to_radians(),
                y_0 + radius * lat.to_radians(),
            ),
            CrsDefinition::Proj(_) => {
                let (source, wgs84) = self.projs.as_ref()?;
                let mut point = (lon.to_radians(), lat.to_radians(), 0.0);
                transform(wgs84, source, &mut point).ok()?;
                (point.0, point.1)
            }
        };
        (out.0.is_finite() && out.1.is_finite()).then_some(out)
    }

    /// This CRS to web mercator metres.
    pub fn to_mercator(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        if self.definition == CrsDefinition::WebMercator {
            return Some((x, y));
        }
        let (lon, lat) = self.to_lon_lat(x, y)?;
        Some(lon_lat_to_mercator(lon, lat))
    }

    /// Web mercator metres to this CRS.
    pub fn from_mercator(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        if self.definition == CrsDefinition::WebMercator {
            return Some((x, y));
        }
        let (lon, lat) = mercator_to_lon_lat(x, y);
        self.from_lon_lat(lon, lat)
    }
}

impl std::fmt::Debug for GeodeticTransformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeodeticTransformer")
            .field("definition", &self.definition)
            .finish_non_exhaustive()
    }
}

/// Split `+key=value +flag` into a map (flags map to `None`).
fn parse_proj_params(definition: &str) -> HashMap<String, Option<String>> {
    definition
        .split_whitespace()
        .map(|token| token.trim_start_matches('+'))
        .filter(|token| !token.is_empty())
        .map(|token| match token.split_once('=') {
            Some((k, v)) => (k.to_string(), Some(v.to_string())),
            None => (token.to_string(), None),
        })
        .collect()
}
