//! Rational polynomial camera model (RPC00B term ordering).

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::{GEODETIC_CRS, RPC_DENOMINATOR_EPSILON};
use crate::error::{IngestError, Result};
use crate::geo::GeoTransform;

const TERMS: usize = 20;

/// Offsets and scales followed by four 20-term coefficient sets.
const ENVI_RPC_VALUES: usize = 10 + 4 * TERMS;

/// Ground-to-image rational polynomial model.
///
/// Longitude and latitude are degrees, height is metres above the ellipsoid.
/// Image coordinates are 0-based `(line, sample)` in source pixels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RpcModel {
    pub line_off: f64,
    pub samp_off: f64,
    pub lat_off: f64,
    pub long_off: f64,
    pub height_off: f64,
    pub line_scale: f64,
    pub samp_scale: f64,
    pub lat_scale: f64,
    pub long_scale: f64,
    pub height_scale: f64,
    pub line_num: [f64; TERMS],
    pub line_den: [f64; TERMS],
    pub samp_num: [f64; TERMS],
    pub samp_den: [f64; TERMS],
}

impl RpcModel {
    /// Build a model from the flat `rpc info` list of an ENVI header.
    pub fn from_envi_values(values: &[f64]) -> Result<Self> {
        if values.len() < ENVI_RPC_VALUES {
            return Err(IngestError::MalformedHeader(format!(
                "rpc info holds {} values, expected at least {ENVI_RPC_VALUES}",
                values.len()
            )));
        }
        let coeffs = |set: usize| -> [f64; TERMS] {
            let mut out = [0.0; TERMS];
            out.copy_from_slice(&values[10 + set * TERMS..10 + (set + 1) * TERMS]);
            out
        };
        let model = Self {
            line_off: values[0],
            samp_off: values[1],
            lat_off: values[2],
            long_off: values[3],
            height_off: values[4],
            line_scale: values[5],
            samp_scale: values[6],
            lat_scale: values[7],
            long_scale: values[8],
            height_scale: values[9],
            line_num: coeffs(0),
            line_den: coeffs(1),
            samp_num: coeffs(2),
            samp_den: coeffs(3),
        };
        model.check_scales()?;
        Ok(model)
    }

    /// Read a `KEY: value` sidecar (the `_RPC.TXT` layout).
    pub fn open(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse_sidecar(&text)
    }

    pub fn parse_sidecar(text: &str) -> Result<Self> {
        let values: HashMap<String, f64> = text
            .lines()
            .filter_map(|line| line.split_once(':'))
            .filter_map(|(key, value)| {
                // Values may carry a trailing unit ("pixels", "degrees").
                let number = value.split_whitespace().next()?.parse::<f64>().ok()?;
                Some((key.trim().to_ascii_uppercase(), number))
            })
            .collect();

        let scalar = |key: &str| -> Result<f64> {
            values
                .get(key)
                .copied()
                .ok_or_else(|| IngestError::MalformedHeader(format!("RPC sidecar is missing {key}")))
        };
        let coeffs = |prefix: &str| -> Result<[f64; TERMS]> {
            let mut out = [0.0; TERMS];
            for (i, slot) in out.iter_mut().enumerate() {
                *slot = scalar(&format!("{prefix}_{}", i + 1))?;
            }
            Ok(out)
        };

        let model = Self {
            line_off: scalar("LINE_OFF")?,
            samp_off: scalar("SAMP_OFF")?,
            lat_off: scalar("LAT_OFF")?,
            long_off: scalar("LONG_OFF")?,
            height_off: scalar("HEIGHT_OFF")?,
            line_scale: scalar("LINE_SCALE")?,
            samp_scale: scalar("SAMP_SCALE")?,
            lat_scale: scalar("LAT_SCALE")?,
            long_scale: scalar("LONG_SCALE")?,
            height_scale: scalar("HEIGHT_SCALE")?,
            line_num: coeffs("LINE_NUM_COEFF")?,
            line_den: coeffs("LINE_DEN_COEFF")?,
            samp_num: coeffs("SAMP_NUM_COEFF")?,
            samp_den: coeffs("SAMP_DEN_COEFF")?,
        };
        model.check_scales()?;
        Ok(model)
    }

    fn check_scales(&self) -> Result<()> {
        let scales = [
            ("LAT_SCALE", self.lat_scale),
            ("LONG_SCALE", self.long_scale),
            ("HEIGHT_SCALE", self.height_scale),
        ];
        match scales.iter().find(|(_, s)| *s == 0.0 || !s.is_finite()) {
            Some((name, value)) => Err(IngestError::MalformedHeader(format!(
                "RPC {name} must be non-zero, got {value}"
            ))),
            None => Ok(()),
        }
    }

    /// Project a ground point to 0-based `(line, sample)` image coordinates.
    ///
    /// Returns `None` when a denominator vanishes or the result is not finite.
    pub fn project(&self, lon: f64, lat: f64, height: f64) -> Option<(f64, f64)> {
        let p = (lat - self.lat_off) / self.lat_scale;
        let l = (lon - self.long_off) / self.long_scale;
        let h = (height - self.height_off) / self.height_scale;
        let terms = polynomial_terms(l, p, h);

        let ratio = |num: &[f64; TERMS], den: &[f64; TERMS]| -> Option<f64> {
            let d = dot(den, &terms);
            (d.abs() > RPC_DENOMINATOR_EPSILON).then(|| dot(num, &terms) / d)
        };
        let line = ratio(&self.line_num, &self.line_den)? * self.line_scale + self.line_off;
        let samp = ratio(&self.samp_num, &self.samp_den)? * self.samp_scale + self.samp_off;
        (line.is_finite() && samp.is_finite()).then_some((line, samp))
    }

    /// Coarse geographic georeference spanning the model's validity box.
    ///
    /// Used when a capture ships an RPC but no map info.
    pub fn approximate_georef(&self, width: usize, height: usize) -> (GeoTransform, String) {
        let gt = GeoTransform::north_up(
            self.long_off - self.long_scale,
            self.lat_off + self.lat_scale,
            2.0 * self.long_scale / width as f64,
            -2.0 * self.lat_scale / height as f64,
        );
        (gt, GEODETIC_CRS.to_string())
    }
}

fn polynomial_terms(l: f64, p: f64, h: f64) -> [f64; TERMS] {
    [
        1.0,
        l,
        p,
        h,
        l * p,
        l * h,
        p * h,
        l * l,
        p * p,
        h * h,
        p * l * h,
        l * l * l,
        l * p * p,
        l * h * h,
        l * l * p,
        p * p * p,
        p * h * h,
        l * l * h,
        p * p * h,
        h * h * h,
    ]
}

fn dot(a: &[f64; TERMS], b: &[f64; TERMS]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
