//! Sensor-geometry correction through a rational polynomial model.
//!
//! The reprojected raster was placed using the capture's nominal
//! georeference. For a grid of ground points the RPC says which source pixel
//! really images that point; following that pixel through the nominal
//! georeference tells where the reprojection put it. A least-squares affine
//! fit of those displacements is then used to resample the raster.

use tracing::{debug, info};

use crate::consts::{EPSILON, MIN_RPC_GRID_POINTS, RPC_GRID_SIZE};
use crate::error::{IngestError, Result};
use crate::geo::mercator::mercator_to_lon_lat;
use crate::geo::{CrsDefinition, GeoTransform};
use crate::io::rpc::RpcModel;
use crate::raster::RasterBuffer;

use super::resample::{warp_raster, ResamplingMethod, WarpMap};

/// Georeference of the capture before reprojection.
#[derive(Clone, Debug)]
pub struct SourceGeoref {
    pub geotransform: GeoTransform,
    pub crs: String,
    pub width: usize,
    pub height: usize,
}

/// `u' = c[0] + c[1] * u + c[2] * v`, and likewise for `v'`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AffineWarp {
    pub col: [f64; 3],
    pub row: [f64; 3],
}

impl AffineWarp {
    pub fn apply(&self, u: f64, v: f64) -> (f64, f64) {
        (
            self.col[0] + self.col[1] * u + self.col[2] * v,
            self.row[0] + self.row[1] * u + self.row[2] * v,
        )
    }
}

/// Apply RPC correction, or pass the buffer through untouched when the
/// capture has no RPC model.
pub fn correct(
    buffer: RasterBuffer,
    rpc: Option<&RpcModel>,
    source: &SourceGeoref,
    method: ResamplingMethod,
) -> Result<RasterBuffer> {
    let Some(rpc) = rpc else {
        debug!("No RPC model, correction is a passthrough");
        return Ok(buffer);
    };

    let warp = fit_rpc_warp(&buffer, rpc, source)?;
    let map = WarpMap::from_fn(buffer.width(), buffer.height(), |u, v| Some(warp.apply(u, v)));
    info!(
        col_shift = warp.col[0],
        row_shift = warp.row[0],
        "Applied RPC correction"
    );
    warp_raster(&buffer, &map, method, buffer.geotransform, buffer.crs.clone())
}

/// Evaluate the RPC on a regular ground grid over `buffer` and fit the
/// affine displacement of the nominal placement.
pub fn fit_rpc_warp(buffer: &RasterBuffer, rpc: &RpcModel, source: &SourceGeoref) -> Result<AffineWarp> {
    let transformer = CrsDefinition::resolve(&source.crs)?.transformer()?;
    let inverse = buffer.geotransform.invert().ok_or_else(|| {
        IngestError::MalformedHeader("reprojected geotransform is not invertible".into())
    })?;
    let (w, h) = (buffer.width() as f64, buffer.height() as f64);
    let (sw, sh) = (source.width as f64, source.height as f64);
    let last = (RPC_GRID_SIZE - 1) as f64;

    let mut pairs = Vec::with_capacity(RPC_GRID_SIZE * RPC_GRID_SIZE);
    for j in 0..RPC_GRID_SIZE {
        for i in 0..RPC_GRID_SIZE {
            let u = i as f64 / last * w;
            let v = j as f64 / last * h;
            let (mx, my) = buffer.geotransform.apply(u, v);
            let (lon, lat) = mercator_to_lon_lat(mx, my);
            let Some((line, samp)) = rpc.project(lon, lat, rpc.height_off) else {
                continue;
            };
            // RPC image coordinates address pixel centres.
            let (col, row) = (samp + 0.5, line + 0.5);
            if !(0.0..=sw).contains(&col) || !(0.0..=sh).contains(&row) {
                continue;
            }
            let (x, y) = source.geotransform.apply(col, row);
            let Some((px, py)) = transformer.to_mercator(x, y) else {
                continue;
            };
            let (u2, v2) = inverse.apply(px, py);
            if u2.is_finite() && v2.is_finite() {
                pairs.push(((u, v), (u2, v2)));
            }
        }
    }

    let valid = pairs.len();
    let degenerate = || IngestError::DegenerateRpcGrid {
        valid,
        required: MIN_RPC_GRID_POINTS,
    };
    if valid < MIN_RPC_GRID_POINTS {
        return Err(degenerate());
    }
    debug!(points = valid, "RPC ground grid evaluated");

    let col = fit_affine(&pairs, |(_, (u2, _))| u2).ok_or_else(degenerate)?;
    let row = fit_affine(&pairs, |(_, (_, v2))| v2).ok_or_else(degenerate)?;
    Ok(AffineWarp { col, row })
}

type Pair = ((f64, f64), (f64, f64));

/// Least-squares fit of `target = c0 + c1 * u + c2 * v`.
fn fit_affine(pairs: &[Pair], target: impl Fn(Pair) -> f64) -> Option<[f64; 3]> {
    let mut ata = [[0.0f64; 3]; 3];
    let mut atb = [0.0f64; 3];
    for &pair in pairs {
        let ((u, v), _) = pair;
        let basis = [1.0, u, v];
        let t = target(pair);
        for r in 0..3 {
            for c in 0..3 {
                ata[r][c] += basis[r] * basis[c];
            }
            atb[r] += basis[r] * t;
        }
    }
    solve3(ata, atb)
}

/// Gaussian elimination with partial pivoting.
fn solve3(mut a: [[f64; 3]; 3], mut b: [f64; 3]) -> Option<[f64; 3]> {
    let scale = a.iter().flatten().fold(0.0f64, |m, v| m.max(v.abs()));
    if scale == 0.0 {
        return None;
    }
    for col in 0..3 {
        let pivot = (col..3).max_by(|&x, &y| a[x][col].abs().total_cmp(&a[y][col].abs()))?;
        if a[pivot][col].abs() < EPSILON * scale {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for r in col + 1..3 {
            let f = a[r][col] / a[col][col];
            for c in col..3 {
                a[r][c] -= f * a[col][c];
            }
            b[r] -= f * b[col];
        }
    }
    let mut x = [0.0; 3];
    for r in (0..3).rev() {
        let s: f64 = (r + 1..3).map(|c| a[r][c] * x[c]).sum();
        x[r] = (b[r] - s) / a[r][r];
    }
    x.iter().all(|v| v.is_finite()).then_some(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn affine_fit_recovers_exact_plane() {
        let pairs: Vec<Pair> = (0..5)
            .flat_map(|i| (0..5).map(move |j| (i as f64, j as f64)))
            .map(|(u, v)| ((u, v), (2.0 + u + 0.5 * v, -1.0 + v)))
            .collect();
        let col = fit_affine(&pairs, |(_, (u2, _))| u2).unwrap();
        let row = fit_affine(&pairs, |(_, (_, v2))| v2).unwrap();
        for (got, want) in col.iter().zip([2.0, 1.0, 0.5]) {
            assert!((got - want).abs() < 1e-9);
        }
        for (got, want) in row.iter().zip([-1.0, 0.0, 1.0]) {
            assert!((got - want).abs() < 1e-9);
        }
    }

    #[test]
    fn collinear_points_are_singular() {
        let pairs: Vec<Pair> = (0..10).map(|i| ((i as f64, 0.0), (i as f64, 0.0))).collect();
        assert!(fit_affine(&pairs, |(_, (u2, _))| u2).is_none());
    }
}
