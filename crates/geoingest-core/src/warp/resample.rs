//! Nodata-aware point sampling and whole-raster warping.

use ndarray::{Array2, ArrayView2};
use num_traits::AsPrimitive;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::consts::{CUBIC_KERNEL_A, EPSILON};
use crate::error::Result;
use crate::geo::GeoTransform;
use crate::raster::RasterBuffer;

/// Interpolation kernel used when resampling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResamplingMethod {
    Nearest,
    #[default]
    Bilinear,
    Cubic,
}

impl std::fmt::Display for ResamplingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nearest => write!(f, "nearest"),
            Self::Bilinear => write!(f, "bilinear"),
            Self::Cubic => write!(f, "cubic"),
        }
    }
}

/// Sample `grid` at continuous pixel coordinates (`(0, 0)` is the outer
/// corner of the first pixel, centres sit at `+0.5`).
///
/// Neighbours that are out of bounds or rejected by `is_valid` do not
/// contribute and the remaining weights are renormalized. Returns `None`
/// outside the grid or when no valid neighbour carries weight.
pub fn sample<T, F>(
    grid: ArrayView2<'_, T>,
    col: f64,
    row: f64,
    method: ResamplingMethod,
    is_valid: F,
) -> Option<f32>
where
    T: Copy + AsPrimitive<f32>,
    F: Fn(usize, usize) -> bool,
{
    let (h, w) = grid.dim();
    if !(col >= 0.0 && row >= 0.0 && col < w as f64 && row < h as f64) {
        return None;
    }

    if method == ResamplingMethod::Nearest {
        let (c, r) = (col as usize, row as usize);
        return is_valid(r, c).then(|| grid[[r, c]].as_());
    }

    let x = col - 0.5;
    let y = row - 0.5;
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;

    let (taps, wx, wy): (isize, [f64; 4], [f64; 4]) = match method {
        ResamplingMethod::Bilinear => (2, [1.0 - fx, fx, 0.0, 0.0], [1.0 - fy, fy, 0.0, 0.0]),
        _ => (4, cubic_weights(fx), cubic_weights(fy)),
    };
    let start = if taps == 2 { 0 } else { -1 };

    let mut sum = 0.0f64;
    let mut total = 0.0f64;
    for j in 0..taps {
        let r = y0 as isize + start + j;
        if r < 0 || r >= h as isize {
            continue;
        }
        for i in 0..taps {
            let c = x0 as isize + start + i;
            if c < 0 || c >= w as isize {
                continue;
            }
            let (r, c) = (r as usize, c as usize);
            if !is_valid(r, c) {
                continue;
            }
            let weight = wx[i as usize] * wy[j as usize];
            let v: f32 = grid[[r, c]].as_();
            sum += weight * v as f64;
            total += weight;
        }
    }
    (total.abs() > EPSILON).then(|| (sum / total) as f32)
}

/// Keys cubic convolution weights for the four taps around `t` in `[0, 1)`.
fn cubic_weights(t: f64) -> [f64; 4] {
    [keys(1.0 + t), keys(t), keys(1.0 - t), keys(2.0 - t)]
}

fn keys(x: f64) -> f64 {
    let a = CUBIC_KERNEL_A;
    let x = x.abs();
    if x <= 1.0 {
        ((a + 2.0) * x - (a + 3.0)) * x * x + 1.0
    } else if x < 2.0 {
        ((a * x - 5.0 * a) * x + 8.0 * a) * x - 4.0 * a
    } else {
        0.0
    }
}

/// Source pixel position for every output pixel; NaN where unmappable.
#[derive(Clone, Debug)]
pub struct WarpMap {
    pub src_col: Array2<f64>,
    pub src_row: Array2<f64>,
}

impl WarpMap {
    /// Build a map by evaluating `f(out_col, out_row)` at each output
    /// pixel centre.
    pub fn from_fn<F>(width: usize, height: usize, f: F) -> Self
    where
        F: Fn(f64, f64) -> Option<(f64, f64)>,
    {
        let mut src_col = Array2::from_elem((height, width), f64::NAN);
        let mut src_row = Array2::from_elem((height, width), f64::NAN);
        for r in 0..height {
            for c in 0..width {
                if let Some((sc, sr)) = f(c as f64 + 0.5, r as f64 + 0.5) {
                    src_col[[r, c]] = sc;
                    src_row[[r, c]] = sr;
                }
            }
        }
        Self { src_col, src_row }
    }

    pub fn dim(&self) -> (usize, usize) {
        self.src_col.dim()
    }
}

/// Resample every band of `source` through `map`.
///
/// Unmapped or fully-nodata output pixels take the source nodata value
/// (NaN when the source has none).
pub fn warp_raster(
    source: &RasterBuffer,
    map: &WarpMap,
    method: ResamplingMethod,
    geotransform: GeoTransform,
    crs: Option<String>,
) -> Result<RasterBuffer> {
    let fill = source.nodata.unwrap_or(f32::NAN);
    let (h, w) = map.dim();
    let bands: Vec<Array2<f32>> = source
        .bands()
        .par_iter()
        .map(|band| {
            let is_valid = |r: usize, c: usize| !source.is_nodata(band[[r, c]]);
            Array2::from_shape_fn((h, w), |(r, c)| {
                let (sc, sr) = (map.src_col[[r, c]], map.src_row[[r, c]]);
                if sc.is_nan() || sr.is_nan() {
                    return fill;
                }
                sample(band.view(), sc, sr, method, is_valid).unwrap_or(fill)
            })
        })
        .collect();
    RasterBuffer::new(bands, geotransform, crs, source.nodata, source.sample_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> Array2<f32> {
        Array2::from_shape_fn((4, 4), |(r, c)| (r * 4 + c) as f32)
    }

    #[test]
    fn pixel_centres_reproduce_source_values() {
        let grid = ramp();
        for method in [ResamplingMethod::Nearest, ResamplingMethod::Bilinear, ResamplingMethod::Cubic] {
            let v = sample(grid.view(), 2.5, 1.5, method, |_, _| true).unwrap();
            assert!((v - 6.0).abs() < 1e-5, "{method}: {v}");
        }
    }

    #[test]
    fn bilinear_interpolates_between_centres() {
        let grid = ramp();
        let v = sample(grid.view(), 2.0, 1.5, ResamplingMethod::Bilinear, |_, _| true).unwrap();
        assert!((v - 5.5).abs() < 1e-6);
    }

    #[test]
    fn invalid_neighbours_are_excluded() {
        let grid = Array2::from_shape_vec((1, 2), vec![10.0f32, -1.0]).unwrap();
        let v = sample(grid.view(), 1.0, 0.5, ResamplingMethod::Bilinear, |_, c| c == 0).unwrap();
        assert_eq!(v, 10.0);
        let none = sample(grid.view(), 1.0, 0.5, ResamplingMethod::Bilinear, |_, _| false);
        assert!(none.is_none());
    }

    #[test]
    fn outside_grid_is_none() {
        let grid = ramp();
        assert!(sample(grid.view(), -0.1, 1.0, ResamplingMethod::Cubic, |_, _| true).is_none());
        assert!(sample(grid.view(), 1.0, 4.0, ResamplingMethod::Nearest, |_, _| true).is_none());
    }

    #[test]
    fn keys_kernel_partitions_unity() {
        for t in [0.0, 0.25, 0.5, 0.9] {
            let s: f64 = cubic_weights(t).iter().sum();
            assert!((s - 1.0).abs() < 1e-12);
        }
    }
}
