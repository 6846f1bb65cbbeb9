use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};

use crate::consts::EPSILON;

/// Black and white points of a linear stretch, in source sample units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StretchParams {
    pub low: f32,
    pub high: f32,
}

impl StretchParams {
    /// Map a sample to `0..=255`. A single-valued histogram has no range
    /// and maps everything to 0.
    pub fn apply(&self, value: f32) -> u8 {
        let range = self.high - self.low;
        let range = if (range.abs() as f64) < EPSILON { 1.0 } else { range };
        (((value - self.low) / range).clamp(0.0, 1.0) * 255.0).round() as u8
    }
}

/// Percentile black/white points over the valid samples of a band.
///
/// Percentiles are in `[0, 100]`. Returns `None` if no sample is valid.
pub fn percentile_bounds(
    band: &Array2<f32>,
    valid: &Array2<bool>,
    low_percentile: f32,
    high_percentile: f32,
) -> Option<StretchParams> {
    let mut sorted: Vec<f32> = band
        .iter()
        .zip(valid.iter())
        .filter(|&(v, &ok)| ok && v.is_finite())
        .map(|(&v, _)| v)
        .collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f32::total_cmp);

    let n = sorted.len();
    let lo_idx = ((n as f32 * low_percentile / 100.0) as usize).min(n - 1);
    let hi_idx = ((n as f32 * high_percentile / 100.0) as usize).min(n - 1);
    Some(StretchParams {
        low: sorted[lo_idx],
        high: sorted[hi_idx],
    })
}

/// Stretch a band to bytes; invalid pixels become 0.
pub fn stretch_band(band: &Array2<f32>, valid: &Array2<bool>, params: StretchParams) -> Array2<u8> {
    let mut out = Array2::<u8>::zeros(band.dim());
    Zip::from(&mut out)
        .and(band)
        .and(valid)
        .for_each(|o, &v, &ok| {
            if ok {
                *o = params.apply(v);
            }
        });
    out
}
