//! Static per-sensor band tables.

/// Sentinel-2 MSI band names and centre wavelengths (nm).
pub const SENTINEL2_BANDS: [(&str, f64); 13] = [
    ("B1 Coastal aerosol", 443.0),
    ("B2 Blue", 490.0),
    ("B3 Green", 560.0),
    ("B4 Red", 665.0),
    ("B5 Vegetation red edge", 705.0),
    ("B6 Vegetation red edge", 740.0),
    ("B7 Vegetation red edge", 783.0),
    ("B8 NIR", 842.0),
    ("B8A Narrow NIR", 865.0),
    ("B9 Water vapour", 945.0),
    ("B10 SWIR cirrus", 1375.0),
    ("B11 SWIR", 1610.0),
    ("B12 SWIR", 2190.0),
];

/// ASTER VNIR/SWIR/TIR band names and centre wavelengths (nm).
pub const ASTER_BANDS: [(&str, f64); 14] = [
    ("B1 VNIR Green", 560.0),
    ("B2 VNIR Red", 660.0),
    ("B3N VNIR NIR", 810.0),
    ("B4 SWIR", 1650.0),
    ("B5 SWIR", 2165.0),
    ("B6 SWIR", 2205.0),
    ("B7 SWIR", 2260.0),
    ("B8 SWIR", 2330.0),
    ("B9 SWIR", 2395.0),
    ("B10 TIR", 8300.0),
    ("B11 TIR", 8650.0),
    ("B12 TIR", 9100.0),
    ("B13 TIR", 10600.0),
    ("B14 TIR", 11300.0),
];

/// Red, green, blue targets for hyperspectral true-colour composites (nm).
pub const TRUE_COLOR_TARGETS_NM: [f64; 3] = [640.0, 550.0, 460.0];

/// Fallback composite for hyperspectral cubes without a wavelength table.
pub const HYPERSPECTRAL_DEFAULT_RGB: [usize; 3] = [28, 19, 10];

pub const SENTINEL2_RGB: [usize; 3] = [3, 2, 1];

/// False colour (NIR, red, green).
pub const ASTER_RGB: [usize; 3] = [2, 1, 0];

/// Index of the band whose wavelength is closest to `target`.
pub fn nearest_band(wavelengths: &[f64], target: f64) -> Option<usize> {
    wavelengths
        .iter()
        .enumerate()
        .filter(|(_, w)| w.is_finite())
        .min_by(|(_, a), (_, b)| (*a - target).abs().total_cmp(&(*b - target).abs()))
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_band_picks_closest_wavelength() {
        let wl = [450.0, 500.0, 560.0, 650.0];
        assert_eq!(nearest_band(&wl, 640.0), Some(3));
        assert_eq!(nearest_band(&wl, 550.0), Some(2));
        assert_eq!(nearest_band(&wl, 460.0), Some(0));
        assert_eq!(nearest_band(&[], 460.0), None);
    }
}
