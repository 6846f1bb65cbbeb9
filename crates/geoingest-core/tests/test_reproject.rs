use approx::assert_abs_diff_eq;
use ndarray::Array2;

use geoingest_core::error::ErrorKind;
use geoingest_core::geo::mercator::{lon_lat_to_mercator, mercator_to_lon_lat};
use geoingest_core::geo::GeoTransform;
use geoingest_core::raster::{RasterBuffer, SampleType};
use geoingest_core::warp::{reproject, ResamplingMethod};

const W: usize = 50;
const H: usize = 40;

fn geographic(bands: Vec<Array2<f32>>, nodata: Option<f32>) -> RasterBuffer {
    RasterBuffer::new(
        bands,
        GeoTransform::north_up(10.0, 45.0, 0.01, -0.01),
        Some("EPSG:4326".into()),
        nodata,
        SampleType::F32,
    )
    .unwrap()
}

#[test]
fn test_output_is_north_up_web_mercator() {
    let source = geographic(vec![Array2::zeros((H, W)), Array2::ones((H, W))], None);
    let out = reproject(&source, ResamplingMethod::Bilinear).unwrap();

    assert_eq!(out.crs.as_deref(), Some("EPSG:3857"));
    assert_eq!(out.band_count(), 2);
    assert!(out.geotransform.is_north_up());
    let (px, py) = out.geotransform.pixel_size();
    assert_abs_diff_eq!(px, py, epsilon = 1e-9);
    assert!(px > 0.0);
}

#[test]
fn test_source_corners_land_within_one_pixel_of_output_corners() {
    let source = geographic(vec![Array2::from_elem((H, W), 1.0)], None);
    let out = reproject(&source, ResamplingMethod::Bilinear).unwrap();
    let inverse = out.geotransform.invert().unwrap();
    let (ow, oh) = (out.width() as f64, out.height() as f64);

    for (col, row, want_col, want_row) in [
        (0.0, 0.0, 0.0, 0.0),
        (W as f64, 0.0, ow, 0.0),
        (0.0, H as f64, 0.0, oh),
        (W as f64, H as f64, ow, oh),
    ] {
        let (lon, lat) = source.geotransform.apply(col, row);
        let (mx, my) = lon_lat_to_mercator(lon, lat);
        let (oc, or) = inverse.apply(mx, my);
        assert!((oc - want_col).abs() <= 1.0, "corner ({col}, {row}) -> col {oc}, want {want_col}");
        assert!((or - want_row).abs() <= 1.0, "corner ({col}, {row}) -> row {or}, want {want_row}");
    }
}

#[test]
fn test_constant_band_stays_constant() {
    let source = geographic(vec![Array2::from_elem((H, W), 7.0)], None);
    for method in [ResamplingMethod::Nearest, ResamplingMethod::Bilinear, ResamplingMethod::Cubic] {
        let out = reproject(&source, method).unwrap();
        let band = out.band(0);
        let valid = band.iter().filter(|v| !v.is_nan()).count();
        assert!(valid > band.len() * 9 / 10, "{method}: only {valid} valid pixels");
        for &v in band.iter().filter(|v| !v.is_nan()) {
            assert_abs_diff_eq!(v, 7.0, epsilon = 1e-4);
        }
    }
}

#[test]
fn test_nodata_sentinel_is_preserved() {
    let band = Array2::from_shape_fn((H, W), |(_, c)| if c < W / 2 { -1.0 } else { 7.0 });
    let source = geographic(vec![band], Some(-1.0));
    let out = reproject(&source, ResamplingMethod::Bilinear).unwrap();

    assert_eq!(out.nodata, Some(-1.0));
    let mid = out.height() / 2;
    assert_eq!(out.band(0)[[mid, 1]], -1.0);
    assert_abs_diff_eq!(out.band(0)[[mid, out.width() - 3]], 7.0, epsilon = 1e-4);
}

#[test]
fn test_nearest_keeps_source_values() {
    let band = Array2::from_shape_fn((H, W), |(r, c)| (r * W + c) as f32);
    let source = geographic(vec![band], None);
    let out = reproject(&source, ResamplingMethod::Nearest).unwrap();
    for &v in out.band(0).iter().filter(|v| !v.is_nan()) {
        assert_eq!(v.fract(), 0.0);
        assert!((0.0..(W * H) as f32).contains(&v));
    }
}

#[test]
fn test_utm_source_lands_in_its_zone() {
    let source = RasterBuffer::new(
        vec![Array2::from_elem((20, 20), 1.0)],
        GeoTransform::north_up(490_000.0, 5_000_000.0, 1000.0, -1000.0),
        Some("EPSG:32633".into()),
        None,
        SampleType::U16,
    )
    .unwrap();
    let out = reproject(&source, ResamplingMethod::Bilinear).unwrap();

    let (cx, cy) = out
        .geotransform
        .apply(out.width() as f64 / 2.0, out.height() as f64 / 2.0);
    let (lon, lat) = mercator_to_lon_lat(cx, cy);
    assert_abs_diff_eq!(lon, 15.0, epsilon = 0.05);
    assert!((44.9..45.2).contains(&lat), "lat {lat}");
    assert_eq!(out.sample_type, SampleType::U16);
}

#[test]
fn test_missing_crs_is_unsupported() {
    let source = RasterBuffer::new(
        vec![Array2::zeros((4, 4))],
        GeoTransform::default(),
        None,
        None,
        SampleType::U8,
    )
    .unwrap();
    let err = reproject(&source, ResamplingMethod::Bilinear).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedCrs);
}

#[test]
fn test_unknown_epsg_code_is_unsupported() {
    let mut source = geographic(vec![Array2::zeros((H, W))], None);
    source.crs = Some("EPSG:999999".into());
    let err = reproject(&source, ResamplingMethod::Bilinear).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedCrs);
}
