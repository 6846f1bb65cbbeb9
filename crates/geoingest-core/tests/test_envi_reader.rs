#[allow(dead_code)]
mod common;

use std::fs;

use approx::assert_relative_eq;
use geoingest_core::error::{ErrorKind, IngestError};
use geoingest_core::io::{EnviHeader, EnviReader, Interleave};
use geoingest_core::raster::SampleType;
use tempfile::TempDir;

#[test]
fn test_reads_float32_bsq_with_georeference() {
    let dir = TempDir::new().unwrap();
    let extra = format!("{}data ignore value = -9999\n", common::eqc_georef(500.0, 1000.0, 10.0));
    let mut band = common::ramp_band(4, 3);
    band[5] = -9999.0;
    let capture = common::write_envi_f32(dir.path(), "scene", 4, 3, &[band, common::constant_band(4, 3, 2.5)], &extra);

    let reader = EnviReader::open(&capture.header_path, &capture.payload_path).unwrap();
    let raster = reader.read_raster().unwrap();

    assert_eq!((raster.width(), raster.height(), raster.band_count()), (4, 3, 2));
    assert_eq!(raster.sample_type, SampleType::F32);
    assert_eq!(raster.band(0)[[2, 3]], 11.0);
    assert_eq!(raster.band(1)[[1, 1]], 2.5);
    assert_eq!(raster.nodata, Some(-9999.0));
    assert!(raster.is_nodata(raster.band(0)[[1, 1]]));
    assert_eq!(raster.crs.as_deref(), Some(common::EQC_PROJ));
    assert_eq!(raster.geotransform.apply(0.0, 0.0), (500.0, 1000.0));
    assert_eq!(raster.geotransform.apply(4.0, 3.0), (540.0, 970.0));
}

#[test]
fn test_interleaves_and_byte_orders_agree() {
    let dir = TempDir::new().unwrap();
    let (w, h) = (5, 4);
    let bands: Vec<Vec<u16>> = (0..3)
        .map(|b| (0..w * h).map(|i| (b * 1000 + i * 7) as u16).collect())
        .collect();

    let reference = common::write_envi_u16(dir.path(), "bsq_le", w, h, &bands, "bsq", false);
    let expected = EnviReader::open(&reference.header_path, &reference.payload_path)
        .unwrap()
        .read_raster()
        .unwrap();
    assert_eq!(expected.band(2)[[3, 4]], (2000 + 19 * 7) as f32);

    for (name, interleave, big_endian) in [
        ("bil_le", "bil", false),
        ("bip_le", "bip", false),
        ("bsq_be", "bsq", true),
        ("bip_be", "bip", true),
    ] {
        let capture = common::write_envi_u16(dir.path(), name, w, h, &bands, interleave, big_endian);
        let raster = EnviReader::open(&capture.header_path, &capture.payload_path)
            .unwrap()
            .read_raster()
            .unwrap();
        assert_eq!(raster.sample_type, SampleType::U16);
        for b in 0..3 {
            assert_eq!(raster.band(b), expected.band(b), "{name} band {b}");
        }
    }
}

#[test]
fn test_truncated_payload_reports_sizes() {
    let dir = TempDir::new().unwrap();
    let capture = common::write_envi_f32(dir.path(), "short", 8, 8, &[common::ramp_band(8, 8)], "");
    let full = fs::read(&capture.payload_path).unwrap();
    fs::write(&capture.payload_path, &full[..full.len() - 10]).unwrap();

    let err = EnviReader::open(&capture.header_path, &capture.payload_path).err().unwrap();
    match err {
        IngestError::TruncatedPayload { expected, actual } => {
            assert_eq!(expected, 256);
            assert_eq!(actual, 246);
        }
        other => panic!("expected TruncatedPayload, got {other:?}"),
    }
}

#[test]
fn test_oversized_payload_is_malformed() {
    let dir = TempDir::new().unwrap();
    let capture = common::write_envi_f32(dir.path(), "long", 4, 4, &[common::ramp_band(4, 4)], "");
    let mut bytes = fs::read(&capture.payload_path).unwrap();
    bytes.extend_from_slice(&[0u8; 4]);
    fs::write(&capture.payload_path, bytes).unwrap();

    let err = EnviReader::open(&capture.header_path, &capture.payload_path).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::MalformedHeader);
}

#[test]
fn test_header_offset_is_skipped() {
    let dir = TempDir::new().unwrap();
    let header = dir.path().join("offset.hdr");
    let payload = dir.path().join("offset.img");
    fs::write(
        &header,
        "ENVI\nsamples = 2\nlines = 2\nbands = 1\nheader offset = 6\ndata type = 1\ninterleave = bsq\n",
    )
    .unwrap();
    fs::write(&payload, [0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 1, 2, 3, 4]).unwrap();

    let raster = EnviReader::open(&header, &payload).unwrap().read_raster().unwrap();
    assert_eq!(raster.band(0).as_slice().unwrap(), &[1.0, 2.0, 3.0, 4.0]);
    assert_eq!(raster.crs, None);
}

#[test]
fn test_missing_magic_is_malformed() {
    let err = EnviHeader::parse("samples = 2\nlines = 2\nbands = 1\ndata type = 1\n").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedHeader);
}

#[test]
fn test_missing_dimension_is_malformed() {
    let err = EnviHeader::parse("ENVI\nsamples = 2\nbands = 1\ndata type = 1\n").unwrap_err();
    assert!(matches!(err, IngestError::MalformedHeader(msg) if msg.contains("lines")));
}

#[test]
fn test_header_metadata_fields() {
    let text = "ENVI\n\
        samples = 3\n\
        lines = 2\n\
        bands = 3\n\
        data type = 2\n\
        interleave = BIL\n\
        sensor type = GF-5 AHSI\n\
        wavelength units = Micrometers\n\
        wavelength = {\n 0.46, 0.55,\n 0.64 }\n\
        band names = {Blue, Green, Red}\n\
        map info = {UTM, 1, 1, 300000, 4500000, 30, 30, 50, North, WGS-84, units=Meters}\n";
    let header = EnviHeader::parse(text).unwrap();

    assert_eq!(header.interleave, Interleave::Bil);
    assert_eq!(header.data_type, SampleType::I16);
    assert_eq!(header.sensor_type.as_deref(), Some("GF-5 AHSI"));
    assert_eq!(header.band_names, vec!["Blue", "Green", "Red"]);
    assert_eq!(header.wavelengths.len(), 3);
    assert_relative_eq!(header.wavelengths[0], 460.0, epsilon = 1e-9);
    assert_relative_eq!(header.wavelengths[2], 640.0, epsilon = 1e-9);
    assert_eq!(header.crs_id().as_deref(), Some("EPSG:32650"));
    let gt = header.geotransform().unwrap();
    assert_eq!(gt.apply(1.0, 1.0), (300030.0, 4499970.0));
}

#[test]
fn test_wkt_coordinate_system_wins_over_map_info() {
    let text = "ENVI\nsamples = 1\nlines = 1\nbands = 1\ndata type = 1\n\
        map info = {Geographic Lat/Lon, 1, 1, 10, 50, 0.1, 0.1, WGS-84}\n\
        coordinate system string = {PROJCS[\"WGS 84 / UTM zone 33N\",GEOGCS[\"WGS 84\",AUTHORITY[\"EPSG\",\"4326\"]],AUTHORITY[\"EPSG\",\"32633\"]]}\n";
    let header = EnviHeader::parse(text).unwrap();
    assert_eq!(header.crs_id().as_deref(), Some("EPSG:32633"));
}

#[test]
fn test_mismatched_wavelength_table_is_ignored() {
    let text = "ENVI\nsamples = 1\nlines = 1\nbands = 3\ndata type = 1\nwavelength = {450, 550}\n";
    let header = EnviHeader::parse(text).unwrap();
    assert!(header.wavelengths.is_empty());
}
