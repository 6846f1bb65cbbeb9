use geoingest_core::sensor::{classify, CompositeBands, SensorEvidence, SensorKind};

fn evidence(band_count: usize) -> SensorEvidence<'static> {
    SensorEvidence {
        band_count,
        ..Default::default()
    }
}

#[test]
fn test_caller_hint_takes_precedence() {
    let profile = classify(&SensorEvidence {
        hint: Some("PRISMA"),
        header_sensor: Some("Sentinel-2"),
        file_stem: Some("GF5_AHSI_20190601"),
        band_count: 13,
        wavelengths_nm: &[],
    });
    assert_eq!(profile.kind, SensorKind::HyperspectralB);
}

#[test]
fn test_header_sensor_beats_file_name() {
    let profile = classify(&SensorEvidence {
        header_sensor: Some("ASTER"),
        file_stem: Some("S2A_MSIL1C_20210101"),
        band_count: 14,
        ..Default::default()
    });
    assert_eq!(profile.kind, SensorKind::MultispectralB);
    assert_eq!(profile.composite, CompositeBands::Rgb([2, 1, 0]));
}

#[test]
fn test_file_name_prefixes() {
    for (stem, kind) in [
        ("S2B_MSIL2A_20200505T100031_N0214", SensorKind::MultispectralA),
        ("GF5_AHSI_E116.5_N40.1_20190601_005805", SensorKind::HyperspectralA),
        ("AST_L1T_00303012007", SensorKind::MultispectralB),
        ("PRS_L1_STD_OFFL_20200812", SensorKind::HyperspectralB),
    ] {
        let profile = classify(&SensorEvidence {
            file_stem: Some(stem),
            band_count: 300,
            ..Default::default()
        });
        assert_eq!(profile.kind, kind, "{stem}");
    }
}

#[test]
fn test_sentinel2_true_colour_from_band_count() {
    let profile = classify(&evidence(13));
    assert_eq!(profile.kind, SensorKind::MultispectralA);
    assert_eq!(profile.composite, CompositeBands::Rgb([3, 2, 1]));
    assert_eq!(profile.wavelengths.len(), 13);
    assert_eq!(profile.band_descriptions(13)[3], "B4 Red");
}

#[test]
fn test_hyperspectral_picks_nearest_wavelengths() {
    // 300 bands, 400 nm to 2500 nm in 7 nm steps.
    let wavelengths: Vec<f64> = (0..300).map(|i| 400.0 + 7.0 * i as f64).collect();
    let profile = classify(&SensorEvidence {
        band_count: 300,
        wavelengths_nm: &wavelengths,
        ..Default::default()
    });
    assert_eq!(profile.kind, SensorKind::HyperspectralA);
    // 638 nm, 547 nm and 463 nm are the closest centres.
    assert_eq!(profile.composite, CompositeBands::Rgb([34, 21, 9]));

    let descriptions = profile.band_descriptions(300);
    assert_eq!(descriptions[0], "Band 1 (400.0 nm)");
}

#[test]
fn test_hyperspectral_without_wavelengths_uses_default_bands() {
    let profile = classify(&evidence(330));
    assert_eq!(profile.kind, SensorKind::HyperspectralA);
    assert_eq!(profile.composite, CompositeBands::Rgb([28, 19, 10]));
}

#[test]
fn test_out_of_range_preference_falls_back_to_first_three() {
    let profile = classify(&SensorEvidence {
        hint: Some("sentinel2"),
        band_count: 3,
        ..Default::default()
    });
    assert_eq!(profile.kind, SensorKind::MultispectralA);
    assert_eq!(profile.composite, CompositeBands::Rgb([0, 1, 2]));
}

#[test]
fn test_unknown_single_band_is_grayscale() {
    let profile = classify(&evidence(1));
    assert_eq!(profile.kind, SensorKind::Unknown);
    assert_eq!(profile.composite, CompositeBands::Gray(0));
    assert_eq!(profile.band_descriptions(1), vec!["Band 1"]);
}

#[test]
fn test_sensor_names_are_normalized() {
    assert_eq!(SensorKind::from_name("Sentinel-2A"), Some(SensorKind::MultispectralA));
    assert_eq!(SensorKind::from_name("GaoFen-5"), Some(SensorKind::HyperspectralA));
    assert_eq!(SensorKind::from_name("unknown"), None);
    assert_eq!(SensorKind::from_name("Landsat 8"), None);
}
