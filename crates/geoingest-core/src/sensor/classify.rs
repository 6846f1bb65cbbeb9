use tracing::{debug, info, warn};

use super::profiles::{
    nearest_band, ASTER_BANDS, ASTER_RGB, HYPERSPECTRAL_DEFAULT_RGB, SENTINEL2_BANDS, SENTINEL2_RGB,
    TRUE_COLOR_TARGETS_NM,
};
use super::{CompositeBands, SensorKind, SensorProfile};

/// Everything the classifier may look at.
#[derive(Clone, Debug, Default)]
pub struct SensorEvidence<'a> {
    /// Caller-supplied sensor name.
    pub hint: Option<&'a str>,
    /// `sensor type` from the header.
    pub header_sensor: Option<&'a str>,
    /// Capture file stem; product names start with a sensor prefix.
    pub file_stem: Option<&'a str>,
    pub band_count: usize,
    /// Header wavelengths in nanometres (empty when absent).
    pub wavelengths_nm: &'a [f64],
}

/// Classify a capture. Never fails: `Unknown` is a valid outcome.
pub fn classify(evidence: &SensorEvidence<'_>) -> SensorProfile {
    let by_name = evidence
        .hint
        .and_then(SensorKind::from_name)
        .or_else(|| evidence.header_sensor.and_then(SensorKind::from_name))
        .or_else(|| evidence.file_stem.and_then(kind_from_file_stem));

    let kind = match by_name {
        Some(kind) => kind,
        None => heuristic_kind(evidence.band_count, evidence.wavelengths_nm),
    };

    let wavelengths = if !evidence.wavelengths_nm.is_empty() {
        evidence.wavelengths_nm.to_vec()
    } else {
        nominal_wavelengths(kind, evidence.band_count)
    };
    let composite = resolve_composite(kind, &wavelengths, evidence.band_count);

    info!(
        sensor = kind.code(),
        bands = evidence.band_count,
        composite = ?composite,
        "Classified capture"
    );
    SensorProfile {
        kind,
        wavelengths,
        composite,
    }
}

fn kind_from_file_stem(stem: &str) -> Option<SensorKind> {
    let upper = stem.to_ascii_uppercase();
    if upper.starts_with("S2") {
        Some(SensorKind::MultispectralA)
    } else if upper.starts_with("GF5") {
        Some(SensorKind::HyperspectralA)
    } else if upper.starts_with("AST") {
        Some(SensorKind::MultispectralB)
    } else if upper.starts_with("PRS") {
        Some(SensorKind::HyperspectralB)
    } else {
        None
    }
}

fn heuristic_kind(band_count: usize, wavelengths: &[f64]) -> SensorKind {
    let kind = if wavelengths.is_empty() {
        match band_count {
            n if n >= 280 => SensorKind::HyperspectralA,
            n if n >= 150 => SensorKind::HyperspectralB,
            13 => SensorKind::MultispectralA,
            14 => SensorKind::MultispectralB,
            _ => SensorKind::Unknown,
        }
    } else {
        let min = wavelengths.iter().copied().fold(f64::INFINITY, f64::min);
        let max = wavelengths.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let spans_vnir_swir = min < 1000.0 && max > 2000.0;
        match band_count {
            n if n >= 280 && spans_vnir_swir => SensorKind::HyperspectralA,
            n if n >= 150 && spans_vnir_swir => SensorKind::HyperspectralB,
            13 if max < 2500.0 => SensorKind::MultispectralA,
            14 if max > 8000.0 => SensorKind::MultispectralB,
            _ => SensorKind::Unknown,
        }
    };
    debug!(band_count, sensor = kind.code(), "Heuristic sensor match");
    kind
}

fn nominal_wavelengths(kind: SensorKind, band_count: usize) -> Vec<f64> {
    let table: &[(&str, f64)] = match kind {
        SensorKind::MultispectralA => &SENTINEL2_BANDS,
        SensorKind::MultispectralB => &ASTER_BANDS,
        _ => return Vec::new(),
    };
    if table.len() != band_count {
        return Vec::new();
    }
    table.iter().map(|&(_, wl)| wl).collect()
}

fn preferred_composite(kind: SensorKind, wavelengths: &[f64]) -> CompositeBands {
    match kind {
        SensorKind::MultispectralA => CompositeBands::Rgb(SENTINEL2_RGB),
        SensorKind::MultispectralB => CompositeBands::Rgb(ASTER_RGB),
        SensorKind::HyperspectralA | SensorKind::HyperspectralB => {
            let picked: Option<Vec<usize>> = TRUE_COLOR_TARGETS_NM
                .iter()
                .map(|&target| nearest_band(wavelengths, target))
                .collect();
            match picked.as_deref() {
                Some(&[r, g, b]) => CompositeBands::Rgb([r, g, b]),
                _ => CompositeBands::Rgb(HYPERSPECTRAL_DEFAULT_RGB),
            }
        }
        SensorKind::Unknown => CompositeBands::Rgb([0, 1, 2]),
    }
}

fn generic_composite(band_count: usize) -> CompositeBands {
    if band_count >= 3 {
        CompositeBands::Rgb([0, 1, 2])
    } else {
        CompositeBands::Gray(0)
    }
}

/// The sensor's preferred bands, or first-three/grayscale when they do not
/// exist in this capture.
fn resolve_composite(kind: SensorKind, wavelengths: &[f64], band_count: usize) -> CompositeBands {
    let preferred = preferred_composite(kind, wavelengths);
    if preferred.indices().iter().all(|&b| b < band_count) {
        return preferred;
    }
    let fallback = generic_composite(band_count);
    if kind != SensorKind::Unknown {
        warn!(
            sensor = kind.code(),
            band_count,
            preferred = ?preferred,
            fallback = ?fallback,
            "Preferred composite bands out of range, falling back"
        );
    }
    fallback
}
