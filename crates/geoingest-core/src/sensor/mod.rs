mod classify;
pub mod profiles;

pub use classify::{classify, SensorEvidence};

use serde::{Deserialize, Serialize};

/// Supported sensor families.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorKind {
    /// Sentinel-2 MSI.
    #[serde(rename = "sentinel2")]
    MultispectralA,
    /// GaoFen-5 AHSI.
    #[serde(rename = "gf5")]
    HyperspectralA,
    /// Terra ASTER.
    #[serde(rename = "aster")]
    MultispectralB,
    /// PRISMA.
    #[serde(rename = "prisma")]
    HyperspectralB,
    #[serde(rename = "unknown")]
    Unknown,
}

impl SensorKind {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MultispectralA => "sentinel2",
            Self::HyperspectralA => "gf5",
            Self::MultispectralB => "aster",
            Self::HyperspectralB => "prisma",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_hyperspectral(&self) -> bool {
        matches!(self, Self::HyperspectralA | Self::HyperspectralB)
    }

    /// Match a free-form sensor name ("Sentinel-2", "GF5_AHSI", ...).
    pub fn from_name(name: &str) -> Option<Self> {
        let key: String = name
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect::<String>()
            .to_ascii_lowercase();
        if key.is_empty() || key == "unknown" {
            return None;
        }
        if key.starts_with("sentinel2") || key == "s2" || key.starts_with("s2msi") || key == "msi" {
            Some(Self::MultispectralA)
        } else if key.starts_with("gf5") || key.starts_with("gaofen5") || key.contains("ahsi") {
            Some(Self::HyperspectralA)
        } else if key.starts_with("aster") || key.starts_with("ast") {
            Some(Self::MultispectralB)
        } else if key.starts_with("prisma") || key.starts_with("prs") {
            Some(Self::HyperspectralB)
        } else {
            None
        }
    }
}

impl std::fmt::Display for SensorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MultispectralA => write!(f, "Sentinel-2 MSI"),
            Self::HyperspectralA => write!(f, "GF-5 AHSI"),
            Self::MultispectralB => write!(f, "ASTER"),
            Self::HyperspectralB => write!(f, "PRISMA"),
            Self::Unknown => write!(f, "Unknown sensor"),
        }
    }
}

/// 0-based band selection for the display composite.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompositeBands {
    Rgb([usize; 3]),
    Gray(usize),
}

impl CompositeBands {
    pub fn indices(&self) -> Vec<usize> {
        match *self {
            Self::Rgb(rgb) => rgb.to_vec(),
            Self::Gray(b) => vec![b],
        }
    }
}

/// Classified sensor: kind, wavelength table (nm, may be empty) and the
/// preferred composite, already resolved against the capture's band count.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SensorProfile {
    pub kind: SensorKind,
    pub wavelengths: Vec<f64>,
    pub composite: CompositeBands,
}

impl SensorProfile {
    /// Human-readable name of every band.
    pub fn band_descriptions(&self, band_count: usize) -> Vec<String> {
        let table: &[(&str, f64)] = match self.kind {
            SensorKind::MultispectralA => &profiles::SENTINEL2_BANDS,
            SensorKind::MultispectralB => &profiles::ASTER_BANDS,
            _ => &[],
        };
        (0..band_count)
            .map(|i| match (table.get(i), self.wavelengths.get(i)) {
                (Some((name, _)), _) => (*name).to_string(),
                (None, Some(wl)) if self.kind.is_hyperspectral() => {
                    format!("Band {} ({wl:.1} nm)", i + 1)
                }
                _ => format!("Band {}", i + 1),
            })
            .collect()
    }
}
