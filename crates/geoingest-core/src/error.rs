use thiserror::Error;

use crate::pipeline::PipelineStage;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Malformed header: {0}")]
    MalformedHeader(String),

    #[error("Truncated payload: expected {expected} bytes, got {actual}")]
    TruncatedPayload { expected: u64, actual: u64 },

    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),

    #[error("Degenerate RPC grid: {valid} well-conditioned ground points (need {required})")]
    DegenerateRpcGrid { valid: usize, required: usize },

    #[error("Raster has no valid (non-nodata) extent")]
    EmptyFootprint,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image encoding error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Metadata serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Ingestion cancelled")]
    Cancelled,
}

/// Classification of an [`IngestError`], stable across error payloads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    MalformedHeader,
    TruncatedPayload,
    UnsupportedCrs,
    DegenerateRpcGrid,
    EmptyFootprint,
    IoFailure,
    InvalidConfig,
    Cancelled,
}

impl IngestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedHeader(_) => ErrorKind::MalformedHeader,
            Self::TruncatedPayload { .. } => ErrorKind::TruncatedPayload,
            Self::UnsupportedCrs(_) => ErrorKind::UnsupportedCrs,
            Self::DegenerateRpcGrid { .. } => ErrorKind::DegenerateRpcGrid,
            Self::EmptyFootprint => ErrorKind::EmptyFootprint,
            Self::Io(_) | Self::ImageError(_) | Self::Serialization(_) => ErrorKind::IoFailure,
            Self::InvalidConfig(_) => ErrorKind::InvalidConfig,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedHeader => write!(f, "MalformedHeader"),
            Self::TruncatedPayload => write!(f, "TruncatedPayload"),
            Self::UnsupportedCrs => write!(f, "UnsupportedCRS"),
            Self::DegenerateRpcGrid => write!(f, "DegenerateRPCGrid"),
            Self::EmptyFootprint => write!(f, "EmptyFootprint"),
            Self::IoFailure => write!(f, "IOFailure"),
            Self::InvalidConfig => write!(f, "InvalidConfig"),
            Self::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// A failure attributed to the pipeline stage that produced it.
#[derive(Error, Debug)]
#[error("{stage} failed ({kind}): {source}", kind = .source.kind())]
pub struct StageError {
    pub stage: PipelineStage,
    pub source: IngestError,
}

impl StageError {
    pub fn new(stage: PipelineStage, source: IngestError) -> Self {
        Self { stage, source }
    }

    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
