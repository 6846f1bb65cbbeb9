use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::metadata::IngestionMetadata;
use crate::tiles::TilePyramid;

/// Pipeline processing stage, used for progress reporting and to attribute
/// failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelineStage {
    Loading,
    Classifying,
    Reprojecting,
    Correcting,
    Compositing,
    Tiling,
    Finalizing,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loading => write!(f, "Loading capture"),
            Self::Classifying => write!(f, "Classifying sensor"),
            Self::Reprojecting => write!(f, "Reprojecting"),
            Self::Correcting => write!(f, "Applying RPC correction"),
            Self::Compositing => write!(f, "Composing bands"),
            Self::Tiling => write!(f, "Generating tiles"),
            Self::Finalizing => write!(f, "Writing output"),
        }
    }
}

/// Thread-safe progress reporting for the pipeline.
///
/// Implementors can use this to drive progress bars, logging, or any other
/// UI feedback. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A new pipeline stage has started. `total_items` is the number of
    /// work items in this stage (e.g., tile count), if known.
    fn begin_stage(&self, _stage: PipelineStage, _total_items: Option<usize>) {}

    /// One work item within the current stage has completed.
    fn advance(&self, _items_done: usize) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}
}

/// No-op progress reporter, used when `ingest` delegates.
pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}

/// One raw capture to ingest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capture {
    pub header_path: PathBuf,
    pub payload_path: PathBuf,
    pub sensor_hint: Option<String>,
    /// `KEY: value` RPC sidecar; overrides an `rpc info` block in the header.
    pub rpc_path: Option<PathBuf>,
}

impl Capture {
    pub fn new(header_path: impl Into<PathBuf>, payload_path: impl Into<PathBuf>) -> Self {
        Self {
            header_path: header_path.into(),
            payload_path: payload_path.into(),
            sensor_hint: None,
            rpc_path: None,
        }
    }

    pub fn with_sensor_hint(mut self, hint: impl Into<String>) -> Self {
        self.sensor_hint = Some(hint.into());
        self
    }

    pub fn with_rpc(mut self, path: impl Into<PathBuf>) -> Self {
        self.rpc_path = Some(path.into());
        self
    }

    /// Product name: the header file stem.
    pub fn name(&self) -> String {
        self.header_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "capture".to_string())
    }

    pub fn source_files(&self) -> Vec<String> {
        [Some(&self.header_path), Some(&self.payload_path), self.rpc_path.as_ref()]
            .into_iter()
            .flatten()
            .map(|p| file_name(p))
            .collect()
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Artifacts of a completed ingestion. The caller owns everything on disk.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IngestOutput {
    pub output_dir: PathBuf,
    pub composite_path: PathBuf,
    pub thumbnail_path: Option<PathBuf>,
    pub tile_root_path: PathBuf,
    pub metadata_path: PathBuf,
    pub metadata: IngestionMetadata,
    pub pyramid: TilePyramid,
}
