//! Hand-off of completed ingestions to an external record store.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::consts::{DEFAULT_STORE_ATTEMPTS, DEFAULT_STORE_BACKOFF_MS};
use crate::metadata::IngestionMetadata;

use super::types::IngestOutput;

/// What the record store receives for one completed ingestion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IngestionRecord {
    pub name: String,
    pub composite_path: PathBuf,
    pub thumbnail_path: Option<PathBuf>,
    pub tile_root_path: PathBuf,
    /// `{tile_root}/{z}/{x}/{y}.png`
    pub tile_url_template: String,
    pub metadata_path: PathBuf,
    pub min_zoom: Option<u8>,
    pub max_zoom: Option<u8>,
    pub metadata: IngestionMetadata,
}

impl From<&IngestOutput> for IngestionRecord {
    fn from(output: &IngestOutput) -> Self {
        Self {
            name: output.metadata.name.clone(),
            composite_path: output.composite_path.clone(),
            thumbnail_path: output.thumbnail_path.clone(),
            tile_root_path: output.tile_root_path.clone(),
            tile_url_template: format!("{}/{{z}}/{{x}}/{{y}}.png", output.tile_root_path.display()),
            metadata_path: output.metadata_path.clone(),
            min_zoom: output.pyramid.min_zoom(),
            max_zoom: output.pyramid.max_zoom(),
            metadata: output.metadata.clone(),
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    /// Worth retrying (timeouts, lock contention, unavailable backend).
    #[error("Transient store failure: {0}")]
    Transient(String),

    #[error("Store rejected record: {0}")]
    Permanent(String),

    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Record serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Io(_))
    }
}

/// Persistence boundary for completed ingestions.
pub trait RecordStore: Send + Sync {
    fn submit(&self, record: &IngestionRecord) -> Result<(), StoreError>;
}

/// Exponential backoff for record submission.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_STORE_ATTEMPTS,
            initial_backoff: Duration::from_millis(DEFAULT_STORE_BACKOFF_MS),
            multiplier: 2.0,
        }
    }
}

/// Submit a record, retrying transient failures. Returns the number of
/// attempts used.
pub fn submit_with_retry(
    store: &dyn RecordStore,
    record: &IngestionRecord,
    policy: &RetryPolicy,
) -> Result<u32, StoreError> {
    let attempts = policy.max_attempts.max(1);
    let mut backoff = policy.initial_backoff;
    let mut attempt = 1;
    loop {
        match store.submit(record) {
            Ok(()) => {
                info!(record = %record.name, attempt, "Record submitted");
                return Ok(attempt);
            }
            Err(e) if e.is_transient() && attempt < attempts => {
                warn!(record = %record.name, attempt, error = %e, ?backoff, "Record submission failed, retrying");
                thread::sleep(backoff);
                backoff = backoff.mul_f64(policy.multiplier);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Appends one JSON record per line to a file.
pub struct JsonLinesStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonLinesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordStore for JsonLinesStore {
    fn submit(&self, record: &IngestionRecord) -> Result<(), StoreError> {
        let line = serde_json::to_string(record)?;
        let _guard = self
            .lock
            .lock()
            .map_err(|_| StoreError::Permanent("record file lock poisoned".into()))?;
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{line}")?;
        Ok(())
    }
}
