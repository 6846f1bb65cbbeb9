use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::error::{IngestError, Result, StageError};

use super::cancel::CancelToken;
use super::config::IngestConfig;
use super::orchestrator::ingest_reported;
use super::types::{Capture, IngestOutput, NoOpReporter, PipelineStage};

/// Payload extensions paired with a `.hdr`, in lookup order.
const PAYLOAD_EXTENSIONS: [&str; 5] = ["img", "dat", "raw", "bin", "bsq"];

/// RPC sidecar suffixes looked up next to a header.
const RPC_SUFFIXES: [&str; 2] = ["_rpc.txt", "_RPC.TXT"];

/// Outcome of one capture within a batch.
#[derive(Debug)]
pub struct BatchItemResult {
    pub name: String,
    pub outcome: std::result::Result<IngestOutput, StageError>,
}

impl BatchItemResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Ingest independent captures in parallel. One failure never stops the
/// others; results come back in input order.
///
/// Captures publish to `output_root/<name>`, so a name may appear only once:
/// later captures sharing an earlier capture's name fail without running.
///
/// `on_progress` receives the number of captures finished so far.
pub fn ingest_batch(
    captures: &[Capture],
    config: &IngestConfig,
    cancel: &CancelToken,
    on_progress: impl Fn(usize) + Send + Sync,
) -> Vec<BatchItemResult> {
    let mut seen = HashSet::new();
    let duplicate: Vec<bool> = captures.iter().map(|c| !seen.insert(c.name())).collect();

    let done = AtomicUsize::new(0);
    let results: Vec<BatchItemResult> = captures
        .par_iter()
        .zip(duplicate.par_iter())
        .map(|(capture, &duplicate)| {
            let outcome = if duplicate {
                warn!(header = %capture.header_path.display(), name = %capture.name(), "Duplicate capture name in batch, skipping");
                Err(StageError::new(
                    PipelineStage::Loading,
                    IngestError::InvalidConfig(format!("duplicate capture name '{}' in batch", capture.name())),
                ))
            } else {
                ingest_reported(capture, config, Arc::new(NoOpReporter), cancel)
            };
            on_progress(done.fetch_add(1, Ordering::Relaxed) + 1);
            BatchItemResult {
                name: capture.name(),
                outcome,
            }
        })
        .collect();

    let failed = results.iter().filter(|r| !r.is_success()).count();
    info!(
        total = results.len(),
        succeeded = results.len() - failed,
        failed,
        "Batch finished"
    );
    results
}

/// Find captures in a directory: every `*.hdr` with a payload of the same
/// stem, plus an RPC sidecar when one exists.
pub fn discover_captures(dir: &Path) -> Result<Vec<Capture>> {
    let mut headers: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("hdr"))
        })
        .collect();
    headers.sort();

    let mut captures = Vec::with_capacity(headers.len());
    for header in headers {
        let Some(payload) = PAYLOAD_EXTENSIONS
            .iter()
            .map(|ext| header.with_extension(ext))
            .chain(std::iter::once(header.with_extension("")))
            .find(|p| p.is_file())
        else {
            warn!(header = %header.display(), "No payload found next to header, skipping");
            continue;
        };

        let mut capture = Capture::new(&header, payload);
        let stem = capture.name();
        if let Some(rpc) = RPC_SUFFIXES
            .iter()
            .map(|suffix| dir.join(format!("{stem}{suffix}")))
            .find(|p| p.is_file())
        {
            capture = capture.with_rpc(rpc);
        }
        captures.push(capture);
    }
    info!(dir = %dir.display(), captures = captures.len(), "Discovered captures");
    Ok(captures)
}
