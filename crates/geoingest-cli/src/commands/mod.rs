pub mod batch;
pub mod config;
pub mod info;
pub mod ingest;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use geoingest_core::pipeline::{IngestConfig, JsonLinesStore, RetryPolicy};
use geoingest_core::pipeline::{submit_with_retry, IngestOutput, IngestionRecord};

/// Load a TOML config, or the defaults when no path is given. `out`
/// overrides the configured output root.
pub fn load_config(path: Option<&Path>, out: Option<&PathBuf>) -> Result<IngestConfig> {
    let mut config: IngestConfig = match path {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            toml::from_str(&contents).context("Invalid ingestion config")?
        }
        None => IngestConfig::default(),
    };
    if let Some(out) = out {
        config.output_root = out.clone();
    }
    config.validate()?;
    Ok(config)
}

/// Append a completed ingestion to a JSON-lines record file.
pub fn record_output(records: &Path, output: &IngestOutput) -> Result<()> {
    let store = JsonLinesStore::new(records);
    let record = IngestionRecord::from(output);
    submit_with_retry(&store, &record, &RetryPolicy::default())
        .with_context(|| format!("Failed to record {} in {}", record.name, records.display()))?;
    Ok(())
}
