pub mod artifacts;
pub mod batch;
pub mod cancel;
pub mod config;
mod orchestrator;
pub mod record_store;
pub mod state;
mod types;

pub use batch::{discover_captures, ingest_batch, BatchItemResult};
pub use cancel::CancelToken;
pub use config::IngestConfig;
pub use orchestrator::{ingest, ingest_reported, Ingestion};
pub use record_store::{
    submit_with_retry, IngestionRecord, JsonLinesStore, RecordStore, RetryPolicy, StoreError,
};
pub use state::{IngestState, StateName};
pub use types::{Capture, IngestOutput, NoOpReporter, PipelineStage, ProgressReporter};
