pub mod compose;
pub mod consts;
pub mod error;
pub mod geo;
pub mod io;
pub mod metadata;
pub mod pipeline;
pub mod raster;
pub mod sensor;
pub mod tiles;
pub mod warp;

pub use error::{ErrorKind, IngestError, Result, StageError};
pub use pipeline::{ingest, ingest_batch, Capture, IngestConfig, IngestOutput};
