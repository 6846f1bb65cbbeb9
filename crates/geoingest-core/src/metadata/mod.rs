pub mod extract;
pub mod footprint;

pub use extract::{acquisition_date, extract_metadata, CaptureFacts, IngestionMetadata};
pub use footprint::{valid_data_footprint, Footprint};
