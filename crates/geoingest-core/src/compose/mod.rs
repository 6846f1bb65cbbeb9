pub mod composite;
pub mod stretch;

pub use composite::{compose, Composite, CompositeConfig};
pub use stretch::{percentile_bounds, stretch_band, StretchParams};
