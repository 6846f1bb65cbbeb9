pub mod reproject;
pub mod resample;
pub mod rpc_correct;

pub use reproject::reproject;
pub use resample::{sample, warp_raster, ResamplingMethod, WarpMap};
pub use rpc_correct::{correct, SourceGeoref};
