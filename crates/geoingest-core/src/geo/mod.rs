pub mod crs;
pub mod geotransform;
pub mod mercator;

pub use crs::{CrsDefinition, GeodeticTransformer};
pub use geotransform::GeoTransform;
pub use mercator::{BoundingBox, TileRange};
