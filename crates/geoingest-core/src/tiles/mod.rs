pub mod generate;
pub mod pyramid;

pub use generate::{composite_bounds, generate_pyramid, TileOptions};
pub use pyramid::{zoom_range, PyramidLevel, TileCoord, TileImage, TilePyramid};
