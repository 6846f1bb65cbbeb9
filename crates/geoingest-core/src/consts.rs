/// Small epsilon to avoid division by zero in floating-point comparisons.
pub const EPSILON: f64 = 1e-10;

/// Default lower percentile for the composite linear stretch.
pub const DEFAULT_STRETCH_LOW_PERCENTILE: f32 = 2.0;

/// Default upper percentile for the composite linear stretch.
pub const DEFAULT_STRETCH_HIGH_PERCENTILE: f32 = 98.0;

/// Default edge length of a map tile, in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Smallest tile edge accepted by the tile generator.
pub const MIN_TILE_SIZE: u32 = 8;

/// Finest zoom level the tile generator will ever derive.
pub const MAX_ZOOM_LEVEL: u8 = 24;

/// Default longest edge of the composite thumbnail.
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 256;

/// Samples taken along each source edge when projecting the raster outline.
pub const FOOTPRINT_EDGE_SAMPLES: usize = 20;

/// Ground points per axis in the RPC evaluation grid (11x11 = 121 points).
pub const RPC_GRID_SIZE: usize = 11;

/// Minimum number of well-conditioned ground points for an RPC warp fit.
pub const MIN_RPC_GRID_POINTS: usize = 9;

/// RPC denominators with magnitude below this are treated as singular.
pub const RPC_DENOMINATOR_EPSILON: f64 = 1e-12;

/// Keys cubic convolution parameter (Catmull-Rom for -0.5).
pub const CUBIC_KERNEL_A: f64 = -0.5;

/// Web mercator sphere radius (EPSG:3857), metres.
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Latitude limit of the web mercator square, degrees.
pub const MAX_MERCATOR_LATITUDE: f64 = 85.051_128_779_806_59;

/// Identifier of the raster CRS produced by the reprojector.
pub const WEB_MERCATOR_CRS: &str = "EPSG:3857";

/// Identifier of the geodetic CRS used for footprints.
pub const GEODETIC_CRS: &str = "EPSG:4326";

/// Alpha value written for valid tile pixels.
pub const OPAQUE: u8 = 255;

/// Default number of attempts for a record-store submission.
pub const DEFAULT_STORE_ATTEMPTS: u32 = 3;

/// Default initial backoff between record-store attempts, milliseconds.
pub const DEFAULT_STORE_BACKOFF_MS: u64 = 200;
