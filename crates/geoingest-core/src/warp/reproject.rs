use tracing::info;

use crate::consts::{EPSILON, FOOTPRINT_EDGE_SAMPLES, WEB_MERCATOR_CRS};
use crate::error::{IngestError, Result};
use crate::geo::{BoundingBox, CrsDefinition, GeoTransform, GeodeticTransformer};
use crate::raster::RasterBuffer;

use super::resample::{warp_raster, ResamplingMethod, WarpMap};

/// Points along the outline of a `width x height` pixel grid, corners included.
pub fn outline_pixels(width: usize, height: usize, per_edge: usize) -> Vec<(f64, f64)> {
    let (w, h) = (width as f64, height as f64);
    let n = per_edge.max(1);
    let mut points = Vec::with_capacity(4 * n);
    for i in 0..n {
        let t = i as f64 / n as f64;
        points.push((t * w, 0.0));
        points.push((w, t * h));
        points.push((w - t * w, h));
        points.push((0.0, h - t * h));
    }
    points
}

/// Mercator bounds of a raster, found by projecting its densified outline.
pub fn mercator_bounds(
    geotransform: &GeoTransform,
    width: usize,
    height: usize,
    transformer: &GeodeticTransformer,
) -> Option<BoundingBox> {
    let mut bbox = BoundingBox::new(f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
    let mut any = false;
    for (col, row) in outline_pixels(width, height, FOOTPRINT_EDGE_SAMPLES) {
        let (x, y) = geotransform.apply(col, row);
        if let Some((mx, my)) = transformer.to_mercator(x, y) {
            bbox.minx = bbox.minx.min(mx);
            bbox.miny = bbox.miny.min(my);
            bbox.maxx = bbox.maxx.max(mx);
            bbox.maxy = bbox.maxy.max(my);
            any = true;
        }
    }
    (any && bbox.width() > 0.0 && bbox.height() > 0.0).then_some(bbox)
}

/// Reproject a raster to north-up web mercator.
///
/// The output grid spans the projected footprint and keeps the source
/// pixel count along the extent diagonal, so ground sample distance is
/// approximately preserved.
pub fn reproject(source: &RasterBuffer, method: ResamplingMethod) -> Result<RasterBuffer> {
    let crs_id = source
        .crs
        .as_deref()
        .ok_or_else(|| IngestError::UnsupportedCrs("capture carries no CRS".into()))?;
    let transformer = CrsDefinition::resolve(crs_id)?.transformer()?;
    let inverse = source.geotransform.invert().ok_or_else(|| {
        IngestError::MalformedHeader("source geotransform is not invertible".into())
    })?;

    let (w, h) = (source.width(), source.height());
    let bbox = mercator_bounds(&source.geotransform, w, h, &transformer).ok_or_else(|| {
        IngestError::UnsupportedCrs(format!("extent of {crs_id} raster cannot be projected to web mercator"))
    })?;

    let source_diagonal = (w as f64).hypot(h as f64);
    let pixel_size = bbox.width().hypot(bbox.height()) / source_diagonal;
    let out_w = ((bbox.width() / pixel_size - EPSILON).ceil() as usize).max(1);
    let out_h = ((bbox.height() / pixel_size - EPSILON).ceil() as usize).max(1);
    let geotransform = GeoTransform::north_up(bbox.minx, bbox.maxy, pixel_size, -pixel_size);

    let map = WarpMap::from_fn(out_w, out_h, |col, row| {
        let (mx, my) = geotransform.apply(col, row);
        let (x, y) = transformer.from_mercator(mx, my)?;
        Some(inverse.apply(x, y))
    });

    info!(
        source_crs = crs_id,
        source_size = %format!("{w}x{h}"),
        output_size = %format!("{out_w}x{out_h}"),
        pixel_size,
        %method,
        "Reprojected to web mercator"
    );
    warp_raster(source, &map, method, geotransform, Some(WEB_MERCATOR_CRS.to_string()))
}
