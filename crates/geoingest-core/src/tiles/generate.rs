use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use tracing::{debug, info};

use crate::compose::Composite;
use crate::consts::OPAQUE;
use crate::error::{IngestError, Result};
use crate::geo::{BoundingBox, TileRange};
use crate::io::image_io::save_tile;
use crate::warp::{sample, ResamplingMethod};

use super::pyramid::{validate_tile_size, PyramidLevel, TileCoord, TileImage, TilePyramid};

/// Tiling parameters for one pyramid.
#[derive(Clone, Copy, Debug)]
pub struct TileOptions {
    pub tile_size: u32,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub method: ResamplingMethod,
    /// Worker threads for per-tile work; 0 uses the global rayon pool.
    pub max_workers: usize,
}

/// Mercator extent of a composite on the web mercator grid.
pub fn composite_bounds(composite: &Composite) -> BoundingBox {
    let (minx, miny, maxx, maxy) = composite
        .geotransform
        .bounds(composite.width(), composite.height());
    BoundingBox::new(minx, miny, maxx, maxy)
}

/// Build and write the tile pyramid of a web mercator composite.
///
/// The finest level is resampled from the composite; every coarser level is
/// 2x2-averaged from the level below. Tiles without a valid pixel are not
/// written. `on_progress` receives the running count of finished tiles.
pub fn generate_pyramid(
    composite: &Composite,
    root: &Path,
    options: &TileOptions,
    on_progress: impl Fn(usize) + Send + Sync,
) -> Result<TilePyramid> {
    validate_tile_size(options.tile_size)?;
    if !composite.has_valid_pixel() {
        return Err(IngestError::EmptyFootprint);
    }
    if options.min_zoom > options.max_zoom {
        return Err(IngestError::InvalidConfig(format!(
            "min zoom {} is greater than max zoom {}",
            options.min_zoom, options.max_zoom
        )));
    }

    let run = || build_levels(composite, root, options, &on_progress);
    if options.max_workers == 0 {
        return run();
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.max_workers)
        .build()
        .map_err(|e| IngestError::InvalidConfig(format!("cannot build tile worker pool: {e}")))?;
    pool.install(run)
}

fn build_levels(
    composite: &Composite,
    root: &Path,
    options: &TileOptions,
    on_progress: &(impl Fn(usize) + Send + Sync),
) -> Result<TilePyramid> {
    let bbox = composite_bounds(composite);
    let size = options.tile_size as usize;
    let done = AtomicUsize::new(0);
    let tick = || on_progress(done.fetch_add(1, Ordering::Relaxed) + 1);

    let range = TileRange::covering(&bbox, options.max_zoom);
    let coords: Vec<TileCoord> = range
        .iter()
        .map(|(x, y)| TileCoord::new(options.max_zoom, x, y))
        .collect();
    let mut current: HashMap<TileCoord, TileImage> = coords
        .par_iter()
        .filter_map(|&coord| {
            let tile = render_native_tile(composite, coord, size, options.method);
            tick();
            tile.map(|t| (coord, t))
        })
        .collect();
    write_level(&current, root)?;

    let mut levels = vec![level_of(options.max_zoom, &current)];
    debug!(zoom = options.max_zoom, tiles = current.len(), "Rendered native level");

    for zoom in (options.min_zoom..options.max_zoom).rev() {
        let parents: BTreeSet<TileCoord> = current.keys().filter_map(TileCoord::parent).collect();
        let next: HashMap<TileCoord, TileImage> = parents
            .into_par_iter()
            .filter_map(|parent| {
                let children = parent.children().map(|c| current.get(&c));
                let tile = downsample_children(&children, size, composite.channels.len());
                tick();
                tile.has_valid_pixel().then_some((parent, tile))
            })
            .collect();
        write_level(&next, root)?;
        levels.push(level_of(zoom, &next));
        debug!(zoom, tiles = next.len(), "Averaged overview level");
        current = next;
    }
    levels.reverse();

    let pyramid = TilePyramid {
        tile_size: options.tile_size,
        root: root.to_path_buf(),
        levels,
    };
    info!(
        min_zoom = options.min_zoom,
        max_zoom = options.max_zoom,
        tiles = pyramid.tile_count(),
        "Generated tile pyramid"
    );
    Ok(pyramid)
}

fn level_of(zoom: u8, tiles: &HashMap<TileCoord, TileImage>) -> PyramidLevel {
    let mut coords: Vec<TileCoord> = tiles.keys().copied().collect();
    coords.sort();
    PyramidLevel { zoom, tiles: coords }
}

fn write_level(tiles: &HashMap<TileCoord, TileImage>, root: &Path) -> Result<()> {
    tiles
        .par_iter()
        .try_for_each(|(coord, tile)| save_tile(tile, &coord.path(root)))
}

/// Resample the composite into one tile; `None` when no pixel is valid.
fn render_native_tile(
    composite: &Composite,
    coord: TileCoord,
    size: usize,
    method: ResamplingMethod,
) -> Option<TileImage> {
    let inverse = composite.geotransform.invert()?;
    let bounds = coord.bounds();
    let step = bounds.width() / size as f64;
    let is_valid = |r: usize, c: usize| composite.mask[[r, c]];

    let mut tile = TileImage::empty(size, composite.channels.len());
    for row in 0..size {
        let my = bounds.maxy - (row as f64 + 0.5) * step;
        for col in 0..size {
            let mx = bounds.minx + (col as f64 + 0.5) * step;
            let (sc, sr) = inverse.apply(mx, my);
            // Channels share one mask, so a pixel is valid for all or none.
            let mut valid = true;
            for (out, ch) in tile.channels.iter_mut().zip(&composite.channels) {
                match sample(ch.view(), sc, sr, method, is_valid) {
                    Some(v) => out[[row, col]] = v.round().clamp(0.0, 255.0) as u8,
                    None => {
                        valid = false;
                        break;
                    }
                }
            }
            if valid {
                tile.alpha[[row, col]] = OPAQUE;
            }
        }
    }
    tile.has_valid_pixel().then_some(tile)
}

/// Build a parent tile from its four children (NW, NE, SW, SE; missing
/// children count as nodata) by averaging valid pixels of each 2x2 block.
pub fn downsample_children(children: &[Option<&TileImage>; 4], size: usize, channel_count: usize) -> TileImage {
    let half = size / 2;
    let mut out = TileImage::empty(size, channel_count);
    for (quadrant, child) in children.iter().enumerate() {
        let Some(child) = child else { continue };
        let (row0, col0) = ((quadrant / 2) * half, (quadrant % 2) * half);
        for r in 0..half {
            for c in 0..half {
                let mut sums = vec![0u32; channel_count];
                let mut n = 0u32;
                for (dr, dc) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
                    let (sr, sc) = (2 * r + dr, 2 * c + dc);
                    if child.is_valid(sr, sc) {
                        for (sum, ch) in sums.iter_mut().zip(&child.channels) {
                            *sum += ch[[sr, sc]] as u32;
                        }
                        n += 1;
                    }
                }
                if n == 0 {
                    continue;
                }
                for (channel, sum) in out.channels.iter_mut().zip(&sums) {
                    channel[[row0 + r, col0 + c]] = ((sum + n / 2) / n) as u8;
                }
                out.alpha[[row0 + r, col0 + c]] = OPAQUE;
            }
        }
    }
    out
}
