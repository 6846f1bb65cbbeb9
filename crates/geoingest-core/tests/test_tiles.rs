use std::sync::atomic::{AtomicUsize, Ordering};

use ndarray::Array2;
use tempfile::TempDir;

use geoingest_core::compose::Composite;
use geoingest_core::error::ErrorKind;
use geoingest_core::geo::GeoTransform;
use geoingest_core::io::image_io::load_tile;
use geoingest_core::tiles::{
    composite_bounds, generate_pyramid, zoom_range, TileCoord, TileImage, TileOptions, TilePyramid,
};
use geoingest_core::warp::ResamplingMethod;

const TILE: u32 = 64;
const PIXEL: f64 = 10.0;

/// 64x64 composite at 10 m in web mercator, filled with `value`.
fn composite(channels: usize, value: u8) -> Composite {
    Composite {
        channels: vec![Array2::from_elem((64, 64), value); channels],
        mask: Array2::from_elem((64, 64), true),
        geotransform: GeoTransform::north_up(1000.0, 3000.0, PIXEL, -PIXEL),
        crs: Some("EPSG:3857".into()),
        stretches: Vec::new(),
        bands: (0..channels).collect(),
    }
}

fn options(min_zoom: u8, max_zoom: u8) -> TileOptions {
    TileOptions {
        tile_size: TILE,
        min_zoom,
        max_zoom,
        method: ResamplingMethod::Bilinear,
        max_workers: 0,
    }
}

fn auto_options(composite: &Composite) -> TileOptions {
    let (min, max) = zoom_range(&composite_bounds(composite), PIXEL, TILE, None, None).unwrap();
    options(min, max)
}

#[test]
fn test_zoom_range_follows_resolution_and_extent() {
    let c = composite(3, 10);
    let bbox = composite_bounds(&c);
    // z15 is ~19 m/px at 64 px tiles, z16 ~9.6 m/px; z13 is the finest
    // level whose single tile holds the whole extent.
    assert_eq!(zoom_range(&bbox, PIXEL, TILE, None, None).unwrap(), (13, 15));
    assert_eq!(zoom_range(&bbox, PIXEL, TILE, Some(10), Some(12)).unwrap(), (10, 12));
    assert_eq!(zoom_range(&bbox, PIXEL, TILE, None, Some(11)).unwrap(), (11, 11));

    let err = zoom_range(&bbox, PIXEL, TILE, None, Some(30)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidConfig);
    let err = zoom_range(&bbox, PIXEL, TILE, Some(14), Some(12)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidConfig);
}

fn assert_consistent(pyramid: &TilePyramid) {
    let min = pyramid.min_zoom().unwrap();
    let max = pyramid.max_zoom().unwrap();
    let zooms: Vec<u8> = pyramid.levels.iter().map(|l| l.zoom).collect();
    assert_eq!(zooms, (min..=max).collect::<Vec<_>>());

    for level in &pyramid.levels {
        assert!(!level.tiles.is_empty(), "zoom {} is empty", level.zoom);
        for tile in &level.tiles {
            let path = tile.path(&pyramid.root);
            assert!(path.is_file(), "missing {}", path.display());
            if level.zoom > min {
                let parent = tile.parent().unwrap();
                let coarser = pyramid.level(level.zoom - 1).unwrap();
                assert!(coarser.tiles.contains(&parent), "{tile} has no parent");
            }
        }
    }
}

#[test]
fn test_pyramid_is_complete_and_consistent() {
    let dir = TempDir::new().unwrap();
    let c = composite(3, 77);
    let opts = auto_options(&c);
    let pyramid = generate_pyramid(&c, dir.path(), &opts, |_| {}).unwrap();

    assert_eq!(pyramid.min_zoom(), Some(13));
    assert_eq!(pyramid.max_zoom(), Some(15));
    assert_eq!(pyramid.level(13).unwrap().tiles.len(), 1);
    assert!(pyramid.level(15).unwrap().tiles.len() > 1);
    assert_consistent(&pyramid);
}

#[test]
fn test_tiles_carry_composite_values_and_transparency() {
    let dir = TempDir::new().unwrap();
    let c = composite(3, 77);
    let pyramid = generate_pyramid(&c, dir.path(), &auto_options(&c), |_| {}).unwrap();

    for level in &pyramid.levels {
        for coord in &level.tiles {
            let tile = load_tile(&coord.path(&pyramid.root)).unwrap();
            assert_eq!(tile.size(), TILE as usize);
            assert_eq!(tile.channels.len(), 3);
            assert!(tile.has_valid_pixel());
            for ((r, c), &a) in tile.alpha.indexed_iter() {
                if a == 255 {
                    assert_eq!(tile.channels[0][[r, c]], 77, "{coord} at ({r}, {c})");
                }
            }
        }
    }
    // The composite covers a small corner of the single coarsest tile.
    let top = pyramid.level(13).unwrap().tiles[0];
    let tile = load_tile(&top.path(&pyramid.root)).unwrap();
    assert!(tile.alpha.iter().any(|&a| a == 0));
}

/// 64x64 composite whose channels vary across the scene and from each other.
fn ramp_composite() -> Composite {
    let channel = |k: usize| Array2::from_shape_fn((64, 64), |(r, c)| ((r * 3 + c * 2 + k * 40) % 256) as u8);
    Composite {
        channels: vec![channel(0), channel(1), channel(2)],
        ..composite(3, 0)
    }
}

fn load(pyramid: &TilePyramid, coord: TileCoord) -> Option<TileImage> {
    let level = pyramid.level(coord.z)?;
    level
        .tiles
        .contains(&coord)
        .then(|| load_tile(&coord.path(&pyramid.root)).unwrap())
}

#[test]
fn test_parent_tiles_average_their_children() {
    let dir = TempDir::new().unwrap();
    let c = ramp_composite();
    let pyramid = generate_pyramid(&c, dir.path(), &options(13, 15), |_| {}).unwrap();
    let size = TILE as usize;
    let half = size / 2;

    let mut checked = 0;
    for zoom in 13..15 {
        for &coord in &pyramid.level(zoom).unwrap().tiles {
            let parent = load(&pyramid, coord).unwrap();
            let children: Vec<Option<TileImage>> = coord.children().iter().map(|&ch| load(&pyramid, ch)).collect();

            for (quadrant, child) in children.iter().enumerate() {
                let (row0, col0) = ((quadrant / 2) * half, (quadrant % 2) * half);
                for r in 0..half {
                    for col in 0..half {
                        let (pr, pc) = (row0 + r, col0 + col);
                        let valid: Vec<(usize, usize)> = match child {
                            Some(child) => [(0, 0), (0, 1), (1, 0), (1, 1)]
                                .iter()
                                .map(|&(dr, dc)| (2 * r + dr, 2 * col + dc))
                                .filter(|&(sr, sc)| child.is_valid(sr, sc))
                                .collect(),
                            None => Vec::new(),
                        };
                        assert_eq!(parent.is_valid(pr, pc), !valid.is_empty(), "{coord} at ({pr}, {pc})");
                        let Some(child) = child.as_ref().filter(|_| !valid.is_empty()) else {
                            continue;
                        };
                        let n = valid.len() as u32;
                        for (k, channel) in parent.channels.iter().enumerate() {
                            let sum: u32 = valid.iter().map(|&p| child.channels[k][p] as u32).sum();
                            assert_eq!(channel[[pr, pc]] as u32, (sum + n / 2) / n, "{coord} channel {k} at ({pr}, {pc})");
                        }
                        checked += 1;
                    }
                }
            }
        }
    }
    assert!(checked > 0);
}

#[test]
fn test_native_tiles_keep_channels_apart() {
    let dir = TempDir::new().unwrap();
    let c = Composite {
        channels: vec![
            Array2::from_elem((64, 64), 10),
            Array2::from_elem((64, 64), 20),
            Array2::from_elem((64, 64), 30),
        ],
        ..composite(3, 0)
    };
    let pyramid = generate_pyramid(&c, dir.path(), &options(15, 15), |_| {}).unwrap();

    let mut valid = 0;
    for coord in &pyramid.level(15).unwrap().tiles {
        let tile = load_tile(&coord.path(&pyramid.root)).unwrap();
        for ((r, col), &a) in tile.alpha.indexed_iter() {
            if a == 255 {
                let rgb: Vec<u8> = tile.channels.iter().map(|ch| ch[[r, col]]).collect();
                assert_eq!(rgb, [10, 20, 30], "{coord} at ({r}, {col})");
                valid += 1;
            }
        }
    }
    assert!(valid > 0);
}

#[test]
fn test_grayscale_tiles_have_one_channel() {
    let dir = TempDir::new().unwrap();
    let c = composite(1, 200);
    let pyramid = generate_pyramid(&c, dir.path(), &options(14, 14), |_| {}).unwrap();
    let coord = pyramid.level(14).unwrap().tiles[0];
    let tile = load_tile(&coord.path(&pyramid.root)).unwrap();
    assert_eq!(tile.channels.len(), 1);
}

#[test]
fn test_progress_counts_every_tile() {
    let dir = TempDir::new().unwrap();
    let c = composite(3, 5);
    let last = AtomicUsize::new(0);
    let pyramid = generate_pyramid(&c, dir.path(), &auto_options(&c), |done| {
        last.fetch_max(done, Ordering::Relaxed);
    })
    .unwrap();
    assert!(last.load(Ordering::Relaxed) >= pyramid.tile_count());
}

#[test]
fn test_dedicated_worker_pool_matches_global_pool() {
    let c = composite(3, 5);
    let a = TempDir::new().unwrap();
    let b = TempDir::new().unwrap();
    let global = generate_pyramid(&c, a.path(), &auto_options(&c), |_| {}).unwrap();
    let pooled = generate_pyramid(
        &c,
        b.path(),
        &TileOptions {
            max_workers: 2,
            ..auto_options(&c)
        },
        |_| {},
    )
    .unwrap();
    assert_eq!(global.levels, pooled.levels);
}

#[test]
fn test_empty_composite_has_no_footprint() {
    let dir = TempDir::new().unwrap();
    let mut c = composite(3, 5);
    c.mask.fill(false);
    let err = generate_pyramid(&c, dir.path(), &options(13, 15), |_| {}).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EmptyFootprint);
}

#[test]
fn test_tile_size_must_be_power_of_two() {
    let dir = TempDir::new().unwrap();
    let c = composite(3, 5);
    let err = generate_pyramid(
        &c,
        dir.path(),
        &TileOptions {
            tile_size: 100,
            ..options(13, 15)
        },
        |_| {},
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidConfig);
}
