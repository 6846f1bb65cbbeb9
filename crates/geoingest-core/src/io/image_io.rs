use std::fs;
use std::path::Path;

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayAlphaImage, ImageFormat, LumaA, Rgba, RgbaImage};
use ndarray::Array2;

use crate::compose::Composite;
use crate::consts::OPAQUE;
use crate::error::Result;
use crate::tiles::TileImage;

/// Composite as an image; nodata pixels are fully transparent.
pub fn composite_image(composite: &Composite) -> DynamicImage {
    let alpha = composite.mask.mapv(|v| if v { OPAQUE } else { 0 });
    to_image(&composite.channels, &alpha)
}

fn to_image(channels: &[Array2<u8>], alpha: &Array2<u8>) -> DynamicImage {
    let (h, w) = alpha.dim();
    if channels.len() == 3 {
        let mut img = RgbaImage::new(w as u32, h as u32);
        for row in 0..h {
            for col in 0..w {
                let px = Rgba([
                    channels[0][[row, col]],
                    channels[1][[row, col]],
                    channels[2][[row, col]],
                    alpha[[row, col]],
                ]);
                img.put_pixel(col as u32, row as u32, px);
            }
        }
        DynamicImage::ImageRgba8(img)
    } else {
        let mut img = GrayAlphaImage::new(w as u32, h as u32);
        for row in 0..h {
            for col in 0..w {
                img.put_pixel(
                    col as u32,
                    row as u32,
                    LumaA([channels[0][[row, col]], alpha[[row, col]]]),
                );
            }
        }
        DynamicImage::ImageLumaA8(img)
    }
}

/// Save the full-resolution composite as PNG.
pub fn save_composite(composite: &Composite, path: &Path) -> Result<()> {
    composite_image(composite).save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Save a downscaled composite whose longest edge is at most `max_edge`.
pub fn save_thumbnail(composite: &Composite, path: &Path, max_edge: u32) -> Result<()> {
    let (w, h) = (composite.width() as u32, composite.height() as u32);
    let scale = (max_edge as f64 / w.max(h) as f64).min(1.0);
    let tw = ((w as f64 * scale).round() as u32).max(1);
    let th = ((h as f64 * scale).round() as u32).max(1);

    let full = composite_image(composite);
    let thumb = if (tw, th) == (w, h) {
        full
    } else {
        DynamicImage::ImageRgba8(imageops::resize(&full.to_rgba8(), tw, th, FilterType::Triangle))
    };
    thumb.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Write a tile, creating its `{z}/{x}` directories.
pub fn save_tile(tile: &TileImage, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    to_image(&tile.channels, &tile.alpha).save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Read a tile back; RGBA files give three channels, anything else one.
pub fn load_tile(path: &Path) -> Result<TileImage> {
    let img = image::open(path)?;
    let (w, h) = (img.width() as usize, img.height() as usize);
    let tile = match img {
        DynamicImage::ImageLumaA8(gray) => TileImage {
            channels: vec![Array2::from_shape_fn((h, w), |(r, c)| {
                gray.get_pixel(c as u32, r as u32).0[0]
            })],
            alpha: Array2::from_shape_fn((h, w), |(r, c)| gray.get_pixel(c as u32, r as u32).0[1]),
        },
        other => {
            let rgba = other.to_rgba8();
            let channel =
                |i: usize| Array2::from_shape_fn((h, w), |(r, c)| rgba.get_pixel(c as u32, r as u32).0[i]);
            TileImage {
                channels: vec![channel(0), channel(1), channel(2)],
                alpha: channel(3),
            }
        }
    };
    Ok(tile)
}
