//! Zone boundary extraction
//!
//! A pixel lies on a border when some pixel in its square neighborhood
//! differs from it by more than the threshold. Works on any zone image; color
//! zone images are compared by luma.

use image::{GrayImage, Luma};

use crate::config::BorderConfig;
use crate::raster::Raster;

/// Mask value of border pixels
pub const BORDER_VALUE: u8 = 255;

/// Binary mask of the zone boundaries in `image`.
///
/// Border pixels are [`BORDER_VALUE`], all others `0`. The neighborhood is
/// clipped at the image edges; an empty image yields an empty mask.
pub fn get_borders(image: &GrayImage, threshold: u8, neighborhood_size: usize) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut mask = GrayImage::new(width, height);
    for row in 0..height as usize {
        for col in 0..width as usize {
            if is_border(image, row, col, threshold, neighborhood_size) {
                mask.put_pixel(col as u32, row as u32, Luma([BORDER_VALUE]));
            }
        }
    }
    mask
}

/// Whether `(row, col)` has a neighbor outside `value ± threshold`.
///
/// Coordinates outside the image are never borders.
pub fn is_border(
    image: &GrayImage,
    row: usize,
    col: usize,
    threshold: u8,
    neighborhood_size: usize,
) -> bool {
    let (width, height) = (image.width() as usize, image.height() as usize);
    if row >= height || col >= width {
        return false;
    }

    let value = i16::from(image.get_pixel(col as u32, row as u32)[0]);
    let threshold = i16::from(threshold);

    let (row_first, row_last) = (
        row.saturating_sub(neighborhood_size),
        row.saturating_add(neighborhood_size).min(height - 1),
    );
    let (col_first, col_last) = (
        col.saturating_sub(neighborhood_size),
        col.saturating_add(neighborhood_size).min(width - 1),
    );

    (row_first..=row_last).any(|r| {
        (col_first..=col_last).any(|c| {
            let neighbor = i16::from(image.get_pixel(c as u32, r as u32)[0]);
            neighbor > value + threshold || neighbor < value - threshold
        })
    })
}

/// Border mask of a zone raster, reducing color to luma first
pub fn zone_borders(zones: &Raster, config: &BorderConfig) -> GrayImage {
    get_borders(&zones.to_gray(), config.threshold, config.neighborhood_size)
}
