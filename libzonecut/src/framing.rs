//! Puzzle framing from a grid of seeds
//!
//! Seeds are laid out on a regular `rows x cols` grid at the cell centers,
//! optionally nudged by a bounded random offset, and grown into zones by a
//! single Euclidean k-means step. Every zone gets its own gray label so the
//! border extractor can outline it.

use image::GrayImage;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::FramingConfig;
use crate::error::{Result, ZoneError};
use crate::kmeans::KMeansEngine;
use crate::metric::DistanceMetric;
use crate::raster::{PixelSample, PixelValue, Raster};

/// Seeds of the starting grid, jittered when `config.randomize` is set.
///
/// Seeds sit at `step / 2 + i * step` on each axis, where `step` is the
/// image size divided by the seed count, and are clamped into the image.
pub fn grid_seeds(image: &Raster, config: &FramingConfig) -> Result<Vec<PixelSample>> {
    config.validate()?;
    image.ensure_not_empty()?;
    let (rows, cols) = (image.rows(), image.cols());
    if config.rows > rows || config.cols > cols {
        return Err(ZoneError::invalid(format!(
            "framing grid {}x{} is denser than the {rows}x{cols} image",
            config.rows, config.cols
        )));
    }

    let (row_step, col_step) = (rows / config.rows, cols / config.cols);
    let mut rng = StdRng::seed_from_u64(config.random_seed);
    let row_tolerance = config.row_tolerance as i64;
    let col_tolerance = config.col_tolerance as i64;

    let mut seeds = Vec::with_capacity(config.rows * config.cols);
    for grid_row in 0..config.rows {
        for grid_col in 0..config.cols {
            let mut row = (row_step / 2 + grid_row * row_step) as i64;
            let mut col = (col_step / 2 + grid_col * col_step) as i64;
            if config.randomize {
                row += rng.random_range(-row_tolerance..=row_tolerance);
                col += rng.random_range(-col_tolerance..=col_tolerance);
            }
            let row = row.clamp(0, rows as i64 - 1) as usize;
            let col = col.clamp(0, cols as i64 - 1) as usize;
            if let Some(sample) = image.sample(row, col) {
                seeds.push(sample);
            }
        }
    }
    Ok(seeds)
}

/// Cut `image` into one zone per grid seed.
///
/// The result is a grayscale label image; zone `i` of `n` is painted with
/// [`zone_label`]. Zones that lose every pixel to a neighbor are absent.
pub fn create_zones(image: &Raster, config: &FramingConfig) -> Result<Raster> {
    let seeds = grid_seeds(image, config)?;
    info!(
        "Framing {}x{} image with a {}x{} seed grid{}",
        image.rows(),
        image.cols(),
        config.rows,
        config.cols,
        if config.randomize { ", jittered" } else { "" }
    );

    let mut engine = KMeansEngine::new(seeds.len(), DistanceMetric::Euclidean, 1)?;
    engine.seed(&seeds);
    engine.run(image)?;

    let cols = image.cols();
    let count = engine.centers().len();
    let mut zones = Raster::new_gray(image.rows(), cols);
    for (index, center) in engine.centers().iter().enumerate() {
        let label = PixelValue::Gray(zone_label(index, count));
        for &idx in center.members() {
            zones.set(idx / cols, idx % cols, label);
        }
    }
    debug!(
        "Framing produced {} non-empty zones",
        engine.centers().iter().filter(|c| c.member_count() > 0).count()
    );
    Ok(zones)
}

/// Gray label of zone `index` out of `count`.
///
/// Labels are non-zero and spread over `1..=255`; they are distinct as long
/// as there are at most 255 zones, otherwise they repeat every 255 zones.
pub fn zone_label(index: usize, count: usize) -> u8 {
    if count <= 255 {
        ((index + 1) * 255 / count) as u8
    } else {
        (index % 255 + 1) as u8
    }
}

/// Blank out the pixels of `image` that lie on the border mask.
///
/// Masked pixels become 0 (transparent black for color images); the mask
/// must have the image's dimensions.
pub fn apply_framing(image: &Raster, borders: &GrayImage) -> Result<Raster> {
    image.ensure_not_empty()?;
    let (width, height) = borders.dimensions();
    if width as usize != image.cols() || height as usize != image.rows() {
        return Err(ZoneError::invalid(format!(
            "border mask is {height}x{width}, image is {}x{}",
            image.rows(),
            image.cols()
        )));
    }

    let mut framed = image.clone();
    for (x, y, pixel) in borders.enumerate_pixels() {
        if pixel[0] != 0 {
            framed.set(y as usize, x as usize, PixelValue::Rgba([0, 0, 0, 0]));
        }
    }
    Ok(framed)
}
