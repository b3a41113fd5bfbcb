use std::collections::HashMap;

use image::{GrayImage, Luma};
use zonecut::border::zone_borders;
use zonecut::framing::{grid_seeds, zone_label};
use zonecut::*;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn grid(rows: usize, cols: usize) -> FramingConfig {
    FramingConfig {
        rows,
        cols,
        randomize: false,
        ..FramingConfig::default()
    }
}

fn photo(rows: usize, cols: usize) -> Raster {
    Raster::from_rgb_fn(rows, cols, |row, col| [(row * 7) as u8, (col * 5) as u8, 60])
}

#[test]
fn test_grid_seeds_sit_at_cell_centers() {
    let seeds = grid_seeds(&photo(36, 45), &grid(4, 3)).unwrap();

    let coords: Vec<(usize, usize)> = seeds.iter().map(|s| (s.row, s.col)).collect();
    assert_eq!(coords.len(), 12);
    assert_eq!(&coords[..3], &[(4, 7), (4, 22), (4, 37)]);
    assert_eq!(coords[11], (31, 37));
}

#[test]
fn test_centered_grid_gives_equal_cells() {
    init_logging();
    let zones = create_zones(&photo(36, 45), &grid(4, 3)).unwrap();
    assert_eq!(zones.kind(), RasterKind::Gray);

    let mut sizes: HashMap<PixelValue, usize> = HashMap::new();
    for sample in zones.samples() {
        *sizes.entry(sample.value).or_default() += 1;
    }
    assert_eq!(sizes.len(), 12);
    assert!(sizes.values().all(|&size| size == 9 * 15), "{sizes:?}");

    // Cell (1, 1) spans rows 9..18 and cols 15..30
    let label = PixelValue::Gray(zone_label(4, 12));
    assert_eq!(zones.get(9, 15), Some(label));
    assert_eq!(zones.get(17, 29), Some(label));
    assert_ne!(zones.get(8, 15), Some(label));
    assert_ne!(zones.get(9, 30), Some(label));
}

#[test]
fn test_zone_labels_are_distinct_and_non_zero() {
    for count in [1, 2, 12, 100, 255] {
        let labels: Vec<u8> = (0..count).map(|i| zone_label(i, count)).collect();
        assert!(labels.iter().all(|&l| l > 0));
        assert!(labels.windows(2).all(|w| w[0] < w[1]));
    }
    assert_eq!(zone_label(0, 300), zone_label(255, 300));
}

#[test]
fn test_jittered_seeds_stay_within_tolerance() {
    let config = FramingConfig {
        rows: 3,
        cols: 3,
        randomize: true,
        row_tolerance: 2,
        col_tolerance: 3,
        random_seed: 11,
    };
    let image = photo(30, 30);
    let plain = grid_seeds(&image, &grid(3, 3)).unwrap();
    let jittered = grid_seeds(&image, &config).unwrap();

    assert_eq!(jittered.len(), plain.len());
    for (seed, center) in jittered.iter().zip(&plain) {
        assert!(seed.row.abs_diff(center.row) <= 2);
        assert!(seed.col.abs_diff(center.col) <= 3);
        assert_eq!(Some(seed.value), image.get(seed.row, seed.col));
    }
    assert_eq!(grid_seeds(&image, &config).unwrap(), jittered);
}

#[test]
fn test_jitter_is_clamped_into_image() {
    let config = FramingConfig {
        rows: 2,
        cols: 2,
        randomize: true,
        row_tolerance: 500,
        col_tolerance: 500,
        random_seed: 3,
    };
    let seeds = grid_seeds(&photo(10, 12), &config).unwrap();
    assert!(seeds.iter().all(|s| s.row < 10 && s.col < 12));

    let zones = create_zones(&photo(10, 12), &config).unwrap();
    assert!(zones.samples().all(|s| s.value != PixelValue::Gray(0)));
}

#[test]
fn test_invalid_grids_are_rejected() {
    let image = photo(8, 8);
    for config in [grid(0, 2), grid(2, 0), grid(9, 2), grid(2, 9)] {
        let err = create_zones(&image, &config).unwrap_err();
        assert!(matches!(err, ZoneError::InvalidConfiguration(_)), "{config:?}");
    }
    let err = create_zones(&Raster::new_gray(0, 8), &grid(1, 1)).unwrap_err();
    assert!(matches!(err, ZoneError::InvalidConfiguration(_)));
}

#[test]
fn test_apply_framing_blanks_border_pixels() {
    let image = photo(36, 45);
    let zones = create_zones(&image, &grid(4, 3)).unwrap();
    let mask = zone_borders(
        &zones,
        &BorderConfig {
            threshold: 0,
            neighborhood_size: 1,
        },
    );

    let framed = apply_framing(&image, &mask).unwrap();
    assert_eq!(framed.kind(), RasterKind::Rgba);
    // Rows 8 and 9 separate the first two seed rows
    assert_eq!(framed.get(8, 3), Some(PixelValue::Rgba([0, 0, 0, 0])));
    assert_eq!(framed.get(9, 3), Some(PixelValue::Rgba([0, 0, 0, 0])));
    assert_eq!(framed.get(4, 7), image.get(4, 7));
    assert_eq!(framed.get(31, 37), image.get(31, 37));
}

#[test]
fn test_apply_framing_rejects_mismatched_mask() {
    let image = Raster::from_gray_fn(4, 4, |_, _| 90);
    let mask = GrayImage::from_pixel(5, 4, Luma([255]));
    let err = apply_framing(&image, &mask).unwrap_err();
    assert!(matches!(err, ZoneError::InvalidConfiguration(_)));

    let mask = GrayImage::from_pixel(4, 4, Luma([0]));
    assert_eq!(apply_framing(&image, &mask).unwrap(), image);
}
