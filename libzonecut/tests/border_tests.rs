use image::{GrayImage, Luma};
use zonecut::border::{zone_borders, BORDER_VALUE};
use zonecut::*;

fn marked(mask: &GrayImage, row: u32, col: u32) -> bool {
    mask.get_pixel(col, row)[0] == BORDER_VALUE
}

#[test]
fn test_constant_image_has_no_borders() {
    let image = GrayImage::from_pixel(9, 6, Luma([77]));
    let mask = get_borders(&image, 0, 2);
    assert_eq!(mask.dimensions(), (9, 6));
    assert!(mask.pixels().all(|p| p[0] == 0));
}

#[test]
fn test_single_pixel_marks_its_neighborhood() {
    let mut image = GrayImage::from_pixel(11, 11, Luma([40]));
    image.put_pixel(5, 5, Luma([90]));

    let radius = 2;
    let mask = get_borders(&image, 0, radius);
    for row in 0..11u32 {
        for col in 0..11u32 {
            let near = row.abs_diff(5) <= radius as u32 && col.abs_diff(5) <= radius as u32;
            assert_eq!(marked(&mask, row, col), near, "pixel ({row}, {col})");
        }
    }
}

#[test]
fn test_threshold_tolerates_small_differences() {
    let mut image = GrayImage::from_pixel(5, 5, Luma([100]));
    image.put_pixel(2, 2, Luma([110]));

    assert!(get_borders(&image, 10, 1).pixels().all(|p| p[0] == 0));
    assert!(marked(&get_borders(&image, 9, 1), 2, 2));
}

#[test]
fn test_neighborhood_is_clipped_at_edges() {
    let mut image = GrayImage::from_pixel(4, 4, Luma([0]));
    image.put_pixel(0, 0, Luma([255]));

    let mask = get_borders(&image, 0, 1);
    assert!(marked(&mask, 0, 0));
    assert!(marked(&mask, 1, 1));
    assert!(!marked(&mask, 2, 2));
    assert!(!marked(&mask, 3, 3));
}

#[test]
fn test_zero_radius_marks_nothing() {
    let mut image = GrayImage::from_pixel(3, 3, Luma([0]));
    image.put_pixel(1, 1, Luma([255]));
    assert!(get_borders(&image, 0, 0).pixels().all(|p| p[0] == 0));
}

#[test]
fn test_out_of_bounds_is_never_a_border() {
    let image = GrayImage::from_pixel(3, 3, Luma([0]));
    assert!(!is_border(&image, 3, 0, 0, 2));
    assert!(!is_border(&image, 0, 7, 0, 2));
}

#[test]
fn test_empty_image_gives_empty_mask() {
    let mask = get_borders(&GrayImage::new(0, 0), 0, 2);
    assert_eq!(mask.dimensions(), (0, 0));
}

#[test]
fn test_borders_of_clustered_zones() {
    let image = Raster::from_gray_fn(8, 8, |_, col| if col < 4 { 0 } else { 255 });
    let mut engine = KMeansEngine::new(2, DistanceMetric::Svd, 10).unwrap();
    engine.seed(&[
        PixelSample::new(0, 0, PixelValue::Gray(0)),
        PixelSample::new(0, 7, PixelValue::Gray(255)),
    ]);
    let zones = engine.run(&image).unwrap();

    let mask = zone_borders(&zones, &BorderConfig::default());
    for row in 0..8u32 {
        for col in 0..8u32 {
            assert_eq!(marked(&mask, row, col), (2..=5).contains(&col), "pixel ({row}, {col})");
        }
    }
}

#[test]
fn test_color_zones_are_compared_by_luma() {
    let zones = Raster::from_rgb_fn(4, 6, |_, col| if col < 3 { [255, 0, 0] } else { [0, 0, 255] });
    let mask = zone_borders(
        &zones,
        &BorderConfig {
            threshold: 0,
            neighborhood_size: 1,
        },
    );
    assert!(marked(&mask, 0, 2));
    assert!(marked(&mask, 3, 3));
    assert!(!marked(&mask, 1, 0));
    assert!(!marked(&mask, 1, 5));
}
