use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ZoneError;
use crate::raster::PixelSample;

/// Spatial term divisor used by the blended metrics
const SPATIAL_NORMALIZATION: f64 = 1000.0;

/// Color term divisor used by the blended metrics
const COLOR_NORMALIZATION: f64 = 255.0;

/// Weight applied to the squared saturation and value differences
const SV_WEIGHT: f64 = 0.25;

/// Dissimilarity between two pixel samples
///
/// The normalization constants differ between variants: the plain metrics
/// are unscaled while the blends bring both terms to comparable magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DistanceMetric {
    /// `sqrt(drow² + dcol²)`; produces a Voronoi tiling
    #[default]
    Euclidean,
    /// `sqrt(dr² + dg² + db²)`
    Svd,
    /// `sqrt(dh² + 0.25 ds² + 0.25 dv²)`
    HsvSvd,
    /// Mean of the spatial distance / 1000 and the RGB distance / 255
    EdSvd,
    /// Mean of the spatial distance / 1000 and the HSV distance / 255
    EdHsvSvd,
}

impl DistanceMetric {
    pub const ALL: [Self; 5] = [
        Self::Euclidean,
        Self::Svd,
        Self::HsvSvd,
        Self::EdSvd,
        Self::EdHsvSvd,
    ];

    /// Distance between two samples; always non-negative
    pub fn distance(self, a: &PixelSample, b: &PixelSample) -> f64 {
        match self {
            Self::Euclidean => spatial(a, b),
            Self::Svd => rgb(a, b),
            Self::HsvSvd => hsv(a, b),
            Self::EdSvd => {
                (spatial(a, b) / SPATIAL_NORMALIZATION + rgb(a, b) / COLOR_NORMALIZATION) / 2.0
            }
            Self::EdHsvSvd => {
                (spatial(a, b) / SPATIAL_NORMALIZATION + hsv(a, b) / COLOR_NORMALIZATION) / 2.0
            }
        }
    }

    /// Whether the metric compares colors in HSV space
    pub const fn uses_hsv(self) -> bool {
        matches!(self, Self::HsvSvd | Self::EdHsvSvd)
    }

    /// Human readable name
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Euclidean => "Euclidian distance",
            Self::Svd => "RGB Squared diff",
            Self::HsvSvd => "HSV Squared diff",
            Self::EdSvd => "ED + RGB Squared diff",
            Self::EdHsvSvd => "ED + HSV Squared diff",
        }
    }

    /// Short key used on the command line and in configuration files
    pub const fn key(self) -> &'static str {
        match self {
            Self::Euclidean => "euclidean",
            Self::Svd => "svd",
            Self::HsvSvd => "hsv-svd",
            Self::EdSvd => "ed-svd",
            Self::EdHsvSvd => "ed-hsv-svd",
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for DistanceMetric {
    type Err = ZoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|metric| {
                metric.key().eq_ignore_ascii_case(trimmed)
                    || metric.display_name().eq_ignore_ascii_case(trimmed)
            })
            .ok_or_else(|| ZoneError::invalid(format!("unknown distance metric: {s}")))
    }
}

fn spatial(a: &PixelSample, b: &PixelSample) -> f64 {
    let d_row = a.row as f64 - b.row as f64;
    let d_col = a.col as f64 - b.col as f64;
    d_row.hypot(d_col)
}

fn rgb(a: &PixelSample, b: &PixelSample) -> f64 {
    a.value
        .rgb()
        .iter()
        .zip(b.value.rgb())
        .map(|(&x, y)| (f64::from(x) - f64::from(y)).powi(2))
        .sum::<f64>()
        .sqrt()
}

fn hsv(a: &PixelSample, b: &PixelSample) -> f64 {
    let ha = a.value.hsv();
    let hb = b.value.hsv();
    let dh = f64::from(ha.h - hb.h);
    let ds = f64::from(ha.s - hb.s);
    let dv = f64::from(ha.v - hb.v);
    SV_WEIGHT.mul_add(ds * ds, SV_WEIGHT.mul_add(dv * dv, dh * dh)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::PixelValue;

    fn gray(row: usize, col: usize, v: u8) -> PixelSample {
        PixelSample::new(row, col, PixelValue::Gray(v))
    }

    #[test]
    fn test_euclidean_ignores_values() {
        let d = DistanceMetric::Euclidean.distance(&gray(0, 0, 0), &gray(3, 4, 255));
        assert!((d - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_svd_ignores_position() {
        let d = DistanceMetric::Svd.distance(&gray(0, 0, 10), &gray(7, 7, 10));
        assert_eq!(d, 0.0);
        let d = DistanceMetric::Svd.distance(&gray(0, 0, 0), &gray(0, 0, 1));
        assert!((d - 3f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_hsv_weights_value() {
        let d = DistanceMetric::HsvSvd.distance(&gray(0, 0, 0), &gray(0, 0, 100));
        assert!((d - 50.0).abs() < 1e-4);
    }

    fn color(row: usize, col: usize, rgb: [u8; 3]) -> PixelSample {
        let [r, g, b] = rgb;
        PixelSample::new(row, col, PixelValue::Rgba([r, g, b, 255]))
    }

    #[test]
    fn test_hsv_weights_hue_fully_and_saturation_by_quarter() {
        // red to green is a pure hue step of 85
        let d = DistanceMetric::HsvSvd.distance(&color(0, 0, [255, 0, 0]), &color(0, 0, [0, 255, 0]));
        assert!((d - 85.0).abs() < 1e-4);
        // white to red is a pure saturation step of 255
        let d = DistanceMetric::HsvSvd.distance(&color(0, 0, [255, 255, 255]), &color(0, 0, [255, 0, 0]));
        assert!((d - 127.5).abs() < 1e-4);
    }

    #[test]
    fn test_hsv_blend_averages_terms() {
        let d = DistanceMetric::EdHsvSvd.distance(&color(0, 0, [255, 0, 0]), &color(0, 1000, [0, 255, 0]));
        assert!((d - (1.0 + 85.0 / 255.0) / 2.0).abs() < 1e-6);

        let d = DistanceMetric::EdHsvSvd.distance(&color(3, 4, [255, 255, 255]), &color(3, 4, [255, 0, 0]));
        assert!((d - 127.5 / 255.0 / 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_blend_averages_terms() {
        let d = DistanceMetric::EdSvd.distance(&gray(0, 0, 0), &gray(0, 1000, 0));
        assert!((d - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_parse_names_and_keys() {
        for metric in DistanceMetric::ALL {
            assert_eq!(metric.key().parse::<DistanceMetric>().unwrap(), metric);
            assert_eq!(metric.display_name().parse::<DistanceMetric>().unwrap(), metric);
        }
        assert!("manhattan".parse::<DistanceMetric>().is_err());
    }
}
