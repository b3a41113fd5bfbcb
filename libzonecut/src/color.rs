//! Color helpers shared by the engines
//!
//! Hue, saturation and value all live on an 8-bit scale: saturation and value
//! span `[0, 255]` and hue is circular over [`HUE_RANGE`], so `0` and `255`
//! name the same hue.

use serde::{Deserialize, Serialize};

/// Size of the circular hue domain
pub const HUE_RANGE: f32 = 255.0;

/// Number of refinement passes used by [`compute_hue_mean`]
pub const HUE_MEAN_PASSES: usize = 5;

const LUMA_WEIGHTS: [f32; 3] = [0.2989, 0.5870, 0.1140];

/// HSV color on the 8-bit scale
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Hsv {
    pub h: f32,
    pub s: f32,
    pub v: f32,
}

impl Hsv {
    /// Create a color, wrapping the hue into the circular domain
    pub fn new(h: f32, s: f32, v: f32) -> Self {
        Self {
            h: wrap_hue(h),
            s,
            v,
        }
    }

    /// Convert an RGB triple
    pub fn from_rgb(rgb: [u8; 3]) -> Self {
        let [r, g, b] = rgb.map(|c| f32::from(c) / 255.0);
        let c_max = r.max(g).max(b);
        let c_min = r.min(g).min(b);
        let delta = c_max - c_min;

        let s = if c_max == 0.0 { 0.0 } else { delta / c_max * 255.0 };
        let v = c_max * 255.0;

        let sector = if delta == 0.0 {
            0.0
        } else if c_max == r {
            ((g - b) / delta).rem_euclid(6.0)
        } else if c_max == g {
            (b - r) / delta + 2.0
        } else {
            (r - g) / delta + 4.0
        };

        Self::new(sector * HUE_RANGE / 6.0, s, v)
    }

    /// Convert back to an RGB triple, rounding each channel
    pub fn to_rgb(self) -> [u8; 3] {
        let h = self.h / HUE_RANGE * 360.0;
        let s = (self.s / 255.0).clamp(0.0, 1.0);
        let v = (self.v / 255.0).clamp(0.0, 1.0);

        let c = v * s;
        let x = c * (1.0 - ((h / 60.0).rem_euclid(2.0) - 1.0).abs());
        let m = v - c;

        let (r, g, b) = if h < 60.0 {
            (c, x, 0.0)
        } else if h < 120.0 {
            (x, c, 0.0)
        } else if h < 180.0 {
            (0.0, c, x)
        } else if h < 240.0 {
            (0.0, x, c)
        } else if h < 300.0 {
            (x, 0.0, c)
        } else {
            (c, 0.0, x)
        };

        [r, g, b].map(|channel| to_channel((channel + m) * 255.0))
    }

    /// Round every component onto the 8-bit grid
    pub fn quantized(self) -> [u8; 3] {
        let h = (self.h.round() as u16 % 255) as u8;
        [h, to_channel(self.s), to_channel(self.v)]
    }
}

/// Grayscale intensity of an RGB triple
pub fn luma(rgb: [u8; 3]) -> u8 {
    let weighted: f32 = rgb
        .iter()
        .zip(LUMA_WEIGHTS)
        .map(|(&c, w)| f32::from(c) * w)
        .sum();
    to_channel(weighted)
}

/// Wrap any hue into `[0, HUE_RANGE)`
pub fn wrap_hue(hue: f32) -> f32 {
    let wrapped = hue.rem_euclid(HUE_RANGE);
    if wrapped >= HUE_RANGE {
        0.0
    } else {
        wrapped
    }
}

/// Length of the shorter arc between two hues
pub fn hue_distance(a: f32, b: f32) -> f32 {
    let raw = (a - b).abs().rem_euclid(HUE_RANGE);
    raw.min(HUE_RANGE - raw)
}

/// Signed offset from `reference` to `hue` along the shorter arc
fn signed_hue_offset(hue: f32, reference: f32) -> f32 {
    let offset = hue - reference;
    if offset > HUE_RANGE / 2.0 {
        offset - HUE_RANGE
    } else if offset < -HUE_RANGE / 2.0 {
        offset + HUE_RANGE
    } else {
        offset
    }
}

/// Circular mean of a set of hues.
///
/// Starting from hue `0`, every pass folds each sample onto the shorter arc
/// around the current estimate and moves the estimate by the mean signed
/// offset. Samples on both sides of the `255 -> 0` seam therefore average
/// to a hue near the seam instead of the middle of the range.
///
/// Returns `0.0` for an empty slice.
pub fn compute_hue_mean(hues: &[u8]) -> f32 {
    if hues.is_empty() {
        return 0.0;
    }

    let count = hues.len() as f32;
    let mut mean = 0.0_f32;
    for _ in 0..HUE_MEAN_PASSES {
        let shift = hues
            .iter()
            .map(|&hue| signed_hue_offset(f32::from(hue), mean))
            .sum::<f32>()
            / count;
        mean = wrap_hue(mean + shift);
    }
    mean
}

fn to_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
