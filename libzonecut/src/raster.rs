//! Dense row-major image buffers consumed and produced by the engines
//!
//! [`Raster`] wraps the `image` crate's grayscale and RGBA buffers behind a
//! `(row, col)` interface. Every accessor is bounds-checked: reads outside
//! the image return `None` and writes outside the image are ignored.

use image::{DynamicImage, GrayImage, Luma, Rgba, RgbaImage};

use crate::color::{luma, Hsv};
use crate::error::{Result, ZoneError};

/// Value stored at one pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelValue {
    /// 8-bit intensity
    Gray(u8),
    /// Color as `[r, g, b, a]`
    Rgba([u8; 4]),
}

impl PixelValue {
    /// Decode to RGB; grayscale expands to `(v, v, v)`
    pub const fn rgb(self) -> [u8; 3] {
        match self {
            Self::Gray(v) => [v, v, v],
            Self::Rgba([r, g, b, _]) => [r, g, b],
        }
    }

    /// Decode to HSV; grayscale maps to `(0, 0, v)`
    pub fn hsv(self) -> Hsv {
        match self {
            Self::Gray(v) => Hsv::new(0.0, 0.0, f32::from(v)),
            Self::Rgba([r, g, b, _]) => Hsv::from_rgb([r, g, b]),
        }
    }

    /// Grayscale intensity
    pub fn luma(self) -> u8 {
        match self {
            Self::Gray(v) => v,
            Self::Rgba([r, g, b, _]) => luma([r, g, b]),
        }
    }

    /// Packed representation: the intensity itself, or `r << 24 | g << 16 | b << 8 | a`
    pub const fn packed(self) -> u32 {
        match self {
            Self::Gray(v) => v as u32,
            Self::Rgba(channels) => u32::from_be_bytes(channels),
        }
    }
}

/// A pixel's coordinate together with the value sampled there
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelSample {
    pub row: usize,
    pub col: usize,
    pub value: PixelValue,
}

impl PixelSample {
    pub const fn new(row: usize, col: usize, value: PixelValue) -> Self {
        Self { row, col, value }
    }
}

/// Kind of pixel held by a [`Raster`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterKind {
    Gray,
    Rgba,
}

/// Single-channel or color image addressed by `(row, col)`
#[derive(Debug, Clone, PartialEq)]
pub enum Raster {
    Gray(GrayImage),
    Rgba(RgbaImage),
}

impl Raster {
    /// Zero-filled grayscale raster
    pub fn new_gray(rows: usize, cols: usize) -> Self {
        Self::Gray(GrayImage::new(cols as u32, rows as u32))
    }

    /// Zero-filled (transparent black) color raster
    pub fn new_rgba(rows: usize, cols: usize) -> Self {
        Self::Rgba(RgbaImage::new(cols as u32, rows as u32))
    }

    /// Build a grayscale raster from a `(row, col) -> intensity` function
    pub fn from_gray_fn(rows: usize, cols: usize, f: impl Fn(usize, usize) -> u8) -> Self {
        Self::Gray(GrayImage::from_fn(cols as u32, rows as u32, |x, y| {
            Luma([f(y as usize, x as usize)])
        }))
    }

    /// Build an opaque color raster from a `(row, col) -> rgb` function
    pub fn from_rgb_fn(rows: usize, cols: usize, f: impl Fn(usize, usize) -> [u8; 3]) -> Self {
        Self::Rgba(RgbaImage::from_fn(cols as u32, rows as u32, |x, y| {
            let [r, g, b] = f(y as usize, x as usize);
            Rgba([r, g, b, 255])
        }))
    }

    /// Zero-filled raster with the same shape and kind
    pub fn blank_like(&self) -> Self {
        match self.kind() {
            RasterKind::Gray => Self::new_gray(self.rows(), self.cols()),
            RasterKind::Rgba => Self::new_rgba(self.rows(), self.cols()),
        }
    }

    pub const fn kind(&self) -> RasterKind {
        match self {
            Self::Gray(_) => RasterKind::Gray,
            Self::Rgba(_) => RasterKind::Rgba,
        }
    }

    /// Number of rows (image height)
    pub fn rows(&self) -> usize {
        match self {
            Self::Gray(img) => img.height() as usize,
            Self::Rgba(img) => img.height() as usize,
        }
    }

    /// Number of columns (image width)
    pub fn cols(&self) -> usize {
        match self {
            Self::Gray(img) => img.width() as usize,
            Self::Rgba(img) => img.width() as usize,
        }
    }

    pub fn len(&self) -> usize {
        self.rows() * self.cols()
    }

    pub fn is_empty(&self) -> bool {
        self.rows() == 0 || self.cols() == 0
    }

    /// Reject a raster without pixels as [`ZoneError::InvalidConfiguration`]
    pub fn ensure_not_empty(&self) -> Result<()> {
        if self.is_empty() {
            return Err(ZoneError::invalid(format!(
                "image has no pixels: {} rows x {} cols",
                self.rows(),
                self.cols()
            )));
        }
        Ok(())
    }

    /// Whether a signed coordinate lies inside the image
    pub fn is_inside(&self, row: i64, col: i64) -> bool {
        row >= 0 && col >= 0 && (row as usize) < self.rows() && (col as usize) < self.cols()
    }

    /// Value at `(row, col)`, or `None` outside the image
    pub fn get(&self, row: usize, col: usize) -> Option<PixelValue> {
        if row >= self.rows() || col >= self.cols() {
            return None;
        }
        let (x, y) = (col as u32, row as u32);
        Some(match self {
            Self::Gray(img) => PixelValue::Gray(img.get_pixel(x, y)[0]),
            Self::Rgba(img) => PixelValue::Rgba(img.get_pixel(x, y).0),
        })
    }

    /// Sample at `(row, col)`, or `None` outside the image
    pub fn sample(&self, row: usize, col: usize) -> Option<PixelSample> {
        self.get(row, col)
            .map(|value| PixelSample::new(row, col, value))
    }

    /// Write a value, converting it to this raster's kind.
    ///
    /// Returns `false` (and leaves the raster untouched) outside the image.
    pub fn set(&mut self, row: usize, col: usize, value: PixelValue) -> bool {
        if row >= self.rows() || col >= self.cols() {
            return false;
        }
        let (x, y) = (col as u32, row as u32);
        match self {
            Self::Gray(img) => img.put_pixel(x, y, Luma([value.luma()])),
            Self::Rgba(img) => {
                let channels = match value {
                    PixelValue::Rgba(channels) => channels,
                    PixelValue::Gray(v) => [v, v, v, 255],
                };
                img.put_pixel(x, y, Rgba(channels));
            }
        }
        true
    }

    /// All samples in row-major order
    pub fn samples(&self) -> impl Iterator<Item = PixelSample> + '_ {
        let cols = self.cols();
        (0..self.len()).filter_map(move |idx| self.sample(idx / cols, idx % cols))
    }

    /// Grayscale reduction (identity for grayscale rasters)
    pub fn to_gray(&self) -> GrayImage {
        match self {
            Self::Gray(img) => img.clone(),
            Self::Rgba(img) => GrayImage::from_fn(img.width(), img.height(), |x, y| {
                let [r, g, b, _] = img.get_pixel(x, y).0;
                Luma([luma([r, g, b])])
            }),
        }
    }

    /// Color expansion (grayscale becomes opaque `(v, v, v)`)
    pub fn to_rgba(&self) -> RgbaImage {
        match self {
            Self::Rgba(img) => img.clone(),
            Self::Gray(img) => RgbaImage::from_fn(img.width(), img.height(), |x, y| {
                let v = img.get_pixel(x, y)[0];
                Rgba([v, v, v, 255])
            }),
        }
    }

    /// Adopt a decoded image; single-channel formats stay grayscale
    pub fn from_dynamic(image: DynamicImage) -> Self {
        match image {
            DynamicImage::ImageLuma8(img) => Self::Gray(img),
            other if !other.color().has_color() => Self::Gray(other.to_luma8()),
            other => Self::Rgba(other.to_rgba8()),
        }
    }

    pub fn into_dynamic(self) -> DynamicImage {
        match self {
            Self::Gray(img) => DynamicImage::ImageLuma8(img),
            Self::Rgba(img) => DynamicImage::ImageRgba8(img),
        }
    }
}

impl From<GrayImage> for Raster {
    fn from(img: GrayImage) -> Self {
        Self::Gray(img)
    }
}

impl From<RgbaImage> for Raster {
    fn from(img: RgbaImage) -> Self {
        Self::Rgba(img)
    }
}
