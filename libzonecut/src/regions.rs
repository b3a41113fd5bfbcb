//! Quadtree segmentation by region similarity
//!
//! The image is tiled into a regular grid of regions. Each region is tested
//! for homogeneity in HSV space; regions that fail are split into four
//! quadrants, pass after pass, until the tracked tile size reaches the
//! recursion floor. Homogeneous regions can then be merged with similar
//! neighbors and are finally painted with their representative color.
//!
//! All regions live in one flat, append-only list. Adjacency is recorded as
//! indices into that list, so splitting never rewires existing regions.

use log::{debug, info};

use crate::color::{compute_hue_mean, hue_distance, Hsv, HUE_RANGE};
use crate::config::RegionConfig;
use crate::error::{Result, ZoneError};
use crate::raster::{PixelValue, Raster, RasterKind};
use crate::task::CancelToken;

/// Indices of the regions sharing an edge with a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Neighbors {
    pub top: Option<usize>,
    pub bottom: Option<usize>,
    pub left: Option<usize>,
    pub right: Option<usize>,
}

impl Neighbors {
    /// Recorded neighbors in top, left, bottom, right order
    pub fn iter(&self) -> impl Iterator<Item = usize> {
        [self.top, self.left, self.bottom, self.right]
            .into_iter()
            .flatten()
    }
}

/// Rectangle `[row_min, row_max) x [col_min, col_max)` tracked by the quadtree
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub row_min: usize,
    pub row_max: usize,
    pub col_min: usize,
    pub col_max: usize,
    pub already_processed: bool,
    pub is_homogeneous: bool,
    /// Set once the region has been split into quadrants
    pub has_children: bool,
    /// Representative color, valid once processed
    pub color: Hsv,
    pub neighbors: Neighbors,
}

impl Region {
    pub fn new(row_min: usize, row_max: usize, col_min: usize, col_max: usize) -> Self {
        Self {
            row_min,
            row_max,
            col_min,
            col_max,
            already_processed: false,
            is_homogeneous: false,
            has_children: false,
            color: Hsv::default(),
            neighbors: Neighbors::default(),
        }
    }

    pub const fn height(&self) -> usize {
        self.row_max.saturating_sub(self.row_min)
    }

    pub const fn width(&self) -> usize {
        self.col_max.saturating_sub(self.col_min)
    }

    pub const fn area(&self) -> usize {
        self.height() * self.width()
    }

    pub const fn is_empty(&self) -> bool {
        self.area() == 0
    }

    pub const fn contains(&self, row: usize, col: usize) -> bool {
        row >= self.row_min && row < self.row_max && col >= self.col_min && col < self.col_max
    }

    /// Quadrants of a region narrower than two pixels would be empty
    pub const fn can_split(&self) -> bool {
        self.height() >= 2 && self.width() >= 2
    }

    fn with_neighbors(mut self, neighbors: Neighbors) -> Self {
        self.neighbors = neighbors;
        self
    }
}

/// Adaptive quadtree segmentation engine
///
/// The input is kept as HSV quantized to 8 bits per channel, so painted
/// colors can drift slightly from the source: a flat yellow `(255, 255, 0)`
/// tile repaints as `(252, 255, 0)`. Gray levels and primary colors are
/// reproduced exactly.
pub struct RegionSimilarityEngine {
    similarity_threshold: f32,
    region_width: usize,
    region_height: usize,
    min_region_size: usize,
    merge_regions: bool,
    rows: usize,
    cols: usize,
    kind: RasterKind,
    /// Quantized HSV of the input, row-major
    hsv: Vec<[u8; 3]>,
    regions: Vec<Region>,
}

impl RegionSimilarityEngine {
    /// Validate `config` and convert `image` to HSV
    pub fn new(config: &RegionConfig, image: &Raster) -> Result<Self> {
        config.validate()?;
        image.ensure_not_empty()?;

        let hsv = image
            .samples()
            .map(|sample| sample.value.hsv().quantized())
            .collect();

        Ok(Self {
            similarity_threshold: config.similarity_threshold,
            region_width: config.region_width,
            region_height: config.region_height,
            min_region_size: config.min_region_size,
            merge_regions: config.merge_regions,
            rows: image.rows(),
            cols: image.cols(),
            kind: image.kind(),
            hsv,
            regions: Vec::new(),
        })
    }

    pub const fn similarity_threshold(&self) -> f32 {
        self.similarity_threshold
    }

    pub fn set_similarity_threshold(&mut self, threshold: f32) -> Result<()> {
        self.apply(RegionConfig {
            similarity_threshold: threshold,
            ..self.config()
        })
    }

    pub const fn region_width(&self) -> usize {
        self.region_width
    }

    pub fn set_region_width(&mut self, width: usize) -> Result<()> {
        self.apply(RegionConfig {
            region_width: width,
            ..self.config()
        })
    }

    pub const fn region_height(&self) -> usize {
        self.region_height
    }

    pub fn set_region_height(&mut self, height: usize) -> Result<()> {
        self.apply(RegionConfig {
            region_height: height,
            ..self.config()
        })
    }

    pub const fn min_region_size(&self) -> usize {
        self.min_region_size
    }

    pub fn set_min_region_size(&mut self, size: usize) -> Result<()> {
        self.apply(RegionConfig {
            min_region_size: size,
            ..self.config()
        })
    }

    pub const fn merge_regions(&self) -> bool {
        self.merge_regions
    }

    pub fn set_merge_regions(&mut self, merge: bool) {
        self.merge_regions = merge;
    }

    /// Current parameters as a configuration
    pub const fn config(&self) -> RegionConfig {
        RegionConfig {
            similarity_threshold: self.similarity_threshold,
            region_width: self.region_width,
            region_height: self.region_height,
            min_region_size: self.min_region_size,
            merge_regions: self.merge_regions,
        }
    }

    /// The region arena as left by the last call
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Tile the image into the initial grid and link edge-sharing tiles.
    ///
    /// Trailing rows and columns that do not fill a whole tile become smaller
    /// tiles along the bottom and right borders. Any previous regions are
    /// discarded.
    pub fn create_regions(&mut self) -> &[Region] {
        self.regions.clear();
        for row_min in (0..self.rows).step_by(self.region_height) {
            let row_max = (row_min + self.region_height).min(self.rows);
            for col_min in (0..self.cols).step_by(self.region_width) {
                let col_max = (col_min + self.region_width).min(self.cols);
                self.regions
                    .push(Region::new(row_min, row_max, col_min, col_max));
            }
        }

        let links: Vec<Neighbors> = self
            .regions
            .iter()
            .map(|region| find_neighbors(region, &self.regions))
            .collect();
        for (region, neighbors) in self.regions.iter_mut().zip(links) {
            region.neighbors = neighbors;
        }

        debug!(
            "Created {} initial regions of {}x{}",
            self.regions.len(),
            self.region_height,
            self.region_width
        );
        &self.regions
    }

    /// Compute the representative color of `region` and decide whether every
    /// pixel stays within the similarity threshold of it.
    ///
    /// Marks the region processed and returns its homogeneity. An empty
    /// region is never homogeneous.
    pub fn check_homogeneity(&self, region: &mut Region) -> bool {
        region.already_processed = true;
        region.is_homogeneous = false;
        if region.is_empty() {
            return false;
        }

        let pixels: Vec<[u8; 3]> = self.region_pixels(region).collect();
        let count = pixels.len() as f32;
        let hues: Vec<u8> = pixels.iter().map(|px| px[0]).collect();
        let h_mean = compute_hue_mean(&hues);
        let s_mean = pixels.iter().map(|px| f32::from(px[1])).sum::<f32>() / count;
        let v_mean = pixels.iter().map(|px| f32::from(px[2])).sum::<f32>() / count;
        region.color = Hsv::new(h_mean, s_mean, v_mean);

        let threshold = self.similarity_threshold;
        region.is_homogeneous = pixels.iter().all(|&[h, s, v]| {
            let h_dev = hue_distance(f32::from(h), h_mean) / HUE_RANGE;
            let s_dev = (f32::from(s) - s_mean).abs() / 255.0;
            let v_dev = (f32::from(v) - v_mean).abs() / 255.0;
            (h_dev + s_dev + v_dev) / 3.0 <= threshold
        });
        region.is_homogeneous
    }

    /// Run the full segmentation and return the painted image
    pub fn process(&mut self) -> Result<Raster> {
        self.process_with_cancel(&CancelToken::new())
    }

    /// Same as [`Self::process`], checking `cancel` before every pass
    pub fn process_with_cancel(&mut self, cancel: &CancelToken) -> Result<Raster> {
        info!(
            "Region similarity on {}x{} image: tiles {}x{}, floor {}, threshold {}, merge {}",
            self.rows,
            self.cols,
            self.region_height,
            self.region_width,
            self.min_region_size,
            self.similarity_threshold,
            self.merge_regions
        );

        self.create_regions();

        let mut current_min_size = self.region_width.min(self.region_height);
        while current_min_size > self.min_region_size {
            if cancel.is_cancelled() {
                return Err(ZoneError::Cancelled);
            }

            let region_count = self.regions.len();
            let mut checked = 0;
            let mut split = 0;
            for idx in 0..region_count {
                let mut region = self.regions[idx];
                if !region.already_processed {
                    self.check_homogeneity(&mut region);
                    self.regions[idx] = region;
                    checked += 1;
                } else if !region.is_homogeneous && !region.has_children && region.can_split() {
                    self.split_region(idx);
                    split += 1;
                }
            }

            debug!(
                "Similarity pass at size {}: {} regions, {} checked, {} split",
                current_min_size,
                self.regions.len(),
                checked,
                split
            );
            current_min_size /= 2;
        }

        if self.merge_regions {
            if cancel.is_cancelled() {
                return Err(ZoneError::Cancelled);
            }
            let merged = self.merge_neighbors();
            debug!("Merged {} neighboring region pairs", merged);
        }

        let homogeneous = self.regions.iter().filter(|r| r.is_homogeneous).count();
        info!(
            "Region similarity finished: {} regions, {} homogeneous",
            self.regions.len(),
            homogeneous
        );

        Ok(self.paint())
    }

    /// Append the four quadrants of region `idx`, checking each immediately.
    ///
    /// Every quadrant links to its siblings and inherits the parent's
    /// neighbor on the sides it shares with the parent.
    fn split_region(&mut self, idx: usize) {
        let parent = self.regions[idx];
        let mid_row = parent.row_min + parent.height() / 2;
        let mid_col = parent.col_min + parent.width() / 2;

        let base = self.regions.len();
        let (top_left, top_right, bottom_left, bottom_right) = (base, base + 1, base + 2, base + 3);
        let outer = parent.neighbors;

        let quadrants = [
            Region::new(parent.row_min, mid_row, parent.col_min, mid_col).with_neighbors(
                Neighbors {
                    top: outer.top,
                    bottom: Some(bottom_left),
                    left: outer.left,
                    right: Some(top_right),
                },
            ),
            Region::new(parent.row_min, mid_row, mid_col, parent.col_max).with_neighbors(
                Neighbors {
                    top: outer.top,
                    bottom: Some(bottom_right),
                    left: Some(top_left),
                    right: outer.right,
                },
            ),
            Region::new(mid_row, parent.row_max, parent.col_min, mid_col).with_neighbors(
                Neighbors {
                    top: Some(top_left),
                    bottom: outer.bottom,
                    left: outer.left,
                    right: Some(bottom_right),
                },
            ),
            Region::new(mid_row, parent.row_max, mid_col, parent.col_max).with_neighbors(
                Neighbors {
                    top: Some(top_right),
                    bottom: outer.bottom,
                    left: Some(bottom_left),
                    right: outer.right,
                },
            ),
        ];

        for mut quadrant in quadrants {
            self.check_homogeneity(&mut quadrant);
            self.regions.push(quadrant);
        }
        self.regions[idx].has_children = true;
    }

    /// Merge every homogeneous region with each similar homogeneous neighbor.
    /// Returns the number of merges performed.
    fn merge_neighbors(&mut self) -> usize {
        let mut merged = 0;
        for idx in 0..self.regions.len() {
            if !self.regions[idx].is_homogeneous {
                continue;
            }
            let neighbors = self.regions[idx].neighbors;
            for other in neighbors.iter() {
                if self.regions[other].is_homogeneous && self.merge_pair(idx, other) {
                    merged += 1;
                }
            }
        }
        merged
    }

    /// Give two similar regions their RGB-averaged color.
    ///
    /// Hue must be within half the threshold, saturation and value within the
    /// threshold. The regions stay separate entries but paint identically.
    fn merge_pair(&mut self, a: usize, b: usize) -> bool {
        let first = self.regions[a];
        let second = self.regions[b];
        if !first.already_processed || !second.already_processed {
            return false;
        }

        let (ca, cb) = (first.color, second.color);
        let threshold = self.similarity_threshold;
        if hue_distance(ca.h, cb.h) / HUE_RANGE > 0.5 * threshold
            || (ca.s - cb.s).abs() / 255.0 > threshold
            || (ca.v - cb.v).abs() / 255.0 > threshold
        {
            return false;
        }

        let merged = average_color(ca, cb);
        self.regions[a].color = merged;
        self.regions[b].color = merged;
        true
    }

    fn paint(&self) -> Raster {
        let mut output = match self.kind {
            RasterKind::Gray => Raster::new_gray(self.rows, self.cols),
            RasterKind::Rgba => Raster::new_rgba(self.rows, self.cols),
        };

        for region in self.regions.iter().filter(|r| r.is_homogeneous) {
            let [r, g, b] = region.color.to_rgb();
            let value = PixelValue::Rgba([r, g, b, 255]);
            for row in region.row_min..region.row_max {
                for col in region.col_min..region.col_max {
                    output.set(row, col, value);
                }
            }
        }
        output
    }

    fn region_pixels<'a>(&'a self, region: &Region) -> impl Iterator<Item = [u8; 3]> + 'a {
        let cols = self.cols;
        let (row_min, row_max) = (region.row_min, region.row_max.min(self.rows));
        let (col_min, col_max) = (region.col_min, region.col_max.min(self.cols));
        (row_min..row_max)
            .flat_map(move |row| (col_min..col_max).map(move |col| row * cols + col))
            .filter_map(move |idx| self.hsv.get(idx).copied())
    }

    fn apply(&mut self, config: RegionConfig) -> Result<()> {
        config.validate()?;
        self.similarity_threshold = config.similarity_threshold;
        self.region_width = config.region_width;
        self.region_height = config.region_height;
        self.min_region_size = config.min_region_size;
        self.merge_regions = config.merge_regions;
        Ok(())
    }
}

/// Edge-sharing tiles of `region` among `regions`
fn find_neighbors(region: &Region, regions: &[Region]) -> Neighbors {
    let mut neighbors = Neighbors::default();
    for (idx, other) in regions.iter().enumerate() {
        if region.col_min == other.col_min && region.col_max == other.col_max {
            if region.row_min == other.row_max {
                neighbors.top = Some(idx);
            }
            if region.row_max == other.row_min {
                neighbors.bottom = Some(idx);
            }
        }
        if region.row_min == other.row_min && region.row_max == other.row_max {
            if region.col_min == other.col_max {
                neighbors.left = Some(idx);
            }
            if region.col_max == other.col_min {
                neighbors.right = Some(idx);
            }
        }
    }
    neighbors
}

/// Channel-wise mean of two colors taken in RGB, truncated
fn average_color(a: Hsv, b: Hsv) -> Hsv {
    let (ra, rb) = (a.to_rgb(), b.to_rgb());
    let mut mixed = [0u8; 3];
    for (channel, (x, y)) in mixed.iter_mut().zip(ra.iter().zip(rb.iter())) {
        *channel = ((u16::from(*x) + u16::from(*y)) / 2) as u8;
    }
    Hsv::from_rgb(mixed)
}

impl std::fmt::Debug for RegionSimilarityEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionSimilarityEngine")
            .field("config", &self.config())
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("regions", &self.regions.len())
            .finish()
    }
}
