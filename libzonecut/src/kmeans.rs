//! Iterative centroid clustering
//!
//! [`KMeansEngine`] assigns every pixel to the closest of `k` cluster centers
//! under a [`DistanceMetric`], moves each center to the truncated mean
//! coordinate of its members and resamples the center's value from the image.
//! The output is a quantized image in which every pixel carries the value of
//! its cluster's center.

use std::ops::Range;

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::KMeansConfig;
use crate::error::{Result, ZoneError};
use crate::metric::DistanceMetric;
use crate::raster::{PixelSample, PixelValue, Raster};
use crate::task::CancelToken;

/// Absolute change of the mean assignment distance below which a run stops
pub const CONVERGENCE_EPSILON: f64 = 1.0;

/// Step limit used by [`random_framing`]
pub const FRAMING_MAX_STEPS: usize = 25;

/// Lifecycle of a [`KMeansEngine`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Initialized,
    Iterating,
    Converged,
    MaxStepsReached,
}

/// One cluster: where it sits, what value it represents and who belongs to it
#[derive(Debug, Clone)]
pub struct ClusterCenter {
    pub row: usize,
    pub col: usize,
    pub value: PixelValue,
    /// Row-major indices of the pixels assigned during the last iteration
    members: Vec<usize>,
    /// Summed assignment distance of the last iteration
    total_dist: f64,
}

impl ClusterCenter {
    fn from_sample(sample: PixelSample) -> Self {
        Self {
            row: sample.row,
            col: sample.col,
            value: sample.value,
            members: Vec::new(),
            total_dist: 0.0,
        }
    }

    /// Coordinate and value as a sample
    pub const fn sample(&self) -> PixelSample {
        PixelSample::new(self.row, self.col, self.value)
    }

    /// Number of pixels assigned during the last iteration
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Row-major pixel indices assigned during the last iteration
    pub fn members(&self) -> &[usize] {
        &self.members
    }

    /// Summed distance of the members to this center during the last iteration
    pub const fn total_distance(&self) -> f64 {
        self.total_dist
    }

    fn clear(&mut self) {
        self.members.clear();
        self.total_dist = 0.0;
    }

    /// Move to the truncated mean of the members, clamp into the image and
    /// resample. Empty clusters keep their coordinate.
    fn recenter(&mut self, image: &Raster) {
        let cols = image.cols();
        if !self.members.is_empty() {
            let count = self.members.len();
            let (row_sum, col_sum) = self
                .members
                .iter()
                .fold((0usize, 0usize), |(rs, cs), &idx| (rs + idx / cols, cs + idx % cols));
            self.row = row_sum / count;
            self.col = col_sum / count;
        }

        self.row = self.row.min(image.rows().saturating_sub(1));
        self.col = self.col.min(cols.saturating_sub(1));
        if let Some(value) = image.get(self.row, self.col) {
            self.value = value;
        }
    }
}

/// K-means clustering engine
///
/// An engine owns its cluster state; concurrent runs need one engine each.
#[derive(Debug, Clone)]
pub struct KMeansEngine {
    k: usize,
    metric: DistanceMetric,
    max_steps: usize,
    random_seed: u64,
    centers: Vec<ClusterCenter>,
    state: EngineState,
    iterations: usize,
}

impl KMeansEngine {
    /// Create an engine with `k` clusters
    pub fn new(k: usize, metric: DistanceMetric, max_steps: usize) -> Result<Self> {
        if k == 0 {
            return Err(ZoneError::invalid("cluster count must be at least 1"));
        }
        if max_steps == 0 {
            return Err(ZoneError::invalid("max steps must be at least 1"));
        }

        Ok(Self {
            k,
            metric,
            max_steps,
            random_seed: 0,
            centers: Vec::new(),
            state: EngineState::Uninitialized,
            iterations: 0,
        })
    }

    /// Create an engine from a validated configuration
    pub fn from_config(config: &KMeansConfig) -> Result<Self> {
        config.validate()?;
        let mut engine = Self::new(config.clusters, config.metric, config.max_steps)?;
        engine.random_seed = config.random_seed;
        Ok(engine)
    }

    pub const fn k(&self) -> usize {
        self.k
    }

    /// Change the cluster count; discards any seeding
    pub fn set_k(&mut self, k: usize) -> Result<()> {
        if k == 0 {
            return Err(ZoneError::invalid("cluster count must be at least 1"));
        }
        if k != self.k {
            self.k = k;
            self.reset();
        }
        Ok(())
    }

    pub const fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub fn set_metric(&mut self, metric: DistanceMetric) {
        self.metric = metric;
    }

    pub const fn max_steps(&self) -> usize {
        self.max_steps
    }

    pub fn set_max_steps(&mut self, max_steps: usize) -> Result<()> {
        if max_steps == 0 {
            return Err(ZoneError::invalid("max steps must be at least 1"));
        }
        self.max_steps = max_steps;
        Ok(())
    }

    /// Seed of the generator used by [`Self::initialize_random`]
    pub const fn random_seed(&self) -> u64 {
        self.random_seed
    }

    pub fn set_random_seed(&mut self, seed: u64) {
        self.random_seed = seed;
    }

    pub const fn state(&self) -> EngineState {
        self.state
    }

    /// Current cluster centers, empty until initialized
    pub fn centers(&self) -> &[ClusterCenter] {
        &self.centers
    }

    /// Iterations executed by the last run
    pub const fn iterations(&self) -> usize {
        self.iterations
    }

    /// Use explicit cluster centers.
    ///
    /// A list whose length differs from `k` redefines `k`. An empty list is
    /// ignored and the previous state is kept.
    pub fn seed(&mut self, centers: &[PixelSample]) {
        if centers.is_empty() {
            warn!("Ignoring empty k-means seed list, keeping {} clusters", self.k);
            return;
        }
        if centers.len() != self.k {
            debug!("Seeding redefines k from {} to {}", self.k, centers.len());
            self.k = centers.len();
            self.reset();
        }

        self.centers = centers.iter().copied().map(ClusterCenter::from_sample).collect();
        self.state = EngineState::Initialized;
    }

    /// Pick `k` centers uniformly inside `rows x cols`, sampling their values
    /// from `image`. The rectangle is clipped to the image.
    pub fn initialize_random(
        &mut self,
        image: &Raster,
        rows: Range<usize>,
        cols: Range<usize>,
    ) -> Result<()> {
        image.ensure_not_empty()?;
        let rows = rows.start..rows.end.min(image.rows());
        let cols = cols.start..cols.end.min(image.cols());
        if rows.is_empty() || cols.is_empty() {
            return Err(ZoneError::invalid(format!(
                "seeding rectangle rows {rows:?} x cols {cols:?} lies outside the {}x{} image",
                image.rows(),
                image.cols()
            )));
        }

        let mut rng = StdRng::seed_from_u64(self.random_seed);
        let mut centers = Vec::with_capacity(self.k);
        for _ in 0..self.k {
            let row = rng.random_range(rows.clone());
            let col = rng.random_range(cols.clone());
            if let Some(sample) = image.sample(row, col) {
                centers.push(ClusterCenter::from_sample(sample));
            }
        }

        self.centers = centers;
        self.state = EngineState::Initialized;
        Ok(())
    }

    /// Cluster `image`, seeding randomly over the whole image if needed
    pub fn run(&mut self, image: &Raster) -> Result<Raster> {
        self.run_with_cancel(image, &CancelToken::new())
    }

    /// Same as [`Self::run`], checking `cancel` before every iteration
    pub fn run_with_cancel(&mut self, image: &Raster, cancel: &CancelToken) -> Result<Raster> {
        image.ensure_not_empty()?;
        if self.state == EngineState::Uninitialized {
            self.initialize_random(image, 0..image.rows(), 0..image.cols())?;
        }

        info!(
            "K-means on {}x{} image: {} clusters, {}, at most {} steps",
            image.rows(),
            image.cols(),
            self.k,
            self.metric,
            self.max_steps
        );

        let pixel_count = image.len() as f64;
        let mut previous: Option<f64> = None;
        self.iterations = 0;
        self.state = EngineState::Iterating;

        loop {
            if self.iterations >= self.max_steps {
                self.state = EngineState::MaxStepsReached;
                break;
            }
            if cancel.is_cancelled() {
                self.state = EngineState::Initialized;
                return Err(ZoneError::Cancelled);
            }

            let mean_dist = self.step(image) / pixel_count;
            self.iterations += 1;

            if let Some(prev) = previous {
                let delta = (mean_dist - prev).abs();
                debug!(
                    "K-means iteration {}: mean distance {:.4}, delta {:.4}",
                    self.iterations, mean_dist, delta
                );
                if delta <= CONVERGENCE_EPSILON {
                    self.state = EngineState::Converged;
                    break;
                }
            } else {
                debug!(
                    "K-means iteration {}: mean distance {:.4}",
                    self.iterations, mean_dist
                );
            }
            previous = Some(mean_dist);
        }

        info!(
            "K-means finished after {} iterations ({:?})",
            self.iterations, self.state
        );

        Ok(self.paint(image))
    }

    /// One assignment and update pass; returns the summed distance
    fn step(&mut self, image: &Raster) -> f64 {
        self.centers.iter_mut().for_each(ClusterCenter::clear);

        let cols = image.cols();
        for sample in image.samples() {
            if let Some((index, dist)) = self.closest_cluster(&sample) {
                let center = &mut self.centers[index];
                center.members.push(sample.row * cols + sample.col);
                center.total_dist += dist;
            }
        }

        let total: f64 = self.centers.iter().map(|c| c.total_dist).sum();
        for center in &mut self.centers {
            center.recenter(image);
        }
        total
    }

    /// Index and distance of the nearest center; ties go to the lowest index
    fn closest_cluster(&self, sample: &PixelSample) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (index, center) in self.centers.iter().enumerate() {
            let dist = self.metric.distance(sample, &center.sample());
            match best {
                Some((_, best_dist)) if dist >= best_dist => {}
                _ => best = Some((index, dist)),
            }
        }
        best
    }

    fn paint(&self, image: &Raster) -> Raster {
        let mut output = image.blank_like();
        let cols = image.cols();
        for center in &self.centers {
            for &idx in &center.members {
                output.set(idx / cols, idx % cols, center.value);
            }
        }
        output
    }

    fn reset(&mut self) {
        self.centers.clear();
        self.iterations = 0;
        self.state = EngineState::Uninitialized;
    }
}

/// Carve `image` into `n_tiles` Voronoi cells by clustering on pixel
/// position only.
pub fn random_framing(image: &Raster, n_tiles: usize) -> Result<Raster> {
    let mut engine = KMeansEngine::new(n_tiles, DistanceMetric::Euclidean, FRAMING_MAX_STEPS)?;
    engine.run(image)
}
