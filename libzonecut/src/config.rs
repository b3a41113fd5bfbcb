//! Engine parameters
//!
//! Each engine has a plain serde-friendly configuration struct. Defaults
//! match what a fresh processor starts with; `validate` reports caller
//! misuse as [`ZoneError::InvalidConfiguration`] before any engine runs.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ZoneError};
use crate::metric::DistanceMetric;

/// Parameters of [`crate::KMeansEngine`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KMeansConfig {
    /// Number of clusters (at least 1)
    pub clusters: usize,
    /// Maximum number of iterations (at least 1)
    pub max_steps: usize,
    pub metric: DistanceMetric,
    /// Seed for random center placement
    pub random_seed: u64,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            clusters: 2,
            max_steps: 10,
            metric: DistanceMetric::Euclidean,
            random_seed: 0,
        }
    }
}

impl KMeansConfig {
    pub fn validate(&self) -> Result<()> {
        if self.clusters == 0 {
            return Err(ZoneError::invalid("cluster count must be at least 1"));
        }
        if self.max_steps == 0 {
            return Err(ZoneError::invalid("max steps must be at least 1"));
        }
        Ok(())
    }
}

/// Parameters of [`crate::RegionSimilarityEngine`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    /// Maximum normalized HSV deviation inside a homogeneous region, in `[0, 1]`
    pub similarity_threshold: f32,
    /// Initial tile width
    pub region_width: usize,
    /// Initial tile height
    pub region_height: usize,
    /// Recursion floor, strictly between 0 and the smaller tile dimension
    pub min_region_size: usize,
    /// Merge similar neighboring regions before painting
    pub merge_regions: bool,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.1,
            region_width: 25,
            region_height: 25,
            min_region_size: 5,
            merge_regions: false,
        }
    }
}

impl RegionConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(ZoneError::invalid(format!(
                "similarity threshold must be within [0, 1], got {}",
                self.similarity_threshold
            )));
        }
        if self.region_width == 0 || self.region_height == 0 {
            return Err(ZoneError::invalid(format!(
                "region size must be positive, got {}x{}",
                self.region_width, self.region_height
            )));
        }
        let smallest = self.region_width.min(self.region_height);
        if self.min_region_size == 0 || self.min_region_size >= smallest {
            return Err(ZoneError::invalid(format!(
                "minimum region size must be within (0, {smallest}), got {}",
                self.min_region_size
            )));
        }
        Ok(())
    }
}

/// Parameters of [`crate::border::get_borders`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BorderConfig {
    /// Largest neighbor difference that is not a border
    pub threshold: u8,
    /// Radius of the square neighborhood
    pub neighborhood_size: usize,
}

impl Default for BorderConfig {
    fn default() -> Self {
        Self {
            threshold: 0,
            neighborhood_size: 2,
        }
    }
}

/// Parameters of [`crate::framing::create_zones`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FramingConfig {
    /// Seed rows of the starting grid
    pub rows: usize,
    /// Seed columns of the starting grid
    pub cols: usize,
    /// Nudge every seed around its cell center
    pub randomize: bool,
    /// Largest row offset applied by `randomize`
    pub row_tolerance: usize,
    /// Largest column offset applied by `randomize`
    pub col_tolerance: usize,
    /// Seed of the jitter generator
    pub random_seed: u64,
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self {
            rows: 10,
            cols: 10,
            randomize: true,
            row_tolerance: 10,
            col_tolerance: 10,
            random_seed: 0,
        }
    }
}

impl FramingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.rows == 0 || self.cols == 0 {
            return Err(ZoneError::invalid(format!(
                "framing grid must have at least one seed per axis, got {}x{}",
                self.rows, self.cols
            )));
        }
        Ok(())
    }
}

/// Complete configuration, as read from a file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneConfig {
    pub kmeans: KMeansConfig,
    pub regions: RegionConfig,
    pub border: BorderConfig,
    pub framing: FramingConfig,
}

/// Serialization formats understood by [`ZoneConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
    Yaml,
}

impl ConfigFormat {
    /// Guess the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("toml") => Ok(Self::Toml),
            Some("json") => Ok(Self::Json),
            Some("yaml" | "yml") => Ok(Self::Yaml),
            _ => Err(ZoneError::ConfigParse(format!(
                "unsupported configuration file: {}",
                path.display()
            ))),
        }
    }
}

impl ZoneConfig {
    /// Load and validate a configuration file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let text = std::fs::read_to_string(path)?;
        let config = Self::parse(&text, format)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration text; missing fields take their defaults
    pub fn parse(text: &str, format: ConfigFormat) -> Result<Self> {
        match format {
            ConfigFormat::Toml => {
                toml::from_str(text).map_err(|e| ZoneError::ConfigParse(e.to_string()))
            }
            ConfigFormat::Json => {
                serde_json::from_str(text).map_err(|e| ZoneError::ConfigParse(e.to_string()))
            }
            ConfigFormat::Yaml => {
                serde_yaml::from_str(text).map_err(|e| ZoneError::ConfigParse(e.to_string()))
            }
        }
    }

    /// Render the configuration in `format`
    pub fn render(&self, format: ConfigFormat) -> Result<String> {
        match format {
            ConfigFormat::Toml => {
                toml::to_string_pretty(self).map_err(|e| ZoneError::ConfigParse(e.to_string()))
            }
            ConfigFormat::Json => serde_json::to_string_pretty(self)
                .map_err(|e| ZoneError::ConfigParse(e.to_string())),
            ConfigFormat::Yaml => {
                serde_yaml::to_string(self).map_err(|e| ZoneError::ConfigParse(e.to_string()))
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.kmeans.validate()?;
        self.regions.validate()?;
        self.framing.validate()?;
        Ok(())
    }
}
