#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::missing_errors_doc
)]

//! zonecut - carve raster images into puzzle zones
//!
//! This library decides how an image is cut into pieces. Two independent
//! engines produce a zone image in which equal pixel values mark the same
//! zone:
//!
//! - [`KMeansEngine`] clusters pixels around `k` centers under one of five
//!   [`DistanceMetric`]s and outputs a quantized image.
//! - [`RegionSimilarityEngine`] tiles the image, recursively splits tiles that
//!   are not homogeneous in HSV space, optionally merges similar neighbors and
//!   paints every homogeneous region with its mean color.
//!
//! [`framing::create_zones`] cuts regular puzzle pieces from a jittered seed
//! grid. [`border::get_borders`] then turns any zone image into a binary
//! outline.
//! All engines are synchronous; [`task`] wraps them for background use.

pub mod border;
pub mod color;
pub mod config;
pub mod error;
pub mod framing;
pub mod kmeans;
pub mod metric;
pub mod raster;
pub mod regions;
pub mod task;

pub use border::{get_borders, is_border};
pub use color::{compute_hue_mean, Hsv};
pub use config::{BorderConfig, FramingConfig, KMeansConfig, RegionConfig, ZoneConfig};
pub use error::{Result, ZoneError};
pub use framing::{apply_framing, create_zones};
pub use kmeans::{random_framing, ClusterCenter, EngineState, KMeansEngine};
pub use metric::DistanceMetric;
pub use raster::{PixelSample, PixelValue, Raster, RasterKind};
pub use regions::{Neighbors, Region, RegionSimilarityEngine};
pub use task::CancelToken;

#[cfg(feature = "background")]
pub use task::SegmentationTask;
