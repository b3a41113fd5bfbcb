#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::doc_markdown,
    clippy::uninlined_format_args,
    clippy::match_same_arms,
    clippy::needless_pass_by_value
)]

use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use serde_json::json;

use zonecut::border::zone_borders;
use zonecut::config::ConfigFormat;
use zonecut::{
    apply_framing, create_zones, random_framing, DistanceMetric, KMeansEngine, Raster,
    RegionSimilarityEngine, SegmentationTask, ZoneConfig, ZoneError,
};

/// zonecut puzzle zone tools
#[derive(Parser)]
#[command(name = "zonecut")]
#[command(about = "zonecut - cut images into puzzle zones by clustering or quadtree segmentation")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (toml, json or yaml); flags override its values
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode (only errors)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Quantize an image into k clusters
    Kmeans {
        /// Input image file
        input: PathBuf,
        /// Output zone image
        output: PathBuf,
        /// Number of clusters
        #[arg(short = 'k', long)]
        clusters: Option<usize>,
        /// Maximum number of iterations
        #[arg(long)]
        max_steps: Option<usize>,
        /// Distance metric (euclidean, svd, hsv-svd, ed-svd, ed-hsv-svd)
        #[arg(short, long)]
        metric: Option<DistanceMetric>,
        /// Seed for random center placement
        #[arg(long)]
        seed: Option<u64>,
        #[command(flatten)]
        extras: Extras,
    },
    /// Segment an image into homogeneous quadtree regions
    Regions {
        /// Input image file
        input: PathBuf,
        /// Output zone image
        output: PathBuf,
        /// Initial tile width
        #[arg(long)]
        region_width: Option<usize>,
        /// Initial tile height
        #[arg(long)]
        region_height: Option<usize>,
        /// Smallest tile size that is still split
        #[arg(long)]
        min_region_size: Option<usize>,
        /// Similarity threshold (0.0-1.0)
        #[arg(short, long)]
        threshold: Option<f32>,
        /// Merge similar neighboring regions
        #[arg(long)]
        merge: bool,
        #[command(flatten)]
        extras: Extras,
    },
    /// Extract the zone borders of an image
    Borders {
        /// Zone image
        input: PathBuf,
        /// Output border mask
        output: PathBuf,
        /// Largest neighbor difference that is not a border
        #[arg(short, long)]
        threshold: Option<u8>,
        /// Neighborhood radius
        #[arg(short, long)]
        radius: Option<usize>,
    },
    /// Cut puzzle pieces from a grid of seeds
    Framing {
        /// Input image file
        input: PathBuf,
        /// Output zone image
        output: PathBuf,
        /// Seed rows of the starting grid
        #[arg(long)]
        rows: Option<usize>,
        /// Seed columns of the starting grid
        #[arg(long)]
        cols: Option<usize>,
        /// Keep seeds exactly at the cell centers
        #[arg(long)]
        no_jitter: bool,
        /// Largest row offset of a jittered seed
        #[arg(long)]
        row_tolerance: Option<usize>,
        /// Largest column offset of a jittered seed
        #[arg(long)]
        col_tolerance: Option<usize>,
        /// Seed of the jitter generator
        #[arg(long)]
        seed: Option<u64>,
        /// Cluster N randomly placed seeds instead of using a grid
        #[arg(long, value_name = "N", conflicts_with_all = ["rows", "cols"])]
        random_tiles: Option<usize>,
        /// Also write the input with the piece outlines blanked out
        #[arg(long)]
        framed: Option<PathBuf>,
        #[command(flatten)]
        extras: Extras,
    },
    /// Print the effective configuration
    InspectConfig {
        /// Output format
        #[arg(short, long, default_value = "toml")]
        format: InspectFormat,
    },
}

/// Outputs shared by every segmentation command
#[derive(clap::Args)]
struct Extras {
    /// Also write the zone borders to this file
    #[arg(long)]
    borders: Option<PathBuf>,
    /// Print a JSON summary of the run
    #[arg(long)]
    report: bool,
}

#[derive(ValueEnum, Clone, Copy)]
enum InspectFormat {
    Json,
    Yaml,
    Toml,
}

impl From<InspectFormat> for ConfigFormat {
    fn from(format: InspectFormat) -> Self {
        match format {
            InspectFormat::Json => Self::Json,
            InspectFormat::Yaml => Self::Yaml,
            InspectFormat::Toml => Self::Toml,
        }
    }
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.quiet {
        log::LevelFilter::Error
    } else if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if args.quiet && args.verbose {
        warn!("Both --quiet and --verbose specified, using --quiet");
    }

    if let Err(e) = run(args) {
        error!("Command failed: {:#}", e);

        // Map to appropriate exit codes
        let exit_code = match e.downcast_ref::<ZoneError>() {
            Some(err) if err.is_caller_misuse() => 1,
            Some(ZoneError::ImageError(_)) => 1,
            Some(ZoneError::IoError(_)) => 1,
            _ => 2,
        };

        process::exit(exit_code);
    }
}

fn run(args: Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            ZoneConfig::from_path(path)?
        }
        None => ZoneConfig::default(),
    };
    let progress = !args.quiet;

    match args.command {
        Commands::Kmeans {
            input,
            output,
            clusters,
            max_steps,
            metric,
            seed,
            extras,
        } => {
            let kmeans = &mut config.kmeans;
            override_with(&mut kmeans.clusters, clusters);
            override_with(&mut kmeans.max_steps, max_steps);
            override_with(&mut kmeans.metric, metric);
            override_with(&mut kmeans.random_seed, seed);
            config.validate()?;
            cmd_kmeans(&config, &input, &output, &extras, progress)
        }
        Commands::Regions {
            input,
            output,
            region_width,
            region_height,
            min_region_size,
            threshold,
            merge,
            extras,
        } => {
            let regions = &mut config.regions;
            override_with(&mut regions.region_width, region_width);
            override_with(&mut regions.region_height, region_height);
            override_with(&mut regions.min_region_size, min_region_size);
            override_with(&mut regions.similarity_threshold, threshold);
            regions.merge_regions |= merge;
            config.validate()?;
            cmd_regions(&config, &input, &output, &extras, progress)
        }
        Commands::Borders {
            input,
            output,
            threshold,
            radius,
        } => {
            override_with(&mut config.border.threshold, threshold);
            override_with(&mut config.border.neighborhood_size, radius);
            cmd_borders(&config, &input, &output)
        }
        Commands::Framing {
            input,
            output,
            rows,
            cols,
            no_jitter,
            row_tolerance,
            col_tolerance,
            seed,
            random_tiles,
            framed,
            extras,
        } => {
            let framing = &mut config.framing;
            override_with(&mut framing.rows, rows);
            override_with(&mut framing.cols, cols);
            override_with(&mut framing.row_tolerance, row_tolerance);
            override_with(&mut framing.col_tolerance, col_tolerance);
            override_with(&mut framing.random_seed, seed);
            framing.randomize &= !no_jitter;
            config.validate()?;
            let outputs = FramingOutputs {
                zones: &output,
                framed: framed.as_deref(),
                extras: &extras,
            };
            cmd_framing(&config, &input, random_tiles, &outputs, progress)
        }
        Commands::InspectConfig { format } => {
            config.validate()?;
            print!("{}", config.render(format.into())?);
            Ok(())
        }
    }
}

fn override_with<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn cmd_kmeans(
    config: &ZoneConfig,
    input: &Path,
    output: &Path,
    extras: &Extras,
    progress: bool,
) -> Result<()> {
    let params = &config.kmeans;
    info!(
        "Clustering {} into {} zones using {}",
        input.display(),
        params.clusters,
        params.metric
    );

    let image = load_raster(input)?;
    let engine = KMeansEngine::from_config(params)?;
    let (engine, zones) = run_in_background(
        || SegmentationTask::kmeans(engine, image),
        "Clustering pixels...",
        progress,
    )?;

    info!(
        "Finished after {} iterations ({:?})",
        engine.iterations(),
        engine.state()
    );
    finish(config, zones, output, extras, || {
        json!({
            "command": "kmeans",
            "clusters": engine.k(),
            "metric": engine.metric().key(),
            "iterations": engine.iterations(),
            "state": format!("{:?}", engine.state()),
            "members": engine.centers().iter().map(|c| c.member_count()).collect::<Vec<_>>(),
        })
    })
}

fn cmd_regions(
    config: &ZoneConfig,
    input: &Path,
    output: &Path,
    extras: &Extras,
    progress: bool,
) -> Result<()> {
    info!("Segmenting {} into similarity regions", input.display());

    let image = load_raster(input)?;
    let engine = RegionSimilarityEngine::new(&config.regions, &image)?;
    let (engine, zones) = run_in_background(
        || SegmentationTask::regions(engine),
        "Splitting regions...",
        progress,
    )?;

    let regions = engine.regions();
    let homogeneous = regions.iter().filter(|r| r.is_homogeneous).count();
    info!(
        "Found {} regions, {} homogeneous",
        regions.len(),
        homogeneous
    );
    finish(config, zones, output, extras, || {
        json!({
            "command": "regions",
            "regions": regions.len(),
            "homogeneous": homogeneous,
            "split": regions.iter().filter(|r| r.has_children).count(),
            "merged": engine.merge_regions(),
        })
    })
}

fn cmd_borders(config: &ZoneConfig, input: &Path, output: &Path) -> Result<()> {
    info!("Extracting borders of {}", input.display());

    let zones = load_raster(input)?;
    let mask = zone_borders(&zones, &config.border);
    mask.save(output)
        .map_err(ZoneError::from)
        .with_context(|| format!("writing {}", output.display()))?;

    info!("Border mask written to {}", output.display());
    Ok(())
}

/// Where the framing command writes its results
struct FramingOutputs<'a> {
    zones: &'a Path,
    framed: Option<&'a Path>,
    extras: &'a Extras,
}

fn cmd_framing(
    config: &ZoneConfig,
    input: &Path,
    random_tiles: Option<usize>,
    outputs: &FramingOutputs<'_>,
    progress: bool,
) -> Result<()> {
    let grid = config.framing;
    match random_tiles {
        Some(tiles) => info!("Framing {} into about {} random tiles", input.display(), tiles),
        None => info!(
            "Framing {} on a {}x{} seed grid",
            input.display(),
            grid.rows,
            grid.cols
        ),
    }

    let image = load_raster(input)?;
    let source = image.clone();
    let zones = run_in_background(
        || {
            SegmentationTask::spawn(move |_| match random_tiles {
                Some(tiles) => random_framing(&image, tiles),
                None => create_zones(&image, &grid),
            })
        },
        "Framing tiles...",
        progress,
    )?;

    if let Some(path) = outputs.framed {
        let mask = zone_borders(&zones, &config.border);
        apply_framing(&source, &mask)?
            .into_dynamic()
            .save(path)
            .map_err(ZoneError::from)
            .with_context(|| format!("writing {}", path.display()))?;
        info!("Framed image written to {}", path.display());
    }

    finish(config, zones, outputs.zones, outputs.extras, || match random_tiles {
        Some(tiles) => json!({
            "command": "framing",
            "mode": "random",
            "tiles": tiles,
        }),
        None => json!({
            "command": "framing",
            "mode": "grid",
            "rows": grid.rows,
            "cols": grid.cols,
            "randomize": grid.randomize,
            "seed": grid.random_seed,
        }),
    })
}

/// Save the zone image, its optional border mask and the optional report
fn finish(
    config: &ZoneConfig,
    zones: Raster,
    output: &Path,
    extras: &Extras,
    report: impl FnOnce() -> serde_json::Value,
) -> Result<()> {
    if let Some(path) = &extras.borders {
        zone_borders(&zones, &config.border)
            .save(path)
            .map_err(ZoneError::from)
            .with_context(|| format!("writing {}", path.display()))?;
        info!("Border mask written to {}", path.display());
    }

    zones
        .into_dynamic()
        .save(output)
        .map_err(ZoneError::from)
        .with_context(|| format!("writing {}", output.display()))?;
    info!("Zone image written to {}", output.display());

    if extras.report {
        println!("{}", serde_json::to_string_pretty(&report())?);
    }
    Ok(())
}

fn load_raster(path: &Path) -> Result<Raster> {
    let image = image::open(path).map_err(ZoneError::from)?;
    let raster = Raster::from_dynamic(image);
    info!(
        "Loaded {}x{} {:?} image",
        raster.cols(),
        raster.rows(),
        raster.kind()
    );
    Ok(raster)
}

/// Spawn a background task and wait for it, showing a spinner meanwhile
fn run_in_background<T: Send + 'static>(
    spawn: impl FnOnce() -> SegmentationTask<T>,
    message: &'static str,
    progress: bool,
) -> Result<T> {
    let runtime = tokio::runtime::Runtime::new()?;
    let spinner = progress.then(|| create_spinner(message));

    let result = runtime.block_on(async move { spawn().join().await });

    if let Some(pb) = spinner {
        match &result {
            Ok(_) => pb.finish_with_message("Done"),
            Err(_) => pb.abandon_with_message("Failed"),
        }
    }
    Ok(result?)
}

fn create_spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("[{elapsed_precise}] {spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
