//! Address feature extraction.
//!
//! Reads an address table, extracts per-tag OSM statistics around every
//! address from the configured regional geometry files, and writes the
//! resulting feature table as CSV.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use hashbrown::HashMap;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use waypost::features::{read_addresses_path, FeatureTablePipeline, ProgressSink};
use waypost::spatial::FileSources;
use waypost::{Config, FeatureType, Region};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "extract")]
#[command(about = "Extract OSM context features around addresses")]
struct Args {
    /// TOML config with extraction settings and region geometry sources
    #[arg(short, long)]
    config: PathBuf,

    /// Address CSV (ID, Address, Lat_Lon, optional Shipping)
    #[arg(short, long)]
    addresses: PathBuf,

    /// Output feature table CSV
    #[arg(short, long)]
    output: PathBuf,

    /// Override the configured feature type (building, highway, landuse)
    #[arg(long)]
    feature_type: Option<FeatureType>,

    /// Override the configured tags (comma separated)
    #[arg(long, value_delimiter = ',')]
    tags: Option<Vec<String>>,

    /// Override the search distance in meters
    #[arg(long)]
    distance: Option<f64>,

    /// Also emit summed area columns
    #[arg(long)]
    area: bool,

    /// Process regions one after another instead of in parallel
    #[arg(long)]
    sequential: bool,

    /// Write a JSON run summary to this path
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Disable progress bars
    #[arg(short, long)]
    quiet: bool,
}

/// One progress bar per region, shown once the region starts
struct RegionBars {
    multi: MultiProgress,
    bars: HashMap<Region, ProgressBar>,
}

impl RegionBars {
    fn new() -> Result<Self> {
        let style = ProgressStyle::default_bar()
            .template("{prefix:>10} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-");

        let bars = Region::all()
            .iter()
            .map(|region| {
                let bar = ProgressBar::hidden()
                    .with_style(style.clone())
                    .with_prefix(region.name());
                (*region, bar)
            })
            .collect();

        Ok(Self {
            multi: MultiProgress::new(),
            bars,
        })
    }
}

impl ProgressSink for RegionBars {
    fn region_started(&self, region: Region, addresses: usize) {
        if let Some(bar) = self.bars.get(&region) {
            bar.set_length(addresses as u64);
            bar.set_message("loading");
            self.multi.add(bar.clone());
        }
    }

    fn address_done(&self, region: Region) {
        if let Some(bar) = self.bars.get(&region) {
            bar.set_message("");
            bar.inc(1);
        }
    }

    fn region_finished(&self, region: Region, rows: usize) {
        if let Some(bar) = self.bars.get(&region) {
            bar.finish_with_message(format!("{} rows", rows));
        }
    }
}

fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    info!("Waypost feature extraction");
    info!("Config: {}", args.config.display());

    let mut config = Config::load_from_file(&args.config)
        .with_context(|| format!("Failed to load config {}", args.config.display()))?;

    let extraction = &mut config.extraction;
    if let Some(feature_type) = args.feature_type {
        extraction.feature_type = feature_type;
    }
    if let Some(tags) = args.tags.clone() {
        extraction.tags = tags;
    }
    if let Some(distance) = args.distance {
        extraction.distance_m = distance;
    }
    extraction.area |= args.area;
    if args.sequential {
        extraction.parallel = false;
    }
    extraction.validate().context("Invalid extraction settings")?;

    info!(
        "Extracting {} tags {:?} within {}m (area: {})",
        extraction.feature_type, extraction.tags, extraction.distance_m, extraction.area
    );

    let addresses = read_addresses_path(&args.addresses)
        .with_context(|| format!("Failed to read addresses {}", args.addresses.display()))?;
    info!("Loaded {} addresses", addresses.len());

    let sources = FileSources::from_config(&config);
    let bars = if args.quiet {
        None
    } else {
        Some(RegionBars::new()?)
    };

    let mut pipeline = FeatureTablePipeline::new(&sources, &config.extraction);
    if let Some(bars) = &bars {
        pipeline = pipeline.with_progress(bars);
    }
    let report = pipeline.run(&addresses).context("Feature extraction failed")?;

    report
        .table
        .write_csv_path(&args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    info!(
        "Wrote {} rows to {}",
        report.table.len(),
        args.output.display()
    );

    if report.skipped_count() > 0 {
        warn!(
            "{} addresses skipped (unclassified region or invalid coordinates)",
            report.skipped_count()
        );
    }
    for failure in &report.failed_regions {
        warn!(
            "Region {} failed ({} addresses): {}",
            failure.region, failure.addresses, failure.error
        );
    }

    if let Some(path) = &args.summary {
        let file = File::create(path)
            .with_context(|| format!("Failed to create summary {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &report.summary())
            .context("Failed to write run summary")?;
        info!("Run summary written to {}", path.display());
    }

    Ok(())
}
