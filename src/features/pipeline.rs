//! Region-partitioned feature table construction.
//!
//! Addresses are classified into regions, each region's geometry store is
//! loaded once, and every address in the region is boxed, matched and
//! aggregated into a row. Regions share nothing mutable and may run on
//! parallel workers; their row buffers are joined in region order.

use chrono::{DateTime, Utc};
use hashbrown::HashMap;
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use super::{aggregate, FeatureRow, FeatureTable};
use crate::config::{ConfigError, ExtractionConfig};
use crate::models::{classify, Address, Region};
use crate::spatial::{match_records, BoundingBox, GeometrySource, GeometryStore, LoadError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("all {} regions with addresses failed to load", .0.len())]
    AllRegionsFailed(Vec<RegionFailure>),
}

/// Why an address produced no row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No recognized state abbreviation
    Unclassified,
    /// Coordinates or distance could not form a search box
    InvalidBox,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedAddress {
    pub id: String,
    pub reason: SkipReason,
}

/// A region whose geometry store could not be loaded
#[derive(Debug)]
pub struct RegionFailure {
    pub region: Region,
    /// Addresses in the region that got no row
    pub addresses: usize,
    pub error: LoadError,
}

/// Receives progress updates from region workers
pub trait ProgressSink: Sync {
    fn region_started(&self, _region: Region, _addresses: usize) {}
    fn address_done(&self, _region: Region) {}
    fn region_finished(&self, _region: Region, _rows: usize) {}
}

/// Progress sink that ignores every update
pub struct NoProgress;

impl ProgressSink for NoProgress {}

/// Final table plus what was left out of it
#[derive(Debug)]
pub struct PipelineReport {
    pub table: FeatureTable,
    pub skipped: Vec<SkippedAddress>,
    pub failed_regions: Vec<RegionFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Serializable run summary
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub feature_type: String,
    pub tags: Vec<String>,
    pub rows: usize,
    pub rows_per_region: Vec<(Region, usize)>,
    pub skipped: Vec<SkippedAddress>,
    pub failed_regions: Vec<FailedRegionSummary>,
}

#[derive(Debug, Serialize)]
pub struct FailedRegionSummary {
    pub region: Region,
    pub addresses: usize,
    pub error: String,
}

impl PipelineReport {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn summary(&self) -> RunSummary {
        let rows_per_region = Region::all()
            .iter()
            .map(|region| {
                let n = self.table.rows.iter().filter(|r| r.region == *region).count();
                (*region, n)
            })
            .filter(|(_, n)| *n > 0)
            .collect();

        RunSummary {
            started_at: self.started_at,
            finished_at: self.finished_at,
            feature_type: self.table.feature_type.to_string(),
            tags: self.table.tags.clone(),
            rows: self.table.len(),
            rows_per_region,
            skipped: self.skipped.clone(),
            failed_regions: self
                .failed_regions
                .iter()
                .map(|f| FailedRegionSummary {
                    region: f.region,
                    addresses: f.addresses,
                    error: f.error.to_string(),
                })
                .collect(),
        }
    }
}

/// Rows or the load failure produced by one region worker
struct RegionOutcome {
    region: Region,
    result: Result<RegionRows, RegionFailure>,
}

struct RegionRows {
    rows: Vec<FeatureRow>,
    skipped: Vec<SkippedAddress>,
}

/// Builds the feature table for a set of addresses
pub struct FeatureTablePipeline<'a, S: GeometrySource> {
    source: &'a S,
    config: &'a ExtractionConfig,
    progress: &'a dyn ProgressSink,
}

impl<'a, S: GeometrySource> FeatureTablePipeline<'a, S> {
    pub fn new(source: &'a S, config: &'a ExtractionConfig) -> Self {
        Self {
            source,
            config,
            progress: &NoProgress,
        }
    }

    pub fn with_progress(mut self, progress: &'a dyn ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    /// Run extraction over `addresses`.
    ///
    /// Unclassifiable addresses are skipped and reported; a region whose
    /// store fails to load loses its rows but the others still run. Only when
    /// every region that had addresses fails does the run itself fail.
    pub fn run(&self, addresses: &[Address]) -> Result<PipelineReport, PipelineError> {
        self.config.validate()?;
        let started_at = Utc::now();

        let (groups, mut skipped) = partition(addresses);
        info!(
            "Classified {} addresses into {} regions ({} skipped)",
            addresses.len(),
            groups.len(),
            skipped.len()
        );

        let outcomes: Vec<RegionOutcome> = if self.config.parallel {
            groups
                .into_par_iter()
                .map(|(region, group)| self.process_region(region, &group))
                .collect()
        } else {
            groups
                .into_iter()
                .map(|(region, group)| self.process_region(region, &group))
                .collect()
        };

        let attempted = outcomes.len();
        let mut rows = Vec::new();
        let mut failed_regions = Vec::new();
        for outcome in outcomes {
            match outcome.result {
                Ok(region_rows) => {
                    rows.extend(region_rows.rows);
                    skipped.extend(region_rows.skipped);
                }
                Err(failure) => {
                    error!(
                        "Region {} failed, {} addresses dropped: {}",
                        outcome.region, failure.addresses, failure.error
                    );
                    failed_regions.push(failure);
                }
            }
        }

        if attempted > 0 && failed_regions.len() == attempted {
            return Err(PipelineError::AllRegionsFailed(failed_regions));
        }

        let table = FeatureTable::from_rows(
            self.config.feature_type,
            self.config.tags.clone(),
            self.config.area,
            rows,
        );
        info!(
            "Feature table complete: {} rows, {} skipped, {} regions failed",
            table.len(),
            skipped.len(),
            failed_regions.len()
        );

        Ok(PipelineReport {
            table,
            skipped,
            failed_regions,
            started_at,
            finished_at: Utc::now(),
        })
    }

    fn process_region(&self, region: Region, addresses: &[&Address]) -> RegionOutcome {
        info!("Processing region {} ({} addresses)", region, addresses.len());
        self.progress.region_started(region, addresses.len());

        let result = match self.source.load(region, self.config.feature_type) {
            Ok(store) => Ok(self.extract_rows(region, &store, addresses)),
            Err(error) => Err(RegionFailure {
                region,
                addresses: addresses.len(),
                error,
            }),
        };

        let rows = result.as_ref().map(|r| r.rows.len()).unwrap_or(0);
        self.progress.region_finished(region, rows);
        RegionOutcome { region, result }
    }

    fn extract_rows(
        &self,
        region: Region,
        store: &GeometryStore,
        addresses: &[&Address],
    ) -> RegionRows {
        let mut rows = Vec::with_capacity(addresses.len());
        let mut skipped = Vec::new();

        for address in addresses {
            match BoundingBox::around(address.location, self.config.distance_m) {
                Ok(bbox) => {
                    let matched = match_records(&bbox, store, self.config.feature_type);
                    let stats = aggregate(&matched, &self.config.tags, self.config.area);
                    rows.push(FeatureRow::new((*address).clone(), region, stats));
                }
                Err(e) => {
                    warn!("Skipping address {}: {}", address.id, e);
                    skipped.push(SkippedAddress {
                        id: address.id.clone(),
                        reason: SkipReason::InvalidBox,
                    });
                }
            }
            self.progress.address_done(region);
        }

        info!("Region {} produced {} rows", region, rows.len());
        RegionRows { rows, skipped }
    }
}

/// Group addresses by region in fixed region order, keeping input order within
/// each group. Unclassifiable addresses are returned separately.
fn partition(addresses: &[Address]) -> (Vec<(Region, Vec<&Address>)>, Vec<SkippedAddress>) {
    let mut by_region: HashMap<Region, Vec<&Address>> = HashMap::new();
    let mut skipped = Vec::new();

    for address in addresses {
        match classify(&address.address) {
            Ok(region) => by_region.entry(region).or_default().push(address),
            Err(e) => {
                warn!("Skipping address {}: {}", address.id, e);
                skipped.push(SkippedAddress {
                    id: address.id.clone(),
                    reason: SkipReason::Unclassified,
                });
            }
        }
    }

    let groups = Region::all()
        .iter()
        .filter_map(|region| by_region.remove(region).map(|group| (*region, group)))
        .collect();

    (groups, skipped)
}
