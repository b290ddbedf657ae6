//! Per-address feature rows built from matched geometries.

mod aggregate;
mod pipeline;
mod table;

pub use aggregate::{aggregate, TagStats};
pub use pipeline::{
    FailedRegionSummary, FeatureTablePipeline, NoProgress, PipelineError, PipelineReport,
    ProgressSink, RegionFailure, RunSummary, SkipReason, SkippedAddress,
};
pub use table::{
    read_addresses, read_addresses_path, FeatureRow, FeatureTable, TableError, BASE_COLUMNS,
};
