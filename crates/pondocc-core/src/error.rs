// crates/pondocc-core/src/error.rs

use thiserror::Error;

use crate::aggregation::AggregationError;
use crate::config::ConfigError;
use crate::io::TableIoError;
use crate::preprocess::PreprocessError;
use crate::regions::RegionError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Table I/O failed: {0}")]
    TableIo(#[from] TableIoError),

    #[error("Region boundaries invalid: {0}")]
    Regions(#[from] RegionError),

    #[error("Preprocessing failed: {0}")]
    Preprocess(#[from] PreprocessError),

    #[error("Aggregation failed: {0}")]
    Aggregation(#[from] AggregationError),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
