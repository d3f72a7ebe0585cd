pub mod aggregation;
pub mod colonisation;
pub mod config;
pub mod error;
pub mod gridref;
pub mod interval;
pub mod io;
pub mod pipelines;
pub mod preprocess;
pub mod records;
pub mod regions;
pub mod schema;

pub use error::{PipelineError, Result};
