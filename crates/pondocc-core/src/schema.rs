//! Column names of the tables exchanged between pipeline stages.
//!
//! The cleaned survey table is the contract between preprocessing and the
//! estimator: either side may be re-run on its own, so names, order and
//! dtypes here must stay stable.

use std::sync::Arc;

use once_cell::sync::Lazy;
use polars::prelude::*;

pub const SITE_ID: &str = "site_id";
pub const YEAR: &str = "year";
pub const DETECTED: &str = "detected";
pub const EVER_COLONIZED: &str = "ever_colonized";
pub const EDNA_SCORE: &str = "edna_score";
pub const POND_TYPE: &str = "type";
pub const AREA: &str = "area";
pub const STATUS: &str = "status";
pub const LATITUDE: &str = "latitude";
pub const LONGITUDE: &str = "longitude";
pub const REGION: &str = "region";

pub const GRID_REFERENCE: &str = "grid_reference";

pub const FIRST_DETECTED_YEAR: &str = "first_detected_year";
pub const NEW_PRESENCE: &str = "new_presence";
pub const PREVIOUSLY_COLONIZED: &str = "previously_colonized";
pub const ABSENCE: &str = "absence";

pub const PONDS_SURVEYED: &str = "ponds_surveyed";
pub const NEW_PRESENCE_COUNT: &str = "new_presence_count";
pub const PREVIOUSLY_COLONIZED_COUNT: &str = "previously_colonized_count";
pub const ABSENCE_COUNT: &str = "absence_count";
pub const YEARLY_COLONISATION_RATE: &str = "yearly_colonisation_rate";
pub const NAIVE_OCCUPANCY_RATE: &str = "naive_occupancy_rate";
pub const LOWER_CI: &str = "lower_ci";
pub const UPPER_CI: &str = "upper_ci";

pub const CLEAN_SURVEY_COLUMNS: [&str; 11] = [
    SITE_ID,
    YEAR,
    DETECTED,
    EVER_COLONIZED,
    EDNA_SCORE,
    POND_TYPE,
    AREA,
    STATUS,
    LATITUDE,
    LONGITUDE,
    REGION,
];

pub const CLEAN_AGREEMENT_COLUMNS: [&str; 7] = [
    SITE_ID,
    GRID_REFERENCE,
    STATUS,
    POND_TYPE,
    AREA,
    LATITUDE,
    LONGITUDE,
];

pub const OCCUPANCY_COLUMNS: [&str; 10] = [
    REGION,
    YEAR,
    PONDS_SURVEYED,
    NEW_PRESENCE_COUNT,
    PREVIOUSLY_COLONIZED_COUNT,
    ABSENCE_COUNT,
    YEARLY_COLONISATION_RATE,
    NAIVE_OCCUPANCY_RATE,
    LOWER_CI,
    UPPER_CI,
];

static CLEAN_SURVEY_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::from_iter([
        Field::new(SITE_ID.into(), DataType::String),
        Field::new(YEAR.into(), DataType::Int64),
        Field::new(DETECTED.into(), DataType::Int64),
        Field::new(EVER_COLONIZED.into(), DataType::Int64),
        Field::new(EDNA_SCORE.into(), DataType::Float64),
        Field::new(POND_TYPE.into(), DataType::String),
        Field::new(AREA.into(), DataType::String),
        Field::new(STATUS.into(), DataType::String),
        Field::new(LATITUDE.into(), DataType::Float64),
        Field::new(LONGITUDE.into(), DataType::Float64),
        Field::new(REGION.into(), DataType::String),
    ])
});

/// Schema used when reading the cleaned survey table back from disk, so that
/// an all-null column keeps its dtype.
pub fn clean_survey_schema() -> SchemaRef {
    Arc::new(CLEAN_SURVEY_SCHEMA.clone())
}
