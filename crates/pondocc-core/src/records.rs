use polars::prelude::*;
use pondocc_parser::{CoreArea, PondStatus, PondType};
use serde::Serialize;

use crate::schema::*;

/// One survey outcome for one site in one year, after duplicates are collapsed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteYearRecord {
    pub site_id: String,
    pub year: i64,
    pub detected: bool,
    /// Detected in this year or any earlier one.
    pub ever_colonized: bool,
    pub edna_score: Option<f64>,
    pub pond_type: Option<PondType>,
    pub area: Option<CoreArea>,
    pub status: PondStatus,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub region: Option<String>,
}

/// A normalized site agreement, kept only for complete or failed ponds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanAgreement {
    pub site_id: String,
    pub grid_reference: String,
    pub status: PondStatus,
    pub pond_type: Option<PondType>,
    pub area: Option<CoreArea>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

fn flag(value: bool) -> i64 {
    i64::from(value)
}

/// Builds the cleaned survey table in [`CLEAN_SURVEY_COLUMNS`] order.
pub fn site_year_frame(records: &[SiteYearRecord]) -> PolarsResult<DataFrame> {
    let site_ids: Vec<&str> = records.iter().map(|r| r.site_id.as_str()).collect();
    let years: Vec<i64> = records.iter().map(|r| r.year).collect();
    let detected: Vec<i64> = records.iter().map(|r| flag(r.detected)).collect();
    let colonized: Vec<i64> = records.iter().map(|r| flag(r.ever_colonized)).collect();
    let scores: Vec<Option<f64>> = records.iter().map(|r| r.edna_score).collect();
    let types: Vec<Option<&str>> = records
        .iter()
        .map(|r| r.pond_type.as_ref().map(PondType::as_str))
        .collect();
    let areas: Vec<Option<&str>> = records
        .iter()
        .map(|r| r.area.as_ref().map(CoreArea::as_str))
        .collect();
    let statuses: Vec<&str> = records.iter().map(|r| r.status.as_str()).collect();
    let latitudes: Vec<Option<f64>> = records.iter().map(|r| r.latitude).collect();
    let longitudes: Vec<Option<f64>> = records.iter().map(|r| r.longitude).collect();
    let regions: Vec<Option<&str>> = records.iter().map(|r| r.region.as_deref()).collect();

    DataFrame::new(vec![
        Series::new(SITE_ID.into(), site_ids).into(),
        Series::new(YEAR.into(), years).into(),
        Series::new(DETECTED.into(), detected).into(),
        Series::new(EVER_COLONIZED.into(), colonized).into(),
        Series::new(EDNA_SCORE.into(), scores).into(),
        Series::new(POND_TYPE.into(), types).into(),
        Series::new(AREA.into(), areas).into(),
        Series::new(STATUS.into(), statuses).into(),
        Series::new(LATITUDE.into(), latitudes).into(),
        Series::new(LONGITUDE.into(), longitudes).into(),
        Series::new(REGION.into(), regions).into(),
    ])
}

/// Builds the cleaned agreement table in [`CLEAN_AGREEMENT_COLUMNS`] order.
pub fn agreement_frame(agreements: &[CleanAgreement]) -> PolarsResult<DataFrame> {
    let site_ids: Vec<&str> = agreements.iter().map(|a| a.site_id.as_str()).collect();
    let grid_refs: Vec<&str> = agreements
        .iter()
        .map(|a| a.grid_reference.as_str())
        .collect();
    let statuses: Vec<&str> = agreements.iter().map(|a| a.status.as_str()).collect();
    let types: Vec<Option<&str>> = agreements
        .iter()
        .map(|a| a.pond_type.as_ref().map(PondType::as_str))
        .collect();
    let areas: Vec<Option<&str>> = agreements
        .iter()
        .map(|a| a.area.as_ref().map(CoreArea::as_str))
        .collect();
    let latitudes: Vec<Option<f64>> = agreements.iter().map(|a| a.latitude).collect();
    let longitudes: Vec<Option<f64>> = agreements.iter().map(|a| a.longitude).collect();

    DataFrame::new(vec![
        Series::new(SITE_ID.into(), site_ids).into(),
        Series::new(GRID_REFERENCE.into(), grid_refs).into(),
        Series::new(STATUS.into(), statuses).into(),
        Series::new(POND_TYPE.into(), types).into(),
        Series::new(AREA.into(), areas).into(),
        Series::new(LATITUDE.into(), latitudes).into(),
        Series::new(LONGITUDE.into(), longitudes).into(),
    ])
}
