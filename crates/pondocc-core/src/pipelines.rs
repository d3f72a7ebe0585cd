use std::path::PathBuf;

use once_cell::sync::Lazy;
use polars::prelude::DataFrame;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::aggregation::{aggregate_strata, strata_frame, StratumAggregate};
use crate::colonisation::classify_surveys;
use crate::config::{EstimatorSettings, PipelineConfig};
use crate::error::Result;
use crate::io;
use crate::preprocess::{preprocess, PreprocessOutput};
use crate::schema::REGION;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EstimatorSummary {
    pub clean_rows: usize,
    pub rows_outside_window: usize,
    pub rows_without_score: usize,
    pub rows_without_region: usize,
    pub strata: usize,
}

#[derive(Debug, Clone)]
pub struct EstimatorOutput {
    pub strata: Vec<StratumAggregate>,
    pub dataframe: DataFrame,
    pub summary: EstimatorSummary,
}

/// Naive occupancy per (region, year) from the cleaned survey table.
pub fn estimate(clean: &DataFrame, settings: &EstimatorSettings) -> Result<EstimatorOutput> {
    let classified = classify_surveys(clean, settings.max_year)?;
    let rows_without_region = classified.dataframe.column(REGION)?.null_count();
    let strata = aggregate_strata(&classified.dataframe, settings.confidence)?;
    let dataframe = strata_frame(&strata)?;

    let summary = EstimatorSummary {
        clean_rows: clean.height(),
        rows_outside_window: classified.rows_outside_window,
        rows_without_score: classified.rows_without_score,
        rows_without_region,
        strata: strata.len(),
    };

    Ok(EstimatorOutput {
        strata,
        dataframe,
        summary,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub stage: &'static str,
    pub outputs: Vec<PathBuf>,
    pub input_fingerprint: String,
    pub details: Value,
}

pub trait PipelineStage: Send + Sync {
    fn code_identifier(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn run(&self, config: &PipelineConfig) -> Result<StageReport>;
}

struct PreprocessStage;

impl PipelineStage for PreprocessStage {
    fn code_identifier(&self) -> &'static str {
        "preprocess"
    }

    fn description(&self) -> &'static str {
        "Normalize agreements and surveys, collapse duplicates, tag regions"
    }

    fn run(&self, config: &PipelineConfig) -> Result<StageReport> {
        let inputs = &config.inputs;
        let input_fingerprint = io::fingerprint(&[
            inputs.agreements.as_path(),
            inputs.surveys.as_path(),
            inputs.boundaries.as_path(),
        ])?;

        let agreements = io::load_agreements(&inputs.agreements)?;
        let surveys = io::load_surveys(&inputs.surveys)?;
        let boundaries = io::load_boundaries(&inputs.boundaries, &config.regions.name_property)?;
        debug!(
            agreements = agreements.len(),
            surveys = surveys.len(),
            regions = boundaries.len(),
            "loaded preprocessing inputs"
        );

        let PreprocessOutput {
            surveys: mut clean_surveys,
            agreements: mut clean_agreements,
            summary,
        } = preprocess(&agreements, &surveys, &boundaries, &config.preprocess)?;

        let outputs = &config.outputs;
        io::write_table(&mut clean_surveys, &outputs.clean_surveys)?;
        io::write_table(&mut clean_agreements, &outputs.clean_agreements)?;

        info!(
            site_years = summary.site_years,
            unusable = summary.unusable_survey_rows,
            collapsed = summary.duplicate_rows_collapsed,
            without_region = summary.rows_without_region,
            output = %outputs.clean_surveys.display(),
            "preprocessing complete"
        );

        Ok(StageReport {
            stage: self.code_identifier(),
            outputs: vec![outputs.clean_surveys.clone(), outputs.clean_agreements.clone()],
            input_fingerprint,
            details: json!(summary),
        })
    }
}

struct EstimatorStage;

impl PipelineStage for EstimatorStage {
    fn code_identifier(&self) -> &'static str {
        "naive_occupancy"
    }

    fn description(&self) -> &'static str {
        "Classify colonisation and estimate naive occupancy per region and year"
    }

    fn run(&self, config: &PipelineConfig) -> Result<StageReport> {
        let clean_path = &config.outputs.clean_surveys;
        let input_fingerprint = io::fingerprint(&[clean_path.as_path()])?;
        let clean = io::read_clean_surveys(clean_path)?;

        let EstimatorOutput {
            mut dataframe,
            summary,
            ..
        } = estimate(&clean, &config.estimator)?;
        io::write_table(&mut dataframe, &config.outputs.naive_occupancy)?;

        info!(
            strata = summary.strata,
            without_score = summary.rows_without_score,
            without_region = summary.rows_without_region,
            output = %config.outputs.naive_occupancy.display(),
            "naive occupancy complete"
        );

        Ok(StageReport {
            stage: self.code_identifier(),
            outputs: vec![config.outputs.naive_occupancy.clone()],
            input_fingerprint,
            details: json!(summary),
        })
    }
}

static STAGES: Lazy<Vec<&'static dyn PipelineStage>> = Lazy::new(|| {
    vec![
        &PreprocessStage as &dyn PipelineStage,
        &EstimatorStage as &dyn PipelineStage,
    ]
});

/// Stages in dependency order.
pub fn all_stages() -> &'static [&'static dyn PipelineStage] {
    STAGES.as_slice()
}

pub fn find_stage(code: &str) -> Option<&'static dyn PipelineStage> {
    all_stages()
        .iter()
        .copied()
        .find(|stage| stage.code_identifier() == code)
}

pub fn run_preprocess(config: &PipelineConfig) -> Result<StageReport> {
    PreprocessStage.run(config)
}

pub fn run_estimator(config: &PipelineConfig) -> Result<StageReport> {
    EstimatorStage.run(config)
}

pub fn run_all(config: &PipelineConfig) -> Result<Vec<StageReport>> {
    all_stages()
        .iter()
        .map(|stage| {
            info!(stage = stage.code_identifier(), "running stage");
            stage.run(config)
        })
        .collect()
}
