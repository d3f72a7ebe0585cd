use std::collections::{BTreeMap, HashMap};

use polars::prelude::*;
use pondocc_parser::{
    first_integer, AgreementRow, CoreArea, DetectionStatus, PondStatus, PondType, SurveyRow,
    SurveyYear, VocabularyError,
};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::colonisation::SiteTimeline;
use crate::config::PreprocessSettings;
use crate::gridref::{clean_grid_reference, grid_to_latlong};
use crate::records::{agreement_frame, site_year_frame, CleanAgreement, SiteYearRecord};
use crate::regions::RegionBoundaries;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("polars operation failed: {0}")]
    Polars(#[from] PolarsError),
    #[error("survey row {line}: {source}")]
    SurveyVocabulary {
        line: usize,
        #[source]
        source: VocabularyError,
    },
    #[error("agreement for site {site_id}: {source}")]
    AgreementVocabulary {
        site_id: String,
        #[source]
        source: VocabularyError,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PreprocessSummary {
    pub raw_survey_rows: usize,
    pub raw_agreement_rows: usize,
    pub retained_agreements: usize,
    pub unusable_survey_rows: usize,
    pub duplicate_rows_collapsed: usize,
    pub site_years: usize,
    pub rows_without_coordinates: usize,
    pub rows_without_region: usize,
    /// Labels that failed closed to missing, keyed `"<field>: <value>"`.
    pub unrecognized_labels: BTreeMap<String, usize>,
}

#[derive(Debug, Clone)]
pub struct PreprocessOutput {
    pub surveys: DataFrame,
    pub agreements: DataFrame,
    pub summary: PreprocessSummary,
}

struct NormalizedSurvey<'a> {
    site_id: &'a str,
    year: SurveyYear,
    detected: bool,
    edna_score: Option<f64>,
    agreement: &'a CleanAgreement,
}

/// Running values for one (site, year) while duplicates are folded together.
struct SiteYearAccumulator<'a> {
    detected: bool,
    edna_score: Option<f64>,
    pond_type: Option<PondType>,
    area: Option<CoreArea>,
    agreement: &'a CleanAgreement,
}

impl<'a> SiteYearAccumulator<'a> {
    fn new(survey: &NormalizedSurvey<'a>) -> Self {
        Self {
            detected: survey.detected,
            edna_score: survey.edna_score,
            pond_type: survey.agreement.pond_type,
            area: survey.agreement.area,
            agreement: survey.agreement,
        }
    }

    fn absorb(&mut self, survey: &NormalizedSurvey<'a>) {
        self.detected |= survey.detected;
        self.edna_score = match (self.edna_score, survey.edna_score) {
            (Some(current), Some(next)) => Some(current.max(next)),
            (current, next) => current.or(next),
        };
        self.pond_type = self.pond_type.or(survey.agreement.pond_type);
        self.area = self.area.or(survey.agreement.area);
    }
}

struct LabelTracker<'s> {
    settings: &'s PreprocessSettings,
    unrecognized: BTreeMap<String, usize>,
}

impl<'s> LabelTracker<'s> {
    fn new(settings: &'s PreprocessSettings) -> Self {
        Self {
            settings,
            unrecognized: BTreeMap::new(),
        }
    }

    /// Missing stays missing; an unknown label is counted and treated as missing
    /// unless strict vocabulary is on.
    fn normalize<T>(
        &mut self,
        raw: Option<&str>,
        parse: impl FnOnce(&str) -> Result<T, VocabularyError>,
    ) -> Result<Option<T>, VocabularyError> {
        let Some(raw) = raw else {
            return Ok(None);
        };
        match parse(raw) {
            Ok(value) => Ok(Some(value)),
            Err(err) if self.settings.strict_vocabulary => Err(err),
            Err(err) => {
                let key = match &err {
                    VocabularyError::Unrecognized { field, value } => format!("{field}: {value}"),
                    VocabularyError::UnknownYearLabel(value) => format!("year: {value}"),
                };
                *self.unrecognized.entry(key).or_insert(0) += 1;
                Ok(None)
            }
        }
    }
}

/// Normalizes agreements, joins surveys onto them, collapses duplicate site-years,
/// derives `ever_colonized`, and tags each row with its enclosing region.
pub fn preprocess(
    agreements: &[AgreementRow],
    surveys: &[SurveyRow],
    boundaries: &RegionBoundaries,
    settings: &PreprocessSettings,
) -> Result<PreprocessOutput, PreprocessError> {
    let mut labels = LabelTracker::new(settings);
    let mut summary = PreprocessSummary {
        raw_survey_rows: surveys.len(),
        raw_agreement_rows: agreements.len(),
        ..PreprocessSummary::default()
    };

    let clean_agreements = normalize_agreements(agreements, &mut labels)?;
    summary.retained_agreements = clean_agreements.len();

    let mut by_site: HashMap<&str, &CleanAgreement> = HashMap::new();
    for agreement in &clean_agreements {
        by_site.entry(agreement.site_id.as_str()).or_insert(agreement);
    }

    let mut normalized = Vec::with_capacity(surveys.len());
    for (idx, row) in surveys.iter().enumerate() {
        let line = idx + 1;
        let year = match row.year_label.as_deref() {
            Some(label) => Some(
                SurveyYear::try_from(label)
                    .map_err(|source| PreprocessError::SurveyVocabulary { line, source })?,
            ),
            None => None,
        };
        let detection = labels
            .normalize(row.detection_text.as_deref(), |raw| DetectionStatus::try_from(raw))
            .map_err(|source| PreprocessError::SurveyVocabulary { line, source })?;
        let edna_score = row
            .edna_text
            .as_deref()
            .and_then(first_integer)
            .map(|score| score as f64);

        let site_id = row.site_id.as_deref();
        let agreement = site_id.and_then(|id| by_site.get(id).copied());

        match (site_id, year, detection, agreement) {
            (Some(site_id), Some(year), Some(detection), Some(agreement)) => {
                normalized.push(NormalizedSurvey {
                    site_id,
                    year,
                    detected: detection == DetectionStatus::Present,
                    edna_score,
                    agreement,
                });
            }
            _ => summary.unusable_survey_rows += 1,
        }
    }

    let mut site_years: BTreeMap<(&str, SurveyYear), SiteYearAccumulator> = BTreeMap::new();
    for survey in &normalized {
        site_years
            .entry((survey.site_id, survey.year))
            .and_modify(|acc| {
                acc.absorb(survey);
                summary.duplicate_rows_collapsed += 1;
            })
            .or_insert_with(|| SiteYearAccumulator::new(survey));
    }

    let mut by_site: BTreeMap<&str, Vec<(SurveyYear, SiteYearAccumulator)>> = BTreeMap::new();
    for ((site_id, year), acc) in site_years {
        by_site.entry(site_id).or_default().push((year, acc));
    }

    let mut records = Vec::with_capacity(normalized.len());
    for (site_id, entries) in by_site {
        let mut timeline = SiteTimeline::default();
        for (year, acc) in &entries {
            timeline.push(i64::from(year.get()), acc.detected);
        }

        // Every entry of a site shares the first matching agreement.
        let Some(agreement) = entries.first().map(|(_, acc)| acc.agreement) else {
            continue;
        };
        let region = match (agreement.latitude, agreement.longitude) {
            (Some(lat), Some(lon)) => boundaries.locate(lat, lon).map(str::to_string),
            _ => {
                summary.rows_without_coordinates += entries.len();
                None
            }
        };
        if region.is_none() {
            summary.rows_without_region += entries.len();
        }

        let colonized = timeline.ever_colonized();
        for ((year, acc), (_, ever_colonized)) in entries.into_iter().zip(colonized) {
            records.push(SiteYearRecord {
                site_id: site_id.to_string(),
                year: i64::from(year.get()),
                detected: acc.detected,
                ever_colonized,
                edna_score: acc.edna_score,
                pond_type: acc.pond_type,
                area: acc.area,
                status: agreement.status.clone(),
                latitude: agreement.latitude,
                longitude: agreement.longitude,
                region: region.clone(),
            });
        }
    }

    summary.site_years = records.len();
    summary.unrecognized_labels = labels.unrecognized;
    for (label, count) in &summary.unrecognized_labels {
        warn!(label = %label, count, "unrecognized label treated as missing");
    }

    Ok(PreprocessOutput {
        surveys: site_year_frame(&records)?,
        agreements: agreement_frame(&clean_agreements)?,
        summary,
    })
}

fn normalize_agreements(
    agreements: &[AgreementRow],
    labels: &mut LabelTracker<'_>,
) -> Result<Vec<CleanAgreement>, PreprocessError> {
    let mut cleaned = Vec::with_capacity(agreements.len());

    for row in agreements {
        let vocabulary_error = |source| PreprocessError::AgreementVocabulary {
            site_id: row.site_id.clone(),
            source,
        };
        let pond_type = labels
            .normalize(row.restoration_type.as_deref(), |raw| PondType::try_from(raw))
            .map_err(vocabulary_error)?;
        let area = labels
            .normalize(row.area.as_deref(), |raw| CoreArea::try_from(raw))
            .map_err(vocabulary_error)?;

        let Some(status) = row.status.as_deref().and_then(PondStatus::parse) else {
            continue;
        };
        if !status.is_surveyable() {
            continue;
        }

        let grid_reference = row
            .grid_reference
            .as_deref()
            .map(clean_grid_reference)
            .unwrap_or_default();
        let coordinates = grid_to_latlong(&grid_reference);

        cleaned.push(CleanAgreement {
            site_id: row.site_id.clone(),
            grid_reference,
            status,
            pond_type,
            area,
            latitude: coordinates.map(|c| c.latitude),
            longitude: coordinates.map(|c| c.longitude),
        });
    }

    Ok(cleaned)
}
