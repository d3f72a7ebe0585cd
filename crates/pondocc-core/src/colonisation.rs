use std::collections::{BTreeMap, HashMap};

use polars::prelude::*;
use serde::Serialize;

use crate::schema::*;

/// Where a surveyed site-year sits relative to the site's first detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Colonisation {
    /// First ever detection happened this year.
    NewPresence,
    /// First detected in an earlier year; colonisation is never lost.
    PreviouslyColonised,
    /// Never detected, or only detected in a later year.
    Absence,
}

impl Colonisation {
    pub fn classify(first_detected_year: Option<i64>, year: i64) -> Self {
        match first_detected_year {
            Some(first) if first == year => Colonisation::NewPresence,
            Some(first) if first < year => Colonisation::PreviouslyColonised,
            _ => Colonisation::Absence,
        }
    }
}

/// Chronological survey history of one site.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SiteTimeline {
    surveys: Vec<(i64, bool)>,
}

impl SiteTimeline {
    pub fn push(&mut self, year: i64, detected: bool) {
        let position = self.surveys.partition_point(|(existing, _)| *existing <= year);
        self.surveys.insert(position, (year, detected));
    }

    pub fn first_detected_year(&self) -> Option<i64> {
        self.surveys
            .iter()
            .find(|(_, detected)| *detected)
            .map(|(year, _)| *year)
    }

    /// `(year, ever_colonized)` for each survey, a running maximum of detection.
    pub fn ever_colonized(&self) -> Vec<(i64, bool)> {
        let mut colonized = false;
        self.surveys
            .iter()
            .map(|(year, detected)| {
                colonized |= *detected;
                (*year, colonized)
            })
            .collect()
    }
}

/// Groups the cleaned survey table into per-site timelines.
pub fn site_timelines(surveys: &DataFrame) -> PolarsResult<BTreeMap<String, SiteTimeline>> {
    let site_ids = surveys.column(SITE_ID)?.str()?;
    let years = surveys.column(YEAR)?.i64()?;
    let detected = surveys.column(DETECTED)?.i64()?;

    let mut timelines: BTreeMap<String, SiteTimeline> = BTreeMap::new();
    for idx in 0..surveys.height() {
        let (Some(site), Some(year), Some(flag)) =
            (site_ids.get(idx), years.get(idx), detected.get(idx))
        else {
            continue;
        };
        timelines
            .entry(site.to_string())
            .or_default()
            .push(year, flag != 0);
    }

    Ok(timelines)
}

/// First year each site was ever detected, over its full history.
pub fn first_detection_years(surveys: &DataFrame) -> PolarsResult<HashMap<String, i64>> {
    Ok(site_timelines(surveys)?
        .into_iter()
        .filter_map(|(site, timeline)| timeline.first_detected_year().map(|year| (site, year)))
        .collect())
}

#[derive(Debug, Clone)]
pub struct ClassifiedSurveys {
    pub dataframe: DataFrame,
    pub rows_outside_window: usize,
    pub rows_without_score: usize,
}

/// Restricts the cleaned table to monitoring years `<= max_year` with a detection
/// score, then attaches the first detection year and one-hot classification columns.
///
/// First detection is taken from the unfiltered table so a dropped row can still
/// mark a later year as previously colonised.
pub fn classify_surveys(surveys: &DataFrame, max_year: i64) -> PolarsResult<ClassifiedSurveys> {
    let first_detected = first_detection_years(surveys)?;

    let window_mask = surveys.column(YEAR)?.i64()?.lt_eq(max_year);
    let in_window = surveys.filter(&window_mask)?;
    let scored_mask = in_window.column(EDNA_SCORE)?.is_not_null();
    let scored = in_window.filter(&scored_mask)?;

    let site_ids = scored.column(SITE_ID)?.str()?;
    let years = scored.column(YEAR)?.i64()?;

    let len = scored.height();
    let mut first_years: Vec<Option<i64>> = Vec::with_capacity(len);
    let mut new_presence: Vec<i64> = Vec::with_capacity(len);
    let mut previously: Vec<i64> = Vec::with_capacity(len);
    let mut absence: Vec<i64> = Vec::with_capacity(len);

    for idx in 0..len {
        let first = site_ids
            .get(idx)
            .and_then(|site| first_detected.get(site).copied());
        let class = match years.get(idx) {
            Some(year) => Colonisation::classify(first, year),
            None => Colonisation::Absence,
        };

        first_years.push(first);
        new_presence.push(i64::from(class == Colonisation::NewPresence));
        previously.push(i64::from(class == Colonisation::PreviouslyColonised));
        absence.push(i64::from(class == Colonisation::Absence));
    }

    let mut dataframe = scored.clone();
    dataframe.hstack_mut(&mut [
        Series::new(FIRST_DETECTED_YEAR.into(), first_years).into(),
        Series::new(NEW_PRESENCE.into(), new_presence).into(),
        Series::new(PREVIOUSLY_COLONIZED.into(), previously).into(),
        Series::new(ABSENCE.into(), absence).into(),
    ])?;

    Ok(ClassifiedSurveys {
        rows_outside_window: surveys.height() - in_window.height(),
        rows_without_score: in_window.height() - scored.height(),
        dataframe,
    })
}
