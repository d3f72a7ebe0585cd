use std::collections::BTreeMap;

use polars::prelude::*;
use serde::Serialize;
use thiserror::Error;

use crate::interval::{clopper_pearson, IntervalError};
use crate::schema::*;

#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("polars operation failed: {0}")]
    Polars(#[from] PolarsError),
    #[error("interval for {region} year {year}: {source}")]
    Interval {
        region: String,
        year: i64,
        #[source]
        source: IntervalError,
    },
}

/// Rates and exact interval for one (region, year) stratum.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StratumAggregate {
    pub region: String,
    pub year: i64,
    pub ponds_surveyed: u64,
    pub new_presence_count: u64,
    pub previously_colonized_count: u64,
    pub absence_count: u64,
    /// `None` when every surveyed pond was already colonised before this year.
    pub yearly_colonisation_rate: Option<f64>,
    pub naive_occupancy_rate: f64,
    pub lower_ci: f64,
    pub upper_ci: f64,
}

#[derive(Debug, Default)]
struct StratumAccumulator {
    ponds_surveyed: u64,
    new_presence: u64,
    previously_colonized: u64,
    absence: u64,
}

impl StratumAccumulator {
    fn total_colonised(&self) -> u64 {
        self.new_presence + self.previously_colonized
    }
}

/// Three decimal places, ties to even.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round_ties_even() / 1000.0
}

/// Folds classified rows into (region, year) strata. Rows without a region cannot be
/// attributed to a stratum and are skipped. Output is ordered by (region, year).
pub fn aggregate_strata(
    classified: &DataFrame,
    confidence: f64,
) -> Result<Vec<StratumAggregate>, AggregationError> {
    let regions = classified.column(REGION)?.str()?;
    let years = classified.column(YEAR)?.i64()?;
    let new_presence = classified.column(NEW_PRESENCE)?.i64()?;
    let previously = classified.column(PREVIOUSLY_COLONIZED)?.i64()?;
    let absence = classified.column(ABSENCE)?.i64()?;

    let mut strata: BTreeMap<(String, i64), StratumAccumulator> = BTreeMap::new();
    for idx in 0..classified.height() {
        let (Some(region), Some(year)) = (regions.get(idx), years.get(idx)) else {
            continue;
        };
        let acc = strata.entry((region.to_string(), year)).or_default();
        acc.ponds_surveyed += 1;
        acc.new_presence += u64::from(new_presence.get(idx).unwrap_or(0) != 0);
        acc.previously_colonized += u64::from(previously.get(idx).unwrap_or(0) != 0);
        acc.absence += u64::from(absence.get(idx).unwrap_or(0) != 0);
    }

    strata
        .into_iter()
        .map(|((region, year), acc)| finish_stratum(region, year, &acc, confidence))
        .collect()
}

fn finish_stratum(
    region: String,
    year: i64,
    acc: &StratumAccumulator,
    confidence: f64,
) -> Result<StratumAggregate, AggregationError> {
    let total_colonised = acc.total_colonised();
    let at_risk = acc.ponds_surveyed - acc.previously_colonized;
    let yearly_colonisation_rate =
        (at_risk > 0).then(|| round3(acc.new_presence as f64 / at_risk as f64));
    let naive_occupancy_rate = round3(total_colonised as f64 / acc.ponds_surveyed as f64);

    let interval = match clopper_pearson(total_colonised, acc.ponds_surveyed, confidence) {
        Ok(interval) => interval,
        Err(source) => {
            return Err(AggregationError::Interval {
                region,
                year,
                source,
            })
        }
    };

    Ok(StratumAggregate {
        region,
        year,
        ponds_surveyed: acc.ponds_surveyed,
        new_presence_count: acc.new_presence,
        previously_colonized_count: acc.previously_colonized,
        absence_count: acc.absence,
        yearly_colonisation_rate,
        naive_occupancy_rate,
        lower_ci: round3(interval.lower),
        upper_ci: round3(interval.upper),
    })
}

/// Output table in [`OCCUPANCY_COLUMNS`] order.
pub fn strata_frame(strata: &[StratumAggregate]) -> PolarsResult<DataFrame> {
    let regions: Vec<&str> = strata.iter().map(|s| s.region.as_str()).collect();
    let years: Vec<i64> = strata.iter().map(|s| s.year).collect();
    let surveyed: Vec<u64> = strata.iter().map(|s| s.ponds_surveyed).collect();
    let new_presence: Vec<u64> = strata.iter().map(|s| s.new_presence_count).collect();
    let previously: Vec<u64> = strata
        .iter()
        .map(|s| s.previously_colonized_count)
        .collect();
    let absence: Vec<u64> = strata.iter().map(|s| s.absence_count).collect();
    let colonisation: Vec<Option<f64>> = strata
        .iter()
        .map(|s| s.yearly_colonisation_rate)
        .collect();
    let occupancy: Vec<f64> = strata.iter().map(|s| s.naive_occupancy_rate).collect();
    let lower: Vec<f64> = strata.iter().map(|s| s.lower_ci).collect();
    let upper: Vec<f64> = strata.iter().map(|s| s.upper_ci).collect();

    DataFrame::new(vec![
        Series::new(REGION.into(), regions).into(),
        Series::new(YEAR.into(), years).into(),
        Series::new(PONDS_SURVEYED.into(), surveyed).into(),
        Series::new(NEW_PRESENCE_COUNT.into(), new_presence).into(),
        Series::new(PREVIOUSLY_COLONIZED_COUNT.into(), previously).into(),
        Series::new(ABSENCE_COUNT.into(), absence).into(),
        Series::new(YEARLY_COLONISATION_RATE.into(), colonisation).into(),
        Series::new(NAIVE_OCCUPANCY_RATE.into(), occupancy).into(),
        Series::new(LOWER_CI.into(), lower).into(),
        Series::new(UPPER_CI.into(), upper).into(),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round3_matches_three_decimal_places() {
        assert_eq!(round3(1.0 / 3.0), 0.333);
        assert_eq!(round3(2.0 / 3.0), 0.667);
        assert_eq!(round3(0.0), 0.0);
    }

    #[test]
    fn round3_sends_ties_to_even() {
        assert_eq!(round3(1.0 / 16.0), 0.062);
        assert_eq!(round3(3.0 / 16.0), 0.188);
        assert_eq!(round3(5.0 / 16.0), 0.312);
        assert_eq!(round3(1.0 / 80.0), 0.012);
    }

    #[test]
    fn one_in_sixteen_rounds_down() {
        let acc = StratumAccumulator {
            ponds_surveyed: 16,
            new_presence: 1,
            previously_colonized: 0,
            absence: 15,
        };
        let stratum = finish_stratum("East".into(), 2, &acc, 0.95).expect("valid stratum");
        assert_eq!(stratum.naive_occupancy_rate, 0.062);
        assert_eq!(stratum.yearly_colonisation_rate, Some(0.062));
        assert_eq!((stratum.lower_ci, stratum.upper_ci), (0.002, 0.302));
    }

    #[test]
    fn zero_at_risk_leaves_colonisation_rate_undefined() {
        let acc = StratumAccumulator {
            ponds_surveyed: 4,
            new_presence: 0,
            previously_colonized: 4,
            absence: 0,
        };
        let stratum = finish_stratum("North".into(), 3, &acc, 0.95).expect("valid stratum");
        assert_eq!(stratum.yearly_colonisation_rate, None);
        assert_eq!(stratum.naive_occupancy_rate, 1.0);
        assert_eq!(stratum.upper_ci, 1.0);
    }
}
