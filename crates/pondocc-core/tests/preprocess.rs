use polars::prelude::*;
use pondocc_core::config::PreprocessSettings;
use pondocc_core::preprocess::{preprocess, PreprocessError};
use pondocc_core::regions::RegionBoundaries;
use pondocc_core::schema::*;
use pondocc_parser::{AgreementRow, SurveyRow};

const LONDON_BOUNDARY: &str = r#"{
    "type": "FeatureCollection",
    "features": [{
        "type": "Feature",
        "properties": { "EDP": "London" },
        "geometry": {
            "type": "Polygon",
            "coordinates": [[[-0.5, 51.3], [0.3, 51.3], [0.3, 51.7], [-0.5, 51.7], [-0.5, 51.3]]]
        }
    }]
}"#;

fn boundaries() -> RegionBoundaries {
    RegionBoundaries::from_geojson(LONDON_BOUNDARY, "EDP").expect("valid boundaries")
}

fn agreement(site: &str, grid: Option<&str>, status: &str) -> AgreementRow {
    AgreementRow {
        site_id: site.to_string(),
        grid_reference: grid.map(str::to_string),
        status: Some(status.to_string()),
        restoration_type: Some("Restoration (ghost pond)".to_string()),
        area: Some("Core".to_string()),
    }
}

fn survey(site: &str, year: &str, score: Option<&str>, detection: &str) -> SurveyRow {
    SurveyRow {
        site_id: Some(site.to_string()),
        year_label: Some(year.to_string()),
        edna_text: score.map(str::to_string),
        detection_text: Some(detection.to_string()),
    }
}

fn detected_by_year(df: &DataFrame, site: &str) -> PolarsResult<Vec<(i64, i64, i64)>> {
    let mask = df.column(SITE_ID)?.str()?.equal(site);
    let filtered = df.filter(&mask)?;
    let years = filtered.column(YEAR)?.i64()?;
    let detected = filtered.column(DETECTED)?.i64()?;
    let colonized = filtered.column(EVER_COLONIZED)?.i64()?;
    Ok((0..filtered.height())
        .map(|idx| {
            (
                years.get(idx).unwrap(),
                detected.get(idx).unwrap(),
                colonized.get(idx).unwrap(),
            )
        })
        .collect())
}

#[test]
fn duplicate_site_years_collapse_to_max_detection_and_score() -> anyhow::Result<()> {
    let agreements = vec![agreement("P1", Some("TQ 30000 80000"), "Pond Complete")];
    let surveys = vec![
        survey("P1", "Year 2", Some("3 of 12"), "Absent"),
        survey("P1", "Year 2", None, "Present"),
        survey("P1", "Year 2", Some("7 of 12"), "Absent"),
        survey("P1", "Year 3", None, "Absent"),
        survey("P1", "Year 3", Some("unreadable"), "Absent"),
    ];

    let output = preprocess(
        &agreements,
        &surveys,
        &boundaries(),
        &PreprocessSettings::default(),
    )?;

    assert_eq!(output.surveys.height(), 2);
    assert_eq!(output.summary.duplicate_rows_collapsed, 3);
    assert_eq!(
        detected_by_year(&output.surveys, "P1")?,
        vec![(2, 1, 1), (3, 0, 1)]
    );

    let scores = output.surveys.column(EDNA_SCORE)?.f64()?;
    assert_eq!(scores.get(0), Some(7.0));
    assert_eq!(scores.get(1), None, "all-missing scores stay missing");
    Ok(())
}

#[test]
fn ever_colonized_is_running_maximum_per_site() -> anyhow::Result<()> {
    let agreements = vec![
        agreement("A", Some("TQ3000080000"), "Pond Complete"),
        agreement("B", Some("TQ3000080000"), "Pond Failed"),
    ];
    let surveys = vec![
        survey("A", "Year 4", Some("1"), "Absent"),
        survey("A", "Year 1", Some("1"), "Absent"),
        survey("A", "Year 2", Some("1"), "Present"),
        survey("A", "Year 3", Some("1"), "Absent"),
        survey("B", "Year 1", Some("1"), "Present"),
        survey("B", "Contingency Survey", Some("1"), "Absent"),
    ];

    let output = preprocess(
        &agreements,
        &surveys,
        &boundaries(),
        &PreprocessSettings::default(),
    )?;

    assert_eq!(
        detected_by_year(&output.surveys, "A")?,
        vec![(1, 0, 0), (2, 1, 1), (3, 0, 1), (4, 0, 1)]
    );
    assert_eq!(
        detected_by_year(&output.surveys, "B")?,
        vec![(1, 1, 1), (6, 0, 1)]
    );
    Ok(())
}

#[test]
fn tags_regions_and_keeps_sites_outside_boundaries() -> anyhow::Result<()> {
    let agreements = vec![
        agreement("IN", Some("TQ 30000 80000"), "Pond Complete"),
        agreement("OUT", Some("SU 1234"), "Pond Complete"),
        agreement("NOGRID", None, "Pond Complete/Under Review"),
        agreement("BAD", Some("XX"), "Pond Complete"),
    ];
    let surveys = vec![
        survey("IN", "Year 1", Some("2"), "Present"),
        survey("OUT", "Year 1", Some("2"), "Present"),
        survey("NOGRID", "Year 1", Some("2"), "Absent"),
        survey("BAD", "Year 1", Some("2"), "Absent"),
    ];

    let output = preprocess(
        &agreements,
        &surveys,
        &boundaries(),
        &PreprocessSettings::default(),
    )?;

    assert_eq!(output.surveys.height(), 4, "missing regions are never dropped");
    let sites = output.surveys.column(SITE_ID)?.str()?;
    let regions = output.surveys.column(REGION)?.str()?;
    let latitudes = output.surveys.column(LATITUDE)?.f64()?;
    for idx in 0..output.surveys.height() {
        match sites.get(idx) {
            Some("IN") => assert_eq!(regions.get(idx), Some("London")),
            Some("OUT") => {
                assert_eq!(regions.get(idx), None);
                assert!(latitudes.get(idx).is_some());
            }
            Some("NOGRID") | Some("BAD") => {
                assert_eq!(regions.get(idx), None);
                assert_eq!(latitudes.get(idx), None);
            }
            other => panic!("unexpected site {other:?}"),
        }
    }
    assert_eq!(output.summary.rows_without_coordinates, 2);
    assert_eq!(output.summary.rows_without_region, 3);
    Ok(())
}

#[test]
fn drops_rows_missing_detection_year_or_status() -> anyhow::Result<()> {
    let agreements = vec![
        agreement("OK", Some("TQ3000080000"), "Pond Complete"),
        agreement("BUILDING", Some("TQ3000080000"), "Pond Under Construction"),
    ];
    let surveys = vec![
        survey("OK", "Year 1", Some("2"), "Present"),
        survey("OK", "Year 2", Some("2"), "Inconclusive"),
        SurveyRow {
            year_label: None,
            ..survey("OK", "Year 3", Some("2"), "Absent")
        },
        survey("BUILDING", "Year 1", Some("2"), "Present"),
        survey("UNKNOWN", "Year 1", Some("2"), "Present"),
    ];

    let output = preprocess(
        &agreements,
        &surveys,
        &boundaries(),
        &PreprocessSettings::default(),
    )?;

    assert_eq!(output.surveys.height(), 1);
    assert_eq!(output.summary.unusable_survey_rows, 4);
    assert_eq!(output.summary.retained_agreements, 1);
    assert_eq!(output.agreements.height(), 1);
    assert_eq!(
        output
            .summary
            .unrecognized_labels
            .get("detection status: Inconclusive"),
        Some(&1)
    );
    Ok(())
}

#[test]
fn unknown_year_label_is_a_hard_failure() {
    let agreements = vec![agreement("P1", Some("TQ3000080000"), "Pond Complete")];
    let surveys = vec![
        survey("P1", "Year 1", Some("2"), "Present"),
        survey("P1", "Year Six", Some("2"), "Present"),
    ];

    let err = preprocess(
        &agreements,
        &surveys,
        &boundaries(),
        &PreprocessSettings::default(),
    )
    .expect_err("unparseable year label must fail");

    assert!(matches!(err, PreprocessError::SurveyVocabulary { line: 2, .. }));
}

#[test]
fn unknown_categories_fail_closed_or_strict() -> anyhow::Result<()> {
    let mut odd = agreement("P1", Some("TQ3000080000"), "Pond Complete");
    odd.restoration_type = Some("Enhancement".to_string());
    odd.area = Some("Outer".to_string());
    let surveys = vec![survey("P1", "Year 1", Some("2"), "Present")];

    let lenient = preprocess(
        &[odd.clone()],
        &surveys,
        &boundaries(),
        &PreprocessSettings::default(),
    )?;
    let types = lenient.surveys.column(POND_TYPE)?.str()?;
    let areas = lenient.surveys.column(AREA)?.str()?;
    assert_eq!(types.get(0), None);
    assert_eq!(areas.get(0), None);
    assert_eq!(lenient.summary.unrecognized_labels.len(), 2);

    let strict = preprocess(
        &[odd],
        &surveys,
        &boundaries(),
        &PreprocessSettings {
            strict_vocabulary: true,
        },
    );
    assert!(matches!(
        strict,
        Err(PreprocessError::AgreementVocabulary { .. })
    ));
    Ok(())
}

#[test]
fn clean_table_has_stable_schema() -> anyhow::Result<()> {
    let output = preprocess(&[], &[], &boundaries(), &PreprocessSettings::default())?;

    let names: Vec<String> = output
        .surveys
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    assert_eq!(names, CLEAN_SURVEY_COLUMNS);
    for (name, dtype) in clean_survey_schema().iter() {
        assert_eq!(output.surveys.column(name.as_str())?.dtype(), dtype, "{name}");
    }
    Ok(())
}
