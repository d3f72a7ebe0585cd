use crate::errors::{ParserError, VocabularyError};
use crate::tables::{read_agreements, read_surveys};
use crate::vocab::{first_integer, CoreArea, DetectionStatus, PondStatus, PondType, SurveyYear};

const AGREEMENTS_CSV: &str = "\
GlobalID,Site Grid Reference,Pond Status,Creation or Restoration?,Within Core/Fringe Area?,Notes
P1,SU 12345 67890,Pond Complete,Creation,Core,first
P2,,Pond Failed,Restoration (ghost pond),Fringe,
,TQ1234,Pond Complete,Creation,Core,orphan
P3,TL 1 2,Pond Under Construction,Something else,Outer,
";

const SURVEYS_CSV: &str = "\
GCN Status,Pond_GUID,eDNA Score,Monitoring Year
Present,P1,4 of 12,Year 1
Absent,P1,,Year 2
,,,
Present,,1,Contingency Survey
";

#[test]
fn reads_agreements_in_any_column_order() {
    let rows = read_agreements(AGREEMENTS_CSV.as_bytes()).expect("agreements parse");

    assert_eq!(rows.len(), 3, "row without a site id is skipped");
    assert_eq!(rows[0].site_id, "P1");
    assert_eq!(rows[0].grid_reference.as_deref(), Some("SU 12345 67890"));
    assert_eq!(rows[1].grid_reference, None);
    assert_eq!(rows[2].status.as_deref(), Some("Pond Under Construction"));
}

#[test]
fn reads_surveys_and_keeps_rows_with_blank_fields() {
    let rows = read_surveys(SURVEYS_CSV.as_bytes()).expect("surveys parse");

    assert_eq!(rows.len(), 3, "fully blank line is ignored");
    assert_eq!(rows[0].site_id.as_deref(), Some("P1"));
    assert_eq!(rows[0].year_label.as_deref(), Some("Year 1"));
    assert_eq!(rows[0].edna_text.as_deref(), Some("4 of 12"));
    assert_eq!(rows[1].edna_text, None);
    assert_eq!(rows[2].site_id, None);
}

#[test]
fn missing_survey_column_is_reported() {
    let err = read_surveys("Pond_GUID,Monitoring Year,GCN Status\nP1,Year 1,Present\n".as_bytes())
        .expect_err("eDNA column is required");

    match err {
        ParserError::MissingColumn { table, column } => {
            assert_eq!(table, "surveys");
            assert_eq!(column, "eDNA Score");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn short_rows_are_rejected_by_both_readers() {
    let agreements = "\
GlobalID,Site Grid Reference,Pond Status,Creation or Restoration?,Within Core/Fringe Area?
P1,SU 12345 67890,Pond Complete,Creation,Core
P2,TQ1234,Pond Failed
";
    let surveys = "\
Pond_GUID,Monitoring Year,eDNA Score,GCN Status
P1,Year 1,2,Present
P1,Year 2
";

    for err in [
        read_agreements(agreements.as_bytes()).expect_err("short agreement row"),
        read_surveys(surveys.as_bytes()).expect_err("short survey row"),
    ] {
        match err {
            ParserError::DataRow { line_index, .. } => assert_eq!(line_index, 2),
            other => panic!("unexpected error {other:?}"),
        }
    }
}

#[test]
fn pond_status_vocabulary() {
    assert_eq!(PondStatus::parse("Pond Complete"), Some(PondStatus::Complete));
    assert_eq!(
        PondStatus::parse("Pond Complete/Under Review"),
        Some(PondStatus::Complete)
    );
    assert_eq!(PondStatus::parse(" Pond Failed "), Some(PondStatus::Failed));
    assert_eq!(PondStatus::parse(""), None);

    let other = PondStatus::parse("Pond Under Construction").expect("non-blank status");
    assert!(!other.is_surveyable());
    assert_eq!(other.as_str(), "Pond Under Construction");
}

#[test]
fn restoration_type_and_area_fail_closed() {
    assert_eq!(PondType::try_from("Creation"), Ok(PondType::Creation));
    assert_eq!(
        PondType::try_from("Restoration (existing pond)"),
        Ok(PondType::Restoration)
    );
    assert_eq!(
        PondType::try_from("Restoration (ghost pond)"),
        Ok(PondType::Restoration)
    );
    assert!(matches!(
        PondType::try_from("Enhancement"),
        Err(VocabularyError::Unrecognized { .. })
    ));

    assert_eq!(CoreArea::try_from("Fringe"), Ok(CoreArea::Fringe));
    assert!(CoreArea::try_from("Outer").is_err());
}

#[test]
fn year_labels_map_to_integers() {
    let years: Vec<u8> = ["Year 1", "Year 2", "Year 3", "Year 4", "Year 5", "Contingency Survey"]
        .into_iter()
        .map(|label| SurveyYear::try_from(label).expect("known label").get())
        .collect();
    assert_eq!(years, vec![1, 2, 3, 4, 5, 6]);

    assert!(SurveyYear::try_from("Contingency Survey")
        .expect("contingency")
        .is_contingency());
    assert_eq!(
        SurveyYear::try_from("Year 7"),
        Err(VocabularyError::UnknownYearLabel("Year 7".to_string()))
    );
    assert!(SurveyYear::try_from("Baseline").is_err());
}

#[test]
fn detection_status_is_binary() {
    assert_eq!(DetectionStatus::try_from("Present").map(|d| d.as_flag()), Ok(1));
    assert_eq!(DetectionStatus::try_from("Absent").map(|d| d.as_flag()), Ok(0));
    assert!(DetectionStatus::try_from("Inconclusive").is_err());
}

#[test]
fn first_integer_takes_leading_digit_run() {
    assert_eq!(first_integer("4 of 12"), Some(4));
    assert_eq!(first_integer("score: 11/12"), Some(11));
    assert_eq!(first_integer("0"), Some(0));
    assert_eq!(first_integer("Inconclusive"), None);
    assert_eq!(first_integer(""), None);
}
