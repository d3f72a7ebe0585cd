use std::io::Read;

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Serialize;

use crate::errors::ParserError;

const AGREEMENTS: &str = "agreements";
const SURVEYS: &str = "surveys";

pub const AGREEMENT_SITE_ID: &str = "GlobalID";
pub const AGREEMENT_GRID_REFERENCE: &str = "Site Grid Reference";
pub const AGREEMENT_STATUS: &str = "Pond Status";
pub const AGREEMENT_TYPE: &str = "Creation or Restoration?";
pub const AGREEMENT_AREA: &str = "Within Core/Fringe Area?";

pub const SURVEY_SITE_ID: &str = "Pond_GUID";
pub const SURVEY_YEAR: &str = "Monitoring Year";
pub const SURVEY_EDNA_SCORE: &str = "eDNA Score";
pub const SURVEY_DETECTION: &str = "GCN Status";

/// One raw row of the site-agreement table. All fields are trimmed text; blanks are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AgreementRow {
    pub site_id: String,
    pub grid_reference: Option<String>,
    pub status: Option<String>,
    pub restoration_type: Option<String>,
    pub area: Option<String>,
}

/// One raw row of the survey table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SurveyRow {
    pub site_id: Option<String>,
    pub year_label: Option<String>,
    pub edna_text: Option<String>,
    pub detection_text: Option<String>,
}

struct ColumnIndex {
    table: &'static str,
    headers: StringRecord,
}

impl ColumnIndex {
    fn position(&self, column: &'static str) -> Result<usize, ParserError> {
        self.headers
            .iter()
            .position(|header| header.trim() == column)
            .ok_or(ParserError::MissingColumn {
                table: self.table,
                column,
            })
    }
}

fn cell(record: &StringRecord, idx: usize) -> Option<String> {
    record
        .get(idx)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Rejects a data row too short to hold every required column.
fn require_width(
    columns: &ColumnIndex,
    record: &StringRecord,
    line: usize,
    required: &[usize],
) -> Result<(), ParserError> {
    let needed = required.iter().copied().max().unwrap_or(0);
    if record.len() <= needed {
        return Err(ParserError::DataRow {
            table: columns.table,
            line_index: line,
            message: format!(
                "expected {} fields, found {}",
                columns.headers.len(),
                record.len()
            ),
        });
    }
    Ok(())
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(|value| value.is_empty())
}

fn open_reader<R: Read>(
    table: &'static str,
    reader: R,
) -> Result<(csv::Reader<R>, ColumnIndex), ParserError> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);
    let headers = csv_reader
        .headers()
        .map_err(|source| ParserError::Csv { table, source })?
        .clone();
    Ok((csv_reader, ColumnIndex { table, headers }))
}

/// Reads the site-agreement table. Rows without a site identifier cannot be joined and are
/// skipped; rows too short for the required columns are an error.
pub fn read_agreements<R: Read>(reader: R) -> Result<Vec<AgreementRow>, ParserError> {
    let (mut csv_reader, columns) = open_reader(AGREEMENTS, reader)?;
    let site_idx = columns.position(AGREEMENT_SITE_ID)?;
    let grid_idx = columns.position(AGREEMENT_GRID_REFERENCE)?;
    let status_idx = columns.position(AGREEMENT_STATUS)?;
    let type_idx = columns.position(AGREEMENT_TYPE)?;
    let area_idx = columns.position(AGREEMENT_AREA)?;

    let required = [site_idx, grid_idx, status_idx, type_idx, area_idx];

    let mut rows = Vec::new();
    for (line, record) in csv_reader.records().enumerate() {
        let record = record.map_err(|source| ParserError::Csv {
            table: AGREEMENTS,
            source,
        })?;
        if is_blank(&record) {
            continue;
        }
        require_width(&columns, &record, line + 1, &required)?;
        let Some(site_id) = cell(&record, site_idx) else {
            continue;
        };
        rows.push(AgreementRow {
            site_id,
            grid_reference: cell(&record, grid_idx),
            status: cell(&record, status_idx),
            restoration_type: cell(&record, type_idx),
            area: cell(&record, area_idx),
        });
    }

    Ok(rows)
}

/// Reads the survey table. Every row is returned, including ones with blank fields;
/// deciding which rows are usable belongs to preprocessing.
pub fn read_surveys<R: Read>(reader: R) -> Result<Vec<SurveyRow>, ParserError> {
    let (mut csv_reader, columns) = open_reader(SURVEYS, reader)?;
    let site_idx = columns.position(SURVEY_SITE_ID)?;
    let year_idx = columns.position(SURVEY_YEAR)?;
    let score_idx = columns.position(SURVEY_EDNA_SCORE)?;
    let detection_idx = columns.position(SURVEY_DETECTION)?;

    let required = [site_idx, year_idx, score_idx, detection_idx];

    let mut rows = Vec::new();
    for (line, record) in csv_reader.records().enumerate() {
        let record = record.map_err(|source| ParserError::Csv {
            table: SURVEYS,
            source,
        })?;
        if is_blank(&record) {
            continue;
        }
        require_width(&columns, &record, line + 1, &required)?;
        rows.push(SurveyRow {
            site_id: cell(&record, site_idx),
            year_label: cell(&record, year_idx),
            edna_text: cell(&record, score_idx),
            detection_text: cell(&record, detection_idx),
        });
    }

    Ok(rows)
}
