use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("{table} table is missing required column '{column}'")]
    MissingColumn {
        table: &'static str,
        column: &'static str,
    },

    #[error("{table} CSV error: {source}")]
    Csv {
        table: &'static str,
        #[source]
        source: csv::Error,
    },

    #[error("{table} data row {line_index} invalid: {message}")]
    DataRow {
        table: &'static str,
        line_index: usize,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VocabularyError {
    #[error("unrecognized monitoring year label '{0}'")]
    UnknownYearLabel(String),

    #[error("unrecognized {field} value '{value}'")]
    Unrecognized { field: &'static str, value: String },
}
