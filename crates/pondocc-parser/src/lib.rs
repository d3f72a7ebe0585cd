pub mod errors;
pub mod tables;
pub mod vocab;

pub use errors::{ParserError, VocabularyError};
pub use tables::{read_agreements, read_surveys, AgreementRow, SurveyRow};
pub use vocab::{
    first_integer, CoreArea, DetectionStatus, PondStatus, PondType, SurveyYear,
    CONTINGENCY_YEAR,
};

#[cfg(test)]
mod tests;
