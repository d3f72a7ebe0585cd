use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::VocabularyError;

/// Out-of-cycle survey carried after the five monitoring years.
pub const CONTINGENCY_YEAR: u8 = 6;

fn normalize_label(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PondStatus {
    Complete,
    Failed,
    /// Recognised as a status but not one the estimator works with.
    Other(String),
}

impl PondStatus {
    pub fn as_str(&self) -> &str {
        match self {
            PondStatus::Complete => "Complete",
            PondStatus::Failed => "Failed",
            PondStatus::Other(label) => label.as_str(),
        }
    }

    pub fn is_surveyable(&self) -> bool {
        matches!(self, PondStatus::Complete | PondStatus::Failed)
    }

    /// Blank labels are missing rather than `Other`.
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return None;
        }
        let status = match normalize_label(trimmed).as_str() {
            "pond complete" | "pond complete/under review" | "complete" => PondStatus::Complete,
            "pond failed" | "failed" => PondStatus::Failed,
            _ => PondStatus::Other(trimmed.to_string()),
        };
        Some(status)
    }
}

impl fmt::Display for PondStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PondType {
    Creation,
    Restoration,
}

impl PondType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PondType::Creation => "Creation",
            PondType::Restoration => "Restoration",
        }
    }
}

impl fmt::Display for PondType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for PondType {
    type Error = VocabularyError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match normalize_label(value).as_str() {
            "creation" => Ok(PondType::Creation),
            "restoration"
            | "restoration (existing pond)"
            | "restoration (ghost pond)" => Ok(PondType::Restoration),
            _ => Err(VocabularyError::Unrecognized {
                field: "restoration type",
                value: value.trim().to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoreArea {
    Core,
    Fringe,
}

impl CoreArea {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoreArea::Core => "Core",
            CoreArea::Fringe => "Fringe",
        }
    }
}

impl fmt::Display for CoreArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for CoreArea {
    type Error = VocabularyError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match normalize_label(value).as_str() {
            "core" => Ok(CoreArea::Core),
            "fringe" => Ok(CoreArea::Fringe),
            _ => Err(VocabularyError::Unrecognized {
                field: "core/fringe area",
                value: value.trim().to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SurveyYear(u8);

impl SurveyYear {
    pub fn new(year: u8) -> Option<Self> {
        (1..=CONTINGENCY_YEAR).contains(&year).then_some(Self(year))
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    pub fn is_contingency(&self) -> bool {
        self.0 == CONTINGENCY_YEAR
    }
}

impl fmt::Display for SurveyYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<&str> for SurveyYear {
    type Error = VocabularyError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = normalize_label(value);
        let year = match normalized.as_str() {
            "contingency survey" => Some(CONTINGENCY_YEAR),
            other => other
                .strip_prefix("year ")
                .unwrap_or(other)
                .parse::<u8>()
                .ok(),
        };

        year.and_then(SurveyYear::new)
            .ok_or_else(|| VocabularyError::UnknownYearLabel(value.trim().to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetectionStatus {
    Present,
    Absent,
}

impl DetectionStatus {
    pub fn as_flag(&self) -> i64 {
        match self {
            DetectionStatus::Present => 1,
            DetectionStatus::Absent => 0,
        }
    }
}

impl TryFrom<&str> for DetectionStatus {
    type Error = VocabularyError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match normalize_label(value).as_str() {
            "present" => Ok(DetectionStatus::Present),
            "absent" => Ok(DetectionStatus::Absent),
            _ => Err(VocabularyError::Unrecognized {
                field: "detection status",
                value: value.trim().to_string(),
            }),
        }
    }
}

/// First run of ASCII digits in `text`, e.g. `"3/12 positive"` -> `3`.
pub fn first_integer(text: &str) -> Option<i64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits: &str = &text[start..];
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse().ok()
}
