use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::regions::DEFAULT_NAME_PROPERTY;

pub const CONFIG_ENV_VAR: &str = "PONDOCC_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InputPaths {
    pub agreements: PathBuf,
    pub surveys: PathBuf,
    pub boundaries: PathBuf,
}

impl Default for InputPaths {
    fn default() -> Self {
        Self {
            agreements: PathBuf::from("Data/Pond_Agreements.csv"),
            surveys: PathBuf::from("Data/Pond_Surveys.csv"),
            boundaries: PathBuf::from("Data/EDP_Boundaries.geojson"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputPaths {
    pub clean_surveys: PathBuf,
    pub clean_agreements: PathBuf,
    pub naive_occupancy: PathBuf,
}

impl Default for OutputPaths {
    fn default() -> Self {
        Self {
            clean_surveys: PathBuf::from("Data/Pond_Surveys_Clean.csv"),
            clean_agreements: PathBuf::from("Data/Pond_Agreements_Clean.csv"),
            naive_occupancy: PathBuf::from("Output/Naive_Occupancy.csv"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegionSettings {
    /// Feature property holding the region name.
    pub name_property: String,
}

impl Default for RegionSettings {
    fn default() -> Self {
        Self {
            name_property: DEFAULT_NAME_PROPERTY.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PreprocessSettings {
    /// Fail on unrecognized restoration type, area or detection labels instead of
    /// treating them as missing.
    pub strict_vocabulary: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EstimatorSettings {
    /// Last monitoring year included; the contingency survey is year 6.
    pub max_year: i64,
    pub confidence: f64,
}

impl Default for EstimatorSettings {
    fn default() -> Self {
        Self {
            max_year: 5,
            confidence: 0.95,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub inputs: InputPaths,
    pub outputs: OutputPaths,
    pub regions: RegionSettings,
    pub preprocess: PreprocessSettings,
    pub estimator: EstimatorSettings,
}

impl PipelineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Explicit path first, then `PONDOCC_CONFIG` (a `.env` file is honoured),
    /// then built-in defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        dotenvy::dotenv().ok();
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => Self::load(Path::new(&path)),
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let confidence = self.estimator.confidence;
        if !(confidence > 0.0 && confidence < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "estimator.confidence must lie strictly between 0 and 1, got {confidence}"
            )));
        }
        if !(1..=6).contains(&self.estimator.max_year) {
            return Err(ConfigError::Invalid(format!(
                "estimator.max_year must be between 1 and 6, got {}",
                self.estimator.max_year
            )));
        }
        if self.regions.name_property.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "regions.name_property must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
