use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use polars::io::parquet::write::{ParquetCompression, ParquetWriter, StatisticsOptions};
use polars::prelude::*;
use pondocc_parser::{read_agreements, read_surveys, AgreementRow, ParserError, SurveyRow};
use thiserror::Error;

use crate::regions::{RegionBoundaries, RegionError};
use crate::schema::clean_survey_schema;

#[derive(Debug, Error)]
pub enum TableIoError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParserError,
    },
    #[error("invalid boundaries in {path}: {source}")]
    Boundaries {
        path: PathBuf,
        #[source]
        source: RegionError,
    },
    #[error("table {path}: {source}")]
    Polars {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Parquet,
}

impl TableFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("parquet") => TableFormat::Parquet,
            _ => TableFormat::Csv,
        }
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> TableIoError + '_ {
    move |source| TableIoError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn polars_error(path: &Path) -> impl FnOnce(PolarsError) -> TableIoError + '_ {
    move |source| TableIoError::Polars {
        path: path.to_path_buf(),
        source,
    }
}

fn open(path: &Path) -> Result<BufReader<File>, TableIoError> {
    File::open(path).map(BufReader::new).map_err(io_error(path))
}

pub fn load_agreements(path: &Path) -> Result<Vec<AgreementRow>, TableIoError> {
    read_agreements(open(path)?).map_err(|source| TableIoError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_surveys(path: &Path) -> Result<Vec<SurveyRow>, TableIoError> {
    read_surveys(open(path)?).map_err(|source| TableIoError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_boundaries(path: &Path, name_property: &str) -> Result<RegionBoundaries, TableIoError> {
    let mut text = String::new();
    open(path)?
        .read_to_string(&mut text)
        .map_err(io_error(path))?;
    RegionBoundaries::from_geojson(&text, name_property).map_err(|source| {
        TableIoError::Boundaries {
            path: path.to_path_buf(),
            source,
        }
    })
}

/// Reads the cleaned survey table written by preprocessing.
pub fn read_clean_surveys(path: &Path) -> Result<DataFrame, TableIoError> {
    match TableFormat::from_path(path) {
        TableFormat::Parquet => {
            let file = File::open(path).map_err(io_error(path))?;
            ParquetReader::new(file).finish().map_err(polars_error(path))
        }
        TableFormat::Csv => CsvReadOptions::default()
            .with_has_header(true)
            .with_schema(Some(clean_survey_schema()))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .and_then(|reader| reader.finish())
            .map_err(polars_error(path)),
    }
}

/// Reads any table this crate writes, inferring CSV column types.
pub fn read_table(path: &Path) -> Result<DataFrame, TableIoError> {
    match TableFormat::from_path(path) {
        TableFormat::Parquet => {
            let file = File::open(path).map_err(io_error(path))?;
            ParquetReader::new(file).finish().map_err(polars_error(path))
        }
        TableFormat::Csv => CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .and_then(|reader| reader.finish())
            .map_err(polars_error(path)),
    }
}

/// Writes `df` as CSV or zstd Parquet depending on the extension, creating parent
/// directories as needed.
pub fn write_table(df: &mut DataFrame, path: &Path) -> Result<(), TableIoError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    let mut file = File::create(path).map_err(io_error(path))?;

    match TableFormat::from_path(path) {
        TableFormat::Parquet => ParquetWriter::new(&mut file)
            .with_compression(ParquetCompression::Zstd(None))
            .with_statistics(StatisticsOptions::default())
            .finish(df)
            .map(|_| ())
            .map_err(polars_error(path)),
        TableFormat::Csv => CsvWriter::new(&mut file)
            .include_header(true)
            .finish(df)
            .map_err(polars_error(path)),
    }
}

/// blake3 digest over the given files, in order.
pub fn fingerprint(paths: &[&Path]) -> Result<String, TableIoError> {
    let mut hasher = blake3::Hasher::new();
    for path in paths {
        let mut reader = open(path)?;
        std::io::copy(&mut reader, &mut hasher).map_err(io_error(path))?;
    }
    Ok(hasher.finalize().to_hex().to_string())
}
