//! Error types for flota

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Raw bytes could not be decoded with any supported text encoding
    #[error("Unable to decode file: {0}")]
    Decode(String),

    /// A required column is absent from the statement header
    #[error("Required column not found: {field}. Available columns: {observed:?}")]
    MissingColumn { field: String, observed: Vec<String> },

    /// No known provider signature in the document text
    #[error("Unrecognized invoice provider: {0}")]
    ProviderUnrecognized(String),

    /// Payroll file name carries no COST + YYYYMM token
    #[error("Unable to determine month from file name: {0}")]
    MissingPeriod(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Import error: {0}")]
    Import(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;
