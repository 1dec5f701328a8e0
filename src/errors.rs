use thiserror::Error;
use std::io;
use std::path::PathBuf;

/// Custom error types for rock micrograph analysis
#[derive(Error, Debug)]
pub enum RockAnalysisError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unsupported image: {0}")]
    UnsupportedImage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load configuration from {path}: {source}")]
    ConfigLoad {
        source: toml::de::Error,
        path: PathBuf,
    },

    #[error("CSV output error: {0}")]
    CsvOutput(#[from] csv::Error),

    #[error("JSON output error: {0}")]
    JsonOutput(#[from] serde_json::Error),

    #[error("Invalid input path: {0}")]
    InvalidPath(PathBuf),
}

impl RockAnalysisError {
    /// Shorthand for building an `InvalidParameter` error
    pub fn invalid(message: impl Into<String>) -> Self {
        RockAnalysisError::InvalidParameter(message.into())
    }
}

/// Type alias for Result with our custom error type
pub type Result<T> = std::result::Result<T, RockAnalysisError>;
