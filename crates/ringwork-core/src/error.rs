use ringwork_parser::LoadError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("failed to load {path}: {source}")]
    Load {
        path: String,
        #[source]
        source: LoadError,
    },

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration file is not valid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid input pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("series '{0}' not found")]
    MissingSeries(String),

    #[error("insufficient data: {0}")]
    InsufficientData(String),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
