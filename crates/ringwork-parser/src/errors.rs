use std::fmt;

use polars::prelude::PolarsError;
use thiserror::Error;

/// Why one climate-index layout rejected a file.
#[derive(Debug, Clone)]
pub struct LayoutAttempt {
    pub layout: &'static str,
    pub reason: String,
}

impl fmt::Display for LayoutAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.layout, self.reason)
    }
}

fn describe_attempts(attempts: &[LayoutAttempt]) -> String {
    attempts
        .iter()
        .map(LayoutAttempt::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{parser} format mismatch: {reason}")]
    FormatMismatch {
        parser: &'static str,
        reason: String,
    },

    #[error("{parser} header invalid: {message}")]
    InvalidHeader {
        parser: &'static str,
        message: String,
    },

    #[error("{parser} CSV error: {source}")]
    Csv {
        parser: &'static str,
        #[source]
        source: csv::Error,
    },

    #[error("{parser} data row {line_index} invalid: {message}")]
    DataRow {
        parser: &'static str,
        line_index: usize,
        message: String,
    },

    #[error("{parser} validation error: {message}")]
    Validation {
        parser: &'static str,
        message: String,
    },

    #[error("{parser} file did not contain any data rows")]
    EmptyData { parser: &'static str },

    #[error(
        "no climate-index layout accepts columns [{}]: {}",
        .header.join(", "),
        describe_attempts(.attempts)
    )]
    NoMatchingParser {
        header: Vec<String>,
        attempts: Vec<LayoutAttempt>,
    },

    #[error("table construction failed: {0}")]
    Table(#[from] PolarsError),
}
