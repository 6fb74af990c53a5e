pub mod chronology;
pub mod climate;
pub mod config;
pub mod correlation;
pub mod crossdate;
pub mod detrend;
pub mod error;
pub mod ingestion;
pub mod outputs;
pub mod pipeline;
pub mod pointer;
pub mod prewhiten;
pub mod release;
pub mod series_stats;
pub mod sites;
pub mod smoothing;
pub mod statistics;

pub use error::{AnalysisError, Result};
pub use ringwork_parser::{ClimateIndex, RingWidthTable, Site};
