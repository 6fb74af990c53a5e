use crate::errors::{LayoutAttempt, LoadError};
use crate::formats::{AnnualIndexParser, MonthlyIndexParser};
use crate::model::ClimateIndex;

pub trait ClimateIndexParser {
    fn name(&self) -> &'static str;
    fn parse(&self, content: &str) -> Result<ClimateIndex, LoadError>;
}

/// Tries every known climate-index layout in turn. Monthly tables are reduced
/// to annual values over `season` (1-based months, empty means all twelve).
pub fn parse_climate_index(content: &str, season: &[u32]) -> Result<ClimateIndex, LoadError> {
    let annual = AnnualIndexParser;
    let monthly = MonthlyIndexParser::new(season);
    let parsers: [&dyn ClimateIndexParser; 2] = [&annual, &monthly];
    parse_with_parsers(content, &parsers)
}

pub fn parse_with_parsers(
    content: &str,
    parsers: &[&dyn ClimateIndexParser],
) -> Result<ClimateIndex, LoadError> {
    let mut attempts = Vec::new();

    for parser in parsers {
        match parser.parse(content) {
            Ok(parsed) => return Ok(parsed),
            Err(LoadError::FormatMismatch { reason, .. }) => {
                attempts.push(LayoutAttempt {
                    layout: parser.name(),
                    reason,
                });
            }
            Err(err) => return Err(err),
        }
    }

    let header = content
        .lines()
        .next()
        .map(|line| line.split(',').map(|column| column.trim().to_string()).collect())
        .unwrap_or_default();
    Err(LoadError::NoMatchingParser { header, attempts })
}
