use crate::errors::LoadError;
use crate::formats::common::{
    contiguous_years, is_year_header, parse_optional_f64, parse_year, read_records,
};
use crate::model::ClimateIndex;
use crate::registry::ClimateIndexParser;

/// `year,<value>` tables, one row per year.
pub struct AnnualIndexParser;

impl ClimateIndexParser for AnnualIndexParser {
    fn name(&self) -> &'static str {
        "annual_index_csv"
    }

    fn parse(&self, content: &str) -> Result<ClimateIndex, LoadError> {
        let parser = self.name();
        let (header, records) = read_records(parser, content)?;

        if header.len() != 2 {
            return Err(LoadError::FormatMismatch {
                parser,
                reason: format!("expected 2 columns, found {}", header.len()),
            });
        }
        if !is_year_header(&header[0]) {
            return Err(LoadError::FormatMismatch {
                parser,
                reason: format!("first column '{}' is not a year column", &header[0]),
            });
        }
        if records.is_empty() {
            return Err(LoadError::EmptyData { parser });
        }

        let value_name = header[1].trim().trim_matches('"').to_string();
        let mut index = ClimateIndex::new(value_name.clone());
        let mut years = Vec::with_capacity(records.len());

        for (idx, record) in records.iter().enumerate() {
            let line_index = idx + 2;
            let year = parse_year(parser, line_index, &record[0])?;
            let value = parse_optional_f64(parser, line_index, &value_name, &record[1])?;
            years.push(year);
            index.values.insert(year, value);
        }
        contiguous_years(parser, &years)?;

        Ok(index)
    }
}
