use std::collections::HashSet;

use crate::errors::LoadError;
use crate::formats::common::{
    contiguous_years, is_year_header, parse_optional_f64, parse_year, read_records,
};
use crate::model::RingWidthTable;

const PARSER_NAME: &str = "ring_width_csv";

/// Parses a year-by-core ring-width matrix.
///
/// The first column holds calendar years (header `year`, or empty as written
/// by R's `write.csv`); every other column is one core. Gaps in the year axis
/// are filled with all-missing rows.
pub fn parse_ring_width_table(content: &str) -> Result<RingWidthTable, LoadError> {
    let (header, records) = read_records(PARSER_NAME, content)?;

    let mut header_iter = header.iter();
    let year_header = header_iter.next().ok_or_else(|| LoadError::InvalidHeader {
        parser: PARSER_NAME,
        message: "header row is empty".to_string(),
    })?;
    if !is_year_header(year_header) {
        return Err(LoadError::InvalidHeader {
            parser: PARSER_NAME,
            message: format!("first column must be the year, found '{year_header}'"),
        });
    }

    let mut series_ids = Vec::with_capacity(header.len().saturating_sub(1));
    let mut seen = HashSet::new();
    for raw in header_iter {
        let id = raw.trim().trim_matches('"').to_string();
        if id.is_empty() {
            return Err(LoadError::InvalidHeader {
                parser: PARSER_NAME,
                message: "series column with an empty name".to_string(),
            });
        }
        if !seen.insert(id.clone()) {
            return Err(LoadError::InvalidHeader {
                parser: PARSER_NAME,
                message: format!("duplicate series id '{id}'"),
            });
        }
        series_ids.push(id);
    }
    if series_ids.is_empty() {
        return Err(LoadError::InvalidHeader {
            parser: PARSER_NAME,
            message: "no series columns found".to_string(),
        });
    }
    if records.is_empty() {
        return Err(LoadError::EmptyData {
            parser: PARSER_NAME,
        });
    }

    let mut row_years = Vec::with_capacity(records.len());
    let mut row_values: Vec<Vec<Option<f64>>> = vec![Vec::with_capacity(records.len()); series_ids.len()];

    for (idx, record) in records.iter().enumerate() {
        let line_index = idx + 2;
        let year = parse_year(PARSER_NAME, line_index, record.get(0).unwrap_or_default())?;
        row_years.push(year);

        for (column_idx, id) in series_ids.iter().enumerate() {
            let raw = record.get(column_idx + 1).unwrap_or_default();
            let value = parse_optional_f64(PARSER_NAME, line_index, id, raw)?;
            if let Some(width) = value {
                if width < 0.0 {
                    return Err(LoadError::DataRow {
                        parser: PARSER_NAME,
                        line_index,
                        message: format!("series '{id}' has negative ring width {width}"),
                    });
                }
            }
            row_values[column_idx].push(value);
        }
    }

    let years = contiguous_years(PARSER_NAME, &row_years)?;
    let first = years[0];
    let series = series_ids
        .into_iter()
        .zip(row_values)
        .map(|(id, values)| {
            let mut filled = vec![None; years.len()];
            for (year, value) in row_years.iter().zip(values) {
                filled[(year - first) as usize] = value;
            }
            (id, filled)
        })
        .collect();

    Ok(RingWidthTable::from_columns(years, series)?)
}
