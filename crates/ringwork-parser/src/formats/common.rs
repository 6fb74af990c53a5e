use csv::{ReaderBuilder, StringRecord, Trim};

use crate::errors::LoadError;

const MISSING_TOKENS: [&str; 5] = ["", "na", "nan", "null", "-"];

pub(crate) fn read_records(
    parser: &'static str,
    content: &str,
) -> Result<(StringRecord, Vec<StringRecord>), LoadError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .flexible(false)
        .from_reader(content.as_bytes());

    let header = reader
        .headers()
        .map_err(|source| LoadError::Csv { parser, source })?
        .clone();

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| LoadError::Csv { parser, source })?;
        if record.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        records.push(record);
    }

    Ok((header, records))
}

pub(crate) fn normalize_header(raw: &str) -> String {
    raw.trim()
        .trim_matches('"')
        .trim_start_matches('\u{feff}')
        .to_ascii_lowercase()
}

pub(crate) fn is_year_header(raw: &str) -> bool {
    matches!(normalize_header(raw).as_str(), "" | "year" | "years" | "yr")
}

pub(crate) fn parse_year(
    parser: &'static str,
    line_index: usize,
    raw: &str,
) -> Result<i32, LoadError> {
    let trimmed = raw.trim().trim_matches('"');
    trimmed
        .parse::<i32>()
        .or_else(|_| {
            trimmed
                .parse::<f64>()
                .ok()
                .filter(|value| value.fract() == 0.0)
                .map(|value| value as i32)
                .ok_or(())
        })
        .map_err(|_| LoadError::DataRow {
            parser,
            line_index,
            message: format!("year '{trimmed}' is not an integer"),
        })
}

pub(crate) fn is_missing(raw: &str) -> bool {
    let trimmed = raw.trim().trim_matches('"');
    MISSING_TOKENS
        .iter()
        .any(|token| trimmed.eq_ignore_ascii_case(token))
}

pub(crate) fn parse_optional_f64(
    parser: &'static str,
    line_index: usize,
    column: &str,
    raw: &str,
) -> Result<Option<f64>, LoadError> {
    if is_missing(raw) {
        return Ok(None);
    }
    let trimmed = raw.trim().trim_matches('"');
    let value = trimmed.parse::<f64>().map_err(|_| LoadError::DataRow {
        parser,
        line_index,
        message: format!("column '{column}' value '{trimmed}' is not numeric"),
    })?;
    Ok(Some(value).filter(|v| v.is_finite()))
}

/// Checks that years strictly increase and returns the contiguous year axis
/// spanning them.
pub(crate) fn contiguous_years(
    parser: &'static str,
    years: &[i32],
) -> Result<Vec<i32>, LoadError> {
    for (idx, pair) in years.windows(2).enumerate() {
        if pair[1] <= pair[0] {
            return Err(LoadError::DataRow {
                parser,
                line_index: idx + 3,
                message: format!(
                    "year {} does not follow {} (years must strictly increase)",
                    pair[1], pair[0]
                ),
            });
        }
    }
    match (years.first(), years.last()) {
        (Some(first), Some(last)) => Ok((*first..=*last).collect()),
        _ => Err(LoadError::EmptyData { parser }),
    }
}
