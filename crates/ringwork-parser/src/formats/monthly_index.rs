use crate::errors::LoadError;
use crate::formats::common::{
    contiguous_years, is_year_header, normalize_header, parse_optional_f64, parse_year,
    read_records,
};
use crate::model::ClimateIndex;
use crate::registry::ClimateIndexParser;

const MONTH_NAMES: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// `year` plus twelve month columns, aggregated to one value per year as the
/// mean over the season months (1-based). A year missing any season month
/// has no value.
pub struct MonthlyIndexParser {
    season: Vec<u32>,
}

impl MonthlyIndexParser {
    pub fn new(season: &[u32]) -> Self {
        let season = if season.is_empty() {
            (1..=12).collect()
        } else {
            season.to_vec()
        };
        Self { season }
    }
}

fn month_number(raw: &str) -> Option<u32> {
    let header = normalize_header(raw);
    if let Ok(number) = header.parse::<u32>() {
        return (1..=12).contains(&number).then_some(number);
    }
    MONTH_NAMES
        .iter()
        .position(|name| header.starts_with(name))
        .map(|pos| pos as u32 + 1)
}

impl ClimateIndexParser for MonthlyIndexParser {
    fn name(&self) -> &'static str {
        "monthly_index_csv"
    }

    fn parse(&self, content: &str) -> Result<ClimateIndex, LoadError> {
        let parser = self.name();
        if let Some(month) = self.season.iter().find(|month| !(1..=12).contains(*month)) {
            return Err(LoadError::Validation {
                parser,
                message: format!("season month {month} is outside 1..=12"),
            });
        }

        let (header, records) = read_records(parser, content)?;
        if header.len() != 13 {
            return Err(LoadError::FormatMismatch {
                parser,
                reason: format!("expected year plus 12 month columns, found {}", header.len()),
            });
        }
        if !is_year_header(&header[0]) {
            return Err(LoadError::FormatMismatch {
                parser,
                reason: format!("first column '{}' is not a year column", &header[0]),
            });
        }

        let mut month_positions = [0usize; 12];
        for (pos, raw) in header.iter().enumerate().skip(1) {
            let month = month_number(raw).ok_or_else(|| LoadError::FormatMismatch {
                parser,
                reason: format!("column '{raw}' is not a month"),
            })?;
            month_positions[(month - 1) as usize] = pos;
        }
        if month_positions.iter().any(|pos| *pos == 0) {
            return Err(LoadError::FormatMismatch {
                parser,
                reason: "month columns are not a permutation of the twelve months".to_string(),
            });
        }
        if records.is_empty() {
            return Err(LoadError::EmptyData { parser });
        }

        let mut index = ClimateIndex::new("index");
        let mut years = Vec::with_capacity(records.len());

        for (idx, record) in records.iter().enumerate() {
            let line_index = idx + 2;
            let year = parse_year(parser, line_index, &record[0])?;
            years.push(year);

            let mut total = 0.0;
            let mut complete = true;
            for month in &self.season {
                let pos = month_positions[(*month - 1) as usize];
                match parse_optional_f64(parser, line_index, &header[pos], &record[pos])? {
                    Some(value) => total += value,
                    None => complete = false,
                }
            }
            let value = complete.then(|| total / self.season.len() as f64);
            index.values.insert(year, value);
        }
        contiguous_years(parser, &years)?;

        Ok(index)
    }
}
