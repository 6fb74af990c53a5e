use std::collections::{HashMap, HashSet};

use csv::StringRecord;

use crate::errors::LoadError;
use crate::formats::common::{normalize_header, parse_optional_f64, read_records};
use crate::model::Site;

const PARSER_NAME: &str = "site_table_csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum SiteColumn {
    SiteId,
    Name,
    Latitude,
    Longitude,
    Taxon,
    Elevation,
}

impl SiteColumn {
    fn from_header(raw: &str) -> Option<Self> {
        match normalize_header(raw).as_str() {
            "site_id" | "site" | "id" | "site_code" => Some(SiteColumn::SiteId),
            "name" | "site_name" => Some(SiteColumn::Name),
            "latitude" | "lat" => Some(SiteColumn::Latitude),
            "longitude" | "lon" | "long" => Some(SiteColumn::Longitude),
            "taxon" | "species" => Some(SiteColumn::Taxon),
            "elevation_m" | "elevation" | "elev" => Some(SiteColumn::Elevation),
            _ => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            SiteColumn::SiteId => "site_id",
            SiteColumn::Name => "name",
            SiteColumn::Latitude => "latitude",
            SiteColumn::Longitude => "longitude",
            SiteColumn::Taxon => "taxon",
            SiteColumn::Elevation => "elevation_m",
        }
    }
}

const REQUIRED: [SiteColumn; 4] = [
    SiteColumn::SiteId,
    SiteColumn::Latitude,
    SiteColumn::Longitude,
    SiteColumn::Taxon,
];

/// Parses the site reference table. Headers are matched case-insensitively
/// and may appear in any order; unknown columns are ignored.
pub fn parse_site_table(content: &str) -> Result<Vec<Site>, LoadError> {
    let (header, records) = read_records(PARSER_NAME, content)?;

    let mut positions: HashMap<SiteColumn, usize> = HashMap::new();
    for (idx, raw) in header.iter().enumerate() {
        if let Some(column) = SiteColumn::from_header(raw) {
            if positions.insert(column, idx).is_some() {
                return Err(LoadError::InvalidHeader {
                    parser: PARSER_NAME,
                    message: format!("column '{}' appears more than once", column.label()),
                });
            }
        }
    }
    for column in REQUIRED {
        if !positions.contains_key(&column) {
            return Err(LoadError::InvalidHeader {
                parser: PARSER_NAME,
                message: format!("missing required column '{}'", column.label()),
            });
        }
    }
    if records.is_empty() {
        return Err(LoadError::EmptyData {
            parser: PARSER_NAME,
        });
    }

    let mut sites = Vec::with_capacity(records.len());
    let mut seen = HashSet::new();

    for (idx, record) in records.iter().enumerate() {
        let line_index = idx + 2;
        let cell = |column: SiteColumn| cell_value(&positions, record, column);
        let required_text = |column: SiteColumn| -> Result<String, LoadError> {
            let value = cell(column).trim().trim_matches('"');
            if value.is_empty() {
                Err(LoadError::DataRow {
                    parser: PARSER_NAME,
                    line_index,
                    message: format!("column '{}' is empty", column.label()),
                })
            } else {
                Ok(value.to_string())
            }
        };
        let required_number = |column: SiteColumn| -> Result<f64, LoadError> {
            parse_optional_f64(PARSER_NAME, line_index, column.label(), cell(column))?.ok_or_else(
                || LoadError::DataRow {
                    parser: PARSER_NAME,
                    line_index,
                    message: format!("column '{}' is missing", column.label()),
                },
            )
        };

        let site_id = required_text(SiteColumn::SiteId)?;
        let latitude = required_number(SiteColumn::Latitude)?;
        let longitude = required_number(SiteColumn::Longitude)?;
        let taxon = required_text(SiteColumn::Taxon)?;
        let name = Some(cell(SiteColumn::Name).trim().trim_matches('"'))
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        let elevation_m = parse_optional_f64(
            PARSER_NAME,
            line_index,
            SiteColumn::Elevation.label(),
            cell(SiteColumn::Elevation),
        )?;

        if !(-90.0..=90.0).contains(&latitude) {
            return Err(LoadError::Validation {
                parser: PARSER_NAME,
                message: format!("site '{site_id}' latitude {latitude} is out of range"),
            });
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(LoadError::Validation {
                parser: PARSER_NAME,
                message: format!("site '{site_id}' longitude {longitude} is out of range"),
            });
        }
        if !seen.insert(site_id.clone()) {
            return Err(LoadError::Validation {
                parser: PARSER_NAME,
                message: format!("duplicate site id '{site_id}'"),
            });
        }

        sites.push(Site {
            site_id,
            name,
            latitude,
            longitude,
            taxon,
            elevation_m,
        });
    }

    Ok(sites)
}

fn cell_value<'a>(
    positions: &HashMap<SiteColumn, usize>,
    record: &'a StringRecord,
    column: SiteColumn,
) -> &'a str {
    positions
        .get(&column)
        .and_then(|pos| record.get(*pos))
        .unwrap_or_default()
}
