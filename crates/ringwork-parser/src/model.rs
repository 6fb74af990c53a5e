use std::collections::{BTreeMap, HashSet};

use polars::prelude::*;
use serde::{Deserialize, Serialize};

pub const YEAR_COLUMN: &str = "year";

/// Year-by-core matrix of ring widths (or ring-width indices after detrending).
///
/// The backing frame always carries an `Int32` `year` column with contiguous,
/// ascending years followed by one `Float64` column per core. Missing cells
/// are nulls.
#[derive(Debug, Clone)]
pub struct RingWidthTable {
    df: DataFrame,
}

impl RingWidthTable {
    /// Builds a table from a year axis and per-core columns. Every column must
    /// have one cell per year.
    pub fn from_columns(
        years: Vec<i32>,
        series: Vec<(String, Vec<Option<f64>>)>,
    ) -> Result<Self, PolarsError> {
        let height = years.len();
        if years.windows(2).any(|pair| pair[1] != pair[0] + 1) {
            return Err(PolarsError::ComputeError(
                "ring-width years must be contiguous and ascending".into(),
            ));
        }

        let mut seen = HashSet::new();
        let mut columns: Vec<Column> = Vec::with_capacity(series.len() + 1);
        columns.push(Series::new(YEAR_COLUMN.into(), years).into());
        for (id, values) in series {
            if id == YEAR_COLUMN || !seen.insert(id.clone()) {
                return Err(PolarsError::Duplicate(
                    format!("series id '{id}' appears more than once").into(),
                ));
            }
            if values.len() != height {
                return Err(PolarsError::ShapeMismatch(
                    format!(
                        "series '{id}' has {} cells, expected {height}",
                        values.len()
                    )
                    .into(),
                ));
            }
            columns.push(Series::new(id.as_str().into(), values).into());
        }

        Ok(Self {
            df: DataFrame::new(columns)?,
        })
    }

    pub fn df(&self) -> &DataFrame {
        &self.df
    }

    pub fn n_years(&self) -> usize {
        self.df.height()
    }

    pub fn series_count(&self) -> usize {
        self.df.width().saturating_sub(1)
    }

    pub fn years(&self) -> Result<Vec<i32>, PolarsError> {
        Ok(self
            .df
            .column(YEAR_COLUMN)?
            .i32()?
            .into_iter()
            .flatten()
            .collect())
    }

    pub fn first_year(&self) -> Result<Option<i32>, PolarsError> {
        Ok(self.years()?.first().copied())
    }

    pub fn series_ids(&self) -> Vec<String> {
        self.df
            .get_column_names()
            .into_iter()
            .filter(|name| name.as_str() != YEAR_COLUMN)
            .map(|name| name.to_string())
            .collect()
    }

    pub fn contains_series(&self, id: &str) -> bool {
        id != YEAR_COLUMN && self.df.column(id).is_ok()
    }

    pub fn series(&self, id: &str) -> Result<Vec<Option<f64>>, PolarsError> {
        if id == YEAR_COLUMN {
            return Err(PolarsError::ColumnNotFound(
                format!("'{id}' is not a series").into(),
            ));
        }
        Ok(self.df.column(id)?.f64()?.into_iter().collect())
    }

    /// All series in column order.
    pub fn all_series(&self) -> Result<Vec<(String, Vec<Option<f64>>)>, PolarsError> {
        self.series_ids()
            .into_iter()
            .map(|id| {
                let values = self.series(&id)?;
                Ok((id, values))
            })
            .collect()
    }

    pub fn drop_series(&self, id: &str) -> Result<Self, PolarsError> {
        if id == YEAR_COLUMN {
            return Err(PolarsError::ComputeError(
                "the year column cannot be dropped".into(),
            ));
        }
        Ok(Self {
            df: self.df.drop(id)?,
        })
    }

    /// Returns a table over the same years with the series replaced.
    pub fn with_series(
        &self,
        series: Vec<(String, Vec<Option<f64>>)>,
    ) -> Result<Self, PolarsError> {
        Self::from_columns(self.years()?, series)
    }

    /// Number of series with a value for each year.
    pub fn sample_depth(&self) -> Result<Vec<usize>, PolarsError> {
        let mut depth = vec![0usize; self.n_years()];
        for (_, values) in self.all_series()? {
            for (slot, value) in depth.iter_mut().zip(values.iter()) {
                if value.is_some() {
                    *slot += 1;
                }
            }
        }
        Ok(depth)
    }

    /// Joins two tables on year. Series ids must be disjoint.
    pub fn merge(&self, other: &RingWidthTable) -> Result<Self, PolarsError> {
        let left_years = self.years()?;
        let right_years = other.years()?;
        let first = left_years.first().into_iter().chain(right_years.first()).min().copied();
        let last = left_years.last().into_iter().chain(right_years.last()).max().copied();
        let years: Vec<i32> = match (first, last) {
            (Some(first), Some(last)) => (first..=last).collect(),
            _ => Vec::new(),
        };

        let mut merged = Vec::with_capacity(self.series_count() + other.series_count());
        for (table, table_years) in [(self, &left_years), (other, &right_years)] {
            let offset = match (table_years.first(), first) {
                (Some(year), Some(first)) => (year - first) as usize,
                _ => 0,
            };
            for (id, values) in table.all_series()? {
                let mut padded = vec![None; years.len()];
                padded[offset..offset + values.len()].copy_from_slice(&values);
                merged.push((id, padded));
            }
        }

        Self::from_columns(years, merged)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub site_id: String,
    pub name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub taxon: String,
    pub elevation_m: Option<f64>,
}

/// Annual climate index series, e.g. a drought index.
#[derive(Debug, Clone, PartialEq)]
pub struct ClimateIndex {
    pub name: String,
    pub values: BTreeMap<i32, Option<f64>>,
}

impl ClimateIndex {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: BTreeMap::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn value(&self, year: i32) -> Option<f64> {
        self.values.get(&year).copied().flatten()
    }
}
