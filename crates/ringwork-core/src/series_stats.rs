use polars::prelude::*;
use serde::Serialize;

use crate::error::Result;
use crate::statistics::{ar1, mean, mean_sensitivity, median, span, std_dev};
use ringwork_parser::RingWidthTable;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesStats {
    pub series_id: String,
    pub first_year: Option<i32>,
    pub last_year: Option<i32>,
    /// Years from first to last measured ring, inclusive.
    pub length: usize,
    pub n_rings: usize,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub sd: Option<f64>,
    pub ar1: Option<f64>,
    pub mean_sensitivity: Option<f64>,
}

pub fn series_stats(table: &RingWidthTable) -> Result<Vec<SeriesStats>> {
    let years = table.years()?;
    let stats = table
        .all_series()?
        .into_iter()
        .map(|(series_id, values)| {
            let present: Vec<f64> = values.iter().flatten().copied().collect();
            let bounds = span(&values);
            SeriesStats {
                series_id,
                first_year: bounds.map(|(first, _)| years[first]),
                last_year: bounds.map(|(_, last)| years[last]),
                length: bounds.map(|(first, last)| last - first + 1).unwrap_or(0),
                n_rings: present.len(),
                mean: mean(&present),
                median: median(&present),
                sd: std_dev(&present),
                ar1: ar1(&values),
                mean_sensitivity: mean_sensitivity(&values),
            }
        })
        .collect();
    Ok(stats)
}

pub fn stats_frame(stats: &[SeriesStats]) -> PolarsResult<DataFrame> {
    df!(
        "series" => stats.iter().map(|s| s.series_id.as_str()).collect::<Vec<_>>(),
        "first_year" => stats.iter().map(|s| s.first_year).collect::<Vec<_>>(),
        "last_year" => stats.iter().map(|s| s.last_year).collect::<Vec<_>>(),
        "length" => stats.iter().map(|s| s.length as u32).collect::<Vec<_>>(),
        "n_rings" => stats.iter().map(|s| s.n_rings as u32).collect::<Vec<_>>(),
        "mean" => stats.iter().map(|s| s.mean).collect::<Vec<_>>(),
        "median" => stats.iter().map(|s| s.median).collect::<Vec<_>>(),
        "sd" => stats.iter().map(|s| s.sd).collect::<Vec<_>>(),
        "ar1" => stats.iter().map(|s| s.ar1).collect::<Vec<_>>(),
        "mean_sensitivity" => stats.iter().map(|s| s.mean_sensitivity).collect::<Vec<_>>(),
    )
}
