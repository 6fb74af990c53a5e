use polars::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::CorrelationConfig;
use crate::error::Result;
use crate::prewhiten::prewhiten_all;
use crate::statistics::{correlate, mean, CorrelationMethod};
use ringwork_parser::RingWidthTable;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesCorrelation {
    pub series_id: String,
    /// Correlation with the mean of all other series; `None` when undefined.
    pub r: Option<f64>,
    pub p_value: Option<f64>,
    pub overlap: usize,
}

#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub table: RingWidthTable,
    pub removed: Vec<String>,
}

/// Per-year mean of every series except `skip`.
pub fn leave_one_out_master(
    series: &[(String, Vec<Option<f64>>)],
    skip: usize,
    n_years: usize,
) -> Vec<Option<f64>> {
    (0..n_years)
        .map(|idx| {
            let values: Vec<f64> = series
                .iter()
                .enumerate()
                .filter(|(other, _)| *other != skip)
                .filter_map(|(_, (_, values))| values.get(idx).copied().flatten())
                .collect();
            mean(&values)
        })
        .collect()
}

/// Correlates every series with the mean of the others.
pub fn series_correlations(
    table: &RingWidthTable,
    method: CorrelationMethod,
    prewhiten: bool,
) -> Result<Vec<SeriesCorrelation>> {
    let raw = table.all_series()?;
    let series = if prewhiten { prewhiten_all(&raw) } else { raw };
    let n_years = table.n_years();

    let mut results = Vec::with_capacity(series.len());
    for (idx, (series_id, values)) in series.iter().enumerate() {
        let master = leave_one_out_master(&series, idx, n_years);
        let correlation = correlate(method, values, &master);
        let overlap = values
            .iter()
            .zip(master.iter())
            .filter(|(a, b)| a.is_some() && b.is_some())
            .count();
        if correlation.is_none() {
            warn!(series = %series_id, overlap, "correlation with the other series is undefined");
        }
        results.push(SeriesCorrelation {
            series_id: series_id.clone(),
            r: correlation.map(|c| c.r),
            p_value: correlation.map(|c| c.p_value),
            overlap,
        });
    }

    Ok(results)
}

/// Removes series whose correlation is undefined or below `threshold`.
pub fn filter_series(
    table: &RingWidthTable,
    correlations: &[SeriesCorrelation],
    threshold: f64,
) -> Result<FilterOutcome> {
    let mut filtered = table.clone();
    let mut removed = Vec::new();

    for correlation in correlations {
        let keep = correlation.r.map(|r| r >= threshold).unwrap_or(false);
        if keep || !filtered.contains_series(&correlation.series_id) {
            continue;
        }
        info!(
            series = %correlation.series_id,
            r = ?correlation.r,
            threshold,
            "removing poorly correlated series"
        );
        filtered = filtered.drop_series(&correlation.series_id)?;
        removed.push(correlation.series_id.clone());
    }

    Ok(FilterOutcome {
        table: filtered,
        removed,
    })
}

pub fn correlate_and_filter(
    table: &RingWidthTable,
    config: &CorrelationConfig,
) -> Result<(Vec<SeriesCorrelation>, FilterOutcome)> {
    let correlations = series_correlations(table, config.method, config.prewhiten)?;
    let outcome = filter_series(table, &correlations, config.threshold)?;
    info!(
        kept = outcome.table.series_count(),
        removed = outcome.removed.len(),
        "series correlation filter applied"
    );
    Ok((correlations, outcome))
}

pub fn correlations_frame(
    correlations: &[SeriesCorrelation],
    removed: &[String],
) -> PolarsResult<DataFrame> {
    df!(
        "series" => correlations.iter().map(|c| c.series_id.as_str()).collect::<Vec<_>>(),
        "r" => correlations.iter().map(|c| c.r).collect::<Vec<_>>(),
        "p_value" => correlations.iter().map(|c| c.p_value).collect::<Vec<_>>(),
        "overlap" => correlations.iter().map(|c| c.overlap as u32).collect::<Vec<_>>(),
        "removed" => correlations
            .iter()
            .map(|c| removed.contains(&c.series_id))
            .collect::<Vec<_>>(),
    )
}
