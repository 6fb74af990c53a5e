use polars::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::config::ChronologyConfig;
use crate::error::Result;
use crate::prewhiten::prewhiten_all;
use crate::statistics::{correlate, median, CorrelationMethod};
use ringwork_parser::RingWidthTable;

const BIWEIGHT_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChronologyYear {
    pub year: i32,
    /// Absent when no series contributes.
    pub value: Option<f64>,
    pub residual: Option<f64>,
    pub sample_depth: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Chronology {
    pub years: Vec<ChronologyYear>,
}

impl Chronology {
    pub fn values(&self) -> Vec<Option<f64>> {
        self.years.iter().map(|year| year.value).collect()
    }

    pub fn year_axis(&self) -> Vec<i32> {
        self.years.iter().map(|year| year.year).collect()
    }

    pub fn value(&self, year: i32) -> Option<f64> {
        let first = self.years.first()?.year;
        let idx = usize::try_from(year - first).ok()?;
        self.years.get(idx).and_then(|entry| entry.value)
    }

    pub fn to_dataframe(&self, smoothed: Option<&[Option<f64>]>) -> PolarsResult<DataFrame> {
        let mut columns: Vec<Column> = vec![
            Series::new("year".into(), self.year_axis()).into(),
            Series::new("std".into(), self.values()).into(),
            Series::new(
                "res".into(),
                self.years.iter().map(|year| year.residual).collect::<Vec<_>>(),
            )
            .into(),
            Series::new(
                "sample_depth".into(),
                self.years
                    .iter()
                    .map(|year| year.sample_depth as u32)
                    .collect::<Vec<_>>(),
            )
            .into(),
        ];
        if let Some(smoothed) = smoothed {
            columns.push(Series::new("smoothed".into(), smoothed.to_vec()).into());
        }
        DataFrame::new(columns)
    }
}

/// Tukey's biweight robust mean: start at the median, weight each value by
/// `(1 - u²)²` with `u = (x - M) / (c·MAD + ε)`, and iterate the weighted
/// mean until it moves less than `tolerance`.
pub fn tukey_biweight_mean(
    values: &[f64],
    c: f64,
    max_iterations: usize,
    tolerance: f64,
) -> Option<f64> {
    let mut location = median(values)?;
    let deviations: Vec<f64> = values.iter().map(|v| (v - location).abs()).collect();
    let scale = median(&deviations)?;
    let denominator = c * scale + BIWEIGHT_EPSILON;

    for _ in 0..max_iterations {
        let mut weighted = 0.0;
        let mut total = 0.0;
        for value in values {
            let u = (value - location) / denominator;
            if u.abs() < 1.0 {
                let w = (1.0 - u * u).powi(2);
                weighted += w * value;
                total += w;
            }
        }
        if total <= 0.0 {
            break;
        }
        let next = weighted / total;
        let moved = (next - location).abs();
        location = next;
        if moved < tolerance {
            break;
        }
    }

    Some(location)
}

fn yearly_biweight(
    series: &[(String, Vec<Option<f64>>)],
    n_years: usize,
    config: &ChronologyConfig,
) -> (Vec<Option<f64>>, Vec<usize>) {
    let mut values = Vec::with_capacity(n_years);
    let mut depth = Vec::with_capacity(n_years);
    for idx in 0..n_years {
        let present: Vec<f64> = series
            .iter()
            .filter_map(|(_, values)| values.get(idx).copied().flatten())
            .collect();
        depth.push(present.len());
        values.push(tukey_biweight_mean(
            &present,
            config.biweight_c,
            config.max_iterations,
            config.tolerance,
        ));
    }
    (values, depth)
}

/// Mean-value chronology of a detrended table.
pub fn build_chronology(rwi: &RingWidthTable, config: &ChronologyConfig) -> Result<Chronology> {
    let years = rwi.years()?;
    let series = rwi.all_series()?;
    let (standard, depth) = yearly_biweight(&series, years.len(), config);

    let residual = if config.residual {
        let (values, _) = yearly_biweight(&prewhiten_all(&series), years.len(), config);
        values
    } else {
        vec![None; years.len()]
    };

    let chronology = Chronology {
        years: years
            .iter()
            .enumerate()
            .map(|(idx, year)| ChronologyYear {
                year: *year,
                value: standard[idx],
                residual: residual[idx],
                sample_depth: depth[idx],
            })
            .collect(),
    };

    info!(
        years = chronology.years.len(),
        series = series.len(),
        "built chronology"
    );
    Ok(chronology)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChronologyStats {
    pub n_series: usize,
    pub n_pairs: usize,
    /// Mean inter-series correlation.
    pub rbar: Option<f64>,
    /// Expressed population signal.
    pub eps: Option<f64>,
}

pub fn expressed_population_signal(n_series: usize, rbar: f64) -> f64 {
    let n = n_series as f64;
    n * rbar / (1.0 + (n - 1.0) * rbar)
}

/// rbar over all series pairs with at least `min_overlap` common years, and
/// the EPS of the full set of series.
pub fn chronology_stats(rwi: &RingWidthTable, min_overlap: usize) -> Result<ChronologyStats> {
    let series = rwi.all_series()?;
    let mut sum = 0.0;
    let mut n_pairs = 0usize;

    for (i, (_, left)) in series.iter().enumerate() {
        for (_, right) in series.iter().skip(i + 1) {
            if let Some(correlation) = correlate(CorrelationMethod::Pearson, left, right) {
                if correlation.n >= min_overlap {
                    sum += correlation.r;
                    n_pairs += 1;
                }
            }
        }
    }

    let rbar = (n_pairs > 0).then(|| sum / n_pairs as f64);
    let eps = rbar.map(|rbar| expressed_population_signal(series.len(), rbar));
    Ok(ChronologyStats {
        n_series: series.len(),
        n_pairs,
        rbar,
        eps,
    })
}
