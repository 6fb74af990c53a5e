use polars::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::chronology::Chronology;
use crate::statistics::{correlate, z_scores, CorrelationMethod};
use ringwork_parser::{ClimateIndex, YEAR_COLUMN};

const METHODS: [CorrelationMethod; 2] = [CorrelationMethod::Pearson, CorrelationMethod::Spearman];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClimateCorrelation {
    pub index: String,
    /// Years the index leads the chronology by.
    pub lag: usize,
    pub method: CorrelationMethod,
    pub r: Option<f64>,
    pub p_value: Option<f64>,
    pub n: usize,
}

/// Index values aligned to the chronology years, shifted back by `lag`.
pub fn aligned_index(chronology: &Chronology, index: &ClimateIndex, lag: usize) -> Vec<Option<f64>> {
    chronology
        .year_axis()
        .iter()
        .map(|year| index.value(year - lag as i32))
        .collect()
}

/// Correlates the chronology with every index at lags `0..=max_lag`, once
/// with Pearson and once with Spearman.
pub fn climate_correlations(
    chronology: &Chronology,
    indices: &[ClimateIndex],
    max_lag: usize,
) -> Vec<ClimateCorrelation> {
    let values = chronology.values();
    let mut results = Vec::new();

    for index in indices {
        for lag in 0..=max_lag {
            let aligned = aligned_index(chronology, index, lag);
            for method in METHODS {
                let correlation = correlate(method, &values, &aligned);
                if correlation.is_none() && lag == 0 {
                    warn!(
                        index = %index.name,
                        method = method.as_str(),
                        "chronology and index have too few common years"
                    );
                }
                results.push(ClimateCorrelation {
                    index: index.name.clone(),
                    lag,
                    method,
                    r: correlation.map(|c| c.r),
                    p_value: correlation.map(|c| c.p_value),
                    n: correlation.map(|c| c.n).unwrap_or(0),
                });
            }
        }
    }

    info!(indices = indices.len(), max_lag, "climate correlations computed");
    results
}

pub fn climate_frame(correlations: &[ClimateCorrelation]) -> PolarsResult<DataFrame> {
    df!(
        "index" => correlations.iter().map(|c| c.index.as_str()).collect::<Vec<_>>(),
        "lag" => correlations.iter().map(|c| c.lag as u32).collect::<Vec<_>>(),
        "method" => correlations.iter().map(|c| c.method.as_str()).collect::<Vec<_>>(),
        "r" => correlations.iter().map(|c| c.r).collect::<Vec<_>>(),
        "p_value" => correlations.iter().map(|c| c.p_value).collect::<Vec<_>>(),
        "n" => correlations.iter().map(|c| c.n as u32).collect::<Vec<_>>(),
    )
}

/// Year table for plotting the chronology against each index: raw values
/// and z-scores side by side.
pub fn combined_table(
    chronology: &Chronology,
    smoothed: &[Option<f64>],
    indices: &[ClimateIndex],
) -> PolarsResult<DataFrame> {
    let values = chronology.values();
    let mut columns: Vec<Column> = vec![
        Series::new(YEAR_COLUMN.into(), chronology.year_axis()).into(),
        Series::new("chronology".into(), values.clone()).into(),
        Series::new("smoothed".into(), smoothed.to_vec()).into(),
        Series::new("chronology_z".into(), z_scores(&values)).into(),
    ];
    for index in indices {
        let aligned = aligned_index(chronology, index, 0);
        let z = z_scores(&aligned);
        columns.push(Series::new(index.name.as_str().into(), aligned).into());
        columns.push(Series::new(format!("{}_z", index.name).into(), z).into());
    }
    DataFrame::new(columns)
}

/// The `n` years with the lowest index values, driest first.
pub fn driest_years(index: &ClimateIndex, n: usize) -> Vec<(i32, f64)> {
    let mut years: Vec<(i32, f64)> = index
        .values
        .iter()
        .filter_map(|(year, value)| value.map(|v| (*year, v)))
        .collect();
    years.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
    years.truncate(n);
    years
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chronology::ChronologyYear;

    fn chronology(first: i32, values: &[f64]) -> Chronology {
        Chronology {
            years: values
                .iter()
                .enumerate()
                .map(|(idx, value)| ChronologyYear {
                    year: first + idx as i32,
                    value: Some(*value),
                    residual: None,
                    sample_depth: 5,
                })
                .collect(),
        }
    }

    fn index(name: &str, first: i32, values: &[f64]) -> ClimateIndex {
        let mut index = ClimateIndex::new(name);
        for (idx, value) in values.iter().enumerate() {
            index.values.insert(first + idx as i32, Some(*value));
        }
        index
    }

    #[test]
    fn lag_one_pairs_with_previous_year() {
        let chron = chronology(2000, &[1.0, 2.0, 3.0]);
        let pdsi = index("PDSI", 1999, &[10.0, 20.0, 30.0, 40.0]);
        assert_eq!(
            aligned_index(&chron, &pdsi, 1),
            vec![Some(10.0), Some(20.0), Some(30.0)]
        );
        assert_eq!(
            aligned_index(&chron, &pdsi, 0),
            vec![Some(20.0), Some(30.0), Some(40.0)]
        );
    }

    #[test]
    fn reports_both_methods_per_lag() {
        let chron = chronology(2000, &[0.8, 1.1, 0.9, 1.3, 1.0, 0.7, 1.2]);
        let pdsi = index("PDSI", 1999, &[0.0, -2.0, 1.0, -1.0, 3.0, 0.5, -3.0, 2.0]);
        let results = climate_correlations(&chron, &[pdsi], 1);
        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|c| c.r.map(|r| r.abs() <= 1.0).unwrap_or(false)));
        assert_eq!(results[0].method, CorrelationMethod::Pearson);
        assert_eq!(results[1].method, CorrelationMethod::Spearman);
        assert_eq!(results[2].lag, 1);
        assert!(results[0].r.unwrap() > 0.9);
    }

    #[test]
    fn driest_years_are_sorted_ascending() {
        let pdsi = index("PDSI", 1990, &[0.5, -3.0, 1.0, -4.5, -1.0]);
        assert_eq!(driest_years(&pdsi, 2), vec![(1993, -4.5), (1991, -3.0)]);
    }
}
