mod common;

use polars::prelude::*;
use ringwork_core::detrend::{
    detrend_series, detrend_table, fit_curve, fits_frame, DetrendMethod, GrowthCurve,
};
use ringwork_core::statistics::mean;
use ringwork_core::RingWidthTable;

use common::synthetic_table;

fn present(values: &[Option<f64>]) -> Vec<f64> {
    values.iter().flatten().copied().collect()
}

#[test]
fn negative_exponential_recovers_exact_curve() {
    let values: Vec<Option<f64>> = (0..100)
        .map(|t| Some(2.0 * (-0.05 * t as f64).exp() + 0.5))
        .collect();
    let (curve, _, rwi) = detrend_series(&values, DetrendMethod::NegativeExponential);

    let Some(GrowthCurve::NegativeExponential { a, b, k }) = curve else {
        panic!("expected a negative exponential, got {curve:?}");
    };
    assert!((a - 2.0).abs() < 1e-3);
    assert!((b - 0.05).abs() < 1e-4);
    assert!((k - 0.5).abs() < 1e-3);
    assert!(rwi.iter().all(|v| (v.unwrap() - 1.0).abs() < 1e-3));
}

#[test]
fn negative_exponential_indices_average_near_one() {
    let table = synthetic_table(6, 200, 21);
    let outcome = detrend_table(&table, DetrendMethod::NegativeExponential).unwrap();

    assert_eq!(outcome.rwi.series_count(), 6);
    assert_eq!(outcome.rwi.n_years(), 200);
    for (series_id, values) in outcome.rwi.all_series().unwrap() {
        let m = mean(&present(&values)).unwrap();
        assert!((m - 1.0).abs() < 0.05, "{series_id}: mean rwi {m}");
    }
    assert!(outcome.fits.iter().all(|fit| !fit.fell_back()));
}

#[test]
fn increasing_series_falls_back_to_mean() {
    let values: Vec<Option<f64>> = (0..50).map(|t| Some(0.5 + 0.01 * t as f64)).collect();
    let curve = fit_curve(&values, DetrendMethod::NegativeExponential).unwrap();
    assert_eq!(curve.method(), DetrendMethod::Mean);

    let table = RingWidthTable::from_columns((1900..1950).collect(), vec![("UP".to_string(), values)])
        .unwrap();
    let outcome = detrend_table(&table, DetrendMethod::NegativeExponential).unwrap();
    assert!(outcome.fits[0].fell_back());
}

#[test]
fn linear_fit_on_declining_line() {
    let values: Vec<Option<f64>> = (0..40).map(|t| Some(2.0 - 0.01 * t as f64)).collect();
    let (curve, fitted, rwi) = detrend_series(&values, DetrendMethod::Linear);

    let Some(GrowthCurve::Linear { intercept, slope }) = curve else {
        panic!("expected a line, got {curve:?}");
    };
    assert!((intercept - 2.0).abs() < 1e-9);
    assert!((slope + 0.01).abs() < 1e-9);
    assert!((fitted[39].unwrap() - 1.61).abs() < 1e-9);
    assert!(rwi.iter().all(|v| (v.unwrap() - 1.0).abs() < 1e-9));
}

#[test]
fn missing_rings_keep_their_gaps() {
    let mut values: Vec<Option<f64>> = vec![None, None];
    values.extend((0..30).map(|t| Some(1.5 - 0.02 * t as f64)));
    values[10] = None;
    let (_, fitted, rwi) = detrend_series(&values, DetrendMethod::Linear);

    assert!(rwi[0].is_none() && rwi[1].is_none() && rwi[10].is_none());
    assert!(fitted[10].is_none());
    // time runs from the first measured ring
    assert!((fitted[2].unwrap() - 1.5).abs() < 1e-9);
}

#[test]
fn fits_frame_describes_each_curve() -> PolarsResult<()> {
    let table = synthetic_table(3, 80, 5);
    let outcome = detrend_table(&table, DetrendMethod::NegativeExponential).unwrap();
    let df = fits_frame(&outcome.fits)?;

    assert_eq!(df.height(), 3);
    let curves = df.column("curve")?.str()?;
    assert_eq!(curves.get(0), Some("negative_exponential"));
    Ok(())
}
