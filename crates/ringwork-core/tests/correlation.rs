mod common;

use ringwork_core::config::CorrelationConfig;
use ringwork_core::correlation::{correlate_and_filter, filter_series, series_correlations};
use ringwork_core::statistics::CorrelationMethod;
use ringwork_core::RingWidthTable;

use common::{synthetic_series, years};

fn table_with_noise_series() -> RingWidthTable {
    RingWidthTable::from_columns(years(200), synthetic_series(9, 200, 7, &[8])).unwrap()
}

#[test]
fn correlations_lie_in_unit_interval() {
    let table = table_with_noise_series();
    for method in [
        CorrelationMethod::Pearson,
        CorrelationMethod::Spearman,
        CorrelationMethod::Kendall,
    ] {
        for prewhiten in [true, false] {
            let correlations = series_correlations(&table, method, prewhiten).unwrap();
            assert_eq!(correlations.len(), 9);
            for correlation in correlations {
                let r = correlation.r.unwrap();
                assert!((-1.0..=1.0).contains(&r), "{method:?}: r = {r}");
                let p = correlation.p_value.unwrap();
                assert!((0.0..=1.0).contains(&p));
            }
        }
    }
}

#[test]
fn unrelated_series_is_removed() {
    let table = table_with_noise_series();
    let (correlations, outcome) =
        correlate_and_filter(&table, &CorrelationConfig::default()).unwrap();

    assert_eq!(outcome.removed, vec!["S08".to_string()]);
    assert_eq!(outcome.table.series_count(), 8);
    assert!(!outcome.table.contains_series("S08"));

    let noise = correlations.iter().find(|c| c.series_id == "S08").unwrap();
    assert!(noise.r.unwrap() < 0.3);
    assert!(correlations
        .iter()
        .filter(|c| c.series_id != "S08")
        .all(|c| c.r.unwrap() > 0.8));
}

#[test]
fn undefined_correlation_removes_series() {
    let mut series = synthetic_series(4, 60, 3, &[]);
    // no overlap with anything else
    series.push(("LONE".to_string(), vec![None; 60]));
    let table = RingWidthTable::from_columns(years(60), series).unwrap();

    let correlations = series_correlations(&table, CorrelationMethod::Spearman, false).unwrap();
    let lone = correlations.iter().find(|c| c.series_id == "LONE").unwrap();
    assert!(lone.r.is_none());
    assert_eq!(lone.overlap, 0);

    let outcome = filter_series(&table, &correlations, 0.3).unwrap();
    assert_eq!(outcome.removed, vec!["LONE".to_string()]);
}
