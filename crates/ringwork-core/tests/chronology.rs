mod common;

use ringwork_core::chronology::{
    build_chronology, chronology_stats, expressed_population_signal, tukey_biweight_mean,
};
use ringwork_core::config::ChronologyConfig;
use ringwork_core::detrend::{detrend_table, DetrendMethod};
use ringwork_core::RingWidthTable;

use common::synthetic_table;

#[test]
fn biweight_ignores_outliers() {
    let location = tukey_biweight_mean(&[1.0, 1.0, 1.0, 10.0], 9.0, 20, 1e-6).unwrap();
    assert!((location - 1.0).abs() < 1e-9);

    let location =
        tukey_biweight_mean(&[0.9, 1.0, 1.1, 1.05, 0.95, 6.0], 9.0, 20, 1e-6).unwrap();
    assert!((location - 1.0).abs() < 0.05);

    assert!(tukey_biweight_mean(&[], 9.0, 20, 1e-6).is_none());
    assert_eq!(tukey_biweight_mean(&[1.7], 9.0, 20, 1e-6), Some(1.7));
}

#[test]
fn year_without_series_is_absent() {
    let table = RingWidthTable::from_columns(
        vec![2000, 2001, 2002],
        vec![
            ("A".to_string(), vec![Some(1.0), None, Some(1.2)]),
            ("B".to_string(), vec![Some(0.8), None, Some(1.0)]),
        ],
    )
    .unwrap();
    let chronology = build_chronology(&table, &ChronologyConfig::default()).unwrap();

    assert_eq!(chronology.years[1].sample_depth, 0);
    assert_eq!(chronology.years[1].value, None);
    assert_eq!(chronology.value(2001), None);
    assert_eq!(chronology.years[0].sample_depth, 2);
    assert!(chronology.value(2000).is_some());
    assert_eq!(chronology.value(1999), None);
}

#[test]
fn removing_a_series_lowers_sample_depth_where_it_had_data() {
    let mut series = common::synthetic_series(5, 100, 17, &[]);
    for value in series[2].1.iter_mut().take(30) {
        *value = None;
    }
    let table = RingWidthTable::from_columns(common::years(100), series).unwrap();
    let config = ChronologyConfig::default();

    let full = build_chronology(&table, &config).unwrap();
    let reduced = build_chronology(&table.drop_series("S02").unwrap(), &config).unwrap();
    for (before, after) in full.years.iter().zip(reduced.years.iter()) {
        let had_data = before.year >= common::FIRST_YEAR + 30;
        let expected = if had_data {
            before.sample_depth - 1
        } else {
            before.sample_depth
        };
        assert_eq!(after.sample_depth, expected, "year {}", before.year);
    }
}

#[test]
fn chronology_of_indices_centres_on_one() {
    let table = synthetic_table(8, 150, 9);
    let rwi = detrend_table(&table, DetrendMethod::NegativeExponential)
        .unwrap()
        .rwi;
    let chronology = build_chronology(&rwi, &ChronologyConfig::default()).unwrap();

    let values: Vec<f64> = chronology.values().into_iter().flatten().collect();
    assert_eq!(values.len(), 150);
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    assert!((mean - 1.0).abs() < 0.05);
    // the residual chronology loses the AR warm-up years at most
    assert!(chronology.years.iter().skip(20).all(|y| y.residual.is_some()));

    let df = chronology.to_dataframe(None).unwrap();
    assert_eq!(df.height(), 150);
    assert_eq!(df.width(), 4);
}

#[test]
fn common_signal_gives_high_rbar_and_eps() {
    let table = synthetic_table(8, 150, 9);
    let rwi = detrend_table(&table, DetrendMethod::NegativeExponential)
        .unwrap()
        .rwi;
    let stats = chronology_stats(&rwi, 30).unwrap();

    assert_eq!(stats.n_series, 8);
    assert_eq!(stats.n_pairs, 28);
    assert!(stats.rbar.unwrap() > 0.6);
    assert!(stats.eps.unwrap() > 0.85);
    assert!((expressed_population_signal(8, 0.5) - 8.0 * 0.5 / 4.5).abs() < 1e-12);
}
