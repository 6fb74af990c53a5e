use polars::prelude::*;
use ringwork_core::config::ReleaseConfig;
use ringwork_core::release::{detect_table_releases, growth_change, ReleaseClass};
use ringwork_core::RingWidthTable;

fn step(before: usize, level_before: f64, after: usize, level_after: f64) -> Vec<Option<f64>> {
    std::iter::repeat(Some(level_before))
        .take(before)
        .chain(std::iter::repeat(Some(level_after)).take(after))
        .collect()
}

fn table(series: Vec<(&str, Vec<Option<f64>>)>) -> RingWidthTable {
    let n_years = series[0].1.len() as i32;
    RingWidthTable::from_columns(
        (1900..1900 + n_years).collect(),
        series
            .into_iter()
            .map(|(id, values)| (id.to_string(), values))
            .collect(),
    )
    .unwrap()
}

#[test]
fn thirty_percent_step_is_a_minor_release() {
    let table = table(vec![("T1", step(20, 1.0, 20, 1.3))]);
    let report = detect_table_releases(&table, &ReleaseConfig::default()).unwrap();

    let series = &report.series[0];
    assert_eq!(series.events.len(), 1);
    let event = series.events[0];
    assert_eq!(event.class, ReleaseClass::Minor);
    assert_eq!(event.year, 1920);
    assert!((event.peak_change - 0.3).abs() < 1e-9);
    assert_eq!(event.run_length, 3);
    assert_eq!(series.flags[20], ReleaseClass::Minor);
    assert_eq!(
        series.flags.iter().filter(|f| **f != ReleaseClass::None).count(),
        1
    );
}

#[test]
fn doubling_is_a_major_release() {
    let table = table(vec![("T1", step(25, 0.8, 25, 1.6))]);
    let report = detect_table_releases(&table, &ReleaseConfig::default()).unwrap();

    let events = &report.series[0].events;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].class, ReleaseClass::Major);
    assert_eq!(events[0].year, 1925);
    assert!((events[0].peak_change - 1.0).abs() < 1e-9);
}

#[test]
fn no_flags_within_the_edge_buffer() {
    // the jump at year 37 sits inside the trailing buffer
    let mut values = vec![Some(1.0); 40];
    for value in values.iter_mut().skip(37) {
        *value = Some(3.0);
    }
    let config = ReleaseConfig::default();
    let changes = growth_change(&values, &config);
    assert!(changes[..10].iter().all(Option::is_none));
    assert!(changes[30..].iter().all(Option::is_none));
    assert!(changes[29].unwrap() > config.minor);

    let table = table(vec![("EDGE", values)]);
    let report = detect_table_releases(&table, &config).unwrap();
    let series = &report.series[0];
    assert!(series.events.is_empty());
    assert!(series.flags.iter().all(|f| *f == ReleaseClass::None));
}

#[test]
fn buffer_follows_each_series_span() {
    let mut late = vec![None; 15];
    late.extend(step(20, 1.0, 20, 1.3));
    let table = table(vec![("LATE", late), ("FULL", vec![Some(1.0); 55])]);
    let report = detect_table_releases(&table, &ReleaseConfig::default()).unwrap();

    let late = &report.series[0];
    assert!(late.growth_change[..25].iter().all(Option::is_none));
    assert_eq!(late.events[0].year, 1935);

    let counts = &report.counts;
    assert_eq!(counts[10].evaluated, 1);
    assert_eq!(counts[25].evaluated, 2);
    assert_eq!(counts[35].minor, 1);
    assert_eq!(counts[35].major, 0);
}

#[test]
fn frames_cover_every_series() -> PolarsResult<()> {
    let table = table(vec![
        ("A", step(20, 1.0, 20, 1.3)),
        ("B", step(20, 1.0, 20, 2.0)),
    ]);
    let report = detect_table_releases(&table, &ReleaseConfig::default()).unwrap();

    let flags = report.flags_frame()?;
    assert_eq!(flags.width(), 3);
    assert_eq!(flags.column("B")?.i32()?.get(20), Some(2));

    let counts = report.counts_frame()?;
    let total = counts.column("total")?.u32()?;
    assert_eq!(total.get(20), Some(2));

    let events = report.events_frame()?;
    assert_eq!(events.height(), 2);

    let single = report.series_frame(&table, "A").unwrap().unwrap();
    assert_eq!(single.height(), 40);
    assert!(report.series_frame(&table, "missing").unwrap().is_none());
    Ok(())
}
