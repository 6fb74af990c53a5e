use polars::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::ReleaseConfig;
use crate::error::Result;
use crate::statistics::span;
use ringwork_parser::{RingWidthTable, YEAR_COLUMN};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseClass {
    None = 0,
    Minor = 1,
    Major = 2,
}

impl ReleaseClass {
    pub fn code(self) -> i32 {
        self as i32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReleaseEvent {
    pub year: i32,
    pub class: ReleaseClass,
    /// Peak growth change of the run, as a fraction.
    pub peak_change: f64,
    /// Years in the qualifying run.
    pub run_length: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesReleases {
    pub series_id: String,
    /// `(M2 - M1) / M1` per table year; `None` where the year is not evaluated.
    pub growth_change: Vec<Option<f64>>,
    pub flags: Vec<ReleaseClass>,
    pub events: Vec<ReleaseEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReleaseCountYear {
    pub year: i32,
    pub evaluated: usize,
    pub minor: usize,
    pub major: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReleaseReport {
    pub years: Vec<i32>,
    pub series: Vec<SeriesReleases>,
    pub counts: Vec<ReleaseCountYear>,
}

fn window_mean(values: &[Option<f64>]) -> Option<f64> {
    let mut sum = 0.0;
    for value in values {
        sum += (*value)?;
    }
    (!values.is_empty()).then(|| sum / values.len() as f64)
}

/// Percent growth change (as a fraction) for every year of a series. `M1`
/// averages the `prior` years before `t` and `M2` averages `t` and the
/// `after - 1` years following it. Years near either end of the measured
/// span, windows with gaps, and windows with `M1 <= 0` yield `None`.
pub fn growth_change(values: &[Option<f64>], config: &ReleaseConfig) -> Vec<Option<f64>> {
    let mut changes = vec![None; values.len()];
    let Some((first, last)) = span(values) else {
        return changes;
    };
    let lead = config.prior.max(config.buffer);
    let trail = config.after.max(config.buffer);

    for t in first..=last {
        if t - first < lead || last - t < trail {
            continue;
        }
        let Some(m1) = window_mean(&values[t - config.prior..t]) else {
            continue;
        };
        let Some(m2) = window_mean(&values[t..t + config.after]) else {
            continue;
        };
        if m1 > 0.0 {
            changes[t] = Some((m2 - m1) / m1);
        }
    }
    changes
}

/// Runs of at least `length` consecutive years at or above the minor
/// threshold. Each run yields one event at its peak year.
pub fn detect_releases(
    years: &[i32],
    changes: &[Option<f64>],
    config: &ReleaseConfig,
) -> (Vec<ReleaseClass>, Vec<ReleaseEvent>) {
    let mut flags = vec![ReleaseClass::None; changes.len()];
    let mut events = Vec::new();

    let mut idx = 0;
    while idx < changes.len() {
        if !changes[idx].is_some_and(|change| change >= config.minor) {
            idx += 1;
            continue;
        }
        let start = idx;
        let mut peak = start;
        while idx < changes.len() && changes[idx].is_some_and(|change| change >= config.minor) {
            if changes[idx] > changes[peak] {
                peak = idx;
            }
            idx += 1;
        }

        let run_length = idx - start;
        if run_length < config.length {
            continue;
        }
        let peak_change = changes[peak].unwrap_or_default();
        let class = if peak_change >= config.major {
            ReleaseClass::Major
        } else {
            ReleaseClass::Minor
        };
        flags[peak] = class;
        events.push(ReleaseEvent {
            year: years[peak],
            class,
            peak_change,
            run_length,
        });
    }

    (flags, events)
}

pub fn detect_table_releases(
    table: &RingWidthTable,
    config: &ReleaseConfig,
) -> Result<ReleaseReport> {
    let years = table.years()?;
    let mut series = Vec::with_capacity(table.series_count());
    let mut counts: Vec<ReleaseCountYear> = years
        .iter()
        .map(|&year| ReleaseCountYear {
            year,
            evaluated: 0,
            minor: 0,
            major: 0,
        })
        .collect();

    for (series_id, values) in table.all_series()? {
        let changes = growth_change(&values, config);
        let (flags, events) = detect_releases(&years, &changes, config);

        for (idx, count) in counts.iter_mut().enumerate() {
            if changes[idx].is_some() {
                count.evaluated += 1;
            }
            match flags[idx] {
                ReleaseClass::Minor => count.minor += 1,
                ReleaseClass::Major => count.major += 1,
                ReleaseClass::None => {}
            }
        }
        debug!(series = %series_id, events = events.len(), "release detection done");
        series.push(SeriesReleases {
            series_id,
            growth_change: changes,
            flags,
            events,
        });
    }

    let total: usize = series.iter().map(|s| s.events.len()).sum();
    info!(series = series.len(), events = total, "growth releases detected");
    Ok(ReleaseReport {
        years,
        series,
        counts,
    })
}

impl ReleaseReport {
    pub fn events(&self) -> impl Iterator<Item = (&str, &ReleaseEvent)> {
        self.series.iter().flat_map(|series| {
            series
                .events
                .iter()
                .map(move |event| (series.series_id.as_str(), event))
        })
    }

    /// Year column plus one 0/1/2 flag column per series.
    pub fn flags_frame(&self) -> PolarsResult<DataFrame> {
        let mut columns: Vec<Column> =
            vec![Series::new(YEAR_COLUMN.into(), self.years.clone()).into()];
        for series in &self.series {
            let codes: Vec<i32> = series.flags.iter().map(|flag| flag.code()).collect();
            columns.push(Series::new(series.series_id.as_str().into(), codes).into());
        }
        DataFrame::new(columns)
    }

    pub fn counts_frame(&self) -> PolarsResult<DataFrame> {
        df!(
            YEAR_COLUMN => self.counts.iter().map(|c| c.year).collect::<Vec<_>>(),
            "evaluated" => self.counts.iter().map(|c| c.evaluated as u32).collect::<Vec<_>>(),
            "minor" => self.counts.iter().map(|c| c.minor as u32).collect::<Vec<_>>(),
            "major" => self.counts.iter().map(|c| c.major as u32).collect::<Vec<_>>(),
            "total" => self
                .counts
                .iter()
                .map(|c| (c.minor + c.major) as u32)
                .collect::<Vec<_>>(),
        )
    }

    pub fn events_frame(&self) -> PolarsResult<DataFrame> {
        let events: Vec<_> = self.events().collect();
        df!(
            "series" => events.iter().map(|(id, _)| *id).collect::<Vec<_>>(),
            YEAR_COLUMN => events.iter().map(|(_, e)| e.year).collect::<Vec<_>>(),
            "class" => events.iter().map(|(_, e)| e.class.code()).collect::<Vec<_>>(),
            "peak_change" => events.iter().map(|(_, e)| e.peak_change).collect::<Vec<_>>(),
            "run_length" => events.iter().map(|(_, e)| e.run_length as u32).collect::<Vec<_>>(),
        )
    }

    /// Plot data for one series: widths, growth change and flag per year.
    pub fn series_frame(
        &self,
        table: &RingWidthTable,
        series_id: &str,
    ) -> Result<Option<DataFrame>> {
        let Some(series) = self.series.iter().find(|s| s.series_id == series_id) else {
            return Ok(None);
        };
        let widths = table.series(series_id)?;
        let frame = df!(
            YEAR_COLUMN => self.years.clone(),
            "width" => widths,
            "growth_change" => series.growth_change.clone(),
            "flag" => series.flags.iter().map(|flag| flag.code()).collect::<Vec<_>>(),
        )?;
        Ok(Some(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(before: usize, level_before: f64, after: usize, level_after: f64) -> Vec<Option<f64>> {
        std::iter::repeat(Some(level_before))
            .take(before)
            .chain(std::iter::repeat(Some(level_after)).take(after))
            .collect()
    }

    #[test]
    fn flat_series_has_zero_change() {
        let values = vec![Some(1.0); 40];
        let changes = growth_change(&values, &ReleaseConfig::default());
        assert!(changes[..10].iter().all(Option::is_none));
        assert!(changes[10..=29].iter().all(|c| c.map(|v| v.abs() < 1e-12).unwrap()));
        assert!(changes[30..].iter().all(Option::is_none));
    }

    #[test]
    fn peak_year_is_onset_of_the_step() {
        let values = step(20, 1.0, 20, 1.3);
        let changes = growth_change(&values, &ReleaseConfig::default());
        assert!((changes[20].unwrap() - 0.3).abs() < 1e-9);
        assert!((changes[19].unwrap() - 0.27).abs() < 1e-9);
        assert!(changes[18].unwrap() < 0.25);
    }

    #[test]
    fn short_runs_are_ignored() {
        let config = ReleaseConfig {
            length: 4,
            ..ReleaseConfig::default()
        };
        let years: Vec<i32> = (1900..1940).collect();
        let values = step(20, 1.0, 20, 1.3);
        let changes = growth_change(&values, &config);
        let (flags, events) = detect_releases(&years, &changes, &config);
        assert!(events.is_empty());
        assert!(flags.iter().all(|flag| *flag == ReleaseClass::None));
    }

    #[test]
    fn gaps_break_the_window() {
        let mut values = step(20, 1.0, 20, 1.3);
        values[15] = None;
        let changes = growth_change(&values, &ReleaseConfig::default());
        // every window covering index 15
        assert!(changes[15..=25].iter().all(Option::is_none));
        assert!(changes[26].is_some());
    }
}
