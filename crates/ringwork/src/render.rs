use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table};
use ringwork_core::chronology::ChronologyStats;
use ringwork_core::climate::ClimateCorrelation;
use ringwork_core::correlation::SeriesCorrelation;
use ringwork_core::crossdate::{CrossdateReport, SegmentStatus};
use ringwork_core::pipeline::ExtremeYears;
use ringwork_core::release::ReleaseReport;
use ringwork_core::series_stats::SeriesStats;

fn new_table<T: Into<Cell>>(header: Vec<T>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn number(value: Option<f64>, digits: usize) -> Cell {
    let text = value
        .map(|v| format!("{v:.digits$}"))
        .unwrap_or_else(|| "-".to_string());
    Cell::new(text).set_alignment(CellAlignment::Right)
}

fn count(value: usize) -> Cell {
    Cell::new(value).set_alignment(CellAlignment::Right)
}

pub fn correlations(
    correlations: &[SeriesCorrelation],
    removed: &[String],
    threshold: f64,
) -> Table {
    let mut table = new_table(vec!["series", "r", "p", "overlap", "status"]);
    for correlation in correlations {
        let status = if removed.contains(&correlation.series_id) {
            Cell::new(format!("removed (< {threshold})")).fg(Color::Red)
        } else {
            Cell::new("kept")
        };
        table.add_row(vec![
            Cell::new(&correlation.series_id),
            number(correlation.r, 3),
            number(correlation.p_value, 4),
            count(correlation.overlap),
            status,
        ]);
    }
    table
}

/// Series by segment grid of correlations; flagged cells in red.
pub fn crossdate(report: &CrossdateReport) -> Table {
    let mut header = vec!["series".to_string()];
    header.extend(
        report
            .segments
            .iter()
            .map(|segment| format!("{}-{}", segment.start, segment.end)),
    );
    let mut table = new_table(header);
    for series in &report.series {
        let mut row = vec![Cell::new(&series.series_id)];
        for segment in &series.segments {
            let cell = match segment.status {
                SegmentStatus::NotEvaluated => Cell::new(""),
                SegmentStatus::Adequate => number(segment.r, 2),
                SegmentStatus::Flagged => number(segment.r, 2).fg(Color::Red),
            };
            row.push(cell);
        }
        table.add_row(row);
    }
    table
}

/// Years in which at least one series released.
pub fn release_counts(report: &ReleaseReport) -> Table {
    let mut table = new_table(vec!["year", "evaluated", "minor", "major"]);
    for year in report.counts.iter().filter(|c| c.minor + c.major > 0) {
        table.add_row(vec![
            Cell::new(year.year),
            count(year.evaluated),
            count(year.minor),
            count(year.major),
        ]);
    }
    table
}

pub fn series_stats(stats: &[SeriesStats]) -> Table {
    let mut table = new_table(vec![
        "series", "first", "last", "rings", "mean", "median", "sd", "ar1", "ms",
    ]);
    for s in stats {
        table.add_row(vec![
            Cell::new(&s.series_id),
            Cell::new(s.first_year.map(|y| y.to_string()).unwrap_or_default()),
            Cell::new(s.last_year.map(|y| y.to_string()).unwrap_or_default()),
            count(s.n_rings),
            number(s.mean, 3),
            number(s.median, 3),
            number(s.sd, 3),
            number(s.ar1, 3),
            number(s.mean_sensitivity, 3),
        ]);
    }
    table
}

pub fn climate(correlations: &[ClimateCorrelation]) -> Table {
    let mut table = new_table(vec!["index", "lag", "method", "r", "p", "n"]);
    for c in correlations {
        table.add_row(vec![
            Cell::new(&c.index),
            count(c.lag),
            Cell::new(c.method.as_str()),
            number(c.r, 3),
            number(c.p_value, 4),
            count(c.n),
        ]);
    }
    table
}

pub fn chronology_stats(stats: &ChronologyStats) -> Table {
    let mut table = new_table(vec!["series", "pairs", "rbar", "EPS"]);
    table.add_row(vec![
        count(stats.n_series),
        count(stats.n_pairs),
        number(stats.rbar, 3),
        number(stats.eps, 3),
    ]);
    table
}

pub fn extremes(extremes: &[ExtremeYears]) -> Table {
    let mut table = new_table(vec!["index", "year", "value", "negative pointer"]);
    for index in extremes {
        for year in &index.years {
            table.add_row(vec![
                Cell::new(&index.index),
                Cell::new(year.year),
                number(Some(year.value), 2),
                Cell::new(if year.negative_pointer { "yes" } else { "" }),
            ]);
        }
    }
    table
}
