use polars::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::CrossdateConfig;
use crate::correlation::leave_one_out_master;
use crate::error::{AnalysisError, Result};
use crate::prewhiten::prewhiten_all;
use crate::statistics::{correlate, critical_correlation, span, Correlation};
use ringwork_parser::RingWidthTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentStatus {
    Adequate,
    Flagged,
    /// The series does not span the whole segment.
    NotEvaluated,
}

impl SegmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentStatus::Adequate => "adequate",
            SegmentStatus::Flagged => "flagged",
            SegmentStatus::NotEvaluated => "not_evaluated",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Segment {
    pub start: i32,
    pub end: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentResult {
    pub segment: Segment,
    pub r: Option<f64>,
    pub critical_r: Option<f64>,
    pub status: SegmentStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSegments {
    pub series_id: String,
    pub overall: Option<Correlation>,
    pub segments: Vec<SegmentResult>,
}

impl SeriesSegments {
    pub fn flagged(&self) -> impl Iterator<Item = &SegmentResult> {
        self.segments
            .iter()
            .filter(|segment| segment.status == SegmentStatus::Flagged)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossdateReport {
    pub seg_length: usize,
    pub segments: Vec<Segment>,
    pub series: Vec<SeriesSegments>,
}

/// Segments of `seg_length` years lagged by half a segment. The first starts
/// at the first multiple of `bin_floor` at or after `first_year` (or at
/// `first_year` when `bin_floor` is zero); the last ends at or before
/// `last_year`.
pub fn segment_layout(
    first_year: i32,
    last_year: i32,
    seg_length: usize,
    bin_floor: i32,
) -> Vec<Segment> {
    if seg_length < 2 {
        return Vec::new();
    }
    let start = if bin_floor > 0 {
        first_year.div_euclid(bin_floor) * bin_floor
            + if first_year.rem_euclid(bin_floor) == 0 { 0 } else { bin_floor }
    } else {
        first_year
    };
    let length = seg_length as i32;
    let lag = (seg_length / 2) as i32;

    let mut segments = Vec::new();
    let mut segment_start = start;
    while segment_start + length - 1 <= last_year {
        segments.push(Segment {
            start: segment_start,
            end: segment_start + length - 1,
        });
        segment_start += lag;
    }
    segments
}

/// Correlates each series with the composite of the other series in
/// overlapping windows and flags windows below the critical correlation.
pub fn crossdate_segments(
    table: &RingWidthTable,
    config: &CrossdateConfig,
) -> Result<CrossdateReport> {
    let years = table.years()?;
    let (Some(&first_year), Some(&last_year)) = (years.first(), years.last()) else {
        return Err(AnalysisError::InsufficientData(
            "ring-width table has no years".to_string(),
        ));
    };
    let segments = segment_layout(first_year, last_year, config.seg_length, config.bin_floor);
    if segments.is_empty() {
        warn!(
            first_year,
            last_year,
            seg_length = config.seg_length,
            "table is shorter than one crossdating segment"
        );
    }

    let raw = table.all_series()?;
    let series = if config.prewhiten { prewhiten_all(&raw) } else { raw };
    let n_years = years.len();

    let mut results = Vec::with_capacity(series.len());
    for (idx, (series_id, values)) in series.iter().enumerate() {
        let master = leave_one_out_master(&series, idx, n_years);
        let overall = correlate(config.method, values, &master);
        // coverage comes from the measured widths, not the prewhitened values
        let measured = span(&table.series(series_id)?);

        let mut segment_results = Vec::with_capacity(segments.len());
        for segment in &segments {
            let lo = (segment.start - first_year) as usize;
            let hi = (segment.end - first_year) as usize;
            let covered = matches!(measured, Some((first, last)) if first <= lo && last >= hi);
            if !covered {
                segment_results.push(SegmentResult {
                    segment: *segment,
                    r: None,
                    critical_r: None,
                    status: SegmentStatus::NotEvaluated,
                });
                continue;
            }

            let correlation = correlate(config.method, &values[lo..=hi], &master[lo..=hi]);
            let critical_r = correlation.and_then(|c| critical_correlation(c.n, config.pcrit));
            let status = match (correlation, critical_r) {
                (Some(c), Some(critical)) if c.r >= critical => SegmentStatus::Adequate,
                _ => SegmentStatus::Flagged,
            };
            segment_results.push(SegmentResult {
                segment: *segment,
                r: correlation.map(|c| c.r),
                critical_r,
                status,
            });
        }

        let entry = SeriesSegments {
            series_id: series_id.clone(),
            overall,
            segments: segment_results,
        };
        let flagged = entry.flagged().count();
        if flagged > 0 {
            info!(series = %series_id, flagged, "series has flagged crossdating segments");
        }
        results.push(entry);
    }

    Ok(CrossdateReport {
        seg_length: config.seg_length,
        segments,
        series: results,
    })
}

impl CrossdateReport {
    /// Long format: one row per series and segment.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let rows = self.series.iter().flat_map(|series| {
            series
                .segments
                .iter()
                .map(move |segment| (series.series_id.as_str(), segment))
        });

        let mut ids = Vec::new();
        let mut starts = Vec::new();
        let mut ends = Vec::new();
        let mut rs = Vec::new();
        let mut critical = Vec::new();
        let mut statuses = Vec::new();
        for (id, segment) in rows {
            ids.push(id);
            starts.push(segment.segment.start);
            ends.push(segment.segment.end);
            rs.push(segment.r);
            critical.push(segment.critical_r);
            statuses.push(segment.status.as_str());
        }

        df!(
            "series" => ids,
            "segment_start" => starts,
            "segment_end" => ends,
            "r" => rs,
            "critical_r" => critical,
            "status" => statuses,
        )
    }
}
