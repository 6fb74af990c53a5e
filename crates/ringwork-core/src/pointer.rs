use polars::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::config::PointerConfig;
use crate::error::Result;
use ringwork_parser::{RingWidthTable, YEAR_COLUMN};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerKind {
    Negative,
    Positive,
}

impl PointerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PointerKind::Negative => "negative",
            PointerKind::Positive => "positive",
        }
    }
}

/// A year with a consistent growth change across series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PointerYear {
    pub year: i32,
    pub kind: PointerKind,
    /// Series with a growth change defined in this year.
    pub depth: usize,
    /// Percentage of those series at or below `-rgc_threshold`.
    pub share_negative: f64,
    pub share_positive: f64,
}

/// `(w_t - w_{t-1}) / w_{t-1}`; undefined for the first ring, after a gap
/// or when the previous ring has zero width.
pub fn relative_growth_change(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut changes = vec![None; values.len()];
    for idx in 1..values.len() {
        if let (Some(previous), Some(current)) = (values[idx - 1], values[idx]) {
            if previous > 0.0 {
                changes[idx] = Some((current - previous) / previous);
            }
        }
    }
    changes
}

pub fn pointer_years(table: &RingWidthTable, config: &PointerConfig) -> Result<Vec<PointerYear>> {
    let years = table.years()?;
    let changes: Vec<Vec<Option<f64>>> = table
        .all_series()?
        .iter()
        .map(|(_, values)| relative_growth_change(values))
        .collect();

    let mut pointers = Vec::new();
    for (idx, year) in years.iter().enumerate() {
        let present: Vec<f64> = changes
            .iter()
            .filter_map(|series| series.get(idx).copied().flatten())
            .collect();
        let depth = present.len();
        if depth == 0 || depth < config.min_depth {
            continue;
        }

        let share = |count: usize| 100.0 * count as f64 / depth as f64;
        let share_negative = share(
            present
                .iter()
                .filter(|change| **change <= -config.rgc_threshold)
                .count(),
        );
        let share_positive = share(
            present
                .iter()
                .filter(|change| **change >= config.rgc_threshold)
                .count(),
        );

        let kind = if share_negative >= config.series_threshold {
            Some(PointerKind::Negative)
        } else if share_positive >= config.series_threshold {
            Some(PointerKind::Positive)
        } else {
            None
        };
        if let Some(kind) = kind {
            pointers.push(PointerYear {
                year: *year,
                kind,
                depth,
                share_negative,
                share_positive,
            });
        }
    }

    info!(
        negative = pointers.iter().filter(|p| p.kind == PointerKind::Negative).count(),
        positive = pointers.iter().filter(|p| p.kind == PointerKind::Positive).count(),
        "indicator years identified"
    );
    Ok(pointers)
}

pub fn pointer_frame(pointers: &[PointerYear]) -> PolarsResult<DataFrame> {
    df!(
        YEAR_COLUMN => pointers.iter().map(|p| p.year).collect::<Vec<_>>(),
        "kind" => pointers.iter().map(|p| p.kind.as_str()).collect::<Vec<_>>(),
        "depth" => pointers.iter().map(|p| p.depth as u32).collect::<Vec<_>>(),
        "share_negative" => pointers.iter().map(|p| p.share_negative).collect::<Vec<_>>(),
        "share_positive" => pointers.iter().map(|p| p.share_positive).collect::<Vec<_>>(),
    )
}
