use serde::Serialize;
use tracing::info;

use crate::chronology::{build_chronology, chronology_stats, Chronology, ChronologyStats};
use crate::climate::{climate_correlations, driest_years, ClimateCorrelation};
use crate::config::AnalysisConfig;
use crate::correlation::{correlate_and_filter, SeriesCorrelation};
use crate::crossdate::{crossdate_segments, CrossdateReport};
use crate::detrend::{detrend_table, DetrendFit};
use crate::error::{AnalysisError, Result};
use crate::ingestion::LoadedInputs;
use crate::pointer::{pointer_years, PointerKind, PointerYear};
use crate::release::{detect_table_releases, ReleaseReport};
use crate::series_stats::{series_stats, SeriesStats};
use crate::sites::{summarize_sites, SiteSummary};
use crate::smoothing::hanning_smooth;
use ringwork_parser::RingWidthTable;

/// Lowest years of one index, each marked when it is also a negative
/// indicator year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtremeYears {
    pub index: String,
    pub years: Vec<ExtremeYear>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExtremeYear {
    pub year: i32,
    pub value: f64,
    pub negative_pointer: bool,
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub correlations: Vec<SeriesCorrelation>,
    pub removed: Vec<String>,
    pub filtered: RingWidthTable,
    pub crossdate: CrossdateReport,
    pub fits: Vec<DetrendFit>,
    pub rwi: RingWidthTable,
    pub chronology: Chronology,
    pub smoothed: Vec<Option<f64>>,
    pub stats: ChronologyStats,
    pub climate: Vec<ClimateCorrelation>,
    pub releases: ReleaseReport,
    pub pointers: Vec<PointerYear>,
    pub extremes: Vec<ExtremeYears>,
    pub series_stats: Vec<SeriesStats>,
    pub sites: Vec<SiteSummary>,
}

/// load → filter → crossdate check → detrend → aggregate → correlate, with
/// release detection on the unfiltered release table.
pub fn run_pipeline(inputs: &LoadedInputs, config: &AnalysisConfig) -> Result<PipelineOutput> {
    let (correlations, filtered) = correlate_and_filter(&inputs.ring_widths, &config.correlation)?;
    if filtered.table.series_count() == 0 {
        return Err(AnalysisError::InsufficientData(
            "every series was removed by the correlation filter".to_string(),
        ));
    }
    let table = filtered.table;

    let crossdate = crossdate_segments(&table, &config.crossdate)?;

    let detrended = detrend_table(&table, config.detrend.method)?;
    let chronology = build_chronology(&detrended.rwi, &config.chronology)?;
    let smoothed = hanning_smooth(&chronology.values(), config.chronology.smoothing_window);
    let stats = chronology_stats(&detrended.rwi, config.chronology.min_overlap)?;
    info!(rbar = ?stats.rbar, eps = ?stats.eps, "chronology signal strength");

    let climate = climate_correlations(&chronology, &inputs.indices, config.climate.max_lag);
    let pointers = pointer_years(&table, &config.pointer)?;
    let extremes = inputs
        .indices
        .iter()
        .map(|index| ExtremeYears {
            index: index.name.clone(),
            years: driest_years(index, config.climate.extreme_years)
                .into_iter()
                .map(|(year, value)| ExtremeYear {
                    year,
                    value,
                    negative_pointer: pointers
                        .iter()
                        .any(|p| p.year == year && p.kind == PointerKind::Negative),
                })
                .collect(),
        })
        .collect();

    let releases = detect_table_releases(inputs.release_table(), &config.release)?;
    let series_stats = series_stats(&inputs.ring_widths)?;
    let sites = summarize_sites(&inputs.sites, &inputs.ring_widths.series_ids());

    Ok(PipelineOutput {
        correlations,
        removed: filtered.removed,
        filtered: table,
        crossdate,
        fits: detrended.fits,
        rwi: detrended.rwi,
        chronology,
        smoothed,
        stats,
        climate,
        releases,
        pointers,
        extremes,
        series_stats,
        sites,
    })
}
