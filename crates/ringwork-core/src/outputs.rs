use std::collections::HashSet;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chrono::Utc;
use polars::prelude::*;
use serde_json::json;
use tracing::{debug, info};

use crate::chronology::ChronologyStats;
use crate::climate::{climate_frame, combined_table};
use crate::config::AnalysisConfig;
use crate::correlation::correlations_frame;
use crate::crossdate::SegmentStatus;
use crate::detrend::fits_frame;
use crate::error::Result;
use crate::ingestion::LoadedInputs;
use crate::pipeline::PipelineOutput;
use crate::pointer::pointer_frame;
use crate::series_stats::stats_frame;
use crate::sites::sites_frame;

pub const REPORT_FILE: &str = "report.json";

pub fn write_csv(df: &DataFrame, path: &Path) -> Result<()> {
    let mut file = File::create(path)?;
    let mut clone = df.clone();
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut clone)?;
    debug!(path = %path.display(), rows = df.height(), "wrote table");
    Ok(())
}

/// Core ids may contain characters that are awkward in file names.
pub fn series_file_name(series_id: &str) -> String {
    let cleaned: String = series_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("release_{cleaned}.csv")
}

/// File names for the per-series release tables, in order. Ids that clean
/// to the same name get their 1-based position appended.
pub fn release_file_names<S: AsRef<str>>(series_ids: &[S]) -> Vec<String> {
    let mut used = HashSet::new();
    series_ids
        .iter()
        .enumerate()
        .map(|(position, id)| {
            let base = series_file_name(id.as_ref());
            let stem = base.trim_end_matches(".csv").to_string();
            let mut name = base;
            let mut suffix = position + 1;
            while !used.insert(name.clone()) {
                name = format!("{stem}_{suffix}.csv");
                suffix += 1;
            }
            name
        })
        .collect()
}

fn stats_table(stats: &ChronologyStats) -> PolarsResult<DataFrame> {
    df!(
        "n_series" => [stats.n_series as u32],
        "n_pairs" => [stats.n_pairs as u32],
        "rbar" => [stats.rbar],
        "eps" => [stats.eps],
    )
}

/// Writes every table of a run plus the `report.json` manifest into `dir`
/// and returns the written paths.
pub fn write_outputs(
    output: &PipelineOutput,
    inputs: &LoadedInputs,
    config: &AnalysisConfig,
    dir: &Path,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();
    let mut emit = |name: &str, df: DataFrame| -> Result<()> {
        let path = dir.join(name);
        write_csv(&df, &path)?;
        written.push(path);
        Ok(())
    };

    emit(
        "series_correlation.csv",
        correlations_frame(&output.correlations, &output.removed)?,
    )?;
    emit("crossdate_segments.csv", output.crossdate.to_dataframe()?)?;
    emit("detrend_fits.csv", fits_frame(&output.fits)?)?;
    emit("rwi.csv", output.rwi.df().clone())?;
    emit(
        "chronology.csv",
        output.chronology.to_dataframe(Some(&output.smoothed))?,
    )?;
    emit("chronology_stats.csv", stats_table(&output.stats)?)?;
    emit("climate_correlation.csv", climate_frame(&output.climate)?)?;
    emit(
        "chronology_vs_index.csv",
        combined_table(&output.chronology, &output.smoothed, &inputs.indices)?,
    )?;
    emit("release_counts.csv", output.releases.counts_frame()?)?;
    emit("release_flags.csv", output.releases.flags_frame()?)?;
    emit("release_events.csv", output.releases.events_frame()?)?;
    emit("pointer_years.csv", pointer_frame(&output.pointers)?)?;
    emit("series_stats.csv", stats_frame(&output.series_stats)?)?;
    if !output.sites.is_empty() {
        emit("sites.csv", sites_frame(&output.sites)?)?;
    }

    if config.output.per_series_release_files {
        let release_table = inputs.release_table();
        let ids: Vec<&str> = output
            .releases
            .series
            .iter()
            .map(|series| series.series_id.as_str())
            .collect();
        for (id, name) in ids.iter().zip(release_file_names(&ids)) {
            if let Some(df) = output.releases.series_frame(release_table, id)? {
                emit(&name, df)?;
            }
        }
    }

    let report_path = dir.join(REPORT_FILE);
    fs::write(&report_path, serde_json::to_vec_pretty(&report(output, inputs, config))?)?;
    written.push(report_path);

    info!(dir = %dir.display(), files = written.len(), "outputs written");
    Ok(written)
}

/// Manifest of a run: inputs with hashes, the configuration used and the
/// headline numbers.
pub fn report(
    output: &PipelineOutput,
    inputs: &LoadedInputs,
    config: &AnalysisConfig,
) -> serde_json::Value {
    let flagged_segments = output
        .crossdate
        .series
        .iter()
        .flat_map(|series| series.segments.iter())
        .filter(|segment| segment.status == SegmentStatus::Flagged)
        .count();
    let fallbacks: Vec<&str> = output
        .fits
        .iter()
        .filter(|fit| fit.fell_back())
        .map(|fit| fit.series_id.as_str())
        .collect();

    json!({
        "tool": "ringwork",
        "version": env!("CARGO_PKG_VERSION"),
        "git_commit": std::env::var("RINGWORK_GIT_COMMIT_HASH").ok(),
        "generated_at": Utc::now().to_rfc3339(),
        "inputs": inputs.reports,
        "config": config,
        "removed_series": output.removed,
        "summary": {
            "series_loaded": inputs.ring_widths.series_count(),
            "series_retained": output.filtered.series_count(),
            "first_year": output.chronology.years.first().map(|y| y.year),
            "last_year": output.chronology.years.last().map(|y| y.year),
            "flagged_segments": flagged_segments,
            "detrend_fallbacks": fallbacks,
            "chronology": output.stats,
            "climate": output.climate,
            "release_events": output.releases.events().count(),
            "pointer_years": output.pointers,
            "driest_years": output.extremes,
        },
    })
}
