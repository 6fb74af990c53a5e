mod common;

use std::fs;
use std::path::{Path, PathBuf};

use ringwork_core::config::{AnalysisConfig, ClimateIndexInput, InputConfig};
use ringwork_core::ingestion::{load_inputs, FileStatus};
use ringwork_core::outputs::{series_file_name, write_outputs, REPORT_FILE};
use ringwork_core::pipeline::run_pipeline;
use ringwork_core::statistics::CorrelationMethod;
use ringwork_core::{AnalysisError, RingWidthTable};

use common::{synthetic_series, table_to_csv, years, Lcg};

const N_YEARS: usize = 200;
const SEED: u64 = 7;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("ringwork-{name}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(dir.join("rwl")).unwrap();
    dir
}

/// Two ring-width files (the second holding one unrelated series), a site
/// table and a drought index tracking the common signal.
fn write_inputs(dir: &Path) {
    let series = synthetic_series(9, N_YEARS, SEED, &[8]);
    let (first, second) = series.split_at(5);
    let site_a = RingWidthTable::from_columns(years(N_YEARS), first.to_vec()).unwrap();
    let site_b = RingWidthTable::from_columns(years(N_YEARS), second.to_vec()).unwrap();
    fs::write(dir.join("rwl/site_a.csv"), table_to_csv(&site_a)).unwrap();
    fs::write(dir.join("rwl/site_b.csv"), table_to_csv(&site_b)).unwrap();

    fs::write(
        dir.join("sites.csv"),
        "site_id,latitude,longitude,taxon\nS0,41.2,-77.9,Quercus montana\n",
    )
    .unwrap();

    let mut signal = Lcg::new(SEED);
    let mut pdsi = String::from("year,pdsi\n");
    for year in years(N_YEARS) {
        pdsi.push_str(&format!("{year},{:.3}\n", 6.0 * signal.noise()));
    }
    fs::write(dir.join("pdsi.csv"), pdsi).unwrap();
}

fn config() -> AnalysisConfig {
    AnalysisConfig {
        inputs: InputConfig {
            ring_widths: vec!["rwl/*.csv".to_string()],
            release_ring_widths: Vec::new(),
            sites: Some("sites.csv".to_string()),
            climate_indices: vec![ClimateIndexInput {
                name: "PDSI".to_string(),
                path: "pdsi.csv".to_string(),
                season: Vec::new(),
            }],
        },
        ..AnalysisConfig::default()
    }
}

#[test]
fn full_run_writes_every_artifact() {
    let dir = scratch_dir("pipeline");
    write_inputs(&dir);
    let config = config();

    let inputs = load_inputs(&config.inputs, &dir).unwrap();
    assert_eq!(inputs.ring_widths.series_count(), 9);
    assert_eq!(inputs.reports.len(), 4);
    assert!(inputs.reports.iter().all(|r| r.status == FileStatus::Parsed));
    assert!(inputs.reports.iter().all(|r| r.hash.len() == 64));

    let output = run_pipeline(&inputs, &config).unwrap();
    assert_eq!(output.removed, vec!["S08".to_string()]);
    assert_eq!(output.filtered.series_count(), 8);
    assert_eq!(output.chronology.years.len(), N_YEARS);
    // release detection still sees the removed series
    assert_eq!(output.releases.series.len(), 9);
    assert_eq!(output.sites[0].series.len(), 9);

    let pdsi = output
        .climate
        .iter()
        .find(|c| c.lag == 0 && c.method == CorrelationMethod::Pearson)
        .unwrap();
    assert!(pdsi.r.unwrap() > 0.8, "r = {:?}", pdsi.r);
    assert_eq!(pdsi.n, N_YEARS);

    let out_dir = dir.join("output");
    let written = write_outputs(&output, &inputs, &config, &out_dir).unwrap();
    for name in [
        "series_correlation.csv",
        "crossdate_segments.csv",
        "rwi.csv",
        "chronology.csv",
        "chronology_stats.csv",
        "climate_correlation.csv",
        "chronology_vs_index.csv",
        "release_counts.csv",
        "release_flags.csv",
        "pointer_years.csv",
        "series_stats.csv",
        REPORT_FILE,
    ] {
        assert!(out_dir.join(name).exists(), "{name} missing");
    }
    assert!(out_dir.join(series_file_name("S08")).exists());
    assert!(written.len() >= 12 + 9);

    let report: serde_json::Value =
        serde_json::from_slice(&fs::read(out_dir.join(REPORT_FILE)).unwrap()).unwrap();
    assert_eq!(report["removed_series"][0], "S08");
    assert_eq!(report["summary"]["series_retained"], 8);
    assert_eq!(report["inputs"].as_array().unwrap().len(), 4);

    let chronology_csv = fs::read_to_string(out_dir.join("chronology.csv")).unwrap();
    assert!(chronology_csv.starts_with("year,std,res,sample_depth,smoothed"));

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn duplicate_files_are_skipped() {
    let dir = scratch_dir("duplicates");
    write_inputs(&dir);
    fs::copy(dir.join("rwl/site_a.csv"), dir.join("rwl/site_a_copy.csv")).unwrap();

    let inputs = load_inputs(&config().inputs, &dir).unwrap();
    assert_eq!(inputs.ring_widths.series_count(), 9);
    let duplicates: Vec<_> = inputs
        .reports
        .iter()
        .filter(|r| r.status == FileStatus::Duplicate)
        .collect();
    assert_eq!(duplicates.len(), 1);
    assert!(duplicates[0].path.ends_with("site_a_copy.csv"));

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn load_failures_are_fatal() {
    let dir = scratch_dir("failures");
    write_inputs(&dir);
    fs::write(dir.join("rwl/broken.csv"), "year,X1\n1900,1.0\n1899,1.1\n").unwrap();

    let err = load_inputs(&config().inputs, &dir).unwrap_err();
    assert!(matches!(err, AnalysisError::Load { ref path, .. } if path.ends_with("broken.csv")));

    let mut missing = config();
    missing.inputs.ring_widths = vec!["nowhere/*.csv".to_string()];
    let err = load_inputs(&missing.inputs, &dir).unwrap_err();
    assert!(matches!(err, AnalysisError::Config(_)));

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn one_monthly_file_feeds_several_seasons() {
    let dir = scratch_dir("seasons");
    write_inputs(&dir);
    let mut spei = String::from("year,jan,feb,mar,apr,may,jun,jul,aug,sep,oct,nov,dec\n");
    for year in years(N_YEARS) {
        let summer = if year % 2 == 0 { -1.0 } else { 1.0 };
        spei.push_str(&format!("{year},0,0,0,0,0,{summer},{summer},{summer},0,0,0,0\n"));
    }
    fs::write(dir.join("spei.csv"), spei).unwrap();

    let mut config = config();
    for (name, season) in [("SPEI_JJA", vec![6, 7, 8]), ("SPEI_ANN", Vec::new())] {
        config.inputs.climate_indices.push(ClimateIndexInput {
            name: name.to_string(),
            path: "spei.csv".to_string(),
            season,
        });
    }

    let inputs = load_inputs(&config.inputs, &dir).unwrap();
    let names: Vec<&str> = inputs.indices.iter().map(|index| index.name.as_str()).collect();
    assert_eq!(names, vec!["PDSI", "SPEI_JJA", "SPEI_ANN"]);
    assert_eq!(inputs.indices[1].value(1900), Some(-1.0));
    assert_eq!(inputs.indices[2].value(1900), Some(-0.25));
    assert!(inputs.reports.iter().all(|r| r.status == FileStatus::Parsed));

    // the same index listed twice is still one duplicate file
    config.inputs.climate_indices.push(config.inputs.climate_indices[1].clone());
    let inputs = load_inputs(&config.inputs, &dir).unwrap();
    assert_eq!(inputs.indices.len(), 3);
    assert_eq!(
        inputs.reports.iter().filter(|r| r.status == FileStatus::Duplicate).count(),
        1
    );

    let output = run_pipeline(&inputs, &config).unwrap();
    for name in ["PDSI", "SPEI_JJA", "SPEI_ANN"] {
        assert!(output.climate.iter().any(|c| c.index == name), "{name} missing");
    }

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn missing_index_file_names_its_path() {
    let dir = scratch_dir("missing-index");
    write_inputs(&dir);
    let mut config = config();
    config.inputs.climate_indices[0].path = "absent.csv".to_string();

    let err = load_inputs(&config.inputs, &dir).unwrap_err();
    assert!(matches!(err, AnalysisError::Read { ref path, .. } if path.ends_with("absent.csv")));
    assert!(err.to_string().contains("absent.csv"));

    fs::remove_dir_all(&dir).unwrap();
}
