use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::detrend::DetrendMethod;
use crate::error::{AnalysisError, Result};
use crate::statistics::CorrelationMethod;

/// Every analysis parameter of a run. Loaded from TOML; absent sections and
/// keys take the defaults below.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub inputs: InputConfig,
    pub correlation: CorrelationConfig,
    pub crossdate: CrossdateConfig,
    pub detrend: DetrendConfig,
    pub chronology: ChronologyConfig,
    pub release: ReleaseConfig,
    pub pointer: PointerConfig,
    pub climate: ClimateConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputConfig {
    /// Paths or glob patterns of ring-width tables, merged by year.
    pub ring_widths: Vec<String>,
    /// Tables for release detection. Defaults to `ring_widths` (unfiltered).
    pub release_ring_widths: Vec<String>,
    pub sites: Option<String>,
    pub climate_indices: Vec<ClimateIndexInput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClimateIndexInput {
    pub name: String,
    pub path: String,
    /// Months (1-12) averaged when the file is monthly. Empty means all.
    #[serde(default)]
    pub season: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorrelationConfig {
    pub method: CorrelationMethod,
    pub prewhiten: bool,
    /// Series whose correlation with the others falls below this are removed.
    pub threshold: f64,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            method: CorrelationMethod::Spearman,
            prewhiten: true,
            threshold: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CrossdateConfig {
    pub seg_length: usize,
    /// First segment starts at the first multiple of this at or after the
    /// first year. Zero starts at the first year.
    pub bin_floor: i32,
    pub pcrit: f64,
    pub method: CorrelationMethod,
    pub prewhiten: bool,
}

impl Default for CrossdateConfig {
    fn default() -> Self {
        Self {
            seg_length: 50,
            bin_floor: 100,
            pcrit: 0.05,
            method: CorrelationMethod::Spearman,
            prewhiten: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetrendConfig {
    pub method: DetrendMethod,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChronologyConfig {
    /// Tukey biweight tuning constant.
    pub biweight_c: f64,
    pub max_iterations: usize,
    pub tolerance: f64,
    /// Also build a chronology from prewhitened indices.
    pub residual: bool,
    /// Hanning filter length for the smoothing overlay (odd).
    pub smoothing_window: usize,
    /// Minimum common years for a pair to enter rbar.
    pub min_overlap: usize,
}

impl Default for ChronologyConfig {
    fn default() -> Self {
        Self {
            biweight_c: 9.0,
            max_iterations: 20,
            tolerance: 1e-6,
            residual: true,
            smoothing_window: 11,
            min_overlap: 30,
        }
    }
}

/// Radial growth averaging parameters (Nowacki & Abrams criteria).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReleaseConfig {
    pub prior: usize,
    pub after: usize,
    pub buffer: usize,
    pub minor: f64,
    pub major: f64,
    /// Consecutive years the minor threshold must hold.
    pub length: usize,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            prior: 10,
            after: 10,
            buffer: 10,
            minor: 0.25,
            major: 0.50,
            length: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PointerConfig {
    /// Relative growth change, as a fraction.
    pub rgc_threshold: f64,
    /// Percentage of series that must agree.
    pub series_threshold: f64,
    pub min_depth: usize,
}

impl Default for PointerConfig {
    fn default() -> Self {
        Self {
            rgc_threshold: 0.10,
            series_threshold: 75.0,
            min_depth: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClimateConfig {
    pub max_lag: usize,
    /// How many of the lowest index years to list next to indicator years.
    pub extreme_years: usize,
}

impl Default for ClimateConfig {
    fn default() -> Self {
        Self {
            max_lag: 1,
            extreme_years: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub dir: String,
    pub per_series_release_files: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: "output".to_string(),
            per_series_release_files: true,
        }
    }
}

impl AnalysisConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AnalysisConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |message: String| Err(AnalysisError::Config(message));

        if !(-1.0..=1.0).contains(&self.correlation.threshold) {
            return fail(format!(
                "correlation.threshold {} must lie in [-1, 1]",
                self.correlation.threshold
            ));
        }

        let crossdate = &self.crossdate;
        if crossdate.seg_length < 4 || crossdate.seg_length % 2 != 0 {
            return fail(format!(
                "crossdate.seg_length {} must be an even number of at least 4",
                crossdate.seg_length
            ));
        }
        if crossdate.bin_floor < 0 {
            return fail("crossdate.bin_floor must not be negative".to_string());
        }
        if !(crossdate.pcrit > 0.0 && crossdate.pcrit < 1.0) {
            return fail(format!(
                "crossdate.pcrit {} must lie in (0, 1)",
                crossdate.pcrit
            ));
        }

        let chronology = &self.chronology;
        if chronology.biweight_c <= 0.0 || chronology.max_iterations == 0 {
            return fail("chronology.biweight_c and max_iterations must be positive".to_string());
        }
        if chronology.smoothing_window == 0 || chronology.smoothing_window % 2 == 0 {
            return fail(format!(
                "chronology.smoothing_window {} must be odd",
                chronology.smoothing_window
            ));
        }

        let release = &self.release;
        if release.prior == 0 || release.after == 0 || release.length == 0 {
            return fail("release.prior, release.after and release.length must be positive".to_string());
        }
        if !(release.minor > 0.0 && release.minor <= release.major) {
            return fail(format!(
                "release thresholds must satisfy 0 < minor ({}) <= major ({})",
                release.minor, release.major
            ));
        }

        let pointer = &self.pointer;
        if pointer.rgc_threshold <= 0.0 || !(0.0..=100.0).contains(&pointer.series_threshold) {
            return fail("pointer.rgc_threshold must be positive and series_threshold a percentage".to_string());
        }

        for index in &self.inputs.climate_indices {
            if let Some(month) = index.season.iter().find(|month| !(1..=12).contains(*month)) {
                return fail(format!(
                    "climate index '{}' season month {month} is outside 1..=12",
                    index.name
                ));
            }
        }

        Ok(())
    }
}
