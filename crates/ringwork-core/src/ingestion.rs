use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use blake3::Hasher;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{ClimateIndexInput, InputConfig};
use crate::error::{AnalysisError, Result};
use ringwork_parser::{
    parse_climate_index, parse_ring_width_table, parse_site_table, ClimateIndex, LoadError,
    RingWidthTable, Site,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    RingWidths,
    ReleaseRingWidths,
    Sites,
    ClimateIndex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Duplicate,
    Parsed,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: String,
    pub kind: InputKind,
    pub hash: String,
    pub status: FileStatus,
}

#[derive(Debug, Clone)]
pub struct LoadedInputs {
    pub ring_widths: RingWidthTable,
    /// Separate release-detection tables; `None` means reuse `ring_widths`.
    pub release_ring_widths: Option<RingWidthTable>,
    pub sites: Vec<Site>,
    pub indices: Vec<ClimateIndex>,
    pub reports: Vec<FileReport>,
}

impl LoadedInputs {
    pub fn release_table(&self) -> &RingWidthTable {
        self.release_ring_widths.as_ref().unwrap_or(&self.ring_widths)
    }
}

pub fn compute_hash(contents: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(contents);
    let hash = hasher.finalize();
    hash.to_hex().to_string()
}

fn has_glob_meta(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Expands paths and glob patterns relative to `base_dir`. A pattern that
/// matches nothing is a configuration error.
pub fn resolve_paths(patterns: &[String], base_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for pattern in patterns {
        let joined = base_dir.join(pattern);
        if !has_glob_meta(pattern) {
            paths.push(joined);
            continue;
        }

        let mut matched: Vec<PathBuf> = Vec::new();
        for entry in glob::glob(&joined.to_string_lossy())? {
            matched.push(entry.map_err(|err| AnalysisError::Io(err.into()))?);
        }
        if matched.is_empty() {
            return Err(AnalysisError::Config(format!(
                "input pattern '{pattern}' matched no files"
            )));
        }
        matched.sort();
        paths.extend(matched);
    }
    Ok(paths)
}

struct Reader<'a> {
    seen: HashSet<String>,
    reports: &'a mut Vec<FileReport>,
}

impl Reader<'_> {
    /// Reads and hashes a file. Returns `None` for content already read
    /// under the same kind and `variant`.
    fn read(&mut self, path: &Path, kind: InputKind, variant: &str) -> Result<Option<String>> {
        let shown = path.display().to_string();
        let bytes = fs::read(path).map_err(|source| AnalysisError::Read {
            path: shown.clone(),
            source,
        })?;
        let hash = compute_hash(&bytes);

        if !self.seen.insert(format!("{kind:?}:{variant}:{hash}")) {
            warn!(path = %shown, %hash, "skipping duplicate input file");
            self.reports.push(FileReport {
                path: shown,
                kind,
                hash,
                status: FileStatus::Duplicate,
            });
            return Ok(None);
        }

        let content = String::from_utf8(bytes).map_err(|_| AnalysisError::Load {
            path: shown.clone(),
            source: LoadError::Validation {
                parser: "utf8",
                message: "file contents were not valid UTF-8".to_string(),
            },
        })?;
        self.reports.push(FileReport {
            path: shown,
            kind,
            hash,
            status: FileStatus::Parsed,
        });
        Ok(Some(content))
    }
}

/// Each configured index is its own reduction of a file, so the same
/// monthly table may feed several indices with different seasons.
fn index_variant(input: &ClimateIndexInput) -> String {
    let months: Vec<String> = input.season.iter().map(u32::to_string).collect();
    format!("{}[{}]", input.name, months.join(","))
}

fn load_error(path: &Path, source: LoadError) -> AnalysisError {
    AnalysisError::Load {
        path: path.display().to_string(),
        source,
    }
}

fn load_ring_widths(
    reader: &mut Reader<'_>,
    paths: &[PathBuf],
    kind: InputKind,
) -> Result<Option<RingWidthTable>> {
    let mut merged: Option<RingWidthTable> = None;
    for path in paths {
        let Some(content) = reader.read(path, kind, "")? else {
            continue;
        };
        let table = parse_ring_width_table(&content).map_err(|err| load_error(path, err))?;

        merged = Some(match merged {
            None => table,
            Some(existing) => {
                if let Some(id) = table
                    .series_ids()
                    .into_iter()
                    .find(|id| existing.contains_series(id))
                {
                    return Err(load_error(
                        path,
                        LoadError::Validation {
                            parser: "ring_width_csv",
                            message: format!("core id '{id}' is already loaded from another file"),
                        },
                    ));
                }
                existing.merge(&table)?
            }
        });
    }
    Ok(merged)
}

/// Reads, hashes and parses every configured input. Any load failure is
/// fatal.
pub fn load_inputs(config: &InputConfig, base_dir: &Path) -> Result<LoadedInputs> {
    let mut reports = Vec::new();
    let mut reader = Reader {
        seen: HashSet::new(),
        reports: &mut reports,
    };

    let ring_paths = resolve_paths(&config.ring_widths, base_dir)?;
    let ring_widths = load_ring_widths(&mut reader, &ring_paths, InputKind::RingWidths)?
        .ok_or_else(|| AnalysisError::Config("no ring-width tables configured".to_string()))?;

    let release_paths = resolve_paths(&config.release_ring_widths, base_dir)?;
    let release_ring_widths =
        load_ring_widths(&mut reader, &release_paths, InputKind::ReleaseRingWidths)?;

    let mut sites = Vec::new();
    if let Some(pattern) = &config.sites {
        let path = base_dir.join(pattern);
        if let Some(content) = reader.read(&path, InputKind::Sites, "")? {
            sites = parse_site_table(&content).map_err(|err| load_error(&path, err))?;
        }
    }

    let mut indices = Vec::with_capacity(config.climate_indices.len());
    for input in &config.climate_indices {
        let path = base_dir.join(&input.path);
        let variant = index_variant(input);
        let Some(content) = reader.read(&path, InputKind::ClimateIndex, &variant)? else {
            continue;
        };
        let index = parse_climate_index(&content, &input.season)
            .map_err(|err| load_error(&path, err))?
            .with_name(input.name.clone());
        indices.push(index);
    }

    info!(
        series = ring_widths.series_count(),
        years = ring_widths.n_years(),
        sites = sites.len(),
        indices = indices.len(),
        files = reports.len(),
        "inputs loaded"
    );

    Ok(LoadedInputs {
        ring_widths,
        release_ring_widths,
        sites,
        indices,
        reports,
    })
}
