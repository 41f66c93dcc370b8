//! Band file discovery across UF subdirectories.
//!
//! The input root is expected to hold one subdirectory per Brazilian state
//! (`AC`, `AL`, ...). Each subdirectory is listed one level deep and the
//! raster files whose names carry a band marker of interest are collected.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use bandmerge_shared::{BRAZILIAN_STATES, BandMergeError, DEFAULT_BANDS, Result, ScanConfig};
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

// ---------------------------------------------------------------------------
// Discovery options
// ---------------------------------------------------------------------------

/// Configuration for the discovery process.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// File extension without the dot (matched case-insensitively).
    pub extension: String,
    /// Band markers; a file is kept when its name contains any of them.
    pub bands: Vec<String>,
    /// UF subdirectories to visit, in order.
    pub states: Vec<String>,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            extension: "tif".into(),
            bands: DEFAULT_BANDS.iter().map(|b| b.to_string()).collect(),
            states: BRAZILIAN_STATES.iter().map(|uf| uf.to_string()).collect(),
        }
    }
}

impl From<&ScanConfig> for DiscoveryOptions {
    fn from(scan: &ScanConfig) -> Self {
        Self {
            extension: scan.extension.clone(),
            bands: scan.bands.clone(),
            states: scan.states.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Whether the file name of `path` contains the band marker.
pub fn is_desired_raster_band(path: &Path, band: &str) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().contains(band))
        .unwrap_or(false)
}

/// Whether the file name of `path` ends in `.<extension>`, ignoring case.
pub fn has_extension(path: &Path, extension: &str) -> bool {
    let Some(name) = path.file_name() else {
        return false;
    };
    let name = name.to_string_lossy().to_ascii_uppercase();
    let suffix = format!(".{}", extension.trim_start_matches('.').to_ascii_uppercase());
    name.len() > suffix.len() && name.ends_with(&suffix)
}

// ---------------------------------------------------------------------------
// Main entry point
// ---------------------------------------------------------------------------

/// Collect every band file under `root/<UF>/`, sorted.
///
/// Only the immediate children of each state directory are considered.
/// A file matching several bands is listed once. Missing state directories
/// are skipped with a warning.
#[instrument(skip_all, fields(root = %root.display()))]
pub fn get_all_paths(root: &Path, opts: &DiscoveryOptions) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(BandMergeError::Discovery(format!(
            "input folder '{}' is not a directory",
            root.display()
        )));
    }

    let mut found = BTreeSet::new();

    for uf in &opts.states {
        let subdirectory = root.join(uf);
        if !subdirectory.is_dir() {
            warn!(uf = %uf, path = %subdirectory.display(), "state directory missing, skipping");
            continue;
        }

        let before = found.len();
        for entry in WalkDir::new(&subdirectory)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
        {
            let entry = entry.map_err(|e| {
                BandMergeError::Discovery(format!(
                    "failed to list '{}': {e}",
                    subdirectory.display()
                ))
            })?;

            let path = entry.path();
            if !entry.file_type().is_file() || !has_extension(path, &opts.extension) {
                continue;
            }
            if opts.bands.iter().any(|band| is_desired_raster_band(path, band)) {
                found.insert(path.to_path_buf());
            }
        }

        debug!(uf = %uf, files = found.len() - before, "state directory scanned");
    }

    info!(files = found.len(), "band files discovered");
    Ok(found.into_iter().collect())
}
