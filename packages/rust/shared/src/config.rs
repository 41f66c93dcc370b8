//! Application configuration for bandmerge.
//!
//! User config lives at `~/.bandmerge/bandmerge.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BandMergeError, Result};
use crate::types::{BRAZILIAN_STATES, DEFAULT_BANDS, DEFAULT_COMPOSITE_ORDER, RasterDataType};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "bandmerge.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".bandmerge";

// ---------------------------------------------------------------------------
// Config structs (matching bandmerge.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Band file discovery settings.
    #[serde(default)]
    pub scan: ScanConfig,

    /// External merge engine settings.
    #[serde(default)]
    pub merge: MergeConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Root folder holding one subdirectory per UF. Used when no ROOT is given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_dir: Option<PathBuf>,
}

/// `[scan]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Raster file extension, without the dot.
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Band markers of interest, in the order a sorted scene lists them.
    #[serde(default = "default_bands")]
    pub bands: Vec<String>,

    /// Band order inside the composite.
    #[serde(default = "default_composite_order")]
    pub composite_order: Vec<String>,

    /// UF subdirectories to visit.
    #[serde(default = "default_states")]
    pub states: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extension: default_extension(),
            bands: default_bands(),
            composite_order: default_composite_order(),
            states: default_states(),
        }
    }
}

fn default_extension() -> String {
    "tif".into()
}
fn default_bands() -> Vec<String> {
    DEFAULT_BANDS.iter().map(|b| b.to_string()).collect()
}
fn default_composite_order() -> Vec<String> {
    DEFAULT_COMPOSITE_ORDER.iter().map(|b| b.to_string()).collect()
}
fn default_states() -> Vec<String> {
    BRAZILIAN_STATES.iter().map(|uf| uf.to_string()).collect()
}

/// `[merge]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Merge program to invoke (`gdal_merge.py` or `gdal_merge`).
    #[serde(default = "default_program")]
    pub program: String,

    /// Output pixel type.
    #[serde(default)]
    pub data_type: RasterDataType,

    /// Place each input into a separate band.
    #[serde(default = "default_true")]
    pub separate: bool,

    /// Grab a pseudo-color table from the first input.
    #[serde(default)]
    pub pct: bool,

    /// Input pixel value to treat as nodata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodata_input: Option<f64>,

    /// Nodata value written to the output bands.
    #[serde(
        default = "default_nodata_output",
        skip_serializing_if = "Option::is_none"
    )]
    pub nodata_output: Option<f64>,

    /// GDAL creation options (`KEY=VALUE`).
    #[serde(default = "default_creation_options")]
    pub creation_options: Vec<String>,

    /// Extra command-line arguments passed through verbatim.
    #[serde(default)]
    pub extra: Vec<String>,

    /// GDAL output driver short name.
    #[serde(default = "default_output_format")]
    pub output_format: String,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            data_type: RasterDataType::default(),
            separate: true,
            pct: false,
            nodata_input: None,
            nodata_output: default_nodata_output(),
            creation_options: default_creation_options(),
            extra: Vec::new(),
            output_format: default_output_format(),
        }
    }
}

fn default_program() -> String {
    "gdal_merge.py".into()
}
fn default_true() -> bool {
    true
}
fn default_nodata_output() -> Option<f64> {
    Some(0.0)
}
fn default_creation_options() -> Vec<String> {
    vec!["BIGTIFF=YES".into()]
}
fn default_output_format() -> String {
    "GTiff".into()
}

impl AppConfig {
    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        let scan = &self.scan;

        if scan.extension.trim().is_empty() {
            return Err(BandMergeError::config("scan.extension must not be empty"));
        }
        if scan.bands.is_empty() {
            return Err(BandMergeError::config("scan.bands must list at least one band"));
        }
        if let Some(band) = scan.bands.iter().find(|b| b.trim().is_empty()) {
            return Err(BandMergeError::config(format!("scan.bands has a blank entry: {band:?}")));
        }
        if let Some((i, band)) = scan
            .bands
            .iter()
            .enumerate()
            .find(|&(i, band)| scan.bands[..i].contains(band))
        {
            return Err(BandMergeError::config(format!(
                "scan.bands lists '{band}' more than once (position {i})"
            )));
        }

        let mut expected = scan.bands.clone();
        let mut actual = scan.composite_order.clone();
        expected.sort();
        actual.sort();
        if expected != actual {
            return Err(BandMergeError::config(format!(
                "scan.composite_order {:?} must be a permutation of scan.bands {:?}",
                scan.composite_order, scan.bands
            )));
        }

        if let Some(uf) = scan
            .states
            .iter()
            .find(|uf| uf.len() != 2 || !uf.chars().all(|c| c.is_ascii_uppercase()))
        {
            return Err(BandMergeError::config(format!(
                "scan.states entry '{uf}' is not a two-letter UF code"
            )));
        }

        if self.merge.program.trim().is_empty() {
            return Err(BandMergeError::config("merge.program must not be empty"));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.bandmerge/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| BandMergeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.bandmerge/bandmerge.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| BandMergeError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| BandMergeError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Write a default config file to `~/.bandmerge/bandmerge.toml`.
/// Returns the path to the created file.
pub fn init_config(force: bool) -> Result<PathBuf> {
    init_config_at(&config_file_path()?, force)
}

/// Write a default config file to `path`, creating parent directories.
///
/// An existing file is left alone unless `force` is set.
pub fn init_config_at(path: &Path, force: bool) -> Result<PathBuf> {
    if path.exists() && !force {
        return Err(BandMergeError::config(format!(
            "{} already exists (pass --force to overwrite)",
            path.display()
        )));
    }

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| BandMergeError::io(dir, e))?;
    }

    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| BandMergeError::config(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| BandMergeError::io(path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("gdal_merge.py"));
        assert!(toml_str.contains("BIGTIFF=YES"));
        assert!(toml_str.contains("UInt16"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.scan.bands, vec!["B4", "B5", "B6"]);
        assert_eq!(parsed.scan.composite_order, vec!["B5", "B6", "B4"]);
        assert_eq!(parsed.scan.states.len(), 27);
        assert_eq!(parsed.merge.nodata_output, Some(0.0));
        assert!(parsed.merge.separate);
        assert!(!parsed.merge.pct);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[defaults]
input_dir = "/data/landsat"

[scan]
states = ["RJ", "SP"]

[merge]
program = "gdal_merge"
data_type = "Float32"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.input_dir, Some(PathBuf::from("/data/landsat")));
        assert_eq!(config.scan.states, vec!["RJ", "SP"]);
        assert_eq!(config.scan.extension, "tif");
        assert_eq!(config.merge.program, "gdal_merge");
        assert_eq!(config.merge.data_type, RasterDataType::Float32);
        assert_eq!(config.merge.creation_options, vec!["BIGTIFF=YES"]);
        config.validate().expect("valid");
    }

    #[test]
    fn default_config_is_valid() {
        AppConfig::default().validate().expect("defaults validate");
    }

    #[test]
    fn composite_order_must_match_bands() {
        let mut config = AppConfig::default();
        config.scan.composite_order = vec!["B5".into(), "B6".into(), "B7".into()];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("permutation"));
    }

    #[test]
    fn empty_bands_rejected() {
        let mut config = AppConfig::default();
        config.scan.bands.clear();
        config.scan.composite_order.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn lowercase_state_rejected() {
        let mut config = AppConfig::default();
        config.scan.states.push("sp".into());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("'sp'"));
    }

    #[test]
    fn duplicate_bands_rejected() {
        let mut config = AppConfig::default();
        config.scan.bands = vec!["B4".into(), "B4".into(), "B5".into()];
        config.scan.composite_order = config.scan.bands.clone();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("'B4' more than once"));
    }

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("bm-config-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn init_config_at_writes_loadable_defaults() {
        let dir = temp_dir();
        let path = dir.join("nested/custom.toml");

        let written = init_config_at(&path, false).unwrap();
        assert_eq!(written, path);

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.scan.bands, vec!["B4", "B5", "B6"]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn init_config_at_keeps_existing_file_without_force() {
        let dir = temp_dir();
        let path = dir.join("bandmerge.toml");
        std::fs::write(&path, "[scan]\nextension = \"img\"\n").unwrap();

        let err = init_config_at(&path, false).unwrap_err();
        assert!(err.to_string().contains("--force"));
        assert_eq!(load_config_from(&path).unwrap().scan.extension, "img");

        init_config_at(&path, true).unwrap();
        assert_eq!(load_config_from(&path).unwrap().scan.extension, "tif");

        let _ = std::fs::remove_dir_all(&dir);
    }
}
