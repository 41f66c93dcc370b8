//! External merge engine.
//!
//! All raster math is delegated to GDAL's `gdal_merge`. This module builds
//! its argument list from [`MergeParameters`] and runs it as a subprocess.

use std::path::PathBuf;
use std::process::Command;

use bandmerge_shared::{BandMergeError, MergeConfig, RasterDataType, Result};
use tracing::{debug, info, instrument};

/// Parameters of a single merge call.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeParameters {
    /// Input rasters, one output band each when `separate` is set.
    pub inputs: Vec<PathBuf>,
    /// Grab a pseudo-color table from the first input.
    pub pct: bool,
    /// Place each input into its own band.
    pub separate: bool,
    pub data_type: RasterDataType,
    /// Input value to ignore when merging.
    pub nodata_input: Option<f64>,
    /// Nodata value assigned to the output bands.
    pub nodata_output: Option<f64>,
    /// `KEY=VALUE` creation options for the output driver.
    pub creation_options: Vec<String>,
    /// Extra arguments passed through verbatim.
    pub extra: Vec<String>,
    /// GDAL driver short name.
    pub output_format: String,
    pub output: PathBuf,
}

impl MergeParameters {
    /// Parameters for merging `inputs` into `output`, using the `[merge]` settings.
    pub fn from_config(config: &MergeConfig, inputs: Vec<PathBuf>, output: PathBuf) -> Self {
        Self {
            inputs,
            pct: config.pct,
            separate: config.separate,
            data_type: config.data_type,
            nodata_input: config.nodata_input,
            nodata_output: config.nodata_output,
            creation_options: config.creation_options.clone(),
            extra: config.extra.clone(),
            output_format: config.output_format.clone(),
            output,
        }
    }

    /// Command-line arguments for `gdal_merge`.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "-ot".to_string(),
            self.data_type.as_gdal_name().to_string(),
            "-of".to_string(),
            self.output_format.clone(),
        ];

        for option in &self.creation_options {
            args.push("-co".to_string());
            args.push(option.clone());
        }
        if self.separate {
            args.push("-separate".to_string());
        }
        if self.pct {
            args.push("-pct".to_string());
        }
        if let Some(value) = self.nodata_input {
            args.push("-n".to_string());
            args.push(value.to_string());
        }
        if let Some(value) = self.nodata_output {
            args.push("-a_nodata".to_string());
            args.push(value.to_string());
        }
        args.extend(self.extra.iter().cloned());

        args.push("-o".to_string());
        args.push(self.output.to_string_lossy().to_string());
        args.extend(self.inputs.iter().map(|p| p.to_string_lossy().to_string()));

        args
    }
}

/// Something that can merge single-band rasters into one multi-band file.
pub trait MergeEngine {
    /// Run the merge and return the path of the written file.
    fn merge(&self, params: &MergeParameters) -> Result<PathBuf>;
}

/// [`MergeEngine`] backed by the `gdal_merge` command-line tool.
#[derive(Debug, Clone)]
pub struct GdalMerge {
    program: String,
}

impl GdalMerge {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run `<program> --version` and return what it printed.
    pub fn check_available(&self) -> Result<String> {
        let output = Command::new(&self.program)
            .arg("--version")
            .output()
            .map_err(|e| {
                BandMergeError::Merge(format!(
                    "failed to run `{}`: {e}. Is GDAL installed and on PATH?",
                    self.program
                ))
            })?;

        if !output.status.success() {
            return Err(BandMergeError::Merge(format!(
                "`{} --version` exited with status {}",
                self.program,
                output.status.code().unwrap_or(-1)
            )));
        }

        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        info!(program = %self.program, %version, "merge engine found");
        Ok(version)
    }
}

impl MergeEngine for GdalMerge {
    #[instrument(skip_all, fields(output = %params.output.display()))]
    fn merge(&self, params: &MergeParameters) -> Result<PathBuf> {
        let args = params.to_args();
        debug!(program = %self.program, ?args, "running merge");

        let output = Command::new(&self.program).args(&args).output().map_err(|e| {
            BandMergeError::Merge(format!("failed to spawn `{}`: {e}", self.program))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BandMergeError::Merge(format!(
                "`{}` exited with status {}: {}",
                self.program,
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }

        Ok(params.output.clone())
    }
}
