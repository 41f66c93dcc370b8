//! End-to-end merge pipeline: folder → discover → load → batch → order → merge.

use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use bandmerge_discovery::DiscoveryOptions;
use bandmerge_shared::{AppConfig, BandMergeError, Result, RunId};

use crate::batch::split_into_batches;
use crate::layers::load_layers;
use crate::merge::{MergeEngine, MergeParameters};
use crate::ordering::{MergePlan, plan_merge};

/// Configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Root folder holding the UF subdirectories.
    pub input_dir: PathBuf,
    /// Resolved application config (scan + merge sections).
    pub app: AppConfig,
    /// Plan merges without invoking the engine.
    pub dry_run: bool,
}

/// Outcome of a single batch.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchOutcome {
    /// The engine wrote the composite.
    Merged { output: PathBuf },
    /// Dry run: the plan was complete but not executed.
    Planned { plan: MergePlan },
    /// The batch did not hold the expected bands in the expected positions.
    Incomplete { plan: MergePlan },
    /// The engine failed.
    Failed { plan: MergePlan, error: String },
}

/// Result of [`generate_merged_files`].
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub input_dir: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Band files discovered.
    pub files_found: usize,
    /// Files that opened as rasters.
    pub layers_loaded: usize,
    /// Files that failed to open.
    pub layers_skipped: Vec<PathBuf>,
    pub batches: Vec<BatchOutcome>,
    pub dry_run: bool,
    #[serde(skip)]
    pub elapsed: std::time::Duration,
}

impl RunSummary {
    pub fn merged(&self) -> Vec<&PathBuf> {
        self.batches
            .iter()
            .filter_map(|b| match b {
                BatchOutcome::Merged { output } => Some(output),
                _ => None,
            })
            .collect()
    }

    pub fn incomplete_count(&self) -> usize {
        self.batches
            .iter()
            .filter(|b| matches!(b, BatchOutcome::Incomplete { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.batches
            .iter()
            .filter(|b| matches!(b, BatchOutcome::Failed { .. }))
            .count()
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before a batch is merged.
    fn batch_started(&self, current: usize, total: usize);
    /// Called after a batch has been handled.
    fn batch_finished(&self, outcome: &BatchOutcome);
    /// Called when the pipeline completes.
    fn done(&self, summary: &RunSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn batch_started(&self, _current: usize, _total: usize) {}
    fn batch_finished(&self, _outcome: &BatchOutcome) {}
    fn done(&self, _summary: &RunSummary) {}
}

/// Run the full merge pipeline.
///
/// 1. Discover band files under each UF subdirectory
/// 2. Load them as raster layers, skipping invalid files
/// 3. Split the layers into batches of one scene's bands
/// 4. Order each batch into composite order and name its output
/// 5. Hand complete batches to the merge engine, one at a time
#[instrument(skip_all, fields(input_dir = %config.input_dir.display()))]
pub fn generate_merged_files(
    config: &RunConfig,
    engine: &dyn MergeEngine,
    progress: &dyn ProgressReporter,
) -> Result<RunSummary> {
    let start = Instant::now();
    let started_at = Utc::now();
    let run_id = RunId::new();
    let scan = &config.app.scan;

    config.app.validate()?;
    info!(%run_id, dry_run = config.dry_run, "starting merge pipeline");

    // --- Phase 1: Discovery ---
    progress.phase("Discovering band files");
    let opts = DiscoveryOptions::from(scan);
    let paths = bandmerge_discovery::get_all_paths(&config.input_dir, &opts)?;
    info!(count = paths.len(), "files found");

    // --- Phase 2: Load layers ---
    progress.phase("Loading layers");
    let loaded = load_layers(&paths);
    info!(count = loaded.layers.len(), "layers loaded");

    // --- Phase 3: Batch and merge ---
    progress.phase("Merging bands");
    let batches = split_into_batches(&loaded.layers, scan.bands.len())?;
    let total = batches.len();
    let mut outcomes = Vec::with_capacity(total);

    for (i, batch) in batches.iter().enumerate() {
        progress.batch_started(i + 1, total);

        let plan = plan_merge(batch, &scan.bands, &scan.composite_order);
        let outcome = run_batch(config, engine, plan);

        progress.batch_finished(&outcome);
        outcomes.push(outcome);
    }

    let summary = RunSummary {
        run_id,
        input_dir: config.input_dir.clone(),
        started_at,
        finished_at: Utc::now(),
        files_found: paths.len(),
        layers_loaded: loaded.layers.len(),
        layers_skipped: loaded.skipped,
        batches: outcomes,
        dry_run: config.dry_run,
        elapsed: start.elapsed(),
    };

    info!(
        merged = summary.merged().len(),
        incomplete = summary.incomplete_count(),
        failed = summary.failed_count(),
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "merge pipeline finished"
    );

    progress.done(&summary);
    Ok(summary)
}

fn run_batch(config: &RunConfig, engine: &dyn MergeEngine, plan: MergePlan) -> BatchOutcome {
    let (Some(inputs), Some(output)) = (plan.inputs(), plan.output.clone()) else {
        warn!(
            missing = ?plan.missing_bands(),
            output = ?plan.output,
            "batch does not hold the expected bands, skipping"
        );
        return BatchOutcome::Incomplete { plan };
    };

    if config.dry_run {
        info!(output = %output.display(), "dry run, merge planned");
        return BatchOutcome::Planned { plan };
    }

    let params = MergeParameters::from_config(&config.app.merge, inputs, output);
    match engine.merge(&params) {
        Ok(path) => {
            info!(path = %path.display(), "merged file available");
            BatchOutcome::Merged { output: path }
        }
        Err(e) => {
            error!(output = %params.output.display(), error = %e, "merge failed");
            BatchOutcome::Failed {
                plan,
                error: e.to_string(),
            }
        }
    }
}

/// Error for a run that finished with failed merges.
pub fn ensure_no_failures(summary: &RunSummary) -> Result<()> {
    match summary.failed_count() {
        0 => Ok(()),
        n => Err(BandMergeError::Merge(format!(
            "{n} of {} batches failed to merge",
            summary.batches.len()
        ))),
    }
}
