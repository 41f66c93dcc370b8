//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use bandmerge_core::merge::GdalMerge;
use bandmerge_core::pipeline::{
    BatchOutcome, ProgressReporter, RunConfig, RunSummary, ensure_no_failures,
    generate_merged_files,
};
use bandmerge_discovery::DiscoveryOptions;
use bandmerge_shared::{AppConfig, init_config, init_config_at, load_config, load_config_from};
use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// bandmerge: build B5/B6/B4 composites from per-state Landsat band files.
#[derive(Parser)]
#[command(
    name = "bandmerge",
    version,
    about = "Merge Landsat B4/B5/B6 band files under UF subdirectories into composite rasters.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.bandmerge/bandmerge.toml.
    #[arg(long = "config", global = true, env = "BANDMERGE_CONFIG")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Discovery flags shared by `run` and `scan`.
#[derive(Args, Debug, Default)]
pub(crate) struct ScanArgs {
    /// Folder holding one subdirectory per UF (defaults to `defaults.input_dir`).
    pub root: Option<PathBuf>,

    /// Raster file extension, without the dot.
    #[arg(long)]
    pub extension: Option<String>,

    /// Band markers, in the order a sorted scene lists them (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub bands: Option<Vec<String>>,

    /// UF subdirectories to visit (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub states: Option<Vec<String>>,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Discover band files and merge every scene into a composite.
    Run {
        #[command(flatten)]
        scan: ScanArgs,

        /// Band order inside the composite (comma-separated).
        #[arg(long, value_delimiter = ',')]
        composite_order: Option<Vec<String>>,

        /// Merge program to invoke.
        #[arg(long)]
        program: Option<String>,

        /// Plan the merges without running the merge program.
        #[arg(long)]
        dry_run: bool,

        /// Print the run summary as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List the band files that would be merged.
    Scan {
        #[command(flatten)]
        scan: ScanArgs,
    },

    /// Check that the merge program is installed.
    Check {
        /// Merge program to check.
        #[arg(long)]
        program: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Write a config file with defaults (to `--config` if given).
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = ["bandmerge", "bandmerge_core", "bandmerge_discovery", "bandmerge_shared"]
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",");

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config_file.as_deref();
    match cli.command {
        Command::Run {
            scan,
            composite_order,
            program,
            dry_run,
            json,
        } => cmd_run(config_path, scan, composite_order, program, dry_run, json),
        Command::Scan { scan } => cmd_scan(config_path, scan),
        Command::Check { program } => cmd_check(config_path, program),
        Command::Config { action } => match action {
            ConfigAction::Init { force } => cmd_config_init(config_path, force),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

fn resolve_config(config_path: Option<&Path>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

/// Apply discovery flags on top of the loaded config and pick the input root.
fn apply_scan_args(config: &mut AppConfig, args: ScanArgs) -> Result<PathBuf> {
    if let Some(extension) = args.extension {
        config.scan.extension = extension;
    }
    if let Some(bands) = args.bands {
        config.scan.bands = bands;
    }
    if let Some(states) = args.states {
        config.scan.states = states;
    }

    args.root
        .or_else(|| config.defaults.input_dir.clone())
        .ok_or_else(|| {
            eyre!("no input folder given: pass ROOT or set defaults.input_dir in the config file")
        })
}

fn cmd_run(
    config_path: Option<&Path>,
    scan: ScanArgs,
    composite_order: Option<Vec<String>>,
    program: Option<String>,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let mut config = resolve_config(config_path)?;
    let input_dir = apply_scan_args(&mut config, scan)?;
    if let Some(order) = composite_order {
        config.scan.composite_order = order;
    }
    if let Some(program) = program {
        config.merge.program = program;
    }
    config.validate()?;

    let engine = GdalMerge::new(config.merge.program.clone());
    if !dry_run {
        engine.check_available()?;
    }

    info!(input_dir = %input_dir.display(), dry_run, "merging band files");

    let run_config = RunConfig {
        input_dir,
        app: config,
        dry_run,
    };
    let reporter = CliProgress::new(!json);
    let summary = generate_merged_files(&run_config, &engine, &reporter)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!();
        for line in summary_lines(&summary) {
            println!("{line}");
        }
        println!();
    }

    ensure_no_failures(&summary)?;
    Ok(())
}

/// Text report for a finished run: one line per batch, then the totals.
fn summary_lines(summary: &RunSummary) -> Vec<String> {
    let mut lines: Vec<String> = summary
        .batches
        .iter()
        .filter_map(|outcome| match outcome {
            BatchOutcome::Merged { output } => {
                Some(format!("  Merged file available at: {}", output.display()))
            }
            BatchOutcome::Planned { plan } => plan
                .output
                .as_ref()
                .map(|output| format!("  Would merge into: {}", output.display())),
            BatchOutcome::Incomplete { plan } => Some(format!(
                "  Skipped incomplete batch (missing {:?})",
                plan.missing_bands()
            )),
            BatchOutcome::Failed { error, .. } => Some(format!("  Failed: {error}")),
        })
        .collect();

    lines.push(String::new());
    lines.push(format!("  Run:        {}", summary.run_id));
    lines.push(format!("  Files:      {}", summary.files_found));
    lines.push(format!("  Layers:     {}", summary.layers_loaded));
    lines.push(format!("  Skipped:    {}", summary.layers_skipped.len()));
    lines.push(format!("  Merged:     {}", summary.merged().len()));
    lines.push(format!("  Incomplete: {}", summary.incomplete_count()));
    lines.push(format!("  Failed:     {}", summary.failed_count()));
    lines.push(format!("  Time:       {:.1}s", summary.elapsed.as_secs_f64()));
    lines
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new(visible: bool) -> Self {
        if !visible {
            return Self {
                spinner: ProgressBar::hidden(),
            };
        }

        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn batch_started(&self, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Merging [{current}/{total}]"));
    }

    fn batch_finished(&self, _outcome: &BatchOutcome) {
        self.spinner.tick();
    }

    fn done(&self, _summary: &RunSummary) {
        self.spinner.finish_and_clear();
    }
}

fn cmd_scan(config_path: Option<&Path>, scan: ScanArgs) -> Result<()> {
    let mut config = resolve_config(config_path)?;
    let root = apply_scan_args(&mut config, scan)?;
    config.validate()?;

    let opts = DiscoveryOptions::from(&config.scan);
    let paths = bandmerge_discovery::get_all_paths(&root, &opts)?;

    for path in &paths {
        println!("{}", path.display());
    }
    info!(count = paths.len(), "files found");
    Ok(())
}

fn cmd_check(config_path: Option<&Path>, program: Option<String>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let program = program.unwrap_or(config.merge.program);

    let engine = GdalMerge::new(program);
    let version = engine.check_available()?;
    println!("{}: {version}", engine.program());
    Ok(())
}

fn cmd_config_init(config_path: Option<&Path>, force: bool) -> Result<()> {
    let path = match config_path {
        Some(path) => init_config_at(path, force)?,
        None => init_config(force)?,
    };
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
