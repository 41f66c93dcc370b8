//! bandmerge CLI: merge Landsat band triplets into composite rasters.
//!
//! Walks the UF subdirectories of an input folder, groups each scene's
//! B4/B5/B6 files and hands them to `gdal_merge` as a B5/B6/B4 composite.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}
