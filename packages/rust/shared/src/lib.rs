//! Shared types, error model, and configuration for bandmerge.
//!
//! This crate is the foundation depended on by all other bandmerge crates.
//! It provides:
//! - [`BandMergeError`]: the unified error type
//! - Domain types ([`RasterDataType`], [`RunId`], band and state constants)
//! - Configuration ([`AppConfig`], [`ScanConfig`], [`MergeConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, MergeConfig, ScanConfig, config_dir, config_file_path,
    init_config, init_config_at, load_config, load_config_from,
};
pub use error::{BandMergeError, Result};
pub use types::{
    BRAZILIAN_STATES, DEFAULT_BANDS, DEFAULT_COMPOSITE_ORDER, MERGED_TOKEN, RasterDataType,
    RunId,
};
