//! Shared types, error model, and configuration for the BioNLP corpus adapter.
//!
//! This crate is the foundation depended on by all other workspace crates.
//! It provides:
//! - [`BioNlpError`] — the unified error type
//! - Domain types ([`SchemaKind`], [`Split`], [`DatasetManifest`])
//! - Configuration ([`AppConfig`], [`DownloadConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DEFAULT_URL_BASE, DefaultsConfig, DownloadConfig, DownloadSettings,
    config_dir, config_file_path, default_cache_dir, init_config, load_config,
    load_config_from, parse_url_base,
};
pub use error::{BioNlpError, Result};
pub use types::{CURRENT_SCHEMA_VERSION, DatasetManifest, SchemaKind, Split, SplitSummary};
