//! TOML configuration file support
//!
//! Writer options can be kept in a config file instead of flags:
//!
//! ```toml
//! # isa.toml
//! [tabular]
//! max_paths = 200000
//! write_factor_values_in_assays = true
//!
//! [document]
//! pretty = false
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use isa::isajson::DocumentWriterConfig;
use isa::isatab::TabularWriterConfig;

/// Root configuration structure for isa.toml files.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Options for writing study and assay tables.
    #[serde(default)]
    pub tabular: TabularWriterConfig,

    /// Options for writing JSON documents.
    #[serde(default)]
    pub document: DocumentWriterConfig,
}

impl Config {
    /// Load configuration from a TOML file, or the defaults without one.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }
}
