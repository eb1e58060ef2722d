//! TOML configuration file support.
//!
//! Settings that would otherwise need hidden tuning flags can live in a
//! config file:
//!
//! ```toml
//! # xml2sheet.toml
//! [conversion]
//! buffer_size = 65536
//! batch_size = 2048
//! sample_size = 128
//! sheet_name = "Sheet1"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Root configuration structure for xml2sheet.toml files.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Conversion-specific settings.
    #[serde(default)]
    pub conversion: ConversionSettings,
}

/// Settings for the convert command.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConversionSettings {
    /// Input read buffer size in bytes.
    pub buffer_size: Option<usize>,

    /// Rows buffered per sheet before a flush.
    pub batch_size: Option<usize>,

    /// Leading records sampled for generic column headers.
    pub sample_size: Option<usize>,

    /// Sheet name used in generic mode.
    pub sheet_name: Option<String>,
}

impl Config {
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
