//! # Configuration
//!
//! The CLI reads an optional TOML file:
//!
//! ```toml
//! include_commons = true
//!
//! [catalogue.basic.volume]
//! native = "liter"
//! units = { liter = 1.0, ml = 0.001, gallon = 3.785 }
//! ```
//!
//! Without a file the common measures are used.

use measure_core::{Catalogue, CatalogueSpec, MeasureError, MeasureRegistry};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Maximum configuration file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

// =============================================================================
// ERRORS
// =============================================================================

/// Failures of the command-line front end.
#[derive(Debug, Error)]
pub enum AppError {
    /// The engine rejected an operation.
    #[error("{0}")]
    Measure(#[from] MeasureError),

    /// A file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is malformed.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The command line cannot be satisfied.
    #[error("{0}")]
    Usage(String),
}

impl From<toml::de::Error> for AppError {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}

// =============================================================================
// APP CONFIG
// =============================================================================

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Start from distance, duration, mass, angle and temperature.
    pub include_commons: bool,
    /// Additional measures.
    pub catalogue: CatalogueSpec,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            include_commons: true,
            catalogue: CatalogueSpec::default(),
        }
    }
}

impl AppConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, AppError> {
        Ok(toml::from_str(text)?)
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let metadata = std::fs::metadata(path)?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(AppError::Config(format!(
                "file size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Load `path` if given, otherwise the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, AppError> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }

    /// Build the catalogue this configuration describes.
    pub fn build_catalogue(&self) -> Result<Catalogue, AppError> {
        let registry = MeasureRegistry::new();
        let mut catalogue = if self.include_commons {
            Catalogue::from_commons(&registry)?
        } else {
            Catalogue::new(&registry)
        };
        catalogue.install(&self.catalogue)?;
        tracing::info!(measures = catalogue.names().len(), "catalogue ready");
        Ok(catalogue)
    }
}
