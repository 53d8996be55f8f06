//! Pipeline configuration, merged from a TOML file and CLI overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ConfigError, ConfigResult};

/// Settings for a validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Entity catalog file consulted during schema compilation. When unset,
    /// `XML_CATALOG_FILES` is honored.
    pub catalog: Option<PathBuf>,
    /// Explicit Schematron schema reference. An embedded `xml-model` hint in
    /// the document takes precedence over this.
    pub schematron: Option<Url>,
    /// Skip the rule check stage even when a reference is present.
    pub skip_schematron: bool,
    /// HTTP request timeout in seconds.
    pub timeout_seconds: u64,
    /// Number of retry attempts for failed downloads.
    pub retry_attempts: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            catalog: None,
            schematron: None,
            skip_schematron: false,
            timeout_seconds: 30,
            retry_attempts: 3,
        }
    }
}

impl PipelineConfig {
    /// Load settings from a TOML file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        if !path.is_file() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::InvalidFormat {
            details: e.to_string(),
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::InvalidFormat {
            details: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "timeout_seconds".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if let Some(catalog) = &self.catalog
            && !catalog.is_file()
        {
            return Err(ConfigError::InvalidValue {
                field: "catalog".to_string(),
                value: catalog.display().to_string(),
                reason: "file does not exist".to_string(),
            });
        }
        Ok(())
    }
}
