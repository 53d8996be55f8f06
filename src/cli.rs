use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

use crate::config::PipelineConfig;
use crate::error::{ConfigResult, Result};

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Only show critical errors
    Quiet,
    /// Show standard information
    #[default]
    Normal,
    /// Show detailed information
    Verbose,
}

/// Validate GML instance documents against their application schemas and
/// Schematron constraints
#[derive(Parser, Debug, Clone)]
#[command(name = "validate-gml")]
#[command(about = "Validate a GML document against its XML Schemas and Schematron constraints")]
#[command(version)]
pub struct Cli {
    /// Document to validate (local path or http(s) URL)
    #[arg(help = "GML instance document to validate")]
    pub subject: String,

    /// Schematron schema to apply (an embedded xml-model hint in the
    /// document takes precedence)
    #[arg(short = 's', long = "schematron")]
    pub schematron: Option<Url>,

    /// Entity catalog file for offline schema resolution
    #[arg(short = 'c', long = "catalog")]
    pub catalog: Option<PathBuf>,

    /// Skip the Schematron rule check entirely
    #[arg(long = "skip-schematron", conflicts_with = "schematron")]
    pub skip_schematron: bool,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", help = "Enable verbose output")]
    pub verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Quiet mode",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,

    /// HTTP request timeout in seconds
    #[arg(long = "timeout")]
    pub timeout: Option<u64>,

    /// Number of retry attempts for failed downloads
    #[arg(long = "retry-attempts")]
    pub retry_attempts: Option<u32>,

    /// Read defaults from a TOML configuration file; explicit flags win
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }

    /// The subject parsed as a remote URL; `None` for local paths.
    pub fn subject_url(&self) -> Option<Url> {
        match Url::parse(&self.subject) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url),
            _ => None,
        }
    }

    /// Merge file-based defaults with command-line overrides.
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_file(path)?,
            None => PipelineConfig::default(),
        };
        if self.schematron.is_some() {
            config.schematron = self.schematron.clone();
        }
        if self.catalog.is_some() {
            config.catalog = self.catalog.clone();
        }
        if self.skip_schematron {
            config.skip_schematron = true;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_seconds = timeout;
        }
        if let Some(retry_attempts) = self.retry_attempts {
            config.retry_attempts = retry_attempts;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.subject_url().is_none() && !PathBuf::from(&self.subject).exists() {
            return Err(crate::error::ConfigError::InvalidValue {
                field: "subject".to_string(),
                value: self.subject.clone(),
                reason: "file does not exist".to_string(),
            });
        }
        Ok(())
    }
}
