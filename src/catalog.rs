//! Entity catalog registration for offline schema resolution.
//!
//! An OASIS XML catalog maps well-known namespace and system identifiers
//! (such as the GML and W3C schema namespaces) to local copies. The catalog is
//! registered with libxml2 before any schema is compiled, so compilation
//! consults the catalog first and only falls back to the network for
//! unmapped locations.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ConfigError, ConfigResult, Result};
use crate::libxml2::LibXml2Wrapper;

/// Environment variable naming one or more catalog files, honored when no
/// explicit catalog is configured (the same variable libxml2 tooling uses).
pub const CATALOG_FILES_ENV: &str = "XML_CATALOG_FILES";

/// An entity catalog to consult during schema compilation.
///
/// `Catalog::none()` is a legal state: compilation then resolves every
/// location directly.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    path: Option<PathBuf>,
}

impl Catalog {
    /// No catalog; schema locations resolve directly.
    pub fn none() -> Self {
        Self::default()
    }

    /// Use the catalog file at `path`.
    pub fn from_path(path: impl Into<PathBuf>) -> ConfigResult<Self> {
        let path = path.into();
        if !path.is_file() {
            return Err(ConfigError::FileNotFound { path });
        }
        Ok(Self { path: Some(path) })
    }

    /// Pick up a catalog from `XML_CATALOG_FILES` when one is not configured
    /// explicitly. A missing or empty variable yields `Catalog::none()`.
    pub fn discover() -> Self {
        match std::env::var(CATALOG_FILES_ENV) {
            Ok(value) if !value.trim().is_empty() => {
                // The variable may list several files; the first is enough
                // for registration, libxml2 chains the rest itself.
                let first = value.split_whitespace().next().unwrap_or_default();
                Self {
                    path: Some(PathBuf::from(first)),
                }
            }
            _ => Self::none(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_none(&self) -> bool {
        self.path.is_none()
    }

    /// Register this catalog with libxml2's default catalog list.
    ///
    /// Must happen before schema compilation for the mappings to apply.
    pub fn register(&self, wrapper: &LibXml2Wrapper) -> Result<()> {
        if let Some(path) = &self.path {
            debug!(catalog = %path.display(), "registering entity catalog");
            wrapper.load_catalog(path)?;
        }
        Ok(())
    }
}
