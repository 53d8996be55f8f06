//! Resolution context for a single validation run.

use std::path::{Path, PathBuf};

use url::Url;

use crate::error::{Result, ValidationError};

/// The base URI and catalog location used to resolve references found in an
/// instance document. Immutable once constructed; each validation run builds
/// its own context.
#[derive(Debug, Clone)]
pub struct ResolutionContext {
    base: Url,
    catalog: Option<PathBuf>,
}

impl ResolutionContext {
    /// Build a context whose base URI is the location of a local document.
    ///
    /// Relative references in the document resolve against the document's own
    /// URI, so `./sch/simple.sch` next to `/data/feature.xml` becomes
    /// `file:///data/sch/simple.sch`.
    pub fn for_file(path: &Path) -> Result<Self> {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };
        let base = Url::from_file_path(&absolute).map_err(|_| ValidationError::InvalidReference {
            reference: absolute.display().to_string(),
            details: "path cannot be expressed as a file URI".to_string(),
        })?;
        Ok(Self {
            base,
            catalog: None,
        })
    }

    /// Build a context for a document retrieved from a URL.
    pub fn for_url(url: Url) -> Self {
        Self {
            base: url,
            catalog: None,
        }
    }

    /// Attach an entity catalog consulted before any network resolution.
    pub fn with_catalog(mut self, catalog: Option<PathBuf>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn catalog(&self) -> Option<&Path> {
        self.catalog.as_deref()
    }

    /// Resolve a possibly-relative reference against the base URI.
    ///
    /// Absolute references pass through unchanged; relative ones are joined
    /// using standard URI-resolution semantics.
    pub fn resolve(&self, reference: &str) -> Result<Url> {
        Url::options()
            .base_url(Some(&self.base))
            .parse(reference)
            .map_err(|e| ValidationError::InvalidReference {
                reference: reference.to_string(),
                details: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context_at(path: &str) -> ResolutionContext {
        ResolutionContext::for_file(Path::new(path)).unwrap()
    }

    #[test]
    fn test_base_from_file_path() {
        let ctx = context_at("/data/gml/feature.xml");
        assert_eq!(ctx.base().as_str(), "file:///data/gml/feature.xml");
    }

    #[test]
    fn test_resolve_relative_reference() {
        let ctx = context_at("/data/gml/feature.xml");
        let resolved = ctx.resolve("./sch/simple.sch").unwrap();
        assert_eq!(resolved.as_str(), "file:///data/gml/sch/simple.sch");
    }

    #[test]
    fn test_resolve_parent_relative_reference() {
        let ctx = context_at("/data/gml/feature.xml");
        let resolved = ctx.resolve("../schemas/feature.xsd").unwrap();
        assert_eq!(resolved.as_str(), "file:///data/schemas/feature.xsd");
    }

    #[test]
    fn test_absolute_reference_passes_through() {
        let ctx = context_at("/data/gml/feature.xml");
        let resolved = ctx.resolve("http://example.org/constraints.sch").unwrap();
        assert_eq!(resolved.as_str(), "http://example.org/constraints.sch");
    }

    #[test]
    fn test_url_base() {
        let base = Url::parse("http://example.org/data/feature.xml").unwrap();
        let ctx = ResolutionContext::for_url(base);
        let resolved = ctx.resolve("feature.xsd").unwrap();
        assert_eq!(resolved.as_str(), "http://example.org/data/feature.xsd");
    }

    #[test]
    fn test_catalog_attachment() {
        let ctx = context_at("/data/feature.xml")
            .with_catalog(Some(PathBuf::from("/opt/schemas/catalog.xml")));
        assert_eq!(ctx.catalog(), Some(Path::new("/opt/schemas/catalog.xml")));
    }
}
