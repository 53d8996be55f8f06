//! The two validation engines: grammar-based (XML Schema) and rule-based
//! (Schematron).
//!
//! Both return a [`ValidationReport`] rather than mutating a collaborator:
//! violations are data the caller inspects, while conditions that make the
//! run meaningless (unreadable document, unresolvable rule schema) are hard
//! errors.

use std::path::Path;

use tracing::debug;
use url::Url;

use crate::compiler::CompiledSchema;
use crate::error::{Result, ValidationError};
use crate::http_client::{HttpClient, HttpClientConfig};
use crate::libxml2::LibXml2Wrapper;
use crate::report::ValidationReport;

/// Streams an instance document through a compiled grammar.
pub struct GrammarValidator {
    wrapper: LibXml2Wrapper,
}

impl GrammarValidator {
    pub fn new() -> Self {
        Self {
            wrapper: LibXml2Wrapper::new(),
        }
    }

    /// Validate `path` against `schema`, collecting every structural and
    /// content violation with location information.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::DocumentUnreadable`] when the document
    /// cannot be opened or is not well-formed XML; that is a property of the
    /// document itself, distinct from a validation error.
    pub fn validate(&self, path: &Path, schema: &CompiledSchema) -> Result<ValidationReport> {
        let doc = self
            .wrapper
            .read_document(path)
            .map_err(|e| ValidationError::DocumentUnreadable {
                file: path.to_path_buf(),
                details: e.to_string(),
            })?;
        debug!(path = %path.display(), "running grammar validation");
        Ok(self.wrapper.validate_document(schema.grammar(), &doc, path)?)
    }
}

impl Default for GrammarValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Evaluates a Schematron constraint schema against an instance document.
pub struct RuleValidator {
    wrapper: LibXml2Wrapper,
    http_client: HttpClient,
}

impl RuleValidator {
    pub fn new() -> Result<Self> {
        Self::with_http_config(HttpClientConfig::default())
    }

    pub fn with_http_config(config: HttpClientConfig) -> Result<Self> {
        Ok(Self {
            wrapper: LibXml2Wrapper::new(),
            http_client: HttpClient::new(config)?,
        })
    }

    /// Validate `path` against the Schematron schema at `schema_location`,
    /// evaluating all patterns (`#ALL` phase semantics). One report event is
    /// appended per failed assert or fired report.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::SchematronSchemaUnresolvable`] when the
    /// schema location cannot be dereferenced or its content is not a
    /// Schematron schema; an unloadable schema cannot meaningfully report
    /// zero violations. Returns [`ValidationError::DocumentUnreadable`] when
    /// the instance document cannot be parsed.
    pub fn validate(&self, path: &Path, schema_location: &Url) -> Result<ValidationReport> {
        let schema_data = self.dereference(schema_location)?;
        let schematron = self
            .wrapper
            .parse_schematron_from_memory(&schema_data)
            .map_err(|e| ValidationError::SchematronSchemaUnresolvable {
                location: schema_location.to_string(),
                details: e.to_string(),
            })?;

        let doc = self
            .wrapper
            .read_document(path)
            .map_err(|e| ValidationError::DocumentUnreadable {
                file: path.to_path_buf(),
                details: e.to_string(),
            })?;
        debug!(path = %path.display(), schema = %schema_location, "running rule validation");
        Ok(self.wrapper.validate_schematron(&schematron, &doc, path)?)
    }

    /// Fetch the Schematron schema content from a file or HTTP location.
    fn dereference(&self, location: &Url) -> Result<Vec<u8>> {
        match location.scheme() {
            "file" => {
                let path = location.to_file_path().map_err(|_| {
                    ValidationError::SchematronSchemaUnresolvable {
                        location: location.to_string(),
                        details: "not a local file path".to_string(),
                    }
                })?;
                std::fs::read(&path).map_err(|e| ValidationError::SchematronSchemaUnresolvable {
                    location: location.to_string(),
                    details: e.to_string(),
                })
            }
            "http" | "https" => self.http_client.fetch(location.as_str()).map_err(|e| {
                ValidationError::SchematronSchemaUnresolvable {
                    location: location.to_string(),
                    details: e.to_string(),
                }
            }),
            scheme => Err(ValidationError::SchematronSchemaUnresolvable {
                location: location.to_string(),
                details: format!("unsupported URI scheme: {}", scheme),
            }),
        }
    }
}
