//! Compilation of a schema reference set into a single reusable grammar.
//!
//! A GML document typically references several interdependent schema
//! documents. They are compiled together by synthesizing a driver schema that
//! imports every referenced location, then handing the driver to libxml2 with
//! the entity catalog registered, so well-known namespaces resolve to local
//! copies before any network fetch.
//!
//! Compile-time diagnostics are data, not failures: the outcome carries a
//! report the caller inspects, and a grammar is returned best-effort even
//! when individual schema documents had errors. Only an unreachable entry
//! point is a hard error.

use tracing::debug;
use url::Url;

use crate::catalog::Catalog;
use crate::error::{Result, ValidationError};
use crate::libxml2::{LibXml2Wrapper, XmlSchemaPtr};
use crate::references::SchemaReferenceSet;
use crate::report::ValidationReport;

/// An opaque, reusable validation grammar.
///
/// Owned by the caller that requested compilation; cloning shares the
/// underlying grammar, which is safe for read-only validation reuse.
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    grammar: XmlSchemaPtr,
}

impl CompiledSchema {
    pub(crate) fn grammar(&self) -> &XmlSchemaPtr {
        &self.grammar
    }
}

/// Result of a compile call: a best-effort grammar plus the diagnostics
/// collected while building it.
#[derive(Debug)]
pub struct CompileOutcome {
    /// The compiled grammar; `None` when diagnostics prevented libxml2 from
    /// producing one at all.
    pub schema: Option<CompiledSchema>,
    /// Compile-time diagnostics, inspectable by count and message.
    pub report: ValidationReport,
}

/// Catalog-aware XML Schema compiler.
pub struct SchemaCompiler {
    wrapper: LibXml2Wrapper,
    catalog: Catalog,
}

impl SchemaCompiler {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            wrapper: LibXml2Wrapper::new(),
            catalog,
        }
    }

    /// Compile all referenced schema documents into one grammar.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::SchemaCompileFailure`] when the reference
    /// set is empty or no referenced schema document is reachable at all.
    /// In-schema errors are not fatal; they land in the outcome's report.
    pub fn compile(&self, references: &SchemaReferenceSet) -> Result<CompileOutcome> {
        if references.is_empty() {
            return Err(ValidationError::SchemaCompileFailure {
                details: "no schema references to compile".to_string(),
            });
        }
        if !references.locations().any(location_is_reachable) {
            return Err(ValidationError::SchemaCompileFailure {
                details: format!(
                    "no schema document is reachable among: {}",
                    join_locations(references)
                ),
            });
        }

        self.catalog.register(&self.wrapper)?;

        let driver = compose_driver_schema(references);
        debug!(locations = %join_locations(references), "compiling schema set");

        let mut report = ValidationReport::new();
        let grammar = self
            .wrapper
            .parse_schema_from_memory(driver.as_bytes(), &mut report)?;

        match grammar {
            Some(grammar) => Ok(CompileOutcome {
                schema: Some(CompiledSchema { grammar }),
                report,
            }),
            None if report.is_empty() => Err(ValidationError::SchemaCompileFailure {
                details: format!(
                    "schema entry point could not be read: {}",
                    join_locations(references)
                ),
            }),
            None => Ok(CompileOutcome {
                schema: None,
                report,
            }),
        }
    }
}

/// Build a driver schema document importing every referenced location.
///
/// References with a namespace become `xs:import`; a no-namespace reference
/// becomes `xs:include` (the driver itself declares no target namespace).
fn compose_driver_schema(references: &SchemaReferenceSet) -> String {
    let mut driver = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <xs:schema xmlns:xs=\"http://www.w3.org/2001/XMLSchema\" \
         elementFormDefault=\"qualified\">\n",
    );
    for reference in references.iter() {
        match &reference.namespace {
            Some(namespace) => {
                driver.push_str(&format!(
                    "  <xs:import namespace=\"{}\" schemaLocation=\"{}\"/>\n",
                    escape_attribute(namespace),
                    escape_attribute(reference.location.as_str())
                ));
            }
            None => {
                driver.push_str(&format!(
                    "  <xs:include schemaLocation=\"{}\"/>\n",
                    escape_attribute(reference.location.as_str())
                ));
            }
        }
    }
    driver.push_str("</xs:schema>\n");
    driver
}

/// Cheap reachability probe. Only file URLs can be checked without a fetch;
/// remote locations are assumed reachable and left to libxml2 (which consults
/// the catalog first).
fn location_is_reachable(location: &Url) -> bool {
    match location.scheme() {
        "file" => location
            .to_file_path()
            .map(|path| path.is_file())
            .unwrap_or(false),
        _ => true,
    }
}

fn join_locations(references: &SchemaReferenceSet) -> String {
    references
        .locations()
        .map(Url::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const APP_XSD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
           xmlns:app="http://example.org/app"
           targetNamespace="http://example.org/app"
           elementFormDefault="qualified">
  <xs:element name="Collection">
    <xs:complexType>
      <xs:sequence>
        <xs:element name="count" type="xs:integer" maxOccurs="unbounded"/>
      </xs:sequence>
    </xs:complexType>
  </xs:element>
</xs:schema>"#;

    fn schema_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        let mut file = std::fs::File::create(dir.path().join("app.xsd")).unwrap();
        file.write_all(APP_XSD.as_bytes()).unwrap();
        dir
    }

    fn reference_set(dir: &TempDir, name: &str) -> SchemaReferenceSet {
        let mut refs = SchemaReferenceSet::new();
        refs.insert(
            Some("http://example.org/app".to_string()),
            Url::from_file_path(dir.path().join(name)).unwrap(),
        );
        refs
    }

    #[test]
    fn test_compile_valid_schema() {
        let dir = schema_dir();
        let compiler = SchemaCompiler::new(Catalog::none());
        let outcome = compiler.compile(&reference_set(&dir, "app.xsd")).unwrap();
        assert!(outcome.schema.is_some());
        assert!(!outcome.report.has_errors());
    }

    #[test]
    fn test_compile_empty_reference_set() {
        let compiler = SchemaCompiler::new(Catalog::none());
        let err = compiler.compile(&SchemaReferenceSet::new()).unwrap_err();
        assert!(matches!(err, ValidationError::SchemaCompileFailure { .. }));
    }

    #[test]
    fn test_compile_unreachable_entry_point() {
        let dir = schema_dir();
        let compiler = SchemaCompiler::new(Catalog::none());
        let err = compiler
            .compile(&reference_set(&dir, "missing.xsd"))
            .unwrap_err();
        match err {
            ValidationError::SchemaCompileFailure { details } => {
                assert!(details.contains("missing.xsd"));
            }
            other => panic!("Expected SchemaCompileFailure, got {:?}", other),
        }
    }

    #[test]
    fn test_compile_broken_schema_collects_diagnostics() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("broken.xsd"),
            r#"<?xml version="1.0"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
           targetNamespace="http://example.org/app">
  <xs:element name="Collection" type="app:NoSuchType"/>
</xs:schema>"#,
        )
        .unwrap();

        let compiler = SchemaCompiler::new(Catalog::none());
        let outcome = compiler
            .compile(&reference_set(&dir, "broken.xsd"))
            .unwrap();
        assert!(outcome.report.has_errors());
    }

    #[test]
    fn test_compiled_schema_is_reusable() {
        let dir = schema_dir();
        let compiler = SchemaCompiler::new(Catalog::none());
        let outcome = compiler.compile(&reference_set(&dir, "app.xsd")).unwrap();
        let schema = outcome.schema.unwrap();
        let reuse = schema.clone();
        // Both handles refer to the same grammar
        drop(schema);
        drop(reuse);
    }

    #[test]
    fn test_driver_schema_shape() {
        let mut refs = SchemaReferenceSet::new();
        refs.insert(
            Some("http://example.org/app".to_string()),
            Url::parse("http://example.org/app.xsd").unwrap(),
        );
        refs.insert(None, Url::parse("file:///data/local.xsd").unwrap());

        let driver = compose_driver_schema(&refs);
        assert!(driver.contains(
            r#"<xs:import namespace="http://example.org/app" schemaLocation="http://example.org/app.xsd"/>"#
        ));
        assert!(driver.contains(r#"<xs:include schemaLocation="file:///data/local.xsd"/>"#));
    }
}
