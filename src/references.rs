//! Resolution of schema references declared by an instance document.
//!
//! Two independent discovery paths feed the pipeline:
//!
//! - XML Schema locations come from the `xsi:schemaLocation` /
//!   `xsi:noNamespaceSchemaLocation` attributes on the document element. Only
//!   the root element's attributes are read; the scan stops there.
//! - A Schematron reference comes from an embedded `xml-model` hint (see
//!   [`crate::pi`]) or from an explicit caller-supplied reference, the hint
//!   taking precedence.

use std::io::BufRead;
use std::path::Path;

use indexmap::IndexMap;
use quick_xml::NsReader;
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use tracing::warn;
use url::Url;

use crate::context::ResolutionContext;
use crate::error::{Result, ValidationError};
use crate::pi::scan_xml_model_pi;

/// XML Schema instance namespace, binding `xsi:schemaLocation`.
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// A single schema location declared by a document, absolute after resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaReference {
    /// Target namespace the schema governs; `None` for a no-namespace schema.
    pub namespace: Option<String>,
    pub location: Url,
}

/// The set of schema references declared by a document, unique by namespace.
///
/// An empty set is a valid-but-unsatisfiable state; the resolver reports it as
/// a missing schema location rather than returning it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaReferenceSet {
    references: IndexMap<Option<String>, Url>,
}

impl SchemaReferenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a reference; a later location for the same namespace wins.
    pub fn insert(&mut self, namespace: Option<String>, location: Url) {
        self.references.insert(namespace, location);
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = SchemaReference> + '_ {
        self.references.iter().map(|(namespace, location)| SchemaReference {
            namespace: namespace.clone(),
            location: location.clone(),
        })
    }

    pub fn locations(&self) -> impl Iterator<Item = &Url> {
        self.references.values()
    }
}

/// Extract the XML Schema references declared on the document element,
/// resolving each location against the context base URI.
///
/// # Errors
///
/// Returns [`ValidationError::MissingSchemaLocation`] when the document
/// declares no schema location hints or its root element cannot be read.
pub fn resolve_xsd_references(
    path: &Path,
    context: &ResolutionContext,
) -> Result<SchemaReferenceSet> {
    let reader = match NsReader::from_file(path) {
        Ok(reader) => reader,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to open document");
            return Err(ValidationError::MissingSchemaLocation {
                file: path.to_path_buf(),
            });
        }
    };

    let hints = match read_root_location_hints(reader) {
        Ok(hints) => hints,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read document element");
            return Err(ValidationError::MissingSchemaLocation {
                file: path.to_path_buf(),
            });
        }
    };

    let mut references = SchemaReferenceSet::new();
    for (namespace, location) in hints {
        references.insert(namespace, context.resolve(&location)?);
    }
    if references.is_empty() {
        return Err(ValidationError::MissingSchemaLocation {
            file: path.to_path_buf(),
        });
    }
    Ok(references)
}

/// Resolve the Schematron schema reference for a document.
///
/// Precedence: an embedded `xml-model` hint wins over the explicit reference;
/// with neither present the result is `None`, which callers treat as "no
/// supplementary constraints to check", not as an error.
pub fn resolve_schematron_reference(
    explicit: Option<&Url>,
    path: &Path,
    context: &ResolutionContext,
) -> Result<Option<Url>> {
    if let Some(pi_data) = scan_xml_model_pi(path) {
        match pi_data.href() {
            Some(href) => return context.resolve(href).map(Some),
            None => {
                warn!(path = %path.display(), "xml-model hint has no href pseudo-attribute");
            }
        }
    }
    Ok(explicit.cloned())
}

/// Raw (namespace, location) pairs from the root element attributes, in
/// declaration order, locations not yet resolved.
fn read_root_location_hints<R: BufRead>(
    mut reader: NsReader<R>,
) -> quick_xml::Result<Vec<(Option<String>, String)>> {
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(element) | Event::Empty(element) => {
                let mut hints = Vec::new();
                for attr in element.attributes().with_checks(false) {
                    let attr = attr.map_err(quick_xml::Error::InvalidAttr)?;
                    let (ns, local) = reader.resolve_attribute(attr.key);
                    if !matches!(ns, ResolveResult::Bound(Namespace(ns)) if ns == XSI_NS.as_bytes())
                    {
                        continue;
                    }
                    let value = attr.unescape_value()?;
                    match local.as_ref() {
                        b"schemaLocation" => hints.extend(parse_schema_location_pairs(&value)),
                        b"noNamespaceSchemaLocation" => {
                            hints.push((None, value.trim().to_string()));
                        }
                        _ => {}
                    }
                }
                return Ok(hints);
            }
            Event::Eof => return Ok(Vec::new()),
            _ => {}
        }
        buf.clear();
    }
}

/// Split an `xsi:schemaLocation` value into (namespace, location) pairs.
///
/// The attribute value is a whitespace-separated list alternating namespace
/// URIs and schema locations; a dangling namespace with no location is
/// dropped with a warning.
fn parse_schema_location_pairs(value: &str) -> Vec<(Option<String>, String)> {
    let mut pairs = Vec::new();
    let mut tokens = value.split_whitespace();
    while let Some(namespace) = tokens.next() {
        match tokens.next() {
            Some(location) => pairs.push((Some(namespace.to_string()), location.to_string())),
            None => {
                warn!(namespace, "xsi:schemaLocation has a namespace without a location");
            }
        }
    }
    pairs
}
