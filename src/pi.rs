//! Streaming extraction of the `xml-model` schema-association hint.
//!
//! The processing instruction must appear before the document element:
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <?xml-model href="http://www.example.org/constraints.sch"
//!             schematypens="http://purl.oclc.org/dsdl/schematron"
//!             phase="#ALL"?>
//! ```
//!
//! The scan reads the document as a token stream and stops at the root
//! element, so arbitrarily large instance documents cost only a prolog read.

use std::io::BufRead;
use std::path::Path;

use indexmap::IndexMap;
use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::warn;

/// Target name of the schema-association processing instruction.
pub const XML_MODEL_PI_TARGET: &str = "xml-model";

/// ISO Schematron namespace identifier (ISO 19757-3).
pub const SCHEMATRON_NS: &str = "http://purl.oclc.org/dsdl/schematron";

/// Pseudo-attributes extracted from an `xml-model` processing instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PiData {
    attributes: IndexMap<String, String>,
}

impl PiData {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn href(&self) -> Option<&str> {
        self.get("href")
    }

    pub fn schematypens(&self) -> Option<&str> {
        self.get("schematypens")
    }

    pub fn phase(&self) -> Option<&str> {
        self.get("phase")
    }
}

/// Scan a document for an `xml-model` hint that names a Schematron schema.
///
/// Returns `None` when no such hint exists, when the hint targets a different
/// constraint language, or when the document cannot be scanned at all. A scan
/// failure is logged and swallowed: a document that cannot even be read simply
/// has no discoverable hint.
pub fn scan_xml_model_pi(path: &Path) -> Option<PiData> {
    let reader = match Reader::from_file(path) {
        Ok(reader) => reader,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to open document for PI scan");
            return None;
        }
    };
    match scan_reader(reader) {
        Ok(data) => data,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to parse document during PI scan");
            None
        }
    }
}

/// Token-stream scan, stopping at the first matching PI or the root element.
fn scan_reader<R: BufRead>(mut reader: Reader<R>) -> quick_xml::Result<Option<PiData>> {
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::PI(pi) => {
                if pi.target() == XML_MODEL_PI_TARGET.as_bytes() {
                    let content = String::from_utf8_lossy(pi.content()).into_owned();
                    return Ok(accept_schematron_hint(parse_pseudo_attributes(&content)));
                }
            }
            // The hint is only recognized before the document element.
            Event::Start(_) | Event::Empty(_) | Event::Eof => return Ok(None),
            _ => {}
        }
        buf.clear();
    }
}

/// Keep the hint only if it names the Schematron constraint language.
///
/// A hint with some other `schematypens` (e.g. a RELAX NG association) is
/// deliberately treated as "no hint present" rather than as an error.
fn accept_schematron_hint(data: Option<PiData>) -> Option<PiData> {
    data.filter(|d| d.schematypens() == Some(SCHEMATRON_NS))
}

/// Split PI content into `name="value"` pseudo-attributes.
///
/// Returns `None` for malformed content (a pseudo-attribute without an `=`
/// part); the caller treats that the same as an absent hint.
fn parse_pseudo_attributes(content: &str) -> Option<PiData> {
    let mut attributes = IndexMap::new();
    for pseudo_attr in content.split_whitespace() {
        let mut parts = pseudo_attr.splitn(2, '=');
        let name = parts.next()?.trim();
        let value = parts.next()?;
        if name.is_empty() {
            return None;
        }
        let value = value.trim_matches(|c| c == '"' || c == '\'').trim();
        attributes.insert(name.to_string(), value.to_string());
    }
    if attributes.is_empty() {
        None
    } else {
        Some(PiData { attributes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const DOC_WITH_HINT: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<?xml-model href="./sch/simple.sch" schematypens="http://purl.oclc.org/dsdl/schematron" phase="#ALL"?>
<root><child/></root>"##;

    const DOC_WITHOUT_HINT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<root><child/></root>"#;

    const DOC_WITH_RELAXNG_HINT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<?xml-model href="doc.rnc" schematypens="http://relaxng.org/ns/structure/1.0"?>
<root/>"#;

    const DOC_WITH_HINT_AFTER_ROOT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<root>
<?xml-model href="late.sch" schematypens="http://purl.oclc.org/dsdl/schematron"?>
</root>"#;

    fn write_temp(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_extract_hint() {
        let file = write_temp(DOC_WITH_HINT);
        let data = scan_xml_model_pi(file.path()).expect("hint should be found");
        assert_eq!(data.href(), Some("./sch/simple.sch"));
        assert_eq!(data.schematypens(), Some(SCHEMATRON_NS));
        assert_eq!(data.phase(), Some("#ALL"));
    }

    #[test]
    fn test_no_hint_present() {
        let file = write_temp(DOC_WITHOUT_HINT);
        assert!(scan_xml_model_pi(file.path()).is_none());
    }

    #[test]
    fn test_non_schematron_hint_ignored() {
        let file = write_temp(DOC_WITH_RELAXNG_HINT);
        assert!(scan_xml_model_pi(file.path()).is_none());
    }

    #[test]
    fn test_hint_after_root_element_ignored() {
        let file = write_temp(DOC_WITH_HINT_AFTER_ROOT);
        assert!(scan_xml_model_pi(file.path()).is_none());
    }

    #[test]
    fn test_scan_is_idempotent() {
        let file = write_temp(DOC_WITH_HINT);
        let first = scan_xml_model_pi(file.path());
        let second = scan_xml_model_pi(file.path());
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_file_yields_none() {
        assert!(scan_xml_model_pi(Path::new("/nonexistent/doc.xml")).is_none());
    }

    #[test]
    fn test_unparseable_document_yields_none() {
        let file = write_temp("<?xml version=\"1.0\"?>\n<not <well formed");
        assert!(scan_xml_model_pi(file.path()).is_none());
    }

    #[test]
    fn test_malformed_pseudo_attribute() {
        assert!(parse_pseudo_attributes("href schematypens=\"x\"").is_none());
    }

    #[test]
    fn test_single_quoted_values() {
        let data = parse_pseudo_attributes("href='a.sch' schematypens='ns'").unwrap();
        assert_eq!(data.href(), Some("a.sch"));
        assert_eq!(data.schematypens(), Some("ns"));
    }

    #[test]
    fn test_pseudo_attribute_names_are_case_sensitive() {
        let data = parse_pseudo_attributes(r#"HREF="a.sch" schematypens="ns""#).unwrap();
        assert!(data.href().is_none());
        assert_eq!(data.get("HREF"), Some("a.sch"));
    }
}
