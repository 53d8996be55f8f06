//! Safe wrapper around the libxml2 validation engines.
//!
//! The Rust ecosystem has no mature XML Schema or Schematron validator, so
//! both engines are driven through direct libxml2 FFI: grammar validation via
//! `xmlSchema*`, rule validation via `xmlSchematron*`. Diagnostics are
//! captured through libxml2's structured error callbacks and appended to a
//! [`ValidationReport`], preserving line/column information.
//!
//! Thread-safety notes (see <http://xmlsoft.org/threads.html>):
//! - parser/global initialization is not thread-safe and is guarded by `Once`;
//! - parsed schema structures are read-only and safe to share across threads,
//!   hence the `Arc`-backed [`XmlSchemaPtr`];
//! - every validation call creates its own validation context.

use std::ffi::{CStr, CString};
use std::marker::PhantomData;
use std::path::Path;
use std::sync::{Arc, Once};

use libc::{c_char, c_int, c_void};

use crate::error::{LibXml2Error, LibXml2Result};
use crate::report::{Severity, ValidationEvent, ValidationReport};

/// Ensures libxml2 globals are initialized exactly once.
static LIBXML2_INIT: Once = Once::new();

// Parser options for instance documents: substitute entities, no network
// access while parsing the document itself.
const XML_PARSE_NOENT: c_int = 1 << 1;
const XML_PARSE_NONET: c_int = 1 << 11;

// Route failed asserts and fired reports through the structured error
// callback instead of stderr text output (XML_SCHEMATRON_OUT_ERROR in
// schematron.h).
const XML_SCHEMATRON_OUT_ERROR: c_int = 1 << 3;

// xmlError levels
const XML_ERR_WARNING: c_int = 1;
const XML_ERR_ERROR: c_int = 2;

/// Opaque libxml2 structures
#[repr(C)]
pub struct XmlSchema {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchemaParserCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchemaValidCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlDoc {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchematron {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchematronParserCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchematronValidCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct xmlError {
    pub domain: c_int,
    pub code: c_int,
    pub message: *const c_char,
    pub level: c_int,
    pub file: *const c_char,
    pub line: c_int,
    pub str1: *const c_char,
    pub str2: *const c_char,
    pub str3: *const c_char,
    pub int1: c_int,
    pub int2: c_int,
    pub ctxt: *mut c_void,
    pub node: *mut c_void,
}

pub type XmlStructuredErrorFunc =
    Option<unsafe extern "C" fn(user_data: *mut c_void, error: *mut xmlError)>;

// External libxml2 FFI declarations
#[cfg_attr(target_os = "windows", link(name = "libxml2"))]
#[cfg_attr(not(target_os = "windows"), link(name = "xml2"))]
unsafe extern "C" {
    fn xmlInitParser();

    // Document parsing
    fn xmlReadFile(url: *const c_char, encoding: *const c_char, options: c_int) -> *mut XmlDoc;
    fn xmlFreeDoc(doc: *mut XmlDoc);

    // Entity catalog
    fn xmlLoadCatalog(filename: *const c_char) -> c_int;

    // Schema parsing
    fn xmlSchemaNewMemParserCtxt(buffer: *const c_char, size: c_int)
    -> *mut XmlSchemaParserCtxt;
    fn xmlSchemaSetParserStructuredErrors(
        ctxt: *mut XmlSchemaParserCtxt,
        serror: XmlStructuredErrorFunc,
        ctx: *mut c_void,
    );
    fn xmlSchemaParse(ctxt: *const XmlSchemaParserCtxt) -> *mut XmlSchema;
    fn xmlSchemaFreeParserCtxt(ctxt: *mut XmlSchemaParserCtxt);
    fn xmlSchemaFree(schema: *mut XmlSchema);

    // Schema validation
    fn xmlSchemaNewValidCtxt(schema: *const XmlSchema) -> *mut XmlSchemaValidCtxt;
    fn xmlSchemaFreeValidCtxt(ctxt: *mut XmlSchemaValidCtxt);
    fn xmlSchemaSetValidStructuredErrors(
        ctxt: *mut XmlSchemaValidCtxt,
        serror: XmlStructuredErrorFunc,
        ctx: *mut c_void,
    );
    fn xmlSchemaValidateDoc(ctxt: *mut XmlSchemaValidCtxt, doc: *mut XmlDoc) -> c_int;

    // Schematron parsing and validation
    fn xmlSchematronNewMemParserCtxt(
        buffer: *const c_char,
        size: c_int,
    ) -> *mut XmlSchematronParserCtxt;
    fn xmlSchematronParse(ctxt: *mut XmlSchematronParserCtxt) -> *mut XmlSchematron;
    fn xmlSchematronFreeParserCtxt(ctxt: *mut XmlSchematronParserCtxt);
    fn xmlSchematronFree(schema: *mut XmlSchematron);
    fn xmlSchematronNewValidCtxt(
        schema: *mut XmlSchematron,
        options: c_int,
    ) -> *mut XmlSchematronValidCtxt;
    fn xmlSchematronSetValidStructuredErrors(
        ctxt: *mut XmlSchematronValidCtxt,
        serror: XmlStructuredErrorFunc,
        ctx: *mut c_void,
    );
    fn xmlSchematronValidateDoc(ctxt: *mut XmlSchematronValidCtxt, doc: *mut XmlDoc) -> c_int;
    fn xmlSchematronFreeValidCtxt(ctxt: *mut XmlSchematronValidCtxt);
}

/// Callback for libxml2 to report diagnostics; appends to a ValidationReport.
unsafe extern "C" fn report_structured_error(user_data: *mut c_void, error: *mut xmlError) {
    if user_data.is_null() || error.is_null() {
        return;
    }
    let report = unsafe { &mut *(user_data as *mut ValidationReport) };

    let message = unsafe {
        let msg_ptr = (*error).message;
        if msg_ptr.is_null() {
            return;
        }
        match CStr::from_ptr(msg_ptr).to_str() {
            Ok(s) => s.trim().to_string(),
            Err(_) => return,
        }
    };

    let (level, line, column) = unsafe { ((*error).level, (*error).line, (*error).int2) };
    let severity = match level {
        XML_ERR_WARNING => Severity::Warning,
        XML_ERR_ERROR => Severity::Error,
        _ => Severity::Fatal,
    };
    report.append(ValidationEvent {
        severity,
        line: (line > 0).then_some(line as u32),
        column: (column > 0).then_some(column as u32),
        message,
    });
}

/// Thread-safe wrapper for a parsed libxml2 schema with RAII cleanup.
///
/// The grammar is reusable for any number of validation runs; clones share
/// the same underlying schema via `Arc` and the last one frees it.
#[derive(Debug)]
pub struct XmlSchemaPtr {
    inner: Arc<XmlSchemaInner>,
}

#[derive(Debug)]
struct XmlSchemaInner {
    ptr: *mut XmlSchema,
    _phantom: PhantomData<XmlSchema>,
}

// Safety: parsed xmlSchema structures are read-only after parsing and
// documented as safe to share across threads.
unsafe impl Send for XmlSchemaInner {}
unsafe impl Sync for XmlSchemaInner {}

impl XmlSchemaPtr {
    /// # Safety
    ///
    /// `ptr` must be a valid schema allocated by libxml2, owned exclusively by
    /// this wrapper, and freed nowhere else.
    unsafe fn from_raw(ptr: *mut XmlSchema) -> LibXml2Result<Self> {
        if ptr.is_null() {
            return Err(LibXml2Error::SchemaParseFailed);
        }
        Ok(XmlSchemaPtr {
            inner: Arc::new(XmlSchemaInner {
                ptr,
                _phantom: PhantomData,
            }),
        })
    }

    fn as_ptr(&self) -> *const XmlSchema {
        self.inner.ptr
    }
}

impl Clone for XmlSchemaPtr {
    fn clone(&self) -> Self {
        XmlSchemaPtr {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Drop for XmlSchemaInner {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe { xmlSchemaFree(self.ptr) };
            self.ptr = std::ptr::null_mut();
        }
    }
}

/// Owned, parsed XML document with RAII cleanup.
#[derive(Debug)]
pub struct XmlDocPtr {
    ptr: *mut XmlDoc,
}

impl XmlDocPtr {
    fn as_mut_ptr(&self) -> *mut XmlDoc {
        self.ptr
    }
}

impl Drop for XmlDocPtr {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe { xmlFreeDoc(self.ptr) };
            self.ptr = std::ptr::null_mut();
        }
    }
}

/// Owned, parsed Schematron schema with RAII cleanup.
#[derive(Debug)]
pub struct SchematronPtr {
    ptr: *mut XmlSchematron,
}

impl Drop for SchematronPtr {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe { xmlSchematronFree(self.ptr) };
            self.ptr = std::ptr::null_mut();
        }
    }
}

/// Safe access to libxml2 parsing and validation.
pub struct LibXml2Wrapper {
    _phantom: PhantomData<()>,
}

impl LibXml2Wrapper {
    /// Create a wrapper, initializing libxml2 exactly once across threads.
    pub fn new() -> Self {
        LIBXML2_INIT.call_once(|| unsafe {
            xmlInitParser();
        });
        LibXml2Wrapper {
            _phantom: PhantomData,
        }
    }

    /// Register an entity catalog with libxml2's default catalog list.
    ///
    /// Once loaded, the catalog is consulted during schema parsing before any
    /// network resolution is attempted.
    pub fn load_catalog(&self, path: &Path) -> LibXml2Result<()> {
        let c_path = path_to_cstring(path)?;
        let rc = unsafe { xmlLoadCatalog(c_path.as_ptr()) };
        if rc < 0 {
            return Err(LibXml2Error::CatalogLoadFailed {
                path: path.to_path_buf(),
            });
        }
        Ok(())
    }

    /// Parse an XML Schema from an in-memory buffer, appending compile-time
    /// diagnostics to `report`.
    ///
    /// Returns `None` when libxml2 could not produce a grammar; the report
    /// then tells the caller whether diagnostics explain the failure or the
    /// entry point was simply unreadable.
    ///
    /// Schema parsing is not thread-safe in libxml2 and must not run
    /// concurrently.
    pub fn parse_schema_from_memory(
        &self,
        schema_data: &[u8],
        report: &mut ValidationReport,
    ) -> LibXml2Result<Option<XmlSchemaPtr>> {
        unsafe {
            let parser_ctxt = xmlSchemaNewMemParserCtxt(
                schema_data.as_ptr() as *const c_char,
                schema_data.len() as c_int,
            );
            if parser_ctxt.is_null() {
                return Err(LibXml2Error::MemoryAllocation);
            }

            xmlSchemaSetParserStructuredErrors(
                parser_ctxt,
                Some(report_structured_error),
                report as *mut ValidationReport as *mut c_void,
            );

            let schema_ptr = xmlSchemaParse(parser_ctxt);
            xmlSchemaFreeParserCtxt(parser_ctxt);

            if schema_ptr.is_null() {
                return Ok(None);
            }
            XmlSchemaPtr::from_raw(schema_ptr).map(Some)
        }
    }

    /// Parse an instance document from a local path or URL.
    ///
    /// # Errors
    ///
    /// Returns `DocumentParseFailed` when the resource cannot be opened or is
    /// not well-formed XML.
    pub fn read_document(&self, path: &Path) -> LibXml2Result<XmlDocPtr> {
        let c_path = path_to_cstring(path)?;
        let doc = unsafe {
            xmlReadFile(
                c_path.as_ptr(),
                std::ptr::null(),
                XML_PARSE_NOENT | XML_PARSE_NONET,
            )
        };
        if doc.is_null() {
            return Err(LibXml2Error::DocumentParseFailed {
                file: path.to_path_buf(),
            });
        }
        Ok(XmlDocPtr { ptr: doc })
    }

    /// Validate a parsed document against a compiled grammar, collecting every
    /// violation into the returned report. The run does not stop at the first
    /// error.
    pub fn validate_document(
        &self,
        schema: &XmlSchemaPtr,
        doc: &XmlDocPtr,
        file: &Path,
    ) -> LibXml2Result<ValidationReport> {
        let mut report = ValidationReport::new();
        unsafe {
            let valid_ctxt = xmlSchemaNewValidCtxt(schema.as_ptr());
            if valid_ctxt.is_null() {
                return Err(LibXml2Error::ValidationContextCreationFailed);
            }

            xmlSchemaSetValidStructuredErrors(
                valid_ctxt,
                Some(report_structured_error),
                &mut report as *mut ValidationReport as *mut c_void,
            );

            let code = xmlSchemaValidateDoc(valid_ctxt, doc.as_mut_ptr());
            xmlSchemaFreeValidCtxt(valid_ctxt);

            if code < 0 {
                return Err(LibXml2Error::ValidationFailed {
                    code,
                    file: file.to_path_buf(),
                });
            }
        }
        Ok(report)
    }

    /// Parse a Schematron schema from an in-memory buffer.
    pub fn parse_schematron_from_memory(
        &self,
        schema_data: &[u8],
    ) -> LibXml2Result<SchematronPtr> {
        unsafe {
            let parser_ctxt = xmlSchematronNewMemParserCtxt(
                schema_data.as_ptr() as *const c_char,
                schema_data.len() as c_int,
            );
            if parser_ctxt.is_null() {
                return Err(LibXml2Error::MemoryAllocation);
            }

            let schema_ptr = xmlSchematronParse(parser_ctxt);
            xmlSchematronFreeParserCtxt(parser_ctxt);

            if schema_ptr.is_null() {
                return Err(LibXml2Error::SchematronParseFailed);
            }
            Ok(SchematronPtr { ptr: schema_ptr })
        }
    }

    /// Evaluate a Schematron schema against a parsed document.
    ///
    /// All patterns are evaluated (libxml2 has no phase selection, which
    /// matches `#ALL` semantics); each failed assert or fired report becomes
    /// one event in the returned report.
    pub fn validate_schematron(
        &self,
        schema: &SchematronPtr,
        doc: &XmlDocPtr,
        file: &Path,
    ) -> LibXml2Result<ValidationReport> {
        let mut report = ValidationReport::new();
        unsafe {
            let valid_ctxt = xmlSchematronNewValidCtxt(schema.ptr, XML_SCHEMATRON_OUT_ERROR);
            if valid_ctxt.is_null() {
                return Err(LibXml2Error::ValidationContextCreationFailed);
            }

            xmlSchematronSetValidStructuredErrors(
                valid_ctxt,
                Some(report_structured_error),
                &mut report as *mut ValidationReport as *mut c_void,
            );

            let code = xmlSchematronValidateDoc(valid_ctxt, doc.as_mut_ptr());
            xmlSchematronFreeValidCtxt(valid_ctxt);

            // The engine returns a negative code for violations reported
            // through some pattern paths, not only for internal errors. A
            // negative code with captured events is a completed run.
            if code < 0 && report.is_empty() {
                return Err(LibXml2Error::ValidationFailed {
                    code,
                    file: file.to_path_buf(),
                });
            }
        }
        Ok(report)
    }

}

impl Default for LibXml2Wrapper {
    fn default() -> Self {
        Self::new()
    }
}

fn path_to_cstring(path: &Path) -> LibXml2Result<CString> {
    let s = path.to_str().ok_or(LibXml2Error::DocumentParseFailed {
        file: path.to_path_buf(),
    })?;
    CString::new(s).map_err(|_| LibXml2Error::DocumentParseFailed {
        file: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SIMPLE_XSD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
    <xs:element name="root" type="xs:string"/>
</xs:schema>"#;

    const SIMPLE_SCH: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<sch:schema xmlns:sch="http://purl.oclc.org/dsdl/schematron">
  <sch:pattern id="root-checks">
    <sch:rule context="/root">
      <sch:assert test="@id">root must carry an id attribute</sch:assert>
    </sch:rule>
  </sch:pattern>
</sch:schema>"#;

    fn write_temp(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_schema_parsing_success() {
        let wrapper = LibXml2Wrapper::new();
        let mut report = ValidationReport::new();
        let schema = wrapper
            .parse_schema_from_memory(SIMPLE_XSD.as_bytes(), &mut report)
            .unwrap();
        assert!(schema.is_some());
        assert!(!report.has_errors());
    }

    #[test]
    fn test_schema_parsing_invalid_schema_collects_diagnostics() {
        let wrapper = LibXml2Wrapper::new();
        let mut report = ValidationReport::new();
        let schema = wrapper
            .parse_schema_from_memory(b"<invalid>not a schema</invalid>", &mut report)
            .unwrap();
        assert!(schema.is_none());
        assert!(report.has_errors());
    }

    #[test]
    fn test_validate_valid_document() {
        let wrapper = LibXml2Wrapper::new();
        let mut report = ValidationReport::new();
        let schema = wrapper
            .parse_schema_from_memory(SIMPLE_XSD.as_bytes(), &mut report)
            .unwrap()
            .unwrap();

        let doc_file = write_temp(r#"<?xml version="1.0"?><root>Hello</root>"#);
        let doc = wrapper.read_document(doc_file.path()).unwrap();
        let result = wrapper
            .validate_document(&schema, &doc, doc_file.path())
            .unwrap();
        assert!(!result.has_errors());
    }

    #[test]
    fn test_validate_invalid_document_collects_errors() {
        let wrapper = LibXml2Wrapper::new();
        let mut report = ValidationReport::new();
        let schema = wrapper
            .parse_schema_from_memory(SIMPLE_XSD.as_bytes(), &mut report)
            .unwrap()
            .unwrap();

        let doc_file = write_temp(r#"<?xml version="1.0"?><wrong/>"#);
        let doc = wrapper.read_document(doc_file.path()).unwrap();
        let result = wrapper
            .validate_document(&schema, &doc, doc_file.path())
            .unwrap();
        assert!(result.has_errors());
        assert!(result.events()[0].line.is_some());
    }

    #[test]
    fn test_read_document_not_well_formed() {
        let wrapper = LibXml2Wrapper::new();
        let doc_file = write_temp("<root><unclosed></root>");
        let result = wrapper.read_document(doc_file.path());
        assert!(matches!(
            result,
            Err(LibXml2Error::DocumentParseFailed { .. })
        ));
    }

    #[test]
    fn test_read_document_missing_file() {
        let wrapper = LibXml2Wrapper::new();
        let result = wrapper.read_document(Path::new("/nonexistent/doc.xml"));
        assert!(matches!(
            result,
            Err(LibXml2Error::DocumentParseFailed { .. })
        ));
    }

    #[test]
    fn test_schematron_parse_and_violation() {
        let wrapper = LibXml2Wrapper::new();
        let schematron = wrapper
            .parse_schematron_from_memory(SIMPLE_SCH.as_bytes())
            .unwrap();

        let doc_file = write_temp(r#"<?xml version="1.0"?><root>no id here</root>"#);
        let doc = wrapper.read_document(doc_file.path()).unwrap();
        let result = wrapper
            .validate_schematron(&schematron, &doc, doc_file.path())
            .unwrap();
        assert_eq!(result.error_count(), 1);
        assert!(result.events()[0].message.contains("id"));
    }

    #[test]
    fn test_schematron_pass() {
        let wrapper = LibXml2Wrapper::new();
        let schematron = wrapper
            .parse_schematron_from_memory(SIMPLE_SCH.as_bytes())
            .unwrap();

        let doc_file = write_temp(r#"<?xml version="1.0"?><root id="r1">ok</root>"#);
        let doc = wrapper.read_document(doc_file.path()).unwrap();
        let result = wrapper
            .validate_schematron(&schematron, &doc, doc_file.path())
            .unwrap();
        assert!(!result.has_errors());
    }

    #[test]
    fn test_schematron_anonymous_pattern_violation_is_not_an_internal_error() {
        // Patterns without an id make xmlSchematronValidateDoc return a
        // negative code even though the asserts were evaluated and reported.
        let wrapper = LibXml2Wrapper::new();
        let schematron = wrapper
            .parse_schematron_from_memory(
                br#"<?xml version="1.0" encoding="UTF-8"?>
<sch:schema xmlns:sch="http://purl.oclc.org/dsdl/schematron">
  <sch:pattern>
    <sch:rule context="/root">
      <sch:assert test="@id">root must carry an id attribute</sch:assert>
    </sch:rule>
  </sch:pattern>
</sch:schema>"#,
            )
            .unwrap();

        let doc_file = write_temp(r#"<?xml version="1.0"?><root>no id</root>"#);
        let doc = wrapper.read_document(doc_file.path()).unwrap();
        let result = wrapper
            .validate_schematron(&schematron, &doc, doc_file.path())
            .unwrap();
        assert_eq!(result.error_count(), 1);
    }

    #[test]
    fn test_schematron_parse_failure() {
        let wrapper = LibXml2Wrapper::new();
        let result = wrapper.parse_schematron_from_memory(b"<not-schematron/>");
        assert!(result.is_err());
    }

    #[test]
    fn test_schema_ptr_cloning_shares_grammar() {
        let wrapper = LibXml2Wrapper::new();
        let mut report = ValidationReport::new();
        let schema = wrapper
            .parse_schema_from_memory(SIMPLE_XSD.as_bytes(), &mut report)
            .unwrap()
            .unwrap();
        let cloned = schema.clone();
        assert_eq!(schema.as_ptr(), cloned.as_ptr());
    }
}
