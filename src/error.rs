use std::path::PathBuf;

use thiserror::Error;

/// Main application error type that encompasses all fatal failure modes.
///
/// Non-fatal conditions (schema validation errors, Schematron rule violations)
/// are never surfaced through this type; they accumulate in a
/// [`ValidationReport`](crate::report::ValidationReport) and the affected
/// branch completes normally.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status error: {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Unable to determine schema location from document element: {file}")]
    MissingSchemaLocation { file: PathBuf },

    #[error("Failed to compile application schema: {details}")]
    SchemaCompileFailure { details: String },

    #[error("Unable to read instance document: {file} - {details}")]
    DocumentUnreadable { file: PathBuf, details: String },

    #[error("Unable to read Schematron schema at {location}: {details}")]
    SchematronSchemaUnresolvable { location: String, details: String },

    #[error("Invalid URI reference: {reference} - {details}")]
    InvalidReference { reference: String, details: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("LibXML2 internal error: {details}")]
    LibXml2Internal { details: String },
}

/// Configuration-specific error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid configuration format: {details}")]
    InvalidFormat { details: String },

    #[error("Invalid configuration value: {field} = {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// LibXML2-specific error types
#[derive(Error, Debug)]
pub enum LibXml2Error {
    #[error("Schema parsing failed: null pointer returned")]
    SchemaParseFailed,

    #[error("Schematron parsing failed: null pointer returned")]
    SchematronParseFailed,

    #[error("Validation context creation failed")]
    ValidationContextCreationFailed,

    #[error("Document parsing failed: {file}")]
    DocumentParseFailed { file: PathBuf },

    #[error("Validation failed with internal error code {code}: {file}")]
    ValidationFailed { code: i32, file: PathBuf },

    #[error("Catalog could not be loaded: {path}")]
    CatalogLoadFailed { path: PathBuf },

    #[error("Memory allocation failed in libxml2")]
    MemoryAllocation,
}

// Error conversion implementations
impl From<ConfigError> for ValidationError {
    fn from(err: ConfigError) -> Self {
        ValidationError::Config(err.to_string())
    }
}

impl From<LibXml2Error> for ValidationError {
    fn from(err: LibXml2Error) -> Self {
        ValidationError::LibXml2Internal {
            details: err.to_string(),
        }
    }
}

impl From<url::ParseError> for ValidationError {
    fn from(err: url::ParseError) -> Self {
        ValidationError::InvalidReference {
            reference: String::new(),
            details: err.to_string(),
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ValidationError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// LibXML2 result type alias
pub type LibXml2Result<T> = std::result::Result<T, LibXml2Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_schema_location_message() {
        let err = ValidationError::MissingSchemaLocation {
            file: PathBuf::from("/data/feature.xml"),
        };
        assert!(
            err.to_string()
                .contains("Unable to determine schema location from document element")
        );
        assert!(err.to_string().contains("feature.xml"));
    }

    #[test]
    fn test_document_unreadable_message() {
        let err = ValidationError::DocumentUnreadable {
            file: PathBuf::from("broken.xml"),
            details: "premature end of data".to_string(),
        };
        assert!(err.to_string().contains("Unable to read instance document"));
        assert!(err.to_string().contains("premature end of data"));
    }

    #[test]
    fn test_schematron_unresolvable_message() {
        let err = ValidationError::SchematronSchemaUnresolvable {
            location: "http://example.org/rules.sch".to_string(),
            details: "404 Not Found".to_string(),
        };
        assert!(err.to_string().contains("http://example.org/rules.sch"));
        assert!(err.to_string().contains("404 Not Found"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Access denied");
        let validation_error: ValidationError = io_error.into();

        match validation_error {
            ValidationError::Io(_) => (),
            _ => panic!("Expected ValidationError::Io"),
        }
    }

    #[test]
    fn test_libxml2_error_conversion() {
        let libxml2_error = LibXml2Error::SchemaParseFailed;
        let validation_error: ValidationError = libxml2_error.into();

        match validation_error {
            ValidationError::LibXml2Internal { .. } => (),
            _ => panic!("Expected ValidationError::LibXml2Internal"),
        }
    }

    #[test]
    fn test_config_error_conversion() {
        let config_error = ConfigError::InvalidValue {
            field: "timeout".to_string(),
            value: "-1".to_string(),
            reason: "must be positive".to_string(),
        };
        let validation_error: ValidationError = config_error.into();

        match validation_error {
            ValidationError::Config(msg) => assert!(msg.contains("timeout")),
            _ => panic!("Expected ValidationError::Config"),
        }
    }

    #[test]
    fn test_error_source_chain() {
        use std::error::Error;

        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let validation_error = ValidationError::Io(io_error);

        assert!(validation_error.source().is_some());
        assert_eq!(
            validation_error.source().unwrap().to_string(),
            "File not found"
        );
    }
}
