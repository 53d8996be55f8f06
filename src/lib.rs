//! Validate GML instance documents against the schemas they declare.
//!
//! A document names its own grammar: the XML Schema locations come from the
//! `xsi:schemaLocation` hints on the document element, and an optional
//! Schematron schema comes from an embedded `xml-model` processing
//! instruction or an explicit caller-supplied reference. The pipeline
//! resolves those references, compiles the schema set into one reusable
//! grammar (consulting an entity catalog for offline copies), then runs
//! grammar validation and rule validation, collecting every violation into
//! uniform reports.
//!
//! ```no_run
//! use validate_gml::config::PipelineConfig;
//! use validate_gml::pipeline::DocumentPipeline;
//!
//! # fn main() -> validate_gml::error::Result<()> {
//! let pipeline = DocumentPipeline::new(PipelineConfig::default())?;
//! let outcome = pipeline.run(std::path::Path::new("feature.xml"))?;
//! if !outcome.is_conformant() {
//!     eprintln!("{}", outcome.grammar_report.render_schema_errors());
//! }
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod cli;
pub mod compiler;
pub mod config;
pub mod context;
pub mod error;
pub mod http_client;
pub mod libxml2;
pub mod output;
pub mod pi;
pub mod pipeline;
pub mod references;
pub mod report;
pub mod validator;

pub use compiler::{CompileOutcome, CompiledSchema, SchemaCompiler};
pub use config::PipelineConfig;
pub use error::{Result, ValidationError};
pub use pipeline::{DocumentOutcome, DocumentPipeline, PipelineStage};
pub use report::{Severity, ValidationEvent, ValidationReport};
