//! The validation pipeline: discovery, compilation, grammar check, rule check.
//!
//! Stages run strictly in order and each later stage consumes the previous
//! stage's output. Discovery and compilation failures abort the run; the two
//! validation stages never abort on violations, they collect them into the
//! outcome's reports. The rule check stage is skipped entirely when no
//! Schematron reference is found.

use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};
use url::Url;

use crate::catalog::Catalog;
use crate::compiler::SchemaCompiler;
use crate::config::PipelineConfig;
use crate::context::ResolutionContext;
use crate::error::Result;
use crate::http_client::{HttpClient, HttpClientConfig};
use crate::references::{
    SchemaReferenceSet, resolve_schematron_reference, resolve_xsd_references,
};
use crate::report::ValidationReport;
use crate::validator::{GrammarValidator, RuleValidator};

/// How far a document made it through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineStage {
    NotValidated,
    SchemaDiscovered,
    SchemaCompiled,
    GrammarChecked,
    RuleChecked,
}

/// Everything a single pipeline run produced.
#[derive(Debug)]
pub struct DocumentOutcome {
    /// The document that was validated.
    pub subject: PathBuf,
    /// The last stage that completed.
    pub stage: PipelineStage,
    /// Schema references discovered on the document element.
    pub references: SchemaReferenceSet,
    /// Schematron reference in effect, if any.
    pub schematron: Option<Url>,
    /// Diagnostics collected while compiling the schema set.
    pub compile_report: ValidationReport,
    /// Grammar validation errors.
    pub grammar_report: ValidationReport,
    /// Rule validation errors; empty when the stage was skipped.
    pub rule_report: ValidationReport,
}

impl DocumentOutcome {
    /// A document conforms when the validation stages ran to completion, no
    /// stage collected an error, and its declared schema set compiled
    /// cleanly. A document referencing broken schemas cannot demonstrate
    /// conformance even when a best-effort grammar accepted it.
    pub fn is_conformant(&self) -> bool {
        self.stage >= PipelineStage::GrammarChecked
            && !self.compile_report.has_errors()
            && !self.grammar_report.has_errors()
            && !self.rule_report.has_errors()
    }

    pub fn total_error_count(&self) -> usize {
        self.compile_report.error_count()
            + self.grammar_report.error_count()
            + self.rule_report.error_count()
    }
}

/// Runs documents through the full validation sequence.
///
/// The pipeline holds no per-document state; one instance can validate many
/// documents in sequence, though each `run` call compiles the schema set
/// fresh since different documents may reference different schemas.
pub struct DocumentPipeline {
    config: PipelineConfig,
    http_client: HttpClient,
    grammar_validator: GrammarValidator,
    rule_validator: RuleValidator,
}

impl DocumentPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let http_config = HttpClientConfig {
            timeout_seconds: config.timeout_seconds,
            retry_attempts: config.retry_attempts,
            ..HttpClientConfig::default()
        };
        Ok(Self {
            http_client: HttpClient::new(http_config.clone())?,
            grammar_validator: GrammarValidator::new(),
            rule_validator: RuleValidator::with_http_config(http_config)?,
            config,
        })
    }

    /// Validate a local document.
    pub fn run(&self, subject: &Path) -> Result<DocumentOutcome> {
        let context = ResolutionContext::for_file(subject)?
            .with_catalog(self.config.catalog.clone());
        self.run_with_context(subject, &context)
    }

    /// Fetch a remote document to a temporary file and validate it. Relative
    /// references inside the document resolve against its original URL, not
    /// the temporary location.
    pub fn run_url(&self, subject: &Url) -> Result<DocumentOutcome> {
        let temp = self.dereference_subject(subject)?;
        let context = ResolutionContext::for_url(subject.clone())
            .with_catalog(self.config.catalog.clone());
        self.run_with_context(temp.path(), &context)
    }

    fn run_with_context(
        &self,
        subject: &Path,
        context: &ResolutionContext,
    ) -> Result<DocumentOutcome> {
        let mut outcome = DocumentOutcome {
            subject: subject.to_path_buf(),
            stage: PipelineStage::NotValidated,
            references: SchemaReferenceSet::new(),
            schematron: None,
            compile_report: ValidationReport::new(),
            grammar_report: ValidationReport::new(),
            rule_report: ValidationReport::new(),
        };

        // Discovery
        outcome.references = resolve_xsd_references(subject, context)?;
        outcome.schematron = if self.config.skip_schematron {
            None
        } else {
            resolve_schematron_reference(self.config.schematron.as_ref(), subject, context)?
        };
        outcome.stage = PipelineStage::SchemaDiscovered;
        debug!(
            subject = %subject.display(),
            schemas = outcome.references.len(),
            schematron = outcome.schematron.is_some(),
            "discovered schema references"
        );

        // Compilation
        let catalog = match &self.config.catalog {
            Some(path) => Catalog::from_path(path)?,
            None => Catalog::discover(),
        };
        let compiled = SchemaCompiler::new(catalog).compile(&outcome.references)?;
        outcome.compile_report = compiled.report;
        outcome.stage = PipelineStage::SchemaCompiled;

        // Grammar check. A missing grammar still completes the stage: the
        // compile diagnostics explain why nothing could be streamed, and they
        // already count against conformance.
        if let Some(schema) = &compiled.schema {
            outcome.grammar_report = self.grammar_validator.validate(subject, schema)?;
        }
        outcome.stage = PipelineStage::GrammarChecked;

        // Rule check, only when a reference is in effect
        if let Some(schematron) = &outcome.schematron {
            outcome.rule_report = self.rule_validator.validate(subject, schematron)?;
            outcome.stage = PipelineStage::RuleChecked;
        }

        info!(
            subject = %subject.display(),
            stage = ?outcome.stage,
            errors = outcome.total_error_count(),
            "pipeline finished"
        );
        Ok(outcome)
    }

    fn dereference_subject(&self, subject: &Url) -> Result<NamedTempFile> {
        debug!(subject = %subject, "dereferencing remote document");
        self.http_client.dereference_to_file(subject.as_str())
    }
}
