//! Output formatting for pipeline outcomes.

use atty;

use crate::cli::VerbosityLevel;
use crate::pipeline::{DocumentOutcome, PipelineStage};

/// Human-readable formatter for validation outcomes
pub struct Output {
    verbosity: VerbosityLevel,
    show_colors: bool,
}

impl Output {
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            show_colors: atty::is(atty::Stream::Stdout),
        }
    }

    #[cfg(test)]
    fn plain(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            show_colors: false,
        }
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    pub fn format_outcome(&self, outcome: &DocumentOutcome) -> String {
        let mut output = String::new();

        match self.verbosity {
            VerbosityLevel::Quiet => {
                if !outcome.is_conformant() {
                    output.push_str(&format!("Errors: {}\n", outcome.total_error_count()));
                }
            }
            VerbosityLevel::Normal | VerbosityLevel::Verbose => {
                output.push_str(&self.format_verdict(outcome));
                output.push('\n');

                if outcome.compile_report.has_errors() {
                    output.push_str(&format!(
                        "Schema compile diagnostics:\n{}\n",
                        outcome.compile_report
                    ));
                }
                if outcome.grammar_report.has_errors() || self.verbosity >= VerbosityLevel::Verbose
                {
                    output.push_str(&outcome.grammar_report.render_schema_errors());
                    output.push('\n');
                }
                if outcome.stage >= PipelineStage::RuleChecked
                    && (outcome.rule_report.has_errors()
                        || self.verbosity >= VerbosityLevel::Verbose)
                {
                    output.push_str(&outcome.rule_report.render_rule_violations());
                    output.push('\n');
                }
                if self.verbosity >= VerbosityLevel::Verbose {
                    output.push_str(&self.format_details(outcome));
                }
            }
        }

        output
    }

    fn format_verdict(&self, outcome: &DocumentOutcome) -> String {
        if outcome.is_conformant() {
            format!(
                "{}  {}",
                self.colorize("✓ CONFORMANT", "32"),
                outcome.subject.display()
            )
        } else {
            format!(
                "{}  {} - {} error{}",
                self.colorize("✗ NOT CONFORMANT", "31"),
                outcome.subject.display(),
                outcome.total_error_count(),
                if outcome.total_error_count() == 1 {
                    ""
                } else {
                    "s"
                }
            )
        }
    }

    fn format_details(&self, outcome: &DocumentOutcome) -> String {
        let mut output = String::new();
        output.push_str("\nDiscovered schemas:\n");
        for reference in outcome.references.iter() {
            match &reference.namespace {
                Some(namespace) => {
                    output.push_str(&format!("  {} -> {}\n", namespace, reference.location));
                }
                None => output.push_str(&format!("  (no namespace) -> {}\n", reference.location)),
            }
        }
        match &outcome.schematron {
            Some(schematron) => {
                output.push_str(&format!("Schematron schema: {}\n", schematron));
            }
            None => output.push_str("Schematron schema: none\n"),
        }
        if !outcome.compile_report.is_empty() {
            output.push_str(&format!(
                "Compile diagnostics: {}\n",
                outcome.compile_report.error_count()
            ));
        }
        output
    }
}
