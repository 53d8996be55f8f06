//! Error aggregation shared by the schema compiler and both validators.
//!
//! A [`ValidationReport`] is created once per validation run, mutated only by
//! appending events, and inspected by the caller afterwards. It replaces the
//! side-effecting error-handler collaborator style of SAX-era APIs with a plain
//! return value.

use std::fmt;

/// Severity of a single validation event.
///
/// `Warning` events are recorded for reporting but do not count towards
/// [`ValidationReport::error_count`]; `Error` and `Fatal` events do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "WARNING"),
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// A single validation error or warning, with location when the reporting
/// engine provided one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationEvent {
    pub severity: Severity,
    /// 1-based line number, if known
    pub line: Option<u32>,
    /// 1-based column number, if known
    pub column: Option<u32>,
    pub message: String,
}

impl fmt::Display for ValidationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(column)) => {
                write!(
                    f,
                    "{} at line {}, column {}: {}",
                    self.severity, line, column, self.message
                )
            }
            (Some(line), None) => {
                write!(f, "{} at line {}: {}", self.severity, line, self.message)
            }
            _ => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

/// Ordered, append-only sequence of validation events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    events: Vec<ValidationEvent>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event to the report. Events are never removed.
    pub fn append(&mut self, event: ValidationEvent) {
        self.events.push(event);
    }

    /// Append an error-severity event without location information.
    pub fn append_error(&mut self, message: impl Into<String>) {
        self.append(ValidationEvent {
            severity: Severity::Error,
            line: None,
            column: None,
            message: message.into(),
        });
    }

    /// All recorded events, in the order the engines reported them.
    pub fn events(&self) -> &[ValidationEvent] {
        &self.events
    }

    /// Number of events with severity `Error` or `Fatal`.
    pub fn error_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| e.severity >= Severity::Error)
            .count()
    }

    /// True if at least one error-severity event was recorded.
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Render the report for a grammar-validation assertion failure.
    ///
    /// The leading line is used verbatim in assertion text, e.g.
    /// `2 schema validation error(s) detected`.
    pub fn render_schema_errors(&self) -> String {
        self.render("schema validation error(s) detected")
    }

    /// Render the report for a rule-validation assertion failure, e.g.
    /// `1 rule violation(s) detected`.
    pub fn render_rule_violations(&self) -> String {
        self.render("rule violation(s) detected")
    }

    fn render(&self, what: &str) -> String {
        let mut out = format!("{} {}", self.error_count(), what);
        for event in &self.events {
            out.push('\n');
            out.push_str(&event.to_string());
        }
        out
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, event) in self.events.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", event)?;
        }
        Ok(())
    }
}
