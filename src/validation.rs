//! Structural validation reporting
//!
//! Validation is advisory: it never stops a pass. The registry folds every
//! collector's structural check plus its own cross-fragment checks into one
//! report, and `is_valid` answers whether anything error-level surfaced.

use serde::Serialize;

/// Severity of a validation issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationLevel {
    /// Informational note
    Info,
    /// Suspicious but usable
    Warning,
    /// Structurally broken
    Error,
}

/// One finding from a structural check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    /// Severity
    pub level: ValidationLevel,
    /// Collector the finding concerns
    pub collector: String,
    /// What was found
    pub message: String,
}

/// Accumulated findings from one validation run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    /// Findings in discovery order
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finding
    pub fn add(&mut self, level: ValidationLevel, collector: &str, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            level,
            collector: collector.to_string(),
            message: message.into(),
        });
    }

    /// Whether nothing error-level was found
    pub fn is_valid(&self) -> bool {
        !self
            .issues
            .iter()
            .any(|issue| issue.level == ValidationLevel::Error)
    }

    /// Error-level findings
    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(|issue| issue.level == ValidationLevel::Error)
    }

    /// Warning-level findings
    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(|issue| issue.level == ValidationLevel::Warning)
    }
}
