//! Validation reports, run options and violation helpers.
//!
//! Every validator in the workspace reports violations as strings formatted
//! `"<SEVERITY>: <message>"`. The helpers here build and classify those
//! strings so that callers never have to parse prefixes by hand.

use crate::Severity;
use std::collections::HashMap;

/// Formats a violation string.
///
/// ```rust
/// use contracts_core::{format_violation, Severity};
///
/// assert_eq!(format_violation(Severity::Warn, "late data"), "WARN: late data");
/// ```
pub fn format_violation(severity: Severity, message: impl AsRef<str>) -> String {
    format!("{}: {}", severity, message.as_ref())
}

/// Returns the severity prefix of a violation string, if it has one.
pub fn violation_severity(violation: &str) -> Option<Severity> {
    if violation.starts_with("ERROR") {
        Some(Severity::Error)
    } else if violation.starts_with("WARN") {
        Some(Severity::Warn)
    } else {
        None
    }
}

/// Returns true if the violation blocks a run.
pub fn is_error(violation: &str) -> bool {
    violation_severity(violation) == Some(Severity::Error)
}

/// Context for validation operations.
///
/// Provides the options a caller controls per run: strictness, schema-only
/// mode, severity overrides and an optional row sample.
#[derive(Debug, Default, Clone)]
pub struct ValidationContext {
    /// Promote warnings to errors
    pub strict: bool,

    /// Validate schema only (skip quality, SLA, distribution and custom rules)
    pub schema_only: bool,

    /// Maximum number of rows to sample before validating
    pub sample_size: Option<usize>,

    /// Seed used when sampling
    pub sample_seed: Option<u64>,

    /// Severity overrides keyed by `field.rule` (case-insensitive)
    pub severity_overrides: HashMap<String, Severity>,

    /// Additional metadata for the validation
    pub metadata: HashMap<String, String>,
}

impl ValidationContext {
    /// Creates a new validation context with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets strict validation mode.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Sets schema-only validation mode.
    pub fn with_schema_only(mut self, schema_only: bool) -> Self {
        self.schema_only = schema_only;
        self
    }

    /// Sets the sample size for quality checks.
    pub fn with_sample_size(mut self, size: usize) -> Self {
        self.sample_size = Some(size);
        self
    }

    /// Sets the seed used for sampling.
    pub fn with_sample_seed(mut self, seed: u64) -> Self {
        self.sample_seed = Some(seed);
        self
    }

    /// Overrides the severity of one `field.rule` pair.
    pub fn with_severity_override(mut self, key: impl AsRef<str>, severity: Severity) -> Self {
        self.severity_overrides
            .insert(key.as_ref().to_lowercase(), severity);
        self
    }

    /// Adds metadata to the context.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Report of validation results.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    /// Whether validation passed overall
    pub passed: bool,

    /// ERROR-severity violations
    pub errors: Vec<String>,

    /// WARN-severity violations
    pub warnings: Vec<String>,

    /// Validation statistics
    pub stats: ValidationStats,
}

/// Statistics about validation execution.
#[derive(Debug, Clone, Default)]
pub struct ValidationStats {
    /// Number of records validated
    pub records_validated: usize,

    /// Number of chunks consumed
    pub chunks_processed: usize,

    /// Number of fields checked
    pub fields_checked: usize,

    /// Validation duration in milliseconds
    pub duration_ms: u64,
}

impl ValidationReport {
    /// Creates a new successful validation report.
    pub fn success() -> Self {
        Self {
            passed: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            stats: ValidationStats::default(),
        }
    }

    /// Creates a new failed validation report with an error.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            passed: false,
            errors: vec![error.into()],
            warnings: Vec::new(),
            stats: ValidationStats::default(),
        }
    }

    /// Builds a report from mixed violation strings, routing each one by its
    /// severity prefix. Strings without a prefix are treated as errors.
    pub fn from_violations(violations: impl IntoIterator<Item = String>) -> Self {
        let mut report = Self::success();
        report.extend(violations);
        report
    }

    /// Routes violations into errors or warnings by their prefix.
    pub fn extend(&mut self, violations: impl IntoIterator<Item = String>) {
        for violation in violations {
            match violation_severity(&violation) {
                Some(Severity::Warn) => self.add_warning(violation),
                _ => self.add_error(violation),
            }
        }
    }

    /// Adds an error to the report.
    pub fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
        self.passed = false;
    }

    /// Adds a warning to the report.
    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Moves every warning into the error list.
    pub fn promote_warnings(&mut self) {
        if self.warnings.is_empty() {
            return;
        }
        self.errors.append(&mut self.warnings);
        self.passed = false;
    }
}
