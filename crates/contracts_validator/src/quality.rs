//! Field quality rules evaluated over a sequence of chunks.
//!
//! [`ChunkedQualityValidator`] keeps one small summary per field (counts,
//! extremes, the newest timestamp and, for unique fields, the set of values
//! seen so far). Feeding it every chunk of a dataset and then finalizing
//! yields the same violations as feeding it the whole dataset at once.
//!
//! Rules evaluated:
//! - `not_null` / `max_null_ratio`: null counts against the row total
//! - `unique`: duplicates across and within chunks
//! - `min` / `max`: numeric bounds on coercible values
//! - `regex`: full match against the trimmed text form
//! - `enum`: membership in the allowed set
//! - `freshness_max_age_hours`: age of the newest parsable timestamp

use crate::{json_canonical_key, DataSet, DataValue};
use chrono::{DateTime, Utc};
use contracts_core::{format_violation, Contract, Field, FieldRules, Severity};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Resolves the severity of one field rule.
///
/// Precedence: a run-time override keyed `field.rule` (case-insensitive),
/// then the severity the contract declares for the rule, then `ERROR`.
pub fn resolve_rule_severity(
    overrides: &HashMap<String, Severity>,
    field: &Field,
    rule: &str,
) -> Severity {
    let key = format!("{}.{}", field.name, rule).to_lowercase();
    if let Some(severity) = overrides.get(&key) {
        return *severity;
    }
    field
        .rules
        .as_ref()
        .and_then(|rules| rules.severity_for(rule))
        .unwrap_or(Severity::Error)
}

enum PatternCheck {
    Absent,
    Compiled(Regex),
    Invalid(String),
}

enum EnumCheck {
    Absent,
    Allowed(HashSet<String>),
    Unhashable,
}

#[derive(Debug, Default)]
struct FieldStats {
    column_seen: bool,
    total: usize,
    nulls: usize,
    duplicates: usize,
    below_min: usize,
    above_max: usize,
    regex_mismatches: usize,
    enum_mismatches: usize,
    newest: Option<DateTime<Utc>>,
}

struct FieldState<'a> {
    field: &'a Field,
    column: String,
    checks: RuleChecks<'a>,
}

/// Per-value rule checks and the counters they feed.
struct RuleChecks<'a> {
    rules: &'a FieldRules,
    pattern: PatternCheck,
    allowed: EnumCheck,
    seen: HashSet<String>,
    stats: FieldStats,
}

impl<'a> FieldState<'a> {
    fn new(contract: &Contract, field: &'a Field, rules: &'a FieldRules) -> Self {
        let pattern = match &rules.regex {
            None => PatternCheck::Absent,
            Some(pattern) => match Regex::new(&format!("^(?:{})$", pattern)) {
                Ok(re) => PatternCheck::Compiled(re),
                // Report the error for the pattern as written
                Err(_) => match Regex::new(pattern) {
                    Ok(_) => PatternCheck::Invalid("pattern cannot be anchored".to_string()),
                    Err(e) => PatternCheck::Invalid(e.to_string()),
                },
            },
        };

        let allowed = match &rules.enum_values {
            None => EnumCheck::Absent,
            Some(_) if rules.enum_is_unhashable() => EnumCheck::Unhashable,
            Some(values) => EnumCheck::Allowed(values.iter().filter_map(json_canonical_key).collect()),
        };

        Self {
            field,
            column: contract.resolve_column_name(&field.name),
            checks: RuleChecks {
                rules,
                pattern,
                allowed,
                seen: HashSet::new(),
                stats: FieldStats::default(),
            },
        }
    }

    /// Folds a chunk in. A row without the column counts as a null, as it
    /// does when the whole dataset is validated at once.
    fn observe(&mut self, chunk: &DataSet) {
        let checks = &mut self.checks;
        if chunk.has_column(&self.column) {
            checks.stats.column_seen = true;
        }

        let mut fresh = HashSet::new();
        for row in chunk.rows() {
            checks.stats.total += 1;
            match row.get(&self.column) {
                Some(value) if !value.is_missing() => checks.observe_value(value, &mut fresh),
                _ => checks.stats.nulls += 1,
            }
        }

        if checks.rules.unique {
            checks.seen.extend(fresh);
        }
    }
}

impl RuleChecks<'_> {
    fn observe_value(&mut self, value: &DataValue, fresh: &mut HashSet<String>) {
        let rules = self.rules;

        if rules.unique {
            let key = value.canonical_key();
            if self.seen.contains(&key) || !fresh.insert(key) {
                self.stats.duplicates += 1;
            }
        }

        if rules.min.is_some() || rules.max.is_some() {
            if let Some(n) = value.as_numeric() {
                if rules.min.is_some_and(|min| n < min) {
                    self.stats.below_min += 1;
                }
                if rules.max.is_some_and(|max| n > max) {
                    self.stats.above_max += 1;
                }
            }
        }

        if let PatternCheck::Compiled(re) = &self.pattern {
            if !re.is_match(value.display_string().trim()) {
                self.stats.regex_mismatches += 1;
            }
        }

        if let EnumCheck::Allowed(allowed) = &self.allowed {
            if !allowed.contains(&value.canonical_key()) {
                self.stats.enum_mismatches += 1;
            }
        }

        if rules.freshness_max_age_hours.is_some() {
            if let Some(ts) = value.as_datetime() {
                self.stats.newest = Some(self.stats.newest.map_or(ts, |newest| newest.max(ts)));
            }
        }
    }
}

/// Evaluates field quality rules incrementally over chunks.
///
/// Fields without rules are ignored. A field whose column never appears in a
/// non-empty dataset is skipped; schema checks report the missing column.
///
/// # Example
///
/// ```rust
/// use contracts_core::{ContractBuilder, FieldBuilder};
/// use contracts_validator::{ChunkedQualityValidator, DataRow, DataSet, DataValue};
/// use std::collections::HashMap;
///
/// let contract = ContractBuilder::new("events", "platform")
///     .field(FieldBuilder::new("id", "integer").unique().build())
///     .build();
///
/// let row = |id: i64| -> DataRow { [("id".to_string(), DataValue::Int(id))].into() };
/// let mut quality = ChunkedQualityValidator::new(&contract, HashMap::new());
/// quality.process_chunk(&DataSet::from_rows(vec![row(1), row(2)]));
/// quality.process_chunk(&DataSet::from_rows(vec![row(2)]));
///
/// assert_eq!(
///     quality.finalize(),
///     vec!["ERROR: Field 'id' has 1 duplicate values, but unique=true".to_string()]
/// );
/// ```
pub struct ChunkedQualityValidator<'a> {
    fields: Vec<FieldState<'a>>,
    overrides: HashMap<String, Severity>,
    rows_seen: usize,
    chunks_seen: usize,
}

impl<'a> ChunkedQualityValidator<'a> {
    /// Creates a validator for `contract`.
    ///
    /// Override keys are `field.rule` and are matched case-insensitively.
    pub fn new(contract: &'a Contract, overrides: HashMap<String, Severity>) -> Self {
        let fields = contract
            .schema
            .fields
            .iter()
            .filter_map(|field| {
                field
                    .rules
                    .as_ref()
                    .map(|rules| FieldState::new(contract, field, rules))
            })
            .collect();

        Self {
            fields,
            overrides: overrides
                .into_iter()
                .map(|(key, severity)| (key.to_lowercase(), severity))
                .collect(),
            rows_seen: 0,
            chunks_seen: 0,
        }
    }

    /// Folds one chunk into the per-field summaries.
    pub fn process_chunk(&mut self, chunk: &DataSet) {
        self.rows_seen += chunk.len();
        self.chunks_seen += 1;
        for state in &mut self.fields {
            state.observe(chunk);
        }
    }

    /// Number of rows folded in so far.
    pub fn rows_seen(&self) -> usize {
        self.rows_seen
    }

    /// Number of fields with rules.
    pub fn fields_checked(&self) -> usize {
        self.fields.len()
    }

    /// Evaluates every rule against the accumulated summaries, measuring
    /// freshness against the current time.
    pub fn finalize(self) -> Vec<String> {
        self.finalize_at(Utc::now())
    }

    /// Evaluates every rule, measuring freshness against `now`.
    pub fn finalize_at(self, now: DateTime<Utc>) -> Vec<String> {
        debug!(
            "Evaluating quality rules for {} fields over {} rows in {} chunks",
            self.fields.len(),
            self.rows_seen,
            self.chunks_seen
        );

        let mut violations = Vec::new();
        for state in &self.fields {
            if !state.checks.stats.column_seen && self.rows_seen > 0 {
                continue;
            }
            self.evaluate(state, now, &mut violations);
        }
        violations
    }

    fn evaluate(&self, state: &FieldState<'_>, now: DateTime<Utc>, out: &mut Vec<String>) {
        let name = &state.field.name;
        let rules = state.checks.rules;
        let stats = &state.checks.stats;
        let mut report = |rule: &str, message: String| {
            let severity = resolve_rule_severity(&self.overrides, state.field, rule);
            out.push(format_violation(severity, message));
        };

        if rules.not_null && stats.nulls > 0 {
            report(
                "not_null",
                format!(
                    "Field '{}' has {} null values, but not_null=true",
                    name, stats.nulls
                ),
            );
        }

        if let Some(max_ratio) = rules.max_null_ratio {
            if stats.total == 0 {
                report(
                    "max_null_ratio",
                    format!(
                        "Field '{}' has no rows; cannot evaluate max_null_ratio",
                        name
                    ),
                );
            } else {
                let ratio = stats.nulls as f64 / stats.total as f64;
                if ratio > max_ratio {
                    report(
                        "max_null_ratio",
                        format!(
                            "Field '{}' null ratio ({:.2}%) exceeds max_null_ratio={}",
                            name,
                            ratio * 100.0,
                            max_ratio
                        ),
                    );
                }
            }
        }

        if rules.unique && stats.duplicates > 0 {
            report(
                "unique",
                format!(
                    "Field '{}' has {} duplicate values, but unique=true",
                    name, stats.duplicates
                ),
            );
        }

        if let Some(min) = rules.min {
            if stats.below_min > 0 {
                report(
                    "min",
                    format!("Field '{}' has {} values < min ({})", name, stats.below_min, min),
                );
            }
        }

        if let Some(max) = rules.max {
            if stats.above_max > 0 {
                report(
                    "max",
                    format!("Field '{}' has {} values > max ({})", name, stats.above_max, max),
                );
            }
        }

        if let Some(pattern) = &rules.regex {
            match &state.checks.pattern {
                PatternCheck::Invalid(err) if stats.column_seen => report(
                    "regex",
                    format!("Field '{}' has invalid regex '{}': {}", name, pattern, err),
                ),
                PatternCheck::Compiled(_) if stats.regex_mismatches > 0 => report(
                    "regex",
                    format!(
                        "Field '{}' has {} values not matching regex '{}'",
                        name, stats.regex_mismatches, pattern
                    ),
                ),
                _ => {}
            }
        }

        match &state.checks.allowed {
            EnumCheck::Unhashable => report(
                "enum",
                format!("Field '{}' enum contains unhashable values", name),
            ),
            EnumCheck::Allowed(_) if stats.enum_mismatches > 0 => report(
                "enum",
                format!(
                    "Field '{}' has {} values not in enum {}",
                    name,
                    stats.enum_mismatches,
                    enum_label(rules)
                ),
            ),
            _ => {}
        }

        if let Some(max_age) = rules.freshness_max_age_hours {
            match stats.newest {
                None => report(
                    "freshness_max_age_hours",
                    format!("Field '{}' has no parsable timestamps", name),
                ),
                Some(newest) => {
                    let age_hours = (now - newest).num_milliseconds() as f64 / 3_600_000.0;
                    if age_hours > max_age {
                        report(
                            "freshness_max_age_hours",
                            format!(
                                "Field '{}' freshness age {:.2}h exceeds max_age_hours={}",
                                name, age_hours, max_age
                            ),
                        );
                    }
                }
            }
        }
    }
}

fn enum_label(rules: &FieldRules) -> String {
    let values = rules.enum_values.as_deref().unwrap_or_default();
    let items: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("[{}]", items.join(", "))
}

/// One-shot quality validation over a whole dataset.
pub struct QualityValidator;

impl QualityValidator {
    /// Creates a new quality validator.
    pub fn new() -> Self {
        Self
    }

    /// Validates the field rules of `contract` against `dataset`.
    ///
    /// Equivalent to a [`ChunkedQualityValidator`] fed a single chunk.
    pub fn validate(
        &self,
        contract: &Contract,
        dataset: &DataSet,
        overrides: &HashMap<String, Severity>,
    ) -> Vec<String> {
        let mut chunked = ChunkedQualityValidator::new(contract, overrides.clone());
        chunked.process_chunk(dataset);
        chunked.finalize()
    }
}

impl Default for QualityValidator {
    fn default() -> Self {
        Self::new()
    }
}
