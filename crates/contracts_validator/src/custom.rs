//! Custom rule registry and validation.
//!
//! Custom rules are plain functions registered by name at startup. Field
//! rules are bound through `rules.custom` on a field; dataset rules through
//! the contract's `custom_rules` list. A rule receives its configuration
//! unchanged and reports a [`RuleOutcome`].

use crate::quality::resolve_rule_severity;
use crate::{DataSet, DataValue};
use contracts_core::{format_violation, violation_severity, Contract, Field, Severity};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Result of running a custom rule.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleOutcome {
    /// The rule holds
    Pass,
    /// The rule failed without a message
    Fail,
    /// The rule failed with one or more messages
    Violations(Vec<String>),
}

impl RuleOutcome {
    /// A failure with a single message.
    pub fn violation(message: impl Into<String>) -> Self {
        Self::Violations(vec![message.into()])
    }

    /// Passes when `ok`, otherwise fails with `message`.
    pub fn check(ok: bool, message: impl Into<String>) -> Self {
        if ok { Self::Pass } else { Self::violation(message) }
    }
}

/// Input handed to a field rule.
pub struct FieldRuleInput<'a> {
    /// Field the rule is bound to
    pub field: &'a Field,
    /// Column values, null where a row lacks the column
    pub values: Vec<&'a DataValue>,
    /// Rule configuration from the contract
    pub config: &'a serde_json::Value,
    /// The whole dataset, for rules that look across columns
    pub dataset: &'a DataSet,
}

/// Field rule function.
pub type FieldRuleFn =
    Arc<dyn Fn(&FieldRuleInput<'_>) -> anyhow::Result<RuleOutcome> + Send + Sync>;

/// Dataset rule function.
pub type DatasetRuleFn =
    Arc<dyn Fn(&DataSet, &serde_json::Value) -> anyhow::Result<RuleOutcome> + Send + Sync>;

#[derive(Clone)]
enum RegisteredRule {
    Field(FieldRuleFn),
    Dataset(DatasetRuleFn),
}

/// Table of custom rules keyed by name.
///
/// # Example
///
/// ```rust
/// use contracts_validator::{CustomRuleRegistry, RuleOutcome};
///
/// let mut registry = CustomRuleRegistry::new();
/// registry.register_field_rule("non_empty", |input| {
///     let blanks = input
///         .values
///         .iter()
///         .filter(|v| v.as_string().is_some_and(|s| s.trim().is_empty()))
///         .count();
///     Ok(RuleOutcome::check(
///         blanks == 0,
///         format!("Field '{}' has {} blank values", input.field.name, blanks),
///     ))
/// });
/// assert!(registry.contains("non_empty"));
/// ```
#[derive(Clone, Default)]
pub struct CustomRuleRegistry {
    rules: HashMap<String, RegisteredRule>,
}

impl CustomRuleRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a field rule under `name`, replacing any previous rule.
    pub fn register_field_rule<F>(&mut self, name: impl Into<String>, rule: F)
    where
        F: Fn(&FieldRuleInput<'_>) -> anyhow::Result<RuleOutcome> + Send + Sync + 'static,
    {
        self.rules
            .insert(name.into(), RegisteredRule::Field(Arc::new(rule)));
    }

    /// Registers a dataset rule under `name`, replacing any previous rule.
    pub fn register_dataset_rule<F>(&mut self, name: impl Into<String>, rule: F)
    where
        F: Fn(&DataSet, &serde_json::Value) -> anyhow::Result<RuleOutcome> + Send + Sync + 'static,
    {
        self.rules
            .insert(name.into(), RegisteredRule::Dataset(Arc::new(rule)));
    }

    /// Returns true if a rule is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// Returns true if no rules are registered.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn field_rule(&self, name: &str) -> Option<&FieldRuleFn> {
        match self.rules.get(name) {
            Some(RegisteredRule::Field(rule)) => Some(rule),
            _ => None,
        }
    }

    fn dataset_rule(&self, name: &str) -> Option<&DatasetRuleFn> {
        match self.rules.get(name) {
            Some(RegisteredRule::Dataset(rule)) => Some(rule),
            _ => None,
        }
    }
}

impl fmt::Debug for CustomRuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.rules.keys().collect();
        names.sort();
        f.debug_struct("CustomRuleRegistry")
            .field("rules", &names)
            .finish()
    }
}

/// Runs the custom rules a contract binds.
///
/// With an empty registry no rule is run and nothing is reported.
#[derive(Debug, Clone, Default)]
pub struct CustomRuleValidator {
    registry: CustomRuleRegistry,
}

impl CustomRuleValidator {
    /// Creates a validator over `registry`.
    pub fn new(registry: CustomRuleRegistry) -> Self {
        Self { registry }
    }

    /// Returns the registry.
    pub fn registry(&self) -> &CustomRuleRegistry {
        &self.registry
    }

    /// Runs every field and dataset rule bound by `contract`.
    pub fn validate(
        &self,
        contract: &Contract,
        dataset: &DataSet,
        overrides: &HashMap<String, Severity>,
    ) -> Vec<String> {
        let mut violations = Vec::new();
        if self.registry.is_empty() {
            return violations;
        }

        for field in &contract.schema.fields {
            let bound: &BTreeMap<String, serde_json::Value> = match &field.rules {
                Some(rules) if !rules.custom.is_empty() => &rules.custom,
                _ => continue,
            };
            let column = contract.resolve_column_name(&field.name);

            for (name, config) in bound {
                let Some(rule) = self.registry.field_rule(name) else {
                    violations.push(format_violation(
                        Severity::Error,
                        format!("Custom rule '{}' not found for field '{}'", name, field.name),
                    ));
                    continue;
                };
                let input = FieldRuleInput {
                    field,
                    values: dataset.column_values(&column).collect(),
                    config,
                    dataset,
                };
                let severity = resolve_rule_severity(overrides, field, name);
                violations.extend(outcome_violations(name, rule(&input), severity));
            }
        }

        for binding in &contract.custom_rules {
            let Some(rule) = self.registry.dataset_rule(&binding.name) else {
                violations.push(format_violation(
                    Severity::Error,
                    format!("Custom rule '{}' not found for dataset", binding.name),
                ));
                continue;
            };
            violations.extend(outcome_violations(
                &binding.name,
                rule(dataset, &binding.config),
                binding.severity,
            ));
        }

        violations
    }
}

fn outcome_violations(
    name: &str,
    outcome: anyhow::Result<RuleOutcome>,
    severity: Severity,
) -> Vec<String> {
    match outcome {
        Ok(RuleOutcome::Pass) => Vec::new(),
        Ok(RuleOutcome::Fail) => vec![format_violation(
            severity,
            format!("Custom rule '{}' failed", name),
        )],
        Ok(RuleOutcome::Violations(messages)) => messages
            .into_iter()
            .map(|message| match violation_severity(&message) {
                Some(_) => message,
                None => format_violation(severity, message),
            })
            .collect(),
        Err(e) => {
            warn!("Custom rule '{}' raised an error: {:#}", name, e);
            vec![format_violation(
                Severity::Error,
                format!("Custom rule '{}' raised an error: {:#}", name, e),
            )]
        }
    }
}
