//! Builder pattern for creating data contracts.
//!
//! This module provides ergonomic builders for constructing contracts
//! and their components with a fluent API.

use crate::{
    Contract, CustomRule, DistributionRule, Field, FieldRules, FlattenConfig, Schema, Severity,
    Sla, StreamingConfig,
};

/// Builder for creating a `Contract`.
///
/// # Example
///
/// ```rust
/// use contracts_core::{ContractBuilder, FieldBuilder};
///
/// let contract = ContractBuilder::new("user_events", "analytics-team")
///     .version("2.0.0")
///     .description("User interaction events")
///     .field(FieldBuilder::new("user_id", "string").required(true).not_null().build())
///     .build();
/// assert_eq!(contract.schema.fields.len(), 1);
/// ```
#[derive(Debug)]
pub struct ContractBuilder {
    name: String,
    owner: String,
    version: String,
    description: Option<String>,
    schema: Schema,
    sla: Option<Sla>,
    custom_rules: Vec<CustomRule>,
    streaming: Option<StreamingConfig>,
}

impl ContractBuilder {
    /// Creates a new contract builder with required fields.
    ///
    /// # Arguments
    ///
    /// * `name` - Unique contract name
    /// * `owner` - Contract owner identifier
    pub fn new(name: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
            version: "2.0.0".to_string(),
            description: None,
            schema: Schema::default(),
            sla: None,
            custom_rules: Vec::new(),
            streaming: None,
        }
    }

    /// Sets the contract version.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Sets the contract description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a field to the schema.
    pub fn field(mut self, field: Field) -> Self {
        self.schema.fields.push(field);
        self
    }

    /// Adds multiple fields to the schema.
    pub fn fields(mut self, fields: Vec<Field>) -> Self {
        self.schema.fields.extend(fields);
        self
    }

    /// Sets the severity reported for undeclared columns.
    pub fn extra_columns(mut self, severity: Severity) -> Self {
        self.schema.extra_columns = severity;
        self
    }

    /// Enables flattened column names with the given separator.
    pub fn flatten(mut self, separator: impl Into<String>) -> Self {
        self.schema.flatten = FlattenConfig {
            enabled: true,
            separator: separator.into(),
        };
        self
    }

    /// Sets the row-count SLA.
    pub fn sla(mut self, sla: Sla) -> Self {
        self.sla = Some(sla);
        self
    }

    /// Adds a dataset-level custom rule.
    pub fn custom_rule(
        mut self,
        name: impl Into<String>,
        config: serde_json::Value,
        severity: Severity,
    ) -> Self {
        self.custom_rules.push(CustomRule {
            name: name.into(),
            config,
            severity,
        });
        self
    }

    /// Sets the streaming configuration.
    pub fn streaming(mut self, streaming: StreamingConfig) -> Self {
        self.streaming = Some(streaming);
        self
    }

    /// Builds the contract.
    pub fn build(self) -> Contract {
        Contract {
            version: self.version,
            name: self.name,
            owner: self.owner,
            description: self.description,
            schema: self.schema,
            sla: self.sla,
            custom_rules: self.custom_rules,
            streaming: self.streaming,
        }
    }
}

/// Builder for creating a `Field`.
///
/// Rule setters create the field's [`FieldRules`] on first use.
///
/// # Example
///
/// ```rust
/// use contracts_core::{FieldBuilder, Severity};
///
/// let field = FieldBuilder::new("amount", "float")
///     .min(0.0)
///     .max(10_000.0)
///     .severity("max", Severity::Warn)
///     .build();
/// let rules = field.rules.unwrap();
/// assert_eq!(rules.min, Some(0.0));
/// assert_eq!(rules.severity_for("max"), Some(Severity::Warn));
/// ```
#[derive(Debug)]
pub struct FieldBuilder {
    name: String,
    field_type: String,
    required: bool,
    description: Option<String>,
    rules: Option<FieldRules>,
    distribution: Option<DistributionRule>,
}

impl FieldBuilder {
    /// Creates a new field builder.
    ///
    /// # Arguments
    ///
    /// * `name` - Field name
    /// * `field_type` - Field type (e.g., "string", "integer")
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            required: false,
            description: None,
            rules: None,
            distribution: None,
        }
    }

    /// Sets whether the column must be present.
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Sets the field description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Replaces the field rules.
    pub fn rules(mut self, rules: FieldRules) -> Self {
        self.rules = Some(rules);
        self
    }

    fn rules_mut(&mut self) -> &mut FieldRules {
        self.rules.get_or_insert_with(FieldRules::default)
    }

    /// Requires every value to be non-null.
    pub fn not_null(mut self) -> Self {
        self.rules_mut().not_null = true;
        self
    }

    /// Requires non-null values to be unique.
    pub fn unique(mut self) -> Self {
        self.rules_mut().unique = true;
        self
    }

    /// Sets the inclusive lower bound.
    pub fn min(mut self, min: f64) -> Self {
        self.rules_mut().min = Some(min);
        self
    }

    /// Sets the inclusive upper bound.
    pub fn max(mut self, max: f64) -> Self {
        self.rules_mut().max = Some(max);
        self
    }

    /// Sets the full-match pattern.
    pub fn regex(mut self, pattern: impl Into<String>) -> Self {
        self.rules_mut().regex = Some(pattern.into());
        self
    }

    /// Sets the allowed values.
    pub fn enum_values(mut self, values: Vec<serde_json::Value>) -> Self {
        self.rules_mut().enum_values = Some(values);
        self
    }

    /// Sets the maximum null ratio.
    pub fn max_null_ratio(mut self, ratio: f64) -> Self {
        self.rules_mut().max_null_ratio = Some(ratio);
        self
    }

    /// Sets the freshness bound, in hours.
    pub fn freshness_max_age_hours(mut self, hours: f64) -> Self {
        self.rules_mut().freshness_max_age_hours = Some(hours);
        self
    }

    /// Binds a registered custom rule to this field.
    pub fn custom(mut self, rule: impl Into<String>, config: serde_json::Value) -> Self {
        self.rules_mut().custom.insert(rule.into(), config);
        self
    }

    /// Declares the severity of one rule.
    pub fn severity(mut self, rule: impl Into<String>, severity: Severity) -> Self {
        self.rules_mut().severities.insert(rule.into(), severity);
        self
    }

    /// Sets the distribution baseline.
    pub fn distribution(mut self, distribution: DistributionRule) -> Self {
        self.distribution = Some(distribution);
        self
    }

    /// Builds the field.
    pub fn build(self) -> Field {
        Field {
            name: self.name,
            field_type: self.field_type,
            required: self.required,
            description: self.description,
            rules: self.rules,
            distribution: self.distribution,
        }
    }
}
