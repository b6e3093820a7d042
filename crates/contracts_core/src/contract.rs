//! Data contract types and structures.
//!
//! This module contains the core types for defining data contracts: the field
//! schema with its quality rules and distribution baselines, dataset-level
//! row-count SLAs, custom rule bindings and the streaming window configuration.
//!
//! A parsed [`Contract`] is immutable for the lifetime of a validation run; all
//! accumulators in the validator crates only ever borrow it.

use crate::{ContractError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A data contract defining the structure, quality, and SLA for a dataset.
///
/// # Example
///
/// ```rust
/// use contracts_core::{Contract, Schema};
///
/// let contract = Contract {
///     version: "2.0.0".to_string(),
///     name: "user_events".to_string(),
///     owner: "analytics-team".to_string(),
///     description: Some("User interaction events dataset".to_string()),
///     schema: Schema::default(),
///     sla: None,
///     custom_rules: Vec::new(),
///     streaming: None,
/// };
/// assert!(contract.validate_config().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    /// Semantic version of the contract (e.g., "2.0.0")
    pub version: String,

    /// Unique name identifying this contract
    pub name: String,

    /// Team or individual responsible for this contract
    pub owner: String,

    /// Human-readable description of the dataset
    #[serde(default)]
    pub description: Option<String>,

    /// Schema definition including fields and column policy
    pub schema: Schema,

    /// Optional dataset-level row-count agreement
    #[serde(default)]
    pub sla: Option<Sla>,

    /// Dataset-level custom rules resolved through the rule registry
    #[serde(default)]
    pub custom_rules: Vec<CustomRule>,

    /// Optional streaming configuration for windowed validation
    #[serde(default)]
    pub streaming: Option<StreamingConfig>,
}

impl Contract {
    /// Resolves the column name a field is expected under in the data.
    ///
    /// When flattening is enabled with a separator other than `.`, dotted field
    /// names are rewritten with that separator (`user.id` -> `user__id`).
    pub fn resolve_column_name(&self, field_name: &str) -> String {
        let flatten = &self.schema.flatten;
        if !flatten.enabled || flatten.separator.is_empty() || flatten.separator == "." {
            return field_name.to_string();
        }
        field_name.replace('.', &flatten.separator)
    }

    /// Looks up a field definition by name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.schema.fields.iter().find(|f| f.name == name)
    }

    /// Checks the configuration carried by the contract.
    ///
    /// Data problems are never reported here; only settings that make a run
    /// impossible (missing window parameters, empty topics) are rejected.
    pub fn validate_config(&self) -> Result<()> {
        if let Some(streaming) = &self.streaming {
            streaming.validate()?;
        }
        for rule in &self.custom_rules {
            if rule.name.trim().is_empty() {
                return Err(ContractError::InvalidConfiguration(
                    "custom_rules entries must include a name".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Severity attached to a violation.
///
/// Only two levels exist: `ERROR` blocks a run (and routes streaming windows to
/// the dead-letter sink), `WARN` is reported but never blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Severity {
    /// Blocking violation
    #[default]
    Error,
    /// Informational violation
    Warn,
}

impl Severity {
    /// Returns the upper-case label used as the violation prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "ERROR",
            Severity::Warn => "WARN",
        }
    }

    /// Normalizes a free-form severity, falling back to `ERROR` for anything
    /// that is not recognized.
    pub fn normalize(value: &str) -> Self {
        value.parse().unwrap_or(Severity::Error)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ERROR" => Ok(Severity::Error),
            "WARN" | "WARNING" => Ok(Severity::Warn),
            other => Err(ContractError::InvalidConfiguration(format!(
                "unsupported severity '{}', use ERROR or WARN",
                other
            ))),
        }
    }
}

impl TryFrom<String> for Severity {
    type Error = ContractError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Severity> for String {
    fn from(value: Severity) -> Self {
        value.as_str().to_string()
    }
}

/// Schema definition for a dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    /// List of field definitions in the schema
    #[serde(default)]
    pub fields: Vec<Field>,

    /// Severity reported for columns that the contract does not declare
    #[serde(default = "default_extra_columns")]
    pub extra_columns: Severity,

    /// Flattened column naming for nested payloads
    #[serde(default)]
    pub flatten: FlattenConfig,
}

fn default_extra_columns() -> Severity {
    Severity::Warn
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            fields: Vec::new(),
            extra_columns: default_extra_columns(),
            flatten: FlattenConfig::default(),
        }
    }
}

/// Flattened-column naming configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlattenConfig {
    /// Whether nested fields are addressed through flattened column names
    #[serde(default)]
    pub enabled: bool,

    /// Separator used between path segments in flattened column names
    #[serde(default = "default_separator")]
    pub separator: String,
}

fn default_separator() -> String {
    ".".to_string()
}

impl Default for FlattenConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            separator: default_separator(),
        }
    }
}

/// A single field definition in a schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    /// Field name
    pub name: String,

    /// Field data type (integer, float, string, boolean, datetime)
    #[serde(rename = "type")]
    pub field_type: String,

    /// Whether the column must be present in the data
    #[serde(default)]
    pub required: bool,

    /// Optional human-readable description
    #[serde(default)]
    pub description: Option<String>,

    /// Quality rules evaluated for this field
    #[serde(default)]
    pub rules: Option<FieldRules>,

    /// Distribution baseline used for drift and outlier detection
    #[serde(default)]
    pub distribution: Option<DistributionRule>,
}

/// Quality rules for a field.
///
/// Every rule is explicitly optional; an absent rule is never evaluated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldRules {
    /// No null values allowed
    pub not_null: bool,

    /// No duplicate non-null values allowed
    pub unique: bool,

    /// Inclusive numeric lower bound
    pub min: Option<f64>,

    /// Inclusive numeric upper bound
    pub max: Option<f64>,

    /// Pattern every non-null value must match in full
    pub regex: Option<String>,

    /// Allowed values; arrays or objects in this list cannot be hashed
    #[serde(rename = "enum")]
    pub enum_values: Option<Vec<serde_json::Value>>,

    /// Maximum tolerated ratio of null values (0.0 to 1.0)
    pub max_null_ratio: Option<f64>,

    /// Maximum age of the newest timestamp, in hours
    pub freshness_max_age_hours: Option<f64>,

    /// Field-level custom rules keyed by registered rule name
    pub custom: BTreeMap<String, serde_json::Value>,

    /// Per-rule severities declared by the contract
    pub severities: BTreeMap<String, Severity>,
}

impl FieldRules {
    /// Returns the severity the contract declares for `rule`, if any.
    pub fn severity_for(&self, rule: &str) -> Option<Severity> {
        self.severities.get(rule).copied()
    }

    /// Returns true if the enum list contains values that cannot be used as
    /// set members (nested arrays or objects).
    pub fn enum_is_unhashable(&self) -> bool {
        self.enum_values.as_ref().is_some_and(|values| {
            values
                .iter()
                .any(|v| matches!(v, serde_json::Value::Array(_) | serde_json::Value::Object(_)))
        })
    }
}

/// Distribution baseline for drift and outlier detection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributionRule {
    /// Baseline mean
    pub mean: Option<f64>,
    /// Baseline (population) standard deviation
    pub std: Option<f64>,
    /// Maximum tolerated relative drift, in percent
    pub max_drift_pct: Option<f64>,
    /// Absolute z-score above which a value is an outlier
    pub max_z_score: Option<f64>,
}

/// Dataset-level row-count agreement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sla {
    /// Minimum number of rows
    #[serde(default)]
    pub min_rows: Option<u64>,

    /// Maximum number of rows
    #[serde(default)]
    pub max_rows: Option<u64>,

    /// Severity when `min_rows` is violated
    #[serde(default)]
    pub min_rows_severity: Severity,

    /// Severity when `max_rows` is violated
    #[serde(default)]
    pub max_rows_severity: Severity,
}

/// Dataset-level custom rule binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomRule {
    /// Name of the registered rule
    pub name: String,

    /// Rule configuration passed through unchanged
    #[serde(default)]
    pub config: serde_json::Value,

    /// Severity of failures reported by the rule
    #[serde(default)]
    pub severity: Severity,
}

/// Streaming engine family the contract targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamEngineKind {
    /// Pick whatever engine is available
    #[default]
    Auto,
    /// Apache Kafka
    Kafka,
    /// Apache Flink
    Flink,
    /// Spark structured streaming
    Spark,
}

/// Window strategy for streaming validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowType {
    /// Fixed-size, non-overlapping windows aligned to multiples of the duration
    #[default]
    Tumbling,
    /// Fixed-cadence overlapping windows covering the trailing duration
    Sliding,
    /// Activity windows closed by an inactivity gap
    Session,
}

impl FromStr for WindowType {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tumbling" => Ok(WindowType::Tumbling),
            "sliding" => Ok(WindowType::Sliding),
            "session" => Ok(WindowType::Session),
            other => Err(ContractError::InvalidConfiguration(format!(
                "streaming.window.type must be one of: tumbling, sliding, session (got '{}')",
                other
            ))),
        }
    }
}

impl fmt::Display for WindowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WindowType::Tumbling => "tumbling",
            WindowType::Sliding => "sliding",
            WindowType::Session => "session",
        };
        f.write_str(label)
    }
}

/// Window configuration for streaming validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Window strategy
    #[serde(rename = "type", default)]
    pub window_type: WindowType,

    /// Window length; the inactivity gap for session windows
    #[serde(default = "default_duration_seconds")]
    pub duration_seconds: u64,

    /// Emission cadence, required for sliding windows
    #[serde(default)]
    pub slide_seconds: Option<u64>,
}

fn default_duration_seconds() -> u64 {
    300
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            window_type: WindowType::Tumbling,
            duration_seconds: default_duration_seconds(),
            slide_seconds: None,
        }
    }
}

impl WindowConfig {
    /// Window length in milliseconds.
    pub fn duration_ms(&self) -> i64 {
        self.duration_seconds as i64 * 1000
    }

    /// Slide interval in milliseconds, if configured.
    pub fn slide_ms(&self) -> Option<i64> {
        self.slide_seconds.map(|s| s as i64 * 1000)
    }

    /// Rejects window settings that cannot drive a window state machine.
    pub fn validate(&self) -> Result<()> {
        if self.duration_seconds == 0 {
            return Err(ContractError::InvalidConfiguration(
                "streaming.window.duration_seconds must be > 0".to_string(),
            ));
        }
        match (self.window_type, self.slide_seconds) {
            (WindowType::Sliding, None) => Err(ContractError::InvalidConfiguration(
                "streaming.window.slide_seconds is required for sliding windows".to_string(),
            )),
            (_, Some(0)) => Err(ContractError::InvalidConfiguration(
                "streaming.window.slide_seconds must be > 0".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// Dead-letter routing for windows that fail validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetterConfig {
    /// Whether failing windows are forwarded to the dead-letter topic
    #[serde(default)]
    pub enabled: bool,

    /// Dead-letter topic, required when enabled
    #[serde(default)]
    pub topic: Option<String>,

    /// Payload field that receives the violation list
    #[serde(default = "default_reason_field")]
    pub reason_field: String,
}

/// Default payload field carrying dead-letter reasons.
pub const DEFAULT_REASON_FIELD: &str = "_dce_violation";

fn default_reason_field() -> String {
    DEFAULT_REASON_FIELD.to_string()
}

impl Default for DeadLetterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            topic: None,
            reason_field: default_reason_field(),
        }
    }
}

/// Streaming configuration for real-time validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamingConfig {
    /// Engine family
    #[serde(default)]
    pub engine: StreamEngineKind,

    /// Source topic
    pub topic: String,

    /// Optional consumer group
    #[serde(default)]
    pub consumer_group: Option<String>,

    /// Window configuration
    #[serde(default)]
    pub window: WindowConfig,

    /// Metrics requested for each window
    #[serde(default)]
    pub metrics: Vec<String>,

    /// Dead-letter routing
    #[serde(default)]
    pub dlq: DeadLetterConfig,
}

impl StreamingConfig {
    /// Creates a streaming configuration for `topic` with default window and
    /// dead-letter settings.
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            engine: StreamEngineKind::Auto,
            topic: topic.into(),
            consumer_group: None,
            window: WindowConfig::default(),
            metrics: Vec::new(),
            dlq: DeadLetterConfig::default(),
        }
    }

    /// Rejects streaming settings that cannot be run.
    pub fn validate(&self) -> Result<()> {
        if self.topic.trim().is_empty() {
            return Err(ContractError::InvalidConfiguration(
                "streaming.topic is required when streaming is set".to_string(),
            ));
        }
        self.window.validate()?;
        if self.dlq.enabled && self.dlq.topic.as_deref().is_none_or(str::is_empty) {
            return Err(ContractError::InvalidConfiguration(
                "streaming.dlq.topic is required when enabled".to_string(),
            ));
        }
        if self.dlq.reason_field.is_empty() {
            return Err(ContractError::InvalidConfiguration(
                "streaming.dlq.reason_field must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_severity_parsing() {
        assert_eq!("error".parse::<Severity>().unwrap(), Severity::Error);
        assert_eq!("Warn".parse::<Severity>().unwrap(), Severity::Warn);
        assert!("info".parse::<Severity>().is_err());
        assert_eq!(Severity::normalize("info"), Severity::Error);
        assert_eq!(Severity::Warn.to_string(), "WARN");
    }

    #[test]
    fn test_field_rules_deserialize() {
        let rules: FieldRules = serde_json::from_value(serde_json::json!({
            "not_null": true,
            "enum": ["a", "b"],
            "severities": {"not_null": "warn"}
        }))
        .unwrap();

        assert!(rules.not_null);
        assert!(!rules.unique);
        assert_eq!(rules.enum_values.as_ref().map(Vec::len), Some(2));
        assert_eq!(rules.severity_for("not_null"), Some(Severity::Warn));
        assert_eq!(rules.severity_for("unique"), None);
        assert!(!rules.enum_is_unhashable());
    }

    #[test]
    fn test_unhashable_enum_detection() {
        let rules = FieldRules {
            enum_values: Some(vec![serde_json::json!("a"), serde_json::json!(["nested"])]),
            ..Default::default()
        };
        assert!(rules.enum_is_unhashable());
    }

    #[test]
    fn test_window_type_from_str() {
        assert_eq!("Session".parse::<WindowType>().unwrap(), WindowType::Session);
        let err = "hopping".parse::<WindowType>().unwrap_err();
        assert!(err.to_string().contains("tumbling, sliding, session"));
    }

    #[test]
    fn test_sliding_requires_slide() {
        let mut config = StreamingConfig::new("events");
        config.window.window_type = WindowType::Sliding;
        assert!(config.validate().is_err());

        config.window.slide_seconds = Some(10);
        assert!(config.validate().is_ok());
        assert_eq!(config.window.slide_ms(), Some(10_000));
    }

    #[test]
    fn test_streaming_requires_topic_and_dlq_topic() {
        let config = StreamingConfig::new("  ");
        assert!(config.validate().is_err());

        let mut config = StreamingConfig::new("events");
        config.dlq.enabled = true;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("dlq.topic"));
    }

    #[test]
    fn test_window_defaults() {
        let window: WindowConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(window.window_type, WindowType::Tumbling);
        assert_eq!(window.duration_seconds, 300);
        assert_eq!(window.duration_ms(), 300_000);
    }

    #[test]
    fn test_schema_default_matches_deserialized_default() {
        let parsed: Schema = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.extra_columns, Severity::Warn);
        assert_eq!(Schema::default().extra_columns, Severity::Warn);
        assert_eq!(Schema::default().flatten.separator, ".");
    }

    #[test]
    fn test_resolve_column_name() {
        let mut schema = Schema::default();
        schema.flatten = FlattenConfig {
            enabled: true,
            separator: "__".to_string(),
        };
        let contract = Contract {
            version: "2.0.0".to_string(),
            name: "nested".to_string(),
            owner: "team".to_string(),
            description: None,
            schema,
            sla: None,
            custom_rules: Vec::new(),
            streaming: None,
        };
        assert_eq!(contract.resolve_column_name("user.id"), "user__id");
    }
}
