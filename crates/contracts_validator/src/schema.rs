//! Schema validation logic.
//!
//! This module checks column presence and column types against the contract.
//! Observations are collected into a [`SchemaProfile`] first, so a chunked
//! pass and a whole-dataset pass report the same findings.

use crate::{DataSet, DataValue};
use contracts_core::{format_violation, Contract, Field, Severity};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Default, Clone)]
struct ColumnProfile {
    types: BTreeSet<&'static str>,
    unparsable_text: bool,
}

/// Columns and value types observed in a dataset.
#[derive(Debug, Default, Clone)]
pub struct SchemaProfile {
    rows: usize,
    columns: BTreeMap<String, ColumnProfile>,
}

impl SchemaProfile {
    /// Creates an empty profile.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the columns and non-null value types of `chunk`.
    pub fn observe(&mut self, chunk: &DataSet) {
        self.rows += chunk.len();
        for row in chunk.rows() {
            for (column, value) in row {
                let profile = self.columns.entry(column.clone()).or_default();
                if value.is_missing() {
                    continue;
                }
                profile.types.insert(value.type_name());
                if let DataValue::String(s) = value {
                    if crate::parse_timestamp(s).is_none() {
                        profile.unparsable_text = true;
                    }
                }
            }
        }
    }

    /// Number of rows observed.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Returns true if `column` appeared in any observed row.
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }
}

/// Validates the schema of a dataset against a contract.
///
/// Checks that required fields are present, that no undeclared columns
/// appear, and that column types match. A dataset without rows carries no
/// column information and is not checked.
pub struct SchemaValidator;

impl SchemaValidator {
    /// Creates a new schema validator.
    pub fn new() -> Self {
        Self
    }

    /// Validates a dataset against the contract schema.
    ///
    /// Returns violation strings. An empty list indicates success.
    pub fn validate(&self, contract: &Contract, dataset: &DataSet) -> Vec<String> {
        let mut profile = SchemaProfile::new();
        profile.observe(dataset);
        self.validate_profile(contract, &profile)
    }

    /// Validates accumulated observations against the contract schema.
    pub fn validate_profile(&self, contract: &Contract, profile: &SchemaProfile) -> Vec<String> {
        let mut violations = Vec::new();
        if profile.rows == 0 {
            return violations;
        }

        let mut declared = BTreeSet::new();
        for field in &contract.schema.fields {
            let column = contract.resolve_column_name(&field.name);
            match profile.columns.get(&column) {
                None if field.required => {
                    let expected = if column != field.name {
                        format!(" (expected column '{}')", column)
                    } else {
                        String::new()
                    };
                    violations.push(format_violation(
                        Severity::Error,
                        format!(
                            "Required field '{}' not found in dataset{}",
                            field.name, expected
                        ),
                    ));
                }
                None => {}
                Some(observed) => {
                    if let Some(actual) = type_mismatch(field, observed) {
                        violations.push(format_violation(
                            Severity::Error,
                            format!(
                                "Column '{}' type mismatch. Expected {}, got {}",
                                field.name, field.field_type, actual
                            ),
                        ));
                    }
                }
            }
            declared.insert(column);
        }

        for column in profile.columns.keys() {
            if !declared.contains(column) {
                violations.push(format_violation(
                    contract.schema.extra_columns,
                    format!("Column '{}' not in contract schema", column),
                ));
            }
        }

        violations
    }
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns the observed type label if the column does not fit the declared
/// type.
fn type_mismatch(field: &Field, observed: &ColumnProfile) -> Option<String> {
    let expected = normalize_type(&field.field_type);
    let fits = |type_name: &str| -> bool {
        match expected.as_str() {
            "string" | "str" | "text" => type_name == "string",
            "int" | "int64" | "integer" | "long" => type_name == "int64",
            "float" | "float64" | "double" | "number" => {
                matches!(type_name, "float64" | "int64")
            }
            "boolean" | "bool" => type_name == "boolean",
            "timestamp" | "datetime" | "date" => match type_name {
                "timestamp" => true,
                "string" => !observed.unparsable_text,
                _ => false,
            },
            "map" | "object" => type_name == "map",
            "list" | "array" => type_name == "list",
            t if t.starts_with("map<") => type_name == "map",
            t if t.starts_with("list<") || t.starts_with("array<") => type_name == "list",
            // Unknown type, be lenient and accept it
            _ => true,
        }
    };

    if observed.types.iter().all(|t| fits(*t)) {
        return None;
    }
    let labels: Vec<&str> = observed.types.iter().copied().collect();
    Some(labels.join("|"))
}

/// Normalizes a type string for comparison.
fn normalize_type(type_str: &str) -> String {
    type_str.to_lowercase().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DataRow;
    use contracts_core::{ContractBuilder, FieldBuilder};
    use pretty_assertions::assert_eq;

    fn create_test_contract() -> Contract {
        ContractBuilder::new("test_contract", "test-owner")
            .field(FieldBuilder::new("id", "string").required(true).build())
            .field(FieldBuilder::new("age", "integer").required(true).build())
            .field(FieldBuilder::new("email", "string").build())
            .build()
    }

    fn row(pairs: &[(&str, DataValue)]) -> DataRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_empty_dataset() {
        let contract = create_test_contract();
        let validator = SchemaValidator::new();
        assert!(validator.validate(&contract, &DataSet::empty()).is_empty());
    }

    #[test]
    fn test_valid_dataset() {
        let contract = create_test_contract();
        let dataset = DataSet::from_rows(vec![
            row(&[("id", "a".into()), ("age", DataValue::Int(30))]),
            row(&[("id", "b".into()), ("age", DataValue::Null), ("email", "x@y.z".into())]),
        ]);
        assert!(SchemaValidator::new().validate(&contract, &dataset).is_empty());
    }

    #[test]
    fn test_missing_required_and_extra_column() {
        let contract = create_test_contract();
        let dataset = DataSet::from_rows(vec![row(&[
            ("id", "a".into()),
            ("country", "IT".into()),
        ])]);

        assert_eq!(
            SchemaValidator::new().validate(&contract, &dataset),
            vec![
                "ERROR: Required field 'age' not found in dataset".to_string(),
                "WARN: Column 'country' not in contract schema".to_string(),
            ]
        );
    }

    #[test]
    fn test_type_mismatch() {
        let contract = create_test_contract();
        let dataset = DataSet::from_rows(vec![
            row(&[("id", "a".into()), ("age", DataValue::Int(1))]),
            row(&[("id", "b".into()), ("age", "thirty".into())]),
        ]);

        assert_eq!(
            SchemaValidator::new().validate(&contract, &dataset),
            vec!["ERROR: Column 'age' type mismatch. Expected integer, got int64|string".to_string()]
        );
    }

    #[test]
    fn test_float_accepts_integers_and_datetime_accepts_text() {
        let contract = ContractBuilder::new("t", "o")
            .field(FieldBuilder::new("amount", "float").build())
            .field(FieldBuilder::new("ts", "datetime").build())
            .field(FieldBuilder::new("extra", "decimal(10,2)").build())
            .build();
        let dataset = DataSet::from_rows(vec![row(&[
            ("amount", DataValue::Int(3)),
            ("ts", "2024-01-15T10:30:00Z".into()),
            ("extra", "1.50".into()),
        ])]);
        assert!(SchemaValidator::new().validate(&contract, &dataset).is_empty());
    }

    #[test]
    fn test_flattened_column_names() {
        let contract = ContractBuilder::new("t", "o")
            .flatten("__")
            .field(FieldBuilder::new("user.id", "string").required(true).build())
            .extra_columns(Severity::Error)
            .build();
        let dataset = DataSet::from_rows(vec![row(&[("user.id", "a".into())])]);

        assert_eq!(
            SchemaValidator::new().validate(&contract, &dataset),
            vec![
                "ERROR: Required field 'user.id' not found in dataset (expected column 'user__id')"
                    .to_string(),
                "ERROR: Column 'user.id' not in contract schema".to_string(),
            ]
        );
    }

    #[test]
    fn test_profile_over_chunks_matches_whole() {
        let contract = create_test_contract();
        let dataset = DataSet::from_rows(vec![
            row(&[("id", "a".into())]),
            row(&[("age", DataValue::Int(2)), ("zip", "123".into())]),
        ]);

        let mut profile = SchemaProfile::new();
        for chunk in dataset.chunks(1) {
            profile.observe(&chunk);
        }
        let validator = SchemaValidator::new();
        assert_eq!(
            validator.validate_profile(&contract, &profile),
            validator.validate(&contract, &dataset)
        );
        assert_eq!(profile.rows(), 2);
        assert!(profile.has_column("zip"));
    }
}
