//! Tests to verify correct handling of null values across all validators.
//!
//! Null values are handled consistently:
//! - `not_null` and `max_null_ratio` count them
//! - `unique`, `min`/`max`, `regex` and `enum` skip them
//! - distribution statistics ignore them
//! - a row that lacks a column reads as null for that column

use contracts_core::{ContractBuilder, DistributionRule, FieldBuilder, ValidationContext};
use contracts_validator::{DataRow, DataSet, DataValidator, DataValue};
use pretty_assertions::assert_eq;
use serde_json::json;

fn single(column: &str, values: Vec<DataValue>) -> DataSet {
    values
        .into_iter()
        .map(|v| {
            let mut row = DataRow::new();
            row.insert(column.to_string(), v);
            row
        })
        .collect()
}

#[test]
fn test_null_in_not_null_field_fails() {
    let contract = ContractBuilder::new("test", "owner")
        .field(FieldBuilder::new("id", "string").not_null().build())
        .build();

    let dataset = single("id", vec![DataValue::Null]);
    let report = DataValidator::new().validate_with_data(&contract, &dataset, &ValidationContext::new());

    assert!(!report.passed, "Null in not_null field should fail");
    assert_eq!(
        report.errors,
        vec!["ERROR: Field 'id' has 1 null values, but not_null=true".to_string()]
    );
}

#[test]
fn test_null_in_field_without_rules_passes() {
    let contract = ContractBuilder::new("test", "owner")
        .field(FieldBuilder::new("id", "string").build())
        .build();

    let dataset = single("id", vec![DataValue::Null]);
    let report = DataValidator::new().validate_with_data(&contract, &dataset, &ValidationContext::new());

    assert!(report.passed, "errors: {:?}", report.errors);
}

#[test]
fn test_null_skips_value_rules() {
    let contract = ContractBuilder::new("test", "owner")
        .field(
            FieldBuilder::new("code", "string")
                .unique()
                .regex("[A-Z]+")
                .enum_values(vec![json!("A"), json!("B")])
                .build(),
        )
        .field(FieldBuilder::new("age", "integer").min(0.0).max(10.0).build())
        .build();

    let mut first = DataRow::new();
    first.insert("code".to_string(), DataValue::Null);
    first.insert("age".to_string(), DataValue::Null);
    let mut second = DataRow::new();
    second.insert("code".to_string(), DataValue::Null);
    second.insert("age".to_string(), DataValue::Int(5));
    let mut third = DataRow::new();
    third.insert("code".to_string(), DataValue::from("A"));
    third.insert("age".to_string(), DataValue::Null);

    let dataset = DataSet::from_rows(vec![first, second, third]);
    let report = DataValidator::new().validate_with_data(&contract, &dataset, &ValidationContext::new());

    assert!(report.passed, "errors: {:?}", report.errors);
    assert!(report.warnings.is_empty(), "warnings: {:?}", report.warnings);
}

#[test]
fn test_missing_key_counts_as_null() {
    let contract = ContractBuilder::new("test", "owner")
        .field(FieldBuilder::new("email", "string").max_null_ratio(0.5).build())
        .build();

    let mut with_email = DataRow::new();
    with_email.insert("email".to_string(), DataValue::from("a@b.c"));
    let mut without_email = DataRow::new();
    without_email.insert("email".to_string(), DataValue::Null);
    let dataset = DataSet::from_rows(vec![
        with_email,
        without_email.clone(),
        without_email.into_iter().filter(|(k, _)| k != "email").collect(),
    ]);

    let report = DataValidator::new().validate_with_data(&contract, &dataset, &ValidationContext::new());
    assert_eq!(
        report.errors,
        vec!["ERROR: Field 'email' null ratio (66.67%) exceeds max_null_ratio=0.5".to_string()]
    );
}

#[test]
fn test_nan_counts_as_null_and_is_ignored_by_distribution() {
    let contract = ContractBuilder::new("test", "owner")
        .field(
            FieldBuilder::new("score", "float")
                .not_null()
                .distribution(DistributionRule {
                    mean: Some(2.0),
                    max_drift_pct: Some(1.0),
                    ..Default::default()
                })
                .build(),
        )
        .build();

    let dataset = single(
        "score",
        vec![DataValue::Float(1.0), DataValue::Float(f64::NAN), DataValue::Float(3.0)],
    );
    let report = DataValidator::new().validate_with_data(&contract, &dataset, &ValidationContext::new());

    assert_eq!(
        report.errors,
        vec!["ERROR: Field 'score' has 1 null values, but not_null=true".to_string()]
    );
    assert!(report.warnings.is_empty(), "warnings: {:?}", report.warnings);
}
