//! Distribution drift and outlier detection.
//!
//! Each field with a distribution baseline keeps a `(count, mean, M2)` summary.
//! Chunk summaries are combined with the parallel variance merge, so the order
//! and sizes of chunks do not change the result beyond floating point noise.
//! Standard deviations are population deviations (`sqrt(M2 / count)`).
//!
//! All findings are reported as `WARN`.

use crate::DataSet;
use contracts_core::{format_violation, Contract, DistributionRule, Severity};
use std::borrow::Borrow;
use tracing::debug;

/// Running summary of a numeric column.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DistributionStat {
    /// Number of values
    pub count: u64,
    /// Mean of the values
    pub mean: f64,
    /// Sum of squared deviations from the mean
    pub m2: f64,
}

impl DistributionStat {
    /// Summarizes a slice of values.
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let count = values.len() as u64;
        let mean = values.iter().sum::<f64>() / count as f64;
        let m2 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
        Self { count, mean, m2 }
    }

    /// Combines two summaries.
    ///
    /// ```rust
    /// use contracts_validator::DistributionStat;
    ///
    /// let left = DistributionStat::from_values(&[1.0, 2.0]);
    /// let right = DistributionStat::from_values(&[3.0, 4.0]);
    /// let merged = left.merge(&right);
    /// let whole = DistributionStat::from_values(&[1.0, 2.0, 3.0, 4.0]);
    /// assert!((merged.mean - whole.mean).abs() < 1e-12);
    /// assert!((merged.m2 - whole.m2).abs() < 1e-12);
    /// ```
    pub fn merge(&self, other: &DistributionStat) -> DistributionStat {
        if other.count == 0 {
            return *self;
        }
        if self.count == 0 {
            return *other;
        }
        let count = self.count + other.count;
        let delta = other.mean - self.mean;
        let mean = self.mean + delta * other.count as f64 / count as f64;
        let m2 = self.m2
            + other.m2
            + delta * delta * self.count as f64 * other.count as f64 / count as f64;
        DistributionStat { count, mean, m2 }
    }

    /// Population variance, zero for an empty summary.
    pub fn variance(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.m2 / self.count as f64
        }
    }

    /// Population standard deviation.
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}

/// Relative drift of `current` from `baseline`, in percent.
///
/// A zero baseline yields 100% for any non-zero current value and 0% otherwise.
pub fn relative_drift_pct(current: f64, baseline: f64) -> f64 {
    if baseline == 0.0 {
        if current == 0.0 { 0.0 } else { 100.0 }
    } else {
        ((current - baseline) / baseline).abs() * 100.0
    }
}

struct FieldDistribution<'a> {
    name: &'a str,
    column: String,
    rule: &'a DistributionRule,
    stat: DistributionStat,
    non_numeric: usize,
}

/// Accumulates distribution summaries over chunks.
pub struct DistributionAccumulator<'a> {
    fields: Vec<FieldDistribution<'a>>,
}

impl<'a> DistributionAccumulator<'a> {
    /// Creates an accumulator for every field of `contract` that declares a
    /// distribution baseline.
    pub fn new(contract: &'a Contract) -> Self {
        let fields = contract
            .schema
            .fields
            .iter()
            .filter_map(|field| {
                field.distribution.as_ref().map(|rule| FieldDistribution {
                    name: &field.name,
                    column: contract.resolve_column_name(&field.name),
                    rule,
                    stat: DistributionStat::default(),
                    non_numeric: 0,
                })
            })
            .collect();
        Self { fields }
    }

    /// Folds one chunk into the summaries.
    ///
    /// Nulls are ignored; values that cannot be coerced to a number are
    /// counted and left out of the summary.
    pub fn process_chunk(&mut self, chunk: &DataSet) {
        for field in &mut self.fields {
            if !chunk.has_column(&field.column) {
                continue;
            }
            let mut values = Vec::new();
            for value in chunk.column_values(&field.column) {
                if value.is_missing() {
                    continue;
                }
                match value.as_numeric() {
                    Some(n) => values.push(n),
                    None => field.non_numeric += 1,
                }
            }
            field.stat = field.stat.merge(&DistributionStat::from_values(&values));
        }
    }

    /// Returns the accumulated summary for `field`.
    pub fn stat(&self, field: &str) -> Option<DistributionStat> {
        self.fields
            .iter()
            .find(|f| f.name == field)
            .map(|f| f.stat)
    }

    /// Compares the accumulated mean and standard deviation with each
    /// baseline.
    ///
    /// Only fields with at least one numeric value and a `max_drift_pct` are
    /// checked; each of mean and std is checked only if its baseline is set.
    pub fn finalize_drift(&self) -> Vec<String> {
        let mut violations = Vec::new();
        for field in &self.fields {
            if field.non_numeric > 0 {
                violations.push(format_violation(
                    Severity::Warn,
                    format!(
                        "Field '{}' has {} non-numeric values ignored for distribution checks",
                        field.name, field.non_numeric
                    ),
                ));
            }

            let Some(max_drift) = field.rule.max_drift_pct else {
                continue;
            };
            if field.stat.count == 0 {
                continue;
            }

            if let Some(baseline) = field.rule.mean {
                let drift = relative_drift_pct(field.stat.mean, baseline);
                if drift > max_drift {
                    violations.push(format_violation(
                        Severity::Warn,
                        format!(
                            "Field '{}' mean drift {:.2}% exceeds threshold {}%",
                            field.name, drift, max_drift
                        ),
                    ));
                }
            }

            if let Some(baseline) = field.rule.std {
                let drift = relative_drift_pct(field.stat.std_dev(), baseline);
                if drift > max_drift {
                    violations.push(format_violation(
                        Severity::Warn,
                        format!(
                            "Field '{}' std drift {:.2}% exceeds threshold {}%",
                            field.name, drift, max_drift
                        ),
                    ));
                }
            }
        }
        violations
    }

    /// Returns true iff some field declares `max_z_score`.
    pub fn needs_outlier_pass(&self) -> bool {
        self.fields.iter().any(|f| f.rule.max_z_score.is_some())
    }

    /// Counts outliers in a second pass over the data.
    ///
    /// Z-scores are measured against the accumulated mean and std, so this
    /// runs after every chunk has been processed. Fields whose std is not
    /// positive are skipped.
    pub fn count_outliers<I, C>(&self, chunks: I) -> Vec<String>
    where
        I: IntoIterator<Item = C>,
        C: Borrow<DataSet>,
    {
        struct Target<'b> {
            name: &'b str,
            column: &'b str,
            mean: f64,
            std: f64,
            z: f64,
            outliers: usize,
        }

        let mut targets: Vec<Target<'_>> = self
            .fields
            .iter()
            .filter_map(|field| {
                let z = field.rule.max_z_score?;
                if field.stat.count == 0 {
                    return None;
                }
                let mean = field.stat.mean;
                let std = field.stat.std_dev();
                if std <= 0.0 {
                    debug!("Skipping outlier check for '{}': std is {}", field.name, std);
                    return None;
                }
                Some(Target {
                    name: field.name,
                    column: &field.column,
                    mean,
                    std,
                    z,
                    outliers: 0,
                })
            })
            .collect();

        if targets.is_empty() {
            return Vec::new();
        }

        for chunk in chunks {
            let chunk = chunk.borrow();
            for target in &mut targets {
                target.outliers += chunk
                    .column_values(target.column)
                    .filter_map(|v| v.as_numeric())
                    .filter(|n| ((n - target.mean) / target.std).abs() > target.z)
                    .count();
            }
        }

        targets
            .into_iter()
            .filter(|t| t.outliers > 0)
            .map(|t| {
                format_violation(
                    Severity::Warn,
                    format!(
                        "Field '{}' has {} outliers (z-score > {})",
                        t.name, t.outliers, t.z
                    ),
                )
            })
            .collect()
    }
}

/// One-shot distribution validation over a whole dataset.
pub struct DistributionValidator;

impl DistributionValidator {
    /// Creates a new distribution validator.
    pub fn new() -> Self {
        Self
    }

    /// Runs drift and outlier checks for `contract` against `dataset`.
    pub fn validate(&self, contract: &Contract, dataset: &DataSet) -> Vec<String> {
        let mut accumulator = DistributionAccumulator::new(contract);
        accumulator.process_chunk(dataset);
        let mut violations = accumulator.finalize_drift();
        if accumulator.needs_outlier_pass() {
            violations.extend(accumulator.count_outliers(std::iter::once(dataset)));
        }
        violations
    }
}

impl Default for DistributionValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DataRow, DataValue};
    use contracts_core::{ContractBuilder, FieldBuilder};
    use pretty_assertions::assert_eq;

    fn values(column: &str, values: &[f64]) -> DataSet {
        values
            .iter()
            .map(|v| {
                let mut row = DataRow::new();
                row.insert(column.to_string(), DataValue::Float(*v));
                row
            })
            .collect()
    }

    fn contract(rule: DistributionRule) -> Contract {
        ContractBuilder::new("t", "o")
            .field(FieldBuilder::new("value", "float").distribution(rule).build())
            .build()
    }

    #[test]
    fn test_stat_basics() {
        let stat = DistributionStat::from_values(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(stat.count, 8);
        assert!((stat.mean - 5.0).abs() < 1e-12);
        assert!((stat.std_dev() - 2.0).abs() < 1e-12);
        assert_eq!(DistributionStat::default().std_dev(), 0.0);
    }

    #[test]
    fn test_merge_with_empty() {
        let stat = DistributionStat::from_values(&[1.0, 3.0]);
        assert_eq!(stat.merge(&DistributionStat::default()), stat);
        assert_eq!(DistributionStat::default().merge(&stat), stat);
    }

    #[test]
    fn test_relative_drift() {
        assert_eq!(relative_drift_pct(0.0, 0.0), 0.0);
        assert_eq!(relative_drift_pct(3.0, 0.0), 100.0);
        assert!((relative_drift_pct(11.0, 10.0) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_mean_drift_warning() {
        let contract = contract(DistributionRule {
            mean: Some(10.0),
            std: None,
            max_drift_pct: Some(15.0),
            max_z_score: None,
        });
        let mut acc = DistributionAccumulator::new(&contract);
        acc.process_chunk(&values("value", &[12.0, 13.0]));
        acc.process_chunk(&values("value", &[12.0, 13.0]));

        assert_eq!(
            acc.finalize_drift(),
            vec!["WARN: Field 'value' mean drift 25.00% exceeds threshold 15%".to_string()]
        );
        assert!(!acc.needs_outlier_pass());
    }

    #[test]
    fn test_std_drift_from_zero_baseline() {
        let contract = contract(DistributionRule {
            mean: None,
            std: Some(0.0),
            max_drift_pct: Some(50.0),
            max_z_score: None,
        });
        let mut acc = DistributionAccumulator::new(&contract);
        acc.process_chunk(&values("value", &[1.0, 2.0]));
        assert_eq!(
            acc.finalize_drift(),
            vec!["WARN: Field 'value' std drift 100.00% exceeds threshold 50%".to_string()]
        );
    }

    #[test]
    fn test_outliers_use_accumulated_stats() {
        // The baseline would flag nine of these values
        let contract = contract(DistributionRule {
            mean: Some(40.0),
            std: Some(1.0),
            max_drift_pct: None,
            max_z_score: Some(2.5),
        });
        let chunks = vec![
            values("value", &[10.0, 10.0, 10.0, 40.0]),
            values("value", &[10.0, 10.0, 10.0, 10.0, 10.0, 10.0]),
        ];

        let mut acc = DistributionAccumulator::new(&contract);
        for chunk in &chunks {
            acc.process_chunk(chunk);
        }
        let stat = acc.stat("value").unwrap();
        assert!((stat.mean - 13.0).abs() < 1e-12);
        assert!((stat.std_dev() - 9.0).abs() < 1e-12);

        assert!(acc.needs_outlier_pass());
        assert_eq!(
            acc.count_outliers(&chunks),
            vec!["WARN: Field 'value' has 1 outliers (z-score > 2.5)".to_string()]
        );
    }

    #[test]
    fn test_shifted_data_has_no_outliers_relative_to_itself() {
        let contract = contract(DistributionRule {
            mean: Some(10.0),
            std: Some(1.0),
            max_drift_pct: None,
            max_z_score: Some(3.0),
        });
        let shifted: Vec<f64> = (100..110).map(f64::from).collect();
        assert!(DistributionValidator::new()
            .validate(&contract, &values("value", &shifted))
            .is_empty());
    }

    #[test]
    fn test_outliers_skipped_for_constant_column() {
        let contract = contract(DistributionRule {
            max_z_score: Some(1.0),
            ..Default::default()
        });
        let data = values("value", &[4.0, 4.0, 4.0]);
        assert!(DistributionValidator::new().validate(&contract, &data).is_empty());
    }

    #[test]
    fn test_non_numeric_values_are_reported() {
        let contract = contract(DistributionRule {
            mean: Some(1.0),
            max_drift_pct: Some(10.0),
            ..Default::default()
        });
        let mut data = values("value", &[1.0]);
        let mut row = DataRow::new();
        row.insert("value".to_string(), DataValue::from("oops"));
        data.add_row(row);

        assert_eq!(
            DistributionValidator::new().validate(&contract, &data),
            vec![
                "WARN: Field 'value' has 1 non-numeric values ignored for distribution checks"
                    .to_string()
            ]
        );
    }
}
