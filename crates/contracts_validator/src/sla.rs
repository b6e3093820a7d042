//! Row-count SLA validation.

use contracts_core::{format_violation, Contract};

/// Checks the dataset row count against the contract SLA.
///
/// Works on a count rather than the rows themselves so a chunked pass only
/// has to keep a running total.
pub struct SlaValidator;

impl SlaValidator {
    /// Creates a new SLA validator.
    pub fn new() -> Self {
        Self
    }

    /// Validates `row_count` against `contract.sla`.
    pub fn validate(&self, contract: &Contract, row_count: usize) -> Vec<String> {
        let mut violations = Vec::new();
        let Some(sla) = &contract.sla else {
            return violations;
        };
        let count = row_count as u64;

        if let Some(min_rows) = sla.min_rows {
            if count < min_rows {
                violations.push(format_violation(
                    sla.min_rows_severity,
                    format!("SLA min_rows={} violated (found {})", min_rows, count),
                ));
            }
        }
        if let Some(max_rows) = sla.max_rows {
            if count > max_rows {
                violations.push(format_violation(
                    sla.max_rows_severity,
                    format!("SLA max_rows={} violated (found {})", max_rows, count),
                ));
            }
        }
        violations
    }
}

impl Default for SlaValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts_core::{ContractBuilder, Severity, Sla};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_row_count_bounds() {
        let contract = ContractBuilder::new("t", "o")
            .sla(Sla {
                min_rows: Some(10),
                max_rows: Some(100),
                min_rows_severity: Severity::Error,
                max_rows_severity: Severity::Warn,
            })
            .build();
        let validator = SlaValidator::new();

        assert_eq!(
            validator.validate(&contract, 3),
            vec!["ERROR: SLA min_rows=10 violated (found 3)".to_string()]
        );
        assert_eq!(
            validator.validate(&contract, 101),
            vec!["WARN: SLA max_rows=100 violated (found 101)".to_string()]
        );
        assert!(validator.validate(&contract, 10).is_empty());
    }

    #[test]
    fn test_no_sla() {
        let contract = ContractBuilder::new("t", "o").build();
        assert!(SlaValidator::new().validate(&contract, 0).is_empty());
    }
}
