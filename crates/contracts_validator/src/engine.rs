//! Main validation engine.
//!
//! This module provides the main `DataValidator` that orchestrates all checks:
//! schema, field quality rules, row-count SLA, distribution drift and custom
//! rules. It validates either a dataset held in memory or a [`ChunkSource`]
//! read in bounded chunks.

use crate::{
    ChunkSource, ChunkedQualityValidator, CustomRuleRegistry, CustomRuleValidator, DataSet,
    DistributionAccumulator, DistributionValidator, QualityValidator, Result, SampleOptions,
    Sampler, SchemaProfile, SchemaValidator, SlaValidator,
};
use contracts_core::{Contract, ValidationContext, ValidationReport, ValidationStats};
use std::time::Instant;
use tracing::{debug, info};

/// Validates one in-memory batch against a contract.
///
/// This is the seam the streaming validator drives once per window.
pub trait BatchValidator {
    /// Validates `dataset` and reports every violation found.
    fn validate_batch(&mut self, contract: &Contract, dataset: &DataSet) -> ValidationReport;
}

/// Main validation engine for data contracts.
///
/// Orchestrates all validation checks and produces comprehensive validation reports.
///
/// # Example
///
/// ```rust
/// use contracts_core::{ContractBuilder, FieldBuilder, ValidationContext};
/// use contracts_validator::{DataRow, DataSet, DataValidator, DataValue};
///
/// let contract = ContractBuilder::new("users", "crm")
///     .field(FieldBuilder::new("id", "integer").required(true).not_null().build())
///     .build();
///
/// let mut row = DataRow::new();
/// row.insert("id".to_string(), DataValue::Null);
/// let dataset = DataSet::from_rows(vec![row]);
///
/// let validator = DataValidator::new();
/// let report = validator.validate_with_data(&contract, &dataset, &ValidationContext::new());
///
/// assert!(!report.passed);
/// assert_eq!(report.errors, vec!["ERROR: Field 'id' has 1 null values, but not_null=true"]);
/// ```
pub struct DataValidator {
    schema_validator: SchemaValidator,
    quality_validator: QualityValidator,
    sla_validator: SlaValidator,
    distribution_validator: DistributionValidator,
    custom_validator: CustomRuleValidator,
    context: ValidationContext,
}

impl DataValidator {
    /// Creates a new data validator without custom rules.
    pub fn new() -> Self {
        Self {
            schema_validator: SchemaValidator::new(),
            quality_validator: QualityValidator::new(),
            sla_validator: SlaValidator::new(),
            distribution_validator: DistributionValidator::new(),
            custom_validator: CustomRuleValidator::default(),
            context: ValidationContext::default(),
        }
    }

    /// Sets the custom rules available to contracts.
    pub fn with_registry(mut self, registry: CustomRuleRegistry) -> Self {
        self.custom_validator = CustomRuleValidator::new(registry);
        self
    }

    /// Sets the context used by [`BatchValidator::validate_batch`].
    pub fn with_context(mut self, context: ValidationContext) -> Self {
        self.context = context;
        self
    }

    /// Validates a contract against a dataset held in memory.
    ///
    /// # Arguments
    ///
    /// * `contract` - The contract to validate against
    /// * `dataset` - The data to validate
    /// * `context` - Validation context with options
    ///
    /// # Returns
    ///
    /// A `ValidationReport` whose errors are the `ERROR:` violations and whose
    /// warnings are the `WARN:` violations.
    pub fn validate_with_data(
        &self,
        contract: &Contract,
        dataset: &DataSet,
        context: &ValidationContext,
    ) -> ValidationReport {
        let start = Instant::now();

        let sampled;
        let data = match context.sample_size {
            Some(size) if size < dataset.len() => {
                sampled = Sampler::sample_rows(dataset, size, context.sample_seed);
                debug!("Sampled {} of {} rows", sampled.len(), dataset.len());
                &sampled
            }
            _ => dataset,
        };

        // 1. Schema validation (always runs)
        let mut violations = self.schema_validator.validate(contract, data);

        if !context.schema_only {
            // 2. Field quality rules
            violations.extend(self.quality_validator.validate(
                contract,
                data,
                &context.severity_overrides,
            ));

            // 3. Row-count SLA
            violations.extend(self.sla_validator.validate(contract, data.len()));

            // 4. Distribution drift and outliers
            violations.extend(self.distribution_validator.validate(contract, data));

            // 5. Custom rules
            violations.extend(self.custom_validator.validate(
                contract,
                data,
                &context.severity_overrides,
            ));
        }

        self.build_report(
            violations,
            context,
            ValidationStats {
                records_validated: data.len(),
                chunks_processed: 1,
                fields_checked: contract.schema.fields.len(),
                duration_ms: 0,
            },
            start,
        )
    }

    /// Validates a contract against a chunked source.
    ///
    /// Reads the source once, folding every chunk into the schema profile and
    /// the quality and distribution accumulators, then reads it a second
    /// time only if some field asks for outlier detection. Memory use is
    /// bounded by `options.chunk_size` plus the per-field summaries.
    ///
    /// Custom rules need the whole dataset and are not run here. Sampling
    /// options other than `chunk_size` are ignored; use [`Sampler`] first to
    /// validate a sample.
    pub fn validate_source<S: ChunkSource + ?Sized>(
        &self,
        contract: &Contract,
        source: &S,
        context: &ValidationContext,
        options: &SampleOptions,
    ) -> Result<ValidationReport> {
        options.validate()?;
        let start = Instant::now();

        let mut profile = SchemaProfile::new();
        let mut quality =
            ChunkedQualityValidator::new(contract, context.severity_overrides.clone());
        let mut distribution = DistributionAccumulator::new(contract);
        let mut chunks = 0;

        for chunk in source.iter_chunks(options.chunk_size)? {
            let chunk = chunk?;
            chunks += 1;
            profile.observe(&chunk);
            if !context.schema_only {
                quality.process_chunk(&chunk);
                distribution.process_chunk(&chunk);
            }
        }
        let rows = profile.rows();
        info!(
            "Validated {} rows in {} chunks for contract '{}'",
            rows, chunks, contract.name
        );

        let mut violations = self.schema_validator.validate_profile(contract, &profile);

        if !context.schema_only {
            let fields_with_rules = quality.fields_checked();
            violations.extend(quality.finalize());
            violations.extend(self.sla_validator.validate(contract, rows));
            violations.extend(distribution.finalize_drift());

            if distribution.needs_outlier_pass() {
                debug!("Starting outlier pass for contract '{}'", contract.name);
                let mut failure = None;
                let chunks = source.iter_chunks(options.chunk_size)?.map_while(|chunk| {
                    chunk
                        .map_err(|e| failure = Some(e))
                        .ok()
                });
                let outliers = distribution.count_outliers(chunks);
                if let Some(e) = failure {
                    return Err(e);
                }
                violations.extend(outliers);
            }
            debug!(
                "Evaluated {} fields with rules for contract '{}'",
                fields_with_rules, contract.name
            );
        }

        Ok(self.build_report(
            violations,
            context,
            ValidationStats {
                records_validated: rows,
                chunks_processed: chunks,
                fields_checked: contract.schema.fields.len(),
                duration_ms: 0,
            },
            start,
        ))
    }

    /// Builds a validation report from collected violations.
    fn build_report(
        &self,
        violations: Vec<String>,
        context: &ValidationContext,
        mut stats: ValidationStats,
        start: Instant,
    ) -> ValidationReport {
        let mut report = ValidationReport::from_violations(violations);
        if context.strict {
            report.promote_warnings();
        }
        stats.duration_ms = start.elapsed().as_millis() as u64;
        report.stats = stats;
        report
    }
}

impl Default for DataValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchValidator for DataValidator {
    fn validate_batch(&mut self, contract: &Contract, dataset: &DataSet) -> ValidationReport {
        self.validate_with_data(contract, dataset, &self.context)
    }
}
