//! # Data Contracts Validator
//!
//! Validation engine for data contracts. This crate checks data against
//! contract definitions, whether the data fits in memory or has to be read
//! as a sequence of bounded chunks:
//!
//! - Schema validation (column presence, undeclared columns, types)
//! - Field quality rules (nulls, uniqueness, ranges, patterns, enums, freshness)
//! - Distribution drift and z-score outliers against a baseline
//! - Row-count SLAs and registered custom rules
//! - Seeded row sampling over chunked sources
//!
//! Chunked validation keeps only per-field summaries between chunks, and
//! reports the same violations as validating the whole dataset at once.
//!
//! ## Example
//!
//! ```rust
//! use contracts_core::{ContractBuilder, FieldBuilder, ValidationContext};
//! use contracts_validator::{DataSet, DataValidator, SampleOptions};
//!
//! let contract = ContractBuilder::new("events", "platform")
//!     .field(FieldBuilder::new("id", "integer").required(true).unique().build())
//!     .build();
//!
//! let dataset = DataSet::from_json_objects(
//!     serde_json::json!([{"id": 1}, {"id": 2}, {"id": 2}])
//!         .as_array()
//!         .unwrap()
//!         .iter()
//!         .filter_map(|v| v.as_object().cloned()),
//! );
//!
//! let validator = DataValidator::new();
//! let report = validator
//!     .validate_source(
//!         &contract,
//!         &dataset,
//!         &ValidationContext::new(),
//!         &SampleOptions::default().with_chunk_size(2),
//!     )
//!     .unwrap();
//!
//! if report.passed {
//!     println!("Validation passed!");
//! } else {
//!     println!("Validation failed: {:?}", report.errors);
//! }
//! assert_eq!(report.errors.len(), 1);
//! ```

mod custom;
mod dataset;
mod distribution;
mod engine;
mod error;
mod quality;
mod sampling;
mod schema;
mod sla;
mod source;

pub use custom::*;
pub use dataset::*;
pub use distribution::*;
pub use engine::*;
pub use error::*;
pub use quality::*;
pub use sampling::*;
pub use schema::*;
pub use sla::*;
pub use source::*;
