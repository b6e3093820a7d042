//! # Data Contracts Core
//!
//! Core data structures and types for the Data Contracts Engine.
//!
//! A data contract is a formal agreement about the structure, quality, and
//! distribution of data shared between systems. This crate holds the parsed,
//! immutable contract that the chunked and streaming validators consume.
//!
//! ## Key Concepts
//!
//! - **Contract**: fields, dataset-level SLA, custom rules and streaming config
//! - **FieldRules**: explicitly optional quality rules (not_null, unique, ranges,
//!   regex, enum, null ratio, freshness) with per-rule severities
//! - **DistributionRule**: baseline mean/std with drift and z-score thresholds
//! - **StreamingConfig**: window strategy and dead-letter routing
//!
//! ## Example
//!
//! ```rust
//! use contracts_core::{ContractBuilder, DistributionRule, FieldBuilder};
//!
//! let contract = ContractBuilder::new("payments", "finance-team")
//!     .field(FieldBuilder::new("payment_id", "string").required(true).not_null().unique().build())
//!     .field(
//!         FieldBuilder::new("amount", "float")
//!             .min(0.0)
//!             .distribution(DistributionRule {
//!                 mean: Some(120.0),
//!                 std: Some(35.0),
//!                 max_drift_pct: Some(10.0),
//!                 max_z_score: Some(4.0),
//!             })
//!             .build(),
//!     )
//!     .build();
//!
//! assert_eq!(contract.schema.fields.len(), 2);
//! ```

pub mod builder;
pub mod contract;
pub mod error;
pub mod validator;

pub use builder::*;
pub use contract::*;
pub use error::*;
pub use validator::*;
