//! Parser for Data Contracts (YAML, JSON and TOML formats).
//!
//! Deserializes contracts into the strongly-typed [`Contract`] structure and
//! checks the configuration they carry, so a sliding window without a slide
//! interval or a dead-letter queue without a topic fails at load time rather
//! than in the middle of a stream.
//!
//! # Example
//!
//! ```rust
//! use contracts_parser::parse_yaml;
//!
//! let yaml = r#"
//! version: "2.0.0"
//! name: user_events
//! owner: analytics-team
//! schema:
//!   fields:
//!     - name: user_id
//!       type: string
//!       required: true
//!       rules:
//!         not_null: true
//! "#;
//!
//! let contract = parse_yaml(yaml).expect("Failed to parse contract");
//! assert_eq!(contract.name, "user_events");
//! ```

use contracts_core::{Contract, ContractError};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during contract parsing.
#[derive(Debug, Error)]
pub enum ParserError {
    /// YAML parsing or deserialization failed
    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml_ng::Error),

    /// JSON parsing or deserialization failed
    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    /// TOML parsing or deserialization failed
    #[error("Failed to parse TOML: {0}")]
    TomlError(String),

    /// The contract parsed but its configuration is unusable
    #[error("Invalid contract: {0}")]
    Contract(#[from] ContractError),

    /// File I/O error
    #[error("File I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Unsupported file format
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Invalid file extension
    #[error("Invalid or missing file extension")]
    InvalidExtension,
}

/// Result type alias for parser operations.
pub type Result<T> = std::result::Result<T, ParserError>;

/// Supported contract file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractFormat {
    /// YAML format (.yml, .yaml)
    Yaml,
    /// JSON format (.json)
    Json,
    /// TOML format (.toml)
    Toml,
}

fn checked(contract: Contract) -> Result<Contract> {
    contract.validate_config()?;
    debug!(
        "Parsed contract '{}' v{} with {} fields",
        contract.name,
        contract.version,
        contract.schema.fields.len()
    );
    Ok(contract)
}

/// Parse a contract from a YAML string.
pub fn parse_yaml(content: &str) -> Result<Contract> {
    let contract: Contract = serde_yaml_ng::from_str(content)?;
    checked(contract)
}

/// Parse a contract from a JSON string.
///
/// # Example
///
/// ```rust
/// use contracts_parser::parse_json;
///
/// let json = r#"{"version": "2.0.0", "name": "orders", "owner": "sales", "schema": {"fields": []}}"#;
/// let contract = parse_json(json).unwrap();
/// assert_eq!(contract.owner, "sales");
/// ```
pub fn parse_json(content: &str) -> Result<Contract> {
    let contract: Contract = serde_json::from_str(content)?;
    checked(contract)
}

/// Parse a contract from a TOML string.
///
/// # Example
///
/// ```rust
/// use contracts_parser::parse_toml;
///
/// let toml = r#"
/// version = "2.0.0"
/// name = "my_dataset"
/// owner = "data-team"
///
/// [schema]
/// fields = []
/// "#;
///
/// let contract = parse_toml(toml).unwrap();
/// assert_eq!(contract.name, "my_dataset");
/// ```
pub fn parse_toml(content: &str) -> Result<Contract> {
    let contract: Contract =
        toml::from_str(content).map_err(|e| ParserError::TomlError(e.to_string()))?;
    checked(contract)
}

/// Detect the contract format from a file path based on its extension.
///
/// # Supported Extensions
///
/// * `.yaml`, `.yml` → `ContractFormat::Yaml`
/// * `.json` → `ContractFormat::Json`
/// * `.toml` → `ContractFormat::Toml`
pub fn detect_format(path: &Path) -> Result<ContractFormat> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or(ParserError::InvalidExtension)?;

    match extension.to_lowercase().as_str() {
        "yaml" | "yml" => Ok(ContractFormat::Yaml),
        "json" => Ok(ContractFormat::Json),
        "toml" => Ok(ContractFormat::Toml),
        other => Err(ParserError::UnsupportedFormat(other.to_string())),
    }
}

/// Parse a contract from a file with automatic format detection.
///
/// ```no_run
/// use contracts_parser::parse_file;
/// use std::path::Path;
///
/// let contract = parse_file(Path::new("contracts/user_events.yml")).unwrap();
/// println!("Loaded contract: {}", contract.name);
/// ```
pub fn parse_file(path: &Path) -> Result<Contract> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        ContractFormat::Yaml => parse_yaml(&content),
        ContractFormat::Json => parse_json(&content),
        ContractFormat::Toml => parse_toml(&content),
    }
}
