//! # Data Contracts Streaming
//!
//! Windowed validation of live message streams. Messages are grouped into
//! tumbling, sliding or session windows by event time; each closed window is
//! validated once as a batch, and failing windows can be routed to a
//! dead-letter topic.
//!
//! The broker sits behind the [`StreamingEngine`] trait. [`MemoryEngine`]
//! replays a scripted stream in process.
//!
//! ## Example
//!
//! ```rust
//! use contracts_core::{
//!     ContractBuilder, DeadLetterConfig, FieldBuilder, StreamingConfig, WindowConfig, WindowType,
//! };
//! use contracts_streaming::{MemoryEngine, StreamingValidator};
//! use contracts_validator::DataValidator;
//! use serde_json::json;
//!
//! let mut streaming = StreamingConfig::new("orders");
//! streaming.window = WindowConfig {
//!     window_type: WindowType::Tumbling,
//!     duration_seconds: 60,
//!     slide_seconds: None,
//! };
//! streaming.dlq = DeadLetterConfig {
//!     enabled: true,
//!     topic: Some("orders.dlq".to_string()),
//!     ..Default::default()
//! };
//!
//! let contract = ContractBuilder::new("orders", "sales")
//!     .field(FieldBuilder::new("order_id", "string").not_null().build())
//!     .streaming(streaming.clone())
//!     .build();
//!
//! let mut engine = MemoryEngine::new(streaming.dlq.clone());
//! engine.push_json(json!({"order_id": "a-1"}), 1_000);
//! engine.push_json(json!({"order_id": null}), 2_000);
//!
//! let mut validator = StreamingValidator::new(&contract, engine, DataValidator::new()).unwrap();
//! let results = validator.run().unwrap();
//!
//! assert_eq!(results[0].errors.len(), 1);
//! assert_eq!(validator.engine().dead_letters().len(), 2);
//! ```

mod clock;
mod engine;
mod error;
mod message;
mod validator;
mod window;

pub use clock::*;
pub use engine::*;
pub use error::*;
pub use message::*;
pub use validator::*;
pub use window::*;
