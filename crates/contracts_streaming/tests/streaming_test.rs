//! Integration tests for windowed stream validation.

use contracts_core::{
    Contract, ContractBuilder, DeadLetterConfig, FieldBuilder, StreamingConfig, WindowConfig,
    WindowType,
};
use contracts_streaming::{
    ManualClock, MemoryEngine, StreamMessage, StreamingError, StreamingOptions,
    StreamingValidator, WindowResult,
};
use contracts_validator::DataValidator;
use pretty_assertions::assert_eq;
use serde_json::json;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn events_contract(window_type: WindowType, duration: u64, slide: Option<u64>) -> Contract {
    let mut streaming = StreamingConfig::new("events");
    streaming.window = WindowConfig {
        window_type,
        duration_seconds: duration,
        slide_seconds: slide,
    };
    streaming.dlq = DeadLetterConfig {
        enabled: true,
        topic: Some("events.dlq".to_string()),
        ..Default::default()
    };

    ContractBuilder::new("events", "platform")
        .field(
            FieldBuilder::new("id", "integer")
                .required(true)
                .not_null()
                .build(),
        )
        .streaming(streaming)
        .build()
}

fn engine_for(contract: &Contract) -> MemoryEngine {
    let dlq = contract
        .streaming
        .as_ref()
        .map(|s| s.dlq.clone())
        .unwrap_or_default();
    MemoryEngine::new(dlq)
}

fn push_ids(engine: &mut MemoryEngine, timestamps_ms: &[i64]) {
    for (i, ts) in timestamps_ms.iter().enumerate() {
        engine.push_json(json!({ "id": i as i64 + 1 }), *ts);
    }
}

fn bounds(results: &[WindowResult]) -> Vec<(i64, i64, usize)> {
    results
        .iter()
        .map(|r| (r.window_start_ms, r.window_end_ms, r.row_count))
        .collect()
}

#[test]
fn test_tumbling_windows_split_on_boundary() {
    init_tracing();
    let contract = events_contract(WindowType::Tumbling, 5, None);
    let mut engine = engine_for(&contract);
    push_ids(&mut engine, &[0, 1_000, 2_000, 6_000, 7_000]);

    let mut validator = StreamingValidator::new(&contract, engine, DataValidator::new()).unwrap();
    let results = validator.run().unwrap();

    assert_eq!(bounds(&results), vec![(0, 5_000, 3), (5_000, 10_000, 2)]);
    assert!(results.iter().all(WindowResult::passed));
    assert!(validator.is_finished());
    assert!(validator.engine().is_closed());
    assert_eq!(validator.messages_seen(), 5);
}

#[test]
fn test_session_windows_close_on_gap() {
    init_tracing();
    let contract = events_contract(WindowType::Session, 5, None);
    let mut engine = engine_for(&contract);
    push_ids(&mut engine, &[0, 2_000, 4_000, 20_000, 22_000]);

    let mut validator = StreamingValidator::new(&contract, engine, DataValidator::new()).unwrap();
    let results = validator.run().unwrap();

    assert_eq!(bounds(&results), vec![(0, 4_000, 3), (20_000, 22_000, 2)]);
}

#[test]
fn test_sliding_windows_overlap() {
    init_tracing();
    let contract = events_contract(WindowType::Sliding, 10, Some(5));
    let mut engine = engine_for(&contract);
    push_ids(&mut engine, &[1_000, 6_000, 11_000]);

    let mut validator = StreamingValidator::new(&contract, engine, DataValidator::new()).unwrap();
    let results = validator.run().unwrap();

    assert_eq!(
        bounds(&results),
        vec![(-5_000, 5_000, 1), (0, 10_000, 2), (5_000, 15_000, 2)]
    );
}

#[test]
fn test_sliding_gap_emits_every_slide() {
    init_tracing();
    let contract = events_contract(WindowType::Sliding, 10, Some(5));
    let mut engine = engine_for(&contract);
    push_ids(&mut engine, &[1_000, 40_000]);

    let mut validator = StreamingValidator::new(&contract, engine, DataValidator::new()).unwrap();
    let results = validator.run().unwrap();

    let ends: Vec<i64> = results.iter().map(|r| r.window_end_ms).collect();
    assert_eq!(
        ends,
        vec![5_000, 10_000, 15_000, 20_000, 25_000, 30_000, 35_000, 40_000, 45_000]
    );
    let empty_warning = "WARN: Streaming window contained zero rows".to_string();
    for result in &results[2..8] {
        assert_eq!(result.row_count, 0);
        assert!(result.warnings.contains(&empty_warning));
    }
    assert_eq!(results[8].row_count, 1);
}

#[test]
fn test_sliding_gap_without_empty_windows() {
    init_tracing();
    let contract = events_contract(WindowType::Sliding, 10, Some(5));
    let mut engine = engine_for(&contract);
    push_ids(&mut engine, &[1_000, 40_000]);

    let mut validator = StreamingValidator::new(&contract, engine, DataValidator::new())
        .unwrap()
        .with_options(StreamingOptions::new().with_emit_empty_windows(false));
    let results = validator.run().unwrap();

    assert_eq!(
        bounds(&results),
        vec![(-5_000, 5_000, 1), (0, 10_000, 1), (35_000, 45_000, 1)]
    );
}

#[test]
fn test_failing_window_is_dead_lettered() {
    init_tracing();
    let contract = events_contract(WindowType::Tumbling, 5, None);
    let mut engine = engine_for(&contract);
    engine.push_message(StreamMessage::from_json(json!({"id": 1}), 0).with_key("a"));
    engine.push_json(json!({"id": null}), 1_000);
    engine.push_json(json!({"id": 3}), 2_000);
    engine.push_json(json!({"id": 4}), 6_000);

    let mut validator = StreamingValidator::new(&contract, engine, DataValidator::new()).unwrap();
    let results = validator.run().unwrap();

    let expected = vec!["ERROR: Field 'id' has 1 null values, but not_null=true".to_string()];
    assert_eq!(results[0].errors, expected);
    assert_eq!(results[0].dead_lettered, 3);
    assert!(results[1].passed());
    assert_eq!(results[1].dead_lettered, 0);

    let engine = validator.into_engine();
    let dead_letters = engine.dead_letters();
    assert_eq!(dead_letters.len(), 3);
    assert!(dead_letters.iter().all(|d| d.topic == "events.dlq"));
    assert_eq!(dead_letters[0].key.as_deref(), Some(b"a".as_slice()));
    assert_eq!(
        dead_letters[1].payload,
        json!({"id": null, "_dce_violation": {"violations": expected}})
    );
}

#[test]
fn test_failing_window_without_dead_letter_routing() {
    init_tracing();
    let mut contract = events_contract(WindowType::Tumbling, 5, None);
    if let Some(streaming) = contract.streaming.as_mut() {
        streaming.dlq = DeadLetterConfig::default();
    }
    let mut engine = engine_for(&contract);
    engine.push_json(json!({"id": null}), 0);

    let mut validator = StreamingValidator::new(&contract, engine, DataValidator::new()).unwrap();
    let results = validator.run().unwrap();

    assert!(!results[0].passed());
    assert_eq!(results[0].dead_lettered, 0);
    assert!(validator.engine().dead_letters().is_empty());
}

#[test]
fn test_idle_closes_overdue_window() {
    init_tracing();
    let contract = events_contract(WindowType::Tumbling, 5, None);
    let mut engine = engine_for(&contract);
    engine.push_json(json!({"id": 1}), 1_000);
    engine.push_idle();
    engine.push_idle();
    engine.push_idle();

    let clock = ManualClock::new(2_000);
    let mut validator = StreamingValidator::new(&contract, engine, DataValidator::new())
        .unwrap()
        .with_clock(clock.clone());

    assert!(validator.poll_once().unwrap().is_empty());
    assert!(validator.poll_once().unwrap().is_empty());

    clock.set(5_000);
    let results = validator.poll_once().unwrap();
    assert_eq!(bounds(&results), vec![(0, 5_000, 1)]);

    clock.set(10_000);
    let results = validator.poll_once().unwrap();
    assert_eq!(bounds(&results), vec![(5_000, 10_000, 0)]);
    assert_eq!(
        results[0].warnings,
        vec!["WARN: Streaming window contained zero rows".to_string()]
    );

    assert!(validator.poll_once().unwrap().is_empty());
    assert!(validator.is_finished());
}

#[test]
fn test_empty_windows_can_be_suppressed() {
    init_tracing();
    let contract = events_contract(WindowType::Tumbling, 5, None);
    let mut engine = engine_for(&contract);
    engine.push_json(json!({"id": 1}), 1_000);
    engine.push_idle();
    engine.push_idle();

    let clock = ManualClock::new(5_000);
    let mut validator = StreamingValidator::new(&contract, engine, DataValidator::new())
        .unwrap()
        .with_clock(clock.clone())
        .with_options(StreamingOptions::new().with_emit_empty_windows(false));

    let mut results = Vec::new();
    for _ in 0..2 {
        results.extend(validator.poll_once().unwrap());
        clock.advance(5_000);
    }
    results.extend(validator.poll_once().unwrap());

    assert_eq!(bounds(&results), vec![(0, 5_000, 1)]);
}

#[test]
fn test_transport_error_is_a_warning() {
    init_tracing();
    let contract = events_contract(WindowType::Tumbling, 5, None);
    let mut engine = engine_for(&contract);
    engine.push_transport_error("broker unavailable");
    engine.push_json(json!({"id": 1}), 1_000);

    let mut validator = StreamingValidator::new(&contract, engine, DataValidator::new())
        .unwrap()
        .with_clock(ManualClock::new(42));
    let results = validator.run().unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!((results[0].window_start_ms, results[0].window_end_ms), (42, 42));
    assert_eq!(
        results[0].warnings,
        vec!["WARN: Stream transport error: broker unavailable".to_string()]
    );
    assert!(results[0].passed());
    assert_eq!(results[1].row_count, 1);
}

#[test]
fn test_late_messages_are_counted() {
    init_tracing();
    let contract = events_contract(WindowType::Tumbling, 5, None);
    let mut engine = engine_for(&contract);
    push_ids(&mut engine, &[6_000, 1_000, 7_000]);

    let mut validator = StreamingValidator::new(&contract, engine, DataValidator::new()).unwrap();
    let results = validator.run().unwrap();

    assert_eq!(bounds(&results), vec![(5_000, 10_000, 2)]);
    assert_eq!(validator.late_messages(), 1);
}

#[test]
fn test_max_messages_stops_the_run() {
    init_tracing();
    let contract = events_contract(WindowType::Tumbling, 5, None);
    let mut engine = engine_for(&contract);
    push_ids(&mut engine, &[0, 1_000, 2_000]);

    let mut validator = StreamingValidator::new(&contract, engine, DataValidator::new())
        .unwrap()
        .with_options(StreamingOptions::new().with_max_messages(2));
    let results = validator.run().unwrap();

    assert_eq!(bounds(&results), vec![(0, 5_000, 2)]);
    assert!(validator.engine().is_closed());
    assert_eq!(validator.engine().pending(), 1);
}

#[test]
fn test_undecodable_messages_stay_in_window() {
    init_tracing();
    let contract = events_contract(WindowType::Tumbling, 5, None);
    let mut engine = engine_for(&contract);
    engine.push_json(json!({"id": null}), 0);
    engine.push_message(StreamMessage::from_bytes(None, Some(b"{oops".to_vec()), 1_000));

    let mut validator = StreamingValidator::new(&contract, engine, DataValidator::new()).unwrap();
    let results = validator.run().unwrap();

    assert_eq!(results[0].row_count, 1);
    assert_eq!(results[0].message_count, 2);
    assert_eq!(
        results[0].warnings,
        vec!["WARN: 1 stream messages could not be decoded as JSON objects".to_string()]
    );

    let dead_letters = validator.engine().dead_letters();
    assert_eq!(dead_letters.len(), 2);
    assert_eq!(dead_letters[1].payload["raw_value"], json!("{oops"));
}

#[test]
fn test_contract_without_streaming_is_rejected() {
    let contract = ContractBuilder::new("events", "platform").build();
    let err = StreamingValidator::new(&contract, MemoryEngine::new(Default::default()), DataValidator::new())
        .err()
        .unwrap();
    assert!(matches!(err, StreamingError::Configuration(_)));

    let mut contract = events_contract(WindowType::Sliding, 10, Some(5));
    if let Some(streaming) = contract.streaming.as_mut() {
        streaming.window.slide_seconds = None;
    }
    let err = StreamingValidator::new(&contract, MemoryEngine::new(Default::default()), DataValidator::new())
        .err()
        .unwrap();
    assert!(err.to_string().contains("slide_seconds"));
}

#[test]
fn test_yaml_contract_drives_stream() {
    init_tracing();
    let contract = contracts_parser::parse_yaml(
        r#"
version: "1.0.0"
name: payments
owner: finance
schema:
  fields:
    - name: id
      type: integer
      required: true
      rules:
        not_null: true
    - name: amount
      type: float
streaming:
  engine: kafka
  topic: payments.v1
  window:
    type: tumbling
    duration_seconds: 60
  dlq:
    enabled: true
    topic: payments.v1.dlq
    reason_field: _why
"#,
    )
    .unwrap();

    let mut engine = engine_for(&contract);
    engine.push_json(json!({"id": 1, "amount": 10.0}), 0);
    engine.push_json(json!({"id": null, "amount": 11.5}), 1_000);
    engine.push_json(json!({"id": 3, "amount": 9}), 61_000);

    let mut validator = StreamingValidator::new(&contract, engine, DataValidator::new()).unwrap();
    let results = validator.run().unwrap();

    assert_eq!(bounds(&results), vec![(0, 60_000, 2), (60_000, 120_000, 1)]);
    assert!(!results[0].passed());
    assert!(results[1].passed());

    let dead_letters = validator.engine().dead_letters();
    assert_eq!(dead_letters.len(), 2);
    assert!(dead_letters.iter().all(|d| d.topic == "payments.v1.dlq"));
    assert_eq!(
        dead_letters[0].payload["_why"]["violations"],
        json!(["ERROR: Field 'id' has 1 null values, but not_null=true"])
    );
}

#[test]
fn test_window_results_serialize() {
    let result = WindowResult {
        window_start_ms: 0,
        window_end_ms: 5_000,
        row_count: 1,
        message_count: 1,
        errors: Vec::new(),
        warnings: vec!["WARN: w".to_string()],
        dead_lettered: 0,
    };
    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(value["window_end_ms"], json!(5_000));
    assert_eq!(value["warnings"], json!(["WARN: w"]));
}
