//! Windowed validation over a live stream.

use crate::{
    ClosedWindow, Clock, Poll, Result, StreamingEngine, StreamingError, SystemClock, WindowManager,
};
use contracts_core::{format_violation, Contract, Severity, StreamingConfig};
use contracts_validator::{BatchValidator, DataSet};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Run-time options for a streaming run.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamingOptions {
    /// Emit a result for windows without rows
    pub emit_empty_windows: bool,

    /// Stop after this many messages
    pub max_messages: Option<u64>,
}

impl Default for StreamingOptions {
    fn default() -> Self {
        Self {
            emit_empty_windows: true,
            max_messages: None,
        }
    }
}

impl StreamingOptions {
    /// Creates the default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether windows without rows produce a result.
    pub fn with_emit_empty_windows(mut self, emit: bool) -> Self {
        self.emit_empty_windows = emit;
        self
    }

    /// Stops the run after `max` messages.
    pub fn with_max_messages(mut self, max: u64) -> Self {
        self.max_messages = Some(max);
        self
    }
}

/// Validation result for one window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowResult {
    /// Window start in epoch milliseconds
    pub window_start_ms: i64,
    /// Window end in epoch milliseconds
    pub window_end_ms: i64,
    /// Rows validated
    pub row_count: usize,
    /// Messages in the window, including undecodable ones
    pub message_count: usize,
    /// Blocking violations
    pub errors: Vec<String>,
    /// Non-blocking violations
    pub warnings: Vec<String>,
    /// Messages forwarded to the dead-letter sink
    pub dead_lettered: usize,
}

impl WindowResult {
    fn warning(start_ms: i64, end_ms: i64, message_count: usize, warnings: Vec<String>) -> Self {
        Self {
            window_start_ms: start_ms,
            window_end_ms: end_ms,
            row_count: 0,
            message_count,
            errors: Vec::new(),
            warnings,
            dead_lettered: 0,
        }
    }

    /// Returns true if the window produced no errors.
    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validates a stream window by window.
///
/// One control loop polls the engine, assigns messages to windows and runs
/// the batch validator once per closed window. When a window fails and
/// dead-lettering is enabled, every message of that window is forwarded to
/// the engine's dead-letter sink.
///
/// # Example
///
/// ```rust
/// use contracts_core::{ContractBuilder, FieldBuilder, StreamingConfig};
/// use contracts_streaming::{MemoryEngine, StreamingValidator};
/// use contracts_validator::DataValidator;
/// use serde_json::json;
///
/// let contract = ContractBuilder::new("events", "platform")
///     .field(FieldBuilder::new("id", "integer").not_null().build())
///     .streaming(StreamingConfig::new("events"))
///     .build();
///
/// let mut engine = MemoryEngine::new(Default::default());
/// engine.push_json(json!({"id": 1}), 1_000);
/// engine.push_json(json!({"id": 2}), 2_000);
///
/// let mut validator = StreamingValidator::new(&contract, engine, DataValidator::new()).unwrap();
/// let results = validator.run().unwrap();
/// assert_eq!(results.len(), 1);
/// assert_eq!(results[0].row_count, 2);
/// assert!(results[0].passed());
/// ```
pub struct StreamingValidator<'a, E, V, C = SystemClock> {
    contract: &'a Contract,
    config: &'a StreamingConfig,
    engine: E,
    validator: V,
    clock: C,
    options: StreamingOptions,
    windows: WindowManager,
    messages_seen: u64,
    finished: bool,
}

impl<'a, E, V> StreamingValidator<'a, E, V, SystemClock>
where
    E: StreamingEngine,
    V: BatchValidator,
{
    /// Creates a validator for `contract`, which must carry a valid
    /// streaming section.
    pub fn new(contract: &'a Contract, engine: E, validator: V) -> Result<Self> {
        let config = contract.streaming.as_ref().ok_or_else(|| {
            StreamingError::configuration(format!(
                "contract '{}' has no streaming section",
                contract.name
            ))
        })?;
        config.validate()?;

        Ok(Self {
            contract,
            config,
            engine,
            validator,
            clock: SystemClock,
            options: StreamingOptions::default(),
            windows: WindowManager::new(&config.window),
            messages_seen: 0,
            finished: false,
        })
    }
}

impl<'a, E, V, C> StreamingValidator<'a, E, V, C>
where
    E: StreamingEngine,
    V: BatchValidator,
    C: Clock,
{
    /// Replaces the clock used to close idle windows.
    pub fn with_clock<C2: Clock>(self, clock: C2) -> StreamingValidator<'a, E, V, C2> {
        StreamingValidator {
            contract: self.contract,
            config: self.config,
            engine: self.engine,
            validator: self.validator,
            clock,
            options: self.options,
            windows: self.windows,
            messages_seen: self.messages_seen,
            finished: self.finished,
        }
    }

    /// Sets the run options.
    pub fn with_options(mut self, options: StreamingOptions) -> Self {
        self.options = options;
        self
    }

    /// Polls the engine once and returns the results it produced.
    ///
    /// A message may close windows, an idle tick closes overdue windows, a
    /// transport error produces a warning result and the end of the stream
    /// flushes the open window and closes the engine. After the run has
    /// finished this returns no results.
    pub fn poll_once(&mut self) -> Result<Vec<WindowResult>> {
        if self.finished {
            return Ok(Vec::new());
        }

        match self.engine.poll_next() {
            Poll::Message(message) => {
                self.messages_seen += 1;
                let closed = self.windows.push(message);
                let mut results = self.emit_all(closed)?;
                if self
                    .options
                    .max_messages
                    .is_some_and(|max| self.messages_seen >= max)
                {
                    info!("Reached max_messages={}, stopping", self.messages_seen);
                    results.extend(self.finish()?);
                }
                Ok(results)
            }
            Poll::TransportError(detail) => {
                warn!("Stream transport error on '{}': {}", self.config.topic, detail);
                let now = self.clock.now_ms();
                Ok(vec![WindowResult::warning(
                    now,
                    now,
                    0,
                    vec![format_violation(
                        Severity::Warn,
                        format!("Stream transport error: {}", detail),
                    )],
                )])
            }
            Poll::Idle => {
                let closed = self.windows.on_idle(self.clock.now_ms());
                self.emit_all(closed)
            }
            Poll::Closed => self.finish(),
        }
    }

    /// Runs until the stream ends, handing each result to `on_result`.
    ///
    /// Without `max_messages`, an engine that never reports the end of its
    /// stream keeps this running.
    pub fn run_with<F>(&mut self, mut on_result: F) -> Result<()>
    where
        F: FnMut(WindowResult),
    {
        info!(
            "Validating stream '{}' with {} windows of {}s",
            self.config.topic, self.config.window.window_type, self.config.window.duration_seconds
        );
        while !self.finished {
            for result in self.poll_once()? {
                on_result(result);
            }
        }
        Ok(())
    }

    /// Runs until the stream ends and collects every result.
    pub fn run(&mut self) -> Result<Vec<WindowResult>> {
        let mut results = Vec::new();
        self.run_with(|result| results.push(result))?;
        Ok(results)
    }

    /// Returns true once the stream has ended and the engine is closed.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Messages polled so far.
    pub fn messages_seen(&self) -> u64 {
        self.messages_seen
    }

    /// Messages dropped because their window had already closed.
    pub fn late_messages(&self) -> u64 {
        self.windows.late_messages()
    }

    /// Returns the engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Consumes the validator and returns the engine.
    pub fn into_engine(self) -> E {
        self.engine
    }

    fn finish(&mut self) -> Result<Vec<WindowResult>> {
        let closed: Vec<ClosedWindow> = self.windows.flush().into_iter().collect();
        let results = self.emit_all(closed)?;
        self.engine.close()?;
        self.finished = true;
        info!(
            "Stream '{}' finished after {} messages ({} late)",
            self.config.topic,
            self.messages_seen,
            self.windows.late_messages()
        );
        Ok(results)
    }

    fn emit_all(&mut self, closed: Vec<ClosedWindow>) -> Result<Vec<WindowResult>> {
        let mut results = Vec::with_capacity(closed.len());
        for window in closed {
            if let Some(result) = self.emit(window)? {
                results.push(result);
            }
        }
        Ok(results)
    }

    fn emit(&mut self, window: ClosedWindow) -> Result<Option<WindowResult>> {
        let message_count = window.messages.len();
        let payloads: Vec<_> = window
            .messages
            .iter()
            .filter_map(|m| m.payload.clone())
            .collect();
        let undecodable = message_count - payloads.len();
        let mut extra = Vec::new();
        if undecodable > 0 {
            extra.push(format_violation(
                Severity::Warn,
                format!(
                    "{} stream messages could not be decoded as JSON objects",
                    undecodable
                ),
            ));
        }

        if payloads.is_empty() {
            if !self.options.emit_empty_windows {
                debug!(
                    "Skipping empty window [{}, {})",
                    window.start_ms, window.end_ms
                );
                return Ok(None);
            }
            let mut warnings = vec![format_violation(
                Severity::Warn,
                "Streaming window contained zero rows",
            )];
            warnings.extend(extra);
            return Ok(Some(WindowResult::warning(
                window.start_ms,
                window.end_ms,
                message_count,
                warnings,
            )));
        }

        let dataset = DataSet::from_json_objects(payloads);
        let report = self.validator.validate_batch(self.contract, &dataset);
        debug!(
            "Window [{}, {}) validated: {} rows, {} errors, {} warnings",
            window.start_ms,
            window.end_ms,
            dataset.len(),
            report.errors.len(),
            report.warnings.len()
        );

        let mut dead_lettered = 0;
        if !report.passed && self.config.dlq.enabled {
            for message in &window.messages {
                self.engine.send_dead_letter(message, &report.errors)?;
                dead_lettered += 1;
            }
            info!(
                "Routed {} messages of window [{}, {}) to dead-letter topic",
                dead_lettered, window.start_ms, window.end_ms
            );
        }

        let mut warnings = report.warnings;
        warnings.extend(extra);
        Ok(Some(WindowResult {
            window_start_ms: window.start_ms,
            window_end_ms: window.end_ms,
            row_count: dataset.len(),
            message_count,
            errors: report.errors,
            warnings,
            dead_lettered,
        }))
    }
}
