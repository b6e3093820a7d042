//! Window state machine.
//!
//! [`WindowManager`] assigns messages to tumbling, sliding or session windows
//! by event time and hands back every window that a message, an idle tick or
//! a final flush closes. A closed window is terminal: messages that arrive
//! for it afterwards are counted as late and dropped.

use crate::StreamMessage;
use contracts_core::{WindowConfig, WindowType};
use std::collections::VecDeque;
use tracing::debug;

/// A window that has been closed and is ready for validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedWindow {
    /// Window start in epoch milliseconds
    pub start_ms: i64,
    /// Window end in epoch milliseconds
    ///
    /// Exclusive for tumbling and sliding windows. A session ends at the
    /// timestamp of its last message.
    pub end_ms: i64,
    /// Messages assigned to the window, in arrival order
    pub messages: Vec<StreamMessage>,
}

impl ClosedWindow {
    fn new(start_ms: i64, end_ms: i64, messages: Vec<StreamMessage>) -> Self {
        Self {
            start_ms,
            end_ms,
            messages,
        }
    }
}

#[derive(Debug)]
enum State {
    Tumbling {
        open: Option<i64>,
    },
    Sliding {
        slide_ms: i64,
        next_end: Option<i64>,
    },
    Session {
        open: Option<(i64, i64)>,
        closed_end: Option<i64>,
    },
}

/// Buckets messages into windows.
///
/// ```rust
/// use contracts_core::WindowConfig;
/// use contracts_streaming::{StreamMessage, WindowManager};
/// use serde_json::json;
///
/// let mut windows = WindowManager::new(&WindowConfig::default());
/// assert!(windows.push(StreamMessage::from_json(json!({}), 1_000)).is_empty());
/// let closed = windows.push(StreamMessage::from_json(json!({}), 301_000));
/// assert_eq!(closed[0].start_ms, 0);
/// assert_eq!(closed[0].end_ms, 300_000);
/// ```
#[derive(Debug)]
pub struct WindowManager {
    duration_ms: i64,
    state: State,
    buffer: VecDeque<StreamMessage>,
    late: u64,
}

impl WindowManager {
    /// Creates a manager for `config`.
    ///
    /// The configuration is expected to have passed
    /// [`WindowConfig::validate`]; a sliding window without a slide falls
    /// back to sliding by its full duration.
    pub fn new(config: &WindowConfig) -> Self {
        let duration_ms = config.duration_ms().max(1);
        let state = match config.window_type {
            WindowType::Tumbling => State::Tumbling { open: None },
            WindowType::Sliding => State::Sliding {
                slide_ms: config.slide_ms().filter(|s| *s > 0).unwrap_or(duration_ms),
                next_end: None,
            },
            WindowType::Session => State::Session {
                open: None,
                closed_end: None,
            },
        };
        Self {
            duration_ms,
            state,
            buffer: VecDeque::new(),
            late: 0,
        }
    }

    /// Number of messages dropped because their window had already closed.
    pub fn late_messages(&self) -> u64 {
        self.late
    }

    /// Number of messages currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Adds a message and returns the windows it closes.
    pub fn push(&mut self, message: StreamMessage) -> Vec<ClosedWindow> {
        let ts = message.timestamp_ms;
        let d = self.duration_ms;
        let mut closed = Vec::new();

        match &mut self.state {
            State::Tumbling { open } => {
                let start = ts.div_euclid(d) * d;
                match *open {
                    Some(current) if start < current => {
                        self.late += 1;
                        debug!("Dropping late message at {} (open window starts {})", ts, current);
                        return closed;
                    }
                    Some(current) if start > current => {
                        let messages = self.buffer.drain(..).collect();
                        closed.push(ClosedWindow::new(current, current + d, messages));
                        *open = Some(start);
                    }
                    Some(_) => {}
                    None => *open = Some(start),
                }
                self.buffer.push_back(message);
            }
            State::Sliding { slide_ms, next_end } => {
                let slide = *slide_ms;
                let end = next_end.get_or_insert_with(|| align_end(ts, slide));
                if ts < *end - d {
                    self.late += 1;
                    debug!("Dropping late message at {} (next window starts {})", ts, *end - d);
                    return closed;
                }
                close_sliding(&mut self.buffer, end, d, slide, ts, None, &mut closed);
                self.buffer.push_back(message);
            }
            State::Session { open, closed_end } => {
                if closed_end.is_some_and(|e| ts < e) {
                    self.late += 1;
                    debug!("Dropping late message at {} (session already closed)", ts);
                    return closed;
                }
                *open = match *open {
                    Some((start, last)) if ts - last >= d => {
                        let messages = self.buffer.drain(..).collect();
                        closed.push(ClosedWindow::new(start, last, messages));
                        *closed_end = Some(last);
                        Some((ts, ts))
                    }
                    Some((start, last)) => Some((start.min(ts), last.max(ts))),
                    None => Some((ts, ts)),
                };
                self.buffer.push_back(message);
            }
        }
        closed
    }

    /// Closes windows that are overdue at wall-clock time `now_ms`.
    ///
    /// An overdue tumbling window is closed and an empty window aligned to
    /// `now_ms` is opened in its place, so an idle stream keeps producing
    /// one empty window per duration. Sliding windows close one per idle
    /// tick, oldest first, so a long silence is caught up over successive
    /// ticks. A session closes once `now_ms` is a full gap past its last
    /// message.
    pub fn on_idle(&mut self, now_ms: i64) -> Vec<ClosedWindow> {
        let d = self.duration_ms;
        let mut closed = Vec::new();

        match &mut self.state {
            State::Tumbling { open } => {
                if let Some(current) = *open {
                    if now_ms >= current + d {
                        let messages = self.buffer.drain(..).collect();
                        closed.push(ClosedWindow::new(current, current + d, messages));
                        *open = Some(now_ms.div_euclid(d) * d);
                    }
                }
            }
            State::Sliding { slide_ms, next_end } => {
                if let Some(end) = next_end {
                    close_sliding(&mut self.buffer, end, d, *slide_ms, now_ms, Some(1), &mut closed);
                }
            }
            State::Session { open, closed_end } => {
                if let Some((start, last)) = *open {
                    if now_ms - last >= d {
                        let messages = self.buffer.drain(..).collect();
                        closed.push(ClosedWindow::new(start, last, messages));
                        *closed_end = Some(last);
                        *open = None;
                    }
                }
            }
        }
        closed
    }

    /// Closes the open window if it holds any message.
    pub fn flush(&mut self) -> Option<ClosedWindow> {
        if self.buffer.is_empty() {
            return None;
        }
        let d = self.duration_ms;
        let messages: Vec<StreamMessage> = self.buffer.drain(..).collect();

        match &mut self.state {
            State::Tumbling { open } => {
                let start = open.unwrap_or_else(|| messages[0].timestamp_ms.div_euclid(d) * d);
                Some(ClosedWindow::new(start, start + d, messages))
            }
            State::Sliding { slide_ms, next_end } => {
                let end = next_end.unwrap_or_else(|| align_end(messages[0].timestamp_ms, *slide_ms));
                *next_end = Some(end + *slide_ms);
                Some(ClosedWindow::new(end - d, end, messages))
            }
            State::Session { open, closed_end } => {
                let (start, last) = open.take().unwrap_or_else(|| {
                    let ts = messages[0].timestamp_ms;
                    (ts, ts)
                });
                *closed_end = Some(last);
                Some(ClosedWindow::new(start, last, messages))
            }
        }
    }
}

/// End of the first slide-aligned window containing `ts`.
fn align_end(ts: i64, slide: i64) -> i64 {
    ts.div_euclid(slide) * slide + slide
}

/// Emits sliding windows ending at or before `until`, empty ones included,
/// stopping after `limit` windows when one is given.
///
/// Buffered messages are always inside the window ending at `end`.
fn close_sliding(
    buffer: &mut VecDeque<StreamMessage>,
    end: &mut i64,
    duration: i64,
    slide: i64,
    until: i64,
    limit: Option<usize>,
    closed: &mut Vec<ClosedWindow>,
) {
    let mut emitted = 0;
    while until >= *end && limit.is_none_or(|max| emitted < max) {
        let start = *end - duration;
        let messages = buffer
            .iter()
            .filter(|m| m.timestamp_ms >= start && m.timestamp_ms < *end)
            .cloned()
            .collect();
        closed.push(ClosedWindow::new(start, *end, messages));
        emitted += 1;
        *end += slide;
        let next_start = *end - duration;
        while buffer.front().is_some_and(|m| m.timestamp_ms < next_start) {
            buffer.pop_front();
        }
    }
}
