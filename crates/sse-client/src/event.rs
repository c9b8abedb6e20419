//! SSE event record and its wire representation
//!
//! An [`Event`] is built from one block of lines (the text between two blank
//! lines on the wire) and can be serialized back with [`Event::dump`].
//!
//! ```
//! use sse_client::Event;
//!
//! let event = Event::parse("event: update\nid: 42\ndata: hello");
//! assert_eq!(event.event(), "update");
//! assert_eq!(event.id(), Some("42"));
//! assert_eq!(event.data(), "hello");
//!
//! assert_eq!(event.dump(), "id: 42\nevent: update\ndata: hello\n\n");
//! ```

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tracing::{trace, warn};

/// Event type used when a block carries no `event:` field
pub const DEFAULT_EVENT_TYPE: &str = "message";

/// One Server-Sent Events message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    data: String,
    event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry: Option<u64>,
}

impl Default for Event {
    fn default() -> Self {
        Self {
            data: String::new(),
            event: DEFAULT_EVENT_TYPE.to_string(),
            id: None,
            retry: None,
        }
    }
}

impl Event {
    /// Create a default-typed event carrying `data`
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            ..Self::default()
        }
    }

    /// Set the event type. An empty name falls back to `"message"`.
    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        let event = event.into();
        self.event = if event.is_empty() {
            DEFAULT_EVENT_TYPE.to_string()
        } else {
            event
        };
        self
    }

    /// Set the event id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the reconnection delay in milliseconds
    pub fn with_retry(mut self, retry_ms: u64) -> Self {
        self.retry = Some(retry_ms);
        self
    }

    /// Payload, with multiple `data:` lines joined by `\n`
    pub fn data(&self) -> &str {
        &self.data
    }

    /// Event type; `"message"` unless the block named one
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Event id, used as `Last-Event-ID` when resuming
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Reconnection delay in milliseconds
    pub fn retry(&self) -> Option<u64> {
        self.retry
    }

    /// Reconnection delay as a [`Duration`]
    pub fn retry_duration(&self) -> Option<Duration> {
        self.retry.map(Duration::from_millis)
    }

    /// Whether the event type is the default `"message"`
    pub fn is_message(&self) -> bool {
        self.event == DEFAULT_EVENT_TYPE
    }

    /// Consume the event and return its payload
    pub fn into_data(self) -> String {
        self.data
    }

    /// Parse one block of SSE text into an event.
    ///
    /// `raw` holds the lines of a single message without the terminating blank
    /// line. Comment lines and unknown fields are skipped; a `retry:` value that
    /// is not an integer is logged and ignored.
    pub fn parse(raw: &str) -> Self {
        let mut builder = EventBuilder::new();
        for line in split_lines(raw) {
            match FieldLine::parse(line) {
                FieldLine::Comment => {
                    trace!("SSE comment: {}", line);
                }
                FieldLine::Field { name, value } => builder.field(name, value),
            }
        }
        builder.build()
    }

    /// Serialize the event to its wire form, terminated by a blank line
    pub fn dump(&self) -> String {
        let mut lines = Vec::new();

        if let Some(id) = &self.id {
            lines.push(format!("id: {}", id));
        }

        if !self.is_message() {
            lines.push(format!("event: {}", self.event));
        }

        if let Some(retry) = self.retry {
            lines.push(format!("retry: {}", retry));
        }

        lines.extend(self.data.split('\n').map(|segment| format!("data: {}", segment)));

        let mut out = lines.join("\n");
        out.push_str("\n\n");
        out
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.data)
    }
}

/// Accumulates the fields of one block into an [`Event`]
#[derive(Debug, Default)]
pub struct EventBuilder {
    data: Option<String>,
    event: Option<String>,
    id: Option<String>,
    retry: Option<u64>,
}

impl EventBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a `data:` value. Later values are joined with `\n`.
    pub fn data(&mut self, value: &str) -> &mut Self {
        match &mut self.data {
            Some(data) => {
                data.push('\n');
                data.push_str(value);
            }
            None => self.data = Some(value.to_string()),
        }
        self
    }

    /// Replace the event type
    pub fn event(&mut self, value: &str) -> &mut Self {
        self.event = Some(value.to_string());
        self
    }

    /// Replace the event id
    pub fn id(&mut self, value: &str) -> &mut Self {
        self.id = Some(value.to_string());
        self
    }

    /// Replace the retry delay. Non-integer values leave the previous one.
    pub fn retry(&mut self, value: &str) -> &mut Self {
        match value.trim().parse::<u64>() {
            Ok(retry) => self.retry = Some(retry),
            Err(e) => warn!("Invalid SSE retry value '{}': {}", value, e),
        }
        self
    }

    /// Apply a field by name. Unknown names are ignored.
    pub fn field(&mut self, name: &str, value: &str) {
        match name {
            "data" => {
                self.data(value);
            }
            "event" => {
                self.event(value);
            }
            "id" => {
                self.id(value);
            }
            "retry" => {
                self.retry(value);
            }
            _ => trace!("SSE unknown field: {}", name),
        }
    }

    /// Finish the event
    pub fn build(self) -> Event {
        let event = Event::default().with_event(self.event.unwrap_or_default());
        Event {
            data: self.data.unwrap_or_default(),
            id: self.id,
            retry: self.retry,
            ..event
        }
    }
}

/// A single line of an event block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldLine<'a> {
    /// Line starting with `:`
    Comment,
    /// `name[:[ ]value]`
    Field { name: &'a str, value: &'a str },
}

impl<'a> FieldLine<'a> {
    fn parse(line: &'a str) -> Self {
        match line.split_once(':') {
            Some(("", _)) => Self::Comment,
            Some((name, value)) => Self::Field {
                name,
                value: value.strip_prefix(' ').unwrap_or(value),
            },
            None => Self::Field {
                name: line,
                value: "",
            },
        }
    }
}

/// Split text on `\n`, `\r\n` and lone `\r`, without a trailing empty line
fn split_lines(raw: &str) -> impl Iterator<Item = &str> {
    let mut rest = raw;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        match rest.find(|c: char| c == '\r' || c == '\n') {
            Some(pos) => {
                let line = &rest[..pos];
                let skip = if rest[pos..].starts_with("\r\n") { 2 } else { 1 };
                rest = &rest[pos + skip..];
                Some(line)
            }
            None => {
                let line = rest;
                rest = "";
                Some(line)
            }
        }
    })
}
