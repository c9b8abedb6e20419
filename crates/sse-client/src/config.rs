//! Client configuration

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SseClientError};

/// Default connection timeout
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

/// Transport and framing options for an [`SseClient`](crate::SseClient)
///
/// Streams are long-lived, so there is no whole-request timeout unless one is
/// set explicitly. Use `read_timeout` to bound the silence between chunks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Whole-request timeout in milliseconds
    pub timeout_ms: Option<u64>,
    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Maximum silence between two chunks, in milliseconds
    pub read_timeout_ms: Option<u64>,
    /// Extra request headers
    pub headers: BTreeMap<String, String>,
    /// Proxy URL used for all requests
    pub proxy: Option<String>,
    /// User-Agent header value
    pub user_agent: Option<String>,
    /// Emit a trailing block that was never closed by a blank line
    pub flush_on_close: bool,
    /// Fail the stream on invalid UTF-8 instead of dropping the line
    pub strict_utf8: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_ms: None,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            read_timeout_ms: None,
            headers: BTreeMap::new(),
            proxy: None,
            user_agent: None,
            flush_on_close: false,
            strict_utf8: false,
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(millis(timeout));
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = millis(timeout);
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout_ms = Some(millis(timeout));
        self
    }

    /// Add a request header; a later value for the same name replaces it
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_flush_on_close(mut self, flush: bool) -> Self {
        self.flush_on_close = flush;
        self
    }

    pub fn with_strict_utf8(mut self, strict: bool) -> Self {
        self.strict_utf8 = strict;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }

    /// Framing behaviour for streams opened with this configuration
    pub fn framing(&self) -> FramingOptions {
        FramingOptions {
            flush_on_close: self.flush_on_close,
            strict_utf8: self.strict_utf8,
        }
    }

    /// Configured headers as a validated [`HeaderMap`]
    pub fn header_map(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| SseClientError::InvalidHeader(format!("{}: {}", name, e)))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| SseClientError::InvalidHeader(format!("{}: {}", name, e)))?;
            headers.insert(header_name, header_value);
        }
        Ok(headers)
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// How an [`EventStream`](crate::EventStream) treats the edges of the wire format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FramingOptions {
    /// Emit the trailing unterminated block when the transport closes
    pub flush_on_close: bool,
    /// Surface invalid UTF-8 as an error instead of skipping the line
    pub strict_utf8: bool,
}
