//! SSE client

use std::fmt;
use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CACHE_CONTROL};
use tracing::{debug, instrument};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{Result, SseClientError};
use crate::streaming::EventStream;
use crate::transport::{HttpTransport, StreamRequest, Transport};

/// Header carrying the resume id on reconnection
pub const LAST_EVENT_ID: &str = "last-event-id";

/// MIME type of an event stream
pub const EVENT_STREAM_MIME: &str = "text/event-stream";

/// Opens event streams through a [`Transport`]
///
/// The client itself holds no per-stream state; every call to
/// [`stream`](Self::stream) gets its own connection and buffers, so one client
/// can drive any number of concurrent streams.
#[derive(Clone)]
pub struct SseClient {
    transport: Arc<dyn Transport>,
    config: ClientConfig,
}

impl fmt::Debug for SseClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SseClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SseClient {
    /// Create a client over HTTP with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a client over HTTP with custom configuration
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        // Fail on bad headers now rather than on first connect
        config.header_map()?;
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(Arc::new(transport), config))
    }

    /// Create a client over any transport
    pub fn with_transport(transport: Arc<dyn Transport>, config: ClientConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Build the request for `url`, resuming after `last_id` if given
    pub fn request(&self, url: &str, last_id: Option<&str>) -> Result<StreamRequest> {
        let url = Url::parse(url)?;
        let headers = stream_headers(self.config.header_map()?, last_id)?;
        Ok(StreamRequest { url, headers })
    }

    /// Open an event stream
    ///
    /// When `last_id` is set (and non-empty) the server is asked to resume
    /// after that event via `Last-Event-ID`. Connection failures and
    /// non-success statuses are returned here; later failures end the stream
    /// with an error item.
    #[instrument(skip(self))]
    pub async fn stream(&self, url: &str, last_id: Option<&str>) -> Result<EventStream> {
        let request = self.request(url, last_id)?;
        let body = self.transport.open(request).await?;
        debug!("SSE stream open");
        Ok(EventStream::new(body, self.config.framing()))
    }
}

/// Open an event stream over HTTP in one call
///
/// Shorthand for `SseClient::with_config(config)?.stream(url, last_id)`.
pub async fn connect(url: &str, last_id: Option<&str>, config: ClientConfig) -> Result<EventStream> {
    SseClient::with_config(config)?.stream(url, last_id).await
}

/// Merge the protocol headers over caller-supplied ones
fn stream_headers(mut headers: HeaderMap, last_id: Option<&str>) -> Result<HeaderMap> {
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(ACCEPT, HeaderValue::from_static(EVENT_STREAM_MIME));

    match last_id.filter(|id| !id.is_empty()) {
        Some(id) => {
            let value = HeaderValue::from_str(id).map_err(|e| {
                SseClientError::InvalidHeader(format!("{}: {}", LAST_EVENT_ID, e))
            })?;
            headers.insert(HeaderName::from_static(LAST_EVENT_ID), value);
        }
        None => {
            headers.remove(LAST_EVENT_ID);
        }
    }

    Ok(headers)
}
