//! HTTP transport collaborator
//!
//! The event stream only needs three things from a transport: send a GET with
//! the given headers, hand back the body as a stream of byte chunks, and close
//! the connection when that stream is dropped.

use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{Stream, StreamExt};
use reqwest::header::HeaderMap;
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::config::ClientConfig;
use crate::error::{Result, SseClientError};

/// Response body as a stream of chunks; dropping it closes the connection
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// A GET request for an event stream
#[derive(Debug, Clone)]
pub struct StreamRequest {
    pub url: Url,
    pub headers: HeaderMap,
}

impl StreamRequest {
    /// Value of a header, if present and printable
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Opens event-stream connections
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request and return the response body.
    ///
    /// Non-success statuses must be reported as [`SseClientError::Status`].
    async fn open(&self, request: StreamRequest) -> Result<ByteStream>;
}

/// [`Transport`] backed by a `reqwest` client
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport").finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// Build the underlying HTTP client from `config`
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut builder = Client::builder().connect_timeout(config.connect_timeout());

        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        if let Some(read_timeout) = config.read_timeout() {
            builder = builder.read_timeout(read_timeout);
        }
        if let Some(proxy) = &config.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Wrap an already configured client
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open(&self, request: StreamRequest) -> Result<ByteStream> {
        debug!("Connecting to SSE stream: {}", request.url);

        let response = self
            .client
            .get(request.url)
            .headers(request.headers)
            .send()
            .await?;

        let status = response.status();
        let reason = status.canonical_reason().unwrap_or_default();
        debug!("SSE response: {} {}", status.as_u16(), reason);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SseClientError::status(status.as_u16(), reason, body));
        }

        let body = response.bytes_stream().map(|chunk| {
            chunk.map_err(|e| {
                if e.is_body() || e.is_decode() {
                    SseClientError::Disconnected(e.to_string())
                } else {
                    SseClientError::Http(e)
                }
            })
        });

        Ok(Box::pin(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::ACCEPT;

    #[test]
    fn test_http_transport_from_config() {
        let config = ClientConfig::new()
            .with_read_timeout(std::time::Duration::from_secs(5))
            .with_user_agent("sse-client-test");
        assert!(HttpTransport::new(&config).is_ok());
    }

    #[test]
    fn test_request_header_lookup() {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, "text/event-stream".parse().unwrap());
        let request = StreamRequest {
            url: Url::parse("http://localhost/events").unwrap(),
            headers,
        };
        assert_eq!(request.header("accept"), Some("text/event-stream"));
        assert_eq!(request.header("last-event-id"), None);
    }
}
