//! Server-Sent Events client library
//!
//! Opens a long-lived `text/event-stream` connection and turns the body into
//! a stream of [`Event`]s as bytes arrive.
//!
//! # Example
//!
//! ```rust,no_run
//! use sse_client::{ClientConfig, SseClient};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ClientConfig::new()
//!         .with_header("Authorization", "Bearer secret")
//!         .with_read_timeout(Duration::from_secs(60));
//!     let client = SseClient::with_config(config)?;
//!
//!     let mut events = client.stream("http://localhost:8080/events", None).await?;
//!     while let Some(event) = events.next().await {
//!         let event = event?;
//!         println!("[{}] {}", event.event(), event.data());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Resuming
//!
//! The library never reconnects on its own. A caller that wants to continue
//! after a transport error opens a new stream with the id of the last event
//! it processed, which is sent as `Last-Event-ID`:
//!
//! ```rust,ignore
//! let resume = events.last_event_id().map(str::to_string);
//! let events = client.stream(url, resume.as_deref()).await?;
//! ```
//!
//! # Testing
//!
//! The `testing` module provides a scripted in-memory transport and a local
//! axum server:
//!
//! ```rust,ignore
//! use sse_client::testing::ScriptedTransport;
//!
//! let transport = ScriptedTransport::new().with_lines(["data: a\n", "\n"]);
//! let mut events = transport.client().stream("http://test/", None).await?;
//! ```

mod client;
mod config;
mod error;
mod event;
pub mod streaming;
pub mod testing;
pub mod transport;

pub use client::{connect, SseClient, EVENT_STREAM_MIME, LAST_EVENT_ID};
pub use config::{ClientConfig, FramingOptions};
pub use error::{Result, SseClientError};
pub use event::{Event, EventBuilder, DEFAULT_EVENT_TYPE};

// Re-export streaming types for convenience
pub use streaming::EventStream;
pub use transport::{ByteStream, HttpTransport, StreamRequest, Transport};
