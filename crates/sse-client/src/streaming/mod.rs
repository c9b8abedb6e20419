//! Incremental consumption of `text/event-stream` bodies
//!
//! Bytes from the transport are split into lines, lines are grouped into
//! blocks on blank lines, and each block becomes one [`Event`](crate::Event).
//! The `:ok` keep-alive block is swallowed.
//!
//! # Example
//!
//! ```no_run
//! use sse_client::SseClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = SseClient::new()?;
//!
//! let mut events = client.stream("http://localhost:8080/events", None).await?;
//!
//! while let Some(event) = events.next().await {
//!     match event {
//!         Ok(event) => println!("{}: {}", event.event(), event.data()),
//!         Err(e) => {
//!             eprintln!("Stream error: {}", e);
//!             break;
//!         }
//!     }
//! }
//!
//! // Resume later from where we stopped
//! let resume = events.last_event_id().map(str::to_string);
//! let _events = client.stream("http://localhost:8080/events", resume.as_deref()).await?;
//! # Ok(())
//! # }
//! ```

mod event_stream;
mod framer;
mod lines;

pub use event_stream::EventStream;
