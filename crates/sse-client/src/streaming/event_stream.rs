//! Event stream over an open transport

use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use bytes::Bytes;
use futures::stream::{Stream, StreamExt};
use tracing::{debug, trace, warn};

use super::framer::BlockFramer;
use super::lines::LineDecoder;
use crate::config::FramingOptions;
use crate::error::{Result, SseClientError};
use crate::event::Event;
use crate::transport::ByteStream;

/// Lazily produced, ordered sequence of [`Event`]s from one connection
///
/// Implements `Stream<Item = Result<Event, SseClientError>>`.
///
/// # Lifecycle
///
/// - Created via [`SseClient::stream`](crate::SseClient::stream) or
///   [`EventStream::new`] over any [`ByteStream`]
/// - Events are consumed via `next()` or the `Stream` trait
/// - The connection is released when the stream ends, after the first error,
///   on [`close`](Self::close), or when the value is dropped
///
/// The sequence cannot be restarted. To resume after a failure, open a new
/// stream passing [`last_event_id`](Self::last_event_id) as the resume id.
pub struct EventStream {
    /// Transport body; `None` once released
    body: Option<ByteStream>,

    decoder: LineDecoder,

    framer: BlockFramer,

    /// Events already framed but not yet handed out
    pending: VecDeque<Event>,

    /// Error to report after `pending` drains
    error: Option<SseClientError>,

    /// Id of the latest emitted event that carried one
    last_event_id: Option<String>,

    /// Latest `retry` value seen on an emitted event
    retry: Option<u64>,

    options: FramingOptions,
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("open", &self.body.is_some())
            .field("pending", &self.pending.len())
            .field("last_event_id", &self.last_event_id)
            .field("options", &self.options)
            .finish()
    }
}

impl EventStream {
    /// Frame events out of a transport body
    pub fn new(body: ByteStream, options: FramingOptions) -> Self {
        Self {
            body: Some(body),
            decoder: LineDecoder::new(),
            framer: BlockFramer::new(),
            pending: VecDeque::new(),
            error: None,
            last_event_id: None,
            retry: None,
            options,
        }
    }

    /// Frame events out of any stream of byte chunks
    pub fn from_stream<S>(stream: S, options: FramingOptions) -> Self
    where
        S: Stream<Item = Result<Bytes>> + Send + 'static,
    {
        Self::new(Box::pin(stream), options)
    }

    /// Get the next event from the stream
    ///
    /// Returns `None` when the stream ends, after an error, or once closed.
    pub async fn next(&mut self) -> Option<Result<Event>> {
        <Self as StreamExt>::next(self).await
    }

    /// Id of the last emitted event that had one; use it to resume
    pub fn last_event_id(&self) -> Option<&str> {
        self.last_event_id.as_deref()
    }

    /// Latest reconnection delay (ms) announced by the server
    pub fn retry(&self) -> Option<u64> {
        self.retry
    }

    /// Whether the transport is still held open
    pub fn is_open(&self) -> bool {
        self.body.is_some()
    }

    /// Close the connection. Buffered and partial events are discarded.
    pub fn close(&mut self) {
        if self.body.take().is_some() {
            debug!("Closing SSE stream");
        }
        self.decoder.clear();
        self.framer.clear();
        self.pending.clear();
        self.error = None;
    }

    fn release(&mut self) {
        self.body = None;
        self.decoder.clear();
        self.framer.clear();
    }

    /// Run a chunk through line splitting and framing
    fn ingest(&mut self, chunk: &[u8]) {
        for line in self.decoder.feed(chunk) {
            if !self.push_line(&line) {
                return;
            }
        }
    }

    /// Transport finished cleanly
    fn end_of_stream(&mut self) {
        if self.options.flush_on_close {
            if let Some(line) = self.decoder.finish() {
                if !self.push_line(&line) {
                    return;
                }
            }
            if let Some(event) = self.framer.finish() {
                self.pending.push_back(event);
            }
        } else if self.decoder.has_partial() || !self.framer.is_empty() {
            debug!("Discarding unterminated SSE block at end of stream");
        }
        self.release();
    }

    /// Decode and frame one line. Returns `false` once the stream has failed.
    fn push_line(&mut self, line: &[u8]) -> bool {
        let text = match std::str::from_utf8(line) {
            Ok(text) => text,
            Err(e) if self.options.strict_utf8 => {
                self.error = Some(SseClientError::Decode(e));
                self.release();
                return false;
            }
            Err(e) => {
                warn!("Dropping SSE line with invalid UTF-8: {}", e);
                return true;
            }
        };

        if let Some(event) = self.framer.push_line(text) {
            self.pending.push_back(event);
        }
        true
    }

    fn emit(&mut self, event: Event) -> Event {
        trace!(event = event.event(), id = ?event.id(), "SSE event");
        if let Some(id) = event.id() {
            self.last_event_id = Some(id.to_string());
        }
        if let Some(retry) = event.retry() {
            self.retry = Some(retry);
        }
        event
    }
}

impl Stream for EventStream {
    type Item = Result<Event>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if let Some(event) = this.pending.pop_front() {
                return Poll::Ready(Some(Ok(this.emit(event))));
            }

            if let Some(err) = this.error.take() {
                return Poll::Ready(Some(Err(err)));
            }

            let Some(body) = this.body.as_mut() else {
                return Poll::Ready(None);
            };

            match ready!(body.as_mut().poll_next(cx)) {
                Some(Ok(chunk)) => this.ingest(&chunk),
                Some(Err(err)) => {
                    warn!("SSE transport error: {}", err);
                    this.release();
                    return Poll::Ready(Some(Err(err)));
                }
                None => {
                    debug!("SSE stream ended");
                    this.end_of_stream();
                }
            }
        }
    }
}
