//! Test utilities for sse-client
//!
//! Two ways to feed an [`SseClient`] without a real event server:
//!
//! - [`TestServer`] serves an axum router on an ephemeral local port
//! - [`ScriptedTransport`] replays canned chunks and records every request
//!
//! ```ignore
//! use sse_client::testing::ScriptedTransport;
//!
//! let transport = ScriptedTransport::new().with_lines(["data: a\n", "\n"]);
//! let client = transport.client();
//! let mut events = client.stream("http://test/events", Some("99")).await?;
//! assert_eq!(transport.requests()[0].header("last-event-id"), Some("99"));
//! ```

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use parking_lot::Mutex;
use tokio::net::TcpListener;

use crate::config::ClientConfig;
use crate::error::{Result, SseClientError};
use crate::transport::{ByteStream, StreamRequest, Transport};
use crate::SseClient;

/// A test server that automatically shuts down when dropped
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: SseClient,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    /// Create a new test server from an axum Router
    ///
    /// # Example
    ///
    /// ```ignore
    /// use axum::{routing::get, Router};
    /// use sse_client::testing::TestServer;
    ///
    /// let router = Router::new().route("/events", get(events_handler));
    /// let server = TestServer::start(router).await?;
    ///
    /// let mut events = server.client.stream(&server.url("/events"), None).await?;
    /// ```
    pub async fn start(router: axum::Router) -> Result<Self> {
        Self::start_with_config(router, ClientConfig::default()).await
    }

    /// Create a new test server whose client uses `config`
    pub async fn start_with_config(router: axum::Router, config: ClientConfig) -> Result<Self> {
        // Bind to any available port
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        // Spawn the server
        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        // Give server a moment to start
        tokio::time::sleep(Duration::from_millis(10)).await;

        let client = SseClient::with_config(config)?;

        Ok(Self {
            addr,
            client,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Get the base URL of the test server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Absolute URL for `path` on the test server
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    /// Get a reference to the client
    pub fn client(&self) -> &SseClient {
        &self.client
    }

    /// Shutdown the server gracefully
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        // Send shutdown signal if not already done
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        // Abort the task if still running
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// One scripted answer to [`Transport::open`]
enum Script {
    Body(Vec<Result<Bytes>>),
    Fail(SseClientError),
}

/// In-memory [`Transport`] that replays scripted responses
///
/// Each call to `open` consumes the next script. Once the scripts run out,
/// further connections get an empty body.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    scripts: Arc<Mutex<VecDeque<Script>>>,
    requests: Arc<Mutex<Vec<StreamRequest>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a connection whose body delivers each line as its own chunk
    pub fn with_lines<I, S>(self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let chunks = lines
            .into_iter()
            .map(|line| Ok(Bytes::from(line.into())))
            .collect();
        self.push(Script::Body(chunks))
    }

    /// Queue a connection whose body yields `chunks` in order
    pub fn with_chunks(self, chunks: Vec<Result<Bytes>>) -> Self {
        self.push(Script::Body(chunks))
    }

    /// Queue a connection attempt that fails with `error`
    pub fn with_failure(self, error: SseClientError) -> Self {
        self.push(Script::Fail(error))
    }

    fn push(self, script: Script) -> Self {
        self.scripts.lock().push_back(script);
        self
    }

    /// Requests received so far, in order
    pub fn requests(&self) -> Vec<StreamRequest> {
        self.requests.lock().clone()
    }

    /// A client that opens every stream through this transport
    pub fn client(&self) -> SseClient {
        self.client_with_config(ClientConfig::default())
    }

    pub fn client_with_config(&self, config: ClientConfig) -> SseClient {
        SseClient::with_transport(Arc::new(self.clone()), config)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn open(&self, request: StreamRequest) -> Result<ByteStream> {
        self.requests.lock().push(request);

        let script = self.scripts.lock().pop_front();
        let body: ByteStream = match script {
            Some(Script::Body(chunks)) => Box::pin(stream::iter(chunks)),
            Some(Script::Fail(error)) => return Err(error),
            None => Box::pin(stream::empty::<Result<Bytes>>()),
        };
        Ok(body)
    }
}

/// Poll `condition` until it holds or `timeout` elapses
///
/// For state that changes on another task, such as a server noticing that a
/// client dropped its stream.
pub async fn wait_until<F>(condition: F, timeout: Duration) -> bool
where
    F: Fn() -> bool,
{
    tokio::time::timeout(timeout, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .is_ok()
}
