//! Integration tests for sse-client
//!
//! These tests spin up a real axum server producing `text/event-stream`
//! responses and consume them through the client over HTTP.

use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use pretty_assertions::assert_eq;
use sse_client::testing::{wait_until, TestServer};
use sse_client::{ClientConfig, Event, SseClient, SseClientError};
use tokio_stream::StreamExt as _;

// =============================================================================
// Handlers
// =============================================================================

/// Three events built with axum's own SSE encoder
async fn typed_events() -> impl IntoResponse {
    let events = vec![
        SseEvent::default().id("1").event("update").data("hello"),
        SseEvent::default().data("line one\nline two"),
        SseEvent::default()
            .id("3")
            .retry(Duration::from_millis(1500))
            .data("last"),
    ];
    Sse::new(tokio_stream::iter(events.into_iter().map(Ok::<_, Infallible>)))
}

/// Hand-written body mixing keep-alives, comments and CRLF line endings
async fn raw_body() -> Response {
    let body = ":ok\n\n\
                data: first\n\n\
                : just a comment\r\n\
                id: 2\r\n\
                data: second\r\n\
                \r\n\
                :ok\n\n\
                event: done\n\
                data: bye\n\n\
                data: unterminated";
    event_stream_response(Body::from(body))
}

/// Echo the request headers the client is required to send
async fn echo_headers(headers: HeaderMap) -> Response {
    let get = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("<none>")
            .to_string()
    };
    let body = format!(
        "event: headers\ndata: accept={}\ndata: cache-control={}\ndata: last-event-id={}\n\n",
        get("accept"),
        get("cache-control"),
        get("last-event-id"),
    );
    event_stream_response(Body::from(body))
}

/// Ten numbered events; resumes after `Last-Event-ID` when given
async fn numbered(headers: HeaderMap) -> Response {
    let start = headers
        .get("last-event-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u32>().ok())
        .map(|id| id + 1)
        .unwrap_or(1);

    let body: String = (start..=10)
        .map(|i| Event::new(format!("n{}", i)).with_id(i.to_string()).dump())
        .collect();
    event_stream_response(Body::from(body))
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "no such stream").into_response()
}

fn event_stream_response(body: Body) -> Response {
    Response::builder()
        .header(header::CONTENT_TYPE, "text/event-stream")
        .body(body)
        .unwrap()
}

/// Sets a flag when the server side of the stream is dropped
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Endless hand-written stream with `:ok` keep-alives in between events
fn endless_router(dropped: Arc<AtomicBool>) -> Router {
    Router::new().route(
        "/endless",
        get(move || {
            let dropped = dropped.clone();
            async move {
                let body = async_stream::stream! {
                    let _guard = DropFlag(dropped);
                    let mut n = 0u64;
                    loop {
                        n += 1;
                        yield Ok::<_, Infallible>(format!("id: {}\ndata: tick {}\n\n", n, n));
                        for _ in 0..3 {
                            tokio::time::sleep(Duration::from_millis(5)).await;
                            yield Ok(":ok\n\n".to_string());
                        }
                    }
                };
                event_stream_response(Body::from_stream(body))
            }
        }),
    )
}

/// One event, then axum's own keep-alive comments, which carry a space
async fn spaced_keep_alive() -> impl IntoResponse {
    let events = tokio_stream::iter(vec![Ok::<_, Infallible>(
        SseEvent::default().data("first"),
    )])
    .chain(tokio_stream::pending());
    Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_millis(5))
            .text("ok"),
    )
}

fn router() -> Router {
    Router::new()
        .route("/typed", get(typed_events))
        .route("/raw", get(raw_body))
        .route("/headers", get(echo_headers))
        .route("/numbered", get(numbered))
        .route("/missing", get(not_found))
        .route("/spaced-keep-alive", get(spaced_keep_alive))
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_typed_events_over_http() {
    let server = TestServer::start(router()).await.unwrap();

    let events: Vec<Event> = server
        .client
        .stream(&server.url("/typed"), None)
        .await
        .unwrap()
        .map(|r| r.unwrap())
        .collect()
        .await;

    assert_eq!(
        events,
        vec![
            Event::new("hello").with_event("update").with_id("1"),
            Event::new("line one\nline two"),
            Event::new("last").with_id("3").with_retry(1500),
        ]
    );
}

#[tokio::test]
async fn test_raw_body_framing() {
    let server = TestServer::start(router()).await.unwrap();

    let mut stream = server.client.stream(&server.url("/raw"), None).await.unwrap();
    let mut events = Vec::new();
    while let Some(event) = stream.next().await {
        events.push(event.unwrap());
    }

    // Keep-alives are swallowed and the unterminated tail is dropped
    assert_eq!(
        events,
        vec![
            Event::new("first"),
            Event::new("second").with_id("2"),
            Event::new("bye").with_event("done"),
        ]
    );
    assert_eq!(stream.last_event_id(), Some("2"));
    assert!(!stream.is_open());
}

#[tokio::test]
async fn test_flush_on_close_emits_tail() {
    let config = ClientConfig::new().with_flush_on_close(true);
    let server = TestServer::start_with_config(router(), config).await.unwrap();

    let events: Vec<Event> = server
        .client
        .stream(&server.url("/raw"), None)
        .await
        .unwrap()
        .map(|r| r.unwrap())
        .collect()
        .await;

    assert_eq!(events.len(), 4);
    assert_eq!(events[3], Event::new("unterminated"));
}

#[tokio::test]
async fn test_protocol_headers_sent() {
    let server = TestServer::start(router()).await.unwrap();

    let mut stream = server
        .client
        .stream(&server.url("/headers"), Some("99"))
        .await
        .unwrap();
    let event = stream.next().await.unwrap().unwrap();

    assert_eq!(event.event(), "headers");
    assert_eq!(
        event.data(),
        "accept=text/event-stream\ncache-control=no-cache\nlast-event-id=99"
    );
}

#[tokio::test]
async fn test_no_resume_header_without_last_id() {
    let server = TestServer::start(router()).await.unwrap();

    let mut stream = server
        .client
        .stream(&server.url("/headers"), None)
        .await
        .unwrap();
    let event = stream.next().await.unwrap().unwrap();

    assert!(event.data().ends_with("last-event-id=<none>"));
}

#[tokio::test]
async fn test_resume_with_last_event_id() {
    let server = TestServer::start(router()).await.unwrap();
    let url = server.url("/numbered");

    // Read a few events, then drop the connection
    let mut first = server.client.stream(&url, None).await.unwrap();
    for _ in 0..4 {
        first.next().await.unwrap().unwrap();
    }
    let resume = first.last_event_id().map(str::to_string);
    drop(first);
    assert_eq!(resume.as_deref(), Some("4"));

    let rest: Vec<String> = server
        .client
        .stream(&url, resume.as_deref())
        .await
        .unwrap()
        .map(|r| r.unwrap().into_data())
        .collect()
        .await;

    assert_eq!(rest, vec!["n5", "n6", "n7", "n8", "n9", "n10"]);
}

#[tokio::test]
async fn test_non_success_status() {
    let server = TestServer::start(router()).await.unwrap();

    let err = server
        .client
        .stream(&server.url("/missing"), None)
        .await
        .unwrap_err();

    match &err {
        SseClientError::Status {
            status,
            reason,
            body,
        } => {
            assert_eq!(*status, 404);
            assert_eq!(reason, "Not Found");
            assert_eq!(body, "no such stream");
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(err.is_transport());
}

#[tokio::test]
async fn test_connection_refused() {
    // Bind and immediately release a port so nothing listens on it
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = SseClient::new().unwrap();
    let err = client
        .stream(&format!("http://{}/events", addr), None)
        .await
        .unwrap_err();

    assert!(matches!(err, SseClientError::Http(_)));
    assert!(err.is_transport());
}

#[tokio::test]
async fn test_keep_alives_never_surface() {
    let dropped = Arc::new(AtomicBool::new(false));
    let server = TestServer::start(endless_router(dropped.clone()))
        .await
        .unwrap();

    let mut stream = server
        .client
        .stream(&server.url("/endless"), None)
        .await
        .unwrap();

    for expected in 1..=3 {
        let event = stream.next().await.unwrap().unwrap();
        assert_eq!(event.data(), format!("tick {}", expected));
        assert_eq!(event.id(), Some(expected.to_string().as_str()));
    }
}

#[tokio::test]
async fn test_comment_other_than_ok_is_an_empty_event() {
    let server = TestServer::start(router()).await.unwrap();

    let mut stream = server
        .client
        .stream(&server.url("/spaced-keep-alive"), None)
        .await
        .unwrap();

    assert_eq!(stream.next().await.unwrap().unwrap(), Event::new("first"));
    // ": ok" is an ordinary comment, so its block parses to a default event
    assert_eq!(stream.next().await.unwrap().unwrap(), Event::default());
}

#[tokio::test]
async fn test_dropping_stream_closes_connection() {
    let dropped = Arc::new(AtomicBool::new(false));
    let server = TestServer::start(endless_router(dropped.clone()))
        .await
        .unwrap();

    let mut stream = server
        .client
        .stream(&server.url("/endless"), None)
        .await
        .unwrap();
    stream.next().await.unwrap().unwrap();
    stream.close();
    assert!(!stream.is_open());

    let closed = wait_until(|| dropped.load(Ordering::SeqCst), Duration::from_secs(5)).await;
    assert!(closed, "server stream was not dropped after client closed");
}

#[tokio::test]
async fn test_concurrent_streams_are_independent() {
    let server = TestServer::start(router()).await.unwrap();
    let client = server.client.clone();

    let url = server.url("/numbered");

    let a = client.stream(&url, None);
    let b = client.stream(&url, Some("7"));
    let (a, b) = tokio::join!(a, b);

    let a: Vec<String> = a.unwrap().map(|r| r.unwrap().into_data()).collect().await;
    let b: Vec<String> = b.unwrap().map(|r| r.unwrap().into_data()).collect().await;

    assert_eq!(a.len(), 10);
    assert_eq!(b, vec!["n8", "n9", "n10"]);
}
