//! Listen command - follow a live event stream, reconnecting on request

use anyhow::{Context, Result};
use sse_client::{Event, SseClient, SseClientError};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::MergedConfig;
use crate::output::{OutputContext, OutputFormat, CSV_HEADER};

/// How a single connection ended
#[derive(Debug)]
enum SessionEnd {
    /// The event limit was reached
    Limit,
    /// The server closed the stream cleanly
    Closed,
    /// The connection could not be opened
    ConnectFailed(SseClientError),
    /// The stream broke after it was opened
    Dropped(SseClientError),
}

/// Resume state carried across connections
#[derive(Debug, Default)]
struct ResumeState {
    last_id: Option<String>,
    retry_ms: Option<u64>,
    received: usize,
}

/// Follow `url`, printing events as they arrive until Ctrl+C
pub async fn listen(
    client: &SseClient,
    url: &str,
    last_id: Option<String>,
    settings: &MergedConfig,
    limit: Option<usize>,
    ctx: &OutputContext,
) -> Result<()> {
    ctx.info(&format!("Listening on {}", url));
    ctx.info("Press Ctrl+C to stop");

    if ctx.format == OutputFormat::Csv {
        println!("{}", CSV_HEADER);
    }

    let following = follow(client, url, last_id, settings, limit, |event| {
        ctx.print_event(event);
    });

    let received = tokio::select! {
        result = following => result?,
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl+C")?;
            ctx.info("\nInterrupted");
            return Ok(());
        }
    };

    ctx.success(&format!("Received {} event(s)", received));
    Ok(())
}

/// Drive connections until the limit, a clean close, or a fatal error
///
/// Returns the number of events handed to `on_event`.
async fn follow<F>(
    client: &SseClient,
    url: &str,
    last_id: Option<String>,
    settings: &MergedConfig,
    limit: Option<usize>,
    mut on_event: F,
) -> Result<usize>
where
    F: FnMut(&Event),
{
    let mut state = ResumeState {
        last_id,
        ..Default::default()
    };
    let mut failures = 0u32;

    loop {
        let end = session(client, url, &mut state, limit, &mut on_event).await;
        debug!(?end, received = state.received, "Session ended");

        let error = match end {
            SessionEnd::Limit => return Ok(state.received),
            SessionEnd::Closed if !settings.reconnect => return Ok(state.received),
            SessionEnd::Closed => {
                failures = 0;
                None
            }
            SessionEnd::Dropped(e) => {
                failures = 0;
                Some(e)
            }
            SessionEnd::ConnectFailed(e) => {
                failures += 1;
                Some(e)
            }
        };

        if let Some(e) = error {
            if !settings.reconnect || !e.is_transport() {
                return Err(e).context("Stream failed");
            }
            if settings.max_retries.is_some_and(|max| failures > max) {
                return Err(e).with_context(|| {
                    format!("Giving up after {} failed connection(s)", failures)
                });
            }
            warn!(error = %e, "Stream interrupted");
        }

        let delay = state
            .retry_ms
            .map(Duration::from_millis)
            .unwrap_or(settings.retry);
        debug!(
            delay_ms = delay.as_millis() as u64,
            last_id = ?state.last_id,
            "Reconnecting"
        );
        tokio::time::sleep(delay).await;
    }
}

/// Run one connection to completion
async fn session<F>(
    client: &SseClient,
    url: &str,
    state: &mut ResumeState,
    limit: Option<usize>,
    on_event: &mut F,
) -> SessionEnd
where
    F: FnMut(&Event),
{
    let mut events = match client.stream(url, state.last_id.as_deref()).await {
        Ok(events) => events,
        Err(e) => return SessionEnd::ConnectFailed(e),
    };

    let end = loop {
        if limit.is_some_and(|max| state.received >= max) {
            break SessionEnd::Limit;
        }
        match events.next().await {
            Some(Ok(event)) => {
                state.received += 1;
                on_event(&event);
            }
            Some(Err(e)) => break SessionEnd::Dropped(e),
            None => break SessionEnd::Closed,
        }
    };

    if let Some(id) = events.last_event_id() {
        state.last_id = Some(id.to_string());
    }
    if let Some(retry) = events.retry() {
        state.retry_ms = Some(retry);
    }
    events.close();
    end
}
