//! Parse command - frame a recorded event stream from a file or stdin

use anyhow::{Context, Result};
use bytes::Bytes;
use futures::Stream;
use sse_client::{Event, EventStream, FramingOptions, SseClientError};
use std::path::Path;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Read size for recorded streams
const CHUNK_SIZE: usize = 8 * 1024;

/// Parse a recorded stream (`-` reads stdin) and print its events
pub async fn parse(
    path: &Path,
    options: FramingOptions,
    ctx: &crate::output::OutputContext,
) -> Result<()> {
    let events = if path == Path::new("-") {
        read_events(tokio::io::stdin(), options).await?
    } else {
        let file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("Failed to open {}", path.display()))?;
        read_events(file, options).await?
    };

    ctx.print_events(&events);
    ctx.success(&format!("Parsed {} event(s)", events.len()));
    Ok(())
}

/// Frame every event in `reader`
async fn read_events<R>(reader: R, options: FramingOptions) -> Result<Vec<Event>>
where
    R: AsyncRead + Send + Unpin + 'static,
{
    let mut stream = EventStream::from_stream(chunks(reader), options);
    let mut events = Vec::new();
    while let Some(event) = stream.next().await {
        events.push(event.context("Failed to parse event stream")?);
    }
    Ok(events)
}

/// Turn a reader into a stream of byte chunks
fn chunks<R>(mut reader: R) -> impl Stream<Item = sse_client::Result<Bytes>> + Send + 'static
where
    R: AsyncRead + Send + Unpin + 'static,
{
    async_stream::stream! {
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => yield Ok(Bytes::copy_from_slice(&buf[..n])),
                Err(e) => {
                    yield Err(SseClientError::Io(e));
                    break;
                }
            }
        }
    }
}
