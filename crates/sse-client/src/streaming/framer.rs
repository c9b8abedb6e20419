//! Grouping of decoded lines into event blocks

use tracing::trace;

use crate::event::Event;

/// Comment the server sends to keep an idle connection open
const KEEP_ALIVE: &str = ":ok";

/// Collects lines until a blank line closes the block
#[derive(Debug, Default)]
pub(crate) struct BlockFramer {
    /// Lines of the current block, terminators included
    lines: Vec<String>,
}

impl BlockFramer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Push one line (with its terminator) and return the event it completes.
    ///
    /// Every blank line closes a block, so consecutive blank lines yield
    /// empty default events.
    pub(crate) fn push_line(&mut self, line: &str) -> Option<Event> {
        if is_blank(line) {
            return self.flush();
        }
        self.lines.push(line.to_string());
        None
    }

    /// Parse whatever is still buffered, as if a blank line had arrived
    pub(crate) fn finish(&mut self) -> Option<Event> {
        if self.lines.is_empty() {
            return None;
        }
        self.flush()
    }

    /// Drop the current block
    pub(crate) fn clear(&mut self) {
        self.lines.clear();
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn flush(&mut self) -> Option<Event> {
        let lines = std::mem::take(&mut self.lines);
        if is_keep_alive(&lines) {
            trace!("SSE keepalive");
            return None;
        }

        Some(Event::parse(&lines.concat()))
    }
}

/// A line made of nothing but its terminator
fn is_blank(line: &str) -> bool {
    matches!(line, "\n" | "\r" | "\r\n")
}

fn is_keep_alive(lines: &[String]) -> bool {
    match lines {
        [only] => only.trim_end_matches(&['\r', '\n'][..]) == KEEP_ALIVE,
        _ => false,
    }
}
