//! Byte-chunk to line splitting
//!
//! Lines are cut on raw bytes before any UTF-8 decoding, so a bad byte
//! sequence can only ever spoil its own line and never moves a block boundary.

use bytes::{Buf, Bytes, BytesMut};

const CR: u8 = b'\r';
const LF: u8 = b'\n';

/// Incremental splitter turning transport chunks into terminated lines
///
/// Each returned line keeps its terminator (`\n`, `\r\n` or `\r`), the way the
/// lines appeared on the wire. A line ending in `\r` is returned as soon as
/// the `\r` arrives; a `\n` opening the next chunk is then folded into it.
#[derive(Debug, Default)]
pub(crate) struct LineDecoder {
    /// Bytes of the line currently being received
    buffer: BytesMut,
    /// Prefix of `buffer` already known to hold no terminator
    scanned: usize,
    /// The last line ended in `\r`; a leading `\n` belongs to it
    pending_cr: bool,
}

impl LineDecoder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and extract every line it completes
    pub(crate) fn feed(&mut self, mut chunk: &[u8]) -> Vec<Bytes> {
        if self.pending_cr && !chunk.is_empty() {
            self.pending_cr = false;
            if chunk[0] == LF {
                chunk = &chunk[1..];
            }
        }
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some((end, cr)) = find_line_end(&self.buffer, self.scanned) {
            lines.push(self.buffer.split_to(end).freeze());
            self.scanned = 0;
            self.pending_cr = cr;
        }
        self.scanned = self.buffer.len();
        lines
    }

    /// Take whatever is left once the transport has closed.
    ///
    /// Any leftover is a line that never got its terminator.
    pub(crate) fn finish(&mut self) -> Option<Bytes> {
        self.pending_cr = false;
        self.scanned = 0;
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.buffer.split().freeze())
        }
    }

    /// Drop any partial line
    pub(crate) fn clear(&mut self) {
        self.buffer.clear();
        self.scanned = 0;
        self.pending_cr = false;
    }

    pub(crate) fn has_partial(&self) -> bool {
        self.buffer.has_remaining()
    }
}

/// Position just past the first line terminator in `bytes[from..]`, and
/// whether that terminator is a lone `\r` at the end of the buffer.
///
/// A `\r` followed by `\n` in the buffer ends the line after the `\n`.
fn find_line_end(bytes: &[u8], from: usize) -> Option<(usize, bool)> {
    let pos = from + memchr::memchr2(CR, LF, &bytes[from..])?;

    match bytes[pos] {
        LF => Some((pos + 1, false)),
        _ => match bytes.get(pos + 1) {
            None => Some((pos + 1, true)),
            Some(&LF) => Some((pos + 2, false)),
            Some(_) => Some((pos + 1, false)),
        },
    }
}
