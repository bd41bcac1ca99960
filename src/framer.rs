//! Newline framing over a bounded per-connection buffer.
//!
//! Bytes are appended with [`Framer::feed`] and complete lines are pulled
//! back out with [`Framer::next_line`] (or the [`Framer::drain`] iterator).
//! The buffer never holds more than `capacity - 1` bytes; a full buffer with
//! no terminator in it is an overflow and the owner must give up on the
//! connection.

use bytes::{Bytes, BytesMut};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("unterminated line exceeds {limit} bytes")]
    Overflow { limit: usize },
}

#[derive(Debug)]
pub struct Framer {
    buf: BytesMut,
    capacity: usize,
}

impl Framer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            buf: BytesMut::with_capacity(capacity),
            capacity,
        }
    }

    /// Most bytes the buffer may hold at once.
    pub fn limit(&self) -> usize {
        self.capacity - 1
    }

    #[cfg(test)]
    fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Appends as much of `bytes` as fits and returns how many were taken.
    pub fn feed(&mut self, bytes: &[u8]) -> usize {
        let room = self.limit() - self.buf.len();
        let n = room.min(bytes.len());
        self.buf.extend_from_slice(&bytes[..n]);
        n
    }

    /// Takes the next complete line, terminator included.
    pub fn next_line(&mut self) -> Option<Bytes> {
        let pos = self.buf.iter().position(|&b| b == b'\n')?;
        Some(self.buf.split_to(pos + 1).freeze())
    }

    /// Iterates over the complete lines buffered so far. The server calls
    /// `next_line` instead, one line at a time, because handling a line
    /// needs the whole registry and a `/quit` must leave the rest unread.
    pub fn drain(&mut self) -> Drain<'_> {
        Drain { framer: self }
    }

    /// Errors once the buffer is full and still holds no terminator.
    pub fn check_overflow(&self) -> Result<(), FrameError> {
        if self.buf.len() >= self.limit() && !self.buf.contains(&b'\n') {
            return Err(FrameError::Overflow {
                limit: self.limit(),
            });
        }
        Ok(())
    }
}

pub struct Drain<'a> {
    framer: &'a mut Framer,
}

impl Iterator for Drain<'_> {
    type Item = Bytes;

    fn next(&mut self) -> Option<Bytes> {
        self.framer.next_line()
    }
}

/// Strips trailing CR/LF and decodes the rest. Lines come out of a
/// [`Framer`], so they are already bounded by its capacity.
pub fn line_text(line: &[u8]) -> String {
    let mut end = line.len();
    while end > 0 && matches!(line[end - 1], b'\n' | b'\r') {
        end -= 1;
    }
    String::from_utf8_lossy(&line[..end]).into_owned()
}
