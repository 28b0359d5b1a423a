//! Sliding Read Window
//!
//! Fixed-capacity buffer the engine reads the source into.
//! This window:
//! - Allocates once and never grows
//! - Tracks pending bytes as `start..end` inside the allocation
//! - Keeps consumed bytes visible until the next compaction so the
//!   carry-over context can be taken from them

use std::io::{self, Read};

/// Default window capacity, matches one typical page-sized read
pub const DEFAULT_CAPACITY: usize = 4096;

/// Fixed-size sliding window over source bytes.
///
/// Invariant: `start <= end <= buffer.len()`. All offset arithmetic stays
/// inside this type.
#[derive(Debug)]
pub struct Window {
    /// Pre-allocated fixed-size buffer
    buffer: Vec<u8>,
    /// First pending byte
    start: usize,
    /// One past the last pending byte
    end: usize,
}

impl Window {
    /// Create with fixed capacity - NO dynamic growth
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0u8; capacity],
            start: 0,
            end: 0,
        }
    }

    /// Get buffer capacity
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Number of pending (not yet consumed) bytes
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Pending bytes
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer[self.start..self.end]
    }

    /// Bytes consumed since the last compaction
    pub fn consumed(&self) -> &[u8] {
        &self.buffer[..self.start]
    }

    /// Mark `n` pending bytes as consumed. Clamped to the pending length.
    pub fn consume(&mut self, n: usize) {
        debug_assert!(n <= self.len(), "consume past end of window");
        self.start += n.min(self.len());
    }

    /// Free space after the pending bytes
    pub fn appendable_capacity(&self) -> usize {
        self.buffer.len() - self.end
    }

    /// Move pending bytes to the front of the buffer, dropping consumed ones.
    pub fn compact(&mut self) {
        if self.start == 0 {
            return;
        }
        self.buffer.copy_within(self.start..self.end, 0);
        self.end -= self.start;
        self.start = 0;
    }

    /// Read once from `reader` into the free space.
    ///
    /// Returns the number of bytes appended; `0` means end of stream (or no
    /// free space, which callers avoid by compacting first).
    pub fn fill_from<R: Read>(&mut self, reader: &mut R) -> io::Result<usize> {
        if self.appendable_capacity() == 0 {
            return Ok(0);
        }

        loop {
            match reader.read(&mut self.buffer[self.end..]) {
                Ok(n) => {
                    // A misbehaving reader must not push `end` past capacity
                    let n = n.min(self.appendable_capacity());
                    self.end += n;
                    return Ok(n);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for Window {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_fill_and_consume() {
        let mut window = Window::new(8);
        let mut src = Cursor::new(b"hello world".to_vec());

        assert_eq!(window.fill_from(&mut src).unwrap(), 8);
        assert_eq!(window.as_slice(), b"hello wo");
        assert_eq!(window.appendable_capacity(), 0);

        window.consume(6);
        assert_eq!(window.as_slice(), b"wo");
        assert_eq!(window.consumed(), b"hello ");
    }

    #[test]
    fn test_compact_keeps_pending() {
        let mut window = Window::new(8);
        let mut src = Cursor::new(b"hello world".to_vec());

        window.fill_from(&mut src).unwrap();
        window.consume(6);
        window.compact();

        assert_eq!(window.as_slice(), b"wo");
        assert!(window.consumed().is_empty());
        assert_eq!(window.appendable_capacity(), 6);

        assert_eq!(window.fill_from(&mut src).unwrap(), 3);
        assert_eq!(window.as_slice(), b"world");
    }

    #[test]
    fn test_memory_limit() {
        let window = Window::new(64);

        // Verify buffer doesn't grow beyond capacity
        assert_eq!(window.capacity(), 64);
        assert_eq!(window.buffer.len(), 64);
    }

    #[test]
    fn test_end_of_stream() {
        let mut window = Window::new(16);
        let mut src = Cursor::new(Vec::new());

        assert_eq!(window.fill_from(&mut src).unwrap(), 0);
        assert!(window.is_empty());
    }

    #[test]
    fn test_interrupted_read_is_retried() {
        struct Flaky {
            interrupted: bool,
        }

        impl Read for Flaky {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                if !self.interrupted {
                    self.interrupted = true;
                    return Err(io::ErrorKind::Interrupted.into());
                }
                buf[0] = b'x';
                Ok(1)
            }
        }

        let mut window = Window::new(4);
        let mut src = Flaky { interrupted: false };

        assert_eq!(window.fill_from(&mut src).unwrap(), 1);
        assert_eq!(window.as_slice(), b"x");
    }
}
