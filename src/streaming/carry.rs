//! Chunk Boundary Carry-over
//!
//! Delimiter and escape rules look at bytes before a trigger. When the
//! trigger sits at the very start of the window those bytes were already
//! discarded, so a small summary of them is kept here.

/// Byte that escapes the byte following it
pub const ESCAPE_BYTE: u8 = b'\\';

/// Context retained from bytes already dropped out of the window
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Carry {
    /// Last discarded byte (`None` at true start of stream)
    pub tail: Option<u8>,
    /// Length of the escape run at the end of the discarded bytes
    pub escapes: usize,
}

impl Carry {
    /// Fold a discarded span into the carried context.
    pub fn absorb(&mut self, discarded: &[u8]) {
        let Some(&last) = discarded.last() else {
            return;
        };

        let run = escape_run(discarded);
        self.escapes = if run == discarded.len() {
            // Whole span is escapes, the run continues from earlier data
            self.escapes + run
        } else {
            run
        };
        self.tail = Some(last);
    }

    /// Matcher view of this carry for the current window.
    pub fn boundary(&self, eof: bool) -> Boundary {
        Boundary {
            tail: self.tail,
            escapes: self.escapes,
            eof,
        }
    }
}

/// Everything the matcher needs to know beyond the window itself
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Boundary {
    /// Byte immediately before the window
    pub tail: Option<u8>,
    /// Escape run immediately before the window
    pub escapes: usize,
    /// No more bytes will follow the window
    pub eof: bool,
}

/// Count contiguous escape bytes at the end of `bytes`
#[inline]
pub fn escape_run(bytes: &[u8]) -> usize {
    bytes.iter().rev().take_while(|&&b| b == ESCAPE_BYTE).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_run() {
        assert_eq!(escape_run(b""), 0);
        assert_eq!(escape_run(b"abc"), 0);
        assert_eq!(escape_run(b"a\\\\"), 2);
        assert_eq!(escape_run(b"\\a\\"), 1);
    }

    #[test]
    fn test_absorb_tracks_last_byte() {
        let mut carry = Carry::default();
        assert_eq!(carry.tail, None);

        carry.absorb(b"ab");
        assert_eq!(carry.tail, Some(b'b'));
        assert_eq!(carry.escapes, 0);

        // Empty span keeps previous context
        carry.absorb(b"");
        assert_eq!(carry.tail, Some(b'b'));
    }

    #[test]
    fn test_absorb_escape_run_spans_chunks() {
        let mut carry = Carry::default();

        carry.absorb(b"x\\");
        assert_eq!(carry.escapes, 1);

        carry.absorb(b"\\");
        assert_eq!(carry.escapes, 2);

        carry.absorb(b"y");
        assert_eq!(carry.escapes, 0);
    }
}
