//! Trigger Matching
//!
//! A [`Switch`] describes the byte sequence that moves the machine to another
//! state, plus the optional delimiter and escape rules around it. Matching is
//! a pure function of the window and the carried [`Boundary`], so it is safe
//! to evaluate again after more data arrives.

use memchr::memmem;

use super::carry::{escape_run, Boundary};
use crate::error::ConfigError;

/// Bytes allowed immediately around a trigger.
///
/// An empty set means the side is unconstrained.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Delimiters {
    /// Allowed bytes before the trigger
    pub left: Vec<u8>,
    /// Allowed bytes after the trigger
    pub right: Vec<u8>,
}

impl Delimiters {
    pub fn new(left: impl Into<Vec<u8>>, right: impl Into<Vec<u8>>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }

    pub fn left(left: impl Into<Vec<u8>>) -> Self {
        Self::new(left, Vec::new())
    }

    pub fn right(right: impl Into<Vec<u8>>) -> Self {
        Self::new(Vec::new(), right)
    }
}

/// Trigger description for one transition
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Switch {
    trigger: Vec<u8>,
    delimiters: Delimiters,
    escape: bool,
}

impl Switch {
    /// Create a switch without delimiters or escapes.
    pub fn new(trigger: impl Into<Vec<u8>>) -> Result<Self, ConfigError> {
        let trigger = trigger.into();
        if trigger.is_empty() {
            return Err(ConfigError::EmptyTrigger);
        }

        Ok(Self {
            trigger,
            delimiters: Delimiters::default(),
            escape: false,
        })
    }

    pub fn with_delimiters(mut self, delimiters: Delimiters) -> Self {
        self.delimiters = delimiters;
        self
    }

    /// Ignore occurrences preceded by an odd run of escape bytes
    pub fn with_escape(mut self, escape: bool) -> Self {
        self.escape = escape;
        self
    }

    pub fn trigger(&self) -> &[u8] {
        &self.trigger
    }

    pub fn delimiters(&self) -> &Delimiters {
        &self.delimiters
    }

    pub fn escape(&self) -> bool {
        self.escape
    }

    /// Most bytes this trigger and its delimiter context can span.
    pub fn footprint(&self) -> usize {
        self.trigger.len()
            + usize::from(!self.delimiters.left.is_empty())
            + usize::from(!self.delimiters.right.is_empty())
    }

    /// Offset of the first qualifying trigger occurrence in `window`.
    ///
    /// Occurrences are tried left to right, overlapping ones included. An
    /// occurrence whose right delimiter would fall past the window is skipped
    /// until `boundary.eof` is set; the caller withholds those bytes and asks
    /// again with more data.
    pub fn find(&self, window: &[u8], boundary: &Boundary) -> Option<usize> {
        let finder = memmem::Finder::new(&self.trigger);
        let mut from = 0;

        while from < window.len() {
            let i = from + finder.find(&window[from..])?;
            from = i + 1;

            if !self.left_ok(window, i, boundary) {
                continue;
            }
            if !self.right_ok(window, i, boundary) {
                continue;
            }
            if self.escape && self.is_escaped(window, i, boundary) {
                continue;
            }

            return Some(i);
        }

        None
    }

    fn left_ok(&self, window: &[u8], i: usize, boundary: &Boundary) -> bool {
        if self.delimiters.left.is_empty() {
            return true;
        }

        let before = if i == 0 {
            match boundary.tail {
                Some(b) => b,
                // True start of stream satisfies any left delimiter
                None => return true,
            }
        } else {
            window[i - 1]
        };

        self.delimiters.left.contains(&before)
    }

    fn right_ok(&self, window: &[u8], i: usize, boundary: &Boundary) -> bool {
        if self.delimiters.right.is_empty() {
            return true;
        }

        match window.get(i + self.trigger.len()) {
            Some(after) => self.delimiters.right.contains(after),
            None => boundary.eof,
        }
    }

    fn is_escaped(&self, window: &[u8], i: usize, boundary: &Boundary) -> bool {
        let mut run = escape_run(&window[..i]);
        if run == i {
            // Run reaches the window start, continue it from the carry
            run += boundary.escapes;
        }
        run % 2 == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open() -> Boundary {
        Boundary::default()
    }

    fn eof() -> Boundary {
        Boundary {
            eof: true,
            ..Boundary::default()
        }
    }

    #[test]
    fn test_simple_match() {
        let switch = Switch::new("<").unwrap();
        assert_eq!(switch.find(b"a<b", &open()), Some(1));
        assert_eq!(switch.find(b"abc", &open()), None);
        assert_eq!(switch.find(b"", &open()), None);
    }

    #[test]
    fn test_empty_trigger_rejected() {
        assert!(matches!(Switch::new(""), Err(ConfigError::EmptyTrigger)));
    }

    #[test]
    fn test_left_delimiter() {
        let switch = Switch::new("#")
            .unwrap()
            .with_delimiters(Delimiters::left(" "));

        assert_eq!(switch.find(b"a#b", &open()), None);
        assert_eq!(switch.find(b"a #b", &open()), Some(2));
        // Skips the rejected occurrence and keeps scanning
        assert_eq!(switch.find(b"a#b #c", &open()), Some(4));
    }

    #[test]
    fn test_left_delimiter_at_window_start() {
        let switch = Switch::new("#")
            .unwrap()
            .with_delimiters(Delimiters::left(" "));

        // Start of stream
        assert_eq!(switch.find(b"#b", &open()), Some(0));

        let after_letter = Boundary {
            tail: Some(b'a'),
            ..Boundary::default()
        };
        assert_eq!(switch.find(b"#b", &after_letter), None);

        let after_space = Boundary {
            tail: Some(b' '),
            ..Boundary::default()
        };
        assert_eq!(switch.find(b"#b", &after_space), Some(0));
    }

    #[test]
    fn test_right_delimiter_needs_eof_at_window_end() {
        let switch = Switch::new("end")
            .unwrap()
            .with_delimiters(Delimiters::right(" ;"));

        assert_eq!(switch.find(b"the end", &open()), None);
        assert_eq!(switch.find(b"the end", &eof()), Some(4));
        assert_eq!(switch.find(b"the end;", &open()), Some(4));
        assert_eq!(switch.find(b"endless end ", &open()), Some(8));
    }

    #[test]
    fn test_escape_parity() {
        let switch = Switch::new("$$").unwrap().with_escape(true);

        assert_eq!(switch.find(b"\\$$", &open()), None);
        assert_eq!(switch.find(b"\\\\$$", &open()), Some(2));
        assert_eq!(switch.find(b"$$", &open()), Some(0));
    }

    #[test]
    fn test_escape_overlapping_rescan() {
        let switch = Switch::new("$$").unwrap().with_escape(true);

        // First occurrence at 1 is escaped, the overlapping one at 2 is not
        assert_eq!(switch.find(b"\\$$$", &open()), Some(2));
    }

    #[test]
    fn test_escape_run_from_carry() {
        let switch = Switch::new("$$").unwrap().with_escape(true);

        let one = Boundary {
            tail: Some(b'\\'),
            escapes: 1,
            eof: false,
        };
        assert_eq!(switch.find(b"$$", &one), None);
        // Local run of one plus carried one is even
        assert_eq!(switch.find(b"\\$$", &one), Some(1));

        // Carry only counts when the local run reaches the window start
        assert_eq!(switch.find(b"x$$", &one), Some(1));
    }

    #[test]
    fn test_escape_disabled() {
        let switch = Switch::new("$$").unwrap();
        assert_eq!(switch.find(b"\\$$", &open()), Some(1));
    }

    #[test]
    fn test_footprint() {
        let plain = Switch::new("abc").unwrap();
        assert_eq!(plain.footprint(), 3);

        let both = Switch::new("abc")
            .unwrap()
            .with_delimiters(Delimiters::new(" ", " "));
        assert_eq!(both.footprint(), 5);
    }
}
