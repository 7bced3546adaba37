// MIT License - Copyright (c) 2026 Peter Wright

use crate::error::{ConsoleError, Result};

/// Default cap on a single unterminated message. Both peers send short
/// single-line records; anything larger is a broken stream.
pub const DEFAULT_MAX_LINE: usize = 4096;

/// Accumulates bytes from one source and yields complete
/// newline-terminated lines, keeping any trailing partial line buffered
/// for the next feed. One framer exists per byte source (serial and
/// TCP), so a slow sender on one link never corrupts the other.
#[derive(Debug)]
pub struct LineFramer {
    buf: Vec<u8>,
    max_line: usize,
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineFramer {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_MAX_LINE)
    }

    /// Create a framer with a custom cap on unterminated buffer growth.
    pub fn with_limit(max_line: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_line,
        }
    }

    /// Append raw bytes and extract every complete line, in arrival
    /// order, with the terminator (and any preceding `\r`) stripped.
    /// Bytes after the last terminator stay buffered.
    ///
    /// If the buffered remainder grows past the configured limit, only
    /// that unterminated tail is discarded: `FramingOverflow` is
    /// returned carrying the lines completed before it, and the framer
    /// resynchronizes on the next terminator.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Vec<String>> {
        self.buf.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop(); // the '\n'
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }

        if self.buf.len() > self.max_line {
            self.buf.clear();
            return Err(ConsoleError::FramingOverflow {
                limit: self.max_line,
                recovered: lines,
            });
        }

        Ok(lines)
    }

    /// Bytes received but not yet resolved into a complete line.
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_then_complete() {
        let mut framer = LineFramer::new();
        assert_eq!(framer.feed(b"A\nB\nC").unwrap(), vec!["A", "B"]);
        assert_eq!(framer.pending(), b"C");
        assert_eq!(framer.feed(b"\n").unwrap(), vec!["C"]);
        assert!(framer.pending().is_empty());
    }

    #[test]
    fn test_empty_read_is_noop() {
        let mut framer = LineFramer::new();
        framer.feed(b"par").unwrap();
        assert!(framer.feed(b"").unwrap().is_empty());
        assert_eq!(framer.pending(), b"par");
    }

    #[test]
    fn test_multiple_terminators_one_read() {
        let mut framer = LineFramer::new();
        let lines = framer.feed(b"one\ntwo\nthree\n").unwrap();
        assert_eq!(lines, vec!["one", "two", "three"]);
        assert!(framer.pending().is_empty());
    }

    #[test]
    fn test_no_terminator_appends_only() {
        let mut framer = LineFramer::new();
        assert!(framer.feed(b"OFFL").unwrap().is_empty());
        assert!(framer.feed(b"INE").unwrap().is_empty());
        assert_eq!(framer.feed(b"\n").unwrap(), vec!["OFFLINE"]);
    }

    #[test]
    fn test_no_dedup_of_repeated_lines() {
        let mut framer = LineFramer::new();
        assert_eq!(framer.feed(b"1234\n1234\n").unwrap(), vec!["1234", "1234"]);
    }

    #[test]
    fn test_crlf_terminator_stripped() {
        let mut framer = LineFramer::new();
        assert_eq!(
            framer.feed(b"{\"status\":\"success\"}\r\n").unwrap(),
            vec!["{\"status\":\"success\"}"]
        );
    }

    #[test]
    fn test_byte_at_a_time() {
        let mut framer = LineFramer::new();
        let mut collected = Vec::new();
        for b in b"A\nBC\n" {
            collected.extend(framer.feed(std::slice::from_ref(b)).unwrap());
        }
        assert_eq!(collected, vec!["A", "BC"]);
    }

    #[test]
    fn test_empty_line_yields_empty_string() {
        let mut framer = LineFramer::new();
        assert_eq!(framer.feed(b"\n\n").unwrap(), vec!["", ""]);
    }

    #[test]
    fn test_overflow_discards_and_resyncs() {
        let mut framer = LineFramer::with_limit(8);
        let err = framer.feed(b"waaaaaaaaytoolong").unwrap_err();
        assert!(matches!(
            err,
            ConsoleError::FramingOverflow { limit: 8, .. }
        ));
        assert!(framer.pending().is_empty());
        // Next complete line frames normally
        assert_eq!(framer.feed(b"ok\n").unwrap(), vec!["ok"]);
    }

    #[test]
    fn test_overflow_still_yields_completed_lines() {
        let mut framer = LineFramer::with_limit(8);
        // One read carrying a complete line plus an oversized tail:
        // only the tail may be discarded
        match framer.feed(b"fine\nwaaaaaaaaytoolong").unwrap_err() {
            ConsoleError::FramingOverflow { limit, recovered } => {
                assert_eq!(limit, 8);
                assert_eq!(recovered, vec!["fine"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(framer.pending().is_empty());
        assert_eq!(framer.feed(b"ok\n").unwrap(), vec!["ok"]);
    }

    #[test]
    fn test_lines_before_overflow_are_kept_buffered() {
        let mut framer = LineFramer::with_limit(8);
        // Complete line extracted first; only the unterminated tail counts
        assert_eq!(framer.feed(b"fine\nshort").unwrap(), vec!["fine"]);
        assert_eq!(framer.pending(), b"short");
    }
}
