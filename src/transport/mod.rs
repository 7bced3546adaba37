// MIT License - Copyright (c) 2026 Peter Wright

//! Transport links for the two line-oriented channels: the pilight
//! daemon over TCP and the keypad/LCD controller over a serial port.
//!
//! Each link owns a reader that frames incoming bytes into lines and
//! forwards them, tagged with their [`Source`], onto a single ordered
//! dispatch channel, plus a writer that drains a typed command channel.

pub mod daemon;
pub mod serial;

pub use daemon::DaemonLink;
pub use serial::SerialLink;

/// Which channel a framed line arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Keypad,
    Daemon,
}

/// One framed line, tagged with its source, as delivered to the
/// dispatch loop. Lines from one source keep their arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    pub source: Source,
    pub line: String,
}

impl SourceLine {
    pub fn keypad(line: impl Into<String>) -> Self {
        Self {
            source: Source::Keypad,
            line: line.into(),
        }
    }

    pub fn daemon(line: impl Into<String>) -> Self {
        Self {
            source: Source::Daemon,
            line: line.into(),
        }
    }
}
