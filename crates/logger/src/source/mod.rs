//! Serial source: the narrow line-reading contract the session depends on.
//!
//! `device.rs` reads a serial device (or a captured stream file),
//! `discover.rs` finds an anemometer when the port is `auto`, and
//! `fake.rs` provides a scripted test double.

pub mod device;
pub mod discover;
pub mod fake;

use std::borrow::Cow;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub use device::DeviceSource;
pub use discover::{candidate_ports, candidate_ports_in, looks_like_trisonica, resolve_port};
pub use fake::FakeSource;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("source disconnected: {0}")]
    Disconnected(String),

    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no anemometer found on any serial port")]
    NoPortFound,

    #[error("failed to configure {path}: {reason}")]
    Configure { path: PathBuf, reason: String },
}

/// One line as received, without its terminator.
#[derive(Debug, Clone, PartialEq)]
pub struct RawLine {
    pub received_at: DateTime<Utc>,
    pub bytes: Bytes,
}

impl RawLine {
    pub fn new(received_at: DateTime<Utc>, bytes: impl Into<Bytes>) -> Self {
        Self { received_at, bytes: bytes.into() }
    }

    /// Lossy UTF-8 view; the device link is ASCII.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    Line(RawLine),
    /// Nothing arrived within the read timeout.
    Timeout,
    /// End of stream; no more lines will come.
    Closed,
}

pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Line-oriented input.
///
/// `read_line` must be cancel-safe: dropping the future before it resolves
/// loses no bytes already received.
pub trait LineSource: Send {
    fn read_line(&mut self) -> SourceFuture<'_, Result<SourceEvent, SourceError>>;

    fn is_open(&self) -> bool;

    /// Release the underlying handle. Idempotent.
    fn close(&mut self);

    /// Human-readable name for logs.
    fn describe(&self) -> String;
}

/// Strip a trailing `\n` and any `\r` before it.
pub(crate) fn trim_terminator(mut line: &[u8]) -> &[u8] {
    while let [rest @ .., b'\n' | b'\r'] = line {
        line = rest;
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_terminator() {
        assert_eq!(trim_terminator(b"S 1.0\r\n"), b"S 1.0");
        assert_eq!(trim_terminator(b"S 1.0\n"), b"S 1.0");
        assert_eq!(trim_terminator(b"S 1.0"), b"S 1.0");
        assert_eq!(trim_terminator(b"\r\n"), b"");
    }

    #[test]
    fn test_text_is_lossy() {
        let line = RawLine::new(Utc::now(), vec![b'S', b' ', 0xff, b'1']);
        assert_eq!(line.text(), "S \u{fffd}1");
    }
}
