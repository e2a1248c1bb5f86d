use std::io::IsTerminal;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::BytesMut;
use chrono::Utc;
use nix::fcntl::OFlag;
use nix::sys::termios::{self, BaudRate, ControlFlags, SetArg, SpecialCharacterIndices};
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

use super::{trim_terminator, LineSource, RawLine, SourceError, SourceEvent, SourceFuture};
use crate::parser::MAX_LINE_SIZE;

const READ_CHUNK: usize = 1024;

/// Serial device, or any readable file holding a captured stream.
///
/// Terminals are switched to raw mode at the requested baud rate with a
/// read timer, so a silent device yields `Timeout` instead of blocking.
/// Regular files and FIFOs are read as-is and end with `Closed`.
#[derive(Debug)]
pub struct DeviceSource {
    path: PathBuf,
    file: Option<tokio::fs::File>,
    pending: BytesMut,
    terminal: bool,
    read_timeout: Duration,
}

impl DeviceSource {
    pub fn open(path: impl AsRef<Path>, baud_rate: u32, read_timeout: Duration) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(false)
            .custom_flags(OFlag::O_NOCTTY.bits())
            .open(&path)
            .map_err(|source| SourceError::Open { path: path.clone(), source })?;

        let terminal = file.is_terminal();
        if terminal {
            configure_terminal(&file, &path, baud_rate, read_timeout)?;
            info!(path = %path.display(), baud_rate, "Opened serial port");
        } else {
            info!(path = %path.display(), "Opened stream file");
        }

        Ok(Self {
            path,
            file: Some(tokio::fs::File::from_std(file)),
            pending: BytesMut::with_capacity(READ_CHUNK),
            terminal,
            read_timeout,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    fn take_line(&mut self) -> Option<RawLine> {
        let end = self.pending.iter().position(|&b| b == b'\n')?;
        let line = self.pending.split_to(end + 1).freeze();
        let trimmed = trim_terminator(&line).len();
        Some(RawLine::new(Utc::now(), line.slice(..trimmed)))
    }

    /// Flush whatever is left after end of stream as a final line.
    fn take_rest(&mut self) -> Option<RawLine> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = self.pending.split().freeze();
        let trimmed = trim_terminator(&rest).len();
        Some(RawLine::new(Utc::now(), rest.slice(..trimmed)))
    }

    async fn next_event(&mut self) -> Result<SourceEvent, SourceError> {
        loop {
            if let Some(line) = self.take_line() {
                return Ok(SourceEvent::Line(line));
            }

            if self.pending.len() > MAX_LINE_SIZE {
                // No terminator in sight; hand the oversized chunk to the
                // parser, which rejects it as one skipped line
                warn!(bytes = self.pending.len(), "Line exceeds maximum size without terminator");
                let chunk = self.pending.split().freeze();
                return Ok(SourceEvent::Line(RawLine::new(Utc::now(), chunk)));
            }

            let Some(file) = self.file.as_mut() else {
                return Ok(match self.take_rest() {
                    Some(line) => SourceEvent::Line(line),
                    None => SourceEvent::Closed,
                });
            };

            let mut chunk = [0u8; READ_CHUNK];
            let read = match tokio::time::timeout(self.read_timeout, file.read(&mut chunk)).await {
                Err(_) => return Ok(SourceEvent::Timeout),
                Ok(Err(e)) => return Err(SourceError::Disconnected(format!("{}: {e}", self.path.display()))),
                Ok(Ok(n)) => n,
            };

            if read > 0 {
                self.pending.extend_from_slice(&chunk[..read]);
                continue;
            }

            if self.terminal {
                // Raw-mode read timer expired; unplugged adapters vanish from /dev
                if !self.path.exists() {
                    return Err(SourceError::Disconnected(format!("{} removed", self.path.display())));
                }
                return Ok(SourceEvent::Timeout);
            }

            debug!(path = %self.path.display(), "End of stream");
            self.file = None;
        }
    }
}

impl LineSource for DeviceSource {
    fn read_line(&mut self) -> SourceFuture<'_, Result<SourceEvent, SourceError>> {
        Box::pin(self.next_event())
    }

    fn is_open(&self) -> bool {
        self.file.is_some() || !self.pending.is_empty()
    }

    fn close(&mut self) {
        if self.file.take().is_some() {
            debug!(path = %self.path.display(), "Closed source");
        }
        self.pending.clear();
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

pub fn baud_rate(rate: u32) -> Option<BaudRate> {
    let baud = match rate {
        1200 => BaudRate::B1200,
        2400 => BaudRate::B2400,
        4800 => BaudRate::B4800,
        9600 => BaudRate::B9600,
        19200 => BaudRate::B19200,
        38400 => BaudRate::B38400,
        57600 => BaudRate::B57600,
        115200 => BaudRate::B115200,
        230400 => BaudRate::B230400,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        460800 => BaudRate::B460800,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        921600 => BaudRate::B921600,
        _ => return None,
    };
    Some(baud)
}

fn configure_terminal(file: &std::fs::File, path: &Path, rate: u32, read_timeout: Duration) -> Result<(), SourceError> {
    let fail = |reason: String| SourceError::Configure { path: path.to_path_buf(), reason };

    let speed = baud_rate(rate).ok_or_else(|| fail(format!("unsupported baud rate {rate}")))?;
    let mut attrs = termios::tcgetattr(file).map_err(|e| fail(e.to_string()))?;

    termios::cfmakeraw(&mut attrs);
    termios::cfsetspeed(&mut attrs, speed).map_err(|e| fail(e.to_string()))?;
    attrs.control_flags |= ControlFlags::CREAD | ControlFlags::CLOCAL;

    // VTIME is in tenths of a second, capped at 25.5s
    let tenths = (read_timeout.as_millis() / 100).clamp(1, 255) as u8;
    attrs.control_chars[SpecialCharacterIndices::VMIN as usize] = 0;
    attrs.control_chars[SpecialCharacterIndices::VTIME as usize] = tenths;

    termios::tcsetattr(file, SetArg::TCSANOW, &attrs).map_err(|e| fail(e.to_string()))?;
    debug!(path = %path.display(), rate, vtime = tenths, "Configured terminal");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    async fn drain(source: &mut DeviceSource) -> Vec<String> {
        let mut lines = Vec::new();
        loop {
            match source.read_line().await.unwrap() {
                SourceEvent::Line(line) => lines.push(line.text().into_owned()),
                SourceEvent::Timeout => continue,
                SourceEvent::Closed => break,
            }
        }
        lines
    }

    #[tokio::test]
    async fn test_reads_captured_stream() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "S 3.2, T 21.5\r\nS 3.3, T 21.6\r\nS 3.4").unwrap();

        let mut source = DeviceSource::open(file.path(), 115200, Duration::from_millis(200)).unwrap();
        assert!(!source.is_terminal());

        let lines = drain(&mut source).await;
        assert_eq!(lines, vec!["S 3.2, T 21.5", "S 3.3, T 21.6", "S 3.4"]);
        assert!(!source.is_open());

        // Stays closed
        assert_eq!(source.read_line().await.unwrap(), SourceEvent::Closed);
    }

    #[tokio::test]
    async fn test_blank_lines_are_delivered() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "\nS 1\n\n").unwrap();

        let mut source = DeviceSource::open(file.path(), 115200, Duration::from_millis(200)).unwrap();
        assert_eq!(drain(&mut source).await, vec!["", "S 1", ""]);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut source = DeviceSource::open(file.path(), 115200, Duration::from_millis(200)).unwrap();
        source.close();
        source.close();
        assert!(!source.is_open());
        assert_eq!(source.read_line().await.unwrap(), SourceEvent::Closed);
    }

    #[test]
    fn test_open_missing_path() {
        let err = DeviceSource::open("/nonexistent/ttyUSB9", 115200, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, SourceError::Open { .. }));
    }

    #[test]
    fn test_baud_rate_mapping() {
        assert_eq!(baud_rate(115200), Some(BaudRate::B115200));
        assert_eq!(baud_rate(9600), Some(BaudRate::B9600));
        assert_eq!(baud_rate(12345), None);
    }
}
