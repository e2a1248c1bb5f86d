//! Fake: scripted line source for deterministic tests.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, TimeZone, Utc};

use super::{LineSource, RawLine, SourceError, SourceEvent, SourceFuture};

#[derive(Debug, Clone)]
enum Step {
    Line(String),
    Timeout,
    Disconnect,
}

/// What happens once the script runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exhausted {
    Close,
    Hang,
}

/// Replays a fixed script of lines, timeouts and disconnects.
///
/// Line timestamps start at 2025-01-01T00:00:00Z and advance by
/// `interval` (100ms by default) per line.
#[derive(Debug)]
pub struct FakeSource {
    script: VecDeque<Step>,
    exhausted: Exhausted,
    open: bool,
    next_at: DateTime<Utc>,
    interval: Duration,
    delivered: usize,
}

impl FakeSource {
    pub fn new() -> Self {
        Self {
            script: VecDeque::new(),
            exhausted: Exhausted::Close,
            open: true,
            next_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).single().unwrap_or_default(),
            interval: Duration::milliseconds(100),
            delivered: 0,
        }
    }

    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new().lines(lines)
    }

    pub fn line(mut self, line: impl Into<String>) -> Self {
        self.script.push_back(Step::Line(line.into()));
        self
    }

    pub fn lines<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.script.extend(lines.into_iter().map(|l| Step::Line(l.into())));
        self
    }

    pub fn timeouts(mut self, n: usize) -> Self {
        self.script.extend(std::iter::repeat(Step::Timeout).take(n));
        self
    }

    /// Fail the next read with `Disconnected`.
    pub fn disconnect(mut self) -> Self {
        self.script.push_back(Step::Disconnect);
        self
    }

    /// Block forever once the script is exhausted instead of closing.
    pub fn then_hang(mut self) -> Self {
        self.exhausted = Exhausted::Hang;
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Lines handed out so far.
    pub fn delivered(&self) -> usize {
        self.delivered
    }

    fn next_step(&mut self) -> Option<Result<SourceEvent, SourceError>> {
        if !self.open {
            return Some(Ok(SourceEvent::Closed));
        }
        let step = match self.script.pop_front() {
            Some(step) => step,
            None if self.exhausted == Exhausted::Hang => return None,
            None => {
                self.open = false;
                return Some(Ok(SourceEvent::Closed));
            }
        };

        Some(match step {
            Step::Line(text) => {
                let at = self.next_at;
                self.next_at += self.interval;
                self.delivered += 1;
                Ok(SourceEvent::Line(RawLine::new(at, text.into_bytes())))
            }
            Step::Timeout => Ok(SourceEvent::Timeout),
            Step::Disconnect => {
                self.open = false;
                Err(SourceError::Disconnected("fake link dropped".to_string()))
            }
        })
    }
}

impl Default for FakeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl LineSource for FakeSource {
    fn read_line(&mut self) -> SourceFuture<'_, Result<SourceEvent, SourceError>> {
        Box::pin(async move {
            match self.next_step() {
                Some(event) => event,
                None => std::future::pending().await,
            }
        })
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn describe(&self) -> String {
        "fake".to_string()
    }
}
