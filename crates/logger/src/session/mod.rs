//! Ingestion session
//!
//! [`Pipeline`] holds all per-session state and processes one line at a
//! time. [`Session`] drives it from a [`LineSource`] until the source
//! closes, disconnects, or shutdown is requested, and always finalizes
//! the sinks on the way out.

mod pipeline;
mod summary;

use std::future::Future;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, error, info, trace};

use crate::sink::{RecordSink, SinkError, StatsSink};
use crate::source::{LineSource, SourceError, SourceEvent};

pub use pipeline::{LineOutcome, Pipeline};
pub use summary::SessionSummary;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("failed to open sink: {0}")]
    Sink(#[from] SinkError),
}

enum Event {
    Shutdown,
    Tick,
    Read(Result<SourceEvent, SourceError>),
}

pub struct Session<Src, R, S> {
    source: Src,
    pipeline: Pipeline<R, S>,
    stats_every: Duration,
}

impl<Src, R, S> Session<Src, R, S>
where
    Src: LineSource,
    R: RecordSink,
    S: StatsSink,
{
    pub fn new(source: Src, pipeline: Pipeline<R, S>) -> Self {
        Self {
            source,
            pipeline,
            stats_every: Duration::from_secs(60),
        }
    }

    /// Time-based stats flush interval; `Duration::ZERO` disables it.
    pub fn stats_every(mut self, every: Duration) -> Self {
        self.stats_every = every;
        self
    }

    pub fn pipeline(&self) -> &Pipeline<R, S> {
        &self.pipeline
    }

    pub fn source(&self) -> &Src {
        &self.source
    }

    /// Run until the source ends or `shutdown` resolves.
    ///
    /// A line already read is fully processed before shutdown is honoured.
    /// Stats are flushed, sinks closed and the source released on every
    /// exit path; a disconnect is returned as an error only after that.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<SessionSummary, SessionError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        // Zero turns the time-based flush off
        let mut ticker = if self.stats_every.is_zero() {
            None
        } else {
            let mut ticker = tokio::time::interval(self.stats_every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            Some(ticker)
        };

        let started = Instant::now();
        info!(source = %self.source.describe(), "Session started");

        let outcome = loop {
            let event = tokio::select! {
                biased;
                _ = &mut shutdown => Event::Shutdown,
                _ = next_tick(&mut ticker) => Event::Tick,
                read = self.source.read_line() => Event::Read(read),
            };

            match event {
                Event::Shutdown => {
                    info!("Shutdown requested");
                    break Ok(());
                }
                Event::Tick => self.pipeline.tick(),
                Event::Read(Ok(SourceEvent::Line(line))) => {
                    self.pipeline.process_line(&line);
                }
                Event::Read(Ok(SourceEvent::Timeout)) => trace!("Read timeout"),
                Event::Read(Ok(SourceEvent::Closed)) => {
                    info!("Source closed");
                    break Ok(());
                }
                Event::Read(Err(e)) => {
                    error!(error = %e, "Source failed");
                    break Err(e);
                }
            }
        };

        self.pipeline.finish();
        self.source.close();
        debug!("Session resources released");

        let summary = self.summary(started.elapsed());
        summary.log();
        outcome.map(|()| summary).map_err(SessionError::from)
    }

    pub fn summary(&self, runtime: Duration) -> SessionSummary {
        SessionSummary {
            source: self.source.describe(),
            format: self.pipeline.wire_format(),
            runtime,
            dropped_rows: self.pipeline.dropped_rows(),
            metrics: self.pipeline.metrics(),
            stats: self.pipeline.snapshot(),
        }
    }
}

/// Next tick of `ticker`, or never when there is none.
async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
