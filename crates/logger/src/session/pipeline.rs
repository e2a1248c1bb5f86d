use std::sync::Arc;

use tracing::{debug, info, trace, warn};

use crate::parser::{LineTokenizer, LineTokens, MetricsSnapshot, ParseError, ParsingMetrics, Tokenized, WireFormat};
use crate::record::RecordBuilder;
use crate::registry::ParameterRegistry;
use crate::schema::{Schema, SchemaManager};
use crate::sink::{write_stats_with_retry, write_with_retry, RecordSink, StatsSink};
use crate::source::RawLine;
use crate::stats::{StatsEngine, StatsSnapshot};

/// What became of one input line.
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    Recorded {
        fields: usize,
        schema_grew: bool,
        /// `false` when the sink dropped the row after its retry
        written: bool,
    },
    /// CSV header carrying this many columns
    Header(usize),
    Skipped(ParseError),
}

/// The synchronous per-line path: tokenize, classify, grow the schema,
/// write the row, fold the statistics.
///
/// Owns every piece of session state; nothing is shared or global.
pub struct Pipeline<R, S> {
    tokenizer: LineTokenizer,
    builder: RecordBuilder,
    schema: SchemaManager,
    stats: StatsEngine,
    metrics: ParsingMetrics,
    records: R,
    stats_sink: Option<S>,
    show_raw: bool,
    stats_every_records: u64,
    since_flush: u64,
    dropped_rows: u64,
    finished: bool,
}

impl<R: RecordSink, S: StatsSink> Pipeline<R, S> {
    pub fn new(registry: Arc<ParameterRegistry>, records: R, stats_sink: Option<S>) -> Self {
        Self {
            tokenizer: LineTokenizer::new(),
            builder: RecordBuilder::new(registry),
            schema: SchemaManager::new(),
            stats: StatsEngine::new(),
            metrics: ParsingMetrics::new(),
            records,
            stats_sink,
            show_raw: true,
            stats_every_records: 100,
            since_flush: 0,
            dropped_rows: 0,
            finished: false,
        }
    }

    /// Echo each raw line at `info` on the `logger::raw` target.
    pub fn show_raw(mut self, show: bool) -> Self {
        self.show_raw = show;
        self
    }

    /// Flush a stats snapshot every `n` records; 0 disables the count trigger.
    pub fn stats_every_records(mut self, n: u64) -> Self {
        self.stats_every_records = n;
        self
    }

    pub fn process_line(&mut self, line: &RawLine) -> LineOutcome {
        let text = line.text();
        if self.show_raw {
            info!(target: "logger::raw", "{}", text.trim_end());
        } else {
            trace!(target: "logger::raw", "{}", text.trim_end());
        }

        let pairs = match self.tokenizer.tokenize(&text) {
            Ok(Tokenized { tokens: LineTokens::Header(columns), .. }) => {
                self.metrics.record_header();
                debug!(columns, "CSV header");
                return LineOutcome::Header(columns);
            }
            Ok(Tokenized { tokens: LineTokens::Pairs(pairs), .. }) if pairs.is_empty() => {
                return self.skip(ParseError::NoPairs);
            }
            Ok(Tokenized { format, tokens: LineTokens::Pairs(pairs) }) => {
                self.metrics.record_parse(format);
                pairs
            }
            Err(e) => return self.skip(e),
        };

        let record = self.builder.build(line.received_at, pairs);
        let schema_grew = self.schema.observe(&record);
        if schema_grew {
            info!(
                version = self.schema.schema().version(),
                columns = ?self.schema.schema().columns(),
                "Schema grew"
            );
        }

        let written = write_with_retry(&mut self.records, &record, self.schema.schema());
        if !written {
            self.dropped_rows += 1;
        }

        self.stats.update(&record);
        self.since_flush += 1;
        if self.stats_every_records > 0 && self.since_flush >= self.stats_every_records {
            self.flush_stats();
        }

        LineOutcome::Recorded { fields: record.len(), schema_grew, written }
    }

    fn skip(&mut self, error: ParseError) -> LineOutcome {
        self.metrics.record_skip(&error);
        if error != ParseError::Empty {
            self.stats.note_skipped_line();
            debug!(reason = %error, "Skipped line");
        }
        LineOutcome::Skipped(error)
    }

    /// Emit a stats snapshot and flush both sinks.
    pub fn flush_stats(&mut self) {
        self.since_flush = 0;
        if let Err(e) = self.records.flush() {
            warn!(error = %e, "Data sink flush failed");
        }

        let Some(sink) = self.stats_sink.as_mut() else {
            return;
        };
        let snapshot = self.stats.snapshot();
        if write_stats_with_retry(sink, &snapshot) {
            debug!(parameters = snapshot.parameters.len(), records = snapshot.records, "Flushed statistics");
        }
        if let Err(e) = sink.flush() {
            warn!(error = %e, "Stats sink flush failed");
        }
    }

    /// Flush only when records arrived since the last snapshot.
    pub fn tick(&mut self) {
        if self.since_flush > 0 {
            self.flush_stats();
        }
    }

    /// Final snapshot, then close the sinks. Safe to call more than once.
    pub fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.flush_stats();

        if let Err(e) = self.records.close() {
            warn!(error = %e, "Failed to close data sink");
        }
        if let Some(sink) = self.stats_sink.as_mut() {
            if let Err(e) = sink.close() {
                warn!(error = %e, "Failed to close stats sink");
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn schema(&self) -> &Schema {
        self.schema.schema()
    }

    pub fn dropped_rows(&self) -> u64 {
        self.dropped_rows
    }

    pub fn wire_format(&self) -> Option<WireFormat> {
        self.tokenizer.session_format()
    }

    pub fn record_sink(&self) -> &R {
        &self.records
    }

    pub fn stats_sink(&self) -> Option<&S> {
        self.stats_sink.as_ref()
    }
}
