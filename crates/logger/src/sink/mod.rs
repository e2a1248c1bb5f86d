//! Sink Writer
//!
//! Append-only persistence for records and statistics snapshots.
//!
//! - `csv.rs`: segmented CSV data sink, one segment per schema version
//! - `stats.rs`: CSV stats sink, one block of rows per flush
//! - `memory.rs`: in-memory sinks for tests

pub mod csv;
pub mod memory;
pub mod stats;

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;
use tracing::warn;

use crate::record::Record;
use crate::schema::Schema;
use crate::stats::StatsSnapshot;

pub use self::csv::{CsvRecordSink, SegmentPolicy};
pub use memory::{MemoryRecordSink, MemoryStatsSink};
pub use stats::CsvStatsSink;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv encoding error: {0}")]
    Csv(#[from] ::csv::Error),

    #[error("sink closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, SinkError>;

/// Destination for data rows.
pub trait RecordSink: Send {
    /// Append one row laid out in `schema` column order.
    fn write_record(&mut self, record: &Record, schema: &Schema) -> Result<()>;

    fn flush(&mut self) -> Result<()>;

    fn close(&mut self) -> Result<()> {
        self.flush()
    }
}

/// Destination for statistics snapshots.
pub trait StatsSink: Send {
    fn write_stats(&mut self, snapshot: &StatsSnapshot) -> Result<()>;

    fn flush(&mut self) -> Result<()>;

    fn close(&mut self) -> Result<()> {
        self.flush()
    }
}

pub const TIMESTAMP_COLUMN: &str = "timestamp";

/// RFC 3339 with microseconds, always `Z`.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// `timestamp` followed by the schema columns.
pub fn header_row(schema: &Schema) -> Vec<String> {
    std::iter::once(TIMESTAMP_COLUMN.to_string())
        .chain(schema.columns().iter().cloned())
        .collect()
}

/// One cell per header column; codes absent from `record` are blank.
pub fn data_row(record: &Record, schema: &Schema) -> Vec<String> {
    let mut row = Vec::with_capacity(schema.len() + 1);
    row.push(format_timestamp(&record.timestamp));
    row.extend(schema.columns().iter().map(|code| {
        record.get(code).map(|f| f.raw.clone()).unwrap_or_default()
    }));
    row
}

/// Write `record`, retrying once on failure.
///
/// Returns `false` when the row was dropped; the caller counts it and keeps
/// going.
pub fn write_with_retry(sink: &mut dyn RecordSink, record: &Record, schema: &Schema) -> bool {
    match sink.write_record(record, schema) {
        Ok(()) => true,
        Err(first) => match sink.write_record(record, schema) {
            Ok(()) => {
                warn!(error = %first, "Record write succeeded on retry");
                true
            }
            Err(second) => {
                warn!(
                    error = %second,
                    first_error = %first,
                    timestamp = %record.timestamp,
                    "Dropping record after failed retry"
                );
                false
            }
        },
    }
}

/// Write `snapshot`, retrying once on failure.
pub fn write_stats_with_retry(sink: &mut dyn StatsSink, snapshot: &StatsSnapshot) -> bool {
    match sink.write_stats(snapshot) {
        Ok(()) => true,
        Err(first) => match sink.write_stats(snapshot) {
            Ok(()) => true,
            Err(second) => {
                warn!(error = %second, first_error = %first, "Dropping stats snapshot after failed retry");
                false
            }
        },
    }
}
