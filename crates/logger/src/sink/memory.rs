use super::{data_row, header_row, RecordSink, Result, SinkError, StatsSink};
use crate::record::Record;
use crate::schema::Schema;
use crate::stats::StatsSnapshot;

/// In-memory record sink for tests.
///
/// Keeps the header each row was written under so schema growth can be
/// asserted on.
#[derive(Debug, Default)]
pub struct MemoryRecordSink {
    headers: Vec<Vec<String>>,
    rows: Vec<Vec<String>>,
    row_headers: Vec<usize>,
    fail_next: usize,
    flushes: usize,
}

impl MemoryRecordSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` writes fail.
    pub fn fail_next(&mut self, n: usize) {
        self.fail_next = n;
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Distinct headers in the order they were first used.
    pub fn headers(&self) -> &[Vec<String>] {
        &self.headers
    }

    /// Header the `i`th row was written under.
    pub fn header_for(&self, i: usize) -> Option<&[String]> {
        self.row_headers.get(i).map(|&h| self.headers[h].as_slice())
    }

    pub fn flushes(&self) -> usize {
        self.flushes
    }
}

impl RecordSink for MemoryRecordSink {
    fn write_record(&mut self, record: &Record, schema: &Schema) -> Result<()> {
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(SinkError::Io(std::io::Error::other("injected failure")));
        }

        let header = header_row(schema);
        if self.headers.last() != Some(&header) {
            self.headers.push(header);
        }
        self.row_headers.push(self.headers.len() - 1);
        self.rows.push(data_row(record, schema));
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.flushes += 1;
        Ok(())
    }
}

/// In-memory stats sink for tests.
#[derive(Debug, Default)]
pub struct MemoryStatsSink {
    snapshots: Vec<StatsSnapshot>,
    fail_next: usize,
}

impl MemoryStatsSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&mut self, n: usize) {
        self.fail_next = n;
    }

    pub fn snapshots(&self) -> &[StatsSnapshot] {
        &self.snapshots
    }

    pub fn last(&self) -> Option<&StatsSnapshot> {
        self.snapshots.last()
    }
}

impl StatsSink for MemoryStatsSink {
    fn write_stats(&mut self, snapshot: &StatsSnapshot) -> Result<()> {
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(SinkError::Io(std::io::Error::other("injected failure")));
        }
        self.snapshots.push(snapshot.clone());
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}
