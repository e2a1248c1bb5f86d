use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::{data_row, header_row, RecordSink, Result};
use crate::record::Record;
use crate::schema::Schema;

/// When the data sink starts a new segment file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentPolicy {
    /// Roll once the current segment has grown past this many bytes.
    pub max_segment_bytes: u64,
}

impl Default for SegmentPolicy {
    fn default() -> Self {
        Self { max_segment_bytes: 50 * 1024 * 1024 }
    }
}

#[derive(Debug)]
struct Segment {
    path: PathBuf,
    file: File,
    schema_version: u32,
    bytes: u64,
    rows: u64,
}

/// CSV data sink split into numbered segments.
///
/// A segment is opened lazily with the header of the schema current at its
/// first row. When the schema grows, or the segment exceeds
/// `max_segment_bytes`, the segment is closed and the next row opens
/// `{stem}_{NNN}.csv` with the superset header. Rows are never rewritten.
#[derive(Debug)]
pub struct CsvRecordSink {
    dir: PathBuf,
    stem: String,
    policy: SegmentPolicy,
    current: Option<Segment>,
    next_index: u32,
    closed: Vec<PathBuf>,
}

impl CsvRecordSink {
    pub fn new(dir: impl AsRef<Path>, stem: impl Into<String>, policy: SegmentPolicy) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            stem: stem.into(),
            policy,
            current: None,
            next_index: 1,
            closed: Vec::new(),
        }
    }

    pub fn segment_path(&self, index: u32) -> PathBuf {
        self.dir.join(format!("{}_{:03}.csv", self.stem, index))
    }

    /// Path of the open segment, if any.
    pub fn current_path(&self) -> Option<&Path> {
        self.current.as_ref().map(|s| s.path.as_path())
    }

    /// Every segment written so far, in order.
    pub fn segments(&self) -> Vec<PathBuf> {
        let mut all = self.closed.clone();
        all.extend(self.current.as_ref().map(|s| s.path.clone()));
        all
    }

    fn needs_roll(&self, schema: &Schema) -> Option<&'static str> {
        let segment = self.current.as_ref()?;
        if segment.schema_version != schema.version() {
            Some("schema grew")
        } else if segment.bytes >= self.policy.max_segment_bytes {
            Some("size limit")
        } else {
            None
        }
    }

    fn open_segment(&mut self, schema: &Schema) -> Result<()> {
        let path = self.segment_path(self.next_index);
        let mut file = OpenOptions::new().create(true).write(true).truncate(true).open(&path)?;

        let header = encode(&header_row(schema))?;
        file.write_all(&header)?;
        file.flush()?;

        // Only advance once the file exists, so a failed open is retried
        // under the same name
        self.next_index += 1;
        info!(path = %path.display(), columns = schema.len(), "Opened data segment");
        self.current = Some(Segment {
            path,
            file,
            schema_version: schema.version(),
            bytes: header.len() as u64,
            rows: 0,
        });
        Ok(())
    }

    fn close_segment(&mut self) -> Result<()> {
        if let Some(segment) = self.current.take() {
            let result = segment.file.sync_all();
            debug!(path = %segment.path.display(), rows = segment.rows, bytes = segment.bytes, "Closed data segment");
            self.closed.push(segment.path);
            result?;
        }
        Ok(())
    }
}

/// Segment storage that can cut off a partially written row.
pub trait SegmentFile: Write {
    /// Drop everything past `len` and continue writing there.
    fn truncate_to(&mut self, len: u64) -> std::io::Result<()>;
}

impl SegmentFile for File {
    fn truncate_to(&mut self, len: u64) -> std::io::Result<()> {
        self.set_len(len)?;
        self.seek(SeekFrom::Start(len))?;
        Ok(())
    }
}

/// Append `row` after the first `committed` bytes; on failure the file is
/// cut back to `committed` so a retry never lands behind a torn row.
///
/// The outer error is the write failure; `Err(Some(_))` inside means the
/// rollback failed as well and the file can no longer be trusted.
pub fn append_row<F: SegmentFile + ?Sized>(
    file: &mut F,
    committed: u64,
    row: &[u8],
) -> std::result::Result<(), (std::io::Error, Option<std::io::Error>)> {
    match file.write_all(row) {
        Ok(()) => Ok(()),
        Err(e) => Err((e, file.truncate_to(committed).err())),
    }
}

fn encode(cells: &[String]) -> Result<Vec<u8>> {
    let mut writer = ::csv::Writer::from_writer(Vec::new());
    writer.write_record(cells)?;
    writer.into_inner().map_err(|e| e.into_error().into())
}

impl RecordSink for CsvRecordSink {
    fn write_record(&mut self, record: &Record, schema: &Schema) -> Result<()> {
        if let Some(reason) = self.needs_roll(schema) {
            info!(reason, "Rolling data segment");
            self.close_segment()?;
        }
        if self.current.is_none() {
            self.open_segment(schema)?;
        }

        let row = encode(&data_row(record, schema))?;
        let Some(segment) = self.current.as_mut() else {
            return Ok(());
        };
        match append_row(&mut segment.file, segment.bytes, &row) {
            Ok(()) => {
                segment.bytes += row.len() as u64;
                segment.rows += 1;
                Ok(())
            }
            Err((write_error, None)) => Err(write_error.into()),
            Err((write_error, Some(rollback_error))) => {
                // Torn tail could not be removed; the next row starts a new segment
                warn!(error = %rollback_error, "Failed to roll back partial row");
                if let Some(torn) = self.current.take() {
                    self.closed.push(torn.path);
                }
                Err(write_error.into())
            }
        }
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(segment) = self.current.as_mut() {
            segment.file.flush()?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.close_segment()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FieldReading, FieldStatus};
    use crate::schema::SchemaManager;
    use chrono::Utc;

    fn record(pairs: &[(&str, &str)]) -> Record {
        Record {
            timestamp: Utc::now(),
            fields: pairs
                .iter()
                .map(|(code, raw)| FieldReading {
                    code: code.to_string(),
                    raw: raw.to_string(),
                    value: raw.parse().ok(),
                    status: FieldStatus::Valid,
                })
                .collect(),
        }
    }

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        let mut reader = ::csv::ReaderBuilder::new().has_headers(false).from_path(path).unwrap();
        reader
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    fn write_all(sink: &mut CsvRecordSink, records: &[Record]) {
        let mut schema = SchemaManager::new();
        for r in records {
            schema.observe(r);
            sink.write_record(r, schema.schema()).unwrap();
        }
        sink.close().unwrap();
    }

    // ── segments ──

    #[test]
    fn test_stable_schema_stays_in_one_segment() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvRecordSink::new(dir.path(), "data", SegmentPolicy::default());
        write_all(&mut sink, &[record(&[("S", "1.0"), ("T", "20.0")]), record(&[("T", "21.0")])]);

        let segments = sink.segments();
        assert_eq!(segments.len(), 1);
        assert!(segments[0].ends_with("data_001.csv"));

        let rows = read_rows(&segments[0]);
        assert_eq!(rows[0], vec!["timestamp", "S", "T"]);
        assert_eq!(&rows[2][1..], &["", "21.0"]);
    }

    #[test]
    fn test_schema_growth_rolls_segment_with_superset_header() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvRecordSink::new(dir.path(), "data", SegmentPolicy::default());
        write_all(
            &mut sink,
            &[
                record(&[("S", "3.2"), ("T", "21.5"), ("H", "55.0")]),
                record(&[("S", "-99.50"), ("T", "21.6"), ("D", "180.0")]),
                record(&[("S", "3.4"), ("T", "21.7")]),
            ],
        );

        let segments = sink.segments();
        assert_eq!(segments.len(), 2);

        let first = read_rows(&segments[0]);
        assert_eq!(first.len(), 2);
        assert_eq!(first[0], vec!["timestamp", "S", "T", "H"]);

        let second = read_rows(&segments[1]);
        assert_eq!(second[0], vec!["timestamp", "S", "T", "H", "D"]);
        assert_eq!(&second[1][1..], &["-99.50", "21.6", "", "180.0"]);
        assert_eq!(&second[2][1..], &["3.4", "21.7", "", ""]);

        // Earlier header is a prefix of the later one
        assert!(second[0].starts_with(&first[0]));
    }

    #[test]
    fn test_size_limit_rolls_segment() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvRecordSink::new(dir.path(), "data", SegmentPolicy { max_segment_bytes: 1 });
        write_all(&mut sink, &[record(&[("S", "1")]), record(&[("S", "2")]), record(&[("S", "3")])]);

        let segments = sink.segments();
        assert_eq!(segments.len(), 3);
        for segment in &segments {
            let rows = read_rows(segment);
            assert_eq!(rows.len(), 2);
            assert_eq!(rows[0], vec!["timestamp", "S"]);
        }
    }

    #[test]
    fn test_no_file_until_first_row() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvRecordSink::new(dir.path(), "data", SegmentPolicy::default());
        sink.flush().unwrap();
        sink.close().unwrap();
        assert!(sink.segments().is_empty());
        assert!(!sink.segment_path(1).exists());
    }

    // ── partial writes ──

    /// Accepts `budget` bytes, then fails every write.
    struct ShortDisk {
        data: Vec<u8>,
        pos: usize,
        budget: usize,
        fail_truncate: bool,
    }

    impl ShortDisk {
        fn new(data: &[u8], budget: usize) -> Self {
            Self { data: data.to_vec(), pos: data.len(), budget, fail_truncate: false }
        }
    }

    impl Write for ShortDisk {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.budget == 0 {
                return Err(std::io::Error::other("no space left on device"));
            }
            let n = buf.len().min(self.budget);
            self.budget -= n;
            self.data.truncate(self.pos);
            self.data.extend_from_slice(&buf[..n]);
            self.pos += n;
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SegmentFile for ShortDisk {
        fn truncate_to(&mut self, len: u64) -> std::io::Result<()> {
            if self.fail_truncate {
                return Err(std::io::Error::other("read-only"));
            }
            self.data.truncate(len as usize);
            self.pos = len as usize;
            Ok(())
        }
    }

    #[test]
    fn test_partial_row_is_rolled_back() {
        let committed = b"timestamp,S,T\nt0,1.0,20.0\n";
        let mut disk = ShortDisk::new(committed, 4);

        let err = append_row(&mut disk, committed.len() as u64, b"t1,1.1,20.1\n").unwrap_err();
        assert!(err.1.is_none());
        assert_eq!(disk.data, committed.to_vec());

        // Retry after space frees up lands on a clean line boundary
        disk.budget = usize::MAX;
        append_row(&mut disk, committed.len() as u64, b"t1,1.1,20.1\n").unwrap();
        assert_eq!(disk.data, b"timestamp,S,T\nt0,1.0,20.0\nt1,1.1,20.1\n".to_vec());
    }

    #[test]
    fn test_failed_rollback_is_reported() {
        let mut disk = ShortDisk::new(b"h\n", 1);
        disk.fail_truncate = true;
        let err = append_row(&mut disk, 2, b"row\n").unwrap_err();
        assert!(err.1.is_some());
    }

    #[test]
    fn test_file_truncate_to_rewinds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seg.csv");
        let mut file = OpenOptions::new().create(true).write(true).open(&path).unwrap();
        file.write_all(b"header\npartial-ro").unwrap();

        file.truncate_to(7).unwrap();
        file.write_all(b"row\n").unwrap();
        drop(file);

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "header\nrow\n");
    }

    #[test]
    fn test_open_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let mut sink = CsvRecordSink::new(&missing, "data", SegmentPolicy::default());
        let r = record(&[("S", "1")]);
        let mut schema = SchemaManager::new();
        schema.observe(&r);

        assert!(sink.write_record(&r, schema.schema()).is_err());

        std::fs::create_dir(&missing).unwrap();
        sink.write_record(&r, schema.schema()).unwrap();
        assert_eq!(sink.current_path(), Some(sink.segment_path(1).as_path()));
    }
}
