use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{format_timestamp, Result, StatsSink};
use crate::stats::StatsSnapshot;

pub const STATS_HEADER: [&str; 9] = [
    "timestamp",
    "code",
    "count_valid",
    "count_error",
    "error_rate",
    "min",
    "max",
    "mean",
    "stddev",
];

/// Appends one block of rows per snapshot, one row per code.
#[derive(Debug)]
pub struct CsvStatsSink {
    path: PathBuf,
    file: File,
}

impl CsvStatsSink {
    /// Create (or truncate) `path` and write the header.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new().create(true).write(true).truncate(true).open(&path)?;

        let mut writer = ::csv::Writer::from_writer(Vec::new());
        writer.write_record(STATS_HEADER)?;
        file.write_all(&into_bytes(writer)?)?;
        file.flush()?;

        debug!(path = %path.display(), "Opened stats sink");
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn optional(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.6}")).unwrap_or_default()
}

fn into_bytes(writer: ::csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer.into_inner().map_err(|e| e.into_error().into())
}

impl StatsSink for CsvStatsSink {
    fn write_stats(&mut self, snapshot: &StatsSnapshot) -> Result<()> {
        let taken_at = format_timestamp(&snapshot.taken_at);
        let mut writer = ::csv::Writer::from_writer(Vec::new());
        for p in &snapshot.parameters {
            writer.write_record([
                taken_at.clone(),
                p.code.clone(),
                p.count_valid.to_string(),
                p.count_error.to_string(),
                format!("{:.6}", p.error_rate),
                optional(p.min),
                optional(p.max),
                optional(p.mean),
                optional(p.stddev),
            ])?;
        }
        // One write per block
        self.file.write_all(&into_bytes(writer)?)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.file.flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }
}
