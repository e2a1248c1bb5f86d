//! Running statistics engine.
//!
//! One [`RunningStat`] per code, created lazily on first sighting (even
//! when that first reading is an error) and never reset during a session.
//! `snapshot()` is a pure read.

mod running;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::record::Record;

pub use running::{ParameterSnapshot, RunningStat};

#[derive(Debug, Default)]
pub struct StatsEngine {
    stats: Vec<RunningStat>,
    index: HashMap<String, usize>,
    records: u64,
    skipped_lines: u64,
}

impl StatsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, record: &Record) {
        self.records += 1;
        for reading in &record.fields {
            let slot = match self.index.get(&reading.code) {
                Some(&slot) => slot,
                None => {
                    self.stats.push(RunningStat::new(reading.code.clone()));
                    self.index.insert(reading.code.clone(), self.stats.len() - 1);
                    self.stats.len() - 1
                }
            };
            self.stats[slot].update(reading);
        }
    }

    /// Count a line that produced no record.
    pub fn note_skipped_line(&mut self) {
        self.skipped_lines += 1;
    }

    pub fn get(&self, code: &str) -> Option<&RunningStat> {
        self.index.get(code).map(|&slot| &self.stats[slot])
    }

    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn skipped_lines(&self) -> u64 {
        self.skipped_lines
    }

    /// Number of codes tracked.
    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        self.snapshot_at(Utc::now())
    }

    pub fn snapshot_at(&self, taken_at: DateTime<Utc>) -> StatsSnapshot {
        StatsSnapshot {
            taken_at,
            records: self.records,
            skipped_lines: self.skipped_lines,
            parameters: self.stats.iter().map(RunningStat::snapshot).collect(),
        }
    }
}

/// Statistics for every code seen so far, in first-seen order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub taken_at: DateTime<Utc>,
    pub records: u64,
    pub skipped_lines: u64,
    pub parameters: Vec<ParameterSnapshot>,
}

impl StatsSnapshot {
    pub fn get(&self, code: &str) -> Option<&ParameterSnapshot> {
        self.parameters.iter().find(|p| p.code == code)
    }
}
