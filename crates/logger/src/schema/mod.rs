//! Dynamic schema: the ordered set of parameter codes seen so far.
//!
//! Columns are appended in first-seen order and never removed or
//! reordered. Every growth bumps the schema version; the data sink reacts
//! to a new version by closing its current segment and starting the next
//! one with the full superset header, so rows already written are never
//! rewritten and no rows are held back.

use std::collections::HashMap;

use crate::record::Record;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    columns: Vec<String>,
    index: HashMap<String, usize>,
    version: u32,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn contains(&self, code: &str) -> bool {
        self.index.contains_key(code)
    }

    pub fn position(&self, code: &str) -> Option<usize> {
        self.index.get(code).copied()
    }

    /// 0 while empty; incremented once per growth.
    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    fn push(&mut self, code: &str) -> bool {
        if self.index.contains_key(code) {
            return false;
        }
        self.index.insert(code.to_string(), self.columns.len());
        self.columns.push(code.to_string());
        true
    }
}

/// Owns the session [`Schema`]; the only place it is mutated.
#[derive(Debug, Default)]
pub struct SchemaManager {
    schema: Schema,
}

impl SchemaManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Append every code of `record` not seen before.
    ///
    /// Returns `true` when the schema grew, i.e. the sink's header must be
    /// re-emitted in a new segment.
    pub fn observe(&mut self, record: &Record) -> bool {
        let mut grew = false;
        for code in record.codes() {
            grew |= self.schema.push(code);
        }
        if grew {
            self.schema.version += 1;
        }
        grew
    }
}
