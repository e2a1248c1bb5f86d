use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldStatus {
    Valid,
    /// Value equals a device error code for the parameter
    ErrorSentinel,
    /// Numeric but outside the parameter's valid range
    OutOfRange,
    /// Token is not a finite number
    Unparseable,
}

impl FieldStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, FieldStatus::Valid)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldReading {
    pub code: String,
    /// Token exactly as received; this is what the data sink writes
    pub raw: String,
    /// `None` when the token did not parse
    pub value: Option<f64>,
    pub status: FieldStatus,
}

/// One input line worth of readings, in first-seen order within the line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub timestamp: DateTime<Utc>,
    pub fields: Vec<FieldReading>,
}

impl Record {
    pub fn get(&self, code: &str) -> Option<&FieldReading> {
        self.fields.iter().find(|f| f.code == code)
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.code.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
