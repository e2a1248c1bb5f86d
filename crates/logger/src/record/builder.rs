use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::model::{FieldReading, FieldStatus, Record};
use crate::parser::TokenPair;
use crate::registry::{ParameterRegistry, ParameterSpec};

/// Classifies each token against the registry and folds the line into a
/// [`Record`].
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    registry: Arc<ParameterRegistry>,
}

impl RecordBuilder {
    pub fn new(registry: Arc<ParameterRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ParameterRegistry {
        &self.registry
    }

    /// A code repeated within one line keeps its first position and takes
    /// the last value.
    pub fn build(&self, timestamp: DateTime<Utc>, pairs: Vec<TokenPair>) -> Record {
        let mut fields: Vec<FieldReading> = Vec::with_capacity(pairs.len());

        for TokenPair { code, raw } in pairs {
            let spec = self.registry.resolve(&code);
            let (value, status) = classify(&spec, &raw);
            let reading = FieldReading { code, raw, value, status };

            match fields.iter_mut().find(|f| f.code == reading.code) {
                Some(existing) => *existing = reading,
                None => fields.push(reading),
            }
        }

        Record { timestamp, fields }
    }
}

/// Order matters: a sentinel wins over the range check.
pub fn classify(spec: &ParameterSpec, raw: &str) -> (Option<f64>, FieldStatus) {
    let value = match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => return (None, FieldStatus::Unparseable),
    };

    let status = if spec.is_sentinel(value) {
        FieldStatus::ErrorSentinel
    } else if !spec.in_range(value) {
        FieldStatus::OutOfRange
    } else {
        FieldStatus::Valid
    };

    (Some(value), status)
}
