use std::time::Duration;

use serde::Serialize;
use tracing::info;

use crate::parser::{MetricsSnapshot, WireFormat};
use crate::stats::StatsSnapshot;

/// End-of-session report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub source: String,
    pub format: Option<WireFormat>,
    pub runtime: Duration,
    pub dropped_rows: u64,
    pub metrics: MetricsSnapshot,
    pub stats: StatsSnapshot,
}

impl SessionSummary {
    pub fn records(&self) -> u64 {
        self.stats.records
    }

    pub fn parameters(&self) -> usize {
        self.stats.parameters.len()
    }

    /// Records per second over the whole session.
    pub fn average_rate_hz(&self) -> f64 {
        let secs = self.runtime.as_secs_f64();
        if secs > 0.0 {
            self.records() as f64 / secs
        } else {
            0.0
        }
    }

    pub fn log(&self) {
        info!(
            source = %self.source,
            format = self.format.map(|f| f.as_str()).unwrap_or("none"),
            lines = self.metrics.total_lines,
            records = self.records(),
            skipped = self.metrics.skipped_lines,
            dropped_rows = self.dropped_rows,
            parameters = self.parameters(),
            runtime_secs = %format!("{:.1}", self.runtime.as_secs_f64()),
            rate_hz = %format!("{:.2}", self.average_rate_hz()),
            "Session finished"
        );

        for p in &self.stats.parameters {
            info!(
                code = %p.code,
                valid = p.count_valid,
                errors = p.count_error,
                error_rate = %format!("{:.1}%", p.error_rate * 100.0),
                mean = %p.mean.map(|m| format!("{m:.3}")).unwrap_or_default(),
                last = %p.last.map(|v| v.to_string()).unwrap_or_default(),
                "Parameter summary"
            );
        }
    }
}
