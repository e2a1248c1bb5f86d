//! Model: LoggerConfig and its validation.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::registry::ParameterOverride;
use crate::sink::SegmentPolicy;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Serial device path, or `auto` to probe candidate ports
    pub port: String,
    pub baud_rate: u32,
    pub log_dir: PathBuf,
    /// Echo every raw line to the console
    pub show_raw: bool,
    /// Write the stats artifact; statistics are computed regardless
    pub enable_stats: bool,
    pub stats_every_records: u64,
    /// Wall-clock stats flush interval; 0 turns it off
    pub stats_every_secs: u64,
    pub read_timeout_ms: u64,
    pub max_segment_bytes: u64,
    /// Lines read from each candidate port during auto-detection
    pub probe_lines: usize,
    pub parameters: BTreeMap<String, ParameterOverride>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            port: "auto".to_string(),
            baud_rate: 115_200,
            log_dir: PathBuf::from("OUTPUT"),
            show_raw: true,
            enable_stats: true,
            stats_every_records: 100,
            stats_every_secs: 60,
            read_timeout_ms: 1000,
            max_segment_bytes: 50 * 1024 * 1024,
            probe_lines: 10,
            parameters: BTreeMap::new(),
        }
    }
}

impl LoggerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port.trim().is_empty() {
            return Err(ConfigError::Invalid("port must not be empty".to_string()));
        }
        if self.baud_rate == 0 {
            return Err(ConfigError::Invalid("baud_rate must be > 0".to_string()));
        }
        if self.read_timeout_ms == 0 {
            return Err(ConfigError::Invalid("read_timeout_ms must be > 0".to_string()));
        }
        if self.max_segment_bytes == 0 {
            return Err(ConfigError::Invalid("max_segment_bytes must be > 0".to_string()));
        }
        for (code, o) in &self.parameters {
            o.validate(code).map_err(ConfigError::Invalid)?;
        }
        Ok(())
    }

    pub fn is_auto_port(&self) -> bool {
        self.port.eq_ignore_ascii_case("auto")
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn stats_every(&self) -> Duration {
        Duration::from_secs(self.stats_every_secs)
    }

    pub fn segment_policy(&self) -> SegmentPolicy {
        SegmentPolicy { max_segment_bytes: self.max_segment_bytes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = LoggerConfig::default();
        config.validate().unwrap();
        assert!(config.is_auto_port());
        assert_eq!(config.log_dir, PathBuf::from("OUTPUT"));
        assert!(config.show_raw);
        assert!(config.enable_stats);
    }

    #[test]
    fn test_rejects_zero_values() {
        let cases: [fn(&mut LoggerConfig); 4] = [
            |c| c.baud_rate = 0,
            |c| c.read_timeout_ms = 0,
            |c| c.max_segment_bytes = 0,
            |c| c.port = " ".to_string(),
        ];
        for mutate in cases {
            let mut config = LoggerConfig::default();
            mutate(&mut config);
            assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        }
    }

    #[test]
    fn test_zero_stats_interval_is_off() {
        let config = LoggerConfig { stats_every_secs: 0, ..Default::default() };
        config.validate().unwrap();
        assert!(config.stats_every().is_zero());
    }

    #[test]
    fn test_rejects_inverted_range() {
        let mut config = LoggerConfig::default();
        config.parameters.insert(
            "T".to_string(),
            ParameterOverride { min: Some(60.0), max: Some(-40.0), ..Default::default() },
        );
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("parameters.T"));
    }
}
