//! Boot: logging init, port resolution, sink and session creation.

use std::sync::Arc;

use chrono::Local;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::conf::LoggerConfig;
use crate::registry::ParameterRegistry;
use crate::session::{Pipeline, Session};
use crate::sink::{CsvRecordSink, CsvStatsSink};
use crate::source::{resolve_port, DeviceSource};

pub type LoggerSession = Session<DeviceSource, CsvRecordSink, CsvStatsSink>;

/// Initialise the tracing / logging subsystem.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "logger=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// File names for one session, stamped with the local start time.
pub fn session_file_names(stamp: &str) -> (String, String) {
    (format!("TrisonicaData_{}", stamp), format!("TrisonicaStats_{}.csv", stamp))
}

/// Resolve the port, open the source and sinks, and build the session.
pub async fn boot(config: &LoggerConfig) -> Result<LoggerSession, Box<dyn std::error::Error>> {
    info!("Starting Trisonica logger v{}", env!("CARGO_PKG_VERSION"));
    config.validate()?;

    std::fs::create_dir_all(&config.log_dir)?;
    info!("Log directory: {}", config.log_dir.display());

    let port = resolve_port(&config.port, config.baud_rate, config.read_timeout(), config.probe_lines).await?;
    let source = DeviceSource::open(&port, config.baud_rate, config.read_timeout())?;

    let registry = ParameterRegistry::trisonica().with_overrides(&config.parameters);
    info!("Parameter registry: {} known codes", registry.len());

    let stamp = Local::now().format("%Y-%m-%d_%H%M%S").to_string();
    let (data_stem, stats_name) = session_file_names(&stamp);
    let records = CsvRecordSink::new(&config.log_dir, data_stem, config.segment_policy());

    let stats = if config.enable_stats {
        let path = config.log_dir.join(stats_name);
        info!("Statistics file: {}", path.display());
        Some(CsvStatsSink::create(path)?)
    } else {
        warn!("Statistics file disabled");
        None
    };

    let pipeline = Pipeline::new(Arc::new(registry), records, stats)
        .show_raw(config.show_raw)
        .stats_every_records(config.stats_every_records);

    Ok(Session::new(source, pipeline).stats_every(config.stats_every()))
}
