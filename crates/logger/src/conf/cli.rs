//! Command-line flags; they override every other configuration source.

use std::path::PathBuf;

use clap::Parser;

use super::model::LoggerConfig;

#[derive(Parser, Debug, Default)]
#[command(name = "logger", version, about = "Trisonica anemometer data logger")]
pub struct CliArgs {
    /// Serial port path, or "auto" to detect
    #[arg(short, long)]
    pub port: Option<String>,

    /// Serial baud rate
    #[arg(short, long = "baud")]
    pub baud: Option<u32>,

    /// Directory for data and statistics files
    #[arg(short = 'o', long)]
    pub log_dir: Option<PathBuf>,

    /// Echo raw device lines
    #[arg(long, conflicts_with = "hide_raw")]
    pub show_raw: bool,

    /// Do not echo raw device lines
    #[arg(long)]
    pub hide_raw: bool,

    /// Do not write the statistics file
    #[arg(long)]
    pub no_stats: bool,

    /// Configuration file (default: logger.toml, or LOGGER_CONFIG_FILE)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl CliArgs {
    pub fn apply(&self, config: &mut LoggerConfig) {
        if let Some(port) = &self.port {
            config.port = port.clone();
        }
        if let Some(baud) = self.baud {
            config.baud_rate = baud;
        }
        if let Some(dir) = &self.log_dir {
            config.log_dir = dir.clone();
        }
        if self.show_raw {
            config.show_raw = true;
        }
        if self.hide_raw {
            config.show_raw = false;
        }
        if self.no_stats {
            config.enable_stats = false;
        }
    }
}
