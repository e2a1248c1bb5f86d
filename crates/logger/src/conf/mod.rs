//! Conf module: configuration model, loading and command-line flags.

pub mod cli;
pub mod load;
pub mod model;

pub use cli::CliArgs;
pub use model::{ConfigError, LoggerConfig};
