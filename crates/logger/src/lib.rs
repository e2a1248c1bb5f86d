// Module structure for the Trisonica data logger.

// Line handling
pub mod parser;
pub mod registry;
pub mod record;
pub mod schema;
pub mod stats;

// I/O
pub mod sink;
pub mod source;

// Lifecycle
pub mod session;
pub mod conf;
pub mod runtime;
