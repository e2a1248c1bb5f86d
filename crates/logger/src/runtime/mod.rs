//! Runtime module: logger lifecycle: boot, shutdown.

pub mod boot;
pub mod stop;
