//! Record: typed readings built from tokenized pairs.

pub mod model;
pub mod builder;

pub use model::{FieldReading, FieldStatus, Record};
pub use builder::RecordBuilder;
