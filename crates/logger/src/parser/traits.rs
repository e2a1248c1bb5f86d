pub use super::model::{
    DetectionResult, LineTokens, ParseError, TokenPair, Tokenized, WireFormat,
};

/// Structural sniffing for one wire format family.
pub trait FormatDetector: Send + Sync {
    fn detect(&self, line: &str) -> DetectionResult;
    fn format(&self) -> WireFormat;
}

/// Splits a line of one known family into code/value pairs.
///
/// Takes `&mut self` because some families (CSV) carry header state
/// across lines.
pub trait Tokenize: Send {
    fn tokenize(&mut self, line: &str) -> Result<LineTokens, ParseError>;
    fn format(&self) -> WireFormat;
}
